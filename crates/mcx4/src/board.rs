//! The scheduler that steps a network of controllers in lockstep, giving
//! cross-controller writes a guaranteed one-cycle latency.

use mcx4_core::Clock;

use crate::error::McxError;
use crate::microcontroller::Microcontroller;

/// Runs a fixed set of [`Microcontroller`]s, one board-cycle at a time.
///
/// Every cycle, each controller gets one [`Microcontroller::step`] in the
/// order it was added, then every controller's port outputs are committed
/// together so a write issued by the first controller this cycle is not
/// visible to a later controller's read until the *next* cycle — cross-board
/// I/O always has exactly one cycle of latency, independent of scheduling
/// order. If every controller is asleep at the end of a cycle, the clock
/// fast-forwards to the earliest wake time instead of ticking one cycle at a
/// time.
#[derive(Debug)]
pub struct Board {
    clock: Clock,
    controllers: Vec<Microcontroller>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates an empty board, touching the clock once so it reads `Some(1)`
    /// from the moment the board exists (mirroring `Board.__init__`'s
    /// `if time.get() is None: time.advance_cycle()`).
    #[must_use]
    pub fn new() -> Self {
        let mut board = Self {
            clock: Clock::new(),
            controllers: Vec::new(),
        };
        board.clock.advance_cycle();
        board
    }

    /// Adds a controller, marking its ports buffered from now on.
    pub fn add(&mut self, mut controller: Microcontroller) -> &mut Microcontroller {
        controller.mark_attached_to_board();
        self.controllers.push(controller);
        let index = self.controllers.len() - 1;
        &mut self.controllers[index]
    }

    /// The controllers on this board, in the order they were added.
    #[must_use]
    pub fn controllers(&self) -> &[Microcontroller] {
        &self.controllers
    }

    /// Mutable access to a controller by its insertion index.
    pub fn controller_mut(&mut self, index: usize) -> Option<&mut Microcontroller> {
        self.controllers.get_mut(index)
    }

    /// The board's current cycle count, or `None` if it has never run.
    #[must_use]
    pub fn now(&self) -> Option<u64> {
        self.clock.now()
    }

    /// Runs one board-cycle: every controller steps once, their outputs
    /// commit together, and the clock advances — unless every controller was
    /// asleep, in which case the clock jumps straight to the earliest
    /// wake-up instead of ticking cycle by cycle.
    ///
    /// A board with no controllers is a no-op and does not touch the clock.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the first controller whose step fails. A
    /// faulty controller halts the cycle immediately: controllers after it
    /// in scheduling order don't get to step, outputs aren't committed, and
    /// the clock doesn't advance for this cycle.
    pub fn step(&mut self) -> Result<(), McxError> {
        if self.controllers.is_empty() {
            return Ok(());
        }

        let now = self.clock.now().unwrap_or(0);
        log::trace!("board cycle start: now = {now}, controllers = {}", self.controllers.len());
        let mut deadlines = Vec::with_capacity(self.controllers.len());
        let mut all_asleep = true;

        for controller in &mut self.controllers {
            if let Some(deadline) = controller.sleeping(now) {
                log::debug!("{} asleep until {deadline}", controller.name());
                deadlines.push(deadline);
                continue;
            }
            all_asleep = false;
            controller.step(now)?;
        }

        for controller in &self.controllers {
            controller.commit_outputs();
        }

        if all_asleep {
            if let Some(&deadline) = deadlines.iter().min() {
                log::debug!("all controllers asleep, fast-forwarding to {deadline}");
                self.clock.fast_forward(deadline);
            }
        }

        self.clock.advance_cycle();
        Ok(())
    }

    /// Runs `cycles` consecutive board-cycles, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the error from whichever cycle first produced one.
    pub fn run(&mut self, cycles: u64) -> Result<(), McxError> {
        for _ in 0..cycles {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until the clock has advanced by one full ATU (1000 cycles) from
    /// the point this call started.
    ///
    /// A no-op on an empty board, since [`Board::step`] never advances the
    /// clock without at least one controller to drive it.
    ///
    /// # Errors
    ///
    /// Returns the error from whichever cycle first produced one; stepping
    /// stops as soon as one does.
    pub fn advance(&mut self) -> Result<(), McxError> {
        if self.controllers.is_empty() {
            return Ok(());
        }
        let end = self.clock.end_time(1);
        while self.clock.now().unwrap_or(0) < end {
            self.step()?;
        }
        Ok(())
    }
}
