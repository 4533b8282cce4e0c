//! Configurable controllers: a CPU bound to a name, a register file, and a
//! lazily-instantiated port table.

use std::sync::atomic::{AtomicU64, Ordering};

use mcx4_core::{ControllerId, Interface, PortError};

use crate::error::McxError;
use crate::io::ControllerIo;
use crate::processor::Cpu;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> ControllerId {
    ControllerId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A hardware preset, fixing the port counts and `dat` register count of a
/// [`Microcontroller`] the way a real part number would.
///
/// Each variant's GPIO/XBUS counts name the *highest legal port index*, not
/// how many ports exist — `Mc4000X`'s zero GPIOs still leaves `p0` usable,
/// matching the base [`Microcontroller::new`] default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerModel {
    /// No preset: the bare default of one GPIO, one XBUS, no `dat` registers.
    #[default]
    Generic,
    /// Two extra GPIOs (`p0`-`p2`), one extra XBUS (`x0`-`x1`), no `dat`s.
    Mc4000,
    /// No extra GPIOs (`p0` only), four extra XBUS (`x0`-`x4`), no `dat`s.
    Mc4000X,
    /// Two extra GPIOs (`p0`-`p2`), four extra XBUS (`x0`-`x4`), one `dat0`.
    Mc6000,
}

impl ControllerModel {
    const fn gpio_max(self) -> i64 {
        match self {
            Self::Generic | Self::Mc4000X => 0,
            Self::Mc4000 | Self::Mc6000 => 2,
        }
    }

    const fn xbus_max(self) -> i64 {
        match self {
            Self::Generic => 0,
            Self::Mc4000 => 1,
            Self::Mc4000X | Self::Mc6000 => 4,
        }
    }

    const fn dats(self) -> u32 {
        match self {
            Self::Mc6000 => 1,
            _ => 0,
        }
    }
}

/// Builds a [`Microcontroller`].
///
/// `gpio`/`xbus` here are *counts* (the highest legal index is one less),
/// unlike a [`ControllerModel`]'s own fixed port ranges; setting one
/// explicitly overrides the model's preset for that port type.
#[derive(Debug, Clone, Default)]
pub struct McConfig {
    name: Option<String>,
    model: ControllerModel,
    gpio: Option<u32>,
    xbus: Option<u32>,
    dats: Option<u32>,
}

impl McConfig {
    /// Starts from [`ControllerModel::Generic`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a hardware preset.
    #[must_use]
    pub fn with_model(model: ControllerModel) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Sets an explicit name, overriding the auto-generated `mcN`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the GPIO port count (highest legal index is `count - 1`).
    #[must_use]
    pub fn gpio(mut self, count: u32) -> Self {
        self.gpio = Some(count);
        self
    }

    /// Overrides the XBUS port count (highest legal index is `count - 1`).
    #[must_use]
    pub fn xbus(mut self, count: u32) -> Self {
        self.xbus = Some(count);
        self
    }

    /// Overrides the number of `dat` registers.
    #[must_use]
    pub fn dats(mut self, count: u32) -> Self {
        self.dats = Some(count);
        self
    }

    /// Builds the controller.
    #[must_use]
    pub fn build(self) -> Microcontroller {
        let id = next_id();
        let gpio_max = self
            .gpio
            .map_or(self.model.gpio_max(), |count| i64::from(count) - 1);
        let xbus_max = self
            .xbus
            .map_or(self.model.xbus_max(), |count| i64::from(count) - 1);
        let dats = self.dats.unwrap_or_else(|| self.model.dats());
        let name = self.name.unwrap_or_else(|| format!("mc{}", id.0));
        Microcontroller {
            io: ControllerIo::new(id, name, gpio_max, xbus_max, dats),
            cpu: Cpu::new(),
            sleep_until: 0,
            last_now: 0,
        }
    }
}

/// One simulated controller: a CPU, a fixed register file, and a lazily
/// populated port table.
///
/// A `Microcontroller` works standalone — [`Microcontroller::execute`] and
/// [`Microcontroller::step`] need no board at all, and every port read or
/// write is instantaneous until the controller joins a [`crate::Board`],
/// at which point writes become visible to linked peers one cycle later.
#[derive(Debug)]
pub struct Microcontroller {
    io: ControllerIo,
    cpu: Cpu,
    sleep_until: u64,
    last_now: u64,
}

impl Default for Microcontroller {
    fn default() -> Self {
        McConfig::new().build()
    }
}

impl Microcontroller {
    /// A controller with one GPIO (`p0`), one XBUS (`x0`), and no `dat` registers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller matching the `MC4000` preset.
    #[must_use]
    pub fn mc4000() -> Self {
        McConfig::with_model(ControllerModel::Mc4000).build()
    }

    /// A controller matching the `MC4000X` preset.
    #[must_use]
    pub fn mc4000x() -> Self {
        McConfig::with_model(ControllerModel::Mc4000X).build()
    }

    /// A controller matching the `MC6000` preset.
    #[must_use]
    pub fn mc6000() -> Self {
        McConfig::with_model(ControllerModel::Mc6000).build()
    }

    /// This controller's name, either given explicitly or auto-generated as
    /// `mcN` from a process-wide counter.
    #[must_use]
    pub fn name(&self) -> &str {
        self.io.name()
    }

    pub(crate) fn id(&self) -> ControllerId {
        self.io.id()
    }

    /// The `acc` register's current value.
    #[must_use]
    pub fn acc(&self) -> i64 {
        self.io.register("acc").unwrap_or(0)
    }

    /// Reads a register by name.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Register`] if no register by that name exists.
    pub fn register(&self, name: &str) -> Result<i64, PortError> {
        self.io.register(name)
    }

    /// Returns the port named e.g. `"p0"` or `"x2"`, instantiating it on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Port`] for an unrecognized prefix or an index
    /// beyond this controller's configured range.
    pub fn port(&mut self, name: &str) -> Result<Interface, PortError> {
        self.io.port(name)
    }

    /// Compiles and runs `code` to completion, without looping. Replaces any
    /// previously loaded program and does not reset register or port state.
    ///
    /// # Errors
    ///
    /// Returns the error from the first instruction that fails.
    pub fn execute(&mut self, code: &str) -> Result<(), McxError> {
        self.cpu.execute(&mut self.io, code)
    }

    /// Compiles `code`, loading it for subsequent [`Microcontroller::step`] calls.
    pub fn compile(&mut self, code: &str) {
        self.cpu.compile(code);
    }

    /// Runs the next instruction of the loaded program and advances `now` to
    /// the given cycle, unless the controller is currently sleeping through
    /// that cycle.
    ///
    /// # Errors
    ///
    /// Returns the error from the executed instruction, if any.
    pub fn step(&mut self, now: u64) -> Result<(), McxError> {
        if self.sleeping(now).is_some() {
            return Ok(());
        }
        let outcome = self.cpu.step(&mut self.io);
        if let Some(atus) = self.io.take_sleep_request() {
            let atus = u64::try_from(atus).unwrap_or(0);
            self.sleep_until = now + atus * mcx4_core::clock::CYCLES_PER_ATU;
        }
        outcome
    }

    /// Returns `Some(deadline)` if the controller is asleep as of `now`,
    /// clearing the sleep state (and returning `None`) once `now` reaches
    /// the deadline.
    pub fn sleeping(&mut self, now: u64) -> Option<u64> {
        self.last_now = now;
        if self.sleep_until == 0 {
            return None;
        }
        if now >= self.sleep_until {
            self.sleep_until = 0;
            return None;
        }
        Some(self.sleep_until)
    }

    /// Most recent `now` this controller was told about, via
    /// [`Microcontroller::step`] or [`Microcontroller::sleeping`].
    #[must_use]
    pub(crate) fn last_now(&self) -> u64 {
        self.last_now
    }

    pub(crate) fn mark_attached_to_board(&mut self) {
        self.io.mark_attached_to_board();
    }

    pub(crate) fn commit_outputs(&self) {
        self.io.commit_outputs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_controller_has_exactly_p0_and_x0() {
        let mut mc = Microcontroller::new();
        assert!(mc.port("p0").is_ok());
        assert!(mc.port("p1").is_err());
        assert!(mc.port("x0").is_ok());
        assert!(mc.port("x1").is_err());
    }

    #[test]
    fn mc4000_port_ranges() {
        let mut mc = Microcontroller::mc4000();
        assert!(mc.port("p2").is_ok());
        assert!(mc.port("p3").is_err());
        assert!(mc.port("x1").is_ok());
        assert!(mc.port("x2").is_err());
    }

    #[test]
    fn mc4000x_has_no_gpio_beyond_p0() {
        let mut mc = Microcontroller::mc4000x();
        assert!(mc.port("p0").is_ok());
        assert!(mc.port("p1").is_err());
        assert!(mc.port("x4").is_ok());
    }

    #[test]
    fn mc6000_has_one_dat_register() {
        let mc = Microcontroller::mc6000();
        assert_eq!(mc.register("dat0").unwrap(), 0);
        assert_eq!(mc.register("dat").unwrap(), 0);
    }

    #[test]
    fn explicit_gpio_zero_disables_all_gpio_ports() {
        let mut mc = McConfig::new().gpio(0).build();
        assert!(mc.port("p0").is_err());
    }

    #[test]
    fn auto_generated_names_are_distinct() {
        let a = Microcontroller::new();
        let b = Microcontroller::new();
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn explicit_name_is_kept() {
        let mc = McConfig::new().name("alice").build();
        assert_eq!(mc.name(), "alice");
    }

    #[test]
    fn execute_runs_to_completion_without_looping() {
        let mut mc = Microcontroller::new();
        mc.execute("add 1\nadd 2\nadd 3\n").unwrap();
        assert_eq!(mc.acc(), 6);
    }

    #[test]
    fn mov_to_port_is_visible_immediately_without_a_board() {
        let mut mc1 = Microcontroller::new();
        let mut mc2 = Microcontroller::new();
        mc1.port("p0").unwrap().link(&mc2.port("p0").unwrap()).unwrap();
        mc1.execute("mov 42 p0\n").unwrap();
        assert_eq!(mc2.port("p0").unwrap().read(), 42);
    }

    #[test]
    fn repeated_execute_calls_accumulate_on_acc_until_an_unknown_opcode() {
        let mut mc = Microcontroller::new();
        mc.execute("add 1\n").unwrap();
        assert_eq!(mc.acc(), 1);
        mc.execute("add 1\n").unwrap();
        assert_eq!(mc.acc(), 2);
        mc.execute("sub 1\n").unwrap();
        assert_eq!(mc.acc(), 1);
        mc.execute("#sub 1\n").unwrap();
        assert_eq!(mc.acc(), 1);
        assert!(mc.execute("lawl\n").is_err());
    }

    #[test]
    fn digit_extract_and_set_through_instructions() {
        let mut mc = Microcontroller::new();
        mc.execute("mov 567 acc\ndgt 0\n").unwrap();
        assert_eq!(mc.acc(), 7);
        mc.execute("mov 567 acc\ndgt 1\n").unwrap();
        assert_eq!(mc.acc(), 6);
        mc.execute("mov 567 acc\ndgt 2\n").unwrap();
        assert_eq!(mc.acc(), 5);
        mc.execute("mov 567 acc\ndgt 3\n").unwrap();
        assert_eq!(mc.acc(), 0);

        mc.execute("mov 567 acc\ndst 0 9\n").unwrap();
        assert_eq!(mc.acc(), 569);
        mc.execute("mov 567 acc\ndst 1 9\n").unwrap();
        assert_eq!(mc.acc(), 597);
        mc.execute("mov 567 acc\ndst 2 9\n").unwrap();
        assert_eq!(mc.acc(), 967);
        mc.execute("mov 567 acc\ndst 3 9\n").unwrap();
        assert_eq!(mc.acc(), 0);
    }

    #[test]
    fn predicate_flags_persist_until_the_next_test() {
        let mut mc = Microcontroller::new();
        mc.execute("teq acc 2\n+ mov 1 acc\n- mov 3 acc\n").unwrap();
        assert_eq!(mc.acc(), 3);

        let mut mc = Microcontroller::new();
        mc.execute("mov 2 acc\nteq acc 2\n+ mov 1 acc\n- mov 3 acc\n")
            .unwrap();
        assert_eq!(mc.acc(), 1);
    }

    #[test]
    fn jump_loop_runs_to_completion_without_looping_past_the_end() {
        let mut mc = Microcontroller::new();
        mc.execute("a:\nadd 1\nteq acc 5\n- jmp a\n").unwrap();
        assert_eq!(mc.acc(), 5);
    }
}
