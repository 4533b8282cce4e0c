//! A deterministic, cycle-accurate simulator for small networks of mcx4
//! microcontrollers.
//!
//! Each [`Microcontroller`] runs its own tiny assembly program against a
//! fixed set of registers and a handful of GPIO/XBUS ports. Linking two
//! controllers' ports together (via [`mcx4_core::Interface::link`]) wires
//! them into a shared circuit; a [`Board`] then steps every controller in
//! lockstep, guaranteeing writes issued during one cycle aren't visible to a
//! peer's read until the next.
//!
//! # Quick Start
//!
//! ```
//! use mcx4::{Board, McConfig};
//!
//! let mut board = Board::new();
//! let idx_a = {
//!     board.add(McConfig::new().name("a").build());
//!     0
//! };
//! let idx_b = {
//!     let mut b = McConfig::new().name("b").build();
//!     let a_port = board.controller_mut(idx_a).unwrap().port("p0").unwrap();
//!     b.port("p0").unwrap().link(&a_port).unwrap();
//!     board.add(b);
//!     1
//! };
//! board.controller_mut(idx_a).unwrap().compile("mov 42 p0\n");
//!
//! board.step().unwrap();
//! board.step().unwrap();
//! assert_eq!(
//!     board.controller_mut(idx_b).unwrap().port("p0").unwrap().read(),
//!     42
//! );
//! ```
//!
//! # A controller standalone
//!
//! A [`Microcontroller`] doesn't need a board at all to run a program and
//! inspect its registers:
//!
//! ```
//! use mcx4::Microcontroller;
//!
//! let mut mc = Microcontroller::new();
//! mc.execute("add 1\nadd 2\nadd 3\n").unwrap();
//! assert_eq!(mc.acc(), 6);
//! ```

pub mod board;
pub mod compiler;
pub mod error;
pub mod instruction;
pub mod io;
pub mod microcontroller;
pub mod operand;
pub mod processor;

pub use board::Board;
pub use compiler::{compile, Program};
pub use error::{McxError, RunError};
pub use instruction::Instruction;
pub use microcontroller::{ControllerModel, McConfig, Microcontroller};
pub use operand::Operand;
pub use processor::{Cpu, TestFlags};

pub use mcx4_core::{ControllerId, Interface, PortError, PortKind, Register};
