//! Core primitives shared by every part of an mcx4 simulation: the cycle
//! clock, plain integer registers, and output-buffered ports linked into
//! shared circuits.
//!
//! ```
//! use mcx4_core::{ControllerId, Interface, PortKind};
//!
//! let a = Interface::new(PortKind::Gpio, ControllerId(0), "mc0.p0".to_string());
//! let b = Interface::new(PortKind::Gpio, ControllerId(1), "mc1.p0".to_string());
//! a.link(&b).unwrap();
//! a.write(70);
//! assert_eq!(b.read(), 70);
//! ```

pub mod clock;
pub mod error;
pub mod interface;
pub mod register;

pub use clock::Clock;
pub use error::PortError;
pub use interface::{ControllerId, Interface, PortKind};
pub use register::Register;
