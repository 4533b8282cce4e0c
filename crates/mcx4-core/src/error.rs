//! The port-related error family.
//!
//! These mirror the kinds of failure that can occur while naming, linking, or
//! addressing a controller's registers and interfaces. The run-related family
//! (bad labels, unrecognized opcodes) lives in the `mcx4` crate instead, since
//! it only makes sense once a compiled program is being executed.

use thiserror::Error;

/// An error raised while resolving, linking, or addressing a port or register.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    /// A port name didn't parse (unknown type prefix, non-numeric index, or
    /// an index beyond the controller's configured range).
    #[error("{0}")]
    Port(String),

    /// An interface was linked to another interface belonging to the same
    /// controller.
    #[error("port linked to self ({0})")]
    SelfLink(String),

    /// Two interfaces of incompatible kinds (GPIO vs. XBUS) were linked.
    #[error("incompatible interfaces: {0}")]
    Compat(String),

    /// A register name did not resolve to any register on the controller.
    #[error("register not found: {0}")]
    Register(String),
}
