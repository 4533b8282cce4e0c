//! The run-related error family, plus the umbrella error type returned by
//! compiling and executing mcx4 programs.

use mcx4_core::PortError;
use thiserror::Error;

/// An error raised while executing a compiled program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A `jmp` target a label table has no entry for.
    #[error("label not found: {0}")]
    Label(String),

    /// An opcode that exec_inst has no handler for, or a `t<cmp>` suffix
    /// that isn't a known comparator.
    #[error("invalid instruction: {0}")]
    Command(String),
}

/// Any error that can surface while resolving operands, linking ports, or
/// running a program on an mcx4 controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum McxError {
    /// A port- or register-related failure. See [`PortError`].
    #[error(transparent)]
    Port(#[from] PortError),

    /// A run-related failure. See [`RunError`].
    #[error(transparent)]
    Run(#[from] RunError),
}
