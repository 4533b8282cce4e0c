//! Instruction operands and their resolution against a controller's
//! registers and ports.

use std::fmt;

/// A source operand: either a literal integer or the name of a register or
/// port to read from.
///
/// Which variant a token compiles to is decided once, at compile time, by
/// whether it parses as an integer; resolving a [`Operand::Name`] against a
/// controller's registers and ports happens fresh on every access, since the
/// set of instantiated ports can grow between accesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A literal integer token, e.g. `100`.
    Literal(i64),
    /// A register or port name token, e.g. `acc`, `p0`.
    Name(String),
}

impl Operand {
    /// Compiles a single token into an operand.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.parse::<i64>() {
            Ok(value) => Self::Literal(value),
            Err(_) => Self::Name(token.to_string()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}
