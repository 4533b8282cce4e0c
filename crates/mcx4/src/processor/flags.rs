//! The CPU's persistent predicate flags.

use bitflags::bitflags;

bitflags! {
    /// The plus/minus predicate flags set by the last `test` instruction.
    ///
    /// Unlike a condition-code register tied to a single arithmetic result,
    /// these persist across every instruction between one `test` and the
    /// next, so any number of `+`/`-` predicated instructions can consume
    /// them.
    #[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
    pub struct TestFlags: u8 {
        /// Set when the last test's `+` condition held.
        const PLUS = 0b01;
        /// Set when the last test's `-` condition held.
        const MINUS = 0b10;
    }
}

impl TestFlags {
    /// Builds the flag pair produced by a comparator's `(plus, minus)` result.
    #[must_use]
    pub fn from_result(plus: bool, minus: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::PLUS, plus);
        flags.set(Self::MINUS, minus);
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_result_sets_both_independently() {
        let flags = TestFlags::from_result(true, false);
        assert!(flags.contains(TestFlags::PLUS));
        assert!(!flags.contains(TestFlags::MINUS));
    }
}
