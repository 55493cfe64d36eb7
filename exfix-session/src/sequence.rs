/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Inbound sequence number validation.

use exfix_core::types::SeqNum;

/// Outcome of comparing a received sequence number against the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// Exactly the expected number; process and advance.
    Expected,
    /// Below expected. A duplicate if PossDupFlag is set, fatal otherwise.
    TooLow,
    /// Above expected; messages are missing and must be requested.
    Gap,
}

/// Classifies a received sequence number.
#[inline]
#[must_use]
pub fn validate(expected: SeqNum, received: SeqNum) -> SeqCheck {
    use std::cmp::Ordering;
    match received.cmp(&expected) {
        Ordering::Equal => SeqCheck::Expected,
        Ordering::Less => SeqCheck::TooLow,
        Ordering::Greater => SeqCheck::Gap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let expected = SeqNum::new(3);
        assert_eq!(validate(expected, SeqNum::new(3)), SeqCheck::Expected);
        assert_eq!(validate(expected, SeqNum::new(2)), SeqCheck::TooLow);
        assert_eq!(validate(expected, SeqNum::new(1)), SeqCheck::TooLow);
        assert_eq!(validate(expected, SeqNum::new(4)), SeqCheck::Gap);
        assert_eq!(validate(expected, SeqNum::new(100)), SeqCheck::Gap);
    }
}
