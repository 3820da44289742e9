//! Connection ratio value type

use std::fmt;

use serde::{Deserialize, Serialize};

/// A connected/expected pair read from a card, e.g. `65/66`.
///
/// Only the ratio parser builds these, and it only does so when the
/// denominator equals the site's expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRatio {
    /// Currently connected units
    pub numerator: u32,
    /// Expected total units
    pub denominator: u32,
}

impl ExtractedRatio {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Every expected unit is connected
    pub fn fully_connected(&self) -> bool {
        self.numerator == self.denominator
    }

    /// Number of disconnected units (0 when a garbled numerator exceeds the total)
    pub fn deficit(&self) -> u32 {
        self.denominator.saturating_sub(self.numerator)
    }
}

impl fmt::Display for ExtractedRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_connected() {
        assert!(ExtractedRatio::new(66, 66).fully_connected());
        assert!(!ExtractedRatio::new(65, 66).fully_connected());
    }

    #[test]
    fn test_deficit() {
        assert_eq!(ExtractedRatio::new(65, 66).deficit(), 1);
        assert_eq!(ExtractedRatio::new(0, 12).deficit(), 12);
        assert_eq!(ExtractedRatio::new(99, 66).deficit(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExtractedRatio::new(65, 66).to_string(), "65/66");
    }
}
