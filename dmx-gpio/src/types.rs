//! Common types for the GPIO layer

/// Digital level of an output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Level for a single data bit (true = high)
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Level::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bit_maps_levels() {
        assert_eq!(Level::from_bit(true), Level::High);
        assert_eq!(Level::from_bit(false), Level::Low);
        assert!(Level::High.is_high());
        assert!(!Level::Low.is_high());
    }
}
