use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole number of shares in a single order. Always strictly positive;
/// the sign of a ledger entry is carried by the trade side instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, String> {
        if value > 0 {
            Ok(Quantity(value))
        } else {
            Err("Quantity must be positive".to_string())
        }
    }

    /// Parse a form value such as `"5"` or `" 12 "`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("Quantity is not a whole number: {:?}", raw))?;
        Quantity::new(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_new_valid() {
        assert_eq!(Quantity::new(100).unwrap().value(), 100);
    }

    #[test]
    fn test_quantity_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0).unwrap_err(), "Quantity must be positive");
        assert!(Quantity::new(-5).is_err());
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse(" 12 ").unwrap().value(), 12);
        assert!(Quantity::parse("1.5").is_err());
        assert!(Quantity::parse("abc").is_err());
        assert!(Quantity::parse("").is_err());
    }
}
