use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::quantity::Quantity;

/// Unit price of a share, in account currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, String> {
        if value <= Decimal::ZERO {
            Err("Price must be positive".to_string())
        } else {
            Ok(Price(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Total cost of `quantity` shares at this price.
    pub fn total_for(&self, quantity: Quantity) -> Result<Decimal, String> {
        self.0
            .checked_mul(Decimal::from(quantity.value()))
            .ok_or_else(|| "Total price overflow".to_string())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_new_valid() {
        let price = Price::new(dec("150.25"));
        assert!(price.is_ok());
        assert_eq!(price.unwrap().value(), dec("150.25"));
    }

    #[test]
    fn test_price_new_negative() {
        let price = Price::new(dec("-10"));
        assert_eq!(price.unwrap_err(), "Price must be positive");
    }

    #[test]
    fn test_price_new_zero() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap_err(), "Price must be positive");
    }

    #[test]
    fn test_total_for_is_exact() {
        let price = Price::new(dec("0.1")).unwrap();
        let qty = Quantity::new(3).unwrap();
        assert_eq!(price.total_for(qty).unwrap(), dec("0.3"));
    }

    #[test]
    fn test_total_for_overflow() {
        let price = Price::new(Decimal::MAX).unwrap();
        let qty = Quantity::new(2).unwrap();
        assert!(price.total_for(qty).is_err());
    }
}
