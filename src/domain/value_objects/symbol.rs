use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SYMBOL_LEN: usize = 10;

/// Ticker symbol, normalized to upper case (`"aapl"` becomes `"AAPL"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err("Symbol must not be empty".to_string());
        }
        if normalized.len() > MAX_SYMBOL_LEN {
            return Err(format!(
                "Symbol too long: {} characters (max {})",
                normalized.len(),
                MAX_SYMBOL_LEN
            ));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(format!("Symbol contains invalid characters: {:?}", raw));
        }
        Ok(Symbol(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
