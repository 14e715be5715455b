use std::fmt;

use crate::errors::{FxError, Result};

/// # CurrencyCode
/// A lowercase, length-3 currency tag (`"usd"`, `"eur"`, ...). Equality is
/// byte-exact; the only validation this crate performs on a currency code is
/// its length after lowercasing (spec Non-goal: no ISO-4217 membership
/// check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Lowercase and validate a currency code. Errors if, after lowercasing,
    /// the input is not exactly 3 ASCII bytes long.
    pub fn parse(raw: &str) -> Result<Self> {
        let lower = raw.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        if bytes.len() != 3 {
            return Err(FxError::InvalidValue(format!(
                "currency code must be exactly 3 characters, got {raw:?}"
            )));
        }
        Ok(CurrencyCode([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("CurrencyCode is always valid ASCII")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a lowercase 6-character pair string into its (domestic, foreign)
/// currency codes. Lowercasing happens here so callers may pass mixed-case
/// pair strings.
pub fn split_pair(pair: &str) -> Result<(CurrencyCode, CurrencyCode)> {
    let lower = pair.to_ascii_lowercase();
    if lower.len() != 6 {
        return Err(FxError::InvalidValue(format!(
            "pair must be exactly 6 characters, got {pair:?}"
        )));
    }
    let dom = CurrencyCode::parse(&lower[0..3])?;
    let for_ = CurrencyCode::parse(&lower[3..6])?;
    Ok((dom, for_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lowercases_input() {
        let c = CurrencyCode::parse("EUR").unwrap();
        assert_eq!(c.as_str(), "eur");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(CurrencyCode::parse("euro").is_err());
    }

    #[test]
    fn split_pair_yields_domestic_and_foreign() {
        let (dom, for_) = split_pair("EURUSD").unwrap();
        assert_eq!(dom.as_str(), "eur");
        assert_eq!(for_.as_str(), "usd");
    }
}
