//! Token amounts with their decimal scale.
//!
//! A raw `u64` is ambiguous without the mint's decimals, so the two always
//! travel together. `1_500_000` at 6 decimals is "1.5" whole tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Base units (the smallest indivisible unit of the mint).
    pub amount: u64,
    /// Decimal exponent of the mint.
    pub decimals: u8,
}

impl TokenAmount {
    pub const fn new(amount: u64, decimals: u8) -> Self {
        Self { amount, decimals }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Render the amount as a human-scaled decimal string.
    ///
    /// Trailing fractional zeros are trimmed: `1_500_000 @ 6` -> `"1.5"`,
    /// `1_000_000 @ 6` -> `"1"`.
    pub fn to_ui_string(&self) -> String {
        let digits = self.amount.to_string();
        let decimals = self.decimals as usize;
        if decimals == 0 {
            return digits;
        }

        let padded = if digits.len() <= decimals {
            format!("{}{digits}", "0".repeat(decimals - digits.len() + 1))
        } else {
            digits
        };
        let (whole, frac) = padded.split_at(padded.len() - decimals);
        let frac = frac.trim_end_matches('0');

        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{frac}")
        }
    }

    /// Parse a human-scaled decimal string into base units.
    pub fn parse_ui(text: &str, decimals: u8) -> Result<Self, SolError> {
        let text = text.trim();
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };

        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
            return Err(SolError::InvalidAmount(format!("{text:?} is not a decimal number")));
        }
        if frac.len() > decimals as usize {
            return Err(SolError::InvalidAmount(format!(
                "{text:?} has more than {decimals} fractional digits"
            )));
        }

        let overflow = || SolError::InvalidAmount(format!("{text:?} overflows u64 base units"));
        let scale = 10u64.checked_pow(decimals as u32).ok_or_else(overflow)?;

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_units: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = decimals as usize);
            padded.parse().map_err(|_| overflow())?
        };

        let amount = whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(overflow)?;

        Ok(Self { amount, decimals })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ui_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_string_trims_trailing_zeros() {
        assert_eq!(TokenAmount::new(1_500_000, 6).to_ui_string(), "1.5");
        assert_eq!(TokenAmount::new(1_000_000, 6).to_ui_string(), "1");
    }

    #[test]
    fn ui_string_pads_small_amounts() {
        assert_eq!(TokenAmount::new(5_000, 9).to_ui_string(), "0.000005");
        assert_eq!(TokenAmount::new(1, 6).to_ui_string(), "0.000001");
        assert_eq!(TokenAmount::new(0, 6).to_ui_string(), "0");
    }

    #[test]
    fn ui_string_zero_decimals() {
        assert_eq!(TokenAmount::new(42, 0).to_ui_string(), "42");
    }

    #[test]
    fn ui_string_max_value() {
        assert_eq!(
            TokenAmount::new(u64::MAX, 9).to_ui_string(),
            "18446744073.709551615"
        );
    }

    #[test]
    fn parse_ui_whole_and_fraction() {
        assert_eq!(TokenAmount::parse_ui("1.5", 6).unwrap().amount, 1_500_000);
        assert_eq!(TokenAmount::parse_ui("2", 6).unwrap().amount, 2_000_000);
        assert_eq!(TokenAmount::parse_ui(".25", 2).unwrap().amount, 25);
    }

    #[test]
    fn parse_ui_rejects_excess_precision() {
        assert!(TokenAmount::parse_ui("0.0000001", 6).is_err());
    }

    #[test]
    fn parse_ui_rejects_garbage() {
        assert!(TokenAmount::parse_ui("abc", 6).is_err());
        assert!(TokenAmount::parse_ui("", 6).is_err());
        assert!(TokenAmount::parse_ui("-1", 6).is_err());
    }

    #[test]
    fn parse_ui_rejects_overflow() {
        assert!(TokenAmount::parse_ui("18446744074", 9).is_err());
        assert!(TokenAmount::parse_ui("1", 20).is_err());
    }

    #[test]
    fn ui_string_parses_back() {
        let amount = TokenAmount::new(123_456_789, 6);
        let parsed = TokenAmount::parse_ui(&amount.to_ui_string(), 6).unwrap();
        assert_eq!(parsed, amount);
    }
}
