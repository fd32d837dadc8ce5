//! Amount units.
//!
//! Balances and values travel over RPC in wei. Users and the persisted ledger
//! see ether (18 decimals) and gas prices in gwei (9 decimals). All
//! conversions here are exact integer arithmetic.

use std::fmt;

use crate::error::{Result, WalletError};

/// Decimal places of one ether.
pub const ETHER_DECIMALS: u32 = 18;

/// Decimal places of one gwei.
pub const GWEI_DECIMALS: u32 = 9;

/// Wei per ether
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Wei per gwei
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// An amount in the ledger's smallest unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    /// Parse an ether decimal string such as `"1.5"`.
    pub fn from_ether_str(s: &str) -> Result<Self> {
        parse_units(s, ETHER_DECIMALS).map(Wei)
    }

    /// Parse a gwei decimal string such as `"20"` or `"1.000000007"`.
    pub fn from_gwei_str(s: &str) -> Result<Self> {
        parse_units(s, GWEI_DECIMALS).map(Wei)
    }

    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_mul(self, factor: u128) -> Option<Wei> {
        self.0.checked_mul(factor).map(Wei)
    }

    pub fn saturating_add(self, other: Wei) -> Wei {
        Wei(self.0.saturating_add(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Ether string with trailing zeros trimmed, keeping at least one
    /// fractional digit (`"1.0"`, `"0.000021"`).
    pub fn to_ether_string(&self) -> String {
        format_units(self.0, ETHER_DECIMALS)
    }

    /// Gwei string with trailing zeros trimmed.
    pub fn to_gwei_string(&self) -> String {
        format_units(self.0, GWEI_DECIMALS)
    }

    /// Round half-up to `places` ether decimals.
    pub fn round_ether(&self, places: u32) -> Wei {
        if places >= ETHER_DECIMALS {
            return *self;
        }
        let step = 10u128.pow(ETHER_DECIMALS - places);
        let rounded = (self.0 / step)
            .saturating_mul(step)
            .saturating_add(if self.0 % step >= step / 2 { step } else { 0 });
        Wei(rounded)
    }

    /// Ether string with exactly `places` decimals, rounded half-up.
    pub fn to_ether_fixed(&self, places: u32) -> String {
        let places = places.min(ETHER_DECIMALS);
        let rounded = self.round_ether(places).0;
        let whole = rounded / WEI_PER_ETHER;
        if places == 0 {
            return whole.to_string();
        }
        let frac = (rounded % WEI_PER_ETHER) / 10u128.pow(ETHER_DECIMALS - places);
        format!("{}.{:0width$}", whole, frac, width = places as usize)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.to_ether_string())
    }
}

/// Parse a non-negative decimal string into an integer scaled by
/// `10^decimals`.
pub fn parse_units(s: &str, decimals: u32) -> Result<u128> {
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_suffix("ETH")
        .map(str::trim_end)
        .unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(WalletError::InvalidInput("Amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(WalletError::InvalidInput(
            "Amount cannot be negative".to_string(),
        ));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid_amount(s));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid_amount(s));
    }

    // Digits beyond the unit's precision are accepted only when zero
    let significant_frac = if frac.len() > decimals as usize {
        let (kept, dropped) = frac.split_at(decimals as usize);
        if dropped.chars().any(|c| c != '0') {
            return Err(WalletError::InvalidInput(format!(
                "Amount {} has more than {} decimal places",
                s.trim(),
                decimals
            )));
        }
        kept
    } else {
        frac
    };

    let scale = 10u128.pow(decimals);
    let whole_value: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid_amount(s))?
    };

    let frac_value: u128 = if significant_frac.is_empty() {
        0
    } else {
        let digits: u128 = significant_frac.parse().map_err(|_| invalid_amount(s))?;
        digits * 10u128.pow(decimals - significant_frac.len() as u32)
    };

    whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| WalletError::InvalidInput(format!("Amount {} is too large", s.trim())))
}

/// Format an integer scaled by `10^decimals` as a trimmed decimal string.
pub fn format_units(value: u128, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = value / scale;
    let frac = value % scale;

    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    let frac_trimmed = frac_str.trim_end_matches('0');
    if frac_trimmed.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac_trimmed)
    }
}

fn invalid_amount(s: &str) -> WalletError {
    WalletError::InvalidInput(format!("Invalid amount format: {}", s.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether() {
        assert_eq!(Wei::from_ether_str("1").unwrap(), Wei(WEI_PER_ETHER));
        assert_eq!(Wei::from_ether_str("1.0").unwrap(), Wei(WEI_PER_ETHER));
        assert_eq!(Wei::from_ether_str("0.5").unwrap(), Wei(WEI_PER_ETHER / 2));
        assert_eq!(Wei::from_ether_str(".25").unwrap(), Wei(WEI_PER_ETHER / 4));
        assert_eq!(Wei::from_ether_str("30 ETH").unwrap(), Wei(30 * WEI_PER_ETHER));
        assert_eq!(Wei::from_ether_str("0.000000000000000001").unwrap(), Wei(1));
        assert_eq!(Wei::from_ether_str("2.50000000000000000000").unwrap(), Wei(5 * WEI_PER_ETHER / 2));
    }

    #[test]
    fn test_parse_rejects() {
        assert!(Wei::from_ether_str("").is_err());
        assert!(Wei::from_ether_str(".").is_err());
        assert!(Wei::from_ether_str("-1").is_err());
        assert!(Wei::from_ether_str("1.2.3").is_err());
        assert!(Wei::from_ether_str("abc").is_err());
        assert!(Wei::from_ether_str("1e18").is_err());
        assert!(Wei::from_ether_str("0.0000000000000000001").is_err());
        assert!(Wei::from_gwei_str("1.0000000001").is_err());
    }

    #[test]
    fn test_parse_gwei() {
        assert_eq!(Wei::from_gwei_str("20").unwrap(), Wei(20 * WEI_PER_GWEI));
        assert_eq!(Wei::from_gwei_str("1.5").unwrap(), Wei(1_500_000_000));
    }

    #[test]
    fn test_format() {
        assert_eq!(Wei(WEI_PER_ETHER).to_ether_string(), "1.0");
        assert_eq!(Wei(0).to_ether_string(), "0.0");
        assert_eq!(Wei(21_000 * WEI_PER_GWEI).to_ether_string(), "0.000021");
        assert_eq!(Wei(1_500_000_000).to_gwei_string(), "1.5");
        assert_eq!(Wei(5 * WEI_PER_ETHER).to_string(), "5.0 ETH");
    }

    #[test]
    fn test_fixed_rounding() {
        assert_eq!(Wei(WEI_PER_ETHER).to_ether_fixed(8), "1.00000000");
        assert_eq!(Wei(21_000 * WEI_PER_GWEI).to_ether_fixed(8), "0.00002100");
        // 0.000000005 rounds up, 0.0000000049 rounds down
        assert_eq!(Wei(5_000_000_000).to_ether_fixed(8), "0.00000001");
        assert_eq!(Wei(4_900_000_000).to_ether_fixed(8), "0.00000000");
        assert_eq!(Wei(3 * WEI_PER_ETHER / 2).to_ether_fixed(0), "2");
    }
}
