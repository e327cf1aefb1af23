//! Normalized option contract records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option contract type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Call,
    Put,
}

impl ContractType {
    /// Parses a vendor contract type label ("call", "PUT", "c", "p").
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Some(Self::Call),
            "put" | "p" => Some(Self::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

impl std::str::FromStr for ContractType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown contract type: {s}"))
    }
}

/// Greeks as reported upstream. `None` means the vendor did not send the
/// value; it is never coerced to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

/// One option contract in the canonical shape every vendor payload is
/// reduced to.
///
/// Built once per fetch and not mutated afterwards. `days_to_expiration` is
/// computed against the evaluation date captured when the batch was
/// normalized and may be negative for contracts a stale feed still lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_type: ContractType,
    pub underlying_symbol: String,
    pub contract_symbol: String,
    pub strike_price: Decimal,
    pub expiration_date: NaiveDate,
    pub days_to_expiration: i64,
    pub greeks: Greeks,
    pub implied_volatility: Option<f64>,
    pub mid_price: Option<Decimal>,
    pub open_interest: Option<u64>,
    pub underlying_price: Option<Decimal>,
}

impl ContractRecord {
    /// Magnitude of delta, if the vendor reported one.
    #[must_use]
    pub fn abs_delta(&self) -> Option<f64> {
        self.greeks.delta.map(f64::abs)
    }

    /// Human-readable description (e.g., "AAPL 150 CALL 2025-12-19").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {} {} {}",
            self.underlying_symbol, self.strike_price, self.contract_type, self.expiration_date
        )
    }
}

/// Days between `as_of` and `expiration`. Negative once the contract has
/// expired.
#[must_use]
pub fn days_between(as_of: NaiveDate, expiration: NaiveDate) -> i64 {
    (expiration - as_of).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(delta: Option<f64>) -> ContractRecord {
        ContractRecord {
            contract_type: ContractType::Put,
            underlying_symbol: "AAPL".to_string(),
            contract_symbol: "O:AAPL251219P00150000".to_string(),
            strike_price: dec!(150),
            expiration_date: NaiveDate::from_ymd_opt(2025, 12, 19).unwrap(),
            days_to_expiration: 45,
            greeks: Greeks {
                delta,
                ..Greeks::default()
            },
            implied_volatility: None,
            mid_price: None,
            open_interest: None,
            underlying_price: None,
        }
    }

    #[test]
    fn contract_type_parses_vendor_labels() {
        assert_eq!(ContractType::parse("call"), Some(ContractType::Call));
        assert_eq!(ContractType::parse("PUT"), Some(ContractType::Put));
        assert_eq!(ContractType::parse(" c "), Some(ContractType::Call));
        assert_eq!(ContractType::parse("straddle"), None);
        assert!("x".parse::<ContractType>().is_err());
    }

    #[test]
    fn contract_type_display_is_upper_case() {
        assert_eq!(ContractType::Call.to_string(), "CALL");
        assert_eq!(ContractType::Put.to_string(), "PUT");
    }

    #[test]
    fn abs_delta_keeps_absent_as_none() {
        assert_eq!(record(Some(-0.31)).abs_delta(), Some(0.31));
        assert_eq!(record(None).abs_delta(), None);
    }

    #[test]
    fn display_name_format() {
        assert_eq!(record(None).display_name(), "AAPL 150 PUT 2025-12-19");
    }

    #[test]
    fn days_between_can_be_negative() {
        let as_of = NaiveDate::from_ymd_opt(2025, 11, 4).unwrap();
        let expired = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let future = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
        assert_eq!(days_between(as_of, expired), -3);
        assert_eq!(days_between(as_of, future), 45);
    }
}
