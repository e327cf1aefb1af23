//! Converts raw vendor payloads into [`ContractRecord`]s.
//!
//! Normalization never fails as a whole. Each contract object is mapped
//! independently; one that lacks a required field (or carries an unparsable
//! expiration date) is skipped and recorded in [`NormalizedBatch::skipped`]
//! while its siblings are kept. Optional fields that are missing at any depth
//! become `None`.

use std::str::FromStr;

use chrono::NaiveDate;
use options_screener_core::{days_between, ChainSchema, ContractRecord, ContractType, Greeks};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::schema::{FieldMap, ItemsLayout, MidSource};

/// Why a single contract object was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    MissingContractSymbol,
    MissingContractType,
    MissingStrike,
    MissingExpiration,
    BadExpiration(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "contract entry is not an object"),
            Self::MissingContractSymbol => write!(f, "missing contract symbol"),
            Self::MissingContractType => write!(f, "missing or unknown contract type"),
            Self::MissingStrike => write!(f, "missing strike price"),
            Self::MissingExpiration => write!(f, "missing expiration date"),
            Self::BadExpiration(raw) => write!(f, "unparsable expiration date: {raw}"),
        }
    }
}

/// Output of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<ContractRecord>,
    pub skipped: Vec<SkipReason>,
}

/// Maps payloads of one schema, computing DTE against a fixed date.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    schema: ChainSchema,
    as_of: NaiveDate,
}

impl Normalizer {
    /// `as_of` is the evaluation date every record's DTE is measured from.
    #[must_use]
    pub fn new(schema: ChainSchema, as_of: NaiveDate) -> Self {
        Self { schema, as_of }
    }

    #[must_use]
    pub fn schema(&self) -> ChainSchema {
        self.schema
    }

    #[must_use]
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Normalizes every contract in `payload`.
    ///
    /// `underlying_hint` fills `underlying_symbol` for vendors that do not
    /// repeat it on each contract. A payload without the expected contract
    /// list yields an empty batch.
    #[must_use]
    pub fn normalize(&self, payload: &Value, underlying_hint: Option<&str>) -> NormalizedBatch {
        let map = FieldMap::for_schema(self.schema);
        let mut batch = NormalizedBatch::default();

        let list = match map.layout {
            ItemsLayout::Flat { list } | ItemsLayout::Paired { list, .. } => payload
                .pointer(list)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        };

        for item in list {
            match map.sides() {
                None => self.push(&mut batch, map, item, None, underlying_hint),
                Some(sides) => {
                    if !item.is_object() {
                        batch.skipped.push(SkipReason::NotAnObject);
                        continue;
                    }
                    for (side, contract_type) in sides {
                        match item.pointer(side) {
                            None | Some(Value::Null) => {}
                            Some(contract) => self.push(
                                &mut batch,
                                map,
                                contract,
                                Some(contract_type),
                                underlying_hint,
                            ),
                        }
                    }
                }
            }
        }

        debug!(
            schema = %self.schema,
            as_of = %self.as_of,
            records = batch.records.len(),
            skipped = batch.skipped.len(),
            "Normalized payload"
        );

        batch
    }

    fn push(
        &self,
        batch: &mut NormalizedBatch,
        map: &FieldMap,
        contract: &Value,
        side: Option<ContractType>,
        underlying_hint: Option<&str>,
    ) {
        match self.map_contract(map, contract, side, underlying_hint) {
            Ok(record) => batch.records.push(record),
            Err(reason) => {
                debug!(reason = %reason, "Skipping contract");
                batch.skipped.push(reason);
            }
        }
    }

    fn map_contract(
        &self,
        map: &FieldMap,
        contract: &Value,
        side: Option<ContractType>,
        underlying_hint: Option<&str>,
    ) -> Result<ContractRecord, SkipReason> {
        if !contract.is_object() {
            return Err(SkipReason::NotAnObject);
        }

        let raw_expiry = text(contract, map.expiration_date).ok_or(SkipReason::MissingExpiration)?;
        let expiration_date = NaiveDate::parse_from_str(&raw_expiry, map.date_format)
            .map_err(|_| SkipReason::BadExpiration(raw_expiry.clone()))?;

        let contract_symbol =
            text(contract, map.contract_symbol).ok_or(SkipReason::MissingContractSymbol)?;

        let contract_type = side
            .or_else(|| {
                map.contract_type
                    .and_then(|ptr| text(contract, ptr))
                    .and_then(|raw| ContractType::parse(&raw))
            })
            .ok_or(SkipReason::MissingContractType)?;

        let strike_price = decimal(contract, map.strike_price).ok_or(SkipReason::MissingStrike)?;

        let underlying_symbol = text(contract, map.underlying_symbol)
            .or_else(|| underlying_hint.map(str::to_string))
            .unwrap_or_default();

        let mid_price = match map.mid_price {
            MidSource::Field(ptr) => decimal(contract, ptr),
            MidSource::BidAsk { bid, ask } => decimal(contract, bid)
                .zip(decimal(contract, ask))
                .and_then(|(b, a)| b.checked_add(a))
                .map(|sum| sum / Decimal::TWO),
        };

        Ok(ContractRecord {
            contract_type,
            underlying_symbol,
            contract_symbol,
            strike_price,
            expiration_date,
            days_to_expiration: days_between(self.as_of, expiration_date),
            greeks: Greeks {
                delta: number(contract, map.delta),
                gamma: number(contract, map.gamma),
                theta: number(contract, map.theta),
                vega: number(contract, map.vega),
            },
            implied_volatility: number(contract, map.implied_volatility),
            mid_price,
            open_interest: count(contract, map.open_interest),
            underlying_price: decimal(contract, map.underlying_price),
        })
    }
}

/// Normalizes `payload` in one call. See [`Normalizer::normalize`].
#[must_use]
pub fn normalize(
    payload: &Value,
    schema: ChainSchema,
    as_of: NaiveDate,
    underlying_hint: Option<&str>,
) -> NormalizedBatch {
    Normalizer::new(schema, as_of).normalize(payload, underlying_hint)
}

fn text(value: &Value, ptr: &str) -> Option<String> {
    value
        .pointer(ptr)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(value: &Value, ptr: &str) -> Option<f64> {
    let parsed = match value.pointer(ptr)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn decimal(value: &Value, ptr: &str) -> Option<Decimal> {
    match value.pointer(ptr)? {
        Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn count(value: &Value, ptr: &str) -> Option<u64> {
    match value.pointer(ptr)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
