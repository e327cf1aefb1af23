//! Vendor field mapping tables.
//!
//! Each supported upstream schema is described by a [`FieldMap`]: where the
//! per-contract objects live in the payload and which JSON pointer holds each
//! canonical field. Supporting another vendor means adding a table here; the
//! normalizer and the ranking engine stay untouched.

use options_screener_core::{ChainSchema, ContractType};

/// Where per-contract objects live inside a payload.
#[derive(Debug, Clone, Copy)]
pub enum ItemsLayout {
    /// A flat array of contract objects.
    Flat { list: &'static str },
    /// An array of strike rows, each holding a call and/or a put object.
    /// The side a contract sits on decides its type.
    Paired {
        list: &'static str,
        call: &'static str,
        put: &'static str,
    },
}

/// How the mid price is obtained.
#[derive(Debug, Clone, Copy)]
pub enum MidSource {
    /// Vendor reports the midpoint directly.
    Field(&'static str),
    /// Average of bid and ask; absent unless both are present.
    BidAsk {
        bid: &'static str,
        ask: &'static str,
    },
}

/// JSON pointers (relative to one contract object) for every canonical
/// field.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub layout: ItemsLayout,
    pub contract_symbol: &'static str,
    /// `None` when the layout already determines the type.
    pub contract_type: Option<&'static str>,
    pub strike_price: &'static str,
    pub expiration_date: &'static str,
    /// `chrono` format string for `expiration_date`.
    pub date_format: &'static str,
    pub delta: &'static str,
    pub gamma: &'static str,
    pub theta: &'static str,
    pub vega: &'static str,
    pub implied_volatility: &'static str,
    pub mid_price: MidSource,
    pub open_interest: &'static str,
    pub underlying_symbol: &'static str,
    pub underlying_price: &'static str,
}

/// Call/put paired chain (`GET /optionchains.json`).
pub const PAIRED_CHAIN: FieldMap = FieldMap {
    layout: ItemsLayout::Paired {
        list: "/optionChainResponse/optionPairs",
        call: "/call",
        put: "/put",
    },
    contract_symbol: "/optionSymbol",
    contract_type: None,
    strike_price: "/strikePrice",
    expiration_date: "/expiryDate",
    date_format: "%m/%d/%Y",
    delta: "/greeks/delta",
    gamma: "/greeks/gamma",
    theta: "/greeks/theta",
    vega: "/greeks/vega",
    implied_volatility: "/greeks/iv",
    mid_price: MidSource::BidAsk {
        bid: "/bid",
        ask: "/ask",
    },
    open_interest: "/openInterest",
    underlying_symbol: "/symbol",
    underlying_price: "/underlyingPrice",
};

/// Flat snapshot list (`GET /v3/snapshot/options/{symbol}`).
pub const SNAPSHOT_LIST: FieldMap = FieldMap {
    layout: ItemsLayout::Flat { list: "/results" },
    contract_symbol: "/details/ticker",
    contract_type: Some("/details/contract_type"),
    strike_price: "/details/strike_price",
    expiration_date: "/details/expiration_date",
    date_format: "%Y-%m-%d",
    delta: "/greeks/delta",
    gamma: "/greeks/gamma",
    theta: "/greeks/theta",
    vega: "/greeks/vega",
    implied_volatility: "/implied_volatility",
    mid_price: MidSource::Field("/last_quote/midpoint"),
    open_interest: "/open_interest",
    underlying_symbol: "/underlying_asset/ticker",
    underlying_price: "/underlying_asset/price",
};

impl FieldMap {
    /// Mapping table for a schema tag.
    #[must_use]
    pub fn for_schema(schema: ChainSchema) -> &'static FieldMap {
        match schema {
            ChainSchema::PairedChain => &PAIRED_CHAIN,
            ChainSchema::SnapshotList => &SNAPSHOT_LIST,
        }
    }

    /// Sides of a paired row, in the order they are emitted.
    #[must_use]
    pub fn sides(&self) -> Option<[(&'static str, ContractType); 2]> {
        match self.layout {
            ItemsLayout::Paired { call, put, .. } => {
                Some([(call, ContractType::Call), (put, ContractType::Put)])
            }
            ItemsLayout::Flat { .. } => None,
        }
    }
}
