//! Plain-text rendering of snapshots and contract rows.

use std::io::{self, Write};

use options_screener_core::ContractRecord;
use options_screener_feed::ChainSnapshot;

/// One contract per line:
/// `TYPE SYMBOL | Strike | Exp | DTE | Δ | Γ | Θ | V | IV`.
///
/// Absent greeks and IV render as `-`.
#[must_use]
pub fn format_row(record: &ContractRecord) -> String {
    format!(
        "{:>4} {} | Strike: {} | Exp: {} | DTE: {} | Δ: {} | Γ: {} | Θ: {} | V: {} | IV: {}",
        record.contract_type.to_string(),
        record.contract_symbol,
        record.strike_price.normalize(),
        record.expiration_date.format("%Y-%m-%d"),
        record.days_to_expiration,
        fixed(record.greeks.delta, 2),
        fixed(record.greeks.gamma, 3),
        fixed(record.greeks.theta, 2),
        fixed(record.greeks.vega, 2),
        fixed(record.implied_volatility, 2),
    )
}

fn fixed(value: Option<f64>, places: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.places$}"))
}

/// Writes the source tag and any notices for a snapshot.
///
/// # Errors
/// Returns error if writing to `out` fails.
pub fn write_header(out: &mut impl Write, snapshot: &ChainSnapshot) -> io::Result<()> {
    writeln!(
        out,
        "{} [{}] {} contracts as of {}",
        snapshot.symbol,
        snapshot.source,
        snapshot.records.len(),
        snapshot.as_of
    )?;
    for notice in &snapshot.notices {
        writeln!(out, "  ! {notice}")?;
    }
    Ok(())
}

/// Writes up to `limit` rows, or a placeholder when there are none.
///
/// # Errors
/// Returns error if writing to `out` fails.
pub fn write_rows<'a>(
    out: &mut impl Write,
    records: impl IntoIterator<Item = &'a ContractRecord>,
    limit: usize,
) -> io::Result<()> {
    let mut written = 0;
    for record in records.into_iter().take(limit) {
        writeln!(out, "{}", format_row(record))?;
        written += 1;
    }
    if written == 0 {
        writeln!(out, "No options found.")?;
    }
    Ok(())
}
