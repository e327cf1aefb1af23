//! `screener filter`: contracts inside a DTE / delta band.

use std::io::Write;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use options_screener_core::{filter_by_threshold, ScreenerConfig, ThresholdFilter};
use options_screener_feed::ChainFetcher;

use crate::display;

/// Arguments for the filter command.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Underlying symbol(s); repeat the flag to screen several at once
    #[arg(short, long = "symbol", required = true)]
    pub symbols: Vec<String>,

    /// Maximum days to expiration (inclusive)
    #[arg(long)]
    pub max_dte: i64,

    /// Minimum delta magnitude (inclusive)
    #[arg(long)]
    pub delta_min: f64,

    /// Maximum delta magnitude (inclusive)
    #[arg(long)]
    pub delta_max: f64,

    /// Number of rows to show per symbol
    #[arg(long, default_value = "50")]
    pub limit: usize,
}

impl FilterArgs {
    fn band(&self) -> Result<ThresholdFilter> {
        if self.delta_min > self.delta_max {
            bail!(
                "--delta-min ({}) must not exceed --delta-max ({})",
                self.delta_min,
                self.delta_max
            );
        }
        Ok(ThresholdFilter {
            max_dte: self.max_dte,
            delta_min: self.delta_min,
            delta_max: self.delta_max,
        })
    }
}

/// Runs the filter command against the configured vendor.
///
/// # Errors
/// Returns an error if the band is inverted or stdout fails.
pub async fn run_filter(args: FilterArgs, config: &ScreenerConfig) -> Result<()> {
    args.band()?;
    let fetcher = ChainFetcher::from_config(config);
    let mut out = std::io::stdout();
    execute(&fetcher, &args, Local::now().date_naive(), &mut out).await
}

pub(crate) async fn execute(
    fetcher: &ChainFetcher,
    args: &FilterArgs,
    as_of: NaiveDate,
    out: &mut impl Write,
) -> Result<()> {
    let band = args.band()?;
    let symbols: Vec<String> = args.symbols.iter().map(|s| s.trim().to_uppercase()).collect();

    for snapshot in fetcher.fetch_many_as_of(symbols.as_slice(), as_of).await {
        let matched = filter_by_threshold(&snapshot.records, &band);

        display::write_header(out, &snapshot)?;
        writeln!(
            out,
            "{} contracts with DTE <= {} and {} <= |Δ| <= {}:",
            matched.len(),
            band.max_dte,
            band.delta_min,
            band.delta_max
        )?;
        display::write_rows(out, matched, args.limit)?;
        writeln!(out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{as_of, contract, fetcher_with};
    use serde_json::json;

    fn args(delta_min: f64, delta_max: f64) -> FilterArgs {
        FilterArgs {
            symbols: vec!["spy".to_string()],
            max_dte: 50,
            delta_min,
            delta_max,
            limit: 50,
        }
    }

    #[tokio::test]
    async fn test_filter_keeps_band_in_input_order() {
        let fetcher = fetcher_with(vec![Ok(json!({ "results": [
            contract("IN_A", "put", 20, Some(-0.40)),
            contract("TOO_FAR", "call", 60, Some(0.30)),
            contract("EDGE", "call", 50, Some(0.10)),
            contract("TOO_DEEP", "call", 10, Some(0.80)),
            contract("NO_DELTA", "call", 10, None),
        ]}))]);
        let mut out = Vec::new();

        execute(&fetcher, &args(0.10, 0.50), as_of(), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("SPY [live] 5 contracts"));
        assert!(text.contains("2 contracts with DTE <= 50"));
        let rows: Vec<&str> = text.lines().filter(|l| l.contains(" | Strike: ")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("IN_A"));
        assert!(rows[1].contains("EDGE"));
    }

    #[tokio::test]
    async fn test_inverted_band_is_rejected() {
        let fetcher = fetcher_with(Vec::new());
        let mut out = Vec::new();

        let err = execute(&fetcher, &args(0.5, 0.1), as_of(), &mut out).await.unwrap_err();
        assert!(err.to_string().contains("--delta-min"));
        assert!(out.is_empty());
    }
}
