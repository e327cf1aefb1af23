//! `screener rank`: closest matches to a target DTE and delta.

use std::io::Write;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;
use options_screener_core::{only_type, rank_by_target, ContractType, RankTarget, ScreenerConfig};
use options_screener_feed::ChainFetcher;

use crate::display;

/// Arguments for the rank command.
#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    /// Underlying symbol(s); repeat the flag to screen several at once
    #[arg(short, long = "symbol", required = true)]
    pub symbols: Vec<String>,

    /// Target days to expiration
    #[arg(long)]
    pub dte: i64,

    /// Target delta magnitude (e.g. 0.30)
    #[arg(long)]
    pub delta: f64,

    /// Only rank calls or puts
    #[arg(long = "type")]
    pub contract_type: Option<ContractType>,

    /// Number of rows to show per symbol
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

/// Runs the rank command against the configured vendor.
///
/// # Errors
/// Returns an error if stdout fails.
pub async fn run_rank(args: RankArgs, config: &ScreenerConfig) -> Result<()> {
    let fetcher = ChainFetcher::from_config(config);
    let mut out = std::io::stdout();
    execute(&fetcher, &args, Local::now().date_naive(), &mut out).await
}

pub(crate) async fn execute(
    fetcher: &ChainFetcher,
    args: &RankArgs,
    as_of: NaiveDate,
    out: &mut impl Write,
) -> Result<()> {
    let symbols: Vec<String> = args.symbols.iter().map(|s| s.trim().to_uppercase()).collect();
    let target = RankTarget {
        dte: args.dte,
        delta: args.delta,
    };

    tracing::debug!(?symbols, dte = target.dte, delta = target.delta, "Ranking");

    for snapshot in fetcher.fetch_many_as_of(symbols.as_slice(), as_of).await {
        let records = match args.contract_type {
            Some(kind) => only_type(&snapshot.records, kind),
            None => snapshot.records.clone(),
        };
        let ranked = rank_by_target(&records, &target);

        display::write_header(out, &snapshot)?;
        writeln!(
            out,
            "Top matches for {} (DTE≈{}, Δ≈{}):",
            snapshot.symbol, target.dte, target.delta
        )?;
        display::write_rows(out, ranked.iter().map(|s| s.record), args.limit)?;
        writeln!(out)?;
    }

    Ok(())
}
