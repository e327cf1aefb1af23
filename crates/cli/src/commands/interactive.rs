//! `screener interactive`: prompt loop over symbols and targets.
//!
//! Each round asks for a symbol (or `quit`), a target DTE and a target
//! delta, then prints the closest matches. Bad input or a failed round
//! prints `Error: ...` and the loop carries on. Snapshots are cached for the
//! configured TTL so re-screening a symbol with new targets does not refetch.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use options_screener_core::{rank_by_target, RankTarget, ScreenerConfig};
use options_screener_feed::{ChainFetcher, SnapshotCache};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::display;

/// Arguments for the interactive command.
#[derive(Args, Debug, Clone)]
pub struct InteractiveArgs {
    /// Number of matches to show per round
    #[arg(long, default_value = "10")]
    pub top: usize,
}

/// Runs the prompt loop on stdin/stdout until `quit` or end of input.
///
/// # Errors
/// Returns an error if the terminal fails.
pub async fn run_interactive(args: InteractiveArgs, config: &ScreenerConfig) -> Result<()> {
    let fetcher = ChainFetcher::from_config(config);
    let cache = SnapshotCache::from_config(&config.cache);
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    prompt_loop(&fetcher, &cache, input, &mut out, args.top, Local::now().date_naive()).await
}

pub(crate) async fn prompt_loop<R: AsyncBufRead + Unpin>(
    fetcher: &ChainFetcher,
    cache: &SnapshotCache,
    input: R,
    out: &mut impl Write,
    top: usize,
    as_of: NaiveDate,
) -> Result<()> {
    let mut lines = input.lines();
    writeln!(out, "=== Options Screener ===")?;

    loop {
        let Some(symbol) = prompt(&mut lines, out, "Enter stock symbol (or 'quit'): ").await? else {
            break;
        };
        let symbol = symbol.trim().to_uppercase();
        if symbol == "QUIT" {
            break;
        }
        if symbol.is_empty() {
            continue;
        }

        let Some(dte) = prompt(&mut lines, out, "Target DTE (e.g. 45): ").await? else {
            break;
        };
        let Some(delta) = prompt(&mut lines, out, "Target delta (e.g. 0.30): ").await? else {
            break;
        };

        if let Err(e) = screen(fetcher, cache, &symbol, &dte, &delta, out, top, as_of).await {
            tracing::debug!(symbol = %symbol, error = %e, "Screening round failed");
            writeln!(out, "Error: {e:#}\n")?;
        }
    }

    writeln!(out, "Goodbye.")?;
    Ok(())
}

async fn prompt<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    out: &mut impl Write,
    label: &str,
) -> Result<Option<String>> {
    write!(out, "{label}")?;
    out.flush()?;
    Ok(lines.next_line().await?)
}

#[allow(clippy::too_many_arguments)]
async fn screen(
    fetcher: &ChainFetcher,
    cache: &SnapshotCache,
    symbol: &str,
    dte: &str,
    delta: &str,
    out: &mut impl Write,
    top: usize,
    as_of: NaiveDate,
) -> Result<()> {
    let target = RankTarget {
        dte: dte
            .trim()
            .parse()
            .with_context(|| format!("invalid DTE '{}'", dte.trim()))?,
        delta: delta
            .trim()
            .parse()
            .with_context(|| format!("invalid delta '{}'", delta.trim()))?,
    };

    writeln!(out, "\nFetching option chain for {symbol} ...")?;
    let snapshot = fetcher.fetch_cached_as_of(symbol, as_of, cache).await;
    display::write_header(out, &snapshot)?;

    let ranked = rank_by_target(&snapshot.records, &target);
    writeln!(
        out,
        "\nTop matches for {symbol} (DTE≈{}, Δ≈{}):\n",
        target.dte, target.delta
    )?;
    display::write_rows(out, ranked.iter().map(|s| s.record), top)?;
    writeln!(out)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{as_of, contract, fetcher_with};
    use serde_json::json;
    use std::time::Duration;

    async fn run(script: Vec<options_screener_feed::Result<serde_json::Value>>, input: &str) -> String {
        let fetcher = fetcher_with(script);
        let cache = SnapshotCache::new(Duration::from_secs(60));
        let mut out = Vec::new();
        prompt_loop(&fetcher, &cache, input.as_bytes(), &mut out, 10, as_of())
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn chain() -> serde_json::Value {
        json!({ "results": [
            contract("AAPL_A", "call", 45, Some(0.30)),
            contract("AAPL_B", "put", 40, Some(-0.25)),
        ]})
    }

    #[tokio::test]
    async fn test_round_prints_top_matches_then_quits() {
        let text = run(vec![Ok(chain())], "aapl\n45\n0.30\nquit\n").await;

        assert!(text.contains("Fetching option chain for AAPL"));
        assert!(text.contains("Top matches for AAPL (DTE≈45, Δ≈0.3):"));
        let a = text.find("AAPL_A").unwrap();
        let b = text.find("AAPL_B").unwrap();
        assert!(a < b);
        assert!(text.trim_end().ends_with("Goodbye."));
    }

    #[tokio::test]
    async fn test_bad_input_reports_error_and_continues() {
        let text = run(vec![Ok(chain())], "aapl\nsoon\n0.30\naapl\n45\nhigh\nAAPL\n45\n0.3\n").await;

        assert!(text.contains("Error: invalid DTE 'soon'"));
        assert!(text.contains("Error: invalid delta 'high'"));
        assert!(text.contains("AAPL_A"));
    }

    #[tokio::test]
    async fn test_repeat_symbol_served_from_cache() {
        // Only one scripted response: a second fetch would come back unavailable.
        let text = run(vec![Ok(chain())], "aapl\n45\n0.3\naapl\n10\n0.5\nquit\n").await;

        assert_eq!(text.matches("AAPL [live] 2 contracts").count(), 2);
        assert!(!text.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_empty_chain_says_no_options() {
        let text = run(vec![Ok(json!({ "results": [] }))], "zzzz\n30\n0.3\n").await;

        assert!(text.contains("ZZZZ [empty] 0 contracts"));
        assert!(text.contains("No options found."));
    }
}
