use clap::{Parser, Subcommand};
use options_screener_core::ConfigLoader;

mod commands;
mod display;

use commands::{FilterArgs, InteractiveArgs, RankArgs};

#[derive(Parser)]
#[command(name = "screener")]
#[command(about = "Screen option chains for contracts near a target DTE and delta", long_about = None)]
struct Cli {
    /// Config file path (defaults to config/Screener.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank contracts by closeness to a target DTE and delta
    Rank(RankArgs),
    /// List contracts inside a DTE / delta band
    Filter(FilterArgs),
    /// Prompt for symbols and targets until `quit`
    Interactive(InteractiveArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    tracing::debug!(schema = %config.feed.schema, base_url = %config.feed.base_url, "Loaded config");

    match cli.command {
        Commands::Rank(args) => commands::run_rank(args, &config).await?,
        Commands::Filter(args) => commands::run_filter(args, &config).await?,
        Commands::Interactive(args) => commands::run_interactive(args, &config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use options_screener_core::ContractType;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rank_with_globals() {
        let cli = Cli::try_parse_from([
            "screener", "rank", "--symbol", "AAPL", "--symbol", "MSFT", "--dte", "45", "--delta",
            "0.30", "--type", "put", "--config", "alt.toml",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("alt.toml"));
        match cli.command {
            Commands::Rank(args) => {
                assert_eq!(args.symbols, vec!["AAPL", "MSFT"]);
                assert_eq!(args.dte, 45);
                assert_eq!(args.contract_type, Some(ContractType::Put));
                assert_eq!(args.limit, 10);
            }
            _ => panic!("expected rank"),
        }
    }

    #[test]
    fn test_parse_filter_requires_band() {
        assert!(Cli::try_parse_from(["screener", "filter", "--symbol", "SPY", "--max-dte", "50"]).is_err());

        let cli = Cli::try_parse_from([
            "screener", "filter", "-s", "SPY", "--max-dte", "50", "--delta-min", "0.1",
            "--delta-max", "0.5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Filter(ref a) if a.max_dte == 50));
    }

    #[test]
    fn test_rank_rejects_unknown_type() {
        assert!(Cli::try_parse_from([
            "screener", "rank", "-s", "AAPL", "--dte", "30", "--delta", "0.3", "--type", "straddle",
        ])
        .is_err());
    }
}
