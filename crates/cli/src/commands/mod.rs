//! CLI commands for the options screener.

pub mod filter;
pub mod interactive;
pub mod rank;

pub use filter::{run_filter, FilterArgs};
pub use interactive::{run_interactive, InteractiveArgs};
pub use rank::{run_rank, RankArgs};
