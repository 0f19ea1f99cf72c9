//! Token-pair trade fetcher
//!
//! Pulls trade records for an accounting period off Dune Analytics and
//! prints them as strongly-typed trades for downstream accounting.

mod api;
mod fetch;
mod models;
mod queries;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::DuneClient;
use crate::fetch::TradesFetcher;
use crate::models::AccountingPeriod;
use crate::queries::QueryCatalog;

const WETH_TOKEN_ADDRESS: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const USDC_TOKEN_ADDRESS: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

/// Token-pair trade fetcher CLI.
#[derive(Parser)]
#[command(name = "pair-trades")]
#[command(about = "Fetch token-pair trades from Dune for an accounting period", long_about = None)]
struct Cli {
    /// Dune API key
    #[arg(long, env = "DUNE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch trades for a token pair over an accounting period
    Fetch {
        /// First day of the accounting period (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the accounting period (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Buy-side token address
        #[arg(long, default_value = WETH_TOKEN_ADDRESS)]
        buy_token: String,

        /// Sell-side token address
        #[arg(long, default_value = USDC_TOKEN_ADDRESS)]
        sell_token: String,

        /// Resume a previously submitted execution instead of re-running
        #[arg(long)]
        job_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Fetch {
            start,
            end,
            buy_token,
            sell_token,
            job_id,
        } => {
            let period = AccountingPeriod::new(start, end)?;
            info!(%period, buy = %buy_token, sell = %sell_token, "Fetching trades");

            let engine = DuneClient::new(&cli.api_key)?;
            let fetcher = TradesFetcher::new(Box::new(engine), period, QueryCatalog::default());

            let trades = match job_id.as_deref() {
                Some(job_id) => {
                    fetcher
                        .get_trades_for_job(job_id, &buy_token, &sell_token)
                        .await?
                }
                None => fetcher.get_trades(&buy_token, &sell_token).await?,
            };

            for trade in &trades {
                println!("{trade}");
            }
            println!("{} trades fetched for {}", trades.len(), period);
        }
    }

    Ok(())
}
