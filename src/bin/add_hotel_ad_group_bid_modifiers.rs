//! Adds hotel check-in-day and length-of-stay bid modifiers to a hotel ad group.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin add_hotel_ad_group_bid_modifiers -- \
//!     --customer_id 1234567890 --ad_group_id 555 --check_in_criterion_id 60
//! ```
//!
//! Credentials are read from `google-ads.yaml` in the home directory unless
//! `--config` or `GOOGLE_ADS_CONFIGURATION_FILE_PATH` points elsewhere.
//! Set `RUST_LOG=hotel_bid_modifiers=debug` to log requests and responses.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use hotel_bid_modifiers::submitter::{self, BidModifierArgs};
use hotel_bid_modifiers::{GoogleAdsClient, GoogleAdsConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = BidModifierArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let config = GoogleAdsConfig::load_from_storage(args.config.as_deref())?;
    let client = GoogleAdsClient::from_config(config)?;

    let outcome = submitter::run(&client, &args, &mut io::stdout().lock()).await?;
    Ok(ExitCode::from(outcome.exit_code()))
}
