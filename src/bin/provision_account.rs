//! Provision an Orderly account on NEAR
//!
//! Reads the account and secrets from the environment (or `.env`), then:
//! 1. Registers the account with the asset manager if needed
//! 2. Announces the Orderly key (topping up storage first)
//! 3. Generates, stores and registers a trading key
//!
//! Re-running against a provisioned account performs no writes.
//! Pass a YAML path as the first argument to load settings from a file.

use std::path::Path;

use anyhow::Context;
use orderly_near_sdk::config::{self, logging::init_logging, SdkConfig};
use orderly_near_sdk::OrderlySession;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => config::load_config(Path::new(&path))
            .with_context(|| format!("loading {}", path))?,
        None => SdkConfig::from_env().context("loading configuration from environment")?,
    };

    info!("🚀 Provisioning {} on {}", config.account_id, config.network_id);
    info!("   Credentials dir: {}", config.credentials_dir.display());

    let mut session = OrderlySession::open(&config)
        .await
        .context("provisioning failed")?;

    let provisioned = session.provisioned();
    if provisioned.writes.is_empty() {
        info!("✅ Already provisioned, nothing to do");
    } else {
        info!("✅ Provisioned with {} chain write(s):", provisioned.writes.len());
        for write in &provisioned.writes {
            info!("   - {:?}", write);
        }
    }
    info!("   Trading key id: {}", session.trading_key_id());

    let account = session
        .rest()
        .get_account_information()
        .await
        .context("fetching account information")?;
    info!(
        "📋 Account {} | mode {} | tier {} | maker {} | taker {}",
        account.account_id, account.account_mode, account.tier, account.maker_fee_rate, account.taker_fee_rate
    );

    session.close().await?;
    Ok(())
}
