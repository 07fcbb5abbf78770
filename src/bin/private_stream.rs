//! Print the authenticated private stream for a provisioned account
//!
//! Subscribes to `executionreport` and `balance`, reconnects when the
//! session errors, and exits cleanly on Ctrl+C.

use anyhow::Context;
use orderly_near_sdk::config::{logging::init_logging, SdkConfig};
use orderly_near_sdk::ws::SessionState;
use orderly_near_sdk::OrderlySession;
use tracing::{error, info, warn};

const TOPICS: [&str; 2] = ["executionreport", "balance"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = SdkConfig::from_env().context("loading configuration from environment")?;
    let mut session = OrderlySession::open(&config)
        .await
        .context("provisioning failed")?;

    let stream = session.stream_mut();
    stream.on_message(|message| {
        info!("📨 {}", message);
    });
    for topic in TOPICS {
        stream.subscribe_topic(topic).await?;
    }

    info!("📡 Connecting to {}", stream.url());
    stream.connect().await.context("private stream authentication failed")?;
    info!("✅ Authenticated, streaming (Ctrl+C to stop)");

    let mut states = stream.state_changes();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("[SHUTDOWN] Ctrl+C received");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                if state == SessionState::Errored {
                    warn!("⚠️  Stream errored, reconnecting");
                    if let Err(e) = session.stream_mut().reconnect().await {
                        error!("❌ Reconnect failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    session.close().await?;
    info!("👋 Stream closed");
    Ok(())
}
