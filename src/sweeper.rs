//! Periodic removal of expired reset tokens and blacklist entries.
//!
//! Expiry is enforced lazily by every read, so the sweep only reclaims
//! space. Each delete touches rows already past their expiry and can run
//! alongside live traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use dentra_db::{BlacklistStore, StoreError, TokenStore};
use dentra_observability::track_tokens_swept;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub reset_tokens: u64,
    pub blacklisted_tokens: u64,
}

/// Runs one sweep over both stores. A failure in one store does not stop
/// the other; the first error is returned after both ran.
pub async fn run_sweep_once(
    tokens: &dyn TokenStore,
    blacklist: &dyn BlacklistStore,
) -> Result<SweepReport, StoreError> {
    let reset = tokens.delete_expired().await;
    let revoked = blacklist.delete_expired().await;

    let report = SweepReport {
        reset_tokens: *reset.as_ref().unwrap_or(&0),
        blacklisted_tokens: *revoked.as_ref().unwrap_or(&0),
    };
    track_tokens_swept("reset_tokens", report.reset_tokens);
    track_tokens_swept("blacklisted_tokens", report.blacklisted_tokens);

    reset?;
    revoked?;
    Ok(report)
}

/// Spawns the sweep loop. It ticks every `interval` until `shutdown` turns
/// true or its sender is dropped.
pub fn spawn_expiry_sweeper(
    tokens: Arc<dyn TokenStore>,
    blacklist: Arc<dyn BlacklistStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Expiry sweeper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match run_sweep_once(&*tokens, &*blacklist).await {
                        Ok(report) if report != SweepReport::default() => info!(
                            reset_tokens = report.reset_tokens,
                            blacklisted_tokens = report.blacklisted_tokens,
                            "Expired tokens swept"
                        ),
                        Ok(_) => debug!("Nothing to sweep"),
                        Err(e) => error!(error = %e, "Expiry sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    })
}
