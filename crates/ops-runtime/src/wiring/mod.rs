//! # Runtime Loops
//!
//! Drives the sync layer on its intervals: outbound flush + inbound
//! pull, presence heartbeat, expiry sweep, and a periodic status line.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use oc_01_event_log::EventStore;
use oc_04_presence_sync::RemoteChannel;

use crate::container::CoreContext;

/// How often queued events are pushed and remote history pulled.
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// How often the status line is logged.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Run the sync node until ctrl-c.
pub async fn run<S, R>(context: Arc<CoreContext<S, R>>) -> anyhow::Result<()>
where
    S: EventStore + 'static,
    R: RemoteChannel + 'static,
{
    context.sync.connect()?;
    context.sync.start_tracking()?;
    if let Err(error) = context.sync.heartbeat().await {
        warn!(%error, "initial heartbeat failed");
    }

    let heartbeat_every =
        Duration::from_millis(context.config.sync_config().heartbeat_interval_ms);
    let mut flush_timer = tokio::time::interval(FLUSH_INTERVAL);
    let mut heartbeat_timer = tokio::time::interval(heartbeat_every);
    let mut status_timer = tokio::time::interval(STATUS_INTERVAL);

    info!("sync node running");
    loop {
        tokio::select! {
            _ = flush_timer.tick() => {
                let report = context.sync.flush().await;
                if report.failed > 0 {
                    warn!(failed = report.failed, "events exhausted their retry budget");
                }
                match context.sync.pull().await {
                    Ok(report) if report.conflicts > 0 => {
                        warn!(conflicts = report.conflicts, "remote divergence awaiting resolution");
                    }
                    Ok(_) => {}
                    Err(error) => warn!(%error, "pull failed, will retry"),
                }
            }
            _ = heartbeat_timer.tick() => {
                if let Err(error) = context.sync.heartbeat().await {
                    warn!(%error, "heartbeat failed");
                }
                context.sync.sweep_presence();
            }
            _ = status_timer.tick() => {
                info!(status = %context.status_line(), "sync status");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    // Final push attempt so a clean shutdown leaves as little queued as
    // possible; whatever remains is re-queued on the next start.
    let report = context.sync.flush().await;
    info!(synced = report.synced, "final flush complete");
    context.sync.disconnect();
    Ok(())
}
