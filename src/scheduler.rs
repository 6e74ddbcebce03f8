//! Random-post ticker: sweeps every guild on an interval and forwards
//! unprompted takes and rants to the outbound channel.

use crate::Outbound;
use crate::generator::TextGenerator;
use crate::guild::GuildRegistry;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Spawn the ticker. It stops when the outbound receiver is dropped.
pub fn spawn_random_ticker<G: TextGenerator>(
    registry: Arc<GuildRegistry<G>>,
    period: Duration,
    outbound_tx: mpsc::Sender<Outbound>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; posts should wait a full period.
        ticker.tick().await;

        tracing::info!(period_secs = period.as_secs_f64(), "random ticker started");

        loop {
            ticker.tick().await;

            for guild_id in registry.guild_ids().await {
                let Some(outbound) = registry.random_tick(guild_id).await else {
                    continue;
                };

                if outbound_tx.send(outbound).await.is_err() {
                    tracing::debug!("outbound channel closed, stopping random ticker");
                    return;
                }
            }
        }
    })
}
