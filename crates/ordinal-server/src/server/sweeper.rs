//! Periodic reaping of expired reservations.
//!
//! Expiry is also applied lazily whenever a request touches a sequence; the
//! sweep only makes sure idle sequences give their expired indices back to
//! the pool (and show it in `describe`) without waiting for traffic.

use crate::server::{service::config::Engine, telemetry::increment_reservations_reaped};
use core::time::Duration;
use ordinal::SequenceEngineAsyncTokioExt;
use std::sync::Arc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawns the sweep loop. It exits once `shutdown` is cancelled.
pub fn spawn_sweeper(
    engine: Arc<Engine>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    sweep_once(&engine).await;
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Reservation sweeper stopped");
    })
}

/// Runs one sweep and returns how many reservations expired.
async fn sweep_once(engine: &Arc<Engine>) -> usize {
    match engine.reap_all_async().await {
        Ok(report) => {
            increment_reservations_reaped(report.reaped.expired as u64);

            #[cfg(feature = "tracing")]
            {
                if !report.reaped.is_empty() || report.skipped > 0 {
                    tracing::info!(
                        scanned = report.scanned,
                        skipped = report.skipped,
                        expired = report.reaped.expired,
                        reclaimed = report.reaped.reclaimed,
                        "Reservation sweep finished"
                    );
                }
            }
            report.reaped.expired
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::error!("Reservation sweep failed: {}", _e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordinal::{EngineOptions, MemoryStore, SequenceConfigPatch, SequenceEngine, Store};

    fn engine() -> Arc<Engine> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Arc::new(SequenceEngine::with_options(store, EngineOptions::default()))
    }

    fn short_lived() -> SequenceConfigPatch {
        SequenceConfigPatch {
            reclaim_keys: Some(true),
            require_confirm: Some(true),
            confirm_deadline: Some(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sweep_reaps_expired_reservations() {
        let engine = engine();
        engine.init_sequence("s", &short_lived(), None).unwrap();
        engine.init_sequence("idle", &SequenceConfigPatch::default(), None).unwrap();
        engine.next("s").unwrap();
        engine.next("s").unwrap();

        assert_eq!(sweep_once(&engine).await, 0);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(sweep_once(&engine).await, 2);
        assert_eq!(sweep_once(&engine).await, 0);

        let seq = engine.describe("s").unwrap();
        assert!(seq.reserved.is_empty());
        assert_eq!(seq.reclaimed, [0, 1]);
    }

    #[tokio::test]
    async fn background_sweep_returns_indices_to_the_pool() {
        let engine = engine();
        engine.init_sequence("s", &short_lived(), None).unwrap();
        engine.next("s").unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(
            Arc::clone(&engine),
            Duration::from_millis(50),
            shutdown.clone(),
        );
        tokio::time::sleep(Duration::from_millis(1_400)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let seq = engine.describe("s").unwrap();
        assert!(seq.reserved.is_empty());
        assert_eq!(seq.reclaimed, [0]);
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let engine = engine();
        engine
            .init_sequence("s", &SequenceConfigPatch::default(), None)
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(
            Arc::clone(&engine),
            Duration::from_millis(5),
            shutdown.clone(),
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
