//! Engine context and control loop.
//!
//! One cycle: ingest pending tickets -> escalation pass -> at most one
//! admin command -> periodic snapshot publish. The loop sleeps a fixed
//! interval between cycles and checks for shutdown only at the cycle
//! boundary, so a write in progress is never interrupted. There is
//! exactly one mutator of the queue; readers coordinate through the
//! atomically-published snapshot files alone.

use crate::config::Config;
use crate::escalate;
use crate::ingest;
use crate::queue::TicketQueue;
use crate::snapshot;
use crate::store::Store;
use anyhow::Result;
use chrono::{DateTime, Utc};
use desk_common::EnginePaths;
use std::time::Duration;
use tracing::{error, info, warn};

/// Owns all mutable engine state; passed to each component by reference.
pub struct Engine {
    config: Config,
    store: Store,
    queue: TicketQueue,
    cycles: u64,
    capacity_warned: bool,
}

impl Engine {
    /// Create the engine: ensure the data directory, then rehydrate the
    /// queue from the durable live store (creating it when missing).
    pub fn new(config: Config, paths: EnginePaths) -> Result<Self> {
        paths.ensure_dirs()?;
        let store = Store::new(paths, config.limits.clone());
        let (queue, summary) = store.load_live(config.queue.capacity, Utc::now())?;
        info!(
            "Queue rehydrated: {} tickets ({} invalid rows skipped)",
            summary.valid, summary.invalid
        );
        Ok(Self {
            config,
            store,
            queue,
            cycles: 0,
            capacity_warned: false,
        })
    }

    pub fn queue(&self) -> &TicketQueue {
        &self.queue
    }

    /// Run one engine cycle. Per-record and per-step failures are logged
    /// and isolated; the cycle always completes.
    pub fn run_cycle(&mut self, now: DateTime<Utc>) {
        if let Err(e) = ingest::process_pending(&mut self.queue, &self.store, &self.config, now) {
            warn!("Ingestion pass failed: {}", e);
        }

        escalate::escalate_queue(
            &mut self.queue,
            now,
            &self.config.escalation,
            &self.store.paths().escalation_log(),
        );

        if let Err(e) = ingest::process_command(&mut self.queue, &self.store, now) {
            warn!("Command execution failed: {}", e);
        }

        if self.cycles % self.config.main_loop.publish_interval_cycles == 0 {
            self.publish(now);
        }

        self.cycles += 1;
        self.check_capacity();

        if self.cycles % self.config.main_loop.stats_interval_cycles == 0 {
            let stats = self.queue.stats(now);
            info!(
                "[status] tickets={} avg_wait={:.1}h oldest={}h critical={} high={} medium={} low={}",
                stats.total,
                stats.avg_wait_hours,
                stats.oldest_hours,
                stats.critical,
                stats.high,
                stats.medium,
                stats.low
            );
        }
    }

    fn publish(&self, now: DateTime<Utc>) {
        if let Err(e) = snapshot::publish(
            &self.queue,
            &self.store,
            self.config.main_loop.customer_history_max,
            now,
        ) {
            // Resource error: skip this publication, keep running.
            warn!("Snapshot publish failed: {}", e);
        }
    }

    /// Warn once each time occupancy crosses the configured threshold.
    fn check_capacity(&mut self) {
        let threshold = self.config.queue.warning_threshold_pct as f64;
        let pct = self.queue.occupancy_pct();
        if pct >= threshold && !self.capacity_warned {
            warn!("Queue at {:.1}% of capacity ({} tickets)", pct, self.queue.len());
            self.capacity_warned = true;
        } else if pct < threshold {
            self.capacity_warned = false;
        }
    }

    /// Main loop: cycle, sleep, repeat until shutdown is requested.
    /// Shutdown is observed only between cycles.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Engine ready: capacity={}, escalation cycle={}h, safety net={}h, sleep={}ms",
            self.config.queue.capacity,
            self.config.escalation.cycle_hours,
            self.config.escalation.safety_net_hours,
            self.config.main_loop.sleep_ms
        );

        // Initial publication so a reader has something to poll at once.
        self.publish(Utc::now());

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let sleep = Duration::from_millis(self.config.main_loop.sleep_ms);

        loop {
            tokio::select! {
                res = &mut shutdown => {
                    if let Err(e) = res {
                        error!("Shutdown signal listener failed: {}", e);
                    }
                    info!("Shutdown signal received - cleaning up");
                    break;
                }
                _ = tokio::time::sleep(sleep) => {
                    self.run_cycle(Utc::now());
                }
            }
        }

        self.shutdown(Utc::now());
        Ok(())
    }

    /// Orderly shutdown: persist the queue, publish a final snapshot,
    /// emit final statistics.
    fn shutdown(&mut self, now: DateTime<Utc>) {
        if let Err(e) = self.store.save_live(&self.queue) {
            error!("Cannot save queue state during shutdown: {}", e);
        }
        self.publish(now);

        let stats = self.queue.stats(now);
        info!(
            "Final statistics: tickets={} avg_wait={:.1}h critical={} high={} medium={} low={}",
            stats.total, stats.avg_wait_hours, stats.critical, stats.high, stats.medium, stats.low
        );
        info!("Cleanup complete. All data saved.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> Config {
        let mut cfg = Config::default();
        cfg.queue.capacity = 10;
        cfg.main_loop.publish_interval_cycles = 2;
        cfg.main_loop.stats_interval_cycles = 1000;
        cfg
    }

    fn engine_at(temp: &TempDir) -> Engine {
        Engine::new(test_config(), EnginePaths::with_root(temp.path())).unwrap()
    }

    #[test]
    fn cycle_runs_full_pipeline() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_at(&temp);
        let paths = EnginePaths::with_root(temp.path());

        fs::write(
            paths.pending_tickets(),
            r#"501,"Ada Lovelace","ada@example.com","Engine","2026-02-01","it crashed""#,
        )
        .unwrap();
        fs::write(paths.admin_commands(), "RESOLVE 501 nadia\n").unwrap();

        engine.run_cycle(Utc::now());

        // Admitted then immediately resolved by the command.
        assert!(engine.queue().is_empty());
        let archive = fs::read_to_string(paths.resolved_archive()).unwrap();
        assert!(archive.lines().skip(1).any(|l| l.starts_with("501,")));
        // First cycle publishes (cycle counter starts at zero).
        assert!(paths.snapshot().exists());
        assert!(paths.status_json().exists());
    }

    #[test]
    fn publish_respects_interval() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_at(&temp);
        let paths = EnginePaths::with_root(temp.path());

        engine.run_cycle(Utc::now()); // cycle 0: publishes
        let first = fs::read_to_string(paths.snapshot()).unwrap();

        fs::write(
            paths.pending_tickets(),
            r#"502,"Bob Byte","bob@example.com","Router","2026-02-02","hello""#,
        )
        .unwrap();
        engine.run_cycle(Utc::now()); // cycle 1: no publish
        let second = fs::read_to_string(paths.snapshot()).unwrap();
        assert_eq!(first, second);

        engine.run_cycle(Utc::now()); // cycle 2: publishes with the ticket
        let third = fs::read_to_string(paths.snapshot()).unwrap();
        assert!(third.contains("#502"));
    }

    #[test]
    fn rehydrates_queue_from_live_store() {
        let temp = TempDir::new().unwrap();
        {
            let mut engine = engine_at(&temp);
            let paths = EnginePaths::with_root(temp.path());
            fs::write(
                paths.pending_tickets(),
                r#"601,"Ada Lovelace","ada@example.com","Engine","2026-02-01","hello""#,
            )
            .unwrap();
            engine.run_cycle(Utc::now());
            assert_eq!(engine.queue().len(), 1);
        }

        // Fresh engine over the same data dir sees the same queue.
        let engine = engine_at(&temp);
        assert_eq!(engine.queue().len(), 1);
        assert_eq!(engine.queue().peek().unwrap().ticket_id, 601);
    }

    #[test]
    fn shutdown_persists_and_publishes() {
        let temp = TempDir::new().unwrap();
        let mut engine = engine_at(&temp);
        let paths = EnginePaths::with_root(temp.path());

        fs::write(
            paths.pending_tickets(),
            r#"701,"Ada Lovelace","ada@example.com","Engine","2026-02-01","hello""#,
        )
        .unwrap();
        engine.run_cycle(Utc::now());

        engine.shutdown(Utc::now());

        let live = fs::read_to_string(paths.live_queue()).unwrap();
        assert!(live.lines().skip(1).any(|l| l.starts_with("701,")));
        let board = fs::read_to_string(paths.snapshot()).unwrap();
        assert!(board.contains("#701"));
    }
}
