//! Main relay loop orchestration.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::message::OutboundMessage;
use crate::publisher::Broker;
use crate::state::{RelayState, StateStore};
use crate::store::Store;
use chrono::{DateTime, Utc};
use outbox_store::OutboxRecord;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Counters for one polling cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    /// Unsent records fetched this cycle.
    pub fetched: usize,
    /// Records published and marked sent.
    pub published: usize,
    /// Records that failed and stay unsent.
    pub failed: usize,
}

/// What happened when a cycle was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The cycle ran to completion.
    Completed(CycleStats),
    /// A previous cycle was still in flight; nothing was done.
    Skipped,
}

/// Point-in-time view of the relay.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub running: bool,
    pub items_processed: u64,
    pub last_update: Option<DateTime<Utc>>,
}

/// The polling relay.
///
/// Fetches unsent outbox records oldest-first, publishes each to the
/// broker, and marks it sent. The store and broker are injected so either
/// side can be substituted.
///
/// Publish and mark-sent are two separate operations. A crash between
/// them leaves the record unsent, so the next cycle delivers it again:
/// consumers see at-least-once delivery, never silent loss.
pub struct Relay<S: Store, B: Broker> {
    config: RelayConfig,
    store: S,
    broker: B,
    state_store: StateStore,
    state: Mutex<RelayState>,
    running: AtomicBool,
    busy: AtomicBool,
    stopped: AtomicBool,
}

impl<S: Store, B: Broker> Relay<S, B> {
    /// Create a new relay.
    ///
    /// Loads previously persisted progress; a missing or corrupt state
    /// file starts the counters from zero.
    pub fn new(config: RelayConfig, store: S, broker: B, state_store: StateStore) -> Self {
        let state = state_store.load();
        Self {
            config,
            store,
            broker,
            state_store,
            state: Mutex::new(state),
            running: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Run the polling loop until [`stop`](Self::stop) is called.
    ///
    /// The first cycle runs immediately; subsequent cycles fire every
    /// `polling_interval`. Ticks that would overlap a slow cycle are
    /// dropped rather than queued.
    pub async fn run(&self) -> RelayResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            warn!("Relay is stopped and cannot be restarted");
            return Ok(());
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Relay is already running");
            return Ok(());
        }

        info!(
            interval_secs = self.config.polling_interval.as_secs(),
            limit = self.config.polling_limit,
            stream = %self.config.queue_name,
            "Starting outbox relay loop"
        );

        let mut ticker = tokio::time::interval(self.config.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match self.run_cycle().await {
                Ok(CycleOutcome::Completed(stats)) if stats.fetched > 0 => {
                    info!(
                        fetched = stats.fetched,
                        published = stats.published,
                        failed = stats.failed,
                        "Polling cycle complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Polling cycle failed");
                }
            }
        }

        info!("Relay loop exited");
        Ok(())
    }

    /// Run a single polling cycle.
    ///
    /// Cycles never overlap: a call that finds another cycle in flight
    /// returns [`CycleOutcome::Skipped`] without touching the store.
    pub async fn run_cycle(&self) -> RelayResult<CycleOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous polling cycle still running, skipping");
            return Ok(CycleOutcome::Skipped);
        }

        let result = self.cycle_inner().await;
        self.busy.store(false, Ordering::SeqCst);
        result.map(CycleOutcome::Completed)
    }

    async fn cycle_inner(&self) -> RelayResult<CycleStats> {
        let records = self.store.fetch_unsent(self.config.polling_limit).await?;
        if records.is_empty() {
            debug!("No unsent records");
            return Ok(CycleStats::default());
        }

        debug!(count = records.len(), "Fetched unsent records");

        let mut stats = CycleStats {
            fetched: records.len(),
            ..Default::default()
        };
        let mut broker_degraded = false;

        for record in &records {
            match self.process_record(record).await {
                Ok(()) => {
                    stats.published += 1;
                    self.note_processed();
                }
                Err(e) => {
                    stats.failed += 1;
                    if matches!(e, RelayError::Redis(_) | RelayError::Timeout(_)) {
                        broker_degraded = true;
                    }
                }
            }
        }

        if broker_degraded {
            if let Err(e) = self.broker.reconnect().await {
                error!(error = %e, "Failed to reconnect to broker");
            }
        }

        Ok(stats)
    }

    /// Relay one record: encode, publish, mark sent.
    async fn process_record(&self, record: &OutboxRecord) -> RelayResult<()> {
        let payload = match OutboundMessage::from_record(record).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!(record_id = %record.id, error = %e, "Failed to encode outbound message");
                return Err(e);
            }
        };

        let timeout_secs = self.config.op_timeout.as_secs();
        match tokio::time::timeout(self.config.op_timeout, self.broker.publish(&payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(record_id = %record.id, error = %e, "Failed to publish record, leaving unsent");
                return Err(e);
            }
            Err(_) => {
                warn!(record_id = %record.id, timeout_secs, "Publish timed out, leaving record unsent");
                return Err(RelayError::Timeout(timeout_secs));
            }
        }

        if let Err(e) = self.store.mark_sent(&record.id).await {
            warn!(
                record_id = %record.id,
                error = %e,
                "Record published but not marked sent, it may be delivered again"
            );
            return Err(e);
        }

        debug!(record_id = %record.id, "Record relayed");
        Ok(())
    }

    fn note_processed(&self) {
        let snapshot = {
            let mut state = self.state.lock().expect("state lock poisoned");
            state.items_processed += 1;
            state.last_update = Some(Utc::now());
            state.clone()
        };

        if let Err(e) = self.state_store.save(&snapshot) {
            warn!(error = %e, "Failed to persist relay state");
        }
    }

    /// Stop the relay.
    ///
    /// Ends the polling loop, persists the final state, and closes the
    /// broker connection. Best-effort: cleanup failures are logged rather
    /// than returned. Cleanup runs once; repeated calls are no-ops, and a
    /// stopped relay cannot be restarted.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Relay already stopped");
            return;
        }

        let snapshot = self.state.lock().expect("state lock poisoned").clone();
        if let Err(e) = self.state_store.save(&snapshot) {
            warn!(error = %e, "Failed to persist relay state during shutdown");
        }

        if let Err(e) = self.broker.close().await {
            warn!(error = %e, "Failed to close broker connection");
        }

        info!(items_processed = snapshot.items_processed, "Relay stopped");
    }

    /// Current status snapshot.
    pub fn status(&self) -> RelayStatus {
        let state = self.state.lock().expect("state lock poisoned").clone();
        RelayStatus {
            running: self.running.load(Ordering::SeqCst),
            items_processed: state.items_processed,
            last_update: state.last_update,
        }
    }

    /// Whether the relay loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
