//! Recalculation Scheduler
//!
//! Collects circuit ids that need recomputation, waits for edits to settle,
//! then runs a pass over everything pending:
//!
//! 1. Every request adds ids to the pending set and restarts the debounce
//!    timer, so a burst of edits collapses into one pass.
//! 2. Only one pass runs at a time. Requests that arrive during a pass are
//!    picked up by a follow-up pass as soon as the current one finishes.
//! 3. A pass takes the whole pending set, emits `started`, evaluates the ids
//!    in chunks (yielding between chunks), caches each result, and emits
//!    `completed` with the ids it produced results for.
//!
//! Per-circuit failures are logged and skipped. Disabling the scheduler
//! drops pending work and the scheduled timer; a pass already running
//! finishes and still caches its results.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::listeners::{ListenerHandle, ListenerRegistry};
use super::lock;
use super::memo::MemoizedEvaluator;
use super::provider::CircuitDataProvider;
use super::tracker::ChangeTracker;
use crate::compliance::voltage_drop::{CalculationResult, Evaluator, VoltageDropCalculator};
use crate::config::{EngineConfig, SchedulerConfig};
use crate::ucs::schema::{CalculationInputs, InstallationDefaults};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecalculationPhase {
    Started,
    Completed,
}

/// Lifecycle event for one recalculation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculationEvent {
    pub pass_id: Uuid,
    pub phase: RecalculationPhase,
    /// `started`: ids scheduled for the pass.
    /// `completed`: ids that received a new result, in processing order.
    pub circuit_ids: Vec<String>,
    /// New results, parallel to `circuit_ids`. Empty for `started`.
    pub results: Vec<CalculationResult>,
    pub timestamp: DateTime<Utc>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecalculationEvent {
    fn started(pass_id: Uuid, circuit_ids: Vec<String>) -> Self {
        Self {
            pass_id,
            phase: RecalculationPhase::Started,
            circuit_ids,
            results: Vec::new(),
            timestamp: Utc::now(),
            completed: false,
            error: None,
        }
    }

    fn completed(
        pass_id: Uuid,
        processed: Vec<(String, CalculationResult)>,
        error: Option<String>,
    ) -> Self {
        let (circuit_ids, results): (Vec<String>, Vec<CalculationResult>) =
            processed.into_iter().unzip();
        Self {
            pass_id,
            phase: RecalculationPhase::Completed,
            circuit_ids,
            results,
            timestamp: Utc::now(),
            completed: true,
            error,
        }
    }
}

#[derive(Default)]
struct SchedulerState {
    pending: BTreeSet<String>,
    enabled: bool,
    in_progress: bool,
    debounce: Option<JoinHandle<()>>,
    /// Bumped whenever the debounce timer is replaced or cancelled, so a
    /// timer that already woke up can tell it was superseded.
    generation: u64,
}

struct SchedulerInner {
    provider: Arc<dyn CircuitDataProvider>,
    evaluator: Arc<dyn Evaluator>,
    defaults: InstallationDefaults,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    cache: Mutex<HashMap<String, CalculationResult>>,
    listeners: ListenerRegistry<RecalculationEvent>,
    events: broadcast::Sender<RecalculationEvent>,
    runtime: Option<Handle>,
}

/// Debounced, single-flight recalculation driver.
///
/// Cloning is cheap; clones share the same pending set, cache, and
/// listeners.
#[derive(Clone)]
pub struct RecalculationScheduler {
    inner: Arc<SchedulerInner>,
}

impl RecalculationScheduler {
    /// Scheduler with default settings and a memoized default calculator
    pub fn new(provider: Arc<dyn CircuitDataProvider>) -> Self {
        Self::with_evaluator(
            provider,
            Arc::new(MemoizedEvaluator::default()),
            SchedulerConfig::default(),
            InstallationDefaults::default(),
        )
    }

    /// Scheduler configured from an [`EngineConfig`]
    pub fn from_config(provider: Arc<dyn CircuitDataProvider>, config: &EngineConfig) -> Self {
        let calculator = VoltageDropCalculator::with_config(config.calculator.clone());
        Self::with_evaluator(
            provider,
            Arc::new(MemoizedEvaluator::new(Arc::new(calculator))),
            config.scheduler.clone(),
            config.defaults.clone(),
        )
    }

    pub fn with_evaluator(
        provider: Arc<dyn CircuitDataProvider>,
        evaluator: Arc<dyn Evaluator>,
        config: SchedulerConfig,
        defaults: InstallationDefaults,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(SchedulerInner {
                provider,
                evaluator,
                defaults,
                config,
                state: Mutex::new(SchedulerState {
                    enabled: true,
                    ..SchedulerState::default()
                }),
                cache: Mutex::new(HashMap::new()),
                listeners: ListenerRegistry::new(),
                events,
                runtime: Handle::try_current().ok(),
            }),
        }
    }

    /// Mark one circuit dirty
    pub fn request_recalculation(&self, circuit_id: impl Into<String>) {
        self.request_batch_recalculation([circuit_id.into()]);
    }

    /// Mark several circuits dirty. Ids already pending are not duplicated.
    pub fn request_batch_recalculation<I, S>(&self, circuit_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = lock(&self.inner.state);
        if !state.enabled {
            return;
        }

        let mut added = false;
        for id in circuit_ids {
            state.pending.insert(id.into());
            added = true;
        }
        if added {
            self.inner.restart_debounce(&mut state);
        }
    }

    /// Enable or disable automatic recalculation.
    ///
    /// Disabling clears pending ids and cancels the scheduled pass. Cached
    /// results and an in-flight pass are left alone.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = lock(&self.inner.state);
        state.enabled = enabled;
        if !enabled {
            let dropped = state.pending.len();
            state.pending.clear();
            state.generation += 1;
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
            info!("Recalculation disabled, dropped {} pending circuit(s)", dropped);
        }
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.inner.state).enabled
    }

    /// Register a callback for pass lifecycle events
    pub fn add_recalculation_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&RecalculationEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(listener)
    }

    /// Receive pass lifecycle events on a channel
    pub fn subscribe(&self) -> broadcast::Receiver<RecalculationEvent> {
        self.inner.events.subscribe()
    }

    /// Feed every change the tracker records into this scheduler
    pub fn attach(&self, tracker: &ChangeTracker) -> ListenerHandle {
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        tracker.add_listener(move |change| {
            if let Some(inner) = weak.upgrade() {
                RecalculationScheduler { inner }
                    .request_recalculation(change.circuit_id.clone());
            }
        })
    }

    /// Most recent result for a circuit, possibly stale while a pass runs
    pub fn get_cached_result(&self, circuit_id: &str) -> Option<CalculationResult> {
        lock(&self.inner.cache).get(circuit_id).cloned()
    }

    pub fn cached_circuit_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.inner.cache).keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_circuit_pending_recalculation(&self, circuit_id: &str) -> bool {
        lock(&self.inner.state).pending.contains(circuit_id)
    }

    pub fn is_recalculation_in_progress(&self) -> bool {
        lock(&self.inner.state).in_progress
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.inner.state).pending.len()
    }
}

/// `completed` event for a finished pass.
///
/// Per-id work runs in its own tasks, so `outcome` is only an error when the
/// chunk loop itself panics or is cancelled. Results cached before that point
/// are still reported alongside the error.
fn pass_completed(
    pass_id: Uuid,
    started: Instant,
    processed: Vec<(String, CalculationResult)>,
    outcome: Result<(), JoinError>,
) -> RecalculationEvent {
    let error = match outcome {
        Ok(()) => {
            info!(
                "Recalculation pass {} completed: {} result(s) in {:?}",
                pass_id,
                processed.len(),
                started.elapsed()
            );
            None
        }
        Err(e) => {
            error!(
                "Recalculation pass {} failed after {} result(s): {}",
                pass_id,
                processed.len(),
                e
            );
            Some(format!("Recalculation pass failed: {}", e))
        }
    };
    RecalculationEvent::completed(pass_id, processed, error)
}

impl SchedulerInner {
    fn restart_debounce(self: &Arc<Self>, state: &mut SchedulerState) {
        if let Some(timer) = state.debounce.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        let runtime = match Handle::try_current().ok().or_else(|| self.runtime.clone()) {
            Some(handle) => handle,
            None => {
                warn!(
                    "No tokio runtime available; {} circuit(s) stay pending",
                    state.pending.len()
                );
                return;
            }
        };

        let inner = Arc::clone(self);
        let delay = self.config.debounce();
        state.debounce = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.on_debounce_elapsed(generation);
        }));
    }

    fn on_debounce_elapsed(self: &Arc<Self>, generation: u64) {
        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                return;
            }
            state.debounce = None;
            // A running pass drains the pending set itself when it finishes
            if !state.enabled || state.in_progress || state.pending.is_empty() {
                return;
            }
            state.in_progress = true;
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.drive().await });
    }

    /// Run passes until nothing is pending. Only one driver exists at a time.
    async fn drive(self: Arc<Self>) {
        loop {
            let ids: Vec<String> = {
                let mut state = lock(&self.state);
                if !state.enabled || state.pending.is_empty() {
                    state.in_progress = false;
                    return;
                }
                std::mem::take(&mut state.pending).into_iter().collect()
            };
            self.run_pass(ids).await;
        }
    }

    async fn run_pass(self: &Arc<Self>, ids: Vec<String>) {
        let pass_id = Uuid::new_v4();
        let started = Instant::now();
        info!("Recalculation pass {} started for {} circuit(s)", pass_id, ids.len());
        self.emit(RecalculationEvent::started(pass_id, ids.clone()));

        // Results land here as chunks finish, so a pass that dies midway
        // still reports what it already cached.
        let processed = Arc::new(Mutex::new(Vec::with_capacity(ids.len())));
        let work = tokio::spawn(Arc::clone(self).process(ids, Arc::clone(&processed)));
        let outcome = work.await;
        let processed = std::mem::take(&mut *lock(&processed));
        self.emit(pass_completed(pass_id, started, processed, outcome));
    }

    async fn process(
        self: Arc<Self>,
        ids: Vec<String>,
        processed: Arc<Mutex<Vec<(String, CalculationResult)>>>,
    ) {
        let chunk_size = self.config.chunk_size.max(1);

        for (index, chunk) in ids.chunks(chunk_size).enumerate() {
            if index > 0 {
                tokio::task::yield_now().await;
            }

            let tasks = chunk.iter().map(|id| {
                let inner = Arc::clone(&self);
                let id = id.clone();
                tokio::spawn(async move { inner.recalculate_one(&id).await })
            });
            let outcomes = join_all(tasks).await;

            for (id, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(Some(result)) => {
                        lock(&self.cache).insert(id.clone(), result.clone());
                        lock(&processed).push((id.clone(), result));
                    }
                    Ok(None) => {}
                    Err(e) => error!("Recalculation task for circuit {} failed: {}", id, e),
                }
            }
        }
    }

    async fn recalculate_one(&self, circuit_id: &str) -> Option<CalculationResult> {
        let record = match self.provider.lookup(circuit_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Circuit {} no longer exists, skipping", circuit_id);
                return None;
            }
            Err(e) => {
                warn!("Failed to load circuit {}: {}", circuit_id, e);
                return None;
            }
        };

        let inputs = CalculationInputs::from_record(record, &self.defaults);
        match self.evaluator.evaluate(&inputs) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Failed to evaluate circuit {}: {}", circuit_id, e);
                None
            }
        }
    }

    fn emit(&self, event: RecalculationEvent) {
        self.listeners.notify(&event);
        // No receivers is fine
        let _ = self.events.send(event);
    }
}
