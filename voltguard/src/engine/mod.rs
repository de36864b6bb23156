//! Recalculation engine.
//!
//! Change tracking, memoized evaluation, the debounced recalculation
//! scheduler, and the what-if sweep processor.

pub mod listeners;
pub mod memo;
pub mod provider;
pub mod scheduler;
pub mod sweep;
pub mod tracker;

pub use listeners::{ListenerHandle, ListenerRegistry};
pub use memo::{MemoStats, MemoizedEvaluator};
pub use provider::{CircuitDataProvider, InMemoryCircuitStore, ProviderError};
pub use scheduler::{RecalculationEvent, RecalculationPhase, RecalculationScheduler};
pub use sweep::{
    BatchJob, BatchProcessor, BatchReport, BatchResult, SweepError, SweepStrategy,
    MAX_SWEEP_VARIANTS,
};
pub use tracker::{ChangeKind, ChangeRecord, ChangeTracker};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
