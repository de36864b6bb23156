//! End-to-end tests for change tracking, scheduled recalculation, and sweeps

use std::sync::{Arc, Mutex};
use std::time::Duration;

use voltguard::engine::{RecalculationPhase, SweepStrategy};
use voltguard::prelude::*;
use voltguard::{
    BatchConfig, BatchProcessor, InMemoryCircuitStore, MemoizedEvaluator, SchedulerConfig,
};

fn branch(id: &str, length_m: f64) -> CircuitRecord {
    CircuitRecord::new(id)
        .with_conductor("12 AWG", ConductorMaterial::Copper, length_m)
        .with_supply(230.0, PhaseConfiguration::Single)
        .with_load(20.0, 0.9)
}

/// Store wired to a tracker, and a scheduler listening to that tracker
struct Rig {
    store: Arc<InMemoryCircuitStore>,
    scheduler: RecalculationScheduler,
    events: Arc<Mutex<Vec<(RecalculationPhase, Vec<String>)>>>,
    _tracker: Arc<ChangeTracker>,
}

fn rig() -> Rig {
    let tracker = Arc::new(ChangeTracker::new());
    let store = Arc::new(InMemoryCircuitStore::with_tracker(tracker.clone()));
    let scheduler = RecalculationScheduler::new(store.clone());
    scheduler.attach(&tracker);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    scheduler.add_recalculation_listener(move |e| {
        sink.lock().unwrap().push((e.phase, e.circuit_ids.clone()));
    });

    Rig {
        store,
        scheduler,
        events,
        _tracker: tracker,
    }
}

#[tokio::test(start_paused = true)]
async fn test_edit_burst_recalculates_once() {
    let rig = rig();

    for (i, length) in [10.0, 12.0, 14.0, 16.0].into_iter().enumerate() {
        rig.store.upsert(branch("A", length)).await;
        rig.store.upsert(branch(&format!("B{}", i), 20.0)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    let events = rig.events.lock().unwrap().clone();
    assert_eq!(events.len(), 2, "expected one started/completed pair: {:?}", events);
    assert_eq!(events[0].0, RecalculationPhase::Started);
    assert_eq!(events[1].1, vec!["A", "B0", "B1", "B2", "B3"]);

    // Cached result reflects the last edit
    let result = rig.scheduler.get_cached_result("A").unwrap();
    let expected = VoltGuardCore::default()
        .evaluate_circuit(&branch("A", 16.0))
        .unwrap();
    assert_eq!(result, expected);
}

#[tokio::test(start_paused = true)]
async fn test_disable_after_three_edits() {
    let rig = rig();

    rig.store.upsert(branch("A", 10.0)).await;
    rig.store.upsert(branch("A", 11.0)).await;
    rig.store.upsert(branch("A", 12.0)).await;
    assert!(rig.scheduler.is_circuit_pending_recalculation("A"));

    rig.scheduler.set_enabled(false);
    assert!(!rig.scheduler.is_circuit_pending_recalculation("A"));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rig.events.lock().unwrap().is_empty());
    assert!(rig.scheduler.get_cached_result("A").is_none());
    assert!(!rig.scheduler.is_recalculation_in_progress());

    // Re-enabling does not replay the dropped edits
    rig.scheduler.set_enabled(true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rig.events.lock().unwrap().is_empty());
    assert!(rig.scheduler.get_cached_result("A").is_none());

    // The next edit is scheduled normally
    rig.store.upsert(branch("A", 13.0)).await;
    assert!(rig.scheduler.is_circuit_pending_recalculation("A"));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let events = rig.events.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].1, vec!["A"]);
    let expected = VoltGuardCore::default()
        .evaluate_circuit(&branch("A", 13.0))
        .unwrap();
    assert_eq!(rig.scheduler.get_cached_result("A"), Some(expected));
}

#[tokio::test(start_paused = true)]
async fn test_removed_circuit_keeps_stale_result() {
    let rig = rig();

    rig.store.upsert(branch("A", 10.0)).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    let before = rig.scheduler.get_cached_result("A").unwrap();

    rig.store.remove("A").await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The removal triggered a pass, the lookup missed, nothing was overwritten
    let events = rig.events.lock().unwrap().clone();
    assert_eq!(events.len(), 4);
    assert!(events[3].1.is_empty());
    assert_eq!(rig.scheduler.get_cached_result("A"), Some(before));
}

#[tokio::test(start_paused = true)]
async fn test_custom_debounce_and_chunking() {
    let store = Arc::new(InMemoryCircuitStore::new());
    for i in 0..7 {
        store.upsert(branch(&format!("C{}", i), 10.0 + i as f64)).await;
    }
    let scheduler = RecalculationScheduler::with_evaluator(
        store,
        Arc::new(MemoizedEvaluator::default()),
        SchedulerConfig {
            debounce_ms: 50,
            chunk_size: 2,
            event_capacity: 8,
        },
        Default::default(),
    );
    let mut rx = scheduler.subscribe();

    scheduler.request_batch_recalculation((0..7).map(|i| format!("C{}", i)));
    tokio::time::sleep(Duration::from_millis(49)).await;
    assert_eq!(scheduler.pending_count(), 7);

    let started = rx.recv().await.unwrap();
    let completed = rx.recv().await.unwrap();
    assert_eq!(started.circuit_ids.len(), 7);
    assert_eq!(completed.results.len(), 7);
    assert_eq!(scheduler.cached_circuit_ids().len(), 7);
}

#[tokio::test]
async fn test_sweep_is_complete_and_ordered() {
    let base = CalculationInputs::from_record(branch("S", 40.0), &Default::default());
    let processor = BatchProcessor::new(
        Arc::new(MemoizedEvaluator::default()),
        &BatchConfig { max_concurrency: 3 },
    );

    let mut seen = 0;
    let report = processor
        .sweep(
            &base,
            &SweepStrategy::LengthRange {
                start_m: 10.0,
                end_m: 100.0,
                steps: 10,
            },
            |done, total| {
                assert!(done <= total);
                seen = done;
            },
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(seen, 10);
    assert_eq!(report.results.len(), 10);
    assert!(report.failed_job_ids.is_empty());
    let first_drop = report.results[0].result.voltage_drop_v;
    for (i, r) in report.results.iter().enumerate() {
        assert_eq!(r.job_id, i);
        assert!((r.result.voltage_drop_v - first_drop * (1.0 + i as f64)).abs() < 1e-9);
    }
    // Drop grows with length, so only the short runs comply
    assert_eq!(report.best_compliant.map(|b| b.job_id), Some(0));
}
