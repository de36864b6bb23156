//! VoltGuard - circuit voltage-drop analysis and recalculation engine
//!
//! This library evaluates electrical circuits for voltage drop, power loss,
//! conductor ampacity, and code compliance, and keeps those results current
//! as circuit properties are edited.
//!
//! # Quick Start
//!
//! ```no_run
//! use voltguard::{CircuitRecord, ConductorMaterial, PhaseConfiguration, VoltGuardCore};
//!
//! let circuit = CircuitRecord::new("LP-1/3")
//!     .with_conductor("12 AWG", ConductorMaterial::Copper, 20.0)
//!     .with_supply(230.0, PhaseConfiguration::Single)
//!     .with_load(20.0, 0.9);
//!
//! let result = VoltGuardCore::default().evaluate_circuit(&circuit).unwrap();
//! println!("{:.2}% drop, {}", result.voltage_drop_percent, result.compliance);
//! for line in &result.recommendations {
//!     println!("- {}", line);
//! }
//! ```
//!
//! # Features
//!
//! - **Calculation**: temperature/harmonic/parallel-set adjusted voltage drop,
//!   derated ampacity, and recommendations
//! - **Recalculation**: change tracking plus a debounced, single-flight
//!   scheduler that keeps a results cache current
//! - **Sweeps**: concurrent what-if runs over conductor sizes or lengths
//! - **Views**: lossless conversion to the flat shapes used by analysis views

pub mod compliance;
pub mod config;
pub mod core;
pub mod engine;
pub mod ucs;

// Re-export main types
pub use crate::core::{
    load_circuits, parse_circuits, CheckReport, CheckStats, CircuitCheck, SizingResult,
    VoltGuardCore, VoltGuardError,
};
pub use compliance::voltage_drop::{
    evaluate, minimum_conductor_size, system_drop_report, CalcError, CalculationResult,
    ComplianceStatus, Evaluator, VoltageDropCalculator,
};
pub use config::{BatchConfig, ConfigError, EngineConfig, SchedulerConfig};
pub use engine::{
    BatchProcessor, BatchReport, BatchResult, ChangeTracker, CircuitDataProvider,
    InMemoryCircuitStore, ListenerHandle, MemoizedEvaluator, RecalculationEvent,
    RecalculationScheduler, SweepError, SweepStrategy, MAX_SWEEP_VARIANTS,
};
pub use ucs::schema::{
    CalculationInputs, CircuitRecord, CircuitType, ConductorMaterial, ConduitMaterial,
    InstallationDefaults, InsulationClass, PhaseConfiguration,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CalculationInputs, CalculationResult, ChangeTracker, CircuitDataProvider, CircuitRecord,
        CircuitType, ConductorMaterial, EngineConfig, Evaluator, PhaseConfiguration,
        RecalculationScheduler, SweepStrategy, VoltGuardCore, VoltGuardError,
    };
}
