//! Core entry points shared by the CLI and embedding hosts.
//! No runtime state beyond configuration.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compliance::voltage_drop::{
    system_drop_report, CalcError, CalculationResult, SystemDropReport, VoltageDropCalculator,
};
use crate::config::{ConfigError, EngineConfig};
use crate::engine::provider::ProviderError;
use crate::engine::sweep::{BatchProcessor, BatchReport, BatchResult, SweepError, SweepStrategy};
use crate::ucs::adapters::AdapterError;
use crate::ucs::schema::{CalculationInputs, CircuitRecord};

#[derive(Debug, thiserror::Error)]
pub enum VoltGuardError {
    #[error("Calculation error: {0}")]
    Calc(#[from] CalcError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Sweep error: {0}")]
    Sweep(#[from] SweepError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Outcome of evaluating one circuit in a check run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitCheck {
    pub circuit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CalculationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub total: usize,
    pub compliant: usize,
    pub non_compliant: usize,
    /// Evaluated circuits whose derated ampacity is below the comparison current
    pub ampacity_inadequate: usize,
    pub failed: usize,
}

/// Result of checking a set of circuits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub circuits: Vec<CircuitCheck>,
    pub stats: CheckStats,
}

impl CheckReport {
    /// Any circuit non-compliant, ampacity-inadequate, or not evaluable
    pub fn has_problems(&self) -> bool {
        self.stats.non_compliant > 0 || self.stats.ampacity_inadequate > 0 || self.stats.failed > 0
    }

    pub fn results(&self) -> impl Iterator<Item = &CalculationResult> {
        self.circuits.iter().filter_map(|c| c.result.as_ref())
    }
}

fn checks_to_stats(checks: &[CircuitCheck]) -> CheckStats {
    let mut stats = CheckStats {
        total: checks.len(),
        ..CheckStats::default()
    };
    for check in checks {
        match &check.result {
            Some(result) => {
                if result.is_compliant() {
                    stats.compliant += 1;
                } else {
                    stats.non_compliant += 1;
                }
                if !result.wire_rating.is_adequate {
                    stats.ampacity_inadequate += 1;
                }
            }
            None => stats.failed += 1,
        }
    }
    stats
}

/// Minimum-size search outcome for one circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingResult {
    pub circuit_id: String,
    pub current_size: String,
    pub recommended_size: String,
    /// Evaluation at the recommended size
    pub result: CalculationResult,
}

impl SizingResult {
    pub fn needs_change(&self) -> bool {
        self.current_size != self.recommended_size
    }
}

/// Read circuit records from a JSON file.
///
/// Accepts a single record, an array of records, or `{ "circuits": [...] }`.
pub fn load_circuits(path: &Path) -> Result<Vec<CircuitRecord>, VoltGuardError> {
    let content = std::fs::read_to_string(path)?;
    parse_circuits(&content)
        .map_err(|e| VoltGuardError::Parse(format!("{}: {}", path.display(), e)))
}

/// Parse circuit records from JSON text (same shapes as [`load_circuits`])
pub fn parse_circuits(json: &str) -> Result<Vec<CircuitRecord>, serde_json::Error> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(_) => serde_json::from_value(value),
        Value::Object(mut map) if map.contains_key("circuits") => {
            serde_json::from_value(map.remove("circuits").unwrap_or(Value::Null))
        }
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

/// Core calculation API used by both hosts and the CLI.
pub struct VoltGuardCore {
    config: EngineConfig,
    calculator: Arc<VoltageDropCalculator>,
}

impl VoltGuardCore {
    pub fn new(config: EngineConfig) -> Self {
        let calculator = Arc::new(VoltageDropCalculator::with_config(config.calculator.clone()));
        Self { config, calculator }
    }

    /// Load configuration from a JSON file
    pub fn from_config_file(path: &Path) -> Result<Self, VoltGuardError> {
        Ok(Self::new(EngineConfig::load_file(path)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a record against the configured installation defaults
    pub fn inputs_for(&self, record: &CircuitRecord) -> CalculationInputs {
        CalculationInputs::from_record(record.clone(), &self.config.defaults)
    }

    /// Evaluate a single circuit.
    pub fn evaluate_circuit(
        &self,
        record: &CircuitRecord,
    ) -> Result<CalculationResult, VoltGuardError> {
        Ok(self.calculator.calculate(&self.inputs_for(record))?)
    }

    /// Evaluate every circuit, collecting failures instead of stopping at the first.
    pub fn check_circuits(&self, records: &[CircuitRecord]) -> CheckReport {
        let circuits: Vec<CircuitCheck> = records
            .iter()
            .map(|record| match self.evaluate_circuit(record) {
                Ok(result) => CircuitCheck {
                    circuit_id: record.id.clone(),
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("Failed to evaluate circuit {}: {}", record.id, e);
                    CircuitCheck {
                        circuit_id: record.id.clone(),
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();
        let stats = checks_to_stats(&circuits);
        CheckReport { circuits, stats }
    }

    /// Smallest standard conductor that is compliant and ampacity-adequate
    pub fn minimum_conductor_size(
        &self,
        record: &CircuitRecord,
    ) -> Result<SizingResult, VoltGuardError> {
        let inputs = self.inputs_for(record);
        let size = self.calculator.minimum_conductor_size(&inputs);
        let result = self.calculator.calculate(&inputs.with_conductor_size(size.name))?;
        Ok(SizingResult {
            circuit_id: record.id.clone(),
            current_size: record.conductor_size.clone(),
            recommended_size: size.name.to_string(),
            result,
        })
    }

    /// Combined drop of circuits fed in series (e.g. feeder then branch)
    pub fn system_drop(
        &self,
        segments: &[CircuitRecord],
    ) -> Result<SystemDropReport, VoltGuardError> {
        let results = segments
            .iter()
            .map(|record| self.evaluate_circuit(record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(system_drop_report(&results))
    }

    /// What-if sweep over one circuit
    pub async fn sweep<P, C>(
        &self,
        record: &CircuitRecord,
        strategy: &SweepStrategy,
        on_progress: P,
        on_job_complete: C,
    ) -> Result<BatchReport, VoltGuardError>
    where
        P: FnMut(usize, usize),
        C: FnMut(&BatchResult),
    {
        let processor = BatchProcessor::new(self.calculator.clone(), &self.config.batch);
        let report = processor
            .sweep(&self.inputs_for(record), strategy, on_progress, on_job_complete)
            .await?;
        Ok(report)
    }
}

impl Default for VoltGuardCore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
