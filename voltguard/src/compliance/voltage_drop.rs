//! Voltage-Drop and Ampacity Calculator
//!
//! Computes, for one circuit:
//! - Conductor resistance and reactance from per-metre constants, length,
//!   cross-sectional area and number of parallel sets
//! - Voltage drop: `k × I × (R·cosφ + X_eff·sinφ)` with `k = 2` for
//!   single-phase and `k = √3` for three-phase, where `X_eff = X × harmonic`
//! - Percent drop, receiving-end voltage and the compliance verdict against
//!   the circuit-type limit
//! - Resistive/reactive power loss (`I²·R·m`, `I²·X_eff·m`, `m` = 2 or 3)
//! - Derated ampacity versus the circuit-type comparison current
//! - Recommendations
//!
//! Everything here is pure: no I/O, no shared state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ampacity::{derate, DeratedAmpacity, TemperatureCorrectionTables};
use super::conductor::{reactance_per_m, resistivity, ConductorSize};
use super::recommendations::{self, AdvisoryThresholds, RecommendationContext};
use crate::ucs::schema::{CalculationInputs, CircuitType, ConductorMaterial};

/// Maximum drop for a branch circuit, in percent
pub const BRANCH_MAX_DROP_PERCENT: f64 = 3.0;
/// Maximum drop for a feeder, in percent
pub const FEEDER_MAX_DROP_PERCENT: f64 = 2.0;
/// Maximum drop for a service, in percent
pub const SERVICE_MAX_DROP_PERCENT: f64 = 2.0;
/// Maximum drop for a motor circuit, in percent
pub const MOTOR_MAX_DROP_PERCENT: f64 = 3.0;
/// Combined feeder + branch limit. Only used by multi-segment reporting.
pub const COMBINED_SYSTEM_MAX_DROP_PERCENT: f64 = 5.0;

/// Errors raised for inputs the calculator cannot evaluate
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalcError {
    #[error("Invalid {field}: {value} ({reason})")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Unknown conductor size: '{0}'")]
    UnknownConductorSize(String),

    #[error("No {material} ampacity rating for {size}")]
    NoAmpacityRating {
        size: String,
        material: ConductorMaterial,
    },

    #[error("Calculation failed: {0}")]
    Other(String),
}

/// Compliance verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
}

impl ComplianceStatus {
    pub fn is_compliant(&self) -> bool {
        matches!(self, ComplianceStatus::Compliant)
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "compliant"),
            ComplianceStatus::NonCompliant => write!(f, "non-compliant"),
        }
    }
}

/// Wire-rating adequacy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireRating {
    /// Derated ampacity in amperes
    pub ampacity: f64,
    pub is_adequate: bool,
}

/// Power loss in the conductors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLoss {
    pub resistive_w: f64,
    pub reactive_w: f64,
    pub total_w: f64,
}

/// Result of evaluating one circuit. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub circuit_id: String,
    pub conductor_size: String,
    pub voltage_drop_v: f64,
    pub voltage_drop_percent: f64,
    pub receiving_end_voltage_v: f64,
    /// One-way conductor resistance per phase (Ω)
    pub resistance_ohm: f64,
    /// Harmonic-adjusted reactance per phase (Ω)
    pub effective_reactance_ohm: f64,
    pub power_loss: PowerLoss,
    pub compliance: ComplianceStatus,
    pub max_allowed_drop_percent: f64,
    pub wire_rating: WireRating,
    /// Current the ampacity was compared against
    pub comparison_current_a: f64,
    pub derating: DeratedAmpacity,
    pub recommendations: Vec<String>,
}

impl CalculationResult {
    pub fn is_compliant(&self) -> bool {
        self.compliance.is_compliant()
    }

    /// Compliant and ampacity-adequate
    pub fn is_acceptable(&self) -> bool {
        self.is_compliant() && self.wire_rating.is_adequate
    }
}

/// Maximum allowed percent drop for a circuit type
pub fn max_allowed_drop_percent(circuit_type: CircuitType) -> f64 {
    match circuit_type {
        CircuitType::Branch => BRANCH_MAX_DROP_PERCENT,
        CircuitType::Feeder => FEEDER_MAX_DROP_PERCENT,
        CircuitType::Service => SERVICE_MAX_DROP_PERCENT,
        CircuitType::Motor => MOTOR_MAX_DROP_PERCENT,
    }
}

/// Current used for the ampacity comparison.
///
/// Branch circuits use the load current as-is. Motor, feeder and service
/// circuits scale it by their starting multiplier, diversity factor or
/// demand factor when one is given.
pub fn comparison_current(inputs: &CalculationInputs) -> f64 {
    let record = &inputs.record;
    let load = record.current_a;
    let params = &record.params;
    let factor = match record.circuit_type {
        CircuitType::Branch => None,
        CircuitType::Motor => params.starting_current_multiplier,
        CircuitType::Feeder => params.diversity_factor,
        CircuitType::Service => params.demand_factor,
    };
    factor.map(|f| load * f).unwrap_or(load)
}

/// Anything that can turn inputs into a result
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, inputs: &CalculationInputs) -> Result<CalculationResult, CalcError>;
}

/// Tunable tables for the calculator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    #[serde(default)]
    pub temperature_correction: TemperatureCorrectionTables,
    #[serde(default)]
    pub advisories: AdvisoryThresholds,
}

/// The voltage-drop calculator
#[derive(Debug, Clone, Default)]
pub struct VoltageDropCalculator {
    config: CalculatorConfig,
}

impl VoltageDropCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CalculatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Evaluate one circuit
    pub fn calculate(&self, inputs: &CalculationInputs) -> Result<CalculationResult, CalcError> {
        validate(inputs)?;

        let record = &inputs.record;
        let size = ConductorSize::parse(&record.conductor_size)
            .ok_or_else(|| CalcError::UnknownConductorSize(record.conductor_size.clone()))?;

        // Ampacity
        let rating = inputs.insulation_class.temperature_rating();
        let base = size
            .base_ampacity(record.conductor_material, rating)
            .ok_or_else(|| CalcError::NoAmpacityRating {
                size: size.name.to_string(),
                material: record.conductor_material,
            })?;
        let temperature_factor = self
            .config
            .temperature_correction
            .factor(rating, inputs.ambient_temp_c);
        let derating = derate(
            base,
            temperature_factor,
            inputs.bundle_derating_factor,
            inputs.parallel_sets,
        );
        let comparison_current_a = comparison_current(inputs);
        let wire_rating = WireRating {
            ampacity: derating.ampacity_a,
            is_adequate: derating.ampacity_a >= comparison_current_a,
        };

        // Impedance
        let sets = f64::from(inputs.parallel_sets);
        let resistance_ohm =
            resistivity(record.conductor_material) * record.length_m / (size.area_mm2 * sets);
        let reactance_ohm =
            reactance_per_m(record.conduit_material, record.phase) * record.length_m / sets;
        let effective_reactance_ohm = reactance_ohm * inputs.harmonic_factor;

        // Voltage drop
        let cos_phi = record.power_factor;
        let sin_phi = cos_phi.acos().sin();
        let current = record.current_a;
        let voltage_drop_v = record.phase.drop_multiplier()
            * current
            * (resistance_ohm * cos_phi + effective_reactance_ohm * sin_phi);
        let voltage_drop_percent = voltage_drop_v / record.voltage_v * 100.0;
        let receiving_end_voltage_v = record.voltage_v - voltage_drop_v;

        let max_allowed_drop_percent = max_allowed_drop_percent(record.circuit_type);
        let compliance = if voltage_drop_percent <= max_allowed_drop_percent {
            ComplianceStatus::Compliant
        } else {
            ComplianceStatus::NonCompliant
        };

        // Power loss
        let m = record.phase.loss_multiplier();
        let resistive_w = current * current * resistance_ohm * m;
        let reactive_w = current * current * effective_reactance_ohm * m;
        let power_loss = PowerLoss {
            resistive_w,
            reactive_w,
            total_w: resistive_w + reactive_w,
        };

        let recommendations = recommendations::generate(&RecommendationContext {
            inputs,
            size,
            compliance,
            voltage_drop_percent,
            max_allowed_drop_percent,
            wire_rating,
            comparison_current_a,
            thresholds: &self.config.advisories,
        });

        Ok(CalculationResult {
            circuit_id: record.id.clone(),
            conductor_size: size.name.to_string(),
            voltage_drop_v,
            voltage_drop_percent,
            receiving_end_voltage_v,
            resistance_ohm,
            effective_reactance_ohm,
            power_loss,
            compliance,
            max_allowed_drop_percent,
            wire_rating,
            comparison_current_a,
            derating,
            recommendations,
        })
    }

    /// Smallest standard size that is both compliant and ampacity-adequate.
    ///
    /// Sizes that cannot be evaluated (e.g. no aluminum rating) are skipped.
    /// Falls back to the largest size when nothing qualifies.
    pub fn minimum_conductor_size(&self, inputs: &CalculationInputs) -> &'static ConductorSize {
        for size in ConductorSize::all() {
            let candidate = inputs.with_conductor_size(size.name);
            match self.calculate(&candidate) {
                Ok(result) if result.is_acceptable() => return size,
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping {} for {}: {}", size.name, inputs.id(), e),
            }
        }
        ConductorSize::largest()
    }
}

impl Evaluator for VoltageDropCalculator {
    fn evaluate(&self, inputs: &CalculationInputs) -> Result<CalculationResult, CalcError> {
        self.calculate(inputs)
    }
}

/// Evaluate with the default tables
pub fn evaluate(inputs: &CalculationInputs) -> Result<CalculationResult, CalcError> {
    VoltageDropCalculator::default().calculate(inputs)
}

/// Minimum conductor size with the default tables
pub fn minimum_conductor_size(inputs: &CalculationInputs) -> &'static ConductorSize {
    VoltageDropCalculator::default().minimum_conductor_size(inputs)
}

fn validate(inputs: &CalculationInputs) -> Result<(), CalcError> {
    let record = &inputs.record;

    require(
        record.voltage_v.is_finite() && record.voltage_v > 0.0,
        "voltage",
        record.voltage_v,
        "must be positive",
    )?;
    require(
        record.length_m.is_finite() && record.length_m > 0.0,
        "length",
        record.length_m,
        "must be positive",
    )?;
    require(
        record.current_a.is_finite() && record.current_a >= 0.0,
        "current",
        record.current_a,
        "must not be negative",
    )?;
    require(
        record.power_factor.is_finite() && record.power_factor > 0.0 && record.power_factor <= 1.0,
        "power factor",
        record.power_factor,
        "must be in (0, 1]",
    )?;
    require(
        inputs.harmonic_factor.is_finite() && inputs.harmonic_factor >= 1.0,
        "harmonic factor",
        inputs.harmonic_factor,
        "must be at least 1.0",
    )?;
    require(
        inputs.parallel_sets >= 1,
        "parallel sets",
        f64::from(inputs.parallel_sets),
        "must be at least 1",
    )?;
    require(
        inputs.bundle_derating_factor.is_finite()
            && inputs.bundle_derating_factor > 0.0
            && inputs.bundle_derating_factor <= 1.0,
        "bundle derating factor",
        inputs.bundle_derating_factor,
        "must be in (0, 1]",
    )?;
    require(
        inputs.ambient_temp_c.is_finite(),
        "ambient temperature",
        inputs.ambient_temp_c,
        "must be finite",
    )?;

    let params = &record.params;
    for (field, value) in [
        ("distance to furthest outlet", params.distance_to_furthest_outlet_m),
        ("starting current multiplier", params.starting_current_multiplier),
        ("diversity factor", params.diversity_factor),
        ("demand factor", params.demand_factor),
    ] {
        if let Some(v) = value {
            require(v.is_finite() && v > 0.0, field, v, "must be positive")?;
        }
    }

    Ok(())
}

fn require(
    ok: bool,
    field: &'static str,
    value: f64,
    reason: &'static str,
) -> Result<(), CalcError> {
    if ok {
        Ok(())
    } else {
        Err(CalcError::InvalidInput { field, value, reason })
    }
}

/// One segment of a multi-segment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDrop {
    pub circuit_id: String,
    pub voltage_drop_percent: f64,
    pub compliance: ComplianceStatus,
}

/// Combined drop of a run made of several segments (e.g. feeder + branch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDropReport {
    pub segments: Vec<SegmentDrop>,
    pub total_drop_percent: f64,
    pub max_allowed_percent: f64,
    pub compliance: ComplianceStatus,
}

/// Sum segment drops and check them against the combined system limit
pub fn system_drop_report(segments: &[CalculationResult]) -> SystemDropReport {
    let segment_drops: Vec<SegmentDrop> = segments
        .iter()
        .map(|r| SegmentDrop {
            circuit_id: r.circuit_id.clone(),
            voltage_drop_percent: r.voltage_drop_percent,
            compliance: r.compliance,
        })
        .collect();
    let total_drop_percent: f64 = segment_drops.iter().map(|s| s.voltage_drop_percent).sum();
    let compliance = if total_drop_percent <= COMBINED_SYSTEM_MAX_DROP_PERCENT {
        ComplianceStatus::Compliant
    } else {
        ComplianceStatus::NonCompliant
    };

    SystemDropReport {
        segments: segment_drops,
        total_drop_percent,
        max_allowed_percent: COMBINED_SYSTEM_MAX_DROP_PERCENT,
        compliance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ucs::schema::*;

    fn branch_inputs() -> CalculationInputs {
        let record = CircuitRecord::new("B-1")
            .with_conductor("12 AWG", ConductorMaterial::Copper, 20.0)
            .with_supply(230.0, PhaseConfiguration::Single)
            .with_load(20.0, 0.9)
            .with_installation(InstallationParams {
                insulation_class: Some(InsulationClass::Thwn),
                ambient_temp_c: Some(30.0),
                ..Default::default()
            });
        CalculationInputs::from_record(record, &InstallationDefaults::default())
    }

    #[test]
    fn test_single_phase_drop() {
        let inputs = branch_inputs();
        let result = evaluate(&inputs).unwrap();

        let r = COPPER_R_12AWG_20M;
        let x = 0.167e-3 * 20.0;
        let sin = 0.9f64.acos().sin();
        let expected = 2.0 * 20.0 * (r * 0.9 + x * sin);

        assert!((result.voltage_drop_v - expected).abs() < 1e-9, "drop: {}", result.voltage_drop_v);
        assert!((result.voltage_drop_percent - expected / 230.0 * 100.0).abs() < 1e-9);
        assert!((result.receiving_end_voltage_v - (230.0 - expected)).abs() < 1e-9);
    }

    const COPPER_R_12AWG_20M: f64 = 0.017_24 * 20.0 / 3.31;

    #[test]
    fn test_three_phase_uses_sqrt3() {
        let mut inputs = branch_inputs();
        inputs.record.phase = PhaseConfiguration::Three;
        inputs.record.voltage_v = 400.0;
        let result = evaluate(&inputs).unwrap();

        let r = COPPER_R_12AWG_20M;
        let x = 0.171e-3 * 20.0;
        let sin = 0.9f64.acos().sin();
        let expected = 3f64.sqrt() * 20.0 * (r * 0.9 + x * sin);
        assert!((result.voltage_drop_v - expected).abs() < 1e-9);

        let expected_loss = 20.0 * 20.0 * r * 3.0;
        assert!((result.power_loss.resistive_w - expected_loss).abs() < 1e-9);
    }

    #[test]
    fn test_harmonic_factor_inflates_reactance_only() {
        let base = evaluate(&branch_inputs()).unwrap();
        let mut inputs = branch_inputs();
        inputs.harmonic_factor = 1.5;
        let distorted = evaluate(&inputs).unwrap();

        assert_eq!(base.resistance_ohm, distorted.resistance_ohm);
        let expected = base.effective_reactance_ohm * 1.5;
        assert!((distorted.effective_reactance_ohm - expected).abs() < 1e-12);
        assert!(distorted.voltage_drop_v > base.voltage_drop_v);
        assert!(distorted.power_loss.reactive_w > base.power_loss.reactive_w);
    }

    #[test]
    fn test_parallel_sets_halve_impedance_and_double_ampacity() {
        let single = evaluate(&branch_inputs()).unwrap();
        let mut inputs = branch_inputs();
        inputs.parallel_sets = 2;
        let parallel = evaluate(&inputs).unwrap();

        assert!((parallel.resistance_ohm * 2.0 - single.resistance_ohm).abs() < 1e-12);
        assert!((parallel.wire_rating.ampacity - single.wire_rating.ampacity * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_loss_total() {
        let result = evaluate(&branch_inputs()).unwrap();
        let loss = result.power_loss;
        assert!((loss.total_w - (loss.resistive_w + loss.reactive_w)).abs() < 1e-12);
    }

    #[test]
    fn test_compliance_law_at_limit() {
        let mut inputs = branch_inputs();
        // Find a length that puts the drop just above 3 %
        inputs.record.length_m = 60.0;
        let long = evaluate(&inputs).unwrap();
        assert_eq!(long.compliance.is_compliant(), long.voltage_drop_percent <= 3.0);

        inputs.record.length_m = 5.0;
        let short = evaluate(&inputs).unwrap();
        assert_eq!(short.compliance, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_limits_per_circuit_type() {
        assert_eq!(max_allowed_drop_percent(CircuitType::Branch), 3.0);
        assert_eq!(max_allowed_drop_percent(CircuitType::Feeder), 2.0);
        assert_eq!(max_allowed_drop_percent(CircuitType::Service), 2.0);
        assert_eq!(max_allowed_drop_percent(CircuitType::Motor), 3.0);
    }

    #[test]
    fn test_comparison_current_rules() {
        let mut inputs = branch_inputs();
        inputs.record.params.starting_current_multiplier = Some(6.0);
        assert_eq!(comparison_current(&inputs), 20.0);

        inputs.record.circuit_type = CircuitType::Motor;
        assert_eq!(comparison_current(&inputs), 120.0);

        inputs.record.circuit_type = CircuitType::Feeder;
        assert_eq!(comparison_current(&inputs), 20.0);
        inputs.record.params.diversity_factor = Some(0.8);
        assert_eq!(comparison_current(&inputs), 16.0);

        inputs.record.circuit_type = CircuitType::Service;
        inputs.record.params.demand_factor = Some(0.5);
        assert_eq!(comparison_current(&inputs), 10.0);
    }

    #[test]
    fn test_ampacity_derating() {
        let mut inputs = branch_inputs();
        inputs.ambient_temp_c = 40.0;
        inputs.bundle_derating_factor = 0.8;
        let result = evaluate(&inputs).unwrap();

        // 12 AWG Cu, 75 °C column = 25 A; 40 °C factor 0.88
        assert!((result.wire_rating.ampacity - 25.0 * 0.88 * 0.8).abs() < 1e-9);
        assert!(!result.wire_rating.is_adequate);
        assert_eq!(
            result.wire_rating.is_adequate,
            result.wire_rating.ampacity >= result.comparison_current_a
        );
    }

    #[test]
    fn test_determinism() {
        let inputs = branch_inputs();
        assert_eq!(evaluate(&inputs).unwrap(), evaluate(&inputs).unwrap());
    }

    #[test]
    fn test_invalid_inputs() {
        let mut inputs = branch_inputs();
        inputs.record.power_factor = 1.2;
        assert!(matches!(
            evaluate(&inputs),
            Err(CalcError::InvalidInput { field: "power factor", .. })
        ));

        let mut inputs = branch_inputs();
        inputs.harmonic_factor = 0.9;
        assert!(matches!(evaluate(&inputs), Err(CalcError::InvalidInput { .. })));

        let mut inputs = branch_inputs();
        inputs.parallel_sets = 0;
        assert!(matches!(evaluate(&inputs), Err(CalcError::InvalidInput { .. })));

        let mut inputs = branch_inputs();
        inputs.record.voltage_v = f64::NAN;
        assert!(evaluate(&inputs).is_err());

        let mut inputs = branch_inputs();
        inputs.record.conductor_size = "13 AWG".to_string();
        assert_eq!(evaluate(&inputs), Err(CalcError::UnknownConductorSize("13 AWG".to_string())));

        let mut inputs = branch_inputs();
        inputs.record.conductor_size = "14 AWG".to_string();
        inputs.record.conductor_material = ConductorMaterial::Aluminum;
        assert!(matches!(evaluate(&inputs), Err(CalcError::NoAmpacityRating { .. })));
    }

    #[test]
    fn test_minimum_size_search() {
        let mut inputs = branch_inputs();
        inputs.record.length_m = 80.0;
        let size = minimum_conductor_size(&inputs);
        let result = evaluate(&inputs.with_conductor_size(size.name)).unwrap();
        assert!(result.is_acceptable());

        // Nothing smaller qualifies
        for smaller in ConductorSize::all().iter().take_while(|s| s.name != size.name) {
            let r = evaluate(&inputs.with_conductor_size(smaller.name)).unwrap();
            assert!(!r.is_acceptable(), "{} should not qualify", smaller.name);
        }
    }

    #[test]
    fn test_minimum_size_falls_back_to_largest() {
        let mut inputs = branch_inputs();
        inputs.record.current_a = 5000.0;
        assert_eq!(minimum_conductor_size(&inputs).name, "1000 kcmil");
    }

    #[test]
    fn test_minimum_size_skips_unrated_aluminum() {
        let mut inputs = branch_inputs();
        inputs.record.conductor_material = ConductorMaterial::Aluminum;
        inputs.record.current_a = 1.0;
        inputs.record.length_m = 1.0;
        assert_eq!(minimum_conductor_size(&inputs).name, "12 AWG");
    }

    #[test]
    fn test_system_drop_report() {
        let mut feeder = branch_inputs();
        feeder.record.id = "F-1".to_string();
        feeder.record.circuit_type = CircuitType::Feeder;
        let feeder = evaluate(&feeder).unwrap();
        let branch = evaluate(&branch_inputs()).unwrap();

        let report = system_drop_report(&[feeder.clone(), branch.clone()]);
        assert_eq!(report.segments.len(), 2);
        let summed = feeder.voltage_drop_percent + branch.voltage_drop_percent;
        assert!((report.total_drop_percent - summed).abs() < 1e-12);
        assert_eq!(report.max_allowed_percent, 5.0);
        assert_eq!(report.compliance.is_compliant(), report.total_drop_percent <= 5.0);
    }
}
