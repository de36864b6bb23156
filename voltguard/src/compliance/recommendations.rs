//! Recommendation text for a calculation result.
//!
//! Generation is total and order-stable: the same inputs always produce the
//! same list in the same order, and nothing here can fail.

use serde::{Deserialize, Serialize};

use super::conductor::ConductorSize;
use super::voltage_drop::{ComplianceStatus, WireRating};
use crate::ucs::schema::{CalculationInputs, CircuitType, ConductorMaterial};

/// Message emitted when nothing needs attention
pub const ADEQUATE_MESSAGE: &str =
    "Circuit design is adequate: voltage drop and conductor ampacity are within limits.";

/// Thresholds for circuit-type advisories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryThresholds {
    /// Branch runs longer than this (m) get a long-run advisory
    #[serde(default = "default_long_branch_run")]
    pub long_branch_run_m: f64,

    /// Motor starting multipliers above this get an advisory
    #[serde(default = "default_high_starting_multiplier")]
    pub high_starting_multiplier: f64,

    /// Feeder diversity factors below this get an advisory
    #[serde(default = "default_low_factor")]
    pub low_diversity_factor: f64,

    /// Service demand factors below this get an advisory
    #[serde(default = "default_low_factor")]
    pub low_demand_factor: f64,

    /// Harmonic factors above this get an advisory
    #[serde(default = "default_high_harmonic")]
    pub high_harmonic_factor: f64,
}

fn default_long_branch_run() -> f64 {
    30.0
}

fn default_high_starting_multiplier() -> f64 {
    6.0
}

fn default_low_factor() -> f64 {
    0.5
}

fn default_high_harmonic() -> f64 {
    1.25
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            long_branch_run_m: default_long_branch_run(),
            high_starting_multiplier: default_high_starting_multiplier(),
            low_diversity_factor: default_low_factor(),
            low_demand_factor: default_low_factor(),
            high_harmonic_factor: default_high_harmonic(),
        }
    }
}

/// Facts the recommendation rules look at
pub struct RecommendationContext<'a> {
    pub inputs: &'a CalculationInputs,
    pub size: &'a ConductorSize,
    pub compliance: ComplianceStatus,
    pub voltage_drop_percent: f64,
    pub max_allowed_drop_percent: f64,
    pub wire_rating: WireRating,
    pub comparison_current_a: f64,
    pub thresholds: &'a AdvisoryThresholds,
}

/// Build the ordered recommendation list
pub fn generate(ctx: &RecommendationContext<'_>) -> Vec<String> {
    let mut out = Vec::new();
    let record = &ctx.inputs.record;

    if !ctx.compliance.is_compliant() {
        match ctx.size.next_larger() {
            Some(next) => out.push(format!(
                "Upgrade conductor size from {} to {}: voltage drop of {:.2}% exceeds the {:.1}% limit for {} circuits.",
                ctx.size.name,
                next.name,
                ctx.voltage_drop_percent,
                ctx.max_allowed_drop_percent,
                record.circuit_type
            )),
            None => out.push(format!(
                "Upgrade conductor size is not possible: {} is already the largest standard size and the drop of {:.2}% exceeds the {:.1}% limit.",
                ctx.size.name, ctx.voltage_drop_percent, ctx.max_allowed_drop_percent
            )),
        }
        if ctx.inputs.parallel_sets <= 1 {
            out.push(
                "Consider installing parallel conductor sets to reduce the effective resistance of the run."
                    .to_string(),
            );
        }
    }

    if !ctx.wire_rating.is_adequate {
        out.push(format!(
            "Derated ampacity of {:.1} A is below the required {:.1} A: reduce derating causes (ambient temperature, conductor bundling, harmonic loading) or increase conductor size.",
            ctx.wire_rating.ampacity, ctx.comparison_current_a
        ));
        if record.conductor_material == ConductorMaterial::Aluminum {
            out.push(
                "Consider switching from aluminum to copper conductors for higher ampacity at the same size."
                    .to_string(),
            );
        }
    }

    out.extend(circuit_type_advisories(ctx));

    if out.is_empty() {
        out.push(ADEQUATE_MESSAGE.to_string());
    }

    out
}

fn circuit_type_advisories(ctx: &RecommendationContext<'_>) -> Vec<String> {
    let mut out = Vec::new();
    let record = &ctx.inputs.record;
    let params = &record.params;
    let t = ctx.thresholds;

    match record.circuit_type {
        CircuitType::Branch => {
            let run = params
                .distance_to_furthest_outlet_m
                .unwrap_or(record.length_m);
            if run > t.long_branch_run_m {
                out.push(format!(
                    "Long branch run ({:.1} m): consider relocating the panel or splitting the circuit to shorten the run.",
                    run
                ));
            }
        }
        CircuitType::Motor => {
            if let Some(m) = params.starting_current_multiplier {
                if m > t.high_starting_multiplier {
                    out.push(format!(
                        "High motor starting current multiplier ({:.1}x): consider a soft starter or VFD to limit starting voltage dip.",
                        m
                    ));
                }
            }
        }
        CircuitType::Feeder => {
            if let Some(d) = params.diversity_factor {
                if d < t.low_diversity_factor {
                    out.push(format!(
                        "Low diversity factor ({:.2}): verify the assumed load diversity against measured demand.",
                        d
                    ));
                }
            }
        }
        CircuitType::Service => {
            if let Some(d) = params.demand_factor {
                if d < t.low_demand_factor {
                    out.push(format!(
                        "Low demand factor ({:.2}): verify the service demand calculation before relying on it.",
                        d
                    ));
                }
            }
        }
    }

    if ctx.inputs.harmonic_factor > t.high_harmonic_factor {
        out.push(format!(
            "High harmonic factor ({:.2}): consider harmonic filtering or an oversized neutral.",
            ctx.inputs.harmonic_factor
        ));
    }

    out
}
