//! Unified Circuit Schema (UCS) Data Types
//!
//! This module defines the canonical representation of one circuit's
//! electrical properties. Every other part of the engine (calculator,
//! change tracker, scheduler, view adapters) consumes these types.
//!
//! Design goals:
//! - Strictly typed: known circuit-type parameters and installation
//!   overrides are typed optional fields, never loose maps
//! - Extensible: a narrowly-typed `extensions` map carries view-specific
//!   passthrough data that the numeric path never reads
//! - Serializable: full serde support, with deterministic field order so a
//!   serialized `CalculationInputs` can serve as a cache fingerprint

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conductor material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConductorMaterial {
    Copper,
    Aluminum,
}

impl Default for ConductorMaterial {
    fn default() -> Self {
        ConductorMaterial::Copper
    }
}

impl std::fmt::Display for ConductorMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConductorMaterial::Copper => write!(f, "copper"),
            ConductorMaterial::Aluminum => write!(f, "aluminum"),
        }
    }
}

/// Raceway the conductors are installed in. Drives the reactance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConduitMaterial {
    Pvc,
    Aluminum,
    Steel,
}

impl Default for ConduitMaterial {
    fn default() -> Self {
        ConduitMaterial::Pvc
    }
}

impl std::fmt::Display for ConduitMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConduitMaterial::Pvc => write!(f, "PVC"),
            ConduitMaterial::Aluminum => write!(f, "aluminum"),
            ConduitMaterial::Steel => write!(f, "steel"),
        }
    }
}

/// Phase configuration of the supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseConfiguration {
    Single,
    Three,
}

impl Default for PhaseConfiguration {
    fn default() -> Self {
        PhaseConfiguration::Single
    }
}

impl PhaseConfiguration {
    /// Multiplier applied to per-conductor I²R losses (2 for single-phase,
    /// 3 for three-phase).
    pub fn loss_multiplier(&self) -> f64 {
        match self {
            PhaseConfiguration::Single => 2.0,
            PhaseConfiguration::Three => 3.0,
        }
    }

    /// Multiplier applied to the impedance bracket of the voltage-drop formula.
    pub fn drop_multiplier(&self) -> f64 {
        match self {
            PhaseConfiguration::Single => 2.0,
            PhaseConfiguration::Three => 3f64.sqrt(),
        }
    }
}

impl std::fmt::Display for PhaseConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseConfiguration::Single => write!(f, "single-phase"),
            PhaseConfiguration::Three => write!(f, "three-phase"),
        }
    }
}

/// Circuit type. Selects the voltage-drop limit and the ampacity
/// comparison-current rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitType {
    Branch,
    Feeder,
    Service,
    Motor,
}

impl Default for CircuitType {
    fn default() -> Self {
        CircuitType::Branch
    }
}

impl std::fmt::Display for CircuitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitType::Branch => write!(f, "branch"),
            CircuitType::Feeder => write!(f, "feeder"),
            CircuitType::Service => write!(f, "service"),
            CircuitType::Motor => write!(f, "motor"),
        }
    }
}

/// Conductor insulation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsulationClass {
    #[serde(rename = "TW")]
    Tw,
    #[serde(rename = "THW")]
    Thw,
    #[serde(rename = "THWN")]
    Thwn,
    #[serde(rename = "XHHW")]
    Xhhw,
    #[serde(rename = "RHW")]
    Rhw,
    #[serde(rename = "THHN")]
    Thhn,
    #[serde(rename = "THWN-2")]
    Thwn2,
    #[serde(rename = "XHHW-2")]
    Xhhw2,
    #[serde(rename = "RHW-2")]
    Rhw2,
}

impl Default for InsulationClass {
    fn default() -> Self {
        InsulationClass::Thwn
    }
}

impl InsulationClass {
    /// Temperature rating of the insulation. Fixed per class.
    pub fn temperature_rating(&self) -> TemperatureRating {
        match self {
            InsulationClass::Tw => TemperatureRating::C60,
            InsulationClass::Thw
            | InsulationClass::Thwn
            | InsulationClass::Xhhw
            | InsulationClass::Rhw => TemperatureRating::C75,
            InsulationClass::Thhn
            | InsulationClass::Thwn2
            | InsulationClass::Xhhw2
            | InsulationClass::Rhw2 => TemperatureRating::C90,
        }
    }

    /// Parse a class name such as "THWN" or "thwn-2"
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.as_str() {
            "TW" => Some(InsulationClass::Tw),
            "THW" => Some(InsulationClass::Thw),
            "THWN" => Some(InsulationClass::Thwn),
            "XHHW" => Some(InsulationClass::Xhhw),
            "RHW" => Some(InsulationClass::Rhw),
            "THHN" => Some(InsulationClass::Thhn),
            "THWN-2" | "THWN2" => Some(InsulationClass::Thwn2),
            "XHHW-2" | "XHHW2" => Some(InsulationClass::Xhhw2),
            "RHW-2" | "RHW2" => Some(InsulationClass::Rhw2),
            _ => None,
        }
    }
}

impl std::fmt::Display for InsulationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InsulationClass::Tw => "TW",
            InsulationClass::Thw => "THW",
            InsulationClass::Thwn => "THWN",
            InsulationClass::Xhhw => "XHHW",
            InsulationClass::Rhw => "RHW",
            InsulationClass::Thhn => "THHN",
            InsulationClass::Thwn2 => "THWN-2",
            InsulationClass::Xhhw2 => "XHHW-2",
            InsulationClass::Rhw2 => "RHW-2",
        };
        write!(f, "{}", name)
    }
}

/// Insulation temperature rating column (60/75/90 °C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemperatureRating {
    #[serde(rename = "60C")]
    C60,
    #[serde(rename = "75C")]
    C75,
    #[serde(rename = "90C")]
    C90,
}

impl TemperatureRating {
    pub fn celsius(&self) -> f64 {
        match self {
            TemperatureRating::C60 => 60.0,
            TemperatureRating::C75 => 75.0,
            TemperatureRating::C90 => 90.0,
        }
    }

    /// Column index into the ampacity tables
    pub fn column(&self) -> usize {
        match self {
            TemperatureRating::C60 => 0,
            TemperatureRating::C75 => 1,
            TemperatureRating::C90 => 2,
        }
    }
}

/// Value of a view-specific passthrough field.
///
/// Deliberately flat: nested objects and lists are not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl From<String> for ExtensionValue {
    fn from(s: String) -> Self {
        ExtensionValue::Text(s)
    }
}

impl From<&str> for ExtensionValue {
    fn from(s: &str) -> Self {
        ExtensionValue::Text(s.to_string())
    }
}

impl From<f64> for ExtensionValue {
    fn from(n: f64) -> Self {
        ExtensionValue::Number(n)
    }
}

impl From<i64> for ExtensionValue {
    fn from(n: i64) -> Self {
        ExtensionValue::Integer(n)
    }
}

impl From<bool> for ExtensionValue {
    fn from(b: bool) -> Self {
        ExtensionValue::Boolean(b)
    }
}

/// Circuit-type-specific parameters. Each applies to one circuit type and
/// is ignored by the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitTypeParams {
    /// Branch: distance from the panel to the furthest outlet (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_furthest_outlet_m: Option<f64>,

    /// Motor: locked-rotor / full-load current ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_current_multiplier: Option<f64>,

    /// Feeder: diversity factor applied to the connected load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diversity_factor: Option<f64>,

    /// Service: demand factor applied to the connected load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_factor: Option<f64>,
}

/// Per-circuit installation overrides. Unset fields fall back to the
/// engine's `InstallationDefaults`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation_class: Option<InsulationClass>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_temp_c: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmonic_factor: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_sets: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_derating_factor: Option<f64>,
}

/// One circuit, as edited by whatever surface owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    /// Circuit identifier
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// One-way conductor length in metres
    pub length_m: f64,

    /// Standard conductor size, e.g. "12 AWG", "1/0 AWG", "250 kcmil"
    pub conductor_size: String,

    #[serde(default)]
    pub conductor_material: ConductorMaterial,

    #[serde(default)]
    pub conduit_material: ConduitMaterial,

    #[serde(default)]
    pub phase: PhaseConfiguration,

    /// Load current in amperes
    pub current_a: f64,

    /// System voltage in volts
    pub voltage_v: f64,

    #[serde(default = "default_power_factor")]
    pub power_factor: f64,

    /// Load efficiency (0-1). Carried for reporting views only.
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaker_id: Option<String>,

    #[serde(default)]
    pub circuit_type: CircuitType,

    #[serde(default)]
    pub params: CircuitTypeParams,

    #[serde(default)]
    pub installation: InstallationParams,

    /// View-specific passthrough data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, ExtensionValue>,
}

fn default_power_factor() -> f64 {
    1.0
}

fn default_efficiency() -> f64 {
    1.0
}

impl CircuitRecord {
    /// Create a record with unity power factor, copper in PVC, single-phase branch
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            length_m: 0.0,
            conductor_size: String::new(),
            conductor_material: ConductorMaterial::Copper,
            conduit_material: ConduitMaterial::Pvc,
            phase: PhaseConfiguration::Single,
            current_a: 0.0,
            voltage_v: 0.0,
            power_factor: default_power_factor(),
            efficiency: default_efficiency(),
            breaker_id: None,
            circuit_type: CircuitType::Branch,
            params: CircuitTypeParams::default(),
            installation: InstallationParams::default(),
            extensions: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_conductor(
        mut self,
        size: impl Into<String>,
        material: ConductorMaterial,
        length_m: f64,
    ) -> Self {
        self.conductor_size = size.into();
        self.conductor_material = material;
        self.length_m = length_m;
        self
    }

    pub fn with_conduit(mut self, conduit: ConduitMaterial) -> Self {
        self.conduit_material = conduit;
        self
    }

    pub fn with_supply(mut self, voltage_v: f64, phase: PhaseConfiguration) -> Self {
        self.voltage_v = voltage_v;
        self.phase = phase;
        self
    }

    pub fn with_load(mut self, current_a: f64, power_factor: f64) -> Self {
        self.current_a = current_a;
        self.power_factor = power_factor;
        self
    }

    pub fn with_circuit_type(mut self, circuit_type: CircuitType) -> Self {
        self.circuit_type = circuit_type;
        self
    }

    pub fn with_breaker(mut self, breaker_id: impl Into<String>) -> Self {
        self.breaker_id = Some(breaker_id.into());
        self
    }

    pub fn with_params(mut self, params: CircuitTypeParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_installation(mut self, installation: InstallationParams) -> Self {
        self.installation = installation;
        self
    }

    pub fn set_extension(&mut self, key: impl Into<String>, value: impl Into<ExtensionValue>) {
        self.extensions.insert(key.into(), value.into());
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Engine-wide installation defaults, used for any override a record leaves unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationDefaults {
    #[serde(default)]
    pub insulation_class: InsulationClass,

    #[serde(default = "default_ambient")]
    pub ambient_temp_c: f64,

    #[serde(default = "default_harmonic")]
    pub harmonic_factor: f64,

    #[serde(default = "default_parallel_sets")]
    pub parallel_sets: u32,

    #[serde(default = "default_bundle")]
    pub bundle_derating_factor: f64,
}

fn default_ambient() -> f64 {
    30.0
}

fn default_harmonic() -> f64 {
    1.0
}

fn default_parallel_sets() -> u32 {
    1
}

fn default_bundle() -> f64 {
    1.0
}

impl Default for InstallationDefaults {
    fn default() -> Self {
        Self {
            insulation_class: InsulationClass::default(),
            ambient_temp_c: default_ambient(),
            harmonic_factor: default_harmonic(),
            parallel_sets: default_parallel_sets(),
            bundle_derating_factor: default_bundle(),
        }
    }
}

/// Everything the calculator needs for one evaluation: the circuit record
/// plus resolved environmental and insulation parameters.
///
/// Serialization order is fixed by field order, which makes the JSON form a
/// canonical fingerprint for memoization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationInputs {
    pub record: CircuitRecord,
    pub insulation_class: InsulationClass,
    pub ambient_temp_c: f64,
    pub harmonic_factor: f64,
    pub parallel_sets: u32,
    pub bundle_derating_factor: f64,
}

impl CalculationInputs {
    /// Resolve a record against installation defaults. Record overrides win.
    pub fn from_record(record: CircuitRecord, defaults: &InstallationDefaults) -> Self {
        let installation = &record.installation;
        let insulation_class = installation
            .insulation_class
            .unwrap_or(defaults.insulation_class);
        let ambient_temp_c = installation.ambient_temp_c.unwrap_or(defaults.ambient_temp_c);
        let harmonic_factor = installation
            .harmonic_factor
            .unwrap_or(defaults.harmonic_factor);
        let parallel_sets = installation.parallel_sets.unwrap_or(defaults.parallel_sets);
        let bundle_derating_factor = installation
            .bundle_derating_factor
            .unwrap_or(defaults.bundle_derating_factor);

        Self {
            record,
            insulation_class,
            ambient_temp_c,
            harmonic_factor,
            parallel_sets,
            bundle_derating_factor,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Copy of these inputs with a different conductor size
    pub fn with_conductor_size(&self, size: impl Into<String>) -> Self {
        let mut inputs = self.clone();
        inputs.record.conductor_size = size.into();
        inputs
    }

    /// Copy of these inputs with a different conductor length
    pub fn with_length(&self, length_m: f64) -> Self {
        let mut inputs = self.clone();
        inputs.record.length_m = length_m;
        inputs
    }

    /// Canonical fingerprint of the full input set
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
