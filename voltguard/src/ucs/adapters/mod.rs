//! View Adapters Module
//!
//! Converts circuit records to and from the flat JSON shapes used by the
//! analysis views. Adapters never calculate anything; they flatten the
//! record, rename fields per the view's table, and pass the rest through.
//!
//! Conversion rules:
//! - `params` and `installation` fields are lifted to the top level
//! - fields listed in the rename table appear under their view name
//! - every other known field keeps its canonical name
//! - extension entries appear as top-level keys, unless the key would be
//!   read back as a known field, in which case they stay in a nested
//!   `"extensions"` object
//! - on the way back, unknown view keys land in `extensions`
//!
//! Supported views:
//! - Voltage-drop analysis
//! - Load schedule
//! - Ampacity

pub mod ampacity;
pub mod load_schedule;
pub mod voltage_drop;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::CircuitRecord;

/// A circuit as seen by one analysis view: a flat JSON object
pub type ViewRecord = Map<String, Value>;

/// Reserved view key holding extension entries that would clash with known fields
pub const EXTENSIONS_KEY: &str = "extensions";

const RECORD_FIELDS: &[&str] = &[
    "id",
    "description",
    "length_m",
    "conductor_size",
    "conductor_material",
    "conduit_material",
    "phase",
    "current_a",
    "voltage_v",
    "power_factor",
    "efficiency",
    "breaker_id",
    "circuit_type",
];

const PARAM_FIELDS: &[&str] = &[
    "distance_to_furthest_outlet_m",
    "starting_current_multiplier",
    "diversity_factor",
    "demand_factor",
];

const INSTALLATION_FIELDS: &[&str] = &[
    "insulation_class",
    "ambient_temp_c",
    "harmonic_factor",
    "parallel_sets",
    "bundle_derating_factor",
];

/// Errors that can occur while reading a view record
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Extension '{0}' must be a string, number, or boolean")]
    UnsupportedExtension(String),

    #[error("Invalid circuit record: {0}")]
    InvalidRecord(String),

    #[error("No adapter for view: {0}")]
    UnknownView(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Analysis views with a built-in adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisView {
    VoltageDrop,
    LoadSchedule,
    Ampacity,
}

impl AnalysisView {
    pub fn all() -> &'static [AnalysisView] {
        &[AnalysisView::VoltageDrop, AnalysisView::LoadSchedule, AnalysisView::Ampacity]
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "voltage-drop" => Some(AnalysisView::VoltageDrop),
            "load-schedule" => Some(AnalysisView::LoadSchedule),
            "ampacity" => Some(AnalysisView::Ampacity),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisView::VoltageDrop => write!(f, "voltage-drop"),
            AnalysisView::LoadSchedule => write!(f, "load-schedule"),
            AnalysisView::Ampacity => write!(f, "ampacity"),
        }
    }
}

fn known_field(name: &str) -> Option<&'static str> {
    RECORD_FIELDS
        .iter()
        .chain(PARAM_FIELDS)
        .chain(INSTALLATION_FIELDS)
        .find(|f| **f == name)
        .copied()
}

/// Canonical record as one flat object, extensions excluded
fn canonical_fields(record: &CircuitRecord) -> Map<String, Value> {
    let mut flat = Map::new();
    let nested = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::error!("Circuit {} did not serialize to a JSON object", record.id);
            return flat;
        }
    };

    for (key, value) in nested {
        match key.as_str() {
            "params" | "installation" => {
                if let Value::Object(inner) = value {
                    flat.extend(inner);
                }
            }
            EXTENSIONS_KEY => {}
            _ => {
                flat.insert(key, value);
            }
        }
    }
    flat
}

/// Trait for converting between circuit records and one analysis view
pub trait ViewAdapter: Send + Sync {
    /// The view this adapter serves
    fn view(&self) -> AnalysisView;

    /// One-line description for listings
    fn description(&self) -> &str;

    /// `(canonical name, view name)` pairs
    fn renames(&self) -> &[(&'static str, &'static str)];

    /// Canonical field a view key denotes, or `None` for passthrough keys
    fn canonical_key(&self, view_key: &str) -> Option<&'static str> {
        if let Some((canonical, _)) = self.renames().iter().find(|(_, v)| *v == view_key) {
            return Some(*canonical);
        }
        // Renamed fields are only recognized under their view name
        if self.renames().iter().any(|(c, _)| *c == view_key) {
            return None;
        }
        known_field(view_key)
    }

    /// Convert a record to this view's shape
    fn to_view(&self, record: &CircuitRecord) -> ViewRecord {
        let mut view = ViewRecord::new();
        for (key, value) in canonical_fields(record) {
            let name = self
                .renames()
                .iter()
                .find(|(c, _)| *c == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or(key);
            view.insert(name, value);
        }

        let mut clashing = Map::new();
        for (key, value) in &record.extensions {
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            let collides = key == EXTENSIONS_KEY
                || self.canonical_key(key).is_some()
                || view.contains_key(key);
            if collides {
                clashing.insert(key.clone(), value);
            } else {
                view.insert(key.clone(), value);
            }
        }
        if !clashing.is_empty() {
            view.insert(EXTENSIONS_KEY.to_string(), Value::Object(clashing));
        }
        view
    }

    /// Rebuild a record from this view's shape
    fn from_view(&self, view: &ViewRecord) -> Result<CircuitRecord, AdapterError> {
        let mut top = Map::new();
        let mut params = Map::new();
        let mut installation = Map::new();
        let mut extensions = Map::new();

        for (key, value) in view {
            if key == EXTENSIONS_KEY {
                match value {
                    Value::Object(nested) => extensions.extend(nested.clone()),
                    _ => {
                        return Err(AdapterError::InvalidField {
                            field: key.clone(),
                            reason: "expected an object".to_string(),
                        })
                    }
                }
                continue;
            }

            match self.canonical_key(key) {
                Some(field) if PARAM_FIELDS.contains(&field) => {
                    params.insert(field.to_string(), value.clone());
                }
                Some(field) if INSTALLATION_FIELDS.contains(&field) => {
                    installation.insert(field.to_string(), value.clone());
                }
                Some(field) => {
                    top.insert(field.to_string(), value.clone());
                }
                None => {
                    extensions.insert(key.clone(), value.clone());
                }
            }
        }

        for (key, value) in &extensions {
            if !matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_)) {
                return Err(AdapterError::UnsupportedExtension(key.clone()));
            }
        }

        top.insert("params".to_string(), Value::Object(params));
        top.insert("installation".to_string(), Value::Object(installation));
        top.insert(EXTENSIONS_KEY.to_string(), Value::Object(extensions));

        serde_json::from_value(Value::Object(top))
            .map_err(|e| AdapterError::InvalidRecord(e.to_string()))
    }
}

/// Registry of available view adapters
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ViewAdapter>>,
}

impl AdapterRegistry {
    /// Create a new registry with the built-in views
    pub fn new() -> Self {
        let mut registry = Self { adapters: Vec::new() };

        registry.register(Box::new(voltage_drop::VoltageDropView));
        registry.register(Box::new(load_schedule::LoadScheduleView));
        registry.register(Box::new(ampacity::AmpacityView));

        registry
    }

    /// Register an adapter, replacing any existing one for the same view
    pub fn register(&mut self, adapter: Box<dyn ViewAdapter>) {
        self.adapters.retain(|a| a.view() != adapter.view());
        self.adapters.push(adapter);
    }

    /// Find the adapter for a view
    pub fn get(&self, view: AnalysisView) -> Option<&dyn ViewAdapter> {
        self.adapters.iter().find(|a| a.view() == view).map(|a| a.as_ref())
    }

    /// All registered adapters, in registration order
    pub fn adapters(&self) -> impl Iterator<Item = &dyn ViewAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    pub fn to_view(
        &self,
        view: AnalysisView,
        record: &CircuitRecord,
    ) -> Result<ViewRecord, AdapterError> {
        let adapter = self
            .get(view)
            .ok_or_else(|| AdapterError::UnknownView(view.to_string()))?;
        Ok(adapter.to_view(record))
    }

    pub fn from_view(
        &self,
        view: AnalysisView,
        record: &ViewRecord,
    ) -> Result<CircuitRecord, AdapterError> {
        let adapter = self
            .get(view)
            .ok_or_else(|| AdapterError::UnknownView(view.to_string()))?;
        adapter.from_view(record)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Re-export adapters
pub use ampacity::AmpacityView;
pub use load_schedule::LoadScheduleView;
pub use voltage_drop::VoltageDropView;
