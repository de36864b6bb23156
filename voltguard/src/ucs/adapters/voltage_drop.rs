//! Voltage-Drop Analysis View
//!
//! Shape used by the voltage-drop worksheet: short electrical names, one
//! row per circuit.

use super::{AnalysisView, ViewAdapter};

const RENAMES: &[(&str, &str)] = &[
    ("id", "circuit_id"),
    ("length_m", "length"),
    ("conductor_size", "wire_size"),
    ("conductor_material", "material"),
    ("phase", "phase_type"),
    ("current_a", "current"),
    ("voltage_v", "voltage"),
    ("power_factor", "pf"),
    ("insulation_class", "insulation_type"),
    ("ambient_temp_c", "ambient_temp"),
];

/// Adapter for the voltage-drop analysis view
pub struct VoltageDropView;

impl ViewAdapter for VoltageDropView {
    fn view(&self) -> AnalysisView {
        AnalysisView::VoltageDrop
    }

    fn description(&self) -> &str {
        "Voltage-drop worksheet: length, wire size, load, and supply per circuit"
    }

    fn renames(&self) -> &[(&'static str, &'static str)] {
        RENAMES
    }
}
