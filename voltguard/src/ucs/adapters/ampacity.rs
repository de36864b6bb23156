//! Ampacity View

use super::{AnalysisView, ViewAdapter};

const RENAMES: &[(&str, &str)] = &[
    ("id", "circuit_id"),
    ("conductor_size", "conductor"),
    ("conductor_material", "material"),
    ("current_a", "load_current"),
    ("insulation_class", "insulation"),
    ("ambient_temp_c", "ambient_c"),
    ("parallel_sets", "sets_in_parallel"),
    ("bundle_derating_factor", "bundle_factor"),
];

/// Adapter for the conductor ampacity view
pub struct AmpacityView;

impl ViewAdapter for AmpacityView {
    fn view(&self) -> AnalysisView {
        AnalysisView::Ampacity
    }

    fn description(&self) -> &str {
        "Conductor ampacity check: size, insulation, ambient, and derating inputs"
    }

    fn renames(&self) -> &[(&'static str, &'static str)] {
        RENAMES
    }
}
