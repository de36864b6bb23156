//! Load Schedule View
//!
//! Panel-schedule shape: circuit number, load description, breaker, and
//! demand data.

use super::{AnalysisView, ViewAdapter};

const RENAMES: &[(&str, &str)] = &[
    ("id", "circuit_no"),
    ("description", "load_description"),
    ("current_a", "load_amps"),
    ("voltage_v", "volts"),
    ("breaker_id", "breaker"),
    ("circuit_type", "load_type"),
    ("conductor_size", "wire_size"),
    ("demand_factor", "demand"),
    ("diversity_factor", "diversity"),
];

/// Adapter for the load schedule view
pub struct LoadScheduleView;

impl ViewAdapter for LoadScheduleView {
    fn view(&self) -> AnalysisView {
        AnalysisView::LoadSchedule
    }

    fn description(&self) -> &str {
        "Panel load schedule: circuit number, load, breaker, and demand factors"
    }

    fn renames(&self) -> &[(&'static str, &'static str)] {
        RENAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ucs::schema::*;
    use serde_json::json;

    #[test]
    fn test_demand_factor_lifted_and_renamed() {
        let record = CircuitRecord::new("SVC")
            .with_circuit_type(CircuitType::Service)
            .with_breaker("MDP-1")
            .with_params(CircuitTypeParams {
                demand_factor: Some(0.8),
                ..Default::default()
            });
        let view = LoadScheduleView.to_view(&record);

        assert_eq!(view.get("circuit_no"), Some(&json!("SVC")));
        assert_eq!(view.get("breaker"), Some(&json!("MDP-1")));
        assert_eq!(view.get("load_type"), Some(&json!("service")));
        assert_eq!(view.get("demand"), Some(&json!(0.8)));
        assert!(!view.contains_key("params"));
    }
}
