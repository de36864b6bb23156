//! Change Tracker
//!
//! Compares two snapshots of the same circuit and reports what changed.
//! Every recorded change is delivered synchronously to all listeners, one
//! callback per change. Identical snapshots produce nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::listeners::{ListenerHandle, ListenerRegistry};
use crate::ucs::schema::CircuitRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A recorded change to one circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub circuit_id: String,
    pub kind: ChangeKind,
    /// Names of the top-level fields that differ. Informational only:
    /// consumers must not depend on it for correctness.
    pub changed_fields: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Field-level diff between two snapshots, in declaration order
pub fn diff_fields(previous: &CircuitRecord, current: &CircuitRecord) -> Vec<String> {
    let mut fields = Vec::new();
    let mut check = |name: &str, changed: bool| {
        if changed {
            fields.push(name.to_string());
        }
    };

    check("id", previous.id != current.id);
    check("description", previous.description != current.description);
    check("length_m", previous.length_m != current.length_m);
    check("conductor_size", previous.conductor_size != current.conductor_size);
    check("conductor_material", previous.conductor_material != current.conductor_material);
    check("conduit_material", previous.conduit_material != current.conduit_material);
    check("phase", previous.phase != current.phase);
    check("current_a", previous.current_a != current.current_a);
    check("voltage_v", previous.voltage_v != current.voltage_v);
    check("power_factor", previous.power_factor != current.power_factor);
    check("efficiency", previous.efficiency != current.efficiency);
    check("breaker_id", previous.breaker_id != current.breaker_id);
    check("circuit_type", previous.circuit_type != current.circuit_type);
    check("params", previous.params != current.params);
    check("installation", previous.installation != current.installation);
    check("extensions", previous.extensions != current.extensions);

    fields
}

/// Emits change records to registered listeners
#[derive(Default)]
pub struct ChangeTracker {
    listeners: ListenerRegistry<ChangeRecord>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for change records
    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&ChangeRecord) + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    /// Compare snapshots and notify listeners if anything changed.
    ///
    /// `previous = None` records a newly created circuit.
    pub fn record(
        &self,
        previous: Option<&CircuitRecord>,
        current: &CircuitRecord,
    ) -> Option<ChangeRecord> {
        let (kind, changed_fields) = match previous {
            None => (ChangeKind::Created, Vec::new()),
            Some(prev) => {
                let fields = diff_fields(prev, current);
                if fields.is_empty() {
                    return None;
                }
                (ChangeKind::Modified, fields)
            }
        };

        let change = ChangeRecord {
            circuit_id: current.id.clone(),
            kind,
            changed_fields,
            timestamp: Utc::now(),
        };
        tracing::debug!(
            "Circuit {} {:?}: {:?}",
            change.circuit_id,
            change.kind,
            change.changed_fields
        );
        self.listeners.notify(&change);
        Some(change)
    }

    /// Record that a circuit was deleted
    pub fn record_removal(&self, circuit_id: &str) -> ChangeRecord {
        let change = ChangeRecord {
            circuit_id: circuit_id.to_string(),
            kind: ChangeKind::Removed,
            changed_fields: Vec::new(),
            timestamp: Utc::now(),
        };
        self.listeners.notify(&change);
        change
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
