//! Voltage-Drop Compliance Module
//!
//! Implements the circuit calculation: ampacity derating, voltage drop,
//! power loss, code-compliance verdicts, recommendations and the
//! minimum-conductor-size search.

pub mod ampacity;
pub mod conductor;
pub mod recommendations;
pub mod voltage_drop;

pub use ampacity::*;
pub use conductor::*;
pub use recommendations::{AdvisoryThresholds, ADEQUATE_MESSAGE};
pub use voltage_drop::*;
