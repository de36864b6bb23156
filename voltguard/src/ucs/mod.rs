//! Unified Circuit Schema (UCS) Module
//!
//! A single representation of one circuit's electrical properties, shared by
//! the calculator and the recalculation engine, plus adapters that convert
//! it to and from the flat shapes used by individual analysis views.

pub mod adapters;
pub mod schema;

// Re-export main types for convenience
pub use adapters::{AdapterError, AdapterRegistry, AnalysisView, ViewAdapter, ViewRecord};
pub use schema::*;
