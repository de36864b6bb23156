//! Ampacity Derating
//!
//! Ambient-temperature correction and bundling adjustment for conductor
//! ampacity.
//!
//! The correction factor is found by linear interpolation between the two
//! nearest ambient breakpoints of the table for the insulation's
//! temperature rating. Ambient temperatures outside a table's range clamp
//! to the nearest endpoint.
//!
//! Each rating (60/75/90 °C) owns its own table so the three can be tuned
//! independently.

use serde::{Deserialize, Serialize};

use crate::ucs::schema::TemperatureRating;

/// One ambient-temperature breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPoint {
    pub ambient_c: f64,
    pub factor: f64,
}

/// Correction table for a single temperature rating. Breakpoints are kept
/// sorted by ambient temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionTable {
    points: Vec<CorrectionPoint>,
}

impl CorrectionTable {
    /// Build a table from `(ambient °C, factor)` pairs in any order
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<CorrectionPoint> = points
            .into_iter()
            .map(|(ambient_c, factor)| CorrectionPoint { ambient_c, factor })
            .collect();
        points.sort_by(|a, b| a.ambient_c.total_cmp(&b.ambient_c));
        Self { points }
    }

    pub fn points(&self) -> &[CorrectionPoint] {
        &self.points
    }

    /// Interpolated correction factor for an ambient temperature.
    ///
    /// An empty table yields 1.0.
    pub fn factor(&self, ambient_c: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0,
        };

        if ambient_c <= first.ambient_c {
            return first.factor;
        }
        if ambient_c >= last.ambient_c {
            return last.factor;
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if ambient_c >= lo.ambient_c && ambient_c <= hi.ambient_c {
                let span = hi.ambient_c - lo.ambient_c;
                if span <= 0.0 {
                    return lo.factor;
                }
                let t = (ambient_c - lo.ambient_c) / span;
                return lo.factor + t * (hi.factor - lo.factor);
            }
        }

        last.factor
    }
}

/// Correction tables for all three temperature ratings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureCorrectionTables {
    #[serde(rename = "60C", default = "default_table_60")]
    pub rated_60c: CorrectionTable,
    #[serde(rename = "75C", default = "default_table_75")]
    pub rated_75c: CorrectionTable,
    #[serde(rename = "90C", default = "default_table_90")]
    pub rated_90c: CorrectionTable,
}

impl TemperatureCorrectionTables {
    pub fn table(&self, rating: TemperatureRating) -> &CorrectionTable {
        match rating {
            TemperatureRating::C60 => &self.rated_60c,
            TemperatureRating::C75 => &self.rated_75c,
            TemperatureRating::C90 => &self.rated_90c,
        }
    }

    pub fn table_mut(&mut self, rating: TemperatureRating) -> &mut CorrectionTable {
        match rating {
            TemperatureRating::C60 => &mut self.rated_60c,
            TemperatureRating::C75 => &mut self.rated_75c,
            TemperatureRating::C90 => &mut self.rated_90c,
        }
    }

    pub fn factor(&self, rating: TemperatureRating, ambient_c: f64) -> f64 {
        self.table(rating).factor(ambient_c)
    }
}

impl Default for TemperatureCorrectionTables {
    fn default() -> Self {
        Self {
            rated_60c: default_table_60(),
            rated_75c: default_table_75(),
            rated_90c: default_table_90(),
        }
    }
}

// Factors relative to a 30 °C base. A factor of 0 means the conductor may not
// be used at that ambient.
fn default_table_60() -> CorrectionTable {
    CorrectionTable::new([
        (10.0, 1.29),
        (15.0, 1.22),
        (20.0, 1.15),
        (25.0, 1.08),
        (30.0, 1.00),
        (35.0, 0.91),
        (40.0, 0.82),
        (45.0, 0.71),
        (50.0, 0.58),
        (55.0, 0.41),
        (60.0, 0.0),
    ])
}

fn default_table_75() -> CorrectionTable {
    CorrectionTable::new([
        (10.0, 1.20),
        (15.0, 1.15),
        (20.0, 1.11),
        (25.0, 1.05),
        (30.0, 1.00),
        (35.0, 0.94),
        (40.0, 0.88),
        (45.0, 0.82),
        (50.0, 0.75),
        (55.0, 0.67),
        (60.0, 0.58),
        (65.0, 0.47),
        (70.0, 0.33),
        (75.0, 0.0),
    ])
}

fn default_table_90() -> CorrectionTable {
    CorrectionTable::new([
        (10.0, 1.15),
        (15.0, 1.12),
        (20.0, 1.08),
        (25.0, 1.04),
        (30.0, 1.00),
        (35.0, 0.96),
        (40.0, 0.91),
        (45.0, 0.87),
        (50.0, 0.82),
        (55.0, 0.76),
        (60.0, 0.71),
        (65.0, 0.65),
        (70.0, 0.58),
        (75.0, 0.50),
        (80.0, 0.41),
        (90.0, 0.0),
    ])
}

/// Adjustment factor for more than three current-carrying conductors in
/// one raceway or cable.
pub fn bundle_adjustment_factor(current_carrying_conductors: u32) -> f64 {
    match current_carrying_conductors {
        0..=3 => 1.0,
        4..=6 => 0.80,
        7..=9 => 0.70,
        10..=20 => 0.50,
        21..=30 => 0.45,
        31..=40 => 0.40,
        _ => 0.35,
    }
}

/// Breakdown of a derated ampacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeratedAmpacity {
    pub base_a: f64,
    pub temperature_factor: f64,
    pub bundle_factor: f64,
    pub parallel_sets: u32,
    pub ampacity_a: f64,
}

/// Apply temperature and bundle derating to a base ampacity, then scale by
/// the number of parallel sets.
pub fn derate(
    base_a: f64,
    temperature_factor: f64,
    bundle_factor: f64,
    parallel_sets: u32,
) -> DeratedAmpacity {
    DeratedAmpacity {
        base_a,
        temperature_factor,
        bundle_factor,
        parallel_sets,
        ampacity_a: base_a * temperature_factor * bundle_factor * f64::from(parallel_sets),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_at_breakpoints() {
        let tables = TemperatureCorrectionTables::default();
        assert_eq!(tables.factor(TemperatureRating::C75, 30.0), 1.0);
        assert_eq!(tables.factor(TemperatureRating::C75, 40.0), 0.88);
        assert_eq!(tables.factor(TemperatureRating::C90, 50.0), 0.82);
    }

    #[test]
    fn test_linear_interpolation() {
        let tables = TemperatureCorrectionTables::default();
        // Halfway between 30 °C (1.00) and 35 °C (0.94)
        let f = tables.factor(TemperatureRating::C75, 32.5);
        assert!((f - 0.97).abs() < 1e-9, "factor: {}", f);
    }

    #[test]
    fn test_clamps_outside_range() {
        let tables = TemperatureCorrectionTables::default();
        assert_eq!(tables.factor(TemperatureRating::C60, -20.0), 1.29);
        assert_eq!(tables.factor(TemperatureRating::C60, 95.0), 0.0);
        assert_eq!(tables.factor(TemperatureRating::C90, 5.0), 1.15);
    }

    #[test]
    fn test_tables_are_independent() {
        let mut tables = TemperatureCorrectionTables::default();
        let before_60 = tables.factor(TemperatureRating::C60, 40.0);
        let before_90 = tables.factor(TemperatureRating::C90, 40.0);

        *tables.table_mut(TemperatureRating::C75) =
            CorrectionTable::new([(0.0, 0.5), (100.0, 0.5)]);

        assert_eq!(tables.factor(TemperatureRating::C75, 40.0), 0.5);
        assert_eq!(tables.factor(TemperatureRating::C60, 40.0), before_60);
        assert_eq!(tables.factor(TemperatureRating::C90, 40.0), before_90);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let table = CorrectionTable::new([(40.0, 0.8), (20.0, 1.2), (30.0, 1.0)]);
        assert_eq!(table.points()[0].ambient_c, 20.0);
        assert!((table.factor(25.0) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_table_is_neutral() {
        let table = CorrectionTable::new(Vec::<(f64, f64)>::new());
        assert_eq!(table.factor(45.0), 1.0);
    }

    #[test]
    fn test_bundle_adjustment() {
        assert_eq!(bundle_adjustment_factor(3), 1.0);
        assert_eq!(bundle_adjustment_factor(4), 0.80);
        assert_eq!(bundle_adjustment_factor(9), 0.70);
        assert_eq!(bundle_adjustment_factor(12), 0.50);
        assert_eq!(bundle_adjustment_factor(64), 0.35);
    }

    #[test]
    fn test_derate_scales_by_parallel_sets() {
        let single = derate(100.0, 0.9, 0.8, 1);
        let double = derate(100.0, 0.9, 0.8, 2);
        assert!((single.ampacity_a - 72.0).abs() < 1e-9);
        assert!((double.ampacity_a - 144.0).abs() < 1e-9);
    }
}
