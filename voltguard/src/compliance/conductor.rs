//! Standard Conductor Data
//!
//! Building-wire sizes with their cross-sectional areas and base
//! ampacities (conductors in raceway, 30 °C ambient, not more than three
//! current-carrying conductors), plus per-unit-length resistivity and
//! reactance constants.
//!
//! Sizes are ordered by cross-sectional area, smallest first.

use crate::ucs::schema::{ConductorMaterial, ConduitMaterial, PhaseConfiguration, TemperatureRating};

/// Copper resistivity at 20 °C in Ω·mm²/m
pub const COPPER_RESISTIVITY: f64 = 0.017_24;

/// Aluminum resistivity at 20 °C in Ω·mm²/m
pub const ALUMINUM_RESISTIVITY: f64 = 0.028_26;

/// A standard conductor size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConductorSize {
    /// Display name, e.g. "12 AWG" or "250 kcmil"
    pub name: &'static str,
    /// Cross-sectional area in mm²
    pub area_mm2: f64,
    /// Copper ampacity for the 60/75/90 °C columns
    pub copper_ampacity: [f64; 3],
    /// Aluminum ampacity for the 60/75/90 °C columns (not listed for 14 AWG)
    pub aluminum_ampacity: Option<[f64; 3]>,
}

impl ConductorSize {
    /// Base ampacity for a material and insulation temperature rating
    pub fn base_ampacity(
        &self,
        material: ConductorMaterial,
        rating: TemperatureRating,
    ) -> Option<f64> {
        match material {
            ConductorMaterial::Copper => Some(self.copper_ampacity[rating.column()]),
            ConductorMaterial::Aluminum => self.aluminum_ampacity.map(|a| a[rating.column()]),
        }
    }

    /// Look up a standard size by name.
    ///
    /// Accepts "12 AWG", "12AWG", "12", "1/0", "1/0 AWG", "250 kcmil",
    /// "250 MCM" and similar spellings.
    pub fn parse(name: &str) -> Option<&'static ConductorSize> {
        let key = normalize_size_name(name)?;
        STANDARD_SIZES
            .iter()
            .find(|size| normalize_size_name(size.name).as_deref() == Some(key.as_str()))
    }

    /// The next larger standard size, if any
    pub fn next_larger(&self) -> Option<&'static ConductorSize> {
        let idx = STANDARD_SIZES.iter().position(|s| s.name == self.name)?;
        STANDARD_SIZES.get(idx + 1)
    }

    /// Largest standard size
    pub fn largest() -> &'static ConductorSize {
        &STANDARD_SIZES[STANDARD_SIZES.len() - 1]
    }

    /// All standard sizes, smallest first
    pub fn all() -> &'static [ConductorSize] {
        STANDARD_SIZES
    }
}

impl std::fmt::Display for ConductorSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn normalize_size_name(name: &str) -> Option<String> {
    let compact: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    let (number, unit) = if let Some(n) = compact.strip_suffix("KCMIL") {
        (n, "KCMIL")
    } else if let Some(n) = compact.strip_suffix("MCM") {
        (n, "KCMIL")
    } else if let Some(n) = compact.strip_suffix("AWG") {
        (n, "AWG")
    } else {
        (compact.as_str(), "")
    };

    if number.is_empty() {
        return None;
    }

    // Bare numbers of 250 and up are kcmil sizes; smaller ones are gauges.
    let unit = match unit {
        "" => match number.parse::<u32>() {
            Ok(n) if n >= 250 => "KCMIL",
            _ => "AWG",
        },
        u => u,
    };

    Some(format!("{}{}", number, unit))
}

const fn size(
    name: &'static str,
    area_mm2: f64,
    copper_ampacity: [f64; 3],
    aluminum_ampacity: Option<[f64; 3]>,
) -> ConductorSize {
    ConductorSize {
        name,
        area_mm2,
        copper_ampacity,
        aluminum_ampacity,
    }
}

/// Standard sizes from 14 AWG to 1000 kcmil
pub static STANDARD_SIZES: &[ConductorSize] = &[
    size("14 AWG", 2.08, [15.0, 20.0, 25.0], None),
    size("12 AWG", 3.31, [20.0, 25.0, 30.0], Some([15.0, 20.0, 25.0])),
    size("10 AWG", 5.26, [30.0, 35.0, 40.0], Some([25.0, 30.0, 35.0])),
    size("8 AWG", 8.37, [40.0, 50.0, 55.0], Some([35.0, 40.0, 45.0])),
    size("6 AWG", 13.3, [55.0, 65.0, 75.0], Some([40.0, 50.0, 55.0])),
    size("4 AWG", 21.2, [70.0, 85.0, 95.0], Some([55.0, 65.0, 75.0])),
    size("3 AWG", 26.7, [85.0, 100.0, 115.0], Some([65.0, 75.0, 85.0])),
    size("2 AWG", 33.6, [95.0, 115.0, 130.0], Some([75.0, 90.0, 100.0])),
    size("1 AWG", 42.4, [110.0, 130.0, 145.0], Some([85.0, 100.0, 115.0])),
    size("1/0 AWG", 53.5, [125.0, 150.0, 170.0], Some([100.0, 120.0, 135.0])),
    size("2/0 AWG", 67.4, [145.0, 175.0, 195.0], Some([115.0, 135.0, 150.0])),
    size("3/0 AWG", 85.0, [165.0, 200.0, 225.0], Some([130.0, 155.0, 175.0])),
    size("4/0 AWG", 107.2, [195.0, 230.0, 260.0], Some([150.0, 180.0, 205.0])),
    size("250 kcmil", 126.7, [215.0, 255.0, 290.0], Some([170.0, 205.0, 230.0])),
    size("300 kcmil", 152.0, [240.0, 285.0, 320.0], Some([195.0, 230.0, 260.0])),
    size("350 kcmil", 177.3, [260.0, 310.0, 350.0], Some([210.0, 250.0, 280.0])),
    size("400 kcmil", 202.7, [280.0, 335.0, 380.0], Some([225.0, 270.0, 305.0])),
    size("500 kcmil", 253.4, [320.0, 380.0, 430.0], Some([260.0, 310.0, 350.0])),
    size("600 kcmil", 304.0, [350.0, 420.0, 475.0], Some([285.0, 340.0, 385.0])),
    size("750 kcmil", 380.0, [400.0, 475.0, 535.0], Some([320.0, 385.0, 435.0])),
    size("1000 kcmil", 506.7, [455.0, 545.0, 615.0], Some([375.0, 445.0, 500.0])),
];

/// Material resistivity in Ω·mm²/m
pub fn resistivity(material: ConductorMaterial) -> f64 {
    match material {
        ConductorMaterial::Copper => COPPER_RESISTIVITY,
        ConductorMaterial::Aluminum => ALUMINUM_RESISTIVITY,
    }
}

/// Inductive reactance per metre of conductor in Ω/m.
///
/// Magnetic (steel) raceway raises reactance; three-phase spacing runs
/// slightly higher than a single-phase pair.
pub fn reactance_per_m(conduit: ConduitMaterial, phase: PhaseConfiguration) -> f64 {
    let ohms_per_km = match (conduit, phase) {
        (ConduitMaterial::Pvc, PhaseConfiguration::Single) => 0.167,
        (ConduitMaterial::Pvc, PhaseConfiguration::Three) => 0.171,
        (ConduitMaterial::Aluminum, PhaseConfiguration::Single) => 0.167,
        (ConduitMaterial::Aluminum, PhaseConfiguration::Three) => 0.171,
        (ConduitMaterial::Steel, PhaseConfiguration::Single) => 0.213,
        (ConduitMaterial::Steel, PhaseConfiguration::Three) => 0.223,
    };
    ohms_per_km / 1000.0
}
