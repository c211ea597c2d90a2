use serde::{Deserialize, Serialize};

use crate::job::CalcType;

/// Steel charge in grams. `mn_field` is passed to the solver verbatim; an
/// empty string leaves manganese out of the charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteelInput {
    #[serde(rename = "Fe_g")]
    pub fe_g: f64,
    #[serde(rename = "Mn_field", default)]
    pub mn_field: String,
    #[serde(rename = "Si_g")]
    pub si_g: f64,
    #[serde(rename = "Al_g")]
    pub al_g: f64,
    #[serde(rename = "O_g")]
    pub o_g: f64,
    #[serde(rename = "S_g")]
    pub s_g: f64,
}

impl SteelInput {
    /// Sum of the numeric steel masses.
    pub fn total_g(&self) -> f64 {
        self.fe_g + self.si_g + self.al_g + self.o_g + self.s_g
    }
}

/// Slag charge in grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlagInput {
    #[serde(rename = "CaO_g")]
    pub cao_g: f64,
    #[serde(rename = "Al2O3_g")]
    pub al2o3_g: f64,
    #[serde(rename = "SiO2_g")]
    pub sio2_g: f64,
}

impl SlagInput {
    pub fn total_g(&self) -> f64 {
        self.cao_g + self.al2o3_g + self.sio2_g
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(rename = "T_C")]
    pub temperature_c: f64,
    #[serde(rename = "P_atm", default = "default_pressure_atm")]
    pub pressure_atm: f64,
}

/// Unit of the target level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MassUnit {
    #[serde(rename = "ppm")]
    Ppm,
    #[default]
    #[serde(rename = "wtpct", alias = "wt%", alias = "mass%", alias = "pct")]
    WeightPercent,
}

impl MassUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            MassUnit::Ppm => "ppm",
            MassUnit::WeightPercent => "wtpct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub element: String,
    pub value: f64,
    #[serde(default)]
    pub unit: MassUnit,
}

/// A single additive-estimate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub calc_type: CalcType,
    pub steel: SteelInput,
    pub slag: SlagInput,
    pub conditions: Conditions,
    pub target: Target,
    #[serde(default = "default_solve_species")]
    pub solve_species: String,
    #[serde(default = "default_alpha_guess")]
    pub alpha_guess: f64,
    #[serde(default = "default_alpha_max")]
    pub alpha_max: f64,
}

fn default_pressure_atm() -> f64 {
    1.0
}

fn default_solve_species() -> String {
    "Ca".to_string()
}

fn default_alpha_guess() -> f64 {
    0.5
}

fn default_alpha_max() -> f64 {
    10.0
}
