use serde::{Deserialize, Serialize};

/// Equilibrium composition of the liquid metal phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteelResult {
    #[serde(rename = "Fe_wtpct")]
    pub fe_wtpct: f64,
    #[serde(rename = "Mn_wtpct")]
    pub mn_wtpct: f64,
    #[serde(rename = "Si_wtpct")]
    pub si_wtpct: f64,
    #[serde(rename = "Al_wtpct")]
    pub al_wtpct: f64,
    #[serde(rename = "O_wtpct")]
    pub o_wtpct: f64,
    #[serde(rename = "O_ppm")]
    pub o_ppm: f64,
    #[serde(rename = "S_wtpct")]
    pub s_wtpct: f64,
    pub total_g: f64,
}

/// Equilibrium composition of the liquid slag phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlagResult {
    #[serde(rename = "CaO_wtpct")]
    pub cao_wtpct: f64,
    #[serde(rename = "Al2O3_wtpct")]
    pub al2o3_wtpct: f64,
    #[serde(rename = "SiO2_wtpct")]
    pub sio2_wtpct: f64,
    #[serde(rename = "MnO_wtpct")]
    pub mno_wtpct: f64,
    #[serde(rename = "FeO_wtpct")]
    pub feo_wtpct: f64,
    #[serde(rename = "CaS_wtpct")]
    pub cas_wtpct: f64,
    pub total_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Required mass of the solving species in grams.
    pub alpha_g: f64,
    pub solve_species: String,
    #[serde(rename = "T_K")]
    pub temperature_k: f64,
    #[serde(rename = "P_atm")]
    pub pressure_atm: f64,
    pub steel: SteelResult,
    pub slag: SlagResult,
}
