//! Deterministic stand-in for the solver.
//!
//! Produces plausible compositions from the request alone so the rest of the
//! pipeline can be exercised on machines without a solver licence.

use std::time::Duration;

use tracing::debug;

use crate::application::results::{round_to, weight_percent};
use crate::domain::request::to_mass_fraction;
use crate::domain::types::{CalcType, CalculationResult, JobRequest, SlagResult, SteelResult};

const KELVIN_OFFSET: f64 = 273.15;

/// Sleep for `delay`, then compute the synthetic result.
pub async fn run_mock(request: &JobRequest, delay: Duration) -> CalculationResult {
    if !delay.is_zero() {
        debug!(
            target = "application::solver::mock",
            op = "mock::delay",
            delay_ms = delay.as_millis() as u64,
            "Simulating solver latency"
        );
        tokio::time::sleep(delay).await;
    }
    mock_result(request)
}

/// Same request in, same result out.
pub fn mock_result(request: &JobRequest) -> CalculationResult {
    match request.calc_type {
        CalcType::Deoxidation => deoxidation(request),
        CalcType::Desulfurization => desulfurization(request),
    }
}

struct Totals {
    steel_g: f64,
    slag_g: f64,
}

impl Totals {
    fn of(request: &JobRequest) -> Self {
        Self {
            steel_g: request.steel.total_g(),
            slag_g: request.slag.total_g(),
        }
    }

    fn steel_pct(&self, grams: f64) -> f64 {
        weight_percent(grams, self.steel_g)
    }

    fn slag_pct(&self, grams: f64) -> f64 {
        weight_percent(grams, self.slag_g)
    }
}

fn target_wtpct(request: &JobRequest) -> f64 {
    to_mass_fraction(request.target.value, request.target.unit) * 100.0
}

fn deoxidation(request: &JobRequest) -> CalculationResult {
    let totals = Totals::of(request);
    let steel = &request.steel;
    let slag = &request.slag;
    let alpha = round_to(steel.o_g * 62.5 + 0.002, 4);
    let o_ppm = round_to((steel.o_g * 1e4 * 0.28).max(1.0), 1);

    CalculationResult {
        alpha_g: alpha,
        solve_species: request.solve_species.clone(),
        temperature_k: request.conditions.temperature_c + KELVIN_OFFSET,
        pressure_atm: request.conditions.pressure_atm,
        steel: SteelResult {
            fe_wtpct: round_to(totals.steel_pct(steel.fe_g), 3),
            mn_wtpct: 0.0,
            si_wtpct: round_to(totals.steel_pct(steel.si_g) * 0.94, 4),
            al_wtpct: round_to(target_wtpct(request), 6),
            o_wtpct: round_to(o_ppm / 1e4, 5),
            o_ppm,
            s_wtpct: round_to(totals.steel_pct(steel.s_g) * 0.82, 5),
            total_g: round_to(totals.steel_g, 2),
        },
        slag: SlagResult {
            cao_wtpct: round_to(totals.slag_pct(slag.cao_g) * 1.05, 2),
            al2o3_wtpct: round_to(totals.slag_pct(slag.al2o3_g) * 0.95, 2),
            sio2_wtpct: round_to(totals.slag_pct(slag.sio2_g) * 0.88, 2),
            mno_wtpct: 0.52,
            feo_wtpct: 0.78,
            cas_wtpct: 2.14,
            total_g: round_to(totals.slag_g + alpha * 0.6, 2),
        },
    }
}

fn desulfurization(request: &JobRequest) -> CalculationResult {
    let totals = Totals::of(request);
    let steel = &request.steel;
    let slag = &request.slag;
    let alpha = round_to(steel.s_g * 35.0 + 0.005, 4);
    let o_ppm = round_to((steel.o_g * 1e4 * 0.73).max(3.0), 1);

    CalculationResult {
        alpha_g: alpha,
        solve_species: request.solve_species.clone(),
        temperature_k: request.conditions.temperature_c + KELVIN_OFFSET,
        pressure_atm: request.conditions.pressure_atm,
        steel: SteelResult {
            fe_wtpct: round_to(totals.steel_pct(steel.fe_g), 3),
            mn_wtpct: 0.0,
            si_wtpct: round_to(totals.steel_pct(steel.si_g) * 0.92, 4),
            al_wtpct: round_to(totals.steel_pct(steel.al_g) * 0.86, 5),
            o_wtpct: round_to(o_ppm / 1e4, 5),
            o_ppm,
            s_wtpct: round_to(target_wtpct(request), 6),
            total_g: round_to(totals.steel_g, 2),
        },
        slag: SlagResult {
            cao_wtpct: round_to(totals.slag_pct(slag.cao_g) * 0.96, 2),
            al2o3_wtpct: round_to(totals.slag_pct(slag.al2o3_g) * 0.93, 2),
            sio2_wtpct: round_to(totals.slag_pct(slag.sio2_g) * 0.85, 2),
            mno_wtpct: 0.41,
            feo_wtpct: 0.58,
            cas_wtpct: 5.83,
            total_g: round_to(totals.slag_g + alpha * 0.8, 2),
        },
    }
}
