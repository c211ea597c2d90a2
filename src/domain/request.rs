//! Request-level checks and unit conversion.

use super::combination::{ensure_combination, require_whitelisted};
use super::error::ValidationError;
use super::types::{CombinationVerdict, JobRequest, MassUnit};

/// Convert a target level to a mass fraction.
pub fn to_mass_fraction(value: f64, unit: MassUnit) -> f64 {
    match unit {
        MassUnit::Ppm => value / 1_000_000.0,
        _ => value / 100.0,
    }
}

/// Pre-flight gate for a request: numeric bounds, whitelist membership and
/// the combination matrix. A rejected request must never become a job.
pub fn validate_request(request: &JobRequest) -> Result<CombinationVerdict, ValidationError> {
    check_positive("steel.Fe_g", request.steel.fe_g)?;
    check_single_line("steel.Mn_field", &request.steel.mn_field)?;
    check_non_negative("steel.Si_g", request.steel.si_g)?;
    check_non_negative("steel.Al_g", request.steel.al_g)?;
    check_non_negative("steel.O_g", request.steel.o_g)?;
    check_non_negative("steel.S_g", request.steel.s_g)?;
    check_non_negative("slag.CaO_g", request.slag.cao_g)?;
    check_non_negative("slag.Al2O3_g", request.slag.al2o3_g)?;
    check_non_negative("slag.SiO2_g", request.slag.sio2_g)?;
    check_finite("conditions.T_C", request.conditions.temperature_c)?;
    check_positive("conditions.P_atm", request.conditions.pressure_atm)?;
    check_positive("target.value", request.target.value)?;
    check_positive("alpha_guess", request.alpha_guess)?;
    check_positive("alpha_max", request.alpha_max)?;
    if request.alpha_guess > request.alpha_max {
        return Err(ValidationError::invalid_field(
            "alpha_guess",
            format!(
                "initial guess {} exceeds search bound {}",
                request.alpha_guess, request.alpha_max
            ),
        ));
    }

    require_whitelisted(&request.solve_species)?;
    ensure_combination(&request.solve_species, &request.target.element)
}

/// Free-text fields are written verbatim into the solver input.
fn check_single_line(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(ValidationError::invalid_field(
            field,
            "must not contain line breaks or control characters",
        ));
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::invalid_field(field, "must be a finite number"))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::invalid_field(field, "must not be negative"));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::invalid_field(field, "must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::types::{
        CalcType, Conditions, JobRequest, MassUnit, SlagInput, SteelInput, Target,
    };

    pub(crate) fn deoxidation_request() -> JobRequest {
        JobRequest {
            calc_type: CalcType::Deoxidation,
            steel: SteelInput {
                fe_g: 100.0,
                mn_field: String::new(),
                si_g: 0.25,
                al_g: 0.04,
                o_g: 0.002,
                s_g: 0.005,
            },
            slag: SlagInput {
                cao_g: 5.5,
                al2o3_g: 3.5,
                sio2_g: 1.0,
            },
            conditions: Conditions {
                temperature_c: 1600.0,
                pressure_atm: 1.0,
            },
            target: Target {
                element: "Al".to_string(),
                value: 0.01,
                unit: MassUnit::WeightPercent,
            },
            solve_species: "Ca".to_string(),
            alpha_guess: 0.5,
            alpha_max: 10.0,
        }
    }

    pub(crate) fn desulfurization_request() -> JobRequest {
        JobRequest {
            calc_type: CalcType::Desulfurization,
            target: Target {
                element: "S".to_string(),
                value: 20.0,
                unit: MassUnit::Ppm,
            },
            ..deoxidation_request()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::deoxidation_request;
    use super::*;
    use crate::domain::types::VerdictLevel;

    #[test]
    fn ppm_divides_by_one_million() {
        let fraction = to_mass_fraction(50.0, MassUnit::Ppm);
        assert!((fraction - 0.00005).abs() < 1e-15);
    }

    #[test]
    fn weight_percent_divides_by_one_hundred() {
        let fraction = to_mass_fraction(0.01, MassUnit::WeightPercent);
        assert!((fraction - 0.0001).abs() < 1e-15);
    }

    #[test]
    fn valid_request_passes_with_verdict() {
        let verdict = validate_request(&deoxidation_request()).expect("valid");
        assert_eq!(verdict.level, VerdictLevel::Ok);
    }

    #[test]
    fn iron_mass_must_be_positive() {
        let mut request = deoxidation_request();
        request.steel.fe_g = 0.0;
        let err = validate_request(&request).expect_err("zero iron");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field: "steel.Fe_g", .. }
        ));
    }

    #[test]
    fn manganese_field_must_stay_on_one_line() {
        for value in ["0.3\nEND", "0.3\r", "0.3\t1"] {
            let mut request = deoxidation_request();
            request.steel.mn_field = value.to_string();
            let err = validate_request(&request).expect_err("multi-line Mn");
            assert!(matches!(
                err,
                ValidationError::InvalidField {
                    field: "steel.Mn_field",
                    ..
                }
            ));
        }

        let mut request = deoxidation_request();
        request.steel.mn_field = "0.3".to_string();
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn negative_slag_mass_is_rejected() {
        let mut request = deoxidation_request();
        request.slag.sio2_g = -1.0;
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn guess_above_bound_is_rejected() {
        let mut request = deoxidation_request();
        request.alpha_guess = 20.0;
        let err = validate_request(&request).expect_err("guess above max");
        assert!(err.to_string().contains("alpha_guess"));
    }

    #[test]
    fn rejected_combination_surfaces_as_validation_error() {
        let mut request = deoxidation_request();
        request.solve_species = "Al".to_string();
        let err = validate_request(&request).expect_err("blocked");
        assert!(matches!(err, ValidationError::RejectedCombination { .. }));
    }

    #[test]
    fn unknown_species_is_rejected_before_matrix() {
        let mut request = deoxidation_request();
        request.solve_species = "Zr".to_string();
        let err = validate_request(&request).expect_err("unknown");
        assert!(matches!(err, ValidationError::UnknownSpecies { .. }));
    }
}
