//! Static compatibility tables between target elements and solving species.
//!
//! The whitelist maps every solving species the service accepts to the state
//! token the solver input expects. The combination matrix then grades each
//! species per target element as recommended, allowed or blocked; species not
//! listed for an element are treated as blocked.

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::ValidationError;
use super::types::{CalcType, CombinationVerdict, VerdictLevel};

const WHITELIST: &[(&str, &str)] = &[
    ("Ca", "Ca(liq)"),
    ("Mg", "Mg(g)"),
    ("Al", "Al(liq)"),
    ("Si", "Si(liq)"),
    ("Ti", "Ti(s)"),
    ("CaSi2", "CaSi2(s)"),
    ("CaC2", "CaC2(s)"),
    ("CaO", "CaO(s)"),
];

#[derive(Debug, Clone, Copy)]
pub struct TargetRule {
    pub element: &'static str,
    pub calc_type: CalcType,
    pub recommended: &'static [&'static str],
    pub allowed: &'static [&'static str],
    pub blocked: &'static [&'static str],
}

const MATRIX: &[TargetRule] = &[
    TargetRule {
        element: "Al",
        calc_type: CalcType::Deoxidation,
        recommended: &["Ca"],
        allowed: &["Mg", "CaSi2"],
        blocked: &["Al", "Si", "Ti", "CaC2", "CaO"],
    },
    TargetRule {
        element: "O",
        calc_type: CalcType::Deoxidation,
        recommended: &["Al", "Ca"],
        allowed: &["Si", "Mg", "Ti", "CaSi2"],
        blocked: &["CaO", "CaC2"],
    },
    TargetRule {
        element: "S",
        calc_type: CalcType::Desulfurization,
        recommended: &["Ca", "CaO"],
        allowed: &["Mg", "CaSi2", "CaC2"],
        blocked: &["Al", "Si", "Ti"],
    },
];

/// Solver token for a whitelisted species.
pub fn whitelist_token(species: &str) -> Option<&'static str> {
    WHITELIST
        .iter()
        .find(|(name, _)| *name == species)
        .map(|(_, token)| *token)
}

/// Resolve the solver token or fail naming the valid set.
pub fn require_whitelisted(species: &str) -> Result<&'static str, ValidationError> {
    whitelist_token(species).ok_or_else(|| ValidationError::UnknownSpecies {
        species: species.to_string(),
        valid: whitelist_names().join(", "),
    })
}

pub fn whitelist_names() -> Vec<&'static str> {
    WHITELIST.iter().map(|(name, _)| *name).collect()
}

/// Whitelist as an ordered species → token map.
pub fn whitelist() -> BTreeMap<&'static str, &'static str> {
    WHITELIST.iter().copied().collect()
}

pub fn target_rule(element: &str) -> Option<&'static TargetRule> {
    MATRIX.iter().find(|rule| rule.element == element)
}

pub fn known_elements() -> Vec<&'static str> {
    MATRIX.iter().map(|rule| rule.element).collect()
}

/// Grade `solve_species` as a means of reaching `target_element`.
pub fn validate_combination(solve_species: &str, target_element: &str) -> CombinationVerdict {
    let Some(rule) = target_rule(target_element) else {
        return CombinationVerdict {
            level: VerdictLevel::Reject,
            message: format!(
                "target element `{target_element}` is not supported; known elements: {}",
                known_elements().join(", ")
            ),
        };
    };

    let recommended = rule.recommended.join(", ");

    if rule.recommended.contains(&solve_species) {
        return CombinationVerdict {
            level: VerdictLevel::Ok,
            message: format!("`{solve_species}` is recommended for controlling {target_element}"),
        };
    }

    if rule.allowed.contains(&solve_species) {
        return CombinationVerdict {
            level: VerdictLevel::Warn,
            message: format!(
                "`{solve_species}` can control {target_element} but convergence is less reliable; recommended: {recommended}"
            ),
        };
    }

    let reason = if rule.blocked.contains(&solve_species) {
        "is blocked for this target"
    } else {
        "is not a known solving species for this target"
    };

    CombinationVerdict {
        level: VerdictLevel::Reject,
        message: format!(
            "`{solve_species}` {reason} ({target_element}); use one of: {recommended}"
        ),
    }
}

/// Fail when the combination is rejected; warnings pass through.
pub fn ensure_combination(
    solve_species: &str,
    target_element: &str,
) -> Result<CombinationVerdict, ValidationError> {
    let verdict = validate_combination(solve_species, target_element);
    match verdict.level {
        VerdictLevel::Reject => Err(ValidationError::RejectedCombination {
            message: verdict.message,
        }),
        _ => Ok(verdict),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesOptions {
    pub recommended: Vec<&'static str>,
    pub allowed: Vec<&'static str>,
}

/// Calculation type → target element → selectable species.
pub fn calc_options() -> BTreeMap<&'static str, BTreeMap<&'static str, SpeciesOptions>> {
    let mut options: BTreeMap<&'static str, BTreeMap<&'static str, SpeciesOptions>> =
        BTreeMap::new();
    for rule in MATRIX {
        options.entry(rule.calc_type.as_str()).or_default().insert(
            rule.element,
            SpeciesOptions {
                recommended: rule.recommended.to_vec(),
                allowed: rule.allowed.to_vec(),
            },
        );
    }
    options
}
