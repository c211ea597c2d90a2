//! Equilib XML result parsing.
//!
//! The document carries a `<header>` describing solution phases and their
//! species, and a `<page>` with the scalar outcome (`alpha`, `T`, `P`) plus
//! one `<result id=".." g=".."/>` record per species.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::domain::types::{CalculationResult, SlagResult, SteelResult};

const METAL_MARKER: &str = "Fe-liq";
const PRIMARY_SLAG_MARKER: &str = "Slag-liq#1";
const SLAG_MARKER: &str = "Slag-liq";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read solver output `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("solver output is not well-formed XML: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("solver output is missing <{0}>")]
    MissingSection(&'static str),
    #[error("solver output <{element}> is missing attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("solver output attribute `{attribute}` is not a number: `{value}`")]
    InvalidNumber { attribute: String, value: String },
    #[error("solver output has no liquid metal phase (Fe-liq)")]
    MissingMetalPhase,
    #[error(
        "solver did not converge: {reason}; check the input file or widen the alpha search bounds"
    )]
    NonConvergence { reason: &'static str },
}

/// Read and parse the solver's XML output file.
pub async fn parse_result_file(
    path: &Path,
    solve_species: &str,
) -> Result<CalculationResult, ParseError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_result_xml(&text, solve_species)
}

pub fn parse_result_xml(text: &str, solve_species: &str) -> Result<CalculationResult, ParseError> {
    let document = Document::parse(text)?;
    let root = document.root_element();
    let header = child(root, "header").ok_or(ParseError::MissingSection("header"))?;
    let page = child(root, "page").ok_or(ParseError::MissingSection("page"))?;

    let alpha = required_number(page, "page", "alpha")?;
    let temperature = required_number(page, "page", "T")?;
    let pressure = required_number(page, "page", "P")?;
    if alpha == 0.0 && temperature == 0.0 && pressure == 0.0 {
        return Err(ParseError::NonConvergence {
            reason: "alpha, T and P are all zero",
        });
    }

    let definitions =
        child(header, "species_definition").ok_or(ParseError::MissingSection("species_definition"))?;
    let phases = PhaseIndex::from_header(header, definitions);

    let metal = phases
        .find(METAL_MARKER)
        .ok_or(ParseError::MissingMetalPhase)?;
    let slag = phases
        .find(PRIMARY_SLAG_MARKER)
        .or_else(|| phases.find(SLAG_MARKER));

    let records: Vec<Node<'_, '_>> = page
        .children()
        .filter(|node| node.has_tag_name("result"))
        .collect();
    if !records
        .iter()
        .any(|record| record.attribute("id").is_some_and(|id| !id.is_empty()))
    {
        return Err(ParseError::NonConvergence {
            reason: "no result record names a species",
        });
    }

    let mut inventory = PhaseInventory::default();
    for record in records {
        let Some(species_id) = record.attribute("id").filter(|id| !id.is_empty()) else {
            continue;
        };
        let Some(phase_id) = phases.phase_of(species_id) else {
            continue;
        };
        let grams = optional_number(record, "g")?.unwrap_or(0.0);
        inventory.add(phase_id, phases.name_of(species_id), grams);
    }

    let o_wtpct = inventory.weight_percent(Some(metal), "O");
    let steel = SteelResult {
        fe_wtpct: round_to(inventory.weight_percent(Some(metal), "Fe"), 4),
        mn_wtpct: round_to(inventory.weight_percent(Some(metal), "Mn"), 4),
        si_wtpct: round_to(inventory.weight_percent(Some(metal), "Si"), 4),
        al_wtpct: round_to(inventory.weight_percent(Some(metal), "Al"), 6),
        o_wtpct: round_to(o_wtpct, 5),
        o_ppm: round_to(o_wtpct * 1e4, 1),
        s_wtpct: round_to(inventory.weight_percent(Some(metal), "S"), 5),
        total_g: round_to(inventory.total(Some(metal)), 2),
    };
    let slag = SlagResult {
        cao_wtpct: round_to(inventory.weight_percent(slag, "CaO"), 2),
        al2o3_wtpct: round_to(inventory.weight_percent(slag, "Al2O3"), 2),
        sio2_wtpct: round_to(inventory.weight_percent(slag, "SiO2"), 2),
        mno_wtpct: round_to(inventory.weight_percent(slag, "MnO"), 2),
        feo_wtpct: round_to(inventory.weight_percent(slag, "FeO"), 2),
        cas_wtpct: round_to(inventory.weight_percent(slag, "CaS"), 2),
        total_g: round_to(inventory.total(slag), 2),
    };

    Ok(CalculationResult {
        alpha_g: round_to(alpha, 4),
        solve_species: solve_species.to_string(),
        temperature_k: temperature,
        pressure_atm: pressure,
        steel,
        slag,
    })
}

/// `100 × part ÷ total`, or exactly 0.0 when the total is not positive.
pub fn weight_percent(part_g: f64, total_g: f64) -> f64 {
    if total_g <= 0.0 {
        0.0
    } else {
        100.0 * part_g / total_g
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Species and phase lookups built from the header.
struct PhaseIndex<'a> {
    /// Phase id and state label, in document order.
    states: Vec<(&'a str, &'a str)>,
    species_phase: HashMap<&'a str, &'a str>,
    species_name: HashMap<&'a str, &'a str>,
}

impl<'a> PhaseIndex<'a> {
    fn from_header(header: Node<'a, '_>, definitions: Node<'a, '_>) -> Self {
        let mut states = Vec::new();
        let mut species_phase = HashMap::new();

        for solution in definitions
            .children()
            .filter(|node| node.has_tag_name("solution"))
        {
            let Some(phase_id) = solution.attribute("phase_id").filter(|id| !id.is_empty()) else {
                continue;
            };
            states.push((phase_id, solution.attribute("state").unwrap_or("")));
            for species in solution
                .descendants()
                .filter(|node| node.has_tag_name("species"))
            {
                if let Some(id) = species.attribute("id").filter(|id| !id.is_empty()) {
                    species_phase.insert(id, phase_id);
                }
            }
        }

        let mut species_name = HashMap::new();
        for species in header
            .descendants()
            .filter(|node| node.has_tag_name("species"))
        {
            if let Some(id) = species.attribute("id").filter(|id| !id.is_empty()) {
                species_name
                    .entry(id)
                    .or_insert_with(|| species.attribute("name").unwrap_or(id));
            }
        }

        Self {
            states,
            species_phase,
            species_name,
        }
    }

    fn find(&self, marker: &str) -> Option<&'a str> {
        self.states
            .iter()
            .find(|(_, state)| state.contains(marker))
            .map(|(phase_id, _)| *phase_id)
    }

    fn phase_of(&self, species_id: &str) -> Option<&'a str> {
        self.species_phase.get(species_id).copied()
    }

    fn name_of(&self, species_id: &'a str) -> &'a str {
        self.species_name
            .get(species_id)
            .copied()
            .unwrap_or(species_id)
    }
}

#[derive(Default)]
struct PhaseInventory<'a> {
    totals: HashMap<&'a str, f64>,
    species: HashMap<&'a str, HashMap<&'a str, f64>>,
}

impl<'a> PhaseInventory<'a> {
    fn add(&mut self, phase_id: &'a str, species: &'a str, grams: f64) {
        *self.totals.entry(phase_id).or_default() += grams;
        *self
            .species
            .entry(phase_id)
            .or_default()
            .entry(species)
            .or_default() += grams;
    }

    fn total(&self, phase_id: Option<&str>) -> f64 {
        phase_id
            .and_then(|id| self.totals.get(id).copied())
            .unwrap_or(0.0)
    }

    fn weight_percent(&self, phase_id: Option<&str>, species: &str) -> f64 {
        let Some(phase_id) = phase_id else {
            return 0.0;
        };
        let part = self
            .species
            .get(phase_id)
            .and_then(|inventory| inventory.get(species).copied())
            .unwrap_or(0.0);
        weight_percent(part, self.total(Some(phase_id)))
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|candidate| candidate.has_tag_name(name))
}

fn required_number(
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<f64, ParseError> {
    optional_number(node, attribute)?.ok_or(ParseError::MissingAttribute { element, attribute })
}

fn optional_number(node: Node<'_, '_>, attribute: &str) -> Result<Option<f64>, ParseError> {
    match node.attribute(attribute).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ParseError::InvalidNumber {
                attribute: attribute.to_string(),
                value: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"
  <header>
    <species_definition>
      <solution phase_id="p1" state="Fe-liq">
        <species id="1" name="Fe"/>
        <species id="2" name="Si"/>
        <species id="3" name="Al"/>
        <species id="4" name="O"/>
        <species id="5" name="S"/>
      </solution>
      <solution phase_id="p2" state="Slag-liq#1">
        <species id="10" name="CaO"/>
        <species id="11" name="Al2O3"/>
        <species id="12" name="SiO2"/>
        <species id="13" name="CaS"/>
      </solution>
      <solution phase_id="p3" state="gas">
        <species id="20" name="O2"/>
      </solution>
    </species_definition>
  </header>"#;

    fn document(page: &str) -> String {
        format!("<equilib>{HEADER}\n{page}\n</equilib>")
    }

    #[test]
    fn parses_metal_and_slag_compositions() {
        let xml = document(
            r#"<page alpha="0.1234567" T="1873.15" P="1">
                 <result id="1" g="99.0"/>
                 <result id="2" g="0.5"/>
                 <result id="3" g="0.25"/>
                 <result id="4" g="0.0025"/>
                 <result id="5" g="0.2475"/>
                 <result id="10" g="6.0"/>
                 <result id="11" g="3.0"/>
                 <result id="12" g="0.5"/>
                 <result id="13" g="0.5"/>
                 <result id="20" g="1.0"/>
                 <result id="99" g="42.0"/>
                 <result id="" g="7.0"/>
               </page>"#,
        );

        let result = parse_result_xml(&xml, "Ca").expect("parsed");
        assert_eq!(result.alpha_g, 0.1235);
        assert_eq!(result.solve_species, "Ca");
        assert_eq!(result.temperature_k, 1873.15);
        assert_eq!(result.pressure_atm, 1.0);
        assert_eq!(result.steel.total_g, 100.0);
        assert_eq!(result.steel.fe_wtpct, 99.0);
        assert_eq!(result.steel.si_wtpct, 0.5);
        assert_eq!(result.steel.al_wtpct, 0.25);
        assert_eq!(result.steel.o_wtpct, 0.0025);
        assert_eq!(result.steel.o_ppm, 25.0);
        assert_eq!(result.steel.mn_wtpct, 0.0);
        assert_eq!(result.slag.total_g, 10.0);
        assert_eq!(result.slag.cao_wtpct, 60.0);
        assert_eq!(result.slag.al2o3_wtpct, 30.0);
        assert_eq!(result.slag.cas_wtpct, 5.0);
        assert_eq!(result.slag.feo_wtpct, 0.0);
    }

    #[test]
    fn all_zero_scalars_signal_non_convergence() {
        let xml = document(
            r#"<page alpha="0" T="0" P="0"><result id="1" g="100"/></page>"#,
        );
        let err = parse_result_xml(&xml, "Ca").expect_err("degenerate");
        assert!(matches!(err, ParseError::NonConvergence { .. }), "{err}");
    }

    #[test]
    fn empty_result_ids_signal_non_convergence() {
        let xml = document(
            r#"<page alpha="0.2" T="1873" P="1"><result id="" g="0"/><result g="1"/></page>"#,
        );
        let err = parse_result_xml(&xml, "Ca").expect_err("degenerate");
        assert!(matches!(err, ParseError::NonConvergence { .. }), "{err}");
    }

    #[test]
    fn missing_metal_phase_is_fatal() {
        let xml = r#"<equilib>
              <header><species_definition>
                <solution phase_id="p2" state="Slag-liq#1"><species id="10" name="CaO"/></solution>
              </species_definition></header>
              <page alpha="0.2" T="1873" P="1"><result id="10" g="5"/></page>
            </equilib>"#;
        let err = parse_result_xml(xml, "Ca").expect_err("no metal");
        assert!(matches!(err, ParseError::MissingMetalPhase));
    }

    #[test]
    fn slag_falls_back_to_generic_marker() {
        let xml = r#"<equilib>
              <header><species_definition>
                <solution phase_id="m" state="Fe-liq"><species id="1" name="Fe"/></solution>
                <solution phase_id="s" state="Slag-liq#2"><species id="2" name="CaO"/></solution>
              </species_definition></header>
              <page alpha="0.2" T="1873" P="1">
                <result id="1" g="100"/><result id="2" g="4"/>
              </page>
            </equilib>"#;
        let result = parse_result_xml(xml, "Ca").expect("parsed");
        assert_eq!(result.slag.cao_wtpct, 100.0);
        assert_eq!(result.slag.total_g, 4.0);
    }

    #[test]
    fn absent_slag_yields_zero_percentages() {
        let xml = r#"<equilib>
              <header><species_definition>
                <solution phase_id="m" state="Fe-liq"><species id="1" name="Fe"/></solution>
              </species_definition></header>
              <page alpha="0.2" T="1873" P="1"><result id="1" g="100"/></page>
            </equilib>"#;
        let result = parse_result_xml(xml, "Ca").expect("parsed");
        assert_eq!(result.slag, SlagResult::default());
        assert_eq!(result.steel.fe_wtpct, 100.0);
    }

    #[test]
    fn non_positive_totals_give_zero_weight_percent() {
        assert_eq!(weight_percent(5.0, 0.0), 0.0);
        assert_eq!(weight_percent(5.0, -2.0), 0.0);
        assert_eq!(weight_percent(0.0, 0.0), 0.0);
        assert_eq!(weight_percent(1.0, 4.0), 25.0);
    }

    #[test]
    fn missing_page_and_malformed_input_are_reported() {
        let err = parse_result_xml("<equilib><header/></equilib>", "Ca").expect_err("no page");
        assert!(matches!(err, ParseError::MissingSection("page")));

        let err = parse_result_xml("<equilib><header>", "Ca").expect_err("malformed");
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let err = parse_result_file(&dir.path().join("result.xml"), "Ca")
            .await
            .expect_err("missing");
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
