//! Solver input generation.
//!
//! Every job gets its own `<work_root>/<job_id>` directory holding the
//! composition file (`input/case.equi`), the automation script
//! (`input/case.mac`) and the directory the solver writes into (`out/`).

pub mod line_endings;
pub mod placeholders;

use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::domain::combination::{ensure_combination, require_whitelisted};
use crate::domain::error::ValidationError;
use crate::domain::request::to_mass_fraction;
use crate::domain::types::{JobId, JobRequest};

use self::line_endings::{normalize_newlines, read_normalized, write_crlf};
use self::placeholders::{Bindings, substitute};

pub const EQUI_TEMPLATE_NAME: &str = "equilib_estimate.equi.tpl";
pub const MAC_TEMPLATE_NAME: &str = "run_equilib.mac.tpl";

const BUILTIN_EQUI: &str = include_str!("../../../templates/equilib_estimate.equi.tpl");
const BUILTIN_MAC: &str = include_str!("../../../templates/run_equilib.mac.tpl");

const CASE_PREFIX: &str = "case";
pub const RESULT_NAME: &str = "result";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to read template `{path}`: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare job file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RenderError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Template texts, normalized to `\n` line endings.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    equi: String,
    mac: String,
}

impl TemplateSet {
    pub fn builtin() -> Self {
        Self {
            equi: normalize_newlines(BUILTIN_EQUI),
            mac: normalize_newlines(BUILTIN_MAC),
        }
    }

    /// Built-in templates with any file present in `dir` taking precedence.
    pub async fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        let mut set = Self::builtin();
        if let Some(text) = read_override(&dir.join(EQUI_TEMPLATE_NAME)).await? {
            set.equi = text;
        }
        if let Some(text) = read_override(&dir.join(MAC_TEMPLATE_NAME)).await? {
            set.mac = text;
        }
        Ok(set)
    }

    pub fn equi(&self) -> &str {
        &self.equi
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }
}

async fn read_override(path: &Path) -> Result<Option<String>, RenderError> {
    match read_normalized(path).await {
        Ok(text) => {
            info!(
                target = "application::templates",
                op = "templates::load",
                path = %path.display(),
                "Using template override"
            );
            Ok(Some(text))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(RenderError::Template {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Everything later stages need to find a job's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub equi_path: PathBuf,
    pub mac_path: PathBuf,
    pub result_xml: PathBuf,
    pub result_res: PathBuf,
}

impl JobPaths {
    pub fn for_job(work_root: &Path, job_id: &JobId) -> Self {
        let job_dir = work_root.join(job_id.as_str());
        let input_dir = job_dir.join("input");
        let output_dir = job_dir.join("out");
        Self {
            equi_path: input_dir.join(format!("{CASE_PREFIX}.equi")),
            mac_path: input_dir.join(format!("{CASE_PREFIX}.mac")),
            result_xml: output_dir.join(format!("{RESULT_NAME}.xml")),
            result_res: output_dir.join(format!("{RESULT_NAME}.res")),
            job_dir,
            input_dir,
            output_dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    work_root: PathBuf,
    templates: TemplateSet,
}

impl TemplateRenderer {
    /// `work_root` is resolved to an absolute path once; the automation
    /// script must reference absolute locations.
    pub fn new(work_root: &Path, templates: TemplateSet) -> io::Result<Self> {
        Ok(Self {
            work_root: std::path::absolute(work_root)?,
            templates,
        })
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    pub fn paths_for(&self, job_id: &JobId) -> JobPaths {
        JobPaths::for_job(&self.work_root, job_id)
    }

    /// Write both solver files for `job_id` and return their locations.
    ///
    /// Nothing is written when the species or combination is rejected or a
    /// template placeholder is left unbound.
    pub async fn render(
        &self,
        job_id: &JobId,
        request: &JobRequest,
    ) -> Result<JobPaths, RenderError> {
        let started_at = Instant::now();
        let solve_token = require_whitelisted(&request.solve_species)?;
        ensure_combination(&request.solve_species, &request.target.element)?;

        let paths = self.paths_for(job_id);
        let equi_text = substitute(self.templates.equi(), &equi_bindings(request, solve_token))?;
        let mac_text = substitute(self.templates.mac(), &mac_bindings(request, &paths))?;

        fs::create_dir_all(&paths.input_dir)
            .await
            .map_err(|err| RenderError::io(&paths.input_dir, err))?;
        fs::create_dir_all(&paths.output_dir)
            .await
            .map_err(|err| RenderError::io(&paths.output_dir, err))?;
        write_crlf(&paths.equi_path, &equi_text)
            .await
            .map_err(|err| RenderError::io(&paths.equi_path, err))?;
        write_crlf(&paths.mac_path, &mac_text)
            .await
            .map_err(|err| RenderError::io(&paths.mac_path, err))?;

        debug!(
            target = "application::templates",
            op = "templates::render",
            job_id = %job_id,
            job_dir = %paths.job_dir.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Solver input files rendered"
        );

        Ok(paths)
    }
}

fn number(value: f64) -> String {
    format!("{value}")
}

fn equi_bindings(request: &JobRequest, solve_token: &str) -> Bindings {
    let steel = &request.steel;
    let slag = &request.slag;
    let mn_field = steel.mn_field.trim();
    let mn_line = if mn_field.is_empty() {
        String::new()
    } else {
        format!("\n  Mn      {mn_field}")
    };

    Bindings::from([
        ("calc_type", request.calc_type.as_str().to_string()),
        ("solve_species", request.solve_species.clone()),
        ("solve_token", solve_token.to_string()),
        ("target_element", request.target.element.clone()),
        (
            "target_mass_fraction",
            number(to_mass_fraction(request.target.value, request.target.unit)),
        ),
        ("alpha_guess", number(request.alpha_guess)),
        ("alpha_max", number(request.alpha_max)),
        ("fe_g", number(steel.fe_g)),
        ("mn_line", mn_line),
        ("si_g", number(steel.si_g)),
        ("al_g", number(steel.al_g)),
        ("o_g", number(steel.o_g)),
        ("s_g", number(steel.s_g)),
        ("cao_g", number(slag.cao_g)),
        ("al2o3_g", number(slag.al2o3_g)),
        ("sio2_g", number(slag.sio2_g)),
        ("temperature_c", number(request.conditions.temperature_c)),
        ("pressure_atm", number(request.conditions.pressure_atm)),
    ])
}

fn mac_bindings(request: &JobRequest, paths: &JobPaths) -> Bindings {
    Bindings::from([
        ("equi_file", paths.equi_path.display().to_string()),
        (
            "out_dir",
            format!("{}{MAIN_SEPARATOR}", paths.output_dir.display()),
        ),
        ("result_name", RESULT_NAME.to_string()),
        ("temperature_c", number(request.conditions.temperature_c)),
        ("pressure_atm", number(request.conditions.pressure_atm)),
    ])
}
