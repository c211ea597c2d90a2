#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use ladle::application::job_manager::{CalculationPipeline, JobManager};
use ladle::application::solver::{ProcessRunner, RunMode, SolverConfig};
use ladle::application::templates::{TemplateRenderer, TemplateSet};
use ladle::domain::types::{
    CalcType, Conditions, JobRequest, JobStatus, MassUnit, SlagInput, SteelInput, Target,
};

const RESULT_XML: &str = r#"<equilib>
  <header>
    <species_definition>
      <solution phase_id="p1" state="Fe-liq">
        <species id="1" name="Fe"/>
        <species id="2" name="O"/>
        <species id="3" name="S"/>
      </solution>
      <solution phase_id="p2" state="Slag-liq#1">
        <species id="10" name="CaO"/>
        <species id="11" name="CaS"/>
      </solution>
    </species_definition>
  </header>
  <page alpha="0.18" T="1873.15" P="1">
    <result id="1" g="99.9"/>
    <result id="2" g="0.0015"/>
    <result id="3" g="0.0985"/>
    <result id="10" g="9.0"/>
    <result id="11" g="1.0"/>
  </page>
</equilib>"#;

fn request(fe_g: f64) -> JobRequest {
    JobRequest {
        calc_type: CalcType::Desulfurization,
        steel: SteelInput {
            fe_g,
            mn_field: "0.3".to_string(),
            si_g: 0.2,
            al_g: 0.03,
            o_g: 0.001,
            s_g: 0.01,
        },
        slag: SlagInput {
            cao_g: 5.0,
            al2o3_g: 3.0,
            sio2_g: 1.0,
        },
        conditions: Conditions {
            temperature_c: 1600.0,
            pressure_atm: 1.0,
        },
        target: Target {
            element: "S".to_string(),
            value: 20.0,
            unit: MassUnit::Ppm,
        },
        solve_species: "Ca".to_string(),
        alpha_guess: 0.5,
        alpha_max: 10.0,
    }
}

/// Fake solver: fails when the rendered input mentions `Fe 13`, otherwise
/// writes the canned result next to the input directory.
fn install_fake_solver(dir: &Path) -> SolverConfig {
    let solver_dir = dir.join("solver");
    fs::create_dir_all(&solver_dir).expect("solver dir");
    fs::write(solver_dir.join("result.xml"), RESULT_XML).expect("canned result");

    let script = solver_dir.join("fake-equisage");
    fs::write(
        &script,
        r#"#!/bin/sh
set -eu
job_dir="$(dirname "$(dirname "$3")")"
if grep -q "Fe *13" "$job_dir/input/case.equi"; then
  echo "solver licence check failed" >&2
  exit 3
fi
cp "$PWD/result.xml" "$job_dir/out/result.xml"
"#,
    )
    .expect("script");
    let mut permissions = fs::metadata(&script).expect("metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&script, permissions).expect("chmod");

    SolverConfig {
        dir: solver_dir,
        exe: "fake-equisage".to_string(),
        timeout: Duration::from_secs(10),
    }
}

#[tokio::test]
async fn jobs_flow_through_the_external_solver() {
    let dir = TempDir::new().expect("temp dir");
    let solver = install_fake_solver(dir.path());
    let work_root = dir.path().join("work");

    let renderer = TemplateRenderer::new(&work_root, TemplateSet::builtin()).expect("renderer");
    let runner = ProcessRunner::new(RunMode::Solver(solver));
    let pipeline = CalculationPipeline::new(Arc::new(renderer), Arc::new(runner));
    let manager = JobManager::new(Arc::new(pipeline));
    manager.start();

    let failing = manager.submit(request(13.0)).expect("failing job");
    let passing = manager.submit(request(100.0)).expect("passing job");

    let failed = manager
        .wait(&failing, Duration::from_secs(10))
        .await
        .expect("failing job finishes");
    assert_eq!(failed.status(), JobStatus::Failed);
    let message = failed.error().expect("error message");
    assert!(message.contains("solver failed"), "{message}");
    assert!(message.contains("licence check failed"), "{message}");
    assert!(failed.result().is_none());

    let done = manager
        .wait(&passing, Duration::from_secs(10))
        .await
        .expect("passing job finishes");
    assert_eq!(done.status(), JobStatus::Completed, "{:?}", done.error());
    let result = done.result().expect("result");
    assert_eq!(result.alpha_g, 0.18);
    assert_eq!(result.temperature_k, 1873.15);
    assert_eq!(result.steel.total_g, 100.0);
    assert_eq!(result.steel.o_ppm, 15.0);
    assert_eq!(result.slag.cas_wtpct, 10.0);
    assert!(done.started_at().expect("started") >= failed.finished_at().expect("finished"));

    let equi = fs::read_to_string(work_root.join(passing.as_str()).join("input/case.equi"))
        .expect("rendered input");
    assert!(equi.contains("\r\n"));
    assert!(equi.contains("Ca(liq)"));
    assert!(equi.contains("Mn      0.3"));
    assert!(!equi.contains("{{"));

    manager.stop(Duration::from_secs(1)).await;
}
