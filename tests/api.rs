use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use zip::ZipArchive;

use ladle::application::job_manager::{CalculationPipeline, JobManager};
use ladle::application::solver::{ProcessRunner, RunMode};
use ladle::application::templates::{TemplateRenderer, TemplateSet};
use ladle::domain::types::JobId;
use ladle::infra::http::{ApiState, ConfigInfo, build_router};
use ladle::infra::presets::PresetStore;

struct TestApp {
    router: Router,
    manager: Arc<JobManager>,
    work_root: PathBuf,
    _dir: TempDir,
}

fn test_app() -> TestApp {
    let dir = TempDir::new().expect("temp dir");
    let presets_dir = dir.path().join("presets");
    std::fs::create_dir_all(&presets_dir).expect("presets dir");
    std::fs::write(
        presets_dir.join("heat_a.json"),
        json!({"job_id": "heat-a", "target": {"element": "S", "value": 20, "unit": "ppm"}})
            .to_string(),
    )
    .expect("preset");

    let work_root = dir.path().join("work");
    let renderer = TemplateRenderer::new(&work_root, TemplateSet::builtin()).expect("renderer");
    let runner = ProcessRunner::new(RunMode::Mock {
        delay: Duration::ZERO,
    });
    let pipeline = CalculationPipeline::new(Arc::new(renderer), Arc::new(runner));
    let manager = Arc::new(JobManager::new(Arc::new(pipeline)));
    manager.start();

    let state = ApiState {
        jobs: Arc::clone(&manager),
        presets: Arc::new(PresetStore::new(presets_dir.clone())),
        info: Arc::new(ConfigInfo {
            mock_mode: true,
            solver_dir: "/opt/solver".to_string(),
            templates_dir: None,
            presets_dir: presets_dir.display().to_string(),
        }),
        work_root: Arc::new(work_root.clone()),
    };

    TestApp {
        router: build_router(state),
        manager,
        work_root,
        _dir: dir,
    }
}

fn deoxidation_body() -> Value {
    json!({
        "calc_type": "deoxidation",
        "steel": {"Fe_g": 100.0, "Si_g": 0.25, "Al_g": 0.04, "O_g": 0.002, "S_g": 0.005},
        "slag": {"CaO_g": 5.5, "Al2O3_g": 3.5, "SiO2_g": 1.0},
        "conditions": {"T_C": 1600.0},
        "target": {"element": "Al", "value": 0.01, "unit": "wtpct"},
        "solve_species": "Ca"
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn calculate_then_poll_until_completed() {
    let app = test_app();

    let (status, handle) = send(&app.router, post_json("/api/calculate", &deoxidation_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(handle["calc_type"], "deoxidation");
    let job_id = handle["job_id"].as_str().expect("job id").to_string();

    let job = app
        .manager
        .wait(&JobId::from(job_id.as_str()), Duration::from_secs(5))
        .await
        .expect("job finishes");
    assert_eq!(job.status().as_str(), "completed");

    let (status, body) = send(&app.router, get(&format!("/api/jobs/{job_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["alpha_g"], json!(0.127));
    assert_eq!(body["result"]["solve_species"], "Ca");
    assert!(body["error"].is_null());
    assert!(body["finished_at"].is_string());

    app.manager.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn rejected_combination_is_400_and_creates_no_job() {
    let app = test_app();
    let mut body = deoxidation_body();
    body["solve_species"] = json!("Al");

    let (status, error) = send(&app.router, post_json("/api/calculate", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "rejected_combination");
    assert!(error["error"]["hint"].as_str().expect("hint").contains("Al"));

    let (status, jobs) = send(&app.router, get("/api/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs, json!([]));
}

#[tokio::test]
async fn unknown_species_and_bad_fields_are_400() {
    let app = test_app();

    let mut unknown = deoxidation_body();
    unknown["solve_species"] = json!("Unobtainium");
    let (status, error) = send(&app.router, post_json("/api/calculate", &unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "unknown_species");

    let mut invalid = deoxidation_body();
    invalid["steel"]["Fe_g"] = json!(0.0);
    let (status, error) = send(&app.router, post_json("/api/calculate", &invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "invalid_request");

    let mut injected = deoxidation_body();
    injected["steel"]["Mn_field"] = json!("0.3\nEND");
    let (status, error) = send(&app.router, post_json("/api/calculate", &injected)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]["hint"].as_str().expect("hint").contains("Mn_field"));

    let (status, error) = send(
        &app.router,
        post_json("/api/calculate", &json!({"calc_type": "deoxidation"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn unknown_job_is_404() {
    let app = test_app();
    let (status, body) = send(&app.router, get("/api/jobs/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn jobs_are_listed_newest_first() {
    let app = test_app();
    let (_, first) = send(&app.router, post_json("/api/calculate", &deoxidation_body())).await;
    let (_, second) = send(&app.router, post_json("/api/calculate", &deoxidation_body())).await;

    let (status, jobs) = send(&app.router, get("/api/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = jobs
        .as_array()
        .expect("array")
        .iter()
        .map(|job| job["job_id"].as_str().expect("id"))
        .collect();
    assert_eq!(
        ids,
        vec![
            second["job_id"].as_str().expect("second"),
            first["job_id"].as_str().expect("first"),
        ]
    );

    app.manager.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn combination_check_reports_level_and_message() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        get("/api/validate-combination?solve_species=Ca&target_elem=Al"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], "ok");

    let (_, body) = send(
        &app.router,
        get("/api/validate-combination?solve_species=CaO&target_elem=O"),
    )
    .await;
    assert_eq!(body["level"], "reject");
    assert!(body["message"].as_str().expect("message").contains("CaO"));

    let (status, _) = send(&app.router, get("/api/validate-combination?solve_species=Ca")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalogs_are_served() {
    let app = test_app();

    let (status, whitelist) = send(&app.router, get("/api/whitelist")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(whitelist["Ca"], "Ca(liq)");

    let (status, options) = send(&app.router, get("/api/calc-options")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options["desulfurization"]["S"]["recommended"], json!(["Ca", "CaO"]));
}

#[tokio::test]
async fn presets_and_config_info_are_served() {
    let app = test_app();

    let (status, names) = send(&app.router, get("/api/presets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names, json!(["heat-a"]));

    let (status, preset) = send(&app.router, get("/api/presets/heat-a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preset["calc_type"], "desulfurization");

    let (status, _) = send(&app.router, get("/api/presets/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, info) = send(&app.router, get("/api/config/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["mock_mode"], json!(true));
    assert_eq!(info["factsage_dir"], "/opt/solver");
    assert!(info["templates_dir"].is_null());
}

#[tokio::test]
async fn results_download_as_zip() {
    let app = test_app();

    let (status, handle) = send(&app.router, post_json("/api/calculate", &deoxidation_body())).await;
    assert_eq!(status, StatusCode::OK);
    let job_id = handle["job_id"].as_str().expect("job id").to_string();
    app.manager
        .wait(&JobId::from(job_id.as_str()), Duration::from_secs(5))
        .await
        .expect("job finishes");

    let uri = format!("/api/jobs/{job_id}/download");
    let (status, body) = send(&app.router, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Result files not found");

    let out_dir = app.work_root.join(&job_id).join("out");
    std::fs::write(out_dir.join("result.xml"), "<equilib/>").expect("xml");
    std::fs::write(out_dir.join("result.res"), "summary").expect("res");

    let response = app.router.clone().oneshot(get(&uri)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{job_id}_result.zip\"").as_str()
    );
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("zip");
    assert_eq!(archive.len(), 2);
    let mut summary = String::new();
    archive
        .by_name("result.res")
        .expect("res member")
        .read_to_string(&mut summary)
        .expect("read");
    assert_eq!(summary, "summary");

    app.manager.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn download_without_output_directory_is_404() {
    let app = test_app();

    let (status, body) = send(&app.router, get("/api/jobs/never-ran/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Job output directory not found");

    let (status, _) = send(&app.router, get("/api/jobs/..%2Fpresets/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
