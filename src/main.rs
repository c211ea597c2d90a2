use std::{process, sync::Arc, time::Duration};

use ladle::{
    application::{
        error::AppError,
        job_manager::{CalculationPipeline, JobManager, SubmitError, WaitError},
        solver::{ProcessRunner, RunMode},
        templates::{TemplateRenderer, TemplateSet},
    },
    config,
    domain::{
        combination,
        error::ValidationError,
        types::{JobRequest, JobStatus, VerdictLevel},
    },
    infra::{
        error::InfraError,
        http::{self, ApiState, ConfigInfo},
        presets::PresetStore,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SOURCE: &str = "ladle::main";
/// Extra time the `run` command allows on top of the solver timeout.
const RUN_WAIT_MARGIN: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Run(args) => run_request(settings, args).await,
        config::Command::Validate(args) => run_validate(args),
    }
}

async fn build_job_manager(
    settings: &config::Settings,
    mode: RunMode,
) -> Result<Arc<JobManager>, AppError> {
    let templates = match settings.paths.templates_dir.as_deref() {
        Some(dir) => TemplateSet::with_overrides(dir)
            .await
            .map_err(|err| AppError::from(InfraError::templates(err.to_string())))?,
        None => TemplateSet::builtin(),
    };
    let renderer = TemplateRenderer::new(&settings.paths.work_root, templates)
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    match &mode {
        RunMode::Mock { delay } => info!(
            target = SOURCE,
            op = "startup",
            mode = "mock",
            delay_ms = delay.as_millis() as u64,
            work_root = %renderer.work_root().display(),
            "Solver replaced by mock results"
        ),
        RunMode::Solver(solver) => info!(
            target = SOURCE,
            op = "startup",
            mode = "solver",
            executable = %solver.executable_path().display(),
            timeout_secs = solver.timeout.as_secs(),
            work_root = %renderer.work_root().display(),
            "Using external solver"
        ),
    }

    let pipeline = CalculationPipeline::new(Arc::new(renderer), Arc::new(ProcessRunner::new(mode)));
    Ok(Arc::new(JobManager::new(Arc::new(pipeline))))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let mode = settings.run_mode();
    let info = ConfigInfo {
        mock_mode: mode.is_mock(),
        solver_dir: settings.solver.dir.display().to_string(),
        templates_dir: settings
            .paths
            .templates_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
        presets_dir: settings.paths.presets_dir.display().to_string(),
    };

    let manager = build_job_manager(&settings, mode).await?;
    manager.start();

    let state = ApiState {
        jobs: Arc::clone(&manager),
        presets: Arc::new(PresetStore::new(settings.paths.presets_dir.clone())),
        info: Arc::new(info),
        work_root: Arc::new(settings.paths.work_root.clone()),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = SOURCE,
        op = "serve",
        addr = %settings.server.addr,
        "HTTP API listening"
    );

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    manager.stop(settings.server.graceful_shutdown).await;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = SOURCE,
            op = "shutdown_signal",
            error = %err,
            "Could not listen for ctrl-c; serving until killed"
        );
        std::future::pending::<()>().await;
    }
    info!(target = SOURCE, op = "shutdown_signal", "Shutdown requested");
}

async fn run_request(settings: config::Settings, args: config::RunArgs) -> Result<(), AppError> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let request: JobRequest = serde_json::from_str(&text).map_err(|err| {
        AppError::unexpected(format!(
            "invalid request file `{}`: {err}",
            args.file.display()
        ))
    })?;

    let manager = build_job_manager(&settings, settings.run_mode()).await?;
    manager.start();

    let job_id = manager.submit(request).map_err(|err| match err {
        SubmitError::Validation(err) => AppError::from(err),
        SubmitError::QueueClosed => AppError::unexpected("job queue is closed"),
    })?;

    let waited = manager
        .wait(&job_id, settings.solver.timeout.saturating_add(RUN_WAIT_MARGIN))
        .await;
    manager.stop(settings.server.graceful_shutdown).await;
    let job = waited.map_err(|err| match err {
        WaitError::Domain(err) => AppError::from(err),
        timed_out @ WaitError::TimedOut { .. } => AppError::unexpected(timed_out.to_string()),
    })?;

    let rendered = serde_json::to_string_pretty(&job.to_response())
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{rendered}");

    match job.status() {
        JobStatus::Completed => Ok(()),
        _ => Err(AppError::job_failed(
            job_id.as_str(),
            job.error().unwrap_or("unknown error"),
        )),
    }
}

fn run_validate(args: config::ValidateArgs) -> Result<(), AppError> {
    let verdict = combination::validate_combination(&args.species, &args.element);
    let rendered =
        serde_json::to_string_pretty(&verdict).map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{rendered}");

    if verdict.level == VerdictLevel::Reject {
        return Err(AppError::from(ValidationError::RejectedCombination {
            message: verdict.message,
        }));
    }
    Ok(())
}
