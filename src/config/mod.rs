//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::solver::{RunMode, SolverConfig};

pub use cli::{
    CliArgs, Command, RunArgs, ServeArgs, ServeOverrides, SolverOverrides, ValidateArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "ladle";
const ENV_PREFIX: &str = "LADLE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SOLVER_DIR: &str = r"C:\FactSage";
const DEFAULT_SOLVER_EXE: &str = "EquiSage.exe";
const DEFAULT_SOLVER_TIMEOUT_SECS: u64 = 300;
const DEFAULT_WORK_ROOT: &str = "work";
const DEFAULT_PRESETS_DIR: &str = "presets";
const DEFAULT_MOCK_DELAY_SECS: f64 = 1.5;

/// Fully resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub solver: SolverConfig,
    pub paths: PathSettings,
    pub mock: MockSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct PathSettings {
    pub work_root: PathBuf,
    /// When set, template files found here replace the built-in ones.
    pub templates_dir: Option<PathBuf>,
    pub presets_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Mock only when the solver executable is missing.
    Auto,
    On,
    Off,
}

impl FromStr for MockMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "1" | "true" | "yes" | "on" => Ok(Self::On),
            "0" | "false" | "no" | "off" => Ok(Self::Off),
            other => Err(format!(
                "expected auto, true/on or false/off, got `{other}`"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockSettings {
    pub mode: MockMode,
    pub delay: Duration,
}

impl Settings {
    /// Decide between the real solver and the mock for this process.
    pub fn run_mode(&self) -> RunMode {
        let mock = match self.mock.mode {
            MockMode::On => true,
            MockMode::Off => false,
            MockMode::Auto => !self.solver.executable_exists(),
        };
        if mock {
            RunMode::Mock {
                delay: self.mock.delay,
            }
        } else {
            RunMode::Solver(self.solver.clone())
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings from configuration files, environment variables and CLI overrides.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Run(args)) => raw.apply_solver_overrides(&args.overrides),
        Some(Command::Validate(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    solver: RawSolverSettings,
    paths: RawPathSettings,
    mock: RawMockSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        self.apply_solver_overrides(&overrides.solver);
    }

    fn apply_solver_overrides(&mut self, overrides: &SolverOverrides) {
        if let Some(dir) = overrides.solver_dir.as_ref() {
            self.solver.dir = Some(dir.clone());
        }
        if let Some(seconds) = overrides.solver_timeout_seconds {
            self.solver.timeout_seconds = Some(seconds);
        }
        if let Some(root) = overrides.work_root.as_ref() {
            self.paths.work_root = Some(root.clone());
        }
        if let Some(mode) = overrides.mock.as_ref() {
            self.mock.mode = Some(mode.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            solver,
            paths,
            mock,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            solver: build_solver_settings(solver)?,
            paths: build_path_settings(paths),
            mock: build_mock_settings(mock)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_solver_settings(solver: RawSolverSettings) -> Result<SolverConfig, LoadError> {
    let dir = solver
        .dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOLVER_DIR));

    let exe = solver
        .exe
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SOLVER_EXE.to_string());
    if exe.is_empty() {
        return Err(LoadError::invalid("solver.exe", "must not be empty"));
    }

    let timeout_secs = solver.timeout_seconds.unwrap_or(DEFAULT_SOLVER_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "solver.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SolverConfig {
        dir,
        exe,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_path_settings(paths: RawPathSettings) -> PathSettings {
    PathSettings {
        work_root: paths
            .work_root
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_ROOT)),
        templates_dir: paths
            .templates_dir
            .filter(|dir| !dir.as_os_str().is_empty()),
        presets_dir: paths
            .presets_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PRESETS_DIR)),
    }
}

fn build_mock_settings(mock: RawMockSettings) -> Result<MockSettings, LoadError> {
    let mode = match mock.mode {
        Some(value) => {
            MockMode::from_str(&value).map_err(|reason| LoadError::invalid("mock.mode", reason))?
        }
        None => MockMode::Auto,
    };

    let delay_secs = mock.delay_seconds.unwrap_or(DEFAULT_MOCK_DELAY_SECS);
    let delay = Duration::try_from_secs_f64(delay_secs).map_err(|_| {
        LoadError::invalid(
            "mock.delay_seconds",
            "must be a finite, non-negative number of seconds",
        )
    })?;

    Ok(MockSettings { mode, delay })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSolverSettings {
    dir: Option<PathBuf>,
    exe: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPathSettings {
    work_root: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    presets_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMockSettings {
    mode: Option<String>,
    delay_seconds: Option<f64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
