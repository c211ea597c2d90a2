use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the ladle binary.
#[derive(Debug, Parser)]
#[command(
    name = "ladle",
    version,
    about = "Ladle treatment equilibrium estimator"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LADLE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the job worker and the HTTP API.
    Serve(Box<ServeArgs>),
    /// Submit one request file, wait for it and print the finished job.
    #[command(name = "run")]
    Run(RunArgs),
    /// Check a solve species / target element combination.
    #[command(name = "validate")]
    Validate(ValidateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: SolverOverrides,

    /// JSON file holding a calculation request.
    #[arg(value_name = "REQUEST", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ValidateArgs {
    /// Species the solver adjusts (e.g. Ca, Mn).
    #[arg(long = "species", value_name = "SPECIES")]
    pub species: String,

    /// Element whose final concentration is targeted (e.g. O, S).
    #[arg(long = "element", value_name = "ELEMENT")]
    pub element: String,
}

/// Overrides shared by every command that executes jobs.
#[derive(Debug, Args, Default, Clone)]
pub struct SolverOverrides {
    /// Override the solver installation directory.
    #[arg(long = "solver-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub solver_dir: Option<PathBuf>,

    /// Override the per-job solver timeout.
    #[arg(long = "solver-timeout-seconds", value_name = "SECONDS")]
    pub solver_timeout_seconds: Option<u64>,

    /// Override the root directory for job working directories.
    #[arg(long = "work-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub work_root: Option<PathBuf>,

    /// Override mock mode (`auto`, `true`, `false`).
    #[arg(long = "mock", value_name = "MODE")]
    pub mock: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON when true.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub solver: SolverOverrides,

    /// Override the bind host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the bind port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,
}
