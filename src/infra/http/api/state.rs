use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::application::job_manager::JobManager;
use crate::infra::presets::PresetStore;

/// Runtime facts reported by `/api/config/info`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub mock_mode: bool,
    #[serde(rename = "factsage_dir")]
    pub solver_dir: String,
    pub templates_dir: Option<String>,
    pub presets_dir: String,
}

#[derive(Clone)]
pub struct ApiState {
    pub jobs: Arc<JobManager>,
    pub presets: Arc<PresetStore>,
    pub info: Arc<ConfigInfo>,
    /// Root of the per-job directories, for result downloads.
    pub work_root: Arc<PathBuf>,
}
