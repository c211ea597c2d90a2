//! Example requests stored as JSON files in a directory.
//!
//! Every `*.json` file is one preset, keyed by its `job_id` field or, when
//! that is absent, by the file stem. Presets without a `calc_type` get one
//! inferred from `target.element`. The directory is rescanned on every call
//! so edits show up without a restart.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::domain::combination::target_rule;
use crate::domain::types::CalcType;

const SOURCE: &str = "infra::presets";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read presets from `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Preset names in file-name order.
    pub async fn list(&self) -> Result<Vec<String>, PresetError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    pub async fn get(&self, name: &str) -> Result<Option<Value>, PresetError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, preset)| preset))
    }

    async fn load_all(&self) -> Result<Vec<(String, Value)>, PresetError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    target = SOURCE,
                    op = "presets::load_all",
                    result = "missing_dir",
                    dir = %self.dir.display(),
                    "Presets directory does not exist"
                );
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PresetError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| PresetError::Io {
            path: self.dir.clone(),
            source,
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut presets: Vec<(String, Value)> = Vec::with_capacity(files.len());
        for path in files {
            let Some(preset) = read_preset(&path).await else {
                continue;
            };
            let key = preset_key(&path, &preset);
            match presets.iter_mut().find(|(name, _)| *name == key) {
                Some(slot) => slot.1 = preset,
                None => presets.push((key, preset)),
            }
        }
        Ok(presets)
    }
}

async fn read_preset(path: &Path) -> Option<Value> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) => {
            warn!(
                target = SOURCE,
                op = "presets::read",
                result = "skipped",
                file = %path.display(),
                error = %err,
                "Failed to read preset"
            );
            return None;
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(mut object)) => {
            fill_calc_type(&mut object);
            Some(Value::Object(object))
        }
        Ok(_) => {
            warn!(
                target = SOURCE,
                op = "presets::read",
                result = "skipped",
                file = %path.display(),
                "Preset is not a JSON object"
            );
            None
        }
        Err(err) => {
            warn!(
                target = SOURCE,
                op = "presets::read",
                result = "skipped",
                file = %path.display(),
                error = %err,
                "Failed to parse preset"
            );
            None
        }
    }
}

fn preset_key(path: &Path, preset: &Value) -> String {
    preset
        .get("job_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

fn fill_calc_type(object: &mut Map<String, Value>) {
    if object.contains_key("calc_type") {
        return;
    }
    let element = object
        .get("target")
        .and_then(|target| target.get("element"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let calc_type = target_rule(element)
        .map(|rule| rule.calc_type)
        .unwrap_or(CalcType::Desulfurization);
    object.insert(
        "calc_type".to_string(),
        Value::String(calc_type.as_str().to_string()),
    );
}
