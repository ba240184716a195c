//! Runtime resolution of on-disk reranker models.
//!
//! Models are never downloaded. The base directory is the first existing
//! entry of:
//!
//! 1. `$IRRA_MODELS_DIR`
//! 2. `~/.irra/models`
//! 3. `{exe_dir}/models`
//!
//! Inside it a cross-encoder lives at `rerankers/{name}`, at the full
//! HuggingFace id, or flat at `{name}`:
//!
//! ```text
//! {models_dir}/
//!   rerankers/
//!     ms-marco-MiniLM-L6-v2/
//!       config.json
//!       model.safetensors
//!       tokenizer.json
//! ```

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ModelError, ModelResult};

/// Environment variable overriding the models directory.
pub const IRRA_MODELS_DIR_ENV: &str = "IRRA_MODELS_DIR";

/// Subdirectory holding cross-encoder models.
pub const RERANKERS_SUBDIR: &str = "rerankers";

/// Files a loadable model directory must contain.
pub const REQUIRED_MODEL_FILES: &[&str] = &["config.json", "model.safetensors", "tokenizer.json"];

/// Locates model directories using the search order above.
#[derive(Debug, Clone, Default)]
pub struct ModelLocator {
    base_dir: Option<PathBuf>,
}

impl ModelLocator {
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Pin the base directory instead of searching.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Candidate base directories in search order, existing or not.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        if let Some(ref base) = self.base_dir {
            return vec![base.clone()];
        }

        let mut paths = Vec::new();
        if let Ok(env_path) = env::var(IRRA_MODELS_DIR_ENV) {
            if !env_path.trim().is_empty() {
                paths.push(PathBuf::from(env_path));
            }
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".irra").join("models"));
        }
        if let Some(exe_dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(exe_dir.join("models"));
        }
        paths
    }

    /// First existing base directory.
    pub fn resolve_base_dir(&self) -> ModelResult<PathBuf> {
        let searched = self.search_paths();
        searched
            .iter()
            .find(|p| p.is_dir())
            .cloned()
            .ok_or(ModelError::ModelsDirectoryNotFound { searched })
    }

    /// Resolve the directory of a reranker model by full id or short name.
    pub fn reranker_model_path(&self, model_id: &str) -> ModelResult<PathBuf> {
        let base = self.resolve_base_dir()?;
        let name = extract_model_name(model_id);

        let candidates = [
            base.join(RERANKERS_SUBDIR).join(name),
            base.join(model_id),
            base.join(name),
        ];

        candidates
            .iter()
            .find(|p| p.join("config.json").is_file())
            .cloned()
            .ok_or_else(|| ModelError::ModelNotFound {
                model_id: model_id.to_string(),
                path: candidates[0].clone(),
            })
    }

    /// Check that a model directory holds every required file.
    pub fn validate_model_dir(&self, path: &Path) -> ModelResult<()> {
        if !path.is_dir() {
            return Err(ModelError::ModelNotFound {
                model_id: path.display().to_string(),
                path: path.to_path_buf(),
            });
        }

        let missing: Vec<&'static str> = REQUIRED_MODEL_FILES
            .iter()
            .copied()
            .filter(|file| !path.join(file).exists())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::IncompleteModelFiles {
                path: path.to_path_buf(),
                missing,
            })
        }
    }
}

/// "cross-encoder/ms-marco-MiniLM-L6-v2" → "ms-marco-MiniLM-L6-v2"
pub fn extract_model_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}
