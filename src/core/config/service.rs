use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::paths::AppPaths;
use super::settings::EngineConfig;
use super::validation::validate_config;
use crate::core::errors::EngineError;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("GRAMMAR_RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Load and validate the configuration.
    ///
    /// A missing file yields the defaults; an unparsable or out-of-range file
    /// is a fatal configuration error.
    pub fn load_config(&self) -> Result<EngineConfig, EngineError> {
        let config = load_yaml_file(&self.config_path())?;
        validate_config(&config)?;
        Ok(config)
    }
}

pub fn load_yaml_file(path: &Path) -> Result<EngineConfig, EngineError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        EngineError::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_config(&contents)
        .map_err(|e| EngineError::config(format!("{}: {}", path.display(), e)))
}

pub fn parse_config(contents: &str) -> Result<EngineConfig, EngineError> {
    if contents.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    serde_yaml::from_str::<EngineConfig>(contents).map_err(|e| EngineError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MemoryBackend;

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_keys() {
        let yaml = r#"
scoring:
  threshold: 70
memory:
  backend: sqlite
  max_turns: 5
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.scoring.threshold, 70.0);
        assert_eq!(config.scoring.target_count, 5);
        assert_eq!(config.memory.max_turns, 5);
        assert_eq!(config.memory.backend, MemoryBackend::Sqlite);
        assert_eq!(config.fusion.max_items, 8);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = parse_config("retrieval:\n  k: 7\n  legacy_option: true\n").unwrap();
        assert_eq!(config.retrieval.k, 7);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = parse_config("scoring: [not, a, map").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn load_config_validates_ranges() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.yml"), "scoring:\n  threshold: 250\n").unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));
        let service = ConfigService::new(Arc::new(paths));

        let err = service.load_config().unwrap_err();
        assert!(err.to_string().contains("scoring.threshold"));
    }
}
