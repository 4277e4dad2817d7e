use super::schema::JsidConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./jsid.yaml
    /// 2. ~/.jsid/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<JsidConfig, ConfigError> {
        let local_config = PathBuf::from("./jsid.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".jsid").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(JsidConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<JsidConfig, ConfigError> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: JsidConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "browser:\n  headless: true\nrecorder:\n  poll_interval_ms: 250").unwrap();

        let config = ConfigLoader::load_from(file.path()).await.unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.eval_timeout_ms, 10000);
        assert_eq!(config.recorder.poll_interval_ms, 250);
        assert_eq!(config.recorder.settle_timeout_ms, 2000);
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            ConfigLoader::load_from(&missing).await,
            Err(ConfigError::Io(_))
        ));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "recorder: [not, a, map]").unwrap();
        assert!(matches!(
            ConfigLoader::load_from(&bad).await,
            Err(ConfigError::Parse(_))
        ));
    }
}
