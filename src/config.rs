use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_CONFIG_PATH").unwrap_or("/usr/local/etc/facegate/config.toml"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum Euclidean distance between two descriptors for them to count
    /// as the same person. Lower is stricter.
    pub tolerance: f32,
    /// Minimum detector confidence for a face to be considered at all.
    pub score_threshold: f32,
    /// Directory holding the agent, machine and intervention record files.
    pub data_dir: PathBuf,
    pub detector_model: PathBuf,
    pub recognizer_model: PathBuf,
    /// Per-request budget for encoder and store calls, in milliseconds.
    pub request_timeout_ms: u64,
    /// Listen address for `facegate serve`.
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: 0.6,
            score_threshold: 0.6,
            data_dir: PathBuf::from("/var/lib/facegate"),
            detector_model: PathBuf::from(
                "/usr/local/share/facegate/face_detection_yunet_2023mar.onnx",
            ),
            recognizer_model: PathBuf::from(
                "/usr/local/share/facegate/face_recognition_sface_2021dec.onnx",
            ),
            request_timeout_ms: 5000,
            listen: "127.0.0.1:8000".to_string(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let cfg = load_config(Some(Path::new("/nonexistent/facegate.toml"))).unwrap();
        assert_eq!(cfg.tolerance, 0.6);
        assert_eq!(cfg.request_timeout_ms, 5000);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.tolerance = 0.45;
        save_config(&cfg, Some(&path)).unwrap();
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.tolerance, 0.45);
        assert_eq!(loaded.listen, cfg.listen);
    }
}
