//! TOML configuration for the CLI and web server.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::{GrowthMethod, NegativeValuePolicy, DEFAULT_MAX_RANGE_YEARS};
use crate::error::ForecastError;

/// Top-level configuration. Every section and field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub projection: ProjectionConfig,
    pub server: ServerConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Treatment of projected values below zero
    pub negative_values: NegativeValuePolicy,
    /// Methods run when a request does not name any
    pub methods: Vec<GrowthMethod>,
    /// Longest `start_year..=end_year` range a request may ask for
    pub max_range_years: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            negative_values: NegativeValuePolicy::Keep,
            methods: GrowthMethod::ALL.to_vec(),
            max_range_years: DEFAULT_MAX_RANGE_YEARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Dataset directory (CSV tables) or JSON file
    pub path: Option<PathBuf>,
}

impl ForecastConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ForecastError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = ForecastConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ForecastConfig::default());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.projection.methods.len(), 4);
        assert_eq!(cfg.projection.negative_values, NegativeValuePolicy::Keep);
        assert_eq!(cfg.projection.max_range_years, DEFAULT_MAX_RANGE_YEARS);
    }

    #[test]
    fn test_max_range_years_override() {
        let cfg = ForecastConfig::from_toml_str("[projection]\nmax_range_years = 25\n").unwrap();
        assert_eq!(cfg.projection.max_range_years, 25);
        assert_eq!(cfg.projection.methods.len(), 4);
    }

    #[test]
    fn test_partial_config() {
        let cfg = ForecastConfig::from_toml_str(
            r#"
            [projection]
            negative_values = "clamp_to_zero"
            methods = ["Arithmetic", "Exponential"]

            [data]
            path = "data/census"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.projection.negative_values,
            NegativeValuePolicy::ClampToZero
        );
        assert_eq!(
            cfg.projection.methods,
            vec![GrowthMethod::Arithmetic, GrowthMethod::Exponential]
        );
        assert_eq!(cfg.data.path, Some(PathBuf::from("data/census")));
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let err = ForecastConfig::from_toml_str("[projection]\nnegative_values = \"floor\"\n")
            .unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        let cfg = ForecastConfig::load(&path).unwrap();
        assert_eq!(cfg.server.port, 9000);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ForecastConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ForecastError::Io(_)));
    }
}
