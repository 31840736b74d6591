//! # Configuration Loader / 配置加载器
//!
//! Reads a TOML file and maps its `[tour]` table onto [`TourConfig`].
//! Pure data loading: missing keys keep their defaults and nothing is
//! validated here.

use std::path::Path;

use anyhow::Context;
use lw_core::TourConfig;

/// Load the tour configuration from a TOML file.
///
/// # Errors / 错误
///
/// Fails when the file cannot be read, is not valid TOML, or the `[tour]`
/// table has values of the wrong type.
pub fn load_tour_config(config_path: impl AsRef<Path>) -> anyhow::Result<TourConfig> {
    let config_path = config_path.as_ref();
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    TourConfig::from_toml(&toml_value)
        .with_context(|| format!("Invalid [tour] table in {}", config_path.display()))
}
