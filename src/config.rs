use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::theme::PreferenceStore;

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
  pub theme: Option<String>,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "audiotube")
}

/// Directory for the rolling log file.
pub fn log_dir() -> PathBuf {
  project_dirs().map(|d| d.data_local_dir().to_path_buf()).unwrap_or_else(std::env::temp_dir)
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = toml::from_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) -> Result<()> {
    let proj_dirs = project_dirs().context("No home directory for config")?;
    let config_dir = proj_dirs.config_dir();
    std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(config_dir.join("prefs.toml"), content).context("Failed to write prefs.toml")?;
    Ok(())
  }
}

/// Theme preference stored in `prefs.toml`.
#[derive(Debug, Default)]
pub struct ConfigStore;

impl PreferenceStore for ConfigStore {
  fn load(&self) -> Option<String> {
    Config::load().theme
  }

  fn save(&mut self, value: &str) -> Result<()> {
    let mut config = Config::load();
    config.theme = Some(value.to_string());
    config.save()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_round_trips_through_toml() {
    let config = Config { theme: Some("dark".to_string()) };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
  }

  #[test]
  fn empty_file_is_default() {
    assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
  }
}
