use crate::config::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn get_classline_home() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os("CLASSLINE_HOME") {
        return Ok(PathBuf::from(home));
    }
    Ok(dirs::home_dir()
        .context("Could not determine home directory")?
        .join(".classline"))
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_classline_home()?.join("config.json"))
}

/// Load the config file, falling back to defaults when it doesn't exist,
/// then apply env-var overrides for the three secrets so deployments can
/// keep tokens out of the file entirely.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(token) = std::env::var("CLASSLINE_TOKEN") {
        config.server.bearer_token = token;
    }
    if let Ok(token) = std::env::var("LMS_TOKEN") {
        config.lms.token = token;
    }
    if let Ok(token) = std::env::var("WHATSAPP_TOKEN") {
        config.whatsapp.token = token;
    }
}
