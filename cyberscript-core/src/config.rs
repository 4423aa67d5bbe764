//! Configuration system for CyberScript.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/cyberscript/config.toml` and/or
//! `.cyberscript/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::Complexity;

/// The default Google Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Remote generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider name. Only "gemini" is implemented.
    pub provider: String,
    /// Model used for structured scenario generation.
    pub text_model: String,
    /// Model used for per-step illustrations.
    pub image_model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Takes precedence over `api_key_env`; never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Aspect ratio requested for step images.
    pub aspect_ratio: String,
    /// Request timeout. `None` leaves the transport default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            text_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            api_key_env: "API_KEY".to_string(),
            api_key: None,
            base_url: None,
            aspect_ratio: "16:9".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl GenerationConfig {
    /// Validate this config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.text_model.trim().is_empty() {
            warnings.push("text_model is empty; scenario requests will fail".to_string());
        }
        if self.image_model.trim().is_empty() {
            warnings.push("image_model is empty; image requests will fail".to_string());
        }
        if !is_aspect_ratio(&self.aspect_ratio) {
            warnings.push(format!(
                "aspect_ratio '{}' is not of the form W:H",
                self.aspect_ratio
            ));
        }
        if self.request_timeout_secs == Some(0) {
            warnings.push("request_timeout_secs is 0; every request will time out".to_string());
        }
        warnings
    }

    /// The base URL requests are sent to.
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

fn is_aspect_ratio(value: &str) -> bool {
    match value.split_once(':') {
        Some((w, h)) => {
            matches!(w.parse::<u32>(), Ok(n) if n > 0) && matches!(h.parse::<u32>(), Ok(n) if n > 0)
        }
        None => false,
    }
}

/// Terminal front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Complexity preselected when none is given.
    pub default_complexity: Complexity,
    /// Emit ANSI colors.
    pub color: bool,
    /// Directory where generated step images are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<PathBuf>,
    /// Copy the report to the clipboard once a run completes.
    pub copy_on_complete: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_complexity: Complexity::Intermediate,
            color: true,
            image_dir: None,
            copy_on_complete: false,
        }
    }
}

/// Explicit overrides applied on top of every other layer.
///
/// Only fields that are `Some` are merged, so unset fields keep the value
/// from the files or environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub generation: GenerationOverrides,
    pub ui: UiOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UiOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<PathBuf>,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "cyberscript", "cyberscript")
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".cyberscript").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CYBERSCRIPT_`)
/// 3. Workspace-local config (`.cyberscript/config.toml`)
/// 4. User config (`~/.config/cyberscript/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<AppConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // CYBERSCRIPT_GENERATION__TEXT_MODEL, CYBERSCRIPT_UI__COLOR, etc.
    figment = figment.merge(Env::prefixed("CYBERSCRIPT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any CyberScript configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs()
        && dirs.config_dir().join("config.toml").exists()
    {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

/// Directory for rolling JSON logs.
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write the default configuration to `.cyberscript/config.toml` in the workspace.
///
/// Returns `Ok(None)` when a config file already exists.
pub fn write_default_config(workspace: &Path) -> std::io::Result<Option<PathBuf>> {
    let path = workspace_config_path(workspace);
    if path.exists() {
        return Ok(None);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(&path, toml_str)?;
    Ok(Some(path))
}
