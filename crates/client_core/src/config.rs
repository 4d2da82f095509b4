use std::{fs, io, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "portal.toml";

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("api base url '{0}' must be an absolute http(s) url")]
    InvalidBaseUrl(String),
}

/// Read-only portal settings, loaded once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub app_name: String,
    pub app_version: String,
    pub max_file_size: u64,
    pub allowed_file_types: Vec<String>,
    pub max_files: usize,
    pub request_timeout_ms: u64,
    pub home_url: String,
    pub complaint_form_url: String,
    pub track_complaint_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".into(),
            app_name: "PPU Complaint Management System".into(),
            app_version: "1.0.0".into(),
            max_file_size: 10 * 1024 * 1024,
            allowed_file_types: [MIME_PDF, MIME_JPEG, MIME_PNG, MIME_DOC, MIME_DOCX]
                .into_iter()
                .map(String::from)
                .collect(),
            max_files: 5,
            request_timeout_ms: 30_000,
            home_url: "/".into(),
            complaint_form_url: "/complaint-form.html".into(),
            track_complaint_url: "/track-complaint.html".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Absolute url of an API route such as `/otp/send`.
    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }

    /// Link to the tracking page for an issued complaint.
    pub fn track_link(&self, complaint_id: &str, pin: &str) -> String {
        format!(
            "{}?id={complaint_id}&pin={pin}",
            self.track_complaint_url.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api_base_url: Option<String>,
    app_name: Option<String>,
    max_file_size: Option<u64>,
    allowed_file_types: Option<Vec<String>>,
    max_files: Option<usize>,
    request_timeout_ms: Option<u64>,
    home_url: Option<String>,
    complaint_form_url: Option<String>,
    track_complaint_url: Option<String>,
}

/// Loads settings from `portal.toml` in the working directory plus environment overrides.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: SettingsFile =
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            apply_file(&mut settings, file_cfg);
            debug!(path = %path.display(), "loaded portal settings file");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    validate_base_url(&settings.api_base_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: SettingsFile) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.app_name {
        settings.app_name = v;
    }
    if let Some(v) = file_cfg.max_file_size {
        settings.max_file_size = v;
    }
    if let Some(v) = file_cfg.allowed_file_types {
        settings.allowed_file_types = v;
    }
    if let Some(v) = file_cfg.max_files {
        settings.max_files = v;
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = file_cfg.home_url {
        settings.home_url = v;
    }
    if let Some(v) = file_cfg.complaint_form_url {
        settings.complaint_form_url = v;
    }
    if let Some(v) = file_cfg.track_complaint_url {
        settings.track_complaint_url = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PORTAL_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_ms = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__REQUEST_TIMEOUT_MS"),
        }
    }
    if let Some(v) = var("APP__MAX_FILE_SIZE") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.max_file_size = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__MAX_FILE_SIZE"),
        }
    }
    if let Some(v) = var("APP__MAX_FILES") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.max_files = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__MAX_FILES"),
        }
    }
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidBaseUrl(raw.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
