use serde::{Deserialize, Serialize};
use std::path::Path;

use tracing::warn;

use crate::report::ReportBranding;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_LINK_TTL_HOURS: u64 = 24;
/// A century. Longer TTLs are clamped so the cleanup cutoff stays a valid instant.
pub const MAX_LINK_TTL_HOURS: u64 = 24 * 365 * 100;

/// Site-level configuration: an optional JSON file, then environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SiteConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub agent_sdk_url: Option<String>,
    pub public_base_url: Option<String>,
    pub mail_from: Option<String>,
    pub wkhtmltopdf_path: Option<String>,
    pub report_title: Option<String>,
    pub report_footer: Option<String>,
    pub link_ttl_hours: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read site config {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid site config {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

impl SiteConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        if let Some(hours) = cfg.link_ttl_hours.filter(|h| *h > MAX_LINK_TTL_HOURS) {
            warn!(hours, max = MAX_LINK_TTL_HOURS, "link_ttl_hours out of range, clamping");
            cfg.link_ttl_hours = Some(MAX_LINK_TTL_HOURS);
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: display.clone(), source })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Environment variables win over file values when set and non-empty.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("GEMINI_API_KEY") { self.gemini_api_key = Some(v); }
        if let Some(v) = get("GEMINI_MODEL") { self.gemini_model = Some(v); }
        if let Some(v) = get("AGENT_SDK_URL") { self.agent_sdk_url = Some(v); }
        if let Some(v) = get("PUBLIC_BASE_URL") { self.public_base_url = Some(v); }
        if let Some(v) = get("MAIL_FROM") { self.mail_from = Some(v); }
        if let Some(v) = get("WKHTMLTOPDF_PATH") { self.wkhtmltopdf_path = Some(v); }
    }

    pub fn branding(&self) -> ReportBranding {
        let defaults = ReportBranding::default();
        ReportBranding {
            title: self.report_title.clone().unwrap_or(defaults.title),
            footer: self.report_footer.clone().unwrap_or(defaults.footer),
        }
    }

    pub fn link_ttl_hours(&self) -> u64 {
        self.link_ttl_hours.unwrap_or(DEFAULT_LINK_TTL_HOURS).min(MAX_LINK_TTL_HOURS)
    }

    pub fn link_ttl(&self) -> chrono::Duration {
        ttl_from_hours(self.link_ttl_hours())
    }

    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:7171".into())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequestOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub api_key: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Converts an hour count to a TTL without wrapping or overflowing.
pub fn ttl_from_hours(hours: u64) -> chrono::Duration {
    let max = MAX_LINK_TTL_HOURS as i64;
    let hours = i64::try_from(hours).map_or(max, |h| h.min(max));
    chrono::Duration::hours(hours)
}

/// Request overrides beat site config, which beats the built-in defaults.
/// Returns `None` when no API key is configured.
pub fn resolve_agent_config(site: &SiteConfig, request: &RequestOverrides) -> Option<AgentConfig> {
    let api_key = site.gemini_api_key.clone().filter(|k| !k.trim().is_empty())?;

    let model_name = request
        .model
        .clone()
        .or_else(|| site.gemini_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.into());
    let temperature = request
        .temperature
        .or(site.temperature)
        .unwrap_or(DEFAULT_TEMPERATURE);
    let max_tokens = request
        .max_tokens
        .or(site.max_tokens)
        .unwrap_or(DEFAULT_MAX_TOKENS);

    Some(AgentConfig { api_key, model_name, temperature, max_tokens })
}
