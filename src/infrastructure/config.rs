use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";

const DEFAULT_API_BASE_URL: &str = "https://api.technozlife.com";
const DEFAULT_PREVIEW_DAYS: u32 = 28;
const DEFAULT_PREVIEW_VARIABILITY: f64 = 0.12;

/// Environment-driven settings. The reCAPTCHA site key and the OAuth
/// redirect URI are optional; missing values degrade behavior instead of
/// failing startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub recaptcha_site_key: Option<String>,
    pub oauth_redirect_uri: Option<String>,
}

impl ApiConfig {
    pub fn bot_check_enabled(&self) -> bool {
        self.recaptcha_site_key.is_some()
    }
}

pub fn load_api_config_from_env() -> ApiConfig {
    load_api_config_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_api_config_from_lookup<F>(lookup: F) -> ApiConfig
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = optional_lookup_value(&lookup, &["TECHNOZLIFE_API_BASE_URL", "API_BASE_URL"])
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let recaptcha_site_key = optional_lookup_value(
        &lookup,
        &["TECHNOZLIFE_RECAPTCHA_SITE_KEY", "RECAPTCHA_SITE_KEY"],
    );
    let oauth_redirect_uri = optional_lookup_value(
        &lookup,
        &["TECHNOZLIFE_OAUTH_REDIRECT_URI", "OAUTH_REDIRECT_URI"],
    );

    ApiConfig {
        base_url,
        recaptcha_site_key,
        oauth_redirect_uri,
    }
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewDefaults {
    pub days: u32,
    pub variability: f64,
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "TechnoZLife",
        "timezone": "UTC",
        "preview": {
            "days": DEFAULT_PREVIEW_DAYS,
            "variability": DEFAULT_PREVIEW_VARIABILITY
        }
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn read_preview_defaults(config_dir: &Path) -> Result<PreviewDefaults, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let days = app
        .pointer("/preview/days")
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0)
        .map(|value| value as u32)
        .unwrap_or(DEFAULT_PREVIEW_DAYS);
    let variability = app
        .pointer("/preview/variability")
        .and_then(serde_json::Value::as_f64)
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(DEFAULT_PREVIEW_VARIABILITY);
    Ok(PreviewDefaults { days, variability })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_CONFIG: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_CONFIG.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "technozlife-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn api_config_falls_back_to_defaults() {
        let config = load_api_config_from_lookup(|_| None);
        assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
        assert!(config.recaptcha_site_key.is_none());
        assert!(!config.bot_check_enabled());
    }

    #[test]
    fn api_config_prefers_prefixed_keys_and_trims_trailing_slash() {
        let config = load_api_config_from_lookup(|key| match key {
            "TECHNOZLIFE_API_BASE_URL" => Some("https://staging.technozlife.com/".to_string()),
            "API_BASE_URL" => Some("https://wrong.example.com".to_string()),
            "RECAPTCHA_SITE_KEY" => Some("site-key".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://staging.technozlife.com");
        assert_eq!(config.recaptcha_site_key.as_deref(), Some("site-key"));
        assert!(config.bot_check_enabled());
    }

    #[test]
    fn ensure_default_configs_writes_app_json_once() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        let timezone = read_timezone(&dir.path).expect("read timezone");
        assert_eq!(timezone.as_deref(), Some("UTC"));

        let defaults = read_preview_defaults(&dir.path).expect("read preview defaults");
        assert_eq!(defaults.days, DEFAULT_PREVIEW_DAYS);
        assert!((defaults.variability - DEFAULT_PREVIEW_VARIABILITY).abs() < f64::EPSILON);
    }

    #[test]
    fn read_config_rejects_unsupported_schema() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(APP_JSON), "{\"schema\": 2}").expect("write config");
        let result = read_timezone(&dir.path);
        assert!(matches!(result, Err(InfraError::InvalidConfig(_))));
    }
}
