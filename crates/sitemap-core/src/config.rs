use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::error::SitemapError;

const CONFIG_DIR_NAME: &str = "catalog-sitemap";
const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_SITEMAP_PREFIX: &str = "sitemap";
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const DEFAULT_API_BASE_URL: &str = "https://api.musement.com/api/v3";
pub const DEFAULT_USER_AGENT: &str = "Musement Sitemap Service";

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: SitemapConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No configuration file was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from a TOML file.
    File,
}

/// Sitemap `<changefreq>` hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "always" => Some(ChangeFrequency::Always),
            "hourly" => Some(ChangeFrequency::Hourly),
            "daily" => Some(ChangeFrequency::Daily),
            "weekly" => Some(ChangeFrequency::Weekly),
            "monthly" => Some(ChangeFrequency::Monthly),
            "yearly" => Some(ChangeFrequency::Yearly),
            "never" => Some(ChangeFrequency::Never),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote catalog API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub page_limit: u32,
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain SMTP, typically a local relay.
    #[default]
    None,
    /// Upgrade with STARTTLS after connecting.
    Starttls,
    /// Implicit TLS (SMTPS).
    Tls,
}

/// Outbound mail relay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            username: None,
            password: None,
            security: SmtpSecurity::None,
        }
    }
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    pub default_locale: String,
    pub supported_locales: Vec<String>,
    pub default_directory: String,
    pub connection_timeout_secs: u64,
    pub changefreq: ChangeFrequency,
    pub cities_changefreq: Option<ChangeFrequency>,
    pub activities_changefreq: Option<ChangeFrequency>,
    pub cities_priority: f64,
    pub activities_priority: f64,
    pub sitemap_prefix: String,
    pub email_from: String,
    pub templates_dir: Option<String>,
    pub api: ApiSettings,
    pub smtp: SmtpSettings,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            default_locale: "it-IT".to_string(),
            supported_locales: vec![
                "it-IT".to_string(),
                "es-ES".to_string(),
                "fr-FR".to_string(),
            ],
            default_directory: "~/sitemap".to_string(),
            connection_timeout_secs: 10,
            changefreq: ChangeFrequency::Daily,
            cities_changefreq: None,
            activities_changefreq: None,
            cities_priority: 0.7,
            activities_priority: 0.5,
            sitemap_prefix: DEFAULT_SITEMAP_PREFIX.to_string(),
            email_from: "sitemap@localhost".to_string(),
            templates_dir: None,
            api: ApiSettings::default(),
            smtp: SmtpSettings::default(),
        }
    }
}

impl SitemapConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn cities_changefreq(&self) -> ChangeFrequency {
        self.cities_changefreq.unwrap_or(self.changefreq)
    }

    pub fn activities_changefreq(&self) -> ChangeFrequency {
        self.activities_changefreq.unwrap_or(self.changefreq)
    }

    pub fn is_supported_locale(&self, locale: &str) -> bool {
        self.supported_locales.iter().any(|known| known == locale)
    }

    /// Filename prefix for staged and delivered sitemaps, never empty.
    pub fn sitemap_prefix(&self) -> &str {
        if self.sitemap_prefix.trim().is_empty() {
            DEFAULT_SITEMAP_PREFIX
        } else {
            &self.sitemap_prefix
        }
    }

    pub fn default_directory_path(&self) -> PathBuf {
        expand_path(&self.default_directory)
    }

    pub fn templates_path(&self) -> Option<PathBuf> {
        self.templates_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(expand_path)
    }

    /// Apply `SITEMAP_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), SitemapError> {
        self.apply_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides resolved through `lookup`, keyed by environment variable name.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), SitemapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("SITEMAP_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        self.connection_timeout_secs = parse_override(
            &lookup,
            "SITEMAP_CONNECTION_TIMEOUT",
            self.connection_timeout_secs,
            |s| s.parse::<u64>(),
        )?;
        if let Some(raw) = lookup("SITEMAP_CHANGEFREQ") {
            self.changefreq = ChangeFrequency::parse(&raw).ok_or_else(|| {
                SitemapError::Config(format!("invalid value for SITEMAP_CHANGEFREQ: {raw}"))
            })?;
        }
        if let Some(host) = lookup("SITEMAP_SMTP_HOST") {
            self.smtp.host = host;
        }
        self.smtp.port = parse_override(&lookup, "SITEMAP_SMTP_PORT", self.smtp.port, |s| {
            s.parse::<u16>()
        })?;
        if let Some(username) = lookup("SITEMAP_SMTP_USERNAME") {
            self.smtp.username = Some(username);
        }
        if let Some(password) = lookup("SITEMAP_SMTP_PASSWORD") {
            self.smtp.password = Some(password);
        }
        if let Some(from) = lookup("SITEMAP_EMAIL_FROM") {
            self.email_from = from;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SitemapError> {
        if self.supported_locales.is_empty() {
            return Err(SitemapError::Config(
                "supported_locales must list at least one locale".to_string(),
            ));
        }
        if !self.is_supported_locale(&self.default_locale) {
            return Err(SitemapError::Config(format!(
                "default locale {} is not one of the supported locales ({})",
                self.default_locale,
                self.supported_locales.join(", ")
            )));
        }
        for (name, value) in [
            ("cities_priority", self.cities_priority),
            ("activities_priority", self.activities_priority),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SitemapError::Config(format!(
                    "{name} must be within [0.0, 1.0], got {value}"
                )));
            }
        }
        if self.api.page_limit == 0 {
            return Err(SitemapError::Config(
                "api.page_limit must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Directory holding `config.toml` and the log folder.
pub fn config_directory() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to the default `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration from `explicit` (or the default location), falling back to defaults.
pub fn load_config(explicit: Option<&Path>) -> ConfigLoadResult {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config_path);
    let mut warnings = Vec::new();

    if !path.exists() {
        if explicit.is_some() {
            warnings.push(format!(
                "Config file {} does not exist. Using defaults.",
                path.display()
            ));
        }
        return ConfigLoadResult {
            config: SitemapConfig::default(),
            warnings,
            source: ConfigSource::Default,
        };
    }

    match fs::read_to_string(&path) {
        Ok(raw) => match toml::from_str::<SitemapConfig>(&raw) {
            Ok(config) => {
                return ConfigLoadResult {
                    config,
                    warnings,
                    source: ConfigSource::File,
                };
            }
            Err(err) => warnings.push(format!(
                "Failed to parse {} as TOML: {}. Falling back to defaults.",
                path.display(),
                err
            )),
        },
        Err(err) => warnings.push(format!(
            "Failed to read {}: {}. Falling back to defaults.",
            path.display(),
            err
        )),
    }

    ConfigLoadResult {
        config: SitemapConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn parse_override<T, F, E, L>(
    lookup: &L,
    var: &str,
    current: T,
    parser: F,
) -> Result<T, SitemapError>
where
    L: Fn(&str) -> Option<String>,
    F: Fn(&str) -> Result<T, E>,
    E: fmt::Display,
{
    match lookup(var) {
        Some(value) => parser(value.trim()).map_err(|err| {
            SitemapError::Config(format!("invalid value for {}: {}", var, err))
        }),
        None => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = SitemapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.page_limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(config.sitemap_prefix(), "sitemap");
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let raw = r#"
            default_locale = "fr-FR"
            changefreq = "weekly"
            activities_changefreq = "monthly"
            cities_priority = 0.9

            [api]
            page_limit = 5
        "#;
        let config: SitemapConfig = toml::from_str(raw).expect("parse");
        assert_eq!(config.default_locale, "fr-FR");
        assert_eq!(config.cities_changefreq(), ChangeFrequency::Weekly);
        assert_eq!(config.activities_changefreq(), ChangeFrequency::Monthly);
        assert_eq!(config.cities_priority, 0.9);
        assert_eq!(config.activities_priority, 0.5);
        assert_eq!(config.api.page_limit, 5);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn empty_prefix_falls_back_to_sitemap() {
        let config = SitemapConfig {
            sitemap_prefix: "  ".to_string(),
            ..SitemapConfig::default()
        };
        assert_eq!(config.sitemap_prefix(), DEFAULT_SITEMAP_PREFIX);
    }

    #[test]
    fn validate_rejects_out_of_range_priority() {
        let config = SitemapConfig {
            activities_priority: 1.5,
            ..SitemapConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("activities_priority"));
    }

    #[test]
    fn validate_rejects_unsupported_default_locale() {
        let config = SitemapConfig {
            default_locale: "de-DE".to_string(),
            ..SitemapConfig::default()
        };
        assert!(matches!(config.validate(), Err(SitemapError::Config(_))));
    }

    #[test]
    fn overrides_replace_values_and_reject_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SITEMAP_API_BASE_URL", "http://127.0.0.1:9999/api"),
            ("SITEMAP_CONNECTION_TIMEOUT", "3"),
            ("SITEMAP_SMTP_PORT", "2525"),
            ("SITEMAP_CHANGEFREQ", "Weekly"),
        ]);
        let mut config = SitemapConfig::default();
        config
            .apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()))
            .expect("overrides");
        assert_eq!(config.api.base_url, "http://127.0.0.1:9999/api");
        assert_eq!(config.connection_timeout(), Duration::from_secs(3));
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.changefreq, ChangeFrequency::Weekly);

        let mut config = SitemapConfig::default();
        let err = config
            .apply_overrides_from(|name| {
                (name == "SITEMAP_SMTP_PORT").then(|| "not-a-port".to_string())
            })
            .unwrap_err();
        assert!(err.to_string().contains("SITEMAP_SMTP_PORT"));
    }

    #[test]
    fn load_config_reads_file_and_warns_on_garbage() {
        let temp = tempdir().expect("tempdir");
        let good = temp.path().join("good.toml");
        fs::write(&good, "sitemap_prefix = \"catalog\"\n").expect("write");
        let loaded = load_config(Some(&good));
        assert_eq!(loaded.source, ConfigSource::File);
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.config.sitemap_prefix(), "catalog");

        let bad = temp.path().join("bad.toml");
        fs::write(&bad, "cities_priority = [").expect("write");
        let loaded = load_config(Some(&bad));
        assert_eq!(loaded.source, ConfigSource::Default);
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.config, SitemapConfig::default());
    }
}
