//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. `svcwatch.toml` in the working directory, or the file passed with `--config`
//! 3. `SVCWATCH_*` environment variables (`__` separates nested keys,
//!    e.g. `SVCWATCH_CHECK__MAX_WAIT=30s`)
//! 4. Command-line flags
//!
//! ```toml
//! base_url = "http://status.internal:8080"
//! refresh_interval = "15s"
//! latency_warn_ms = 250
//! latency_critical_ms = 800
//!
//! [check]
//! single_delay = "2500ms"
//! max_wait = "20s"
//!
//! [keys]
//! refresh = "F5"
//! search = "ctrl+k,/"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::client::HttpBackend;
use crate::data::duration::parse_duration;
use crate::data::Thresholds;
use crate::sync::ConfirmPolicy;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SVCWATCH";

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_NAME: &str = "svcwatch";

/// Terminal color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Auto,
    Dark,
    Light,
}

/// Timing of active-check confirmation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    #[serde(deserialize_with = "de_duration")]
    pub single_delay: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub all_delay: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub max_wait: Duration,
    pub backoff_factor: f64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        let single = ConfirmPolicy::single();
        Self {
            single_delay: single.first_delay,
            all_delay: ConfirmPolicy::all().first_delay,
            max_wait: single.max_wait,
            backoff_factor: single.backoff_factor,
        }
    }
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend root, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Static API token. When set, no login is required.
    pub token: Option<String>,
    #[serde(deserialize_with = "de_duration")]
    pub refresh_interval: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub request_timeout: Duration,
    pub check: CheckSettings,
    pub latency_warn_ms: f64,
    pub latency_critical_ms: f64,
    #[serde(deserialize_with = "de_duration")]
    pub changed_window: Duration,
    /// Key binding overrides: action name to comma-separated key specs.
    pub keys: HashMap<String, String>,
    pub theme: ThemeChoice,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: None,
            refresh_interval: Duration::from_secs(15),
            request_timeout: Duration::from_secs(10),
            check: CheckSettings::default(),
            latency_warn_ms: thresholds.latency_warn_ms,
            latency_critical_ms: thresholds.latency_critical_ms,
            changed_window: thresholds.changed_window,
            keys: HashMap::new(),
            theme: ThemeChoice::Auto,
            log_file: PathBuf::from("svcwatch.log"),
        }
    }
}

/// Values given on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub refresh_interval: Option<String>,
    pub latency_warn_ms: Option<f64>,
    pub latency_critical_ms: Option<f64>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from every layer.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(config_path, None, overrides)
    }

    /// Load settings, taking environment variables from `env` when given
    /// instead of the process environment.
    pub fn load_with_env(
        config_path: Option<&Path>,
        env: Option<HashMap<String, String>>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .set_override_option("base_url", overrides.base_url.clone())?
            .set_override_option("token", overrides.token.clone())?
            .set_override_option("refresh_interval", overrides.refresh_interval.clone())?
            .set_override_option("latency_warn_ms", overrides.latency_warn_ms)?
            .set_override_option("latency_critical_ms", overrides.latency_critical_ms)?
            .set_override_option(
                "log_file",
                overrides
                    .log_file
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations the rest of the app cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.refresh_interval.is_zero() {
            bail!("refresh_interval must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }
        if !(self.latency_warn_ms >= 0.0 && self.latency_warn_ms <= self.latency_critical_ms) {
            bail!(
                "latency thresholds must satisfy 0 <= warn ({}) <= critical ({})",
                self.latency_warn_ms,
                self.latency_critical_ms
            );
        }
        if !(self.check.backoff_factor.is_finite() && self.check.backoff_factor >= 1.0) {
            bail!(
                "check.backoff_factor must be a finite number of at least 1.0, got {}",
                self.check.backoff_factor
            );
        }
        Ok(())
    }

    /// Whether a static token makes interactive login unnecessary.
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// HTTP client for the configured backend, carrying the token if one is set.
    pub fn backend(&self) -> Result<HttpBackend> {
        let backend = HttpBackend::new(&self.base_url, self.request_timeout)
            .context("Failed to create HTTP client")?;
        Ok(match self.token {
            Some(ref token) if self.has_token() => backend.with_token(token.trim()),
            _ => backend,
        })
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            latency_warn_ms: self.latency_warn_ms,
            latency_critical_ms: self.latency_critical_ms,
            changed_window: self.changed_window,
        }
    }

    /// Confirmation schedule after checking a single service.
    pub fn single_check_policy(&self) -> ConfirmPolicy {
        ConfirmPolicy {
            first_delay: self.check.single_delay,
            backoff_factor: self.check.backoff_factor,
            max_wait: self.check.max_wait,
        }
    }

    /// Confirmation schedule after checking all services.
    pub fn all_check_policy(&self) -> ConfirmPolicy {
        ConfirmPolicy {
            first_delay: self.check.all_delay,
            backoff_factor: self.check.backoff_factor,
            max_wait: self.check.max_wait,
        }
    }
}

/// Durations are written as strings ("15s", "2500ms") or bare milliseconds.
fn de_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
