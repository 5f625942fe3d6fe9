// Configuration for the simulator.
//
// Everything the transport and the runners need is collected into one
// `SimConfig` value, built once at startup and passed down by reference.
// Sources are layered: built-in defaults, an optional TOML file, then a
// few environment variables for quick overrides.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming an explicit config file. When set, the file must exist.
pub const CONFIG_ENV: &str = "USSD_SIM_CONFIG";
pub const API_URL_ENV: &str = "USSD_API_URL";
pub const HEALTH_URL_ENV: &str = "USSD_HEALTH_URL";
pub const PHONE_NUMBER_ENV: &str = "USSD_PHONE_NUMBER";
pub const REQUEST_TIMEOUT_ENV: &str = "USSD_REQUEST_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:5000/api/ussd";
const DEFAULT_HEALTH_URL: &str = "http://localhost:5000/health";
const DEFAULT_PHONE_NUMBER: &str = "+254712345678";
const DEFAULT_SERVICE_CODE: &str = "*123#";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(1500);
const DEFAULT_INPUT_DELAY: Duration = Duration::from_millis(500);

/// A named, predefined list of inputs replayed without human interaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<String>,
}

impl Scenario {
    pub fn new(name: &str, description: &str, steps: &[&str]) -> Self {
        Scenario {
            name: name.to_string(),
            description: description.to_string(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Scenario {
                name: self.name.clone(),
                reason: "name must not be empty".into(),
            });
        }
        if let Some(pos) = self.steps.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::Scenario {
                name: self.name.clone(),
                reason: format!("step {} is empty", pos + 1),
            });
        }
        Ok(())
    }
}

/// Scenarios that ship with the simulator. Config-file scenarios are
/// appended after these.
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "Complete Registration Flow",
            "Test customer registration from start to finish",
            &["1", "John Doe", "12345678", "1990-05-15"],
        ),
        Scenario::new(
            "Buy Health Insurance",
            "Register and purchase health insurance",
            &["1", "Jane Smith", "87654321", "1985-03-20"],
        ),
        Scenario::new("Check Policy Status", "View existing policies", &["3"]),
        Scenario::new("Customer Support", "View support information", &["8"]),
    ]
}

/// Resolved simulator settings.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// USSD endpoint receiving the form POSTs.
    pub api_url: String,
    /// Separate GET endpoint probed before any session starts.
    pub health_url: String,
    pub phone_number: String,
    /// Dialed short code, attached to every request by the transport.
    pub service_code: String,
    /// Timeout for the main exchange. `None` waits forever.
    pub request_timeout: Option<Duration>,
    pub health_timeout: Duration,
    /// Pause before each scripted step, for the viewer only.
    pub step_delay: Duration,
    /// Pause after each interactive exchange, for the viewer only.
    pub input_delay: Duration,
    pub scenarios: Vec<Scenario>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            api_url: DEFAULT_API_URL.into(),
            health_url: DEFAULT_HEALTH_URL.into(),
            phone_number: DEFAULT_PHONE_NUMBER.into(),
            service_code: DEFAULT_SERVICE_CODE.into(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            step_delay: DEFAULT_STEP_DELAY,
            input_delay: DEFAULT_INPUT_DELAY,
            scenarios: builtin_scenarios(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    health_url: Option<String>,
    phone_number: Option<String>,
    service_code: Option<String>,
    request_timeout_secs: Option<u64>,
    health_timeout_ms: Option<u64>,
    step_delay_ms: Option<u64>,
    input_delay_ms: Option<u64>,
    #[serde(default)]
    scenarios: Vec<Scenario>,
}

impl SimConfig {
    /// Build the configuration from defaults, the config file and the
    /// process environment, then validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = SimConfig::default();

        match std::env::var_os(CONFIG_ENV) {
            Some(path) => config.merge_file(Path::new(&path))?,
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    config.merge_file(&path)?;
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::debug!(api_url = %config.api_url, phone = %config.phone_number, "configuration loaded");
        Ok(config)
    }

    /// Read a TOML file and layer its values over the current ones.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_toml(&text, path)
    }

    /// Layer TOML text over the current values. `origin` is only used in
    /// error messages.
    pub fn merge_toml(&mut self, text: &str, origin: &Path) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        if let Some(v) = file.health_url {
            self.health_url = v;
        }
        if let Some(v) = file.phone_number {
            self.phone_number = v;
        }
        if let Some(v) = file.service_code {
            self.service_code = v;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = timeout_from_secs(secs);
        }
        if let Some(ms) = file.health_timeout_ms {
            self.health_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.step_delay_ms {
            self.step_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.input_delay_ms {
            self.input_delay = Duration::from_millis(ms);
        }
        self.scenarios.extend(file.scenarios);
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(API_URL_ENV) {
            self.api_url = v;
        }
        if let Some(v) = lookup(HEALTH_URL_ENV) {
            self.health_url = v;
        }
        if let Some(v) = lookup(PHONE_NUMBER_ENV) {
            self.phone_number = v;
        }
        if let Some(v) = lookup(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: REQUEST_TIMEOUT_ENV.into(),
                reason: format!("expected whole seconds, got \"{v}\""),
            })?;
            self.request_timeout = timeout_from_secs(secs);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("api_url", &self.api_url),
            ("health_url", &self.health_url),
            ("phone_number", &self.phone_number),
            ("service_code", &self.service_code),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: key.into(),
                    reason: "must not be empty".into(),
                });
            }
        }
        self.scenarios.iter().try_for_each(Scenario::validate)
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// `<config dir>/ussd-simulator/config.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ussd-simulator").join("config.toml"))
}
