// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Configuration file handling.

use crate::APP_VERSION;
use crate::errors::ServiceError;
use config::Config;
use log::{error, info, warn};
use serde_with::{DurationSeconds, serde_as};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};
use url::Url;
use uuid::Uuid;

/// Default configuration file.
pub const DEF_CONFIG_FILE: &str = "configuration.yaml";

/// Integration domain.
pub const DOMAIN: &str = "n8n_conversation";
/// Config entry data key of the webhook URL.
pub const CONF_WEBHOOK_URL: &str = "webhook_url";
/// Title of newly created config entries.
pub const DEFAULT_NAME: &str = "n8n Conversation";

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "N8N";

const ENV_ENTRIES_FILENAME: &str = "N8N_ENTRIES_FILENAME";
const DEF_ENTRIES_FILENAME: &str = "n8n-conversation.json";

/// Environment variable for the user configuration directory holding the config entries.
///
/// If not set, the current directory is used.
const ENV_CONFIG_HOME: &str = "N8N_CONFIG_HOME";

/// Environment variable to disable TLS verification of the webhook server.
pub const ENV_DISABLE_CERT_VERIFICATION: &str = "N8N_DISABLE_CERT_VERIFICATION";

/// Compiled-in integration manifest in json format.
const MANIFEST: &str = include_str!("../resources/manifest.json");

#[derive(Default, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub integration: IntegrationSettings,
    pub relay: RelaySettings,
}

#[derive(serde::Deserialize, serde::Serialize)]
pub struct IntegrationSettings {
    pub interface: String,
    pub http: WebServerSettings,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            http: WebServerSettings {
                enabled: true,
                port: 8000,
            },
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize)]
pub struct WebServerSettings {
    pub enabled: bool,
    pub port: u16,
}

/// Outgoing webhook request settings.
#[serde_as]
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct RelaySettings {
    /// Max time allowed to connect to the webhook host, including DNS name resolution.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "connection_timeout_sec")]
    pub connection_timeout: Duration,
    /// Total time for a webhook exchange: connect, send the request and read the response body.
    /// Must be equal or greater than `connection_timeout`.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "request_timeout_sec")]
    pub request_timeout: Duration,
    /// Max accepted size of a webhook response body.
    #[serde(default = "default_max_response_size_kb")]
    pub max_response_size_kb: usize,
    /// Disables certificate verification for https webhooks.
    #[serde(default)]
    pub disable_cert_validation: bool,
    /// Check if a webhook URL is reachable in the setup and options flows.
    #[serde(default)]
    pub validate_on_setup: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_response_size_kb: default_max_response_size_kb(),
            disable_cert_validation: false,
            validate_on_setup: false,
        }
    }
}

impl Display for RelaySettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connection timeout={:?}, request timeout={:?}, max response={}KB, disable cert validation={}",
            self.connection_timeout,
            self.request_timeout,
            self.max_response_size_kb,
            self.disable_cert_validation
        )
    }
}

fn default_max_response_size_kb() -> usize {
    256
}

/// Load the configuration settings.
///
/// The application provides default values which can be overriden in the following order:
/// 1. Configuration settings in the read-only yaml configuration file specified in `filename`
/// 2. Environment variables with prefix `N8N_`. Nested keys are separated with `__`,
///    e.g. `N8N_RELAY__REQUEST_TIMEOUT_SEC=20`.
pub fn get_configuration(filename: Option<&str>) -> Result<Settings, config::ConfigError> {
    // default configuration
    let mut config = Config::builder().add_source(Config::try_from(&Settings::default())?);
    // read optional configuration file to override defaults
    if let Some(filename) = filename {
        config = config.add_source(config::File::with_name(filename));
    }

    let config = config
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = config.try_deserialize()?;

    Ok(check_cfg_values(settings))
}

fn check_cfg_values(mut settings: Settings) -> Settings {
    let defaults = RelaySettings::default();
    let relay = &mut settings.relay;

    if relay.request_timeout.as_millis() < 500 {
        warn!(
            "Invalid request timeout {:?}, using default {:?}",
            relay.request_timeout, defaults.request_timeout
        );
        relay.request_timeout = defaults.request_timeout;
    }

    if relay.connection_timeout.is_zero() || relay.connection_timeout > relay.request_timeout {
        let timeout = defaults.connection_timeout.min(relay.request_timeout);
        warn!(
            "Invalid connection timeout {:?}, using {timeout:?}",
            relay.connection_timeout
        );
        relay.connection_timeout = timeout;
    }

    if relay.max_response_size_kb == 0 {
        warn!("Invalid max response size, using default.");
        relay.max_response_size_kb = defaults.max_response_size_kb;
    }

    settings
}

/// Deserialize the compiled-in integration manifest and set the application version.
pub fn get_manifest() -> Result<serde_json::Value, io::Error> {
    let mut manifest: serde_json::Value = serde_json::from_str(MANIFEST).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid manifest.json format: {e}"),
        )
    })?;

    if let Some(map) = manifest.as_object_mut() {
        map.insert("version".into(), APP_VERSION.into());
    }

    Ok(manifest)
}

/// A configured conversation agent: one webhook URL with its own lifecycle.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    #[serde(default)]
    pub data: EntryData,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EntryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl ConfigEntry {
    pub fn new(title: impl Into<String>, webhook_url: &Url) -> Self {
        Self {
            entry_id: Uuid::new_v4().simple().to_string(),
            title: title.into(),
            data: EntryData {
                webhook_url: Some(webhook_url.to_string()),
            },
        }
    }
}

/// Persisted config entries file structure.
#[derive(Default, serde::Deserialize, serde::Serialize)]
struct EntriesFile {
    #[serde(default)]
    entries: Vec<ConfigEntry>,
}

/// Load the persisted config entries.
///
/// A non-existing file is not an error and returns no entries.
pub fn load_config_entries(path: &Path) -> Result<Vec<ConfigEntry>, ServiceError> {
    if !path.is_file() {
        info!("No config entries file found: {path:?}");
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let file: EntriesFile = serde_json::from_str(&content)?;
    info!("Loaded {} config entries from {path:?}", file.entries.len());
    Ok(file.entries)
}

/// Store the config entries from the setup and options flows.
pub fn save_config_entries(path: &Path, entries: &[ConfigEntry]) -> Result<(), ServiceError> {
    let file = EntriesFile {
        entries: entries.to_vec(),
    };
    let content = serde_json::to_string_pretty(&file)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, content).map_err(|e| {
        let msg = format!("Error saving config entries: {e}");
        error!("{msg}");
        ServiceError::InternalServerError(msg)
    })
}

/// Get the config entries file path.
///
/// The file is located in the configuration directory specified in the env variable
/// `N8N_CONFIG_HOME`. If not set, the current directory is used.
pub fn entries_path() -> PathBuf {
    let file = env::var(ENV_ENTRIES_FILENAME).unwrap_or(DEF_ENTRIES_FILENAME.into());
    Path::new(&env::var(ENV_CONFIG_HOME).unwrap_or_default()).join(file)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Unique, not yet existing file path in the temp directory.
    pub(crate) fn temp_entries_path() -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("n8n-conversation-{}.json", Uuid::new_v4().simple()));
        path
    }

    #[test]
    fn default_relay_settings() {
        let relay = RelaySettings::default();
        assert_eq!(Duration::from_secs(10), relay.request_timeout);
        assert_eq!(Duration::from_secs(5), relay.connection_timeout);
        assert_eq!(256, relay.max_response_size_kb);
        assert!(!relay.disable_cert_validation);
        assert!(!relay.validate_on_setup);
    }

    #[test]
    fn check_cfg_values_replaces_invalid_timeouts() {
        let mut settings = Settings::default();
        settings.relay.request_timeout = Duration::from_millis(100);
        settings.relay.connection_timeout = Duration::ZERO;
        settings.relay.max_response_size_kb = 0;

        let settings = check_cfg_values(settings);

        assert_eq!(Duration::from_secs(10), settings.relay.request_timeout);
        assert_eq!(Duration::from_secs(5), settings.relay.connection_timeout);
        assert_eq!(256, settings.relay.max_response_size_kb);
    }

    #[test]
    fn connection_timeout_is_capped_by_request_timeout() {
        let mut settings = Settings::default();
        settings.relay.request_timeout = Duration::from_secs(3);
        settings.relay.connection_timeout = Duration::from_secs(8);

        let settings = check_cfg_values(settings);

        assert_eq!(Duration::from_secs(3), settings.relay.connection_timeout);
    }

    #[test]
    fn load_config_entries_with_missing_file_returns_empty_list() {
        let result = load_config_entries(&temp_entries_path());
        assert_eq!(Ok(Vec::new()), result);
    }

    #[test]
    fn saved_config_entries_can_be_loaded() {
        let path = temp_entries_path();
        let url = Url::parse("http://n8n.local:5678/webhook/assist").unwrap();
        let entries = vec![ConfigEntry::new(DEFAULT_NAME, &url)];

        save_config_entries(&path, &entries).expect("saving entries must succeed");
        let loaded = load_config_entries(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(Ok(entries), loaded);
    }

    #[test]
    fn load_config_entries_with_invalid_json_returns_error() {
        let path = temp_entries_path();
        fs::write(&path, "{ not json").unwrap();
        let result = load_config_entries(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ServiceError::SerializationError(_))));
    }

    #[test]
    fn new_config_entry_has_simple_uuid_id() {
        let url = Url::parse("https://n8n.example.com/webhook/x").unwrap();
        let entry = ConfigEntry::new("test", &url);
        assert_eq!(32, entry.entry_id.len());
        assert_eq!(
            Some("https://n8n.example.com/webhook/x"),
            entry.data.webhook_url.as_deref()
        );
    }

    #[test]
    fn manifest_contains_domain_and_version() {
        let manifest = get_manifest().expect("compiled-in manifest must be valid");
        assert_eq!(Some(DOMAIN), manifest["domain"].as_str());
        assert_eq!(Some(APP_VERSION), manifest["version"].as_str());
    }
}
