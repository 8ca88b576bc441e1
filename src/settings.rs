//! Client settings: where the service lives and what to watch.
//!
//! Settings are merged from an optional file (YAML, TOML or JSON, detected by
//! extension) and environment variables, with the environment taking
//! precedence:
//!
//! ```rust,no_run
//! use apollo_watch::settings::ClientSettings;
//!
//! # fn example() -> apollo_watch::error::Result<()> {
//! // APOLLO_APP_ID=demo APOLLO_NAMESPACES=application,db.yaml
//! let settings = ClientSettings::load(Some("config/apollo.yaml"), "APOLLO")?;
//! println!("watching {:?}", settings.namespaces);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, ValidationError, WatchError};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Bootstrap settings for a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    /// Base URL of the config service
    pub server_url: String,
    /// Application id
    pub app_id: String,
    /// Cluster name
    #[serde(default = "default_cluster")]
    pub cluster: String,
    /// Namespaces to watch
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Address reported to the configs endpoint
    #[serde(default)]
    pub client_ip: Option<String>,
    /// HTTP request timeout; must outlast the service's long-poll hold
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay between steady-state cycles
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Delay after a cycle-level error
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Attempts at the initial load before giving up
    #[serde(default = "default_initial_load_attempts")]
    pub initial_load_attempts: u32,
}

fn default_cluster() -> String {
    "default".to_string()
}

fn default_request_timeout_ms() -> u64 {
    90_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_error_backoff_ms() -> u64 {
    5_000
}

fn default_initial_load_attempts() -> u32 {
    3
}

impl ClientSettings {
    /// Settings with defaults for everything but the service location.
    pub fn new(server_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            app_id: app_id.into(),
            cluster: default_cluster(),
            namespaces: Vec::new(),
            client_ip: None,
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            initial_load_attempts: default_initial_load_attempts(),
        }
    }

    /// Load settings from an optional file overridden by `{prefix}_*` environment variables.
    ///
    /// `namespaces` may be given in the environment as a comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value has the wrong type,
    /// or the merged settings fail [`validate`](Self::validate).
    pub fn load(path: Option<impl AsRef<Path>>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path = path.as_ref();
            validate_extension(path)?;
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("namespaces"),
        );

        let settings: ClientSettings = builder
            .build()
            .map_err(|e| WatchError::Settings(format!("Failed to build settings: {}", e)))?
            .try_deserialize()
            .map_err(|e| WatchError::Settings(format!("Failed to deserialize settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values the watcher cannot work with.
    ///
    /// # Errors
    ///
    /// Returns every problem found, combined into one [`ValidationError`].
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.server_url.trim().is_empty() {
            errors.push(ValidationError::invalid_field("server_url", "must not be empty"));
        } else {
            match Url::parse(&self.server_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(ValidationError::invalid_field(
                    "server_url",
                    format!("unsupported scheme '{}', expected http or https", url.scheme()),
                )),
                Err(e) => errors.push(ValidationError::invalid_field(
                    "server_url",
                    format!("'{}': {}", self.server_url, e),
                )),
            }
        }

        if self.app_id.trim().is_empty() {
            errors.push(ValidationError::invalid_field("app_id", "must not be empty"));
        }

        if self.cluster.trim().is_empty() {
            errors.push(ValidationError::invalid_field("cluster", "must not be empty"));
        }

        if self.namespaces.is_empty() {
            errors.push(ValidationError::invalid_field(
                "namespaces",
                "at least one namespace is required",
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.namespaces {
            if name.trim().is_empty() {
                errors.push(ValidationError::invalid_field(
                    "namespaces",
                    "namespace names must not be empty",
                ));
            } else if !seen.insert(name.as_str()) {
                errors.push(ValidationError::invalid_field(
                    "namespaces",
                    format!("duplicate namespace '{}'", name),
                ));
            }
        }

        if self.request_timeout_ms == 0 {
            errors.push(ValidationError::invalid_field(
                "request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.initial_load_attempts == 0 {
            errors.push(ValidationError::invalid_field(
                "initial_load_attempts",
                "must be at least 1",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delay between steady-state cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay after a cycle-level error.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            WatchError::Settings(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(WatchError::Settings(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}
