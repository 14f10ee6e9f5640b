use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use relay_core::{DispatchLimits, TrackerSettings};
use relay_engine::{parse_selector, ConnectionSettings, ControllerSettings, PageError, Selector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::logging::LogDestination;

pub const BRIDGE_CONFIG_FILE: &str = "prompt-relay.ron";
pub const CONTROLLER_CONFIG_FILE: &str = "prompt-controller.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },
    #[error("invalid bind address {0:?}")]
    BindAddr(String),
    #[error(transparent)]
    Selector(#[from] PageError),
    #[error("unknown log level {0:?}")]
    LogLevel(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("no prompt template configured")]
    NoTemplate,
}

/// Where a configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file did not exist; built-in defaults are in effect.
    Defaults(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub config: T,
    pub source: ConfigSource,
}

/// Settings of the `prompt-relay` bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub endpoint: String,
    pub reconnect_delay_ms: u64,
    pub scan_interval_ms: u64,
    pub silence_timeout_ms: u64,
    pub container_selector: String,
    pub input_selector: String,
    /// HTML snapshot of the target page, re-read whenever it changes.
    pub page_mirror: PathBuf,
    pub mirror_poll_ms: u64,
    /// JSON-lines file the input helper consumes.
    pub submission_outbox: PathBuf,
    pub log_destination: LogDestination,
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8080".to_string(),
            reconnect_delay_ms: 3000,
            scan_interval_ms: 1000,
            silence_timeout_ms: 60_000,
            container_selector: "body".to_string(),
            input_selector: "#desktop_input_bar".to_string(),
            page_mirror: PathBuf::from("page.html"),
            mirror_poll_ms: 500,
            submission_outbox: PathBuf::from("outbox.jsonl"),
            log_destination: LogDestination::default(),
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.endpoint)?;
        non_zero("reconnect_delay_ms", self.reconnect_delay_ms)?;
        non_zero("scan_interval_ms", self.scan_interval_ms)?;
        non_zero("silence_timeout_ms", self.silence_timeout_ms)?;
        non_zero("mirror_poll_ms", self.mirror_poll_ms)?;
        self.container_query()?;
        self.input_query()?;
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level)
    }

    pub fn container_query(&self) -> Result<Selector, ConfigError> {
        Ok(parse_selector(&self.container_selector)?)
    }

    pub fn input_query(&self) -> Result<Selector, ConfigError> {
        Ok(parse_selector(&self.input_selector)?)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            scan_interval: Duration::from_millis(self.scan_interval_ms),
            silence_timeout: Duration::from_millis(self.silence_timeout_ms),
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    pub fn mirror_poll(&self) -> Duration {
        Duration::from_millis(self.mirror_poll_ms)
    }
}

/// Settings of the `prompt-controller` server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub bind_addr: String,
    /// Only the first template is used.
    pub prompt_templates: Vec<String>,
    pub wildcard_dir: PathBuf,
    pub recursion_depth: usize,
    pub message_send_delay_ms: u64,
    pub max_concurrent_prompts: usize,
    pub stop_after: usize,
    pub enable_stop_after: bool,
    pub log_destination: LogDestination,
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            prompt_templates: vec!["a [STYLE] [TYPE] character".to_string()],
            wildcard_dir: PathBuf::from("wildcards"),
            recursion_depth: 5,
            message_send_delay_ms: 5000,
            max_concurrent_prompts: 3,
            stop_after: 20,
            enable_stop_after: true,
            log_destination: LogDestination::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::BindAddr(self.bind_addr.clone()))?;
        self.template()?;
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level)
    }

    pub fn template(&self) -> Result<&str, ConfigError> {
        self.prompt_templates
            .first()
            .map(String::as_str)
            .ok_or(ConfigError::NoTemplate)
    }

    pub fn limits(&self) -> DispatchLimits {
        DispatchLimits {
            max_concurrent: self.max_concurrent_prompts,
            stop_after: self.enable_stop_after.then_some(self.stop_after),
        }
    }

    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        Ok(ControllerSettings {
            template: self.template()?.to_string(),
            recursion_depth: self.recursion_depth,
            send_delay: Duration::from_millis(self.message_send_delay_ms),
            limits: self.limits(),
            ..ControllerSettings::default()
        })
    }
}

pub fn load_bridge_config(path: &Path) -> Result<Loaded<BridgeConfig>, ConfigError> {
    let loaded: Loaded<BridgeConfig> = load(path)?;
    loaded.config.validate()?;
    Ok(loaded)
}

pub fn load_controller_config(path: &Path) -> Result<Loaded<ControllerConfig>, ConfigError> {
    let loaded: Loaded<ControllerConfig> = load(path)?;
    loaded.config.validate()?;
    Ok(loaded)
}

/// Config path from the first command-line argument, else `default`.
pub fn path_from_args(default: &str) -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn load<T: DeserializeOwned + Default>(path: &Path) -> Result<Loaded<T>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(Loaded {
                config: T::default(),
                source: ConfigSource::Defaults(path.to_path_buf()),
            });
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Loaded {
        config,
        source: ConfigSource::File(path.to_path_buf()),
    })
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Endpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(invalid(format!("scheme {other:?} is not ws or wss"))),
    }
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroDuration(field))
    } else {
        Ok(())
    }
}

fn parse_level(name: &str) -> Result<LevelFilter, ConfigError> {
    engine_logging::parse_level(name).ok_or_else(|| ConfigError::LogLevel(name.to_string()))
}
