//! Demo configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults, then `API_SETTING` (a settings string) is applied on top.
//!
//! ## Environment
//! ```text
//! JANUS_HOST              bind host                  (default 0.0.0.0)
//! JANUS_GRPC_PORT         gRPC port, 0 = off         (default 8080)
//! JANUS_REST_PORT         REST port, 0 = off         (default 8080)
//! JANUS_TLS_CERT          certificate chain (PEM)
//! JANUS_TLS_KEY           private key (PEM)
//! JANUS_TLS_CA            client CA (PEM), enables mutual TLS
//! JANUS_LISTEN_LIMIT      max concurrent connections
//! JANUS_DISABLE_GRPC      true / false
//! JANUS_DISABLE_REST      true / false
//! JANUS_GRACEFUL_TIMEOUT  shutdown grace period      (default 5s)
//! JANUS_INVOKE_TIMEOUT    per-executor deadline      (default 30s, 0 = off)
//! API_SETTING             "key=value; ..." overrides
//! ```

use std::env;
use std::time::Duration;

use janus_core::config::{parse_duration, ServiceEndpointConfig};
use janus_core::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Variable holding a settings string applied after everything else.
pub const API_SETTING_VAR: &str = "API_SETTING";

const INVOKE_TIMEOUT_VAR: &str = "JANUS_INVOKE_TIMEOUT";

/// Environment variable → settings key.
const ENDPOINT_VARS: &[(&str, &str)] = &[
    ("JANUS_HOST", "host"),
    ("JANUS_GRPC_PORT", "grpc-port"),
    ("JANUS_REST_PORT", "rest-port"),
    ("JANUS_TLS_CERT", "tls-certificate"),
    ("JANUS_TLS_KEY", "tls-key"),
    ("JANUS_TLS_CA", "tls-ca"),
    ("JANUS_LISTEN_LIMIT", "listen-limit"),
    ("JANUS_DISABLE_GRPC", "disable-grpc"),
    ("JANUS_DISABLE_REST", "disable-rest"),
    ("JANUS_GRACEFUL_TIMEOUT", "graceful-timeout"),
];

/// Demo configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Listener configuration handed to the host.
    pub endpoint: ServiceEndpointConfig,

    /// Deadline for each executor invocation.
    pub invoke_timeout: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            endpoint: ServiceEndpointConfig::new(DEFAULT_HOST).with_shared_port(DEFAULT_PORT),
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
        }
    }
}

impl DemoConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for &(var, key) in ENDPOINT_VARS {
            let Some(value) = lookup(var) else { continue };
            if value.contains(';') {
                return Err(ConfigError::invalid(var, value, "must not contain ';'"));
            }
            config.endpoint = config
                .endpoint
                .apply_settings(&format!("{key}={value}"))
                .map_err(|e| rename_key(e, var))?;
        }

        if let Some(value) = lookup(INVOKE_TIMEOUT_VAR) {
            config.invoke_timeout = parse_duration(INVOKE_TIMEOUT_VAR, value.trim())?;
        }

        if let Some(settings) = lookup(API_SETTING_VAR) {
            config.endpoint = config.endpoint.apply_settings(&settings)?;
        }

        Ok(config)
    }
}

/// Reports parse failures under the environment variable's name.
fn rename_key(error: ConfigError, var: &str) -> ConfigError {
    match error {
        ConfigError::InvalidValue { value, reason, .. } => ConfigError::InvalidValue {
            key: var.to_string(),
            value,
            reason,
        },
        other => other,
    }
}
