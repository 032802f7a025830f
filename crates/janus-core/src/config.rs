//! # Endpoint Configuration
//!
//! Immutable description of how a service wants to be exposed.
//!
//! ## Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Configuration Sources                              │
//! │                                                                         │
//! │  1. Defaults            ServiceEndpointConfig::default()                │
//! │  2. Builder methods     .with_ports(9000, 8080).with_tls(cert, key)     │
//! │  3. Settings string     "grpc-port=9000; rest-port=8080; host=0.0.0.0"  │
//! │                         (later sources override earlier ones)           │
//! │                                                                         │
//! │  The host receives the result by value; nothing reads the process      │
//! │  environment after startup.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settings String Format
//! ```text
//! disable-grpc=true; rest-port=8081; tls-certificate=/etc/tls/cert.pem;
//! ```
//! Keys: `host`, `port`, `grpc-port`, `rest-port`, `disable-grpc`,
//! `disable-rest`, `tls-certificate`, `tls-key`, `tls-ca`, `listen-limit`,
//! `keep-alive`, `read-timeout`, `write-timeout`, `idle-timeout`
//! (alias `cleanup-timeout`), `graceful-timeout`, `max-header-size`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::topology::ListenTopology;

/// Default bind host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default TCP / HTTP/2 keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(3 * 60);

/// Default time allowed to read request headers.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-request deadline on the write side.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default idle timeout (keep-alive ping acknowledgement window).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default grace period for draining in-flight requests on shutdown.
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum request header size (1 MiB).
pub const DEFAULT_MAX_HEADER_SIZE: usize = 1 << 20;

/// Declared listener configuration for one service.
///
/// A port of `0` disables that protocol. The disable flags are independent:
/// turning one protocol off never changes the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpointConfig {
    pub host: String,
    pub grpc_port: u16,
    pub rest_port: u16,
    pub disable_grpc: bool,
    pub disable_rest: bool,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub tls_ca_path: Option<PathBuf>,
    /// Maximum number of concurrently served connections.
    pub listen_limit: Option<usize>,
    pub keep_alive: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub graceful_timeout: Duration,
    pub max_header_size: usize,
}

impl Default for ServiceEndpointConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            grpc_port: 0,
            rest_port: 0,
            disable_grpc: false,
            disable_rest: false,
            tls_cert_path: None,
            tls_key_path: None,
            tls_ca_path: None,
            listen_limit: None,
            keep_alive: DEFAULT_KEEP_ALIVE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

impl ServiceEndpointConfig {
    /// Creates a config for `host` with both protocols disabled.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, grpc_port: u16, rest_port: u16) -> Self {
        self.grpc_port = grpc_port;
        self.rest_port = rest_port;
        self
    }

    /// Serves both protocols from one port.
    pub fn with_shared_port(self, port: u16) -> Self {
        self.with_ports(port, port)
    }

    pub fn with_tls(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.tls_cert_path = Some(cert_path.into());
        self.tls_key_path = Some(key_path.into());
        self
    }

    /// Requires client certificates signed by this CA.
    pub fn with_client_ca(mut self, ca_path: impl Into<PathBuf>) -> Self {
        self.tls_ca_path = Some(ca_path.into());
        self
    }

    pub fn with_graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    pub fn with_listen_limit(mut self, limit: usize) -> Self {
        self.listen_limit = Some(limit);
        self
    }

    pub fn disable_grpc(mut self) -> Self {
        self.disable_grpc = true;
        self
    }

    pub fn disable_rest(mut self) -> Self {
        self.disable_rest = true;
        self
    }

    /// gRPC port after applying the disable flag (0 = not served).
    pub fn effective_grpc_port(&self) -> u16 {
        if self.disable_grpc {
            0
        } else {
            self.grpc_port
        }
    }

    /// REST port after applying the disable flag (0 = not served).
    pub fn effective_rest_port(&self) -> u16 {
        if self.disable_rest {
            0
        } else {
            self.rest_port
        }
    }

    /// Certificate and key paths, if TLS is configured.
    ///
    /// TLS is on only when both paths are present and non-empty.
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        match (non_empty(&self.tls_cert_path), non_empty(&self.tls_key_path)) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }

    pub fn client_ca_path(&self) -> Option<&Path> {
        non_empty(&self.tls_ca_path)
    }

    pub fn has_tls(&self) -> bool {
        self.tls_paths().is_some()
    }

    /// `host:port`, suitable for `TcpListener::bind`.
    pub fn bind_address(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }

    /// Checks every startup invariant and resolves the topology.
    ///
    /// ## Errors
    /// - [`ConfigError::NoPortsEnabled`] when nothing would be served
    /// - [`ConfigError::IncompleteTls`] when only one of cert/key is set
    /// - [`ConfigError::CaWithoutCertificate`] when a CA has no server cert
    pub fn validate(&self) -> Result<ListenTopology, ConfigError> {
        match (non_empty(&self.tls_cert_path), non_empty(&self.tls_key_path)) {
            (Some(_), None) => return Err(ConfigError::IncompleteTls { missing: "tls-key" }),
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteTls {
                    missing: "tls-certificate",
                })
            }
            _ => {}
        }
        if self.client_ca_path().is_some() && !self.has_tls() {
            return Err(ConfigError::CaWithoutCertificate);
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", &self.host, "must not be empty"));
        }
        ListenTopology::resolve(self)
    }

    // =========================================================================
    // Settings String
    // =========================================================================

    /// Parses a settings string on top of the defaults.
    ///
    /// ## Example
    /// ```rust
    /// use janus_core::config::ServiceEndpointConfig;
    ///
    /// let config = ServiceEndpointConfig::from_settings("port=8080; disable-grpc=true;").unwrap();
    /// assert_eq!(config.rest_port, 8080);
    /// assert_eq!(config.effective_grpc_port(), 0);
    /// ```
    pub fn from_settings(settings: &str) -> Result<Self, ConfigError> {
        Self::default().apply_settings(settings)
    }

    /// Applies a settings string on top of `self`.
    ///
    /// Empty values keep the current value, unknown keys are ignored, and
    /// explicit `grpc-port` / `rest-port` win over `port` in any order.
    pub fn apply_settings(mut self, settings: &str) -> Result<Self, ConfigError> {
        let mut shared_port = None;
        let mut grpc_port = None;
        let mut rest_port = None;

        for segment in settings.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedSetting(segment.to_string()))?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                "host" => self.host = value.to_string(),
                "port" => shared_port = Some(parse_port(&key, value)?),
                "grpc-port" => grpc_port = Some(parse_port(&key, value)?),
                "rest-port" => rest_port = Some(parse_port(&key, value)?),
                "disable-grpc" => self.disable_grpc = parse_bool(&key, value)?,
                "disable-rest" => self.disable_rest = parse_bool(&key, value)?,
                "tls-certificate" => self.tls_cert_path = Some(PathBuf::from(value)),
                "tls-key" => self.tls_key_path = Some(PathBuf::from(value)),
                "tls-ca" => self.tls_ca_path = Some(PathBuf::from(value)),
                "listen-limit" => {
                    let limit = parse_number::<usize>(&key, value)?;
                    self.listen_limit = (limit > 0).then_some(limit);
                }
                "keep-alive" => self.keep_alive = parse_duration(&key, value)?,
                "read-timeout" => self.read_timeout = parse_duration(&key, value)?,
                "write-timeout" => self.write_timeout = parse_duration(&key, value)?,
                "idle-timeout" | "cleanup-timeout" => {
                    self.idle_timeout = parse_duration(&key, value)?
                }
                "graceful-timeout" => self.graceful_timeout = parse_duration(&key, value)?,
                "max-header-size" => self.max_header_size = parse_number(&key, value)?,
                _ => {}
            }
        }

        if let Some(port) = shared_port {
            self.grpc_port = port;
            self.rest_port = port;
        }
        if let Some(port) = grpc_port {
            self.grpc_port = port;
        }
        if let Some(port) = rest_port {
            self.rest_port = port;
        }
        Ok(self)
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

/// Ports of 0 or below mean "disabled".
fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    let port: i64 = parse_number(key, value)?;
    if port <= 0 {
        return Ok(0);
    }
    u16::try_from(port).map_err(|_| ConfigError::invalid(key, value, "port must be at most 65535"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected a boolean")),
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, value, e))
}

/// Accepts `humantime` strings (`30s`, `3m`, `1h 30m`) and bare seconds.
pub fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| ConfigError::invalid(key, value, e))
}

// =============================================================================
// Tests
// =============================================================================
