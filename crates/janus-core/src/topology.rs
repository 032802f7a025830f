//! # Listener Topology
//!
//! Decides how many listeners to open and what each one serves.
//!
//! ```text
//! effective grpc port  effective rest port   topology
//! ───────────────────  ───────────────────   ─────────────────────────
//!        0                    0              ConfigError::NoPortsEnabled
//!        P                    0              GrpcOnly  { P }
//!        0                    Q              RestOnly  { Q }
//!        P                    P              SharedPort { P }
//!        P                    Q              DualPort  { P, Q }
//! ```
//!
//! The effective port of a disabled protocol is 0, so a disable flag wins
//! over port equality: `grpc=rest=8080` with gRPC disabled is `RestOnly`.

use std::fmt;

use crate::config::ServiceEndpointConfig;
use crate::error::ConfigError;

/// Wire protocol served by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Grpc,
    Rest,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Grpc => write!(f, "grpc"),
            Protocol::Rest => write!(f, "rest"),
        }
    }
}

/// Listener layout derived from a [`ServiceEndpointConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenTopology {
    /// Only gRPC is served.
    GrpcOnly { port: u16 },
    /// Only REST is served.
    RestOnly { port: u16 },
    /// Both protocols share one listener, split per request.
    SharedPort { port: u16 },
    /// Each protocol gets its own listener.
    DualPort { grpc_port: u16, rest_port: u16 },
}

impl ListenTopology {
    /// Resolves the topology. Pure; opens nothing.
    pub fn resolve(config: &ServiceEndpointConfig) -> Result<Self, ConfigError> {
        Self::from_ports(config.effective_grpc_port(), config.effective_rest_port())
    }

    /// Resolves from already-effective ports (0 = disabled).
    pub fn from_ports(grpc_port: u16, rest_port: u16) -> Result<Self, ConfigError> {
        match (grpc_port, rest_port) {
            (0, 0) => Err(ConfigError::NoPortsEnabled),
            (port, 0) => Ok(Self::GrpcOnly { port }),
            (0, port) => Ok(Self::RestOnly { port }),
            (grpc, rest) if grpc == rest => Ok(Self::SharedPort { port: grpc }),
            (grpc_port, rest_port) => Ok(Self::DualPort {
                grpc_port,
                rest_port,
            }),
        }
    }

    pub fn serves(&self, protocol: Protocol) -> bool {
        match (self, protocol) {
            (Self::GrpcOnly { .. }, Protocol::Rest) => false,
            (Self::RestOnly { .. }, Protocol::Grpc) => false,
            _ => true,
        }
    }

    /// Port a protocol is reachable on, if served.
    pub fn port_for(&self, protocol: Protocol) -> Option<u16> {
        match (*self, protocol) {
            (Self::GrpcOnly { port }, Protocol::Grpc) => Some(port),
            (Self::RestOnly { port }, Protocol::Rest) => Some(port),
            (Self::SharedPort { port }, _) => Some(port),
            (Self::DualPort { grpc_port, .. }, Protocol::Grpc) => Some(grpc_port),
            (Self::DualPort { rest_port, .. }, Protocol::Rest) => Some(rest_port),
            _ => None,
        }
    }

    /// Number of physical listeners this topology needs.
    pub fn listener_count(&self) -> usize {
        match self {
            Self::DualPort { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ListenTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrpcOnly { port } => write!(f, "grpc-only(:{port})"),
            Self::RestOnly { port } => write!(f, "rest-only(:{port})"),
            Self::SharedPort { port } => write!(f, "shared-port(:{port})"),
            Self::DualPort {
                grpc_port,
                rest_port,
            } => write!(f, "dual-port(grpc :{grpc_port}, rest :{rest_port})"),
        }
    }
}
