//! Streaming hosts and the security universe they belong to.
//!
//! # What is a universe? (for beginners)
//!
//! Every streaming host runs against one backend environment, called its
//! *universe*: the public production network, a beta network, or one of the
//! internal/dev environments.  Each universe publishes its own RSA public key,
//! and a client authorizing itself with a host must encrypt its escrow ticket
//! with the key of the host's universe.  Hosts advertise the universe as a
//! small integer, so the client has to cope with values it does not know.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Security universe a host belongs to.
///
/// Values outside the known set are preserved as [`Universe::Other`] so that
/// a host advertising an unexpected universe can still be targeted; key
/// lookup for such a host fails and no request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Universe {
    Public,
    Beta,
    Internal,
    Dev,
    Other(i32),
}

impl Universe {
    /// Returns the wire value of this universe.
    pub fn as_i32(self) -> i32 {
        match self {
            Universe::Public => 1,
            Universe::Beta => 2,
            Universe::Internal => 3,
            Universe::Dev => 4,
            Universe::Other(raw) => raw,
        }
    }

    /// Returns `true` for the four universes with a published key.
    pub fn is_known(self) -> bool {
        !matches!(self, Universe::Other(_))
    }
}

impl From<i32> for Universe {
    fn from(value: i32) -> Self {
        match value {
            1 => Universe::Public,
            2 => Universe::Beta,
            3 => Universe::Internal,
            4 => Universe::Dev,
            other => Universe::Other(other),
        }
    }
}

impl From<Universe> for i32 {
    fn from(value: Universe) -> Self {
        value.as_i32()
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Universe::Public => f.write_str("public"),
            Universe::Beta => f.write_str("beta"),
            Universe::Internal => f.write_str("internal"),
            Universe::Dev => f.write_str("dev"),
            Universe::Other(raw) => write!(f, "universe({raw})"),
        }
    }
}

/// Error returned when a universe name cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised universe {0:?}: expected public, beta, internal, dev, or an integer")]
pub struct ParseUniverseError(String);

impl FromStr for Universe {
    type Err = ParseUniverseError;

    /// Accepts the lowercase universe names or a raw integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Universe::Public),
            "beta" => Ok(Universe::Beta),
            "internal" => Ok(Universe::Internal),
            "dev" => Ok(Universe::Dev),
            other => other
                .parse::<i32>()
                .map(Universe::from)
                .map_err(|_| ParseUniverseError(s.to_string())),
        }
    }
}

/// The host an authorization attempt is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    /// Address the host listens on for broadcast-protocol datagrams.
    pub address: SocketAddr,
    /// Universe the host is signed into.
    pub universe: Universe,
}

impl HostInfo {
    pub fn new(address: SocketAddr, universe: Universe) -> Self {
        Self { address, universe }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
