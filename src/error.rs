//! Error types for the simulation core and the remote bridge.

use thiserror::Error;

/// Errors returned by the engine API.
///
/// None of these are fatal: every failed call leaves the engine in the state
/// it was in before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A body or spring with this id is already registered.
    #[error("id '{0}' is already registered")]
    DuplicateId(String),

    /// No body or spring with this id exists.
    #[error("no body or spring with id '{0}'")]
    NotFound(String),

    /// A spring endpoint names a body that does not exist.
    #[error("spring '{spring}' references unknown body '{body}'")]
    InvalidReference {
        /// Spring being inserted
        spring: String,
        /// Missing endpoint
        body: String,
    },

    /// Body attributes violate the data model.
    #[error("invalid body '{id}': {reason}")]
    InvalidBody {
        /// Offending body id
        id: String,
        /// What was wrong
        reason: String,
    },

    /// Spring parameters violate the data model.
    #[error("invalid spring '{id}': {reason}")]
    InvalidSpring {
        /// Offending spring id
        id: String,
        /// What was wrong
        reason: String,
    },

    /// Config update rejected; the previous config is kept.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Preset name not present in the catalog.
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    /// Scene template name not present in the catalog.
    #[error("unknown scene '{0}'")]
    UnknownScene(String),

    /// Velocity change or impulse issued against a pinned body.
    #[error("body '{0}' is fixed; its velocity cannot be changed")]
    BodyFixed(String),

    /// A body reached a non-finite state and was restored.
    #[error("body '{0}' became non-finite and was restored")]
    NumericInstability(String),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Errors raised by the remote physics bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The transport failed to connect, send or receive.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Operation requires an open connection.
    #[error("bridge is not connected")]
    Disconnected,

    /// The reconnect policy gave up.
    #[error("reconnect attempts exhausted after {0} tries")]
    RetriesExhausted(u32),
}
