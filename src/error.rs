//! Error types for the relay hook.
//!
//! Only [`InitError`] ever reaches the host (as a load failure). Write
//! failures are absorbed by the pipeline, and malformed relay options are
//! not errors at all.

use std::path::PathBuf;

use thiserror::Error;

/// The audit sink could not be brought up.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to open audit file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An audit record could not be appended.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("audit write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to lock audit file")]
    Lock,

    #[error("audit sink is closed")]
    Closed,
}

/// Invalid hook configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("no override rules configured")]
    NoRules,

    #[error("match token must not be empty")]
    EmptyToken,
}

/// Errors from decoding a raw DHCP datagram.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("invalid DHCP magic cookie")]
    InvalidMagicCookie,

    #[error("invalid option at offset {offset}: {message}")]
    InvalidOption { offset: usize, message: String },
}

/// Errors from passive packet capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("failed to create capture channel: {0}")]
    ChannelCreation(String),

    #[error("insufficient permissions for packet capture (try running as root)")]
    InsufficientPermissions,
}

/// Top-level error for the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
