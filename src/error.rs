//! Crate-local error taxonomy.
//!
//! One flat enum per external collaborator, matching the shape of
//! `security::config::ConfigError` in the teacher crate: plain variants,
//! `Display` via `thiserror`, `From` conversions only at the boundary where a
//! lower-level error is actually wrapped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport send failed: {0}")]
    SendFailed(String),
    #[error("transport channel error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message truncated")]
    Truncated,
    #[error("unexpected format: {0}")]
    BadFormat(String),
    #[error("codec error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum KvStoreError {
    #[error("key-value store I/O error: {0}")]
    Io(String),
    #[error("key-value store returned malformed JSON for key {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("RAN_LIST is empty or unset; no RAN nodes to subscribe to")]
    EmptyRanList,
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
