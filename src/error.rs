//! Error types
//!
//! Session errors are contract violations: the caller did something the
//! orchestrator forbids and the session must not continue as if nothing
//! happened. Settings errors come from loading or validating tuning data.

use thiserror::Error;

use crate::sim::PlayerHandle;

/// Fatal session contract violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("player {existing:?} is already registered; unregister it before registering {attempted:?}")]
    PlayerAlreadyRegistered {
        existing: PlayerHandle,
        attempted: PlayerHandle,
    },
    #[error("player {attempted:?} does not match the registered player {registered:?}")]
    PlayerMismatch {
        registered: Option<PlayerHandle>,
        attempted: PlayerHandle,
    },
}

/// Errors raised while loading or validating [`crate::GameSettings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("setting `{name}` must be {requirement} (got {value})")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
        value: f32,
    },
}
