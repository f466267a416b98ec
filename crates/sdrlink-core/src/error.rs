//! Error types for sdrlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Service-layer failures (connect, login,
//! audio streaming) and store failures are all captured here.

/// The error type for all sdrlink operations.
///
/// Variants cover the failure modes encountered while orchestrating a
/// radio connection: failed protocol handshakes, relay/login problems,
/// audio stream refusals, and persistence errors. Every variant is
/// user-presentable; the orchestrator converts each into exactly one
/// alert rather than propagating it further.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The protocol handshake with the selected radio failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// The Smartlink relay channel could not be started or maintained.
    #[error("smartlink relay error: {0}")]
    Relay(String),

    /// A Smartlink credential exchange was rejected.
    #[error("smartlink login failed for {user}")]
    LoginFailed {
        /// The identity that failed to authenticate.
        user: String,
    },

    /// The radio refused or could not provide an audio stream.
    #[error("audio stream unavailable: {0}")]
    StreamUnavailable(String),

    /// The requested operation is not supported by this deployment.
    ///
    /// TX audio streaming is the canonical case: the gating contract is
    /// honored but the underlying service call may be a placeholder.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An operation required an active connection and none exists.
    #[error("not connected")]
    NotConnected,

    /// The default-selection store could not be read or written.
    #[error("default store error: {0}")]
    Store(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
