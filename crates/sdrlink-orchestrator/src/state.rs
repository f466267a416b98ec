//! Orchestrator state -- the single source of truth for the connection
//! lifecycle.
//!
//! All mutation happens inside the serialized action loop; the rest of
//! the application observes the state through a [`tokio::sync::watch`]
//! channel carrying clones of [`State`].

use sdrlink_core::{
    Alert, AudioHandle, ConnectionStatus, DefaultSelection, Modal, SessionKind,
};

/// User preferences and session configuration.
///
/// These correspond to the toggles an operator flips in the toolbar:
/// discovery modes, audio preferences, default usage, and the login
/// policy. They live alongside the lifecycle state so every decision the
/// orchestrator makes reads from one place.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Whether this client takes an exclusive or shared session.
    pub session_kind: SessionKind,
    /// Program name reported to the radio during the handshake.
    pub program_name: String,
    /// Local-network discovery enabled.
    pub local_enabled: bool,
    /// Smartlink relay discovery enabled.
    pub relay_enabled: bool,
    /// Last known successful Smartlink identity.
    pub relay_user: String,
    /// Whether relay mode must be preceded by a login.
    pub login_required: bool,
    /// Auto-connect to the stored default on a connect intent.
    pub use_default: bool,
    /// Receive-audio preference; applied whenever the status becomes
    /// `Connected`.
    pub rx_audio_enabled: bool,
    /// Transmit-audio preference; same gating as RX.
    pub tx_audio_enabled: bool,
    /// Raise an alert whenever a warning or error is logged.
    pub alert_on_error: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            session_kind: SessionKind::Exclusive,
            program_name: "sdrlink".to_string(),
            local_enabled: false,
            relay_enabled: false,
            relay_user: String::new(),
            login_required: false,
            use_default: false,
            rx_audio_enabled: false,
            tx_audio_enabled: false,
            alert_on_error: false,
        }
    }
}

/// The orchestrator's complete state.
#[derive(Debug, Clone)]
pub struct State {
    /// User preferences and session configuration.
    pub settings: Settings,
    /// Connection lifecycle state. Transitions only through the
    /// orchestrator's documented cycle.
    pub status: ConnectionStatus,
    /// The single modal surface currently open, if any.
    pub modal: Modal,
    /// Station chosen at selection time (shared sessions); the name
    /// client-change events are folded against.
    pub station: Option<String>,
    /// Station actually bound at the protocol level, if any.
    pub bound_station: Option<String>,
    /// Owned RX audio stream, present only while connected.
    pub rx_stream: Option<AudioHandle>,
    /// Owned TX audio stream, present only while connected.
    pub tx_stream: Option<AudioHandle>,
    /// The alert currently on display; a new alert replaces it.
    pub alert: Option<Alert>,
    /// Cached default for exclusive sessions (write-through to the store).
    pub exclusive_default: Option<DefaultSelection>,
    /// Cached default for shared sessions (write-through to the store).
    pub shared_default: Option<DefaultSelection>,
}

impl State {
    /// Build the initial state from settings and the persisted defaults.
    pub fn new(
        settings: Settings,
        exclusive_default: Option<DefaultSelection>,
        shared_default: Option<DefaultSelection>,
    ) -> Self {
        State {
            settings,
            status: ConnectionStatus::Disconnected,
            modal: Modal::None,
            station: None,
            bound_station: None,
            rx_stream: None,
            tx_stream: None,
            alert: None,
            exclusive_default,
            shared_default,
        }
    }

    /// The cached default for a slot.
    pub fn default_for(&self, kind: SessionKind) -> Option<DefaultSelection> {
        match kind {
            SessionKind::Exclusive => self.exclusive_default.clone(),
            SessionKind::Shared => self.shared_default.clone(),
        }
    }

    /// Replace the cached default for a slot.
    pub fn set_default_for(&mut self, kind: SessionKind, value: Option<DefaultSelection>) {
        match kind {
            SessionKind::Exclusive => self.exclusive_default = value,
            SessionKind::Shared => self.shared_default = value,
        }
    }
}
