//! Actions -- every inbound signal the orchestrator can process.
//!
//! Four categories of signal exist (UI intents, long-lived subscription
//! events, one-shot command outcomes, and internal control), all merged
//! into one ordered queue and applied one at a time. No two transitions
//! ever run concurrently.

use tokio::sync::oneshot;

use sdrlink_core::{ClientEvent, DiscoveryEvent, LogAlert, Pickable, Result, TestResult};

/// One inbound signal for the orchestrator's serialized action loop.
#[derive(Debug)]
pub enum Action {
    // -- UI intents --------------------------------------------------------
    /// Connect when disconnected, disconnect when connected. Ignored
    /// while a prior request is in process.
    ConnectToggle,
    /// Enable or disable local-network discovery.
    SetLocalEnabled(bool),
    /// Enable or disable Smartlink relay discovery.
    SetRelayEnabled(bool),
    /// Set the "login required" flag.
    SetLoginRequired(bool),
    /// Set the "auto-connect to the stored default" flag.
    SetUseDefault(bool),
    /// Set the receive-audio preference.
    SetRxAudioEnabled(bool),
    /// Set the transmit-audio preference.
    SetTxAudioEnabled(bool),
    /// The displayed alert was acknowledged.
    AlertDismissed,

    // -- Picker intents ----------------------------------------------------
    /// A target was chosen in the device picker.
    PickerConnect(Pickable),
    /// The device picker was dismissed without a choice.
    PickerCancel,
    /// "Use as default" was toggled on a picker entry.
    PickerDefaultToggle(Pickable),
    /// A Smartlink reachability test was requested for a picker entry.
    PickerTest(Pickable),

    // -- Conflict-chooser intents ------------------------------------------
    /// The user chose an existing session (by handle) to take over.
    ConflictResolve(u32),
    /// The conflict chooser was dismissed; the whole connect intent is
    /// abandoned.
    ConflictCancel,

    // -- Login intents -----------------------------------------------------
    /// Credentials were submitted from the login prompt.
    LoginSubmit {
        /// Identity to authenticate as.
        user: String,
        /// Credential secret.
        password: String,
    },
    /// The login prompt was dismissed without logging in.
    LoginCancel,

    // -- One-shot command outcomes -----------------------------------------
    /// A connect attempt finished.
    ConnectOutcome(Result<()>),
    /// A disconnect finished.
    DisconnectDone,
    /// A login attempt finished.
    LoginOutcome {
        /// Whether the credential exchange succeeded.
        success: bool,
        /// The identity that was attempted.
        user: String,
    },
    /// An RX audio stream request finished.
    RxStreamOutcome(Result<u32>),
    /// A TX audio stream request finished.
    TxStreamOutcome(Result<u32>),
    /// A discovery-mode reconfiguration finished.
    ModeOutcome {
        /// Whether the relay channel is in the requested state.
        relay_ok: bool,
    },

    // -- Subscription events -----------------------------------------------
    /// A radio appeared, changed, or disappeared.
    Discovery(DiscoveryEvent),
    /// A remote client changed on a known radio.
    Client(ClientEvent),
    /// A Smartlink reachability test result arrived.
    Test(TestResult),
    /// A warning or error was logged somewhere in the process.
    Log(LogAlert),

    // -- Internal ----------------------------------------------------------
    /// Open the login prompt (mode controller remediation path).
    OpenLogin,
    /// Acknowledge once every action queued before this one has been
    /// applied. Used by tests and by callers that need a sync point.
    Flush(oneshot::Sender<()>),
    /// Stop the action loop.
    Shutdown,
}
