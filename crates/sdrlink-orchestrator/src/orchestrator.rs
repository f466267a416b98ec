//! The Connection Orchestrator -- one serialized action loop that owns
//! the connection lifecycle.
//!
//! Concurrent inbound signals (UI intents, discovery events, client
//! events, test results, log alerts, and one-shot command outcomes) are
//! merged into a single [`mpsc`] queue and applied one at a time, so no
//! two transitions ever run concurrently. Service calls that can block
//! (connect, disconnect, login, audio stream requests) are spawned as
//! independent tasks that report exactly one completion action back into
//! the queue; a slow connect attempt never delays handling of an
//! unrelated discovery event.
//!
//! There is no cancel-in-flight: a new connect intent while a prior one
//! is outstanding is rejected by the state machine (`InProcess` has no
//! connect edge), not by task cancellation.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use sdrlink_core::{
    Alert, AlertKind, AudioHandle, AudioService, ClientAction, ConnectionService,
    ConnectionStatus, DefaultSelection, DefaultStore, DiscoveryGateway, LogAlert, LogSeverity,
    LoginRequest, LoginService, Modal, Pickable, SessionKind,
};

use crate::action::Action;
use crate::arbitration::{self, Disposition};
use crate::state::{Settings, State};

/// Advisory alert raised when no discovery mode is enabled.
const NO_DISCOVERY_MODE: &str =
    "Select a discovery mode (Local or Smartlink) -- no radios can be found until one is enabled";

/// Heading shown on the Smartlink login prompt.
const LOGIN_HEADING: &str = "Smartlink Login Required";

/// The external collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Services {
    /// Radio discovery (LAN + Smartlink) and its event streams.
    pub gateway: Arc<dyn DiscoveryGateway>,
    /// Radio protocol handshake, teardown, and session binding.
    pub connection: Arc<dyn ConnectionService>,
    /// Smartlink credential exchange.
    pub login: Arc<dyn LoginService>,
    /// Audio stream acquisition and release.
    pub audio: Arc<dyn AudioService>,
    /// Persistence for the two preferred-target slots.
    pub store: Arc<dyn DefaultStore>,
}

/// Handle to a running orchestrator.
///
/// Dropping the handle does not stop the loop; call
/// [`shutdown`](OrchestratorHandle::shutdown) for an orderly stop.
pub struct OrchestratorHandle {
    actions: mpsc::UnboundedSender<Action>,
    snapshot: watch::Receiver<State>,
    task: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Queue an action for the serialized loop.
    pub fn send(&self, action: Action) {
        let _ = self.actions.send(action);
    }

    /// Connect when disconnected, disconnect when connected.
    pub fn connect_toggle(&self) {
        self.send(Action::ConnectToggle);
    }

    /// Enable or disable local-network discovery.
    pub fn set_local_enabled(&self, enabled: bool) {
        self.send(Action::SetLocalEnabled(enabled));
    }

    /// Enable or disable Smartlink relay discovery.
    pub fn set_relay_enabled(&self, enabled: bool) {
        self.send(Action::SetRelayEnabled(enabled));
    }

    /// Set the "login required" flag.
    pub fn set_login_required(&self, required: bool) {
        self.send(Action::SetLoginRequired(required));
    }

    /// Set the "auto-connect to the stored default" flag.
    pub fn set_use_default(&self, use_default: bool) {
        self.send(Action::SetUseDefault(use_default));
    }

    /// Set the receive-audio preference.
    pub fn set_rx_audio_enabled(&self, enabled: bool) {
        self.send(Action::SetRxAudioEnabled(enabled));
    }

    /// Set the transmit-audio preference.
    pub fn set_tx_audio_enabled(&self, enabled: bool) {
        self.send(Action::SetTxAudioEnabled(enabled));
    }

    /// Subscribe to state snapshots. A new snapshot is published after
    /// every applied action.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.snapshot.clone()
    }

    /// The most recently published state.
    pub fn state(&self) -> State {
        self.snapshot.borrow().clone()
    }

    /// Wait until every action queued before this call has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.actions.send(Action::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Stop the action loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.actions.send(Action::Shutdown);
        let _ = self.task.await;
    }
}

/// The orchestrator itself: state plus the services it drives.
///
/// Only the action loop touches this struct after spawn, which is what
/// serializes every transition.
pub struct Orchestrator {
    state: State,
    services: Services,
    actions: mpsc::UnboundedSender<Action>,
    snapshot: watch::Sender<State>,
}

/// Spawn an orchestrator on the current tokio runtime.
///
/// Reads the persisted defaults, subscribes to the gateway's three event
/// streams (plus the optional log-alert stream), kicks off the initial
/// discovery-mode configuration, and starts the action loop.
pub fn spawn(
    services: Services,
    settings: Settings,
    log_alerts: Option<broadcast::Receiver<LogAlert>>,
) -> OrchestratorHandle {
    let (actions_tx, mut actions_rx) = mpsc::unbounded_channel();

    spawn_forwarder(
        services.gateway.subscribe_discovery(),
        actions_tx.clone(),
        Action::Discovery,
    );
    spawn_forwarder(
        services.gateway.subscribe_clients(),
        actions_tx.clone(),
        Action::Client,
    );
    spawn_forwarder(
        services.gateway.subscribe_tests(),
        actions_tx.clone(),
        Action::Test,
    );
    if let Some(log_rx) = log_alerts {
        spawn_forwarder(log_rx, actions_tx.clone(), Action::Log);
    }

    let mut orchestrator = Orchestrator::new(services, settings, actions_tx.clone());
    let snapshot = orchestrator.snapshot.subscribe();
    orchestrator.start_mode_update();

    let task = tokio::spawn(async move {
        while let Some(action) = actions_rx.recv().await {
            if matches!(action, Action::Shutdown) {
                break;
            }
            orchestrator.apply(action);
            orchestrator.publish();
        }
        tracing::debug!("Orchestrator action loop exited");
    });

    OrchestratorHandle {
        actions: actions_tx,
        snapshot,
        task,
    }
}

/// Forward one infinite broadcast subscription into the action queue.
///
/// Lagged subscriptions log and continue; a closed subscription or a
/// dropped queue ends the forwarder.
fn spawn_forwarder<T: Clone + Send + 'static>(
    mut rx: broadcast::Receiver<T>,
    tx: mpsc::UnboundedSender<Action>,
    wrap: fn(T) -> Action,
) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if tx.send(wrap(event)).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event subscription lagged; continuing");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

impl Orchestrator {
    /// Build the initial state from the persisted defaults.
    fn new(services: Services, settings: Settings, actions: mpsc::UnboundedSender<Action>) -> Self {
        let exclusive_default = services.store.read(SessionKind::Exclusive);
        let shared_default = services.store.read(SessionKind::Shared);
        let mut state = State::new(settings, exclusive_default, shared_default);
        if !state.settings.local_enabled && !state.settings.relay_enabled {
            state.alert = Some(Alert::info(NO_DISCOVERY_MODE));
        }
        let (snapshot, _) = watch::channel(state.clone());
        Orchestrator {
            state,
            services,
            actions,
            snapshot,
        }
    }

    /// Publish the current state to all snapshot subscribers.
    fn publish(&self) {
        self.snapshot.send_replace(self.state.clone());
    }

    /// Apply one action. This is the entire transition function; it runs
    /// to completion before the next action is considered.
    fn apply(&mut self, action: Action) {
        match action {
            // -- UI intents ------------------------------------------------
            Action::ConnectToggle => self.connect_toggle(),
            Action::SetLocalEnabled(enabled) => {
                self.state.settings.local_enabled = enabled;
                self.start_mode_update();
            }
            Action::SetRelayEnabled(enabled) => {
                self.state.settings.relay_enabled = enabled;
                self.start_mode_update();
            }
            Action::SetLoginRequired(required) => {
                self.state.settings.login_required = required;
            }
            Action::SetUseDefault(use_default) => {
                self.state.settings.use_default = use_default;
            }
            Action::SetRxAudioEnabled(enabled) => {
                self.state.settings.rx_audio_enabled = enabled;
                if self.state.status == ConnectionStatus::Connected {
                    if enabled {
                        self.start_rx_audio();
                    } else {
                        self.stop_rx_audio();
                    }
                }
                // Not connected: the preference is recorded and applied
                // on the next transition to Connected.
            }
            Action::SetTxAudioEnabled(enabled) => {
                self.state.settings.tx_audio_enabled = enabled;
                if self.state.status == ConnectionStatus::Connected {
                    if enabled {
                        self.start_tx_audio();
                    } else {
                        self.stop_tx_audio();
                    }
                }
            }
            Action::AlertDismissed => {
                self.state.alert = None;
            }

            // -- Picker intents --------------------------------------------
            Action::PickerConnect(target) => {
                if matches!(self.state.modal, Modal::Picker { .. }) {
                    self.state.modal = Modal::None;
                    self.arbitrate(target);
                }
            }
            Action::PickerCancel => {
                if matches!(self.state.modal, Modal::Picker { .. }) {
                    self.state.modal = Modal::None;
                    self.state.station = None;
                    self.state.status = ConnectionStatus::Disconnected;
                }
            }
            Action::PickerDefaultToggle(target) => self.toggle_default(&target),
            Action::PickerTest(target) => {
                if let Modal::Picker { test_result, .. } = &mut self.state.modal {
                    *test_result = None;
                    let gateway = Arc::clone(&self.services.gateway);
                    let serial = target.radio.serial;
                    tokio::spawn(async move {
                        gateway.request_test(&serial).await;
                    });
                }
            }

            // -- Conflict-chooser intents ----------------------------------
            Action::ConflictResolve(handle) => {
                if let Modal::Conflict(conflict) = std::mem::take(&mut self.state.modal) {
                    self.start_connect(conflict.target, Some(handle));
                }
            }
            Action::ConflictCancel => {
                if matches!(self.state.modal, Modal::Conflict(_)) {
                    // Canceling a conflict cancels the whole connect intent.
                    self.state.modal = Modal::None;
                    self.state.station = None;
                    self.state.status = ConnectionStatus::Disconnected;
                }
            }

            // -- Login intents ---------------------------------------------
            Action::LoginSubmit { user, password } => {
                if matches!(self.state.modal, Modal::Login(_)) {
                    self.state.modal = Modal::None;
                    let login = Arc::clone(&self.services.login);
                    let actions = self.actions.clone();
                    tokio::spawn(async move {
                        let success = login.login(&user, &password).await;
                        let _ = actions.send(Action::LoginOutcome { success, user });
                    });
                }
            }
            Action::LoginCancel => {
                if matches!(self.state.modal, Modal::Login(_)) {
                    // The user declined; don't nag again until the mode
                    // is re-toggled.
                    self.state.modal = Modal::None;
                    self.state.settings.login_required = false;
                }
            }

            // -- One-shot command outcomes ---------------------------------
            Action::ConnectOutcome(Ok(())) => self.set_status(ConnectionStatus::Connected),
            Action::ConnectOutcome(Err(error)) => {
                tracing::warn!(error = %error, "Connect attempt failed");
                self.state.alert = Some(Alert::error(error.to_string()));
                self.set_status(ConnectionStatus::Disconnected);
            }
            Action::DisconnectDone => {
                self.state.station = None;
                self.state.bound_station = None;
                self.set_status(ConnectionStatus::Disconnected);
            }
            Action::LoginOutcome { success, user } => {
                if success {
                    // Remember the identity and stop requiring a login.
                    self.state.settings.relay_user = user;
                    self.state.settings.login_required = false;
                } else {
                    self.state.alert =
                        Some(Alert::error(format!("Smartlink login failed for {user}")));
                }
            }
            Action::RxStreamOutcome(Ok(stream_id)) => {
                if self.state.status == ConnectionStatus::Connected
                    && self.state.settings.rx_audio_enabled
                {
                    self.state.rx_stream = Some(AudioHandle { stream_id });
                    tracing::debug!(stream_id, "RX audio stream wired");
                } else {
                    // The grant arrived after a disconnect or toggle-off;
                    // release it rather than orphaning the stream.
                    self.release_stream(stream_id);
                }
            }
            Action::RxStreamOutcome(Err(error)) => {
                self.state.settings.rx_audio_enabled = false;
                self.state.alert = Some(Alert::warning(error.to_string()));
            }
            Action::TxStreamOutcome(Ok(stream_id)) => {
                if self.state.status == ConnectionStatus::Connected
                    && self.state.settings.tx_audio_enabled
                {
                    self.state.tx_stream = Some(AudioHandle { stream_id });
                    tracing::debug!(stream_id, "TX audio stream wired");
                } else {
                    self.release_stream(stream_id);
                }
            }
            Action::TxStreamOutcome(Err(error)) => {
                self.state.settings.tx_audio_enabled = false;
                self.state.alert = Some(Alert::warning(error.to_string()));
            }
            Action::ModeOutcome { relay_ok } => {
                if !relay_ok {
                    // The most common remediable cause is a missing or
                    // stale credential.
                    self.open_login();
                } else if self.state.settings.relay_enabled && self.state.settings.login_required {
                    self.open_login();
                }
            }

            // -- Subscription events ---------------------------------------
            Action::Discovery(_event) => {
                // Conflict arbitration re-queries live snapshots, so no
                // running list is kept; only an open picker needs a
                // refresh.
                if matches!(self.state.modal, Modal::Picker { .. }) {
                    self.open_picker();
                }
            }
            Action::Client(event) => self.fold_client_event(event),
            Action::Test(result) => {
                if let Modal::Picker { test_result, .. } = &mut self.state.modal {
                    *test_result = Some(result.success);
                }
            }
            Action::Log(entry) => {
                if self.state.settings.alert_on_error {
                    // A logged fault outranks any open modal. Closing the
                    // picker or the conflict chooser abandons the connect
                    // intent, so the lifecycle must leave `InProcess` too;
                    // otherwise no edge out remains.
                    match std::mem::take(&mut self.state.modal) {
                        Modal::Picker { .. } | Modal::Conflict(_) => {
                            self.state.station = None;
                            self.state.status = ConnectionStatus::Disconnected;
                        }
                        Modal::None | Modal::Login(_) => {}
                    }
                    let kind = match entry.severity {
                        LogSeverity::Warning => AlertKind::Warning,
                        LogSeverity::Error => AlertKind::Error,
                    };
                    self.state.alert = Some(Alert {
                        kind,
                        message: entry.message,
                    });
                }
            }

            // -- Internal --------------------------------------------------
            Action::OpenLogin => self.open_login(),
            Action::Flush(done) => {
                let _ = done.send(());
            }
            Action::Shutdown => {
                // Handled by the loop before apply; nothing to do here.
            }
        }
    }

    // -- Connection lifecycle ----------------------------------------------

    /// Handle a connect/disconnect intent according to the current status.
    fn connect_toggle(&mut self) {
        match self.state.status {
            ConnectionStatus::Connected => {
                // Release audio before the teardown so no stream handle
                // outlives the session.
                self.stop_rx_audio();
                self.stop_tx_audio();
                self.state.status = ConnectionStatus::InProcess;
                let connection = Arc::clone(&self.services.connection);
                let actions = self.actions.clone();
                tokio::spawn(async move {
                    connection.disconnect().await;
                    let _ = actions.send(Action::DisconnectDone);
                });
            }
            ConnectionStatus::InProcess => {
                tracing::debug!("Connect intent ignored while a request is outstanding");
            }
            ConnectionStatus::Disconnected => {
                self.state.status = ConnectionStatus::InProcess;
                let kind = self.state.settings.session_kind;
                if self.state.settings.use_default {
                    if let Some(default) = self.state.default_for(kind) {
                        if let Some(target) = self.services.gateway.find_default(&default, kind) {
                            self.arbitrate(target);
                            return;
                        }
                        // An unmatched default is a miss, not an error.
                        tracing::debug!(serial = %default.serial, "Default selection not discovered; opening picker");
                    }
                }
                self.open_picker();
            }
        }
    }

    /// Update the status and apply the audio preferences the transition
    /// implies, as one atomic step.
    fn set_status(&mut self, status: ConnectionStatus) {
        self.state.status = status;
        match status {
            ConnectionStatus::Connected => {
                if self.state.settings.rx_audio_enabled {
                    self.start_rx_audio();
                }
                if self.state.settings.tx_audio_enabled {
                    self.start_tx_audio();
                }
            }
            ConnectionStatus::Disconnected => {
                self.stop_rx_audio();
                self.stop_tx_audio();
            }
            ConnectionStatus::InProcess => {}
        }
    }

    /// Run a selected target through conflict arbitration.
    fn arbitrate(&mut self, target: Pickable) {
        self.state.station = target.station.clone();
        match arbitration::arbitrate(target, self.state.settings.session_kind) {
            Disposition::Conflict(conflict) => {
                self.state.modal = Modal::Conflict(conflict);
            }
            Disposition::Connect {
                target,
                preempt_handle,
            } => self.start_connect(target, preempt_handle),
        }
    }

    /// Spawn the connect attempt; exactly one `ConnectOutcome` follows.
    fn start_connect(&mut self, target: Pickable, preempt_handle: Option<u32>) {
        self.state.modal = Modal::None;
        let connection = Arc::clone(&self.services.connection);
        let actions = self.actions.clone();
        let kind = self.state.settings.session_kind;
        let program_name = self.state.settings.program_name.clone();
        tracing::debug!(target = %target, ?preempt_handle, "Starting connect attempt");
        tokio::spawn(async move {
            let result = connection
                .connect(&target, kind, preempt_handle, &program_name)
                .await;
            let _ = actions.send(Action::ConnectOutcome(result));
        });
    }

    // -- Picker & defaults ---------------------------------------------------

    /// Open (or refresh) the device picker from a live snapshot.
    fn open_picker(&mut self) {
        let kind = self.state.settings.session_kind;
        let pickables = match kind {
            SessionKind::Exclusive => self.services.gateway.pickable_radios(),
            SessionKind::Shared => self.services.gateway.pickable_stations(),
        };
        self.state.modal = Modal::Picker {
            pickables,
            default: self.state.default_for(kind),
            test_result: None,
        };
    }

    /// Toggle a picker entry as the slot default, write-through to the
    /// store. Two identical toggles cancel out.
    fn toggle_default(&mut self, target: &Pickable) {
        if !matches!(self.state.modal, Modal::Picker { .. }) {
            return;
        }
        let kind = self.state.settings.session_kind;
        let new_value = DefaultSelection::from_pickable(target);
        let value = if self.state.default_for(kind) == Some(new_value.clone()) {
            None
        } else {
            Some(new_value)
        };
        self.state.set_default_for(kind, value.clone());
        self.services.store.write(kind, value.clone());
        if let Modal::Picker { default, .. } = &mut self.state.modal {
            *default = value;
        }
    }

    // -- Mode controller -----------------------------------------------------

    /// Reconfigure the gateway for the current discovery-mode settings;
    /// exactly one `ModeOutcome` follows.
    fn start_mode_update(&mut self) {
        let settings = &self.state.settings;
        if !settings.local_enabled && !settings.relay_enabled {
            // Advisory only; nothing else is blocked.
            self.state.alert = Some(Alert::info(NO_DISCOVERY_MODE));
        }
        let gateway = Arc::clone(&self.services.gateway);
        let actions = self.actions.clone();
        let local = settings.local_enabled;
        let relay = settings.relay_enabled;
        let user = settings.relay_user.clone();
        tokio::spawn(async move {
            gateway.set_local_mode(local).await;
            let relay_ok = gateway.set_relay_mode(relay, &user).await;
            let _ = actions.send(Action::ModeOutcome { relay_ok });
        });
    }

    /// Present the login prompt, prefilled with the remembered identity.
    fn open_login(&mut self) {
        self.state.modal = Modal::Login(LoginRequest {
            heading: LOGIN_HEADING.to_string(),
            user: self.state.settings.relay_user.clone(),
        });
    }

    // -- Remote-client event folding ---------------------------------------

    /// Fold one client-change event into the session binding.
    ///
    /// Safe in any status: events are ignored unless a shared session
    /// has a matching pending station.
    fn fold_client_event(&mut self, event: sdrlink_core::ClientEvent) {
        if self.state.settings.session_kind != SessionKind::Shared {
            return;
        }
        let matches_pending = self.state.station.as_deref() == Some(event.client.station.as_str());
        match event.action {
            ClientAction::Added => {}
            ClientAction::Removed => {
                if matches_pending && self.state.bound_station.is_some() {
                    // Involuntary unbind; the exclusive host may still be
                    // reachable, so the status is untouched.
                    self.state.bound_station = None;
                    let connection = Arc::clone(&self.services.connection);
                    tokio::spawn(async move {
                        connection.bind(None).await;
                    });
                }
            }
            ClientAction::Completed => {
                if matches_pending {
                    self.state.bound_station = Some(event.client.station.clone());
                    let handle = event.client.handle;
                    let connection = Arc::clone(&self.services.connection);
                    tokio::spawn(async move {
                        connection.bind(Some(handle)).await;
                    });
                }
            }
        }
    }

    // -- Audio lifecycle -----------------------------------------------------

    /// Request an RX stream; exactly one `RxStreamOutcome` follows.
    fn start_rx_audio(&mut self) {
        if self.state.rx_stream.is_some() {
            return;
        }
        let audio = Arc::clone(&self.services.audio);
        let actions = self.actions.clone();
        tokio::spawn(async move {
            let result = audio.request_rx_stream().await;
            let _ = actions.send(Action::RxStreamOutcome(result));
        });
    }

    /// Stop local playback and release the RX stream, in that order.
    fn stop_rx_audio(&mut self) {
        if let Some(handle) = self.state.rx_stream.take() {
            // Taking the handle stops local wiring first; the radio-side
            // release follows.
            self.release_stream(handle.stream_id);
        }
    }

    /// Request a TX stream; exactly one `TxStreamOutcome` follows.
    ///
    /// Deployments without TX streaming report `Unsupported` through the
    /// same path, keeping the contract symmetric with RX.
    fn start_tx_audio(&mut self) {
        if self.state.tx_stream.is_some() {
            return;
        }
        let audio = Arc::clone(&self.services.audio);
        let actions = self.actions.clone();
        tokio::spawn(async move {
            let result = audio.request_tx_stream().await;
            let _ = actions.send(Action::TxStreamOutcome(result));
        });
    }

    /// Stop local capture and release the TX stream, in that order.
    fn stop_tx_audio(&mut self) {
        if let Some(handle) = self.state.tx_stream.take() {
            self.release_stream(handle.stream_id);
        }
    }

    /// Release a stream id on the audio service.
    fn release_stream(&self, stream_id: u32) {
        let audio = Arc::clone(&self.services.audio);
        tokio::spawn(async move {
            audio.release_stream(stream_id).await;
        });
    }
}
