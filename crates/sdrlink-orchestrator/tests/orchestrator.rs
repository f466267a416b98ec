//! End-to-end tests for the orchestrator's public API: a spawned action
//! loop fed through `OrchestratorHandle`, with mock services behind it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use sdrlink_core::{
    AlertKind, ClientAction, ClientEvent, ConnectionStatus, DefaultSelection, DefaultStore,
    DiscoveryEvent, LogAlert, LogSeverity, Modal, Pickable, RadioInfo, RadioSource, RemoteClient,
    SessionKind,
};
use sdrlink_orchestrator::{Action, OrchestratorHandle, Services, Settings, State, spawn};
use sdrlink_test_harness::{
    MemoryDefaultStore, MockAudioService, MockConnectionService, MockDiscoveryGateway,
    MockLoginService,
};

struct Mocks {
    gateway: Arc<MockDiscoveryGateway>,
    connection: Arc<MockConnectionService>,
    login: Arc<MockLoginService>,
    audio: Arc<MockAudioService>,
    store: Arc<MemoryDefaultStore>,
}

fn mocks() -> (Services, Mocks) {
    let gateway = Arc::new(MockDiscoveryGateway::new());
    let connection = Arc::new(MockConnectionService::new());
    let login = Arc::new(MockLoginService::new(true));
    let audio = Arc::new(MockAudioService::new());
    let store = Arc::new(MemoryDefaultStore::new());
    let services = Services {
        gateway: gateway.clone(),
        connection: connection.clone(),
        login: login.clone(),
        audio: audio.clone(),
        store: store.clone(),
    };
    (
        services,
        Mocks {
            gateway,
            connection,
            login,
            audio,
            store,
        },
    )
}

fn radio(serial: &str, clients: Vec<RemoteClient>) -> RadioInfo {
    RadioInfo {
        serial: serial.to_string(),
        source: RadioSource::Local,
        model: "FLEX-6600".to_string(),
        nickname: "Shack".to_string(),
        addr: None,
        remote_clients: clients,
    }
}

/// Wait (bounded) until a published snapshot satisfies the predicate.
async fn wait_for(handle: &OrchestratorHandle, what: &str, pred: impl Fn(&State) -> bool) -> State {
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let state = rx.borrow_and_update().clone();
                if pred(&state) {
                    return state;
                }
            }
            rx.changed().await.expect("snapshot channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for: {what}"))
}

/// Wait (bounded) until a mock-side condition holds.
async fn wait_until(what: &str, pred: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !pred() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for: {what}"))
}

#[tokio::test]
async fn full_connect_disconnect_cycle() {
    let (services, m) = mocks();
    m.gateway.add_radio(radio("1234", Vec::new()));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    let state = wait_for(&handle, "picker open", |s| {
        matches!(s.modal, Modal::Picker { .. })
    })
    .await;
    assert_eq!(state.status, ConnectionStatus::InProcess);

    let target = match &state.modal {
        Modal::Picker { pickables, .. } => pickables[0].clone(),
        other => panic!("expected picker, got {other:?}"),
    };
    handle.send(Action::PickerConnect(target));
    wait_for(&handle, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;

    handle.connect_toggle();
    wait_for(&handle, "disconnected", |s| {
        s.status == ConnectionStatus::Disconnected
    })
    .await;

    assert_eq!(m.connection.connects().len(), 1);
    assert_eq!(m.connection.connects()[0].serial, "1234");
    assert_eq!(m.connection.disconnects(), 1);
    handle.shutdown().await;
}

#[tokio::test]
async fn auto_connect_uses_the_persisted_default() {
    let (services, m) = mocks();
    m.gateway.add_radio(radio("1234", Vec::new()));
    m.store.write(
        SessionKind::Exclusive,
        Some(DefaultSelection {
            serial: "1234".to_string(),
            source: RadioSource::Local,
            station: None,
        }),
    );

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            use_default: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    let state = wait_for(&handle, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;
    // The stored default matched a live radio; no picker was needed.
    assert!(!state.modal.is_open());
    assert_eq!(m.connection.connects()[0].serial, "1234");
    handle.shutdown().await;
}

#[tokio::test]
async fn shared_session_binds_and_unbinds_with_client_events() {
    let (services, m) = mocks();
    let shack = RemoteClient {
        station: "Shack".to_string(),
        handle: 0x77,
        client_id: Some("gui-1".to_string()),
    };
    m.gateway.add_radio(radio("1234", vec![shack.clone()]));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            session_kind: SessionKind::Shared,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    let state = wait_for(&handle, "station picker", |s| {
        matches!(s.modal, Modal::Picker { .. })
    })
    .await;
    let target = match &state.modal {
        Modal::Picker { pickables, .. } => pickables[0].clone(),
        other => panic!("expected picker, got {other:?}"),
    };
    assert_eq!(target.station.as_deref(), Some("Shack"));

    handle.send(Action::PickerConnect(target));
    wait_for(&handle, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;

    // The station finishes initializing; the orchestrator binds to it.
    m.gateway.push_client(ClientEvent {
        action: ClientAction::Completed,
        client: shack.clone(),
    });
    wait_until("bind by handle", || m.connection.binds() == vec![Some(0x77)]).await;
    wait_for(&handle, "bound station", |s| {
        s.bound_station.as_deref() == Some("Shack")
    })
    .await;

    // The station disappears; unbind, but stay connected to the host.
    m.gateway.push_client(ClientEvent {
        action: ClientAction::Removed,
        client: shack,
    });
    wait_until("unbind", || {
        m.connection.binds() == vec![Some(0x77), None]
    })
    .await;
    let state = wait_for(&handle, "binding cleared", |s| s.bound_station.is_none()).await;
    assert_eq!(state.status, ConnectionStatus::Connected);
    handle.shutdown().await;
}

#[tokio::test]
async fn relay_failure_prompts_login_and_success_remembers_identity() {
    let (services, m) = mocks();
    m.gateway.set_relay_starts(false);

    let handle = spawn(services, Settings::default(), None);

    handle.set_relay_enabled(true);
    wait_for(&handle, "login prompt", |s| matches!(s.modal, Modal::Login(_))).await;

    handle.send(Action::LoginSubmit {
        user: "op@example.com".to_string(),
        password: "secret".to_string(),
    });
    let state = wait_for(&handle, "login accepted", |s| {
        s.settings.relay_user == "op@example.com"
    })
    .await;
    assert!(!state.settings.login_required);
    assert_eq!(m.login.attempts(), vec!["op@example.com"]);
    handle.shutdown().await;
}

#[tokio::test]
async fn rx_audio_streams_across_the_connection_lifetime() {
    let (services, m) = mocks();
    m.gateway.add_radio(radio("1234", Vec::new()));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            rx_audio_enabled: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    let state = wait_for(&handle, "picker open", |s| {
        matches!(s.modal, Modal::Picker { .. })
    })
    .await;
    let target = match &state.modal {
        Modal::Picker { pickables, .. } => pickables[0].clone(),
        other => panic!("expected picker, got {other:?}"),
    };
    handle.send(Action::PickerConnect(target));

    let state = wait_for(&handle, "stream wired", |s| s.rx_stream.is_some()).await;
    let stream_id = state.rx_stream.unwrap().stream_id;
    assert_eq!(m.audio.requests(), vec![stream_id]);

    handle.connect_toggle();
    wait_for(&handle, "disconnected", |s| {
        s.status == ConnectionStatus::Disconnected
    })
    .await;
    wait_until("stream released", || m.audio.releases() == vec![stream_id]).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn log_alert_stream_raises_alerts_when_enabled() {
    let (services, _m) = mocks();
    let (log_tx, log_rx) = broadcast::channel::<LogAlert>(16);

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            alert_on_error: true,
            ..Settings::default()
        },
        Some(log_rx),
    );

    log_tx
        .send(LogAlert {
            severity: LogSeverity::Error,
            message: "meter stream stalled".to_string(),
        })
        .unwrap();

    let state = wait_for(&handle, "log alert surfaced", |s| s.alert.is_some()).await;
    let alert = state.alert.unwrap();
    assert_eq!(alert.kind, AlertKind::Error);
    assert_eq!(alert.message, "meter stream stalled");
    handle.shutdown().await;
}

#[tokio::test]
async fn discovery_events_refresh_an_open_picker() {
    let (services, m) = mocks();

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    wait_for(&handle, "empty picker", |s| {
        matches!(&s.modal, Modal::Picker { pickables, .. } if pickables.is_empty())
    })
    .await;

    let appeared = radio("5678", Vec::new());
    m.gateway.add_radio(appeared.clone());
    m.gateway.push_discovery(DiscoveryEvent::Added(appeared));

    wait_for(&handle, "picker refreshed", |s| {
        matches!(&s.modal, Modal::Picker { pickables, .. } if pickables.len() == 1)
    })
    .await;
    handle.shutdown().await;
}

#[tokio::test]
async fn conflict_flow_preempts_the_chosen_session() {
    let (services, m) = mocks();
    m.gateway.add_radio(radio(
        "1234",
        vec![RemoteClient {
            station: "Shack".to_string(),
            handle: 0xABCD,
            client_id: None,
        }],
    ));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    let state = wait_for(&handle, "picker open", |s| {
        matches!(s.modal, Modal::Picker { .. })
    })
    .await;
    let target = match &state.modal {
        Modal::Picker { pickables, .. } => pickables[0].clone(),
        other => panic!("expected picker, got {other:?}"),
    };

    handle.send(Action::PickerConnect(target));
    let state = wait_for(&handle, "conflict chooser", |s| {
        matches!(s.modal, Modal::Conflict(_))
    })
    .await;
    let handle_to_preempt = match &state.modal {
        Modal::Conflict(conflict) => {
            assert_eq!(conflict.clients[0].station, "Shack");
            conflict.clients[0].handle
        }
        other => panic!("expected conflict, got {other:?}"),
    };

    handle.send(Action::ConflictResolve(handle_to_preempt));
    wait_for(&handle, "connected", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await;
    assert_eq!(m.connection.connects()[0].preempt_handle, Some(0xABCD));
    handle.shutdown().await;
}

#[tokio::test]
async fn picker_cancel_returns_to_disconnected() {
    let (services, m) = mocks();
    m.gateway.add_radio(radio("1234", Vec::new()));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    wait_for(&handle, "picker open", |s| {
        matches!(s.modal, Modal::Picker { .. })
    })
    .await;

    handle.send(Action::PickerCancel);
    let state = wait_for(&handle, "disconnected", |s| {
        s.status == ConnectionStatus::Disconnected
    })
    .await;
    assert!(!state.modal.is_open());
    assert!(m.connection.connects().is_empty());
    handle.shutdown().await;
}

#[tokio::test]
async fn default_toggle_writes_through_and_cancels_out() {
    let (services, m) = mocks();
    m.gateway.add_radio(radio("1234", Vec::new()));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            ..Settings::default()
        },
        None,
    );

    handle.connect_toggle();
    let state = wait_for(&handle, "picker open", |s| {
        matches!(s.modal, Modal::Picker { .. })
    })
    .await;
    let target: Pickable = match &state.modal {
        Modal::Picker { pickables, .. } => pickables[0].clone(),
        other => panic!("expected picker, got {other:?}"),
    };

    handle.send(Action::PickerDefaultToggle(target.clone()));
    handle.flush().await;
    assert_eq!(
        m.store.read(SessionKind::Exclusive).map(|d| d.serial),
        Some("1234".to_string())
    );

    handle.send(Action::PickerDefaultToggle(target));
    handle.flush().await;
    assert_eq!(m.store.read(SessionKind::Exclusive), None);
    assert_eq!(m.store.writes().len(), 2);
    handle.shutdown().await;
}
