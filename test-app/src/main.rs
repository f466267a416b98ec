// sdrlink test application -- CLI tool for exercising the Connection
// Orchestrator against the mock harness, without radio hardware.
//
// Usage:
//   sdrlink-test-app cycle
//   sdrlink-test-app cycle --use-default --rx-audio
//   sdrlink-test-app conflict
//   sdrlink-test-app login
//   sdrlink-test-app shared
//
// Each scenario seeds the mock discovery gateway, drives the
// orchestrator through its public handle, and prints every state
// transition as it is published.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sdrlink_core::{
    ConnectionStatus, DefaultSelection, DefaultStore, Modal, RadioInfo, RadioSource, RemoteClient,
    SessionKind,
};
use sdrlink_orchestrator::{Action, OrchestratorHandle, Services, Settings, State, spawn};
use sdrlink_test_harness::{
    MemoryDefaultStore, MockAudioService, MockConnectionService, MockDiscoveryGateway,
    MockLoginService,
};

/// sdrlink test application -- exercises the orchestrator from the
/// command line.
#[derive(Parser)]
#[command(name = "sdrlink-test-app", version, about)]
struct Cli {
    /// Take a shared session instead of an exclusive one.
    #[arg(long)]
    shared: bool,

    /// Auto-connect to the stored default instead of picking.
    #[arg(long)]
    use_default: bool,

    /// Enable the receive-audio preference before connecting.
    #[arg(long)]
    rx_audio: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to a mock radio, hold briefly, then disconnect.
    Cycle,
    /// Select a radio that already has a session and preempt it.
    Conflict,
    /// Force a Smartlink relay failure and walk the login flow.
    Login,
    /// Take a shared session and bind/unbind through client events.
    Shared,
}

fn mock_services() -> (Services, Arc<MockDiscoveryGateway>, Arc<MockConnectionService>) {
    let gateway = Arc::new(MockDiscoveryGateway::new());
    let connection = Arc::new(MockConnectionService::new());
    let services = Services {
        gateway: gateway.clone(),
        connection: connection.clone(),
        login: Arc::new(MockLoginService::new(true)),
        audio: Arc::new(MockAudioService::new()),
        store: Arc::new(MemoryDefaultStore::new()),
    };
    (services, gateway, connection)
}

fn shack_radio(clients: Vec<RemoteClient>) -> RadioInfo {
    RadioInfo {
        serial: "1234-5678-9012".to_string(),
        source: RadioSource::Local,
        model: "FLEX-6600".to_string(),
        nickname: "Shack".to_string(),
        addr: Some("192.168.1.100:4992".parse().unwrap()),
        remote_clients: clients,
    }
}

/// Print state transitions as they are published, until the handle is
/// dropped.
fn watch_transitions(handle: &OrchestratorHandle) {
    let mut rx = handle.subscribe();
    tokio::spawn(async move {
        let mut last_status = None;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if last_status != Some(state.status) {
                println!("status: {}", state.status);
                last_status = Some(state.status);
            }
            if let Some(alert) = &state.alert {
                println!("alert [{:?}]: {}", alert.kind, alert.message);
            }
        }
    });
}

/// Wait (bounded) for a published snapshot satisfying the predicate.
async fn wait_for(
    handle: &OrchestratorHandle,
    what: &str,
    pred: impl Fn(&State) -> bool,
) -> Result<State> {
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
    .with_context(|| format!("timed out waiting for {what}"))
}

async fn pick_first(handle: &OrchestratorHandle) -> Result<()> {
    let state = wait_for(handle, "the device picker", |s| {
        matches!(&s.modal, Modal::Picker { pickables, .. } if !pickables.is_empty())
    })
    .await?;
    if let Modal::Picker { pickables, .. } = &state.modal {
        println!("picking: {}", pickables[0]);
        handle.send(Action::PickerConnect(pickables[0].clone()));
    }
    Ok(())
}

async fn run_cycle(cli: &Cli) -> Result<()> {
    let (services, gateway, _connection) = mock_services();
    gateway.add_radio(shack_radio(Vec::new()));
    if cli.use_default {
        services.store.write(
            SessionKind::Exclusive,
            Some(DefaultSelection {
                serial: "1234-5678-9012".to_string(),
                source: RadioSource::Local,
                station: None,
            }),
        );
    }

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            use_default: cli.use_default,
            rx_audio_enabled: cli.rx_audio,
            session_kind: session_kind(cli),
            ..Settings::default()
        },
        None,
    );
    watch_transitions(&handle);

    handle.connect_toggle();
    if !cli.use_default {
        pick_first(&handle).await?;
    }
    let state = wait_for(&handle, "connection", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await?;
    if let Some(stream) = state.rx_stream {
        println!("rx audio stream: 0x{:08X}", stream.stream_id);
    }

    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.connect_toggle();
    wait_for(&handle, "disconnect", |s| {
        s.status == ConnectionStatus::Disconnected
    })
    .await?;
    handle.shutdown().await;
    Ok(())
}

async fn run_conflict(cli: &Cli) -> Result<()> {
    let (services, gateway, connection) = mock_services();
    gateway.add_radio(shack_radio(vec![RemoteClient {
        station: "Kitchen".to_string(),
        handle: 0x4A3B_2C1D,
        client_id: Some("SmartSDR-iOS".to_string()),
    }]));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            session_kind: session_kind(cli),
            ..Settings::default()
        },
        None,
    );
    watch_transitions(&handle);

    handle.connect_toggle();
    pick_first(&handle).await?;

    let state = wait_for(&handle, "the conflict chooser", |s| {
        matches!(s.modal, Modal::Conflict(_))
    })
    .await?;
    if let Modal::Conflict(conflict) = &state.modal {
        for client in &conflict.clients {
            println!("existing session: {} (0x{:08X})", client.station, client.handle);
        }
        handle.send(Action::ConflictResolve(conflict.clients[0].handle));
    }

    wait_for(&handle, "connection", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await?;
    let call = &connection.connects()[0];
    println!(
        "connected to {} preempting 0x{:08X}",
        call.serial,
        call.preempt_handle.unwrap()
    );
    handle.shutdown().await;
    Ok(())
}

async fn run_login(_cli: &Cli) -> Result<()> {
    let (services, gateway, _connection) = mock_services();
    gateway.set_relay_starts(false);

    let handle = spawn(services, Settings::default(), None);
    watch_transitions(&handle);

    handle.set_relay_enabled(true);
    let state = wait_for(&handle, "the login prompt", |s| {
        matches!(s.modal, Modal::Login(_))
    })
    .await?;
    if let Modal::Login(request) = &state.modal {
        println!("login prompt: {}", request.heading);
    }

    handle.send(Action::LoginSubmit {
        user: "op@example.com".to_string(),
        password: "hunter2".to_string(),
    });
    let state = wait_for(&handle, "login acceptance", |s| {
        s.settings.relay_user == "op@example.com"
    })
    .await?;
    println!("remembered identity: {}", state.settings.relay_user);
    handle.shutdown().await;
    Ok(())
}

async fn run_shared(_cli: &Cli) -> Result<()> {
    let (services, gateway, connection) = mock_services();
    let shack = RemoteClient {
        station: "Shack".to_string(),
        handle: 0x77,
        client_id: Some("gui-1".to_string()),
    };
    gateway.add_radio(shack_radio(vec![shack.clone()]));

    let handle = spawn(
        services,
        Settings {
            local_enabled: true,
            session_kind: SessionKind::Shared,
            ..Settings::default()
        },
        None,
    );
    watch_transitions(&handle);

    handle.connect_toggle();
    pick_first(&handle).await?;
    wait_for(&handle, "connection", |s| {
        s.status == ConnectionStatus::Connected
    })
    .await?;

    gateway.push_client(sdrlink_core::ClientEvent {
        action: sdrlink_core::ClientAction::Completed,
        client: shack.clone(),
    });
    let state = wait_for(&handle, "the station binding", |s| s.bound_station.is_some()).await?;
    println!("bound to station: {}", state.bound_station.unwrap());

    gateway.push_client(sdrlink_core::ClientEvent {
        action: sdrlink_core::ClientAction::Removed,
        client: shack,
    });
    let state = wait_for(&handle, "the unbind", |s| s.bound_station.is_none()).await?;
    println!(
        "station removed; still {} to the host (binds: {:?})",
        state.status,
        connection.binds()
    );
    handle.shutdown().await;
    Ok(())
}

fn session_kind(cli: &Cli) -> SessionKind {
    if cli.shared {
        SessionKind::Shared
    } else {
        SessionKind::Exclusive
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(shared = cli.shared, use_default = cli.use_default, "starting scenario");
    match cli.command {
        Command::Cycle => run_cycle(&cli).await,
        Command::Conflict => run_conflict(&cli).await,
        Command::Login => run_login(&cli).await,
        Command::Shared => run_shared(&cli).await,
    }
}
