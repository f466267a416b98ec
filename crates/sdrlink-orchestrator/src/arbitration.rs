//! Client-conflict arbitration.
//!
//! Decides, for a user- or auto-selected target, whether connecting
//! would collide with sessions already on the radio. Exclusive sessions
//! take over the radio's single owning channel, so any existing remote
//! client must be explicitly chosen for preemption (or the intent
//! canceled). Shared sessions attach alongside the owner and never
//! conflict.

use sdrlink_core::{PendingConflict, Pickable, SessionKind};

/// The outcome of arbitrating a selected target.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Existing sessions collide; the user must pick one to take over.
    Conflict(PendingConflict),
    /// No collision; attempt to connect immediately.
    Connect {
        /// The target to connect to.
        target: Pickable,
        /// Handle of the session to preempt (always `None` here; a
        /// handle only appears after the user resolves a conflict).
        preempt_handle: Option<u32>,
    },
}

/// Arbitrate a selected target against the sessions it already reports.
pub fn arbitrate(target: Pickable, kind: SessionKind) -> Disposition {
    if kind == SessionKind::Exclusive && !target.radio.remote_clients.is_empty() {
        let clients = target.radio.remote_clients.clone();
        Disposition::Conflict(PendingConflict { target, clients })
    } else {
        Disposition::Connect {
            target,
            preempt_handle: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdrlink_core::{RadioInfo, RadioSource, RemoteClient};

    fn target(clients: Vec<RemoteClient>, station: Option<&str>) -> Pickable {
        Pickable {
            radio: RadioInfo {
                serial: "1234".to_string(),
                source: RadioSource::Local,
                model: "FLEX-6600".to_string(),
                nickname: "Shack".to_string(),
                addr: None,
                remote_clients: clients,
            },
            station: station.map(str::to_string),
        }
    }

    fn client(station: &str, handle: u32) -> RemoteClient {
        RemoteClient {
            station: station.to_string(),
            handle,
            client_id: None,
        }
    }

    #[test]
    fn exclusive_with_existing_sessions_conflicts() {
        let t = target(vec![client("Shack", 0x10), client("Remote", 0x20)], None);
        match arbitrate(t, SessionKind::Exclusive) {
            Disposition::Conflict(conflict) => {
                let stations: Vec<&str> = conflict
                    .clients
                    .iter()
                    .map(|c| c.station.as_str())
                    .collect();
                assert_eq!(stations, ["Shack", "Remote"]);
                assert_eq!(conflict.clients[0].handle, 0x10);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn exclusive_with_idle_radio_connects_directly() {
        let t = target(Vec::new(), None);
        assert_eq!(
            arbitrate(t.clone(), SessionKind::Exclusive),
            Disposition::Connect {
                target: t,
                preempt_handle: None,
            }
        );
    }

    #[test]
    fn shared_sessions_never_conflict() {
        let t = target(vec![client("Shack", 0x10)], Some("Shack"));
        assert!(matches!(
            arbitrate(t, SessionKind::Shared),
            Disposition::Connect {
                preempt_handle: None,
                ..
            }
        ));
    }
}
