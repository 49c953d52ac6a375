// Session orchestration: records, registry, and world-task lifecycle.

use crate::use_cases::game::world_task;
use crate::use_cases::sync::handle_player_disconnect;
use crate::use_cases::types::{SessionEvent, SessionStatus, StateDelta, now_ms};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlayer {
    pub id: String,
    pub display_name: String,
    pub is_host: bool,
}

/// Settings chosen at session creation, fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub mode: String,
    pub max_players: usize,
    pub difficulty: String,
    pub pvp_enabled: bool,
    pub friendly_fire: bool,
    pub world_seed: u64,
    pub modifiers: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: "coop".to_string(),
            max_players: 4,
            difficulty: "normal".to_string(),
            pvp_enabled: false,
            friendly_fire: false,
            world_seed: 0,
            modifiers: Vec::new(),
        }
    }
}

/// Registry record for one session. Exactly one player is host while the
/// status is not `Ended`; the player list keeps join order so host migration
/// can promote the earliest-joined survivor.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: String,
    pub host_id: String,
    pub players: Vec<SessionPlayer>,
    pub settings: SessionSettings,
    pub status: SessionStatus,
    pub created_at: u64,
    pub started_at: Option<u64>,
}

/// Errors returned by session registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    NotFound,
    AlreadyExists,
    AlreadyStarted,
    Full,
}

impl SessionError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "session not found",
            Self::AlreadyExists => "session already exists",
            Self::AlreadyStarted => "session already started",
            Self::Full => "session full",
        }
    }
}

/// Shared configuration for spawning session worlds.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Capacity for inbound session events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast state deltas.
    pub delta_broadcast_capacity: usize,
    /// Fixed tick interval for the world loop.
    pub tick_interval: Duration,
}

/// Per-session channels and shutdown signal.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    /// Identifier clients use to target this session.
    pub session_id: Arc<str>,
    /// Sender for session events into the world task.
    pub input_tx: mpsc::Sender<SessionEvent>,
    /// Broadcast sender for raw state deltas.
    pub delta_tx: broadcast::Sender<StateDelta>,
    /// Broadcast sender for serialized state deltas.
    pub delta_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized delta for lag recovery.
    pub delta_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for session lifecycle changes.
    pub status_tx: watch::Sender<SessionStatus>,
    /// Signal that stops the world task when the session is destroyed.
    pub shutdown: Arc<Notify>,
}

struct SessionEntry {
    record: GameSession,
    handle: SessionHandle,
    // Taken by `start_session` when the world task spawns.
    world_rx: Option<mpsc::Receiver<SessionEvent>>,
}

/// Outcome of removing a player, surfaced to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub was_host: bool,
    pub new_host_id: Option<String>,
    pub session_ended: bool,
}

/// Thread-safe registry for live sessions.
pub struct SessionRegistry {
    settings: RegistrySettings,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a session in `Waiting` with the creator as host. The world
    /// task does not run until `start_session`; joins and subscriptions work
    /// immediately because the channels exist from here on.
    pub async fn create_session(
        &self,
        session_id: String,
        host_id: String,
        host_name: String,
        settings: SessionSettings,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(SessionError::AlreadyExists);
        }

        // Channel wiring for the session world loop.
        let (input_tx, input_rx) =
            mpsc::channel::<SessionEvent>(self.settings.input_channel_capacity);
        let (delta_tx, _delta_rx) =
            broadcast::channel::<StateDelta>(self.settings.delta_broadcast_capacity);
        let (delta_bytes_tx, _delta_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.delta_broadcast_capacity);
        let (delta_latest_tx, _delta_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (status_tx, _status_rx) = watch::channel::<SessionStatus>(SessionStatus::Waiting);

        let handle = SessionHandle {
            session_id: Arc::from(session_id.clone()),
            input_tx,
            delta_tx,
            delta_bytes_tx,
            delta_latest_tx,
            status_tx,
            shutdown: Arc::new(Notify::new()),
        };

        let record = GameSession {
            id: session_id.clone(),
            host_id: host_id.clone(),
            players: vec![SessionPlayer {
                id: host_id,
                display_name: host_name,
                is_host: true,
            }],
            settings,
            status: SessionStatus::Waiting,
            created_at: now_ms(),
            started_at: None,
        };

        sessions.insert(
            session_id,
            SessionEntry {
                record,
                handle: handle.clone(),
                world_rx: Some(input_rx),
            },
        );
        Ok(handle)
    }

    /// Adds a player to a waiting session. Re-joining with a known player id
    /// returns the handle unchanged so reconnects are idempotent.
    pub async fn join_session(
        &self,
        session_id: &str,
        player_id: String,
        display_name: String,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;

        if entry.record.players.iter().any(|p| p.id == player_id) {
            return Ok(entry.handle.clone());
        }
        if entry.record.status != SessionStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        if entry.record.players.len() >= entry.record.settings.max_players {
            return Err(SessionError::Full);
        }

        entry.record.players.push(SessionPlayer {
            id: player_id,
            display_name,
            is_host: false,
        });
        Ok(entry.handle.clone())
    }

    /// Moves a waiting session to `Active` and spawns its world task.
    pub async fn start_session(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;

        if entry.record.status != SessionStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        let Some(input_rx) = entry.world_rx.take() else {
            return Err(SessionError::AlreadyStarted);
        };

        entry.record.status = SessionStatus::Active;
        entry.record.started_at = Some(now_ms());

        tokio::spawn(world_task(
            input_rx,
            entry.handle.delta_tx.clone(),
            entry.handle.status_tx.clone(),
            self.settings.tick_interval,
            entry.handle.shutdown.clone(),
        ));
        info!(session_id, "session started");
        Ok(entry.handle.clone())
    }

    /// Drops a player and applies the host-migration rule. Destroys the
    /// session (and stops its world task) when the last player leaves.
    pub async fn remove_player(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Option<RemovalOutcome> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id)?;

        let before = entry.record.players.len();
        entry.record.players.retain(|p| p.id != player_id);
        if entry.record.players.len() == before {
            return None;
        }

        let was_host = entry.record.host_id == player_id;
        let outcome =
            handle_player_disconnect(player_id, &entry.record.host_id, &entry.record.players);

        if outcome.should_end_session {
            entry.record.status = SessionStatus::Ended;
            let _ = entry.handle.status_tx.send(SessionStatus::Ended);
            entry.handle.shutdown.notify_waiters();
            sessions.remove(session_id);
            info!(session_id, "session destroyed after last player left");
            return Some(RemovalOutcome {
                was_host,
                new_host_id: None,
                session_ended: true,
            });
        }

        if let Some(new_host_id) = &outcome.new_host_id {
            entry.record.host_id = new_host_id.clone();
            for p in &mut entry.record.players {
                p.is_host = p.id == *new_host_id;
            }
            info!(session_id, new_host_id, "host migrated");
        }

        Some(RemovalOutcome {
            was_host,
            new_host_id: outcome.new_host_id,
            session_ended: false,
        })
    }

    /// Returns the live handle for the provided id, if the session exists.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|e| e.handle.clone())
    }

    /// Snapshot of one session record.
    pub async fn session_record(&self, session_id: &str) -> Option<GameSession> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|e| e.record.clone())
    }

    /// Snapshot of all session records, for the listing endpoint.
    pub async fn list_sessions(&self) -> Vec<GameSession> {
        let sessions = self.sessions.read().await;
        sessions.values().map(|e| e.record.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(RegistrySettings {
            input_channel_capacity: 16,
            delta_broadcast_capacity: 16,
            tick_interval: Duration::from_millis(5),
        })
    }

    async fn create(reg: &SessionRegistry, id: &str, host: &str) {
        reg.create_session(
            id.to_string(),
            host.to_string(),
            host.to_uppercase(),
            SessionSettings::default(),
        )
        .await
        .expect("create session");
    }

    #[tokio::test]
    async fn join_fails_for_unknown_session() {
        let reg = registry();
        let err = reg
            .join_session("missing", "p1".to_string(), "P1".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NotFound);
    }

    #[tokio::test]
    async fn join_fails_once_started_or_full() {
        let reg = registry();
        create(&reg, "s1", "host").await;

        let mut settings = SessionSettings::default();
        settings.max_players = 2;
        reg.create_session(
            "s2".to_string(),
            "host".to_string(),
            "HOST".to_string(),
            settings,
        )
        .await
        .expect("create session");

        reg.join_session("s2", "p2".to_string(), "P2".to_string())
            .await
            .expect("join within capacity");
        let err = reg
            .join_session("s2", "p3".to_string(), "P3".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Full);

        reg.start_session("s1").await.expect("start");
        let err = reg
            .join_session("s1", "late".to_string(), "LATE".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyStarted);
    }

    #[tokio::test]
    async fn start_is_rejected_twice() {
        let reg = registry();
        create(&reg, "s1", "host").await;

        reg.start_session("s1").await.expect("first start");
        let err = reg.start_session("s1").await.unwrap_err();
        assert_eq!(err, SessionError::AlreadyStarted);
    }

    #[tokio::test]
    async fn host_leaving_migrates_to_earliest_joined() {
        let reg = registry();
        create(&reg, "s1", "host").await;
        reg.join_session("s1", "p2".to_string(), "P2".to_string())
            .await
            .expect("join p2");
        reg.join_session("s1", "p3".to_string(), "P3".to_string())
            .await
            .expect("join p3");

        let outcome = reg.remove_player("s1", "host").await.expect("removal");
        assert!(outcome.was_host);
        assert_eq!(outcome.new_host_id.as_deref(), Some("p2"));
        assert!(!outcome.session_ended);

        let record = reg.session_record("s1").await.expect("record");
        assert_eq!(record.host_id, "p2");
        let hosts: Vec<&str> = record
            .players
            .iter()
            .filter(|p| p.is_host)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(hosts, vec!["p2"]);
    }

    #[tokio::test]
    async fn last_player_leaving_destroys_the_session() {
        let reg = registry();
        create(&reg, "s1", "host").await;

        let outcome = reg.remove_player("s1", "host").await.expect("removal");
        assert!(outcome.session_ended);
        assert!(reg.get_session("s1").await.is_none());
    }

    #[tokio::test]
    async fn rejoin_with_known_player_id_is_idempotent() {
        let reg = registry();
        create(&reg, "s1", "host").await;
        reg.start_session("s1").await.expect("start");

        // The host reconnecting after start must not hit AlreadyStarted.
        reg.join_session("s1", "host".to_string(), "HOST".to_string())
            .await
            .expect("rejoin");
        let record = reg.session_record("s1").await.expect("record");
        assert_eq!(record.players.len(), 1);
    }
}
