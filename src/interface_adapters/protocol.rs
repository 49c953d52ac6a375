// Wire protocol DTOs and conversions for public session server messages.
// Internal service-to-service DTOs should live outside this module.

use crate::domain::{GridPos, PowerState, Vec2};
use crate::use_cases::actions::{ActionKind, NetworkAction, RejectReason};
use crate::use_cases::session::{GameSession, SessionPlayer, SessionSettings};
use crate::use_cases::types::{DeltaEvent, SessionStatus, StateDelta};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after the join handshake.
    Identity {
        player_id: String,
        session_id: String,
    },
    // Per-tick projection of the canonical state.
    Delta(StateDeltaDto),
    // Session lifecycle transitions (waiting, active, ended).
    SessionState(SessionStatusDto),
    // Synchronous receipt for a submitted action.
    ActionResult(ActionResultDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message with identity metadata.
    Join(JoinPayload),
    // Action submissions sent after a successful Join.
    Action(ActionDto),
}

/// Payload for the join handshake.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub player_id: String,
    #[serde(default)]
    pub display_name: String,
}

/// Inbound action message. Unknown `type` values fail deserialization and are
/// counted against the connection instead of reaching the queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionKindDto,
    // Present on the wire for completeness; the connection identity wins.
    #[serde(default)]
    pub player_id: String,
    pub timestamp: u64,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ActionDto {
    /// Builds the domain action, attributing it to the authenticated
    /// connection rather than whatever the wire claimed.
    pub fn into_network_action(self, player_id: &str) -> NetworkAction {
        NetworkAction {
            id: self.id,
            kind: self.kind.into(),
            player_id: player_id.to_string(),
            timestamp: self.timestamp,
            data: self.data,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKindDto {
    Build,
    Remove,
    Interact,
    Pause,
    Research,
}

impl From<ActionKindDto> for ActionKind {
    fn from(kind: ActionKindDto) -> Self {
        match kind {
            ActionKindDto::Build => ActionKind::Build,
            ActionKindDto::Remove => ActionKind::Remove,
            ActionKindDto::Interact => ActionKind::Interact,
            ActionKindDto::Pause => ActionKind::Pause,
            ActionKindDto::Research => ActionKind::Research,
        }
    }
}

/// Receipt relayed to the sender for every submitted action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResultDto {
    pub action_id: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActionResultDto {
    pub fn accepted(action_id: String) -> Self {
        Self {
            action_id,
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(action_id: String, reason: RejectReason) -> Self {
        Self {
            action_id,
            accepted: false,
            reason: Some(reason.as_str().to_string()),
        }
    }
}

/// State delta sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct StateDeltaDto {
    pub tick: u64,
    pub timestamp: u64,
    pub changes: EntityChangesDto,
    pub events: Vec<DeltaEventDto>,
}

impl From<StateDelta> for StateDeltaDto {
    fn from(delta: StateDelta) -> Self {
        Self {
            tick: delta.tick,
            timestamp: delta.timestamp,
            changes: EntityChangesDto {
                machines: delta.changes.machines.iter().map(Into::into).collect(),
                enemies: delta.changes.enemies.iter().map(Into::into).collect(),
                projectiles: delta.changes.projectiles.iter().map(Into::into).collect(),
            },
            events: delta.events.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityChangesDto {
    pub machines: Vec<MachineChangeDto>,
    pub enemies: Vec<EnemyChangeDto>,
    pub projectiles: Vec<ProjectileChangeDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineChangeDto {
    pub id: u64,
    pub updates: MachineUpdatesDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineUpdatesDto {
    pub position: GridPosDto,
    pub health: i32,
    pub power: PowerStateDto,
}

impl From<&crate::use_cases::types::MachineChange> for MachineChangeDto {
    fn from(change: &crate::use_cases::types::MachineChange) -> Self {
        Self {
            id: change.id,
            updates: MachineUpdatesDto {
                position: change.position.into(),
                health: change.health,
                power: change.power.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyChangeDto {
    pub id: u64,
    pub updates: EnemyUpdatesDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyUpdatesDto {
    pub position: Vec2Dto,
    pub health: i32,
}

impl From<&crate::use_cases::types::EnemyChange> for EnemyChangeDto {
    fn from(change: &crate::use_cases::types::EnemyChange) -> Self {
        Self {
            id: change.id,
            updates: EnemyUpdatesDto {
                position: change.position.into(),
                health: change.health,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileChangeDto {
    pub id: u64,
    pub updates: ProjectileUpdatesDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileUpdatesDto {
    pub position: Vec2Dto,
}

impl From<&crate::use_cases::types::ProjectileChange> for ProjectileChangeDto {
    fn from(change: &crate::use_cases::types::ProjectileChange) -> Self {
        Self {
            id: change.id,
            updates: ProjectileUpdatesDto {
                position: change.position.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GridPosDto {
    pub x: i32,
    pub y: i32,
}

impl From<GridPos> for GridPosDto {
    fn from(pos: GridPos) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Vec2Dto {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Vec2Dto {
    fn from(pos: Vec2) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerStateDto {
    pub required: f32,
    pub available: f32,
    pub connected: bool,
}

impl From<PowerState> for PowerStateDto {
    fn from(power: PowerState) -> Self {
        Self {
            required: power.required,
            available: power.available,
            connected: power.connected,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeltaEventDto {
    #[serde(rename_all = "camelCase")]
    ActionApplied { action_id: String, player_id: String },
    #[serde(rename_all = "camelCase")]
    EntityRemoved { id: u64, kind: String },
    #[serde(rename_all = "camelCase")]
    ResearchQueued { player_id: String, tech: String },
}

impl From<&DeltaEvent> for DeltaEventDto {
    fn from(event: &DeltaEvent) -> Self {
        match event {
            DeltaEvent::ActionApplied {
                action_id,
                player_id,
            } => DeltaEventDto::ActionApplied {
                action_id: action_id.clone(),
                player_id: player_id.clone(),
            },
            DeltaEvent::EntityRemoved { id, kind } => DeltaEventDto::EntityRemoved {
                id: *id,
                kind: kind.as_str().to_string(),
            },
            DeltaEvent::ResearchQueued { player_id, tech } => DeltaEventDto::ResearchQueued {
                player_id: player_id.clone(),
                tech: tech.clone(),
            },
        }
    }
}

/// Session lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum SessionStatusDto {
    Waiting,
    Active,
    Ended,
}

impl From<SessionStatus> for SessionStatusDto {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Waiting => SessionStatusDto::Waiting,
            SessionStatus::Active => SessionStatusDto::Active,
            SessionStatus::Ended => SessionStatusDto::Ended,
        }
    }
}

/// Session record exposed on the HTTP control surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: String,
    pub host_id: String,
    pub players: Vec<SessionPlayerDto>,
    pub status: SessionStatusDto,
    pub max_players: usize,
    pub mode: String,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

impl From<GameSession> for SessionDto {
    fn from(session: GameSession) -> Self {
        Self {
            id: session.id,
            host_id: session.host_id,
            players: session.players.iter().map(Into::into).collect(),
            status: session.status.into(),
            max_players: session.settings.max_players,
            mode: session.settings.mode,
            created_at: session.created_at,
            started_at: session.started_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlayerDto {
    pub id: String,
    pub display_name: String,
    pub is_host: bool,
}

impl From<&SessionPlayer> for SessionPlayerDto {
    fn from(player: &SessionPlayer) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            is_host: player.is_host,
        }
    }
}

/// Settings accepted on session creation; every field has a sensible default
/// so a bare `{}` creates a standard co-op session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettingsDto {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub max_players: Option<usize>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub pvp_enabled: Option<bool>,
    #[serde(default)]
    pub friendly_fire: Option<bool>,
    #[serde(default)]
    pub world_seed: Option<u64>,
    #[serde(default)]
    pub modifiers: Option<Vec<String>>,
}

impl From<SessionSettingsDto> for SessionSettings {
    fn from(dto: SessionSettingsDto) -> Self {
        let defaults = SessionSettings::default();
        SessionSettings {
            mode: dto.mode.unwrap_or(defaults.mode),
            max_players: dto.max_players.unwrap_or(defaults.max_players),
            difficulty: dto.difficulty.unwrap_or(defaults.difficulty),
            pvp_enabled: dto.pvp_enabled.unwrap_or(defaults.pvp_enabled),
            friendly_fire: dto.friendly_fire.unwrap_or(defaults.friendly_fire),
            world_seed: dto.world_seed.unwrap_or(defaults.world_seed),
            modifiers: dto.modifiers.unwrap_or(defaults.modifiers),
        }
    }
}
