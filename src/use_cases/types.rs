// Use-case level inputs/outputs for the session world loop.

use crate::domain::{Enemy, EntityKind, GridPos, Machine, PowerState, Projectile, Vec2};
use crate::use_cases::actions::NetworkAction;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Events flowing from connections into a session's world task.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Join {
        player_id: String,
        display_name: String,
    },
    Leave {
        player_id: String,
    },
    Action(NetworkAction),
}

/// Session lifecycle as broadcast to clients. Host migration keeps the
/// session `Active`; only an empty player list ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    Active,
    Ended,
}

/// Per-entity projection broadcast once per tick. Not a diff against the
/// previous tick: each delta is self-contained so a lagged receiver can
/// reconcile from the latest one alone.
#[derive(Debug, Clone)]
pub struct StateDelta {
    pub tick: u64,
    pub timestamp: u64,
    pub changes: EntityChanges,
    pub events: Vec<DeltaEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct EntityChanges {
    pub machines: Vec<MachineChange>,
    pub enemies: Vec<EnemyChange>,
    pub projectiles: Vec<ProjectileChange>,
}

/// The machine fields that matter for rendering and consistency. Inventories
/// and recipes stay host-side.
#[derive(Debug, Clone)]
pub struct MachineChange {
    pub id: u64,
    pub position: GridPos,
    pub health: i32,
    pub power: PowerState,
}

impl From<&Machine> for MachineChange {
    fn from(m: &Machine) -> Self {
        Self {
            id: m.id,
            position: m.position,
            health: m.health,
            power: m.power,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnemyChange {
    pub id: u64,
    pub position: Vec2,
    pub health: i32,
}

impl From<&Enemy> for EnemyChange {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.id,
            position: e.position,
            health: e.health,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectileChange {
    pub id: u64,
    pub position: Vec2,
}

impl From<&Projectile> for ProjectileChange {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            position: p.position,
        }
    }
}

/// Out-of-band happenings attached to a delta: applied-action receipts,
/// despawns, and research requests handed to the tech system.
#[derive(Debug, Clone)]
pub enum DeltaEvent {
    ActionApplied {
        action_id: String,
        player_id: String,
    },
    EntityRemoved {
        id: u64,
        kind: EntityKind,
    },
    ResearchQueued {
        player_id: String,
        tech: String,
    },
}
