// Host-authoritative synchronization: ordered action application, per-tick
// state projection, host migration, and the advisory replay log.

use crate::domain::{
    Enemy, Facing, GridPos, Machine, MachineKind, Projectile, Recipe, RemovedEntity, TICK_MS,
};
use crate::use_cases::actions::{ActionKind, ActionQueue, NetworkAction, SubmitOutcome};
use crate::use_cases::session::SessionPlayer;
use crate::use_cases::types::{DeltaEvent, EntityChanges, StateDelta};
use serde_json::Value;
use tracing::{info, warn};

/// Outcome of a player leaving, as seen by the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub new_host_id: Option<String>,
    pub should_end_session: bool,
}

/// Host-migration rule: when the host leaves and players remain, authority
/// moves to the earliest-joined remaining player; an empty session ends.
/// `remaining` is the player list after the departure, in join order.
pub fn handle_player_disconnect(
    player_id: &str,
    host_id: &str,
    remaining: &[SessionPlayer],
) -> DisconnectOutcome {
    if remaining.is_empty() {
        return DisconnectOutcome {
            new_host_id: None,
            should_end_session: true,
        };
    }
    if player_id == host_id {
        return DisconnectOutcome {
            new_host_id: Some(remaining[0].id.clone()),
            should_end_session: false,
        };
    }
    DisconnectOutcome {
        new_host_id: None,
        should_end_session: false,
    }
}

/// The host's view of one session's synchronization state. Entity collections
/// live with the world task, which lends them to `apply_actions`; the caller
/// composes action application, the simulation engine, and `finish_tick` into
/// one tick.
pub struct HostSync {
    tick: u64,
    queue: ActionQueue,
    // Applied actions, kept for advisory late-join replay.
    applied: Vec<NetworkAction>,
    paused: bool,
    next_machine_id: u64,
}

impl HostSync {
    pub fn new() -> Self {
        Self {
            tick: 0,
            queue: ActionQueue::new(),
            applied: Vec::new(),
            paused: false,
            next_machine_id: 1,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Validates and enqueues an action, returning the receipt for the sender.
    pub fn submit_action(&mut self, action: NetworkAction, now_ms: u64) -> SubmitOutcome {
        self.queue.submit(action, now_ms)
    }

    /// Drains the pending queue in `(timestamp, seq)` order and applies each
    /// action to the machine collection. Invalid payloads are skipped with a
    /// log line; the tick never fails.
    pub fn apply_actions(&mut self, machines: &mut Vec<Machine>) -> Vec<DeltaEvent> {
        let mut events = Vec::new();
        for action in self.queue.drain_ordered() {
            if self.apply_one(&action, machines, &mut events) {
                events.push(DeltaEvent::ActionApplied {
                    action_id: action.id.clone(),
                    player_id: action.player_id.clone(),
                });
                self.applied.push(action);
            }
        }
        events
    }

    fn apply_one(
        &mut self,
        action: &NetworkAction,
        machines: &mut Vec<Machine>,
        events: &mut Vec<DeltaEvent>,
    ) -> bool {
        match action.kind {
            ActionKind::Build => self.apply_build(action, machines),
            ActionKind::Remove => {
                let Some(machine_id) = field_u64(&action.data, "machine_id") else {
                    warn!(action_id = %action.id, "remove action without machine_id");
                    return false;
                };
                let before = machines.len();
                machines.retain(|m| m.id != machine_id);
                if machines.len() == before {
                    warn!(action_id = %action.id, machine_id, "remove target not found");
                    return false;
                }
                true
            }
            ActionKind::Interact => {
                let Some(machine_id) = field_u64(&action.data, "machine_id") else {
                    warn!(action_id = %action.id, "interact action without machine_id");
                    return false;
                };
                let Some(m) = machines.iter_mut().find(|m| m.id == machine_id) else {
                    warn!(action_id = %action.id, machine_id, "interact target not found");
                    return false;
                };
                m.power.connected = !m.power.connected;
                true
            }
            ActionKind::Pause => {
                self.paused = !self.paused;
                info!(player_id = %action.player_id, paused = self.paused, "pause toggled");
                true
            }
            ActionKind::Research => {
                let Some(tech) = field_str(&action.data, "tech") else {
                    warn!(action_id = %action.id, "research action without tech");
                    return false;
                };
                // The tech tree lives outside this crate; the event hands the
                // request to it through the broadcast stream.
                events.push(DeltaEvent::ResearchQueued {
                    player_id: action.player_id.clone(),
                    tech: tech.to_string(),
                });
                true
            }
        }
    }

    fn apply_build(&mut self, action: &NetworkAction, machines: &mut Vec<Machine>) -> bool {
        let Some(kind) = field_str(&action.data, "kind").and_then(MachineKind::parse) else {
            warn!(action_id = %action.id, "build action with unknown machine kind");
            return false;
        };
        let (Some(x), Some(y)) = (
            field_i32(&action.data, "x"),
            field_i32(&action.data, "y"),
        ) else {
            warn!(action_id = %action.id, "build action without coordinates");
            return false;
        };
        let position = GridPos::new(x, y);
        if machines.iter().any(|m| m.position == position) {
            // Earlier-timestamped builds win contested cells; later ones drop.
            info!(action_id = %action.id, x, y, "build target cell occupied");
            return false;
        }

        let facing = field_str(&action.data, "facing")
            .and_then(Facing::parse)
            .unwrap_or(Facing::North);

        let id = self.next_machine_id;
        self.next_machine_id += 1;
        let mut machine = Machine::new(id, kind, position, facing);
        if let Some(recipe) = field_str(&action.data, "recipe").and_then(Recipe::by_name) {
            machine.recipe = Some(recipe);
        }
        machines.push(machine);
        info!(machine_id = id, kind = kind.as_str(), x, y, "machine built");
        true
    }

    /// Projects current entity state into the delta for this tick, attaches
    /// the tick's events, and advances the counter.
    pub fn finish_tick(
        &mut self,
        timestamp: u64,
        machines: &[Machine],
        enemies: &[Enemy],
        projectiles: &[Projectile],
        events: Vec<DeltaEvent>,
    ) -> StateDelta {
        let mut delta = compress_state(machines, enemies, projectiles, self.tick, timestamp);
        delta.events = events;
        self.tick += 1;
        delta
    }

    /// Applied actions whose estimated tick falls inside `[from_tick, to_tick]`.
    ///
    /// The estimate assumes an uninterrupted 60 Hz cadence, so it drifts if the
    /// loop ever stalled. That is acceptable: the log is advisory catch-up
    /// material for late joiners, never the authoritative state.
    pub fn replay_actions(&self, from_tick: u64, to_tick: u64) -> Vec<NetworkAction> {
        self.applied
            .iter()
            .filter(|a| {
                let estimated = (a.timestamp as f64 / TICK_MS) as u64;
                estimated >= from_tick && estimated <= to_tick
            })
            .cloned()
            .collect()
    }
}

impl Default for HostSync {
    fn default() -> Self {
        Self::new()
    }
}

/// Full per-entity projection of the state that matters for rendering and
/// consistency. Every entity appears exactly once; everything else
/// (inventories, recipes, velocities) stays host-side.
pub fn compress_state(
    machines: &[Machine],
    enemies: &[Enemy],
    projectiles: &[Projectile],
    tick: u64,
    timestamp: u64,
) -> StateDelta {
    StateDelta {
        tick,
        timestamp,
        changes: EntityChanges {
            machines: machines.iter().map(Into::into).collect(),
            enemies: enemies.iter().map(Into::into).collect(),
            projectiles: projectiles.iter().map(Into::into).collect(),
        },
        events: Vec::new(),
    }
}

/// `RemovedEntity` ids from the engine surface to clients as delta events.
pub fn removal_events(removed: &[RemovedEntity]) -> Vec<DeltaEvent> {
    removed
        .iter()
        .map(|r| DeltaEvent::EntityRemoved {
            id: r.id,
            kind: r.kind,
        })
        .collect()
}

fn field_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

fn field_u64(data: &Value, key: &str) -> Option<u64> {
    data.get(key).and_then(Value::as_u64)
}

fn field_i32(data: &Value, key: &str) -> Option<i32> {
    data.get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
}
