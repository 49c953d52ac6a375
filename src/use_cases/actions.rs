// Action intake for the host: validation, sequencing, and ordered draining.

use serde_json::Value;

/// How far ahead of the host clock an action timestamp may sit before it is
/// rejected as clock skew or replay.
pub const MAX_TIMESTAMP_AHEAD_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Build,
    Remove,
    Interact,
    Pause,
    Research,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Remove => "remove",
            Self::Interact => "interact",
            Self::Pause => "pause",
            Self::Research => "research",
        }
    }
}

/// A participant's timestamped intent to mutate shared state.
///
/// Immutable once created: the host validates it exactly once, then either
/// drops it or applies it exactly once. The timestamp comes from the sender's
/// clock and is only trusted for ordering, never for game logic.
#[derive(Debug, Clone)]
pub struct NetworkAction {
    pub id: String,
    pub kind: ActionKind,
    pub player_id: String,
    pub timestamp: u64,
    pub data: Value,
}

/// Reason an action never reached the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingFields,
    TimestampTooFarAhead,
    QueueFull,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing required fields",
            Self::TimestampTooFarAhead => "action timestamp too far in future",
            Self::QueueFull => "action queue full",
        }
    }
}

/// Synchronous receipt for a submitted action. Senders always learn whether
/// their action entered the host queue; applied actions are additionally
/// confirmed through delta events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { seq: u64 },
    Rejected { reason: RejectReason },
}

/// Structural validation only. Game-rule legality (is the target tile
/// buildable, does the player own the machine) belongs to the placement
/// subsystem downstream of the queue.
pub fn validate(action: &NetworkAction, now_ms: u64) -> Result<(), RejectReason> {
    if action.id.trim().is_empty() || action.player_id.trim().is_empty() {
        return Err(RejectReason::MissingFields);
    }
    if action.timestamp > now_ms.saturating_add(MAX_TIMESTAMP_AHEAD_MS) {
        return Err(RejectReason::TimestampTooFarAhead);
    }
    Ok(())
}

struct PendingAction {
    seq: u64,
    action: NetworkAction,
}

/// Pending actions between ticks. Append-only between drains; a drain is
/// atomic and orders by `(timestamp, seq)` ascending, so equal sender
/// timestamps fall back to host arrival order rather than sort stability.
pub struct ActionQueue {
    pending: Vec<PendingAction>,
    next_seq: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Validates and enqueues, stamping the action with its submission
    /// sequence number.
    pub fn submit(&mut self, action: NetworkAction, now_ms: u64) -> SubmitOutcome {
        if let Err(reason) = validate(&action, now_ms) {
            return SubmitOutcome::Rejected { reason };
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingAction { seq, action });
        SubmitOutcome::Accepted { seq }
    }

    /// Empties the queue in application order.
    pub fn drain_ordered(&mut self) -> Vec<NetworkAction> {
        self.pending
            .sort_by(|a, b| (a.action.timestamp, a.seq).cmp(&(b.action.timestamp, b.seq)));
        self.pending.drain(..).map(|p| p.action).collect()
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}
