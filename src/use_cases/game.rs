use crate::domain::{Enemy, Machine, Projectile, SimulationEngine};
use crate::use_cases::actions::SubmitOutcome;
use crate::use_cases::sync::{HostSync, removal_events};
use crate::use_cases::types::{SessionEvent, SessionStatus, StateDelta, now_ms};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{info, warn};

/// Authoritative world loop for one session.
///
/// Single writer of the entity collections: events drain at tick start, the
/// accepted action queue is applied in timestamp order, then the engine runs
/// unless paused. Everything the tick produced leaves as one broadcast delta.
pub async fn world_task(
    mut input_rx: mpsc::Receiver<SessionEvent>,
    delta_tx: broadcast::Sender<StateDelta>,
    status_tx: watch::Sender<SessionStatus>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut engine = SimulationEngine::new();
    let mut sync = HostSync::new();
    let mut machines: Vec<Machine> = Vec::new();
    let mut enemies: Vec<Enemy> = Vec::new();
    let mut projectiles: Vec<Projectile> = Vec::new();

    let _ = status_tx.send(SessionStatus::Active);

    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    let elapsed_ms = tick_interval.as_secs_f64() * 1000.0;

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the session is destroyed.
                let _ = status_tx.send(SessionStatus::Ended);
                break;
            }
            _ = interval.tick() => {}
        }

        // Drain events accepted since the previous tick. Actions arriving
        // after this point wait for the next tick.
        while let Ok(ev) = input_rx.try_recv() {
            match ev {
                SessionEvent::Join {
                    player_id,
                    display_name,
                } => {
                    info!(%player_id, %display_name, "player joined world");
                }
                SessionEvent::Leave { player_id } => {
                    info!(%player_id, "player left world");
                }
                SessionEvent::Action(action) => {
                    match sync.submit_action(action, now_ms()) {
                        SubmitOutcome::Accepted { .. } => {}
                        SubmitOutcome::Rejected { reason } => {
                            // The connection layer validates before forwarding,
                            // so this path only fires on a racing clock.
                            warn!(reason = reason.as_str(), "action rejected at queue");
                        }
                    }
                }
            }
        }

        let mut events = sync.apply_actions(&mut machines);
        if !sync.is_paused() {
            // Pause halts physics and production; action processing above
            // keeps running so un-pause stays reachable.
            let removed = engine.update(elapsed_ms, &mut machines, &mut enemies, &mut projectiles);
            events.extend(removal_events(&removed));
        }

        let delta = sync.finish_tick(now_ms(), &machines, &enemies, &projectiles, events);
        let _ = delta_tx.send(delta);
    }
}
