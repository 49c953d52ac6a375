use crate::domain::entity::{Enemy, Machine};
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct EnemyConfig {
    pub melee_range: f32,
    pub attack_interval: f32,
}

/// Seek-and-melee AI: each enemy walks toward its remembered target machine
/// and swings once per attack interval while in range. An enemy whose target
/// is gone forgets it and idles until the wave system retargets it.
pub fn tick_enemies(enemies: &mut [Enemy], machines: &mut [Machine], dt: f32, cfg: EnemyConfig) {
    let range_sq = cfg.melee_range * cfg.melee_range;

    for e in enemies.iter_mut() {
        e.attack_cooldown = (e.attack_cooldown - dt).max(0.0);

        let Some(target_id) = e.target else {
            continue;
        };
        let Some(m) = machines.iter_mut().find(|m| m.id == target_id) else {
            e.target = None;
            continue;
        };

        let goal = m.position.center();
        let dist_sq = e.position.distance_sq(goal);
        if dist_sq > range_sq {
            // dist > melee_range > 0 here, so the division is safe.
            let dist = dist_sq.sqrt();
            let t = (e.speed * dt / dist).min(1.0);
            e.position.x += (goal.x - e.position.x) * t;
            e.position.y += (goal.y - e.position.y) * t;
        } else if e.attack_cooldown <= 0.0 {
            m.health = (m.health - e.damage).max(0);
            e.attack_cooldown = cfg.attack_interval;
            info!(
                enemy_id = e.id,
                machine_id = m.id,
                machine_health = m.health,
                "machine hit"
            );
        }
    }
}
