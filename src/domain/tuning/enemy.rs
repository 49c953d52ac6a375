/// Gameplay tuning for enemy movement and melee.

#[derive(Debug, Clone, Copy)]
pub struct EnemyTuning {
    /// World-space distance at which an enemy stops seeking and swings.
    pub melee_range: f32,

    /// Seconds between melee swings against the held target.
    pub attack_interval: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            melee_range: 1.5,
            attack_interval: 1.0,
        }
    }
}
