/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// World-space overlap radius for hit checks against enemies.
    pub hit_radius: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self { hit_radius: 1.0 }
    }
}
