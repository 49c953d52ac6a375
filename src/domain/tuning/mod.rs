// Gameplay tuning, separated from runtime/server configuration.

pub mod enemy;
pub mod machine;
pub mod projectile;

pub use enemy::EnemyTuning;
pub use machine::MachineTuning;
pub use projectile::ProjectileTuning;
