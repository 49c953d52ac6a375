// Domain layer: core simulation types and rules.

pub mod engine;
pub mod entity;
pub mod inventory;
pub mod recipe;
pub mod systems;
pub mod tuning;

pub use engine::{RemovedEntity, SimulationEngine, TICK_MS};
pub use entity::{
    Enemy, EntityKind, Facing, GridPos, ItemStack, Machine, MachineKind, PowerState, Projectile,
    Vec2,
};
pub use recipe::{Recipe, RecipeItem};
