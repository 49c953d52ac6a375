// Per-tick entity behaviors, invoked by the simulation engine in a fixed order.

pub mod enemies;
pub mod machines;
pub mod projectiles;
