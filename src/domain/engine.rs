// Fixed-timestep stepper over the canonical entity collections.

use crate::domain::entity::{Enemy, EntityKind, Machine, Projectile};
use crate::domain::systems::{enemies, machines, projectiles};
use crate::domain::tuning::{EnemyTuning, MachineTuning, ProjectileTuning};

/// Duration of one discrete simulation tick in milliseconds.
pub const TICK_MS: f64 = 1000.0 / 60.0;

/// Entity dropped from the canonical collections during a removal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedEntity {
    pub id: u64,
    pub kind: EntityKind,
}

/// Advances the world in whole ticks regardless of how irregularly the caller
/// supplies wall-clock time (accumulator pattern). The caller owns the entity
/// collections and lends them per call; leftover time below one tick stays in
/// the accumulator, so the same total delta produces the same tick sequence
/// however it is split across calls.
pub struct SimulationEngine {
    accumulated_ms: f64,
    machine_cfg: machines::MachineConfig,
    enemy_cfg: enemies::EnemyConfig,
    projectile_cfg: projectiles::ProjectileConfig,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::with_tuning(
            MachineTuning::default(),
            EnemyTuning::default(),
            ProjectileTuning::default(),
        )
    }

    pub fn with_tuning(
        machine: MachineTuning,
        enemy: EnemyTuning,
        projectile: ProjectileTuning,
    ) -> Self {
        Self {
            accumulated_ms: 0.0,
            machine_cfg: machines::MachineConfig {
                miner_interval_ticks: machine.miner_interval_ticks,
                inventory_cap: machine.inventory_cap,
            },
            enemy_cfg: enemies::EnemyConfig {
                melee_range: enemy.melee_range,
                attack_interval: enemy.attack_interval,
            },
            projectile_cfg: projectiles::ProjectileConfig {
                hit_radius: projectile.hit_radius,
            },
        }
    }

    /// Advances the world by `delta_ms` of wall-clock time, mutating the
    /// collections in place. Returns the entities removed across the ticks
    /// that ran, in removal order.
    pub fn update(
        &mut self,
        delta_ms: f64,
        machines: &mut Vec<Machine>,
        enemies: &mut Vec<Enemy>,
        projectiles: &mut Vec<Projectile>,
    ) -> Vec<RemovedEntity> {
        let mut removed = Vec::new();
        self.accumulated_ms += delta_ms;
        while self.accumulated_ms >= TICK_MS {
            self.accumulated_ms -= TICK_MS;
            self.step(machines, enemies, projectiles, &mut removed);
        }
        removed
    }

    // One discrete tick. Sub-pass order and collection iteration order are
    // part of the contract: the broadcast layer relies on identical inputs
    // producing identical state.
    fn step(
        &self,
        machines_v: &mut Vec<Machine>,
        enemies_v: &mut Vec<Enemy>,
        projectiles_v: &mut Vec<Projectile>,
        removed: &mut Vec<RemovedEntity>,
    ) {
        let dt = (TICK_MS / 1000.0) as f32;

        machines::tick_machines(machines_v, self.machine_cfg);
        enemies::tick_enemies(enemies_v, machines_v, dt, self.enemy_cfg);
        let hits = projectiles::tick_projectiles(projectiles_v, enemies_v, dt, self.projectile_cfg);

        enemies_v.retain(|e| {
            if e.health <= 0 {
                removed.push(RemovedEntity {
                    id: e.id,
                    kind: EntityKind::Enemy,
                });
                return false;
            }
            true
        });
        projectiles_v.retain(|p| {
            if hits.contains(&p.id) {
                removed.push(RemovedEntity {
                    id: p.id,
                    kind: EntityKind::Projectile,
                });
                return false;
            }
            true
        });
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Facing, GridPos, MachineKind, Vec2};
    use crate::domain::inventory;
    use crate::domain::recipe::MINER_RESOURCE;

    fn powered_miner(id: u64) -> Machine {
        Machine::new(id, MachineKind::Miner, GridPos::new(0, 0), Facing::North)
    }

    fn run_split(chunk_ms: f64, chunks: usize) -> u32 {
        let mut engine = SimulationEngine::new();
        let mut machines = vec![powered_miner(1)];
        let mut enemies = Vec::new();
        let mut projectiles = Vec::new();

        for _ in 0..chunks {
            engine.update(chunk_ms, &mut machines, &mut enemies, &mut projectiles);
        }
        inventory::count(&machines[0].inventory, MINER_RESOURCE)
    }

    #[test]
    fn same_total_delta_converges_regardless_of_split() {
        // 2013 ms total, fed as 61 chunks of 33 ms vs 122 chunks of 16.5 ms.
        let coarse = run_split(33.0, 61);
        let fine = run_split(16.5, 122);
        assert_eq!(coarse, fine);
        assert_eq!(coarse, 2);
    }

    #[test]
    fn sub_tick_deltas_accumulate_without_running_a_tick() {
        let mut engine = SimulationEngine::new();
        let mut machines = vec![powered_miner(1)];
        let mut enemies = Vec::new();
        let mut projectiles = Vec::new();

        engine.update(10.0, &mut machines, &mut enemies, &mut projectiles);
        assert_eq!(machines[0].progress, 0);

        engine.update(10.0, &mut machines, &mut enemies, &mut projectiles);
        assert_eq!(machines[0].progress, 1);
    }

    #[test]
    fn disconnected_miner_stays_empty_over_simulated_time() {
        let mut engine = SimulationEngine::new();
        let mut machines = vec![powered_miner(1)];
        machines[0].power.connected = false;
        let mut enemies = Vec::new();
        let mut projectiles = Vec::new();

        engine.update(2000.0, &mut machines, &mut enemies, &mut projectiles);
        assert!(machines[0].inventory.is_empty());
    }

    #[test]
    fn dead_enemy_and_spent_projectile_are_removed_with_ids_reported() {
        let mut engine = SimulationEngine::new();
        let mut machines = Vec::new();
        let mut enemies = vec![Enemy {
            id: 9,
            position: Vec2::new(5.0, 5.0),
            health: 5,
            max_health: 5,
            speed: 0.0,
            damage: 1,
            target: None,
            attack_cooldown: 0.0,
        }];
        let mut projectiles = vec![Projectile {
            id: 3,
            position: Vec2::new(5.2, 5.0),
            velocity: Vec2::new(0.0, 0.0),
            damage: 5,
        }];

        let removed = engine.update(TICK_MS, &mut machines, &mut enemies, &mut projectiles);

        assert!(enemies.is_empty());
        assert!(projectiles.is_empty());
        assert_eq!(
            removed,
            vec![
                RemovedEntity {
                    id: 9,
                    kind: EntityKind::Enemy
                },
                RemovedEntity {
                    id: 3,
                    kind: EntityKind::Projectile
                },
            ]
        );
    }
}
