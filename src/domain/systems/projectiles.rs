use crate::domain::entity::{Enemy, Projectile};
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct ProjectileConfig {
    pub hit_radius: f32,
}

/// Integrates projectile motion and resolves hits against enemies.
///
/// A projectile connects with at most one enemy per tick (first overlap in
/// collection order wins) and is spent on impact. Returns the ids of spent
/// projectiles; the engine's removal pass despawns them so every removal
/// happens in one place.
pub fn tick_projectiles(
    projectiles: &mut [Projectile],
    enemies: &mut [Enemy],
    dt: f32,
    cfg: ProjectileConfig,
) -> Vec<u64> {
    for p in projectiles.iter_mut() {
        p.position.x += p.velocity.x * dt;
        p.position.y += p.velocity.y * dt;
    }

    // Projectile vs enemy collision (naive O(P*E) for now).
    let hit_radius_sq = cfg.hit_radius * cfg.hit_radius;
    let mut hits = Vec::new();
    for p in projectiles.iter() {
        for e in enemies.iter_mut() {
            if e.health <= 0 {
                continue;
            }
            if p.position.distance_sq(e.position) < hit_radius_sq {
                e.health = (e.health - p.damage).max(0);
                info!(
                    enemy_id = e.id,
                    projectile_id = p.id,
                    enemy_health = e.health,
                    "enemy hit"
                );
                hits.push(p.id);
                break;
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Vec2;

    fn cfg() -> ProjectileConfig {
        ProjectileConfig { hit_radius: 1.0 }
    }

    fn enemy(id: u64, x: f32, y: f32, health: i32) -> Enemy {
        Enemy {
            id,
            position: Vec2::new(x, y),
            health,
            max_health: health,
            speed: 2.0,
            damage: 10,
            target: None,
            attack_cooldown: 0.0,
        }
    }

    #[test]
    fn projectile_advances_by_velocity() {
        let mut projectiles = vec![Projectile {
            id: 1,
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(60.0, 0.0),
            damage: 5,
        }];
        let mut enemies: Vec<Enemy> = Vec::new();

        let hits = tick_projectiles(&mut projectiles, &mut enemies, 1.0 / 60.0, cfg());
        assert!(hits.is_empty());
        assert!((projectiles[0].position.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn overlapping_projectile_damages_first_enemy_and_is_spent() {
        let mut projectiles = vec![Projectile {
            id: 7,
            position: Vec2::new(5.0, 5.0),
            velocity: Vec2::new(0.0, 0.0),
            damage: 5,
        }];
        let mut enemies = vec![enemy(1, 5.4, 5.0, 20), enemy(2, 5.5, 5.0, 20)];

        let hits = tick_projectiles(&mut projectiles, &mut enemies, 1.0 / 60.0, cfg());

        assert_eq!(hits, vec![7]);
        assert_eq!(enemies[0].health, 15);
        assert_eq!(enemies[1].health, 20);
    }

    #[test]
    fn out_of_range_enemy_is_untouched() {
        let mut projectiles = vec![Projectile {
            id: 7,
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(0.0, 0.0),
            damage: 5,
        }];
        let mut enemies = vec![enemy(1, 3.0, 0.0, 20)];

        let hits = tick_projectiles(&mut projectiles, &mut enemies, 1.0 / 60.0, cfg());
        assert!(hits.is_empty());
        assert_eq!(enemies[0].health, 20);
    }
}
