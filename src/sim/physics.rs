//! Projectile and fragment integration
//!
//! Runs every tick independent of weapon cooldowns.

use glam::Vec2;

use super::collision::{damage_boss, damage_enemy, roll_damage};
use super::spatial::SpatialHash;
use super::state::{FragmentOrb, GameEvent, GameState, WeaponId};
use super::weapons::nearest_target;
use crate::tuning::Tuning;

/// True when `pos` left the canvas by more than `padding`
#[inline]
pub fn out_of_bounds(pos: Vec2, bounds: Vec2, padding: f32) -> bool {
    pos.x < -padding || pos.y < -padding || pos.x > bounds.x + padding || pos.y > bounds.y + padding
}

/// Rotate `vel` toward `to_target` by at most `max_turn` radians, keeping `speed`
pub fn steer_toward(vel: Vec2, to_target: Vec2, max_turn: f32, speed: f32) -> Vec2 {
    if to_target.length_squared() <= f32::EPSILON {
        return vel.normalize_or(Vec2::X) * speed;
    }
    let heading = vel.y.atan2(vel.x);
    let desired = to_target.y.atan2(to_target.x);
    let mut diff = desired - heading;
    // Shortest signed angle
    diff = (diff + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU) - std::f32::consts::PI;
    let turn = diff.clamp(-max_turn, max_turn);
    Vec2::from_angle(heading + turn) * speed
}

pub fn update_bullets(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let bounds = state.bounds;
    let padding = tuning.physics.bullet_padding;
    for bullet in &mut state.bullets {
        bullet.pos += bullet.vel * dt;
        bullet.life -= dt;
        if bullet.life <= 0.0 || out_of_bounds(bullet.pos, bounds, padding) {
            bullet.dead = true;
        }
    }
    state.bullets.retain(|b| !b.dead);
}

/// Move enemy projectiles and resolve hits on the player
pub fn update_enemy_projectiles(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let bounds = state.bounds;
    let padding = tuning.physics.bullet_padding;
    let player = &mut state.player;
    let mut taken = 0.0;

    state.enemy_projectiles.retain_mut(|p| {
        p.pos += p.vel * dt;
        p.life -= dt;
        if p.life <= 0.0 || out_of_bounds(p.pos, bounds, padding) {
            return false;
        }
        let reach = p.radius + player.radius;
        if !player.dead && p.pos.distance_squared(player.pos) < reach * reach {
            taken += player.take_damage(p.damage);
            return false;
        }
        true
    });

    if taken > 0.0 {
        state.events.push(GameEvent::PlayerHit { amount: taken });
    }
}

/// Steer, move and collide homing missiles
pub fn update_missiles(state: &mut GameState, grid: &SpatialHash, dt: f32) {
    let bounds = state.bounds;
    for i in 0..state.missiles.len() {
        let target = nearest_target(state, state.missiles[i].pos);
        let missile = &mut state.missiles[i];
        if let Some(target) = target {
            missile.vel = steer_toward(
                missile.vel,
                target - missile.pos,
                missile.turn_rate * dt,
                missile.speed,
            );
        }
        missile.pos += missile.vel * dt;
        missile.life -= dt;
        if missile.life <= 0.0 || out_of_bounds(missile.pos, bounds, missile.radius * 4.0) {
            missile.dead = true;
            continue;
        }

        let pos = missile.pos;
        let radius = missile.radius;
        let hit = grid.neighbors(pos).find(|&idx| {
            state.enemies.get(idx).is_some_and(|e| {
                let reach = e.radius + radius;
                e.is_alive() && e.pos.distance_squared(pos) < reach * reach
            })
        });
        if let Some(idx) = hit {
            let (amount, _) = roll_damage(&mut state.rng, &state.player.stats, missile.damage);
            damage_enemy(&mut state.enemies[idx], &mut state.telemetry, amount, WeaponId::Missiles);
            missile.dead = true;
            continue;
        }

        if let Some(boss) = state.boss.as_mut() {
            let reach = boss.radius + radius;
            if boss.hp > 0.0 && boss.pos.distance_squared(pos) < reach * reach {
                let (amount, _) = roll_damage(&mut state.rng, &state.player.stats, missile.damage);
                damage_boss(boss, &mut state.telemetry, amount, WeaponId::Missiles);
                missile.dead = true;
            }
        }
    }
    state.missiles.retain(|m| !m.dead);
}

/// Merge orbs closer than `radius`: values add, velocities average, one orb
/// is removed per merge. Returns the number of merges.
pub fn fuse_fragments(orbs: &mut Vec<FragmentOrb>, radius: f32) -> usize {
    let r2 = radius * radius;
    let mut merges = 0;
    let mut i = 0;
    while i < orbs.len() {
        let mut j = i + 1;
        while j < orbs.len() {
            if orbs[i].pos.distance_squared(orbs[j].pos) <= r2 {
                let other = orbs.swap_remove(j);
                let keep = &mut orbs[i];
                keep.value += other.value;
                keep.vel = (keep.vel + other.vel) * 0.5;
                keep.life = keep.life.max(other.life);
                merges += 1;
                // swap_remove moved an unchecked orb into slot j
            } else {
                j += 1;
            }
        }
        i += 1;
    }
    merges
}

/// Fusion, forces, integration, bounce, pickup and expiry
pub fn update_fragments(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let phys = &tuning.physics;
    fuse_fragments(&mut state.fragments, phys.fusion_radius);

    let bounds = state.bounds;
    let player_pos = state.player.pos;
    let collect_radius = state.player.stats.collection_radius;
    let pickup = state.player.radius + phys.pickup_radius;
    let drag = (1.0 - phys.fragment_drag).clamp(0.0, 1.0).powf(dt * 60.0);
    let r = phys.fragment_radius;
    let floor = bounds.y - r;

    let mut collected = 0.0;
    let mut expired = 0.0;
    let events = &mut state.events;

    state.fragments.retain_mut(|orb| {
        orb.vel.y += phys.fragment_gravity * dt;
        orb.vel *= drag;

        let to_player = player_pos - orb.pos;
        let dist = to_player.length();
        if dist < collect_radius && dist > f32::EPSILON {
            let ratio = dist / collect_radius;
            let strength = phys.attract_accel * (1.0 + (1.0 - ratio).powf(2.5) * 4.0);
            orb.vel += to_player / dist * strength * dt;
        }

        orb.pos += orb.vel * dt;

        if orb.pos.y > floor {
            orb.pos.y = floor;
            if orb.vel.y > 0.0 {
                orb.vel.y = -orb.vel.y * phys.floor_bounce;
                orb.vel.x *= phys.floor_friction;
            }
        }
        if orb.pos.x < r {
            orb.pos.x = r;
            orb.vel.x = orb.vel.x.abs() * phys.wall_bounce;
        } else if orb.pos.x > bounds.x - r {
            orb.pos.x = bounds.x - r;
            orb.vel.x = -orb.vel.x.abs() * phys.wall_bounce;
        }

        if orb.pos.distance(player_pos) <= pickup {
            collected += orb.value;
            events.push(GameEvent::FragmentCollected {
                pos: orb.pos,
                value: orb.value,
            });
            return false;
        }

        orb.life -= dt;
        if orb.life <= 0.0 {
            expired += orb.value;
            return false;
        }
        true
    });

    state.resources.fragments += collected + expired;
    if expired > 0.0 {
        state.ticker.fragments += expired;
        state.ticker.timer = tuning.fx.ticker_hold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Bullet, EnemyProjectile};

    fn orb(pos: Vec2, vel: Vec2, value: f64) -> FragmentOrb {
        FragmentOrb {
            pos,
            vel,
            value,
            life: 10.0,
        }
    }

    #[test]
    fn test_fusion_merges_exactly_one() {
        let mut orbs = vec![
            orb(Vec2::new(100.0, 100.0), Vec2::new(10.0, 0.0), 2.0),
            orb(Vec2::new(104.0, 100.0), Vec2::new(-4.0, 6.0), 3.0),
        ];
        assert_eq!(fuse_fragments(&mut orbs, 9.0), 1);
        assert_eq!(orbs.len(), 1);
        assert_eq!(orbs[0].value, 5.0);
        assert_eq!(orbs[0].vel, Vec2::new(3.0, 3.0));
    }

    #[test]
    fn test_fusion_ignores_distant_orbs() {
        let mut orbs = vec![
            orb(Vec2::new(0.0, 0.0), Vec2::ZERO, 1.0),
            orb(Vec2::new(50.0, 0.0), Vec2::ZERO, 1.0),
        ];
        assert_eq!(fuse_fragments(&mut orbs, 9.0), 0);
        assert_eq!(orbs.len(), 2);
    }

    #[test]
    fn test_fusion_conserves_value() {
        let mut orbs: Vec<FragmentOrb> = (0..10)
            .map(|i| orb(Vec2::new(i as f32 * 3.0, 0.0), Vec2::ZERO, 1.0))
            .collect();
        fuse_fragments(&mut orbs, 9.0);
        let total: f64 = orbs.iter().map(|o| o.value).sum();
        assert_eq!(total, 10.0);
        assert!(orbs.len() < 10);
    }

    #[test]
    fn test_steer_toward_clamps_turn() {
        let vel = Vec2::new(100.0, 0.0);
        // Target straight behind: turn is limited to max_turn
        let out = steer_toward(vel, Vec2::new(0.0, 50.0), 0.1, 100.0);
        let angle = out.y.atan2(out.x);
        assert!((angle - 0.1).abs() < 1e-4);
        assert!((out.length() - 100.0).abs() < 1e-3);
        // Small corrections land exactly
        let out = steer_toward(vel, Vec2::new(100.0, 5.0), 1.0, 100.0);
        assert!((out.y.atan2(out.x) - 0.05f32.atan()).abs() < 1e-3);
    }

    #[test]
    fn test_bullets_expire_and_leave_bounds() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.bullets.push(Bullet::new(Vec2::new(100.0, 100.0), Vec2::X, 0.05, 1.0, 0, WeaponId::Spread));
        state.bullets.push(Bullet::new(Vec2::new(-30.0, 100.0), Vec2::new(-200.0, 0.0), 5.0, 1.0, 0, WeaponId::Spread));
        state.bullets.push(Bullet::new(Vec2::new(200.0, 200.0), Vec2::X, 5.0, 1.0, 0, WeaponId::Spread));
        update_bullets(&mut state, &tuning, 0.1);
        assert_eq!(state.bullets.len(), 1);
        assert!(state.bullets[0].pos.distance(Vec2::new(200.1, 200.0)) < 1e-3);
    }

    #[test]
    fn test_enemy_projectile_hits_player_with_reduction() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.player.stats.damage_reduction = 0.5;
        let pos = state.player.pos;
        state.enemy_projectiles.push(EnemyProjectile {
            pos,
            vel: Vec2::ZERO,
            life: 1.0,
            damage: 10.0,
            radius: 4.0,
        });
        update_enemy_projectiles(&mut state, &tuning, 0.016);
        assert!(state.enemy_projectiles.is_empty());
        assert!((state.player.hp - (state.player.max_hp - 5.0)).abs() < 1e-4);
        assert_eq!(state.events, vec![GameEvent::PlayerHit { amount: 5.0 }]);
    }

    #[test]
    fn test_fragment_pickup_credits_resources() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let pos = state.player.pos;
        state.fragments.push(orb(pos, Vec2::ZERO, 4.0));
        update_fragments(&mut state, &tuning, 0.016);
        assert!(state.fragments.is_empty());
        assert_eq!(state.resources.fragments, 4.0);
    }

    #[test]
    fn test_fragment_bounces_off_floor() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.player.stats.collection_radius = 0.0;
        let floor = state.bounds.y - tuning.physics.fragment_radius;
        state.fragments.push(orb(Vec2::new(20.0, floor - 1.0), Vec2::new(0.0, 300.0), 1.0));
        update_fragments(&mut state, &tuning, 0.02);
        let f = &state.fragments[0];
        assert_eq!(f.pos.y, floor);
        assert!(f.vel.y < 0.0);
    }

    #[test]
    fn test_attraction_pulls_orb_toward_player() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let mut no_gravity = tuning.clone();
        no_gravity.physics.fragment_gravity = 0.0;
        let start = state.player.pos + Vec2::new(60.0, 0.0);
        state.fragments.push(orb(start, Vec2::ZERO, 1.0));
        update_fragments(&mut state, &no_gravity, 0.016);
        assert!(state.fragments[0].vel.x < 0.0);
    }

    #[test]
    fn test_expired_fragment_goes_to_ticker() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.player.stats.collection_radius = 0.0;
        let mut o = orb(Vec2::new(20.0, 20.0), Vec2::ZERO, 2.5);
        o.life = 0.01;
        state.fragments.push(o);
        update_fragments(&mut state, &tuning, 0.02);
        assert!(state.fragments.is_empty());
        assert_eq!(state.ticker.fragments, 2.5);
        assert_eq!(state.resources.fragments, 2.5);
    }
}
