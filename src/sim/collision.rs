//! Collision resolution
//!
//! Bullets against enemies go through the spatial hash. The boss and the
//! player are singletons and are tested directly.

use glam::Vec2;
use rand::Rng;

use super::spatial::SpatialHash;
use super::state::{Boss, Enemy, GameEvent, GameState, PlayerStats, Telemetry, TextKind, WeaponId};
use crate::tuning::Tuning;

/// Stand-in enemy id so a piercing bullet strikes the boss once
const BOSS_HIT_ID: u32 = u32::MAX;

/// Apply crits to a base damage; returns the final damage and whether it crit
pub fn roll_damage<R: Rng>(rng: &mut R, stats: &PlayerStats, base: f32) -> (f32, bool) {
    let crit = stats.crit_chance > 0.0 && rng.random::<f32>() < stats.crit_chance;
    if crit {
        (base * stats.crit_multiplier, true)
    } else {
        (base, false)
    }
}

pub fn damage_enemy(enemy: &mut Enemy, telemetry: &mut Telemetry, amount: f32, source: WeaponId) {
    if !enemy.is_alive() || amount <= 0.0 {
        return;
    }
    enemy.hp -= amount;
    enemy.hit_this_frame = true;
    telemetry.record(source, amount);
}

pub fn damage_boss(boss: &mut Boss, telemetry: &mut Telemetry, amount: f32, source: WeaponId) {
    if boss.hp <= 0.0 || amount <= 0.0 {
        return;
    }
    boss.hp -= amount;
    boss.hit_this_frame = true;
    telemetry.record(source, amount);
}

/// Bullets against enemies via the 3×3 neighbor query
pub fn resolve_bullet_hits(state: &mut GameState, tuning: &Tuning, grid: &SpatialHash) -> Vec<(Vec2, f32)> {
    let slack = tuning.physics.bullet_hit_slack;
    let mut crits = Vec::new();

    for bullet in state.bullets.iter_mut().filter(|b| !b.dead) {
        for idx in grid.neighbors(bullet.pos) {
            if bullet.dead {
                break;
            }
            let Some(enemy) = state.enemies.get_mut(idx) else {
                continue;
            };
            if !enemy.is_alive() || bullet.hit_ids.contains(&enemy.id) {
                continue;
            }
            let reach = enemy.radius + slack;
            if enemy.pos.distance_squared(bullet.pos) >= reach * reach {
                continue;
            }
            let (amount, crit) = roll_damage(&mut state.rng, &state.player.stats, bullet.damage);
            damage_enemy(enemy, &mut state.telemetry, amount, bullet.source);
            bullet.hit_ids.push(enemy.id);
            bullet.consume_hit();
            if crit {
                crits.push((enemy.pos, amount));
            }
        }
    }
    crits
}

/// Bullets against the boss, same hit rule as enemies
pub fn resolve_boss_hits(state: &mut GameState, tuning: &Tuning) -> Vec<(Vec2, f32)> {
    let mut crits = Vec::new();
    let Some(boss) = state.boss.as_mut() else {
        return crits;
    };
    let reach = boss.radius + tuning.physics.bullet_hit_slack;

    for bullet in state.bullets.iter_mut().filter(|b| !b.dead) {
        if boss.hp <= 0.0 {
            break;
        }
        if bullet.hit_ids.contains(&BOSS_HIT_ID) || boss.pos.distance_squared(bullet.pos) >= reach * reach {
            continue;
        }
        let (amount, crit) = roll_damage(&mut state.rng, &state.player.stats, bullet.damage);
        damage_boss(boss, &mut state.telemetry, amount, bullet.source);
        bullet.hit_ids.push(BOSS_HIT_ID);
        bullet.consume_hit();
        if crit {
            crits.push((boss.pos, amount));
        }
    }
    crits
}

/// Continuous overlap damage from enemies and the boss
pub fn apply_contact_damage(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let player = &state.player;
    if player.dead {
        return;
    }
    let per_second = tuning.enemy.contact_dps * (1.0 + state.wave * tuning.enemy.contact_wave_scale);

    let touching = state
        .enemies
        .iter()
        .filter(|e| e.is_alive() && e.pos.distance(player.pos) < e.radius + player.radius)
        .count();
    let mut raw = per_second * touching as f32 * dt;
    if let Some(boss) = &state.boss {
        if boss.pos.distance(player.pos) < boss.radius + player.radius {
            raw += per_second * tuning.boss.contact_mult * dt;
        }
    }

    if raw > 0.0 {
        let taken = state.player.take_damage(raw);
        state.events.push(GameEvent::PlayerHit { amount: taken });
    }
}

/// Every collision pass for one tick; dead bullets are dropped at the end
pub fn resolve_collisions(state: &mut GameState, tuning: &Tuning, grid: &SpatialHash, dt: f32) {
    let mut crits = resolve_bullet_hits(state, tuning, grid);
    crits.extend(resolve_boss_hits(state, tuning));
    state.bullets.retain(|b| !b.dead);

    for (pos, amount) in crits {
        state.push_text(pos, format!("{}!", crate::format_amount(amount as f64)), TextKind::Crit, tuning);
    }

    apply_contact_damage(state, tuning, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Bullet, EnemyType, Variant};

    fn spawn(state: &mut GameState, pos: Vec2, hp: f32) -> usize {
        let id = state.next_entity_id();
        state.enemies.push(Enemy {
            id,
            pos,
            vel: Vec2::ZERO,
            radius: 10.0,
            hp,
            max_hp: hp,
            speed: 40.0,
            reward: 1.0,
            fire_timer: 0.0,
            fire_delay: 0.0,
            elite: false,
            kind: EnemyType::Normal,
            variant: Variant::Chaser,
            generation: 0,
            hit_this_frame: false,
        });
        state.enemies.len() - 1
    }

    fn setup() -> (Tuning, GameState) {
        let mut tuning = Tuning::default();
        tuning.player.crit_chance = 0.0;
        let state = GameState::new(5, &tuning);
        (tuning, state)
    }

    fn rebuild(state: &mut GameState) {
        let entries: Vec<(usize, Vec2)> = state.enemies.iter().enumerate().map(|(i, e)| (i, e.pos)).collect();
        state.grid.rebuild(entries);
    }

    fn bullet(pos: Vec2, damage: f32, pierce: u32) -> Bullet {
        Bullet::new(pos, Vec2::ZERO, 1.0, damage, pierce, WeaponId::Spread)
    }

    #[test]
    fn test_bullet_without_pierce_hits_once() {
        let (tuning, mut state) = setup();
        let p = Vec2::new(300.0, 300.0);
        let a = spawn(&mut state, p, 50.0);
        let b = spawn(&mut state, p + Vec2::new(2.0, 0.0), 50.0);
        state.bullets.push(bullet(p, 10.0, 0));
        rebuild(&mut state);
        let grid = std::mem::take(&mut state.grid);
        resolve_collisions(&mut state, &tuning, &grid, 0.016);
        let total = state.enemies[a].hp + state.enemies[b].hp;
        assert_eq!(total, 90.0);
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn test_pierce_one_survives_one_hit() {
        let (tuning, mut state) = setup();
        let p = Vec2::new(300.0, 300.0);
        spawn(&mut state, p, 50.0);
        state.bullets.push(bullet(p, 10.0, 1));
        rebuild(&mut state);
        let grid = std::mem::take(&mut state.grid);
        resolve_collisions(&mut state, &tuning, &grid, 0.016);
        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.bullets[0].pierce, 0);

        // Same enemy is never struck twice by one bullet
        resolve_collisions(&mut state, &tuning, &grid, 0.016);
        assert_eq!(state.enemies[0].hp, 40.0);
        assert_eq!(state.bullets.len(), 1);

        // A second enemy spends the last hit
        spawn(&mut state, p, 50.0);
        rebuild(&mut state);
        let grid = std::mem::take(&mut state.grid);
        resolve_collisions(&mut state, &tuning, &grid, 0.016);
        assert!(state.bullets.is_empty());
        assert_eq!(state.enemies[1].hp, 40.0);
    }

    #[test]
    fn test_bullet_misses_outside_slack() {
        let (tuning, mut state) = setup();
        let p = Vec2::new(300.0, 300.0);
        spawn(&mut state, p, 50.0);
        let reach = 10.0 + tuning.physics.bullet_hit_slack;
        state.bullets.push(bullet(p + Vec2::new(reach + 0.5, 0.0), 10.0, 0));
        rebuild(&mut state);
        let grid = std::mem::take(&mut state.grid);
        resolve_collisions(&mut state, &tuning, &grid, 0.016);
        assert_eq!(state.enemies[0].hp, 50.0);
        assert_eq!(state.bullets.len(), 1);
    }

    #[test]
    fn test_crit_always_multiplies() {
        let (mut tuning, mut state) = setup();
        tuning.player.crit_chance = 1.0;
        state.player.stats.crit_chance = 1.0;
        state.player.stats.crit_multiplier = 3.0;
        let p = Vec2::new(300.0, 300.0);
        spawn(&mut state, p, 100.0);
        state.bullets.push(bullet(p, 10.0, 0));
        rebuild(&mut state);
        let grid = std::mem::take(&mut state.grid);
        resolve_collisions(&mut state, &tuning, &grid, 0.016);
        assert_eq!(state.enemies[0].hp, 70.0);
        assert!(state.floating_text.iter().any(|t| t.kind == TextKind::Crit));
    }

    #[test]
    fn test_contact_damage_scales_with_wave() {
        let (tuning, mut state) = setup();
        let p = state.player.pos;
        spawn(&mut state, p, 50.0);
        state.wave = 10.0;
        apply_contact_damage(&mut state, &tuning, 0.1);
        let expected = tuning.enemy.contact_dps * (1.0 + 10.0 * tuning.enemy.contact_wave_scale) * 0.1;
        assert!((state.player.max_hp - state.player.hp - expected).abs() < 1e-3);
    }

    #[test]
    fn test_damage_ignores_dead_enemy() {
        let (_, mut state) = setup();
        let idx = spawn(&mut state, Vec2::ZERO, 5.0);
        damage_enemy(&mut state.enemies[idx], &mut state.telemetry, 10.0, WeaponId::Spread);
        damage_enemy(&mut state.enemies[idx], &mut state.telemetry, 10.0, WeaponId::Spread);
        assert_eq!(state.enemies[idx].hp, -5.0);
        assert_eq!(state.telemetry.damage[WeaponId::Spread.index()], 10.0);
    }
}
