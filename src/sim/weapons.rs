//! Weapon firing
//!
//! Each weapon reads the player's stat bundle and pushes bullets, missiles,
//! bolts or beams into the shared state. Final stats are the per-weapon level
//! curve times global multipliers, so stat upgrades reach every weapon
//! without weapon-specific code.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::collision::{damage_boss, damage_enemy};
use super::state::{Bullet, GameState, HomingMissile, LaserBeam, LightningBolt, PlayerStats, WeaponId};
use crate::point_segment_distance;
use crate::tuning::{
    BASE_BULLET_SPEED, BASE_DAMAGE, BASE_FIRE_DELAY, BASE_RANGE, Tuning, WeaponBase,
};

/// Player stats relative to the fixed baselines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub damage: f32,
    pub rate: f32,
    pub range: f32,
    pub speed: f32,
}

impl Multipliers {
    pub fn from_stats(stats: &PlayerStats) -> Self {
        Self {
            damage: stats.damage / BASE_DAMAGE,
            rate: BASE_FIRE_DELAY / stats.fire_delay.max(0.01),
            range: stats.range / BASE_RANGE,
            speed: stats.bullet_speed / BASE_BULLET_SPEED,
        }
    }
}

/// Final stats of one weapon at one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub damage: f32,
    pub cooldown: f32,
    pub range: f32,
    pub bullet_speed: f32,
}

/// Everything a fire function needs besides the state
#[derive(Debug, Clone, Copy)]
pub struct WeaponContext {
    pub level: u32,
    pub mults: Multipliers,
    pub stats: WeaponStats,
}

impl WeaponContext {
    /// Projectiles granted by weapon level alone
    pub fn level_bonus(&self, tuning: &Tuning) -> u32 {
        self.level.saturating_sub(1) / tuning.weapons.levels_per_extra_projectile.max(1)
    }
}

pub fn weapon_base(tuning: &Tuning, id: WeaponId) -> &WeaponBase {
    match id {
        WeaponId::Spread => &tuning.weapons.spread,
        WeaponId::Orbit => &tuning.weapons.orbit,
        WeaponId::Lightning => &tuning.weapons.lightning,
        WeaponId::Laser => &tuning.weapons.laser,
        WeaponId::Missiles => &tuning.weapons.missiles,
    }
}

pub fn weapon_stats(
    tuning: &Tuning,
    id: WeaponId,
    level: u32,
    player: &PlayerStats,
    mults: &Multipliers,
) -> WeaponStats {
    let base = weapon_base(tuning, id);
    let base_cooldown = match id {
        // The ring fires on the player's own orbit timer
        WeaponId::Orbit => {
            player.orbit_fire_delay * base.cooldown_level_mult.powi(level.saturating_sub(1) as i32)
        }
        _ => base.cooldown_at(level),
    };
    WeaponStats {
        damage: base.damage_at(level) * mults.damage,
        cooldown: base_cooldown / mults.rate.max(0.01),
        range: base.range_at(level) * mults.range,
        bullet_speed: player.bullet_speed,
    }
}

/// Fire function; returns true when the weapon actually fired
pub type FireFn = fn(&mut GameState, &Tuning, &WeaponContext, f32) -> bool;

pub struct WeaponBehavior {
    pub id: WeaponId,
    /// Continuous weapons run every tick instead of waiting on a cooldown
    pub cooldown_gated: bool,
    pub fire: FireFn,
}

/// Fixed dispatch table, one row per [`WeaponId`]
pub const WEAPON_TABLE: [WeaponBehavior; WeaponId::COUNT] = [
    WeaponBehavior {
        id: WeaponId::Spread,
        cooldown_gated: true,
        fire: fire_spread,
    },
    WeaponBehavior {
        id: WeaponId::Orbit,
        cooldown_gated: true,
        fire: fire_orbit,
    },
    WeaponBehavior {
        id: WeaponId::Lightning,
        cooldown_gated: true,
        fire: fire_lightning,
    },
    WeaponBehavior {
        id: WeaponId::Laser,
        cooldown_gated: false,
        fire: fire_laser,
    },
    WeaponBehavior {
        id: WeaponId::Missiles,
        cooldown_gated: true,
        fire: fire_missiles,
    },
];

/// Advance the orbit ring and run every active weapon once
pub fn update_weapons(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let mults = Multipliers::from_stats(&state.player.stats);
    advance_orbit_ring(state, tuning, &mults, dt);
    state.beams.clear();

    for behavior in &WEAPON_TABLE {
        if !state.loadout.is_active(behavior.id) {
            continue;
        }
        let level = state.loadout.get(behavior.id).level;
        let ctx = WeaponContext {
            level,
            mults,
            stats: weapon_stats(tuning, behavior.id, level, &state.player.stats, &mults),
        };

        if !behavior.cooldown_gated {
            (behavior.fire)(state, tuning, &ctx, dt);
            continue;
        }

        let slot = state.loadout.get_mut(behavior.id);
        slot.cooldown -= dt;
        if slot.cooldown > 0.0 {
            continue;
        }
        let fired = (behavior.fire)(state, tuning, &ctx, dt);
        // Hold at zero while there is nothing to shoot at
        state.loadout.get_mut(behavior.id).cooldown = if fired { ctx.stats.cooldown } else { 0.0 };
    }
}

/// Number of orbs the ring should show for the current stats
pub fn orbit_orb_count(stats: &PlayerStats, tuning: &Tuning) -> u32 {
    let w = &tuning.weapons;
    let bonus = (stats.extra_projectiles() as f32 * w.orbit_per_extra).floor() as u32;
    (stats.orbit_count + bonus).min(w.max_orbs)
}

/// Spin the ring and rebuild orb positions; runs whether or not it fires
pub fn advance_orbit_ring(state: &mut GameState, tuning: &Tuning, mults: &Multipliers, dt: f32) {
    state.orbit_orbs.clear();
    if !state.loadout.is_active(WeaponId::Orbit) {
        return;
    }
    let spin = tuning.weapons.orbit_spin * mults.speed;
    let stats = &mut state.player.stats;
    stats.spin_phase = (stats.spin_phase + spin * dt).rem_euclid(TAU);

    let count = orbit_orb_count(stats, tuning);
    let phase = stats.spin_phase;
    let center = state.player.pos;
    let radius = tuning.weapons.orbit_radius;
    for i in 0..count {
        let angle = phase + i as f32 * TAU / count as f32;
        state.orbit_orbs.push(center + Vec2::from_angle(angle) * radius);
    }
}

/// Append a bullet, evicting the oldest when the budget is full
pub fn spawn_bullet(state: &mut GameState, tuning: &Tuning, bullet: Bullet) {
    let max = tuning.fx.max_bullets;
    if max == 0 {
        return;
    }
    if state.bullets.len() >= max {
        let overflow = state.bullets.len() + 1 - max;
        state.bullets.drain(..overflow);
    }
    state.bullets.push(bullet);
}

/// Nearest live enemy or boss position
pub fn nearest_target(state: &GameState, from: Vec2) -> Option<Vec2> {
    let enemy = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| (e.pos.distance_squared(from), e.pos))
        .min_by(|a, b| a.0.total_cmp(&b.0));
    let boss = state
        .boss
        .as_ref()
        .filter(|b| b.hp > 0.0)
        .map(|b| (b.pos.distance_squared(from), b.pos));
    match (enemy, boss) {
        (Some(e), Some(b)) => Some(if b.0 < e.0 { b.1 } else { e.1 }),
        (Some(e), None) => Some(e.1),
        (None, Some(b)) => Some(b.1),
        (None, None) => None,
    }
}

fn fire_spread(state: &mut GameState, tuning: &Tuning, ctx: &WeaponContext, _dt: f32) -> bool {
    let shots = 1 + state.player.stats.extra_projectiles() + ctx.level_bonus(tuning);
    let origin = state.player.pos;
    let aim = match nearest_target(state, origin) {
        Some(target) => {
            let d = target - origin;
            d.y.atan2(d.x)
        }
        // Idle sweep when nothing is alive
        None => state.time * 1.5,
    };

    let cone = tuning.weapons.spread_cone;
    let speed = ctx.stats.bullet_speed.max(1.0);
    let life = (ctx.stats.range / speed).min(tuning.weapons.bullet_lifetime);
    let pierce = state.player.stats.pierce;
    for i in 0..shots {
        let offset = if shots == 1 {
            0.0
        } else {
            -cone * 0.5 + cone * i as f32 / (shots - 1) as f32
        };
        let vel = Vec2::from_angle(aim + offset) * speed;
        let bullet = Bullet::new(origin, vel, life, ctx.stats.damage, pierce, WeaponId::Spread);
        spawn_bullet(state, tuning, bullet);
    }
    true
}

fn fire_orbit(state: &mut GameState, tuning: &Tuning, ctx: &WeaponContext, _dt: f32) -> bool {
    if state.orbit_orbs.is_empty() {
        return false;
    }
    let center = state.player.pos;
    let speed = ctx.stats.bullet_speed.max(1.0);
    let life = (ctx.stats.range / speed).min(tuning.weapons.bullet_lifetime);
    let pierce = state.player.stats.pierce;
    let orbs = state.orbit_orbs.clone();
    for orb in orbs {
        let dir = (orb - center).normalize_or(Vec2::X);
        let bullet = Bullet::new(orb, dir * speed, life, ctx.stats.damage, pierce, WeaponId::Orbit);
        spawn_bullet(state, tuning, bullet);
    }
    true
}

/// Zig-zag polyline from `from` to `to` for bolt rendering
fn jagged_path<R: Rng>(rng: &mut R, from: Vec2, to: Vec2, jitter: f32) -> Vec<Vec2> {
    const SEGMENTS: usize = 6;
    let dir = to - from;
    let normal = dir.perp().normalize_or_zero();
    let mut points = Vec::with_capacity(SEGMENTS + 1);
    points.push(from);
    for i in 1..SEGMENTS {
        let t = i as f32 / SEGMENTS as f32;
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..jitter)
        } else {
            0.0
        };
        points.push(from + dir * t + normal * offset);
    }
    points.push(to);
    points
}

fn push_bolt(state: &mut GameState, tuning: &Tuning, points: Vec<Vec2>) {
    if tuning.fx.max_bolts == 0 {
        return;
    }
    if state.bolts.len() >= tuning.fx.max_bolts {
        state.bolts.remove(0);
    }
    let life = tuning.weapons.bolt_life;
    state.bolts.push(LightningBolt {
        points,
        life,
        max_life: life,
    });
}

/// Chain lightning. Falloff compounds: hop `n` deals `damage * chain_falloff^n`.
fn fire_lightning(state: &mut GameState, tuning: &Tuning, ctx: &WeaponContext, _dt: f32) -> bool {
    let w = &tuning.weapons;
    let origin = state.player.pos;
    let range = ctx.stats.range;

    let candidates: Vec<usize> = state
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_alive() && e.pos.distance(origin) <= range)
        .map(|(i, _)| i)
        .collect();

    if candidates.is_empty() {
        let Some(boss) = state.boss.as_mut() else {
            return false;
        };
        if boss.pos.distance(origin) > range + boss.radius {
            return false;
        }
        let target = boss.pos;
        damage_boss(boss, &mut state.telemetry, ctx.stats.damage, WeaponId::Lightning);
        let path = jagged_path(&mut state.rng, origin, target, w.bolt_jitter);
        push_bolt(state, tuning, path);
        return true;
    }

    let primary = candidates[state.rng.random_range(0..candidates.len())];
    let mut damage = ctx.stats.damage;
    let mut hit = vec![primary];
    damage_enemy(&mut state.enemies[primary], &mut state.telemetry, damage, WeaponId::Lightning);
    let mut path = jagged_path(&mut state.rng, origin, state.enemies[primary].pos, w.bolt_jitter);

    let chain_range = range * w.chain_range_ratio;
    let chains = w.chain_count + ctx.level_bonus(tuning);
    let mut current = primary;
    for _ in 0..chains {
        let from = state.enemies[current].pos;
        let next = state
            .enemies
            .iter()
            .enumerate()
            .filter(|(i, e)| e.is_alive() && !hit.contains(i))
            .map(|(i, e)| (i, e.pos.distance(from)))
            .filter(|&(_, d)| d <= chain_range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        let Some(next) = next else {
            break;
        };
        damage *= w.chain_falloff;
        damage_enemy(&mut state.enemies[next], &mut state.telemetry, damage, WeaponId::Lightning);
        let hop = jagged_path(&mut state.rng, from, state.enemies[next].pos, w.bolt_jitter);
        path.extend(hop.into_iter().skip(1));
        hit.push(next);
        current = next;
    }

    push_bolt(state, tuning, path);
    true
}

fn fire_laser(state: &mut GameState, tuning: &Tuning, ctx: &WeaponContext, dt: f32) -> bool {
    let origin = state.player.pos;
    let range = ctx.stats.range;
    let max_beams = 1 + state.player.stats.extra_projectiles() as usize;

    let mut aims: Vec<Vec2> = Vec::with_capacity(max_beams);
    if let Some(boss) = &state.boss {
        if boss.hp > 0.0 && boss.pos.distance(origin) <= range + boss.radius {
            aims.push(boss.pos);
        }
    }
    let mut nearby: Vec<(f32, Vec2)> = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| (e.pos.distance(origin), e.pos))
        .filter(|&(d, _)| d <= range)
        .collect();
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
    let remaining = max_beams.saturating_sub(aims.len());
    aims.extend(nearby.into_iter().take(remaining).map(|(_, p)| p));

    if aims.is_empty() {
        return false;
    }

    let width = tuning.weapons.laser_width;
    let amount = ctx.stats.damage * dt;
    for aim in aims {
        let end = origin + (aim - origin).normalize_or(Vec2::X) * range;
        state.beams.push(LaserBeam {
            start: origin,
            end,
            width,
        });
        for enemy in state.enemies.iter_mut().filter(|e| e.is_alive()) {
            if point_segment_distance(enemy.pos, origin, end) <= width * 0.5 + enemy.radius {
                damage_enemy(enemy, &mut state.telemetry, amount, WeaponId::Laser);
            }
        }
        if let Some(boss) = state.boss.as_mut() {
            if point_segment_distance(boss.pos, origin, end) <= width * 0.5 + boss.radius {
                damage_boss(boss, &mut state.telemetry, amount, WeaponId::Laser);
            }
        }
    }
    true
}

fn fire_missiles(state: &mut GameState, tuning: &Tuning, ctx: &WeaponContext, _dt: f32) -> bool {
    let mut targets: Vec<Vec2> = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| e.pos)
        .collect();
    if let Some(boss) = state.boss.as_ref().filter(|b| b.hp > 0.0) {
        targets.push(boss.pos);
    }
    if targets.is_empty() {
        return false;
    }

    let w = &tuning.weapons;
    let origin = state.player.pos;
    let count = 1 + ctx.level_bonus(tuning);
    let speed = w.missile_speed * ctx.mults.speed;
    let mut fired = false;
    for _ in 0..count {
        if state.missiles.len() >= tuning.fx.max_missiles {
            break;
        }
        let target = targets[state.rng.random_range(0..targets.len())];
        let dir = (target - origin).normalize_or(Vec2::NEG_Y);
        state.missiles.push(HomingMissile {
            pos: origin,
            vel: dir * speed,
            life: w.missile_lifetime,
            damage: ctx.stats.damage,
            speed,
            turn_rate: w.missile_turn_rate,
            radius: w.missile_radius,
            dead: false,
        });
        fired = true;
    }
    fired
}

/// Fold this tick's damage into the smoothed measured DPS
pub fn update_telemetry(state: &mut GameState, dt: f32) {
    if dt <= 0.0 {
        return;
    }
    let telemetry = &mut state.telemetry;
    let instant = telemetry.frame_damage / dt;
    let blend = (dt * 1.5).min(1.0);
    telemetry.measured_dps += (instant - telemetry.measured_dps) * blend;
    telemetry.frame_damage = 0.0;
}

/// Theoretical damage per second of the current loadout
pub fn estimate_dps(state: &GameState, tuning: &Tuning) -> f32 {
    let player = &state.player.stats;
    let mults = Multipliers::from_stats(player);
    let crit = 1.0 + player.crit_chance.clamp(0.0, 1.0) * (player.crit_multiplier - 1.0).max(0.0);
    let w = &tuning.weapons;

    WeaponId::ALL
        .iter()
        .filter(|id| state.loadout.is_active(**id))
        .map(|&id| {
            let level = state.loadout.get(id).level;
            let stats = weapon_stats(tuning, id, level, player, &mults);
            let ctx = WeaponContext { level, mults, stats };
            let per_second = 1.0 / stats.cooldown.max(0.01);
            match id {
                WeaponId::Spread => {
                    let shots = 1 + player.extra_projectiles() + ctx.level_bonus(tuning);
                    stats.damage * shots as f32 * per_second * crit
                }
                WeaponId::Orbit => {
                    stats.damage * orbit_orb_count(player, tuning) as f32 * per_second * crit
                }
                WeaponId::Lightning => {
                    let hops = w.chain_count + ctx.level_bonus(tuning);
                    let chain: f32 = (0..=hops).map(|k| w.chain_falloff.powi(k as i32)).sum();
                    stats.damage * chain * per_second
                }
                WeaponId::Laser => stats.damage * (1 + player.extra_projectiles()) as f32,
                WeaponId::Missiles => {
                    stats.damage * (1 + ctx.level_bonus(tuning)) as f32 * per_second * crit
                }
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Enemy, EnemyType, Variant};

    fn enemy_at(state: &mut GameState, pos: Vec2, hp: f32) -> usize {
        let id = state.next_entity_id();
        state.enemies.push(Enemy {
            id,
            pos,
            vel: Vec2::ZERO,
            radius: 10.0,
            hp,
            max_hp: hp,
            speed: 50.0,
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

    fn ctx_for(state: &GameState, tuning: &Tuning, id: WeaponId, level: u32) -> WeaponContext {
        let mults = Multipliers::from_stats(&state.player.stats);
        WeaponContext {
            level,
            mults,
            stats: weapon_stats(tuning, id, level, &state.player.stats, &mults),
        }
    }

    #[test]
    fn test_spread_shot_count() {
        let tuning = Tuning::default();
        for (projectiles, level) in [(1, 1), (3, 1), (1, 3), (4, 5)] {
            let mut state = GameState::new(1, &tuning);
            state.player.stats.projectile_count = projectiles;
            let ctx = ctx_for(&state, &tuning, WeaponId::Spread, level);
            let bonus = (level - 1) / tuning.weapons.levels_per_extra_projectile;
            assert!(fire_spread(&mut state, &tuning, &ctx, 0.016));
            assert_eq!(state.bullets.len() as u32, 1 + (projectiles - 1) + bonus);
        }
    }

    #[test]
    fn test_spread_bounded_by_bullet_budget() {
        let mut tuning = Tuning::default();
        tuning.fx.max_bullets = 3;
        let mut state = GameState::new(1, &tuning);
        state.player.stats.projectile_count = 8;
        let ctx = ctx_for(&state, &tuning, WeaponId::Spread, 1);
        fire_spread(&mut state, &tuning, &ctx, 0.016);
        assert_eq!(state.bullets.len(), 3);
    }

    #[test]
    fn test_spread_cone_centered_on_target() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let origin = state.player.pos;
        enemy_at(&mut state, origin + Vec2::new(100.0, 0.0), 10.0);
        state.player.stats.projectile_count = 3;
        let ctx = ctx_for(&state, &tuning, WeaponId::Spread, 1);
        fire_spread(&mut state, &tuning, &ctx, 0.016);
        let angles: Vec<f32> = state.bullets.iter().map(|b| b.vel.y.atan2(b.vel.x)).collect();
        let half = tuning.weapons.spread_cone * 0.5;
        assert!((angles[0] + half).abs() < 1e-4);
        assert!(angles[1].abs() < 1e-4);
        assert!((angles[2] - half).abs() < 1e-4);
    }

    #[test]
    fn test_global_multiplier_scales_damage() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let base = ctx_for(&state, &tuning, WeaponId::Missiles, 1).stats.damage;
        state.player.stats.damage = BASE_DAMAGE * 2.0;
        let doubled = ctx_for(&state, &tuning, WeaponId::Missiles, 1).stats.damage;
        assert!((doubled - base * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_orbit_count_capped() {
        let tuning = Tuning::default();
        let mut stats = PlayerStats::from_tuning(&tuning.player);
        stats.orbit_count = 2;
        stats.projectile_count = 5;
        assert_eq!(orbit_orb_count(&stats, &tuning), 4);
        stats.projectile_count = 200;
        assert_eq!(orbit_orb_count(&stats, &tuning), tuning.weapons.max_orbs);
    }

    #[test]
    fn test_orbit_ring_evenly_spaced_and_spinning() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.loadout.unlock(WeaponId::Orbit);
        let mults = Multipliers::from_stats(&state.player.stats);
        advance_orbit_ring(&mut state, &tuning, &mults, 0.1);
        let phase_a = state.player.stats.spin_phase;
        assert_eq!(state.orbit_orbs.len(), 2);
        let center = state.player.pos;
        let a = state.orbit_orbs[0] - center;
        let b = state.orbit_orbs[1] - center;
        assert!((a + b).length() < 1e-3, "two orbs sit opposite each other");

        // Faster bullets spin the ring faster
        state.player.stats.bullet_speed = BASE_BULLET_SPEED * 2.0;
        let fast = Multipliers::from_stats(&state.player.stats);
        advance_orbit_ring(&mut state, &tuning, &fast, 0.1);
        let delta = state.player.stats.spin_phase - phase_a;
        assert!((delta - tuning.weapons.orbit_spin * 2.0 * 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_lightning_chains_with_falloff() {
        let mut tuning = Tuning::default();
        tuning.weapons.chain_count = 2;
        let mut state = GameState::new(3, &tuning);
        let origin = state.player.pos;
        // Both within primary range and within chain range of each other
        let a = enemy_at(&mut state, origin + Vec2::new(50.0, 0.0), 1000.0);
        let c = enemy_at(&mut state, origin + Vec2::new(50.0, 180.0), 1000.0);
        let far = enemy_at(&mut state, origin + Vec2::new(900.0, 0.0), 1000.0);
        let ctx = ctx_for(&state, &tuning, WeaponId::Lightning, 1);

        assert!(fire_lightning(&mut state, &tuning, &ctx, 0.016));
        let damage = ctx.stats.damage;
        let taken_a = 1000.0 - state.enemies[a].hp;
        let taken_c = 1000.0 - state.enemies[c].hp;
        // Whichever was primary, the other took the falloff share
        let (big, small) = if taken_a > taken_c { (taken_a, taken_c) } else { (taken_c, taken_a) };
        assert!((big - damage).abs() < 1e-3);
        assert!((small - damage * tuning.weapons.chain_falloff).abs() < 1e-3);
        assert_eq!(state.enemies[far].hp, 1000.0);
        assert_eq!(state.bolts.len(), 1);
    }

    #[test]
    fn test_lightning_falloff_compounds_per_hop() {
        let mut tuning = Tuning::default();
        tuning.weapons.chain_count = 2;
        let mut state = GameState::new(3, &tuning);
        let ctx = ctx_for(&state, &tuning, WeaponId::Lightning, 1);
        let r = ctx.stats.range;
        let origin = state.player.pos;
        // Only the first is in primary range; each next one is a single hop away
        let first = enemy_at(&mut state, origin + Vec2::new(0.5 * r, 0.0), 1000.0);
        let second = enemy_at(&mut state, origin + Vec2::new(1.2 * r, 0.0), 1000.0);
        let third = enemy_at(&mut state, origin + Vec2::new(1.9 * r, 0.0), 1000.0);

        assert!(fire_lightning(&mut state, &tuning, &ctx, 0.016));
        let damage = ctx.stats.damage;
        let falloff = tuning.weapons.chain_falloff;
        assert!((1000.0 - state.enemies[first].hp - damage).abs() < 1e-3);
        assert!((1000.0 - state.enemies[second].hp - damage * falloff).abs() < 1e-3);
        assert!((1000.0 - state.enemies[third].hp - damage * falloff * falloff).abs() < 1e-3);
    }

    #[test]
    fn test_lightning_needs_target() {
        let tuning = Tuning::default();
        let mut state = GameState::new(3, &tuning);
        let ctx = ctx_for(&state, &tuning, WeaponId::Lightning, 1);
        assert!(!fire_lightning(&mut state, &tuning, &ctx, 0.016));
        assert!(state.bolts.is_empty());
    }

    #[test]
    fn test_laser_damages_everything_on_the_beam() {
        let tuning = Tuning::default();
        let mut state = GameState::new(3, &tuning);
        let origin = state.player.pos;
        let near = enemy_at(&mut state, origin + Vec2::new(60.0, 0.0), 100.0);
        let behind = enemy_at(&mut state, origin + Vec2::new(150.0, 3.0), 100.0);
        let off_axis = enemy_at(&mut state, origin + Vec2::new(150.0, 80.0), 100.0);
        let ctx = ctx_for(&state, &tuning, WeaponId::Laser, 1);
        let dt = 0.1;
        assert!(fire_laser(&mut state, &tuning, &ctx, dt));
        assert_eq!(state.beams.len(), 1);
        let expected = 100.0 - ctx.stats.damage * dt;
        assert!((state.enemies[near].hp - expected).abs() < 1e-3);
        assert!((state.enemies[behind].hp - expected).abs() < 1e-3);
        assert_eq!(state.enemies[off_axis].hp, 100.0);
    }

    #[test]
    fn test_update_weapons_respects_cooldown() {
        let tuning = Tuning::default();
        let mut state = GameState::new(3, &tuning);
        let origin = state.player.pos;
        enemy_at(&mut state, origin + Vec2::new(100.0, 0.0), 100.0);
        update_weapons(&mut state, &tuning, 0.016);
        let after_first = state.bullets.len();
        assert_eq!(after_first, 1);
        update_weapons(&mut state, &tuning, 0.016);
        assert_eq!(state.bullets.len(), after_first);
        assert!(state.loadout.get(WeaponId::Spread).cooldown > 0.0);
    }

    #[test]
    fn test_missiles_fire_at_live_targets_only() {
        let tuning = Tuning::default();
        let mut state = GameState::new(3, &tuning);
        let ctx = ctx_for(&state, &tuning, WeaponId::Missiles, 1);
        assert!(!fire_missiles(&mut state, &tuning, &ctx, 0.016));
        let origin = state.player.pos;
        enemy_at(&mut state, origin + Vec2::new(0.0, -100.0), 10.0);
        assert!(fire_missiles(&mut state, &tuning, &ctx, 0.016));
        assert_eq!(state.missiles.len(), 1);
        assert!(state.missiles[0].vel.y < 0.0);
    }

    #[test]
    fn test_estimate_dps_grows_with_weapons() {
        let tuning = Tuning::default();
        let mut state = GameState::new(3, &tuning);
        let spread_only = estimate_dps(&state, &tuning);
        assert!(spread_only > 0.0);
        state.loadout.unlock(WeaponId::Laser);
        assert!(estimate_dps(&state, &tuning) > spread_only);
    }
}
