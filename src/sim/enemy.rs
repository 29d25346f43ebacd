//! Enemy spawning, steering, variant behavior and the boss
//!
//! Variant behavior has exactly one dispatch point per concern:
//! [`desired_velocity`] for motion, [`fire_variant`] for ranged attacks and
//! [`on_death`] for death effects. The numbers live in [`VariantTable`].
//!
//! [`VariantTable`]: crate::tuning::VariantTable

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::state::{Boss, Enemy, EnemyProjectile, EnemyType, GameEvent, GameState, TextKind, Variant};
use crate::tuning::{RangedConfig, SpawnTuning, Tuning, VariantTable};

pub fn spawn_rate(wave: f32, t: &SpawnTuning) -> f32 {
    (t.base_rate + t.rate_per_wave * wave.max(0.0)).min(t.max_rate)
}

/// Expected hp of a normal enemy at this wave
pub fn baseline_hp(wave: f32, t: &SpawnTuning) -> f32 {
    t.base_hp * t.hp_growth.powf(wave.max(0.0))
}

pub fn baseline_speed(wave: f32, t: &SpawnTuning) -> f32 {
    t.base_speed + t.speed_per_wave * wave.max(0.0)
}

pub fn baseline_reward(wave: f32, t: &SpawnTuning) -> f64 {
    (t.base_reward * t.reward_growth.powf(wave.max(0.0))) as f64
}

/// Passive essence per second from generators
pub fn idle_rate(state: &GameState, tuning: &Tuning) -> f64 {
    let count = state.generators.count;
    if count == 0 {
        return 0.0;
    }
    let e = &tuning.economy;
    e.generator_rate * count as f64 * e.generator_growth.powi(count as i32 - 1)
}

/// Accelerate `vel` toward `desired` and clamp to `cap`
#[inline]
pub fn steer(vel: Vec2, desired: Vec2, accel: f32, dt: f32, cap: f32) -> Vec2 {
    let blend = (accel * dt).clamp(0.0, 1.0);
    (vel + (desired - vel) * blend).clamp_length_max(cap)
}

/// Add an impulse without exceeding the speed cap
#[inline]
pub fn apply_impulse(vel: Vec2, impulse: Vec2, cap: f32) -> Vec2 {
    (vel + impulse).clamp_length_max(cap)
}

/// Weighted variant roll among variants unlocked at this wave
pub fn choose_variant<R: Rng>(rng: &mut R, wave: f32, table: &VariantTable) -> Variant {
    let eligible = || {
        Variant::ALL
            .into_iter()
            .map(|v| (v, table.get(v)))
            .filter(|(_, c)| c.weight > 0.0 && wave >= c.min_wave)
    };
    let total: f32 = eligible().map(|(_, c)| c.weight).sum();
    if total <= 0.0 {
        return Variant::Chaser;
    }
    let mut roll = rng.random_range(0.0..total);
    for (variant, config) in eligible() {
        if roll < config.weight {
            return variant;
        }
        roll -= config.weight;
    }
    Variant::Chaser
}

/// Random point just outside one of the four canvas edges
pub fn edge_spawn_position<R: Rng>(rng: &mut R, bounds: Vec2, margin: f32) -> Vec2 {
    match rng.random_range(0..4) {
        0 => Vec2::new(rng.random_range(0.0..bounds.x), -margin),
        1 => Vec2::new(bounds.x + margin, rng.random_range(0.0..bounds.y)),
        2 => Vec2::new(rng.random_range(0.0..bounds.x), bounds.y + margin),
        _ => Vec2::new(-margin, rng.random_range(0.0..bounds.y)),
    }
}

/// Roll and push one regular enemy; returns its id
pub fn spawn_enemy(state: &mut GameState, tuning: &Tuning) -> Option<u32> {
    if state.enemies.len() >= tuning.fx.max_enemies {
        return None;
    }
    let st = &tuning.spawn;
    let wave = state.wave;
    let variant = choose_variant(&mut state.rng, wave, &tuning.variants);
    let config = tuning.variants.get(variant);
    let elite = st.elite_chance > 0.0 && state.rng.random::<f32>() < st.elite_chance;

    let baseline = baseline_hp(wave, st);
    let roll = if st.hp_roll_max > st.hp_roll_min {
        state.rng.random_range(st.hp_roll_min..st.hp_roll_max)
    } else {
        st.hp_roll_min
    };
    let mut hp = baseline * roll * config.hp_mult;
    let mut speed = baseline_speed(wave, st) * config.speed_mult;
    let mut reward = baseline_reward(wave, st) * roll as f64;
    if elite {
        hp *= st.elite_hp_mult;
        speed *= st.elite_speed_mult;
        reward *= st.elite_reward_mult as f64;
    }

    let kind = EnemyType::classify(hp, baseline, elite, &tuning.enemy);
    let pos = edge_spawn_position(&mut state.rng, state.bounds, tuning.arena.spawn_margin);
    let fire_delay = match variant {
        Variant::Artillery => tuning.variants.ranged.fire_delay,
        _ => 0.0,
    };
    let id = state.next_entity_id();
    state.enemies.push(Enemy {
        id,
        pos,
        vel: Vec2::ZERO,
        radius: kind.radius(&tuning.enemy),
        hp,
        max_hp: hp,
        speed,
        reward,
        fire_timer: fire_delay,
        fire_delay,
        elite,
        kind,
        variant,
        generation: 0,
        hit_this_frame: false,
    });
    Some(id)
}

/// Advance wave progress; frozen during a boss fight
pub fn update_wave(state: &mut GameState, tuning: &Tuning, dt: f32) {
    if !state.boss_active() {
        state.wave += tuning.spawn.wave_per_second * dt;
    }
}

pub fn update_spawning(state: &mut GameState, tuning: &Tuning, dt: f32) {
    if state.boss_active() {
        state.spawn_accumulator = 0.0;
        return;
    }
    state.spawn_accumulator += spawn_rate(state.wave, &tuning.spawn) * dt;
    while state.spawn_accumulator >= 1.0 {
        state.spawn_accumulator -= 1.0;
        if spawn_enemy(state, tuning).is_none() {
            // At the cap: drop the backlog instead of bursting later
            state.spawn_accumulator = state.spawn_accumulator.min(1.0);
            break;
        }
    }
}

fn artillery_desired(to_player: Vec2, speed: f32, ranged: &RangedConfig) -> Vec2 {
    let dist = to_player.length();
    let dir = to_player.normalize_or_zero();
    if dist > ranged.preferred_range {
        dir * speed
    } else if dist < ranged.preferred_range * ranged.retreat_ratio {
        -dir * speed
    } else {
        Vec2::ZERO
    }
}

/// Desired velocity for one enemy
pub fn desired_velocity(enemy: &Enemy, player_pos: Vec2, table: &VariantTable) -> Vec2 {
    let to_player = player_pos - enemy.pos;
    match enemy.variant {
        Variant::Artillery => artillery_desired(to_player, enemy.speed, &table.ranged),
        Variant::Chaser | Variant::Volatile | Variant::Splitter => {
            to_player.normalize_or_zero() * enemy.speed
        }
    }
}

/// Ranged attack for variants that have one; returns a projectile when firing
pub fn fire_variant(enemy: &mut Enemy, player_pos: Vec2, wave: f32, table: &VariantTable, dt: f32) -> Option<EnemyProjectile> {
    match enemy.variant {
        Variant::Artillery => {
            let ranged = &table.ranged;
            enemy.fire_timer -= dt;
            if enemy.fire_timer > 0.0 || enemy.pos.distance(player_pos) > ranged.fire_range {
                return None;
            }
            enemy.fire_timer = enemy.fire_delay.max(0.1);
            let dir = (player_pos - enemy.pos).normalize_or(Vec2::Y);
            Some(EnemyProjectile {
                pos: enemy.pos,
                vel: dir * ranged.projectile_speed,
                life: ranged.projectile_lifetime,
                damage: ranged.projectile_damage * (1.0 + wave * ranged.damage_wave_scale),
                radius: ranged.projectile_radius,
            })
        }
        Variant::Chaser | Variant::Volatile | Variant::Splitter => None,
    }
}

/// Steer every enemy and run ranged attacks
pub fn update_enemies(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let player_pos = state.player.pos;
    let wave = state.wave;
    let accel = tuning.enemy.accel;
    let max_projectiles = tuning.fx.max_enemy_projectiles;

    for enemy in state.enemies.iter_mut().filter(|e| e.is_alive()) {
        enemy.hit_this_frame = false;
        let desired = desired_velocity(enemy, player_pos, &tuning.variants);
        let cap = enemy.speed_cap(&tuning.enemy);
        enemy.vel = steer(enemy.vel, desired, accel, dt, cap);
        enemy.pos += enemy.vel * dt;

        if let Some(projectile) = fire_variant(enemy, player_pos, wave, &tuning.variants, dt) {
            if state.enemy_projectiles.len() < max_projectiles {
                state.enemy_projectiles.push(projectile);
            }
        }
    }
}

/// Boss gate: floor(wave) is a positive multiple of the interval, no boss is
/// active and this wave has not had its boss yet
pub fn should_spawn_boss(state: &GameState, tuning: &Tuning) -> bool {
    let wave = state.wave_index();
    let interval = tuning.boss.wave_interval;
    interval > 0 && wave > 0 && wave % interval == 0 && !state.boss_active() && wave > state.last_boss_wave
}

/// Activate the boss, clearing regular enemies and enemy projectiles
pub fn spawn_boss(state: &mut GameState, tuning: &Tuning) {
    let b = &tuning.boss;
    let wave = state.wave_index();
    let hp = baseline_hp(state.wave, &tuning.spawn) * b.hp_mult;
    state.enemies.clear();
    state.enemy_projectiles.clear();
    state.spawn_accumulator = 0.0;
    state.boss = Some(Boss {
        pos: Vec2::new(state.bounds.x * 0.5, -b.radius),
        vel: Vec2::ZERO,
        radius: b.radius,
        hp,
        max_hp: hp,
        speed: b.speed,
        reward: baseline_reward(state.wave, &tuning.spawn) * b.reward_mult as f64,
        fire_timer: b.fire_delay,
        wave,
        hit_this_frame: false,
    });
    log::info!("Boss spawned at wave {} with {:.0} hp", wave, hp);
    state.events.push(GameEvent::BossSpawned { wave });
    let center = state.center();
    state.push_text(center, format!("BOSS WAVE {}", wave), TextKind::Alert, tuning);
}

/// Boss motion and its projectile fan
pub fn update_boss(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let player_pos = state.player.pos;
    let b = &tuning.boss;
    let Some(boss) = state.boss.as_mut() else {
        return;
    };
    boss.hit_this_frame = false;
    let desired = (player_pos - boss.pos).normalize_or_zero() * boss.speed;
    boss.vel = steer(boss.vel, desired, b.accel, dt, boss.speed * b.max_speed_ratio);
    boss.pos += boss.vel * dt;

    boss.fire_timer -= dt;
    if boss.fire_timer > 0.0 {
        return;
    }
    boss.fire_timer = b.fire_delay.max(0.1);

    let to_player = player_pos - boss.pos;
    let aim = to_player.y.atan2(to_player.x);
    let shots = b.shots.max(1);
    let damage = b.projectile_damage * (1.0 + state.wave * tuning.variants.ranged.damage_wave_scale);
    for i in 0..shots {
        if state.enemy_projectiles.len() >= tuning.fx.max_enemy_projectiles {
            break;
        }
        let offset = if shots == 1 {
            0.0
        } else {
            -b.spread * 0.5 + b.spread * i as f32 / (shots - 1) as f32
        };
        state.enemy_projectiles.push(EnemyProjectile {
            pos: boss.pos,
            vel: Vec2::from_angle(aim + offset) * b.projectile_speed,
            life: tuning.variants.ranged.projectile_lifetime,
            damage,
            radius: b.projectile_radius,
        });
    }
}

/// Volatile blast: falloff damage to the player, knockback on everything in range
pub fn explode(state: &mut GameState, tuning: &Tuning, pos: Vec2) {
    let cfg = &tuning.variants.explosion;
    if cfg.radius <= 0.0 {
        return;
    }
    let falloff = |p: Vec2| (1.0 - p.distance(pos) / cfg.radius).clamp(0.0, 1.0);
    let push = |p: Vec2| (p - pos).normalize_or_zero() * cfg.knockback * falloff(p);

    let player_dist = state.player.pos.distance(pos);
    if player_dist < cfg.radius {
        let raw = cfg.damage * (1.0 + state.wave * cfg.damage_wave_scale) * falloff(state.player.pos);
        let taken = state.player.take_damage(raw);
        if taken > 0.0 {
            state.events.push(GameEvent::PlayerHit { amount: taken });
        }
        state.player.vel += push(state.player.pos);
    }

    for enemy in state.enemies.iter_mut().filter(|e| e.pos.distance(pos) < cfg.radius) {
        let cap = enemy.speed_cap(&tuning.enemy);
        enemy.vel = apply_impulse(enemy.vel, push(enemy.pos), cap);
    }
    for orb in state.fragments.iter_mut().filter(|o| o.pos.distance(pos) < cfg.radius) {
        orb.vel += push(orb.pos);
    }

    state.events.push(GameEvent::Explosion { pos, radius: cfg.radius });
}

/// Splitter children; respects the enemy cap and the generation limit
pub fn split(state: &mut GameState, tuning: &Tuning, parent: &Enemy) -> usize {
    let cfg = &tuning.variants.split;
    if parent.generation >= cfg.max_generation {
        return 0;
    }
    let baseline = baseline_hp(state.wave, &tuning.spawn);
    let mut spawned = 0;
    for i in 0..cfg.children {
        if state.enemies.len() >= tuning.fx.max_enemies {
            break;
        }
        let angle = TAU * i as f32 / cfg.children.max(1) as f32 + state.rng.random_range(-0.4..0.4);
        let dir = Vec2::from_angle(angle);
        let hp = (parent.max_hp * cfg.hp_scale).max(1.0);
        let speed = parent.speed * cfg.speed_scale;
        let cap = speed * tuning.enemy.max_speed_ratio;
        let jitter = if cfg.jitter > 0.0 {
            Vec2::new(
                state.rng.random_range(-cfg.jitter..cfg.jitter),
                state.rng.random_range(-cfg.jitter..cfg.jitter),
            )
        } else {
            Vec2::ZERO
        };
        let id = state.next_entity_id();
        state.enemies.push(Enemy {
            id,
            pos: parent.pos + dir * parent.radius * 0.5 + jitter,
            vel: (dir * cfg.launch_speed).clamp_length_max(cap),
            radius: parent.radius * cfg.radius_scale,
            hp,
            max_hp: hp,
            speed,
            reward: parent.reward * cfg.reward_scale as f64,
            fire_timer: 0.0,
            fire_delay: 0.0,
            elite: false,
            kind: EnemyType::classify(hp, baseline, false, &tuning.enemy),
            variant: Variant::Splitter,
            generation: parent.generation + 1,
            hit_this_frame: false,
        });
        spawned += 1;
    }
    spawned
}

/// Variant death effect dispatch
pub fn on_death(state: &mut GameState, tuning: &Tuning, enemy: &Enemy) {
    match enemy.variant {
        Variant::Volatile => explode(state, tuning, enemy.pos),
        Variant::Splitter => {
            split(state, tuning, enemy);
        }
        Variant::Chaser | Variant::Artillery => {}
    }
}

/// Remove dead enemies, pay out rewards and run death effects
pub fn process_deaths(state: &mut GameState, tuning: &Tuning) -> usize {
    if state.enemies.iter().all(Enemy::is_alive) {
        return 0;
    }
    let (dead, alive): (Vec<Enemy>, Vec<Enemy>) = std::mem::take(&mut state.enemies)
        .into_iter()
        .partition(|e| !e.is_alive());
    state.enemies = alive;

    for enemy in &dead {
        state.resources.add_essence(enemy.reward);
        state.drop_fragment(enemy.pos, enemy.reward * tuning.economy.fragment_ratio, tuning);
        state.essence_popup(enemy.pos, enemy.reward, tuning);
        state.events.push(GameEvent::EnemyKilled {
            pos: enemy.pos,
            variant: enemy.variant,
            elite: enemy.elite,
        });
        on_death(state, tuning, enemy);
    }
    dead.len()
}

/// Pay out a defeated boss and return to normal spawning
pub fn check_boss_defeat(state: &mut GameState, tuning: &Tuning) -> bool {
    let defeated = state.boss.as_ref().is_some_and(|b| b.hp <= 0.0);
    if !defeated {
        return false;
    }
    let Some(boss) = state.boss.take() else {
        return false;
    };
    state.resources.add_essence(boss.reward);
    let fragments = baseline_reward(state.wave, &tuning.spawn)
        * tuning.boss.fragment_mult as f64
        * tuning.economy.fragment_ratio;
    state.drop_fragment(boss.pos, fragments, tuning);
    state.essence_popup(boss.pos, boss.reward, tuning);
    state.enemy_projectiles.clear();
    state.last_boss_wave = state.wave_index();
    log::info!("Boss defeated at wave {}", boss.wave);
    state.events.push(GameEvent::BossDefeated {
        pos: boss.pos,
        wave: boss.wave,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chaser(state: &mut GameState, pos: Vec2, hp: f32, variant: Variant) -> usize {
        let id = state.next_entity_id();
        state.enemies.push(Enemy {
            id,
            pos,
            vel: Vec2::ZERO,
            radius: 11.0,
            hp,
            max_hp: hp,
            speed: 50.0,
            reward: 3.0,
            fire_timer: 0.0,
            fire_delay: 1.0,
            elite: false,
            kind: EnemyType::Normal,
            variant,
            generation: 0,
            hit_this_frame: false,
        });
        state.enemies.len() - 1
    }

    #[test]
    fn test_boss_gating() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let interval = tuning.boss.wave_interval as f32;

        state.wave = 0.5;
        assert!(!should_spawn_boss(&state, &tuning), "wave 0 never spawns");
        state.wave = interval - 0.01;
        assert!(!should_spawn_boss(&state, &tuning));
        state.wave = interval + 0.3;
        assert!(should_spawn_boss(&state, &tuning));
        state.wave = interval + 1.0;
        assert!(!should_spawn_boss(&state, &tuning), "not a multiple");

        state.wave = interval;
        state.last_boss_wave = interval as u32;
        assert!(!should_spawn_boss(&state, &tuning), "already fought");

        state.last_boss_wave = 0;
        spawn_boss(&mut state, &tuning);
        assert!(!should_spawn_boss(&state, &tuning), "one boss at a time");
    }

    #[test]
    fn test_boss_spawn_clears_field() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.wave = tuning.boss.wave_interval as f32;
        chaser(&mut state, Vec2::new(10.0, 10.0), 5.0, Variant::Chaser);
        state.enemy_projectiles.push(EnemyProjectile {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            life: 1.0,
            damage: 1.0,
            radius: 2.0,
        });
        spawn_boss(&mut state, &tuning);
        assert!(state.boss_active());
        assert!(state.enemies.is_empty());
        assert!(state.enemy_projectiles.is_empty());
        assert!(state.events.contains(&GameEvent::BossSpawned {
            wave: tuning.boss.wave_interval
        }));
    }

    #[test]
    fn test_boss_freezes_wave_and_spawning() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.wave = tuning.boss.wave_interval as f32;
        spawn_boss(&mut state, &tuning);
        let wave = state.wave;
        update_wave(&mut state, &tuning, 1.0);
        update_spawning(&mut state, &tuning, 10.0);
        assert_eq!(state.wave, wave);
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_boss_defeat_records_wave() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.wave = tuning.boss.wave_interval as f32 + 0.4;
        spawn_boss(&mut state, &tuning);
        state.enemy_projectiles.push(EnemyProjectile {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            life: 1.0,
            damage: 1.0,
            radius: 2.0,
        });
        if let Some(boss) = state.boss.as_mut() {
            boss.hp = 0.0;
        }
        assert!(check_boss_defeat(&mut state, &tuning));
        assert!(!state.boss_active());
        assert_eq!(state.last_boss_wave, tuning.boss.wave_interval);
        assert!(state.enemy_projectiles.is_empty());
        assert!(state.resources.essence > 0.0);
        assert_eq!(state.fragments.len(), 1);
        assert!(!should_spawn_boss(&state, &tuning));
    }

    #[test]
    fn test_spawning_respects_enemy_cap() {
        let mut tuning = Tuning::default();
        tuning.fx.max_enemies = 3;
        let mut state = GameState::new(1, &tuning);
        update_spawning(&mut state, &tuning, 100.0);
        assert_eq!(state.enemies.len(), 3);
        assert!(state.spawn_accumulator <= 1.0);
    }

    #[test]
    fn test_spawned_enemy_outside_canvas() {
        let tuning = Tuning::default();
        let mut state = GameState::new(9, &tuning);
        for _ in 0..20 {
            spawn_enemy(&mut state, &tuning);
        }
        let b = state.bounds;
        for e in &state.enemies {
            let inside = e.pos.x > 0.0 && e.pos.x < b.x && e.pos.y > 0.0 && e.pos.y < b.y;
            assert!(!inside, "{:?} spawned inside", e.pos);
            assert!(e.hp > 0.0);
        }
    }

    #[test]
    fn test_variant_min_wave_respected() {
        let tuning = Tuning::default();
        let mut rng = rand_pcg::Pcg32::new(1, 1);
        for _ in 0..200 {
            let v = choose_variant(&mut rng, 0.0, &tuning.variants);
            let config = tuning.variants.get(v);
            assert!(config.min_wave <= 0.0);
        }
    }

    #[test]
    fn test_artillery_keeps_range() {
        let table = VariantTable::default();
        let ranged = &table.ranged;
        let mut state = GameState::new(1, &Tuning::default());
        let player = state.player.pos;
        let idx = chaser(&mut state, player + Vec2::new(ranged.preferred_range * 2.0, 0.0), 5.0, Variant::Artillery);
        assert!(desired_velocity(&state.enemies[idx], player, &table).x < 0.0, "approaches");
        state.enemies[idx].pos = player + Vec2::new(ranged.preferred_range * 0.5, 0.0);
        assert!(desired_velocity(&state.enemies[idx], player, &table).x > 0.0, "retreats");
        state.enemies[idx].pos = player + Vec2::new(ranged.preferred_range * 0.9, 0.0);
        assert_eq!(desired_velocity(&state.enemies[idx], player, &table), Vec2::ZERO);
    }

    #[test]
    fn test_artillery_fires_on_timer() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let player = state.player.pos;
        let idx = chaser(&mut state, player + Vec2::new(200.0, 0.0), 5.0, Variant::Artillery);
        state.enemies[idx].fire_timer = 0.05;
        update_enemies(&mut state, &tuning, 0.1);
        assert_eq!(state.enemy_projectiles.len(), 1);
        update_enemies(&mut state, &tuning, 0.1);
        assert_eq!(state.enemy_projectiles.len(), 1);
    }

    #[test]
    fn test_volatile_explosion_pushes_and_hurts() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        let player = state.player.pos;
        let blast = player + Vec2::new(-20.0, 0.0);
        let idx = chaser(&mut state, blast, 0.0, Variant::Volatile);
        let volatile_id = state.enemies[idx].id;
        let bystander = chaser(&mut state, blast + Vec2::new(0.0, 30.0), 10.0, Variant::Chaser);
        let cap = state.enemies[bystander].speed_cap(&tuning.enemy);

        process_deaths(&mut state, &tuning);
        assert!(state.enemies.iter().all(|e| e.id != volatile_id));
        assert!(state.player.hp < state.player.max_hp);
        assert!(state.player.vel.x > 0.0);
        let survivor = &state.enemies[0];
        assert!(survivor.vel.y > 0.0);
        assert!(survivor.vel.length() <= cap * 1.0001);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::Explosion { .. })));
    }

    #[test]
    fn test_splitter_children_and_generation_limit() {
        let tuning = Tuning::default();
        let split_cfg = &tuning.variants.split;
        let mut state = GameState::new(1, &tuning);
        let idx = chaser(&mut state, Vec2::new(200.0, 200.0), 0.0, Variant::Splitter);
        state.enemies[idx].max_hp = 20.0;
        process_deaths(&mut state, &tuning);
        assert_eq!(state.enemies.len(), split_cfg.children as usize);
        for child in &state.enemies {
            assert_eq!(child.generation, 1);
            assert!((child.max_hp - 20.0 * split_cfg.hp_scale).abs() < 1e-4);
            assert!(child.radius < 11.0);
            assert!(child.vel.length() <= child.speed * tuning.enemy.max_speed_ratio * 1.0001);
        }

        let parent = Enemy {
            generation: split_cfg.max_generation,
            ..state.enemies[0].clone()
        };
        assert_eq!(split(&mut state, &tuning, &parent), 0);
    }

    #[test]
    fn test_death_rewards() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        chaser(&mut state, Vec2::new(200.0, 200.0), 0.0, Variant::Chaser);
        assert_eq!(process_deaths(&mut state, &tuning), 1);
        assert_eq!(state.resources.essence, 3.0);
        assert_eq!(state.fragments.len(), 1);
        assert_eq!(state.fragments[0].value, 3.0 * tuning.economy.fragment_ratio);
        assert_eq!(state.floating_text.len(), 1);
    }

    #[test]
    fn test_idle_rate() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        assert_eq!(idle_rate(&state, &tuning), 0.0);
        state.generators.count = 1;
        assert_eq!(idle_rate(&state, &tuning), tuning.economy.generator_rate);
    }

    proptest! {
        #[test]
        fn prop_steering_never_exceeds_cap(
            vx in -500.0f32..500.0,
            vy in -500.0f32..500.0,
            dx in -500.0f32..500.0,
            dy in -500.0f32..500.0,
            ix in -800.0f32..800.0,
            iy in -800.0f32..800.0,
            dt in 0.0f32..0.05,
            speed in 1.0f32..200.0,
        ) {
            let t = crate::tuning::EnemyTuning::default();
            let cap = speed * t.max_speed_ratio;
            let v = steer(Vec2::new(vx, vy), Vec2::new(dx, dy), t.accel, dt, cap);
            prop_assert!(v.length() <= cap * 1.0001);
            let v = apply_impulse(v, Vec2::new(ix, iy), cap);
            prop_assert!(v.length() <= cap * 1.0001);
        }

        #[test]
        fn prop_speed_clamp_holds_over_many_ticks(seed in 0u64..200, ticks in 1usize..120) {
            let mut tuning = Tuning::default();
            tuning.spawn.base_rate = 4.0;
            let mut state = GameState::new(seed, &tuning);
            for _ in 0..ticks {
                update_spawning(&mut state, &tuning, 0.05);
                update_enemies(&mut state, &tuning, 0.05);
                for e in state.enemies.iter_mut().step_by(3) {
                    e.hp = 0.0;
                }
                process_deaths(&mut state, &tuning);
            }
            for e in &state.enemies {
                prop_assert!(e.vel.length() <= e.speed * tuning.enemy.max_speed_ratio * 1.0001);
            }
        }
    }
}
