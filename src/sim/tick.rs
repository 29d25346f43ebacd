//! Per-frame simulation tick
//!
//! Composes spawning, AI, weapons, physics and collision once per animation
//! frame with a clamped time step.

use glam::Vec2;

use super::state::{GameEvent, GameState};
use super::{collision, enemy, physics, weapons};
use crate::consts::{FLOAT_TEXT_RISE, PLAYER_ACCEL};
use crate::tuning::Tuning;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement direction from the keyboard; longer than 1 is clamped
    pub move_dir: Vec2,
}

/// Advance the game state by one frame
pub fn tick(state: &mut GameState, tuning: &Tuning, input: &TickInput, dt: f32) {
    if !state.running {
        return;
    }
    let dt = dt.clamp(0.0, tuning.physics.max_dt);
    if dt <= 0.0 {
        return;
    }

    state.events.clear();
    state.time += dt;

    enemy::update_wave(state, tuning, dt);
    update_income(state, tuning, dt);
    update_player(state, input, dt);

    // Spawn or start a boss fight
    if enemy::should_spawn_boss(state, tuning) {
        enemy::spawn_boss(state, tuning);
    } else {
        enemy::update_spawning(state, tuning, dt);
    }

    enemy::update_enemies(state, tuning, dt);
    enemy::update_boss(state, tuning, dt);

    weapons::update_weapons(state, tuning, dt);

    // Index every live enemy for this tick's hit tests
    let mut grid = std::mem::take(&mut state.grid);
    let cell_size = tuning.arena.cell_size.max(1.0);
    if grid.cell_size() != cell_size {
        grid.set_cell_size(cell_size);
    }
    grid.rebuild(
        state
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_alive())
            .map(|(i, e)| (i, e.pos)),
    );

    physics::update_bullets(state, tuning, dt);
    physics::update_missiles(state, &grid, dt);
    physics::update_enemy_projectiles(state, tuning, dt);
    physics::update_fragments(state, tuning, dt);

    collision::resolve_collisions(state, tuning, &grid, dt);
    state.grid = grid;

    let killed = enemy::process_deaths(state, tuning);
    if killed > 0 {
        log::debug!("wave {:.2}: {} enemies killed", state.wave, killed);
    }
    enemy::check_boss_defeat(state, tuning);

    weapons::update_telemetry(state, dt);
    update_effects(state, dt);

    if state.player.dead {
        state.running = false;
        state.events.push(GameEvent::PlayerDied);
        log::info!(
            "Run ended at wave {:.1} with {:.0} essence",
            state.wave,
            state.resources.essence
        );
    }
}

/// Passive essence from generators
fn update_income(state: &mut GameState, tuning: &Tuning, dt: f32) {
    let rate = enemy::idle_rate(state, tuning);
    if rate > 0.0 {
        state.resources.add_essence(rate * dt as f64);
    }
}

fn update_player(state: &mut GameState, input: &TickInput, dt: f32) {
    let bounds = state.bounds;
    let player = &mut state.player;
    let desired = input.move_dir.clamp_length_max(1.0) * player.stats.move_speed;
    player.vel += (desired - player.vel) * (PLAYER_ACCEL * dt).min(1.0);
    player.pos += player.vel * dt;
    let r = Vec2::splat(player.radius);
    player.pos = player.pos.clamp(r, (bounds - r).max(r));
    let regen = player.stats.regen * dt;
    player.heal(regen);
}

/// Decay bolts, floating text and the gain ticker
fn update_effects(state: &mut GameState, dt: f32) {
    state.bolts.retain_mut(|bolt| {
        bolt.life -= dt;
        bolt.life > 0.0
    });
    state.floating_text.retain_mut(|text| {
        text.life -= dt;
        text.pos.y -= FLOAT_TEXT_RISE * dt;
        text.life > 0.0
    });
    if state.ticker.timer > 0.0 {
        state.ticker.timer -= dt;
        if state.ticker.timer <= 0.0 {
            state.ticker = Default::default();
        }
    }
}
