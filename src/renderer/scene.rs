//! Game state to draw calls
//!
//! Reads a `GameState` and fills a `FrameBatch`; never mutates the sim.

use glam::Vec2;

use super::batch::{FrameBatch, TextAlign};
use super::glyphs::GlyphAtlas;
use super::palette::{self, Color};
use crate::settings::Settings;
use crate::sim::state::{Enemy, GameState, TextKind, Variant};
use crate::sim::HudStats;
use crate::tuning::Tuning;

const HUD_TEXT_SIZE: f32 = 12.0;
const HUD_LINE_HEIGHT: f32 = 17.0;
const HUD_MARGIN: f32 = 12.0;
const BULLET_RADIUS: f32 = 3.0;
const ORB_RADIUS: f32 = 5.0;

/// Style switches derived once per frame from the settings
#[derive(Debug, Clone, Copy)]
struct Style {
    glow: bool,
    high_contrast: bool,
    reduced_motion: bool,
}

impl Style {
    fn color(&self, c: Color) -> Color {
        if self.high_contrast { palette::high_contrast(c) } else { c }
    }

    fn glow(&self, amount: f32) -> f32 {
        if self.glow { amount } else { 0.0 }
    }
}

fn polygon_sides(variant: Variant) -> u32 {
    match variant {
        Variant::Chaser => 0,
        Variant::Volatile => 6,
        Variant::Splitter => 4,
        Variant::Artillery => 3,
    }
}

fn text_size(kind: TextKind) -> f32 {
    match kind {
        TextKind::Damage | TextKind::Essence => 11.0,
        TextKind::Crit => 14.0,
        TextKind::Alert => 20.0,
    }
}

/// Fill `batch` with everything visible this frame
pub fn draw_scene(
    batch: &mut FrameBatch,
    atlas: &GlyphAtlas,
    state: &GameState,
    tuning: &Tuning,
    hud: &HudStats,
    settings: &Settings,
) {
    let style = Style {
        glow: settings.effective_glow(),
        high_contrast: settings.high_contrast,
        reduced_motion: settings.reduced_motion,
    };
    let t = state.time;

    for beam in &state.beams {
        batch.push_line(beam.start, beam.end, beam.width * 2.2, style.color(palette::LASER_GLOW));
        batch.push_line(beam.start, beam.end, beam.width * 0.5, palette::LASER_CORE);
    }

    for bolt in &state.bolts {
        let alpha = if bolt.max_life > 0.0 { bolt.life / bolt.max_life } else { 0.0 };
        let color = palette::with_alpha(style.color(palette::LIGHTNING), alpha);
        for seg in bolt.points.windows(2) {
            batch.push_line(seg[0], seg[1], 2.0, color);
        }
    }

    for orb in &state.fragments {
        // Orbs blink out during their last two seconds
        let fade = (orb.life / 2.0).clamp(0.25, 1.0);
        batch.push_polygon(
            orb.pos,
            tuning.physics.fragment_radius,
            4,
            t * 2.0 + orb.pos.x * 0.05,
            palette::with_alpha(style.color(palette::FRAGMENT), fade),
            style.glow(0.6),
        );
    }

    for shot in &state.enemy_projectiles {
        batch.push_circle(shot.pos, shot.radius, style.color(palette::ENEMY_SHOT));
    }

    for enemy in &state.enemies {
        draw_enemy(batch, enemy, state.player.pos, t, &style);
    }

    if let Some(boss) = &state.boss {
        let color = if boss.hit_this_frame {
            palette::HIT_FLASH
        } else {
            style.color(palette::BOSS)
        };
        let spin = if style.reduced_motion { 0.0 } else { t * 0.5 };
        batch.push_polygon(boss.pos, boss.radius, 8, spin, color, style.glow(0.5));

        let width = state.bounds.x * 0.6;
        let fill = if boss.max_hp > 0.0 { boss.hp / boss.max_hp } else { 0.0 };
        batch.push_health_bar(
            Vec2::new(state.bounds.x * 0.5, 14.0),
            width,
            10.0,
            fill,
            style.color(palette::BAR_BOSS),
            palette::BAR_BG,
        );
        batch.push_text(
            atlas,
            &format!("BOSS - WAVE {}", boss.wave),
            Vec2::new(state.bounds.x * 0.5, 30.0),
            10.0,
            TextAlign::Center,
            palette::HUD_TEXT,
        );
    }

    for bullet in &state.bullets {
        batch.push_circle(bullet.pos, BULLET_RADIUS, style.color(palette::bullet(bullet.source)));
    }

    for missile in &state.missiles {
        let heading = missile.vel.y.atan2(missile.vel.x);
        batch.push_polygon(
            missile.pos,
            missile.radius,
            3,
            heading,
            style.color(palette::MISSILE),
            style.glow(0.3),
        );
    }

    for &orb in &state.orbit_orbs {
        batch.push_polygon(orb, ORB_RADIUS, 0, 0.0, style.color(palette::ORB), style.glow(0.8));
    }

    draw_player(batch, state, &style);

    for text in &state.floating_text {
        let alpha = if text.max_life > 0.0 { text.life / text.max_life } else { 0.0 };
        batch.push_text(
            atlas,
            &text.text,
            text.pos,
            text_size(text.kind),
            TextAlign::Center,
            palette::with_alpha(style.color(palette::text(text.kind)), alpha),
        );
    }

    draw_hud(batch, atlas, state, tuning, hud);
}

fn draw_enemy(batch: &mut FrameBatch, enemy: &Enemy, player: Vec2, t: f32, style: &Style) {
    let body = palette::tint(palette::enemy(enemy.kind), palette::variant_accent(enemy.variant));
    let color = if enemy.hit_this_frame {
        palette::HIT_FLASH
    } else {
        style.color(body)
    };

    let mut radius = enemy.radius;
    let rotation = match enemy.variant {
        Variant::Artillery => {
            let to_player = player - enemy.pos;
            to_player.y.atan2(to_player.x)
        }
        Variant::Volatile if !style.reduced_motion => {
            radius *= 1.0 + 0.08 * (t * 8.0 + enemy.id as f32).sin();
            0.0
        }
        _ => 0.0,
    };

    if enemy.elite {
        batch.push_polygon(
            enemy.pos,
            radius * 1.35,
            0,
            0.0,
            palette::with_alpha(style.color(palette::enemy(enemy.kind)), 0.3),
            style.glow(0.4),
        );
    }
    batch.push_polygon(enemy.pos, radius, polygon_sides(enemy.variant), rotation, color, 0.0);

    if enemy.hp < enemy.max_hp {
        batch.push_health_bar(
            enemy.pos - Vec2::new(0.0, radius + 7.0),
            (radius * 2.0).max(14.0),
            3.0,
            enemy.hp / enemy.max_hp.max(f32::EPSILON),
            style.color(palette::BAR_ENEMY),
            palette::BAR_BG,
        );
    }
}

fn draw_player(batch: &mut FrameBatch, state: &GameState, style: &Style) {
    let player = &state.player;
    let alpha = if player.dead { 0.35 } else { 1.0 };
    batch.push_polygon(
        player.pos,
        player.radius * 1.6,
        0,
        0.0,
        palette::with_alpha(style.color(palette::PLAYER_RING), alpha),
        style.glow(0.3),
    );
    batch.push_circle(
        player.pos,
        player.radius,
        palette::with_alpha(style.color(palette::PLAYER), alpha),
    );
    batch.push_health_bar(
        player.pos + Vec2::new(0.0, player.radius + 8.0),
        36.0,
        4.0,
        player.hp_fraction(),
        style.color(palette::BAR_HP),
        palette::BAR_BG,
    );
}

fn draw_hud(
    batch: &mut FrameBatch,
    atlas: &GlyphAtlas,
    state: &GameState,
    tuning: &Tuning,
    hud: &HudStats,
) {
    let lines = hud.lines();
    let mut y = HUD_MARGIN;
    for line in &lines {
        batch.push_text(
            atlas,
            line,
            Vec2::new(HUD_MARGIN, y),
            HUD_TEXT_SIZE,
            TextAlign::Left,
            palette::HUD_TEXT,
        );
        y += HUD_LINE_HEIGHT;
    }

    if !state.ticker.is_empty() {
        let hold = tuning.fx.ticker_hold.max(f32::EPSILON);
        let alpha = (state.ticker.timer / hold).clamp(0.0, 1.0);
        let mut parts = Vec::new();
        if state.ticker.essence > 0.0 {
            parts.push(format!("+{} ESSENCE", crate::format_amount(state.ticker.essence)));
        }
        if state.ticker.fragments > 0.0 {
            parts.push(format!("+{} FRAGMENTS", crate::format_amount(state.ticker.fragments)));
        }
        batch.push_text(
            atlas,
            &parts.join("  "),
            Vec2::new(HUD_MARGIN, y + 4.0),
            HUD_TEXT_SIZE,
            TextAlign::Left,
            palette::with_alpha(palette::TICKER_TEXT, alpha),
        );
    }
}
