//! Colors for game elements

use crate::sim::state::{EnemyType, TextKind, Variant, WeaponId};

pub type Color = [f32; 4];

pub const BACKGROUND: Color = [0.02, 0.02, 0.05, 1.0];
pub const GRID_LINE: Color = [0.12, 0.13, 0.22, 1.0];
pub const PLAYER: Color = [0.3, 0.95, 0.6, 1.0];
pub const PLAYER_RING: Color = [0.3, 0.95, 0.6, 0.35];
pub const BULLET: Color = [1.0, 0.95, 0.7, 1.0];
pub const ORBIT_BULLET: Color = [0.55, 0.85, 1.0, 1.0];
pub const MISSILE: Color = [1.0, 0.6, 0.25, 1.0];
pub const ENEMY_SHOT: Color = [1.0, 0.3, 0.35, 1.0];
pub const FRAGMENT: Color = [0.65, 0.45, 1.0, 1.0];
pub const LIGHTNING: Color = [0.7, 0.85, 1.0, 1.0];
pub const LASER_GLOW: Color = [1.0, 0.25, 0.4, 0.35];
pub const LASER_CORE: Color = [1.0, 0.85, 0.9, 1.0];
pub const ORB: Color = [0.55, 0.85, 1.0, 0.9];
pub const BOSS: Color = [0.85, 0.15, 0.35, 1.0];
pub const HIT_FLASH: Color = [1.0, 1.0, 1.0, 1.0];
pub const BAR_BG: Color = [0.1, 0.1, 0.12, 0.85];
pub const BAR_HP: Color = [0.35, 0.9, 0.4, 1.0];
pub const BAR_ENEMY: Color = [0.95, 0.3, 0.3, 1.0];
pub const BAR_BOSS: Color = [0.9, 0.2, 0.5, 1.0];
pub const HUD_TEXT: Color = [0.9, 0.92, 1.0, 1.0];
pub const TICKER_TEXT: Color = [0.75, 0.7, 1.0, 1.0];
pub const PARTICLE: Color = [1.0, 0.75, 0.35, 0.9];

pub fn enemy(kind: EnemyType) -> Color {
    match kind {
        EnemyType::Weak => [0.55, 0.6, 0.7, 1.0],
        EnemyType::Normal => [0.95, 0.45, 0.35, 1.0],
        EnemyType::Strong => [0.9, 0.25, 0.6, 1.0],
        EnemyType::Elite => [1.0, 0.8, 0.2, 1.0],
    }
}

/// Tint mixed into the body color so variants read at a glance
pub fn variant_accent(variant: Variant) -> Color {
    match variant {
        Variant::Chaser => [1.0, 1.0, 1.0, 1.0],
        Variant::Volatile => [1.0, 0.55, 0.2, 1.0],
        Variant::Splitter => [0.5, 1.0, 0.6, 1.0],
        Variant::Artillery => [0.5, 0.7, 1.0, 1.0],
    }
}

pub fn bullet(source: WeaponId) -> Color {
    match source {
        WeaponId::Orbit => ORBIT_BULLET,
        _ => BULLET,
    }
}

pub fn text(kind: TextKind) -> Color {
    match kind {
        TextKind::Damage => [1.0, 1.0, 1.0, 1.0],
        TextKind::Crit => [1.0, 0.85, 0.2, 1.0],
        TextKind::Essence => [0.6, 0.9, 1.0, 1.0],
        TextKind::Alert => [1.0, 0.3, 0.4, 1.0],
    }
}

/// Component-wise multiply, keeping `a`'s alpha
pub fn tint(a: Color, b: Color) -> Color {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3]]
}

pub fn with_alpha(c: Color, alpha: f32) -> Color {
    [c[0], c[1], c[2], c[3] * alpha.clamp(0.0, 1.0)]
}

/// Push colors toward full saturation for the high-contrast setting
pub fn high_contrast(c: Color) -> Color {
    let max = c[0].max(c[1]).max(c[2]).max(1e-3);
    [c[0] / max, c[1] / max, c[2] / max, c[3]]
}
