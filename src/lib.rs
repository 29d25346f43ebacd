//! Essence Survivor - An incremental auto-battler in the browser
//!
//! Core modules:
//! - `sim`: Combat simulation (weapons, physics, collisions, game state)
//! - `renderer`: WebGPU instanced renderer and particle engine
//! - `persistence`: Best-effort save/load of meta progression
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences

pub mod error;
pub mod persistence;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::RenderError;
pub use settings::{QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Player velocity blend toward the input direction (1/s)
    pub const PLAYER_ACCEL: f32 = 12.0;
    /// Floating text rise speed (px/s)
    pub const FLOAT_TEXT_RISE: f32 = 28.0;
    /// Seconds between autosaves
    pub const AUTOSAVE_INTERVAL: f32 = 10.0;
    /// Grid spacing of the arena background (logical px)
    pub const GRID_SPACING: f32 = 48.0;
}

/// Distance from `p` to the segment `a..b`
#[inline]
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Compact number formatting for HUD and popups (`950`, `12.5`, `1.50K`, `3.20M`)
pub fn format_amount(value: f64) -> String {
    const SUFFIXES: [&str; 6] = ["", "K", "M", "B", "T", "Q"];
    if !value.is_finite() {
        return "0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let mut v = value.abs();
    if v < 1000.0 {
        return if (v - v.round()).abs() < 0.05 {
            format!("{sign}{:.0}", v)
        } else {
            format!("{sign}{:.1}", v)
        };
    }
    let mut tier = 0;
    while v >= 1000.0 && tier < SUFFIXES.len() - 1 {
        v /= 1000.0;
        tier += 1;
    }
    format!("{sign}{:.2}{}", v, SUFFIXES[tier])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_segment_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert!((point_segment_distance(Vec2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-5);
        assert!((point_segment_distance(Vec2::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-5);
        assert!((point_segment_distance(Vec2::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-5);
        // Degenerate segment
        assert!((point_segment_distance(Vec2::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(3.0), "3");
        assert_eq!(format_amount(0.6), "0.6");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(1500.0), "1.50K");
        assert_eq!(format_amount(3_200_000.0), "3.20M");
        assert_eq!(format_amount(-2500.0), "-2.50K");
        assert_eq!(format_amount(f64::NAN), "0");
    }
}
