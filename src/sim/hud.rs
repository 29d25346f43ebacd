//! Derived numbers for the HUD
//!
//! Plain values only; the frontend decides how to display them.

use super::enemy::{idle_rate, spawn_rate};
use super::state::GameState;
use super::weapons::estimate_dps;
use crate::format_amount;
use crate::tuning::Tuning;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudStats {
    pub dps_estimate: f32,
    pub measured_dps: f32,
    /// Enemies per second (zero during a boss fight)
    pub spawn_rate: f32,
    /// Essence per second from generators
    pub idle_rate: f64,
    pub wave: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub essence: f64,
    pub fragments: f64,
    pub enemies: usize,
    pub boss_hp: Option<f32>,
    pub running: bool,
}

impl HudStats {
    pub fn compute(state: &GameState, tuning: &Tuning) -> Self {
        Self {
            dps_estimate: estimate_dps(state, tuning),
            measured_dps: state.telemetry.measured_dps,
            spawn_rate: if state.boss_active() {
                0.0
            } else {
                spawn_rate(state.wave, &tuning.spawn)
            },
            idle_rate: idle_rate(state, tuning),
            wave: state.wave,
            hp: state.player.hp,
            max_hp: state.player.max_hp,
            essence: state.resources.essence,
            fragments: state.resources.fragments,
            enemies: state.enemies.len(),
            boss_hp: state
                .boss
                .as_ref()
                .map(|b| if b.max_hp > 0.0 { (b.hp / b.max_hp).max(0.0) } else { 0.0 }),
            running: state.running,
        }
    }

    /// Short text lines for the in-canvas overlay
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("WAVE {:.1}", self.wave),
            format!("HP {:.0}/{:.0}", self.hp.max(0.0), self.max_hp),
            format!("ESSENCE {}", format_amount(self.essence)),
            format!("FRAGMENTS {}", format_amount(self.fragments)),
            format!(
                "DPS {} ({})",
                format_amount(self.measured_dps as f64),
                format_amount(self.dps_estimate as f64)
            ),
        ];
        if self.idle_rate > 0.0 {
            lines.push(format!("IDLE +{}/S", format_amount(self.idle_rate)));
        }
        if !self.running {
            lines.push("DEFEATED - PRESS R".to_string());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hud_tracks_state() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.resources.essence = 1500.0;
        state.wave = 2.0;
        let hud = HudStats::compute(&state, &tuning);
        assert_eq!(hud.essence, 1500.0);
        assert_eq!(hud.hp, hud.max_hp);
        assert_eq!(hud.spawn_rate, spawn_rate(2.0, &tuning.spawn));
        assert!(hud.dps_estimate > 0.0);
        assert!(hud.boss_hp.is_none());
        assert!(hud.lines().iter().any(|l| l == "ESSENCE 1.50K"));
    }

    #[test]
    fn test_spawn_rate_zero_during_boss() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.wave = tuning.boss.wave_interval as f32;
        crate::sim::enemy::spawn_boss(&mut state, &tuning);
        let hud = HudStats::compute(&state, &tuning);
        assert_eq!(hud.spawn_rate, 0.0);
        assert_eq!(hud.boss_hp, Some(1.0));
    }
}
