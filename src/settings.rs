//! Game settings and preferences
//!
//! Persisted separately from game saves in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Particle pool size for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 1024,
            QualityPreset::Medium => 4096,
            QualityPreset::High => 16384,
        }
    }

    /// Particles emitted per enemy death
    pub fn burst_size(&self) -> usize {
        match self {
            QualityPreset::Low => 4,
            QualityPreset::Medium => 10,
            QualityPreset::High => 18,
        }
    }

    /// Next preset in Low → Medium → High → Low order
    pub fn next(&self) -> Self {
        match self {
            QualityPreset::Low => QualityPreset::Medium,
            QualityPreset::Medium => QualityPreset::High,
            QualityPreset::High => QualityPreset::Low,
        }
    }

    /// Whether polygons get a halo pass
    pub fn glow_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Decorative particle bursts
    pub particles: bool,
    /// Halo glow around shapes
    pub glow: bool,
    /// Damage and essence popups
    pub floating_text: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    // === Accessibility ===
    /// Reduced motion (fewer particles, no glow pulse)
    pub reduced_motion: bool,
    /// High contrast mode
    pub high_contrast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            particles: true,
            glow: true,
            floating_text: true,

            show_fps: true,

            reduced_motion: false,
            high_contrast: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset disables glow for fill-rate
        if preset == QualityPreset::Low {
            self.glow = false;
        }
    }

    /// Step to the next preset; leaving Low turns glow back on
    pub fn cycle_quality(&mut self) -> QualityPreset {
        if self.quality == QualityPreset::Low {
            self.glow = true;
        }
        let next = self.quality.next();
        self.apply_preset(next);
        next
    }

    /// Effective glow (respects preset)
    pub fn effective_glow(&self) -> bool {
        self.glow && self.quality.glow_enabled()
    }

    /// Effective particle pool size
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else if self.reduced_motion {
            self.quality.max_particles() / 4
        } else {
            self.quality.max_particles()
        }
    }

    /// Particles per death burst
    pub fn burst_size(&self) -> usize {
        if self.max_particles() == 0 {
            0
        } else if self.reduced_motion {
            (self.quality.burst_size() / 3).max(1)
        } else {
            self.quality.burst_size()
        }
    }

    /// Fold display preferences into the FX budget
    pub fn apply_to_tuning(&self, tuning: &mut Tuning) {
        if !self.floating_text {
            // Every gain then lands in the ticker line
            tuning.fx.max_floating_text = 0;
        }
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "essence_survivor_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring malformed settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parse() {
        assert_eq!(QualityPreset::parse("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::parse("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::parse("ultra"), None);
    }

    #[test]
    fn test_low_preset_disables_glow() {
        let settings = Settings::from_preset(QualityPreset::Low);
        assert!(!settings.effective_glow());
        assert!(Settings::from_preset(QualityPreset::High).effective_glow());
    }

    #[test]
    fn test_particle_budget() {
        let mut settings = Settings::default();
        assert_eq!(settings.max_particles(), QualityPreset::Medium.max_particles());
        settings.reduced_motion = true;
        assert!(settings.max_particles() < QualityPreset::Medium.max_particles());
        settings.particles = false;
        assert_eq!(settings.max_particles(), 0);
        assert_eq!(settings.burst_size(), 0);
    }

    #[test]
    fn test_floating_text_off_routes_to_ticker() {
        let settings = Settings {
            floating_text: false,
            ..Default::default()
        };
        let mut tuning = Tuning::default();
        settings.apply_to_tuning(&mut tuning);
        assert_eq!(tuning.fx.max_floating_text, 0);
    }

    #[test]
    fn test_cycle_quality_wraps_and_restores_glow() {
        let mut settings = Settings::default();
        assert_eq!(settings.cycle_quality(), QualityPreset::High);
        assert_eq!(settings.max_particles(), QualityPreset::High.max_particles());
        assert_eq!(settings.cycle_quality(), QualityPreset::Low);
        assert!(!settings.glow);
        assert_eq!(settings.max_particles(), QualityPreset::Low.max_particles());
        assert_eq!(settings.cycle_quality(), QualityPreset::Medium);
        assert!(settings.effective_glow());
    }

    #[test]
    fn test_partial_settings_json() {
        let settings: Settings = serde_json::from_str(r#"{"quality":"High"}"#).unwrap();
        assert_eq!(settings.quality, QualityPreset::High);
        assert!(settings.particles);
    }
}
