//! Save/load of meta progression
//!
//! Features:
//! - Versioned JSON envelope
//! - Malformed or future-version data is logged and ignored
//! - LocalStorage on wasm, no-op on native
//!
//! Only progression survives a reload: player stats, currencies,
//! generators, weapon slots and wave progress. A loaded run resumes at the
//! saved wave with an empty arena.

use serde::{Deserialize, Serialize};

use crate::sim::state::{GameState, Generators, Loadout, PlayerStats, Resources};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// LocalStorage key
pub const STORAGE_KEY: &str = "essence_survivor_save";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecord {
    pub version: u32,
    pub stats: PlayerStats,
    pub max_hp: f32,
    pub resources: Resources,
    pub generators: Generators,
    pub loadout: Loadout,
    #[serde(default)]
    pub wave: f32,
    #[serde(default)]
    pub last_boss_wave: u32,
}

impl SaveRecord {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            stats: state.player.stats.clone(),
            max_hp: state.player.max_hp,
            resources: state.resources.clone(),
            generators: state.generators.clone(),
            loadout: state.loadout.clone(),
            wave: state.wave,
            last_boss_wave: state.last_boss_wave,
        }
    }

    /// Copy progression into `state` and restart the arena at the saved wave
    pub fn apply_to(&self, state: &mut GameState) {
        state.player.stats = self.stats.clone();
        state.player.max_hp = self.max_hp.max(1.0);
        state.resources = self.resources.clone();
        state.generators = self.generators.clone();
        state.loadout = self.loadout.clone();
        state.soft_reset();
        state.wave = self.wave.max(0.0);
        state.last_boss_wave = self.last_boss_wave;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a save, falling back to `None` on any problem
    pub fn load_or_default(json: Option<&str>) -> Option<Self> {
        let json = json?;
        match Self::from_json(json) {
            Ok(record) if record.version <= SAVE_VERSION => Some(record),
            Ok(record) => {
                log::warn!(
                    "Ignoring save from newer version {} (supported {})",
                    record.version,
                    SAVE_VERSION
                );
                None
            }
            Err(e) => {
                log::warn!("Ignoring malformed save: {}", e);
                None
            }
        }
    }
}

/// Read the stored save (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn load() -> Option<SaveRecord> {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()?;
    let json = storage.get_item(STORAGE_KEY).ok().flatten();
    SaveRecord::load_or_default(json.as_deref())
}

/// Write the save (WASM only); best effort
#[cfg(target_arch = "wasm32")]
pub fn save(state: &GameState) {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten();

    if let Some(storage) = storage {
        match SaveRecord::from_state(state).to_json() {
            Ok(json) => {
                if storage.set_item(STORAGE_KEY, &json).is_err() {
                    log::warn!("LocalStorage rejected save");
                }
            }
            Err(e) => log::warn!("Failed to serialize save: {}", e),
        }
    }
}

/// Native stubs
#[cfg(not(target_arch = "wasm32"))]
pub fn load() -> Option<SaveRecord> {
    None
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save(_state: &GameState) {
    // No-op for native
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::WeaponId;
    use crate::tuning::Tuning;

    #[test]
    fn test_save_round_trip_keeps_progression() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, &tuning);
        state.player.stats.damage = 42.0;
        state.resources.essence = 999.0;
        state.generators.count = 3;
        state.loadout.unlock(WeaponId::Laser);
        state.loadout.get_mut(WeaponId::Laser).level = 4;
        state.wave = 12.5;
        state.last_boss_wave = 10;

        let json = SaveRecord::from_state(&state).to_json().unwrap();
        let record = SaveRecord::load_or_default(Some(&json)).unwrap();

        let mut fresh = GameState::new(2, &tuning);
        fresh.bullets.push(crate::sim::state::Bullet::new(
            glam::Vec2::ZERO,
            glam::Vec2::X,
            1.0,
            1.0,
            0,
            WeaponId::Spread,
        ));
        record.apply_to(&mut fresh);
        assert_eq!(fresh.player.stats.damage, 42.0);
        assert_eq!(fresh.resources.essence, 999.0);
        assert_eq!(fresh.generators.count, 3);
        assert!(fresh.loadout.is_active(WeaponId::Laser));
        assert_eq!(fresh.loadout.get(WeaponId::Laser).level, 4);
        assert_eq!(fresh.last_boss_wave, 10);
        assert_eq!(fresh.wave, 12.5);
        assert!(fresh.bullets.is_empty());
    }

    #[test]
    fn test_malformed_save_ignored() {
        assert!(SaveRecord::load_or_default(Some("{not json")).is_none());
        assert!(SaveRecord::load_or_default(Some(r#"{"version":1}"#)).is_none());
        assert!(SaveRecord::load_or_default(None).is_none());
    }

    #[test]
    fn test_newer_version_ignored() {
        let tuning = Tuning::default();
        let state = GameState::new(1, &tuning);
        let mut record = SaveRecord::from_state(&state);
        record.version = SAVE_VERSION + 1;
        let json = record.to_json().unwrap();
        assert!(SaveRecord::load_or_default(Some(&json)).is_none());
    }
}
