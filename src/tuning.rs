//! Data-driven game balance
//!
//! Every numeric constant the simulation reads comes from [`Tuning`]. The
//! struct is plain data: it can be loaded from JSON (missing fields fall back
//! to defaults) and swapped out between ticks. Resetting the run after a
//! tuning change is the caller's decision.

use serde::{Deserialize, Serialize};

use crate::sim::state::Variant;

/// Baselines the global weapon multipliers are measured against
pub const BASE_DAMAGE: f32 = 10.0;
pub const BASE_FIRE_DELAY: f32 = 0.6;
pub const BASE_RANGE: f32 = 260.0;
pub const BASE_BULLET_SPEED: f32 = 420.0;

/// Complete tuning table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub spawn: SpawnTuning,
    pub enemy: EnemyTuning,
    pub variants: VariantTable,
    pub boss: BossTuning,
    pub weapons: WeaponTuning,
    pub physics: PhysicsTuning,
    pub economy: EconomyTuning,
    pub fx: FxBudget,
}

impl Tuning {
    /// Parse a (possibly partial) tuning table from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    /// Logical canvas size in CSS pixels
    pub width: f32,
    pub height: f32,
    /// Spawn distance outside the visible edge
    pub spawn_margin: f32,
    /// Spatial hash cell size
    pub cell_size: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
            spawn_margin: 30.0,
            cell_size: 64.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub radius: f32,
    pub max_hp: f32,
    pub regen: f32,
    pub move_speed: f32,
    pub projectile_count: u32,
    pub pierce: u32,
    pub collection_radius: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub orbit_count: u32,
    pub orbit_fire_delay: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: 14.0,
            max_hp: 100.0,
            regen: 0.5,
            move_speed: 160.0,
            projectile_count: 1,
            pierce: 0,
            collection_radius: 120.0,
            crit_chance: 0.05,
            crit_multiplier: 2.0,
            orbit_count: 2,
            orbit_fire_delay: 1.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Enemies per second at wave 0
    pub base_rate: f32,
    /// Additional enemies per second per wave
    pub rate_per_wave: f32,
    pub max_rate: f32,
    /// Wave progress per second
    pub wave_per_second: f32,
    pub base_hp: f32,
    /// Multiplicative hp growth per wave
    pub hp_growth: f32,
    pub base_speed: f32,
    pub speed_per_wave: f32,
    pub base_reward: f32,
    pub reward_growth: f32,
    /// hp roll range relative to the wave baseline
    pub hp_roll_min: f32,
    pub hp_roll_max: f32,
    pub elite_chance: f32,
    pub elite_hp_mult: f32,
    pub elite_speed_mult: f32,
    pub elite_reward_mult: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            base_rate: 1.2,
            rate_per_wave: 0.18,
            max_rate: 9.0,
            wave_per_second: 1.0 / 30.0,
            base_hp: 12.0,
            hp_growth: 1.16,
            base_speed: 55.0,
            speed_per_wave: 1.5,
            base_reward: 1.0,
            reward_growth: 1.1,
            hp_roll_min: 0.6,
            hp_roll_max: 1.9,
            elite_chance: 0.04,
            elite_hp_mult: 4.0,
            elite_speed_mult: 1.25,
            elite_reward_mult: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Steering acceleration (1/s)
    pub accel: f32,
    /// Speed cap relative to the enemy's nominal speed
    pub max_speed_ratio: f32,
    pub radius_weak: f32,
    pub radius_normal: f32,
    pub radius_strong: f32,
    pub radius_elite: f32,
    /// hp/baseline thresholds for type derivation
    pub weak_below: f32,
    pub strong_above: f32,
    /// Contact damage per second at wave 0
    pub contact_dps: f32,
    pub contact_wave_scale: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            accel: 3.5,
            max_speed_ratio: 2.5,
            radius_weak: 8.0,
            radius_normal: 11.0,
            radius_strong: 14.0,
            radius_elite: 17.0,
            weak_below: 0.85,
            strong_above: 1.45,
            contact_dps: 9.0,
            contact_wave_scale: 0.12,
        }
    }
}

/// Per-variant configuration, keyed by [`Variant`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantTable {
    pub chaser: VariantConfig,
    pub volatile: VariantConfig,
    pub splitter: VariantConfig,
    pub artillery: VariantConfig,
    pub explosion: ExplosionConfig,
    pub split: SplitConfig,
    pub ranged: RangedConfig,
}

impl VariantTable {
    pub fn get(&self, variant: Variant) -> &VariantConfig {
        match variant {
            Variant::Chaser => &self.chaser,
            Variant::Volatile => &self.volatile,
            Variant::Splitter => &self.splitter,
            Variant::Artillery => &self.artillery,
        }
    }
}

impl Default for VariantTable {
    fn default() -> Self {
        Self {
            chaser: VariantConfig {
                weight: 60.0,
                min_wave: 0.0,
                hp_mult: 1.0,
                speed_mult: 1.0,
            },
            volatile: VariantConfig {
                weight: 16.0,
                min_wave: 2.0,
                hp_mult: 0.8,
                speed_mult: 1.2,
            },
            splitter: VariantConfig {
                weight: 14.0,
                min_wave: 3.0,
                hp_mult: 1.3,
                speed_mult: 0.9,
            },
            artillery: VariantConfig {
                weight: 10.0,
                min_wave: 4.0,
                hp_mult: 0.9,
                speed_mult: 0.8,
            },
            explosion: ExplosionConfig::default(),
            split: SplitConfig::default(),
            ranged: RangedConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Relative spawn weight
    pub weight: f32,
    /// Variant is not rolled before this wave
    pub min_wave: f32,
    pub hp_mult: f32,
    pub speed_mult: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionConfig {
    pub radius: f32,
    pub damage: f32,
    pub damage_wave_scale: f32,
    /// Knockback impulse at the blast center (px/s)
    pub knockback: f32,
}

impl Default for ExplosionConfig {
    fn default() -> Self {
        Self {
            radius: 85.0,
            damage: 8.0,
            damage_wave_scale: 0.1,
            knockback: 340.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub children: u32,
    pub max_generation: u32,
    pub hp_scale: f32,
    pub speed_scale: f32,
    pub reward_scale: f32,
    pub radius_scale: f32,
    pub launch_speed: f32,
    pub jitter: f32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            children: 2,
            max_generation: 2,
            hp_scale: 0.45,
            speed_scale: 1.15,
            reward_scale: 0.5,
            radius_scale: 0.75,
            launch_speed: 140.0,
            jitter: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangedConfig {
    pub preferred_range: f32,
    /// Retreat when closer than preferred_range * retreat_ratio
    pub retreat_ratio: f32,
    pub fire_range: f32,
    pub fire_delay: f32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub damage_wave_scale: f32,
    pub projectile_radius: f32,
    pub projectile_lifetime: f32,
}

impl Default for RangedConfig {
    fn default() -> Self {
        Self {
            preferred_range: 230.0,
            retreat_ratio: 0.7,
            fire_range: 320.0,
            fire_delay: 2.4,
            projectile_speed: 190.0,
            projectile_damage: 6.0,
            damage_wave_scale: 0.1,
            projectile_radius: 5.0,
            projectile_lifetime: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Boss appears at every positive multiple of this wave
    pub wave_interval: u32,
    /// hp relative to the wave baseline
    pub hp_mult: f32,
    pub speed: f32,
    /// Slower than regular enemies for a heavier feel
    pub accel: f32,
    pub max_speed_ratio: f32,
    pub radius: f32,
    pub reward_mult: f32,
    pub fragment_mult: f32,
    pub fire_delay: f32,
    pub shots: u32,
    pub spread: f32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_radius: f32,
    pub contact_mult: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            wave_interval: 5,
            hp_mult: 45.0,
            speed: 38.0,
            accel: 1.2,
            max_speed_ratio: 1.5,
            radius: 38.0,
            reward_mult: 40.0,
            fragment_mult: 10.0,
            fire_delay: 1.6,
            shots: 5,
            spread: 0.9,
            projectile_speed: 210.0,
            projectile_damage: 10.0,
            projectile_radius: 7.0,
            contact_mult: 3.0,
        }
    }
}

/// Base stat curve of a single weapon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponBase {
    pub damage: f32,
    pub damage_level_mult: f32,
    pub cooldown: f32,
    pub cooldown_level_mult: f32,
    pub range: f32,
    pub range_level_mult: f32,
}

impl Default for WeaponBase {
    fn default() -> Self {
        Self {
            damage: 10.0,
            damage_level_mult: 1.15,
            cooldown: 1.0,
            cooldown_level_mult: 0.95,
            range: 260.0,
            range_level_mult: 1.03,
        }
    }
}

impl WeaponBase {
    pub fn damage_at(&self, level: u32) -> f32 {
        self.damage * self.damage_level_mult.powi(level.saturating_sub(1) as i32)
    }

    pub fn cooldown_at(&self, level: u32) -> f32 {
        self.cooldown * self.cooldown_level_mult.powi(level.saturating_sub(1) as i32)
    }

    pub fn range_at(&self, level: u32) -> f32 {
        self.range * self.range_level_mult.powi(level.saturating_sub(1) as i32)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTuning {
    pub spread: WeaponBase,
    pub orbit: WeaponBase,
    pub lightning: WeaponBase,
    pub laser: WeaponBase,
    pub missiles: WeaponBase,
    /// Cone width of the spread weapon (radians)
    pub spread_cone: f32,
    pub levels_per_extra_projectile: u32,
    pub bullet_lifetime: f32,
    pub orbit_radius: f32,
    pub orbit_per_extra: f32,
    pub max_orbs: u32,
    /// Ring spin at baseline bullet speed (rad/s)
    pub orbit_spin: f32,
    pub chain_count: u32,
    pub chain_range_ratio: f32,
    pub chain_falloff: f32,
    pub bolt_life: f32,
    pub bolt_jitter: f32,
    pub laser_width: f32,
    pub missile_speed: f32,
    pub missile_turn_rate: f32,
    pub missile_lifetime: f32,
    pub missile_radius: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            spread: WeaponBase {
                damage: BASE_DAMAGE,
                cooldown: BASE_FIRE_DELAY,
                range: BASE_RANGE,
                ..WeaponBase::default()
            },
            orbit: WeaponBase {
                damage: 7.0,
                cooldown: 1.0,
                range: 200.0,
                ..WeaponBase::default()
            },
            lightning: WeaponBase {
                damage: 14.0,
                cooldown: 1.8,
                range: 240.0,
                ..WeaponBase::default()
            },
            laser: WeaponBase {
                // Damage per second for the continuous beam
                damage: 18.0,
                cooldown: 0.0,
                range: 300.0,
                ..WeaponBase::default()
            },
            missiles: WeaponBase {
                damage: 22.0,
                cooldown: 2.2,
                range: 400.0,
                ..WeaponBase::default()
            },
            spread_cone: std::f32::consts::FRAC_PI_4,
            levels_per_extra_projectile: 2,
            bullet_lifetime: 2.0,
            orbit_radius: 42.0,
            orbit_per_extra: 0.5,
            max_orbs: 12,
            orbit_spin: 2.4,
            chain_count: 3,
            chain_range_ratio: 0.8,
            chain_falloff: 0.6,
            bolt_life: 0.18,
            bolt_jitter: 9.0,
            laser_width: 10.0,
            missile_speed: 260.0,
            missile_turn_rate: 4.0,
            missile_lifetime: 4.0,
            missile_radius: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Largest time step a single tick will integrate
    pub max_dt: f32,
    /// Bullets live until this far outside the canvas
    pub bullet_padding: f32,
    /// Extra slack added to enemy radius in bullet hit tests
    pub bullet_hit_slack: f32,
    pub fragment_gravity: f32,
    /// Fraction of velocity lost per 60 Hz frame
    pub fragment_drag: f32,
    pub fragment_radius: f32,
    pub floor_bounce: f32,
    pub wall_bounce: f32,
    pub floor_friction: f32,
    /// Attraction acceleration at the edge of the collection radius
    pub attract_accel: f32,
    pub pickup_radius: f32,
    pub fusion_radius: f32,
    pub fragment_lifetime: f32,
    pub fragment_launch_speed: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            max_dt: 0.05,
            bullet_padding: 40.0,
            bullet_hit_slack: 4.0,
            fragment_gravity: 520.0,
            fragment_drag: 0.02,
            fragment_radius: 5.0,
            floor_bounce: 0.45,
            wall_bounce: 0.6,
            floor_friction: 0.85,
            attract_accel: 900.0,
            pickup_radius: 10.0,
            fusion_radius: 9.0,
            fragment_lifetime: 25.0,
            fragment_launch_speed: 160.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTuning {
    /// Essence per second per generator
    pub generator_rate: f64,
    pub generator_growth: f64,
    /// Fragment value relative to the essence reward
    pub fragment_ratio: f64,
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            generator_rate: 0.8,
            generator_growth: 1.07,
            fragment_ratio: 0.25,
        }
    }
}

/// Entity and effect budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FxBudget {
    pub max_enemies: usize,
    pub max_bullets: usize,
    pub max_fragments: usize,
    pub max_enemy_projectiles: usize,
    pub max_missiles: usize,
    pub max_floating_text: usize,
    pub max_bolts: usize,
    pub floating_text_life: f32,
    /// Seconds for the gain ticker to fade after the last overflow
    pub ticker_hold: f32,
}

impl Default for FxBudget {
    fn default() -> Self {
        Self {
            max_enemies: 220,
            max_bullets: 400,
            max_fragments: 140,
            max_enemy_projectiles: 160,
            max_missiles: 48,
            max_floating_text: 48,
            max_bolts: 16,
            floating_text_life: 0.9,
            ticker_hold: 2.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "boss": { "wave_interval": 3 } }"#).unwrap();
        assert_eq!(tuning.boss.wave_interval, 3);
        assert_eq!(tuning.boss.shots, BossTuning::default().shots);
        assert_eq!(tuning.fx.max_bullets, FxBudget::default().max_bullets);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(Tuning::from_json("{ not json").is_err());
    }

    #[test]
    fn test_level_curve() {
        let base = WeaponBase {
            damage: 10.0,
            damage_level_mult: 2.0,
            ..WeaponBase::default()
        };
        assert_eq!(base.damage_at(1), 10.0);
        assert_eq!(base.damage_at(3), 40.0);
        // Level 0 is treated as level 1
        assert_eq!(base.damage_at(0), 10.0);
    }
}
