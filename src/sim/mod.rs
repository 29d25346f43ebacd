//! Combat simulation
//!
//! All gameplay logic lives here:
//! - One `GameState` passed explicitly to every subsystem
//! - Clamped per-frame timestep
//! - No rendering or platform dependencies; the frontend drains `GameEvent`s

pub mod collision;
pub mod enemy;
pub mod hud;
pub mod physics;
pub mod spatial;
pub mod state;
pub mod tick;
pub mod weapons;

pub use hud::HudStats;
pub use spatial::SpatialHash;
pub use state::{
    Boss, Bullet, Enemy, EnemyProjectile, EnemyType, FragmentOrb, GameEvent, GameState,
    HomingMissile, Loadout, Player, PlayerStats, TextKind, Variant, WeaponId, WeaponSlot,
};
pub use tick::{TickInput, tick};
pub use weapons::{WEAPON_TABLE, WeaponBehavior, WeaponContext};
