//! Game state and core simulation types
//!
//! One `GameState` holds everything a run mutates. It is owned by the
//! frontend and passed explicitly to every subsystem.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::spatial::SpatialHash;
use crate::tuning::{EnemyTuning, PlayerTuning, Tuning};

/// Difficulty tier, derived from hp relative to the wave baseline at spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyType {
    Weak,
    Normal,
    Strong,
    Elite,
}

impl EnemyType {
    pub fn classify(hp: f32, baseline: f32, elite: bool, tuning: &EnemyTuning) -> Self {
        if elite {
            return EnemyType::Elite;
        }
        let ratio = hp / baseline.max(f32::EPSILON);
        if ratio < tuning.weak_below {
            EnemyType::Weak
        } else if ratio > tuning.strong_above {
            EnemyType::Strong
        } else {
            EnemyType::Normal
        }
    }

    pub fn radius(self, tuning: &EnemyTuning) -> f32 {
        match self {
            EnemyType::Weak => tuning.radius_weak,
            EnemyType::Normal => tuning.radius_normal,
            EnemyType::Strong => tuning.radius_strong,
            EnemyType::Elite => tuning.radius_elite,
        }
    }
}

/// Enemy behavior tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Chaser,
    Volatile,
    Splitter,
    Artillery,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Chaser,
        Variant::Volatile,
        Variant::Splitter,
        Variant::Artillery,
    ];
}

/// Player stat bundle (meta-progression survives a soft reset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStats {
    pub damage: f32,
    pub fire_delay: f32,
    pub projectile_count: u32,
    pub regen: f32,
    pub range: f32,
    pub bullet_speed: f32,
    /// Fraction of incoming damage ignored, clamped to [0, 0.9] when applied
    pub damage_reduction: f32,
    pub pierce: u32,
    pub collection_radius: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub move_speed: f32,
    pub orbit_count: u32,
    pub orbit_fire_delay: f32,
    /// Continuously advancing ring phase (radians)
    pub spin_phase: f32,
}

impl PlayerStats {
    pub fn from_tuning(t: &PlayerTuning) -> Self {
        use crate::tuning::{BASE_BULLET_SPEED, BASE_DAMAGE, BASE_FIRE_DELAY, BASE_RANGE};
        Self {
            damage: BASE_DAMAGE,
            fire_delay: BASE_FIRE_DELAY,
            projectile_count: t.projectile_count.max(1),
            regen: t.regen,
            range: BASE_RANGE,
            bullet_speed: BASE_BULLET_SPEED,
            damage_reduction: 0.0,
            pierce: t.pierce,
            collection_radius: t.collection_radius,
            crit_chance: t.crit_chance,
            crit_multiplier: t.crit_multiplier,
            move_speed: t.move_speed,
            orbit_count: t.orbit_count,
            orbit_fire_delay: t.orbit_fire_delay,
            spin_phase: 0.0,
        }
    }

    /// Projectiles granted beyond the first
    pub fn extra_projectiles(&self) -> u32 {
        self.projectile_count.saturating_sub(1)
    }
}

/// The player character
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub dead: bool,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: Vec2::new(tuning.arena.width, tuning.arena.height) * 0.5,
            vel: Vec2::ZERO,
            radius: tuning.player.radius,
            hp: tuning.player.max_hp,
            max_hp: tuning.player.max_hp,
            dead: false,
            stats: PlayerStats::from_tuning(&tuning.player),
        }
    }

    /// Zero transient fields, keep stats
    pub fn soft_reset(&mut self, center: Vec2) {
        self.pos = center;
        self.vel = Vec2::ZERO;
        self.hp = self.max_hp;
        self.dead = false;
        self.stats.spin_phase = 0.0;
    }

    /// Apply damage after damage reduction; returns the amount taken
    pub fn take_damage(&mut self, raw: f32) -> f32 {
        if self.dead || raw <= 0.0 {
            return 0.0;
        }
        let reduction = self.stats.damage_reduction.clamp(0.0, 0.9);
        let applied = raw * (1.0 - reduction);
        self.hp = (self.hp - applied).clamp(0.0, self.max_hp);
        if self.hp <= 0.0 {
            self.dead = true;
        }
        applied
    }

    pub fn heal(&mut self, amount: f32) {
        if !self.dead {
            self.hp = (self.hp + amount).clamp(0.0, self.max_hp);
        }
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp > 0.0 { self.hp / self.max_hp } else { 0.0 }
    }
}

/// A regular enemy
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub reward: f64,
    pub fire_timer: f32,
    pub fire_delay: f32,
    pub elite: bool,
    pub kind: EnemyType,
    pub variant: Variant,
    /// Split depth (0 for spawned enemies)
    pub generation: u32,
    pub hit_this_frame: bool,
}

impl Enemy {
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Largest speed the steering and knockback may produce
    pub fn speed_cap(&self, tuning: &EnemyTuning) -> f32 {
        self.speed * tuning.max_speed_ratio
    }
}

/// The singleton boss
#[derive(Debug, Clone)]
pub struct Boss {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub reward: f64,
    pub fire_timer: f32,
    pub wave: u32,
    pub hit_this_frame: bool,
}

/// Weapons, in dispatch-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponId {
    Spread,
    Orbit,
    Lightning,
    Laser,
    Missiles,
}

impl WeaponId {
    pub const COUNT: usize = 5;
    pub const ALL: [WeaponId; Self::COUNT] = [
        WeaponId::Spread,
        WeaponId::Orbit,
        WeaponId::Lightning,
        WeaponId::Laser,
        WeaponId::Missiles,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            WeaponId::Spread => "Spread",
            WeaponId::Orbit => "Orbit",
            WeaponId::Lightning => "Lightning",
            WeaponId::Laser => "Laser",
            WeaponId::Missiles => "Missiles",
        }
    }
}

/// Unlock/level/cooldown state for one weapon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponSlot {
    pub unlocked: bool,
    pub level: u32,
    #[serde(skip)]
    pub cooldown: f32,
}

/// All weapon slots, indexed by [`WeaponId`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loadout {
    pub slots: [WeaponSlot; WeaponId::COUNT],
}

impl Default for Loadout {
    fn default() -> Self {
        let mut loadout = Self {
            slots: Default::default(),
        };
        loadout.unlock(WeaponId::Spread);
        loadout
    }
}

impl Loadout {
    pub fn get(&self, id: WeaponId) -> &WeaponSlot {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: WeaponId) -> &mut WeaponSlot {
        &mut self.slots[id.index()]
    }

    pub fn is_active(&self, id: WeaponId) -> bool {
        let slot = self.get(id);
        slot.unlocked && slot.level > 0
    }

    /// Unlock a weapon at level 1 (no-op if already unlocked)
    pub fn unlock(&mut self, id: WeaponId) {
        let slot = self.get_mut(id);
        if !slot.unlocked {
            slot.unlocked = true;
            slot.level = slot.level.max(1);
        }
    }

    pub fn disable(&mut self, id: WeaponId) {
        self.get_mut(id).unlocked = false;
    }
}

/// Per-weapon damage accounting
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub damage: [f64; WeaponId::COUNT],
    /// Exponentially smoothed measured damage per second
    pub measured_dps: f32,
    pub(crate) frame_damage: f32,
}

impl Telemetry {
    pub fn record(&mut self, source: WeaponId, amount: f32) {
        self.damage[source.index()] += amount as f64;
        self.frame_damage += amount;
    }
}

/// Player bullet
#[derive(Debug, Clone)]
pub struct Bullet {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub damage: f32,
    /// Additional enemies this bullet may pass through
    pub pierce: u32,
    pub source: WeaponId,
    /// Enemies already struck (a piercing bullet hits each enemy once)
    pub hit_ids: Vec<u32>,
    pub dead: bool,
}

impl Bullet {
    pub fn new(pos: Vec2, vel: Vec2, life: f32, damage: f32, pierce: u32, source: WeaponId) -> Self {
        Self {
            pos,
            vel,
            life,
            damage,
            pierce,
            source,
            hit_ids: Vec::new(),
            dead: false,
        }
    }

    /// Register a hit; the bullet dies once its pierce is spent
    pub fn consume_hit(&mut self) {
        if self.pierce > 0 {
            self.pierce -= 1;
        } else {
            self.dead = true;
        }
    }
}

/// Projectile fired by artillery enemies and the boss
#[derive(Debug, Clone)]
pub struct EnemyProjectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub damage: f32,
    pub radius: f32,
}

/// Steering missile
#[derive(Debug, Clone)]
pub struct HomingMissile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub damage: f32,
    pub speed: f32,
    /// Max heading change (rad/s)
    pub turn_rate: f32,
    pub radius: f32,
    pub dead: bool,
}

/// Currency pickup
#[derive(Debug, Clone)]
pub struct FragmentOrb {
    pub pos: Vec2,
    pub vel: Vec2,
    pub value: f64,
    pub life: f32,
}

#[derive(Debug, Clone)]
pub struct LightningBolt {
    pub points: Vec<Vec2>,
    pub life: f32,
    pub max_life: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct LaserBeam {
    pub start: Vec2,
    pub end: Vec2,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Damage,
    Crit,
    Essence,
    Alert,
}

#[derive(Debug, Clone)]
pub struct FloatingText {
    pub pos: Vec2,
    pub text: String,
    pub kind: TextKind,
    pub life: f32,
    pub max_life: f32,
}

/// Gains that overflowed the fragment/text budgets, shown as one HUD line
#[derive(Debug, Clone, Default)]
pub struct GainTicker {
    pub essence: f64,
    pub fragments: f64,
    /// Seconds until the ticker clears
    pub timer: f32,
}

impl GainTicker {
    pub fn is_empty(&self) -> bool {
        self.essence == 0.0 && self.fragments == 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    pub essence: f64,
    pub fragments: f64,
    /// Lifetime essence earned
    #[serde(default)]
    pub total_essence: f64,
}

impl Resources {
    pub fn add_essence(&mut self, amount: f64) {
        self.essence += amount;
        self.total_essence += amount;
    }
}

/// Passive essence producers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Generators {
    pub count: u32,
}

/// Events produced during a tick, drained by the frontend
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    EnemyKilled { pos: Vec2, variant: Variant, elite: bool },
    Explosion { pos: Vec2, radius: f32 },
    BossSpawned { wave: u32 },
    BossDefeated { pos: Vec2, wave: u32 },
    PlayerHit { amount: f32 },
    FragmentCollected { pos: Vec2, value: f64 },
    PlayerDied,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Simulation is advanced only while set
    pub running: bool,
    /// Elapsed simulated seconds
    pub time: f32,
    /// Continuous wave progress
    pub wave: f32,
    /// Logical canvas size
    pub bounds: Vec2,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub boss: Option<Boss>,
    pub last_boss_wave: u32,
    pub bullets: Vec<Bullet>,
    pub enemy_projectiles: Vec<EnemyProjectile>,
    pub missiles: Vec<HomingMissile>,
    pub fragments: Vec<FragmentOrb>,
    pub bolts: Vec<LightningBolt>,
    pub beams: Vec<LaserBeam>,
    pub floating_text: Vec<FloatingText>,
    /// Orbit ring visual positions
    pub orbit_orbs: Vec<Vec2>,
    pub ticker: GainTicker,
    pub resources: Resources,
    pub generators: Generators,
    pub loadout: Loadout,
    pub telemetry: Telemetry,
    pub spawn_accumulator: f32,
    pub events: Vec<GameEvent>,
    /// Enemy index, rebuilt every tick
    pub grid: SpatialHash,
    pub rng: Pcg32,
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64, tuning: &Tuning) -> Self {
        Self {
            running: true,
            time: 0.0,
            wave: 0.0,
            bounds: Vec2::new(tuning.arena.width, tuning.arena.height),
            player: Player::new(tuning),
            enemies: Vec::new(),
            boss: None,
            last_boss_wave: 0,
            bullets: Vec::new(),
            enemy_projectiles: Vec::new(),
            missiles: Vec::new(),
            fragments: Vec::new(),
            bolts: Vec::new(),
            beams: Vec::new(),
            floating_text: Vec::new(),
            orbit_orbs: Vec::new(),
            ticker: GainTicker::default(),
            resources: Resources::default(),
            generators: Generators::default(),
            loadout: Loadout::default(),
            telemetry: Telemetry::default(),
            spawn_accumulator: 0.0,
            events: Vec::new(),
            grid: SpatialHash::new(tuning.arena.cell_size),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn wave_index(&self) -> u32 {
        self.wave.max(0.0).floor() as u32
    }

    pub fn center(&self) -> Vec2 {
        self.bounds * 0.5
    }

    pub fn boss_active(&self) -> bool {
        self.boss.is_some()
    }

    /// Start a new run, keeping resources, stats, generators and weapons
    pub fn soft_reset(&mut self) {
        let center = self.center();
        self.player.soft_reset(center);
        self.running = true;
        self.time = 0.0;
        self.wave = 0.0;
        self.last_boss_wave = 0;
        self.boss = None;
        self.enemies.clear();
        self.bullets.clear();
        self.enemy_projectiles.clear();
        self.missiles.clear();
        self.fragments.clear();
        self.bolts.clear();
        self.beams.clear();
        self.floating_text.clear();
        self.orbit_orbs.clear();
        self.ticker = GainTicker::default();
        self.spawn_accumulator = 0.0;
        self.events.clear();
        self.grid.clear();
        for slot in &mut self.loadout.slots {
            slot.cooldown = 0.0;
        }
    }

    /// Drop a fragment orb, or credit the ticker when at the fragment budget
    pub fn drop_fragment(&mut self, pos: Vec2, value: f64, tuning: &Tuning) {
        if value <= 0.0 {
            return;
        }
        if self.fragments.len() >= tuning.fx.max_fragments {
            self.resources.fragments += value;
            self.ticker.fragments += value;
            self.ticker.timer = tuning.fx.ticker_hold;
            return;
        }
        let speed = tuning.physics.fragment_launch_speed;
        let angle = self
            .rng
            .random_range(-std::f32::consts::PI * 0.85..-std::f32::consts::PI * 0.15);
        let vel = Vec2::new(angle.cos(), angle.sin()) * speed * self.rng.random_range(0.5..1.0);
        self.fragments.push(FragmentOrb {
            pos,
            vel,
            value,
            life: tuning.physics.fragment_lifetime,
        });
    }

    /// Show an essence gain as floating text, or merge it into the ticker
    pub fn essence_popup(&mut self, pos: Vec2, amount: f64, tuning: &Tuning) {
        if self.floating_text.len() >= tuning.fx.max_floating_text {
            self.ticker.essence += amount;
            self.ticker.timer = tuning.fx.ticker_hold;
            return;
        }
        self.push_text(pos, format!("+{}", crate::format_amount(amount)), TextKind::Essence, tuning);
    }

    /// Push floating text if there is budget left; returns false when dropped
    pub fn push_text(&mut self, pos: Vec2, text: String, kind: TextKind, tuning: &Tuning) -> bool {
        if self.floating_text.len() >= tuning.fx.max_floating_text {
            return false;
        }
        let life = tuning.fx.floating_text_life;
        self.floating_text.push(FloatingText {
            pos,
            text,
            kind,
            life,
            max_life: life,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pierce_never_negative() {
        let mut bullet = Bullet::new(Vec2::ZERO, Vec2::X, 1.0, 5.0, 1, WeaponId::Spread);
        bullet.consume_hit();
        assert_eq!(bullet.pierce, 0);
        assert!(!bullet.dead);
        bullet.consume_hit();
        assert_eq!(bullet.pierce, 0);
        assert!(bullet.dead);
    }

    #[test]
    fn test_player_health_clamped() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning);
        player.heal(1000.0);
        assert_eq!(player.hp, player.max_hp);
        player.take_damage(player.max_hp * 5.0);
        assert_eq!(player.hp, 0.0);
        assert!(player.dead);
        // Dead players do not heal back
        player.heal(10.0);
        assert_eq!(player.hp, 0.0);
    }

    #[test]
    fn test_damage_reduction_applied() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning);
        player.stats.damage_reduction = 0.25;
        let taken = player.take_damage(20.0);
        assert!((taken - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_soft_reset_keeps_meta_progress() {
        let tuning = Tuning::default();
        let mut state = GameState::new(7, &tuning);
        state.player.stats.damage = 55.0;
        state.resources.essence = 120.0;
        state.wave = 7.5;
        state.player.take_damage(1000.0);
        state.running = false;
        state.soft_reset();
        assert!(state.running);
        assert!(!state.player.dead);
        assert_eq!(state.player.hp, state.player.max_hp);
        assert_eq!(state.player.stats.damage, 55.0);
        assert_eq!(state.resources.essence, 120.0);
        assert_eq!(state.wave, 0.0);
    }

    #[test]
    fn test_fragment_budget_overflows_into_ticker() {
        let mut tuning = Tuning::default();
        tuning.fx.max_fragments = 1;
        let mut state = GameState::new(1, &tuning);
        state.drop_fragment(Vec2::new(10.0, 10.0), 2.0, &tuning);
        state.drop_fragment(Vec2::new(10.0, 10.0), 3.0, &tuning);
        assert_eq!(state.fragments.len(), 1);
        assert_eq!(state.ticker.fragments, 3.0);
        assert_eq!(state.resources.fragments, 3.0);
    }

    #[test]
    fn test_enemy_type_classification() {
        let t = EnemyTuning::default();
        assert_eq!(EnemyType::classify(5.0, 10.0, false, &t), EnemyType::Weak);
        assert_eq!(EnemyType::classify(10.0, 10.0, false, &t), EnemyType::Normal);
        assert_eq!(EnemyType::classify(20.0, 10.0, false, &t), EnemyType::Strong);
        assert_eq!(EnemyType::classify(1.0, 10.0, true, &t), EnemyType::Elite);
    }
}
