//! Decorative particle engine
//!
//! Particles live in a square grid of texels, each `[x, y, vx, vy]`. A texel
//! whose position and velocity are both near zero is inactive. Two backends
//! share this layout:
//! - `GpuParticles`: ping-pong `Rgba32Float` textures stepped in a fragment
//!   shader, drawn as one instanced quad per texel
//! - `CpuParticles`: the same texels in a `Vec`, stepped by `step_texel` and
//!   drawn through the instanced shape renderer
//!
//! Both use `particle_capacity`, `SpawnCursor` and the integration rule in
//! `step_texel` (mirrored by `particle_sim.wgsl`), so they behave the same.

pub mod cpu;
pub mod gpu;

pub use cpu::CpuParticles;
pub use gpu::GpuParticles;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::batch::FrameBatch;

/// x, y, vx, vy
pub type Texel = [f32; 4];

pub const INACTIVE: Texel = [0.0; 4];

/// Below this summed magnitude a texel counts as inactive
pub const ACTIVE_EPSILON: f32 = 1e-3;
/// Speed under which a grounded particle is considered at rest (px/s)
pub const REST_SPEED: f32 = 6.0;

/// Common contract of both particle backends
pub trait ParticleSystem {
    /// Write one particle; `None` takes the next slot of the circular cursor.
    /// Returns the slot used.
    fn spawn(&mut self, index: Option<usize>, pos: Vec2, vel: Vec2) -> usize;

    /// Spawn several particles through the cursor; returns how many were written
    fn spawn_batch(&mut self, particles: &[(Vec2, Vec2)]) -> usize {
        if self.count() == 0 {
            return 0;
        }
        for &(pos, vel) in particles {
            self.spawn(None, pos, vel);
        }
        particles.len()
    }

    /// Advance every particle by `dt` seconds
    fn step(&mut self, dt: f32);

    /// Record per-frame draw data before the render pass begins
    fn prepare(&mut self, batch: &mut FrameBatch);

    /// Issue draw calls inside the main pass (no-op for the CPU backend)
    fn render(&self, pass: &mut wgpu::RenderPass<'_>);

    /// Simulation area in logical pixels
    fn set_bounds(&mut self, width: f32, height: f32);

    /// Deactivate every particle
    fn clear(&mut self);

    /// Number of particle slots
    fn count(&self) -> usize;

    /// Release backend resources; the system is empty afterwards
    fn dispose(&mut self);
}

/// Slots allocated for a requested particle count: a square power-of-two grid
pub fn particle_capacity(requested: usize) -> (u32, usize) {
    if requested == 0 {
        return (0, 0);
    }
    let side = ((requested as f64).sqrt().ceil() as u32).next_power_of_two();
    (side, (side as usize) * (side as usize))
}

/// Circular slot allocator shared by both backends
#[derive(Debug, Clone, Default)]
pub struct SpawnCursor {
    capacity: usize,
    next: usize,
}

impl SpawnCursor {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, next: 0 }
    }

    /// Slot for a spawn; explicit indices wrap into range and leave the
    /// cursor alone
    pub fn allocate(&mut self, index: Option<usize>) -> Option<usize> {
        if self.capacity == 0 {
            return None;
        }
        match index {
            Some(i) => Some(i % self.capacity),
            None => {
                let slot = self.next;
                self.next = (self.next + 1) % self.capacity;
                Some(slot)
            }
        }
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Integration constants, laid out to match the shader uniform
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleParams {
    /// Simulation area (logical px)
    pub bounds: [f32; 2],
    /// Surface size (physical px)
    pub resolution: [f32; 2],
    pub dt: f32,
    pub gravity: f32,
    /// Velocity kept per 60 Hz frame
    pub damping: f32,
    pub bounce: f32,
    pub side: u32,
    /// Quad radius (logical px)
    pub point_size: f32,
    pub dpr: f32,
    pub floor_friction: f32,
    pub color: [f32; 4],
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            bounds: [960.0, 640.0],
            resolution: [960.0, 640.0],
            dt: 0.0,
            gravity: 420.0,
            damping: 0.985,
            bounce: 0.45,
            side: 0,
            point_size: 2.0,
            dpr: 1.0,
            floor_friction: 0.8,
            color: super::palette::PARTICLE,
        }
    }
}

pub fn is_active(t: &Texel) -> bool {
    t[0].abs() + t[1].abs() + t[2].abs() + t[3].abs() > ACTIVE_EPSILON
}

/// One integration step of a single texel
pub fn step_texel(t: Texel, params: &ParticleParams, dt: f32) -> Texel {
    if !is_active(&t) {
        return INACTIVE;
    }
    let [mut x, mut y, mut vx, mut vy] = t;
    let [w, h] = params.bounds;

    vy += params.gravity * dt;
    let keep = params.damping.powf(dt * 60.0);
    vx *= keep;
    vy *= keep;
    x += vx * dt;
    y += vy * dt;

    if x < 0.0 {
        x = 0.0;
        vx = -vx * params.bounce;
    } else if x > w {
        x = w;
        vx = -vx * params.bounce;
    }

    if y > h {
        y = h;
        vy = -vy * params.bounce;
        if vy.abs() < REST_SPEED {
            vy = 0.0;
        }
        vx *= params.floor_friction;
    }

    // Grounded and slow: despawn
    if y >= h - 0.5 && vy == 0.0 && vx.abs() < REST_SPEED {
        return INACTIVE;
    }
    [x, y, vx, vy]
}

/// Radial burst velocities with a per-index spread
pub fn burst(center: Vec2, count: usize, speed: f32, seed: u32) -> Vec<(Vec2, Vec2)> {
    (0..count)
        .map(|i| {
            let h = hash(seed.wrapping_add(i as u32));
            let jitter = (h & 0xffff) as f32 / 65535.0;
            let angle =
                (i as f32 + jitter * 0.8) / count.max(1) as f32 * std::f32::consts::TAU;
            let mag = speed * (0.5 + ((h >> 16) & 0xffff) as f32 / 65535.0 * 0.75);
            // Bias upward so bursts read as sparks
            let dir = Vec2::new(angle.cos(), angle.sin() - 0.6);
            (center, dir.normalize_or_zero() * mag)
        })
        .collect()
}

fn hash(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}
