//! CPU particle fallback
//!
//! Used when the adapter cannot render into float textures. Same texel
//! layout and slot allocation as the GPU backend; particles are pushed into
//! the frame batch as small circles.

use glam::Vec2;

use super::{
    INACTIVE, ParticleParams, ParticleSystem, SpawnCursor, Texel, is_active, particle_capacity,
    step_texel,
};
use crate::renderer::batch::FrameBatch;

pub struct CpuParticles {
    texels: Vec<Texel>,
    cursor: SpawnCursor,
    params: ParticleParams,
}

impl CpuParticles {
    pub fn new(requested: usize, params: ParticleParams) -> Self {
        let (side, capacity) = particle_capacity(requested);
        Self {
            texels: vec![INACTIVE; capacity],
            cursor: SpawnCursor::new(capacity),
            params: ParticleParams { side, ..params },
        }
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn active_count(&self) -> usize {
        self.texels.iter().filter(|t| is_active(t)).count()
    }
}

impl ParticleSystem for CpuParticles {
    fn spawn(&mut self, index: Option<usize>, pos: Vec2, vel: Vec2) -> usize {
        match self.cursor.allocate(index) {
            Some(slot) => {
                self.texels[slot] = [pos.x, pos.y, vel.x, vel.y];
                slot
            }
            None => 0,
        }
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let params = self.params;
        for t in &mut self.texels {
            *t = step_texel(*t, &params, dt);
        }
    }

    fn prepare(&mut self, batch: &mut FrameBatch) {
        let color = self.params.color;
        let radius = self.params.point_size;
        for t in self.texels.iter().filter(|t| is_active(t)) {
            batch.push_circle(Vec2::new(t[0], t[1]), radius, color);
        }
    }

    fn render(&self, _pass: &mut wgpu::RenderPass<'_>) {}

    fn set_bounds(&mut self, width: f32, height: f32) {
        self.params.bounds = [width, height];
    }

    fn clear(&mut self) {
        self.texels.fill(INACTIVE);
        self.cursor.reset();
    }

    fn count(&self) -> usize {
        self.texels.len()
    }

    fn dispose(&mut self) {
        self.texels = Vec::new();
        self.cursor = SpawnCursor::new(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_step_draw() {
        let mut particles = CpuParticles::new(10, ParticleParams::default());
        assert_eq!(particles.count(), 16);
        let slot = particles.spawn(None, Vec2::new(100.0, 100.0), Vec2::new(0.0, -50.0));
        assert_eq!(slot, 0);
        particles.step(1.0 / 60.0);
        assert!(particles.texels()[0][1] < 100.0);

        let mut batch = FrameBatch::new(1.0);
        particles.prepare(&mut batch);
        assert_eq!(batch.shapes.len(), 1);
    }

    #[test]
    fn test_spawn_batch_wraps_and_clear() {
        let mut particles = CpuParticles::new(4, ParticleParams::default());
        let burst = vec![(Vec2::new(10.0, 10.0), Vec2::new(5.0, 0.0)); 6];
        assert_eq!(particles.spawn_batch(&burst), 6);
        assert_eq!(particles.active_count(), 4);
        particles.clear();
        assert_eq!(particles.active_count(), 0);
        assert_eq!(particles.spawn(None, Vec2::ONE, Vec2::ONE), 0);
    }

    #[test]
    fn test_zero_budget_is_inert() {
        let mut particles = CpuParticles::new(0, ParticleParams::default());
        assert_eq!(particles.count(), 0);
        assert_eq!(particles.spawn_batch(&[(Vec2::ONE, Vec2::ONE)]), 0);
        particles.step(0.1);
    }

    #[test]
    fn test_dispose_empties() {
        let mut particles = CpuParticles::new(64, ParticleParams::default());
        particles.spawn(None, Vec2::ONE, Vec2::ONE);
        particles.dispose();
        assert_eq!(particles.count(), 0);
        assert_eq!(particles.active_count(), 0);
    }
}
