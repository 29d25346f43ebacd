//! WebGPU rendering module
//!
//! Everything is drawn in one pass per frame:
//! - background grid
//! - GPU particles (when the float-texture backend is active)
//! - instanced rects, shapes, health bars and text from a `FrameBatch`

pub mod batch;
pub mod buffer;
pub mod glyphs;
pub mod instanced;
pub mod palette;
pub mod particles;
pub mod scene;

pub use batch::{FrameBatch, TextAlign};
pub use glyphs::GlyphAtlas;
pub use instanced::InstancedRenderer;
pub use particles::{CpuParticles, GpuParticles, ParticleParams, ParticleSystem};

use crate::error::RenderError;
use crate::settings::Settings;
use crate::sim::state::GameEvent;
use crate::sim::HudStats;
use crate::tuning::Tuning;
use crate::sim::GameState;

/// Pixels per font dot at a device pixel ratio of 1
const GLYPH_DOT_PX: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleBackend {
    Gpu,
    Cpu,
}

impl ParticleBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleBackend::Gpu => "GPU",
            ParticleBackend::Cpu => "CPU",
        }
    }
}

pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    instanced: InstancedRenderer,
    particles: Box<dyn ParticleSystem>,
    backend: ParticleBackend,
    batch: FrameBatch,
    atlas: GlyphAtlas,
    /// Physical surface size
    pub size: (u32, u32),
    dpr: f32,
    time: f32,
    /// Seed for burst jitter
    burst_seed: u32,
}

impl Renderer {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        dpr: f32,
        settings: &Settings,
    ) -> Result<Self, RenderError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("essence-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Unsupported("no surface formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or_else(|| RenderError::Unsupported("no alpha modes".to_string()))?;

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        let atlas = GlyphAtlas::bake((GLYPH_DOT_PX * dpr).round().max(1.0) as u32);
        let instanced = InstancedRenderer::new(&device, &queue, surface_format, &atlas);

        let gpu_particles = particles::gpu::supported(adapter);
        let backend = if gpu_particles {
            ParticleBackend::Gpu
        } else {
            log::info!("Float render targets unsupported, using CPU particles");
            ParticleBackend::Cpu
        };
        let bounds = [width as f32 / dpr, height as f32 / dpr];
        let particles = Self::create_particles(
            &device,
            &queue,
            surface_format,
            backend,
            settings.max_particles(),
            bounds,
        );
        log::info!(
            "Renderer ready: {}x{} @{}x, {} particles ({})",
            width,
            height,
            dpr,
            particles.count(),
            backend.as_str()
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            instanced,
            particles,
            backend,
            batch: FrameBatch::new(dpr),
            atlas,
            size: (width, height),
            dpr,
            time: 0.0,
            burst_seed: 0,
        })
    }

    fn create_particles(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        backend: ParticleBackend,
        budget: usize,
        bounds: [f32; 2],
    ) -> Box<dyn ParticleSystem> {
        let params = ParticleParams {
            bounds,
            ..Default::default()
        };
        match backend {
            ParticleBackend::Gpu => {
                Box::new(GpuParticles::new(device, queue, format, budget, params))
            }
            ParticleBackend::Cpu => Box::new(CpuParticles::new(budget, params)),
        }
    }

    pub fn backend(&self) -> ParticleBackend {
        self.backend
    }

    pub fn particles_mut(&mut self) -> &mut dyn ParticleSystem {
        self.particles.as_mut()
    }

    /// Logical (CSS pixel) size of the drawing area
    pub fn logical_size(&self) -> (f32, f32) {
        (self.size.0 as f32 / self.dpr, self.size.1 as f32 / self.dpr)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32, dpr: f32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
            if dpr.is_finite() && dpr > 0.0 {
                self.dpr = dpr;
                self.batch.set_dpr(dpr);
            }
            let (w, h) = self.logical_size();
            self.particles.set_bounds(w, h);
        }
    }

    /// Rebuild the particle pool after a settings change
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.particles.dispose();
        let (w, h) = self.logical_size();
        self.particles = Self::create_particles(
            &self.device,
            &self.queue,
            self.config.format,
            self.backend,
            settings.max_particles(),
            [w, h],
        );
    }

    /// Decorative bursts for this tick's sim events
    pub fn spawn_event_particles(&mut self, events: &[GameEvent], settings: &Settings) {
        let burst = settings.burst_size();
        if burst == 0 {
            return;
        }
        for event in events {
            let (pos, count, speed) = match *event {
                GameEvent::EnemyKilled { pos, elite, .. } => {
                    (pos, if elite { burst * 2 } else { burst }, 180.0)
                }
                GameEvent::Explosion { pos, radius } => (pos, burst * 2, radius * 3.0),
                GameEvent::BossDefeated { pos, .. } => (pos, burst * 4, 320.0),
                GameEvent::FragmentCollected { pos, .. } => (pos, 3, 60.0),
                GameEvent::BossSpawned { .. }
                | GameEvent::PlayerHit { .. }
                | GameEvent::PlayerDied => continue,
            };
            self.burst_seed = self.burst_seed.wrapping_add(0x9e37);
            let spawns = particles::burst(pos, count, speed, self.burst_seed);
            self.particles.spawn_batch(&spawns);
        }
    }

    /// Step particles, build the frame and present it
    pub fn render(
        &mut self,
        state: &GameState,
        tuning: &Tuning,
        hud: &HudStats,
        settings: &Settings,
        dt: f32,
    ) -> Result<(), wgpu::SurfaceError> {
        let dt = dt.clamp(0.0, tuning.physics.max_dt);
        self.time += dt;
        self.particles.step(dt);

        self.batch.begin_frame();
        self.particles.prepare(&mut self.batch);
        scene::draw_scene(&mut self.batch, &self.atlas, state, tuning, hud, settings);
        self.instanced.prepare(
            &self.device,
            &self.queue,
            &self.batch,
            self.size,
            self.time,
            settings.high_contrast,
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.instanced.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.instanced.draw_background(&mut pass);
            self.particles.render(&mut pass);
            self.instanced.draw_primitives(&mut pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Recover from a surface error; returns false when the frame should be
    /// abandoned without further action
    pub fn handle_surface_error(&mut self, error: wgpu::SurfaceError) -> bool {
        match error {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                self.surface.configure(&self.device, &self.config);
                true
            }
            wgpu::SurfaceError::OutOfMemory => {
                log::error!("Out of memory!");
                false
            }
            e => {
                log::warn!("Render error: {:?}", e);
                false
            }
        }
    }
}
