//! Ping-pong GPU particle simulation
//!
//! State lives in two `Rgba32Float` textures. Each step renders a
//! full-screen triangle into the write texture, reading the other one with
//! `textureLoad`, then the roles swap. Spawns are staged on the CPU and
//! written texel-by-texel into the current read texture before the next
//! step.

use glam::Vec2;

use super::{ParticleParams, ParticleSystem, SpawnCursor, Texel, particle_capacity};
use crate::renderer::batch::FrameBatch;

pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const TEXEL_BYTES: u32 = 16;

/// Whether the adapter can render into float state textures
pub fn supported(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_texture_format_features(STATE_FORMAT)
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
}

/// Texel coordinates of a slot in a `side`-wide grid
pub fn texel_origin(slot: usize, side: u32) -> (u32, u32) {
    let side = side.max(1) as usize;
    ((slot % side) as u32, (slot / side) as u32)
}

/// Spawns waiting for upload, allocated with the shared cursor
#[derive(Debug, Clone, Default)]
pub struct SpawnStaging {
    cursor: SpawnCursor,
    pending: Vec<(usize, Texel)>,
}

impl SpawnStaging {
    pub fn new(capacity: usize) -> Self {
        Self {
            cursor: SpawnCursor::new(capacity),
            pending: Vec::new(),
        }
    }

    pub fn stage(&mut self, index: Option<usize>, pos: Vec2, vel: Vec2) -> usize {
        match self.cursor.allocate(index) {
            Some(slot) => {
                // A later spawn into the same slot wins
                self.pending.retain(|(s, _)| *s != slot);
                self.pending.push((slot, [pos.x, pos.y, vel.x, vel.y]));
                slot
            }
            None => 0,
        }
    }

    pub fn pending(&self) -> &[(usize, Texel)] {
        &self.pending
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, (usize, Texel)> {
        self.pending.drain(..)
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.cursor.reset();
    }
}

pub struct GpuParticles {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: [wgpu::Texture; 2],
    /// Bind groups that read texture 0 / texture 1 (sim and draw share them)
    bind_groups: [wgpu::BindGroup; 2],
    views: [wgpu::TextureView; 2],
    sim_pipeline: wgpu::RenderPipeline,
    draw_pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    params: ParticleParams,
    staging: SpawnStaging,
    /// Index of the texture holding the current state
    read: usize,
    capacity: usize,
    disposed: bool,
}

impl GpuParticles {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        requested: usize,
        params: ParticleParams,
    ) -> Self {
        let (side, capacity) = particle_capacity(requested);
        let params = ParticleParams { side, ..params };
        // Zero-sized textures are invalid; keep a 1x1 grid that never draws
        let tex_side = side.max(1);

        let make_texture = |label: &str| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: tex_side,
                    height: tex_side,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: STATE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };
        let textures = [
            make_texture("Particle State A"),
            make_texture("Particle State B"),
        ];
        let views = [
            textures[0].create_view(&wgpu::TextureViewDescriptor::default()),
            textures[1].create_view(&wgpu::TextureViewDescriptor::default()),
        ];

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Params"),
            size: std::mem::size_of::<ParticleParams>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let make_bind_group = |label: &str, view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = [
            make_bind_group("Particle Read A", &views[0]),
            make_bind_group("Particle Read B", &views[1]),
        ];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let sim_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Sim Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/particle_sim.wgsl").into()),
        });
        let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Draw Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/particle_draw.wgsl").into()),
        });

        let sim_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Sim Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sim_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sim_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: STATE_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let draw_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Draw Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &draw_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &draw_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::info!(
            "GPU particles: {}x{} state textures ({} slots)",
            tex_side,
            tex_side,
            capacity
        );

        let mut particles = Self {
            device: device.clone(),
            queue: queue.clone(),
            textures,
            bind_groups,
            views,
            sim_pipeline,
            draw_pipeline,
            params_buffer,
            params,
            staging: SpawnStaging::new(capacity),
            read: 0,
            capacity,
            disposed: false,
        };
        particles.zero_textures();
        particles
    }

    fn side(&self) -> u32 {
        self.params.side.max(1)
    }

    fn zero_textures(&mut self) {
        let side = self.side();
        let zeros = vec![0u8; (side * side * TEXEL_BYTES) as usize];
        for texture in &self.textures {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &zeros,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(side * TEXEL_BYTES),
                    rows_per_image: Some(side),
                },
                wgpu::Extent3d {
                    width: side,
                    height: side,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    /// Write staged spawns into the current read texture
    fn flush_spawns(&mut self) {
        let side = self.side();
        let texture = &self.textures[self.read];
        for (slot, texel) in self.staging.drain() {
            let (x, y) = texel_origin(slot, side);
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x, y, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::bytes_of(&texel),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(TEXEL_BYTES),
                    rows_per_image: None,
                },
                wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn write_params(&self) {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
    }

    fn live(&self) -> bool {
        !self.disposed && self.capacity > 0
    }
}

impl ParticleSystem for GpuParticles {
    fn spawn(&mut self, index: Option<usize>, pos: Vec2, vel: Vec2) -> usize {
        if !self.live() {
            return 0;
        }
        self.staging.stage(index, pos, vel)
    }

    fn step(&mut self, dt: f32) {
        if !self.live() || dt <= 0.0 {
            return;
        }
        self.flush_spawns();
        self.params.dt = dt;
        self.write_params();

        let write = 1 - self.read;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Step Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Step Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.views[write],
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.sim_pipeline);
            pass.set_bind_group(0, &self.bind_groups[self.read], &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.read = write;
    }

    fn prepare(&mut self, batch: &mut FrameBatch) {
        if !self.live() {
            return;
        }
        // Spawns made after the last step still show this frame
        self.flush_spawns();
        self.params.dpr = batch.dpr();
        self.params.resolution = [
            self.params.bounds[0] * self.params.dpr,
            self.params.bounds[1] * self.params.dpr,
        ];
        self.write_params();
    }

    fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        if !self.live() {
            return;
        }
        pass.set_pipeline(&self.draw_pipeline);
        pass.set_bind_group(0, &self.bind_groups[self.read], &[]);
        pass.draw(0..6, 0..self.capacity as u32);
    }

    fn set_bounds(&mut self, width: f32, height: f32) {
        self.params.bounds = [width, height];
    }

    fn clear(&mut self) {
        if self.disposed {
            return;
        }
        self.staging.reset();
        self.zero_textures();
    }

    fn count(&self) -> usize {
        if self.disposed { 0 } else { self.capacity }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for texture in &self.textures {
            texture.destroy();
        }
        self.params_buffer.destroy();
        self.staging = SpawnStaging::new(0);
        self.disposed = true;
        log::debug!("GPU particles disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::particles::{CpuParticles, ParticleParams};

    #[test]
    fn test_texel_origin() {
        assert_eq!(texel_origin(0, 4), (0, 0));
        assert_eq!(texel_origin(5, 4), (1, 1));
        assert_eq!(texel_origin(15, 4), (3, 3));
    }

    #[test]
    fn test_staging_matches_cpu_slots() {
        let (_, capacity) = particle_capacity(6);
        let mut staging = SpawnStaging::new(capacity);
        let mut cpu = CpuParticles::new(6, ParticleParams::default());
        assert_eq!(cpu.count(), capacity);

        let spawns = [
            (None, Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)),
            (Some(5), Vec2::new(5.0, 6.0), Vec2::ZERO),
            (None, Vec2::new(7.0, 8.0), Vec2::X),
        ];
        for (index, pos, vel) in spawns {
            assert_eq!(staging.stage(index, pos, vel), cpu.spawn(index, pos, vel));
        }
        for (slot, texel) in staging.pending() {
            assert_eq!(&cpu.texels()[*slot], texel);
        }
    }

    #[test]
    fn test_restaging_slot_replaces_pending() {
        let mut staging = SpawnStaging::new(4);
        staging.stage(Some(1), Vec2::ONE, Vec2::ZERO);
        staging.stage(Some(1), Vec2::new(9.0, 9.0), Vec2::ZERO);
        assert_eq!(staging.pending().len(), 1);
        assert_eq!(staging.pending()[0].1[0], 9.0);
        staging.reset();
        assert!(staging.pending().is_empty());
    }
}
