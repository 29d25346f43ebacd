//! Instanced 2D renderer
//!
//! One pipeline and one instance buffer per primitive kind. Each frame the
//! non-empty arenas of a `FrameBatch` are uploaded and drawn with a single
//! instanced call apiece, in a fixed order:
//! grid, rects (quads and lines), shapes, health bars, text.

use bytemuck::{Pod, Zeroable};

use super::batch::{BarInstance, FrameBatch, GlyphInstance, RectInstance, ShapeInstance};
use super::buffer::GpuInstanceBuffer;
use super::glyphs::GlyphAtlas;
use super::palette::{self, Color};

/// Shared uniform for every instanced pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Globals {
    /// Surface size in physical pixels
    pub resolution: [f32; 2],
    pub time: f32,
    /// Grid spacing in physical pixels
    pub grid_spacing: f32,
    pub grid_color: Color,
    pub background: Color,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            resolution: [1.0, 1.0],
            time: 0.0,
            grid_spacing: crate::consts::GRID_SPACING,
            grid_color: palette::GRID_LINE,
            background: palette::BACKGROUND,
        }
    }
}

pub struct InstancedRenderer {
    globals: Globals,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    atlas_bind_group: wgpu::BindGroup,
    grid_pipeline: wgpu::RenderPipeline,
    rect_pipeline: wgpu::RenderPipeline,
    shape_pipeline: wgpu::RenderPipeline,
    bar_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,
    rects: GpuInstanceBuffer,
    shapes: GpuInstanceBuffer,
    bars: GpuInstanceBuffer,
    glyphs: GpuInstanceBuffer,
}

/// Pipeline over a six-vertex quad (or full-screen triangle) with optional
/// per-instance data
fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    entry: (&str, &str),
    buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(entry.0),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(entry.1),
            targets: &[Some(wgpu::ColorTargetState {
                format,
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
    })
}

impl InstancedRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        atlas: &GlyphAtlas,
    ) -> Self {
        let globals = Globals::default();
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<Globals>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&globals_buffer, 0, bytemuck::bytes_of(&globals));

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        // Font atlas, sampled nearest so dots stay crisp
        let atlas_texture = atlas.upload(device, queue);
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Glyph Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Atlas Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Atlas Bind Group"),
            layout: &atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        let base_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Instanced Pipeline Layout"),
            bind_group_layouts: &[&globals_layout],
            immediate_size: 0,
        });
        let text_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Text Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &atlas_layout],
            immediate_size: 0,
        });

        let grid_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Grid Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/grid.wgsl").into()),
        });
        let instanced_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Instanced Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/instanced.wgsl").into()),
        });
        let text_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Text Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let grid_pipeline = create_pipeline(
            device,
            "Grid Pipeline",
            &base_layout,
            &grid_shader,
            ("vs_main", "fs_main"),
            &[],
            format,
        );
        let rect_pipeline = create_pipeline(
            device,
            "Rect Pipeline",
            &base_layout,
            &instanced_shader,
            ("vs_rect", "fs_rect"),
            &[RectInstance::layout()],
            format,
        );
        let shape_pipeline = create_pipeline(
            device,
            "Shape Pipeline",
            &base_layout,
            &instanced_shader,
            ("vs_shape", "fs_shape"),
            &[ShapeInstance::layout()],
            format,
        );
        let bar_pipeline = create_pipeline(
            device,
            "Bar Pipeline",
            &base_layout,
            &instanced_shader,
            ("vs_bar", "fs_bar"),
            &[BarInstance::layout()],
            format,
        );
        let text_pipeline = create_pipeline(
            device,
            "Text Pipeline",
            &text_layout,
            &text_shader,
            ("vs_main", "fs_main"),
            &[GlyphInstance::layout()],
            format,
        );

        Self {
            globals,
            globals_buffer,
            globals_bind_group,
            atlas_bind_group,
            grid_pipeline,
            rect_pipeline,
            shape_pipeline,
            bar_pipeline,
            text_pipeline,
            rects: GpuInstanceBuffer::new::<RectInstance>(device, "Rect Instances"),
            shapes: GpuInstanceBuffer::new::<ShapeInstance>(device, "Shape Instances"),
            bars: GpuInstanceBuffer::new::<BarInstance>(device, "Bar Instances"),
            glyphs: GpuInstanceBuffer::new::<GlyphInstance>(device, "Glyph Instances"),
        }
    }

    /// Upload the uniform and every non-empty arena
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        batch: &FrameBatch,
        resolution: (u32, u32),
        time: f32,
        high_contrast: bool,
    ) {
        self.globals.resolution = [resolution.0.max(1) as f32, resolution.1.max(1) as f32];
        self.globals.time = time;
        self.globals.grid_spacing = crate::consts::GRID_SPACING * batch.dpr();
        self.globals.grid_color = if high_contrast {
            palette::with_alpha(palette::HUD_TEXT, 0.25)
        } else {
            palette::GRID_LINE
        };
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&self.globals));

        self.rects.upload(device, queue, &batch.rects);
        self.shapes.upload(device, queue, &batch.shapes);
        self.bars.upload(device, queue, &batch.bars);
        self.glyphs.upload(device, queue, &batch.glyphs);
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.globals.background;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }

    /// Background grid; drawn before anything else
    pub fn draw_background(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.grid_pipeline);
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Rects, shapes, bars, then text
    pub fn draw_primitives(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        let passes = [
            (&self.rect_pipeline, &self.rects),
            (&self.shape_pipeline, &self.shapes),
            (&self.bar_pipeline, &self.bars),
        ];
        for (pipeline, instances) in passes {
            if instances.is_empty() {
                continue;
            }
            pass.set_pipeline(pipeline);
            pass.set_vertex_buffer(0, instances.slice());
            pass.draw(0..6, 0..instances.len());
        }

        if !self.glyphs.is_empty() {
            pass.set_pipeline(&self.text_pipeline);
            pass.set_bind_group(1, &self.atlas_bind_group, &[]);
            pass.set_vertex_buffer(0, self.glyphs.slice());
            pass.draw(0..6, 0..self.glyphs.len());
        }
    }
}
