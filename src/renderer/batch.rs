//! Per-frame instance batching
//!
//! Scene code pushes primitives in logical (CSS) pixels; every position and
//! size is multiplied by the device pixel ratio here, so the GPU side only
//! ever sees physical pixels.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::buffer::GrowableBuffer;
use super::glyphs::GlyphAtlas;
use super::palette::Color;

/// Circle (`sides == 0`) or regular polygon
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ShapeInstance {
    pub center: [f32; 2],
    pub radius: f32,
    pub rotation: f32,
    pub color: [f32; 4],
    pub sides: f32,
    /// Halo width as a fraction of the radius (0 disables)
    pub glow: f32,
}

impl ShapeInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32,
        2 => Float32,
        3 => Float32x4,
        4 => Float32,
        5 => Float32
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Rotated solid rectangle; lines are thin rects
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RectInstance {
    pub center: [f32; 2],
    pub half_size: [f32; 2],
    pub rotation: f32,
    pub color: [f32; 4],
}

impl RectInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32,
        3 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Two-tone health bar, `fill` in [0, 1]
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BarInstance {
    /// Top-left corner
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub fill: f32,
    pub fg: [f32; 4],
    pub bg: [f32; 4],
}

impl BarInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32,
        3 => Float32x4,
        4 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// One textured glyph quad
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    /// Top-left corner
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub color: [f32; 4],
}

impl GlyphInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32x2,
        3 => Float32x2,
        4 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Everything drawn this frame, grouped by primitive kind
#[derive(Debug, Clone)]
pub struct FrameBatch {
    dpr: f32,
    pub shapes: GrowableBuffer<ShapeInstance>,
    pub rects: GrowableBuffer<RectInstance>,
    pub bars: GrowableBuffer<BarInstance>,
    pub glyphs: GrowableBuffer<GlyphInstance>,
}

impl Default for FrameBatch {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FrameBatch {
    pub fn new(dpr: f32) -> Self {
        Self {
            dpr: sanitize_dpr(dpr),
            shapes: GrowableBuffer::with_capacity(256),
            rects: GrowableBuffer::with_capacity(256),
            bars: GrowableBuffer::default(),
            glyphs: GrowableBuffer::with_capacity(512),
        }
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    pub fn set_dpr(&mut self, dpr: f32) {
        self.dpr = sanitize_dpr(dpr);
    }

    /// Reset all arenas for a new frame
    pub fn begin_frame(&mut self) {
        self.shapes.clear();
        self.rects.clear();
        self.bars.clear();
        self.glyphs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
            && self.rects.is_empty()
            && self.bars.is_empty()
            && self.glyphs.is_empty()
    }

    fn scale(&self, p: Vec2) -> [f32; 2] {
        (p * self.dpr).to_array()
    }

    pub fn push_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.push_polygon(center, radius, 0, 0.0, color, 0.0);
    }

    /// Regular polygon with `sides` corners (0 draws a circle)
    pub fn push_polygon(
        &mut self,
        center: Vec2,
        radius: f32,
        sides: u32,
        rotation: f32,
        color: Color,
        glow: f32,
    ) {
        if radius <= 0.0 {
            return;
        }
        // Fewer than 3 corners is not a polygon
        let sides = if sides < 3 { 0 } else { sides };
        self.shapes.push(ShapeInstance {
            center: self.scale(center),
            radius: radius * self.dpr,
            rotation,
            color,
            sides: sides as f32,
            glow: glow.max(0.0),
        });
    }

    pub fn push_quad(&mut self, center: Vec2, half_size: Vec2, rotation: f32, color: Color) {
        self.rects.push(RectInstance {
            center: self.scale(center),
            half_size: self.scale(half_size),
            rotation,
            color,
        });
    }

    pub fn push_line(&mut self, a: Vec2, b: Vec2, width: f32, color: Color) {
        let d = b - a;
        let len = d.length();
        if len <= f32::EPSILON {
            return;
        }
        self.push_quad(
            (a + b) * 0.5,
            Vec2::new(len * 0.5, width * 0.5),
            d.y.atan2(d.x),
            color,
        );
    }

    /// Bar centred horizontally on `center`, with its top edge at `center.y`
    pub fn push_health_bar(
        &mut self,
        center: Vec2,
        width: f32,
        height: f32,
        fill: f32,
        fg: Color,
        bg: Color,
    ) {
        let origin = center - Vec2::new(width * 0.5, 0.0);
        self.bars.push(BarInstance {
            origin: self.scale(origin),
            size: self.scale(Vec2::new(width, height)),
            fill: if fill.is_finite() { fill.clamp(0.0, 1.0) } else { 0.0 },
            fg,
            bg,
        });
    }

    /// One line of text; `pos.y` is the top of the glyph bodies
    pub fn push_text(
        &mut self,
        atlas: &GlyphAtlas,
        text: &str,
        pos: Vec2,
        size: f32,
        align: TextAlign,
        color: Color,
    ) {
        let width = atlas.measure(text, size);
        let mut cursor = match align {
            TextAlign::Left => pos,
            TextAlign::Center => pos - Vec2::new(width * 0.5, 0.0),
            TextAlign::Right => pos - Vec2::new(width, 0.0),
        };
        let (cell_w, cell_h) = atlas.cell_size(size);
        let offset = atlas.cell_offset(size);
        let advance = atlas.advance(size);
        for ch in text.chars() {
            if ch != ' ' {
                let glyph = atlas.lookup(ch);
                let origin = cursor - Vec2::splat(offset);
                self.glyphs.push(GlyphInstance {
                    origin: self.scale(origin),
                    size: self.scale(Vec2::new(cell_w, cell_h)),
                    uv_min: glyph.uv_min,
                    uv_max: glyph.uv_max,
                    color,
                });
            }
            cursor.x += advance;
        }
    }
}

fn sanitize_dpr(dpr: f32) -> f32 {
    if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 }
}
