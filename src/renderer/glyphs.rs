//! Pre-baked bitmap font atlas
//!
//! Every supported character is rasterised once at startup from a 5x7 dot
//! font. The dark stroke and drop shadow are baked into the bitmap, so a
//! label at runtime is just one textured quad per glyph.

use std::collections::HashMap;

/// Font cell in dots
pub const DOTS_W: u32 = 5;
pub const DOTS_H: u32 = 7;
/// Glyphs per atlas row
const COLUMNS: u32 = 16;
/// Horizontal advance in dots (glyph plus one dot of spacing)
const ADVANCE_DOTS: f32 = 6.0;

const SHADOW_ALPHA: u8 = 140;

/// 5x7 bitmaps, one byte per row, bit 4 is the leftmost dot
const FONT: &[(char, [u8; 7])] = &[
    (' ', [0, 0, 0, 0, 0, 0, 0]),
    ('0', [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
    ('1', [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('2', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
    ('3', [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110]),
    ('4', [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
    ('5', [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
    ('6', [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
    ('7', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
    ('8', [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
    ('9', [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
    ('A', [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('B', [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
    ('C', [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
    ('D', [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100]),
    ('E', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
    ('F', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('G', [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
    ('H', [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('I', [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('J', [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100]),
    ('K', [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
    ('L', [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
    ('M', [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
    ('N', [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001]),
    ('O', [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('P', [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('Q', [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
    ('R', [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
    ('S', [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110]),
    ('T', [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('U', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('V', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
    ('W', [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
    ('X', [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
    ('Y', [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100]),
    ('Z', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
    ('.', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100]),
    (',', [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000]),
    (':', [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000]),
    ('!', [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100]),
    ('?', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100]),
    ('+', [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000]),
    ('-', [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000]),
    ('%', [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011]),
    ('/', [0b00000, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b00000]),
    ('(', [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010]),
    (')', [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000]),
    ('\'', [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000]),
    ('#', [0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010]),
    ('*', [0b00000, 0b00100, 0b10101, 0b01110, 0b10101, 0b00100, 0b00000]),
    ('=', [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000]),
    ('<', [0b00010, 0b00100, 0b01000, 0b10000, 0b01000, 0b00100, 0b00010]),
    ('>', [0b01000, 0b00100, 0b00010, 0b00001, 0b00010, 0b00100, 0b01000]),
];

/// Character drawn for anything not in the font
pub const FALLBACK: char = '?';

/// Atlas rectangle of one glyph cell (stroke and shadow included)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

/// RGBA8 atlas plus its lookup table
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,
    px_per_dot: u32,
    /// Transparent margin around the 5x7 body, in pixels
    pad: u32,
    glyphs: HashMap<char, GlyphInfo>,
}

impl GlyphAtlas {
    /// Rasterise the font with each dot `px_per_dot` pixels wide
    pub fn bake(px_per_dot: u32) -> Self {
        let s = px_per_dot.max(1);
        let stroke = (s / 3).max(1);
        // Shadow reaches past the stroke so it stays visible
        let shadow = stroke + (s / 3).max(1);
        let pad = shadow + 1;
        let (stroke, shadow) = (stroke as i32, shadow as i32);

        let cell_w = DOTS_W * s + pad * 2;
        let cell_h = DOTS_H * s + pad * 2;
        let rows = (FONT.len() as u32).div_ceil(COLUMNS);
        let width = COLUMNS * cell_w;
        let height = rows * cell_h;
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        let mut glyphs = HashMap::with_capacity(FONT.len());

        for (i, (ch, rows_bits)) in FONT.iter().enumerate() {
            let x0 = (i as u32 % COLUMNS) * cell_w;
            let y0 = (i as u32 / COLUMNS) * cell_h;

            // Body coverage in cell-local pixels
            let fill = |x: i32, y: i32| -> bool {
                let bx = x - pad as i32;
                let by = y - pad as i32;
                if bx < 0 || by < 0 {
                    return false;
                }
                let (dx, dy) = (bx as u32 / s, by as u32 / s);
                if dx >= DOTS_W || dy >= DOTS_H {
                    return false;
                }
                rows_bits[dy as usize] & (1 << (DOTS_W - 1 - dx)) != 0
            };
            let near_fill = |x: i32, y: i32| -> bool {
                (-stroke..=stroke).any(|oy| (-stroke..=stroke).any(|ox| fill(x + ox, y + oy)))
            };

            for y in 0..cell_h as i32 {
                for x in 0..cell_w as i32 {
                    let rgba: [u8; 4] = if fill(x, y) {
                        [255, 255, 255, 255]
                    } else if near_fill(x, y) {
                        [0, 0, 0, 255]
                    } else if fill(x - shadow, y - shadow) {
                        [0, 0, 0, SHADOW_ALPHA]
                    } else {
                        continue;
                    };
                    let px = x0 + x as u32;
                    let py = y0 + y as u32;
                    let offset = ((py * width + px) * 4) as usize;
                    pixels[offset..offset + 4].copy_from_slice(&rgba);
                }
            }

            glyphs.insert(
                *ch,
                GlyphInfo {
                    uv_min: [x0 as f32 / width as f32, y0 as f32 / height as f32],
                    uv_max: [
                        (x0 + cell_w) as f32 / width as f32,
                        (y0 + cell_h) as f32 / height as f32,
                    ],
                },
            );
        }

        log::debug!(
            "Glyph atlas baked: {} glyphs, {}x{} px",
            glyphs.len(),
            width,
            height
        );

        Self {
            width,
            height,
            pixels,
            px_per_dot: s,
            pad,
            glyphs,
        }
    }

    /// Atlas cell for `ch`; lowercase maps to uppercase, unknown to `?`
    pub fn lookup(&self, ch: char) -> GlyphInfo {
        let upper = ch.to_ascii_uppercase();
        self.glyphs
            .get(&upper)
            .or_else(|| self.glyphs.get(&FALLBACK))
            .copied()
            .unwrap_or(GlyphInfo {
                uv_min: [0.0, 0.0],
                uv_max: [0.0, 0.0],
            })
    }

    pub fn contains(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch.to_ascii_uppercase())
    }

    /// Cell size in pixels for text whose body is `size` pixels tall
    pub fn cell_size(&self, size: f32) -> (f32, f32) {
        let scale = size / (DOTS_H * self.px_per_dot) as f32;
        let cell_w = (DOTS_W * self.px_per_dot + self.pad * 2) as f32;
        let cell_h = (DOTS_H * self.px_per_dot + self.pad * 2) as f32;
        (cell_w * scale, cell_h * scale)
    }

    /// Offset from a glyph's body origin to its cell origin
    pub fn cell_offset(&self, size: f32) -> f32 {
        self.pad as f32 * size / (DOTS_H * self.px_per_dot) as f32
    }

    /// Distance between glyph origins
    pub fn advance(&self, size: f32) -> f32 {
        size * ADVANCE_DOTS / DOTS_H as f32
    }

    /// Width of a single line of text
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let n = text.chars().count();
        if n == 0 {
            return 0.0;
        }
        // Trailing spacing dot is not part of the visible width
        self.advance(size) * n as f32 - size / DOTS_H as f32
    }

    /// Create the GPU texture for this atlas
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
        use wgpu::util::DeviceExt;
        device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Glyph Atlas"),
                size: wgpu::Extent3d {
                    width: self.width,
                    height: self.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &self.pixels,
        )
    }
}
