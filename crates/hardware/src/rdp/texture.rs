//! TMEM texel fetch and decoding.
//!
//! The pipeline performs most operations at 8 bits per RGBA component;
//! texels are widened on fetch. Color-indexed formats additionally index
//! the palette banks at TMEM offset 0x800 (the hardware quadricates the
//! palette across the four upper banks for parallel access; loads replicate
//! it, lookups use the first copy).

use crate::common::constants::TMEM_PALETTE_BASE;
use crate::rdp::{Color, TexelType, Tile, TlutType};
use crate::state::{Machine, read_be16, read_be32};

impl Machine {
    /// Looks up a texel color from palette memory and widens it per the
    /// configured TLUT type.
    fn palette_load(&self, ci: u8) -> Color {
        let val = read_be16(&self.tmem, TMEM_PALETTE_BASE + ((ci as usize) << 1));
        match self.rdp.modes.tlut_type {
            TlutType::Ia => Color {
                r: (val >> 8) as u8,
                g: (val >> 8) as u8,
                b: (val >> 8) as u8,
                a: val as u8,
            },
            TlutType::Rgba => rgba5551_to_color(val),
        }
    }

    /// Loads one texel from TMEM at the given 4-bit-unit address and
    /// decodes it to 8-bit-per-channel RGBA.
    pub(crate) fn texel_fetch(&mut self, tile: &Tile, addr: usize) -> Color {
        match tile.texel_type {
            TexelType::I4 => {
                let shift = if addr & 1 != 0 { 0 } else { 4 };
                let i = (self.tmem[(addr >> 1) & 0xFFF] >> shift) & 0xF;
                Color::splat(i | (i << 4), i | (i << 4))
            }
            TexelType::Ia31 => {
                let shift = if addr & 1 != 0 { 0 } else { 4 };
                let ia = (self.tmem[(addr >> 1) & 0xFFF] >> shift) & 0xF;
                let i = ia >> 1;
                let lum = (i >> 1) | (i << 2) | (i << 5);
                Color {
                    r: lum,
                    g: lum,
                    b: lum,
                    a: if ia & 1 != 0 { 255 } else { 0 },
                }
            }
            TexelType::Ci4 => {
                let shift = if addr & 1 != 0 { 0 } else { 4 };
                let ci = (self.tmem[(addr >> 1) & 0xFFF] >> shift) & 0xF;
                self.palette_load(ci | (tile.palette as u8) << 4)
            }
            TexelType::I8 => {
                let i = self.tmem[(addr >> 1) & 0xFFF];
                Color::splat(i, i)
            }
            TexelType::Ia44 => {
                let ia = self.tmem[(addr >> 1) & 0xFFF];
                let i = ia >> 4;
                let a = ia & 0xF;
                Color {
                    r: i | (i << 4),
                    g: i | (i << 4),
                    b: i | (i << 4),
                    a: a | (a << 4),
                }
            }
            TexelType::Ci8 => {
                let ci = self.tmem[(addr >> 1) & 0xFFF];
                self.palette_load(ci)
            }
            TexelType::Rgba5551 => {
                let val = read_be16(&self.tmem, (addr >> 1) & 0xFFE);
                rgba5551_to_color(val)
            }
            TexelType::Ia88 => {
                let val = read_be16(&self.tmem, (addr >> 1) & 0xFFE);
                Color {
                    r: (val >> 8) as u8,
                    g: (val >> 8) as u8,
                    b: (val >> 8) as u8,
                    a: val as u8,
                }
            }
            TexelType::Rgba8888 => {
                let val = read_be32(&self.tmem, (addr >> 1) & 0xFFC);
                Color {
                    r: (val >> 24) as u8,
                    g: (val >> 16) as u8,
                    b: (val >> 8) as u8,
                    a: val as u8,
                }
            }
            TexelType::Yuv16 | TexelType::Invalid => {
                self.halt("texel fetch: unsupported image data type");
                Color::default()
            }
        }
    }

    /// Tile-space texel addressing: applies the LOD shifts, removes the
    /// tile origin, then wraps/mirrors/clamps per the tile descriptor.
    ///
    /// # Returns
    ///
    /// The TMEM address of the nearest texel, in 4-bit units.
    pub(crate) fn texel_address(&self, tile: &Tile, s: i32, t: i32, w: i32) -> usize {
        let (mut s, mut t) = (s, t);

        // Perspective correction: w is the normalized inverse depth.
        if self.rdp.modes.persp_tex_en && w != 0 {
            s /= w;
            t /= w;
        }
        // LOD shifts.
        if tile.shift_s < 11 {
            s >>= tile.shift_s;
        } else {
            s <<= 16 - tile.shift_s;
        }
        if tile.shift_t < 11 {
            t >>= tile.shift_t;
        } else {
            t <<= 16 - tile.shift_t;
        }

        // To tile coordinates, dropping the fraction.
        let mut s_tile = ((s >> 19) - tile.sl as i32) >> 2;
        let mut t_tile = ((t >> 19) - tile.tl as i32) >> 2;

        let s_tile_max = (tile.sh.wrapping_sub(tile.sl) >> 2) as i32;
        let t_tile_max = (tile.th.wrapping_sub(tile.tl) >> 2) as i32;
        let mirror_s_bit = 1u32 << tile.mask_s;
        let mask_s = mirror_s_bit - 1;
        let mirror_t_bit = 1u32 << tile.mask_t;
        let mask_t = mirror_t_bit - 1;

        // Clamping, implicit when the mask is null.
        if mask_s == 0 || tile.clamp_s {
            s_tile = s_tile.clamp(0, s_tile_max);
        }
        if mask_t == 0 || tile.clamp_t {
            t_tile = t_tile.clamp(0, t_tile_max);
        }
        // Mirroring and wrapping.
        if mask_s != 0 {
            if tile.mirror_s && (s_tile as u32) & mirror_s_bit != 0 {
                s_tile = (!(s_tile as u32) & mask_s) as i32;
            } else {
                s_tile = ((s_tile as u32) & mask_s) as i32;
            }
        }
        if mask_t != 0 {
            if tile.mirror_t && (t_tile as u32) & mirror_t_bit != 0 {
                t_tile = (!(t_tile as u32) & mask_t) as i32;
            } else {
                t_tile = ((t_tile as u32) & mask_t) as i32;
            }
        }

        // TMEM address in 4-bit units.
        ((tile.tmem_addr << 4) as i32
            + ((tile.tl >> 2) as i32 + t_tile) * (tile.line << 4) as i32
            + (((tile.sl >> 2) as i32 + s_tile) << tile.size.shift())) as usize
    }
}

/// Widens a 16-bit RGBA5551 pixel to 8-bit channels.
pub(crate) fn rgba5551_to_color(val: u16) -> Color {
    let r = ((val >> 11) & 0x1F) as u8;
    let g = ((val >> 6) & 0x1F) as u8;
    let b = ((val >> 1) & 0x1F) as u8;
    Color {
        r: (r << 3) | (r >> 2),
        g: (g << 3) | (g >> 2),
        b: (b << 3) | (b >> 2),
        a: if val & 1 != 0 { 255 } else { 0 },
    }
}

/// Packs an 8-bit color back into RGBA5551.
pub(crate) fn color_to_rgba5551(c: Color) -> u16 {
    (((c.r >> 3) as u16) << 11)
        | (((c.g >> 3) as u16) << 6)
        | (((c.b >> 3) as u16) << 1)
        | (c.a >> 7) as u16
}
