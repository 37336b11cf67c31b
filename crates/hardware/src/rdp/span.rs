//! Span rendering: the per-pixel pipeline.
//!
//! A span is one quarter-line row of a triangle or rectangle. Pixels step
//! across it through the six pipeline stages: texture fetch (TX), texture
//! filter (TF), color combine (CC), blend (BL), and the memory interface
//! load/store pair (MI). Fill cycle type bypasses the pipeline entirely and
//! splats the fill color; copy cycle type forces 4×1 sampling and bypasses
//! the blender.

use crate::rdp::{Color, CycleType, PixelSize, SampleType, TexelType};
use crate::rdp::texture::{color_to_rgba5551, rgba5551_to_color};
use crate::state::{Machine, read_be16, read_be32, write_be16, write_be32};

/// Shade attribute plane: base plus per-X, per-edge and per-Y deltas, all
/// S15.16 fixed point.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShadeCoefs {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
    pub drdx: i32,
    pub dgdx: i32,
    pub dbdx: i32,
    pub dadx: i32,
    pub drde: i32,
    pub dgde: i32,
    pub dbde: i32,
    pub dade: i32,
    pub drdy: i32,
    pub dgdy: i32,
    pub dbdy: i32,
    pub dady: i32,
}

/// Texture coordinate plane, S10.21 fixed point.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextureCoefs {
    pub s: i32,
    pub t: i32,
    pub w: i32,
    pub dsdx: i32,
    pub dtdx: i32,
    pub dwdx: i32,
    pub dsde: i32,
    pub dtde: i32,
    pub dwde: i32,
    pub dsdy: i32,
    pub dtdy: i32,
    pub dwdy: i32,
}

/// Depth plane, S15.16 fixed point.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZBufferCoefs {
    pub z: i32,
    pub dzdx: i32,
    pub dzde: i32,
    pub dzdy: i32,
}

/// Per-pixel working state threaded through the pipeline stages.
#[derive(Default)]
struct Pixel {
    texel_colors: [Color; 4],
    texel0: Color,
    lod_frac: u8,
    prim_lod_frac: u8,
    shade: Color,
    combined: Color,
    blended: Color,
    mem_color: Color,
    mem_color_addr: usize,
    mem_z_addr: usize,
}

/// S15.16 fixed-point attribute to an 8-bit channel, clamped.
#[inline]
fn fix_to_u8(v: i32) -> u8 {
    (v >> 16).clamp(0, 255) as u8
}

impl Machine {
    /// Renders one span from `xs` to `xe` (S15.16 edge positions) on
    /// quarter-line `y`, stepping the optional shade/texture/z attribute
    /// planes per pixel.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn render_span(
        &mut self,
        left: bool,
        tile_index: usize,
        y: i32,
        xs: i32,
        xe: i32,
        shade: Option<&ShadeCoefs>,
        texture: Option<&TextureCoefs>,
        zbuffer: Option<&ZBufferCoefs>,
    ) {
        let scissor = self.rdp.scissor;
        if y < scissor.yh as i32
            || y > scissor.yl as i32
            || xe <= xs
            || (scissor.skip_odd_lines && (y >> 2) % 2 != 0)
            || (scissor.skip_even_lines && (y >> 2) % 2 == 0)
        {
            return;
        }

        // Clip and convert from fixed point to integer pixels.
        let y = (y >> 2) as usize;
        let xs = ((xs >> 14).max(scissor.xh as i32) >> 2).max(0) as usize;
        let xe = ((xe >> 14).min(scissor.xl as i32) >> 2).min(self.rdp.color_image.width as i32);
        if (xe as usize) <= xs {
            return;
        }
        let xe = xe as usize;

        let px_size = self.rdp.color_image.size.bytes();
        let width = self.rdp.color_image.width as usize;
        let offset = self.rdp.color_image.addr as usize + (xs + y * width) * px_size;
        let length = (xe - xs) * px_size;
        if offset + length > self.dram.len() {
            self.halt("render_span out-of-bounds color image");
            return;
        }

        let mut px = Pixel {
            lod_frac: 255,
            prim_lod_frac: 255,
            shade: Color::splat(0, 255),
            mem_color_addr: if left { offset } else { offset + length - px_size },
            ..Pixel::default()
        };

        let mut shade_acc = shade.copied().unwrap_or_default();
        let mut tex_acc = texture.copied().unwrap_or_default();
        let mut z_acc = zbuffer.copied().unwrap_or_default();
        let mut deltaz_pix = 0u32;

        if zbuffer.is_some() {
            let z_offset = self.rdp.z_image_addr as usize + (xs + y * width) * 2;
            let z_length = (xe - xs) * 2;
            if z_offset + z_length > self.dram.len() {
                self.halt("render_span out-of-bounds z image");
                return;
            }
            deltaz_pix = z_acc.dzdx.unsigned_abs() + z_acc.dzdy.unsigned_abs();
            px.mem_z_addr = if left { z_offset } else { z_offset + z_length - 2 };
        }

        let copy_mode = self.rdp.modes.cycle_type == CycleType::Copy;
        let count = xe - xs;
        for _ in 0..count {
            self.stats.dp_pixels += 1;
            self.cycles += 1;

            if shade.is_some() {
                px.shade = Color {
                    r: fix_to_u8(shade_acc.r),
                    g: fix_to_u8(shade_acc.g),
                    b: fix_to_u8(shade_acc.b),
                    a: fix_to_u8(shade_acc.a),
                };
            }
            if texture.is_some() {
                self.pipeline_tx(&mut px, tile_index, &tex_acc);
                self.pipeline_tf(&mut px);
            }

            if copy_mode {
                px.blended = px.texel0;
                if self.z_test(&mut px, &z_acc, deltaz_pix, zbuffer.is_some()) {
                    self.pipeline_mi_store(&px);
                }
            } else {
                self.pipeline_cc(&mut px);
                self.pipeline_mi_load(&mut px);
                self.pipeline_bl(&mut px);
                if self.z_test(&mut px, &z_acc, deltaz_pix, zbuffer.is_some()) {
                    self.pipeline_mi_store(&px);
                }
            }
            if self.halted {
                return;
            }

            // Step the attribute planes to the neighbouring pixel.
            let dir: i32 = if left { 1 } else { -1 };
            px.mem_color_addr = px.mem_color_addr.wrapping_add_signed(dir as isize * px_size as isize);
            shade_acc.r = shade_acc.r.wrapping_add(dir.wrapping_mul(shade_acc.drdx));
            shade_acc.g = shade_acc.g.wrapping_add(dir.wrapping_mul(shade_acc.dgdx));
            shade_acc.b = shade_acc.b.wrapping_add(dir.wrapping_mul(shade_acc.dbdx));
            shade_acc.a = shade_acc.a.wrapping_add(dir.wrapping_mul(shade_acc.dadx));
            tex_acc.s = tex_acc.s.wrapping_add(dir.wrapping_mul(tex_acc.dsdx));
            tex_acc.t = tex_acc.t.wrapping_add(dir.wrapping_mul(tex_acc.dtdx));
            tex_acc.w = tex_acc.w.wrapping_add(dir.wrapping_mul(tex_acc.dwdx));
            if zbuffer.is_some() {
                px.mem_z_addr = px.mem_z_addr.wrapping_add_signed(dir as isize * 2);
                z_acc.z = z_acc.z.wrapping_add(dir.wrapping_mul(z_acc.dzdx));
            }
        }
    }

    /// TX: sample one to four texels around the rasterized point.
    fn pipeline_tx(&mut self, px: &mut Pixel, tile_index: usize, tex: &TextureCoefs) {
        let tile = self.rdp.tiles[tile_index];
        let addr = self.texel_address(&tile, tex.s, tex.t, tex.w);
        match self.rdp.modes.sample_type {
            SampleType::S1x1 => {
                let t = self.texel_fetch(&tile, addr);
                px.texel_colors = [t, t, t, t];
            }
            SampleType::S2x2 => {
                let step = 1usize << tile.size.shift();
                let line = (tile.line << 2) as usize;
                px.texel_colors = [
                    self.texel_fetch(&tile, addr),
                    self.texel_fetch(&tile, addr + step),
                    self.texel_fetch(&tile, addr + line),
                    self.texel_fetch(&tile, addr + line + step),
                ];
            }
            SampleType::S4x1 => {
                let step = 1usize << tile.size.shift();
                px.texel_colors = [
                    self.texel_fetch(&tile, addr),
                    self.texel_fetch(&tile, addr + step),
                    self.texel_fetch(&tile, addr + 2 * step),
                    self.texel_fetch(&tile, addr + 3 * step),
                ];
            }
        }
    }

    /// TF: filter the sampled texels down to texel0.
    ///
    /// 2×2 sampling blends the footprint at equal weights; point sampling
    /// passes the nearest texel through.
    fn pipeline_tf(&mut self, px: &mut Pixel) {
        if self.rdp.modes.sample_type == SampleType::S2x2 {
            let t = &px.texel_colors;
            px.texel0 = Color {
                r: ((t[0].r as u16 + t[1].r as u16 + t[2].r as u16 + t[3].r as u16) / 4) as u8,
                g: ((t[0].g as u16 + t[1].g as u16 + t[2].g as u16 + t[3].g as u16) / 4) as u8,
                b: ((t[0].b as u16 + t[1].b as u16 + t[2].b as u16 + t[3].b as u16) / 4) as u8,
                a: ((t[0].a as u16 + t[1].a as u16 + t[2].a as u16 + t[3].a as u16) / 4) as u8,
            };
        } else {
            px.texel0 = px.texel_colors[0];
        }
        px.lod_frac = 255;
    }

    /// CC: the color combiner, `(sub_a - sub_b) * mul + add` with the
    /// multiplier in 0.8 fixed point, RGB and alpha muxes independent.
    /// One-cycle mode uses the second cycle's mux configuration; two-cycle
    /// mode runs both with the combined output feeding cycle 1.
    fn pipeline_cc(&mut self, px: &mut Pixel) {
        if self.rdp.modes.cycle_type == CycleType::Two {
            self.pipeline_cc_cycle(px, 0);
        }
        self.pipeline_cc_cycle(px, 1);
    }

    fn pipeline_cc_cycle(&mut self, px: &mut Pixel, cycle: usize) {
        let cm = self.rdp.combine;
        let rdp = &self.rdp;

        let rgb = |sel: u32, px: &Pixel| -> (u8, u8, u8) {
            match sel {
                0 => (px.combined.r, px.combined.g, px.combined.b),
                1 => (px.texel0.r, px.texel0.g, px.texel0.b),
                2 => (px.texel_colors[1].r, px.texel_colors[1].g, px.texel_colors[1].b),
                3 => (rdp.prim_color.r, rdp.prim_color.g, rdp.prim_color.b),
                4 => (px.shade.r, px.shade.g, px.shade.b),
                5 => (rdp.env_color.r, rdp.env_color.g, rdp.env_color.b),
                _ => (0, 0, 0),
            }
        };
        let alpha = |sel: u32, px: &Pixel| -> u8 {
            match sel {
                0 => px.combined.a,
                1 => px.texel0.a,
                2 => px.texel_colors[1].a,
                3 => rdp.prim_color.a,
                4 => px.shade.a,
                5 => rdp.env_color.a,
                6 => 255,
                _ => 0,
            }
        };

        let sub_a = match cm.sub_a_r[cycle] {
            6 => (255, 255, 255),
            7 => (noise(), noise(), noise()),
            sel => rgb(sel, px),
        };
        let sub_b = match cm.sub_b_r[cycle] {
            6 => (rdp.key_center.r, rdp.key_center.g, rdp.key_center.b),
            7 => {
                let k4 = rdp.convert_k[4] as u8;
                (k4, k4, k4)
            }
            sel => rgb(sel, px),
        };
        let mul = match cm.mul_r[cycle] {
            6 => (rdp.key_scale.r, rdp.key_scale.g, rdp.key_scale.b),
            7 => {
                let a = px.combined.a;
                (a, a, a)
            }
            8 => {
                let a = px.texel0.a;
                (a, a, a)
            }
            9 => {
                let a = px.texel_colors[1].a;
                (a, a, a)
            }
            10 => {
                let a = rdp.prim_color.a;
                (a, a, a)
            }
            11 => {
                let a = px.shade.a;
                (a, a, a)
            }
            12 => {
                let a = rdp.env_color.a;
                (a, a, a)
            }
            13 => (px.lod_frac, px.lod_frac, px.lod_frac),
            14 => (px.prim_lod_frac, px.prim_lod_frac, px.prim_lod_frac),
            15 => {
                let k5 = rdp.convert_k[5] as u8;
                (k5, k5, k5)
            }
            sel if sel < 6 => rgb(sel, px),
            _ => (0, 0, 0),
        };
        let add = match cm.add_r[cycle] {
            6 => (255, 255, 255),
            sel if sel < 6 => rgb(sel, px),
            _ => (0, 0, 0),
        };

        // The multiplier is converted to 0.8 fixed point.
        let comb = |a: u8, b: u8, c: u8, d: u8| -> u8 {
            ((((a as i32 - b as i32) * c as i32) >> 8) + d as i32) as u8
        };
        px.combined.r = comb(sub_a.0, sub_b.0, mul.0, add.0);
        px.combined.g = comb(sub_a.1, sub_b.1, mul.1, add.1);
        px.combined.b = comb(sub_a.2, sub_b.2, mul.2, add.2);

        let sub_a_a = match cm.sub_a_a[cycle] {
            sel if sel < 7 => alpha(sel, px),
            _ => 0,
        };
        let sub_b_a = match cm.sub_b_a[cycle] {
            sel if sel < 7 => alpha(sel, px),
            _ => 0,
        };
        let mul_a = match cm.mul_a[cycle] {
            0 => px.lod_frac,
            6 => px.prim_lod_frac,
            sel if sel < 6 => alpha(sel, px),
            _ => 0,
        };
        let add_a = match cm.add_a[cycle] {
            sel if sel < 7 => alpha(sel, px),
            _ => 0,
        };
        px.combined.a = comb(sub_a_a, sub_b_a, mul_a, add_a);
    }

    /// BL: the blender, `(p·a + m·b) / (a + b)` with each mux input
    /// selected from its source set.
    fn pipeline_bl(&mut self, px: &mut Pixel) {
        let modes = &self.rdp.modes;
        let p = match modes.blend.m1a[0] {
            0 => px.combined,
            1 => px.mem_color,
            2 => self.rdp.blend_color,
            _ => self.rdp.fog_color,
        };
        let a = match modes.blend.m1b[0] {
            0 => px.combined.a,
            1 => self.rdp.fog_color.a,
            2 => px.shade.a,
            _ => 0,
        };
        let m = match modes.blend.m2a[0] {
            0 => px.combined,
            1 => px.mem_color,
            2 => self.rdp.blend_color,
            _ => self.rdp.fog_color,
        };
        let b = match modes.blend.m2b[0] {
            0 => 255 - a,
            1 => px.mem_color.a,
            2 => 255,
            _ => 0,
        };

        let denom = a as u32 + b as u32;
        if denom == 0 {
            px.blended = p;
            return;
        }
        let blend = |p: u8, m: u8| -> u8 {
            ((p as u32 * a as u32 + m as u32 * b as u32) / denom) as u8
        };
        px.blended = Color {
            r: blend(p.r, m.r),
            g: blend(p.g, m.g),
            b: blend(p.b, m.b),
            a: blend(p.a, m.a),
        };
    }

    /// MI load: read the existing framebuffer pixel.
    fn pipeline_mi_load(&mut self, px: &mut Pixel) {
        match self.rdp.color_image.texel_type {
            TexelType::Rgba5551 => {
                let val = read_be16(&self.dram, px.mem_color_addr);
                px.mem_color = rgba5551_to_color(val);
            }
            TexelType::Rgba8888 => {
                let val = read_be32(&self.dram, px.mem_color_addr);
                px.mem_color = Color {
                    r: (val >> 24) as u8,
                    g: (val >> 16) as u8,
                    b: (val >> 8) as u8,
                    a: val as u8,
                };
            }
            _ => self.halt("mi load: unsupported color image format"),
        }
    }

    /// MI store: write the blended pixel.
    fn pipeline_mi_store(&mut self, px: &Pixel) {
        match self.rdp.color_image.texel_type {
            TexelType::Rgba5551 => {
                write_be16(&mut self.dram, px.mem_color_addr, color_to_rgba5551(px.blended));
            }
            TexelType::Rgba8888 => {
                let val = ((px.blended.r as u32) << 24)
                    | ((px.blended.g as u32) << 16)
                    | ((px.blended.b as u32) << 8)
                    | px.blended.a as u32;
                write_be32(&mut self.dram, px.mem_color_addr, val);
            }
            _ => self.halt("mi store: unsupported color image format"),
        }
    }

    /// Z compare and optional update.
    ///
    /// # Returns
    ///
    /// `true` when the pixel passes (compare disabled, or strictly nearer
    /// than the stored depth).
    fn z_test(&mut self, px: &mut Pixel, z: &ZBufferCoefs, px_deltaz: u32, enabled: bool) -> bool {
        if !enabled || !self.rdp.modes.z_compare_en {
            return true;
        }
        let _ = px_deltaz;

        let comp_z = if self.rdp.modes.z_source_prim {
            clamp_z(self.rdp.prim_z)
        } else {
            clamp_z(z.z)
        };

        let mem_z = read_be16(&self.dram, px.mem_z_addr) as i16;
        if comp_z as i16 >= mem_z {
            return false;
        }
        if self.rdp.modes.z_update_en {
            write_be16(&mut self.dram, px.mem_z_addr, comp_z);
        }
        true
    }

    /// Fill-mode line writer: splats the 32-bit fill color across the
    /// pixel width from `xs` to `xe` (10.2 coordinates) on line `y`.
    pub(crate) fn render_fill_line(&mut self, y: u32, xs: u32, xe: u32) {
        let scissor = self.rdp.scissor;
        if y < scissor.yh
            || y >= scissor.yl
            || (scissor.skip_odd_lines && (y >> 2) % 2 != 0)
            || (scissor.skip_even_lines && (y >> 2) % 2 == 0)
        {
            return;
        }

        let y = (y >> 2) as usize;
        let xs = (xs.max(scissor.xh) >> 2) as usize;
        let xe = (xe.min(scissor.xl) >> 2) as usize;
        let fill = self.rdp.fill_color;
        let width = self.rdp.color_image.width as usize;
        let px_size = self.rdp.color_image.size.bytes();

        let offset = self.rdp.color_image.addr as usize + (xs + y * width) * px_size;
        let length = xe.saturating_sub(xs) * px_size;
        if offset + length > self.dram.len() {
            self.halt("fill line out-of-bounds color image");
            return;
        }

        match self.rdp.color_image.size {
            PixelSize::Bits16 => {
                // The 32-bit fill register covers two 16-bit pixels: even
                // columns take the high half, odd columns the low half.
                for x in xs..xe {
                    let half = if x & 1 == 0 { (fill >> 16) as u16 } else { fill as u16 };
                    let off = self.rdp.color_image.addr as usize + (x + y * width) * 2;
                    write_be16(&mut self.dram, off, half);
                    self.stats.dp_pixels += 1;
                    self.cycles += 1;
                }
            }
            PixelSize::Bits32 => {
                for x in xs..xe {
                    let off = self.rdp.color_image.addr as usize + (x + y * width) * 4;
                    write_be32(&mut self.dram, off, fill);
                    self.stats.dp_pixels += 1;
                    self.cycles += 1;
                }
            }
            _ => self.halt("fill line: unsupported color image format"),
        }
    }
}

/// Clamps an S15.16 depth value to U14.2 on write.
fn clamp_z(z: i32) -> u16 {
    let z_min = 0i32;
    let z_max = 0x3FFF_C000i32;
    (z.clamp(z_min, z_max) >> 14) as u16
}

/// The noise source for the combiner mux (deterministic mid-level).
fn noise() -> u8 {
    128
}
