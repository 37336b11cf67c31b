//! Triangle and rectangle setup.
//!
//! Triangle commands carry three edge coefficients (Y bounds in S11.2 sign
//! extended, X positions and slopes in S15.16) plus optional shade, texture
//! and z attribute planes. The walker steps Y in quarter-pixel lines from
//! `yh` to `ym` along the major and first minor edge, then switches the
//! minor edge at `ym` and continues to `yl`, emitting one span per step.

use crate::rdp::span::{ShadeCoefs, TextureCoefs, ZBufferCoefs};
use crate::state::Machine;

/// Edge coefficients of one triangle.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeCoefs {
    pub yl: i32,
    pub ym: i32,
    pub yh: i32,
    pub xl: i32,
    pub xm: i32,
    pub xh: i32,
    pub dxldy: i32,
    pub dxmdy: i32,
    pub dxhdy: i32,
}

/// Sign-extends the 14-bit S11.2 Y field of the triangle command.
fn sign_extend_y(raw: u32) -> i32 {
    let mut y = raw & 0x3FFF;
    if y & (1 << 13) != 0 {
        y |= 0xFFFF_C000;
    }
    y as i32
}

/// Reassembles an S15.16 value from the split integer/fraction dwords of an
/// attribute block.
fn read_s15_16(val: u64, frac: u64, shift: u32) -> i32 {
    let top = (((val >> shift) as u32) << 16) & 0xFFFF_0000;
    let bottom = ((frac >> shift) as u32) & 0xFFFF;
    (top | bottom) as i32
}

/// Decodes the edge coefficients from the command word and first three
/// parameter dwords.
pub fn read_edge_coefs(cmd: u64, params: &[u64]) -> EdgeCoefs {
    EdgeCoefs {
        yl: sign_extend_y((cmd >> 32) as u32),
        ym: sign_extend_y((cmd >> 16) as u32),
        yh: sign_extend_y(cmd as u32),
        xl: (params[0] >> 32) as u32 as i32,
        dxldy: params[0] as u32 as i32,
        xh: (params[1] >> 32) as u32 as i32,
        dxhdy: params[1] as u32 as i32,
        xm: (params[2] >> 32) as u32 as i32,
        dxmdy: params[2] as u32 as i32,
    }
}

/// Decodes a shade attribute block (eight dwords).
pub fn read_shade_coefs(params: &[u64]) -> ShadeCoefs {
    ShadeCoefs {
        r: read_s15_16(params[0], params[2], 48),
        g: read_s15_16(params[0], params[2], 32),
        b: read_s15_16(params[0], params[2], 16),
        a: read_s15_16(params[0], params[2], 0),
        drdx: read_s15_16(params[1], params[3], 48),
        dgdx: read_s15_16(params[1], params[3], 32),
        dbdx: read_s15_16(params[1], params[3], 16),
        dadx: read_s15_16(params[1], params[3], 0),
        drde: read_s15_16(params[4], params[6], 48),
        dgde: read_s15_16(params[4], params[6], 32),
        dbde: read_s15_16(params[4], params[6], 16),
        dade: read_s15_16(params[4], params[6], 0),
        drdy: read_s15_16(params[5], params[7], 48),
        dgdy: read_s15_16(params[5], params[7], 32),
        dbdy: read_s15_16(params[5], params[7], 16),
        dady: read_s15_16(params[5], params[7], 0),
    }
}

/// Decodes a texture attribute block (eight dwords).
pub fn read_texture_coefs(params: &[u64]) -> TextureCoefs {
    TextureCoefs {
        s: read_s15_16(params[0], params[2], 48),
        t: read_s15_16(params[0], params[2], 32),
        w: read_s15_16(params[0], params[2], 16),
        dsdx: read_s15_16(params[1], params[3], 48),
        dtdx: read_s15_16(params[1], params[3], 32),
        dwdx: read_s15_16(params[1], params[3], 16),
        dsde: read_s15_16(params[4], params[6], 48),
        dtde: read_s15_16(params[4], params[6], 32),
        dwde: read_s15_16(params[4], params[6], 16),
        dsdy: read_s15_16(params[5], params[7], 48),
        dtdy: read_s15_16(params[5], params[7], 32),
        dwdy: read_s15_16(params[5], params[7], 16),
    }
}

/// Decodes a z-buffer attribute block (two dwords).
pub fn read_zbuffer_coefs(params: &[u64]) -> ZBufferCoefs {
    ZBufferCoefs {
        z: (params[0] >> 32) as u32 as i32,
        dzdx: params[0] as u32 as i32,
        dzde: (params[1] >> 32) as u32 as i32,
        dzdy: params[1] as u32 as i32,
    }
}

impl Machine {
    /// Rasterises one triangle command.
    ///
    /// # Arguments
    ///
    /// * `command` - The first command dword (flags and Y bounds).
    /// * `params` - The remaining dwords: edges, then the attribute blocks
    ///   selected by the three flags.
    pub(crate) fn render_triangle(
        &mut self,
        command: u64,
        params: &[u64],
        has_shade: bool,
        has_texture: bool,
        has_zbuffer: bool,
    ) {
        let left = (command >> 55) & 1 != 0;
        let tile = ((command >> 48) & 0x7) as usize;

        let edge = read_edge_coefs(command, params);
        let mut params = &params[3..];

        let mut shade = has_shade.then(|| {
            let s = read_shade_coefs(params);
            params = &params[8..];
            s
        });
        let mut texture = has_texture.then(|| {
            let t = read_texture_coefs(params);
            params = &params[8..];
            t
        });
        let mut zbuffer = has_zbuffer.then(|| read_zbuffer_coefs(params));

        let (mut xs, mut dxsdy, mut xe, mut dxedy) = if left {
            (edge.xh, edge.dxhdy, edge.xm, edge.dxmdy)
        } else {
            (edge.xm, edge.dxmdy, edge.xh, edge.dxhdy)
        };

        let mut y = edge.yh & !3;
        while y < edge.ym {
            self.render_span(
                left,
                tile,
                y,
                xs,
                xe,
                shade.as_ref(),
                texture.as_ref(),
                zbuffer.as_ref(),
            );
            xs = xs.wrapping_add(dxsdy);
            xe = xe.wrapping_add(dxedy);
            step_attributes(&mut shade, &mut texture, &mut zbuffer);
            y += 4;
        }

        // Switch the long edge at the mid vertex.
        if left {
            xe = edge.xl;
            dxedy = edge.dxldy;
        } else {
            xs = edge.xl;
            dxsdy = edge.dxldy;
        }

        while y < edge.yl {
            self.render_span(
                left,
                tile,
                y,
                xs,
                xe,
                shade.as_ref(),
                texture.as_ref(),
                zbuffer.as_ref(),
            );
            xs = xs.wrapping_add(dxsdy);
            xe = xe.wrapping_add(dxedy);
            step_attributes(&mut shade, &mut texture, &mut zbuffer);
            y += 4;
        }
    }

    /// Rasterises a textured rectangle (optionally with flipped S/T axes).
    pub(crate) fn render_texture_rectangle(&mut self, command: u64, params: &[u64], flip: bool) {
        // Screen coordinates in 10.2 fixed point.
        let xl = ((command >> 44) & 0xFFF) as u32;
        let yl = ((command >> 32) & 0xFFF) as u32;
        let tile = ((command >> 24) & 0x7) as usize;
        let xh = ((command >> 12) & 0xFFF) as u32;
        let yh = (command & 0xFFF) as u32;

        // Texture coordinates in S10.5, deltas in S5.10; widened to S10.21.
        let s = ((params[0] >> 48) & 0xFFFF) as u16 as i16 as i32;
        let t = ((params[0] >> 32) & 0xFFFF) as u16 as i16 as i32;
        let dsdx = ((params[0] >> 16) & 0xFFFF) as u16 as i16 as i32;
        let dtdy = (params[0] & 0xFFFF) as u16 as i16 as i32;

        let mut texture = if flip {
            TextureCoefs {
                s: s << 16,
                t: t << 16,
                dtdx: dtdy << 11,
                dsdy: dsdx << 11,
                ..TextureCoefs::default()
            }
        } else {
            TextureCoefs {
                s: s << 16,
                t: t << 16,
                dsdx: dsdx << 11,
                dtdy: dtdy << 11,
                ..TextureCoefs::default()
            }
        };

        // Edge positions from 10.2 to S15.16.
        let xs = (xh << 14) as i32;
        let xe = (xl << 14) as i32;

        let mut y = yh;
        while y < yl {
            self.render_span(true, tile, y as i32, xs, xe, None, Some(&texture), None);
            texture.t = texture.t.wrapping_add(texture.dtdy);
            texture.s = texture.s.wrapping_add(texture.dsdy);
            y += 4;
        }
    }

    /// Rasterises a fill rectangle (fill cycle type only).
    pub(crate) fn render_fill_rectangle(&mut self, command: u64) {
        let xl = ((command >> 44) & 0xFFF) as u32;
        let yl = ((command >> 32) & 0xFFF) as u32;
        let xh = ((command >> 12) & 0xFFF) as u32;
        let yh = (command & 0xFFF) as u32;

        if self.rdp.modes.cycle_type != crate::rdp::CycleType::Fill {
            self.halt("FillRectangle outside fill cycle type");
            return;
        }
        if xh > xl || yh > yl {
            self.halt("FillRectangle with inverted coordinates");
            return;
        }

        for y in (yh >> 2)..=(yl >> 2) {
            self.render_fill_line(y << 2, xh, xl);
        }
    }
}

fn step_attributes(
    shade: &mut Option<ShadeCoefs>,
    texture: &mut Option<TextureCoefs>,
    zbuffer: &mut Option<ZBufferCoefs>,
) {
    if let Some(s) = shade {
        s.r = s.r.wrapping_add(s.drde);
        s.g = s.g.wrapping_add(s.dgde);
        s.b = s.b.wrapping_add(s.dbde);
        s.a = s.a.wrapping_add(s.dade);
    }
    if let Some(t) = texture {
        t.s = t.s.wrapping_add(t.dsde);
        t.t = t.t.wrapping_add(t.dtde);
        t.w = t.w.wrapping_add(t.dwde);
    }
    if let Some(z) = zbuffer {
        z.z = z.z.wrapping_add(z.dzde);
    }
}
