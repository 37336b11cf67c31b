//! RDP command-list parsing and dispatch.
//!
//! Commands are 64-bit aligned; the 6-bit opcode in the top of the first
//! dword selects the handler and its dword count. The FIFO drains
//! synchronously when `DPC_END` is written: commands are read from
//! `DPC_CURRENT` up to the new end pointer, from DRAM or from DMEM when the
//! cross-bus bit is set.

use crate::rdp::{
    Color, CombineMode, CycleType, Image, ImageFormat, PixelSize, SampleType, TexelType, TlutType,
};
use crate::common::constants::TMEM_PALETTE_BASE;
use crate::soc::devices::dp::DPC_STATUS_XBUS_DMEM_DMA;
use crate::soc::devices::mi;
use crate::state::{Machine, read_be64};

/// Dword count per opcode; zero marks an unassigned slot.
#[rustfmt::skip]
const COMMAND_LENGTH: [u8; 64] = [
    0,  0,  0,  0,  0,  0,  0,  0,
    4,  6, 12, 14, 12, 14, 20, 22, // triangle variants
    0,  0,  0,  0,  0,  0,  0,  0,
    0,  0,  0,  0,  0,  0,  0,  0,
    0,  0,  0,  0,  2,  2,  0,  1, // texture rectangles, sync pipe
    1,  1,  1,  1,  1,  1,  1,  1, // syncs, keys, convert, scissor, prim depth, other modes
    1,  1,  1,  0,  1,  1,  1,  1, // tlut, sync load, tile size, load tile, set tile, fill rect
    1,  1,  1,  1,  1,  1,  1,  1, // colors, combine, images
];

impl Machine {
    /// Whether `count` more command dwords are available in the FIFO.
    fn dpc_has_next(&self, count: u32) -> bool {
        self.hwreg.dpc_current + count * 8 <= self.hwreg.dpc_end
    }

    /// Reads `out.len()` command dwords starting at `DPC_CURRENT`, from
    /// DMEM when the cross-bus bit is set and from DRAM otherwise.
    fn dpc_read(&mut self, out: &mut [u64]) {
        let mut addr = self.hwreg.dpc_current;
        let xbus = self.hwreg.dpc_status & DPC_STATUS_XBUS_DMEM_DMA != 0;
        for dword in out.iter_mut() {
            *dword = if xbus {
                read_be64(&self.dmem, (addr as usize & 0xFFF) & !7)
            } else {
                let a = addr as usize & !7;
                if a + 8 <= self.dram.len() {
                    read_be64(&self.dram, a)
                } else {
                    0
                }
            };
            addr += 8;
        }
    }

    /// Drains the command FIFO after a `DPC_END` write.
    pub(crate) fn rdp_drain_commands(&mut self) {
        self.stats.dp_lists += 1;
        while self.dpc_has_next(1) && !self.halted {
            let mut head = [0u64; 1];
            self.dpc_read(&mut head);
            let command = head[0];
            let opcode = ((command >> 56) & 0x3F) as usize;

            let nr_dwords = COMMAND_LENGTH[opcode] as u32;
            if nr_dwords == 0 {
                tracing::error!(opcode, command = format_args!("{command:#018x}"), "DPC unknown command");
                self.halt("DPC unknown command");
                break;
            }
            if !self.dpc_has_next(nr_dwords) {
                self.halt("DPC incomplete command");
                break;
            }

            let mut dwords = vec![0u64; nr_dwords as usize];
            self.dpc_read(&mut dwords);
            self.rdp_command(opcode, command, &dwords[1..]);
            self.hwreg.dpc_current += 8 * nr_dwords;
        }
    }

    /// Executes one command.
    fn rdp_command(&mut self, opcode: usize, command: u64, params: &[u64]) {
        match opcode {
            // Triangles: three independent flags crossing shade/texture/z.
            0x08 => self.render_triangle(command, params, false, false, false),
            0x09 => self.render_triangle(command, params, false, false, true),
            0x0A => self.render_triangle(command, params, false, true, false),
            0x0B => self.render_triangle(command, params, false, true, true),
            0x0C => self.render_triangle(command, params, true, false, false),
            0x0D => self.render_triangle(command, params, true, false, true),
            0x0E => self.render_triangle(command, params, true, true, false),
            0x0F => self.render_triangle(command, params, true, true, true),

            0x24 => self.render_texture_rectangle(command, params, false),
            0x25 => self.render_texture_rectangle(command, params, true),

            // Syncs are scheduling fences on hardware; the synchronous
            // drain leaves nothing to fence. Full sync raises the DP
            // interrupt the guest waits on.
            0x27 | 0x28 | 0x31 => {}
            0x29 => mi::raise(self, mi::MI_INTR_DP),

            0x2A => self.set_key_gb(command),
            0x2B => self.set_key_r(command),
            0x2C => self.set_convert(command),
            0x2D => self.set_scissor(command),
            0x2E => self.set_prim_depth(command),
            0x2F => self.set_other_modes(command),
            0x30 => self.load_tlut(command),
            0x32 => self.set_tile_size(command),
            0x34 => self.load_tile(command),
            0x35 => self.set_tile(command),
            0x36 => self.render_fill_rectangle(command),
            0x37 => self.rdp.fill_color = command as u32,
            0x38 => self.rdp.fog_color = Color::from_u32(command as u32),
            0x39 => self.rdp.blend_color = Color::from_u32(command as u32),
            0x3A => self.rdp.prim_color = Color::from_u32(command as u32),
            0x3B => self.rdp.env_color = Color::from_u32(command as u32),
            0x3C => self.set_combine_mode(command),
            0x3D => self.set_texture_image(command),
            0x3E => self.rdp.z_image_addr = (command as u32) & 0x03FF_FFFF,
            0x3F => self.set_color_image(command),
            _ => self.halt("DPC unhandled command"),
        }
    }

    fn set_key_gb(&mut self, command: u64) {
        self.rdp.key_width[1] = ((command >> 44) & 0xFFF) as u32;
        self.rdp.key_width[2] = ((command >> 32) & 0xFFF) as u32;
        self.rdp.key_center.g = (command >> 24) as u8;
        self.rdp.key_scale.g = (command >> 16) as u8;
        self.rdp.key_center.b = (command >> 8) as u8;
        self.rdp.key_scale.b = command as u8;
    }

    fn set_key_r(&mut self, command: u64) {
        self.rdp.key_width[0] = ((command >> 16) & 0xFFF) as u32;
        self.rdp.key_center.r = (command >> 8) as u8;
        self.rdp.key_scale.r = command as u8;
    }

    fn set_convert(&mut self, command: u64) {
        // Six S1.7 coefficients packed 9 bits each, sign extended to S8.7.
        for (i, k) in self.rdp.convert_k.iter_mut().enumerate() {
            let shift = 45 - 9 * i;
            let raw = ((command >> shift) & 0x1FF) as u32;
            *k = (((raw << 23) as i32) >> 23) as i16;
        }
    }

    fn set_scissor(&mut self, command: u64) {
        let s = &mut self.rdp.scissor;
        s.xh = ((command >> 44) & 0xFFF) as u32;
        s.yh = ((command >> 32) & 0xFFF) as u32;
        s.xl = ((command >> 12) & 0xFFF) as u32;
        s.yl = (command & 0xFFF) as u32;

        let field = command & (1 << 25) != 0;
        let odd = command & (1 << 24) != 0;
        s.skip_odd_lines = field && !odd;
        s.skip_even_lines = field && odd;

        if s.xh > s.xl || s.yh > s.yl {
            self.halt("SetScissor with inverted coordinates");
        }
    }

    fn set_prim_depth(&mut self, command: u64) {
        self.rdp.prim_z = ((command >> 16) & 0xFFFF) as u16 as i16 as i32;
        self.rdp.prim_deltaz = (command & 0xFFFF) as u16 as i16 as i32;
    }

    fn set_other_modes(&mut self, command: u64) {
        let m = &mut self.rdp.modes;
        m.atomic_prim = (command >> 55) & 1 != 0;
        m.cycle_type = match (command >> 52) & 0x3 {
            0 => CycleType::One,
            1 => CycleType::Two,
            2 => CycleType::Copy,
            _ => CycleType::Fill,
        };
        m.persp_tex_en = (command >> 51) & 1 != 0;
        m.detail_tex_en = (command >> 50) & 1 != 0;
        m.sharpen_tex_en = (command >> 49) & 1 != 0;
        m.tex_lod_en = (command >> 48) & 1 != 0;
        m.tlut_en = (command >> 47) & 1 != 0;
        m.tlut_type = if (command >> 46) & 1 != 0 {
            TlutType::Ia
        } else {
            TlutType::Rgba
        };
        m.sample_type = if (command >> 45) & 1 != 0 {
            SampleType::S2x2
        } else {
            SampleType::S1x1
        };
        m.mid_texel = (command >> 44) & 1 != 0;
        m.bi_lerp_0 = (command >> 43) & 1 != 0;
        m.bi_lerp_1 = (command >> 42) & 1 != 0;
        m.convert_one = (command >> 41) & 1 != 0;
        m.key_en = (command >> 40) & 1 != 0;
        m.rgb_dither_sel = ((command >> 38) & 0x3) as u32;
        m.alpha_dither_sel = ((command >> 36) & 0x3) as u32;
        m.blend.m1a[0] = ((command >> 30) & 0x3) as u32;
        m.blend.m1a[1] = ((command >> 28) & 0x3) as u32;
        m.blend.m1b[0] = ((command >> 26) & 0x3) as u32;
        m.blend.m1b[1] = ((command >> 24) & 0x3) as u32;
        m.blend.m2a[0] = ((command >> 22) & 0x3) as u32;
        m.blend.m2a[1] = ((command >> 20) & 0x3) as u32;
        m.blend.m2b[0] = ((command >> 18) & 0x3) as u32;
        m.blend.m2b[1] = ((command >> 16) & 0x3) as u32;
        m.force_blend = (command >> 14) & 1 != 0;
        m.alpha_cvg_select = (command >> 13) & 1 != 0;
        m.cvg_times_alpha = (command >> 12) & 1 != 0;
        m.z_mode = ((command >> 10) & 0x3) as u32;
        m.cvg_dest = ((command >> 8) & 0x3) as u32;
        m.color_on_cvg = (command >> 7) & 1 != 0;
        m.image_read_en = (command >> 6) & 1 != 0;
        m.z_update_en = (command >> 5) & 1 != 0;
        m.z_compare_en = (command >> 4) & 1 != 0;
        m.antialias_en = (command >> 3) & 1 != 0;
        m.z_source_prim = (command >> 2) & 1 != 0;
        m.dither_alpha_en = (command >> 1) & 1 != 0;
        m.alpha_compare_en = command & 1 != 0;

        if m.cycle_type == CycleType::Copy {
            m.sample_type = SampleType::S4x1;
        }
    }

    fn set_combine_mode(&mut self, command: u64) {
        let c = &mut self.rdp.combine;
        *c = CombineMode {
            sub_a_r: [((command >> 52) & 0xF) as u32, ((command >> 37) & 0xF) as u32],
            mul_r: [((command >> 47) & 0x1F) as u32, ((command >> 32) & 0x1F) as u32],
            sub_a_a: [((command >> 44) & 0x7) as u32, ((command >> 21) & 0x7) as u32],
            mul_a: [((command >> 41) & 0x7) as u32, ((command >> 18) & 0x7) as u32],
            sub_b_r: [((command >> 28) & 0xF) as u32, ((command >> 24) & 0xF) as u32],
            add_r: [((command >> 15) & 0x7) as u32, ((command >> 6) & 0x7) as u32],
            sub_b_a: [((command >> 12) & 0x7) as u32, ((command >> 3) & 0x7) as u32],
            add_a: [((command >> 9) & 0x7) as u32, (command & 0x7) as u32],
        };
    }

    fn set_tile(&mut self, command: u64) {
        let idx = ((command >> 24) & 0x7) as usize;
        let tile = &mut self.rdp.tiles[idx];
        tile.format = ImageFormat::from_bits(((command >> 53) & 0x7) as u32);
        tile.size = PixelSize::from_bits(((command >> 51) & 0x3) as u32);
        tile.line = ((command >> 41) & 0x1FF) as u32;
        tile.tmem_addr = ((command >> 32) & 0x1FF) as u32;
        tile.palette = ((command >> 20) & 0xF) as u32;
        tile.clamp_t = (command >> 19) & 1 != 0;
        tile.mirror_t = (command >> 18) & 1 != 0;
        tile.mask_t = ((command >> 14) & 0xF) as u32;
        tile.shift_t = ((command >> 10) & 0xF) as u32;
        tile.clamp_s = (command >> 9) & 1 != 0;
        tile.mirror_s = (command >> 8) & 1 != 0;
        tile.mask_s = ((command >> 4) & 0xF) as u32;
        tile.shift_s = (command & 0xF) as u32;
        tile.texel_type = TexelType::from_format(tile.format, tile.size);
    }

    fn set_tile_size(&mut self, command: u64) {
        let idx = ((command >> 24) & 0x7) as usize;
        let tile = &mut self.rdp.tiles[idx];
        tile.sl = ((command >> 44) & 0xFFF) as u32;
        tile.tl = ((command >> 32) & 0xFFF) as u32;
        tile.sh = ((command >> 12) & 0xFFF) as u32;
        tile.th = (command & 0xFFF) as u32;
    }

    fn set_texture_image(&mut self, command: u64) {
        let format = ImageFormat::from_bits(((command >> 53) & 0x7) as u32);
        let size = PixelSize::from_bits(((command >> 51) & 0x3) as u32);
        let image = Image {
            format,
            size,
            texel_type: TexelType::from_format(format, size),
            width: 1 + ((command >> 32) & 0x3FF) as u32,
            addr: (command as u32) & 0x03FF_FFFF,
        };
        if image.addr % 8 != 0 {
            self.halt("SetTextureImage with misaligned address");
            return;
        }
        self.rdp.texture_image = image;
    }

    fn set_color_image(&mut self, command: u64) {
        let format = ImageFormat::from_bits(((command >> 53) & 0x7) as u32);
        let size = PixelSize::from_bits(((command >> 51) & 0x3) as u32);
        let image = Image {
            format,
            size,
            texel_type: TexelType::from_format(format, size),
            width: 1 + ((command >> 32) & 0x3FF) as u32,
            addr: (command as u32) & 0x03FF_FFFF,
        };
        if image.addr % 8 != 0 {
            self.halt("SetColorImage with misaligned address");
            return;
        }
        if !matches!(
            image.texel_type,
            TexelType::Rgba5551 | TexelType::Rgba8888 | TexelType::Ci8
        ) {
            self.halt("SetColorImage with unsupported format");
            return;
        }
        self.rdp.color_image = image;
    }

    /// Loads a palette from the texture image into the four TMEM banks.
    fn load_tlut(&mut self, command: u64) {
        let sl = ((command >> 44) & 0xFFF) as usize;
        let tl = ((command >> 32) & 0xFFF) as u32;
        let tile = ((command >> 24) & 0x7) as usize;
        let sh = ((command >> 12) & 0xFFF) as usize;
        let th = (command & 0xFFF) as u32;

        self.rdp.tiles[tile].sl = sl as u32;
        self.rdp.tiles[tile].tl = tl;
        self.rdp.tiles[tile].sh = sh as u32;
        self.rdp.tiles[tile].th = th;

        if self.rdp.texture_image.size != PixelSize::Bits16 {
            self.halt("LoadTlut with invalid pixel size");
            return;
        }

        // sl, sh are 10.2 palette indices.
        let sl = sl >> 2;
        let sh = sh >> 2;
        if sl >= 256 || sh >= 256 || sl > sh {
            self.halt("LoadTlut with out-of-bounds palette index");
            return;
        }

        let line_size = (sh - sl) << 1;
        let src = self.rdp.texture_image.addr as usize;
        if src + line_size > self.dram.len() {
            self.halt("LoadTlut source out of bounds");
            return;
        }
        // The palette is quadricated across the four upper banks.
        for bank in 0..4 {
            let dst = TMEM_PALETTE_BASE + bank * 0x200 + (sl << 1);
            for i in 0..line_size {
                self.tmem[dst + i] = self.dram[src + i];
            }
        }
    }

    /// Copies a rectangular tile of the texture image into TMEM.
    fn load_tile(&mut self, command: u64) {
        let sl = ((command >> 44) & 0xFFF) as u32;
        let tl = ((command >> 32) & 0xFFF) as u32;
        let tile_idx = ((command >> 24) & 0x7) as usize;
        let sh = ((command >> 12) & 0xFFF) as u32;
        let th = (command & 0xFFF) as u32;

        {
            let tile = &mut self.rdp.tiles[tile_idx];
            tile.sl = sl;
            tile.tl = tl;
            tile.sh = sh;
            tile.th = th;
        }
        let tile = self.rdp.tiles[tile_idx];

        if self.rdp.texture_image.size != tile.size {
            self.halt("LoadTile with incompatible texture formats");
            return;
        }
        if self.rdp.texture_image.size == PixelSize::Bits4 {
            self.halt("LoadTile with invalid 4-bit source");
            return;
        }

        // Coordinates are 10.2.
        let sl = (sl >> 2) as usize;
        let tl = (tl >> 2) as usize;
        let sh = (sh >> 2) as usize;
        let th = (th >> 2) as usize;

        let size_shift = self.rdp.texture_image.size.shift() as usize - 1;
        // Rounded up to a 64-bit boundary.
        let line_size = (((sh - sl) << size_shift) + 7) & !7;
        let src_stride = (self.rdp.texture_image.width as usize) << size_shift;
        let dst_stride = (tile.line as usize) << 3;

        let mut src = self.rdp.texture_image.addr as usize + tl * src_stride + (sl << size_shift);
        let mut dst = (tile.tmem_addr as usize) << 3;
        for _ in tl..=th {
            for i in 0..line_size {
                if src + i < self.dram.len() && dst + i < self.tmem.len() {
                    self.tmem[dst + i] = self.dram[src + i];
                }
            }
            src += src_stride;
            dst += dst_stride;
        }
    }
}
