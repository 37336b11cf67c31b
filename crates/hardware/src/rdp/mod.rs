//! RDP display processor.
//!
//! The rasteriser: consumes 64-bit command words from DRAM (or DMEM over
//! the cross bus), mutates the pipeline configuration held here, and renders
//! triangles and rectangles through the TX/TF/CC/BL/MI pixel pipeline into
//! the configured color image. This module holds the configuration state;
//! behaviour lives in:
//! 1. **`commands`:** FIFO drain and the 64-entry command handler table.
//! 2. **`triangle`:** edge-coefficient decoding and the ¼-pixel edge walker.
//! 3. **`span`:** the per-span pixel pipeline and fill-mode line writer.
//! 4. **`texture`:** TMEM texel fetch and format decoding.

/// Command-list parsing and dispatch.
pub mod commands;

/// Span rendering and the pixel pipeline.
pub mod span;

/// TMEM texel fetch and decode.
pub mod texture;

/// Triangle and rectangle setup.
pub mod triangle;

use serde::{Deserialize, Serialize};

/// Internal color representation: the pipeline performs most operations at
/// 8 bits per RGBA component; texels are widened on fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Builds a color from the low 32 bits of a command word (R high byte).
    pub fn from_u32(val: u32) -> Self {
        Self {
            r: (val >> 24) as u8,
            g: (val >> 16) as u8,
            b: (val >> 8) as u8,
            a: val as u8,
        }
    }

    /// A gray color with all three channels equal and the given alpha.
    pub fn splat(i: u8, a: u8) -> Self {
        Self { r: i, g: i, b: i, a }
    }
}

/// Image data format field of the image and tile descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Rgba = 0,
    Yuv = 1,
    Ci = 2,
    Ia = 3,
    I = 4,
}

impl ImageFormat {
    /// Decodes the 3-bit format field.
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => ImageFormat::Yuv,
            2 => ImageFormat::Ci,
            3 => ImageFormat::Ia,
            4 => ImageFormat::I,
            _ => ImageFormat::Rgba,
        }
    }
}

/// Pixel size field: texel/pixel width as a power-of-two of 4 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, PartialOrd, Serialize, Deserialize)]
pub enum PixelSize {
    #[default]
    Bits4 = 0,
    Bits8 = 1,
    Bits16 = 2,
    Bits32 = 3,
}

impl PixelSize {
    /// Decodes the 2-bit size field.
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => PixelSize::Bits8,
            2 => PixelSize::Bits16,
            3 => PixelSize::Bits32,
            _ => PixelSize::Bits4,
        }
    }

    /// log2 of the size in 4-bit units (the texel addressing shift).
    #[inline]
    pub fn shift(self) -> u32 {
        self as u32
    }

    /// Size of one pixel in bytes for 16- and 32-bit formats.
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            PixelSize::Bits4 => 0,
            PixelSize::Bits8 => 1,
            PixelSize::Bits16 => 2,
            PixelSize::Bits32 => 4,
        }
    }
}

/// Format and size combined, for exhaustive texel decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TexelType {
    I4,
    Ia31,
    Ci4,
    I8,
    Ia44,
    Ci8,
    #[default]
    Rgba5551,
    Ia88,
    Yuv16,
    Rgba8888,
    Invalid,
}

impl TexelType {
    /// Combines an image format and pixel size into a texel type.
    pub fn from_format(format: ImageFormat, size: PixelSize) -> Self {
        match (format, size) {
            (ImageFormat::Rgba, PixelSize::Bits16) => TexelType::Rgba5551,
            (ImageFormat::Rgba, PixelSize::Bits32) => TexelType::Rgba8888,
            (ImageFormat::Yuv, PixelSize::Bits16) => TexelType::Yuv16,
            (ImageFormat::Ci, PixelSize::Bits4) => TexelType::Ci4,
            (ImageFormat::Ci, PixelSize::Bits8) => TexelType::Ci8,
            (ImageFormat::Ia, PixelSize::Bits4) => TexelType::Ia31,
            (ImageFormat::Ia, PixelSize::Bits8) => TexelType::Ia44,
            (ImageFormat::Ia, PixelSize::Bits16) => TexelType::Ia88,
            (ImageFormat::I, PixelSize::Bits4) => TexelType::I4,
            (ImageFormat::I, PixelSize::Bits8) => TexelType::I8,
            _ => TexelType::Invalid,
        }
    }
}

/// Cycle type of the pipeline, from SetOtherModes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CycleType {
    #[default]
    One = 0,
    Two = 1,
    Copy = 2,
    Fill = 3,
}

/// TLUT palette entry format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TlutType {
    #[default]
    Rgba = 0,
    Ia = 1,
}

/// Texture sample footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleType {
    #[default]
    S1x1 = 0,
    S2x2 = 1,
    /// Forced when the cycle type is Copy.
    S4x1 = 2,
}

/// A tile descriptor (SetTile / SetTileSize / LoadTile).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Tile {
    pub texel_type: TexelType,
    pub format: ImageFormat,
    pub size: PixelSize,
    /// Tile line stride in 64-bit words.
    pub line: u32,
    /// Starting TMEM address in 64-bit words.
    pub tmem_addr: u32,
    /// Palette number used as the high nibble of 4-bit color indices.
    pub palette: u32,
    pub clamp_t: bool,
    pub mirror_t: bool,
    /// Wrap mask for T; zero means clamp.
    pub mask_t: u32,
    /// Level-of-detail shift for T.
    pub shift_t: u32,
    pub clamp_s: bool,
    pub mirror_s: bool,
    /// Wrap mask for S; zero means clamp.
    pub mask_s: u32,
    /// Level-of-detail shift for S.
    pub shift_s: u32,
    /// Tile bounds in texture space, U10.2 fixed point.
    pub sl: u32,
    pub tl: u32,
    pub sh: u32,
    pub th: u32,
}

/// An image descriptor (SetColorImage / SetTextureImage).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Image {
    pub format: ImageFormat,
    pub size: PixelSize,
    pub texel_type: TexelType,
    /// Width of the image in pixels.
    pub width: u32,
    /// DRAM byte address.
    pub addr: u32,
}

/// The scissor box, in 10.2 fixed-point screen coordinates.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Scissor {
    pub xh: u32,
    pub yh: u32,
    pub xl: u32,
    pub yl: u32,
    pub skip_odd_lines: bool,
    pub skip_even_lines: bool,
}

/// Blender mux selections, two cycles of four sources each.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BlendModes {
    pub m1a: [u32; 2],
    pub m1b: [u32; 2],
    pub m2a: [u32; 2],
    pub m2b: [u32; 2],
}

/// SetOtherModes state.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct OtherModes {
    pub atomic_prim: bool,
    pub cycle_type: CycleType,
    pub persp_tex_en: bool,
    pub detail_tex_en: bool,
    pub sharpen_tex_en: bool,
    pub tex_lod_en: bool,
    pub tlut_en: bool,
    pub tlut_type: TlutType,
    pub sample_type: SampleType,
    pub mid_texel: bool,
    pub bi_lerp_0: bool,
    pub bi_lerp_1: bool,
    pub convert_one: bool,
    pub key_en: bool,
    pub rgb_dither_sel: u32,
    pub alpha_dither_sel: u32,
    pub blend: BlendModes,
    pub force_blend: bool,
    pub alpha_cvg_select: bool,
    pub cvg_times_alpha: bool,
    pub z_mode: u32,
    pub cvg_dest: u32,
    pub color_on_cvg: bool,
    pub image_read_en: bool,
    pub z_update_en: bool,
    pub z_compare_en: bool,
    pub antialias_en: bool,
    pub z_source_prim: bool,
    pub dither_alpha_en: bool,
    pub alpha_compare_en: bool,
}

/// SetCombineMode state: mux selections for both cycles of the color
/// combiner, RGB and alpha paths independent.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CombineMode {
    pub sub_a_r: [u32; 2],
    pub sub_b_r: [u32; 2],
    pub mul_r: [u32; 2],
    pub add_r: [u32; 2],
    pub sub_a_a: [u32; 2],
    pub sub_b_a: [u32; 2],
    pub mul_a: [u32; 2],
    pub add_a: [u32; 2],
}

/// The complete RDP configuration state.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RdpState {
    /// Fill color, splatted across the pixel width in fill cycle type.
    pub fill_color: u32,
    pub fog_color: Color,
    pub blend_color: Color,
    pub prim_color: Color,
    pub env_color: Color,
    /// YUV conversion constants K0-K5, S8.7 fixed point.
    pub convert_k: [i16; 6],
    /// Chroma key center (alpha ignored).
    pub key_center: Color,
    /// Chroma key scale (alpha ignored).
    pub key_scale: Color,
    /// Chroma key widths for R, G, B.
    pub key_width: [u32; 3],
    pub combine: CombineMode,
    pub modes: OtherModes,
    pub scissor: Scissor,
    pub tiles: [Tile; 8],
    pub color_image: Image,
    pub texture_image: Image,
    /// Z image DRAM byte address.
    pub z_image_addr: u32,
    /// Primitive depth, S15.16 after decoding.
    pub prim_z: i32,
    /// Primitive delta depth.
    pub prim_deltaz: i32,
}
