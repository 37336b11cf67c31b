//! Floating-point register file.
//!
//! 32 × 64-bit registers plus the two control registers. The file obeys the
//! `Status.FR` aliasing rule: with FR clear, double-precision and 64-bit
//! accesses use only even-indexed registers (the odd neighbour holds the
//! high word of the pair, and single-precision access to an odd index reads
//! the high half of the even register); with FR set every register is
//! independent.

use serde::{Deserialize, Serialize};

/// Condition bit of the FCR31 control register.
pub const FCR31_C: u32 = 1 << 23;

/// The floating-point register file and control registers.
#[derive(Clone, Serialize, Deserialize)]
pub struct Fpr {
    regs: [u64; 32],
    /// Implementation/revision register (read-only).
    pub fcr0: u32,
    /// Control/status register: rounding mode, flags, condition bit.
    pub fcr31: u32,
}

impl Fpr {
    /// Creates a register file with all registers zero.
    pub fn new() -> Self {
        Self {
            regs: [0; 32],
            fcr0: 0x0000_0B00,
            fcr31: 0,
        }
    }

    /// Reads a 32-bit word from register `idx` under the given FR mode.
    #[inline]
    pub fn read_w(&self, idx: usize, fr: bool) -> u32 {
        if fr {
            self.regs[idx] as u32
        } else if idx & 1 == 0 {
            self.regs[idx] as u32
        } else {
            (self.regs[idx & !1] >> 32) as u32
        }
    }

    /// Writes a 32-bit word to register `idx` under the given FR mode.
    #[inline]
    pub fn write_w(&mut self, idx: usize, fr: bool, val: u32) {
        if fr {
            self.regs[idx] = (self.regs[idx] & 0xFFFF_FFFF_0000_0000) | val as u64;
        } else if idx & 1 == 0 {
            self.regs[idx] = (self.regs[idx] & 0xFFFF_FFFF_0000_0000) | val as u64;
        } else {
            let even = idx & !1;
            self.regs[even] = (self.regs[even] & 0x0000_0000_FFFF_FFFF) | ((val as u64) << 32);
        }
    }

    /// Reads a 64-bit doubleword from register `idx` under the given FR mode.
    #[inline]
    pub fn read_d(&self, idx: usize, fr: bool) -> u64 {
        if fr { self.regs[idx] } else { self.regs[idx & !1] }
    }

    /// Writes a 64-bit doubleword to register `idx` under the given FR mode.
    #[inline]
    pub fn write_d(&mut self, idx: usize, fr: bool, val: u64) {
        if fr {
            self.regs[idx] = val;
        } else {
            self.regs[idx & !1] = val;
        }
    }

    /// Reads register `idx` as a single-precision float.
    #[inline]
    pub fn read_s(&self, idx: usize, fr: bool) -> f32 {
        f32::from_bits(self.read_w(idx, fr))
    }

    /// Writes register `idx` as a single-precision float.
    #[inline]
    pub fn write_s(&mut self, idx: usize, fr: bool, val: f32) {
        self.write_w(idx, fr, val.to_bits());
    }

    /// Reads register `idx` as a double-precision float.
    #[inline]
    pub fn read_f64(&self, idx: usize, fr: bool) -> f64 {
        f64::from_bits(self.read_d(idx, fr))
    }

    /// Writes register `idx` as a double-precision float.
    #[inline]
    pub fn write_f64(&mut self, idx: usize, fr: bool, val: f64) {
        self.write_d(idx, fr, val.to_bits());
    }

    /// The FCR31 condition bit, tested by BC1 branches.
    #[inline]
    pub fn condition(&self) -> bool {
        self.fcr31 & FCR31_C != 0
    }

    /// Sets or clears the FCR31 condition bit.
    #[inline]
    pub fn set_condition(&mut self, c: bool) {
        if c {
            self.fcr31 |= FCR31_C;
        } else {
            self.fcr31 &= !FCR31_C;
        }
    }
}

impl Default for Fpr {
    fn default() -> Self {
        Self::new()
    }
}
