//! Video interface registers.
//!
//! The VI scans the framebuffer out of DRAM; the emulator only models the
//! register file and the beam position. `VI_CURRENT` is derived from the
//! cycle counter; the vertical interrupt fires when the scan line crosses
//! the programmed `VI_INTR` line, and writing `VI_CURRENT` acknowledges it.

use crate::common::constants::{VI_CYCLES_PER_LINE, VI_LINES_PER_FRAME};
use crate::soc::devices::mi;
use crate::state::Machine;

const VI_CONTROL_REG: u64 = 0x00;
const VI_ORIGIN_REG: u64 = 0x04;
const VI_WIDTH_REG: u64 = 0x08;
const VI_INTR_REG: u64 = 0x0C;
const VI_CURRENT_REG: u64 = 0x10;
const VI_BURST_REG: u64 = 0x14;
const VI_V_SYNC_REG: u64 = 0x18;
const VI_H_SYNC_REG: u64 = 0x1C;
const VI_LEAP_REG: u64 = 0x20;
const VI_H_START_REG: u64 = 0x24;
const VI_V_START_REG: u64 = 0x28;
const VI_V_BURST_REG: u64 = 0x2C;
const VI_X_SCALE_REG: u64 = 0x30;
const VI_Y_SCALE_REG: u64 = 0x34;

/// The scan line the beam is on at the given cycle count.
pub fn current_line(cycles: u64) -> u32 {
    ((cycles / VI_CYCLES_PER_LINE) % VI_LINES_PER_FRAME as u64) as u32
}

/// Advances the beam model by one line; raises the VI interrupt when the
/// programmed line is reached. Called from the simulator's line event.
pub fn line_tick(m: &mut Machine) {
    let line = current_line(m.cycles);
    m.hwreg.vi_current = line << 1;
    if line == (m.hwreg.vi_intr >> 1) {
        mi::raise(m, mi::MI_INTR_VI);
    }
}

/// Reads a VI register.
pub fn read(m: &mut Machine, offset: u64) -> Option<u32> {
    match offset {
        VI_CONTROL_REG => Some(m.hwreg.vi_control),
        VI_ORIGIN_REG => Some(m.hwreg.vi_origin),
        VI_WIDTH_REG => Some(m.hwreg.vi_width),
        VI_INTR_REG => Some(m.hwreg.vi_intr),
        VI_CURRENT_REG => Some(current_line(m.cycles) << 1),
        VI_BURST_REG => Some(m.hwreg.vi_burst),
        VI_V_SYNC_REG => Some(m.hwreg.vi_v_sync),
        VI_H_SYNC_REG => Some(m.hwreg.vi_h_sync),
        VI_LEAP_REG => Some(m.hwreg.vi_leap),
        VI_H_START_REG => Some(m.hwreg.vi_h_start),
        VI_V_START_REG => Some(m.hwreg.vi_v_start),
        VI_V_BURST_REG => Some(m.hwreg.vi_v_burst),
        VI_X_SCALE_REG => Some(m.hwreg.vi_x_scale),
        VI_Y_SCALE_REG => Some(m.hwreg.vi_y_scale),
        _ => None,
    }
}

/// Writes a VI register.
pub fn write(m: &mut Machine, offset: u64, val: u32) -> bool {
    match offset {
        VI_CONTROL_REG => m.hwreg.vi_control = val,
        VI_ORIGIN_REG => m.hwreg.vi_origin = val & 0x00FF_FFFF,
        VI_WIDTH_REG => m.hwreg.vi_width = val & 0xFFF,
        VI_INTR_REG => m.hwreg.vi_intr = val & 0x3FF,
        VI_CURRENT_REG => {
            // Writing CURRENT acknowledges the vertical interrupt.
            mi::lower(m, mi::MI_INTR_VI);
        }
        VI_BURST_REG => m.hwreg.vi_burst = val,
        VI_V_SYNC_REG => m.hwreg.vi_v_sync = val & 0x3FF,
        VI_H_SYNC_REG => m.hwreg.vi_h_sync = val,
        VI_LEAP_REG => m.hwreg.vi_leap = val,
        VI_H_START_REG => m.hwreg.vi_h_start = val,
        VI_V_START_REG => m.hwreg.vi_v_start = val,
        VI_V_BURST_REG => m.hwreg.vi_v_burst = val,
        VI_X_SCALE_REG => m.hwreg.vi_x_scale = val,
        VI_Y_SCALE_REG => m.hwreg.vi_y_scale = val,
        _ => return false,
    }
    true
}
