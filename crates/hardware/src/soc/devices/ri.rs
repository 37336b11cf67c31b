//! RAM interface registers.
//!
//! The boot flow calibrates RDRAM through these registers and spins until
//! `RI_SELECT` reads back non-zero. Full RDRAM timing is not modelled; the
//! register file stores what the guest writes and answers the polls the
//! boot code performs.

use crate::state::Machine;

const RI_MODE_REG: u64 = 0x00;
const RI_CONFIG_REG: u64 = 0x04;
const RI_CURRENT_LOAD_REG: u64 = 0x08;
const RI_SELECT_REG: u64 = 0x0C;
const RI_REFRESH_REG: u64 = 0x10;
const RI_LATENCY_REG: u64 = 0x14;
const RI_RERROR_REG: u64 = 0x18;
const RI_WERROR_REG: u64 = 0x1C;

/// Reads an RI register. The bank repeats across its 1 MiB window.
pub fn read(m: &mut Machine, offset: u64) -> Option<u32> {
    match offset & 0x1F {
        RI_MODE_REG => Some(m.hwreg.ri_mode),
        RI_CONFIG_REG => Some(m.hwreg.ri_config),
        RI_CURRENT_LOAD_REG => Some(m.hwreg.ri_current_load),
        RI_SELECT_REG => Some(m.hwreg.ri_select),
        RI_REFRESH_REG => Some(m.hwreg.ri_refresh),
        RI_LATENCY_REG => Some(m.hwreg.ri_latency),
        RI_RERROR_REG => Some(m.hwreg.ri_rerror),
        RI_WERROR_REG => Some(m.hwreg.ri_werror),
        _ => Some(0),
    }
}

/// Writes an RI register.
pub fn write(m: &mut Machine, offset: u64, val: u32) -> bool {
    match offset & 0x1F {
        RI_MODE_REG => m.hwreg.ri_mode = val & 0xF,
        RI_CONFIG_REG => m.hwreg.ri_config = val & 0x7F,
        RI_CURRENT_LOAD_REG => m.hwreg.ri_current_load = val,
        RI_SELECT_REG => m.hwreg.ri_select = val & 0xFF,
        RI_REFRESH_REG => m.hwreg.ri_refresh = val & 0x7FFFF,
        RI_LATENCY_REG => m.hwreg.ri_latency = val & 0xF,
        RI_RERROR_REG | RI_WERROR_REG => {
            // Error registers clear on write.
            m.hwreg.ri_rerror = 0;
            m.hwreg.ri_werror = 0;
        }
        _ => {}
    }
    true
}
