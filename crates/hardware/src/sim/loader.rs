//! ROM loading and the boot stub.
//!
//! The cartridge image is a raw big-endian byte dump. Boot mirrors the
//! on-hardware PIF handshake: the first 4 KiB of the cartridge (the boot
//! header and IPL3) are copied into the SP data SRAM, the power-on GPR and
//! COP0 values the IPL expects are installed, and execution starts at the
//! IPL3 entry inside DMEM.

use std::path::Path;

use crate::common::EmuError;
use crate::common::constants::{BOOT_PC, CART_ROM_SIZE_MAX, SP_MEM_SIZE};
use crate::state::Machine;

impl Machine {
    /// Loads a cartridge image from a byte buffer.
    ///
    /// # Errors
    ///
    /// Fails when the image is shorter than the boot block or oversized.
    pub fn load_rom_bytes(&mut self, bytes: Vec<u8>) -> Result<(), EmuError> {
        if bytes.len() < SP_MEM_SIZE {
            return Err(EmuError::BadInvariant(
                "cartridge image shorter than the boot block".into(),
            ));
        }
        if bytes.len() > CART_ROM_SIZE_MAX {
            return Err(EmuError::BadInvariant("cartridge image too large".into()));
        }
        self.rom = bytes;
        Ok(())
    }

    /// Loads a cartridge image from disk.
    pub fn load_rom(&mut self, path: &Path) -> Result<(), EmuError> {
        let bytes = std::fs::read(path)?;
        self.load_rom_bytes(bytes)
    }

    /// Runs the boot stub: the state the PIF leaves behind before jumping
    /// into the cartridge's IPL3.
    pub fn boot(&mut self) {
        // The boot block is staged in DMEM, not fetched over the
        // cartridge bus.
        self.dmem.copy_from_slice(&self.rom[..SP_MEM_SIZE]);

        // Power-on register values the IPL3 checks (CIC-6102 flavour).
        self.cpu.gpr.write(11, BOOT_PC);
        self.cpu.gpr.write(20, 0x1);
        self.cpu.gpr.write(22, 0x3F);
        self.cpu.gpr.write(29, 0xFFFF_FFFF_A400_1FF0);

        // CU1/CU0 usable, FR clear, boot-time vectors.
        self.cpu.cp0.sr = 0x3400_0000;
        self.cpu.cp0.random = 31;
        self.cpu.cp0.count = 0;

        self.cpu.pc = BOOT_PC;

        tracing::info!(
            entry = format_args!("{:#x}", self.cpu.pc),
            rom_len = self.rom.len(),
            "boot stub complete"
        );
    }
}
