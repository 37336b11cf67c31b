//! PIF boot and joybus handshake.
//!
//! The PIF processes a command byte in the last cell of its 64-byte RAM.
//! Two paths matter to the core: the boot handshake bits the IPL exchanges
//! before jumping into the cartridge, and the joybus transaction buffer the
//! SI DMAs in and out. Controllers are outer-runtime surface; every joybus
//! channel answers "device absent".

use crate::common::constants::PIF_RAM_SIZE;
use crate::state::Machine;

/// Command byte offset within PIF RAM.
const COMMAND_OFFSET: usize = PIF_RAM_SIZE - 1;

/// Command bit: run the joybus transaction on the next read.
const CMD_JOYBUS: u8 = 0x01;
/// Command bit: checksum challenge (CIC region lock).
const CMD_CHECKSUM: u8 = 0x20;
/// Command bit: clear PIF RAM.
const CMD_CLEAR: u8 = 0x40;
/// Command bit: terminate the boot sequence (lock out the boot ROM).
const CMD_TERMINATE_BOOT: u8 = 0x08;
/// Joybus rx-byte error flag: device absent.
const JOYBUS_ERR_NO_DEVICE: u8 = 0x80;

impl Machine {
    /// Reacts to a CPU or SI write into PIF RAM (command byte side effects).
    pub(crate) fn pif_command_write(&mut self) {
        let cmd = self.pif_ram[COMMAND_OFFSET];

        if cmd & CMD_CHECKSUM != 0 {
            // The lockout chip accepts the challenge; the IPL polls for the
            // acknowledge bit.
            self.pif_ram[COMMAND_OFFSET] = (cmd & !CMD_CHECKSUM) | 0x80;
        }
        if cmd & CMD_CLEAR != 0 {
            self.pif_ram = [0; PIF_RAM_SIZE];
        }
        if cmd & CMD_TERMINATE_BOOT != 0 {
            self.pif_ram[COMMAND_OFFSET] &= !CMD_TERMINATE_BOOT;
            tracing::debug!("PIF boot sequence terminated");
        }
    }

    /// Prepares PIF RAM for an SI read DMA: runs the pending joybus
    /// transaction if one is armed.
    pub(crate) fn pif_command_read(&mut self) {
        if self.pif_ram[COMMAND_OFFSET] & CMD_JOYBUS == 0 {
            return;
        }

        // Walk the transaction buffer: each block is <tx len> <rx len>
        // followed by tx then rx bytes. 0x00 skips a channel, 0xFD ends a
        // channel, 0xFE ends the buffer, 0xFF pads.
        let mut i = 0usize;
        while i < COMMAND_OFFSET {
            let tx = self.pif_ram[i];
            match tx {
                0x00 => {
                    i += 1;
                    continue;
                }
                0xFD | 0xFF => {
                    i += 1;
                    continue;
                }
                0xFE => break,
                _ => {}
            }
            let tx = (tx & 0x3F) as usize;
            if i + 1 >= COMMAND_OFFSET {
                break;
            }
            let rx_index = i + 1;
            let rx = (self.pif_ram[rx_index] & 0x3F) as usize;

            // No controllers or paks are attached: flag the receive length
            // with the absent-device error and leave the rx bytes alone.
            self.pif_ram[rx_index] |= JOYBUS_ERR_NO_DEVICE;
            i = rx_index + 1 + tx + rx;
        }
    }
}
