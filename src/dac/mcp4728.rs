//! # MCP4728 Driver
//!
//! Quad 12-bit I2C DAC used by the receiver board.
//!
//! ## Multi-Write Frame
//!
//! Each channel update is a 3-byte write:
//!
//! | Byte | Bits | Content |
//! |------|------|---------|
//! | 0 | `0100 0 C1 C0 U` | Multi-write command, channel select, UDAC |
//! | 1 | `V P1 P0 G D11-D8` | VREF, power-down, gain, value high nibble |
//! | 2 | `D7-D0` | Value low byte |
//!
//! The driver always selects the VDD reference, gain 1x, normal power and
//! UDAC = 0, so outputs update as soon as each frame is acknowledged.

use embedded_hal::i2c::I2c;
use tracing::{debug, info, warn};

use super::{Channel, DacSink};
use crate::error::{RelayError, Result};

/// Factory-default address of the board's MCP4728.
pub const MCP4728_DEFAULT_ADDRESS: u8 = 0x64;

/// Valid 7-bit address range (A2-A0 programmable).
pub const MCP4728_ADDRESS_RANGE: std::ops::RangeInclusive<u8> = 0x60..=0x67;

/// Multi-write command code.
const CMD_MULTI_WRITE: u8 = 0x40;

/// Output values are 12 bits wide.
const VALUE_MASK: u16 = 0x0FFF;

/// Build the 3-byte multi-write frame for one channel.
///
/// Only the low 12 bits of `value` reach the device.
#[must_use]
pub fn encode_multi_write(channel: Channel, value: u16) -> [u8; 3] {
    let value = value & VALUE_MASK;
    [
        CMD_MULTI_WRITE | (channel.index() << 1),
        (value >> 8) as u8,
        (value & 0xFF) as u8,
    ]
}

/// MCP4728 attached to an I2C bus.
pub struct Mcp4728<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> std::fmt::Debug for Mcp4728<I2C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mcp4728")
            .field("address", &format_args!("0x{:02X}", self.address))
            .finish_non_exhaustive()
    }
}

impl<I2C: I2c> Mcp4728<I2C> {
    /// Take ownership of the bus and probe the device.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Dac`] if the device does not answer a read at
    /// `address`.
    pub fn open(mut i2c: I2C, address: u8) -> Result<Self> {
        let mut status = [0u8; 3];
        i2c.read(address, &mut status).map_err(|e| {
            RelayError::Dac(format!("No MCP4728 at 0x{:02X}: {:?}", address, e))
        })?;

        info!("MCP4728 found at 0x{:02X}", address);
        Ok(Self { i2c, address })
    }

    /// Write one channel, reporting bus errors.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Dac`] if the I2C write fails.
    pub fn write_channel(&mut self, channel: Channel, value: u16) -> Result<()> {
        let frame = encode_multi_write(channel, value);
        self.i2c.write(self.address, &frame).map_err(|e| {
            RelayError::Dac(format!("Failed to write channel {}: {:?}", channel, e))
        })?;

        debug!("MCP4728 channel {} = {}", channel, value);
        Ok(())
    }

    /// I2C address in use.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c + Send> DacSink for Mcp4728<I2C> {
    fn set_channel(&mut self, channel: Channel, value: u16) {
        if let Err(e) = self.write_channel(channel, value) {
            warn!("{}", e);
        }
    }
}
