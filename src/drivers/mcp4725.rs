//! MCP4725 12-bit I2C DAC driver.
//!
//! Generic over any [`embedded_hal::i2c::I2c`] bus so the same driver runs
//! against the Pi's hardware bus and against a scripted mock in tests.
//!
//! Wire format (datasheet §6):
//!
//! - Fast-mode write, two bytes: `[0b0000_dddd, 0xdddddddd]` — power-down
//!   bits zero, 12 data bits right-aligned across the pair.
//! - Read, five bytes: status, DAC register high (D11–D4), DAC register low
//!   (D3–D0 in the top nibble), then the EEPROM pair, which this driver
//!   ignores.

use core::fmt;

use embedded_hal::i2c::I2c;

/// Factory-default bus address (A0 strapped low).
pub const DEFAULT_ADDRESS: u8 = 0x62;

/// Highest representable level: the DAC is 12-bit.
pub const MAX_LEVEL: u16 = 0x0FFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mcp4725Error<E> {
    /// The I2C transaction failed.
    Bus(E),
    /// Caller asked for a level beyond 12 bits.
    LevelOutOfRange(u16),
}

impl<E: fmt::Debug> fmt::Display for Mcp4725Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "I2C bus error: {e:?}"),
            Self::LevelOutOfRange(level) => write!(f, "level {level} exceeds 12-bit range"),
        }
    }
}

pub struct Mcp4725<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mcp4725<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Write a raw level to the DAC register (fast-mode command, not
    /// persisted to the chip's EEPROM).
    pub fn write_level(&mut self, level: u16) -> Result<(), Mcp4725Error<I2C::Error>> {
        if level > MAX_LEVEL {
            return Err(Mcp4725Error::LevelOutOfRange(level));
        }
        let bytes = [((level >> 8) & 0x0F) as u8, (level & 0xFF) as u8];
        self.i2c.write(self.address, &bytes).map_err(Mcp4725Error::Bus)
    }

    /// Read back the DAC register's current level.
    pub fn read_level(&mut self) -> Result<u16, Mcp4725Error<I2C::Error>> {
        let mut buf = [0u8; 5];
        self.i2c.read(self.address, &mut buf).map_err(Mcp4725Error::Bus)?;
        Ok((u16::from(buf[1]) << 4) | (u16::from(buf[2]) >> 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::i2c::{ErrorType, Operation, SevenBitAddress};

    /// Scripted I2C bus: records writes, replays canned read bytes.
    struct MockBus {
        writes: Vec<Vec<u8>>,
        read_response: [u8; 5],
    }

    impl MockBus {
        fn new(read_response: [u8; 5]) -> Self {
            Self {
                writes: Vec::new(),
                read_response,
            }
        }
    }

    impl ErrorType for MockBus {
        type Error = Infallible;
    }

    impl I2c for MockBus {
        fn transaction(
            &mut self,
            _address: SevenBitAddress,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                    Operation::Read(buf) => {
                        let n = buf.len().min(self.read_response.len());
                        buf[..n].copy_from_slice(&self.read_response[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn fast_mode_write_packs_twelve_bits() {
        let mut dac = Mcp4725::new(MockBus::new([0; 5]), DEFAULT_ADDRESS);
        dac.write_level(0x0ABC).unwrap();
        assert_eq!(dac.i2c.writes, vec![vec![0x0A, 0xBC]]);
    }

    #[test]
    fn zero_and_full_scale_roundtrip_the_packing() {
        let mut dac = Mcp4725::new(MockBus::new([0; 5]), DEFAULT_ADDRESS);
        dac.write_level(0).unwrap();
        dac.write_level(MAX_LEVEL).unwrap();
        assert_eq!(dac.i2c.writes, vec![vec![0x00, 0x00], vec![0x0F, 0xFF]]);
    }

    #[test]
    fn out_of_range_level_rejected_without_bus_traffic() {
        let mut dac = Mcp4725::new(MockBus::new([0; 5]), DEFAULT_ADDRESS);
        assert_eq!(
            dac.write_level(0x1000),
            Err(Mcp4725Error::LevelOutOfRange(0x1000))
        );
        assert!(dac.i2c.writes.is_empty());
    }

    #[test]
    fn read_unpacks_dac_register_bytes() {
        // Status byte, D11-D4 = 0xAB, D3-D0 = 0xC in the high nibble.
        let mut dac = Mcp4725::new(MockBus::new([0xC0, 0xAB, 0xC0, 0, 0]), DEFAULT_ADDRESS);
        assert_eq!(dac.read_level().unwrap(), 0x0ABC);
    }
}
