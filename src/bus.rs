//! Blocking access to the peripherals the board sits on.
//!
//! I2C and SPI go through the `embedded-hal` traits.  The Pi's own GPIO pins need their direction
//! switched at runtime, which `embedded-hal` does not model, so they go through [`LocalGpio`].
use embedded_hal::digital;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiBus;

use crate::Direction;

/// The Pi's GPIO controller, addressed by BCM pin number.
pub trait LocalGpio: digital::ErrorType {
    /// Switch `pin` to `dir`.  Inputs are pulled up.
    fn set_direction(&mut self, pin: u8, dir: Direction) -> Result<(), Self::Error>;

    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error>;

    fn read(&mut self, pin: u8) -> Result<bool, Self::Error>;
}

impl<T: LocalGpio + ?Sized> LocalGpio for &mut T {
    fn set_direction(&mut self, pin: u8, dir: Direction) -> Result<(), Self::Error> {
        T::set_direction(self, pin, dir)
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error> {
        T::write(self, pin, high)
    }

    fn read(&mut self, pin: u8) -> Result<bool, Self::Error> {
        T::read(self, pin)
    }
}

pub(crate) trait I2cExt {
    type Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error>;
    fn read_regs<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

impl<I2C: I2c> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[reg.into(), value])
    }

    fn read_regs<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_read(addr, &[reg.into()], buf)
    }
}

/// Full-duplex transfer: `frame` is sent and overwritten with the bytes clocked in.
pub fn transfer<SPI: SpiBus>(spi: &mut SPI, frame: &mut [u8]) -> Result<(), SPI::Error> {
    spi.transfer_in_place(frame)?;
    spi.flush()
}

/// Probe every 7-bit address with a one-byte write.
///
/// Bit `n` of the result is set if a device acknowledged at address `n`.  The reserved addresses
/// `0x00-0x07` and `0x78-0x7f` are skipped.
pub fn scan<I2C: I2c>(i2c: &mut I2C) -> u128 {
    let mut found = 0u128;
    for addr in 0x08..0x78u8 {
        if i2c.write(addr, &[0x00]).is_ok() {
            log::debug!("device at {:#04x}", addr);
            found |= 1 << addr;
        }
    }
    found
}
