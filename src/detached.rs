//! Stand-in for every peripheral, used when the board is run without hardware.
//!
//! Writes are accepted and dropped, reads return zero or `false`.  A [`Board`](crate::Board)
//! built on [`Detached`] behaves like a board with nothing plugged in, which lets the demo run on
//! any machine.
use core::convert::Infallible;

use embedded_hal::{digital, i2c, pwm, spi};

use crate::{Direction, LocalGpio};

#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

/// A board with no peripherals behind it.
pub type DetachedBoard = crate::Board<Detached, Detached, Detached>;

impl i2c::ErrorType for Detached {
    type Error = Infallible;
}

impl i2c::I2c for Detached {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            if let i2c::Operation::Read(buf) = op {
                buf.fill(0);
            }
        }
        Ok(())
    }
}

impl spi::ErrorType for Detached {
    type Error = Infallible;
}

impl spi::SpiBus for Detached {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> {
        read.fill(0);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl digital::ErrorType for Detached {
    type Error = Infallible;
}

impl LocalGpio for Detached {
    fn set_direction(&mut self, _pin: u8, _dir: Direction) -> Result<(), Self::Error> {
        Ok(())
    }

    fn write(&mut self, _pin: u8, _high: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read(&mut self, _pin: u8) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl pwm::ErrorType for Detached {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for Detached {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
        Ok(())
    }
}
