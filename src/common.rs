use crate::Error;

/// Direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub(crate) fn from_input_bit(is_input: bool) -> Self {
        if is_input {
            Direction::Input
        } else {
            Direction::Output
        }
    }

    /// The other direction.
    pub fn flipped(self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

/// Number of extended I/O pins on the two expander chips.
pub const EXT_PINS: u8 = 16;
/// Number of buffered I/O pins on the Pi header.
pub const BUFFERED_PINS: u8 = 8;

/// One of the 16 extended I/O pins, backed by the port-expanders.
///
/// Pins 0-7 live on port B of the first chip, pins 8-15 on port B of the second chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtPin(u8);

impl ExtPin {
    pub fn new(n: u8) -> Result<Self, Error> {
        if n < EXT_PINS {
            Ok(Self(n))
        } else {
            Err(Error::InvalidPin(n))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Index of the bank register holding this pin.
    pub fn register(self) -> usize {
        1 + 2 * (self.0 as usize / 8)
    }

    pub fn mask(self) -> u8 {
        1 << (self.0 % 8)
    }

    pub(crate) fn from_raw(n: u8) -> Self {
        debug_assert!(n < EXT_PINS);
        Self(n)
    }

    pub(crate) fn next(self) -> Self {
        debug_assert!(self.0 + 1 < EXT_PINS);
        Self(self.0 + 1)
    }
}

pub(crate) fn check_buffered(io: u8) -> Result<u8, Error> {
    if io < BUFFERED_PINS {
        Ok(io)
    } else {
        Err(Error::InvalidPin(io))
    }
}
