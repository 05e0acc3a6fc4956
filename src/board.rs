use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiBus;

use crate::common::check_buffered;
use crate::expander::{ExpanderBank, REGISTERS};
use crate::{BoardConfig, Direction, Error, ExtPin, LocalGpio};

/// Bank register holding the direction lines of the buffered I/O pins.
const BUFFER_DIRECTION: usize = 0;

/// The PiGo board: both expander chips, the SPI bus of the module sockets and the Pi's GPIO pins
/// behind the buffered I/O header.
///
/// Drivers borrow the board for each operation, nothing else holds on to the hardware.
pub struct Board<I2C, SPI, GPIO> {
    pub(crate) expander: ExpanderBank<I2C>,
    spi: SPI,
    gpio: GPIO,
    io_pins: [u8; 8],
}

impl<I2C, SPI, GPIO> Board<I2C, SPI, GPIO> {
    pub fn release(self) -> (I2C, SPI, GPIO) {
        (self.expander.release(), self.spi, self.gpio)
    }

    pub fn expander(&self) -> &ExpanderBank<I2C> {
        &self.expander
    }

    pub fn expander_mut(&mut self) -> &mut ExpanderBank<I2C> {
        &mut self.expander
    }
}

impl<I2C, SPI, GPIO> Board<I2C, SPI, GPIO>
where
    I2C: I2c,
    SPI: SpiBus,
    GPIO: LocalGpio,
{
    /// Set up the board and bring both expanders into a known state.
    pub fn new(i2c: I2C, spi: SPI, gpio: GPIO, config: &BoardConfig) -> Result<Self, Error> {
        let mut board = Self {
            expander: ExpanderBank::new(i2c, config.expander_addresses),
            spi,
            gpio,
            io_pins: config.revision.io_pins(),
        };
        board.flush()?;
        log::info!(
            "PiGo board ready, expanders at {:#04x} and {:#04x}",
            config.expander_addresses[0],
            config.expander_addresses[1]
        );
        Ok(board)
    }

    /// BCM pin number behind buffered pin `io`.
    pub fn io_pin(&self, io: u8) -> Result<u8, Error> {
        Ok(self.io_pins[check_buffered(io)? as usize])
    }

    /// Write the dirty expander registers, directions first.
    pub fn flush(&mut self) -> Result<usize, Error> {
        self.expander.flush().map_err(Error::i2c)
    }

    pub(crate) fn flush_states(&mut self) -> Result<usize, Error> {
        self.expander.flush_states().map_err(Error::i2c)
    }

    pub fn spi_transfer(&mut self, frame: &mut [u8]) -> Result<(), Error> {
        crate::bus::transfer(&mut self.spi, frame).map_err(Error::spi)
    }

    pub fn set_ext_direction(&mut self, pin: ExtPin, dir: Direction) -> Result<(), Error> {
        self.expander.set_direction(pin, dir);
        self.expander.flush_directions().map_err(Error::i2c)?;
        Ok(())
    }

    pub fn ext_direction(&self, pin: ExtPin) -> Direction {
        self.expander.direction(pin)
    }

    /// Latch `high` on extended pin `pin`.
    ///
    /// The level is only driven once the pin is an output.
    pub fn set_ext_level(&mut self, pin: ExtPin, high: bool) -> Result<(), Error> {
        self.expander.set_state(pin, high);
        self.flush_states()?;
        Ok(())
    }

    /// Level of extended pin `pin`: read from the chip for inputs, the latched value for outputs.
    pub fn ext_level(&mut self, pin: ExtPin) -> Result<bool, Error> {
        match self.expander.direction(pin) {
            Direction::Input => {
                self.expander.refresh_inputs().map_err(Error::i2c)?;
                Ok(self.expander.input(pin))
            }
            Direction::Output => Ok(self.expander.state(pin)),
        }
    }

    /// Read both expanders.  Bit `n` of the result is set if extended input pin `n` changed
    /// since the previous refresh.
    pub fn refresh_inputs(&mut self) -> Result<u16, Error> {
        let changed: [u8; REGISTERS] = self.expander.refresh_inputs().map_err(Error::i2c)?;
        Ok(u16::from(changed[1]) | (u16::from(changed[3]) << 8))
    }

    /// Whether extended pin `pin` changed in any refresh since this was last asked.
    pub fn take_ext_change(&mut self, pin: ExtPin) -> bool {
        self.expander.take_pin_change(pin)
    }

    /// Switch the buffer in front of buffered pin `io`, without touching the Pi's own pin.
    ///
    /// Used when a peripheral other than the GPIO controller drives the pin.
    pub fn set_buffer_direction(&mut self, io: u8, dir: Direction) -> Result<(), Error> {
        let mask = 1 << check_buffered(io)?;
        // The direction lines are always outputs, driven high for an input buffer.
        self.expander.update_direction(BUFFER_DIRECTION, 0, mask)?;
        match dir {
            Direction::Input => self.expander.update_state(BUFFER_DIRECTION, mask, 0)?,
            Direction::Output => self.expander.update_state(BUFFER_DIRECTION, 0, mask)?,
        }
        self.flush()?;
        Ok(())
    }

    /// Switch buffered pin `io` to `dir`: the buffer direction line first, then the Pi's pin.
    pub fn set_io_direction(&mut self, io: u8, dir: Direction) -> Result<(), Error> {
        self.set_buffer_direction(io, dir)?;
        let pin = self.io_pin(io)?;
        self.gpio.set_direction(pin, dir).map_err(Error::gpio)
    }

    pub fn io_direction(&self, io: u8) -> Result<Direction, Error> {
        let mask = 1 << check_buffered(io)?;
        let state = self.expander.state_register(BUFFER_DIRECTION)?.shadow();
        Ok(Direction::from_input_bit(state & mask != 0))
    }

    pub fn set_io(&mut self, io: u8, high: bool) -> Result<(), Error> {
        let pin = self.io_pin(io)?;
        self.gpio.write(pin, high).map_err(Error::gpio)
    }

    pub fn get_io(&mut self, io: u8) -> Result<bool, Error> {
        let pin = self.io_pin(io)?;
        self.gpio.read(pin).map_err(Error::gpio)
    }
}
