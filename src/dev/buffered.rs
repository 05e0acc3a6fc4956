//! The eight buffered I/O pins as one module.
//!
//! Direction and level changes are only recorded; [`BufferedIo::poll()`] pushes them to the board
//! and samples the inputs, so a polling worker owns all of the bus traffic.
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiBus;

use crate::common::{check_buffered, BUFFERED_PINS};
use crate::{Board, Direction, Error, LocalGpio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedIo {
    /// Bit set for every pin that is an output.
    outputs: u8,
    /// Commanded level of outputs, last read level of inputs.
    levels: u8,
    pending_direction: u8,
    pending_level: u8,
    /// Inputs that have been read at least once since they became inputs.
    sampled: u8,
}

impl Default for BufferedIo {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedIo {
    /// All pins inputs.  The directions reach the board with the first poll.
    pub fn new() -> Self {
        Self {
            outputs: 0x00,
            levels: 0x00,
            pending_direction: 0xff,
            pending_level: 0x00,
            sampled: 0x00,
        }
    }

    pub fn direction(&self, io: u8) -> Result<Direction, Error> {
        let mask = 1 << check_buffered(io)?;
        Ok(Direction::from_input_bit(self.outputs & mask == 0))
    }

    /// Cached level of `io`.
    pub fn level(&self, io: u8) -> Result<bool, Error> {
        let mask = 1 << check_buffered(io)?;
        Ok(self.levels & mask != 0)
    }

    /// Bit `n` set for every output pin.
    pub fn outputs(&self) -> u8 {
        self.outputs
    }

    /// Bit `n` set for every pin that is high.
    pub fn levels(&self) -> u8 {
        self.levels
    }

    /// A pin that becomes an output starts low.
    pub fn set_direction(&mut self, io: u8, dir: Direction) -> Result<(), Error> {
        let mask = 1 << check_buffered(io)?;
        let was = self.outputs;
        match dir {
            Direction::Output => self.outputs |= mask,
            Direction::Input => self.outputs &= !mask,
        }
        if was != self.outputs {
            self.pending_direction |= mask;
            self.sampled &= !mask;
            if dir == Direction::Output {
                self.levels &= !mask;
            }
        }
        Ok(())
    }

    pub fn toggle_direction(&mut self, io: u8) -> Result<Direction, Error> {
        let dir = self.direction(io)?.flipped();
        self.set_direction(io, dir)?;
        Ok(dir)
    }

    /// Set the level of output `io`.
    pub fn set_level(&mut self, io: u8, high: bool) -> Result<(), Error> {
        let mask = 1 << check_buffered(io)?;
        if self.outputs & mask == 0 {
            return Err(Error::NotAnOutput(io));
        }
        if (self.levels & mask != 0) != high {
            self.levels ^= mask;
            self.pending_level |= mask;
        }
        Ok(())
    }

    pub fn toggle_level(&mut self, io: u8) -> Result<bool, Error> {
        let high = !self.level(io)?;
        self.set_level(io, high)?;
        Ok(high)
    }

    /// Push pending changes to the board, then read every input.
    ///
    /// Returns a mask of the inputs whose level changed since the previous poll.  A pin that just
    /// became an input only reports changes from its second sample on.
    pub fn poll<I2C, SPI, GPIO>(&mut self, board: &mut Board<I2C, SPI, GPIO>) -> Result<u8, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        for io in 0..BUFFERED_PINS {
            let mask = 1 << io;
            let is_output = self.outputs & mask != 0;

            if self.pending_direction & mask != 0 {
                let dir = Direction::from_input_bit(!is_output);
                board.set_io_direction(io, dir)?;
                self.pending_direction &= !mask;
                if is_output {
                    self.pending_level |= mask;
                }
            }

            if is_output && self.pending_level & mask != 0 {
                board.set_io(io, self.levels & mask != 0)?;
            }
            self.pending_level &= !mask;
        }

        let mut changed = 0x00;
        for io in 0..BUFFERED_PINS {
            let mask = 1 << io;
            if self.outputs & mask != 0 {
                continue;
            }
            let high = board.get_io(io)?;
            if (self.levels & mask != 0) != high {
                self.levels ^= mask;
                if self.sampled & mask != 0 {
                    changed |= mask;
                }
            }
            self.sampled |= mask;
        }

        if changed != 0 {
            log::debug!("buffered inputs changed: {:#010b}", changed);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{GpioOp, RecordingGpio, Sim, SimI2c, SimSpi};
    use crate::BoardConfig;

    fn board(gpio: &RecordingGpio) -> (Sim, Board<SimI2c, SimSpi, RecordingGpio>) {
        let config = BoardConfig::default();
        let sim = Sim::new(config.expander_addresses, false);
        let board = Board::new(sim.i2c(), sim.spi(), gpio.clone(), &config).unwrap();
        (sim, board)
    }

    #[test]
    fn starts_as_inputs() {
        let gpio = RecordingGpio::default();
        let (sim, mut board) = board(&gpio);
        let mut io = BufferedIo::new();

        gpio.drive(25, true);
        // the first sample is not a change
        assert_eq!(io.poll(&mut board).unwrap(), 0x00);
        assert!(io.level(3).unwrap());
        assert_eq!(io.direction(3), Ok(Direction::Input));
        // every buffer line driven high for input
        assert_eq!(sim.reg(0, 0x00), 0x00);
        assert_eq!(sim.reg(0, 0x14), 0xff);
        assert_eq!(
            gpio.ops(),
            [18, 23, 24, 25, 4, 17, 27, 22]
                .iter()
                .map(|pin| GpioOp::Direction(*pin, Direction::Input))
                .collect::<Vec<_>>()
        );

        gpio.clear();
        assert_eq!(io.poll(&mut board).unwrap(), 0x00);
        assert!(gpio.ops().is_empty());

        gpio.drive(25, false);
        gpio.drive(18, true);
        assert_eq!(io.poll(&mut board).unwrap(), 0x09);
        assert_eq!(io.levels(), 0x01);
    }

    #[test]
    fn outputs_are_pushed_on_poll() {
        let gpio = RecordingGpio::default();
        let (sim, mut board) = board(&gpio);
        let mut io = BufferedIo::new();
        io.poll(&mut board).unwrap();
        gpio.clear();

        assert_eq!(io.set_level(2, true), Err(Error::NotAnOutput(2)));
        assert_eq!(io.toggle_direction(2), Ok(Direction::Output));
        assert_eq!(io.toggle_level(2), Ok(true));
        io.set_level(2, true).unwrap();
        assert!(gpio.ops().is_empty());

        io.poll(&mut board).unwrap();
        assert_eq!(
            gpio.ops(),
            vec![
                GpioOp::Direction(24, Direction::Output),
                GpioOp::Write(24, true),
            ]
        );
        assert_eq!(sim.reg(0, 0x14), 0xfb);

        // outputs are not sampled
        gpio.clear();
        gpio.drive(24, false);
        assert_eq!(io.poll(&mut board).unwrap(), 0x00);
        assert!(io.level(2).unwrap());
        assert!(gpio.ops().is_empty());

        // back to input: the next sample sets the baseline
        io.set_direction(2, Direction::Input).unwrap();
        assert_eq!(io.poll(&mut board).unwrap(), 0x00);
        assert!(!io.level(2).unwrap());
        assert_eq!(gpio.ops(), vec![GpioOp::Direction(24, Direction::Input)]);

        assert_eq!(
            io.set_direction(8, Direction::Output),
            Err(Error::InvalidPin(8))
        );
    }

    #[test]
    fn new_output_starts_low() {
        let gpio = RecordingGpio::default();
        let (_sim, mut board) = board(&gpio);
        let mut io = BufferedIo::new();

        gpio.drive(24, true);
        io.poll(&mut board).unwrap();
        assert!(io.level(2).unwrap());
        gpio.clear();

        assert_eq!(io.toggle_direction(2), Ok(Direction::Output));
        assert!(!io.level(2).unwrap());
        io.poll(&mut board).unwrap();
        assert_eq!(
            gpio.ops(),
            vec![
                GpioOp::Direction(24, Direction::Output),
                GpioOp::Write(24, false),
            ]
        );
        assert_eq!(io.levels(), 0x00);
    }
}
