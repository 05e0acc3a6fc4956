//! Support for the analog module: an `MCP3002` ADC and an `MCP4812` DAC sharing the SPI bus.
//!
//! Both chips have two 10-bit channels.  Their chip selects are the socket's two extended pins:
//! the even one selects the ADC, the odd one the DAC.
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiBus;

use crate::{Board, Direction, Error, ExtPin, LocalGpio, ModuleKind, ModulePins, Socket};

/// Full scale of both converters.
pub const MAX_VALUE: u16 = 0x3ff;
/// Reference voltage of the converters.
pub const VREF: f32 = 3.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogModule {
    socket: Socket,
    cs_ad: ExtPin,
    cs_da: ExtPin,
}

impl AnalogModule {
    /// Claim the chip selects of `socket` as outputs, idle high.
    pub fn new<I2C, SPI, GPIO>(
        board: &mut Board<I2C, SPI, GPIO>,
        socket: Socket,
    ) -> Result<Self, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        let (cs_ad, cs_da) = match socket.pins(ModuleKind::Analog) {
            ModulePins::ExtPair(ad, da) => (ad, da),
            ModulePins::Buffered { .. } => return Err(Error::InvalidSocket),
        };
        let expander = board.expander_mut();
        for cs in [cs_ad, cs_da] {
            expander.set_direction(cs, Direction::Output);
            expander.set_state(cs, true);
        }
        board.flush()?;
        log::info!("analog module in socket {}", socket);

        Ok(Self {
            socket,
            cs_ad,
            cs_da,
        })
    }

    pub fn socket(&self) -> Socket {
        self.socket
    }

    /// Sample ADC channel `ch` (0 or 1).
    pub fn read_channel<I2C, SPI, GPIO>(
        &self,
        board: &mut Board<I2C, SPI, GPIO>,
        ch: u8,
    ) -> Result<u16, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        check_channel(ch)?;
        // start bit, single-ended, channel, MSB first
        let mut frame = [0x40 | 0x20 | (ch << 4) | 0x08, 0x00];
        self.transfer(board, self.cs_ad, &mut frame)?;
        Ok(((u16::from(frame[0]) << 8) | u16::from(frame[1])) & MAX_VALUE)
    }

    /// Set DAC channel `ch` (0 or 1).  Only the low 10 bits of `value` are used.
    pub fn write_channel<I2C, SPI, GPIO>(
        &self,
        board: &mut Board<I2C, SPI, GPIO>,
        ch: u8,
        value: u16,
    ) -> Result<(), Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        check_channel(ch)?;
        let value = value & MAX_VALUE;
        // channel, 1x gain, output enabled
        let mut frame = [
            (ch << 7) | 0x20 | 0x10 | ((value >> 6) as u8 & 0x0f),
            (value << 2) as u8,
        ];
        self.transfer(board, self.cs_da, &mut frame)
    }

    fn transfer<I2C, SPI, GPIO>(
        &self,
        board: &mut Board<I2C, SPI, GPIO>,
        cs: ExtPin,
        frame: &mut [u8],
    ) -> Result<(), Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        if let Err(e) = board.set_ext_level(cs, false) {
            // The select never reached the chip; keep it idle in the cache so that no later flush
            // pulls it low behind another module's transfer.
            board.expander_mut().set_state(cs, true);
            return Err(e);
        }
        let res = board.spi_transfer(frame);
        // Deselect even after a failed transfer.
        let deselect = board.set_ext_level(cs, true);
        res.and(deselect)
    }
}

/// Convert converter counts to volts.
pub fn to_volts(value: u16) -> f32 {
    f32::from(value) * VREF / 1024.0
}

fn check_channel(ch: u8) -> Result<(), Error> {
    if ch < 2 {
        Ok(())
    } else {
        Err(Error::InvalidChannel(ch))
    }
}
