//! The board on a real Raspberry Pi, through `rppal`.
//!
//! I2C and SPI use `rppal`'s own `embedded-hal` implementations.  The SPI hardware chip select
//! toggles along with every transfer but nothing is wired to it, the modules are selected through
//! the expanders.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use embedded_hal::{digital, pwm};
use rppal::gpio::{self, Gpio, IoPin, Level, Mode, PullUpDown};
use rppal::i2c::{self, I2c};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{self, Bus, SlaveSelect, Spi};
use rppal::uart::{self, Parity, Queue, Uart};

use crate::{Board, BoardConfig, Direction, LocalGpio};

/// A [`Board`] on the Pi's peripherals.
pub type RpiBoard = Board<I2c, Spi, RpiGpio>;

/// Start-up failures.  Each cause maps to its own process exit status.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("cannot open the GPIO controller: {0}")]
    Gpio(#[from] gpio::Error),
    #[error("cannot open I2C bus {bus}: {source}")]
    I2c {
        bus: u8,
        #[source]
        source: i2c::Error,
    },
    #[error("cannot open SPI0: {0}")]
    Spi(#[from] spi::Error),
    #[error("cannot open PWM channel 0: {0}")]
    Pwm(#[from] rppal::pwm::Error),
    #[error("cannot open the serial port: {0}")]
    Uart(#[from] uart::Error),
    #[error("board start-up failed: {0}")]
    Board(#[from] crate::Error),
}

impl InitError {
    pub fn exit_code(&self) -> i32 {
        match self {
            InitError::Gpio(_) => 2,
            InitError::I2c { .. } => 3,
            InitError::Spi(_) => 4,
            InitError::Pwm(_) => 5,
            InitError::Board(_) => 6,
            InitError::Uart(_) => 7,
        }
    }
}

/// Open every bus the board needs and bring the expanders into their start-up state.
pub fn open(config: &BoardConfig) -> Result<RpiBoard, InitError> {
    let bus = config.revision.i2c_bus();
    let i2c = I2c::with_bus(bus).map_err(|source| InitError::I2c { bus, source })?;
    let spi = Spi::new(
        Bus::Spi0,
        SlaveSelect::Ss0,
        config.spi_clock_hz,
        spi::Mode::Mode0,
    )?;
    let gpio = RpiGpio::new()?;
    log::debug!(
        "opened i2c bus {} and spi0 at {} Hz",
        bus,
        config.spi_clock_hz
    );

    Ok(Board::new(i2c, spi, gpio, config)?)
}

/// Open hardware PWM channel 0, which drives buffered pin 0, disabled.
pub fn open_pwm(config: &BoardConfig) -> Result<RpiPwm, InitError> {
    let pwm = Pwm::with_frequency(
        Channel::Pwm0,
        config.pwm_frequency_hz,
        0.0,
        Polarity::Normal,
        true,
    )?;
    Ok(RpiPwm { pwm })
}

/// Error of a GPIO or PWM access after start-up.
#[derive(Debug, thiserror::Error)]
pub enum PeripheralError {
    #[error(transparent)]
    Gpio(#[from] gpio::Error),
    #[error(transparent)]
    Pwm(#[from] rppal::pwm::Error),
}

impl digital::Error for PeripheralError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl pwm::Error for PeripheralError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

/// The Pi's GPIO controller.  Pins are claimed on first use and kept until drop.
pub struct RpiGpio {
    gpio: Gpio,
    pins: HashMap<u8, IoPin>,
}

impl RpiGpio {
    pub fn new() -> Result<Self, gpio::Error> {
        Ok(Self {
            gpio: Gpio::new()?,
            pins: HashMap::new(),
        })
    }

    fn pin(&mut self, pin: u8, mode: Mode) -> Result<&mut IoPin, PeripheralError> {
        match self.pins.entry(pin) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let io = self.gpio.get(pin)?.into_io(mode);
                Ok(e.insert(io))
            }
        }
    }
}

impl digital::ErrorType for RpiGpio {
    type Error = PeripheralError;
}

impl LocalGpio for RpiGpio {
    fn set_direction(&mut self, pin: u8, dir: Direction) -> Result<(), Self::Error> {
        let (mode, pull) = match dir {
            Direction::Input => (Mode::Input, PullUpDown::PullUp),
            Direction::Output => (Mode::Output, PullUpDown::Off),
        };
        let io = self.pin(pin, mode)?;
        io.set_mode(mode);
        io.set_pullupdown(pull);
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error> {
        let level = if high { Level::High } else { Level::Low };
        self.pin(pin, Mode::Output)?.write(level);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, Self::Error> {
        Ok(self.pin(pin, Mode::Input)?.read() == Level::High)
    }
}

/// Hardware PWM channel 0.
pub struct RpiPwm {
    pwm: Pwm,
}

impl pwm::ErrorType for RpiPwm {
    type Error = PeripheralError;
}

impl pwm::SetDutyCycle for RpiPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.pwm
            .set_duty_cycle(f64::from(duty) / f64::from(u16::MAX))?;
        Ok(())
    }
}

/// Settings of the serial port on the GPIO header.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    pub path: PathBuf,
    pub baud_rate: u32,
    pub parity: Parity,
    pub data_bits: u8,
    pub stop_bits: u8,
    /// How long a read waits for the first byte.  Whole tenths of a second, at most 25.5 s.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyAMA0"),
            baud_rate: 9600,
            parity: Parity::None,
            data_bits: 8,
            stop_bits: 1,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// The Pi's UART.  Closed on drop.
pub struct SerialPort {
    uart: Uart,
}

impl SerialPort {
    /// Open the port and discard whatever is still queued in either direction.
    pub fn open(config: &SerialConfig) -> Result<Self, InitError> {
        let mut uart = Uart::with_path(
            &config.path,
            config.baud_rate,
            config.parity,
            config.data_bits,
            config.stop_bits,
        )?;
        uart.set_read_mode(0, config.read_timeout)?;
        uart.set_write_mode(true)?;
        uart.flush(Queue::Both)?;
        log::debug!(
            "opened {} at {} baud",
            config.path.display(),
            config.baud_rate
        );
        Ok(Self { uart })
    }

    /// Send all of `data`, blocking until it is queued.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, uart::Error> {
        self.uart.write(data)
    }

    /// Whether received bytes are waiting to be read.
    pub fn has_input(&self) -> Result<bool, uart::Error> {
        Ok(self.uart.input_len()? > 0)
    }

    /// Read up to `buf.len()` bytes.  Returns early, possibly with nothing, once the read timeout
    /// passes.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, uart::Error> {
        self.uart.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> std::io::Error {
        std::io::Error::from(std::io::ErrorKind::PermissionDenied)
    }

    #[test]
    fn every_cause_has_its_own_exit_code() {
        let errors = [
            InitError::Gpio(gpio::Error::Io(io_error())),
            InitError::I2c {
                bus: 1,
                source: i2c::Error::Io(io_error()),
            },
            InitError::Spi(spi::Error::Io(io_error())),
            InitError::Pwm(rppal::pwm::Error::Io(io_error())),
            InitError::Board(crate::Error::InvalidSocket),
            InitError::Uart(uart::Error::Io(io_error())),
        ];
        let mut codes: Vec<i32> = errors.iter().map(InitError::exit_code).collect();
        assert!(codes.iter().all(|c| *c != 0 && *c != 1));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(errors[1].to_string().starts_with("cannot open I2C bus 1: "));
    }

    #[test]
    fn serial_defaults() {
        let config = SerialConfig::default();
        assert_eq!(config.path, PathBuf::from("/dev/ttyAMA0"));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.parity, Parity::None);
        assert_eq!((config.data_bits, config.stop_bits), (8, 1));
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }
}
