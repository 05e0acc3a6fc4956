use core::fmt;

use embedded_hal::{digital, i2c, pwm, spi};

/// Errors reported by the board and its device drivers.
///
/// Bus failures keep only the `embedded-hal` error kind of the failed transaction so that the
/// type stays independent of the backend; the backend's own error is logged before it is
/// converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An I2C transaction with one of the expanders failed.
    I2c(i2c::ErrorKind),
    /// An SPI transfer failed.
    Spi(spi::ErrorKind),
    /// A local GPIO operation failed.
    Gpio(digital::ErrorKind),
    /// Updating the PWM channel failed.
    Pwm(pwm::ErrorKind),
    /// Extended pins are numbered 0-15, buffered pins 0-7.
    InvalidPin(u8),
    /// Each expander bank has registers 0-3.
    InvalidRegister(usize),
    /// The analog module has channels 0 and 1.
    InvalidChannel(u8),
    /// Sockets are named `A` to `D`.
    InvalidSocket,
    /// A level was set on a pin that is configured as an input.
    NotAnOutput(u8),
}

impl Error {
    pub(crate) fn i2c<E: i2c::Error>(e: E) -> Self {
        log::warn!("i2c transfer failed: {:?}", e);
        Error::I2c(e.kind())
    }

    pub(crate) fn spi<E: spi::Error>(e: E) -> Self {
        log::warn!("spi transfer failed: {:?}", e);
        Error::Spi(e.kind())
    }

    pub(crate) fn gpio<E: digital::Error>(e: E) -> Self {
        log::warn!("gpio access failed: {:?}", e);
        Error::Gpio(e.kind())
    }

    pub(crate) fn pwm<E: pwm::Error>(e: E) -> Self {
        log::warn!("pwm update failed: {:?}", e);
        Error::Pwm(e.kind())
    }

    /// Whether this is a failed bus transaction, as opposed to a rejected argument.
    pub fn is_transfer_error(&self) -> bool {
        matches!(
            self,
            Error::I2c(_) | Error::Spi(_) | Error::Gpio(_) | Error::Pwm(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(kind) => write!(f, "i2c transfer failed: {}", kind),
            Error::Spi(kind) => write!(f, "spi transfer failed: {}", kind),
            Error::Gpio(kind) => write!(f, "gpio access failed: {:?}", kind),
            Error::Pwm(kind) => write!(f, "pwm update failed: {:?}", kind),
            Error::InvalidPin(pin) => write!(f, "no such pin: {}", pin),
            Error::InvalidRegister(index) => write!(f, "no such expander register: {}", index),
            Error::InvalidChannel(ch) => write!(f, "no such channel: {}", ch),
            Error::InvalidSocket => f.write_str("socket must be one of A, B, C, D"),
            Error::NotAnOutput(pin) => write!(f, "pin {} is not an output", pin),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
