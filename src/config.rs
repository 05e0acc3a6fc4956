//! Board wiring and start-up settings.
use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use crate::{Error, ExtPin};

/// Raspberry Pi board revision the PiGo is plugged into.
///
/// The revision decides which I2C bus the expanders sit on and which BCM pin backs buffered
/// I/O pin 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Revision {
    Rev1,
    #[default]
    Rev2,
}

impl Revision {
    pub fn i2c_bus(self) -> u8 {
        match self {
            Revision::Rev1 => 0,
            Revision::Rev2 => 1,
        }
    }

    /// BCM pin numbers of buffered I/O pins 0-7.
    pub fn io_pins(self) -> [u8; 8] {
        match self {
            Revision::Rev1 => [18, 23, 24, 25, 4, 17, 21, 22],
            Revision::Rev2 => [18, 23, 24, 25, 4, 17, 27, 22],
        }
    }
}

impl FromStr for Revision {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "rev1" => Ok(Revision::Rev1),
            "2" | "rev2" => Ok(Revision::Rev2),
            _ => Err("revision must be 1 or 2"),
        }
    }
}

/// Physical module socket on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Socket {
    A,
    B,
    C,
    D,
}

impl Socket {
    pub const ALL: [Socket; 4] = [Socket::A, Socket::B, Socket::C, Socket::D];

    pub fn index(self) -> u8 {
        match self {
            Socket::A => 0,
            Socket::B => 1,
            Socket::C => 2,
            Socket::D => 3,
        }
    }

    pub fn from_index(ix: u8) -> Result<Self, Error> {
        Self::ALL
            .get(ix as usize)
            .copied()
            .ok_or(Error::InvalidSocket)
    }

    /// Pins a module of kind `kind` occupies when plugged into this socket.
    pub fn pins(self, kind: ModuleKind) -> ModulePins {
        match kind {
            ModuleKind::Analog | ModuleKind::MotorDigital => {
                let first = ExtPin::from_raw(2 * self.index());
                ModulePins::ExtPair(first, first.next())
            }
            // The PWM peripheral only reaches buffered pin 0, whatever the socket.
            ModuleKind::MotorPwm => ModulePins::Buffered {
                pwm: 0,
                direction: 1,
            },
        }
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Socket::A => 'A',
            Socket::B => 'B',
            Socket::C => 'C',
            Socket::D => 'D',
        };
        write!(f, "{}", c)
    }
}

impl FromStr for Socket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Socket::A),
            "B" | "b" => Ok(Socket::B),
            "C" | "c" => Ok(Socket::C),
            "D" | "d" => Ok(Socket::D),
            _ => Err(Error::InvalidSocket),
        }
    }
}

/// Kinds of plug-in module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Analog,
    MotorDigital,
    MotorPwm,
}

/// Pin assignment of a module in a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulePins {
    /// Two adjacent extended I/O pins.
    ExtPair(ExtPin, ExtPin),
    /// Buffered I/O pins carrying the PWM signal and the direction signal.
    Buffered { pwm: u8, direction: u8 },
}

/// Start-up settings of a board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub revision: Revision,
    /// 7-bit I2C addresses of the first and second expander chip.
    pub expander_addresses: [u8; 2],
    pub spi_clock_hz: u32,
    pub pwm_frequency_hz: f64,
    /// Sleep between two cycles of a polling worker.
    pub poll_interval: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            revision: Revision::default(),
            expander_addresses: [0x20, 0x24],
            // 250 MHz core clock divided by 1024
            spi_clock_hz: 244_140,
            pwm_frequency_hz: 1000.0,
            poll_interval: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_pins() {
        let pins = Socket::C.pins(ModuleKind::Analog);
        assert_eq!(
            pins,
            ModulePins::ExtPair(ExtPin::new(4).unwrap(), ExtPin::new(5).unwrap())
        );
        let pins = Socket::D.pins(ModuleKind::MotorDigital);
        assert_eq!(
            pins,
            ModulePins::ExtPair(ExtPin::new(6).unwrap(), ExtPin::new(7).unwrap())
        );
        assert_eq!(
            Socket::B.pins(ModuleKind::MotorPwm),
            ModulePins::Buffered {
                pwm: 0,
                direction: 1
            }
        );
    }

    #[test]
    fn parse() {
        assert_eq!("b".parse::<Socket>(), Ok(Socket::B));
        assert_eq!("E".parse::<Socket>(), Err(Error::InvalidSocket));
        assert_eq!(Socket::from_index(4), Err(Error::InvalidSocket));
        assert_eq!("rev1".parse::<Revision>(), Ok(Revision::Rev1));
        assert_eq!(Revision::Rev1.io_pins()[6], 21);
        assert_eq!(Revision::Rev2.io_pins()[6], 27);
        assert_eq!(Revision::Rev1.i2c_bus(), 0);
    }
}
