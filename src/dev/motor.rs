//! Support for the motor module.
//!
//! The module is either driven as an H-bridge from the socket's two extended pins, or from the
//! Pi's hardware PWM channel on buffered pin 0 with buffered pin 1 selecting the direction.
//!
//! Power is a value in `-1.0..=1.0`.  Anything outside is clamped, NaN counts as stopped.
use embedded_hal::i2c::I2c;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::SpiBus;

use crate::{Board, Direction, Error, ExtPin, LocalGpio, ModuleKind, ModulePins, Socket};

fn clamp_power(power: f32) -> f32 {
    if power.is_nan() {
        0.0
    } else {
        power.clamp(-1.0, 1.0)
    }
}

/// Motor driven through an H-bridge on two extended pins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HBridgeMotor {
    socket: Socket,
    in1: ExtPin,
    in2: ExtPin,
    last_power: f32,
}

impl HBridgeMotor {
    pub fn new<I2C, SPI, GPIO>(
        board: &mut Board<I2C, SPI, GPIO>,
        socket: Socket,
    ) -> Result<Self, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        let (in1, in2) = match socket.pins(ModuleKind::MotorDigital) {
            ModulePins::ExtPair(in1, in2) => (in1, in2),
            ModulePins::Buffered { .. } => return Err(Error::InvalidSocket),
        };
        let expander = board.expander_mut();
        for pin in [in1, in2] {
            expander.set_direction(pin, Direction::Output);
            expander.set_state(pin, false);
        }
        board.flush()?;
        log::info!("h-bridge motor in socket {}", socket);

        Ok(Self {
            socket,
            in1,
            in2,
            last_power: 0.0,
        })
    }

    pub fn socket(&self) -> Socket {
        self.socket
    }

    /// Power of the last successful [`set_output()`](Self::set_output).
    pub fn power(&self) -> f32 {
        self.last_power
    }

    /// Drive IN1 for forward, IN2 for reverse, neither for zero.
    ///
    /// The bridge has no speed control, only the sign of `power` matters.
    pub fn set_output<I2C, SPI, GPIO>(
        &mut self,
        board: &mut Board<I2C, SPI, GPIO>,
        power: f32,
    ) -> Result<(), Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        let power = clamp_power(power);
        if power == self.last_power {
            return Ok(());
        }

        let expander = board.expander_mut();
        expander.set_state(self.in1, power > 0.0);
        expander.set_state(self.in2, power < 0.0);
        board.flush()?;

        log::debug!("motor {} power {}", self.socket, power);
        self.last_power = power;
        Ok(())
    }
}

/// Motor driven from a hardware PWM channel.
///
/// In reverse the bridge inverts the PWM signal, so the duty cycle is `1 + power` there.
pub struct PwmMotor<P> {
    pwm: P,
    direction: u8,
    last_power: f32,
}

impl<P: SetDutyCycle> PwmMotor<P> {
    /// Take over the buffered pins of the PWM motor, stopped and in forward direction.
    pub fn new<I2C, SPI, GPIO>(
        board: &mut Board<I2C, SPI, GPIO>,
        mut pwm: P,
    ) -> Result<Self, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        // Any socket, the PWM peripheral only reaches one pin.
        let (pwm_io, direction) = match Socket::A.pins(ModuleKind::MotorPwm) {
            ModulePins::Buffered { pwm, direction } => (pwm, direction),
            ModulePins::ExtPair(..) => return Err(Error::InvalidSocket),
        };

        // The Pi's pin itself belongs to the PWM peripheral, only the buffer is switched.
        board.set_buffer_direction(pwm_io, Direction::Output)?;
        board.set_io_direction(direction, Direction::Output)?;
        board.set_io(direction, false)?;
        pwm.set_duty_cycle_fully_off().map_err(Error::pwm)?;
        log::info!("pwm motor on buffered pins {} and {}", pwm_io, direction);

        Ok(Self {
            pwm,
            direction,
            last_power: 0.0,
        })
    }

    pub fn release(self) -> P {
        self.pwm
    }

    /// Power of the last successful [`set_output()`](Self::set_output).
    pub fn power(&self) -> f32 {
        self.last_power
    }

    pub fn set_output<I2C, SPI, GPIO>(
        &mut self,
        board: &mut Board<I2C, SPI, GPIO>,
        power: f32,
    ) -> Result<(), Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        let power = clamp_power(power);
        if power == self.last_power {
            return Ok(());
        }

        let reverse = power < 0.0;
        if reverse != (self.last_power < 0.0) {
            board.set_io(self.direction, reverse)?;
        }

        let duty = if reverse { 1.0 + power } else { power };
        let max = f32::from(self.pwm.max_duty_cycle());
        self.pwm
            .set_duty_cycle((max * duty + 0.5) as u16)
            .map_err(Error::pwm)?;

        log::debug!("pwm motor power {} duty {}", power, duty);
        self.last_power = power;
        Ok(())
    }
}

/// A motor module in either mode.
pub enum Motor<P> {
    HBridge(HBridgeMotor),
    Pwm(PwmMotor<P>),
}

impl<P: SetDutyCycle> Motor<P> {
    pub fn h_bridge<I2C, SPI, GPIO>(
        board: &mut Board<I2C, SPI, GPIO>,
        socket: Socket,
    ) -> Result<Self, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        HBridgeMotor::new(board, socket).map(Motor::HBridge)
    }

    pub fn pwm<I2C, SPI, GPIO>(board: &mut Board<I2C, SPI, GPIO>, pwm: P) -> Result<Self, Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        PwmMotor::new(board, pwm).map(Motor::Pwm)
    }

    pub fn power(&self) -> f32 {
        match self {
            Motor::HBridge(m) => m.power(),
            Motor::Pwm(m) => m.power(),
        }
    }

    pub fn set_output<I2C, SPI, GPIO>(
        &mut self,
        board: &mut Board<I2C, SPI, GPIO>,
        power: f32,
    ) -> Result<(), Error>
    where
        I2C: I2c,
        SPI: SpiBus,
        GPIO: LocalGpio,
    {
        match self {
            Motor::HBridge(m) => m.set_output(board, power),
            Motor::Pwm(m) => m.set_output(board, power),
        }
    }
}
