//! Test doubles: recording GPIO and PWM fakes, and a simulated board with an ADC/DAC module.
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use embedded_hal::{digital, i2c, pwm, spi};
use embedded_hal_mock::eh1::{i2c as mock_i2c, spi as mock_spi};

use crate::{Direction, LocalGpio};

/// Writes issued by the first flush of a fresh bank.
pub fn initial_flush(addr: [u8; 2]) -> Vec<mock_i2c::Transaction> {
    vec![
        mock_i2c::Transaction::write(addr[0], vec![0x00, 0xff]),
        mock_i2c::Transaction::write(addr[0], vec![0x01, 0xff]),
        mock_i2c::Transaction::write(addr[1], vec![0x00, 0xff]),
        mock_i2c::Transaction::write(addr[1], vec![0x01, 0xff]),
        mock_i2c::Transaction::write(addr[0], vec![0x14, 0x00]),
        mock_i2c::Transaction::write(addr[0], vec![0x15, 0x00]),
        mock_i2c::Transaction::write(addr[1], vec![0x14, 0x00]),
        mock_i2c::Transaction::write(addr[1], vec![0x15, 0x00]),
    ]
}

/// An SPI bus that expects no traffic at all.
pub fn idle_spi() -> mock_spi::Mock<u8> {
    mock_spi::Mock::new(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioOp {
    Direction(u8, Direction),
    Write(u8, bool),
}

#[derive(Default)]
struct GpioState {
    ops: Vec<GpioOp>,
    inputs: HashMap<u8, bool>,
}

/// Local GPIO that records every direction change and write.  Clones share their state.
#[derive(Clone, Default)]
pub struct RecordingGpio(Arc<Mutex<GpioState>>);

impl RecordingGpio {
    pub fn ops(&self) -> Vec<GpioOp> {
        self.0.lock().unwrap().ops.clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().ops.clear();
    }

    /// Level the outside world drives onto `pin`.
    pub fn drive(&self, pin: u8, high: bool) {
        self.0.lock().unwrap().inputs.insert(pin, high);
    }
}

impl digital::ErrorType for RecordingGpio {
    type Error = Infallible;
}

impl LocalGpio for RecordingGpio {
    fn set_direction(&mut self, pin: u8, dir: Direction) -> Result<(), Self::Error> {
        self.0.lock().unwrap().ops.push(GpioOp::Direction(pin, dir));
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error> {
        self.0.lock().unwrap().ops.push(GpioOp::Write(pin, high));
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, Self::Error> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .inputs
            .get(&pin)
            .copied()
            .unwrap_or(false))
    }
}

/// PWM channel with a 0-1000 duty range that records every duty cycle set.
#[derive(Clone, Default)]
pub struct RecordingPwm(Arc<Mutex<Vec<u16>>>);

impl RecordingPwm {
    pub fn duties(&self) -> Vec<u16> {
        self.0.lock().unwrap().clone()
    }
}

impl pwm::ErrorType for RecordingPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for RecordingPwm {
    fn max_duty_cycle(&self) -> u16 {
        1000
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.0.lock().unwrap().push(duty);
        Ok(())
    }
}

/// Register file of the two simulated expanders plus the analog modules behind the sockets.
struct SimState {
    addresses: [u8; 2],
    regs: [[u8; 0x16]; 2],
    pointer: [u8; 2],
    /// Analog input voltage per socket and channel, in ADC counts.
    adc: [[u16; 2]; 4],
    dac: [[u16; 2]; 4],
    /// Wire each DAC channel back into the ADC channel of the same number.
    loopback: bool,
    transfers: usize,
}

/// A PiGo board in software.  [`SimI2c`] and [`SimSpi`] share one [`Sim`].
#[derive(Clone)]
pub struct Sim(Arc<Mutex<SimState>>);

impl Sim {
    pub fn new(addresses: [u8; 2], loopback: bool) -> Self {
        let mut regs = [[0x00; 0x16]; 2];
        // IODIR resets to all inputs
        for chip in regs.iter_mut() {
            chip[0x00] = 0xff;
            chip[0x01] = 0xff;
        }
        Self(Arc::new(Mutex::new(SimState {
            addresses,
            regs,
            pointer: [0; 2],
            adc: [[0; 2]; 4],
            dac: [[0; 2]; 4],
            loopback,
            transfers: 0,
        })))
    }

    pub fn i2c(&self) -> SimI2c {
        SimI2c(self.clone())
    }

    pub fn spi(&self) -> SimSpi {
        SimSpi(self.clone())
    }

    pub fn set_adc(&self, socket: usize, ch: usize, value: u16) {
        self.0.lock().unwrap().adc[socket][ch] = value;
    }

    pub fn dac(&self, socket: usize, ch: usize) -> u16 {
        self.0.lock().unwrap().dac[socket][ch]
    }

    pub fn reg(&self, chip: usize, reg: u8) -> u8 {
        self.0.lock().unwrap().regs[chip][reg as usize]
    }

    pub fn transfers(&self) -> usize {
        self.0.lock().unwrap().transfers
    }
}

pub struct SimI2c(Sim);

impl i2c::ErrorType for SimI2c {
    type Error = i2c::ErrorKind;
}

impl i2c::I2c for SimI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut st = self.0 .0.lock().unwrap();
        let chip = st
            .addresses
            .iter()
            .position(|a| *a == address)
            .ok_or(i2c::ErrorKind::NoAcknowledge(
                i2c::NoAcknowledgeSource::Address,
            ))?;
        for op in operations {
            match op {
                i2c::Operation::Write(bytes) => {
                    let (reg, data) = bytes.split_first().ok_or(i2c::ErrorKind::Other)?;
                    st.pointer[chip] = *reg;
                    for (i, value) in data.iter().enumerate() {
                        st.regs[chip][*reg as usize + i] = *value;
                    }
                }
                i2c::Operation::Read(buf) => {
                    let reg = st.pointer[chip] as usize;
                    for (i, value) in buf.iter_mut().enumerate() {
                        // GPIO reads back the output latch
                        *value = st.regs[chip][reg + i + 2];
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct SimSpi(Sim);

impl spi::ErrorType for SimSpi {
    type Error = spi::ErrorKind;
}

impl spi::SpiBus for SimSpi {
    fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut st = self.0 .0.lock().unwrap();
        st.transfers += 1;

        // Chip selects of all sockets are on port B of the first expander.
        let selected = !st.regs[0][0x01] & !st.regs[0][0x15];
        assert_eq!(
            selected.count_ones(),
            1,
            "expected exactly one chip select, got {:#010b}",
            selected
        );
        let line = selected.trailing_zeros() as usize;
        let socket = line / 2;

        assert_eq!(words.len(), 2);
        if line % 2 == 0 {
            assert_eq!(words[0] & 0xe8, 0x68, "bad ADC command {:#04x}", words[0]);
            let ch = ((words[0] >> 4) & 1) as usize;
            let value = if st.loopback {
                st.dac[socket][ch]
            } else {
                st.adc[socket][ch]
            };
            // the upper bits of the reply are undefined
            words[0] = 0xf0 | (value >> 8) as u8;
            words[1] = value as u8;
        } else {
            assert_eq!(words[0] & 0x30, 0x30, "bad DAC command {:#04x}", words[0]);
            let ch = (words[0] >> 7) as usize;
            st.dac[socket][ch] = (u16::from(words[0] & 0x0f) << 6) | u16::from(words[1] >> 2);
            words.fill(0);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// SPI bus on which every transfer fails.
pub struct FailingSpi;

impl spi::ErrorType for FailingSpi {
    type Error = spi::ErrorKind;
}

impl spi::SpiBus for FailingSpi {
    fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Err(spi::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
