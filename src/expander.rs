//! Register cache for the two `MCP23017` expanders on the board.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! The bank keeps a shadow copy of the direction (`IODIR`) and output latch (`OLAT`) registers of
//! both ports of both chips.  Pin operations only edit the shadows; a flush then writes exactly
//! those registers whose shadow differs from what was last written, one I2C write per register.
//!
//! Registers are indexed 0-3: index `i` is port A (even) or B (odd) of chip `i / 2`.
use crate::bus::I2cExt;
use crate::{Direction, Error, ExtPin};

/// Number of 8-bit registers of each kind in the bank.
pub const REGISTERS: usize = 4;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// N.B.: These values are for BANK=0, which is the reset state of the chip.
enum Regs {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIRA = 0x00,
    IODIRB = 0x01,
    /// GPIO: reflects logic level on pins
    GPIOA = 0x12,
    GPIOB = 0x13,
    /// OLAT: output latches: sets state for pins configured as outputs
    OLATA = 0x14,
    OLATB = 0x15,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

impl Regs {
    fn iodir(index: usize) -> Self {
        if index % 2 == 0 {
            Regs::IODIRA
        } else {
            Regs::IODIRB
        }
    }

    fn olat(index: usize) -> Self {
        if index % 2 == 0 {
            Regs::OLATA
        } else {
            Regs::OLATB
        }
    }
}

/// Shadow and committed value of one 8-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    shadow: u8,
    committed: Option<u8>,
}

impl Register {
    const fn new(shadow: u8) -> Self {
        Self {
            shadow,
            committed: None,
        }
    }

    pub fn shadow(&self) -> u8 {
        self.shadow
    }

    /// Value last written to the chip, `None` before the first write.
    pub fn committed(&self) -> Option<u8> {
        self.committed
    }

    pub fn is_dirty(&self) -> bool {
        self.committed != Some(self.shadow)
    }

    fn update(&mut self, mask_set: u8, mask_clear: u8) {
        self.shadow |= mask_set;
        self.shadow &= !mask_clear;
    }
}

/// Which kind of register a flush walks over.
#[derive(Clone, Copy)]
enum Kind {
    Direction,
    State,
}

pub struct ExpanderBank<I2C> {
    i2c: I2C,
    addresses: [u8; 2],
    direction: [Register; REGISTERS],
    state: [Register; REGISTERS],
    input: [u8; REGISTERS],
    /// Whether `input` holds a reading yet.
    sampled: bool,
    changed: [u8; REGISTERS],
}

impl<I2C> ExpanderBank<I2C> {
    /// Create a bank for the chips at `addresses`.
    ///
    /// Nothing is considered written yet, so the first flush writes every register: all pins
    /// inputs, all latches low.
    pub fn new(i2c: I2C, addresses: [u8; 2]) -> Self {
        Self {
            i2c,
            addresses,
            direction: [Register::new(0xff); REGISTERS],
            state: [Register::new(0x00); REGISTERS],
            input: [0x00; REGISTERS],
            sampled: false,
            changed: [0x00; REGISTERS],
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn address(&self, index: usize) -> u8 {
        self.addresses[index / 2]
    }

    pub fn direction_register(&self, index: usize) -> Result<&Register, Error> {
        self.direction.get(index).ok_or(Error::InvalidRegister(index))
    }

    pub fn state_register(&self, index: usize) -> Result<&Register, Error> {
        self.state.get(index).ok_or(Error::InvalidRegister(index))
    }

    /// Set the shadow direction of `pin`.
    pub fn set_direction(&mut self, pin: ExtPin, dir: Direction) {
        let (set, clear) = match dir {
            Direction::Input => (pin.mask(), 0),
            Direction::Output => (0, pin.mask()),
        };
        self.direction[pin.register()].update(set, clear);
    }

    /// Set the shadow output level of `pin`.
    pub fn set_state(&mut self, pin: ExtPin, high: bool) {
        let (set, clear) = if high {
            (pin.mask(), 0)
        } else {
            (0, pin.mask())
        };
        self.state[pin.register()].update(set, clear);
    }

    /// Set the bits in `mask_set` and clear the bits in `mask_clear` of a shadow direction
    /// register.
    pub fn update_direction(
        &mut self,
        index: usize,
        mask_set: u8,
        mask_clear: u8,
    ) -> Result<(), Error> {
        let register = self
            .direction
            .get_mut(index)
            .ok_or(Error::InvalidRegister(index))?;
        register.update(mask_set, mask_clear);
        Ok(())
    }

    /// Set the bits in `mask_set` and clear the bits in `mask_clear` of a shadow state register.
    pub fn update_state(&mut self, index: usize, mask_set: u8, mask_clear: u8) -> Result<(), Error> {
        let register = self
            .state
            .get_mut(index)
            .ok_or(Error::InvalidRegister(index))?;
        register.update(mask_set, mask_clear);
        Ok(())
    }

    pub fn direction(&self, pin: ExtPin) -> Direction {
        Direction::from_input_bit(self.direction[pin.register()].shadow & pin.mask() != 0)
    }

    /// Shadow output level of `pin`.
    pub fn state(&self, pin: ExtPin) -> bool {
        self.state[pin.register()].shadow & pin.mask() != 0
    }

    /// Level of `pin` as seen by the last [`refresh_inputs()`](Self::refresh_inputs).
    pub fn input(&self, pin: ExtPin) -> bool {
        self.input[pin.register()] & pin.mask() != 0
    }

    /// Whether any register still needs to be written.
    pub fn is_dirty(&self) -> bool {
        self.direction
            .iter()
            .chain(self.state.iter())
            .any(Register::is_dirty)
    }

    /// Read and clear the change bits in `mask` of register `index`.
    ///
    /// Change bits accumulate over [`refresh_inputs()`](Self::refresh_inputs) calls until they are
    /// queried.
    pub fn query_pin_change(&mut self, index: usize, mask: u8) -> Result<u8, Error> {
        let pending = self
            .changed
            .get_mut(index)
            .ok_or(Error::InvalidRegister(index))?;
        let changed = *pending & mask;
        *pending &= !mask;
        Ok(changed)
    }

    /// Read and clear the change bit of `pin`.
    pub fn take_pin_change(&mut self, pin: ExtPin) -> bool {
        let pending = &mut self.changed[pin.register()];
        let changed = *pending & pin.mask() != 0;
        *pending &= !pin.mask();
        changed
    }
}

impl<I2C: embedded_hal::i2c::I2c> ExpanderBank<I2C> {
    /// Write every dirty direction register.  Returns the number of bus writes.
    pub fn flush_directions(&mut self) -> Result<usize, I2C::Error> {
        self.flush_kind(Kind::Direction)
    }

    /// Write every dirty output latch register.  Returns the number of bus writes.
    pub fn flush_states(&mut self) -> Result<usize, I2C::Error> {
        self.flush_kind(Kind::State)
    }

    /// Flush directions, then states.
    ///
    /// An expander pin has to be an output before its latch drives anything, so this order is
    /// always kept.
    pub fn flush(&mut self) -> Result<usize, I2C::Error> {
        let directions = self.flush_directions()?;
        let states = self.flush_states()?;
        Ok(directions + states)
    }

    fn flush_kind(&mut self, kind: Kind) -> Result<usize, I2C::Error> {
        let mut writes = 0;
        for index in 0..REGISTERS {
            let addr = self.address(index);
            let (reg, register) = match kind {
                Kind::Direction => (Regs::iodir(index), &mut self.direction[index]),
                Kind::State => (Regs::olat(index), &mut self.state[index]),
            };
            if !register.is_dirty() {
                continue;
            }
            log::debug!(
                "expander {:#04x} reg {:#04x} <- {:#04x}",
                addr,
                u8::from(reg),
                register.shadow
            );
            // A failed write leaves this and all later registers dirty for the next flush.
            self.i2c.write_reg(addr, reg, register.shadow)?;
            register.committed = Some(register.shadow);
            writes += 1;
        }
        Ok(writes)
    }

    /// Read the GPIO registers of both chips.
    ///
    /// Reads always go to the bus.  Returns, per register, the bits of input pins that changed
    /// since the previous refresh.  Those bits are also accumulated for
    /// [`query_pin_change()`](Self::query_pin_change).
    ///
    /// The first refresh only takes the baseline and reports no changes.
    pub fn refresh_inputs(&mut self) -> Result<[u8; REGISTERS], I2C::Error> {
        let mut changed = [0x00; REGISTERS];
        for chip in 0..2 {
            let mut buf = [0x00; 2];
            self.i2c
                .read_regs(self.addresses[chip], Regs::GPIOA, &mut buf)?;
            for (port, value) in buf.iter().enumerate() {
                let index = 2 * chip + port;
                let inputs = self.direction[index].shadow;
                if self.sampled {
                    changed[index] = (self.input[index] ^ value) & inputs;
                }
                self.input[index] = *value;
                self.changed[index] |= changed[index];
            }
        }
        self.sampled = true;
        Ok(changed)
    }
}
