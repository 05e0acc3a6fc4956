//! Hardware abstraction for the PiGo Raspberry Pi expansion board.
//!
//! The board carries two `MCP23017` port-expanders on I2C, which provide 16 extended I/O pins, the
//! chip selects of the four module sockets and the direction lines of the eight buffered I/O
//! pins.  Modules in the sockets talk SPI.
//!
//! A [`Board`] owns all of that.  The expander registers are cached, and only the registers whose
//! value actually changed are written back.  Drivers for the plug-in modules live in [`dev`] and
//! borrow the board for every operation:
//!
//! ```no_run
//! # fn main() -> Result<(), pigo::Error> {
//! use pigo::dev::analog::AnalogModule;
//! use pigo::{BoardConfig, Detached, DetachedBoard, Socket};
//!
//! let mut board = DetachedBoard::new(Detached, Detached, Detached, &BoardConfig::default())?;
//! let adda = AnalogModule::new(&mut board, Socket::A)?;
//! adda.write_channel(&mut board, 0, 512)?;
//! let value = adda.read_channel(&mut board, 1)?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```
//!
//! On a Pi, enable the `rpi` feature and get a board from [`rpi::open()`](crate::rpi::open).
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod board;
mod bus;
mod common;
mod config;
mod detached;
pub mod dev;
mod error;
pub mod expander;
mod mutex;
#[cfg(feature = "rpi")]
pub mod rpi;
#[cfg(test)]
mod sim;
#[cfg(feature = "std")]
mod worker;

pub use board::Board;
pub use bus::{scan, transfer, LocalGpio};
pub use common::{Direction, ExtPin, BUFFERED_PINS, EXT_PINS};
pub use config::{BoardConfig, ModuleKind, ModulePins, Revision, Socket};
pub use detached::{Detached, DetachedBoard};
pub use dev::analog::AnalogModule;
pub use dev::buffered::BufferedIo;
pub use dev::motor::{HBridgeMotor, Motor, PwmMotor};
pub use error::Error;
pub use expander::ExpanderBank;
pub use mutex::BoardMutex;
#[cfg(feature = "std")]
pub use worker::Poller;
