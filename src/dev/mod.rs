//! Drivers for the modules that plug into the board.
//!
//! A driver only remembers which pins its module occupies and what it last wrote.  Every
//! operation borrows the [`Board`](crate::Board), so several drivers share one board without
//! holding on to it.

pub mod analog;
pub mod buffered;
pub mod motor;
