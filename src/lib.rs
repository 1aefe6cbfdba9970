/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Broadcom Serial Controller (BSC) master driver.
//!
//! Drives the I2C-compatible BSC blocks of the BCM283x/BCM2711 SoCs from a
//! hosted process through memory-mapped registers. Transfers are strictly
//! polled: the calling thread fills or drains the 16-byte FIFO and sleeps
//! for roughly the time the bus needs to move the bytes it has queued.
//!
//! ```ignore
//! let revision = BoardRevision::from_code(revision_code)?;
//! let bus = Bsc::open(&mut mapper, revision, BusPins::new(2, 3), Config::default(), ThreadDelay)?;
//! let eeprom = bus.connect(0x50)?;
//! eeprom.write(&[0x00, 0x10])?;
//! let page = eeprom.read(16)?;
//! ```

#![allow(clippy::upper_case_acronyms)]

pub mod board;
pub mod bsc;
mod error;
pub mod gpio;
pub mod memory;
pub mod mmio;
pub mod sync;
#[cfg(test)]
mod tests;
pub mod time;

pub use {
    board::{BoardRevision, BusLayout},
    bsc::{Bsc, BusPins, Config, Device},
    error::{Error, Result},
};
