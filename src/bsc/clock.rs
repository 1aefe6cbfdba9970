/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! BSC clock divider arithmetic.
//!
//! SCL = core_clock / CDIV. One byte on the wire takes nine SCL periods:
//! eight data bits and the acknowledge bit. The byte time is kept in
//! fixed point so that fast buses (small dividers) do not truncate to a
//! zero wait.

use {
    crate::{Error, Result},
    core::num::NonZeroU32,
    fixed::types::U64F64,
};

/// Microseconds, with 64 fractional bits.
pub type Micros = U64F64;

/// SCL periods per transferred byte, data plus ACK.
pub const CYCLES_PER_BYTE: u64 = 9;

/// Smallest divider the controller honours.
pub const DIVIDER_MIN: u16 = 0x0002;
/// Largest even divider. Odd values are rounded down by the hardware.
pub const DIVIDER_MAX: u16 = 0xfffe;

/// Core clock the peripheral manual rates the reset divider (0x5dc, 100 kHz) against.
pub const NOMINAL_CORE_CLOCK_HZ: u32 = 150_000_000;

/// A divider register of zero is taken as this.
const DIVIDER_ZERO: u32 = 0x8000;

const MICROS_PER_SECOND: u64 = 1_000_000;
const NANOS_PER_MICRO: u128 = 1_000;

/// Bus clock configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Frequency feeding the BSC clock divider.
    ///
    /// When unset, [`Bsc::open`](super::Bsc::open) uses the board's core clock
    /// and [`Bsc::new`](super::Bsc::new) uses [`NOMINAL_CORE_CLOCK_HZ`].
    pub core_clock_hz: Option<u32>,
}

impl Config {
    /// Run the divider from a known core clock.
    pub const fn with_core_clock(hz: u32) -> Self {
        Self {
            core_clock_hz: Some(hz),
        }
    }

    pub(crate) fn core_clock(&self, fallback: u32) -> Result<NonZeroU32> {
        NonZeroU32::new(self.core_clock_hz.unwrap_or(fallback)).ok_or(Error::InvalidCoreClock)
    }
}

fn effective_divider(divider: u16) -> u32 {
    match divider {
        0 => DIVIDER_ZERO,
        d => u32::from(d),
    }
}

/// Time to move one byte at `divider`, in microseconds.
///
/// `divider * 1_000_000 * 9 / core_clock_hz`, computed without truncation.
pub fn byte_time(divider: u16, core_clock_hz: NonZeroU32) -> Micros {
    let numerator = u64::from(effective_divider(divider)) * MICROS_PER_SECOND * CYCLES_PER_BYTE;
    Micros::from_num(numerator)
        .checked_div(Micros::from_num(core_clock_hz.get()))
        .unwrap_or(Micros::MAX)
}

/// Nanoseconds to wait for `bytes` bytes to cross the bus.
pub fn wait_ns(byte_time: Micros, bytes: usize) -> u32 {
    byte_time
        .saturating_mul_int(bytes as u128)
        .saturating_mul_int(NANOS_PER_MICRO)
        .saturating_round()
        .saturating_to_num::<u32>()
}

/// Divider that runs SCL at `bus_hz` or the nearest speed below it.
///
/// Only even dividers are produced.
pub fn divider_for(bus_hz: u32, core_clock_hz: NonZeroU32) -> Result<u16> {
    // Faster than core / DIVIDER_MIN cannot be reached by any divider.
    if bus_hz == 0 || core_clock_hz.get() / bus_hz < u32::from(DIVIDER_MIN) {
        return Err(Error::UnsupportedBusSpeed { hz: bus_hz });
    }
    let divider = core_clock_hz.get().div_ceil(bus_hz);
    // Round up to even, the hardware would round an odd value down.
    let divider = divider + (divider & 1);
    match u16::try_from(divider) {
        Ok(divider) if (DIVIDER_MIN..=DIVIDER_MAX).contains(&divider) => Ok(divider),
        _ => Err(Error::UnsupportedBusSpeed { hz: bus_hz }),
    }
}

/// SCL frequency produced by `divider`.
///
/// A divider of zero is read back by the hardware as 32768.
pub fn bus_speed(divider: u16, core_clock_hz: NonZeroU32) -> u32 {
    core_clock_hz.get() / effective_divider(divider)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
