/*
 * SPDX-License-Identifier: MIT OR BlueOak-1.0.0
 * Copyright (c) 2018-2019 Andre Richter <andre.o.richter@gmail.com>
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 * Original code distributed under MIT, additional changes are under BlueOak-1.0.0
 */

//! GPIO function select.
//!
//! Only the function select bank (GPFSEL0..GPFSEL5) is used here: the bus
//! pins are handed to the BSC at startup and returned to inputs on close.

use {
    crate::{mmio::interface::RegisterAccess, Error, Result},
    bit_field::BitField,
    tock_registers::fields::FieldValue,
};

// Descriptions taken from
// https://github.com/raspberrypi/documentation/files/1888662/BCM2837-ARM-Peripherals.-.Revised.-.V2-1.pdf

/// Offset of GPFSEL0. Each following register covers the next ten pins.
const FUNCTION_SELECT: usize = 0x00;
const PINS_PER_BANK: usize = 10;
const BITS_PER_PIN: usize = 3;

/// Highest GPIO number on the BCM283x.
pub const MAX_PIN: u8 = 53;

/// An alternative GPIO function.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Plain input, also the reset state.
    Input = 0b000,
    /// Plain output.
    Output = 0b001,
    /// Alternate function 0. BSC0 and BSC1 SDA/SCL live here.
    Alt0 = 0b100,
    /// Alternate function 1.
    Alt1 = 0b101,
    /// Alternate function 2.
    Alt2 = 0b110,
    /// Alternate function 3.
    Alt3 = 0b111,
    /// Alternate function 4.
    Alt4 = 0b011,
    /// Alternate function 5.
    Alt5 = 0b010,
}

impl ::core::convert::From<Function> for u32 {
    fn from(f: Function) -> Self {
        f as u32
    }
}

impl Function {
    fn from_bits(bits: u32) -> Function {
        match bits & 0b111 {
            0b000 => Function::Input,
            0b001 => Function::Output,
            0b100 => Function::Alt0,
            0b101 => Function::Alt1,
            0b110 => Function::Alt2,
            0b111 => Function::Alt3,
            0b011 => Function::Alt4,
            _ => Function::Alt5,
        }
    }
}

/// Reject GPIO numbers the function select bank does not cover.
pub fn check_pin(pin: u8) -> Result<()> {
    if pin > MAX_PIN {
        return Err(Error::InvalidPin { pin });
    }
    Ok(())
}

fn select_register(pin: u8) -> usize {
    FUNCTION_SELECT + 4 * (usize::from(pin) / PINS_PER_BANK)
}

fn select_field(pin: u8, function: Function) -> FieldValue<u32, ()> {
    FieldValue::<u32, ()>::new(
        0b111,
        (usize::from(pin) % PINS_PER_BANK) * BITS_PER_PIN,
        function.into(),
    )
}

/// Route `pin` to `function`, leaving the other nine pins of its bank alone.
///
/// The caller guarantees `pin <= MAX_PIN`, see [`check_pin`].
pub fn set_pin_function(gpio: &impl RegisterAccess, pin: u8, function: Function) {
    let field = select_field(pin, function);
    gpio.write_masked(select_register(pin), field.value, field.mask());
}

/// Current function of `pin`.
pub fn pin_function(gpio: &impl RegisterAccess, pin: u8) -> Function {
    let shift = (usize::from(pin) % PINS_PER_BANK) * BITS_PER_PIN;
    let bits = gpio.read(select_register(pin)).get_bits(shift..shift + BITS_PER_PIN);
    Function::from_bits(bits)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
