/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource},
    snafu::Snafu,
};

/// Everything that can go wrong while setting up or using a BSC bus.
///
/// Transfer errors are terminal: the driver never retries, and the FIFO and
/// status flags are left as the controller reported them until the next
/// transfer resets them.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The addressed device did not acknowledge.
    #[snafu(display("Device did not acknowledge the transfer"))]
    Nack,
    /// The device held SCL low past the controller's clock stretch timeout.
    #[snafu(display("Clock stretch timeout"))]
    ClockStretchTimeout,
    /// The controller reported completion before all bytes were moved.
    #[snafu(display("Transfer finished with {} byte(s) outstanding", remaining))]
    IncompleteTransfer {
        /// Bytes that were never pushed to or popped from the FIFO.
        remaining: usize,
    },
    /// The board revision code does not match any supported SoC.
    #[snafu(display("Unknown board revision code {:#x}", code))]
    UnknownBoardRevision {
        /// Raw revision code.
        code: u32,
    },
    /// The pin pair is not wired to any BSC on this board revision.
    #[snafu(display("Pins SDA={} SCL={} do not route to a BSC", sda, scl))]
    InvalidPinPair {
        /// Data pin.
        sda: u8,
        /// Clock pin.
        scl: u8,
    },
    /// The GPIO number is out of range.
    #[snafu(display("GPIO {} exceeds maximum of 53", pin))]
    InvalidPin {
        /// Offending pin.
        pin: u8,
    },
    /// Device addresses are 7 bits wide.
    #[snafu(display("Device address {:#x} is not a 7-bit address", address))]
    InvalidAddress {
        /// Offending address.
        address: u8,
    },
    /// The BSC core clock must be non-zero.
    #[snafu(display("Core clock frequency must be non-zero"))]
    InvalidCoreClock,
    /// No clock divider in range produces the requested bus speed.
    #[snafu(display("Bus speed {} Hz is out of range", hz))]
    UnsupportedBusSpeed {
        /// Requested SCL frequency.
        hz: u32,
    },
    /// The data length register is 16 bits wide.
    #[snafu(display("Transfer of {} bytes exceeds the data length register", len))]
    TransferTooLong {
        /// Requested transfer length.
        len: usize,
    },
    /// The physical register block could not be mapped.
    #[snafu(display("Failed to map physical range at {:#x}", phys_addr))]
    MappingFailed {
        /// Physical base address of the range.
        phys_addr: usize,
    },
}

/// Result type of all fallible bus operations.
pub type Result<T> = ::core::result::Result<T, Error>;

impl Error {
    /// True for errors raised while configuring the bus rather than by a
    /// transfer on the wire.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Error::Nack | Error::ClockStretchTimeout | Error::IncompleteTransfer { .. }
        )
    }
}

impl i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
