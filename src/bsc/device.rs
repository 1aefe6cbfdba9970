/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::Bsc,
    crate::{mmio::interface::RegisterAccess, Result},
    embedded_hal::delay::DelayNs,
};

/// A device on the bus.
///
/// Holds nothing but the bus reference and a validated 7-bit address, so it
/// is cheap to copy. All connections of one bus take turns on its lock.
pub struct Device<'bus, R, D, G = R>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
    bus: &'bus Bsc<R, D, G>,
    address: u8,
}

impl<'bus, R, D, G> Device<'bus, R, D, G>
where
    R: RegisterAccess,
    D: DelayNs,
    G: RegisterAccess,
{
    pub(super) fn new(bus: &'bus Bsc<R, D, G>, address: u8) -> Self {
        Self { bus, address }
    }

    /// 7-bit address of this device.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Write all of `bytes` in one transfer.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        self.bus.write(self.address, bytes)
    }

    /// Read `length` bytes in one transfer.
    pub fn read(&self, length: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0; length];
        self.read_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Fill `buffer` in one transfer.
    pub fn read_into(&self, buffer: &mut [u8]) -> Result<()> {
        self.bus.read_into(self.address, buffer)
    }
}

impl<R, D, G> Clone for Device<'_, R, D, G>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, D, G> Copy for Device<'_, R, D, G>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
