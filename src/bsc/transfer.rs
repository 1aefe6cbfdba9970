/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! FIFO transfer engine.
//!
//! Both directions follow the same steps with the controller lock held:
//! program the slave address if it changed, clear the FIFO and the
//! write-1-to-clear status flags, load the byte count, start, then move
//! bytes through the FIFO until DONE. Polling is throttled by sleeping for
//! the time the bus needs to move the bytes still in flight, at most one
//! FIFO's worth.
//!
//! FIFO data accesses are single-shot: pushing or popping twice would
//! duplicate or lose a byte.

use {
    super::{
        clock, BscInner, C, CONTROL, DATA_LENGTH, DLEN, FIFO, FIFO_DEPTH, S, STATUS,
    },
    crate::{mmio::interface::RegisterAccess, Error, Result},
    embedded_hal::delay::DelayNs,
    log::trace,
    tock_registers::fields::FieldValue,
};

impl<R, D, G> BscInner<R, D, G>
where
    R: RegisterAccess,
    D: DelayNs,
    G: RegisterAccess,
{
    /// Push `bytes` to the device at `address`.
    pub(super) fn write(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
        let length = check_length(bytes.len())?;
        trace!("BSC write {} byte(s) to {:#04x}", length, address);

        self.ensure_address(address);
        self.begin(length, C::READ::Write);

        let mut remaining = bytes.len();
        while !self.status().is_set(S::DONE) {
            while remaining > 0 && self.status().is_set(S::TXD) {
                let byte = bytes[bytes.len() - remaining];
                self.registers.write_once(FIFO, byte.into());
                remaining -= 1;
            }
            // Give the bus time to drain what was queued.
            self.sleep_for(remaining.min(FIFO_DEPTH));
        }

        self.finish(remaining)
    }

    /// Fill `buffer` from the device at `address`.
    pub(super) fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<()> {
        let length = check_length(buffer.len())?;
        trace!("BSC read {} byte(s) from {:#04x}", length, address);

        self.ensure_address(address);
        self.begin(length, C::READ::Read);

        let mut remaining = buffer.len();
        while !self.status().is_set(S::DONE) {
            // Give the bus time to fill the FIFO before draining it.
            self.sleep_for(remaining.min(FIFO_DEPTH));
            remaining = self.drain(buffer, remaining);
        }
        // The last bytes may land between the final drain and DONE.
        remaining = self.drain(buffer, remaining);

        self.finish(remaining)
    }

    /// Reset the FIFO and status, load the length and start the transfer.
    fn begin(&self, length: u16, direction: FieldValue<u32, C::Register>) {
        let clear = C::CLEAR::Clear;
        self.registers.write_masked(CONTROL, clear.value, clear.mask());
        self.registers
            .write(STATUS, (S::CLKT::SET + S::ERR::SET + S::DONE::SET).value);
        self.registers
            .write(DATA_LENGTH, DLEN::DLEN.val(length.into()).value);
        self.registers
            .write(CONTROL, (C::I2CEN::SET + C::ST::SET + direction).value);
    }

    /// Pop bytes while the FIFO has them, returning what is still outstanding.
    fn drain(&self, buffer: &mut [u8], mut remaining: usize) -> usize {
        while remaining > 0 && self.status().is_set(S::RXD) {
            let index = buffer.len() - remaining;
            buffer[index] = self.registers.read_once(FIFO) as u8;
            remaining -= 1;
        }
        remaining
    }

    fn sleep_for(&mut self, bytes: usize) {
        let ns = clock::wait_ns(self.byte_time, bytes);
        self.delay.delay_ns(ns);
    }

    /// Classify a transfer the controller has marked DONE.
    ///
    /// A failing device often raises several flags at once; the checks run in
    /// a fixed order so the caller sees one answer. Status is left untouched on
    /// failure, the next transfer clears it.
    fn finish(&self, remaining: usize) -> Result<()> {
        let status = self.status();
        if status.is_set(S::ERR) {
            return Err(Error::Nack);
        }
        if status.is_set(S::CLKT) {
            return Err(Error::ClockStretchTimeout);
        }
        if remaining != 0 {
            return Err(Error::IncompleteTransfer { remaining });
        }
        self.registers.write(STATUS, S::DONE::SET.value);
        Ok(())
    }
}

fn check_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::TransferTooLong { len })
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
