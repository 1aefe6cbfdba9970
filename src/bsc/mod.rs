/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Broadcom Serial Controller.
//!
//! A bus is opened once per physical controller. Device connections handed
//! out by [`Bsc::connect`] share it; every transfer holds the controller lock
//! from address setup to completion, because there is one FIFO, one address
//! register and one status register for all of them.
//!
//! Only one [`Bsc`] may exist per controller base address. This is not
//! enforced here.

use {
    crate::{
        board::{self, BoardRevision},
        gpio::{self, Function},
        memory::{interface::MemoryMapper, BLOCK_SIZE},
        mmio::interface::RegisterAccess,
        sync::{interface::Mutex, Lock},
        Error, Result,
    },
    core::num::NonZeroU32,
    embedded_hal::{
        delay::DelayNs,
        i2c::{ErrorType, I2c, Operation, SevenBitAddress},
    },
    log::{debug, warn},
    tock_registers::{register_bitfields, LocalRegisterCopy},
};

pub mod clock;
mod device;
mod transfer;

pub use {
    clock::{Config, Micros, NOMINAL_CORE_CLOCK_HZ},
    device::Device,
};

// BSC registers.
//
// Descriptions taken from
// https://github.com/raspberrypi/documentation/files/1888662/BCM2837-ARM-Peripherals.-.Revised.-.V2-1.pdf
register_bitfields! {
    u32,

    /// Control
    pub(crate) C [
        /// I2C Enable
        I2CEN OFFSET(15) NUMBITS(1) [],
        /// Interrupt on RX
        INTR OFFSET(10) NUMBITS(1) [],
        /// Interrupt on TX
        INTT OFFSET(9) NUMBITS(1) [],
        /// Interrupt on DONE
        INTD OFFSET(8) NUMBITS(1) [],
        /// Start Transfer. Self-clearing.
        ST OFFSET(7) NUMBITS(1) [],
        /// FIFO Clear. Either bit clears the FIFO, self-clearing.
        CLEAR OFFSET(4) NUMBITS(2) [
            NoAction = 0b00,
            Clear = 0b01
        ],
        /// Read Transfer
        READ OFFSET(0) NUMBITS(1) [
            Write = 0,
            Read = 1
        ]
    ],

    /// Status
    pub(crate) S [
        /// Clock Stretch Timeout. Write 1 to clear.
        CLKT OFFSET(9) NUMBITS(1) [],
        /// ACK Error. Write 1 to clear.
        ERR OFFSET(8) NUMBITS(1) [],
        /// FIFO Full
        RXF OFFSET(7) NUMBITS(1) [],
        /// FIFO Empty
        TXE OFFSET(6) NUMBITS(1) [],
        /// FIFO contains Data
        RXD OFFSET(5) NUMBITS(1) [],
        /// FIFO can accept Data
        TXD OFFSET(4) NUMBITS(1) [],
        /// FIFO needs Reading (full)
        RXR OFFSET(3) NUMBITS(1) [],
        /// FIFO needs Writing (full)
        TXW OFFSET(2) NUMBITS(1) [],
        /// Transfer Done. Write 1 to clear.
        DONE OFFSET(1) NUMBITS(1) [],
        /// Transfer Active
        TA OFFSET(0) NUMBITS(1) []
    ],

    /// Data Length
    DLEN [
        DLEN OFFSET(0) NUMBITS(16) []
    ],

    /// Slave Address
    A [
        ADDR OFFSET(0) NUMBITS(7) []
    ],

    /// Clock Divider
    DIV [
        CDIV OFFSET(0) NUMBITS(16) []
    ],

    /// Clock Stretch Timeout
    CLKT [
        TOUT OFFSET(0) NUMBITS(16) []
    ]
}

// Register offsets within the BSC block.
pub(crate) const CONTROL: usize = 0x00;
pub(crate) const STATUS: usize = 0x04;
pub(crate) const DATA_LENGTH: usize = 0x08;
pub(crate) const SLAVE_ADDRESS: usize = 0x0c;
pub(crate) const FIFO: usize = 0x10;
pub(crate) const DIVIDER: usize = 0x14;
pub(crate) const CLOCK_STRETCH_TIMEOUT: usize = 0x1c;

/// Depth of the BSC FIFO in bytes.
pub const FIFO_DEPTH: usize = 16;

/// Largest 7-bit device address.
pub const MAX_ADDRESS: u8 = 0x7f;

pub(crate) type Status = LocalRegisterCopy<u32, S::Register>;

/// The two GPIOs carrying the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPins {
    /// Data line.
    pub sda: u8,
    /// Clock line.
    pub scl: u8,
}

impl BusPins {
    /// Pin pair, data first.
    pub const fn new(sda: u8, scl: u8) -> Self {
        Self { sda, scl }
    }
}

/// Controller state that may only be touched with the lock held.
struct BscInner<R, D, G> {
    registers: R,
    gpio: G,
    core_clock: NonZeroU32,
    /// Last value written to the slave address register.
    address: u8,
    /// Time for one byte at the committed divider.
    byte_time: Micros,
    delay: D,
}

/// Public interface to one BSC controller.
pub struct Bsc<R, D, G = R>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
    inner: Lock<BscInner<R, D, G>>,
    pins: BusPins,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl<R, D, G> BscInner<R, D, G>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
    fn status(&self) -> Status {
        Status::new(self.registers.read(STATUS))
    }

    /// Program the slave address register unless it already holds `address`.
    fn ensure_address(&mut self, address: u8) {
        if self.address != address {
            self.registers
                .write(SLAVE_ADDRESS, A::ADDR.val(address.into()).value);
            self.address = address;
        }
    }

    fn divider(&self) -> u16 {
        LocalRegisterCopy::<u32, DIV::Register>::new(self.registers.read(DIVIDER)).read(DIV::CDIV)
            as u16
    }

    fn set_divider(&mut self, divider: u16) -> u16 {
        self.registers
            .write(DIVIDER, DIV::CDIV.val(divider.into()).value);
        // The hardware rounds what it is given; derive timing from what stuck.
        let committed = self.divider();
        self.byte_time = clock::byte_time(committed, self.core_clock);
        debug!(
            "BSC divider {:#x} requested, {:#x} committed, {} us per byte",
            divider, committed, self.byte_time
        );
        committed
    }

    fn set_pins(&self, pins: BusPins, function: Function) {
        gpio::set_pin_function(&self.gpio, pins.sda, function);
        gpio::set_pin_function(&self.gpio, pins.scl, function);
    }
}

fn check_address(address: u8) -> Result<()> {
    if address > MAX_ADDRESS {
        return Err(Error::InvalidAddress { address });
    }
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<R, D> Bsc<R, D>
where
    R: RegisterAccess,
    D: DelayNs,
{
    /// Map the controller wired to `pins` on `revision` and take over the pins.
    ///
    /// Timing is derived from the board's core clock unless `config` names one.
    pub fn open<M>(
        mapper: &mut M,
        revision: BoardRevision,
        pins: BusPins,
        config: Config,
        delay: D,
    ) -> Result<Self>
    where
        M: MemoryMapper<Region = R>,
    {
        let layout = board::resolve(revision, pins)?;
        let core_clock = config.core_clock(revision.core_clock_hz())?;
        debug!(
            "BSC at {:#x}, GPIO at {:#x} on {:?}",
            layout.controller, layout.gpio, revision
        );
        let registers = mapper.map(layout.controller, BLOCK_SIZE)?;
        let gpio = mapper.map(layout.gpio, BLOCK_SIZE)?;
        Self::setup(registers, gpio, pins, core_clock, delay)
    }
}

impl<R, D, G> Bsc<R, D, G>
where
    R: RegisterAccess,
    D: DelayNs,
    G: RegisterAccess,
{
    /// Take over an already mapped controller.
    ///
    /// Routes both pins to the controller, leaves the clock divider as it is
    /// and resets the slave address register to 0. Without a core clock in
    /// `config`, timing assumes [`NOMINAL_CORE_CLOCK_HZ`].
    pub fn new(registers: R, gpio: G, pins: BusPins, config: Config, delay: D) -> Result<Self> {
        let core_clock = config.core_clock(NOMINAL_CORE_CLOCK_HZ)?;
        Self::setup(registers, gpio, pins, core_clock, delay)
    }

    fn setup(
        registers: R,
        gpio: G,
        pins: BusPins,
        core_clock: NonZeroU32,
        delay: D,
    ) -> Result<Self> {
        gpio::check_pin(pins.sda)?;
        gpio::check_pin(pins.scl)?;

        let mut inner = BscInner {
            registers,
            gpio,
            core_clock,
            address: 0,
            byte_time: Micros::ZERO,
            delay,
        };
        inner.set_pins(pins, Function::Alt0);
        inner.byte_time = clock::byte_time(inner.divider(), core_clock);
        inner.registers.write(SLAVE_ADDRESS, 0);

        debug!(
            "BSC up on SDA={} SCL={}, divider {:#x}, {} us per byte",
            pins.sda,
            pins.scl,
            inner.divider(),
            inner.byte_time
        );

        Ok(Self {
            inner: Lock::new(inner),
            pins,
        })
    }

    /// A connection to the device at 7-bit `address`.
    pub fn connect(&self, address: u8) -> Result<Device<'_, R, D, G>> {
        check_address(address)?;
        Ok(Device::new(self, address))
    }

    /// Pins this bus was opened on.
    pub fn pins(&self) -> BusPins {
        self.pins
    }

    /// Current clock divider.
    pub fn clock_divider(&self) -> u16 {
        self.inner.lock(|inner| inner.divider())
    }

    /// Program the clock divider.
    ///
    /// The controller rounds odd values down, so the value it committed is
    /// returned and used for all further timing.
    pub fn set_clock_divider(&self, divider: u16) -> u16 {
        self.inner.lock(|inner| inner.set_divider(divider))
    }

    /// Current SCL frequency.
    pub fn bus_speed(&self) -> u32 {
        self.inner
            .lock(|inner| clock::bus_speed(inner.divider(), inner.core_clock))
    }

    /// Run SCL at `hz` or the nearest speed below it, returning the actual speed.
    pub fn set_bus_speed(&self, hz: u32) -> Result<u32> {
        self.inner.lock(|inner| {
            let divider = clock::divider_for(hz, inner.core_clock)?;
            let committed = inner.set_divider(divider);
            Ok(clock::bus_speed(committed, inner.core_clock))
        })
    }

    /// Time for one byte to cross the bus at the current divider.
    pub fn wait_interval(&self) -> Micros {
        self.inner.lock(|inner| inner.byte_time)
    }

    /// SCL cycles a device may stretch the clock before the transfer fails.
    pub fn clock_stretch_timeout(&self) -> u16 {
        self.inner.lock(|inner| {
            LocalRegisterCopy::<u32, CLKT::Register>::new(
                inner.registers.read(CLOCK_STRETCH_TIMEOUT),
            )
            .read(CLKT::TOUT) as u16
        })
    }

    /// Set the clock stretch timeout in SCL cycles, 0 disables detection.
    pub fn set_clock_stretch_timeout(&self, cycles: u16) {
        self.inner.lock(|inner| {
            inner
                .registers
                .write(CLOCK_STRETCH_TIMEOUT, CLKT::TOUT.val(cycles.into()).value)
        })
    }

    /// Write all of `bytes` to the device at `address`.
    pub fn write(&self, address: u8, bytes: &[u8]) -> Result<()> {
        check_address(address)?;
        self.inner
            .lock(|inner| inner.write(address, bytes))
            .inspect_err(|e| warn!("BSC write to {:#04x} failed: {}", address, e))
    }

    /// Fill `buffer` from the device at `address`.
    pub fn read_into(&self, address: u8, buffer: &mut [u8]) -> Result<()> {
        check_address(address)?;
        self.inner
            .lock(|inner| inner.read(address, buffer))
            .inspect_err(|e| warn!("BSC read from {:#04x} failed: {}", address, e))
    }

    /// Release the pins and the register mappings.
    pub fn close(self) {}
}

impl<R, D, G> Drop for Bsc<R, D, G>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
    fn drop(&mut self) {
        // Leaving the pins on ALT0 would keep them tied to a controller
        // nobody drives any more.
        let pins = self.pins;
        self.inner.get_mut().set_pins(pins, Function::Input);
        debug!("BSC closed, SDA={} SCL={} back to input", pins.sda, pins.scl);
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl<R, D, G> ErrorType for Bsc<R, D, G>
where
    R: RegisterAccess,
    G: RegisterAccess,
{
    type Error = Error;
}

/// Adjacent operations of the same direction are merged into one transfer.
/// A change of direction ends the transfer with a stop and starts the next
/// one, since this controller mode has no repeated start. The whole
/// transaction holds the controller lock.
impl<R, D, G> I2c<SevenBitAddress> for Bsc<R, D, G>
where
    R: RegisterAccess,
    D: DelayNs,
    G: RegisterAccess,
{
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<()> {
        check_address(address)?;
        self.inner
            .lock(|inner| {
                for run in operations.chunk_by_mut(same_direction) {
                    if let [Operation::Write(_), ..] = run {
                        inner.write(address, &gather(run))?;
                    } else {
                        let mut bytes = vec![0; run.iter().map(operation_len).sum()];
                        inner.read(address, &mut bytes)?;
                        scatter(run, &bytes);
                    }
                }
                Ok(())
            })
            .inspect_err(|e| warn!("BSC transaction with {:#04x} failed: {}", address, e))
    }
}

fn same_direction(a: &Operation<'_>, b: &Operation<'_>) -> bool {
    matches!(
        (a, b),
        (Operation::Read(_), Operation::Read(_)) | (Operation::Write(_), Operation::Write(_))
    )
}

fn operation_len(operation: &Operation<'_>) -> usize {
    match operation {
        Operation::Read(buffer) => buffer.len(),
        Operation::Write(bytes) => bytes.len(),
    }
}

/// Concatenate a run of writes into one transfer.
fn gather(run: &[Operation<'_>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(run.iter().map(operation_len).sum());
    for operation in run {
        if let Operation::Write(chunk) = operation {
            bytes.extend_from_slice(chunk);
        }
    }
    bytes
}

/// Split the bytes of one read transfer across a run of read buffers.
fn scatter(run: &mut [Operation<'_>], mut bytes: &[u8]) {
    for operation in run {
        if let Operation::Read(buffer) = operation {
            let (head, rest) = bytes.split_at(buffer.len());
            buffer.copy_from_slice(head);
            bytes = rest;
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
