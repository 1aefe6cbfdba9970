/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Test doubles for register blocks.
//!
//! Both doubles implement only the single-shot accesses, so every settled
//! access from the driver shows up twice in their logs, as it would on the
//! bus to the real peripheral.

use {
    crate::{
        bsc::{
            Status, C, CLOCK_STRETCH_TIMEOUT, CONTROL, DATA_LENGTH, DIVIDER, FIFO, FIFO_DEPTH, S,
            SLAVE_ADDRESS, STATUS,
        },
        memory::interface::MemoryMapper,
        mmio::interface::RegisterAccess,
        Error, Result,
    },
    embedded_hal::delay::DelayNs,
    std::{
        collections::VecDeque,
        sync::{Arc, Mutex, MutexGuard},
    },
};

/// One physical register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(usize, u32),
    Write(usize, u32),
}

//--------------------------------------------------------------------------------------------------
// Plain register file
//--------------------------------------------------------------------------------------------------

struct FakeState {
    words: Vec<u32>,
    accesses: Vec<Access>,
}

/// Array-backed registers with no side effects. Clones share storage.
#[derive(Clone)]
pub struct FakeRegisters {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRegisters {
    pub fn new(words: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                words: vec![0; words],
                accesses: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Set a register without logging an access.
    pub fn preset(&self, offset: usize, value: u32) {
        self.state().words[offset / 4] = value;
    }

    /// Read a register without logging an access.
    pub fn peek(&self, offset: usize) -> u32 {
        self.state().words[offset / 4]
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.state().accesses.clone()
    }
}

impl RegisterAccess for FakeRegisters {
    fn read_once(&self, offset: usize) -> u32 {
        let mut state = self.state();
        let value = state.words[offset / 4];
        state.accesses.push(Access::Read(offset, value));
        value
    }

    fn write_once(&self, offset: usize, value: u32) {
        let mut state = self.state();
        state.words[offset / 4] = value;
        state.accesses.push(Access::Write(offset, value));
    }
}

/// Hands out fresh register files and remembers what was asked for.
#[derive(Default)]
pub struct FakeMapper {
    fail: bool,
    mapped: Vec<(usize, usize)>,
}

impl FakeMapper {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn mapped(&self) -> Vec<(usize, usize)> {
        self.mapped.clone()
    }
}

impl MemoryMapper for FakeMapper {
    type Region = FakeRegisters;

    fn map(&mut self, phys_addr: usize, size: usize) -> Result<FakeRegisters> {
        if self.fail {
            return Err(Error::MappingFailed { phys_addr });
        }
        self.mapped.push((phys_addr, size));
        Ok(FakeRegisters::new(size / 4))
    }
}

//--------------------------------------------------------------------------------------------------
// Simulated controller
//--------------------------------------------------------------------------------------------------

/// Misbehaviour to inject into the next transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// ERR and DONE as soon as the transfer starts.
    Nack,
    /// CLKT and DONE as soon as the transfer starts.
    ClockStretch,
    /// ERR, CLKT and DONE as soon as the transfer starts.
    NackAndClockStretch,
    /// DONE after this many bytes crossed the wire.
    DoneAfter(usize),
    /// Read data and DONE arrive right after the next settled status read.
    LateArrival,
}

struct SimState {
    control: u32,
    flags: u32,
    data_length: u32,
    address: u32,
    divider: u32,
    clock_stretch_timeout: u32,
    /// A status clear arms the next start; the settled double write of the
    /// control register then starts one transfer, not two.
    armed: bool,
    active: bool,
    reading: bool,
    moved: usize,
    tx_fifo: VecDeque<u8>,
    rx_fifo: VecDeque<u8>,
    responses: VecDeque<u8>,
    fault: Fault,
    late_reads: usize,
    transfers: Vec<(u32, Vec<u8>)>,
    written: Vec<u8>,
    control_history: Vec<u32>,
    delays: Vec<u32>,
    accesses: Vec<Access>,
}

impl SimState {
    fn limit(&self) -> usize {
        let length = self.data_length as usize;
        match self.fault {
            Fault::DoneAfter(n) => n.min(length),
            _ => length,
        }
    }

    fn status(&self) -> u32 {
        let mut status = self.flags;
        if self.active {
            status |= S::TA::SET.value;
        }
        if !self.reading && self.tx_fifo.len() < FIFO_DEPTH {
            status |= S::TXD::SET.value;
        }
        if self.tx_fifo.is_empty() {
            status |= S::TXE::SET.value;
        }
        if !self.rx_fifo.is_empty() {
            status |= S::RXD::SET.value;
        }
        if self.rx_fifo.len() == FIFO_DEPTH {
            status |= S::RXF::SET.value;
        }
        status
    }

    fn done(&mut self) {
        self.flags |= S::DONE::SET.value;
        self.active = false;
    }

    fn start(&mut self, control: u32) {
        self.armed = false;
        self.reading = control & C::READ::Read.value != 0;
        self.moved = 0;
        match self.fault {
            Fault::Nack => self.flags |= (S::ERR::SET + S::DONE::SET).value,
            Fault::ClockStretch => self.flags |= (S::CLKT::SET + S::DONE::SET).value,
            Fault::NackAndClockStretch => {
                self.flags |= (S::ERR::SET + S::CLKT::SET + S::DONE::SET).value
            }
            _ => {
                self.active = true;
                self.transfers.push((self.address, Vec::new()));
                if self.limit() == 0 {
                    self.done();
                }
            }
        }
    }

    /// Let bus time pass: move queued bytes out, or incoming bytes in.
    fn elapse(&mut self, ns: u32) {
        self.delays.push(ns);
        if !self.active {
            return;
        }
        if self.reading && self.fault == Fault::LateArrival {
            self.late_reads = 2;
            return;
        }
        if self.reading {
            self.receive();
        } else {
            while self.moved < self.limit() {
                let Some(byte) = self.tx_fifo.pop_front() else {
                    break;
                };
                self.record(byte);
            }
            if self.moved == self.limit() {
                self.done();
            }
        }
    }

    fn receive(&mut self) {
        while self.rx_fifo.len() < FIFO_DEPTH && self.moved < self.limit() {
            let Some(byte) = self.responses.pop_front() else {
                break;
            };
            self.rx_fifo.push_back(byte);
            self.record(byte);
        }
        if self.moved == self.limit() || self.responses.is_empty() {
            self.done();
        }
    }

    fn record(&mut self, byte: u8) {
        self.moved += 1;
        if !self.reading {
            self.written.push(byte);
        }
        if let Some((_, bytes)) = self.transfers.last_mut() {
            bytes.push(byte);
        }
    }

    fn read_status(&mut self) -> u32 {
        let status = self.status();
        if self.late_reads > 0 {
            self.late_reads -= 1;
            if self.late_reads == 0 {
                self.receive();
            }
        }
        status
    }

    fn write_control(&mut self, value: u32) {
        self.control_history.push(value);
        if value & C::CLEAR::SET.value != 0 {
            self.tx_fifo.clear();
            self.rx_fifo.clear();
        }
        // ST and CLEAR are self-clearing.
        self.control = value & !(C::ST::SET.value | C::CLEAR::SET.value);
        if value & C::ST::SET.value != 0 && self.armed {
            self.start(value);
        }
    }

    fn push_fifo(&mut self, value: u32) {
        if self.active && !self.reading && self.tx_fifo.len() < FIFO_DEPTH {
            self.tx_fifo.push_back(value as u8);
        }
    }
}

/// A BSC controller with a device that accepts everything written to it
/// and answers reads from a canned response queue.
///
/// Bus time only passes through [`SimDelay`]: bytes leave the TX FIFO and
/// enter the RX FIFO while the driver sleeps.
#[derive(Clone)]
pub struct SimulatedBsc {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBsc {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                control: 0,
                flags: 0,
                data_length: 0,
                address: 0,
                // Reset values.
                divider: 0x5dc,
                clock_stretch_timeout: 0x40,
                armed: false,
                active: false,
                reading: false,
                moved: 0,
                tx_fifo: VecDeque::new(),
                rx_fifo: VecDeque::new(),
                responses: VecDeque::new(),
                fault: Fault::None,
                late_reads: 0,
                transfers: Vec::new(),
                written: Vec::new(),
                control_history: Vec::new(),
                delays: Vec::new(),
                accesses: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    /// Queue bytes the device returns on reads.
    pub fn respond_with(&self, bytes: &[u8]) {
        self.state().responses.extend(bytes);
    }

    pub fn inject(&self, fault: Fault) {
        self.state().fault = fault;
    }

    /// Register content as the driver would read it, without logging.
    pub fn register(&self, offset: usize) -> u32 {
        let state = self.state();
        match offset {
            CONTROL => state.control,
            STATUS => state.status(),
            DATA_LENGTH => state.data_length,
            SLAVE_ADDRESS => state.address,
            DIVIDER => state.divider,
            CLOCK_STRETCH_TIMEOUT => state.clock_stretch_timeout,
            _ => 0,
        }
    }

    pub fn status_flags(&self) -> Status {
        Status::new(self.register(STATUS))
    }

    /// Physical writes to `offset`.
    pub fn writes_to(&self, offset: usize) -> usize {
        self.state()
            .accesses
            .iter()
            .filter(|a| matches!(a, Access::Write(o, _) if *o == offset))
            .count()
    }

    pub fn fifo_accesses(&self) -> usize {
        self.state()
            .accesses
            .iter()
            .filter(|a| matches!(a, Access::Read(FIFO, _) | Access::Write(FIFO, _)))
            .count()
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.state().accesses.clone()
    }

    /// Every started transfer with the bytes that crossed the wire.
    pub fn transfers(&self) -> Vec<(u32, Vec<u8>)> {
        self.state().transfers.clone()
    }

    /// All bytes written to devices, in order.
    pub fn received(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    pub fn control_history(&self) -> Vec<u32> {
        self.state().control_history.clone()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.state().delays.clone()
    }
}

impl RegisterAccess for SimulatedBsc {
    fn read_once(&self, offset: usize) -> u32 {
        let mut state = self.state();
        let value = match offset {
            STATUS => state.read_status(),
            FIFO => state.rx_fifo.pop_front().map_or(0, u32::from),
            CONTROL => state.control,
            DATA_LENGTH => state.data_length,
            SLAVE_ADDRESS => state.address,
            DIVIDER => state.divider,
            CLOCK_STRETCH_TIMEOUT => state.clock_stretch_timeout,
            _ => 0,
        };
        state.accesses.push(Access::Read(offset, value));
        value
    }

    fn write_once(&self, offset: usize, value: u32) {
        let mut state = self.state();
        state.accesses.push(Access::Write(offset, value));
        match offset {
            CONTROL => state.write_control(value),
            STATUS => {
                let clear = value & (S::CLKT::SET + S::ERR::SET + S::DONE::SET).value;
                state.flags &= !clear;
                state.armed = true;
            }
            DATA_LENGTH => state.data_length = value & 0xffff,
            SLAVE_ADDRESS => state.address = value & 0x7f,
            FIFO => state.push_fifo(value),
            // The divider is always rounded down to an even number.
            DIVIDER => state.divider = value & 0xfffe,
            CLOCK_STRETCH_TIMEOUT => state.clock_stretch_timeout = value & 0xffff,
            _ => {}
        }
    }
}

/// Sleeping on the simulated bus advances it.
pub struct SimDelay {
    bus: SimulatedBsc,
}

impl SimDelay {
    pub fn new(bus: &SimulatedBsc) -> Self {
        Self { bus: bus.clone() }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.bus.state().elapse(ns);
    }
}
