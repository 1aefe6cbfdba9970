/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Register access with the BCM283x peripheral settling rule.
//!
//! From the BCM2835 ARM Peripherals manual, section 1.3: the system does not
//! guarantee that data arrives in order when accesses switch between
//! peripherals. A read following an access to a different peripheral may
//! return data belonging to the previous one, and a write may be lost.
//! Every settled access is therefore performed twice: the first read is
//! discarded, and the write is simply repeated with the same value.

use core::ptr::{self, NonNull};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Register access interfaces.
pub mod interface {

    /// Word access to a block of 32-bit registers addressed by byte offset.
    ///
    /// Implementations provide single-shot accesses; the settled `read` and
    /// `write` are built on top and are what register-level code should use.
    /// Test doubles that implement only the single-shot methods therefore see
    /// the same double-access pattern as real hardware.
    ///
    /// Offsets are relative to the start of the mapped block and must lie
    /// within it.
    pub trait RegisterAccess {
        /// One volatile read.
        fn read_once(&self, offset: usize) -> u32;

        /// One volatile write.
        fn write_once(&self, offset: usize, value: u32);

        /// Read a register, discarding the first (possibly stale) result.
        fn read(&self, offset: usize) -> u32 {
            let _ = self.read_once(offset);
            self.read_once(offset)
        }

        /// Write a register twice with the same value.
        fn write(&self, offset: usize, value: u32) {
            self.write_once(offset, value);
            self.write_once(offset, value);
        }

        /// Read-modify-write touching only the bits set in `mask`.
        fn write_masked(&self, offset: usize, value: u32, mask: u32) {
            let current = self.read(offset);
            self.write(offset, (current & !mask) | (value & mask));
        }
    }
}

/// A mapped register block accessed through a raw pointer.
pub struct MmioRegion {
    base: NonNull<u32>,
    size: usize,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

// The region is plain device memory; exclusivity is the owner's business.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// Wrap an already mapped block of `size` bytes.
    ///
    /// # Safety
    ///
    /// `base` must be word aligned and point at `size` bytes of mapped device
    /// memory that stay mapped for the lifetime of the region.
    pub unsafe fn new(base: NonNull<u32>, size: usize) -> Self {
        Self { base, size }
    }

    /// Base of the mapped block.
    pub fn base(&self) -> NonNull<u32> {
        self.base
    }

    /// Mapped size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    fn register(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset % 4 == 0, "unaligned register offset {offset:#x}");
        debug_assert!(
            offset + 4 <= self.size,
            "register offset {offset:#x} outside {:#x}-byte region",
            self.size
        );
        // Guarantees: offset lies within the mapped block by contract of new().
        unsafe { self.base.as_ptr().byte_add(offset) }
    }
}

impl interface::RegisterAccess for MmioRegion {
    fn read_once(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.register(offset)) }
    }

    fn write_once(&self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile(self.register(offset), value) }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
