/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Physical memory mapping capability consumed by the driver.

/// Size of one peripheral register block mapping.
pub const BLOCK_SIZE: usize = 4096;

/// Memory mapping interfaces.
pub mod interface {
    use crate::{mmio::interface::RegisterAccess, Result};

    /// Maps physical register blocks into the process address space.
    ///
    /// Opening `/dev/mem` (or `/dev/gpiomem`) and calling `mmap` is left to the
    /// implementor. Dropping a returned region must unmap it.
    pub trait MemoryMapper {
        /// The mapped block.
        type Region: RegisterAccess;

        /// Map `size` bytes starting at physical address `phys_addr`.
        ///
        /// Failures are reported as [`crate::Error::MappingFailed`].
        fn map(&mut self, phys_addr: usize, size: usize) -> Result<Self::Region>;
    }
}
