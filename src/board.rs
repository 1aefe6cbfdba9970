/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Board revisions and where their BSC controllers live.
//!
//! See BCM2835-ARM-Peripherals.pdf and
//! <https://www.raspberrypi.com/documentation/computers/raspberry-pi.html#raspberry-pi-revision-codes>

use crate::{bsc::BusPins, Error, Result};

/// SoC generation of a Raspberry Pi board, as far as BSC routing goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRevision {
    /// Model B revision 1, the only board with BSC0 on the main header.
    Model1Rev1,
    /// Every other BCM2835 board (B rev 2, A+, B+, Zero).
    Bcm2835,
    /// Pi 2 B.
    Bcm2836,
    /// Pi 3, Zero 2 and Pi 2 B v1.2.
    Bcm2837,
    /// Pi 4 and Pi 400.
    Bcm2711,
}

/// Physical addresses of the register blocks a bus needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusLayout {
    /// BSC controller register block.
    pub controller: usize,
    /// GPIO register block (function select lives at its start).
    pub gpio: usize,
}

#[derive(Clone, Copy)]
enum Controller {
    Bsc0,
    Bsc1,
}

struct Route {
    revision: BoardRevision,
    sda: u8,
    scl: u8,
    controller: Controller,
}

const GPIO_OFFSET: usize = 0x20_0000;
const BSC0_OFFSET: usize = 0x20_5000;
const BSC1_OFFSET: usize = 0x80_4000;

/// New-style revision codes set this bit.
const NEW_STYLE_FLAG: u32 = 1 << 23;
const PROCESSOR_SHIFT: u32 = 12;
const PROCESSOR_MASK: u32 = 0xf;
/// Old-style codes may carry the warranty bit on top.
const OLD_STYLE_MASK: u32 = 0xffff;

macro_rules! route {
    ($revision:ident, $sda:literal, $scl:literal => $controller:ident) => {
        Route {
            revision: BoardRevision::$revision,
            sda: $sda,
            scl: $scl,
            controller: Controller::$controller,
        }
    };
}

/// Which pin pairs reach which controller on each revision.
static ROUTES: &[Route] = &[
    route!(Model1Rev1, 0, 1 => Bsc0),
    route!(Bcm2835, 2, 3 => Bsc1),
    route!(Bcm2835, 0, 1 => Bsc0),
    route!(Bcm2836, 2, 3 => Bsc1),
    route!(Bcm2836, 0, 1 => Bsc0),
    route!(Bcm2837, 2, 3 => Bsc1),
    route!(Bcm2837, 0, 1 => Bsc0),
    route!(Bcm2711, 2, 3 => Bsc1),
    route!(Bcm2711, 0, 1 => Bsc0),
];

impl BoardRevision {
    /// Decode the revision code reported by the firmware (`/proc/cpuinfo`,
    /// `/proc/device-tree/system/linux,revision`).
    pub fn from_code(code: u32) -> Result<BoardRevision> {
        if code & NEW_STYLE_FLAG != 0 {
            return match (code >> PROCESSOR_SHIFT) & PROCESSOR_MASK {
                0 => Ok(BoardRevision::Bcm2835),
                1 => Ok(BoardRevision::Bcm2836),
                2 => Ok(BoardRevision::Bcm2837),
                3 => Ok(BoardRevision::Bcm2711),
                _ => Err(Error::UnknownBoardRevision { code }),
            };
        }
        match code & OLD_STYLE_MASK {
            0x0002 | 0x0003 => Ok(BoardRevision::Model1Rev1),
            0x0004..=0x0015 => Ok(BoardRevision::Bcm2835),
            _ => Err(Error::UnknownBoardRevision { code }),
        }
    }

    /// This returns the ARM-side physical address where peripherals are mapped.
    pub const fn peripheral_address(self) -> usize {
        match self {
            BoardRevision::Model1Rev1 | BoardRevision::Bcm2835 => 0x2000_0000,
            BoardRevision::Bcm2836 | BoardRevision::Bcm2837 => 0x3f00_0000,
            BoardRevision::Bcm2711 => 0xfe00_0000,
        }
    }

    /// Firmware default for the VPU core clock, which feeds the BSC divider.
    pub const fn core_clock_hz(self) -> u32 {
        match self {
            BoardRevision::Bcm2711 => 500_000_000,
            _ => 250_000_000,
        }
    }

    /// GPIO register block.
    pub const fn gpio_address(self) -> usize {
        self.peripheral_address() + GPIO_OFFSET
    }

    const fn controller_address(self, controller: Controller) -> usize {
        self.peripheral_address()
            + match controller {
                Controller::Bsc0 => BSC0_OFFSET,
                Controller::Bsc1 => BSC1_OFFSET,
            }
    }
}

/// Find the controller wired to `pins` on `revision`.
pub fn resolve(revision: BoardRevision, pins: BusPins) -> Result<BusLayout> {
    ROUTES
        .iter()
        .find(|route| route.revision == revision && route.sda == pins.sda && route.scl == pins.scl)
        .map(|route| BusLayout {
            controller: revision.controller_address(route.controller),
            gpio: revision.gpio_address(),
        })
        .ok_or(Error::InvalidPinPair {
            sda: pins.sda,
            scl: pins.scl,
        })
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
