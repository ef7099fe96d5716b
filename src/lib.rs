//! Polled console driver for the Raspberry Pi auxiliary "Mini UART".
//!
//! The crate is split the same way the hardware is:
//! - [`mmio`] reads and writes 32-bit registers, and owns the peripheral address map,
//! - [`gpio`] routes pins to the Mini UART and switches their pull resistors off,
//! - [`aux::uart`] programs the serial engine and moves bytes in and out of it.
//!
//! Every driver is generic over [`Registers`], so the register sequences can run against
//! real hardware through [`Mmio`] or against an in-memory bank on the host.

// IMPORTANT: Every public operation issues a memory barrier before its first register access, so
// accesses to two different peripherals are always separated by one.
// That is because the BCM2835 says that two reads to different peripherals can come out of order.
// See the BCM2835 manual section 1.3 for more details.
#![cfg_attr(not(test), no_std)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![deny(unsafe_op_in_unsafe_fn)]

// This must go first, so that the other modules see its macros.
mod fmt;

pub mod aux;
pub mod gpio;
pub mod mmio;

pub use aux::uart::{self, Config, Error, MiniUart};
pub use mmio::{data_memory_barrier, Mmio, PeripheralMap, Registers};

trait Sealed {}

macro_rules! impl_sealed {
    ($($t:ty),*) => {
        $(
            impl Sealed for $t {}
        )*
    };
}
pub(crate) use impl_sealed;
