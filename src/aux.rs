//! The auxiliary peripherals block. Only the Mini UART is driven.

use bitflags::bitflags;

pub mod uart;

/// Auxiliary enables
/// BCM2835 ARM Peripherals, page 9
pub(crate) const ENABLES_OFFSET: usize = 0x04;

bitflags! {
    /// Bits of the auxiliary enables register.
    ///
    /// While a peripheral is disabled its registers cannot be accessed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Enables: u32 {
        const MINI_UART = 1;
        const SPI1 = 1 << 1;
        const SPI2 = 1 << 2;
    }
}
