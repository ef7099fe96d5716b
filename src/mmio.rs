//! Raw access to memory-mapped peripheral registers.

use core::{
    hint::black_box,
    ptr::{read_volatile, write_volatile},
};

#[cfg(test)]
pub(crate) mod sim;

/// Peripheral base of the BCM2835 (Raspberry Pi 1 and Zero), as seen by the ARM core.
pub const BCM2835_PERIPHERAL_BASE: usize = 0x2000_0000;
/// Peripheral base of the BCM2837 (Raspberry Pi 3), as seen by the ARM core.
pub const BCM2837_PERIPHERAL_BASE: usize = 0x3F00_0000;

const GPIO_OFFSET: usize = 0x20_0000;
const AUX_OFFSET: usize = 0x21_5000;

/// Where the register blocks used by this crate live.
///
/// Only the peripheral base differs between SoCs, the blocks are laid out identically below it.
/// See the BCM2835 ARM Peripherals manual, sections 2.1 and 6.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralMap {
    /// Base of the GPIO block (`GPFSEL0`).
    pub gpio_base: usize,
    /// Base of the auxiliary peripherals block (`AUX_IRQ`).
    pub aux_base: usize,
}

impl PeripheralMap {
    pub const BCM2835: Self = Self::from_peripheral_base(BCM2835_PERIPHERAL_BASE);
    pub const BCM2837: Self = Self::from_peripheral_base(BCM2837_PERIPHERAL_BASE);

    pub const fn from_peripheral_base(base: usize) -> Self {
        Self {
            gpio_base: base + GPIO_OFFSET,
            aux_base: base + AUX_OFFSET,
        }
    }
}

impl Default for PeripheralMap {
    fn default() -> Self {
        Self::BCM2837
    }
}

/// Access to 32-bit hardware registers by absolute address.
///
/// Implementations must not cache or merge accesses: every `read` and `write` has to reach
/// the register, in program order.
pub trait Registers {
    /// Read the current value of the register at `address`.
    fn read(&self, address: usize) -> u32;

    /// Store `value` into the register at `address`.
    fn write(&self, address: usize, value: u32);

    /// Busy-wait for about `cycles` processor cycles.
    ///
    /// Only used to meet setup and hold times of the hardware.
    fn delay(&self, cycles: u32);

    /// Order the accesses made so far before the ones that follow.
    ///
    /// Issued when switching from one peripheral to another, see the BCM2835 manual section 1.3.
    fn barrier(&self) {}
}

impl<R: Registers + ?Sized> Registers for &R {
    fn read(&self, address: usize) -> u32 {
        R::read(self, address)
    }

    fn write(&self, address: usize, value: u32) {
        R::write(self, address, value)
    }

    fn delay(&self, cycles: u32) {
        R::delay(self, cycles)
    }

    fn barrier(&self) {
        R::barrier(self)
    }
}

/// The real register file, accessed through volatile loads and stores.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Get access to the hardware registers.
    ///
    /// # Safety
    ///
    /// Every address later passed to this value must be a valid peripheral register of the
    /// running SoC, which means the [`PeripheralMap`] given to the drivers must match the board.
    /// The caller must also make sure nothing else reconfigures the same registers concurrently.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Registers for Mmio {
    fn read(&self, address: usize) -> u32 {
        // Safety: The address is a peripheral register, as required by `Mmio::new`.
        unsafe { read_volatile(address as *const u32) }
    }

    fn write(&self, address: usize, value: u32) {
        // Safety: The address is a peripheral register, as required by `Mmio::new`.
        unsafe { write_volatile(address as *mut u32, value) }
    }

    fn delay(&self, cycles: u32) {
        delay(cycles)
    }

    fn barrier(&self) {
        data_memory_barrier()
    }
}

/// Spin for roughly `cycles` iterations.
///
/// `black_box` keeps the loop from being folded away.
pub fn delay(mut cycles: u32) {
    while cycles > 0 {
        cycles -= 1;
        black_box(cycles);
    }
}

/// Perform a data memory barrier operation.
///
/// All explicit memory accesses occurring in program order before this operation
/// will be globally observed before any memory accesses occurring in program
/// order after this operation. This includes both read and write accesses.
///
/// On hosts without a peripheral bus this degrades to a sequentially consistent fence.
pub fn data_memory_barrier() {
    #[cfg(target_arch = "aarch64")]
    // Safety: `dmb sy` only orders memory accesses, see the ARMv8-A manual section C6.2.81.
    unsafe {
        core::arch::asm!("dmb sy", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "arm")]
    // Safety: The operation is defined in the ARMv6 manual. See section B2.6.1 of the ARMv6 manual,
    // and section 3.2.22 of the ARM1176JZFS manual.
    unsafe {
        core::arch::asm!("mcr p15, 0, {}, c7, c10, 5", in(reg) 0, options(nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
