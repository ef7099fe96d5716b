//! GPIO function selection and pull resistor control.
//!
//! Pin configuration lives only in the hardware. Several pins share each register, so every
//! change is a read-modify-write of the containing register.

pub mod pull;

use crate::{
    mmio::{PeripheralMap, Registers},
    uart::Error,
};

pub use pull::{Pull, PinSet};

/// GPIO Function Select 0, followed by GPFSEL1..GPFSEL5.
/// BCM2835 ARM Peripherals, page 91
const FUNCTION_SELECT_OFFSET: usize = 0x00;

/// Number of GPIO pins on the BCM2835/BCM2837, numbered `0..PIN_COUNT`.
pub const PIN_COUNT: u8 = 54;

/// A GPIO pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin(u8);

impl Pin {
    /// Mini UART TXD1 on ALT5.
    pub const GPIO14: Pin = Pin(14);
    /// Mini UART RXD1 on ALT5.
    pub const GPIO15: Pin = Pin(15);

    /// Returns `None` if `index` is not a pin of the GPIO block.
    pub const fn new(index: u8) -> Option<Self> {
        if index < PIN_COUNT {
            Some(Pin(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Offset of the GPFSELn register holding this pin's function field.
    const fn function_select_offset(self) -> usize {
        FUNCTION_SELECT_OFFSET + 4 * (self.0 as usize / 10)
    }

    /// Position of this pin's 3-bit function field.
    const fn function_shift(self) -> u32 {
        (self.0 as u32 % 10) * 3
    }

    /// Which of GPPUDCLK0/GPPUDCLK1 clocks this pin.
    pub(crate) const fn pull_clock_bank(self) -> usize {
        self.0 as usize / 32
    }

    pub(crate) const fn pull_clock_bit(self) -> u32 {
        self.0 as u32 % 32
    }
}

impl TryFrom<u8> for Pin {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Pin::new(index).ok_or(Error::InvalidPin { pin: index })
    }
}

/// The function of a pin, with its hardware encoding.
///
/// The alternate functions are not numbered in order, see the BCM2835 manual section 6.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum Function {
    Input = 0b000,
    Output = 0b001,
    Alternate0 = 0b100,
    Alternate1 = 0b101,
    Alternate2 = 0b110,
    Alternate3 = 0b111,
    Alternate4 = 0b011,
    Alternate5 = 0b010,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::Input,
        Function::Output,
        Function::Alternate0,
        Function::Alternate1,
        Function::Alternate2,
        Function::Alternate3,
        Function::Alternate4,
        Function::Alternate5,
    ];

    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decode a function field. Only the low 3 bits are looked at, and every 3-bit value is a
    /// function.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0b000 => Function::Input,
            0b001 => Function::Output,
            0b100 => Function::Alternate0,
            0b101 => Function::Alternate1,
            0b110 => Function::Alternate2,
            0b111 => Function::Alternate3,
            0b011 => Function::Alternate4,
            _ => Function::Alternate5,
        }
    }
}

/// The GPIO block.
pub struct Gpio<R> {
    regs: R,
    base: usize,
}

impl<R: Registers> Gpio<R> {
    pub fn new(regs: R, map: &PeripheralMap) -> Self {
        Self {
            regs,
            base: map.gpio_base,
        }
    }

    /// Select the function of `pin`, leaving every other pin of the register untouched.
    pub fn set_function(&mut self, pin: Pin, function: Function) {
        let address = self.base + pin.function_select_offset();
        let shift = pin.function_shift();
        self.regs.barrier();
        let func_sel = self.regs.read(address);
        self.regs
            .write(address, (func_sel & !(0b111 << shift)) | (function.bits() << shift));
        trace!("gpio {=u8} function {}", pin.index(), function.bits());
    }

    /// Read back the function currently selected for `pin`.
    pub fn function(&self, pin: Pin) -> Function {
        self.regs.barrier();
        let func_sel = self.regs.read(self.base + pin.function_select_offset());
        self.regs.barrier();
        Function::from_bits(func_sel >> pin.function_shift())
    }

    /// Switch the pull resistors of every pin in `pins` to `pull`.
    ///
    /// Pins outside of `pins` keep their current pull state.
    pub fn set_pull(&mut self, pins: PinSet, pull: Pull) {
        pull::PullSequence::new(&self.regs, self.base)
            .set_control(pull)
            .clock(pins)
            .clear_control()
            .clear_clock();
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn free(self) -> R {
        self.regs
    }
}
