//! The pull-up/down programming sequence.
//!
//! The pull resistors are changed by clocking a control signal into the pads, with setup and
//! hold times around the clock (BCM2835 ARM Peripherals, page 101):
//!
//! 1. Write the wanted state to `GPPUD`.
//! 2. Wait 150 cycles.
//! 3. Write a clock to the pads to modify in `GPPUDCLK0/1`, other pads keep their state.
//! 4. Wait 150 cycles.
//! 5. Write 0 to `GPPUD`.
//! 6. Write 0 to `GPPUDCLK0/1`.
//!
//! [`PullSequence`] walks through these steps as a state machine:
//!
//! ```
//! # use rpi_miniuart::{gpio::pull::{PullSequence, PinSet, Pull}, Registers};
//! # struct Nop;
//! # impl Registers for Nop {
//! #     fn read(&self, _: usize) -> u32 { 0 }
//! #     fn write(&self, _: usize, _: u32) {}
//! #     fn delay(&self, _: u32) {}
//! # }
//! PullSequence::new(&Nop, 0)
//!     .set_control(Pull::Up)
//!     .clock(PinSet::new())
//!     .clear_control()
//!     .clear_clock();
//! ```
//!
//! Each step consumes the previous state, so the steps cannot be skipped or reordered:
//!
//! ```compile_fail
//! # use rpi_miniuart::{gpio::pull::{PullSequence, PinSet, Pull}, Registers};
//! # struct Nop;
//! # impl Registers for Nop {
//! #     fn read(&self, _: usize) -> u32 { 0 }
//! #     fn write(&self, _: usize, _: u32) {}
//! #     fn delay(&self, _: u32) {}
//! # }
//! // The clock cannot be given before the control signal.
//! PullSequence::new(&Nop, 0).clock(PinSet::new());
//! ```
//!
//! ```compile_fail
//! # use rpi_miniuart::{gpio::pull::{PullSequence, PinSet, Pull}, Registers};
//! # struct Nop;
//! # impl Registers for Nop {
//! #     fn read(&self, _: usize) -> u32 { 0 }
//! #     fn write(&self, _: usize, _: u32) {}
//! #     fn delay(&self, _: u32) {}
//! # }
//! // The clock must be removed after the control signal, not before.
//! PullSequence::new(&Nop, 0).set_control(Pull::Up).clock(PinSet::new()).clear_clock();
//! ```

use core::marker::PhantomData;

use crate::{impl_sealed, mmio::Registers, Sealed};

use super::{Pin, PIN_COUNT};

/// GPIO Pin Pull-up/down Enable
/// BCM2835 ARM Peripherals, page 100
pub(crate) const PULL_CONTROL_OFFSET: usize = 0x94;
/// GPIO Pin Pull-up/down Enable Clock 0, followed by clock 1
/// BCM2835 ARM Peripherals, page 101
pub(crate) const PULL_CLOCK_OFFSET: usize = 0x98;
/// GPPUDCLK0 covers pins 0-31, GPPUDCLK1 pins 32-53.
pub(crate) const PULL_CLOCK_BANKS: usize = 2;

/// Cycles to wait between the control signal and the clock.
pub const SETUP_CYCLES: u32 = 150;
/// Cycles to wait between the clock and the removal of the control signal.
pub const HOLD_CYCLES: u32 = 150;

/// The pull state of a pin. The `0b11` encoding is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum Pull {
    /// No pull resistor, the pin floats.
    Floating = 0b00,
    /// Pin is pulled down.
    Down = 0b01,
    /// Pin is pulled up.
    Up = 0b10,
}

/// A set of GPIO pins, as one mask per pull clock register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinSet([u32; PULL_CLOCK_BANKS]);

impl PinSet {
    pub const fn new() -> Self {
        Self([0; PULL_CLOCK_BANKS])
    }

    pub const fn with(self, pin: Pin) -> Self {
        let mut banks = self.0;
        banks[pin.pull_clock_bank()] |= 1 << pin.pull_clock_bit();
        Self(banks)
    }

    pub const fn contains(self, pin: Pin) -> bool {
        self.0[pin.pull_clock_bank()] & 1 << pin.pull_clock_bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0[0] == 0 && self.0[1] == 0
    }

    /// The mask of this set in pull clock register `bank` (0 for pins 0-31, 1 for pins 32-53).
    ///
    /// There is no register past bank 1, so its mask is empty.
    pub const fn bank(self, bank: usize) -> u32 {
        if bank < PULL_CLOCK_BANKS {
            self.0[bank]
        } else {
            0
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Pin> {
        (0..PIN_COUNT)
            .filter_map(Pin::new)
            .filter(move |pin| self.contains(*pin))
    }
}

impl From<Pin> for PinSet {
    fn from(pin: Pin) -> Self {
        PinSet::new().with(pin)
    }
}

impl FromIterator<Pin> for PinSet {
    fn from_iter<I: IntoIterator<Item = Pin>>(iter: I) -> Self {
        iter.into_iter().fold(PinSet::new(), PinSet::with)
    }
}

/// Nothing is driven.
pub struct Idle;
/// `GPPUD` holds the new state and the setup time has elapsed.
pub struct ControlSet;
/// The pads have been clocked and the hold time has elapsed.
pub struct Clocked;
/// `GPPUD` has been cleared, the clock is still asserted.
pub struct ControlCleared;

impl_sealed!(Idle, ControlSet, Clocked, ControlCleared);

#[allow(private_bounds)]
pub trait SequenceState: Sealed {}

impl SequenceState for Idle {}
impl SequenceState for ControlSet {}
impl SequenceState for Clocked {}
impl SequenceState for ControlCleared {}

/// One run of the pull programming sequence.
pub struct PullSequence<'a, R, S: SequenceState> {
    regs: &'a R,
    gpio_base: usize,
    clocked: PinSet,
    _state: PhantomData<S>,
}

impl<'a, R: Registers, S: SequenceState> PullSequence<'a, R, S> {
    fn advance<T: SequenceState>(self) -> PullSequence<'a, R, T> {
        PullSequence {
            regs: self.regs,
            gpio_base: self.gpio_base,
            clocked: self.clocked,
            _state: PhantomData,
        }
    }

    fn control_register(&self) -> usize {
        self.gpio_base + PULL_CONTROL_OFFSET
    }

    fn clock_register(&self, bank: usize) -> usize {
        self.gpio_base + PULL_CLOCK_OFFSET + 4 * bank
    }

    /// The clock registers covering the pins of this sequence, with their masks.
    fn clock_banks(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        (0..PULL_CLOCK_BANKS)
            .map(|bank| (self.clock_register(bank), self.clocked.bank(bank)))
            .filter(|(_, mask)| *mask != 0)
    }
}

impl<'a, R: Registers> PullSequence<'a, R, Idle> {
    /// Start a sequence for the GPIO block at `gpio_base`.
    pub fn new(regs: &'a R, gpio_base: usize) -> Self {
        regs.barrier();
        Self {
            regs,
            gpio_base,
            clocked: PinSet::new(),
            _state: PhantomData,
        }
    }

    /// Steps 1 and 2: drive the control signal and wait for the setup time.
    #[must_use = "the pull sequence must be run to completion"]
    pub fn set_control(self, pull: Pull) -> PullSequence<'a, R, ControlSet> {
        trace!("pull sequence: control {=u32}", pull as u32);
        self.regs.write(self.control_register(), pull as u32);
        self.regs.delay(SETUP_CYCLES);
        self.advance()
    }
}

impl<'a, R: Registers> PullSequence<'a, R, ControlSet> {
    /// Steps 3 and 4: clock the control signal into `pins` and wait for the hold time.
    #[must_use = "the pull sequence must be run to completion"]
    pub fn clock(mut self, pins: PinSet) -> PullSequence<'a, R, Clocked> {
        self.clocked = pins;
        for (address, mask) in self.clock_banks() {
            self.regs.write(address, mask);
        }
        self.regs.delay(HOLD_CYCLES);
        self.advance()
    }
}

impl<'a, R: Registers> PullSequence<'a, R, Clocked> {
    /// Step 5: remove the control signal.
    #[must_use = "the pull sequence must be run to completion"]
    pub fn clear_control(self) -> PullSequence<'a, R, ControlCleared> {
        self.regs.write(self.control_register(), 0);
        self.advance()
    }
}

impl<'a, R: Registers> PullSequence<'a, R, ControlCleared> {
    /// Step 6: remove the clock. The pads now hold their new state.
    pub fn clear_clock(self) -> PullSequence<'a, R, Idle> {
        for (address, _) in self.clock_banks() {
            self.regs.write(address, 0);
        }
        let mut idle: PullSequence<'a, R, Idle> = self.advance();
        idle.clocked = PinSet::new();
        idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gpio::Gpio,
        mmio::{
            sim::{Access, SimRegisters},
            PeripheralMap,
        },
    };

    const MAP: PeripheralMap = PeripheralMap::BCM2837;
    const GPPUD: usize = 0x3F20_0094;
    const GPPUDCLK0: usize = 0x3F20_0098;
    const GPPUDCLK1: usize = 0x3F20_009C;

    fn pins(indices: &[u8]) -> PinSet {
        indices.iter().filter_map(|&index| Pin::new(index)).collect()
    }

    #[test]
    fn pin_set_banks() {
        let set = pins(&[0, 14, 15, 31, 32, 53]);
        assert_eq!(set.bank(0), (1 << 0) | (1 << 14) | (1 << 15) | (1 << 31));
        assert_eq!(set.bank(1), (1 << 0) | (1 << 21));
        assert!(set.contains(Pin::GPIO14));
        assert!(!set.contains(Pin::new(16).unwrap()));
        assert_eq!(set.iter().map(Pin::index).collect::<Vec<_>>(), [0, 14, 15, 31, 32, 53]);
        assert!(PinSet::new().is_empty());
        assert_eq!(PinSet::from(Pin::GPIO15).bank(0), 1 << 15);
    }

    #[test]
    fn pin_set_has_two_banks() {
        let set = pins(&[3, 53]);
        assert_eq!(set.bank(2), 0);
        assert_eq!(set.bank(usize::MAX), 0);
        assert!(!set.is_empty());
        assert!(pins(&[]).is_empty());
    }

    #[test]
    fn sequence_order_for_the_uart_pins() {
        let sim = SimRegisters::new();
        Gpio::new(&sim, &MAP).set_pull(pins(&[14, 15]), Pull::Floating);

        assert_eq!(
            sim.log(),
            [
                Access::Barrier,
                Access::Write(GPPUD, 0b00),
                Access::Delay(SETUP_CYCLES),
                Access::Write(GPPUDCLK0, (1 << 14) | (1 << 15)),
                Access::Delay(HOLD_CYCLES),
                Access::Write(GPPUD, 0),
                Access::Write(GPPUDCLK0, 0),
            ]
        );
    }

    #[test]
    fn state_codes_reach_the_control_register() {
        for (pull, code) in [(Pull::Floating, 0b00), (Pull::Down, 0b01), (Pull::Up, 0b10)] {
            let sim = SimRegisters::new();
            Gpio::new(&sim, &MAP).set_pull(pins(&[4]), pull);
            assert_eq!(sim.writes_to(GPPUD), [code, 0]);
            assert_eq!(sim.writes_to(GPPUDCLK0), [1 << 4, 0]);
        }
    }

    #[test]
    fn upper_pins_use_the_second_clock() {
        let sim = SimRegisters::new();
        Gpio::new(&sim, &MAP).set_pull(pins(&[32, 33]), Pull::Up);

        assert!(sim.writes_to(GPPUDCLK0).is_empty());
        assert_eq!(sim.writes_to(GPPUDCLK1), [0b11, 0]);
    }

    #[test]
    fn both_clocks_when_the_set_spans_banks() {
        let sim = SimRegisters::new();
        Gpio::new(&sim, &MAP).set_pull(pins(&[31, 32]), Pull::Down);

        assert_eq!(
            sim.log(),
            [
                Access::Barrier,
                Access::Write(GPPUD, 0b01),
                Access::Delay(SETUP_CYCLES),
                Access::Write(GPPUDCLK0, 1 << 31),
                Access::Write(GPPUDCLK1, 1),
                Access::Delay(HOLD_CYCLES),
                Access::Write(GPPUD, 0),
                Access::Write(GPPUDCLK0, 0),
                Access::Write(GPPUDCLK1, 0),
            ]
        );
    }

    #[test]
    fn unclocked_pads_keep_their_state() {
        let sim = SimRegisters::with_pads(MAP.gpio_base, Pull::Down);
        Gpio::new(&sim, &MAP).set_pull(pins(&[14, 15]), Pull::Floating);

        for index in 0..PIN_COUNT {
            let expected = match index {
                14 | 15 => Pull::Floating,
                _ => Pull::Down,
            };
            assert_eq!(sim.pad(index), expected as u32, "pin {index}");
        }
    }

    #[test]
    fn sequence_can_be_driven_step_by_step() {
        let sim = SimRegisters::with_pads(MAP.gpio_base, Pull::Floating);
        let idle = PullSequence::new(&sim, MAP.gpio_base);
        let control_set = idle.set_control(Pull::Up);
        assert_eq!(sim.pad(47), Pull::Floating as u32);
        let clocked = control_set.clock(pins(&[47]));
        assert_eq!(sim.pad(47), Pull::Up as u32);
        let _idle = clocked.clear_control().clear_clock();

        assert_eq!(sim.get(GPPUD), 0);
        assert_eq!(sim.get(GPPUDCLK1), 0);
        assert_eq!(sim.pad(47), Pull::Up as u32);
        assert_eq!(sim.pad(46), Pull::Floating as u32);
    }
}
