//! In-memory register bank for host tests.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    vec::Vec,
};

use super::Registers;
use crate::gpio::{
    pull::{Pull, PULL_CLOCK_OFFSET, PULL_CONTROL_OFFSET},
    PIN_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(usize, u32),
    Write(usize, u32),
    Delay(u32),
    Barrier,
}

/// Latches the pull-control value into the pads whose clock bit is written as 1, the way
/// the GPIO block does.
struct Pads {
    control: usize,
    clocks: [usize; 2],
    state: [u32; PIN_COUNT as usize],
}

#[derive(Default)]
struct Bank {
    values: HashMap<usize, u32>,
    scripted: HashMap<usize, VecDeque<u32>>,
    log: Vec<Access>,
    pads: Option<Pads>,
}

/// Registers that remember the last value written, and record every access in order.
#[derive(Default)]
pub struct SimRegisters {
    bank: RefCell<Bank>,
}

impl SimRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model the pull resistors of the GPIO block at `gpio_base`, every pad starting as `initial`.
    pub fn with_pads(gpio_base: usize, initial: Pull) -> Self {
        let sim = Self::new();
        sim.bank.borrow_mut().pads = Some(Pads {
            control: gpio_base + PULL_CONTROL_OFFSET,
            clocks: [gpio_base + PULL_CLOCK_OFFSET, gpio_base + PULL_CLOCK_OFFSET + 4],
            state: [initial as u32; PIN_COUNT as usize],
        });
        sim
    }

    /// Set a register without recording an access.
    pub fn set(&self, address: usize, value: u32) {
        self.bank.borrow_mut().values.insert(address, value);
    }

    /// Value last written (or set) at `address`.
    pub fn get(&self, address: usize) -> u32 {
        self.bank
            .borrow()
            .values
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Queue values returned by the next reads of `address`, before falling back to the stored
    /// value.
    pub fn script(&self, address: usize, values: impl IntoIterator<Item = u32>) {
        self.bank
            .borrow_mut()
            .scripted
            .entry(address)
            .or_default()
            .extend(values);
    }

    pub fn log(&self) -> Vec<Access> {
        self.bank.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.bank.borrow_mut().log.clear();
    }

    /// Values written to `address`, in order.
    pub fn writes_to(&self, address: usize) -> Vec<u32> {
        self.bank
            .borrow()
            .log
            .iter()
            .filter_map(|access| match *access {
                Access::Write(a, value) if a == address => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of reads made from `address`.
    pub fn reads_of(&self, address: usize) -> usize {
        self.bank
            .borrow()
            .log
            .iter()
            .filter(|access| matches!(access, Access::Read(a, _) if *a == address))
            .count()
    }

    /// Pull code currently latched in the pad of `pin`.
    pub fn pad(&self, pin: u8) -> u32 {
        self.bank
            .borrow()
            .pads
            .as_ref()
            .map(|pads| pads.state[pin as usize])
            .expect("bank was not created with pads")
    }
}

impl Registers for SimRegisters {
    fn read(&self, address: usize) -> u32 {
        let mut bank = self.bank.borrow_mut();
        let value = match bank.scripted.get_mut(&address).and_then(VecDeque::pop_front) {
            Some(value) => value,
            None => bank.values.get(&address).copied().unwrap_or(0),
        };
        bank.log.push(Access::Read(address, value));
        value
    }

    fn write(&self, address: usize, value: u32) {
        let mut bank = self.bank.borrow_mut();
        bank.values.insert(address, value);
        bank.log.push(Access::Write(address, value));

        let control = bank
            .pads
            .as_ref()
            .map(|pads| pads.control)
            .and_then(|control| bank.values.get(&control).copied())
            .unwrap_or(0);
        if let Some(pads) = bank.pads.as_mut() {
            if let Some(index) = pads.clocks.iter().position(|&clock| clock == address) {
                for bit in 0..32 {
                    let pin = index * 32 + bit;
                    if value & (1 << bit) != 0 && pin < pads.state.len() {
                        pads.state[pin] = control;
                    }
                }
            }
        }
    }

    fn delay(&self, cycles: u32) {
        self.bank.borrow_mut().log.push(Access::Delay(cycles));
    }

    fn barrier(&self) {
        self.bank.borrow_mut().log.push(Access::Barrier);
    }
}
