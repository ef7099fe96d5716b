//! The Mini UART, driven by polling.
//!
//! The driver follows the lifecycle of the peripheral with type states:
//! [`Disabled`] → [`Configuring`] (powered, receiver and transmitter off) → [`Enabled`].
//! Frame format and bit rate can only be written while the receiver and transmitter are off,
//! so a half-applied configuration never reaches the line.

use core::{fmt, marker::PhantomData};

use crate::{
    aux::{Enables, ENABLES_OFFSET},
    gpio::{Function, Gpio, Pin, PinSet, Pull},
    impl_sealed,
    mmio::{PeripheralMap, Registers},
    Sealed,
};

mod reader;
pub mod registers;
mod writer;

use registers::*;

/// Core clock of the VideoCore, which the Mini UART derives its bit rate from.
pub const DEFAULT_CLOCK_HZ: u32 = 250_000_000;
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

// See the BCM2835 manual section 6.2 for the pin mappings, all on ALT5.
const TX_PINS: [u8; 3] = [14, 32, 40];
const RX_PINS: [u8; 3] = [15, 33, 41];

/// Everything needed to bring the console up.
///
/// The frame format is fixed to 8 data bits, no parity, one stop bit, without flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub map: PeripheralMap,
    /// Core clock frequency in Hz.
    pub clock_hz: u32,
    pub baud_rate: u32,
    pub tx_pin: Pin,
    pub rx_pin: Pin,
}

impl Config {
    /// Raspberry Pi 3 at 115200 baud, on GPIO14 and GPIO15.
    pub const DEFAULT: Self = Self {
        map: PeripheralMap::BCM2837,
        clock_hz: DEFAULT_CLOCK_HZ,
        baud_rate: DEFAULT_BAUD_RATE,
        tx_pin: Pin::GPIO14,
        rx_pin: Pin::GPIO15,
    };

    pub const fn with_map(self, map: PeripheralMap) -> Self {
        Self { map, ..self }
    }

    pub const fn with_clock_hz(self, clock_hz: u32) -> Self {
        Self { clock_hz, ..self }
    }

    pub const fn with_baud_rate(self, baud_rate: u32) -> Self {
        Self { baud_rate, ..self }
    }

    pub const fn with_pins(self, tx_pin: Pin, rx_pin: Pin) -> Self {
        Self {
            tx_pin,
            rx_pin,
            ..self
        }
    }

    /// Value of the baudrate register for this configuration.
    pub const fn divisor(&self) -> Result<u16, Error> {
        baud_divisor(self.clock_hz, self.baud_rate)
    }

    /// Check the whole configuration, returning the divisor to program.
    pub fn validate(&self) -> Result<u16, Error> {
        if !TX_PINS.contains(&self.tx_pin.index()) {
            return Err(Error::InvalidTxPin {
                pin: self.tx_pin.index(),
            });
        }
        if !RX_PINS.contains(&self.rx_pin.index()) {
            return Err(Error::InvalidRxPin {
                pin: self.rx_pin.index(),
            });
        }
        self.divisor()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compute `round(clock_hz / (8 * baud_rate)) - 1`, the Mini UART baudrate register value.
///
/// See the BCM2835 manual section 2.2.1.
pub const fn baud_divisor(clock_hz: u32, baud_rate: u32) -> Result<u16, Error> {
    if baud_rate == 0 {
        return Err(Error::InvalidBaudRate { baud_rate });
    }
    let oversampled = 8 * baud_rate as u64;
    let rounded = (clock_hz as u64 + oversampled / 2) / oversampled;
    if rounded == 0 || rounded - 1 > u16::MAX as u64 {
        return Err(Error::InvalidBaudRate { baud_rate });
    }
    Ok((rounded - 1) as u16)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The bit rate cannot be produced from the core clock.
    InvalidBaudRate { baud_rate: u32 },
    /// Not a GPIO pin number.
    InvalidPin { pin: u8 },
    /// The pin cannot carry TXD1.
    InvalidTxPin { pin: u8 },
    /// The pin cannot carry RXD1.
    InvalidRxPin { pin: u8 },
    /// The hardware did not become ready within the polling budget.
    NotReady,
    /// The receive FIFO overflowed, and at least one byte was lost.
    Overrun,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidBaudRate { baud_rate } => {
                write!(f, "baud rate {baud_rate} is out of range for the core clock")
            }
            Error::InvalidPin { pin } => write!(f, "GPIO{pin} does not exist"),
            Error::InvalidTxPin { pin } => write!(f, "GPIO{pin} cannot be the Mini UART TX pin"),
            Error::InvalidRxPin { pin } => write!(f, "GPIO{pin} cannot be the Mini UART RX pin"),
            Error::NotReady => f.write_str("Mini UART not ready"),
            Error::Overrun => f.write_str("Mini UART receiver overrun"),
        }
    }
}

impl core::error::Error for Error {}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::InvalidBaudRate { .. }
            | Error::InvalidPin { .. }
            | Error::InvalidTxPin { .. }
            | Error::InvalidRxPin { .. } => embedded_io::ErrorKind::InvalidInput,
            Error::NotReady => embedded_io::ErrorKind::TimedOut,
            Error::Overrun => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_hal_nb::serial::Error for Error {
    fn kind(&self) -> embedded_hal_nb::serial::ErrorKind {
        match self {
            Error::Overrun => embedded_hal_nb::serial::ErrorKind::Overrun,
            _ => embedded_hal_nb::serial::ErrorKind::Other,
        }
    }
}

/// The Mini UART is unpowered, its registers are not accessible.
pub struct Disabled;
/// Powered, with the receiver, the transmitter and interrupts off.
pub struct Configuring;
/// Receiver and transmitter running.
pub struct Enabled;

impl_sealed!(Disabled, Configuring, Enabled);

#[allow(private_bounds)]
pub trait State: Sealed {}

impl State for Disabled {}
impl State for Configuring {}
impl State for Enabled {}

pub struct MiniUart<R, S: State = Enabled> {
    regs: R,
    base: usize,
    _state: PhantomData<S>,
}

impl<R: Registers, S: State> MiniUart<R, S> {
    fn read_reg(&self, offset: usize) -> u32 {
        self.regs.read(self.base + offset)
    }

    fn write_reg(&self, offset: usize, value: u32) {
        self.regs.write(self.base + offset, value)
    }

    fn into_state<T: State>(self) -> MiniUart<R, T> {
        MiniUart {
            regs: self.regs,
            base: self.base,
            _state: PhantomData,
        }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Give the register access back, leaving the hardware as it is.
    pub fn free(self) -> R {
        self.regs
    }
}

impl<R: Registers> MiniUart<R, Disabled> {
    pub fn new(regs: R, map: &PeripheralMap) -> Self {
        Self {
            regs,
            base: map.aux_base,
            _state: PhantomData,
        }
    }

    /// Power the Mini UART, then stop its receiver, transmitter and interrupts.
    pub fn power_on(self) -> MiniUart<R, Configuring> {
        self.regs.barrier();
        // Enabling the Mini UART also gives access to its registers.
        self.write_reg(ENABLES_OFFSET, Enables::MINI_UART.bits());
        // Disable auto flow control, the receiver and the transmitter while configuring.
        self.write_reg(EXTRA_CONTROL_OFFSET, Control::empty().bits());
        // Polled operation only.
        self.write_reg(INTERRUPT_ENABLE_OFFSET, InterruptEnable::empty().bits());
        trace!("mini uart powered");
        self.into_state()
    }
}

impl<R: Registers> MiniUart<R, Configuring> {
    pub fn set_bit_mode(&mut self, eight_bits: bool) {
        let mode = if eight_bits {
            LineControl::DATA_8BIT
        } else {
            LineControl::empty()
        };
        self.regs.barrier();
        self.write_reg(LINE_CONTROL_OFFSET, mode.bits());
    }

    /// Hold RTS high, the Mini UART does no flow control.
    pub fn set_rts_high(&mut self) {
        self.regs.barrier();
        self.write_reg(MODEM_CONTROL_OFFSET, ModemControl::empty().bits());
    }

    pub fn set_baud_divisor(&mut self, divisor: u16) {
        self.regs.barrier();
        self.write_reg(BAUDRATE_OFFSET, divisor as u32);
    }

    /// Program the divisor for `baud_rate`, returning it.
    pub fn set_baud_rate(&mut self, clock_hz: u32, baud_rate: u32) -> Result<u16, Error> {
        let divisor = baud_divisor(clock_hz, baud_rate)?;
        self.set_baud_divisor(divisor);
        Ok(divisor)
    }

    /// Start the receiver and the transmitter.
    pub fn enable(self) -> MiniUart<R, Enabled> {
        self.regs.barrier();
        self.write_reg(
            EXTRA_CONTROL_OFFSET,
            (Control::RX_ENABLE | Control::TX_ENABLE).bits(),
        );
        self.into_state()
    }
}

impl<R: Registers> MiniUart<R, Enabled> {
    /// Route the pins to the Mini UART and bring it up as an 8N1 console.
    ///
    /// Nothing is written if the configuration is invalid. Applying the same configuration
    /// again leaves the hardware in the same state.
    pub fn initialize(regs: R, config: &Config) -> Result<Self, Error> {
        let divisor = config.validate()?;

        let mut gpio = Gpio::new(&regs, &config.map);
        gpio.set_function(config.tx_pin, Function::Alternate5);
        gpio.set_function(config.rx_pin, Function::Alternate5);
        // Both ends drive the lines, pull resistors would only fight them.
        gpio.set_pull(
            PinSet::new().with(config.tx_pin).with(config.rx_pin),
            Pull::Floating,
        );

        let mut uart = MiniUart::new(regs, &config.map).power_on();
        uart.set_bit_mode(true);
        uart.set_rts_high();
        uart.set_baud_divisor(divisor);
        let uart = uart.enable();
        debug!(
            "mini uart enabled: {=u32} baud, divisor {=u16}",
            config.baud_rate,
            divisor
        );
        Ok(uart)
    }

    pub fn line_status(&self) -> LineStatus {
        self.regs.barrier();
        self.read_line_status()
    }

    /// Poll the line status, within an operation that already issued its barrier.
    fn read_line_status(&self) -> LineStatus {
        LineStatus::from_bits_retain(self.read_reg(LINE_STATUS_OFFSET))
    }

    /// Stop the receiver and the transmitter, then power the Mini UART off.
    ///
    /// The other auxiliary peripherals keep their enable bit.
    pub fn disable(self) -> MiniUart<R, Disabled> {
        self.regs.barrier();
        self.write_reg(EXTRA_CONTROL_OFFSET, Control::empty().bits());
        let enables = Enables::from_bits_retain(self.read_reg(ENABLES_OFFSET));
        self.write_reg(ENABLES_OFFSET, (enables - Enables::MINI_UART).bits());
        trace!("mini uart disabled");
        self.into_state()
    }
}
