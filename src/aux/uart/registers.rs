use bitflags::bitflags;

/// Mini Uart I/O Data
/// BCM2835 ARM Peripherals, page 11
pub const IO_OFFSET: usize = 0x40;
/// Mini Uart Interrupt Enable
/// BCM2835 ARM Peripherals, page 12
pub const INTERRUPT_ENABLE_OFFSET: usize = 0x44;
/// Mini Uart Line Control
/// BCM2835 ARM Peripherals, page 14
pub const LINE_CONTROL_OFFSET: usize = 0x4C;
/// Mini Uart Modem Control
/// BCM2835 ARM Peripherals, page 14
pub const MODEM_CONTROL_OFFSET: usize = 0x50;
/// Mini Uart Line Status
/// BCM2835 ARM Peripherals, page 15
pub const LINE_STATUS_OFFSET: usize = 0x54;
/// Mini Uart Extra Control
/// BCM2835 ARM Peripherals, page 16
pub const EXTRA_CONTROL_OFFSET: usize = 0x60;
/// Mini Uart Baudrate
/// BCM2835 ARM Peripherals, page 19
pub const BAUDRATE_OFFSET: usize = 0x68;

bitflags! {
    /// `AUX_MU_LSR_REG`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineStatus: u32 {
        /// The receive FIFO holds at least one symbol.
        const DATA_READY = 1;
        /// A symbol was dropped because the receive FIFO was full. Cleared on read.
        const RX_OVERRUN = 1 << 1;
        /// The transmit FIFO can accept at least one byte.
        const TX_EMPTY = 1 << 5;
        /// The transmit FIFO is empty and the transmitter is idle.
        const TX_IDLE = 1 << 6;
    }
}

bitflags! {
    /// `AUX_MU_CNTL_REG`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control: u32 {
        const RX_ENABLE = 1;
        const TX_ENABLE = 1 << 1;
        const RTS_AUTO_FLOW = 1 << 2;
        const CTS_AUTO_FLOW = 1 << 3;
    }
}

bitflags! {
    /// `AUX_MU_IER_REG`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptEnable: u32 {
        const RX = 1;
        const TX = 1 << 1;
    }
}

bitflags! {
    /// `AUX_MU_LCR_REG`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineControl: u32 {
        /// 8-bit mode. The manual documents bit 0 only, but bit 1 has to be set as well.
        const DATA_8BIT = 0b11;
        const BREAK = 1 << 6;
        const DLAB = 1 << 7;
    }
}

bitflags! {
    /// `AUX_MU_MCR_REG`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModemControl: u32 {
        /// Drive the RTS line low. With the bit clear, RTS stays high.
        const RTS = 1 << 1;
    }
}
