use core::{fmt, hint::spin_loop};

use embedded_hal_nb as hal_nb;
use embedded_io as eio;

use super::{registers::*, Enabled, Error, MiniUart};
use crate::mmio::Registers;

impl<R: Registers> MiniUart<R, Enabled> {
    /// Wait until the transmitter can take a byte, then queue `byte`.
    ///
    /// Blocks for as long as the transmitter is full.
    pub fn send(&mut self, byte: u8) {
        self.regs.barrier();
        while !self.read_line_status().contains(LineStatus::TX_EMPTY) {
            spin_loop();
        }
        self.write_reg(IO_OFFSET, byte as u32);
    }

    /// Send every byte of `text`, in order.
    ///
    /// A NUL byte ends the string, it is not sent and neither is anything after it.
    pub fn send_string(&mut self, text: &str) {
        self.send_bytes(text.as_bytes());
    }

    /// Send `bytes` up to the first NUL byte.
    pub fn send_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes.iter().take_while(|&&byte| byte != 0) {
            self.send(byte);
        }
    }

    /// Like [`MiniUart::send`], but gives up with [`Error::NotReady`] after `budget` polls of
    /// the line status.
    pub fn try_send(&mut self, byte: u8, budget: u32) -> Result<(), Error> {
        self.regs.barrier();
        for _ in 0..budget {
            if self.read_line_status().contains(LineStatus::TX_EMPTY) {
                self.write_reg(IO_OFFSET, byte as u32);
                return Ok(());
            }
            spin_loop();
        }
        warn!("mini uart: transmitter still full after {=u32} polls", budget);
        Err(Error::NotReady)
    }

    /// Wait until every queued byte has left the transmitter.
    pub fn wait_idle(&mut self) {
        self.regs.barrier();
        while !self.read_line_status().contains(LineStatus::TX_IDLE) {
            spin_loop();
        }
    }

    pub fn transmitter_ready(&self) -> bool {
        self.regs.barrier();
        self.read_line_status().contains(LineStatus::TX_EMPTY)
    }
}

impl<R: Registers> eio::Write for MiniUart<R, Enabled> {
    /// Blocks until the first byte is queued, then queues bytes while the transmitter has room.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let Some((&first, rest)) = buf.split_first() else {
            return Ok(0);
        };
        self.send(first);
        let mut count = 1;
        for &byte in rest {
            if !self.read_line_status().contains(LineStatus::TX_EMPTY) {
                break;
            }
            self.write_reg(IO_OFFSET, byte as u32);
            count += 1;
        }
        Ok(count)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.wait_idle();
        Ok(())
    }
}

impl<R: Registers> eio::WriteReady for MiniUart<R, Enabled> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.transmitter_ready())
    }
}

impl<R: Registers> hal_nb::serial::Write<u8> for MiniUart<R, Enabled> {
    fn write(&mut self, word: u8) -> hal_nb::nb::Result<(), Self::Error> {
        if !self.transmitter_ready() {
            return Err(hal_nb::nb::Error::WouldBlock);
        }
        self.write_reg(IO_OFFSET, word as u32);
        Ok(())
    }

    fn flush(&mut self) -> hal_nb::nb::Result<(), Self::Error> {
        self.regs.barrier();
        if !self.read_line_status().contains(LineStatus::TX_IDLE) {
            return Err(hal_nb::nb::Error::WouldBlock);
        }
        Ok(())
    }
}

impl<R: Registers> fmt::Write for MiniUart<R, Enabled> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.send(byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aux::uart::tests::{console, IO, LSR},
        mmio::sim::{Access, SimRegisters},
    };

    const READY: u32 = LineStatus::TX_EMPTY.bits() | LineStatus::TX_IDLE.bits();

    #[test]
    fn send_string_writes_each_byte() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.set(LSR, READY);

        uart.send_string("AB");
        assert_eq!(sim.writes_to(IO), [0x41, 0x42]);
    }

    #[test]
    fn send_string_stops_at_nul() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.set(LSR, READY);

        uart.send_string("Hi\0there");
        assert_eq!(sim.writes_to(IO), [b'H' as u32, b'i' as u32]);
        uart.send_string("");
        uart.send_bytes(b"\0");
        assert_eq!(sim.writes_to(IO).len(), 2);
    }

    #[test]
    fn send_waits_for_the_transmitter() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.script(LSR, [0x00, 0x01, 0x20]);

        uart.send(b'!');
        assert_eq!(
            sim.log(),
            [
                Access::Barrier,
                Access::Read(LSR, 0x00),
                Access::Read(LSR, 0x01),
                Access::Read(LSR, 0x20),
                Access::Write(IO, b'!' as u32),
            ]
        );
    }

    #[test]
    fn try_send_gives_up() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);

        assert_eq!(uart.try_send(b'a', 4), Err(Error::NotReady));
        assert_eq!(sim.reads_of(LSR), 4);
        assert!(sim.writes_to(IO).is_empty());

        sim.set(LSR, READY);
        assert_eq!(uart.try_send(b'a', 4), Ok(()));
        assert_eq!(sim.writes_to(IO), [b'a' as u32]);
    }

    #[test]
    fn io_write_stops_when_the_fifo_is_full() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.script(LSR, [0x20, 0x20, 0x00]);

        assert_eq!(eio::Write::write(&mut uart, b"xyz"), Ok(2));
        assert_eq!(sim.writes_to(IO), [b'x' as u32, b'y' as u32]);
        assert_eq!(eio::Write::write(&mut uart, b""), Ok(0));
    }

    #[test]
    fn io_flush_waits_for_idle() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.script(LSR, [0x20, 0x20]);
        sim.set(LSR, READY);

        assert_eq!(eio::Write::flush(&mut uart), Ok(()));
        assert_eq!(sim.reads_of(LSR), 3);
    }

    #[test]
    fn nb_write() {
        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.script(LSR, [0x00, 0x20, 0x20]);

        assert_eq!(
            hal_nb::serial::Write::write(&mut uart, 1),
            Err(hal_nb::nb::Error::WouldBlock)
        );
        assert_eq!(hal_nb::serial::Write::write(&mut uart, 1), Ok(()));
        assert_eq!(
            hal_nb::serial::Write::flush(&mut uart),
            Err(hal_nb::nb::Error::WouldBlock)
        );
        sim.set(LSR, READY);
        assert_eq!(hal_nb::serial::Write::flush(&mut uart), Ok(()));
    }

    #[test]
    fn formatted_output() {
        use core::fmt::Write as _;

        let sim = SimRegisters::new();
        let mut uart = console(&sim);
        sim.set(LSR, READY);

        write!(uart, "{}:{:02x}", 7, 0xA).unwrap();
        let sent: Vec<u8> = sim.writes_to(IO).into_iter().map(|b| b as u8).collect();
        assert_eq!(sent, b"7:0a");
    }
}
