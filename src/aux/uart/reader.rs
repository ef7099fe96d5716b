use core::hint::spin_loop;

use embedded_hal_nb as hal_nb;
use embedded_io as eio;

use super::{registers::*, Enabled, Error, MiniUart};
use crate::mmio::Registers;

impl<R: Registers> MiniUart<R, Enabled> {
    /// Wait for a byte and return it.
    ///
    /// Blocks for as long as nothing is received.
    pub fn receive(&mut self) -> u8 {
        self.regs.barrier();
        while !self.read_line_status().contains(LineStatus::DATA_READY) {
            spin_loop();
        }
        self.read_data()
    }

    /// Like [`MiniUart::receive`], but gives up with [`Error::NotReady`] after `budget` polls
    /// of the line status.
    ///
    /// A receiver overrun seen while polling is reported as [`Error::Overrun`], the bytes still
    /// in the FIFO can be read afterwards.
    pub fn try_receive(&mut self, budget: u32) -> Result<u8, Error> {
        self.regs.barrier();
        for _ in 0..budget {
            let status = self.read_line_status();
            if status.contains(LineStatus::RX_OVERRUN) {
                return Err(Error::Overrun);
            }
            if status.contains(LineStatus::DATA_READY) {
                return Ok(self.read_data());
            }
            spin_loop();
        }
        warn!("mini uart: nothing received after {=u32} polls", budget);
        Err(Error::NotReady)
    }

    pub fn data_ready(&self) -> bool {
        self.regs.barrier();
        self.read_line_status().contains(LineStatus::DATA_READY)
    }

    fn read_data(&self) -> u8 {
        (self.read_reg(IO_OFFSET) & 0xFF) as u8
    }
}

impl<R: Registers> eio::ErrorType for MiniUart<R, Enabled> {
    type Error = Error;
}

impl<R: Registers> hal_nb::serial::ErrorType for MiniUart<R, Enabled> {
    type Error = Error;
}

impl<R: Registers> eio::Read for MiniUart<R, Enabled> {
    /// Blocks until at least one byte is received, then takes what is already in the FIFO.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };
        *first = self.receive();
        let mut count = 1;
        for byte in rest {
            if !self.read_line_status().contains(LineStatus::DATA_READY) {
                break;
            }
            *byte = self.read_data();
            count += 1;
        }
        Ok(count)
    }
}

impl<R: Registers> eio::ReadReady for MiniUart<R, Enabled> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.data_ready())
    }
}

impl<R: Registers> hal_nb::serial::Read<u8> for MiniUart<R, Enabled> {
    fn read(&mut self) -> hal_nb::nb::Result<u8, Self::Error> {
        self.regs.barrier();
        let status = self.read_line_status();
        if status.contains(LineStatus::RX_OVERRUN) {
            return Err(hal_nb::nb::Error::Other(Error::Overrun));
        }
        if !status.contains(LineStatus::DATA_READY) {
            return Err(hal_nb::nb::Error::WouldBlock);
        }
        Ok(self.read_data())
    }
}
