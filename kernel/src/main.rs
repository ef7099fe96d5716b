#![no_std]
#![no_main]

use core::{arch::global_asm, hint::spin_loop};

use rpi_miniuart::{Config, MiniUart, Mmio};

global_asm!(include_str!("boot.s"), options(raw));

#[unsafe(no_mangle)]
pub extern "C" fn first_stage() -> ! {
    // Safety: The default configuration targets the BCM2837 of the Raspberry Pi 3 this image is
    // built for, and the other cores are parked in `boot.s`.
    let regs = unsafe { Mmio::new() };
    let Ok(mut uart) = MiniUart::initialize(regs, &Config::DEFAULT) else {
        halt()
    };
    uart.send_string("Hello, world!\r\n");

    // Echo every byte back.
    loop {
        let byte = uart.receive();
        uart.send(byte);
    }
}

fn halt() -> ! {
    loop {
        spin_loop();
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    halt()
}
