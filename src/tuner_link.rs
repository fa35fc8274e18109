//! I²C tuner link.
//!
//! Serves the [`TunerRegisters`] to an external tuning host as a TWIS
//! slave. The engine publishes into the same register file after every
//! completed scan.

use core::cell::RefCell;

use capsense_scan::error::Error;
use capsense_scan::tuner::{TunerRegisters, SUB_ADDRESS_LEN, TUNER_BUFFER_SIZE};
use defmt::warn;
use embassy_nrf::peripherals;
use embassy_nrf::twis::{Command, Twis};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

pub static TUNER: Mutex<CriticalSectionRawMutex, RefCell<TunerRegisters>> =
    Mutex::new(RefCell::new(TunerRegisters::new()));

fn write(data: &[u8]) {
    if let Err(e) = TUNER.lock(|regs| regs.borrow_mut().handle_write(data)) {
        warn!("tuner: {}", Error::from(e));
    }
}

async fn respond(twis: &mut Twis<'static, peripherals::TWISPI0>, buf: &mut [u8]) {
    TUNER.lock(|regs| regs.borrow().handle_read(buf));
    if let Err(e) = twis.respond_to_read(buf).await {
        warn!("tuner: read failed: {}", e);
    }
}

#[embassy_executor::task]
pub async fn tuner_task(mut twis: Twis<'static, peripherals::TWISPI0>) {
    let mut rx = [0u8; SUB_ADDRESS_LEN + TUNER_BUFFER_SIZE];
    let mut tx = [0u8; TUNER_BUFFER_SIZE];
    loop {
        match twis.listen(&mut rx).await {
            Ok(Command::Write(n)) => write(&rx[..n]),
            Ok(Command::WriteRead(n)) => {
                write(&rx[..n]);
                respond(&mut twis, &mut tx).await;
            }
            Ok(Command::Read) => respond(&mut twis, &mut tx).await,
            Err(e) => warn!("tuner: bus error: {}", e),
        }
    }
}
