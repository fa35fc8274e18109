//! Serial console.
//!
//! Change events are queued by [`ConsoleSink`] from the scan loop and
//! written out by [`console_task`], so a slow UART never stretches a scan
//! cycle. Lines are rendered into a fixed-capacity buffer.

use core::fmt::{self, Write};

use capsense_scan::config::{CONSOLE_BAUD, CONSOLE_LINE_CAPACITY, CONSOLE_QUEUE_DEPTH};
use capsense_scan::error::Error;
use capsense_scan::reporter::{ChangeEvent, EventSink};
use defmt::warn;
use embassy_nrf::peripherals;
use embassy_nrf::uarte::{Baudrate, UarteTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::String;

pub type Line = String<CONSOLE_LINE_CAPACITY>;
pub type ConsoleChannel = Channel<CriticalSectionRawMutex, ChangeEvent, CONSOLE_QUEUE_DEPTH>;
pub type ConsoleTx = UarteTx<'static, peripherals::UARTE0>;

pub fn baudrate() -> Baudrate {
    match CONSOLE_BAUD {
        9_600 => Baudrate::BAUD9600,
        38_400 => Baudrate::BAUD38400,
        1_000_000 => Baudrate::BAUD1M,
        _ => Baudrate::BAUD115200,
    }
}

/// Render one console line, CR-LF terminated.
pub fn render(args: fmt::Arguments<'_>) -> Result<Line, Error> {
    let mut line = Line::new();
    line.write_fmt(args).map_err(|_| Error::BufferOverflow)?;
    line.push_str("\r\n").map_err(|_| Error::BufferOverflow)?;
    Ok(line)
}

pub async fn send(tx: &mut ConsoleTx, line: &Line) {
    if let Err(e) = tx.write(line.as_bytes()).await {
        warn!("console: write failed: {}", e);
    }
}

/// Event sink feeding the console queue. Never blocks the scan loop: an
/// event that does not fit is dropped with a warning.
pub struct ConsoleSink {
    sender: Sender<'static, CriticalSectionRawMutex, ChangeEvent, CONSOLE_QUEUE_DEPTH>,
}

impl ConsoleSink {
    pub fn new(
        sender: Sender<'static, CriticalSectionRawMutex, ChangeEvent, CONSOLE_QUEUE_DEPTH>,
    ) -> Self {
        Self { sender }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: &ChangeEvent) {
        if self.sender.try_send(*event).is_err() {
            warn!("console: queue full, dropped {}", event);
        }
    }
}

#[embassy_executor::task]
pub async fn console_task(
    mut tx: ConsoleTx,
    events: Receiver<'static, CriticalSectionRawMutex, ChangeEvent, CONSOLE_QUEUE_DEPTH>,
) {
    loop {
        let event = events.receive().await;
        let rendered = render(format_args!("{}", event));
        match rendered {
            Ok(line) => send(&mut tx, &line).await,
            Err(e) => warn!("console: {} rendering {}", e, event),
        }
    }
}
