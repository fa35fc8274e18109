//! capsense-scan firmware - nRF52840.
//!
//! Scans two buttons and a five-segment slider every 20 ms, prints state
//! changes on the serial console, lights the status LED while anything is
//! touched and serves tuning data over I²C.
//!
//! Tasks:
//! - `scan_task`: tick, trigger, wait for completion, report
//! - `saadc_task`: runs the SAADC burst and releases completion
//! - `console_task`: drains change events to the UART
//! - `tuner_task`: I²C slave for the tuner register file

#![no_std]
#![no_main]

mod console;
mod saadc_engine;
mod tuner_link;

use capsense_scan::config::{ScanConfig, BUSY_WARN_TICKS, TUNER_I2C_ADDRESS};
use capsense_scan::error::Error;
use capsense_scan::indicator::{LedIndicator, Polarity};
use capsense_scan::scheduler::{ScanScheduler, TickOutcome};
use capsense_scan::signal::CompletionSignal;
use defmt::{debug, error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::saadc::{self, ChannelConfig, Saadc};
use embassy_nrf::twis::{self, Twis};
use embassy_nrf::uarte::{self, UarteTx};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::{with_timeout, Duration, Ticker, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::console::{ConsoleChannel, ConsoleSink};
use crate::saadc_engine::SaadcEngine;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twis::InterruptHandler<peripherals::TWISPI0>;
});

type Scheduler =
    ScanScheduler<'static, SaadcEngine, LedIndicator<Output<'static>>, ConsoleSink>;

static COMPLETION: StaticCell<CompletionSignal> = StaticCell::new();
static CONSOLE: ConsoleChannel = ConsoleChannel::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("capsense-scan starting");

    // LED1 on the DK is active-low; start dark.
    let led = LedIndicator::new(
        Output::new(p.P0_13, Level::High, OutputDrive::Standard),
        Polarity::ActiveLow,
    );

    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = console::baudrate();
    let mut tx = UarteTx::new(p.UARTE0, Irqs, p.P0_06, uart_config);

    let mut twis_config = twis::Config::default();
    twis_config.address0 = TUNER_I2C_ADDRESS;
    let twis = Twis::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twis_config);

    // Channel order is frame order: buttons first, then slider segments.
    let channels = [
        ChannelConfig::single_ended(p.P0_02),
        ChannelConfig::single_ended(p.P0_03),
        ChannelConfig::single_ended(p.P0_04),
        ChannelConfig::single_ended(p.P0_05),
        ChannelConfig::single_ended(p.P0_28),
        ChannelConfig::single_ended(p.P0_29),
        ChannelConfig::single_ended(p.P0_30),
    ];
    let mut saadc = Saadc::new(p.SAADC, Irqs, saadc::Config::default(), channels);
    saadc.calibrate().await;
    let baseline = saadc_engine::capture_baseline(&mut saadc).await;

    let (releaser, waiter) = COMPLETION.init(CompletionSignal::new()).split();
    unwrap!(spawner.spawn(saadc_engine::saadc_task(saadc, releaser)));

    let mut scheduler: Scheduler = ScanScheduler::new(
        SaadcEngine::new(baseline),
        waiter,
        led,
        ConsoleSink::new(CONSOLE.sender()),
        ScanConfig::DEFAULT,
    );

    if let Err(err) = scheduler.start() {
        error!("init failed: {}", err);
        let line = console::render(format_args!("CapSense initialization failed. {}", err));
        if let Ok(line) = line {
            console::send(&mut tx, &line).await;
        }
        loop {
            Timer::after_secs(1000).await;
        }
    }

    let line = console::render(format_args!(
        "Application has started. Touch any CapSense button or slider."
    ));
    match line {
        Ok(line) => console::send(&mut tx, &line).await,
        Err(e) => warn!("console: {}", e),
    }

    unwrap!(spawner.spawn(console::console_task(tx, CONSOLE.receiver())));
    unwrap!(spawner.spawn(tuner_link::tuner_task(twis)));
    unwrap!(spawner.spawn(scan_task(scheduler)));
}

#[embassy_executor::task]
async fn scan_task(mut scheduler: Scheduler) {
    let config = *scheduler.config();
    info!("scan: {}", config);
    let mut ticker = Ticker::every(Duration::from_millis(config.period_ms));

    loop {
        ticker.next().await;

        let outcome = match config.completion_timeout_ms {
            Some(ms) => match with_timeout(Duration::from_millis(ms), scheduler.on_tick()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    if let Some(cycle) = scheduler.abandon_cycle() {
                        warn!(
                            "scan: {} (triggered on tick {})",
                            Error::MissingCompletion,
                            cycle.triggered_at
                        );
                    }
                    continue;
                }
            },
            None => scheduler.on_tick().await,
        };

        match outcome {
            TickOutcome::Processed { report, .. } => {
                for event in &report.events {
                    debug!("{}", event);
                }
            }
            TickOutcome::Busy => {
                let streak = scheduler.busy_streak();
                if streak % BUSY_WARN_TICKS == 0 {
                    warn!("scan: engine busy for {} ticks, nothing triggered", streak);
                } else {
                    debug!("scan: engine busy, tick skipped");
                }
            }
            TickOutcome::NotStarted | TickOutcome::Halted => {
                error!("scan: scheduler not running");
                return;
            }
        }
    }
}
