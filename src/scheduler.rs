//! Scan scheduler.
//!
//! Owns cycle timing and the consuming half of the completion signal.
//! Each tick it triggers a scan when none of its own is outstanding and
//! the engine is idle, waits for the completion release, then hands the
//! finished scan to the [`TouchStatusReporter`] exactly once.
//!
//! ```text
//! Uninitialized ─start()─► Idle ─► Triggered ─► AwaitingCompletion ─► Processing ─► Idle
//!        └── init error ──► Halted (terminal)
//! ```
//!
//! Only one scan is ever outstanding, so `process()` for cycle N always
//! finishes before the trigger for cycle N+1 and the reporter's snapshot
//! is never touched concurrently with a scan.

use crate::config::ScanConfig;
use crate::engine::SensingEngine;
use crate::error::InitError;
use crate::reporter::{CycleReport, EventSink, IndicatorSink, TouchStatusReporter};
use crate::signal::CompletionWaiter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerState {
    /// Engine not initialised yet.
    Uninitialized,
    Idle,
    Triggered,
    AwaitingCompletion,
    Processing,
    /// Engine initialisation failed. Nothing is ever triggered again.
    Halted,
}

/// One trigger → complete round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanCycle {
    /// Tick on which the scan was triggered (0 for the start-up scan).
    pub triggered_at: u32,
    pub completed: bool,
}

/// Result of one [`ScanScheduler::on_tick`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// A scan completed and was reported.
    Processed {
        cycle: ScanCycle,
        /// `false` when this tick waited on a scan triggered earlier.
        triggered: bool,
        report: CycleReport,
    },
    /// The engine was busy with nothing of ours outstanding. Retried next tick.
    Busy,
    /// `start()` has not been called.
    NotStarted,
    /// Initialisation failed earlier.
    Halted,
}

pub struct ScanScheduler<'a, E, I, V> {
    engine: E,
    completion: CompletionWaiter<'a>,
    reporter: TouchStatusReporter,
    indicator: I,
    events: V,
    config: ScanConfig,
    state: SchedulerState,
    tick: u32,
    cycle: Option<ScanCycle>,
    init_error: Option<InitError>,
    busy_streak: u32,
}

impl<'a, E, I, V> ScanScheduler<'a, E, I, V>
where
    E: SensingEngine,
    I: IndicatorSink,
    V: EventSink,
{
    pub fn new(
        engine: E,
        completion: CompletionWaiter<'a>,
        indicator: I,
        events: V,
        config: ScanConfig,
    ) -> Self {
        Self {
            engine,
            completion,
            reporter: TouchStatusReporter::new(),
            indicator,
            events,
            config,
            state: SchedulerState::Uninitialized,
            tick: 0,
            cycle: None,
            init_error: None,
            busy_streak: 0,
        }
    }

    /// Initialise the engine.
    ///
    /// On failure the scheduler halts for good: outputs are left as they
    /// are (indicator off) and every later tick is a no-op. Calling this
    /// again after either outcome just repeats the first result.
    pub fn start(&mut self) -> Result<(), InitError> {
        match self.state {
            SchedulerState::Uninitialized => {}
            SchedulerState::Halted => {
                return Err(self.init_error.unwrap_or(InitError::NotCalibrated));
            }
            _ => return Ok(()),
        }

        if let Err(e) = self.engine.initialize() {
            self.init_error = Some(e);
            self.state = SchedulerState::Halted;
            return Err(e);
        }

        self.state = SchedulerState::Idle;
        if self.config.prime_on_start && !self.engine.is_busy() {
            self.trigger();
        }
        Ok(())
    }

    /// Run one cycle: trigger if possible, wait for completion, report.
    ///
    /// The completion wait is the only suspension point. Dropping the
    /// returned future mid-wait leaves the cycle outstanding; the next tick
    /// waits for it again unless [`abandon_cycle`](Self::abandon_cycle) is
    /// called first.
    pub async fn on_tick(&mut self) -> TickOutcome {
        match self.state {
            SchedulerState::Halted => return TickOutcome::Halted,
            SchedulerState::Uninitialized => return TickOutcome::NotStarted,
            _ => {}
        }

        self.tick = self.tick.wrapping_add(1);

        let mut triggered = false;
        if self.cycle.is_none() {
            if self.engine.is_busy() {
                self.busy_streak = self.busy_streak.saturating_add(1);
                self.state = SchedulerState::Idle;
                return TickOutcome::Busy;
            }
            self.trigger();
            triggered = true;
        }

        self.state = SchedulerState::AwaitingCompletion;
        self.completion.acquire().await;

        self.state = SchedulerState::Processing;
        let mut cycle = self.cycle.take().unwrap_or(ScanCycle {
            triggered_at: self.tick,
            completed: false,
        });
        cycle.completed = true;

        self.engine.process_widgets();
        self.engine.run_tuner();
        let report = self
            .reporter
            .process(&self.engine, &mut self.indicator, &mut self.events);

        self.state = SchedulerState::Idle;
        TickOutcome::Processed {
            cycle,
            triggered,
            report,
        }
    }

    /// Give up on the outstanding cycle after a missed completion.
    ///
    /// A release still in flight for it is rejected; one that already
    /// arrived is discarded unprocessed. The next tick triggers a fresh
    /// scan as soon as the engine reports idle.
    pub fn abandon_cycle(&mut self) -> Option<ScanCycle> {
        let cycle = self.cycle.take()?;
        if !self.completion.disarm() {
            self.completion.try_acquire();
        }
        if self.state != SchedulerState::Halted {
            self.state = SchedulerState::Idle;
        }
        Some(cycle)
    }

    fn trigger(&mut self) {
        // Arm first: the completion may fire before trigger_scan returns.
        self.completion.arm();
        self.engine.trigger_scan();
        self.busy_streak = 0;
        self.cycle = Some(ScanCycle {
            triggered_at: self.tick,
            completed: false,
        });
        self.state = SchedulerState::Triggered;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Scan triggered but not yet processed.
    pub fn outstanding(&self) -> Option<ScanCycle> {
        self.cycle
    }

    /// Ticks seen since start.
    pub fn ticks(&self) -> u32 {
        self.tick
    }

    /// Consecutive ticks skipped because the engine stayed busy. A steadily
    /// growing streak means the engine is wedged.
    pub fn busy_streak(&self) -> u32 {
        self.busy_streak
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn reporter(&self) -> &TouchStatusReporter {
        &self.reporter
    }

    pub fn indicator_sink(&self) -> &I {
        &self.indicator
    }

    pub fn event_sink(&self) -> &V {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::ChangeEvent;
    use crate::signal::{CompletionReleaser, CompletionSignal};
    use crate::widget::{SliderTouch, WidgetId};
    use core::task::Poll;
    use embassy_futures::{block_on, poll_once};

    /// Engine that completes instantly unless `stall` is set.
    struct FakeEngine<'a> {
        releaser: CompletionReleaser<'a>,
        init: Result<(), InitError>,
        busy: bool,
        stall: bool,
        triggers: u32,
        button0: bool,
        slider: SliderTouch,
    }

    impl<'a> FakeEngine<'a> {
        fn new(releaser: CompletionReleaser<'a>) -> Self {
            Self {
                releaser,
                init: Ok(()),
                busy: false,
                stall: false,
                triggers: 0,
                button0: false,
                slider: SliderTouch::NONE,
            }
        }

        fn finish(&mut self) {
            self.busy = false;
            self.releaser.release();
        }
    }

    impl SensingEngine for FakeEngine<'_> {
        fn initialize(&mut self) -> Result<(), InitError> {
            self.init
        }
        fn trigger_scan(&mut self) {
            assert!(!self.busy, "trigger while busy");
            self.triggers += 1;
            self.busy = true;
            if !self.stall {
                self.finish();
            }
        }
        fn is_busy(&self) -> bool {
            self.busy
        }
        fn read_button(&self, widget: WidgetId, _sensor: u8) -> bool {
            widget == WidgetId::Button0 && self.button0
        }
        fn read_slider(&self, _widget: WidgetId) -> SliderTouch {
            self.slider
        }
    }

    #[derive(Default)]
    struct Led(Option<bool>);

    impl IndicatorSink for Led {
        fn set_indicator(&mut self, active: bool) {
            self.0 = Some(active);
        }
    }

    #[derive(Default)]
    struct Events(std::vec::Vec<ChangeEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &ChangeEvent) {
            self.0.push(*event);
        }
    }

    const NO_PRIME: ScanConfig = ScanConfig {
        prime_on_start: false,
        ..ScanConfig::DEFAULT
    };

    #[test]
    fn tick_before_start_does_nothing() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut scheduler = ScanScheduler::new(
            FakeEngine::new(releaser),
            waiter,
            Led::default(),
            Events::default(),
            NO_PRIME,
        );

        assert_eq!(block_on(scheduler.on_tick()), TickOutcome::NotStarted);
        assert_eq!(scheduler.engine().triggers, 0);
    }

    #[test]
    fn init_failure_halts() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.init = Err(InitError::Status(7));
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), ScanConfig::DEFAULT);

        assert_eq!(scheduler.start(), Err(InitError::Status(7)));
        assert_eq!(scheduler.state(), SchedulerState::Halted);
        for _ in 0..3 {
            assert_eq!(block_on(scheduler.on_tick()), TickOutcome::Halted);
        }
        assert_eq!(scheduler.start(), Err(InitError::Status(7)));
        assert_eq!(scheduler.engine().triggers, 0);
        assert_eq!(scheduler.indicator_sink().0, None);
    }

    #[test]
    fn tick_triggers_and_processes() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.button0 = true;
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), NO_PRIME);
        scheduler.start().unwrap();

        let outcome = block_on(scheduler.on_tick());
        match outcome {
            TickOutcome::Processed {
                cycle,
                triggered,
                report,
            } => {
                assert!(triggered);
                assert!(cycle.completed);
                assert_eq!(cycle.triggered_at, 1);
                assert!(report.indicator);
                assert_eq!(report.events.len(), 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.outstanding(), None);
    }

    #[test]
    fn primed_scan_is_consumed_before_next_trigger() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut scheduler = ScanScheduler::new(
            FakeEngine::new(releaser),
            waiter,
            Led::default(),
            Events::default(),
            ScanConfig::DEFAULT,
        );
        scheduler.start().unwrap();
        assert_eq!(scheduler.engine().triggers, 1);

        let TickOutcome::Processed { cycle, triggered, .. } = block_on(scheduler.on_tick()) else {
            panic!("primed scan not processed");
        };
        assert!(!triggered);
        assert_eq!(cycle.triggered_at, 0);
        assert_eq!(scheduler.engine().triggers, 1);

        block_on(scheduler.on_tick());
        assert_eq!(scheduler.engine().triggers, 2);
    }

    #[test]
    fn busy_engine_is_not_triggered() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.busy = true;
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), NO_PRIME);
        scheduler.start().unwrap();

        assert_eq!(block_on(scheduler.on_tick()), TickOutcome::Busy);
        assert_eq!(scheduler.engine().triggers, 0);
        assert_eq!(scheduler.indicator_sink().0, None);
    }

    #[test]
    fn wedged_engine_builds_busy_streak() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.busy = true;
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), NO_PRIME);
        scheduler.start().unwrap();

        for expected in 1..=5 {
            assert_eq!(block_on(scheduler.on_tick()), TickOutcome::Busy);
            assert_eq!(scheduler.busy_streak(), expected);
        }
        assert_eq!(scheduler.engine().triggers, 0);

        // Engine recovers: the next trigger clears the streak.
        scheduler.engine.busy = false;
        assert!(matches!(
            block_on(scheduler.on_tick()),
            TickOutcome::Processed { triggered: true, .. }
        ));
        assert_eq!(scheduler.busy_streak(), 0);
    }

    #[test]
    fn outstanding_scan_is_waited_for_not_retriggered() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.stall = true;
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), NO_PRIME);
        scheduler.start().unwrap();

        assert_eq!(poll_once(scheduler.on_tick()), Poll::Pending);
        assert_eq!(scheduler.state(), SchedulerState::AwaitingCompletion);
        assert_eq!(scheduler.engine().triggers, 1);

        // Engine still busy on the next tick: no new trigger, keep waiting.
        assert_eq!(poll_once(scheduler.on_tick()), Poll::Pending);
        assert_eq!(scheduler.engine().triggers, 1);
        assert!(scheduler.outstanding().is_some());
    }

    #[test]
    fn abandoned_cycle_is_retriggered() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.stall = true;
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), NO_PRIME);
        scheduler.start().unwrap();

        assert_eq!(poll_once(scheduler.on_tick()), Poll::Pending);
        let abandoned = scheduler.abandon_cycle().expect("cycle outstanding");
        assert!(!abandoned.completed);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.abandon_cycle(), None);

        // Hardware recovers; a late release for the abandoned scan is ignored.
        scheduler.engine.busy = false;
        assert!(!scheduler.engine.releaser.release());
        scheduler.engine.stall = false;

        let outcome = block_on(scheduler.on_tick());
        assert!(matches!(outcome, TickOutcome::Processed { triggered: true, .. }));
        assert_eq!(scheduler.engine().triggers, 2);
    }

    #[test]
    fn abandon_discards_completion_that_raced_the_timeout() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut engine = FakeEngine::new(releaser);
        engine.stall = true;
        let mut scheduler =
            ScanScheduler::new(engine, waiter, Led::default(), Events::default(), NO_PRIME);
        scheduler.start().unwrap();

        assert_eq!(poll_once(scheduler.on_tick()), Poll::Pending);
        scheduler.engine.finish();
        scheduler.abandon_cycle();

        scheduler.engine.stall = true;
        // New scan stalls: the stale release must not satisfy its wait.
        assert_eq!(poll_once(scheduler.on_tick()), Poll::Pending);
        assert_eq!(scheduler.engine().triggers, 2);
    }

    #[test]
    fn events_reach_sink() {
        let mut signal = CompletionSignal::new();
        let (releaser, waiter) = signal.split();
        let mut scheduler = ScanScheduler::new(
            FakeEngine::new(releaser),
            waiter,
            Led::default(),
            Events::default(),
            NO_PRIME,
        );
        scheduler.start().unwrap();

        block_on(scheduler.on_tick());
        assert!(scheduler.event_sink().0.is_empty());
        assert_eq!(scheduler.indicator_sink().0, Some(false));

        scheduler.engine.slider = SliderTouch::single(37);
        block_on(scheduler.on_tick());
        scheduler.engine.slider = SliderTouch::single(37);
        block_on(scheduler.on_tick());
        scheduler.engine.slider = SliderTouch::single(40);
        block_on(scheduler.on_tick());

        assert_eq!(
            scheduler.event_sink().0,
            [
                ChangeEvent::Slider {
                    widget: WidgetId::Slider0,
                    previous: None,
                    current: 37
                },
                ChangeEvent::Slider {
                    widget: WidgetId::Slider0,
                    previous: Some(37),
                    current: 40
                },
            ]
        );
        assert_eq!(scheduler.indicator_sink().0, Some(true));
    }
}
