//! Touch status reporter.
//!
//! Runs once per completed scan. Reads every configured widget from the
//! engine, emits a [`ChangeEvent`] only when a widget's reportable state
//! differs from the last reported one, and drives the combined "any
//! touch" indicator every cycle.

use core::fmt;

use heapless::Vec;

use crate::config::{WIDGETS, WIDGET_COUNT};
use crate::engine::SensingEngine;
use crate::widget::{Position, WidgetId, WidgetKind, WidgetState};

/// Receives the combined touch level once per cycle.
pub trait IndicatorSink {
    fn set_indicator(&mut self, active: bool);
}

/// Receives widget transitions.
pub trait EventSink {
    fn emit(&mut self, event: &ChangeEvent);
}

/// One reportable widget transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChangeEvent {
    Button {
        widget: WidgetId,
        previous: bool,
        current: bool,
    },
    /// `previous` is `None` until the first position has been reported.
    Slider {
        widget: WidgetId,
        previous: Option<Position>,
        current: Position,
    },
}

impl ChangeEvent {
    pub fn widget(&self) -> WidgetId {
        match self {
            ChangeEvent::Button { widget, .. } | ChangeEvent::Slider { widget, .. } => *widget,
        }
    }

    fn from_transition(widget: WidgetId, previous: WidgetState, current: WidgetState) -> Option<Self> {
        match (previous, current) {
            (WidgetState::Button(previous), WidgetState::Button(current)) => Some(ChangeEvent::Button {
                widget,
                previous,
                current,
            }),
            (WidgetState::Slider(previous), WidgetState::Slider(Some(current))) => {
                Some(ChangeEvent::Slider {
                    widget,
                    previous,
                    current,
                })
            }
            _ => None,
        }
    }
}

/// Console rendering, e.g. `Button_0 status: 0 -> 1` or
/// `LinearSlider_0 position: 37 -> 40`.
impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::Button {
                widget,
                previous,
                current,
            } => write!(
                f,
                "{} status: {} -> {}",
                widget.name(),
                u8::from(*previous),
                u8::from(*current)
            ),
            ChangeEvent::Slider {
                widget,
                previous: Some(previous),
                current,
            } => write!(f, "{} position: {} -> {}", widget.name(), previous, current),
            ChangeEvent::Slider {
                widget,
                previous: None,
                current,
            } => write!(f, "{} position: - -> {}", widget.name(), current),
        }
    }
}

/// Last reported state per widget, used only for edge detection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviousStateSnapshot {
    states: [WidgetState; WIDGET_COUNT],
}

impl PreviousStateSnapshot {
    pub const fn new() -> Self {
        Self {
            states: [
                WIDGETS[0].initial_state(),
                WIDGETS[1].initial_state(),
                WIDGETS[2].initial_state(),
            ],
        }
    }

    pub fn get(&self, widget: WidgetId) -> WidgetState {
        self.states[widget.index()]
    }

    /// Store `state`; returns the replaced state if it differed.
    fn replace(&mut self, widget: WidgetId, state: WidgetState) -> Option<WidgetState> {
        let slot = &mut self.states[widget.index()];
        if *slot == state {
            None
        } else {
            Some(core::mem::replace(slot, state))
        }
    }
}

impl Default for PreviousStateSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// What one `process()` call produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    /// Transitions in widget-table order.
    pub events: Vec<ChangeEvent, WIDGET_COUNT>,
    /// Combined touch level pushed to the indicator.
    pub indicator: bool,
}

pub struct TouchStatusReporter {
    snapshot: PreviousStateSnapshot,
}

impl TouchStatusReporter {
    pub const fn new() -> Self {
        Self {
            snapshot: PreviousStateSnapshot::new(),
        }
    }

    pub fn snapshot(&self) -> &PreviousStateSnapshot {
        &self.snapshot
    }

    /// Read all widgets, report transitions and refresh the indicator.
    ///
    /// A slider only has a position while exactly one contact is present;
    /// the last reported position is kept across lift-off, so re-touching
    /// the same spot is not a transition. Entering or leaving the
    /// no-contact state shows up on the indicator only.
    pub fn process<E, I, V>(&mut self, engine: &E, indicator: &mut I, events: &mut V) -> CycleReport
    where
        E: SensingEngine + ?Sized,
        I: IndicatorSink + ?Sized,
        V: EventSink + ?Sized,
    {
        let mut report = CycleReport::default();

        for widget in WIDGETS.iter() {
            let (active, current) = match widget.kind {
                WidgetKind::Button { sensor } => {
                    let pressed = engine.read_button(widget.id, sensor);
                    (pressed, Some(WidgetState::Button(pressed)))
                }
                WidgetKind::Slider => {
                    let touch = engine.read_slider(widget.id);
                    let current = touch
                        .valid_position()
                        .map(|position| WidgetState::Slider(Some(position)));
                    (touch.single_contact(), current)
                }
            };

            report.indicator |= active;

            let Some(current) = current else {
                continue;
            };
            let Some(previous) = self.snapshot.replace(widget.id, current) else {
                continue;
            };
            if let Some(event) = ChangeEvent::from_transition(widget.id, previous, current) {
                events.emit(&event);
                // At most one event per widget, capacity is the widget count.
                let pushed = report.events.push(event);
                debug_assert!(pushed.is_ok(), "cycle report truncated");
            }
        }

        indicator.set_indicator(report.indicator);
        report
    }
}

impl Default for TouchStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}
