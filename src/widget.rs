//! Widget identities, configuration and per-cycle readings.
//!
//! A widget is a sensing target (button or slider) as opposed to a raw
//! electrode. The set is fixed at build time, see [`crate::config::WIDGETS`].

use crate::config::SLIDER_NUM_TOUCH;

/// Slider coordinate.
pub type Position = u32;

/// Configured widgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WidgetId {
    Button0,
    Button1,
    Slider0,
}

impl WidgetId {
    /// Slot in the widget table and in the state snapshot.
    pub const fn index(self) -> usize {
        match self {
            WidgetId::Button0 => 0,
            WidgetId::Button1 => 1,
            WidgetId::Slider0 => 2,
        }
    }

    /// Name used on the console.
    pub const fn name(self) -> &'static str {
        match self {
            WidgetId::Button0 => "Button_0",
            WidgetId::Button1 => "Button_1",
            WidgetId::Slider0 => "LinearSlider_0",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WidgetKind {
    /// Single-electrode button; `sensor` is the electrode index within the widget.
    Button { sensor: u8 },
    /// Linear slider.
    Slider,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WidgetConfig {
    pub id: WidgetId,
    pub kind: WidgetKind,
}

impl WidgetConfig {
    pub const fn button(id: WidgetId, sensor: u8) -> Self {
        Self {
            id,
            kind: WidgetKind::Button { sensor },
        }
    }

    pub const fn slider(id: WidgetId) -> Self {
        Self {
            id,
            kind: WidgetKind::Slider,
        }
    }

    /// State assumed before anything has been reported.
    pub const fn initial_state(&self) -> WidgetState {
        match self.kind {
            WidgetKind::Button { .. } => WidgetState::Button(false),
            WidgetKind::Slider => WidgetState::Slider(None),
        }
    }
}

/// Discrete, reportable state of one widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WidgetState {
    Button(bool),
    Slider(Option<Position>),
}

/// Slider reading as delivered by the sensing engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SliderTouch {
    /// Number of simultaneous contacts detected on the slider.
    pub contact_count: u32,
    /// Coordinate of the first contact, if any.
    pub position: Option<Position>,
}

impl SliderTouch {
    /// No contact.
    pub const NONE: Self = Self {
        contact_count: 0,
        position: None,
    };

    pub const fn single(position: Position) -> Self {
        Self {
            contact_count: 1,
            position: Some(position),
        }
    }

    /// `true` when exactly the required number of contacts is present.
    pub fn single_contact(&self) -> bool {
        self.contact_count == SLIDER_NUM_TOUCH
    }

    /// Position, but only when the contact count makes it valid.
    pub fn valid_position(&self) -> Option<Position> {
        if self.single_contact() {
            self.position
        } else {
            None
        }
    }
}
