//! # matrixclock
//!
//! Core logic of a touch-navigated alarm clock: alarm scheduling against a
//! DS3231-style alarm-compare clock, trigger dispatch with a defuse mini-game,
//! and a deterministic menu state machine driven by a five-pad capacitive
//! touch cross.
//!
//! The crate is hardware-agnostic. All peripherals are reached through the
//! traits in [`hardware`]; the platform's composition root instantiates
//! [`AlarmClock`] once with its concrete clock, touch source, sound player,
//! settings store and light outputs, then calls [`AlarmClock::tick`] from its
//! main loop. The RTC interrupt handler only raises the shared [`RingFlag`];
//! all state mutation happens on the tick.
//!
//! Host tests run against the mock hardware in `tests/common`.

#![cfg_attr(not(feature = "std"), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod alarm;
pub mod app;
pub mod error;
pub mod hardware;
pub mod input;
pub mod light;
pub mod settings;
pub mod sound;
pub mod time;
pub mod ui;

pub use alarm::{Alarm, AlarmSnapshot, AlarmState};
pub use app::{AlarmClock, DEFAULT_SNOOZE_MINUTES, DEFUSE_LEN};
pub use error::{ClockError, Error, StoreError};
pub use hardware::{AlarmSlot, Outputs, RingFlag, Scroll, SettingsStore, SoundPlayer, TouchSource, WallClock};
pub use input::{Direction, NavPad, Pad};
pub use light::{Illumination, MainLight};
pub use settings::{Setting, StoreValue};
pub use sound::{Player, Sound, SoundBank};
pub use time::{DateTime, Instant, SoftTimer, Weekday};
pub use ui::{Frame, FRAME_COUNT};
