//! Traits over the hardware the core drives but does not own: wall clock and
//! alarm-compare slots, raw touch channels, the sound player, the key-value
//! settings store, and the light/display outputs.
//!
//! The platform implements these once; host tests implement them with
//! recording mocks. The only piece of shared state crossing an interrupt
//! boundary is [`RingFlag`].

use portable_atomic::{AtomicBool, Ordering};

use crate::error::{ClockError, StoreError};
use crate::input::Pad;
use crate::time::DateTime;

/// One of the two hardware alarm-compare slots (DS3231 alarm 1 / alarm 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmSlot {
    One,
    Two,
}

impl AlarmSlot {
    /// Both slots, in fixed order.
    pub const ALL: [Self; 2] = [Self::One, Self::Two];

    /// Zero-based index for array addressing.
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// One-based slot number as the RTC names it.
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// The battery-backed wall clock with per-slot alarm-compare support.
pub trait WallClock {
    /// Current calendar time.
    fn now(&mut self) -> DateTime;

    /// Sets the clock, e.g. after a time sync.
    fn adjust(&mut self, dt: DateTime);

    /// Arms the slot's alarm-compare for the given date-time, replacing any
    /// previous value. Errors must be surfaced: a silent failure leaves the
    /// alarm's enabled state inconsistent with hardware.
    fn arm(&mut self, slot: AlarmSlot, at: DateTime) -> Result<(), ClockError>;

    /// Disables the slot's alarm-compare.
    fn disarm(&mut self, slot: AlarmSlot);

    /// Whether the slot's compare has matched since it was last cleared.
    fn fired(&mut self, slot: AlarmSlot) -> bool;

    /// Clears the slot's compare-match latch.
    fn clear(&mut self, slot: AlarmSlot);
}

/// A raw capacitive touch reading source.
pub trait TouchSource {
    /// Reads the raw value of one pad. `0` is the "no signal" sentinel; the
    /// caller retries a bounded number of times and then treats the tick as
    /// having no reading for that pad.
    fn read_raw(&mut self, pad: Pad) -> u16;
}

/// The MP3 playback module.
pub trait SoundPlayer {
    /// Plays a track once.
    fn play(&mut self, id: u8);

    /// Plays a track in a loop until stopped.
    fn play_loop(&mut self, id: u8);

    /// Stops playback.
    fn stop(&mut self);

    /// Sets the output volume, 0..=30.
    fn set_volume(&mut self, volume: u8);
}

/// The persistent key-value store backing [`crate::Setting`]s and the sound
/// catalog. Mechanics (flash layout, wear leveling) are the platform's
/// business; failures are surfaced, not swallowed.
pub trait SettingsStore {
    /// Whether a value exists under `key`.
    fn contains(&mut self, key: &str) -> Result<bool, StoreError>;

    /// Reads the byte stored under `key`.
    fn get_u8(&mut self, key: &str) -> Result<u8, StoreError>;

    /// Writes a byte under `key`.
    fn put_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError>;

    /// Reads the bool stored under `key`.
    fn get_bool(&mut self, key: &str) -> Result<bool, StoreError>;

    /// Writes a bool under `key`.
    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StoreError>;

    /// Reads the string stored under `key` into `buf`, returning its length.
    fn get_str(&mut self, key: &str, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Writes a string under `key`.
    fn put_str(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Display scroll requests issued from the home frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scroll {
    /// Scroll to the previous info page.
    Prev,
    /// Scroll to the next info page.
    Next,
    /// Scroll back to the first page.
    Home,
}

/// Light and display outputs driven by the core's decisions. Duty and
/// brightness scaling beyond the values passed here is the platform's
/// concern.
pub trait Outputs {
    /// Indicator LED duty (0 = off).
    fn set_indicator_duty(&mut self, duty: u8);

    /// Main light PWM duty, 0..=7 on the 3-bit channel.
    fn set_main_light_duty(&mut self, duty: u8);

    /// Display brightness level.
    fn set_display_brightness(&mut self, level: u8);

    /// Display power; `false` shuts the panel down.
    fn set_display_power(&mut self, on: bool);

    /// Scrolls the matrix info pages.
    fn scroll_display(&mut self, scroll: Scroll);

    /// Kicks off network provisioning. Progress is reported back through
    /// [`crate::AlarmClock::provisioning_finished`].
    fn start_provisioning(&mut self);
}

/// Set by the RTC interrupt handler, drained once per tick by the scheduler.
///
/// The interrupt context must do nothing but [`RingFlag::notify`]; which slot
/// fired is established on the tick via [`WallClock::fired`].
#[derive(Debug, Default)]
pub struct RingFlag(AtomicBool);

impl RingFlag {
    /// A lowered flag, suitable for a `static`.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raises the flag. Safe to call from interrupt context.
    pub fn notify(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lowers the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
