//! Time primitives: calendar date-times for alarm scheduling, a monotonic
//! millisecond instant for the tick loop, and the polled one-shot timer used
//! for auto-stop, idle-return, illumination and scroll-back deadlines.

use core::cmp::Ordering;
use core::ops::Add;
use core::time::Duration;
use serde::Serialize;

/// A point on the monotonic tick clock, in milliseconds since boot.
///
/// The platform supplies the value on every [`crate::AlarmClock::tick`];
/// the core never reads a clock on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant(u64);

impl Instant {
    /// Instant at the given number of milliseconds since boot.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since boot.
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, d: Duration) -> Self {
        Self(self.0.saturating_add(d.as_millis() as u64))
    }
}

/// A one-shot countdown polled by the tick loop.
///
/// Starting an already-running timer replaces the pending deadline, it never
/// stacks, and an expired timer reports its expiry exactly once.
#[derive(Debug, Default)]
pub struct SoftTimer {
    deadline: Option<Instant>,
}

impl SoftTimer {
    /// A stopped timer.
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arms (or re-arms) the timer to fire `period` after `now`.
    pub fn start(&mut self, now: Instant, period: Duration) {
        self.deadline = Some(now + period);
    }

    /// Cancels the pending deadline, if any.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is pending.
    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Day of the week. Bit `index()` of an alarm's repeat mask selects this day,
/// so Sunday is 0 throughout the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    /// Index into a 7-bit repeat mask, Sunday = 0.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Weekday for a mask index, taken modulo 7.
    pub const fn from_index(index: u8) -> Self {
        match index % 7 {
            1 => Self::Monday,
            2 => Self::Tuesday,
            3 => Self::Wednesday,
            4 => Self::Thursday,
            5 => Self::Friday,
            6 => Self::Saturday,
            _ => Self::Sunday,
        }
    }

    /// The following day.
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

/// A calendar date-time as read from the wall clock.
///
/// Ordering and equality compare the date and time of day only; the stored
/// weekday is carried along for repeat-mask lookups and kept consistent by
/// the arithmetic methods.
#[derive(Debug, Clone, Copy, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Builds a date-time from its parts. The caller is responsible for the
    /// weekday matching the date.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        year: u16,
        month: u8,
        day: u8,
        weekday: Weekday,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Self {
        Self {
            year,
            month,
            day,
            weekday,
            hour,
            minute,
            second,
        }
    }

    const fn sort_key(&self) -> (u16, u8, u8, u8, u8, u8) {
        (
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
    }

    /// Same date at `hour:minute:00`.
    pub const fn at(&self, hour: u8, minute: u8) -> Self {
        Self {
            year: self.year,
            month: self.month,
            day: self.day,
            weekday: self.weekday,
            hour,
            minute,
            second: 0,
        }
    }

    /// The following calendar day, rolling over months and years and
    /// advancing the weekday.
    pub fn next_day(&self) -> Self {
        let mut next = *self;
        next.day += 1;
        if next.day > days_in_month(next.month, next.year) {
            next.day = 1;
            next.month += 1;
            if next.month > 12 {
                next.month = 1;
                next.year += 1;
            }
        }
        next.weekday = next.weekday.next();
        next
    }

    /// This date-time shifted forward by whole days.
    pub fn plus_days(&self, days: u32) -> Self {
        let mut result = *self;
        for _ in 0..days {
            result = result.next_day();
        }
        result
    }

    /// This date-time shifted forward by minutes, carrying into hours and
    /// days as needed. Seconds are unchanged.
    pub fn plus_minutes(&self, minutes: u32) -> Self {
        let total = u32::from(self.minute) + minutes;
        let mut result = *self;
        result.minute = (total % 60) as u8;
        let hours = u32::from(self.hour) + total / 60;
        result.hour = (hours % 24) as u8;
        result.plus_days(hours / 24)
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for DateTime {}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Number of days in the given month.
const fn days_in_month(month: u8, year: u16) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30, // all other months
    }
}

/// A year is a leap year if it is divisible by 4, but not by 100, unless it
/// is also divisible by 400.
const fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && year % 100 != 0 || year % 400 == 0
}
