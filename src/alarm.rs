//! The alarm entity and its scheduler: next-occurrence computation over the
//! weekday repeat mask, hardware alarm-compare arming, and the per-alarm
//! `Off -> Playing -> Snoozed -> Off` state machine.

use serde::Serialize;

use crate::error::{Error, StoreError};
use crate::hardware::{AlarmSlot, SettingsStore, WallClock};
use crate::settings::Setting;
use crate::time::DateTime;

/// Playback state of one alarm. Transient; every boot starts at `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    /// Not ringing.
    Off,
    /// Ringing right now.
    Playing,
    /// Ringing was postponed; a one-shot wake is armed.
    Snoozed,
}

/// Read-only view of one alarm for the renderer and the web layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlarmSnapshot {
    pub id: u8,
    pub hour: u8,
    pub minute: u8,
    pub repeat: u8,
    pub enabled: bool,
    pub sound: u8,
    pub state: AlarmState,
    /// Next occurrence computed against the current wall-clock time, `None`
    /// while disabled.
    pub next: Option<DateTime>,
}

/// One of the two alarms. Time, repeat mask, enabled flag and sound id are
/// persisted settings; the state is transient.
#[derive(Debug)]
pub struct Alarm {
    slot: AlarmSlot,
    hour: Setting<u8>,
    minute: Setting<u8>,
    repeat: Setting<u8>,
    enabled: Setting<bool>,
    sound: Setting<u8>,
    state: AlarmState,
}

impl Alarm {
    /// An alarm bound to its hardware slot, with the slot's store keys.
    pub fn new(slot: AlarmSlot) -> Self {
        let (hour_key, minute_key, repeat_key, enabled_key, sound_key) = match slot {
            AlarmSlot::One => ("A1H", "A1M", "A1R", "A1T", "A1S"),
            AlarmSlot::Two => ("A2H", "A2M", "A2R", "A2T", "A2S"),
        };
        Self {
            slot,
            hour: Setting::sanitized(hour_key, 0, |h| h.min(23)),
            minute: Setting::sanitized(minute_key, 0, |m| m.min(59)),
            repeat: Setting::sanitized(repeat_key, 0, |r| r & 0x7F),
            enabled: Setting::new(enabled_key, false),
            sound: Setting::new(sound_key, 0),
            state: AlarmState::Off,
        }
    }

    /// Loads all persisted fields, clamping anything out of range.
    pub fn load<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        self.hour.load(store)?;
        self.minute.load(store)?;
        self.repeat.load(store)?;
        self.enabled.load(store)?;
        self.sound.load(store)?;
        info!(
            "alarm {} loaded: {}:{} repeat {} enabled {}",
            self.slot.number(),
            self.hour.get(),
            self.minute.get(),
            self.repeat.get(),
            self.enabled.get()
        );
        Ok(())
    }

    /// The hardware slot this alarm arms.
    pub const fn slot(&self) -> AlarmSlot {
        self.slot
    }

    pub fn hour(&self) -> u8 {
        self.hour.get()
    }

    pub fn minute(&self) -> u8 {
        self.minute.get()
    }

    /// The weekday repeat mask, bit 0 = Sunday. Zero means one-shot.
    pub fn repeat(&self) -> u8 {
        self.repeat.get()
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Configured sound id; 0 selects a random track at trigger time.
    pub fn sound_id(&self) -> u8 {
        self.sound.get()
    }

    pub const fn state(&self) -> AlarmState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: AlarmState) {
        self.state = state;
    }

    pub fn set_hour<S: SettingsStore>(&mut self, store: &mut S, hour: u8) -> Result<(), StoreError> {
        self.hour.set(store, hour.min(23))
    }

    pub fn set_minute<S: SettingsStore>(
        &mut self,
        store: &mut S,
        minute: u8,
    ) -> Result<(), StoreError> {
        self.minute.set(store, minute.min(59))
    }

    pub fn set_repeat<S: SettingsStore>(
        &mut self,
        store: &mut S,
        mask: u8,
    ) -> Result<(), StoreError> {
        self.repeat.set(store, mask & 0x7F)
    }

    pub fn set_enabled<S: SettingsStore>(
        &mut self,
        store: &mut S,
        enabled: bool,
    ) -> Result<(), StoreError> {
        self.enabled.set(store, enabled)
    }

    pub fn set_sound<S: SettingsStore>(
        &mut self,
        store: &mut S,
        sound: u8,
    ) -> Result<(), StoreError> {
        self.sound.set(store, sound)
    }

    /// When this alarm fires next, relative to `now`. `None` while disabled.
    ///
    /// A candidate exactly equal to `now` counts as already passed; the
    /// search therefore always returns a strictly future time. With a repeat
    /// mask the scan covers offsets 0..=7 so both "later today" and "same
    /// weekday next week" are reachable.
    pub fn next_occurrence(&self, now: &DateTime) -> Option<DateTime> {
        if !self.enabled.get() {
            return None;
        }

        let candidate = now.at(self.hour.get(), self.minute.get());
        let mask = self.repeat.get();

        if mask == 0 {
            return Some(if candidate > *now {
                candidate
            } else {
                candidate.plus_days(1)
            });
        }

        for offset in 0..=7u8 {
            let weekday = (now.weekday.index() + offset) % 7;
            if mask & (1 << weekday) != 0 {
                let at = candidate.plus_days(u32::from(offset));
                if at > *now {
                    return Some(at);
                }
            }
        }
        None
    }

    /// Recomputes the next occurrence and arms the hardware slot with it,
    /// disarming instead when the alarm is disabled. Returns what was armed.
    pub fn arm_next<W: WallClock>(&mut self, clock: &mut W) -> Result<Option<DateTime>, Error> {
        clock.clear(self.slot);
        let now = clock.now();
        match self.next_occurrence(&now) {
            Some(at) => {
                clock
                    .arm(self.slot, at)
                    .map_err(|_| Error::AlarmArm(self.slot))?;
                info!(
                    "alarm {} armed for {}:{} on day {}",
                    self.slot.number(),
                    at.hour,
                    at.minute,
                    at.weekday.index()
                );
                Ok(Some(at))
            }
            None => {
                clock.disarm(self.slot);
                info!("alarm {} disarmed", self.slot.number());
                Ok(None)
            }
        }
    }

    /// Points the alarm at `now + 8h` and enables it. The target weekday's
    /// bit is ORed into the repeat mask only when the mask was already
    /// non-zero, so a one-shot alarm stays one-shot.
    pub fn set_in_8h<S: SettingsStore>(
        &mut self,
        store: &mut S,
        now: &DateTime,
    ) -> Result<(), StoreError> {
        let wake = now.plus_minutes(8 * 60);
        self.hour.set(store, wake.hour)?;
        self.minute.set(store, wake.minute)?;
        let mask = self.repeat.get();
        if mask != 0 {
            self.repeat.set(store, mask | 1 << wake.weekday.index())?;
        }
        self.enabled.set(store, true)
    }

    /// Snapshot for the renderer and the web layer.
    pub fn snapshot(&self, now: &DateTime) -> AlarmSnapshot {
        AlarmSnapshot {
            id: self.slot.number(),
            hour: self.hour.get(),
            minute: self.minute.get(),
            repeat: self.repeat.get(),
            enabled: self.enabled.get(),
            sound: self.sound.get(),
            state: self.state,
            next: self.next_occurrence(now),
        }
    }
}
