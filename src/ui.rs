//! The navigation frame graph.
//!
//! Exactly one frame is active at a time; every transition resets the
//! frame-local cursor. Input handling is a table of handler function values
//! indexed by frame id, so the "which frame am I" decision exists in exactly
//! one place. Rendering is the platform's concern; handlers only mutate state
//! and request transitions.

use rand::{Rng, RngCore};

use crate::app::{AlarmClock, DEFAULT_SNOOZE_MINUTES, DEFUSE_LEN, SCROLL_BACK_PERIOD};
use crate::error::Error;
use crate::hardware::{AlarmSlot, Outputs, Scroll, SettingsStore, SoundPlayer, TouchSource, WallClock};
use crate::input::Direction;
use crate::time::{Instant, SoftTimer};

use core::time::Duration;

/// Number of frames in the graph.
pub const FRAME_COUNT: usize = 17;

/// With no input for this long the UI returns to the home frame.
const IDLE_PERIOD: Duration = Duration::from_secs(15);

/// Entries in the settings menu.
const SETTINGS_OPTIONS: u8 = 6;

/// Entries in the per-alarm menu.
const ALARM_MENU_OPTIONS: u8 = 4;

/// Entries in the player menu.
const PLAYER_MENU_OPTIONS: u8 = 4;

/// The frames of the UI, in their fixed display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Frame {
    /// Clock display; the resting frame.
    Home = 0,
    /// An alarm is ringing.
    Ringing = 1,
    /// Pick a snooze duration, or inspect a snoozed alarm.
    Snooze = 2,
    /// Re-enter the generated code to silence the ring.
    Defuse = 3,
    /// Date and upcoming alarms at a glance.
    Overview = 4,
    /// Settings menu.
    Settings = 5,
    /// Per-alarm menu.
    AlarmMenu = 6,
    /// Alarm time and repeat-day editor.
    AlarmTime = 7,
    /// Alarm sound picker.
    AlarmSound = 8,
    /// Player menu.
    PlayerMenu = 9,
    /// Volume editor.
    Volume = 10,
    /// Play an arbitrary track.
    PlaySound = 11,
    /// Toggle a track's random-play eligibility.
    SoundRandom = 12,
    /// Main light auto-off duration editor.
    LightDuration = 13,
    /// Network menu.
    WifiMenu = 14,
    /// Network provisioning status.
    Provisioning = 15,
    /// Version, light level, runtime.
    Info = 16,
}

impl Frame {
    /// Index into the handler table.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Frames the idle-return timer must leave alone.
    pub(crate) const fn is_alarm_related(self) -> bool {
        matches!(self, Self::Home | Self::Ringing | Self::Snooze | Self::Defuse)
    }
}

/// Active frame, frame-local cursor and the idle-return countdown.
#[derive(Debug)]
pub struct UiState {
    frame: Frame,
    cursor: u8,
    idle: SoftTimer,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    /// Starts on the home frame.
    pub const fn new() -> Self {
        Self {
            frame: Frame::Home,
            cursor: 0,
            idle: SoftTimer::new(),
        }
    }

    /// The active frame.
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    /// The frame-local cursor.
    pub const fn cursor(&self) -> u8 {
        self.cursor
    }

    /// Activates a frame. Always resets the cursor; whatever edit was in
    /// progress on the previous frame is discarded.
    pub fn transition_to(&mut self, frame: Frame) {
        debug!("frame {} -> {}", self.frame.index(), frame.index());
        self.frame = frame;
        self.cursor = 0;
    }

    /// Moves the cursor within the active frame.
    pub fn set_cursor(&mut self, cursor: u8) {
        self.cursor = cursor;
    }

    pub(crate) fn restart_idle(&mut self, now: Instant) {
        self.idle.start(now, IDLE_PERIOD);
    }

    pub(crate) fn stop_idle(&mut self) {
        self.idle.stop();
    }

    pub(crate) fn poll_idle(&mut self, now: Instant) -> bool {
        self.idle.poll(now)
    }
}

impl<'f, W, T, P, S, O, R> AlarmClock<'f, W, T, P, S, O, R>
where
    W: WallClock,
    T: TouchSource,
    P: SoundPlayer,
    S: SettingsStore,
    O: Outputs,
    R: RngCore,
{
    /// The input-handler table, indexed by [`Frame::index`].
    const fn handlers() -> [fn(&mut Self, Direction, Instant) -> Result<(), Error>; FRAME_COUNT] {
        [
            Self::on_home,
            Self::on_ringing,
            Self::on_snooze,
            Self::on_defuse,
            Self::on_overview,
            Self::on_settings,
            Self::on_alarm_menu,
            Self::on_alarm_time,
            Self::on_alarm_sound,
            Self::on_player_menu,
            Self::on_volume,
            Self::on_play_sound,
            Self::on_sound_random,
            Self::on_light_duration,
            Self::on_wifi_menu,
            Self::on_provisioning,
            Self::on_info,
        ]
    }

    /// Hands one debounced direction to the active frame.
    pub(crate) fn dispatch(&mut self, direction: Direction, now: Instant) -> Result<(), Error> {
        (Self::handlers()[self.ui.frame().index()])(self, direction, now)
    }

    /// Reports the outcome of a provisioning run started from the
    /// provisioning frame.
    pub fn provisioning_finished(&mut self, ok: bool) {
        if self.ui.frame() == Frame::Provisioning && self.ui.cursor() == 1 {
            self.ui.set_cursor(if ok { 3 } else { 2 });
        }
    }

    fn on_home(&mut self, direction: Direction, now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center => {
                if self.any_playing() {
                    self.ui.transition_to(Frame::Defuse);
                } else if self.any_snoozed() {
                    self.ui.transition_to(Frame::Snooze);
                } else {
                    self.ui.transition_to(Frame::Overview);
                }
            }
            Direction::Left => {
                self.out.scroll_display(Scroll::Prev);
                self.scroll_back.start(now, SCROLL_BACK_PERIOD);
            }
            Direction::Right => {
                self.out.scroll_display(Scroll::Next);
                self.scroll_back.start(now, SCROLL_BACK_PERIOD);
            }
            Direction::Up => self.adjust_main_light(now, true),
            Direction::Down => self.adjust_main_light(now, false),
        }
        Ok(())
    }

    fn on_ringing(&mut self, direction: Direction, now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center | Direction::Left | Direction::Right => {
                self.ui.transition_to(Frame::Defuse);
            }
            Direction::Up => self.adjust_main_light(now, true),
            Direction::Down => self.adjust_main_light(now, false),
        }
        Ok(())
    }

    fn on_snooze(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let snoozed = self.any_snoozed();
        let playing = self.any_playing();
        match direction {
            Direction::Center | Direction::Right => {
                if snoozed {
                    self.ui.transition_to(Frame::Defuse);
                } else {
                    self.snooze_alarms()?;
                    self.ui.transition_to(Frame::Home);
                }
            }
            Direction::Left => {
                self.ui.transition_to(if playing { Frame::Ringing } else { Frame::Home });
            }
            Direction::Up if !snoozed => {
                self.snooze_minutes = snooze_step_up(self.snooze_minutes);
            }
            Direction::Down if !snoozed => {
                self.snooze_minutes = snooze_step_down(self.snooze_minutes);
            }
            Direction::Up | Direction::Down => {}
        }
        Ok(())
    }

    fn on_defuse(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let Some(digit) = direction.defuse_digit() else {
            // Center backs out without resetting the ring.
            let frame = if self.any_playing() { Frame::Ringing } else { Frame::Home };
            self.ui.transition_to(frame);
            return Ok(());
        };

        let cursor = usize::from(self.ui.cursor());
        if let Some(entry) = self.defuse_entry.get_mut(cursor) {
            *entry = digit;
        }

        if cursor + 1 >= DEFUSE_LEN {
            if self.defuse_entry == self.defuse_code {
                info!("defuse code entered correctly");
                self.stop_alarms()?;
                self.ui.transition_to(Frame::Home);
            } else {
                info!("defuse code wrong");
                self.snooze_minutes = DEFAULT_SNOOZE_MINUTES;
                self.ui.transition_to(Frame::Snooze);
            }
        } else {
            self.ui.set_cursor((cursor + 1) as u8);
        }
        Ok(())
    }

    fn on_overview(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center | Direction::Right => self.ui.transition_to(Frame::Settings),
            Direction::Left => self.ui.transition_to(Frame::Home),
            Direction::Up | Direction::Down => {}
        }
        Ok(())
    }

    fn on_settings(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let cursor = self.ui.cursor();
        match direction {
            Direction::Center | Direction::Right => match cursor {
                0 => {
                    self.alarm_to_set = AlarmSlot::One;
                    self.ui.transition_to(Frame::AlarmMenu);
                }
                1 => {
                    self.alarm_to_set = AlarmSlot::Two;
                    self.ui.transition_to(Frame::AlarmMenu);
                }
                2 => self.ui.transition_to(Frame::PlayerMenu),
                3 => self.ui.transition_to(Frame::LightDuration),
                4 => self.ui.transition_to(Frame::WifiMenu),
                5 => self.ui.transition_to(Frame::Info),
                _ => {}
            },
            Direction::Left => self.ui.transition_to(Frame::Overview),
            Direction::Up => self
                .ui
                .set_cursor((cursor + SETTINGS_OPTIONS - 1) % SETTINGS_OPTIONS),
            Direction::Down => self.ui.set_cursor((cursor + 1) % SETTINGS_OPTIONS),
        }
        Ok(())
    }

    fn on_alarm_menu(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let cursor = self.ui.cursor();
        match direction {
            // Center on the toggle and 8h entries acts without leaving the
            // menu; Right (and Center elsewhere) also navigates.
            Direction::Center if cursor == 1 => self.toggle_selected_enabled()?,
            Direction::Center if cursor == 2 => self.selected_in_8h()?,
            Direction::Center | Direction::Right => match cursor {
                0 => self.ui.transition_to(Frame::AlarmTime),
                1 => {
                    self.toggle_selected_enabled()?;
                    self.ui.transition_to(Frame::Home);
                }
                2 => {
                    self.selected_in_8h()?;
                    self.ui.transition_to(Frame::Home);
                }
                3 => self.ui.transition_to(Frame::AlarmSound),
                _ => {}
            },
            Direction::Left => {
                self.ui.transition_to(Frame::Settings);
                let entry = if self.alarm_to_set == AlarmSlot::One { 0 } else { 1 };
                self.ui.set_cursor(entry);
            }
            Direction::Up => self
                .ui
                .set_cursor((cursor + ALARM_MENU_OPTIONS - 1) % ALARM_MENU_OPTIONS),
            Direction::Down => self.ui.set_cursor((cursor + 1) % ALARM_MENU_OPTIONS),
        }
        Ok(())
    }

    /// Cursor 0-3 edit the time digits (hour tens, hour ones, minute tens,
    /// minute ones), cursor 4-10 set or clear the repeat bits Sunday through
    /// Saturday. Every edit enables the alarm and re-arms its slot.
    fn on_alarm_time(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let cursor = self.ui.cursor();
        match direction {
            Direction::Left => {
                if cursor == 0 {
                    self.ui.transition_to(Frame::AlarmMenu);
                } else {
                    self.ui.set_cursor(cursor - 1);
                }
            }
            Direction::Center => self.ui.transition_to(Frame::Home),
            Direction::Right => {
                if cursor == 10 {
                    self.ui.transition_to(Frame::Home);
                } else {
                    self.ui.set_cursor(cursor + 1);
                }
            }
            Direction::Up | Direction::Down => {
                let up = direction == Direction::Up;
                let index = self.alarm_to_set.index();
                match cursor {
                    0 => {
                        let hour = bump_hour_tens(self.alarms[index].hour(), up);
                        self.alarms[index].set_hour(&mut self.store, hour)?;
                    }
                    1 => {
                        let hour = bump_hour_ones(self.alarms[index].hour(), up);
                        self.alarms[index].set_hour(&mut self.store, hour)?;
                    }
                    2 => {
                        let minute = bump_minute_tens(self.alarms[index].minute(), up);
                        self.alarms[index].set_minute(&mut self.store, minute)?;
                    }
                    3 => {
                        let minute = bump_minute_ones(self.alarms[index].minute(), up);
                        self.alarms[index].set_minute(&mut self.store, minute)?;
                    }
                    _ => {
                        let bit = 1u8 << (cursor - 4).min(6);
                        let mask = self.alarms[index].repeat();
                        let mask = if up { mask | bit } else { mask & !bit };
                        self.alarms[index].set_repeat(&mut self.store, mask)?;
                    }
                }
                self.alarms[index].set_enabled(&mut self.store, true)?;
                self.alarms[index].arm_next(&mut self.clock)?;
            }
        }
        Ok(())
    }

    fn on_alarm_sound(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let count = self.sounds.len() as u8;
        let index = self.alarm_to_set.index();
        match direction {
            Direction::Center => {
                // Preview: the configured track, or any random one for id 0.
                let configured = self.alarms[index].sound_id();
                if configured != 0 {
                    self.player.play(configured);
                } else if count > 0 {
                    let id = self.rng.gen_range(1..=count);
                    self.player.play(id);
                }
            }
            Direction::Left => {
                self.ui.transition_to(Frame::AlarmMenu);
                self.ui.set_cursor(3);
            }
            Direction::Right => self.ui.transition_to(Frame::Home),
            Direction::Up => {
                let next = cycle_sound_id(self.alarms[index].sound_id(), count, true);
                self.alarms[index].set_sound(&mut self.store, next)?;
            }
            Direction::Down => {
                let next = cycle_sound_id(self.alarms[index].sound_id(), count, false);
                self.alarms[index].set_sound(&mut self.store, next)?;
            }
        }
        Ok(())
    }

    fn on_player_menu(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let cursor = self.ui.cursor();
        match direction {
            Direction::Center if cursor == 2 => self.player.stop(),
            Direction::Center | Direction::Right => match cursor {
                0 => self.ui.transition_to(Frame::Volume),
                1 => self.ui.transition_to(Frame::PlaySound),
                2 => {
                    self.player.stop();
                    self.ui.transition_to(Frame::Home);
                }
                3 => self.ui.transition_to(Frame::SoundRandom),
                _ => {}
            },
            Direction::Left => {
                self.ui.transition_to(Frame::Settings);
                self.ui.set_cursor(2);
            }
            Direction::Up => self
                .ui
                .set_cursor((cursor + PLAYER_MENU_OPTIONS - 1) % PLAYER_MENU_OPTIONS),
            Direction::Down => self.ui.set_cursor((cursor + 1) % PLAYER_MENU_OPTIONS),
        }
        Ok(())
    }

    fn on_volume(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center | Direction::Right => self.ui.transition_to(Frame::Home),
            Direction::Left => self.ui.transition_to(Frame::PlayerMenu),
            Direction::Up => self.player.incr_volume(&mut self.store)?,
            Direction::Down => self.player.decr_volume(&mut self.store)?,
        }
        Ok(())
    }

    /// Cursor selects the track, 0 meaning "random".
    fn on_play_sound(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let count = self.sounds.len() as u8;
        let cursor = self.ui.cursor();
        match direction {
            Direction::Center | Direction::Left => {
                if direction == Direction::Center {
                    if cursor != 0 {
                        self.player.play(cursor);
                    } else if count > 0 {
                        let id = self.rng.gen_range(1..=count);
                        self.player.play(id);
                    }
                }
                self.ui.transition_to(Frame::PlayerMenu);
                self.ui.set_cursor(1);
            }
            Direction::Right => self.ui.transition_to(Frame::Home),
            Direction::Up => self.ui.set_cursor((cursor + 1) % (count + 1)),
            Direction::Down => self.ui.set_cursor((cursor + count) % (count + 1)),
        }
        Ok(())
    }

    /// Cursor selects the track (cursor + 1 is the id); Center toggles its
    /// random-play eligibility, Right toggles and leaves.
    fn on_sound_random(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let count = self.sounds.len() as u8;
        let cursor = self.ui.cursor();
        match direction {
            Direction::Center => self.toggle_sound_random(cursor + 1)?,
            Direction::Right => {
                self.toggle_sound_random(cursor + 1)?;
                self.ui.transition_to(Frame::Home);
            }
            Direction::Left => {
                self.ui.transition_to(Frame::PlayerMenu);
                self.ui.set_cursor(3);
            }
            Direction::Up if count > 0 => self.ui.set_cursor((cursor + 1) % count),
            Direction::Down if count > 0 => self.ui.set_cursor((cursor + count - 1) % count),
            Direction::Up | Direction::Down => {}
        }
        Ok(())
    }

    fn on_light_duration(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center | Direction::Right => self.ui.transition_to(Frame::Home),
            Direction::Left => {
                self.ui.transition_to(Frame::Settings);
                self.ui.set_cursor(3);
            }
            Direction::Up => self.main_light.incr_duration(&mut self.store)?,
            Direction::Down => self.main_light.decr_duration(&mut self.store)?,
        }
        Ok(())
    }

    fn on_wifi_menu(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center | Direction::Right => self.ui.transition_to(Frame::Provisioning),
            Direction::Left => {
                self.ui.transition_to(Frame::Settings);
                self.ui.set_cursor(4);
            }
            Direction::Up | Direction::Down => {}
        }
        Ok(())
    }

    /// Cursor doubles as the provisioning status: 0 idle, 1 running,
    /// 2 failed, 3 succeeded. Navigation is locked while running.
    fn on_provisioning(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        let running = self.ui.cursor() == 1;
        match direction {
            Direction::Center if !running => {
                self.ui.set_cursor(1);
                self.out.start_provisioning();
            }
            Direction::Right if !running => self.ui.transition_to(Frame::Home),
            Direction::Left if !running => self.ui.transition_to(Frame::WifiMenu),
            _ => {}
        }
        Ok(())
    }

    fn on_info(&mut self, direction: Direction, _now: Instant) -> Result<(), Error> {
        match direction {
            Direction::Center | Direction::Right => self.ui.transition_to(Frame::Home),
            Direction::Left => {
                self.ui.transition_to(Frame::Settings);
                self.ui.set_cursor(5);
            }
            Direction::Up | Direction::Down => {}
        }
        Ok(())
    }
}

/// Cycles a sound id through 0 ("random") and the catalog's 1-based ids.
/// Widened arithmetic keeps a stale persisted id from overflowing.
const fn cycle_sound_id(id: u8, count: u8, up: bool) -> u8 {
    let range = count as u16 + 1;
    let step = if up { 1 } else { count as u16 };
    ((id as u16 + step) % range) as u8
}

/// Snooze duration steps: fine-grained at the low end, coarse above, wrapping
/// back to the minimum past 45 minutes.
fn snooze_step_up(minutes: u8) -> u8 {
    let next = if minutes < 10 {
        minutes + 1
    } else if minutes < 20 {
        minutes + 5
    } else {
        minutes + 10
    };
    if next > 45 { 2 } else { next }
}

/// Inverse of [`snooze_step_up`], wrapping from the minimum to 45.
fn snooze_step_down(minutes: u8) -> u8 {
    if minutes > 20 {
        minutes - 10
    } else if minutes > 10 {
        minutes - 5
    } else if minutes > 2 {
        minutes - 1
    } else {
        45
    }
}

/// Cycles the hour tens digit through 0, 1, 2, clamped to 23.
const fn bump_hour_tens(hour: u8, up: bool) -> u8 {
    let shifted = if up { hour + 10 } else { hour + 20 };
    let result = shifted % 30;
    if result > 23 { 23 } else { result }
}

/// Cycles the hour ones digit within its tens, clamped to 23.
const fn bump_hour_ones(hour: u8, up: bool) -> u8 {
    if up && hour == 23 {
        return 20;
    }
    let ones = if up {
        (hour % 10 + 1) % 10
    } else {
        (hour % 10 + 9) % 10
    };
    let result = hour - hour % 10 + ones;
    if result > 23 { 23 } else { result }
}

/// Cycles the minute tens digit through 0..=5.
const fn bump_minute_tens(minute: u8, up: bool) -> u8 {
    let shifted = if up { minute + 10 } else { minute + 50 };
    let result = shifted % 60;
    if result > 59 { 59 } else { result }
}

/// Cycles the minute ones digit within its tens.
const fn bump_minute_ones(minute: u8, up: bool) -> u8 {
    let ones = if up {
        (minute % 10 + 1) % 10
    } else {
        (minute % 10 + 9) % 10
    };
    let result = minute - minute % 10 + ones;
    if result > 59 { 59 } else { result }
}
