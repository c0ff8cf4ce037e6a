//! The application state and tick engine.
//!
//! [`AlarmClock`] owns every piece of mutable state — the two alarms, the
//! sound catalog, the navigation pad, the frame graph and the timers — and is
//! ticked by the platform's main loop. Within one tick the order is fixed:
//! countdown timers, the drained ring flag, then at most one debounced input
//! dispatched to the active frame's handler. The RTC interrupt only raises
//! the [`RingFlag`]; everything else happens here, on one logical thread.

use core::time::Duration;

use rand::{Rng, RngCore};

use crate::alarm::{Alarm, AlarmSnapshot, AlarmState};
use crate::error::Error;
use crate::hardware::{
    AlarmSlot, Outputs, RingFlag, Scroll, SettingsStore, SoundPlayer, TouchSource, WallClock,
};
use crate::input::NavPad;
use crate::light::{Illumination, MainLight};
use crate::sound::{Player, SoundBank};
use crate::time::{Instant, SoftTimer};
use crate::ui::{Frame, UiState};

/// Length of the defuse code.
pub const DEFUSE_LEN: usize = 6;

/// Snooze duration applied after a failed defuse attempt.
pub const DEFAULT_SNOOZE_MINUTES: u8 = 5;

/// Fail-safe: a ringing alarm is silenced after this long with no response.
const AUTO_STOP_PERIOD: Duration = Duration::from_secs(30 * 60);

/// How long scrolled info pages stay before snapping back to the first page.
pub(crate) const SCROLL_BACK_PERIOD: Duration = Duration::from_secs(10);

/// Indicator LED duty while an alarm rings.
const INDICATOR_ON: u8 = u8::MAX;

/// Indicator LED duty while snoozed.
const INDICATOR_SNOOZED: u8 = 1;

/// The whole device state, constructed once at startup and ticked by the
/// platform loop.
pub struct AlarmClock<'f, W, T, P, S, O, R>
where
    W: WallClock,
    T: TouchSource,
    P: SoundPlayer,
    S: SettingsStore,
    O: Outputs,
    R: RngCore,
{
    pub(crate) clock: W,
    pub(crate) touch: T,
    pub(crate) player: Player<P>,
    pub(crate) store: S,
    pub(crate) out: O,
    pub(crate) rng: R,
    ring: &'f RingFlag,
    pub(crate) pads: NavPad,
    pub(crate) alarms: [Alarm; 2],
    pub(crate) sounds: SoundBank,
    pub(crate) ui: UiState,
    pub(crate) main_light: MainLight,
    pub(crate) illumination: Illumination,
    pub(crate) alarm_to_set: AlarmSlot,
    pub(crate) snooze_minutes: u8,
    pub(crate) defuse_code: [u8; DEFUSE_LEN],
    pub(crate) defuse_entry: [u8; DEFUSE_LEN],
    pub(crate) auto_stop: SoftTimer,
    pub(crate) scroll_back: SoftTimer,
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
    /// Boots the device state: loads every persisted setting (seeding the
    /// store with defaults on first boot), loads the sound catalog,
    /// calibrates the touch pads and arms the hardware slots of enabled
    /// alarms. Store and arm failures are surfaced to the boot sequence.
    pub fn new(
        mut clock: W,
        mut touch: T,
        player: P,
        mut store: S,
        out: O,
        rng: R,
        ring: &'f RingFlag,
    ) -> Result<Self, Error> {
        let mut alarms = [Alarm::new(AlarmSlot::One), Alarm::new(AlarmSlot::Two)];
        for alarm in &mut alarms {
            alarm.load(&mut store)?;
        }

        let sounds = SoundBank::load(&mut store)?;

        let mut player = Player::new(player);
        player.load(&mut store)?;

        let mut main_light = MainLight::new();
        main_light.load(&mut store)?;

        let mut pads = NavPad::new();
        pads.calibrate(&mut touch);

        for alarm in &mut alarms {
            alarm.arm_next(&mut clock)?;
        }

        info!("alarm clock core up");
        Ok(Self {
            clock,
            touch,
            player,
            store,
            out,
            rng,
            ring,
            pads,
            alarms,
            sounds,
            ui: UiState::new(),
            main_light,
            illumination: Illumination::new(),
            alarm_to_set: AlarmSlot::One,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            defuse_code: [0; DEFUSE_LEN],
            defuse_entry: [0; DEFUSE_LEN],
            auto_stop: SoftTimer::new(),
            scroll_back: SoftTimer::new(),
        })
    }

    /// One cooperative tick: expire countdowns, drain the ring flag, then
    /// consume at most one debounced direction and hand it to the active
    /// frame. Runs to completion; nothing here blocks beyond the bounded
    /// touch-read retry.
    pub fn tick(&mut self, now: Instant) -> Result<(), Error> {
        if self.auto_stop.poll(now) {
            warn!("auto-stop timeout, silencing alarms");
            self.stop_alarms()?;
        }
        if self.scroll_back.poll(now) {
            self.out.scroll_display(Scroll::Home);
        }
        if self.main_light.tick(&mut self.out, now) {
            let duty = self.main_light.duty();
            self.illumination.refresh(&mut self.out, duty);
        }
        self.illumination.tick(&mut self.out, now, self.main_light.duty());

        if self.ui.poll_idle(now) && !self.ui.frame().is_alarm_related() {
            info!("idle timeout, returning to home frame");
            self.ui.transition_to(Frame::Home);
        }

        if self.ring.take() {
            self.dispatch_ring(now)?;
        }

        if let Some(direction) = self.pads.poll(&mut self.touch) {
            let duty = self.main_light.duty();
            self.illumination.input(&mut self.out, now, duty);
            if !self.any_playing() {
                self.ui.restart_idle(now);
            }
            self.dispatch(direction, now)?;
        }

        Ok(())
    }

    /// Reacts to the hardware alarm-fired signal. Each slot whose compare
    /// matched transitions its alarm to `Playing` and starts its sound; the
    /// ring-wide effects (lights, fail-safe, defuse code, frame pre-emption)
    /// run once even when both slots fire on the same tick.
    fn dispatch_ring(&mut self, now: Instant) -> Result<(), Error> {
        let mut any_fired = false;

        for index in 0..self.alarms.len() {
            let slot = self.alarms[index].slot();
            if !self.clock.fired(slot) {
                continue;
            }
            self.clock.clear(slot);
            self.alarms[index].set_state(AlarmState::Playing);
            any_fired = true;

            let configured = self.alarms[index].sound_id();
            let track = if configured != 0 {
                configured
            } else {
                self.sounds.pick_random(&mut self.rng).unwrap_or(1)
            };
            info!("alarm {} fired, looping track {}", slot.number(), track);
            self.player.play_loop(track);
        }

        if any_fired {
            self.out.set_indicator_duty(INDICATOR_ON);
            self.main_light.turn_on(&mut self.out, now);
            let duty = self.main_light.duty();
            self.illumination.refresh(&mut self.out, duty);
            self.auto_stop.start(now, AUTO_STOP_PERIOD);

            for digit in &mut self.defuse_code {
                *digit = self.rng.gen_range(0..4u8);
            }
            self.defuse_entry = [0; DEFUSE_LEN];

            self.ui.stop_idle();
            self.ui.transition_to(Frame::Ringing);
        }

        Ok(())
    }

    /// Silences every ringing or snoozed alarm. A one-shot alarm ends
    /// disabled and disarmed; a repeating alarm is re-armed for its next
    /// occurrence.
    pub fn stop_alarms(&mut self) -> Result<(), Error> {
        self.player.stop();
        self.out.set_indicator_duty(0);
        self.auto_stop.stop();

        for alarm in &mut self.alarms {
            if alarm.state() == AlarmState::Off {
                continue;
            }
            alarm.set_state(AlarmState::Off);
            if alarm.repeat() == 0 {
                alarm.set_enabled(&mut self.store, false)?;
                self.clock.disarm(alarm.slot());
                info!("one-shot alarm {} disabled", alarm.slot().number());
            } else {
                alarm.arm_next(&mut self.clock)?;
            }
        }
        Ok(())
    }

    /// Postpones every playing alarm by the current snooze duration. Snooze
    /// is itself an armed compare, so the fail-safe timer stops here and is
    /// restarted by the next ring.
    pub fn snooze_alarms(&mut self) -> Result<(), Error> {
        self.player.stop();
        self.out.set_indicator_duty(INDICATOR_SNOOZED);
        self.auto_stop.stop();

        let wake = self.clock.now().plus_minutes(u32::from(self.snooze_minutes));
        for alarm in &mut self.alarms {
            if alarm.state() != AlarmState::Playing {
                continue;
            }
            let slot = alarm.slot();
            self.clock.clear(slot);
            self.clock
                .arm(slot, wake)
                .map_err(|_| Error::AlarmArm(slot))?;
            alarm.set_state(AlarmState::Snoozed);
            info!(
                "alarm {} snoozed for {} min",
                slot.number(),
                self.snooze_minutes
            );
        }
        Ok(())
    }

    /// Feeds an ambient light reading from the sensor.
    pub fn ambient_light(&mut self, lux: f32, now: Instant) {
        let duty = self.main_light.duty();
        self.illumination.ambient(&mut self.out, lux, now, duty);
    }

    pub(crate) fn any_playing(&self) -> bool {
        self.alarms
            .iter()
            .any(|a| a.state() == AlarmState::Playing)
    }

    pub(crate) fn any_snoozed(&self) -> bool {
        self.alarms
            .iter()
            .any(|a| a.state() == AlarmState::Snoozed)
    }

    pub(crate) fn toggle_selected_enabled(&mut self) -> Result<(), Error> {
        let index = self.alarm_to_set.index();
        let enabled = !self.alarms[index].enabled();
        self.alarms[index].set_enabled(&mut self.store, enabled)?;
        self.alarms[index].arm_next(&mut self.clock)?;
        Ok(())
    }

    pub(crate) fn selected_in_8h(&mut self) -> Result<(), Error> {
        let now = self.clock.now();
        let index = self.alarm_to_set.index();
        self.alarms[index].set_in_8h(&mut self.store, &now)?;
        self.alarms[index].arm_next(&mut self.clock)?;
        Ok(())
    }

    pub(crate) fn adjust_main_light(&mut self, now: Instant, up: bool) {
        if up {
            self.main_light.incr_duty(&mut self.out, now);
        } else {
            self.main_light.decr_duty(&mut self.out, now);
        }
        let duty = self.main_light.duty();
        self.illumination.refresh(&mut self.out, duty);
    }

    pub(crate) fn toggle_sound_random(&mut self, id: u8) -> Result<(), Error> {
        if self.sounds.toggle_allow_random(id).is_some() {
            self.sounds.save(&mut self.store)?;
        }
        Ok(())
    }

    /// The active frame, for the renderer.
    pub fn frame(&self) -> Frame {
        self.ui.frame()
    }

    /// The active frame's cursor, for the renderer.
    pub fn cursor(&self) -> u8 {
        self.ui.cursor()
    }

    /// The alarm currently being edited in the menus.
    pub const fn selected_slot(&self) -> AlarmSlot {
        self.alarm_to_set
    }

    /// One alarm, read-only.
    pub fn alarm(&self, slot: AlarmSlot) -> &Alarm {
        &self.alarms[slot.index()]
    }

    /// The sound catalog, read-only.
    pub const fn sounds(&self) -> &SoundBank {
        &self.sounds
    }

    /// The code the user must re-enter to silence the ring.
    pub const fn defuse_code(&self) -> &[u8; DEFUSE_LEN] {
        &self.defuse_code
    }

    /// Current snooze duration in minutes.
    pub const fn snooze_minutes(&self) -> u8 {
        self.snooze_minutes
    }

    /// Current playback volume.
    pub fn volume(&self) -> u8 {
        self.player.volume()
    }

    /// The main light, read-only.
    pub const fn main_light(&self) -> &MainLight {
        &self.main_light
    }

    /// Per-alarm view with the next occurrence computed against the current
    /// wall-clock time.
    pub fn alarm_snapshot(&mut self, slot: AlarmSlot) -> AlarmSnapshot {
        let now = self.clock.now();
        self.alarms[slot.index()].snapshot(&now)
    }

    /// Serializes an alarm snapshot as JSON for the web layer, returning the
    /// number of bytes written.
    pub fn alarm_snapshot_json(&mut self, slot: AlarmSlot, buf: &mut [u8]) -> Result<usize, Error> {
        let snapshot = self.alarm_snapshot(slot);
        serde_json_core::ser::to_slice(&snapshot, buf).map_err(|_| Error::Encode)
    }
}
