//! The main light with its persisted auto-off duration, and the display
//! illumination coordinator that decides when the matrix may shut down.

use core::time::Duration;

use crate::error::StoreError;
use crate::hardware::{Outputs, SettingsStore};
use crate::settings::Setting;
use crate::time::{Instant, SoftTimer};

/// Duty ceiling of the 3-bit main light channel.
pub const DUTY_MAX: u8 = 7;

/// How long a manual wake keeps the display lit in the dark.
const ILLUMINATE_PERIOD: Duration = Duration::from_secs(5);

/// Ambient readings below this count as dark.
const DARK_LUX: f32 = 1e-5;

/// Store key for the main light auto-off duration, in minutes.
const DURATION_KEY: &str = "lightDuration";

/// The room light on the 3-bit PWM channel. A non-zero configured duration
/// arms an auto-off countdown whenever the duty is raised above zero.
#[derive(Debug)]
pub struct MainLight {
    duty: u8,
    duration: Setting<u8>,
    off_timer: SoftTimer,
}

impl Default for MainLight {
    fn default() -> Self {
        Self::new()
    }
}

impl MainLight {
    pub fn new() -> Self {
        Self {
            duty: 0,
            duration: Setting::new(DURATION_KEY, 0),
            off_timer: SoftTimer::new(),
        }
    }

    /// Loads the persisted auto-off duration.
    pub fn load<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        self.duration.load(store)
    }

    /// Current PWM duty, 0..=7.
    pub const fn duty(&self) -> u8 {
        self.duty
    }

    /// Auto-off duration in minutes; 0 keeps the light on until turned off.
    pub fn duration(&self) -> u8 {
        self.duration.get()
    }

    fn apply<O: Outputs>(&mut self, out: &mut O, now: Instant) {
        out.set_main_light_duty(self.duty);
        if self.duty > 0 && self.duration.get() > 0 {
            let minutes = u64::from(self.duration.get());
            self.off_timer.start(now, Duration::from_secs(minutes * 60));
        } else {
            self.off_timer.stop();
        }
    }

    /// Full brightness, restarting the auto-off countdown.
    pub fn turn_on<O: Outputs>(&mut self, out: &mut O, now: Instant) {
        self.duty = DUTY_MAX;
        self.apply(out, now);
    }

    /// Off, cancelling the countdown.
    pub fn turn_off<O: Outputs>(&mut self, out: &mut O, now: Instant) {
        self.duty = 0;
        self.apply(out, now);
    }

    /// One duty step brighter.
    pub fn incr_duty<O: Outputs>(&mut self, out: &mut O, now: Instant) {
        self.duty = (self.duty + 1).min(DUTY_MAX);
        self.apply(out, now);
    }

    /// One duty step dimmer.
    pub fn decr_duty<O: Outputs>(&mut self, out: &mut O, now: Instant) {
        self.duty = self.duty.saturating_sub(1);
        self.apply(out, now);
    }

    /// Longer auto-off duration: +5 min below 30, +10 below 90, +30 beyond.
    pub fn incr_duration<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        let current = self.duration.get();
        let next = if current < 30 {
            current + 5
        } else if current < 90 {
            current + 10
        } else {
            current.saturating_add(30)
        };
        self.duration.set(store, next)
    }

    /// Shorter auto-off duration, mirroring the increment steps, floored at
    /// zero (stay on).
    pub fn decr_duration<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        let current = self.duration.get();
        let next = if current >= 90 {
            current - 30
        } else if current >= 30 {
            current - 10
        } else {
            current.saturating_sub(5)
        };
        self.duration.set(store, next)
    }

    /// Drives the auto-off countdown. Returns whether the light switched
    /// off, so the illumination state can be re-evaluated.
    pub fn tick<O: Outputs>(&mut self, out: &mut O, now: Instant) -> bool {
        if self.off_timer.poll(now) {
            info!("main light auto-off after {} min", self.duration.get());
            self.duty = 0;
            out.set_main_light_duty(0);
            true
        } else {
            false
        }
    }
}

/// Decides whether the display may shut down, from ambient light, a manual
/// illuminate timeout and the main light duty. The display goes dark only
/// when none of the three hold.
#[derive(Debug)]
pub struct Illumination {
    lux: f32,
    illuminate: SoftTimer,
    display_on: bool,
}

impl Default for Illumination {
    fn default() -> Self {
        Self::new()
    }
}

impl Illumination {
    pub const fn new() -> Self {
        Self {
            lux: 0.0,
            illuminate: SoftTimer::new(),
            display_on: true,
        }
    }

    /// Whether the room currently counts as dark.
    pub fn is_dark(&self) -> bool {
        self.lux < DARK_LUX
    }

    /// Feeds a new ambient reading. A lit-to-dark edge starts the manual
    /// illuminate window so the display does not cut out the moment the room
    /// light goes off.
    pub fn ambient<O: Outputs>(&mut self, out: &mut O, lux: f32, now: Instant, main_duty: u8) {
        if !self.is_dark() && lux < DARK_LUX {
            self.illuminate.start(now, ILLUMINATE_PERIOD);
        }
        self.lux = lux;
        out.set_display_brightness(brightness_for(lux));
        self.refresh(out, main_duty);
    }

    /// Qualifying user input restarts the illuminate window while dark and
    /// wakes the display.
    pub fn input<O: Outputs>(&mut self, out: &mut O, now: Instant, main_duty: u8) {
        if self.is_dark() {
            self.illuminate.start(now, ILLUMINATE_PERIOD);
            self.refresh(out, main_duty);
        }
    }

    /// Re-evaluates display power after a duty change.
    pub fn refresh<O: Outputs>(&mut self, out: &mut O, main_duty: u8) {
        let on = !self.is_dark() || self.illuminate.is_running() || main_duty > 0;
        if on != self.display_on {
            info!("display power {}", on);
            self.display_on = on;
            out.set_display_power(on);
        }
    }

    /// Expires the illuminate window.
    pub fn tick<O: Outputs>(&mut self, out: &mut O, now: Instant, main_duty: u8) {
        if self.illuminate.poll(now) {
            self.refresh(out, main_duty);
        }
    }
}

/// The matrix brightness curve measured for the BH1750 in this housing.
fn brightness_for(lux: f32) -> u8 {
    let level = 0.1005 * lux - 0.05;
    if level <= 0.0 {
        0
    } else if level >= 255.0 {
        255
    } else {
        level as u8
    }
}
