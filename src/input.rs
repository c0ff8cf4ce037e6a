//! Debounced directional input from the five capacitive touch pads.
//!
//! Each poll averages a burst of raw samples per pad and compares it against
//! an adaptive per-pad baseline; the baseline follows untouched readings so
//! the pads stay calibrated as temperature and humidity drift. The pad group
//! emits each direction exactly once per continuous touch: a latch is set on
//! the first touched scan and released only by a scan in which no pad is
//! touched.

use crate::hardware::TouchSource;

/// Raw samples averaged per pad reading.
const SAMPLES: u32 = 10;

/// A pad counts as touched when its averaged reading drops below this
/// fraction of the baseline.
const TOLERANCE: f32 = 0.9;

/// Raw reads attempted before a sample is given up on. The capacitive front
/// end occasionally returns the 0 sentinel; the retry is bounded so the tick
/// rate is preserved.
const READ_RETRIES: u32 = 64;

/// One of the five physical touch pads, in scan precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pad {
    Mid,
    Left,
    Right,
    Up,
    Down,
}

impl Pad {
    /// Scan order; when several pads are touched at once the first wins.
    pub const SCAN: [Self; 5] = [Self::Mid, Self::Left, Self::Right, Self::Up, Self::Down];

    /// The direction this pad produces.
    pub const fn direction(self) -> Direction {
        match self {
            Self::Mid => Direction::Center,
            Self::Left => Direction::Left,
            Self::Right => Direction::Right,
            Self::Up => Direction::Up,
            Self::Down => Direction::Down,
        }
    }
}

/// A debounced directional press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// The defuse-code digit this direction enters, `None` for Center.
    pub(crate) const fn defuse_digit(self) -> Option<u8> {
        match self {
            Self::Left => Some(0),
            Self::Right => Some(1),
            Self::Up => Some(2),
            Self::Down => Some(3),
            Self::Center => None,
        }
    }
}

/// One touch pad with its adaptive baseline.
#[derive(Debug)]
struct TouchChannel {
    pad: Pad,
    baseline: f32,
}

impl TouchChannel {
    const fn new(pad: Pad) -> Self {
        Self { pad, baseline: 0.0 }
    }

    /// One raw sample with bounded retries; `None` when the source keeps
    /// returning the no-signal sentinel.
    fn read_one<T: TouchSource>(src: &mut T, pad: Pad) -> Option<f32> {
        for _ in 0..READ_RETRIES {
            let raw = src.read_raw(pad);
            if raw != 0 {
                return Some(f32::from(raw));
            }
        }
        None
    }

    /// A burst of samples averaged; `None` when not a single sample arrived.
    fn read_averaged<T: TouchSource>(src: &mut T, pad: Pad) -> Option<f32> {
        let mut sum = 0.0;
        let mut count = 0u32;
        for _ in 0..SAMPLES {
            if let Some(value) = Self::read_one(src, pad) {
                sum += value;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f32)
    }

    /// Seeds the baseline from an untouched reading.
    fn calibrate<T: TouchSource>(&mut self, src: &mut T) {
        if let Some(average) = Self::read_averaged(src, self.pad) {
            self.baseline = average;
        }
        debug!("pad baseline {}", self.baseline);
    }

    /// Samples the pad once. On a non-touch the baseline slides halfway
    /// toward the reading, tracking environmental drift.
    fn sample<T: TouchSource>(&mut self, src: &mut T) -> bool {
        let Some(average) = Self::read_averaged(src, self.pad) else {
            return false;
        };
        if average < self.baseline * TOLERANCE {
            true
        } else {
            self.baseline = (self.baseline + average) / 2.0;
            false
        }
    }
}

/// The five-pad navigation cross with its shared press latch.
#[derive(Debug)]
pub struct NavPad {
    channels: [TouchChannel; 5],
    latched: bool,
}

impl Default for NavPad {
    fn default() -> Self {
        Self::new()
    }
}

impl NavPad {
    /// A pad group with unset baselines. Call [`NavPad::calibrate`] before
    /// polling.
    pub const fn new() -> Self {
        Self {
            channels: [
                TouchChannel::new(Pad::Mid),
                TouchChannel::new(Pad::Left),
                TouchChannel::new(Pad::Right),
                TouchChannel::new(Pad::Up),
                TouchChannel::new(Pad::Down),
            ],
            latched: false,
        }
    }

    /// Calibrates every pad's baseline from untouched readings.
    pub fn calibrate<T: TouchSource>(&mut self, src: &mut T) {
        for channel in &mut self.channels {
            channel.calibrate(src);
        }
    }

    /// Samples the pads once, in precedence order, stopping at the first
    /// touched pad. Emits the direction only on the rising edge of a press;
    /// the latch releases when a scan finds no pad touched.
    pub fn poll<T: TouchSource>(&mut self, src: &mut T) -> Option<Direction> {
        let mut touched = None;
        for channel in &mut self.channels {
            if channel.sample(src) {
                touched = Some(channel.pad.direction());
                break;
            }
        }

        match touched {
            Some(direction) if !self.latched => {
                self.latched = true;
                Some(direction)
            }
            None => {
                self.latched = false;
                None
            }
            Some(_) => None,
        }
    }
}
