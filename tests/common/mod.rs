//! Shared mock hardware for the matrixclock integration tests.

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use matrixclock::{
    AlarmClock, AlarmSlot, ClockError, DateTime, Instant, Outputs, Pad, RingFlag, Scroll,
    SettingsStore, SoundPlayer, StoreError, TouchSource, WallClock, Weekday,
};

// ============================================================================
// Time helpers
// ============================================================================

/// Shorthand date-time constructor.
pub fn dt(
    year: u16,
    month: u8,
    day: u8,
    weekday: Weekday,
    hour: u8,
    minute: u8,
    second: u8,
) -> DateTime {
    DateTime::new(year, month, day, weekday, hour, minute, second)
}

/// A Tuesday morning; the default "now" of the fixtures.
pub fn tuesday_7am() -> DateTime {
    dt(2024, 6, 4, Weekday::Tuesday, 7, 0, 0)
}

// ============================================================================
// Mock wall clock with two alarm-compare slots
// ============================================================================

#[derive(Debug)]
struct ClockInner {
    now: DateTime,
    armed: [Option<DateTime>; 2],
    fired: [bool; 2],
    fail_arm: bool,
}

/// Settable wall clock; cloning shares the underlying state so tests can
/// steer it while the application owns a handle.
#[derive(Clone, Debug)]
pub struct TestClock(Rc<RefCell<ClockInner>>);

impl TestClock {
    pub fn new(now: DateTime) -> Self {
        Self(Rc::new(RefCell::new(ClockInner {
            now,
            armed: [None; 2],
            fired: [false; 2],
            fail_arm: false,
        })))
    }

    pub fn set_now(&self, now: DateTime) {
        self.0.borrow_mut().now = now;
    }

    pub fn set_fired(&self, slot: AlarmSlot) {
        self.0.borrow_mut().fired[slot.index()] = true;
    }

    pub fn set_fail_arm(&self, fail: bool) {
        self.0.borrow_mut().fail_arm = fail;
    }

    pub fn armed(&self, slot: AlarmSlot) -> Option<DateTime> {
        self.0.borrow().armed[slot.index()]
    }
}

impl WallClock for TestClock {
    fn now(&mut self) -> DateTime {
        self.0.borrow().now
    }

    fn adjust(&mut self, dt: DateTime) {
        self.0.borrow_mut().now = dt;
    }

    fn arm(&mut self, slot: AlarmSlot, at: DateTime) -> Result<(), ClockError> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_arm {
            return Err(ClockError);
        }
        inner.armed[slot.index()] = Some(at);
        Ok(())
    }

    fn disarm(&mut self, slot: AlarmSlot) {
        self.0.borrow_mut().armed[slot.index()] = None;
    }

    fn fired(&mut self, slot: AlarmSlot) -> bool {
        self.0.borrow().fired[slot.index()]
    }

    fn clear(&mut self, slot: AlarmSlot) {
        self.0.borrow_mut().fired[slot.index()] = false;
    }
}

// ============================================================================
// Mock touch source
// ============================================================================

/// Raw level of an untouched pad.
pub const UNTOUCHED: u16 = 1000;

/// Raw level of a firmly touched pad.
pub const TOUCHED: u16 = 100;

#[derive(Debug)]
struct TouchInner {
    levels: [u16; 5],
    fail_reads: bool,
    reads: u64,
}

/// Touch source with test-settable pad levels. A `fail_reads` mode serves
/// the no-signal sentinel forever to exercise the bounded retry.
#[derive(Clone, Debug)]
pub struct TestTouch(Rc<RefCell<TouchInner>>);

fn pad_index(pad: Pad) -> usize {
    match pad {
        Pad::Mid => 0,
        Pad::Left => 1,
        Pad::Right => 2,
        Pad::Up => 3,
        Pad::Down => 4,
    }
}

impl Default for TestTouch {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTouch {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(TouchInner {
            levels: [UNTOUCHED; 5],
            fail_reads: false,
            reads: 0,
        })))
    }

    pub fn press(&self, pad: Pad) {
        self.0.borrow_mut().levels[pad_index(pad)] = TOUCHED;
    }

    pub fn set_level(&self, pad: Pad, level: u16) {
        self.0.borrow_mut().levels[pad_index(pad)] = level;
    }

    pub fn release_all(&self) {
        self.0.borrow_mut().levels = [UNTOUCHED; 5];
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.0.borrow_mut().fail_reads = fail;
    }

    pub fn reads(&self) -> u64 {
        self.0.borrow().reads
    }
}

impl TouchSource for TestTouch {
    fn read_raw(&mut self, pad: Pad) -> u16 {
        let mut inner = self.0.borrow_mut();
        inner.reads += 1;
        if inner.fail_reads {
            0
        } else {
            inner.levels[pad_index(pad)]
        }
    }
}

// ============================================================================
// Mock sound player
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCall {
    Play(u8),
    Loop(u8),
    Stop,
    Volume(u8),
}

/// Records every call made to the playback module.
#[derive(Clone, Debug, Default)]
pub struct TestPlayer(Rc<RefCell<Vec<PlayerCall>>>);

impl TestPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<PlayerCall> {
        self.0.borrow().last().copied()
    }

    /// The track ids of every `Loop` call, in order.
    pub fn looped(&self) -> Vec<u8> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                PlayerCall::Loop(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl SoundPlayer for TestPlayer {
    fn play(&mut self, id: u8) {
        self.0.borrow_mut().push(PlayerCall::Play(id));
    }

    fn play_loop(&mut self, id: u8) {
        self.0.borrow_mut().push(PlayerCall::Loop(id));
    }

    fn stop(&mut self) {
        self.0.borrow_mut().push(PlayerCall::Stop);
    }

    fn set_volume(&mut self, volume: u8) {
        self.0.borrow_mut().push(PlayerCall::Volume(volume));
    }
}

// ============================================================================
// Mock settings store
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Stored {
    Byte(u8),
    Flag(bool),
    Text(String),
}

#[derive(Debug, Default)]
struct StoreInner {
    map: HashMap<String, Stored>,
    fail_writes: bool,
}

/// In-memory key-value store with a failure-injection switch.
#[derive(Clone, Debug, Default)]
pub struct TestStore(Rc<RefCell<StoreInner>>);

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_u8(&self, key: &str, value: u8) {
        self.0
            .borrow_mut()
            .map
            .insert(key.into(), Stored::Byte(value));
    }

    pub fn seed_bool(&self, key: &str, value: bool) {
        self.0
            .borrow_mut()
            .map
            .insert(key.into(), Stored::Flag(value));
    }

    pub fn seed_str(&self, key: &str, value: &str) {
        self.0
            .borrow_mut()
            .map
            .insert(key.into(), Stored::Text(value.into()));
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }

    pub fn u8_value(&self, key: &str) -> Option<u8> {
        match self.0.borrow().map.get(key) {
            Some(Stored::Byte(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bool_value(&self, key: &str) -> Option<bool> {
        match self.0.borrow().map.get(key) {
            Some(Stored::Flag(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str_value(&self, key: &str) -> Option<String> {
        match self.0.borrow().map.get(key) {
            Some(Stored::Text(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

impl SettingsStore for TestStore {
    fn contains(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.0.borrow().map.contains_key(key))
    }

    fn get_u8(&mut self, key: &str) -> Result<u8, StoreError> {
        self.u8_value(key).ok_or(StoreError::Read)
    }

    fn put_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_writes {
            return Err(StoreError::Write);
        }
        inner.map.insert(key.into(), Stored::Byte(value));
        Ok(())
    }

    fn get_bool(&mut self, key: &str) -> Result<bool, StoreError> {
        self.bool_value(key).ok_or(StoreError::Read)
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_writes {
            return Err(StoreError::Write);
        }
        inner.map.insert(key.into(), Stored::Flag(value));
        Ok(())
    }

    fn get_str(&mut self, key: &str, buf: &mut [u8]) -> Result<usize, StoreError> {
        let text = self.str_value(key).ok_or(StoreError::Read)?;
        let bytes = text.as_bytes();
        if bytes.len() > buf.len() {
            return Err(StoreError::Read);
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    fn put_str(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_writes {
            return Err(StoreError::Write);
        }
        inner.map.insert(key.into(), Stored::Text(value.into()));
        Ok(())
    }
}

// ============================================================================
// Mock light/display outputs
// ============================================================================

#[derive(Debug)]
struct OutputsInner {
    indicator_duty: u8,
    main_light_duty: u8,
    brightness: u8,
    display_on: bool,
    scrolls: Vec<Scroll>,
    provisioning_runs: u32,
}

/// Records the decisions pushed to the light and display outputs.
#[derive(Clone, Debug)]
pub struct TestOutputs(Rc<RefCell<OutputsInner>>);

impl Default for TestOutputs {
    fn default() -> Self {
        Self::new()
    }
}

impl TestOutputs {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(OutputsInner {
            indicator_duty: 0,
            main_light_duty: 0,
            brightness: 0,
            display_on: true,
            scrolls: Vec::new(),
            provisioning_runs: 0,
        })))
    }

    pub fn indicator_duty(&self) -> u8 {
        self.0.borrow().indicator_duty
    }

    pub fn main_light_duty(&self) -> u8 {
        self.0.borrow().main_light_duty
    }

    pub fn brightness(&self) -> u8 {
        self.0.borrow().brightness
    }

    pub fn display_on(&self) -> bool {
        self.0.borrow().display_on
    }

    pub fn scrolls(&self) -> Vec<Scroll> {
        self.0.borrow().scrolls.clone()
    }

    pub fn provisioning_runs(&self) -> u32 {
        self.0.borrow().provisioning_runs
    }
}

impl Outputs for TestOutputs {
    fn set_indicator_duty(&mut self, duty: u8) {
        self.0.borrow_mut().indicator_duty = duty;
    }

    fn set_main_light_duty(&mut self, duty: u8) {
        self.0.borrow_mut().main_light_duty = duty;
    }

    fn set_display_brightness(&mut self, level: u8) {
        self.0.borrow_mut().brightness = level;
    }

    fn set_display_power(&mut self, on: bool) {
        self.0.borrow_mut().display_on = on;
    }

    fn scroll_display(&mut self, scroll: Scroll) {
        self.0.borrow_mut().scrolls.push(scroll);
    }

    fn start_provisioning(&mut self) {
        self.0.borrow_mut().provisioning_runs += 1;
    }
}

// ============================================================================
// Application fixture
// ============================================================================

pub type TestApp<'f> = AlarmClock<'f, TestClock, TestTouch, TestPlayer, TestStore, TestOutputs, SmallRng>;

/// All mock handles; cloned into the application so the test keeps a view.
pub struct Fixture {
    pub clock: TestClock,
    pub touch: TestTouch,
    pub player: TestPlayer,
    pub store: TestStore,
    pub out: TestOutputs,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            clock: TestClock::new(tuesday_7am()),
            touch: TestTouch::new(),
            player: TestPlayer::new(),
            store: TestStore::new(),
            out: TestOutputs::new(),
        }
    }

    /// Seeds the catalog the sound tests use: five tracks, all random-eligible.
    pub fn seed_catalog(&self) {
        self.store.seed_str(
            "sounds",
            r#"[{"id":1,"name":"Birds","allowRandom":true},
                {"id":2,"name":"Rain","allowRandom":true},
                {"id":3,"name":"Bells","allowRandom":true},
                {"id":4,"name":"Waves","allowRandom":true},
                {"id":5,"name":"Static","allowRandom":true}]"#,
        );
    }
}

/// Boots the application against the fixture's mocks.
pub fn boot<'f>(fx: &Fixture, ring: &'f RingFlag) -> TestApp<'f> {
    AlarmClock::new(
        fx.clock.clone(),
        fx.touch.clone(),
        fx.player.clone(),
        fx.store.clone(),
        fx.out.clone(),
        SmallRng::seed_from_u64(0xA1A2_C10C),
        ring,
    )
    .expect("boot failed")
}

// ============================================================================
// Input driving helpers
// ============================================================================

/// One full press-and-release cycle of a pad, across two ticks.
pub fn press(app: &mut TestApp<'_>, fx: &Fixture, pad: Pad, t: &mut u64) {
    fx.touch.press(pad);
    *t += 100;
    app.tick(Instant::from_millis(*t)).expect("tick failed");
    fx.touch.release_all();
    *t += 100;
    app.tick(Instant::from_millis(*t)).expect("tick failed");
}

/// The pad that enters the given defuse digit.
pub fn pad_for_digit(digit: u8) -> Pad {
    match digit {
        0 => Pad::Left,
        1 => Pad::Right,
        2 => Pad::Up,
        _ => Pad::Down,
    }
}

/// Raises the hardware fired latch for a slot and rings the shared flag.
pub fn fire(fx: &Fixture, ring: &RingFlag, slot: AlarmSlot) {
    fx.clock.set_fired(slot);
    ring.notify();
}
