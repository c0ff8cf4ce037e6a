//! The sound catalog and the playback wrapper around the MP3 module.
//!
//! The catalog is persisted as a JSON document under a single store key,
//! matching the `sounds.json` layout the companion tooling writes to the SD
//! card: `[{"id":1,"name":"...","allowRandom":true}, ...]`. Ids are 1-based
//! and dense; id 0 always means "pick one at random".

use heapless::{String, Vec};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Error, StoreError};
use crate::hardware::{SettingsStore, SoundPlayer};
use crate::settings::Setting;

/// Maximum number of catalog entries.
pub const MAX_SOUNDS: usize = 16;

/// Maximum sound name length in bytes.
pub const NAME_LEN: usize = 24;

/// Store key holding the catalog JSON.
const CATALOG_KEY: &str = "sounds";

/// Buffer size for the catalog JSON document.
const CATALOG_BUF: usize = 1024;

/// Store key holding the playback volume.
const VOLUME_KEY: &str = "volume";

/// Volume ceiling of the playback module.
pub const VOLUME_MAX: u8 = 30;

/// Volume seeded into a fresh store.
const VOLUME_DEFAULT: u8 = 15;

/// One playable track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    /// 1-based track number on the playback module's medium.
    pub id: u8,
    /// Display name.
    pub name: String<NAME_LEN>,
    /// Whether the random picker may select this track.
    #[serde(rename = "allowRandom")]
    pub allow_random: bool,
    /// Consumed by the random picker; reset when the pool is exhausted.
    #[serde(skip)]
    pub(crate) played: bool,
}

/// The process-wide sound catalog.
#[derive(Debug, Default)]
pub struct SoundBank {
    sounds: Vec<Sound, MAX_SOUNDS>,
}

impl SoundBank {
    /// An empty catalog.
    pub const fn new() -> Self {
        Self { sounds: Vec::new() }
    }

    /// Loads the catalog from the store. A missing key yields an empty
    /// catalog; a malformed document is an error.
    pub fn load<S: SettingsStore>(store: &mut S) -> Result<Self, Error> {
        if !store.contains(CATALOG_KEY)? {
            info!("no sound catalog in store");
            return Ok(Self::new());
        }
        let mut buf = [0u8; CATALOG_BUF];
        let len = store.get_str(CATALOG_KEY, &mut buf)?;
        let (sounds, _) =
            serde_json_core::de::from_slice::<Vec<Sound, MAX_SOUNDS>>(&buf[..len])
                .map_err(|_| Error::SoundCatalog)?;
        info!("loaded {} sounds", sounds.len());
        Ok(Self { sounds })
    }

    /// Writes the catalog back to the store.
    pub fn save<S: SettingsStore>(&self, store: &mut S) -> Result<(), Error> {
        let mut buf = [0u8; CATALOG_BUF];
        let len =
            serde_json_core::ser::to_slice(&self.sounds, &mut buf).map_err(|_| Error::Encode)?;
        let text = core::str::from_utf8(&buf[..len]).map_err(|_| Error::Encode)?;
        store.put_str(CATALOG_KEY, text).map_err(Error::Store)
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// All entries, for the renderer and the web layer.
    pub fn all(&self) -> &[Sound] {
        &self.sounds
    }

    /// Looks up a track by id.
    pub fn get(&self, id: u8) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.id == id)
    }

    /// Flips a track's `allow_random` flag. Returns the new flag value, or
    /// `None` when the id is unknown.
    pub fn toggle_allow_random(&mut self, id: u8) -> Option<bool> {
        let sound = self.sounds.iter_mut().find(|s| s.id == id)?;
        sound.allow_random = !sound.allow_random;
        Some(sound.allow_random)
    }

    /// Picks a random track without replacement: every eligible track plays
    /// once before any repeats. When the pool of `allow_random` tracks not
    /// yet played is exhausted, the played marks are reset and the pick
    /// retried. `None` only when no track allows random play at all.
    pub fn pick_random<R: RngCore>(&mut self, rng: &mut R) -> Option<u8> {
        let mut remaining = self.eligible_count();
        if remaining == 0 {
            for sound in &mut self.sounds {
                sound.played = false;
            }
            remaining = self.eligible_count();
        }
        if remaining == 0 {
            warn!("no sounds allow random play");
            return None;
        }
        let pick = rng.gen_range(0..remaining);
        let sound = self
            .sounds
            .iter_mut()
            .filter(|s| s.allow_random && !s.played)
            .nth(pick)?;
        sound.played = true;
        Some(sound.id)
    }

    fn eligible_count(&self) -> usize {
        self.sounds
            .iter()
            .filter(|s| s.allow_random && !s.played)
            .count()
    }
}

/// The playback module plus its persisted volume.
#[derive(Debug)]
pub struct Player<P: SoundPlayer> {
    dev: P,
    volume: Setting<u8>,
}

impl<P: SoundPlayer> Player<P> {
    /// Wraps the playback device. Call [`Player::load`] before first use.
    pub fn new(dev: P) -> Self {
        Self {
            dev,
            volume: Setting::sanitized(VOLUME_KEY, VOLUME_DEFAULT, |v| v.min(VOLUME_MAX)),
        }
    }

    /// Loads the persisted volume and pushes it to the device.
    pub fn load<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        self.volume.load(store)?;
        self.dev.set_volume(self.volume.get());
        Ok(())
    }

    /// Current volume, 0..=30.
    pub fn volume(&self) -> u8 {
        self.volume.get()
    }

    /// Sets and persists the volume, clamped to the module's ceiling.
    pub fn set_volume<S: SettingsStore>(
        &mut self,
        store: &mut S,
        volume: u8,
    ) -> Result<(), StoreError> {
        let volume = volume.min(VOLUME_MAX);
        self.volume.set(store, volume)?;
        self.dev.set_volume(volume);
        Ok(())
    }

    /// Raises the volume by one step.
    pub fn incr_volume<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        self.set_volume(store, self.volume.get().saturating_add(1))
    }

    /// Lowers the volume by one step.
    pub fn decr_volume<S: SettingsStore>(&mut self, store: &mut S) -> Result<(), StoreError> {
        self.set_volume(store, self.volume.get().saturating_sub(1))
    }

    /// Plays a track once. Track numbers are 1-based on the module.
    pub fn play(&mut self, id: u8) {
        self.dev.play(id.max(1));
    }

    /// Plays a track in a loop until stopped.
    pub fn play_loop(&mut self, id: u8) {
        self.dev.play_loop(id.max(1));
    }

    /// Stops playback.
    pub fn stop(&mut self) {
        self.dev.stop();
    }
}
