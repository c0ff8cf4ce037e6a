//! Crate error types. All variants carry only fixed-size data.

use crate::hardware::AlarmSlot;

/// The key-value settings store rejected an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// A stored value could not be read or decoded.
    Read,
    /// A value could not be written through to the store.
    Write,
}

/// The wall clock rejected an alarm-compare request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockError;

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Settings store read/write failed.
    Store(StoreError),
    /// The clock rejected arming the given alarm-compare slot. The alarm's
    /// declared enabled state no longer matches hardware reality.
    AlarmArm(AlarmSlot),
    /// The persisted sound catalog could not be parsed.
    SoundCatalog,
    /// A value did not fit its JSON output buffer.
    Encode,
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Read => write!(f, "settings store read failed"),
            Self::Write => write!(f, "settings store write failed"),
        }
    }
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "clock rejected the alarm-compare request")
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::AlarmArm(slot) => {
                write!(f, "failed to arm alarm slot {}", slot.number())
            }
            Self::SoundCatalog => write!(f, "sound catalog is malformed"),
            Self::Encode => write!(f, "JSON output buffer too small"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StoreError {}

#[cfg(feature = "std")]
impl std::error::Error for ClockError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
