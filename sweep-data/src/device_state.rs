#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a device session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceState {
    /// Connected and not streaming samples.
    #[default]
    Idle,
    /// The device is rotating and streaming samples.
    Scanning,
    /// An unrecoverable transport or device fault happened.
    /// Only `reset` or `destruct` leave this state.
    Error,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceState::Idle => write!(f, "idle"),
            DeviceState::Scanning => write!(f, "scanning"),
            DeviceState::Error => write!(f, "error"),
        }
    }
}
