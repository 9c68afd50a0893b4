use crate::device_state::DeviceState;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of a session for status displays.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Telemetry {
    pub port_name: String,
    pub state: DeviceState,
    /// Last motor speed acknowledged or reported by the device.
    pub motor_speed_hz: Option<i32>,
    /// Last sample rate acknowledged or reported by the device.
    pub sample_rate_hz: Option<i32>,
    pub scans_completed: u64,
    pub dropped_samples: u64,
    pub corrupted_frames: u64,
}
