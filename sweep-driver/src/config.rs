//! Driver configuration, loadable from TOML.
//!
//! Every field has a default, so a file only needs the values it changes:
//!
//! ```toml
//! port = "/dev/ttyUSB1"
//!
//! [session]
//! response_timeout_ms = 250
//! ```

use crate::constants::{DEFAULT_BITRATE, DEFAULT_PORT};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Port used by `construct_simple`.
    pub port: String,
    pub bitrate: u32,
    pub session: SessionConfig,
}

/// Timing and validation parameters of a device session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a command waits for its response.
    pub response_timeout_ms: u64,
    /// Default wait of `get_scan`.
    pub scan_timeout_ms: u64,
    /// Longest time the reader holds the transport per read.
    pub poll_interval_ms: u64,
    /// Handshake attempts before construction gives up on a silent device.
    pub handshake_attempts: u32,
    pub motor_speed_min_hz: i32,
    pub motor_speed_max_hz: i32,
    /// Samples beyond this range are dropped.
    pub max_distance_mm: u32,
    /// Completed scans kept while nobody calls `get_scan`.
    pub scan_queue_depth: usize,
    pub response_queue_depth: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            port: DEFAULT_PORT.to_string(),
            bitrate: DEFAULT_BITRATE,
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            response_timeout_ms: 500,
            scan_timeout_ms: 2000,
            poll_interval_ms: 10,
            handshake_attempts: 3,
            motor_speed_min_hz: 0,
            motor_speed_max_hz: 1000,
            max_distance_mm: 40_000,
            scan_queue_depth: 10,
            response_queue_depth: 10,
        }
    }
}

impl DriverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

impl SessionConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn motor_speed_range(&self) -> RangeInclusive<i32> {
        self.motor_speed_min_hz..=self.motor_speed_max_hz
    }
}
