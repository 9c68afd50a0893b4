use crate::sample::Sample;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Struct to hold one rotation of lidar scan data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scan {
    /// Samples ordered by strictly increasing angle.
    pub samples: Vec<Sample>,
    /// Samples discarded during this rotation: out of physical bounds, or
    /// repeating the previous sample's angle.
    pub dropped_samples: u32,
    /// Frames rejected by checksum or framing validation during this rotation.
    pub corrupted_frames: u32,
}

impl Scan {
    pub fn new() -> Scan {
        Scan::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn angles_degrees(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.angle_degrees)
    }

    pub fn distances_mm(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.iter().map(|s| s.distance_mm)
    }
}
