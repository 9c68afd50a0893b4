#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One range reading.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Bearing in degrees, in `[0, 360)`.
    pub angle_degrees: f64,
    /// Distance to the target in millimeters.
    pub distance_mm: u32,
    /// Return strength of the laser pulse.
    pub signal_strength: u8,
}

impl Sample {
    pub fn angle_radian(&self) -> f64 {
        self.angle_degrees.to_radians()
    }
}
