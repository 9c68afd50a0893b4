use crate::codec::RawSample;
use crate::constants::FULL_ROTATION_CENTIDEGREES;
use crate::numeric::centidegrees_to_degrees;
use sweep_data::{Sample, Scan};

/// Accumulates samples of the current rotation.
///
/// A rotation ends when a sample's angle is smaller than the previous
/// accepted one; that sample opens the next rotation.
#[derive(Debug)]
pub(crate) struct ScanBuffer {
    scan: Scan,
    previous_angle: Option<u16>,
    max_distance_mm: u32,
}

impl ScanBuffer {
    pub(crate) fn new(max_distance_mm: u32) -> ScanBuffer {
        ScanBuffer {
            scan: Scan::new(),
            previous_angle: None,
            max_distance_mm,
        }
    }

    fn in_bounds(&self, raw: &RawSample) -> bool {
        let d = raw.distance_mm as u32;
        raw.angle < FULL_ROTATION_CENTIDEGREES && d != 0 && d <= self.max_distance_mm
    }

    /// Adds a sample and returns the finished scan when it closes a rotation.
    /// Repeated angles are dropped so that angles stay strictly increasing.
    pub(crate) fn push(&mut self, raw: RawSample) -> Option<Scan> {
        if !self.in_bounds(&raw) || self.previous_angle == Some(raw.angle) {
            self.scan.dropped_samples += 1;
            return None;
        }
        let completed = match self.previous_angle {
            Some(previous) if raw.angle < previous => {
                Some(std::mem::take(&mut self.scan))
            }
            _ => None,
        };
        self.previous_angle = Some(raw.angle);
        self.scan.samples.push(Sample {
            angle_degrees: centidegrees_to_degrees(raw.angle),
            distance_mm: raw.distance_mm as u32,
            signal_strength: raw.signal_strength,
        });
        completed
    }

    /// Samples dropped from the rotation in progress.
    pub(crate) fn dropped_samples(&self) -> u32 {
        self.scan.dropped_samples
    }

    pub(crate) fn record_corrupted_frame(&mut self) {
        self.scan.corrupted_frames += 1;
    }

    pub(crate) fn clear(&mut self) {
        self.scan = Scan::new();
        self.previous_angle = None;
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.scan.len()
    }
}
