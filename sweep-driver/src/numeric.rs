use crate::constants::ANGLE_SCALE;

pub(crate) fn to_u16(lo: u8, hi: u8) -> u16 {
    ((hi as u16) << 8) + (lo as u16)
}

pub(crate) fn centidegrees_to_degrees(angle: u16) -> f64 {
    (angle as f64) / ANGLE_SCALE
}

#[cfg(test)]
pub(crate) fn degrees_to_centidegrees(degree: f64) -> u16 {
    (degree * ANGLE_SCALE).round() as u16
}

pub(crate) fn to_string(data: &[u8]) -> String {
    data.iter()
        .map(|e| format!("{:02X}", e))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_u16() {
        assert_eq!(to_u16(0x58, 0x02), 600);
        assert_eq!(to_u16(0xFF, 0xFF), u16::MAX);
    }

    #[test]
    fn test_angle_conversion() {
        assert_eq!(centidegrees_to_degrees(35950), 359.5);
        assert_eq!(degrees_to_centidegrees(0.2), 20);
        assert_eq!(degrees_to_centidegrees(centidegrees_to_degrees(12345)), 12345);
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(&[0xA5, 0x01, 0x00]), "A5 01 00");
    }
}
