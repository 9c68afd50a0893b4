pub(crate) const FRAME_HEADER: u8 = 0xA5;
/// Header, id, length and checksum bytes around the payload.
pub(crate) const FRAME_OVERHEAD: usize = 4;
pub(crate) const MAX_PAYLOAD_LEN: usize = 16;

pub(crate) const CMD_GET_VERSION: u8 = 0x01;
pub(crate) const CMD_START_SCANNING: u8 = 0x10;
pub(crate) const CMD_STOP_SCANNING: u8 = 0x11;
pub(crate) const CMD_SET_MOTOR_SPEED: u8 = 0x20;
pub(crate) const CMD_GET_MOTOR_SPEED: u8 = 0x21;
pub(crate) const CMD_SET_SAMPLE_RATE: u8 = 0x22;
pub(crate) const CMD_GET_SAMPLE_RATE: u8 = 0x23;
pub(crate) const CMD_RESET: u8 = 0x30;

/// Set on the id of every response frame; the low bits echo the command id.
pub(crate) const RESPONSE_FLAG: u8 = 0x80;
pub(crate) const SAMPLE_FRAME_ID: u8 = 0x50;
pub(crate) const SAMPLE_PAYLOAD_LEN: usize = 5;
pub(crate) const STATUS_OK: u8 = 0x00;

pub(crate) const SUPPORTED_FIRMWARE_MAJOR: u8 = 1;
pub(crate) const VALID_SAMPLE_RATES_HZ: [i32; 3] = [500, 750, 1000];

/// Angles travel as hundredths of a degree.
pub(crate) const ANGLE_SCALE: f64 = 100.;
pub(crate) const FULL_ROTATION_CENTIDEGREES: u16 = 36_000;

pub(crate) const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub(crate) const DEFAULT_BITRATE: u32 = 115_200;
pub(crate) const READ_CHUNK_SIZE: usize = 256;
