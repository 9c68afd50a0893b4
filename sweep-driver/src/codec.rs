//! Wire codec for the Sweep serial protocol.
//!
//! Every frame is `[0xA5][id][len][payload; len][checksum]`, where the
//! checksum is the wrapping byte sum of id, len and payload. Numeric
//! fields are little-endian.

use crate::constants::{
    CMD_GET_MOTOR_SPEED, CMD_GET_SAMPLE_RATE, CMD_GET_VERSION, CMD_RESET, CMD_SET_MOTOR_SPEED,
    CMD_SET_SAMPLE_RATE, CMD_START_SCANNING, CMD_STOP_SCANNING, FRAME_HEADER, FRAME_OVERHEAD,
    MAX_PAYLOAD_LEN, RESPONSE_FLAG, SAMPLE_FRAME_ID, SAMPLE_PAYLOAD_LEN, STATUS_OK,
};
use crate::error::{Result, SweepError};
use crate::numeric::{to_string, to_u16};
use std::collections::VecDeque;

/// One checksummed unit of wire data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub id: u8,
    pub payload: Vec<u8>,
}

pub(crate) fn calc_checksum(id: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(id.wrapping_add(payload.len() as u8), |acc, e| acc.wrapping_add(*e))
}

impl Frame {
    pub fn new(id: u8, payload: Vec<u8>) -> Frame {
        debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);
        Frame { id, payload }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.payload.len() + FRAME_OVERHEAD);
        bytes.push(FRAME_HEADER);
        bytes.push(self.id);
        bytes.push(self.payload.len() as u8);
        bytes.extend_from_slice(&self.payload);
        bytes.push(calc_checksum(self.id, &self.payload));
        bytes
    }

    /// Decodes exactly one complete frame.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(SweepError::Frame(format!(
                "{} bytes is shorter than an empty frame",
                bytes.len()
            )));
        }
        if bytes[0] != FRAME_HEADER {
            return Err(SweepError::Frame(format!(
                "frame must start with {:02X}. Observed = {}",
                FRAME_HEADER,
                to_string(&bytes[0..1])
            )));
        }
        let len = bytes[2] as usize;
        if len > MAX_PAYLOAD_LEN {
            return Err(SweepError::Frame(format!(
                "payload length {} exceeds {}",
                len, MAX_PAYLOAD_LEN
            )));
        }
        if bytes.len() != len + FRAME_OVERHEAD {
            return Err(SweepError::Frame(format!(
                "length field announces {} payload bytes but frame has {} bytes",
                len,
                bytes.len()
            )));
        }
        let id = bytes[1];
        let payload = &bytes[3..3 + len];
        let expected = bytes[3 + len];
        let calculated = calc_checksum(id, payload);
        if calculated != expected {
            return Err(SweepError::Checksum {
                expected,
                calculated,
            });
        }
        Ok(Frame::new(id, payload.to_vec()))
    }
}

/// Request sent from the host to the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    GetVersion,
    StartScanning,
    StopScanning,
    SetMotorSpeed(u16),
    GetMotorSpeed,
    SetSampleRate(u16),
    GetSampleRate,
    Reset,
}

impl Command {
    pub fn id(&self) -> u8 {
        match self {
            Command::GetVersion => CMD_GET_VERSION,
            Command::StartScanning => CMD_START_SCANNING,
            Command::StopScanning => CMD_STOP_SCANNING,
            Command::SetMotorSpeed(_) => CMD_SET_MOTOR_SPEED,
            Command::GetMotorSpeed => CMD_GET_MOTOR_SPEED,
            Command::SetSampleRate(_) => CMD_SET_SAMPLE_RATE,
            Command::GetSampleRate => CMD_GET_SAMPLE_RATE,
            Command::Reset => CMD_RESET,
        }
    }

    pub fn to_frame(&self) -> Frame {
        let payload = match self {
            Command::SetMotorSpeed(hz) | Command::SetSampleRate(hz) => hz.to_le_bytes().to_vec(),
            _ => Vec::new(),
        };
        Frame::new(self.id(), payload)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn from_frame(frame: &Frame) -> Result<Command> {
        let command = match frame.id {
            CMD_GET_VERSION => Command::GetVersion,
            CMD_START_SCANNING => Command::StartScanning,
            CMD_STOP_SCANNING => Command::StopScanning,
            CMD_SET_MOTOR_SPEED => Command::SetMotorSpeed(payload_u16(frame)?),
            CMD_GET_MOTOR_SPEED => Command::GetMotorSpeed,
            CMD_SET_SAMPLE_RATE => Command::SetSampleRate(payload_u16(frame)?),
            CMD_GET_SAMPLE_RATE => Command::GetSampleRate,
            CMD_RESET => Command::Reset,
            id => return Err(SweepError::Frame(format!("unknown command id {:02X}", id))),
        };
        Ok(command)
    }
}

fn payload_u16(frame: &Frame) -> Result<u16> {
    match frame.payload.as_slice() {
        [lo, hi] => Ok(to_u16(*lo, *hi)),
        other => Err(SweepError::Frame(format!(
            "command {:02X} expects a 2 byte argument, got {} bytes",
            frame.id,
            other.len()
        ))),
    }
}

/// Reply to a [`Command`], correlated through the echoed command id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub command_id: u8,
    pub status: u8,
    pub data: Vec<u8>,
}

impl Response {
    pub fn ok(command_id: u8, data: Vec<u8>) -> Response {
        Response {
            command_id,
            status: STATUS_OK,
            data,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn to_frame(&self) -> Frame {
        let mut payload = Vec::with_capacity(self.data.len() + 1);
        payload.push(self.status);
        payload.extend_from_slice(&self.data);
        Frame::new(self.command_id | RESPONSE_FLAG, payload)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn value_u16(&self) -> Result<u16> {
        match self.data.as_slice() {
            [lo, hi, ..] => Ok(to_u16(*lo, *hi)),
            _ => Err(SweepError::Frame(format!(
                "response to {:02X} carries no 16-bit value",
                self.command_id
            ))),
        }
    }

    /// Turns a non-zero device status into [`SweepError::Device`].
    pub(crate) fn into_result(self) -> Result<Response> {
        if self.is_ok() {
            return Ok(self);
        }
        Err(SweepError::Device(format!(
            "command {:02X} failed with status {:02X}",
            self.command_id, self.status
        )))
    }
}

/// Sample exactly as it travels on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSample {
    /// Hundredths of a degree.
    pub angle: u16,
    pub distance_mm: u16,
    pub signal_strength: u8,
}

impl RawSample {
    pub fn to_frame(&self) -> Frame {
        let mut payload = Vec::with_capacity(SAMPLE_PAYLOAD_LEN);
        payload.extend_from_slice(&self.angle.to_le_bytes());
        payload.extend_from_slice(&self.distance_mm.to_le_bytes());
        payload.push(self.signal_strength);
        Frame::new(SAMPLE_FRAME_ID, payload)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_frame().encode()
    }
}

/// Frame received from the device, discriminated by frame id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Response(Response),
    Sample(RawSample),
}

impl Inbound {
    pub fn from_frame(frame: Frame) -> Result<Inbound> {
        if frame.id == SAMPLE_FRAME_ID {
            let p = &frame.payload;
            if p.len() != SAMPLE_PAYLOAD_LEN {
                return Err(SweepError::Frame(format!(
                    "sample frame must carry {} bytes, got {}",
                    SAMPLE_PAYLOAD_LEN,
                    p.len()
                )));
            }
            return Ok(Inbound::Sample(RawSample {
                angle: to_u16(p[0], p[1]),
                distance_mm: to_u16(p[2], p[3]),
                signal_strength: p[4],
            }));
        }
        if frame.id & RESPONSE_FLAG == 0 {
            return Err(SweepError::Frame(format!(
                "unexpected frame id {:02X} from device",
                frame.id
            )));
        }
        match frame.payload.split_first() {
            Some((status, data)) => Ok(Inbound::Response(Response {
                command_id: frame.id & !RESPONSE_FLAG,
                status: *status,
                data: data.to_vec(),
            })),
            None => Err(SweepError::Frame(format!(
                "response frame {:02X} has no status byte",
                frame.id
            ))),
        }
    }
}

fn find_start_index(buffer: &VecDeque<u8>) -> Option<usize> {
    buffer.iter().position(|e| *e == FRAME_HEADER)
}

/// Incremental decoder that carves frames out of a byte stream.
///
/// A rejected frame only costs its header byte: decoding restarts at the
/// next header candidate, so one corrupted frame never hides the frames
/// that follow it.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: VecDeque<u8>,
}

impl FrameDecoder {
    pub fn new() -> FrameDecoder {
        FrameDecoder::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Returns `None` until a complete frame candidate is buffered.
    pub fn next_frame(&mut self) -> Option<Result<Frame>> {
        match find_start_index(&self.buffer) {
            Some(start_index) => {
                self.buffer.drain(..start_index); // remove leading bytes
            }
            None => {
                self.buffer.clear();
                return None;
            }
        }
        let len = *self.buffer.get(2)? as usize;
        if len > MAX_PAYLOAD_LEN {
            self.buffer.pop_front();
            return Some(Err(SweepError::Frame(format!(
                "payload length {} exceeds {}",
                len, MAX_PAYLOAD_LEN
            ))));
        }
        let n_frame_bytes = len + FRAME_OVERHEAD;
        if self.buffer.len() < n_frame_bytes {
            // insufficient buffer size to extract a frame
            return None;
        }
        let bytes = self.buffer.range(..n_frame_bytes).copied().collect::<Vec<_>>();
        match Frame::decode(&bytes) {
            Ok(frame) => {
                self.buffer.drain(..n_frame_bytes);
                Some(Ok(frame))
            }
            Err(e) => {
                self.buffer.pop_front();
                Some(Err(e))
            }
        }
    }

    pub fn next_inbound(&mut self) -> Option<Result<Inbound>> {
        self.next_frame()
            .map(|frame| frame.and_then(Inbound::from_frame))
    }
}
