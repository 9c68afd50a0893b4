//! Simulated Sweep device used by the tests.

use crate::codec::{Command, FrameDecoder, RawSample, Response};
use crate::error::{Result, SweepError};
use crate::numeric::degrees_to_centidegrees;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Answers every command it receives and streams injected bytes back.
/// Clones share the same device.
#[derive(Clone)]
pub(crate) struct MockDevice {
    inner: Arc<Mutex<MockDeviceInner>>,
}

struct MockDeviceInner {
    read_buffer: VecDeque<u8>,
    written: Vec<u8>,
    commands: Vec<Command>,
    decoder: FrameDecoder,
    responsive: bool,
    fault_status: Option<u8>,
    fail_writes: bool,
    fail_reads: bool,
    read_failures_after_command: u32,
    pending_read_failures: u32,
    firmware: (u8, u8),
    motor_speed: u16,
    sample_rate: u16,
    awaiting_reply: bool,
    overlapping_writes: usize,
    open: bool,
    close_count: usize,
}

impl MockDeviceInner {
    fn respond(&mut self, command: Command) -> Response {
        let id = command.id();
        if let Some(status) = self.fault_status {
            return Response {
                command_id: id,
                status,
                data: Vec::new(),
            };
        }
        match command {
            Command::GetVersion => Response::ok(id, vec![self.firmware.0, self.firmware.1, 2]),
            Command::SetMotorSpeed(hz) => {
                self.motor_speed = hz;
                Response::ok(id, Vec::new())
            }
            Command::GetMotorSpeed => Response::ok(id, self.motor_speed.to_le_bytes().to_vec()),
            Command::SetSampleRate(hz) => {
                self.sample_rate = hz;
                Response::ok(id, Vec::new())
            }
            Command::GetSampleRate => Response::ok(id, self.sample_rate.to_le_bytes().to_vec()),
            Command::StartScanning | Command::StopScanning | Command::Reset => {
                Response::ok(id, Vec::new())
            }
        }
    }
}

impl MockDevice {
    pub(crate) fn new() -> Self {
        Self::with_firmware(1, 4)
    }

    pub(crate) fn with_firmware(major: u8, minor: u8) -> Self {
        MockDevice {
            inner: Arc::new(Mutex::new(MockDeviceInner {
                read_buffer: VecDeque::new(),
                written: Vec::new(),
                commands: Vec::new(),
                decoder: FrameDecoder::new(),
                responsive: true,
                fault_status: None,
                fail_writes: false,
                fail_reads: false,
                read_failures_after_command: 0,
                pending_read_failures: 0,
                firmware: (major, minor),
                motor_speed: 5,
                sample_rate: 500,
                awaiting_reply: false,
                overlapping_writes: 0,
                open: true,
                close_count: 0,
            })),
        }
    }

    /// The next command is answered, but its reply only becomes readable
    /// after `n` reads have failed.
    pub(crate) fn fail_reads_after_next_command(&self, n: u32) {
        self.inner.lock().read_failures_after_command = n;
    }

    pub(crate) fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Streams one sample frame per angle, all at the same distance.
    pub(crate) fn inject_samples(&self, angles_degrees: &[f64], distance_mm: u16) {
        let mut bytes = Vec::new();
        for angle in angles_degrees {
            let sample = RawSample {
                angle: degrees_to_centidegrees(*angle),
                distance_mm,
                signal_strength: 127,
            };
            bytes.extend(sample.encode());
        }
        self.inject_read(&bytes);
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.inner.lock().written.clone()
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.inner.lock().commands.clone()
    }

    pub(crate) fn set_responsive(&self, responsive: bool) {
        self.inner.lock().responsive = responsive;
    }

    pub(crate) fn set_fault_status(&self, status: Option<u8>) {
        self.inner.lock().fault_status = status;
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Commands written while the previous reply was still unread.
    pub(crate) fn overlapping_writes(&self) -> usize {
        self.inner.lock().overlapping_writes
    }

    pub(crate) fn close_count(&self) -> usize {
        self.inner.lock().close_count
    }
}

impl Transport for MockDevice {
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        {
            let mut inner = self.inner.lock();
            if !inner.open {
                return Err(SweepError::Connection("mock device is closed".to_string()));
            }
            if inner.pending_read_failures > 0 {
                inner.pending_read_failures -= 1;
                return Err(SweepError::Io(io::Error::from(io::ErrorKind::TimedOut)));
            }
            if inner.fail_reads {
                return Err(SweepError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
            }
            if !inner.read_buffer.is_empty() {
                inner.awaiting_reply = false;
                return Ok(inner.read_buffer.drain(..).collect());
            }
        }
        std::thread::sleep(timeout.min(Duration::from_millis(1)));
        Err(SweepError::Timeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(SweepError::Connection("mock device is closed".to_string()));
        }
        if inner.fail_writes {
            return Err(SweepError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        inner.written.extend_from_slice(data);
        inner.decoder.extend(data);
        while let Some(frame) = inner.decoder.next_frame() {
            let Ok(command) = frame.and_then(|f| Command::from_frame(&f)) else {
                continue;
            };
            if inner.awaiting_reply {
                inner.overlapping_writes += 1;
            }
            inner.commands.push(command);
            inner.pending_read_failures = std::mem::take(&mut inner.read_failures_after_command);
            if inner.responsive {
                let response = inner.respond(command);
                inner.read_buffer.extend(response.encode());
                inner.awaiting_reply = true;
            }
        }
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.read_buffer.clear();
        inner.awaiting_reply = false;
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        if inner.open {
            inner.open = false;
            inner.close_count += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }
}
