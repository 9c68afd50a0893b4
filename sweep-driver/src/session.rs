use crate::codec::{Command, Response};
use crate::config::SessionConfig;
use crate::constants::{SUPPORTED_FIRMWARE_MAJOR, VALID_SAMPLE_RATES_HZ};
use crate::driver_threads::{spawn_reader, DriverThreads, Routes};
use crate::error::{Result, SweepError};
use crate::registry::PortClaim;
use crate::transport::{FramedTransport, Transport};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use crossbeam_utils::atomic::AtomicCell;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sweep_data::{DeviceInfo, DeviceState, Scan, Telemetry};

/// State shared between the command path and the reader thread.
pub(crate) struct Shared {
    pub(crate) transport: Mutex<FramedTransport>,
    pub(crate) state: AtomicCell<DeviceState>,
    /// Bumped whenever accumulation must restart from an empty rotation.
    pub(crate) scan_epoch: AtomicU64,
    pub(crate) motor_speed_hz: AtomicCell<Option<i32>>,
    pub(crate) sample_rate_hz: AtomicCell<Option<i32>>,
    pub(crate) scans_completed: AtomicU64,
    pub(crate) dropped_samples: AtomicU64,
    pub(crate) corrupted_frames: AtomicU64,
}

impl Shared {
    fn new(transport: FramedTransport) -> Shared {
        Shared {
            transport: Mutex::new(transport),
            state: AtomicCell::new(DeviceState::Idle),
            scan_epoch: AtomicU64::new(0),
            motor_speed_hz: AtomicCell::new(None),
            sample_rate_hz: AtomicCell::new(None),
            scans_completed: AtomicU64::new(0),
            dropped_samples: AtomicU64::new(0),
            corrupted_frames: AtomicU64::new(0),
        }
    }
}

/// One managed connection to a Sweep sensor.
///
/// The session exclusively owns its transport. Commands are strictly
/// serialized: a command is only written once the previous one has been
/// answered or has timed out. A dedicated reader thread routes responses
/// back to the command path and feeds samples into the scan buffer.
///
/// Call [`Session::destruct`] to release the device; it is also called on
/// drop and may be called any number of times. The session is `Sync`, so a
/// thread blocked in [`Session::get_scan`] can be released by destructing
/// the session from another thread.
pub struct Session {
    port_name: String,
    config: SessionConfig,
    shared: Arc<Shared>,
    command_lock: Mutex<()>,
    response_rx: Receiver<Response>,
    scan_rx: Receiver<Result<Scan>>,
    threads: Mutex<Option<DriverThreads>>,
    claim: Mutex<Option<PortClaim>>,
    closed: AtomicBool,
    device_info: DeviceInfo,
}

impl Session {
    /// Starts the reader and runs the version handshake.
    ///
    /// Everything acquired so far is released again when this fails.
    pub(crate) fn open(
        port_name: &str,
        transport: Box<dyn Transport>,
        claim: PortClaim,
        config: SessionConfig,
    ) -> Result<Session> {
        let mut transport = FramedTransport::new(transport);
        if let Err(e) = transport.clear_input() {
            transport.close();
            return Err(e);
        }
        let shared = Arc::new(Shared::new(transport));

        let (response_tx, response_rx) = bounded(config.response_queue_depth);
        let (scan_tx, scan_rx) = bounded(config.scan_queue_depth);
        let routes = Routes {
            response_tx,
            scan_tx,
            scan_rx: scan_rx.clone(),
        };
        let threads = match spawn_reader(
            Arc::clone(&shared),
            routes,
            config.poll_interval(),
            config.max_distance_mm,
        ) {
            Ok(threads) => threads,
            Err(e) => {
                shared.transport.lock().close();
                return Err(e);
            }
        };

        let mut session = Session {
            port_name: port_name.to_string(),
            config,
            shared,
            command_lock: Mutex::new(()),
            response_rx,
            scan_rx,
            threads: Mutex::new(Some(threads)),
            claim: Mutex::new(Some(claim)),
            closed: AtomicBool::new(false),
            device_info: DeviceInfo::default(),
        };
        session.device_info = session.handshake()?;
        info!(
            "Connected to Sweep on {} (firmware {}.{}, hardware {})",
            session.port_name,
            session.device_info.firmware_major_version,
            session.device_info.firmware_minor_version,
            session.device_info.hardware_version
        );
        Ok(session)
    }

    fn handshake(&self) -> Result<DeviceInfo> {
        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            match self.exchange(Command::GetVersion) {
                Err(SweepError::Timeout) if attempt < self.config.handshake_attempts => {
                    debug!("Handshake attempt {} on {} timed out", attempt, self.port_name);
                }
                other => break other?,
            }
        };

        let info = match response.data.as_slice() {
            [major, minor, hardware, ..] => DeviceInfo {
                firmware_major_version: *major,
                firmware_minor_version: *minor,
                hardware_version: *hardware,
            },
            _ => {
                return Err(SweepError::Frame(format!(
                    "version response carries {} bytes",
                    response.data.len()
                )))
            }
        };
        if info.firmware_major_version != SUPPORTED_FIRMWARE_MAJOR {
            return Err(SweepError::IncompatibleDevice {
                major: info.firmware_major_version,
                minor: info.firmware_minor_version,
            });
        }
        Ok(info)
    }

    /// Writes `command` and waits for the response carrying its id.
    fn exchange(&self, command: Command) -> Result<Response> {
        let _guard = self.command_lock.lock();

        // replies to commands that already timed out
        while let Ok(stale) = self.response_rx.try_recv() {
            debug!("Discarding late response {:?}", stale);
        }

        let written = self.shared.transport.lock().write_frame(&command);
        if let Err(e) = written {
            self.fault(&e);
            return Err(e);
        }

        let deadline = Instant::now() + self.config.response_timeout();
        loop {
            match self.response_rx.recv_deadline(deadline) {
                Ok(response) if response.command_id == command.id() => {
                    return response.into_result().inspect_err(|e| self.fault(e));
                }
                Ok(response) => {
                    debug!(
                        "Discarding response to {:02X} while waiting for {:?}",
                        response.command_id, command
                    );
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!("No response to {:?} on {}", command, self.port_name);
                    return Err(SweepError::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SweepError::Device("reader thread has stopped".to_string()));
                }
            }
        }
    }

    fn fault(&self, e: &SweepError) {
        if e.is_transport_fault() || matches!(e, SweepError::Device(_)) {
            error!("Session on {} failed: {}", self.port_name, e);
            self.shared.state.store(DeviceState::Error);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SweepError::Connection(format!(
                "session on {} has been destructed",
                self.port_name
            )));
        }
        Ok(())
    }

    fn require_state(&self, expected: DeviceState, operation: &'static str) -> Result<()> {
        let state = self.shared.state.load();
        if state != expected {
            return Err(SweepError::InvalidState { operation, state });
        }
        Ok(())
    }

    fn discard_pending_scans(&self) {
        self.shared.scan_epoch.fetch_add(1, Ordering::SeqCst);
        while self.scan_rx.try_recv().is_ok() {}
    }

    pub fn start_scanning(&self) -> Result<()> {
        self.ensure_open()?;
        self.require_state(DeviceState::Idle, "start scanning")?;
        self.exchange(Command::StartScanning)?;
        self.discard_pending_scans();
        self.shared.state.store(DeviceState::Scanning);
        info!("Started scanning on {}", self.port_name);
        Ok(())
    }

    /// Stops a running scan. Does nothing, and sends nothing, when idle.
    pub fn stop_scanning(&self) -> Result<()> {
        self.ensure_open()?;
        match self.shared.state.load() {
            DeviceState::Idle => return Ok(()),
            DeviceState::Scanning => {}
            state => {
                return Err(SweepError::InvalidState {
                    operation: "stop scanning",
                    state,
                })
            }
        }
        self.exchange(Command::StopScanning)?;
        if let Err(state) = self
            .shared
            .state
            .compare_exchange(DeviceState::Scanning, DeviceState::Idle)
        {
            return Err(SweepError::Device(format!(
                "session on {} entered the {} state while stopping",
                self.port_name, state
            )));
        }
        info!("Stopped scanning on {}", self.port_name);
        Ok(())
    }

    /// Sets the rotation speed. The argument is validated before any I/O.
    pub fn set_motor_speed(&self, hz: i32) -> Result<()> {
        let range = self.config.motor_speed_range();
        let value = u16::try_from(hz)
            .ok()
            .filter(|_| range.contains(&hz))
            .ok_or_else(|| {
                SweepError::InvalidArgument(format!(
                    "motor speed {} Hz is outside {}..={} Hz",
                    hz,
                    range.start(),
                    range.end()
                ))
            })?;
        self.ensure_open()?;
        self.require_state(DeviceState::Idle, "set motor speed")?;
        self.exchange(Command::SetMotorSpeed(value))?;
        self.shared.motor_speed_hz.store(Some(hz));
        debug!("Motor speed on {} set to {} Hz", self.port_name, hz);
        Ok(())
    }

    /// Queries the device for its motor speed.
    pub fn get_motor_speed(&self) -> Result<i32> {
        self.ensure_open()?;
        self.require_state(DeviceState::Idle, "get motor speed")?;
        let hz = self.exchange(Command::GetMotorSpeed)?.value_u16()? as i32;
        self.shared.motor_speed_hz.store(Some(hz));
        Ok(hz)
    }

    pub fn set_sample_rate(&self, hz: i32) -> Result<()> {
        if !VALID_SAMPLE_RATES_HZ.contains(&hz) {
            return Err(SweepError::InvalidArgument(format!(
                "sample rate {} Hz is not one of {:?}",
                hz, VALID_SAMPLE_RATES_HZ
            )));
        }
        self.ensure_open()?;
        self.require_state(DeviceState::Idle, "set sample rate")?;
        self.exchange(Command::SetSampleRate(hz as u16))?;
        self.shared.sample_rate_hz.store(Some(hz));
        Ok(())
    }

    pub fn get_sample_rate(&self) -> Result<i32> {
        self.ensure_open()?;
        self.require_state(DeviceState::Idle, "get sample rate")?;
        let hz = self.exchange(Command::GetSampleRate)?.value_u16()? as i32;
        self.shared.sample_rate_hz.store(Some(hz));
        Ok(hz)
    }

    /// Waits for the next complete rotation using the configured scan timeout.
    pub fn get_scan(&self) -> Result<Scan> {
        self.get_scan_timeout(self.config.scan_timeout())
    }

    /// Waits up to `timeout` for the next complete rotation.
    ///
    /// A timeout leaves the session scanning. Fails with
    /// [`SweepError::Device`] when the session faults or is destructed
    /// while waiting.
    pub fn get_scan_timeout(&self, timeout: Duration) -> Result<Scan> {
        self.ensure_open()?;
        match self.shared.state.load() {
            DeviceState::Scanning => {}
            DeviceState::Error => {
                return Err(SweepError::Device(format!(
                    "session on {} is in the error state",
                    self.port_name
                )))
            }
            state => {
                return Err(SweepError::InvalidState {
                    operation: "get a scan",
                    state,
                })
            }
        }
        match self.scan_rx.recv_timeout(timeout) {
            Ok(scan) => scan,
            Err(RecvTimeoutError::Timeout) => Err(SweepError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(SweepError::Device(format!(
                "session on {} was destructed while waiting for a scan",
                self.port_name
            ))),
        }
    }

    /// Resets the device and forces the session back to idle.
    ///
    /// Failures are logged, never returned, so this also serves as the way
    /// out of the error state.
    pub fn reset(&self) {
        if self.ensure_open().is_err() {
            warn!("Ignoring reset of destructed session on {}", self.port_name);
            return;
        }
        match self.exchange(Command::Reset) {
            Ok(_) => info!("Reset device on {}", self.port_name),
            Err(e) => warn!("Reset of device on {} failed: {}", self.port_name, e),
        }
        if let Err(e) = self.shared.transport.lock().clear_input() {
            warn!("Failed to clear input on {}: {}", self.port_name, e);
        }
        self.discard_pending_scans();
        self.shared.state.store(DeviceState::Idle);
    }

    /// Stops scanning if needed, stops the reader, closes the transport and
    /// releases the port. Later calls do nothing.
    pub fn destruct(&self) {
        let Some(threads) = self.threads.lock().take() else {
            return;
        };
        if self.shared.state.load() == DeviceState::Scanning {
            match self.exchange(Command::StopScanning) {
                Ok(_) => self.shared.state.store(DeviceState::Idle),
                Err(e) => warn!("Failed to stop scanning on {}: {}", self.port_name, e),
            }
        }
        self.closed.store(true, Ordering::SeqCst);
        drop(threads);
        self.shared.transport.lock().close();
        drop(self.claim.lock().take());
        info!("Released Sweep on {}", self.port_name);
    }

    pub fn state(&self) -> DeviceState {
        self.shared.state.load()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.device_info
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            port_name: self.port_name.clone(),
            state: self.shared.state.load(),
            motor_speed_hz: self.shared.motor_speed_hz.load(),
            sample_rate_hz: self.shared.sample_rate_hz.load(),
            scans_completed: self.shared.scans_completed.load(Ordering::Relaxed),
            dropped_samples: self.shared.dropped_samples.load(Ordering::Relaxed),
            corrupted_frames: self.shared.corrupted_frames.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destruct();
    }
}
