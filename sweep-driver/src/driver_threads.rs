use crate::codec::{Inbound, Response};
use crate::error::{Result, SweepError};
use crate::scan::ScanBuffer;
use crate::session::Shared;
use crate::time::sleep_ms;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, error, trace, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use sweep_data::{DeviceState, Scan};

/// Struct that contains the session's reader thread.
pub struct DriverThreads {
    pub(crate) reader_terminator_tx: Sender<bool>,
    pub(crate) reader_thread: Option<JoinHandle<()>>,
}

/// Where the reader delivers what it decodes.
pub(crate) struct Routes {
    pub(crate) response_tx: Sender<Response>,
    pub(crate) scan_tx: Sender<Result<Scan>>,
    /// Reader-side handle on the scan queue, used to evict the oldest scan.
    pub(crate) scan_rx: Receiver<Result<Scan>>,
}

pub(crate) fn spawn_reader(
    shared: Arc<Shared>,
    routes: Routes,
    poll_interval: Duration,
    max_distance_mm: u32,
) -> Result<DriverThreads> {
    let (reader_terminator_tx, reader_terminator_rx) = bounded(10);
    let reader_thread = std::thread::Builder::new()
        .name("sweep-reader".to_string())
        .spawn(move || {
            read_device_signal(
                &shared,
                routes,
                reader_terminator_rx,
                poll_interval,
                max_distance_mm,
            );
        })?;
    Ok(DriverThreads {
        reader_terminator_tx,
        reader_thread: Some(reader_thread),
    })
}

/// Reads frames until terminated and routes them by frame type:
/// responses to the waiting command, samples into the scan buffer.
pub(crate) fn read_device_signal(
    shared: &Shared,
    routes: Routes,
    reader_terminator_rx: Receiver<bool>,
    poll_interval: Duration,
    max_distance_mm: u32,
) {
    let mut buffer = ScanBuffer::new(max_distance_mm);
    let mut epoch = shared.scan_epoch.load(Ordering::SeqCst);
    let mut faulted = false;
    loop {
        if do_terminate(&reader_terminator_rx) {
            debug!("Reader thread terminating");
            return;
        }

        if shared.state.load() == DeviceState::Error {
            if !faulted {
                faulted = true;
                buffer.clear();
                // wake up anyone blocked in get_scan
                let _ = routes.scan_tx.try_send(Err(SweepError::Device(
                    "session entered the error state".to_string(),
                )));
            }
        } else {
            faulted = false;
        }

        let next = shared.transport.lock().read_frame(poll_interval);
        match next {
            Ok(Inbound::Response(response)) => {
                trace!("Received response {:?}", response);
                if let Err(e) = routes.response_tx.try_send(response) {
                    warn!("Dropping response: {e}");
                }
            }
            Ok(Inbound::Sample(raw)) => {
                if shared.state.load() != DeviceState::Scanning {
                    buffer.clear();
                    continue;
                }
                let current_epoch = shared.scan_epoch.load(Ordering::SeqCst);
                if current_epoch != epoch {
                    buffer.clear();
                    epoch = current_epoch;
                }

                let dropped_before = buffer.dropped_samples();
                match buffer.push(raw) {
                    Some(scan) => {
                        shared.scans_completed.fetch_add(1, Ordering::Relaxed);
                        if !deliver_scan(&routes, scan) {
                            return;
                        }
                    }
                    None if buffer.dropped_samples() > dropped_before => {
                        trace!("Dropping out of range sample {:?}", raw);
                        shared.dropped_samples.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {}
                }
            }
            Err(SweepError::Timeout) => {}
            Err(e) if e.is_protocol_noise() => {
                debug!("Discarding frame: {e}");
                shared.corrupted_frames.fetch_add(1, Ordering::Relaxed);
                buffer.record_corrupted_frame();
            }
            Err(e) => {
                if !faulted {
                    error!("Transport failure: {e}");
                    shared.state.store(DeviceState::Error);
                }
                sleep_ms(poll_interval.as_millis() as u64);
            }
        }
    }
}

/// Queues a completed scan, evicting the oldest one when the caller has
/// fallen behind. Returns false once the session is gone.
pub(crate) fn deliver_scan(routes: &Routes, scan: Scan) -> bool {
    let mut pending = Ok(scan);
    loop {
        match routes.scan_tx.try_send(pending) {
            Ok(()) => return true,
            Err(TrySendError::Full(rejected)) => {
                if routes.scan_rx.try_recv().is_ok() {
                    warn!("Scan queue is full, dropping the oldest scan");
                }
                pending = rejected;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

pub(crate) fn do_terminate(terminator_rx: &Receiver<bool>) -> bool {
    match terminator_rx.try_recv() {
        Ok(terminate) => terminate,
        Err(TryRecvError::Empty) => false,
        Err(TryRecvError::Disconnected) => true,
    }
}

/// Function to join driver threads.
/// This function is automatically called when `driver_threads` is dropped.
pub fn join(driver_threads: &mut DriverThreads) {
    let _ = driver_threads.reader_terminator_tx.send(true);

    if let Some(thread) = driver_threads.reader_thread.take() {
        if thread.join().is_err() {
            error!("Reader thread panicked");
        }
    }
}

impl Drop for DriverThreads {
    fn drop(&mut self) {
        join(self);
    }
}
