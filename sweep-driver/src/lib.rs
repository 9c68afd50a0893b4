//! Driver for the Sweep scanning LiDAR.
//!
//! A [`Driver`] is created once by the process owner and hands out one
//! [`Session`] per serial port:
//!
//! ```no_run
//! use sweep_driver::{Driver, DriverConfig};
//!
//! let driver = Driver::new(DriverConfig::default());
//! let session = driver.construct("/dev/ttyUSB0", 115200)?;
//! session.set_motor_speed(5)?;
//! session.start_scanning()?;
//! let scan = session.get_scan()?;
//! println!("{} samples", scan.len());
//! session.destruct();
//! # Ok::<(), sweep_driver::SweepError>(())
//! ```

pub mod codec;
mod config;
mod constants;
mod driver_threads;
mod error;
#[cfg(test)]
mod mock;
mod numeric;
mod registry;
mod scan;
mod serial;
mod session;
mod time;
mod transport;

pub use crate::config::{DriverConfig, SessionConfig};
pub use crate::error::{Result, SweepError};
pub use crate::serial::SerialTransport;
pub use crate::session::Session;
pub use crate::transport::{FramedTransport, Transport};
pub use sweep_data::{DeviceInfo, DeviceState, Sample, Scan, Telemetry};

use crate::registry::PortRegistry;
use log::info;

/// Entry point of the library.
///
/// Holds the configuration and the set of ports with a live session, so a
/// port can never be driven by two sessions at once.
#[derive(Debug, Default)]
pub struct Driver {
    config: DriverConfig,
    ports: PortRegistry,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Driver {
        info!("Sweep driver {} initialized", Driver::version());
        Driver {
            config,
            ports: PortRegistry::default(),
        }
    }

    /// Version of this library.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Function to connect to a Sweep.
    /// # Arguments
    ///
    /// * `port_name` - Serial port name such as `/dev/ttyUSB0` or `COM3`.
    /// * `bitrate` - Serial bitrate, 115200 for stock devices.
    pub fn construct(&self, port_name: &str, bitrate: u32) -> Result<Session> {
        if bitrate == 0 {
            return Err(SweepError::InvalidArgument(
                "bitrate must be positive".to_string(),
            ));
        }
        let claim = self.ports.claim(port_name)?;
        let transport = SerialTransport::open(port_name, bitrate)?;
        Session::open(
            port_name,
            Box::new(transport),
            claim,
            self.config.session.clone(),
        )
    }

    /// Connects using the configured port and bitrate.
    pub fn construct_simple(&self) -> Result<Session> {
        self.construct(&self.config.port, self.config.bitrate)
    }

    /// Connects over an already opened transport. `port_name` identifies the
    /// device for the one-session-per-port rule.
    pub fn construct_with_transport(
        &self,
        port_name: &str,
        transport: Box<dyn Transport>,
    ) -> Result<Session> {
        let claim = self.ports.claim(port_name)?;
        Session::open(port_name, transport, claim, self.config.session.clone())
    }

    pub fn is_port_in_use(&self, port_name: &str) -> bool {
        self.ports.is_claimed(port_name)
    }
}
