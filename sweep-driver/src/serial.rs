use crate::constants::READ_CHUNK_SIZE;
use crate::error::{Result, SweepError};
use crate::transport::Transport;
use log::{debug, info};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// [`Transport`] over a serial port.
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    timeout: Duration,
}

impl SerialTransport {
    /// Opens `port_name` (such as `/dev/ttyUSB0` or `COM3`) in 8N1 mode.
    pub fn open(port_name: &str, bitrate: u32) -> Result<SerialTransport> {
        let timeout = Duration::from_millis(10);
        let port = serialport::new(port_name, bitrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| {
                SweepError::Connection(format!("failed to open \"{}\": {}", port_name, e))
            })?;
        info!("Opened serial port {} at {} baud", port_name, bitrate);
        Ok(SerialTransport {
            port_name: port_name.to_string(),
            port: Some(port),
            timeout,
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        match self.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(SweepError::Connection(format!(
                "serial port {} is closed",
                self.port_name
            ))),
        }
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let current = self.timeout;
        let port = self.port()?;
        if current != timeout {
            port.set_timeout(timeout)?;
        }
        let n_read: usize = port.bytes_to_read()?.try_into().unwrap_or(0);
        let mut packet: Vec<u8> = vec![0; n_read.clamp(1, READ_CHUNK_SIZE)];
        let result = match port.read(packet.as_mut_slice()) {
            Ok(0) => Err(SweepError::Timeout),
            Ok(n) => {
                packet.truncate(n);
                Ok(packet)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(SweepError::Timeout),
            Err(e) => Err(SweepError::Io(e)),
        };
        self.timeout = timeout;
        result
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}
