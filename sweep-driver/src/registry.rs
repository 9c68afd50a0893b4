use crate::error::{Result, SweepError};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Ports that currently have a live session.
#[derive(Clone, Debug, Default)]
pub(crate) struct PortRegistry {
    ports: Arc<Mutex<HashSet<String>>>,
}

/// Exclusive claim on a port, released on drop.
#[derive(Debug)]
pub(crate) struct PortClaim {
    port_name: String,
    ports: Arc<Mutex<HashSet<String>>>,
}

impl PortRegistry {
    pub(crate) fn claim(&self, port_name: &str) -> Result<PortClaim> {
        if !self.ports.lock().insert(port_name.to_string()) {
            return Err(SweepError::Connection(format!(
                "a session is already open on {}",
                port_name
            )));
        }
        debug!("Claimed {}", port_name);
        Ok(PortClaim {
            port_name: port_name.to_string(),
            ports: Arc::clone(&self.ports),
        })
    }

    pub(crate) fn is_claimed(&self, port_name: &str) -> bool {
        self.ports.lock().contains(port_name)
    }
}

impl Drop for PortClaim {
    fn drop(&mut self) {
        self.ports.lock().remove(&self.port_name);
        debug!("Released {}", self.port_name);
    }
}
