//! Bridge state shared by the C entry points

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::access::{PortHandle, SerialPortAccess};
use crate::adapters::mock_serial::MockBackend;
use crate::adapters::serial_port::{SerialPortBackend, SystemPortLister};
use crate::domain::{BridgeConfig, BridgeError, BridgeResult};

/// Open handles keyed by the id handed to the host.
///
/// Ids start at 1 (0 is the C failure sentinel) and are never reused, so a
/// stale id from a closed port can't reach a newer one. Each handle has its
/// own lock: calls on one handle are serialised, calls on different handles
/// only share the brief map lookup. A blocking read therefore holds up a
/// write on the same handle until it returns.
pub struct HandleRegistry {
    next_id: AtomicU64,
    ports: Mutex<HashMap<u64, Arc<Mutex<PortHandle>>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ports: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, handle: PortHandle) -> BridgeResult<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.ports
            .lock()
            .map_err(|_| BridgeError::Internal("Handle registry corrupted".into()))?
            .insert(id, Arc::new(Mutex::new(handle)));
        Ok(id)
    }

    pub fn get(&self, id: u64) -> BridgeResult<Arc<Mutex<PortHandle>>> {
        self.ports
            .lock()
            .map_err(|_| BridgeError::Internal("Handle registry corrupted".into()))?
            .get(&id)
            .cloned()
            .ok_or(BridgeError::InvalidHandle)
    }

    /// Run `f` with exclusive access to the handle behind `id`.
    pub fn with_handle<T>(
        &self,
        id: u64,
        f: impl FnOnce(&mut PortHandle) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let entry = self.get(id)?;
        let mut handle = entry
            .lock()
            .map_err(|_| BridgeError::Internal(format!("Port handle {id} corrupted")))?;
        f(&mut handle)
    }

    /// Forget `id`. The device is released once any call still running on
    /// it returns.
    pub fn remove(&self, id: u64) -> BridgeResult<()> {
        let entry = self
            .ports
            .lock()
            .map_err(|_| BridgeError::Internal("Handle registry corrupted".into()))?
            .remove(&id)
            .ok_or(BridgeError::InvalidHandle)?;
        // Last reference closes the port; otherwise the in-flight call's drop does
        if let Ok(handle) = Arc::try_unwrap(entry) {
            match handle.into_inner() {
                Ok(handle) => handle.close(),
                Err(poisoned) => poisoned.into_inner().close(),
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ports.lock().map(|ports| ports.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the C boundary needs: configuration, the access façade and
/// the handles it has given out.
pub struct BridgeState {
    pub config: BridgeConfig,
    pub access: SerialPortAccess,
    pub registry: HandleRegistry,
}

impl BridgeState {
    /// Build the state for `config`, choosing the real or mock backend.
    pub fn new(config: BridgeConfig) -> Self {
        let access = if config.mock {
            log::info!("Serving mock serial ports: {}", config.mock_ports.join(", "));
            let backend = MockBackend::with_ports(config.mock_ports.iter().cloned());
            SerialPortAccess::new(Arc::new(backend.clone()), Arc::new(backend))
        } else {
            SerialPortAccess::new(Arc::new(SerialPortBackend), Arc::new(SystemPortLister))
        };
        Self::with_access(config, access)
    }

    /// Build the state around an existing façade (tests inject mocks here).
    pub fn with_access(config: BridgeConfig, access: SerialPortAccess) -> Self {
        let access = access.with_timeout(config.timeout());
        Self {
            config,
            access,
            registry: HandleRegistry::new(),
        }
    }
}
