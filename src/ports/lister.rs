//! Port enumeration trait

use crate::domain::{BridgeResult, PortInfo};

/// Discovers the serial ports currently present on the system.
///
/// Best effort: devices whose port name can't be read are skipped rather
/// than reported. Only a failure of the enumeration itself is an error.
pub trait PortLister: Send + Sync {
    fn list_ports(&self) -> BridgeResult<Vec<PortInfo>>;
}
