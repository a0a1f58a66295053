//! Port traits (interfaces)
//!
//! These traits define the boundaries between the core and the platform.
//! Adapters implement these traits to connect to real hardware or to the
//! in-memory mock.

pub mod lister;
pub mod serial;

pub use lister::*;
pub use serial::*;
