//! Implementations of the ports.

pub mod clock;
pub mod identity_toolkit;
pub mod memory;
pub mod postgres;
pub mod telemetry;
