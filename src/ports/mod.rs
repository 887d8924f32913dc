//! These traits define what the gateways need from the outside world.

pub mod clock;
pub mod identity;
pub mod store;
pub mod telemetry;

pub use clock::Clock;
pub use identity::{IdentityError, IdentityProvider};
pub use store::{DocumentStore, StoreError, ToBackend};
pub use telemetry::TelemetryPort;
