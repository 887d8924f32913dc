//! Gateways exposed to callers.

pub mod auth;
pub mod post;

pub use auth::AuthGateway;
pub use post::PostGateway;
