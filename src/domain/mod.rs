//! Values shared by gateways, ports and adapters.

pub mod document;
pub mod post;
pub mod session;

pub use document::*;
pub use post::*;
pub use session::*;
