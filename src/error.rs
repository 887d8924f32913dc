//! Error handler for postwall gateways.

use thiserror::Error;

use crate::ports::{IdentityError, StoreError};

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Enum representing gateway errors.
///
/// Service failures are passed through untouched.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("post {id} does not exist")]
    PostNotFound { id: String },
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Store(StoreError::Serialization(err))
    }
}
