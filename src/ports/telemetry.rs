//! Interface for observability.

/// Port for telemetry/observability operations.
pub trait TelemetryPort: Send + Sync {
    /// Record a successful sign-in.
    fn record_auth_success(&self, user_id: &str, method: &str);

    /// Record a failed sign-in or sign-up.
    fn record_auth_failure(&self, method: &str, reason: &str);

    /// Record a new account creation.
    fn record_account_created(&self, user_id: &str);

    /// Record a sign-out.
    fn record_sign_out(&self, user_id: Option<&str>);

    /// Record a write on a post (`created`, `updated`, `deleted`, `liked`).
    fn record_post_event(&self, post_id: &str, event: &str);
}
