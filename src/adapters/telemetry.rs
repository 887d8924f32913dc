//! Telemetry adapters - Observability implementations.

use crate::ports::TelemetryPort;

/// Tracing-based telemetry adapter.
///
/// Counters go through the `metrics` facade and are dropped unless a
/// recorder is installed.
#[derive(Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    /// Create a new [`TracingTelemetry`].
    pub fn new() -> Self {
        Self
    }
}

impl TelemetryPort for TracingTelemetry {
    fn record_auth_success(&self, user_id: &str, method: &str) {
        tracing::info!(user_id, method, "authentication successful");
        metrics::counter!(
            "postwall_auth_total",
            "method" => method.to_owned(),
            "outcome" => "success"
        )
        .increment(1);
    }

    fn record_auth_failure(&self, method: &str, reason: &str) {
        tracing::info!(method, reason, "authentication failed");
        metrics::counter!(
            "postwall_auth_total",
            "method" => method.to_owned(),
            "outcome" => "failure"
        )
        .increment(1);
    }

    fn record_account_created(&self, user_id: &str) {
        tracing::info!(user_id, "account created");
        metrics::counter!("postwall_accounts_created_total").increment(1);
    }

    fn record_sign_out(&self, user_id: Option<&str>) {
        tracing::info!(user_id, "signed out");
    }

    fn record_post_event(&self, post_id: &str, event: &str) {
        tracing::info!(post_id, event, "post written");
        metrics::counter!("postwall_posts_total", "event" => event.to_owned())
            .increment(1);
    }
}
