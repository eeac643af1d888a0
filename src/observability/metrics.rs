//! # Metrics Collection
//!
//! Prometheus counters for authentication and session outcomes. Recording is
//! a no-op until [`init_metrics`] has installed the exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{CampusError, Result};
use ::tracing::info;
use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record a bearer-token authentication attempt
    pub fn record_authentication(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_authentications_total", &labels).increment(1);
    }

    pub fn record_login(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_logins_total", &labels).increment(1);
    }

    pub fn record_registration(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_registrations_total", &labels).increment(1);
    }

    pub fn record_refresh(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_refresh_total", &labels).increment(1);
    }

    /// A superseded refresh token was presented again
    pub fn record_refresh_reuse(&self) {
        counter!("auth_refresh_reuse_detected_total").increment(1);
    }

    pub fn register_auth_metrics(&self) {
        describe_counter!(
            "auth_authentications_total",
            Unit::Count,
            "Bearer token authentication attempts by outcome"
        );
        describe_counter!("auth_logins_total", Unit::Count, "Sign-in attempts by outcome");
        describe_counter!("auth_registrations_total", Unit::Count, "Sign-up attempts by outcome");
        describe_counter!("auth_refresh_total", Unit::Count, "Token refresh attempts by outcome");
        describe_counter!(
            "auth_refresh_reuse_detected_total",
            Unit::Count,
            "Refresh tokens presented after they were rotated away"
        );
    }
}

/// Global metrics recorder instance
static METRICS: once_cell::sync::Lazy<Arc<RwLock<Option<MetricsRecorder>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(RwLock::new(None)));

/// Initialize metrics collection and the Prometheus exporter
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let Some(metrics_addr) = config.metrics_bind_address() else {
        info!("Metrics exporter disabled");
        return Ok(());
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        CampusError::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| {
            CampusError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    let recorder = MetricsRecorder::new();
    {
        let mut metrics = METRICS.write().await;
        *metrics = Some(recorder.clone());
    }
    recorder.register_auth_metrics();

    info!(metrics_addr = %metrics_addr, service_name = %config.service_name, "Metrics collection initialized");
    Ok(())
}

/// Get the global metrics recorder
pub async fn get_metrics() -> Option<MetricsRecorder> {
    METRICS.read().await.clone()
}

/// Record an authentication outcome via the global recorder
pub async fn record_authentication(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_authentication(status);
    }
}

/// Record a sign-in outcome via the global recorder
pub async fn record_login(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_login(status);
    }
}

/// Record a sign-up outcome via the global recorder
pub async fn record_registration(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_registration(status);
    }
}

/// Record a refresh outcome via the global recorder
pub async fn record_refresh(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_refresh(status);
    }
}

/// Record refresh-token reuse via the global recorder
pub async fn record_refresh_reuse() {
    if let Some(metrics) = get_metrics().await {
        metrics.record_refresh_reuse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_without_exporter() {
        let recorder = MetricsRecorder::new();
        recorder.register_auth_metrics();
        recorder.record_authentication("success");
        recorder.record_login("invalid_credentials");
        recorder.record_registration("duplicate_email");
        recorder.record_refresh("reused");
        recorder.record_refresh_reuse();
    }

    #[tokio::test]
    async fn test_init_metrics_no_port() {
        let config = ObservabilityConfig { metrics_port: 0, ..Default::default() };
        assert!(init_metrics(&config).await.is_ok());
        // Global helpers stay silent without a recorder
        record_refresh_reuse().await;
    }
}
