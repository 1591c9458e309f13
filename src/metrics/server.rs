//! Prometheus metrics exporter.

use metrics_exporter_prometheus::PrometheusBuilder;
use snafu::prelude::*;
use std::net::SocketAddr;
use tracing::info;

use crate::error::{MetricsError, PrometheusInitSnafu};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// The exporter runs its HTTP listener on a background thread, so jobs stay
/// synchronous. Metrics recorded before this call are dropped.
///
/// # Example
///
/// ```ignore
/// use std::net::SocketAddr;
/// use dockside::metrics;
///
/// let addr: SocketAddr = "0.0.0.0:9090".parse()?;
/// metrics::init(addr)?;
/// ```
pub fn init(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context(PrometheusInitSnafu)?;

    info!(%addr, "Serving Prometheus metrics");
    Ok(())
}
