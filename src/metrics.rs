//! Prometheus metrics HTTP server.
//!
//! Exposes watcher statistics in Prometheus text format via HTTP endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use crate::stats::WatchStats;

/// Start the Prometheus metrics HTTP server.
///
/// Runs in the background and serves metrics at `/metrics`.
/// Returns an error if the server fails to bind to the port.
pub async fn start_metrics_server(
    port: u16,
    stats: Arc<WatchStats>,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(stats);

    let listener = TcpListener::bind(addr).await?;
    info!("Prometheus metrics server listening on http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(stats): State<Arc<WatchStats>>) -> impl IntoResponse {
    let output = format_prometheus_metrics(&stats);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

fn push_counter(output: &mut String, name: &str, help: &str, value: u64) {
    output.push_str(&format!("# HELP {} {}\n", name, help));
    output.push_str(&format!("# TYPE {} counter\n", name));
    output.push_str(&format!("{} {}\n", name, value));
}

/// Format statistics as Prometheus text format.
fn format_prometheus_metrics(stats: &WatchStats) -> String {
    let summary = stats.summary();
    let mut output = String::with_capacity(4096);

    // Uptime
    output.push_str("# HELP dxcc_uptime_seconds Time since the watcher started\n");
    output.push_str("# TYPE dxcc_uptime_seconds gauge\n");
    output.push_str(&format!("dxcc_uptime_seconds {:.3}\n", summary.elapsed_secs));

    // Datagrams by outcome
    output.push_str("# HELP dxcc_datagrams_total Datagrams received by outcome\n");
    output.push_str("# TYPE dxcc_datagrams_total counter\n");
    for (outcome, count) in [
        ("status", summary.status_messages),
        ("decode", summary.decode_messages),
        ("malformed", summary.malformed),
        ("unsupported", summary.unsupported),
    ] {
        output.push_str(&format!(
            "dxcc_datagrams_total{{outcome=\"{}\"}} {}\n",
            outcome, count
        ));
    }

    push_counter(
        &mut output,
        "dxcc_bytes_received_total",
        "Total bytes of datagram payload received",
        summary.bytes_received,
    );
    push_counter(
        &mut output,
        "dxcc_band_changes_total",
        "Band changes reported by the decoding application",
        summary.band_changes,
    );
    push_counter(
        &mut output,
        "dxcc_alerts_total",
        "New DXCC alerts raised",
        summary.alerts,
    );

    // Datagram rate
    output.push_str("# HELP dxcc_datagrams_per_second Current datagram rate\n");
    output.push_str("# TYPE dxcc_datagrams_per_second gauge\n");
    output.push_str(&format!(
        "dxcc_datagrams_per_second {:.3}\n",
        summary.datagrams_per_second
    ));

    // Alerts by band
    output.push_str("# HELP dxcc_alerts_by_band_total Alerts broken down by band\n");
    output.push_str("# TYPE dxcc_alerts_by_band_total counter\n");
    for (band, count) in &summary.alerts_by_band {
        output.push_str(&format!(
            "dxcc_alerts_by_band_total{{band=\"{}\"}} {}\n",
            band, count
        ));
    }

    // SNR summary
    if let Some(ref snr) = summary.snr_percentiles {
        output.push_str("# HELP dxcc_decode_snr_db Decode SNR distribution in decibels\n");
        output.push_str("# TYPE dxcc_decode_snr_db summary\n");
        output.push_str(&format!("dxcc_decode_snr_db{{quantile=\"0.5\"}} {}\n", snr.p50));
        output.push_str(&format!("dxcc_decode_snr_db{{quantile=\"0.9\"}} {}\n", snr.p90));
        output.push_str(&format!("dxcc_decode_snr_db{{quantile=\"0.99\"}} {}\n", snr.p99));
        output.push_str(&format!(
            "dxcc_decode_snr_db_count {}\n",
            summary.decode_messages
        ));
    }

    output
}
