//! Statistics tracking for the UDP feed.
//!
//! Counts datagrams by outcome, tracks the SNR distribution of decodes,
//! and breaks alerts down by band and country.

use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::band;
use crate::engine::EngineEvent;
use crate::wire::{Message, WireError};

/// Added to SNR values before recording so negatives fit the histogram.
const SNR_OFFSET: i32 = 50;

/// Thread-safe statistics collector for the UDP feed.
#[derive(Debug)]
pub struct WatchStats {
    /// Datagrams received
    pub datagrams: AtomicU64,

    /// Total bytes of datagram payload received
    pub bytes_received: AtomicU64,

    /// Status messages decoded
    pub status_messages: AtomicU64,

    /// Decode messages decoded
    pub decode_messages: AtomicU64,

    /// Datagrams dropped as truncated, too short or with a bad magic
    pub malformed: AtomicU64,

    /// Well-formed datagrams of a message type we do not handle
    pub unsupported: AtomicU64,

    /// Band changes observed
    pub band_changes: AtomicU64,

    /// New DXCC alerts raised
    pub alerts: AtomicU64,

    /// Histogram of decode SNR values (offset by `SNR_OFFSET`)
    snr_histogram: RwLock<Histogram<u64>>,

    /// Alerts per band
    alerts_by_band: RwLock<HashMap<String, u64>>,

    /// Alerts per country
    alerts_by_country: RwLock<HashMap<String, u64>>,

    /// When stats collection started
    start_time: Instant,
}

impl WatchStats {
    /// Create a new statistics collector.
    pub fn new() -> Self {
        Self {
            datagrams: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            status_messages: AtomicU64::new(0),
            decode_messages: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            unsupported: AtomicU64::new(0),
            band_changes: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            // SNR histogram: -49 to +149 dB after offset, 2 significant figures
            snr_histogram: RwLock::new(
                Histogram::new_with_bounds(1, 200, 2).expect("Failed to create SNR histogram"),
            ),
            alerts_by_band: RwLock::new(HashMap::new()),
            alerts_by_country: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a received datagram.
    pub fn record_datagram(&self, bytes: usize) {
        self.datagrams.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a successfully decoded message.
    pub fn record_message(&self, message: &Message) {
        match message {
            Message::Status(_) => {
                self.status_messages.fetch_add(1, Ordering::Relaxed);
            }
            Message::Decode(decode) => {
                self.decode_messages.fetch_add(1, Ordering::Relaxed);
                let snr = (decode.snr + SNR_OFFSET).clamp(1, 199) as u64;
                if let Ok(mut hist) = self.snr_histogram.write() {
                    let _ = hist.record(snr);
                }
            }
        }
    }

    /// Record a datagram that produced no message.
    pub fn record_rejection(&self, error: &WireError) {
        match error {
            WireError::UnknownType(_) => self.unsupported.fetch_add(1, Ordering::Relaxed),
            _ => self.malformed.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record an engine event.
    pub fn record_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::BandChanged { .. } => {
                self.band_changes.fetch_add(1, Ordering::Relaxed);
            }
            EngineEvent::FrequencyUpdated { .. } => {}
            EngineEvent::NewDxcc(alert) => {
                self.alerts.fetch_add(1, Ordering::Relaxed);

                if let Ok(mut map) = self.alerts_by_band.write() {
                    *map.entry(band::label(alert.band).to_string()).or_insert(0) += 1;
                }

                if let Ok(mut map) = self.alerts_by_country.write() {
                    *map.entry(alert.country.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    /// Get the elapsed time since stats collection started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get the current datagrams per second rate.
    pub fn datagrams_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.datagrams.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Generate a summary report.
    pub fn summary(&self) -> StatsSummary {
        let snr_percentiles = self
            .snr_histogram
            .read()
            .ok()
            .filter(|h| h.len() > 0)
            .map(|h| SnrPercentiles {
                p50: h.value_at_quantile(0.50) as i64 - SNR_OFFSET as i64,
                p90: h.value_at_quantile(0.90) as i64 - SNR_OFFSET as i64,
                p99: h.value_at_quantile(0.99) as i64 - SNR_OFFSET as i64,
                min: h.min() as i64 - SNR_OFFSET as i64,
                max: h.max() as i64 - SNR_OFFSET as i64,
                mean: h.mean() - SNR_OFFSET as f64,
            });

        let alerts_by_band = self
            .alerts_by_band
            .read()
            .map(|m| m.clone())
            .unwrap_or_default();

        // Get top 10 countries
        let top_countries = self
            .alerts_by_country
            .read()
            .map(|m| {
                let mut vec: Vec<_> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
                vec.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                vec.truncate(10);
                vec
            })
            .unwrap_or_default();

        StatsSummary {
            elapsed_secs: self.elapsed().as_secs_f64(),
            datagrams: self.datagrams.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            status_messages: self.status_messages.load(Ordering::Relaxed),
            decode_messages: self.decode_messages.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
            band_changes: self.band_changes.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            datagrams_per_second: self.datagrams_per_second(),
            snr_percentiles,
            alerts_by_band,
            top_countries,
        }
    }
}

impl Default for WatchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile values of the decode SNR distribution, in dB.
#[derive(Debug, Clone, Serialize)]
pub struct SnrPercentiles {
    pub p50: i64,
    pub p90: i64,
    pub p99: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

/// Summary of collected statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub elapsed_secs: f64,
    pub datagrams: u64,
    pub bytes_received: u64,
    pub status_messages: u64,
    pub decode_messages: u64,
    pub malformed: u64,
    pub unsupported: u64,
    pub band_changes: u64,
    pub alerts: u64,
    pub datagrams_per_second: f64,
    pub snr_percentiles: Option<SnrPercentiles>,
    pub alerts_by_band: HashMap<String, u64>,
    pub top_countries: Vec<(String, u64)>,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f, "                 DXCC WATCHER STATISTICS")?;
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f)?;
        writeln!(f, "Runtime: {:.1}s", self.elapsed_secs)?;
        writeln!(f, "Datagrams: {}", self.datagrams)?;
        writeln!(f, "  Status: {}", self.status_messages)?;
        writeln!(f, "  Decode: {}", self.decode_messages)?;
        writeln!(f, "  Malformed: {}", self.malformed)?;
        writeln!(f, "  Unsupported: {}", self.unsupported)?;
        writeln!(f, "Bytes received: {} KB", self.bytes_received / 1024)?;
        writeln!(f, "Rate: {:.1} datagrams/sec", self.datagrams_per_second)?;
        writeln!(f, "Band changes: {}", self.band_changes)?;
        writeln!(f, "New DXCC alerts: {}", self.alerts)?;
        writeln!(f)?;

        if let Some(ref p) = self.snr_percentiles {
            writeln!(f, "Decode SNR Distribution (dB):")?;
            writeln!(f, "  Min: {}, Max: {}, Mean: {:.1}", p.min, p.max, p.mean)?;
            writeln!(f, "  P50: {}, P90: {}, P99: {}", p.p50, p.p90, p.p99)?;
            writeln!(f)?;
        }

        if !self.alerts_by_band.is_empty() {
            writeln!(f, "Alerts by Band:")?;
            let mut bands: Vec<_> = self.alerts_by_band.iter().collect();
            bands.sort_by(|a, b| b.1.cmp(a.1));
            for (band, count) in bands {
                writeln!(f, "  {}: {}", band, count)?;
            }
            writeln!(f)?;
        }

        if !self.top_countries.is_empty() {
            writeln!(f, "Top 10 Countries:")?;
            for (i, (country, count)) in self.top_countries.iter().enumerate() {
                writeln!(f, "  {}. {}: {}", i + 1, country, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::Band;
    use crate::engine::DxccAlert;
    use crate::wire::{DecodeRecord, StatusRecord};
    use chrono::Utc;

    fn make_decode(snr: i32) -> Message {
        Message::Decode(DecodeRecord {
            snr,
            message: "CQ JA1XYZ PM95".to_string(),
            ..Default::default()
        })
    }

    fn make_alert(band: Option<Band>, country: &str) -> EngineEvent {
        EngineEvent::NewDxcc(DxccAlert {
            band,
            country: country.to_string(),
            callsign: "JA1XYZ".to_string(),
            mode: "FT8".to_string(),
            snr: -10,
            decode: DecodeRecord::default(),
            received_at: Utc::now(),
        })
    }

    #[test]
    fn test_record_messages() {
        let stats = WatchStats::new();

        stats.record_datagram(120);
        stats.record_message(&Message::Status(StatusRecord::default()));
        stats.record_datagram(80);
        stats.record_message(&make_decode(-12));

        assert_eq!(stats.datagrams.load(Ordering::Relaxed), 2);
        assert_eq!(stats.bytes_received.load(Ordering::Relaxed), 200);
        assert_eq!(stats.status_messages.load(Ordering::Relaxed), 1);
        assert_eq!(stats.decode_messages.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_rejections() {
        let stats = WatchStats::new();
        stats.record_rejection(&WireError::TooShort(4));
        stats.record_rejection(&WireError::BadMagic(0));
        stats.record_rejection(&WireError::UnknownType(0));

        assert_eq!(stats.malformed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.unsupported.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_snr_percentiles_handle_negatives() {
        let stats = WatchStats::new();
        assert!(stats.summary().snr_percentiles.is_none());

        for _ in 0..10 {
            stats.record_message(&make_decode(-20));
        }

        let p = stats.summary().snr_percentiles.unwrap();
        assert_eq!(p.min, -20);
        assert_eq!(p.max, -20);
        assert!((p.mean + 20.0).abs() < 1.0);
    }

    #[test]
    fn test_summary_generation() {
        let stats = WatchStats::new();

        stats.record_event(&EngineEvent::BandChanged {
            band: Some(Band::M20),
            frequency_hz: Some(14_074_000),
            mode: Some("FT8".to_string()),
            confirmed_count: 0,
        });
        stats.record_event(&make_alert(Some(Band::M20), "JAPAN"));
        stats.record_event(&make_alert(Some(Band::M20), "JAPAN"));
        stats.record_event(&make_alert(None, "FRANCE"));

        let summary = stats.summary();

        assert_eq!(summary.band_changes, 1);
        assert_eq!(summary.alerts, 3);
        assert_eq!(summary.alerts_by_band.get("20m"), Some(&2));
        assert_eq!(summary.alerts_by_band.get("unknown"), Some(&1));
        assert_eq!(summary.top_countries[0], ("JAPAN".to_string(), 2));

        let text = summary.to_string();
        assert!(text.contains("New DXCC alerts: 3"));
        assert!(text.contains("1. JAPAN: 2"));
    }
}
