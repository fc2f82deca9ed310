//! New-DXCC alert engine.
//!
//! The engine owns the session state for one ingress session: the current
//! band, mode and dial frequency, the confirmed set for the current band,
//! and the set of `band:callsign:country` keys already alerted. Status
//! messages drive band changes; decode messages may produce alerts.
//!
//! A band change swaps the confirmed set and clears the alerted set in the
//! same call, so the next decode is always judged against the new band.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::band::{self, Band};
use crate::callsign::extract_dx_call;
use crate::confirmed::ConfirmedSource;
use crate::cty::CountryResolver;
use crate::wire::{DecodeRecord, Message, StatusRecord};

/// A decode from a country not yet confirmed on the current band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DxccAlert {
    pub band: Option<Band>,
    pub country: String,
    pub callsign: String,
    pub mode: String,
    pub snr: i32,
    pub decode: DecodeRecord,
    pub received_at: DateTime<Utc>,
}

impl fmt::Display for DxccAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} NEW DXCC [{}] {} {} {} {:+} dB",
            self.received_at.format("%H:%M:%S"),
            band::label(self.band),
            self.country,
            self.callsign,
            self.mode,
            self.snr,
        )?;
        if let Some(mhz) = self.decode.frequency_mhz {
            write!(f, " {:.3} MHz", mhz)?;
        }
        Ok(())
    }
}

/// Observations and alerts produced by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The band changed and the confirmed set was reloaded.
    BandChanged {
        band: Option<Band>,
        frequency_hz: Option<u64>,
        mode: Option<String>,
        confirmed_count: usize,
    },

    /// The dial moved within the current band.
    FrequencyUpdated {
        band: Option<Band>,
        frequency_hz: Option<u64>,
        mode: Option<String>,
    },

    /// A new DXCC entity was decoded.
    NewDxcc(DxccAlert),
}

#[derive(Debug, Default)]
struct Session {
    /// Whether any Status has been seen.
    started: bool,
    band: Option<Band>,
    mode: Option<String>,
    frequency_hz: Option<u64>,
    confirmed: HashSet<String>,
    alerted: HashSet<String>,
}

/// Per-band alert and dedup state machine.
pub struct AlertEngine<S> {
    resolver: Arc<CountryResolver>,
    source: S,
    session: Session,
}

impl<S: ConfirmedSource> AlertEngine<S> {
    /// Create an engine with no band known and empty sets.
    pub fn new(resolver: Arc<CountryResolver>, source: S) -> Self {
        Self {
            resolver,
            source,
            session: Session::default(),
        }
    }

    /// Feed one decoded message.
    pub fn process(&mut self, message: Message) -> Option<EngineEvent> {
        match message {
            Message::Status(status) => Some(self.handle_status(&status)),
            Message::Decode(decode) => self.handle_decode(decode).map(EngineEvent::NewDxcc),
        }
    }

    /// Apply a Status message.
    ///
    /// The first Status, and any Status whose band differs from the
    /// current one, is a band change. Otherwise only the frequency moves.
    pub fn handle_status(&mut self, status: &StatusRecord) -> EngineEvent {
        let frequency_hz = (status.frequency_hz != 0).then_some(status.frequency_hz);

        if self.session.started && status.band == self.session.band {
            self.session.frequency_hz = frequency_hz;
            debug!(
                "Frequency {:.3} MHz on {}",
                frequency_hz.unwrap_or(0) as f64 / 1e6,
                band::label(self.session.band)
            );
            return EngineEvent::FrequencyUpdated {
                band: self.session.band,
                frequency_hz,
                mode: self.session.mode.clone(),
            };
        }

        let confirmed = match self.source.load(status.band) {
            Ok(set) => set,
            Err(e) => {
                warn!("{}; continuing with an empty confirmed set", e);
                HashSet::new()
            }
        };

        let session = &mut self.session;
        session.started = true;
        session.band = status.band;
        session.mode = (!status.mode.is_empty()).then(|| status.mode.clone());
        session.frequency_hz = frequency_hz;
        session.confirmed = confirmed;
        session.alerted.clear();

        info!(
            "Band changed to: {} ({:.3} MHz)",
            band::label(session.band),
            frequency_hz.unwrap_or(0) as f64 / 1e6
        );
        info!("Mode: {}", session.mode.as_deref().unwrap_or("unknown"));
        info!(
            "Loaded {} confirmed countries for this band",
            session.confirmed.len()
        );

        EngineEvent::BandChanged {
            band: session.band,
            frequency_hz,
            mode: session.mode.clone(),
            confirmed_count: session.confirmed.len(),
        }
    }

    /// Evaluate a Decode message, returning an alert at most once per
    /// band, callsign and country within the current band session.
    pub fn handle_decode(&mut self, decode: DecodeRecord) -> Option<DxccAlert> {
        let decode = decode.with_dial_frequency(self.session.frequency_hz);

        let Some(callsign) = extract_dx_call(&decode.message) else {
            trace!("No callsign in '{}'", decode.message);
            return None;
        };

        let Some(country) = self.resolver.resolve(callsign) else {
            trace!("No country for {}", callsign);
            return None;
        };

        if self.session.confirmed.contains(country) {
            trace!("{} ({}) already confirmed", country, callsign);
            return None;
        }

        let key = format!(
            "{}:{}:{}",
            band::label(self.session.band),
            callsign,
            country
        );
        if !self.session.alerted.insert(key) {
            trace!("{} ({}) already alerted", country, callsign);
            return None;
        }

        let callsign = callsign.to_string();
        let country = country.to_string();

        info!(
            "NEW DXCC [{}]: {} ({}) - {:.3} MHz",
            band::label(self.session.band),
            country,
            callsign,
            decode.frequency_mhz.unwrap_or(0.0)
        );

        Some(DxccAlert {
            band: self.session.band,
            country,
            callsign,
            mode: decode.mode.clone(),
            snr: decode.snr,
            decode,
            received_at: Utc::now(),
        })
    }

    /// The current band, `None` when unknown.
    pub fn current_band(&self) -> Option<Band> {
        self.session.band
    }

    /// The mode reported at the last band change.
    pub fn current_mode(&self) -> Option<&str> {
        self.session.mode.as_deref()
    }

    /// The last known dial frequency.
    pub fn current_frequency_hz(&self) -> Option<u64> {
        self.session.frequency_hz
    }

    /// Size of the confirmed set for the current band.
    pub fn confirmed_count(&self) -> usize {
        self.session.confirmed.len()
    }

    /// Number of alerts raised in the current band session.
    pub fn alerted_count(&self) -> usize {
        self.session.alerted.len()
    }
}
