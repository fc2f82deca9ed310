//! DXCC Watcher - new DXCC entity alerts from a WSJT-X UDP feed.
//!
//! This crate provides:
//! - A decoder for the WSJT-X binary UDP protocol (Status and Decode)
//! - Band classification and cty.dat longest-prefix country lookup
//! - A per-band alert engine that skips confirmed countries and
//!   suppresses repeats within a band session
//! - An async UDP listener that drives the engine
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashSet;
//! use std::sync::Arc;
//! use dxcc_watcher::{
//!     AlertEngine, Band, ConfirmedError, ConfirmedSource, CountryResolver, PrefixEntry,
//!     wire::{self, DatagramBuilder, DecodeRecord, StatusRecord},
//! };
//!
//! struct NothingConfirmed;
//!
//! impl ConfirmedSource for NothingConfirmed {
//!     fn load(&self, _band: Option<Band>) -> Result<HashSet<String>, ConfirmedError> {
//!         Ok(HashSet::new())
//!     }
//! }
//!
//! let resolver = Arc::new(CountryResolver::new(vec![PrefixEntry::new("JA", "Japan")]));
//! let mut engine = AlertEngine::new(resolver, NothingConfirmed);
//!
//! let status = DatagramBuilder::status(&StatusRecord {
//!     frequency_hz: 14_074_000,
//!     mode: "FT8".to_string(),
//!     ..Default::default()
//! });
//! engine.process(wire::decode(&status).unwrap());
//!
//! let decode = DatagramBuilder::decode(&DecodeRecord {
//!     snr: -12,
//!     message: "CQ JA1XYZ PM95".to_string(),
//!     ..Default::default()
//! });
//! let alert = engine.handle_decode(match wire::decode(&decode) {
//!     Some(wire::Message::Decode(d)) => d,
//!     _ => unreachable!(),
//! });
//! assert_eq!(alert.unwrap().country, "JAPAN");
//! ```

pub mod band;
pub mod callsign;
pub mod config;
pub mod confirmed;
pub mod cty;
pub mod engine;
pub mod listener;
pub mod metrics;
pub mod stats;
pub mod wire;

pub use band::Band;
pub use callsign::extract_dx_call;
pub use config::Config;
pub use confirmed::{ConfirmedError, ConfirmedSource, FileConfirmedSource, parse_confirmed};
pub use cty::{CountryResolver, CtyError, PrefixEntry, parse_cty};
pub use engine::{AlertEngine, DxccAlert, EngineEvent};
pub use listener::{Listener, ListenerConfig, ListenerError, WatchEvent};
pub use stats::{StatsSummary, WatchStats};
pub use wire::{DecodeRecord, Message, StatusRecord, WireError, decode, parse_datagram};
