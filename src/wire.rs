//! Decoder for the WSJT-X UDP message protocol.
//!
//! Every datagram starts with a 12-byte big-endian header followed by a
//! type-specific body:
//!
//! ```text
//! +--------------+----------------+--------------+----------------------+
//! | magic (u32)  | schema (u32)   | type (u32)   | body ...             |
//! | 0xADBCCBDA   | ignored        | 1 / 2        |                      |
//! +--------------+----------------+--------------+----------------------+
//! ```
//!
//! Strings are a u32 byte length followed by UTF-8 text. Only `Status` (1)
//! and `Decode` (2) messages are understood; everything else is rejected.
//!
//! Datagrams on a live feed are frequently truncated or come from a
//! different producer version, so the decoder never panics. Status
//! bodies are read field by field with defaults for whatever is missing;
//! Decode bodies require the SNR and delta-frequency fields.

use nom::{
    IResult, Parser,
    combinator::opt,
    number::complete::{be_f64, be_i32, be_u8, be_u32, be_u64},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::band::Band;

/// Magic number at offset 0 of every datagram.
pub const MAGIC: u32 = 0xADBC_CBDA;

/// Schema version written by [`DatagramBuilder`]. Ignored when decoding.
pub const SCHEMA_VERSION: u32 = 2;

/// Length of the common header.
pub const HEADER_LEN: usize = 12;

/// Message type discriminator for Status messages.
pub const STATUS: u32 = 1;

/// Message type discriminator for Decode messages.
pub const DECODE: u32 = 2;

/// String length marking a null string.
const NULL_STRING: u32 = u32::MAX;

/// Reasons a datagram produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("datagram too short: {0} bytes")]
    TooShort(usize),

    #[error("bad magic number: {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported message type: {0}")]
    UnknownType(u32),

    #[error("truncated field: {0}")]
    Truncated(&'static str),
}

/// Result type for wire decoding.
pub type WireResult<T> = Result<T, WireError>;

/// The decoding application's current dial state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub wsjtx_id: String,
    pub frequency_hz: u64,
    pub mode: String,
    /// Band of `frequency_hz`, `None` when outside every allocation.
    pub band: Option<Band>,
    pub dx_call: String,
    pub report: String,
    pub tx_mode: String,
    pub tx_enabled: bool,
    pub transmitting: bool,
    pub decoding: bool,
    pub rx_df: u32,
    pub tx_df: u32,
    pub de_call: String,
    pub de_grid: String,
    pub dx_grid: String,
}

/// A single decoded signal.
///
/// The `frequency_hz`, `frequency_mhz` and `band` fields are derived from
/// the dial frequency of the last Status message and stay `None` until
/// one is known. See [`DecodeRecord::with_dial_frequency`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeRecord {
    pub wsjtx_id: String,
    pub is_new: bool,
    /// Milliseconds since midnight UTC.
    pub time_ms: u32,
    pub snr: i32,
    /// Time offset in seconds.
    pub delta_time_s: f64,
    /// Audio offset from the dial frequency.
    pub delta_freq_hz: u32,
    pub mode: String,
    pub message: String,
    pub low_confidence: bool,
    pub off_air: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_mhz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
}

impl DecodeRecord {
    /// Fill in the absolute frequency and band from a dial frequency.
    ///
    /// With no dial frequency the derived fields are cleared.
    pub fn with_dial_frequency(mut self, dial_hz: Option<u64>) -> Self {
        match dial_hz {
            Some(dial) => {
                let hz = dial.saturating_add(u64::from(self.delta_freq_hz));
                self.frequency_hz = Some(hz);
                self.frequency_mhz = Some(hz as f64 / 1e6);
                self.band = Band::classify(hz);
            }
            None => {
                self.frequency_hz = None;
                self.frequency_mhz = None;
                self.band = None;
            }
        }
        self
    }
}

/// A recognized datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Status(StatusRecord),
    Decode(DecodeRecord),
}

fn u8_field(input: &[u8]) -> IResult<&[u8], u8> {
    be_u8(input)
}

fn u32_field(input: &[u8]) -> IResult<&[u8], u32> {
    be_u32(input)
}

fn i32_field(input: &[u8]) -> IResult<&[u8], i32> {
    be_i32(input)
}

fn u64_field(input: &[u8]) -> IResult<&[u8], u64> {
    be_u64(input)
}

fn f64_field(input: &[u8]) -> IResult<&[u8], f64> {
    be_f64(input)
}

/// Parse a length-prefixed string.
///
/// Null and zero lengths yield an empty string. A length running past
/// the end of the input also yields an empty string and consumes the
/// rest, so every following field falls back to its default. Only a
/// missing length prefix is an error.
fn qt_string(input: &[u8]) -> IResult<&[u8], String> {
    let (input, len) = u32_field(input)?;
    if len == 0 || len == NULL_STRING {
        return Ok((input, String::new()));
    }
    let len = len as usize;
    if len > input.len() {
        return Ok((&input[input.len()..], String::new()));
    }
    let (bytes, input) = input.split_at(len);
    Ok((input, String::from_utf8_lossy(bytes).into_owned()))
}

// The lenient readers below never fail. A missing field consumes
// whatever partial bytes remain so later fields default too.

fn exhausted(input: &[u8]) -> &[u8] {
    &input[input.len()..]
}

fn lenient_string(input: &[u8]) -> (&[u8], String) {
    match opt(qt_string).parse(input) {
        Ok((rest, Some(s))) => (rest, s),
        _ => (exhausted(input), String::new()),
    }
}

fn lenient_bool(input: &[u8]) -> (&[u8], bool) {
    match u8_field(input) {
        Ok((rest, b)) => (rest, b != 0),
        Err(_) => (exhausted(input), false),
    }
}

fn lenient_u32(input: &[u8]) -> (&[u8], u32) {
    match u32_field(input) {
        Ok((rest, v)) => (rest, v),
        Err(_) => (exhausted(input), 0),
    }
}

fn lenient_u64(input: &[u8]) -> (&[u8], u64) {
    match u64_field(input) {
        Ok((rest, v)) => (rest, v),
        Err(_) => (exhausted(input), 0),
    }
}

/// Parse a Status body (after the header). Never fails.
fn parse_status(input: &[u8]) -> StatusRecord {
    let (input, wsjtx_id) = lenient_string(input);
    let (input, frequency_hz) = lenient_u64(input);
    let (input, mode) = lenient_string(input);
    let (input, dx_call) = lenient_string(input);
    let (input, report) = lenient_string(input);
    let (input, tx_mode) = lenient_string(input);
    let (input, tx_enabled) = lenient_bool(input);
    let (input, transmitting) = lenient_bool(input);
    let (input, decoding) = lenient_bool(input);
    let (input, rx_df) = lenient_u32(input);
    let (input, tx_df) = lenient_u32(input);
    let (input, de_call) = lenient_string(input);
    let (input, de_grid) = lenient_string(input);
    let (_, dx_grid) = lenient_string(input);

    StatusRecord {
        wsjtx_id,
        frequency_hz,
        mode,
        band: Band::classify(frequency_hz),
        dx_call,
        report,
        tx_mode,
        tx_enabled,
        transmitting,
        decoding,
        rx_df,
        tx_df,
        de_call,
        de_grid,
        dx_grid,
    }
}

/// Parse a Decode body (after the header).
fn parse_decode(input: &[u8]) -> WireResult<DecodeRecord> {
    let (input, wsjtx_id) = lenient_string(input);
    let (input, is_new) = u8_field(input).map_err(|_| WireError::Truncated("new"))?;
    let (input, time_ms) = u32_field(input).map_err(|_| WireError::Truncated("time"))?;
    let (input, snr) = i32_field(input).map_err(|_| WireError::Truncated("snr"))?;
    let (input, delta_time_s) =
        f64_field(input).map_err(|_| WireError::Truncated("delta_time"))?;
    let (input, delta_freq_hz) =
        u32_field(input).map_err(|_| WireError::Truncated("delta_frequency"))?;
    let (input, mode) = lenient_string(input);
    let (input, message) = lenient_string(input);
    let (input, low_confidence) = lenient_bool(input);
    let (_, off_air) = lenient_bool(input);

    Ok(DecodeRecord {
        wsjtx_id,
        is_new: is_new != 0,
        time_ms,
        snr,
        delta_time_s,
        delta_freq_hz,
        mode,
        message,
        low_confidence,
        off_air,
        frequency_hz: None,
        frequency_mhz: None,
        band: None,
    })
}

/// Parse a datagram, reporting why it was rejected.
pub fn parse_datagram(buf: &[u8]) -> WireResult<Message> {
    if buf.len() < HEADER_LEN {
        return Err(WireError::TooShort(buf.len()));
    }

    let (body, (magic, _schema, kind)) = (u32_field, u32_field, u32_field)
        .parse(buf)
        .map_err(|_| WireError::TooShort(buf.len()))?;

    if magic != MAGIC {
        return Err(WireError::BadMagic(magic));
    }

    match kind {
        STATUS => Ok(Message::Status(parse_status(body))),
        DECODE => parse_decode(body).map(Message::Decode),
        other => Err(WireError::UnknownType(other)),
    }
}

/// Decode a datagram, returning `None` for anything unrecognized or malformed.
#[inline]
pub fn decode(buf: &[u8]) -> Option<Message> {
    parse_datagram(buf).ok()
}

/// Builds datagrams in the same wire layout the decoder reads.
#[derive(Debug, Clone)]
pub struct DatagramBuilder {
    buf: Vec<u8>,
}

impl DatagramBuilder {
    /// Start a datagram of the given message type with a valid header.
    pub fn new(kind: u32) -> Self {
        Self::with_header(MAGIC, SCHEMA_VERSION, kind)
    }

    /// Start a datagram with an arbitrary header.
    pub fn with_header(magic: u32, schema: u32, kind: u32) -> Self {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(&magic.to_be_bytes());
        buf.extend_from_slice(&schema.to_be_bytes());
        buf.extend_from_slice(&kind.to_be_bytes());
        Self { buf }
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn bool(self, value: bool) -> Self {
        self.u8(value as u8)
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn f64(mut self, value: f64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        self.buf
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn null_string(self) -> Self {
        self.u32(NULL_STRING)
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.buf.extend_from_slice(value);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }

    /// Encode a complete Status datagram.
    pub fn status(status: &StatusRecord) -> Vec<u8> {
        Self::new(STATUS)
            .string(&status.wsjtx_id)
            .u64(status.frequency_hz)
            .string(&status.mode)
            .string(&status.dx_call)
            .string(&status.report)
            .string(&status.tx_mode)
            .bool(status.tx_enabled)
            .bool(status.transmitting)
            .bool(status.decoding)
            .u32(status.rx_df)
            .u32(status.tx_df)
            .string(&status.de_call)
            .string(&status.de_grid)
            .string(&status.dx_grid)
            .build()
    }

    /// Encode a complete Decode datagram.
    pub fn decode(decode: &DecodeRecord) -> Vec<u8> {
        Self::new(DECODE)
            .string(&decode.wsjtx_id)
            .bool(decode.is_new)
            .u32(decode.time_ms)
            .i32(decode.snr)
            .f64(decode.delta_time_s)
            .u32(decode.delta_freq_hz)
            .string(&decode.mode)
            .string(&decode.message)
            .bool(decode.low_confidence)
            .bool(decode.off_air)
            .build()
    }
}
