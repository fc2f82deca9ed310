//! Benchmarks for the WSJT-X datagram decoder and alert pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use dxcc_watcher::{
    AlertEngine, Band, ConfirmedError, ConfirmedSource, CountryResolver, WatchStats, parse_cty,
    callsign::extract_dx_call,
    listener::process_datagram,
    wire::{DatagramBuilder, DecodeRecord, StatusRecord, parse_datagram},
};

const SAMPLE_CTY: &str = "\
United States:            05:  08:  NA:   37.53:    91.67:     5.0:  K:
    AA,AB,AC,K,N,W;
Hawaii:                   31:  61:  OC:   21.12:   157.48:    10.0:  KH6:
    AH6,KH6,NH6,WH6;
Japan:                    25:  45:  AS:   36.40:  -138.38:    -9.0:  JA:
    7J,7K,JA,JE,JR;
Ukraine:                  16:  29:  EU:   50.00:   -30.00:    -2.0:  UR:
    EM,EN,EO,UR,US,UT,UU,UV,UW,UX,UY,UZ;
";

/// Sample decoded messages for benchmarking.
const SAMPLE_MESSAGES: &[&str] = &[
    "CQ JA1XYZ PM95",
    "CQ DX KH6ABC BL11",
    "K1ABC UW5EMC KN88",
    "UW5EMC K1ABC -12",
    "W2DEF JR2QQQ R-08",
    "CQ NA W1AW FN31",
    "JA1XYZ K1ABC RR73",
    "<...> N0CALL 73",
];

struct NothingConfirmed;

impl ConfirmedSource for NothingConfirmed {
    fn load(&self, _band: Option<Band>) -> Result<HashSet<String>, ConfirmedError> {
        Ok(HashSet::new())
    }
}

fn status_datagram() -> Vec<u8> {
    DatagramBuilder::status(&StatusRecord {
        wsjtx_id: "WSJT-X".to_string(),
        frequency_hz: 14_074_000,
        mode: "FT8".to_string(),
        de_call: "K1ABC".to_string(),
        de_grid: "FN42".to_string(),
        decoding: true,
        ..Default::default()
    })
}

fn decode_datagrams() -> Vec<Vec<u8>> {
    SAMPLE_MESSAGES
        .iter()
        .map(|message| {
            DatagramBuilder::decode(&DecodeRecord {
                wsjtx_id: "WSJT-X".to_string(),
                is_new: true,
                time_ms: 45_000_000,
                snr: -12,
                delta_time_s: 0.2,
                delta_freq_hz: 1234,
                mode: "~".to_string(),
                message: message.to_string(),
                ..Default::default()
            })
        })
        .collect()
}

fn bench_parse_datagram(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_datagram");
    let status = status_datagram();
    let decodes = decode_datagrams();

    group.throughput(Throughput::Elements(1));
    group.bench_function("status", |b| b.iter(|| parse_datagram(black_box(&status))));
    group.bench_function("decode", |b| {
        b.iter(|| parse_datagram(black_box(&decodes[0])))
    });

    let garbage = vec![0u8; 64];
    group.bench_function("bad_magic", |b| {
        b.iter(|| parse_datagram(black_box(&garbage)))
    });

    group.finish();
}

fn bench_extract_dx_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_dx_call");

    group.throughput(Throughput::Elements(SAMPLE_MESSAGES.len() as u64));
    group.bench_function("batch", |b| {
        b.iter(|| {
            for message in SAMPLE_MESSAGES {
                let _ = extract_dx_call(black_box(message));
            }
        })
    });

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");

    let resolver = Arc::new(CountryResolver::new(parse_cty(SAMPLE_CTY)));
    let stats = WatchStats::new();
    let status = status_datagram();
    let decodes = decode_datagrams();

    // After the first round every decode repeats within the band session
    group.throughput(Throughput::Elements(decodes.len() as u64 + 1));
    group.bench_function("band_session", |b| {
        let mut engine = AlertEngine::new(Arc::clone(&resolver), NothingConfirmed);
        b.iter(|| {
            let _ = process_datagram(black_box(&status), &mut engine, &stats);
            for datagram in &decodes {
                let _ = process_datagram(black_box(datagram), &mut engine, &stats);
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_datagram,
    bench_extract_dx_call,
    bench_full_pipeline
);
criterion_main!(benches);
