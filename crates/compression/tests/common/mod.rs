//! Deterministic fixtures and a reference encoder for the integration tests.

#![allow(dead_code)]

use brotli::enc::BrotliEncoderParams;
use brotli_buffer::{Bytes, Result};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::mpsc;
use std::time::Duration;

/// Matches the per-test timeout of the large-buffer scenarios.
pub const TIMEOUT: Duration = Duration::from_secs(30);

const WORDS: [&str; 24] = [
    "brotli", "window", "quality", "buffer", "stream", "context", "literal", "distance",
    "huffman", "block", "the", "of", "and", "a", "compress", "decode", "entropy", "static",
    "dictionary", "meta", "insert", "copy", "length", "prefix",
];

/// Raw / compressed pairs, keyed the way the fixture files are named.
pub struct Fixtures {
    pub data10k_bin: Vec<u8>,
    pub data_txt: Vec<u8>,
    pub empty: Vec<u8>,
    pub rand: Vec<u8>,
    pub large: Vec<u8>,
    pub large_txt: Vec<u8>,
}

pub static FIXTURES: Lazy<Fixtures> = Lazy::new(|| Fixtures {
    data10k_bin: binary(10 * 1024, 0x0010_0000),
    data_txt: text(24 * 1024, 0x7e57),
    empty: Vec::new(),
    rand: random(64 * 1024, 0x5eed),
    large: binary(3 * 1024 * 1024, 0x1a29e),
    large_txt: text(2 * 1024 * 1024, 0x1a29e7),
});

/// Structured binary: short runs and repeated records with noise.
pub fn binary(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len);
    let record: Vec<u8> = (0..64).map(|_| rng.r#gen()).collect();

    while out.len() < len {
        match rng.gen_range(0..3) {
            0 => out.extend(std::iter::repeat(rng.r#gen::<u8>()).take(rng.gen_range(4..32))),
            1 => out.extend_from_slice(&record[..rng.gen_range(8..64)]),
            _ => out.extend((0..rng.gen_range(1..16)).map(|_| rng.r#gen::<u8>())),
        }
    }

    out.truncate(len);
    out
}

/// Word salad with line breaks.
pub fn text(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::with_capacity(len + 16);

    while out.len() < len {
        out.push_str(WORDS[rng.gen_range(0..WORDS.len())]);
        out.push(if rng.gen_range(0..12) == 0 { '\n' } else { ' ' });
    }

    out.truncate(len);
    out.into_bytes()
}

/// High-entropy bytes.
pub fn random(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill(&mut out[..]);
    out
}

/// Encode straight through the `brotli` crate, with its own defaults for
/// anything not given.
pub fn reference_compress(data: &[u8], quality: Option<i32>) -> Vec<u8> {
    let mut params = BrotliEncoderParams::default();
    if let Some(q) = quality {
        params.quality = q;
    }
    let mut reader = data;
    let mut out = Vec::new();
    brotli::BrotliCompress(&mut reader, &mut out, &params).unwrap();
    out
}

/// Decode straight through the `brotli` crate.
pub fn reference_decompress(data: &[u8]) -> Vec<u8> {
    let mut reader = data;
    let mut out = Vec::new();
    brotli::BrotliDecompress(&mut reader, &mut out).unwrap();
    out
}

/// `SKIP_LARGE_BUFFER_TEST` set to anything but empty, `0` or `false`.
pub fn skip_large() -> bool {
    std::env::var("SKIP_LARGE_BUFFER_TEST")
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "0" | "false"))
        .unwrap_or(false)
}

/// A callback plus the receiving end that observes it.
pub fn callback() -> (impl FnOnce(Result<Bytes>) + Send + 'static, mpsc::Receiver<Result<Bytes>>) {
    let (tx, rx) = mpsc::channel();
    (move |outcome: Result<Bytes>| tx.send(outcome).unwrap(), rx)
}

/// Wait for the only outcome a callback produces.
pub fn wait(rx: &mpsc::Receiver<Result<Bytes>>) -> Result<Bytes> {
    let outcome = rx.recv_timeout(TIMEOUT).expect("callback did not fire");
    assert!(
        rx.recv_timeout(Duration::from_millis(20)).is_err(),
        "callback fired more than once"
    );
    outcome
}
