//! Codec seam and the Brotli implementation behind it.

use crate::{CodecError, CompressionOptions};
use brotli::enc::backward_references::BrotliEncoderMode;
use brotli::enc::BrotliEncoderParams;
use brotli::{BrotliDecompressStream, BrotliResult, BrotliState, HeapAlloc, HuffmanCode};

/// Quality used when the options leave it unset.
pub const DEFAULT_QUALITY: i64 = 11;
/// Window size used when the options leave it unset.
pub const DEFAULT_LGWIN: i64 = 22;

const QUALITY_RANGE: std::ops::RangeInclusive<i64> = 0..=11;
const LGWIN_RANGE: std::ops::RangeInclusive<i64> = 10..=24;
const LGBLOCK_RANGE: std::ops::RangeInclusive<i64> = 16..=24;

const DECODE_CHUNK: usize = 64 * 1024;

/// A whole-buffer compression engine.
///
/// Implementations must not share mutable state between calls: the
/// dispatcher runs them concurrently from several worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Compress `input` with the given options.
    fn encode(&self, input: &[u8], options: &CompressionOptions) -> Result<Vec<u8>, CodecError>;

    /// Reverse [`Codec::encode`].
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "codec"
    }
}

/// Brotli via the `brotli` crate.
///
/// Stateless: every call builds its own encoder or decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrotliCodec;

impl BrotliCodec {
    /// Translate options into encoder parameters, rejecting anything the
    /// encoder does not accept.
    pub fn params(options: &CompressionOptions) -> Result<BrotliEncoderParams, CodecError> {
        let mut params = BrotliEncoderParams::default();

        let quality = options.quality.unwrap_or(DEFAULT_QUALITY);
        check("quality", quality, &QUALITY_RANGE, "0..=11")?;
        params.quality = quality as i32;

        let lgwin = options.lgwin.unwrap_or(DEFAULT_LGWIN);
        check("lgwin", lgwin, &LGWIN_RANGE, "10..=24")?;
        params.lgwin = lgwin as i32;

        if let Some(lgblock) = options.lgblock {
            if lgblock != 0 {
                check("lgblock", lgblock, &LGBLOCK_RANGE, "0 or 16..=24")?;
            }
            params.lgblock = lgblock as i32;
        }

        params.mode = match options.mode.unwrap_or(0) {
            0 => BrotliEncoderMode::BROTLI_MODE_GENERIC,
            1 => BrotliEncoderMode::BROTLI_MODE_TEXT,
            2 => BrotliEncoderMode::BROTLI_MODE_FONT,
            other => {
                return Err(CodecError::InvalidParameter {
                    name: "mode",
                    value: other,
                    expected: "0..=2",
                });
            }
        };

        Ok(params)
    }
}

fn check(
    name: &'static str,
    value: i64,
    range: &std::ops::RangeInclusive<i64>,
    expected: &'static str,
) -> Result<(), CodecError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(CodecError::InvalidParameter { name, value, expected })
    }
}

impl Codec for BrotliCodec {
    fn encode(&self, input: &[u8], options: &CompressionOptions) -> Result<Vec<u8>, CodecError> {
        let params = Self::params(options)?;
        let mut reader = input;
        let mut output = Vec::with_capacity(input.len() / 2 + 64);
        brotli::BrotliCompress(&mut reader, &mut output, &params)?;
        Ok(output)
    }

    /// Decode one complete stream. The whole input must be consumed: bytes
    /// left over after the final meta-block make the stream corrupt.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut state = BrotliState::new_strict(
            HeapAlloc::<u8>::new(0),
            HeapAlloc::<u32>::new(0),
            HeapAlloc::<HuffmanCode>::new(HuffmanCode::default()),
        );
        let mut available_in = input.len();
        let mut input_offset = 0;
        let mut total_out = 0;
        let mut chunk = vec![0u8; DECODE_CHUNK];
        let mut output = Vec::with_capacity(input.len().saturating_mul(4));

        loop {
            let mut available_out = chunk.len();
            let mut output_offset = 0;
            let result = BrotliDecompressStream(
                &mut available_in,
                &mut input_offset,
                input,
                &mut available_out,
                &mut output_offset,
                &mut chunk[..],
                &mut total_out,
                &mut state,
            );
            output.extend_from_slice(&chunk[..output_offset]);

            match result {
                BrotliResult::ResultSuccess => break,
                BrotliResult::NeedsMoreOutput => continue,
                BrotliResult::NeedsMoreInput => {
                    return Err(CodecError::Corrupt("unexpected end of stream".to_string()));
                }
                BrotliResult::ResultFailure => {
                    return Err(CodecError::Corrupt(format!(
                        "invalid brotli data at byte {input_offset}"
                    )));
                }
            }
        }

        if available_in != 0 {
            return Err(CodecError::Corrupt(format!(
                "trailing data after end of stream ({available_in} bytes)"
            )));
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "brotli"
    }
}
