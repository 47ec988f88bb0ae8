//! Whole-buffer Brotli compression with completion callbacks.
//!
//! This crate provides:
//! - Callback-based `compress` / `decompress` that never block the caller
//! - Future-returning and synchronous variants of both
//! - A [`Codec`] seam so the dispatch contract can run against any codec
//!
//! Every call reports exactly one outcome. A non-buffer input fails with
//! [`ErrorKind::InvalidInputType`] and never reaches the codec; codec
//! failures arrive as [`ErrorKind::Codec`]. Both are delivered the same way
//! a result is: from a worker thread, through the callback.
//!
//! # Example
//!
//! ```rust,no_run
//! use brotli_buffer::{compress, decompress, CompressionOptions};
//!
//! compress(b"hello hello hello".to_vec(), CompressionOptions::new().quality(9), |outcome| {
//!     let compressed = outcome.expect("compression failed");
//!     decompress(compressed, |outcome| {
//!         assert_eq!(&outcome.unwrap()[..], b"hello hello hello");
//!     });
//! });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod codec;
mod config;
mod dispatch;
mod error;
mod input;
mod options;

pub use bytes::Bytes;
pub use codec::{BrotliCodec, Codec, DEFAULT_LGWIN, DEFAULT_QUALITY};
pub use config::{ConfigError, EngineBuilder, EngineConfig, ENV_QUALITY, ENV_WORKERS};
pub use dispatch::{Callback, Engine, Operation, OperationFuture, State};
pub use error::{CodecError, Error, ErrorKind, Result};
pub use input::Input;
pub use options::{CompressionOptions, Mode};

use once_cell::sync::Lazy;

/// Brotli on the process-wide worker pool, built on first use.
static DEFAULT_ENGINE: Lazy<Engine> = Lazy::new(Engine::new);

/// The engine behind the free functions.
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

/// Compress `input` on a worker thread and report through `callback`.
pub fn compress<F>(input: impl Into<Input>, options: impl Into<CompressionOptions>, callback: F)
where
    F: FnOnce(Result<Bytes>) + Send + 'static,
{
    DEFAULT_ENGINE.compress(input, options, callback);
}

/// Decompress `input` on a worker thread and report through `callback`.
pub fn decompress<F>(input: impl Into<Input>, callback: F)
where
    F: FnOnce(Result<Bytes>) + Send + 'static,
{
    DEFAULT_ENGINE.decompress(input, callback);
}

/// Compress `input` on a worker thread; await the returned future.
pub fn compress_async(input: impl Into<Input>, options: impl Into<CompressionOptions>) -> OperationFuture {
    DEFAULT_ENGINE.compress_async(input, options)
}

/// Decompress `input` on a worker thread; await the returned future.
pub fn decompress_async(input: impl Into<Input>) -> OperationFuture {
    DEFAULT_ENGINE.decompress_async(input)
}

/// Compress `input` on the calling thread.
pub fn compress_sync(input: impl Into<Input>, options: impl Into<CompressionOptions>) -> Result<Bytes> {
    DEFAULT_ENGINE.compress_sync(input, options)
}

/// Decompress `input` on the calling thread.
pub fn decompress_sync(input: impl Into<Input>) -> Result<Bytes> {
    DEFAULT_ENGINE.decompress_sync(input)
}
