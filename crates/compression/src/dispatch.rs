//! Worker dispatch and completion delivery.
//!
//! Each call validates its input on the caller's thread, then hands either
//! the codec job or the validation failure to a worker. The outcome always
//! reaches the callback from the worker, exactly once.

use crate::{Codec, CodecError, CompressionOptions, Error, ErrorKind, Input, Result};
use bytes::Bytes;
use rayon::ThreadPool;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Completion callback: receives the outcome of one operation.
pub type Callback = Box<dyn FnOnce(Result<Bytes>) + Send + 'static>;

/// What a call asks the codec to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Compress with the resolved options
    Compress(CompressionOptions),
    /// Decompress
    Decompress,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Self::Compress(_) => "compress",
            Self::Decompress => "decompress",
        }
    }
}

/// Per-call lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Call accepted
    Pending,
    /// Checking the input argument
    Validating,
    /// Input handed to the codec
    Dispatching,
    /// Terminal: failed with the given kind
    Failed(ErrorKind),
    /// Terminal: produced a buffer
    Succeeded,
}

/// Owns the callback of one call until its terminal transition.
struct Completion {
    operation: &'static str,
    state: State,
    callback: Option<Callback>,
}

impl Completion {
    fn new(operation: &'static str, callback: Callback) -> Self {
        Self {
            operation,
            state: State::Pending,
            callback: Some(callback),
        }
    }

    fn transition(&mut self, next: State) {
        trace!(operation = self.operation, from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    fn finish(mut self, outcome: Result<Bytes>) {
        let next = match &outcome {
            Ok(_) => State::Succeeded,
            Err(e) => State::Failed(e.kind()),
        };
        self.transition(next);
        if let Some(callback) = self.callback.take() {
            deliver(self.operation, callback, outcome);
        }
    }
}

/// Invoke a callback, keeping a panicking callback from taking down the worker.
fn deliver(operation: &'static str, callback: Callback, outcome: Result<Bytes>) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(outcome))).is_err() {
        warn!(operation, "completion callback panicked");
    }
}

impl Drop for Completion {
    // A job dropped by its pool still owes the caller an outcome.
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!(operation = self.operation, state = ?self.state, "operation abandoned before completion");
            deliver(self.operation, callback, Err(abandoned()));
        }
    }
}

fn abandoned() -> Error {
    CodecError::Panicked("operation abandoned before completion".to_string()).into()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run the codec for one validated input, turning panics into errors.
fn run(codec: &dyn Codec, operation: &Operation, input: &[u8]) -> Result<Bytes> {
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| match operation {
        Operation::Compress(options) => codec.encode(input, options),
        Operation::Decompress => codec.decode(input),
    }));

    let outcome = match result {
        Ok(Ok(output)) => Ok(Bytes::from(output)),
        Ok(Err(e)) => Err(Error::Codec(e)),
        Err(payload) => Err(Error::Codec(CodecError::Panicked(panic_message(&*payload)))),
    };

    match &outcome {
        Ok(output) => debug!(
            operation = operation.name(),
            codec = codec.name(),
            input_len = input.len(),
            output_len = output.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "codec finished"
        ),
        Err(e) => warn!(
            operation = operation.name(),
            codec = codec.name(),
            input_len = input.len(),
            error = %e,
            "codec failed"
        ),
    }

    outcome
}

/// Couples a codec with the workers that run it.
///
/// Cloning is cheap; clones share the codec and the pool.
#[derive(Clone)]
pub struct Engine {
    codec: Arc<dyn Codec>,
    pool: Option<Arc<ThreadPool>>,
    defaults: CompressionOptions,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("codec", &self.codec.name())
            .field("dedicated_pool", &self.pool.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Brotli on the process-wide worker pool.
    pub fn new() -> Self {
        Self::with_codec(crate::BrotliCodec)
    }

    /// A custom codec on the process-wide worker pool.
    pub fn with_codec(codec: impl Codec) -> Self {
        Self {
            codec: Arc::new(codec),
            pool: None,
            defaults: CompressionOptions::default(),
        }
    }

    /// Start building an engine with a dedicated pool or defaults.
    pub fn builder() -> crate::EngineBuilder {
        crate::EngineBuilder::new()
    }

    pub(crate) fn from_parts(
        codec: Arc<dyn Codec>,
        pool: Option<Arc<ThreadPool>>,
        defaults: CompressionOptions,
    ) -> Self {
        Self { codec, pool, defaults }
    }

    /// Options applied under every compress call.
    pub fn defaults(&self) -> &CompressionOptions {
        &self.defaults
    }

    /// Compress `input` off the calling thread and report through `callback`.
    ///
    /// The callback never runs on the calling stack, but it runs on a worker
    /// concurrently with the caller: a fast job can deliver before this
    /// method returns. Anything the callback reads must be set up before the
    /// call.
    pub fn compress<F>(&self, input: impl Into<Input>, options: impl Into<CompressionOptions>, callback: F)
    where
        F: FnOnce(Result<Bytes>) + Send + 'static,
    {
        let options: CompressionOptions = options.into();
        self.dispatch(Operation::Compress(options.or(&self.defaults)), input.into(), Box::new(callback));
    }

    /// Decompress `input` off the calling thread and report through `callback`.
    ///
    /// Delivery follows the same rules as [`Engine::compress`].
    pub fn decompress<F>(&self, input: impl Into<Input>, callback: F)
    where
        F: FnOnce(Result<Bytes>) + Send + 'static,
    {
        self.dispatch(Operation::Decompress, input.into(), Box::new(callback));
    }

    /// [`Engine::compress`] with the outcome delivered through a future.
    ///
    /// Work starts immediately; dropping the future does not cancel it.
    pub fn compress_async(
        &self,
        input: impl Into<Input>,
        options: impl Into<CompressionOptions>,
    ) -> OperationFuture {
        let (tx, rx) = oneshot::channel();
        self.compress(input, options, move |outcome| {
            let _ = tx.send(outcome);
        });
        OperationFuture { rx }
    }

    /// [`Engine::decompress`] with the outcome delivered through a future.
    pub fn decompress_async(&self, input: impl Into<Input>) -> OperationFuture {
        let (tx, rx) = oneshot::channel();
        self.decompress(input, move |outcome| {
            let _ = tx.send(outcome);
        });
        OperationFuture { rx }
    }

    /// Compress on the calling thread.
    pub fn compress_sync(&self, input: impl Into<Input>, options: impl Into<CompressionOptions>) -> Result<Bytes> {
        let input: Input = input.into();
        let options: CompressionOptions = options.into();
        let bytes = input.validate()?;
        run(&*self.codec, &Operation::Compress(options.or(&self.defaults)), &bytes)
    }

    /// Decompress on the calling thread.
    pub fn decompress_sync(&self, input: impl Into<Input>) -> Result<Bytes> {
        let input: Input = input.into();
        let bytes = input.validate()?;
        run(&*self.codec, &Operation::Decompress, &bytes)
    }

    fn dispatch(&self, operation: Operation, input: Input, callback: Callback) {
        let mut completion = Completion::new(operation.name(), callback);
        completion.transition(State::Validating);
        trace!(operation = operation.name(), input = input.type_name(), "validating");

        let bytes = match input.validate() {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(operation = operation.name(), error = %e, "rejected input");
                self.spawn(move || completion.finish(Err(e)));
                return;
            }
        };

        let quality = match &operation {
            Operation::Compress(options) => options.quality,
            Operation::Decompress => None,
        };
        debug!(operation = operation.name(), input_len = bytes.len(), ?quality, "dispatching");

        let codec = Arc::clone(&self.codec);
        self.spawn(move || {
            completion.transition(State::Dispatching);
            let outcome = run(&*codec, &operation, &bytes);
            completion.finish(outcome);
        });
    }

    fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }
}

/// Resolves to the outcome of an operation started by
/// [`Engine::compress_async`] or [`Engine::decompress_async`].
#[derive(Debug)]
#[must_use = "the outcome is only observable by awaiting the future"]
pub struct OperationFuture {
    rx: oneshot::Receiver<Result<Bytes>>,
}

impl Future for OperationFuture {
    type Output = Result<Bytes>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(abandoned())))
    }
}
