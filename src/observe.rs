//! Call instrumentation and the debug sink.
//!
//! Every public operation on a resource object funnels through
//! [`CallLog::call`], a single dispatch function that times the operation
//! and emits exactly one [`CallEvent`] per invocation, whether the
//! operation returns or fails. The wrapper is outcome-neutral: the original
//! return value or error passes through unmodified. Constructors and the
//! raw request primitive are not routed through it.
//!
//! # Buffering
//!
//! The sink holds a stack of event buffers. While any buffer is active,
//! events append to the top buffer instead of emitting. Every
//! [`push_buffer`](CallLog::push_buffer) must be matched by exactly one of
//! [`discard_buffer`](CallLog::discard_buffer) (drop the buffered events)
//! or [`flush_buffer`](CallLog::flush_buffer) (replay them through normal
//! emission in original order, which may land in a still-active outer
//! buffer). A buffered sequence is either entirely flushed or entirely
//! discarded, never partially emitted.
//!
//! The [`wait_for`](crate::wait_for) combinator uses this to suppress noise
//! from expected transient probe failures.
//!
//! # Sharing
//!
//! One `CallLog` (including its buffer stack) is shared by every resource
//! object under one Driver. Interleaving call chains against the same
//! Driver from concurrent tasks is not supported: the buffer stack assumes
//! one logical call chain in flight per Driver.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::options::{CallHook, Options, RequestHook, ResponseHook};
use crate::transport::{HttpRequest, HttpResponse};

// ============================================================================
// CallOutcome
// ============================================================================

/// Outcome of one instrumented call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The operation returned a value.
    Success,
    /// The operation failed with an error.
    Failure,
}

// ============================================================================
// CallEvent
// ============================================================================

/// A structured record of one public operation invocation.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Receiver the operation was invoked on, e.g. `"Driver"`.
    pub receiver: String,

    /// Operation name.
    pub operation: String,

    /// Arguments the operation was invoked with.
    pub args: Value,

    /// Elapsed time of the invocation.
    pub duration: Duration,

    /// Whether the operation returned or failed.
    pub outcome: CallOutcome,

    /// Rendered return value on success; error text on failure.
    pub detail: String,
}

// ============================================================================
// CallLog
// ============================================================================

/// Internal shared state for the debug sink.
struct CallLogInner {
    /// Emit CallEvents through `tracing`.
    debug: bool,

    /// Emit HTTP request/response reports through `tracing`.
    http_debug: bool,

    /// User hook for CallEvents.
    on_call: Option<CallHook>,

    /// User hook for outgoing requests.
    on_request: Option<RequestHook>,

    /// User hook for incoming responses.
    on_response: Option<ResponseHook>,

    /// Stack of active event buffers.
    buffers: Mutex<Vec<Vec<CallEvent>>>,
}

/// Debug sink shared by everything under one Driver.
///
/// Cheap to clone; clones share the same buffer stack.
#[derive(Clone)]
pub struct CallLog {
    inner: Arc<CallLogInner>,
}

impl fmt::Debug for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog")
            .field("debug", &self.inner.debug)
            .field("http_debug", &self.inner.http_debug)
            .field("buffer_depth", &self.buffer_depth())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CallLog - Constructors
// ============================================================================

impl CallLog {
    /// Creates a sink configured from the options bag.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            inner: Arc::new(CallLogInner {
                debug: options.debug,
                http_debug: options.http_debug,
                on_call: options.on_call.clone(),
                on_request: options.on_request.clone(),
                on_response: options.on_response.clone(),
                buffers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a sink with no hooks and no tracing emission.
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(&Options::default())
    }
}

// ============================================================================
// CallLog - Dispatch
// ============================================================================

impl CallLog {
    /// Runs one instrumented operation.
    ///
    /// Records a start time, awaits the operation, and emits exactly one
    /// [`CallEvent`] whether it returns or fails. The original outcome
    /// passes through unmodified.
    pub async fn call<T, Fut>(
        &self,
        receiver: &str,
        operation: &str,
        args: Value,
        operation_future: Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
        T: Serialize,
    {
        let start = Instant::now();
        let result = operation_future.await;
        let duration = start.elapsed();

        let (outcome, detail) = match &result {
            Ok(value) => (
                CallOutcome::Success,
                serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string()),
            ),
            Err(error) => (CallOutcome::Failure, error.to_string()),
        };

        self.record(CallEvent {
            receiver: receiver.to_string(),
            operation: operation.to_string(),
            args,
            duration,
            outcome,
            detail,
        });

        result
    }

    /// Routes one event into the top buffer, or emits it when no buffer is
    /// active.
    fn record(&self, event: CallEvent) {
        {
            let mut buffers = self.inner.buffers.lock();
            if let Some(top) = buffers.last_mut() {
                top.push(event);
                return;
            }
        }
        self.emit(&event);
    }

    /// Emits one event to `tracing` and the user hook.
    fn emit(&self, event: &CallEvent) {
        if self.inner.debug {
            debug!(
                target: "jsonwire::call",
                receiver = %event.receiver,
                operation = %event.operation,
                duration_ms = event.duration.as_millis() as u64,
                outcome = ?event.outcome,
                "call completed"
            );
        }
        if let Some(hook) = &self.inner.on_call {
            hook(event);
        }
    }
}

// ============================================================================
// CallLog - Buffering
// ============================================================================

impl CallLog {
    /// Pushes a fresh event buffer onto the stack.
    pub fn push_buffer(&self) {
        self.inner.buffers.lock().push(Vec::new());
    }

    /// Drops the top buffer and everything it holds.
    pub fn discard_buffer(&self) {
        if self.inner.buffers.lock().pop().is_none() {
            warn!("discard_buffer called with no active buffer");
        }
    }

    /// Pops the top buffer and replays its events through normal emission
    /// in original order.
    ///
    /// Replayed events land in the next buffer down when one is active.
    pub fn flush_buffer(&self) {
        let events = self.inner.buffers.lock().pop();

        let Some(events) = events else {
            warn!("flush_buffer called with no active buffer");
            return;
        };

        for event in events {
            self.record(event);
        }
    }

    /// Returns the number of active buffers.
    #[inline]
    #[must_use]
    pub fn buffer_depth(&self) -> usize {
        self.inner.buffers.lock().len()
    }
}

// ============================================================================
// CallLog - HTTP Reporting
// ============================================================================

impl CallLog {
    /// Reports one outgoing request attempt.
    pub fn report_request(&self, request: &HttpRequest) {
        if self.inner.http_debug {
            debug!(
                target: "jsonwire::http",
                method = %request.method,
                url = %request.url,
                body = request.body.as_deref().unwrap_or(""),
                "request"
            );
        }
        if let Some(hook) = &self.inner.on_request {
            hook(request);
        }
    }

    /// Reports one incoming response, or its absence when the attempt
    /// produced no response at all.
    pub fn report_response(&self, response: Option<&HttpResponse>) {
        if self.inner.http_debug {
            match response {
                Some(response) => debug!(
                    target: "jsonwire::http",
                    status = response.status,
                    body = %response.body,
                    "response"
                ),
                None => debug!(target: "jsonwire::http", "no response"),
            }
        }
        if let Some(hook) = &self.inner.on_response {
            hook(response);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
