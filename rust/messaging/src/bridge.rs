// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-slot request bridge
//!
//! Callers on any thread hand a request to the host thread and receive a
//! future for its response. The bridge holds at most one unconsumed request:
//! a newer submission replaces an older one that the host has not yet taken.
//! Completions are tracked by correlation id so each future resolves at most
//! once, even when the host answers out of order.

use crate::envelope::CorrelationId;
use crate::error::BridgeError;
use rustc_hash::FxHashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Requests that carry a correlation id
pub trait Correlated {
    fn correlation_id(&self) -> Option<CorrelationId>;
    fn set_correlation_id(&mut self, correlation_id: CorrelationId);
}

/// Responses that can be synthesised from a fault description
pub trait FaultResponse {
    fn from_fault(correlation_id: CorrelationId, fault: String) -> Self;
}

/// Host-provided mechanism that schedules the host thread to drain the bridge
pub trait WakeSignal: Send + Sync {
    fn raise(&self);
}

impl<F> WakeSignal for F
where
    F: Fn() + Send + Sync,
{
    fn raise(&self) {
        self()
    }
}

struct BridgeState<Req, Resp> {
    current: Option<Req>,
    pending: FxHashMap<CorrelationId, oneshot::Sender<Resp>>,
    wake: Option<Arc<dyn WakeSignal>>,
    closed: bool,
}

/// Thread-safe hand-off between callers and the host thread
pub struct Bridge<Req, Resp> {
    state: Mutex<BridgeState<Req, Resp>>,
}

impl<Req, Resp> Default for Bridge<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> Bridge<Req, Resp> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BridgeState {
                current: None,
                pending: FxHashMap::default(),
                wake: None,
                closed: false,
            }),
        }
    }

    pub fn with_wake_signal(signal: Arc<dyn WakeSignal>) -> Self {
        let bridge = Self::new();
        bridge.set_wake_signal(signal);
        bridge
    }

    // State is left consistent at every unlock, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, BridgeState<Req, Resp>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the host wake mechanism
    ///
    /// Requests submitted before a signal is installed stay in the slot and
    /// are picked up on the next activation.
    pub fn set_wake_signal(&self, signal: Arc<dyn WakeSignal>) {
        self.lock().wake = Some(signal);
    }

    /// Atomically take the unconsumed request, if any
    pub fn take_current(&self) -> Option<Req> {
        self.lock().current.take()
    }

    /// Resolve the pending completion for `correlation_id`
    ///
    /// Returns false when nothing was waiting: the id is unknown, already
    /// completed, or its caller dropped the future.
    pub fn complete(&self, correlation_id: CorrelationId, response: Resp) -> bool {
        let sender = self.lock().pending.remove(&correlation_id);
        match sender {
            Some(sender) => {
                let delivered = sender.send(response).is_ok();
                if !delivered {
                    tracing::debug!(%correlation_id, "Response dropped: caller no longer waiting");
                }
                delivered
            }
            None => {
                tracing::debug!(%correlation_id, "No pending completion for response");
                false
            }
        }
    }

    /// Drop the current request and cancel every pending completion
    pub fn shutdown(&self) {
        let (dropped_current, cancelled) = {
            let mut state = self.lock();
            state.closed = true;
            let dropped_current = state.current.take().is_some();
            let cancelled = state.pending.len();
            state.pending.clear();
            (dropped_current, cancelled)
        };
        tracing::info!(dropped_current, cancelled, "Bridge shut down");
    }

    /// Number of submitted requests still awaiting a response
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

impl<Req: Correlated, Resp> Bridge<Req, Resp> {
    /// Hand a request to the host thread
    ///
    /// Assigns a correlation id when the request has none, replaces any
    /// request the host has not taken yet and raises the wake signal. The
    /// returned future resolves once the host completes this id.
    pub fn submit(&self, mut request: Req) -> Result<PendingResponse<Resp>, BridgeError> {
        let correlation_id = match request.correlation_id() {
            Some(id) => id,
            None => {
                let id = CorrelationId::new();
                request.set_correlation_id(id);
                id
            }
        };

        let (sender, receiver) = oneshot::channel();
        let (wake, replaced) = {
            let mut state = self.lock();
            if state.closed {
                return Err(BridgeError::Cancelled);
            }
            if state.pending.contains_key(&correlation_id) {
                return Err(BridgeError::InvalidArgument(format!(
                    "correlation id {} already has a pending response",
                    correlation_id
                )));
            }
            state.pending.insert(correlation_id, sender);
            let replaced = state.current.replace(request).is_some();
            (state.wake.clone(), replaced)
        };

        if replaced {
            tracing::debug!(%correlation_id, "Replaced unconsumed request");
        }
        match wake {
            Some(wake) => wake.raise(),
            None => tracing::debug!(%correlation_id, "No wake signal installed"),
        }

        Ok(PendingResponse {
            correlation_id,
            receiver,
        })
    }
}

impl<Req, Resp: FaultResponse> Bridge<Req, Resp> {
    /// Complete with a failure response carrying `fault`
    pub fn fail(&self, correlation_id: CorrelationId, fault: impl ToString) -> bool {
        let response = Resp::from_fault(correlation_id, fault.to_string());
        self.complete(correlation_id, response)
    }
}

/// Future for the response to one submitted request
#[must_use = "a response is only observed by awaiting it"]
pub struct PendingResponse<Resp> {
    correlation_id: CorrelationId,
    receiver: oneshot::Receiver<Resp>,
}

impl<Resp> PendingResponse<Resp> {
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

impl<Resp> Future for PendingResponse<Resp> {
    type Output = Result<Resp, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| BridgeError::Cancelled))
    }
}
