//! Request/reply correlation.
//!
//! Every request frame gets the next id from [`RequestCorrelator::next_id`]
//! and a single-shot waiter stored under that id. The receive loop completes
//! the waiter when the `result` with the same id arrives, in whatever order
//! the hub answers.
//!
//! # Concurrency
//!
//! Callers insert entries (at send time); only the receive loop removes them.
//! The table is a `DashMap` so the two never need a shared lock. Teardown marks
//! the correlator closed before draining it, and registration checks the flag
//! after inserting, so an entry racing teardown is failed by one side or the
//! other and never left hanging.

use crate::error::HassError;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use log::debug;
use serde_json::Value;
use tokio::sync::oneshot;

/// What a waiter is completed with.
pub type ReplyOutcome = Result<Value, HassError>;

/// Runs on the receive loop with a successful result, before the waiter sees it.
pub type ResultHook = Box<dyn FnOnce(&Value) + Send + Sync>;

struct PendingRequest {
    reply: oneshot::Sender<ReplyOutcome>,
    on_success: Option<ResultHook>,
}

/// Awaitable reply to one request.
///
/// Resolves exactly once: with the hub's `result` payload, with
/// [`HassError::RequestFailure`], or with [`HassError::ConnectionClosed`]
/// if the connection goes away first.
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    rx: oneshot::Receiver<ReplyOutcome>,
}

impl PendingReply {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingReply {
    type Output = ReplyOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(HassError::connection_closed(format!(
                "connection dropped before request {id} was answered"
            ))),
        })
    }
}

#[derive(Default)]
pub(crate) struct RequestCorrelator {
    last_id: AtomicU64,
    pending: DashMap<u64, PendingRequest>,
    closed: AtomicBool,
}

impl RequestCorrelator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Strictly increasing, starting at 1. Never reused.
    pub(crate) fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn register(&self, id: u64) -> PendingReply {
        self.register_entry(id, None)
    }

    /// Like [`register`](Self::register), with `hook` run on the receive loop
    /// if the request succeeds.
    pub(crate) fn register_with_hook(&self, id: u64, hook: ResultHook) -> PendingReply {
        self.register_entry(id, Some(hook))
    }

    fn register_entry(&self, id: u64, on_success: Option<ResultHook>) -> PendingReply {
        let (reply, rx) = oneshot::channel();
        self.pending.insert(id, PendingRequest { reply, on_success });

        if self.closed.load(Ordering::SeqCst) {
            self.fail(id, HassError::connection_closed("connection already closed"));
        }

        PendingReply { id, rx }
    }

    /// Completes the waiter for `id`. Returns `false` if nothing was waiting
    /// (already resolved, or never tracked).
    pub(crate) fn resolve(&self, id: u64, outcome: ReplyOutcome) -> bool {
        let Some((_, pending)) = self.pending.remove(&id) else {
            debug!("Dropping result for untracked request {id}");
            return false;
        };

        if let (Ok(value), Some(hook)) = (&outcome, pending.on_success) {
            hook(value);
        }

        // Caller may have stopped waiting.
        let _ = pending.reply.send(outcome);
        true
    }

    /// Removes `id` without completing it, e.g. when its frame never made it
    /// onto the socket.
    pub(crate) fn forget(&self, id: u64) {
        self.pending.remove(&id);
    }

    fn fail(&self, id: u64, error: HassError) {
        if let Some((_, pending)) = self.pending.remove(&id) {
            let _ = pending.reply.send(Err(error));
        }
    }

    /// Marks the correlator closed and fails every outstanding waiter.
    /// Returns how many were failed.
    pub(crate) fn close_all(&self, reason: &str) -> usize {
        self.closed.store(true, Ordering::SeqCst);

        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                let _ = pending
                    .reply
                    .send(Err(HassError::connection_closed(reason.to_string())));
                failed += 1;
            }
        }
        failed
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
