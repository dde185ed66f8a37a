//! Type-keyed fan-out of hub events.
//!
//! Handlers are kept per event type in registration order. Two kinds share
//! that list:
//!
//! - **Inline** handlers run on the receive loop itself, before the next frame
//!   is read. Only crate-internal state (the entity cache) uses these.
//! - **Task** handlers are consumer closures. Each invocation is spawned as its
//!   own tokio task, so a slow or failing handler never stalls the socket.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Semaphore;

/// Return type of consumer event handlers.
pub type HandlerResult = Result<(), Box<dyn StdError + Send + Sync>>;

/// A consumer event handler, invoked with the event's `data`.
pub type EventHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub(crate) type InlineHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wrap an async closure as an [`EventHandler`].
pub fn event_handler<F, Fut>(handler: F) -> EventHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |data: Value| -> BoxFuture<'static, HandlerResult> { Box::pin(handler(data)) })
}

#[derive(Clone)]
enum Subscriber {
    Inline(InlineHandler),
    Task(EventHandler),
}

pub(crate) struct EventRouter {
    handlers: DashMap<String, Vec<Subscriber>>,
    limiter: Option<Arc<Semaphore>>,
}

impl EventRouter {
    /// `max_concurrent` bounds how many task handlers execute at once.
    pub(crate) fn new(max_concurrent: Option<usize>) -> Self {
        Self {
            handlers: DashMap::new(),
            limiter: max_concurrent.map(|limit| Arc::new(Semaphore::new(limit))),
        }
    }

    pub(crate) fn add_handler(&self, event_type: &str, handler: EventHandler) {
        self.push(event_type, Subscriber::Task(handler));
    }

    pub(crate) fn add_inline_handler(&self, event_type: &str, handler: InlineHandler) {
        self.push(event_type, Subscriber::Inline(handler));
    }

    fn push(&self, event_type: &str, subscriber: Subscriber) {
        self.handlers
            .entry(event_type.to_string())
            .or_default()
            .push(subscriber);
    }

    /// Invokes every handler for `event_type`, in registration order.
    ///
    /// Returns the number of handlers started. Must be called from within a
    /// tokio runtime.
    pub(crate) fn dispatch(&self, event_type: &str, data: &Value) -> usize {
        // Clone the list out so no map shard stays locked while handlers run.
        let subscribers = match self.handlers.get(event_type) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!("No handlers for event '{event_type}'");
                return 0;
            }
        };

        for subscriber in &subscribers {
            match subscriber {
                Subscriber::Inline(handler) => handler(data),
                Subscriber::Task(handler) => self.spawn_handler(event_type, handler, data.clone()),
            }
        }

        subscribers.len()
    }

    fn spawn_handler(&self, event_type: &str, handler: &EventHandler, data: Value) {
        let handler = Arc::clone(handler);
        let limiter = self.limiter.clone();
        let event_type = event_type.to_string();

        tokio::spawn(async move {
            // Held until the handler finishes.
            let _permit = match limiter {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            if let Err(e) = handler(data).await {
                warn!("Handler for event '{event_type}' failed: {e}");
            }
        });
    }

    pub(crate) fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .get(event_type)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Number of handlers per event type.
    pub(crate) fn registered(&self) -> HashMap<String, usize> {
        self.handlers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }
}
