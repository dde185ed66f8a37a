use crate::config::HubConfig;
use crate::error::HassError;
use crate::hub::correlator::{PendingReply, RequestCorrelator, ResultHook};
use crate::hub::event_router::{EventHandler, EventRouter, HandlerResult, event_handler};
use crate::hub::receiver::{self, LoopExit};
use crate::hub::state_cache::{EntityState, StateCache};
use crate::hub::{WsSink, handshake};
use crate::protocol::{RequestBody, RequestFrame, STATE_CHANGED_EVENT};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TOGGLE_DOMAIN: &str = "homeassistant";
const TOGGLE_SERVICE: &str = "toggle";

/// Connection to one hub.
///
/// Created by [`connect`](Self::connect), which leaves the receive loop
/// running, `state_changed` tracked and the entity cache seeded. Share it
/// between tasks behind an `Arc`.
///
/// Dropping the client stops the receive loop; outstanding
/// [`PendingReply`]s then resolve with [`HassError::ConnectionClosed`].
pub struct HassClient {
    /// Write half. Held across id assignment and the write so ids reach the
    /// hub in increasing order.
    writer: Mutex<WsSink>,
    correlator: Arc<RequestCorrelator>,
    router: Arc<EventRouter>,
    cache: Arc<StateCache>,
    closed: watch::Receiver<bool>,
    receiver: JoinHandle<LoopExit>,
}

impl HassClient {
    /// Opens the socket, authenticates if a credential is configured, starts
    /// the receive loop and runs the initial subscribe + bulk state sync.
    ///
    /// The initial exchanges are bounded by `init_timeout_secs`. Running out of
    /// time is logged, not returned: the cache fills in from later events.
    ///
    /// # Errors
    ///
    /// - [`HassError::Connection`] - invalid config, socket failure, or no
    ///   handshake verdict in time
    /// - [`HassError::Authentication`] - the hub rejected the credential
    /// - [`HassError::ConnectionClosed`] - the hub hung up during the initial sync
    pub async fn connect(config: &HubConfig) -> Result<Self, HassError> {
        let url = config
            .validate()
            .and_then(|_| config.websocket_url())
            .map_err(|e| HassError::connection(format!("invalid hub config: {e}")))?;

        if config.secure {
            // Errs only when a provider is already installed.
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        info!("Connecting to hub at {url}");
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| HassError::connection(format!("failed to connect to {url}: {e}")))?;

        let (mut write, mut read) = stream.split();

        if let Some(credential) = &config.credential {
            handshake::authenticate(&mut write, &mut read, credential, config.handshake_timeout())
                .await?;
        }

        let correlator = Arc::new(RequestCorrelator::new());
        let router = Arc::new(EventRouter::new(config.max_concurrent_handlers));
        let cache = Arc::new(StateCache::new());

        let (closed_tx, closed) = watch::channel(false);
        let receiver = tokio::spawn({
            let correlator = Arc::clone(&correlator);
            let router = Arc::clone(&router);
            async move {
                let exit = receiver::run(read, correlator, router).await;
                let _ = closed_tx.send(true);
                exit
            }
        });

        let client = Self {
            writer: Mutex::new(write),
            correlator,
            router,
            cache,
            closed,
            receiver,
        };

        client.initial_sync(config.init_timeout()).await?;
        info!("Connected to hub at {url}");

        Ok(client)
    }

    /// Tracks `state_changed` into the cache and seeds it with every entity.
    /// Both exchanges run concurrently under `bound`.
    async fn initial_sync(&self, bound: Duration) -> Result<(), HassError> {
        let cache = Arc::clone(&self.cache);
        self.router.add_inline_handler(
            STATE_CHANGED_EVENT,
            Arc::new(move |data: &Value| {
                if let Err(e) = cache.apply_state_changed(data) {
                    warn!("Dropping state_changed event: {e}");
                }
            }),
        );

        let cache = Arc::clone(&self.cache);
        let seed: ResultHook = Box::new(move |result: &Value| {
            let stored = cache.seed(result);
            info!("Cached {stored} entity states");
        });

        let exchanges = async {
            let subscribed = self
                .send_request(RequestBody::subscribe_events(STATE_CHANGED_EVENT), None)
                .await?;
            let synced = self.send_request(RequestBody::GetStates, Some(seed)).await?;
            Ok::<_, HassError>(tokio::join!(subscribed, synced))
        };

        match tokio::time::timeout(bound, exchanges).await {
            Ok(Ok((subscribed, synced))) => {
                for (what, outcome) in [("subscribe", subscribed), ("state sync", synced)] {
                    match outcome {
                        Ok(_) => debug!("Initial {what} complete"),
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => warn!("Initial {what} failed: {e}"),
                    }
                }
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                let e = HassError::timeout(
                    "initial subscribe/state sync incomplete, continuing with partial cache",
                    u64::try_from(bound.as_millis()).unwrap_or(u64::MAX),
                );
                warn!("{e}");
            }
        }

        Ok(())
    }

    /// Writes a request and returns its waiter without awaiting the reply.
    ///
    /// # Errors
    ///
    /// Returns [`HassError::ConnectionClosed`] if the receive loop has already
    /// stopped, or [`HassError::Connection`] if the write fails.
    pub async fn request(&self, body: RequestBody) -> Result<PendingReply, HassError> {
        self.send_request(body, None).await
    }

    async fn send_request(
        &self,
        body: RequestBody,
        on_success: Option<ResultHook>,
    ) -> Result<PendingReply, HassError> {
        let mut writer = self.writer.lock().await;

        if self.correlator.is_closed() {
            return Err(HassError::connection_closed(format!(
                "cannot send {}: connection closed",
                body.kind()
            )));
        }

        let id = self.correlator.next_id();
        let frame = RequestFrame::new(id, body);
        let payload = serde_json::to_string(&frame)?;

        let pending = match on_success {
            Some(hook) => self.correlator.register_with_hook(id, hook),
            None => self.correlator.register(id),
        };

        debug!("Sending: {payload}");
        if let Err(e) = writer.send(Message::Text(payload.into())).await {
            self.correlator.forget(id);
            return Err(HassError::connection(format!(
                "failed to send {} request {id}: {e}",
                frame.body.kind()
            )));
        }

        Ok(pending)
    }

    /// Registers `handler` for `event_type` and asks the hub to forward that
    /// type. Resolves with the hub's answer to the subscribe request itself.
    ///
    /// Every call sends its own `subscribe_events`, even for a type that is
    /// already subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`HassError::RequestFailure`] if the hub refuses the subscription,
    /// or a connection error. The handler stays registered either way.
    pub async fn subscribe<F, Fut>(&self, event_type: &str, handler: F) -> Result<Value, HassError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.subscribe_handler(event_type, event_handler(handler))
            .await
    }

    /// [`subscribe`](Self::subscribe) for an already-boxed handler.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub async fn subscribe_handler(
        &self,
        event_type: &str,
        handler: EventHandler,
    ) -> Result<Value, HassError> {
        self.router.add_handler(event_type, handler);
        info!("Subscribing to '{event_type}' events");
        self.request(RequestBody::subscribe_events(event_type))
            .await?
            .await
    }

    /// Registers `handler` for `event_type` without sending anything.
    ///
    /// For types the hub already forwards on this connection, such as
    /// `state_changed`, which `connect` subscribes to.
    pub fn on_event<F, Fut>(&self, event_type: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.router.add_handler(event_type, event_handler(handler));
    }

    /// Calls `domain.service`, targeting `entity_id` when given.
    ///
    /// # Errors
    ///
    /// Returns [`HassError::RequestFailure`] if the hub reports `success: false`,
    /// or a connection error.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: Option<&str>,
    ) -> Result<Value, HassError> {
        info!("Calling service {domain}.{service} for {entity_id:?}");
        self.request(RequestBody::call_service(domain, service, entity_id))
            .await?
            .await
    }

    /// Flips an entity on/off through the generic `homeassistant.toggle` service.
    ///
    /// # Errors
    ///
    /// See [`call_service`](Self::call_service).
    pub async fn toggle(&self, entity_id: &str) -> Result<Value, HassError> {
        self.call_service(TOGGLE_DOMAIN, TOGGLE_SERVICE, Some(entity_id))
            .await
    }

    /// Cached state of `entity_id`, or `None` if the hub never reported it.
    /// Never touches the socket.
    pub fn get_state(&self, entity_id: &str) -> Option<EntityState> {
        self.cache.get(entity_id)
    }

    /// Snapshot of every cached entity state.
    pub fn get_all_states(&self) -> HashMap<String, EntityState> {
        self.cache.get_all()
    }

    pub fn cached_entity_count(&self) -> usize {
        self.cache.len()
    }

    /// Requests still waiting for a `result`.
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.router.handler_count(event_type)
    }

    /// Handler counts keyed by event type.
    pub fn subscriptions(&self) -> HashMap<String, usize> {
        self.router.registered()
    }

    /// Whether the receive loop is still running.
    pub fn is_connected(&self) -> bool {
        !*self.closed.borrow()
    }

    /// Resolves once the receive loop has stopped.
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Sends a close frame. The receive loop stops once the hub acknowledges,
    /// failing anything still pending.
    ///
    /// # Errors
    ///
    /// Returns [`HassError::Connection`] if the close frame cannot be written.
    pub async fn close(&self) -> Result<(), HassError> {
        info!("Closing hub connection");
        let mut writer = self.writer.lock().await;
        writer.close().await?;
        Ok(())
    }
}

impl Drop for HassClient {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}
