//! Hub connection: socket, correlation, event fan-out and entity cache.
//!
//! # Architecture
//!
//! - [`HassClient`] - the handle consumers hold; owns everything below
//! - `correlator` - request ids and their pending waiters
//! - `event_router` - event-type to handler fan-out
//! - `state_cache` - last-known entity states
//! - `receiver` - the receive loop, the only writer of the three tables
//! - `handshake` - optional `auth` exchange before the loop starts
//!
//! # Concurrency
//!
//! Consumer tasks only ever *insert* (a pending request, a handler). Removing
//! pending requests, dispatching events and updating the cache all happen on
//! the receive loop. The tables are `DashMap`s, so those inserts and the
//! loop's removals interleave without a lock held across an await point.

mod client;
mod correlator;
mod event_router;
mod handshake;
mod receiver;
mod state_cache;

pub use client::HassClient;
pub use correlator::{PendingReply, ReplyOutcome};
pub use event_router::{EventHandler, HandlerResult, event_handler};
pub use state_cache::EntityState;

#[cfg(test)]
pub(crate) use correlator::{RequestCorrelator, ResultHook};
#[cfg(test)]
pub(crate) use event_router::EventRouter;
#[cfg(test)]
pub(crate) use receiver::{LoopExit, handle_frame};
#[cfg(test)]
pub(crate) use state_cache::StateCache;

use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;
