//! The receive loop: sole reader of the socket, sole writer of the
//! correlation and cache tables.

use crate::error::HassError;
use crate::hub::WsSource;
use crate::hub::correlator::RequestCorrelator;
use crate::hub::event_router::EventRouter;
use crate::protocol::ServerFrame;

use std::sync::Arc;

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio_tungstenite::tungstenite::Message;

/// Why the loop stopped.
#[derive(Debug)]
pub(crate) enum LoopExit {
    /// Socket closed by either side.
    Closed,
    /// Hub sent `auth_invalid` mid-session.
    AuthRejected(String),
    /// Transport error while reading.
    Failed(HassError),
}

impl LoopExit {
    fn reason(&self) -> String {
        match self {
            LoopExit::Closed => "connection closed".to_string(),
            LoopExit::AuthRejected(message) => format!("hub rejected auth: {message}"),
            LoopExit::Failed(e) => format!("connection failed: {e}"),
        }
    }
}

/// Reads frames until the socket ends, then fails every outstanding waiter.
pub(crate) async fn run(
    mut read: WsSource,
    correlator: Arc<RequestCorrelator>,
    router: Arc<EventRouter>,
) -> LoopExit {
    info!("Hub receive loop started");

    let exit = read_frames(&mut read, &correlator, &router).await;
    let reason = exit.reason();

    match &exit {
        LoopExit::Closed => info!("Hub receive loop stopped: {reason}"),
        _ => error!("Hub receive loop stopped: {reason}"),
    }

    let failed = correlator.close_all(&reason);
    if failed > 0 {
        warn!("Failed {failed} outstanding request(s): {reason}");
    }

    exit
}

async fn read_frames(
    read: &mut WsSource,
    correlator: &RequestCorrelator,
    router: &EventRouter,
) -> LoopExit {
    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                debug!("Hub sent close: {frame:?}");
                return LoopExit::Closed;
            }
            // Pings are answered by tungstenite; binary frames carry nothing for us.
            Ok(_) => continue,
            Err(e) => return LoopExit::Failed(HassError::from(e)),
        };

        let frame = match ServerFrame::parse(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame: {e}");
                continue;
            }
        };

        if let Some(exit) = handle_frame(frame, correlator, router) {
            return exit;
        }
    }

    LoopExit::Closed
}

/// Applies one frame. Returns `Some` only when the frame ends the session.
pub(crate) fn handle_frame(
    frame: ServerFrame,
    correlator: &RequestCorrelator,
    router: &EventRouter,
) -> Option<LoopExit> {
    match frame {
        ServerFrame::Result {
            id,
            success,
            result,
            error,
        } => {
            debug!("Received result for request {id} (success={success})");
            let outcome = if success {
                Ok(result.unwrap_or_default())
            } else {
                let error = error.unwrap_or_default();
                let message = if error.message.is_empty() {
                    "hub gave no error details".to_string()
                } else {
                    error.message
                };
                Err(HassError::request_failure(id, error.code, message))
            };
            correlator.resolve(id, outcome);
        }
        ServerFrame::Event { event, .. } => {
            debug!("Received event '{}'", event.event_type);
            router.dispatch(&event.event_type, &event.data);
        }
        ServerFrame::AuthInvalid { message } => {
            return Some(LoopExit::AuthRejected(
                message.unwrap_or_else(|| "credential rejected".to_string()),
            ));
        }
        ServerFrame::AuthRequired { .. } | ServerFrame::AuthOk { .. } => {
            debug!("Ignoring auth frame outside handshake");
        }
        ServerFrame::Unknown => warn!("Ignoring frame of unrecognised type"),
    }

    None
}
