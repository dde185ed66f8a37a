//! Authentication handshake, run before the receive loop starts.

use crate::config::HubCredential;
use crate::error::HassError;
use crate::hub::{WsSink, WsSource};
use crate::protocol::{AuthFrame, ServerFrame};

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio_tungstenite::tungstenite::Message;

/// Sends the `auth` frame and waits for the hub's verdict.
///
/// # Errors
///
/// - [`HassError::Authentication`] - the hub answered `auth_invalid`
/// - [`HassError::Connection`] - the socket failed or closed, or no verdict
///   arrived within `bound`
pub(crate) async fn authenticate(
    write: &mut WsSink,
    read: &mut WsSource,
    credential: &HubCredential,
    bound: Duration,
) -> Result<(), HassError> {
    let payload = serde_json::to_string(&AuthFrame::new(credential))?;
    debug!("Sending auth frame");
    write.send(Message::Text(payload.into())).await?;

    match tokio::time::timeout(bound, await_verdict(read)).await {
        Ok(verdict) => verdict,
        Err(_) => Err(HassError::connection(format!(
            "no auth reply from hub within {}s",
            bound.as_secs()
        ))),
    }
}

async fn await_verdict(read: &mut WsSource) -> Result<(), HassError> {
    while let Some(msg) = read.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(frame) => {
                return Err(HassError::connection(format!(
                    "hub closed the socket during auth: {frame:?}"
                )));
            }
            _ => continue,
        };

        match ServerFrame::parse(&text) {
            Ok(ServerFrame::AuthOk { ha_version }) => {
                info!(
                    "Authenticated with hub (version {})",
                    ha_version.as_deref().unwrap_or("unknown")
                );
                return Ok(());
            }
            Ok(ServerFrame::AuthInvalid { message }) => {
                return Err(HassError::authentication(
                    message.unwrap_or_else(|| "credential rejected".to_string()),
                ));
            }
            Ok(ServerFrame::AuthRequired { .. }) => debug!("Hub requested auth"),
            Ok(other) => debug!("Ignoring frame before auth verdict: {other:?}"),
            Err(e) => warn!("Ignoring malformed frame during auth: {e}"),
        }
    }

    Err(HassError::connection("socket ended during auth"))
}
