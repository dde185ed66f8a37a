//! JSON frames exchanged with the hub over the websocket.
//!
//! - [`outbound`] - frames the client writes (`auth`, and id-carrying requests)
//! - [`inbound`] - frames the hub pushes (`result`, `event`, auth outcomes)
//!
//! Every request frame carries an `id` that the matching `result` echoes back.
//! The `auth` frame is the exception: the hub answers it with `auth_ok` or
//! `auth_invalid`, so it is never correlated.

pub mod inbound;
pub mod outbound;

pub use inbound::{EventBody, ResultError, ServerFrame};
pub use outbound::{AuthFrame, RequestBody, RequestFrame, ServiceData};

/// Event type the hub emits whenever an entity changes state.
pub const STATE_CHANGED_EVENT: &str = "state_changed";
