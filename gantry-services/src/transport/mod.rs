//! Transport abstraction and dispatch
//!
//! HTTP requests and socket events are both reduced to a [`CallEnvelope`]
//! plus a one-shot [`Responder`] before they reach the [`Dispatcher`].

pub mod call;
pub mod dispatcher;
pub mod socket;

use serde::{Deserialize, Serialize};

pub use call::{
    BufferedCall, CallEnvelope, ChannelResponder, DispatchOutcome, InboundCall, IssuedCookie,
    Reply, ReplyStatus, Responder,
};
pub use dispatcher::{CallState, Dispatcher, ACCESS_DENIED, WRONG_URL};
pub use socket::{SocketChannel, SocketFrame, SocketReply, PING_EVENT, PONG_EVENT};

/// Transport a call arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Http,
    Socket,
}
