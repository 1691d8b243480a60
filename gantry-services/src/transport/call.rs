//! Transport-neutral call envelope and reply types

use super::TransportKind;
use crate::session::{Session, SessionManager};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio::sync::oneshot;

/// Outcome status of a dispatched call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyStatus {
    Ok,
    BadRequest,
    Forbidden,
}

impl ReplyStatus {
    /// Numeric code, shared by both transports
    pub fn code(self) -> u16 {
        match self {
            ReplyStatus::Ok => 200,
            ReplyStatus::BadRequest => 400,
            ReplyStatus::Forbidden => 403,
        }
    }
}

impl Serialize for ReplyStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// `(status, value)` result envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub status: ReplyStatus,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: ReplyStatus::Ok,
            body,
        }
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self {
            status: ReplyStatus::Forbidden,
            body: Value::String(message.into()),
        }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self {
            status: ReplyStatus::BadRequest,
            body: Value::String(message.into()),
        }
    }
}

/// Session cookie handed out during a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCookie {
    pub name: String,
    pub value: String,
}

impl IssuedCookie {
    pub fn for_session(sessions: &SessionManager, session: &Session) -> Self {
        Self {
            name: sessions.key().to_string(),
            value: sessions.signed_cookie(session),
        }
    }

    /// `name=value`, the form sent back in a `Cookie` header
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Value for a `Set-Cookie` header
    pub fn set_cookie_header(&self) -> String {
        format!("{}; Path=/; HttpOnly; SameSite=Lax", self.pair())
    }
}

/// What the dispatcher hands back to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub reply: Reply,
    /// Set when the call created or regenerated the caller's session
    pub session_cookie: Option<IssuedCookie>,
}

impl DispatchOutcome {
    pub fn new(reply: Reply, session_cookie: Option<IssuedCookie>) -> Self {
        Self {
            reply,
            session_cookie,
        }
    }
}

/// Normalized call, identical for every transport
#[derive(Debug, Clone)]
pub struct CallEnvelope {
    pub route: String,
    pub payload: Value,
    /// Raw `Cookie` header of the caller
    pub cookie: Option<String>,
    pub transport: TransportKind,
}

impl CallEnvelope {
    pub fn new<R: Into<String>>(route: R, payload: Value, transport: TransportKind) -> Self {
        Self {
            route: route.into(),
            payload,
            cookie: None,
            transport,
        }
    }

    pub fn with_cookie<C: Into<String>>(mut self, cookie: C) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

/// Transport-specific sink for exactly one outcome
pub trait Responder: Send {
    fn respond(self: Box<Self>, outcome: DispatchOutcome);
}

/// A call arriving from some transport
pub trait InboundCall: Send {
    fn into_parts(self) -> (CallEnvelope, Box<dyn Responder>);
}

/// Responder that forwards the outcome over a oneshot channel
pub struct ChannelResponder {
    tx: oneshot::Sender<DispatchOutcome>,
}

impl ChannelResponder {
    pub fn new() -> (Self, oneshot::Receiver<DispatchOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }
}

impl Responder for ChannelResponder {
    fn respond(self: Box<Self>, outcome: DispatchOutcome) {
        let _ = self.tx.send(outcome);
    }
}

/// Envelope paired with an arbitrary responder
pub struct BufferedCall {
    envelope: CallEnvelope,
    responder: Box<dyn Responder>,
}

impl BufferedCall {
    pub fn new<R: Responder + 'static>(envelope: CallEnvelope, responder: R) -> Self {
        Self {
            envelope,
            responder: Box::new(responder),
        }
    }
}

impl InboundCall for BufferedCall {
    fn into_parts(self) -> (CallEnvelope, Box<dyn Responder>) {
        (self.envelope, self.responder)
    }
}
