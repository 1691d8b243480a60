//! Event transport: frames in, acknowledgements out
//!
//! Incoming frames are `{"event": <route>, "data": <payload>, "ack": <id>}`.
//! Every answer goes back as `{"ack": <id>, "status": <code>, "data": <value>}`
//! through one outbound queue, which a single writer drains.

use super::call::{
    CallEnvelope, DispatchOutcome, InboundCall, IssuedCookie, Reply, ReplyStatus, Responder,
};
use super::dispatcher::Dispatcher;
use super::TransportKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const PING_EVENT: &str = "ping";
pub const PONG_EVENT: &str = "pong";

#[derive(Debug, Clone, Deserialize)]
pub struct SocketFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocketReply {
    pub ack: Option<Value>,
    pub status: ReplyStatus,
    pub data: Value,
}

impl SocketReply {
    fn new(ack: Option<Value>, reply: Reply) -> Self {
        Self {
            ack,
            status: reply.status,
            data: reply.body,
        }
    }
}

/// Server side of one socket connection
///
/// Tracks the bound events and the caller's session cookie; a cookie issued
/// by any call replaces the previous one for later calls. Unbound events
/// still go through the dispatcher, so they are authorized before the
/// route lookup answers them, the same as over HTTP.
pub struct SocketChannel {
    events: HashSet<String>,
    cookie: Arc<Mutex<Option<String>>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl SocketChannel {
    pub fn new(cookie: Option<String>, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            events: HashSet::new(),
            cookie: Arc::new(Mutex::new(cookie)),
            outbound,
        }
    }

    pub fn bind<S: Into<String>>(&mut self, event: S) {
        self.events.insert(event.into());
    }

    pub fn is_bound(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Current `Cookie` header value for calls on this channel
    pub fn cookie(&self) -> Option<String> {
        self.cookie
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Handle one text frame; every event is dispatched on its own task
    pub fn handle_frame(&self, dispatcher: &Arc<Dispatcher>, text: &str) {
        let frame: SocketFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Ignoring malformed socket frame: {}", e);
                let reply = SocketReply::new(None, Reply::bad_request(e.to_string()));
                send_json(&self.outbound, &reply);
                return;
            }
        };

        if frame.event == PING_EVENT {
            send_json(&self.outbound, &serde_json::json!({ "event": PONG_EVENT }));
            return;
        }

        if !self.is_bound(&frame.event) {
            debug!(event = %frame.event, "Unbound socket event");
        }

        let call = SocketCall {
            frame,
            cookie: Arc::clone(&self.cookie),
            outbound: self.outbound.clone(),
        };
        let dispatcher = Arc::clone(dispatcher);
        tokio::spawn(async move { dispatcher.dispatch(call).await });
    }
}

fn send_json<T: Serialize>(outbound: &mpsc::UnboundedSender<String>, value: &T) {
    match serde_json::to_string(value) {
        Ok(text) => {
            if outbound.send(text).is_err() {
                debug!("Socket writer closed, dropping reply");
            }
        }
        Err(e) => warn!("Failed to serialize socket reply: {}", e),
    }
}

/// One event frame viewed as an inbound call
struct SocketCall {
    frame: SocketFrame,
    cookie: Arc<Mutex<Option<String>>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl InboundCall for SocketCall {
    fn into_parts(self) -> (CallEnvelope, Box<dyn Responder>) {
        let cookie = self
            .cookie
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let envelope = CallEnvelope {
            route: self.frame.event,
            payload: self.frame.data,
            cookie,
            transport: TransportKind::Socket,
        };
        let responder = AckResponder {
            ack: self.frame.ack,
            cookie: self.cookie,
            outbound: self.outbound,
        };
        (envelope, Box::new(responder))
    }
}

struct AckResponder {
    ack: Option<Value>,
    cookie: Arc<Mutex<Option<String>>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl AckResponder {
    fn adopt(&self, issued: &IssuedCookie) {
        *self.cookie.lock().unwrap_or_else(PoisonError::into_inner) = Some(issued.pair());
    }
}

impl Responder for AckResponder {
    fn respond(self: Box<Self>, outcome: DispatchOutcome) {
        if let Some(issued) = &outcome.session_cookie {
            self.adopt(issued);
        }
        send_json(&self.outbound, &SocketReply::new(self.ack, outcome.reply));
    }
}
