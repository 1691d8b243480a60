//! HTTP adapter: `GET|POST /api/<route>`

use super::cookie_header;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use gantry_services::transport::{
    CallEnvelope, DispatchOutcome, InboundCall, IssuedCookie, Reply, Responder,
};
use gantry_services::TransportKind;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::warn;

/// One HTTP request viewed as an inbound call
pub struct HttpCall {
    envelope: CallEnvelope,
    tx: oneshot::Sender<DispatchOutcome>,
}

impl HttpCall {
    /// Build the call; the receiver yields the outcome once dispatched
    ///
    /// The body is the payload; an empty body falls back to the query
    /// parameters as a JSON object. A body that is not JSON is rejected.
    pub fn new(
        route: String,
        headers: &HeaderMap,
        query: HashMap<String, String>,
        body: &[u8],
    ) -> Result<(Self, oneshot::Receiver<DispatchOutcome>), Reply> {
        let payload = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Object(
                query
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect::<Map<_, _>>(),
            )
        } else {
            serde_json::from_slice(body)
                .map_err(|e| Reply::bad_request(format!("Invalid JSON body: {}", e)))?
        };

        let mut envelope = CallEnvelope::new(route, payload, TransportKind::Http);
        envelope.cookie = cookie_header(headers);

        let (tx, rx) = oneshot::channel();
        Ok((Self { envelope, tx }, rx))
    }
}

impl InboundCall for HttpCall {
    fn into_parts(self) -> (CallEnvelope, Box<dyn Responder>) {
        (self.envelope, Box::new(HttpResponder { tx: self.tx }))
    }
}

struct HttpResponder {
    tx: oneshot::Sender<DispatchOutcome>,
}

impl Responder for HttpResponder {
    fn respond(self: Box<Self>, outcome: DispatchOutcome) {
        let _ = self.tx.send(outcome);
    }
}

/// Route handler for `/api/{*route}`
pub async fn call_handler(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (call, outcome) = match HttpCall::new(route, &headers, query, &body) {
        Ok(call) => call,
        Err(reply) => return reply_response(reply, None),
    };

    state.dispatcher().dispatch(call).await;

    match outcome.await {
        Ok(outcome) => reply_response(outcome.reply, outcome.session_cookie.as_ref()),
        Err(_) => {
            warn!("Dispatcher dropped an HTTP call without an outcome");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Reply status as HTTP status, reply value as JSON body
pub fn reply_response(reply: Reply, cookie: Option<&IssuedCookie>) -> Response {
    let status =
        StatusCode::from_u16(reply.status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(reply.body)).into_response();
    if let Some(cookie) = cookie {
        set_cookie(&mut response, cookie);
    }
    response
}

/// Attach a `Set-Cookie` header for an issued session cookie
pub fn set_cookie(response: &mut Response, cookie: &IssuedCookie) {
    match HeaderValue::from_str(&cookie.set_cookie_header()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => warn!("Session cookie is not a valid header value: {}", e),
    }
}
