//! Request Dispatcher - one authorize-then-invoke pipeline for every transport
//!
//! Each call walks `Received -> Authenticating -> Authorized | Rejected ->
//! Invoking -> Responded | Failed`. Session resolution and the rights check
//! only run when rights are enabled.
//!
//! Actions run on their own task, so a panic inside one becomes a bad
//! request instead of taking the connection down. There is no timeout: an
//! action that keeps its [`Respond`] forever keeps the call pending.

use super::call::{CallEnvelope, DispatchOutcome, InboundCall, IssuedCookie, Reply, ReplyStatus};
use super::socket::SocketChannel;
use crate::controllers::{ActionContext, ControllerAction, ControllerRegistry, Respond};
use crate::error::SessionError;
use crate::rights::RightsResolver;
use crate::session::{Session, SessionManager};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

/// Reply body when the caller lacks the right for a route
pub const ACCESS_DENIED: &str = "Access denied";
/// Reply body when no action is registered under a route
pub const WRONG_URL: &str = "Wrong url";

/// Per-call lifecycle, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Received,
    Authenticating,
    Authorized,
    Rejected,
    Invoking,
    Responded,
    Failed,
}

pub struct Dispatcher {
    registry: Arc<ControllerRegistry>,
    sessions: Arc<SessionManager>,
    rights: Arc<RightsResolver>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ControllerRegistry>,
        sessions: Arc<SessionManager>,
        rights: Arc<RightsResolver>,
    ) -> Self {
        Self {
            registry,
            sessions,
            rights,
        }
    }

    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn rights(&self) -> &Arc<RightsResolver> {
        &self.rights
    }

    /// Run a call and hand the outcome to its responder
    pub async fn dispatch<C: InboundCall>(&self, call: C) {
        let (envelope, responder) = call.into_parts();
        let outcome = self.handle(envelope).await;
        responder.respond(outcome);
    }

    /// Run a normalized call to completion
    pub async fn handle(&self, envelope: CallEnvelope) -> DispatchOutcome {
        let span = info_span!("dispatch", route = %envelope.route, transport = ?envelope.transport);
        self.handle_inner(envelope).instrument(span).await
    }

    async fn handle_inner(&self, envelope: CallEnvelope) -> DispatchOutcome {
        let CallEnvelope {
            route,
            payload,
            cookie,
            transport,
        } = envelope;
        transition(CallState::Received);

        let mut issued = None;
        let context = if self.rights.is_enabled() {
            transition(CallState::Authenticating);

            let session = match self.resolve_session(cookie.as_deref()).await {
                Ok((session, cookie)) => {
                    issued = cookie;
                    session
                }
                Err(e) => {
                    warn!("Session resolution failed: {}", e);
                    transition(CallState::Failed);
                    return DispatchOutcome::new(Reply::bad_request(e.to_string()), None);
                }
            };

            match self.rights.user_has_access_to(&session.user.id, &route).await {
                Ok(true) => transition(CallState::Authorized),
                Ok(false) => {
                    debug!(user = %session.user.name, "Access denied");
                    transition(CallState::Rejected);
                    return DispatchOutcome::new(Reply::forbidden(ACCESS_DENIED), issued);
                }
                Err(e) => {
                    warn!("Rights check failed: {}", e);
                    transition(CallState::Failed);
                    return DispatchOutcome::new(Reply::bad_request(e.to_string()), issued);
                }
            }

            Some(ActionContext {
                session,
                transport,
                sessions: Arc::clone(&self.sessions),
                rights: Arc::clone(&self.rights),
            })
        } else {
            None
        };

        let Some(action) = self.registry.lookup(&route) else {
            transition(CallState::Rejected);
            return DispatchOutcome::new(Reply::forbidden(WRONG_URL), issued);
        };

        transition(CallState::Invoking);
        let reply = invoke(action, payload, context).await;
        transition(if reply.status == ReplyStatus::Ok {
            CallState::Responded
        } else {
            CallState::Failed
        });

        DispatchOutcome::new(reply, issued)
    }

    /// Load the caller's session, creating a guest session when there is none
    ///
    /// Returns a cookie when the session was created or regenerated.
    pub async fn resolve_session(
        &self,
        cookie: Option<&str>,
    ) -> Result<(Session, Option<IssuedCookie>), SessionError> {
        let (mut session, mut fresh) = match self.sessions.get_session(cookie).await {
            Ok(session) => (session, false),
            Err(
                SessionError::MissingCookie
                | SessionError::CookieNotFound { .. }
                | SessionError::MalformedCookie { .. }
                | SessionError::NotFound { .. }
                | SessionError::Corrupt { .. },
            ) => (self.sessions.create_session().await?, true),
            Err(e) => return Err(e),
        };

        if !self.sessions.check_activity_session(&mut session).await? {
            fresh = true;
        }

        let issued = fresh.then(|| IssuedCookie::for_session(&self.sessions, &session));
        Ok((session, issued))
    }

    /// Bind every route of the live snapshot as an event on `channel`
    pub fn register_socket_events(&self, channel: &mut SocketChannel) -> usize {
        let snapshot = self.registry.snapshot();
        for route in snapshot.routes() {
            channel.bind(route.as_str());
        }
        snapshot.len()
    }
}

fn transition(state: CallState) {
    debug!(state = ?state, "Call state");
}

async fn invoke(action: Arc<ControllerAction>, payload: Value, context: Option<ActionContext>) -> Reply {
    let (respond, answer) = Respond::channel();
    let task = tokio::spawn(async move { action.invoke(payload, context, respond).await });

    match answer.await {
        Ok(Ok(value)) => Reply::ok(value),
        Ok(Err(e)) => Reply::bad_request(e.message),
        Err(_) => {
            let message = match task.await {
                Err(e) if e.is_panic() => panic_message(e.into_panic()),
                _ => "action completed without responding".to_string(),
            };
            warn!("Action failed: {}", message);
            Reply::bad_request(message)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "action panicked".to_string()
    }
}
