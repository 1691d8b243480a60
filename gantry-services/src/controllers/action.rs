//! Controller action contract
//!
//! Actions are plain async closures. What they receive is fixed by their
//! [`Export`] variant, so validating an action at registration time is a
//! match on the variant instead of counting parameters.

use crate::rights::RightsResolver;
use crate::session::{Session, SessionManager};
use crate::transport::TransportKind;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Business-level failure reported by an action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

impl From<crate::error::SessionError> for ActionError {
    fn from(error: crate::error::SessionError) -> Self {
        Self::new(error.to_string())
    }
}

impl From<crate::error::RightsError> for ActionError {
    fn from(error: crate::error::RightsError) -> Self {
        Self::new(error.to_string())
    }
}

pub type ActionResult = Result<Value, ActionError>;

/// One-shot completion handle handed to every action
///
/// Consuming `self` makes a second answer impossible. Dropping it without
/// answering is reported to the caller as a failed call.
#[derive(Debug)]
pub struct Respond {
    tx: oneshot::Sender<ActionResult>,
}

impl Respond {
    pub fn channel() -> (Self, oneshot::Receiver<ActionResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn ok<T: Serialize>(self, value: T) {
        let result = serde_json::to_value(value).map_err(ActionError::from);
        self.send(result);
    }

    pub fn error<E: Into<ActionError>>(self, error: E) {
        self.send(Err(error.into()));
    }

    pub fn send(self, result: ActionResult) {
        // The caller may already be gone; nothing is waiting for the answer then.
        let _ = self.tx.send(result);
    }
}

/// What a contextual action gets to see about its caller
#[derive(Clone)]
pub struct ActionContext {
    pub session: Session,
    pub transport: TransportKind,
    pub sessions: Arc<SessionManager>,
    pub rights: Arc<RightsResolver>,
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("session", &self.session.id)
            .field("user", &self.session.user.name)
            .field("transport", &self.transport)
            .finish()
    }
}

pub type ActionFuture = BoxFuture<'static, ()>;
pub type DirectHandler = Arc<dyn Fn(Value, Respond) -> ActionFuture + Send + Sync>;
pub type ContextualHandler = Arc<dyn Fn(Value, ActionContext, Respond) -> ActionFuture + Send + Sync>;

/// A named export of a controller module
#[derive(Clone)]
pub enum Export {
    /// `(payload, respond)`, the shape used when rights are disabled
    Direct(DirectHandler),
    /// `(payload, context, respond)`, the shape used when rights are enabled
    Contextual(ContextualHandler),
    /// Any other public function; never registered as an action
    Function { arity: usize },
}

impl Export {
    pub fn direct<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, Respond) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Export::Direct(Arc::new(
            move |payload: Value, respond: Respond| -> ActionFuture {
                Box::pin(handler(payload, respond))
            },
        ))
    }

    pub fn contextual<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, ActionContext, Respond) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Export::Contextual(Arc::new(
            move |payload: Value, context: ActionContext, respond: Respond| -> ActionFuture {
                Box::pin(handler(payload, context, respond))
            },
        ))
    }

    pub fn function(arity: usize) -> Self {
        Export::Function { arity }
    }

    /// Parameter count of the export
    pub fn arity(&self) -> usize {
        match self {
            Export::Direct(_) => 2,
            Export::Contextual(_) => 3,
            Export::Function { arity } => *arity,
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Direct(_) => f.write_str("Direct"),
            Export::Contextual(_) => f.write_str("Contextual"),
            Export::Function { arity } => write!(f, "Function({})", arity),
        }
    }
}

/// Call shape the registry accepts, derived from the rights toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    Direct,
    Contextual,
}

impl ActionMode {
    pub fn for_rights(enabled: bool) -> Self {
        if enabled {
            ActionMode::Contextual
        } else {
            ActionMode::Direct
        }
    }

    pub fn expected_arity(self) -> usize {
        match self {
            ActionMode::Direct => 2,
            ActionMode::Contextual => 3,
        }
    }

    pub fn accepts(self, export: &Export) -> bool {
        matches!(
            (self, export),
            (ActionMode::Direct, Export::Direct(_)) | (ActionMode::Contextual, Export::Contextual(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_respond_ok_and_error() {
        let (respond, rx) = Respond::channel();
        respond.ok(json!({"a": 1}));
        assert_eq!(rx.await.unwrap(), Ok(json!({"a": 1})));

        let (respond, rx) = Respond::channel();
        respond.error("boom");
        assert_eq!(rx.await.unwrap(), Err(ActionError::new("boom")));
    }

    #[tokio::test]
    async fn test_dropped_respond_closes_channel() {
        let (respond, rx) = Respond::channel();
        drop(respond);
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_mode_accepts_matching_variant_only() {
        let direct = Export::direct(|_, respond: Respond| async move { respond.ok(1) });
        let contextual =
            Export::contextual(|_, _ctx, respond: Respond| async move { respond.ok(1) });

        assert!(ActionMode::Direct.accepts(&direct));
        assert!(!ActionMode::Direct.accepts(&contextual));
        assert!(ActionMode::Contextual.accepts(&contextual));
        assert!(!ActionMode::Contextual.accepts(&Export::function(3)));
        assert_eq!(contextual.arity(), ActionMode::for_rights(true).expected_arity());
    }
}
