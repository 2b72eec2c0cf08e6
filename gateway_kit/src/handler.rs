use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::identity::Identity;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything an action sees of the incoming call.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Path, query and JSON body parameters merged into one object.
    pub params: Value,
    pub identity: Option<Identity>,
}

impl ActionContext {
    pub fn new(params: Value) -> Self {
        Self {
            params,
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }
}

/// A type-erased action implementation.
///
/// Takes the merged request parameters and returns the JSON payload of the
/// response.
pub type ActionHandler =
    Arc<dyn Fn(ActionContext) -> BoxFuture<'static, crate::error::Result<Value>> + Send + Sync>;

/// Wraps an async function into an [`ActionHandler`].
pub fn action_handler<F, Fut>(f: F) -> ActionHandler
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::error::Result<Value>> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, crate::error::Result<Value>> { Box::pin(f(ctx)) })
}
