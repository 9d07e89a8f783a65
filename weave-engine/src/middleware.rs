//! Node middleware (§4.7.5 supplement — SPEC_FULL.md). Generalizes the
//! teacher's `NodeMiddleware::around_run` hook so cross-cutting concerns
//! (tracing, metrics, auth) can wrap every agent invocation without each
//! handler knowing about them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::registry::{AgentHandler, AgentRequest, AgentResult};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The rest of the chain, as a one-shot callable. A middleware calls this
/// exactly once to continue past itself, or returns without calling it to
/// short-circuit the node entirely.
pub type Next = Box<dyn FnOnce(AgentRequest) -> BoxFuture<Result<AgentResult, AgentError>> + Send>;

#[async_trait]
pub trait AgentMiddleware: Send + Sync {
    async fn around_execute(
        &self,
        node_id: &str,
        request: AgentRequest,
        inner: Next,
    ) -> Result<AgentResult, AgentError>;
}

/// Folds `handler` and an ordered list of middlewares into a single callable
/// chain, innermost-first. Built iteratively (not recursively) to keep each
/// closure's captured state concrete and avoid self-referential async
/// closures.
pub fn build_chain(
    handler: Arc<dyn AgentHandler>,
    middlewares: &[Arc<dyn AgentMiddleware>],
) -> Next {
    let mut next: Next = Box::new(move |request: AgentRequest| {
        let handler = handler.clone();
        Box::pin(async move { handler.execute(request).await })
    });

    for middleware in middlewares.iter().rev() {
        let middleware = middleware.clone();
        let prev = next;
        next = Box::new(move |request: AgentRequest| {
            let middleware = middleware.clone();
            Box::pin(async move {
                let node_id = request.node_id.clone();
                middleware.around_execute(&node_id, request, prev).await
            })
        });
    }

    next
}

/// Logs entry/exit of every node invocation at `info`/`warn`, matching the
/// teacher's tracing-first instrumentation style.
pub struct TracingMiddleware;

#[async_trait]
impl AgentMiddleware for TracingMiddleware {
    async fn around_execute(
        &self,
        node_id: &str,
        request: AgentRequest,
        inner: Next,
    ) -> Result<AgentResult, AgentError> {
        tracing::info!(node_id, "agent invocation starting");
        let result = inner(request).await;
        match &result {
            Ok(_) => tracing::info!(node_id, "agent invocation completed"),
            Err(err) => tracing::warn!(node_id, error = %err, "agent invocation failed"),
        }
        result
    }
}
