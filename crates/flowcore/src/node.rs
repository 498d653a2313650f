use crate::{NodeError, Value, WorkflowContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait that all executable nodes implement.
///
/// A node is instantiated once per run and executed at most once. When
/// `execute` is called, the result of every declared dependency is already
/// recorded in the context.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute the node against the run context and return its result
    async fn execute(&self, ctx: Arc<WorkflowContext>) -> Result<Value, NodeError>;
}

/// Marks a node type as wanting the run context at construction time.
///
/// The registry calls `inject` exactly once on a fresh instance, before the
/// node's execution.
pub trait ContextAware {
    fn inject(&mut self, ctx: Arc<WorkflowContext>);
}
