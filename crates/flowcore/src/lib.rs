//! Core abstractions for the flow engine
//!
//! This crate provides the node contract, the per-run context, the error
//! taxonomy and the lifecycle event bus. It knows nothing about scheduling.

mod context;
mod error;
pub mod events;
mod node;
mod value;

pub use context::{RunId, WorkflowContext};
pub use error::{FlowError, NodeError, WorkflowError};
pub use events::*;
pub use node::{ContextAware, Node};
pub use value::Value;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
