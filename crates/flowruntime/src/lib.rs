//! Workflow execution runtime
//!
//! This crate provides the execution engine: the node registry, up-front
//! graph validation, and the scheduler that runs every declared node once
//! in dependency order.

mod executor;
mod graph;
mod registry;
mod runtime;

pub use executor::{RunResult, SchedulingStrategy, WorkflowExecutor};
pub use graph::ExecutionPlan;
pub use registry::{NodeDescriptor, NodeFactory, NodeMetadata, NodeRegistry};
pub use runtime::{FlowRuntime, RuntimeConfig};
