use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: NodeError,
    },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// True when the run could not make progress through the dependency graph:
    /// a cycle, a dependency that was never registered, or a stalled
    /// fixed-point scan.
    pub fn is_non_progress(&self) -> bool {
        matches!(
            self,
            FlowError::Workflow(
                WorkflowError::Deadlock { .. }
                    | WorkflowError::CyclicDependency { .. }
                    | WorkflowError::UnresolvedDependency { .. }
            )
        )
    }
}

#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("No result recorded for node: {0}")]
    MissingResult(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Node initialization failed: {0}")]
    InitializationFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Node already declared: {0}")]
    DuplicateNode(String),

    #[error("Node '{node}' depends on unregistered node '{dependency}'")]
    UnresolvedDependency { node: String, dependency: String },

    #[error("Cyclic dependency detected between: {}", nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },

    #[error("Deadlock: no progress possible for {}", remaining.join(", "))]
    Deadlock { remaining: Vec<String> },

    #[error("Node not found: {0}")]
    NodeNotFound(String),
}
