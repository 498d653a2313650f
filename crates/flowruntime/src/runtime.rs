use crate::{
    executor::{RunResult, SchedulingStrategy, WorkflowExecutor},
    graph::ExecutionPlan,
    registry::NodeRegistry,
};
use flowcore::{EventBus, EventType, ExecutionEvent, FlowError, Value, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Main runtime for executing workflows
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Create a new runtime with an empty registry and default settings
    pub fn new() -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), RuntimeConfig::default())
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let executor = Arc::new(WorkflowExecutor::new(
            config.max_parallel_nodes,
            config.strategy,
        ));

        Self {
            registry,
            executor,
            event_bus: Arc::new(EventBus::new()),
        }
    }

    /// Get access to the node registry
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Subscribe to execution events of one type
    pub fn subscribe<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_bus.subscribe(event_type, handler);
    }

    /// Check the declared graph without running anything
    pub fn validate(&self) -> Result<ExecutionPlan, WorkflowError> {
        ExecutionPlan::build(&self.registry)
    }

    /// Execute every registered node once against the given inputs
    pub async fn run(&self, inputs: HashMap<String, Value>) -> Result<RunResult, FlowError> {
        self.executor
            .execute(&self.registry, &self.event_bus, inputs)
            .await
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Upper bound on nodes of one level running at the same time
    pub max_parallel_nodes: usize,
    pub strategy: SchedulingStrategy,
}

impl RuntimeConfig {
    /// Read `FLOW_MAX_PARALLEL` and `FLOW_STRATEGY`, keeping defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("FLOW_MAX_PARALLEL") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_parallel_nodes = n,
                _ => tracing::warn!(
                    "Ignoring FLOW_MAX_PARALLEL={:?}, using {}",
                    raw,
                    config.max_parallel_nodes
                ),
            }
        }

        if let Some(raw) = lookup("FLOW_STRATEGY") {
            match raw.parse() {
                Ok(strategy) => config.strategy = strategy,
                Err(e) => tracing::warn!("Ignoring FLOW_STRATEGY: {}", e),
            }
        }

        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: 10,
            strategy: SchedulingStrategy::Levelled,
        }
    }
}
