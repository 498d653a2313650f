use crate::graph::ExecutionPlan;
use crate::registry::NodeRegistry;
use chrono::Utc;
use flowcore::{
    EventBus, ExecutionEvent, FlowError, Node, NodeError, RunId, Value, WorkflowContext,
    WorkflowError,
};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// How the executor walks the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingStrategy {
    /// Validate and sort the graph first, then run each level concurrently
    #[default]
    Levelled,
    /// Repeatedly scan for ready nodes and run them one at a time; a pass
    /// without progress is reported as [`WorkflowError::Deadlock`]
    FixedPoint,
}

impl std::str::FromStr for SchedulingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levelled" | "leveled" => Ok(SchedulingStrategy::Levelled),
            "fixed-point" | "fixed_point" | "fixedpoint" => Ok(SchedulingStrategy::FixedPoint),
            other => Err(format!("unknown scheduling strategy: {}", other)),
        }
    }
}

type NodeRun = (String, Result<Value, NodeError>, u64);

/// Executes every registered node once, in dependency order
pub struct WorkflowExecutor {
    max_parallel: usize,
    strategy: SchedulingStrategy,
}

impl WorkflowExecutor {
    pub fn new(max_parallel: usize, strategy: SchedulingStrategy) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            strategy,
        }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// Run all nodes of the registry against a fresh context built from `inputs`
    pub async fn execute(
        &self,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        inputs: HashMap<String, Value>,
    ) -> Result<RunResult, FlowError> {
        // The levelled strategy rejects bad graphs before anything is created.
        let plan = match self.strategy {
            SchedulingStrategy::Levelled => Some(ExecutionPlan::build(registry)?),
            SchedulingStrategy::FixedPoint => None,
        };

        let ctx = Arc::new(WorkflowContext::new(inputs));
        let run_id = ctx.run_id;
        let start_time = Instant::now();

        event_bus.publish(&ExecutionEvent::RunStarted {
            run_id,
            node_count: registry.len(),
            timestamp: Utc::now(),
        });

        tracing::info!("Starting workflow run {} ({} nodes)", run_id, registry.len());

        let outcome = match self.instantiate(registry, &ctx) {
            Ok(instances) => match &plan {
                Some(plan) => self.execute_levels(plan, instances, &ctx, event_bus).await,
                None => {
                    self.execute_fixed_point(registry, instances, &ctx, event_bus)
                        .await
                }
            },
            Err(e) => Err(e),
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;

        event_bus.publish(&ExecutionEvent::RunCompleted {
            run_id,
            success: outcome.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match outcome {
            Ok(results) => {
                tracing::info!("Workflow run {} completed in {}ms", run_id, duration_ms);
                Ok(RunResult {
                    run_id,
                    results,
                    duration_ms,
                })
            }
            Err(e) => {
                tracing::error!("Workflow run {} failed after {}ms: {}", run_id, duration_ms, e);
                Err(e)
            }
        }
    }

    /// Create one fresh instance per node, injecting the context where declared
    fn instantiate(
        &self,
        registry: &NodeRegistry,
        ctx: &Arc<WorkflowContext>,
    ) -> Result<HashMap<String, Box<dyn Node>>, FlowError> {
        let mut instances = HashMap::with_capacity(registry.len());
        for descriptor in registry.descriptors() {
            let node = descriptor
                .instantiate(ctx)
                .map_err(|source| FlowError::NodeFailed {
                    node: descriptor.name().to_string(),
                    source,
                })?;
            instances.insert(descriptor.name().to_string(), node);
        }
        Ok(instances)
    }

    /// Run the plan level by level; nodes of one level run concurrently
    async fn execute_levels(
        &self,
        plan: &ExecutionPlan,
        mut instances: HashMap<String, Box<dyn Node>>,
        ctx: &Arc<WorkflowContext>,
        event_bus: &EventBus,
    ) -> Result<HashMap<String, Value>, FlowError> {
        let mut results = HashMap::with_capacity(plan.node_count());

        for (depth, level) in plan.levels().iter().enumerate() {
            tracing::debug!("Run {}: level {} -> [{}]", ctx.run_id, depth, level.join(", "));

            let mut pending = level.iter();
            let mut running = FuturesUnordered::new();

            loop {
                // Spawn tasks for ready nodes up to parallel limit
                while running.len() < self.max_parallel {
                    let Some(name) = pending.next() else { break };
                    let node = take_instance(&mut instances, name)?;
                    running.push(spawn_node(name.clone(), node, Arc::clone(ctx)));
                }

                let Some(joined) = running.next().await else { break };

                let completion = match joined {
                    Ok((name, result, duration_ms)) => {
                        self.complete(ctx, event_bus, &mut results, name, result, duration_ms)
                            .await
                    }
                    Err(e) => Err(FlowError::Execution(format!("Node task failed: {}", e))),
                };

                if let Err(e) = completion {
                    for handle in running.iter() {
                        handle.abort();
                    }
                    return Err(e);
                }
            }
        }

        Ok(results)
    }

    /// Repeated readiness scan until every node ran or a pass makes no progress
    async fn execute_fixed_point(
        &self,
        registry: &NodeRegistry,
        mut instances: HashMap<String, Box<dyn Node>>,
        ctx: &Arc<WorkflowContext>,
        event_bus: &EventBus,
    ) -> Result<HashMap<String, Value>, FlowError> {
        let mut results = HashMap::with_capacity(registry.len());
        let mut remaining = registry.names();

        while !remaining.is_empty() {
            let mut progressed = false;
            let mut blocked = Vec::new();

            for name in std::mem::take(&mut remaining) {
                let descriptor = registry
                    .get(&name)
                    .ok_or_else(|| WorkflowError::NodeNotFound(name.clone()))?;

                let ready = descriptor
                    .depends_on()
                    .iter()
                    .all(|dep| results.contains_key(dep));

                if !ready {
                    blocked.push(name);
                    continue;
                }

                let node = take_instance(&mut instances, &name)?;
                let (name, result, duration_ms) = spawn_node(name, node, Arc::clone(ctx))
                    .await
                    .map_err(|e| FlowError::Execution(format!("Node task failed: {}", e)))?;
                self.complete(ctx, event_bus, &mut results, name, result, duration_ms)
                    .await?;
                progressed = true;
            }

            remaining = blocked;

            if !progressed {
                remaining.sort();
                tracing::error!("Run {}: no progress, remaining [{}]", ctx.run_id, remaining.join(", "));
                return Err(WorkflowError::Deadlock { remaining }.into());
            }
        }

        Ok(results)
    }

    /// Record a finished node or turn its failure into the run's error
    async fn complete(
        &self,
        ctx: &WorkflowContext,
        event_bus: &EventBus,
        results: &mut HashMap<String, Value>,
        name: String,
        result: Result<Value, NodeError>,
        duration_ms: u64,
    ) -> Result<(), FlowError> {
        match result {
            Ok(value) => {
                tracing::info!("Node {} completed in {}ms", name, duration_ms);

                ctx.record(name.clone(), value.clone()).await;

                event_bus.publish(&ExecutionEvent::NodeCompleted {
                    run_id: ctx.run_id,
                    node: name.clone(),
                    result: value.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });

                results.insert(name, value);
                Ok(())
            }
            Err(source) => {
                tracing::error!("Node {} failed: {}", name, source);

                event_bus.publish(&ExecutionEvent::NodeFailed {
                    run_id: ctx.run_id,
                    node: name.clone(),
                    error: source.to_string(),
                    timestamp: Utc::now(),
                });

                Err(FlowError::NodeFailed { node: name, source })
            }
        }
    }
}

fn take_instance(
    instances: &mut HashMap<String, Box<dyn Node>>,
    name: &str,
) -> Result<Box<dyn Node>, WorkflowError> {
    instances
        .remove(name)
        .ok_or_else(|| WorkflowError::NodeNotFound(name.to_string()))
}

fn spawn_node(name: String, node: Box<dyn Node>, ctx: Arc<WorkflowContext>) -> JoinHandle<NodeRun> {
    tokio::spawn(async move {
        let start = Instant::now();
        let result = node.execute(ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        (name, result, duration_ms)
    })
}

/// Result of a successful workflow run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: RunId,
    /// Result of every registered node, keyed by node name
    pub results: HashMap<String, Value>,
    pub duration_ms: u64,
}

impl RunResult {
    pub fn get(&self, node: &str) -> Option<&Value> {
        self.results.get(node)
    }

    /// Node names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.results.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
