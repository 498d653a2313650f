use crate::{field, number, round_to, PROPAGATION};
use async_trait::async_trait;
use flowcore::{Node, NodeError, Value, WorkflowContext};
use flowruntime::{NodeFactory, NodeMetadata};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Emotional state accumulated across runs.
///
/// This outlives any single run: every run that executes
/// [`GlobalEmotionNode`] against the same state adds to it.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EmotionState {
    pub energy: f64,
    pub history: Vec<String>,
}

/// Folds this run's propagation reading into the shared [`EmotionState`]
pub struct GlobalEmotionNode {
    state: Arc<Mutex<EmotionState>>,
}

#[async_trait]
impl Node for GlobalEmotionNode {
    async fn execute(&self, ctx: Arc<WorkflowContext>) -> Result<Value, NodeError> {
        let step = ctx.result(PROPAGATION).await?;
        let energy = number(&step, PROPAGATION, "emotional_energy")?;
        let dominant = field(&step, PROPAGATION, "dominant")?
            .as_str()
            .unwrap_or("Neutral")
            .to_string();

        let mut state = self
            .state
            .lock()
            .map_err(|_| NodeError::ExecutionFailed("emotion state lock poisoned".into()))?;

        state.energy = round_to(state.energy + energy, 3);
        state.history.push(dominant);
        tracing::debug!("Run {}: network energy now {}", ctx.run_id, state.energy);

        Ok(Value::object()
            .with("network_energy", state.energy)
            .with("history", state.history.clone()))
    }
}

pub struct GlobalEmotionFactory {
    state: Arc<Mutex<EmotionState>>,
}

impl GlobalEmotionFactory {
    pub fn new(state: Arc<Mutex<EmotionState>>) -> Self {
        Self { state }
    }
}

impl NodeFactory for GlobalEmotionFactory {
    fn create(&self, _ctx: &Arc<WorkflowContext>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(GlobalEmotionNode {
            state: self.state.clone(),
        }))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Accumulate emotional energy across runs".to_string(),
            category: "sentiment".to_string(),
        }
    }
}
