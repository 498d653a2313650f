use crate::{NodeError, Value};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type RunId = Uuid;

/// Shared state of a single workflow run.
///
/// A context is created by the scheduler at the start of a run and dropped
/// when the run returns. Nodes only ever see the context of their own run.
#[derive(Debug)]
pub struct WorkflowContext {
    /// Unique identifier of this run
    pub run_id: RunId,

    /// Caller-supplied inputs, immutable for the whole run
    pub inputs: HashMap<String, Value>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Results of completed nodes, keyed by node name
    store: RwLock<HashMap<String, Value>>,
}

impl WorkflowContext {
    pub fn new(inputs: HashMap<String, Value>) -> Self {
        Self {
            run_id: RunId::new_v4(),
            inputs,
            started_at: Utc::now(),
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    /// Get a string input, `None` when absent or not a string
    pub fn input_str(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).and_then(Value::as_str)
    }

    /// Result of an already completed node.
    ///
    /// Declared dependencies are always present; anything else may not be.
    pub async fn result(&self, node: &str) -> Result<Value, NodeError> {
        self.store
            .read()
            .await
            .get(node)
            .cloned()
            .ok_or_else(|| NodeError::MissingResult(node.to_string()))
    }

    /// Record a node result. Only the scheduler writes to the store.
    pub async fn record(&self, node: impl Into<String>, value: Value) {
        self.store.write().await.insert(node.into(), value);
    }

    /// Names of nodes whose result has been recorded
    pub async fn completed(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn is_completed(&self, node: &str) -> bool {
        self.store.read().await.contains_key(node)
    }

    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.store.read().await.clone()
    }
}
