//! Sentiment analysis flow
//!
//! Four nodes chained one after another:
//! `Normalize` -> `Sentiment` -> `Propagation` -> `GlobalEmotion`.
//! The last one folds every run into a process-wide [`EmotionState`].

mod global;
mod normalize;
mod propagation;
mod sentiment;

pub use global::{EmotionState, GlobalEmotionFactory, GlobalEmotionNode};
pub use normalize::{normalize, NormalizeNode};
pub use propagation::PropagationNode;
pub use sentiment::{
    top_features, Classifier, LexiconClassifier, Probabilities, SentimentFactory, SentimentNode,
};

use flowcore::{NodeError, Value, WorkflowError};
use flowruntime::{NodeRegistry, RunResult};
use std::sync::{Arc, Mutex};

pub const NORMALIZE: &str = "Normalize";
pub const SENTIMENT: &str = "Sentiment";
pub const PROPAGATION: &str = "Propagation";
pub const GLOBAL_EMOTION: &str = "GlobalEmotion";

/// Register the sentiment flow with the built-in word-list classifier
pub fn register_all(registry: &mut NodeRegistry) -> Result<Arc<Mutex<EmotionState>>, WorkflowError> {
    register_with_classifier(registry, Arc::new(LexiconClassifier))
}

/// Register the sentiment flow around a custom classifier.
///
/// Returns the emotion state shared by every run of this registry.
pub fn register_with_classifier(
    registry: &mut NodeRegistry,
    classifier: Arc<dyn Classifier>,
) -> Result<Arc<Mutex<EmotionState>>, WorkflowError> {
    let state = Arc::new(Mutex::new(EmotionState::default()));

    registry.declare_injectable::<NormalizeNode>(Some(NORMALIZE), &[])?;
    registry.register(SENTIMENT, &[NORMALIZE], Arc::new(SentimentFactory::new(classifier)))?;
    registry.declare::<PropagationNode>(Some(PROPAGATION), &[SENTIMENT])?;
    registry.register(
        GLOBAL_EMOTION,
        &[PROPAGATION],
        Arc::new(GlobalEmotionFactory::new(state.clone())),
    )?;

    Ok(state)
}

/// Shape a run's results the way callers of the flow consume them
pub fn report(result: &RunResult) -> serde_json::Value {
    let pick = |name: &str| {
        result
            .get(name)
            .cloned()
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null)
    };

    serde_json::json!({
        "sentiment": pick(SENTIMENT),
        "propagation": pick(PROPAGATION),
        "global": pick(GLOBAL_EMOTION),
    })
}

pub(crate) fn field<'a>(value: &'a Value, node: &str, key: &str) -> Result<&'a Value, NodeError> {
    value.get(key).ok_or_else(|| {
        NodeError::ExecutionFailed(format!("result of '{}' has no '{}' field", node, key))
    })
}

pub(crate) fn number(value: &Value, node: &str, key: &str) -> Result<f64, NodeError> {
    let raw = field(value, node, key)?;
    raw.as_f64().ok_or_else(|| NodeError::InvalidInputType {
        field: format!("{}.{}", node, key),
        expected: "number".to_string(),
        actual: raw.kind().to_string(),
    })
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
