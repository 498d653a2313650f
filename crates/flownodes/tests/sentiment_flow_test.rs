// crates/flownodes/tests/sentiment_flow_test.rs

use flowcore::{FlowError, NodeError, Value};
use flownodes::{
    register_all, register_with_classifier, report, Classifier, Probabilities, GLOBAL_EMOTION,
    NORMALIZE, PROPAGATION, SENTIMENT,
};
use flowruntime::{FlowRuntime, NodeRegistry, RuntimeConfig, SchedulingStrategy};
use std::collections::HashMap;
use std::sync::Arc;

fn sentiment_runtime(strategy: SchedulingStrategy) -> FlowRuntime {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry).expect("flow registers cleanly");
    FlowRuntime::with_registry(
        Arc::new(registry),
        RuntimeConfig {
            strategy,
            ..RuntimeConfig::default()
        },
    )
}

fn text(value: impl Into<Value>) -> HashMap<String, Value> {
    HashMap::from([("text".to_string(), value.into())])
}

fn num(value: &Value, path: &[&str]) -> f64 {
    path.iter()
        .fold(Some(value), |v, key| v.and_then(|v| v.get(key)))
        .and_then(Value::as_f64)
        .unwrap_or_else(|| panic!("no number at {path:?}"))
}

#[tokio::test]
async fn positive_text_flows_through_every_node() {
    let runtime = sentiment_runtime(SchedulingStrategy::Levelled);

    let result = runtime
        .run(text("  I LOVE   this great   product "))
        .await
        .unwrap();

    assert_eq!(
        result.get(NORMALIZE).and_then(|v| v.get("text_norm")),
        Some(&Value::from("i love this great product"))
    );

    let sentiment = result.get(SENTIMENT).unwrap();
    assert_eq!(sentiment.get("label"), Some(&Value::from("Positive")));
    assert_eq!(num(sentiment, &["scores", "positive"]), 66.67);
    assert_eq!(num(sentiment, &["scores", "neutral"]), 33.33);
    assert_eq!(num(sentiment, &["scores", "negative"]), 0.0);
    assert_eq!(
        sentiment.get("features"),
        Some(&Value::from(vec!["product", "great", "love"]))
    );

    let propagation = result.get(PROPAGATION).unwrap();
    assert_eq!(num(propagation, &["emotional_energy"]), 0.667);
    assert_eq!(num(propagation, &["stability"]), 0.333);
    assert_eq!(propagation.get("dominant"), Some(&Value::from("Positive")));

    let global = result.get(GLOBAL_EMOTION).unwrap();
    assert_eq!(num(global, &["network_energy"]), 0.667);
    assert_eq!(global.get("history"), Some(&Value::from(vec!["Positive"])));
}

#[tokio::test]
async fn global_emotion_accumulates_across_runs() {
    for strategy in [SchedulingStrategy::Levelled, SchedulingStrategy::FixedPoint] {
        let runtime = sentiment_runtime(strategy);

        let first = runtime.run(text("what a great day")).await.unwrap();
        let second = runtime.run(text("terrible, awful service")).await.unwrap();

        assert_ne!(first.run_id, second.run_id);

        let global = second.get(GLOBAL_EMOTION).unwrap();
        // +0.5 then -0.667
        assert!((num(global, &["network_energy"]) - (-0.167)).abs() < 1e-9);
        assert_eq!(
            global.get("history"),
            Some(&Value::from(vec!["Positive", "Negative"]))
        );
    }
}

#[tokio::test]
async fn missing_text_is_neutral() {
    let runtime = sentiment_runtime(SchedulingStrategy::Levelled);

    let result = runtime.run(HashMap::new()).await.unwrap();

    let sentiment = result.get(SENTIMENT).unwrap();
    assert_eq!(sentiment.get("label"), Some(&Value::from("Neutral")));
    assert_eq!(num(sentiment, &["scores", "neutral"]), 100.0);
    assert_eq!(sentiment.get("features"), Some(&Value::Array(vec![])));
    assert_eq!(num(result.get(PROPAGATION).unwrap(), &["stability"]), 1.0);
}

#[tokio::test]
async fn non_string_text_fails_the_run() {
    let runtime = sentiment_runtime(SchedulingStrategy::Levelled);

    let err = runtime.run(text(42.0)).await.unwrap_err();

    match err {
        FlowError::NodeFailed { node, source } => {
            assert_eq!(node, NORMALIZE);
            assert!(matches!(source, NodeError::InvalidInputType { ref field, .. } if field == "text"));
        }
        other => panic!("expected node failure, got {other:?}"),
    }
}

#[tokio::test]
async fn report_has_the_consumer_shape() {
    let runtime = sentiment_runtime(SchedulingStrategy::Levelled);
    let result = runtime.run(text("nice")).await.unwrap();

    let report = report(&result);

    assert_eq!(report["sentiment"]["label"], "Positive");
    assert_eq!(report["propagation"]["dominant"], "Positive");
    assert_eq!(report["global"]["history"], serde_json::json!(["Positive"]));
}

#[test]
fn flow_is_a_chain() {
    let runtime = sentiment_runtime(SchedulingStrategy::Levelled);
    let plan = runtime.validate().unwrap();

    assert_eq!(plan.levels().len(), 4);
    assert_eq!(
        plan.order(),
        vec![NORMALIZE, SENTIMENT, PROPAGATION, GLOBAL_EMOTION]
    );
}

#[test]
fn registering_twice_is_rejected() {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry).unwrap();
    assert!(register_all(&mut registry).is_err());
    assert_eq!(registry.len(), 4);
}

struct Gloomy;

impl Classifier for Gloomy {
    fn classify(&self, _text: &str) -> Probabilities {
        Probabilities {
            negative: 0.9,
            neutral: 0.1,
            positive: 0.0,
        }
    }
}

#[tokio::test]
async fn custom_classifier_is_used() {
    let mut registry = NodeRegistry::new();
    let state = register_with_classifier(&mut registry, Arc::new(Gloomy)).unwrap();
    let runtime = FlowRuntime::with_registry(Arc::new(registry), RuntimeConfig::default());

    let result = runtime.run(text("sunshine everywhere")).await.unwrap();

    let sentiment = result.get(SENTIMENT).unwrap();
    assert_eq!(sentiment.get("label"), Some(&Value::from("Negative")));
    assert_eq!(num(sentiment, &["scores", "negative"]), 90.0);

    let state = state.lock().unwrap();
    assert_eq!(state.energy, -0.9);
    assert_eq!(state.history, vec!["Negative"]);
}
