use crate::{field, round_to, NORMALIZE};
use async_trait::async_trait;
use flowcore::{Node, NodeError, Value, WorkflowContext};
use flowruntime::{NodeFactory, NodeMetadata};
use std::sync::Arc;

/// Class probabilities; the three values sum to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probabilities {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

impl Probabilities {
    /// Arg-max label. Ties go to positive, then negative, then neutral.
    pub fn label(&self) -> &'static str {
        let max = self.positive.max(self.negative).max(self.neutral);
        if self.positive == max {
            "Positive"
        } else if self.negative == max {
            "Negative"
        } else {
            "Neutral"
        }
    }
}

/// Text classifier used by [`SentimentNode`]
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Probabilities;
}

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "happy", "love", "like", "wonderful", "amazing", "best",
    "awesome", "nice", "fantastic", "glad", "enjoy", "beautiful", "perfect", "thanks", "pleased",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "awful", "sad", "hate", "dislike", "worst", "horrible", "angry", "poor",
    "ugly", "disappointed", "annoying", "boring", "broken", "fail", "failed", "upset",
];

const NEGATORS: &[&str] = &["not", "no", "never", "don't", "isn't", "wasn't", "can't"];

/// Word-list classifier.
///
/// Each sentiment word counts one vote, flipped when directly preceded by a
/// negator. One extra neutral vote keeps texts without sentiment words neutral.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconClassifier;

impl Classifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Probabilities {
        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut negated = false;

        for raw in text.split_whitespace() {
            let word = raw
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();

            let polarity = if POSITIVE.contains(&word.as_str()) {
                Some(true)
            } else if NEGATIVE.contains(&word.as_str()) {
                Some(false)
            } else {
                None
            };

            match polarity.map(|p| p != negated) {
                Some(true) => positive += 1,
                Some(false) => negative += 1,
                None => {}
            }
            negated = NEGATORS.contains(&word.as_str());
        }

        let total = (positive + negative + 1) as f64;
        Probabilities {
            negative: negative as f64 / total,
            neutral: 1.0 / total,
            positive: positive as f64 / total,
        }
    }
}

/// Classifies the normalized text
pub struct SentimentNode {
    classifier: Arc<dyn Classifier>,
}

impl SentimentNode {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

impl Default for SentimentNode {
    fn default() -> Self {
        Self::new(Arc::new(LexiconClassifier))
    }
}

#[async_trait]
impl Node for SentimentNode {
    async fn execute(&self, ctx: Arc<WorkflowContext>) -> Result<Value, NodeError> {
        let normalized = ctx.result(NORMALIZE).await?;
        let text = field(&normalized, NORMALIZE, "text_norm")?
            .as_str()
            .unwrap_or_default();

        let probs = self.classifier.classify(text);

        let scores = Value::object()
            .with("positive", round_to(probs.positive * 100.0, 2))
            .with("neutral", round_to(probs.neutral * 100.0, 2))
            .with("negative", round_to(probs.negative * 100.0, 2));

        Ok(Value::object()
            .with("label", probs.label())
            .with("scores", scores)
            .with("features", top_features(text, 3)))
    }
}

/// Up to `n` longest words, earlier words first among equal lengths
pub fn top_features(text: &str, n: usize) -> Vec<String> {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words.into_iter().take(n).map(str::to_string).collect()
}

/// Builds [`SentimentNode`]s around a shared classifier
pub struct SentimentFactory {
    classifier: Arc<dyn Classifier>,
}

impl SentimentFactory {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

impl NodeFactory for SentimentFactory {
    fn create(&self, _ctx: &Arc<WorkflowContext>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(SentimentNode::new(self.classifier.clone())))
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Classify normalized text as positive, neutral or negative".to_string(),
            category: "sentiment".to_string(),
        }
    }
}
