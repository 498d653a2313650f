use crate::{field, number, round_to, SENTIMENT};
use async_trait::async_trait;
use flowcore::{Node, NodeError, Value, WorkflowContext};
use std::sync::Arc;

/// Turns sentiment scores into an emotional energy/stability reading
#[derive(Default)]
pub struct PropagationNode;

#[async_trait]
impl Node for PropagationNode {
    async fn execute(&self, ctx: Arc<WorkflowContext>) -> Result<Value, NodeError> {
        let sentiment = ctx.result(SENTIMENT).await?;
        let scores = field(&sentiment, SENTIMENT, "scores")?;

        let pos = number(scores, SENTIMENT, "positive")? / 100.0;
        let neu = number(scores, SENTIMENT, "neutral")? / 100.0;
        let neg = number(scores, SENTIMENT, "negative")? / 100.0;

        let dominant = field(&sentiment, SENTIMENT, "label")?.clone();

        Ok(Value::object()
            .with("emotional_energy", round_to(pos - neg, 3))
            .with("stability", round_to(1.0 - (pos - neg).abs(), 3))
            .with("dominant", dominant)
            .with(
                "vector",
                Value::object()
                    .with("pos", pos)
                    .with("neu", neu)
                    .with("neg", neg),
            ))
    }
}
