use async_trait::async_trait;
use flowcore::{ContextAware, Node, NodeError, Value, WorkflowContext};
use std::sync::Arc;

/// Lower-cases the `text` input and collapses whitespace.
///
/// Declared injectable: it reads the input from the context handed to it at
/// construction time.
#[derive(Default)]
pub struct NormalizeNode {
    ctx: Option<Arc<WorkflowContext>>,
}

impl ContextAware for NormalizeNode {
    fn inject(&mut self, ctx: Arc<WorkflowContext>) {
        self.ctx = Some(ctx);
    }
}

#[async_trait]
impl Node for NormalizeNode {
    async fn execute(&self, _ctx: Arc<WorkflowContext>) -> Result<Value, NodeError> {
        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| NodeError::InitializationFailed("run context was not injected".into()))?;

        let text = match ctx.inputs.get("text") {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(NodeError::InvalidInputType {
                    field: "text".to_string(),
                    expected: "string".to_string(),
                    actual: other.kind().to_string(),
                })
            }
        };

        Ok(Value::object().with("text_norm", normalize(text)))
    }
}

pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_case() {
        assert_eq!(normalize("  Hello \t  WORLD\n again "), "hello world again");
        assert_eq!(normalize("   "), "");
    }
}
