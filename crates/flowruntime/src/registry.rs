use flowcore::{ContextAware, Node, NodeError, WorkflowContext, WorkflowError};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Factory trait for creating node instances.
///
/// The scheduler calls `create` once per node per run with that run's
/// context; the factory hands back an instance ready to execute.
pub trait NodeFactory: Send + Sync {
    /// Create a fresh instance of the node for the given run
    fn create(&self, ctx: &Arc<WorkflowContext>) -> Result<Box<dyn Node>, NodeError>;

    /// Optional: Get node metadata (description, category)
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Metadata about a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Default-constructs the node.
struct DefaultFactory<N>(PhantomData<fn() -> N>);

impl<N> NodeFactory for DefaultFactory<N>
where
    N: Node + Default + 'static,
{
    fn create(&self, _ctx: &Arc<WorkflowContext>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(N::default()))
    }
}

/// Default-constructs the node, then hands it the run context.
struct InjectingFactory<N>(PhantomData<fn() -> N>);

impl<N> NodeFactory for InjectingFactory<N>
where
    N: Node + Default + ContextAware + 'static,
{
    fn create(&self, ctx: &Arc<WorkflowContext>) -> Result<Box<dyn Node>, NodeError> {
        let mut node = N::default();
        node.inject(Arc::clone(ctx));
        Ok(Box::new(node))
    }
}

/// Declaration of a node: its unique name, implementation and dependencies
#[derive(Clone)]
pub struct NodeDescriptor {
    name: String,
    type_name: String,
    depends_on: Vec<String>,
    injectable: bool,
    factory: Arc<dyn NodeFactory>,
}

impl NodeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the implementing type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Whether instances receive the run context at construction time
    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    pub fn metadata(&self) -> NodeMetadata {
        self.factory.metadata()
    }

    /// Create the node instance for one run
    pub fn instantiate(&self, ctx: &Arc<WorkflowContext>) -> Result<Box<dyn Node>, NodeError> {
        self.factory.create(ctx)
    }
}

impl std::fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("depends_on", &self.depends_on)
            .field("injectable", &self.injectable)
            .finish()
    }
}

/// Registry of declared nodes.
///
/// Names are unique: declaring a name twice is rejected with
/// [`WorkflowError::DuplicateNode`] and leaves the registry untouched.
/// Iteration follows declaration order. Dependencies are not checked here;
/// see [`crate::ExecutionPlan`].
#[derive(Default)]
pub struct NodeRegistry {
    descriptors: Vec<NodeDescriptor>,
    index: HashMap<String, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a default-constructible node.
    ///
    /// Without a name the node is registered under its type's short name.
    pub fn declare<N>(&mut self, name: Option<&str>, depends_on: &[&str]) -> Result<(), WorkflowError>
    where
        N: Node + Default + 'static,
    {
        self.insert::<N>(name, depends_on, false, Arc::new(DefaultFactory::<N>(PhantomData)))
    }

    /// Declare a node that receives the run context before it executes.
    pub fn declare_injectable<N>(
        &mut self,
        name: Option<&str>,
        depends_on: &[&str],
    ) -> Result<(), WorkflowError>
    where
        N: Node + Default + ContextAware + 'static,
    {
        self.insert::<N>(name, depends_on, true, Arc::new(InjectingFactory::<N>(PhantomData)))
    }

    /// Register a node built by a custom factory
    pub fn register(
        &mut self,
        name: &str,
        depends_on: &[&str],
        factory: Arc<dyn NodeFactory>,
    ) -> Result<(), WorkflowError> {
        self.push(NodeDescriptor {
            name: name.to_string(),
            type_name: name.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            injectable: false,
            factory,
        })
    }

    fn insert<N: 'static>(
        &mut self,
        name: Option<&str>,
        depends_on: &[&str],
        injectable: bool,
        factory: Arc<dyn NodeFactory>,
    ) -> Result<(), WorkflowError> {
        let type_name = std::any::type_name::<N>();
        let name = name.unwrap_or_else(|| short_type_name(type_name));
        self.push(NodeDescriptor {
            name: name.to_string(),
            type_name: type_name.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            injectable,
            factory,
        })
    }

    fn push(&mut self, descriptor: NodeDescriptor) -> Result<(), WorkflowError> {
        if self.index.contains_key(&descriptor.name) {
            tracing::error!("Rejecting duplicate node declaration: {}", descriptor.name);
            return Err(WorkflowError::DuplicateNode(descriptor.name));
        }

        tracing::info!(
            "Registering node: {} (depends on: [{}])",
            descriptor.name,
            descriptor.depends_on.join(", ")
        );
        self.index.insert(descriptor.name.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NodeDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All descriptors in declaration order
    pub fn descriptors(&self) -> &[NodeDescriptor] {
        &self.descriptors
    }

    /// All node names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Get metadata for a node
    pub fn metadata(&self, name: &str) -> Option<NodeMetadata> {
        self.get(name).map(NodeDescriptor::metadata)
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowcore::Value;

    #[derive(Default)]
    struct Echo;

    #[async_trait]
    impl Node for Echo {
        async fn execute(&self, ctx: Arc<WorkflowContext>) -> Result<Value, NodeError> {
            Ok(Value::from(ctx.run_id.to_string()))
        }
    }

    #[derive(Default)]
    struct Bound {
        ctx: Option<Arc<WorkflowContext>>,
    }

    #[async_trait]
    impl Node for Bound {
        async fn execute(&self, _ctx: Arc<WorkflowContext>) -> Result<Value, NodeError> {
            let ctx = self
                .ctx
                .as_ref()
                .ok_or_else(|| NodeError::InitializationFailed("context not injected".into()))?;
            Ok(Value::from(ctx.run_id.to_string()))
        }
    }

    impl ContextAware for Bound {
        fn inject(&mut self, ctx: Arc<WorkflowContext>) {
            self.ctx = Some(ctx);
        }
    }

    #[test]
    fn defaults_name_to_type_name() {
        let mut registry = NodeRegistry::new();
        registry.declare::<Echo>(None, &[]).unwrap();

        let descriptor = registry.get("Echo").expect("declared under its type name");
        assert!(descriptor.type_name().ends_with("Echo"));
        assert!(descriptor.depends_on().is_empty());
        assert!(!descriptor.is_injectable());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = NodeRegistry::new();
        registry.declare::<Echo>(Some("a"), &[]).unwrap();

        let err = registry.declare::<Bound>(Some("a"), &["b"]).unwrap_err();
        assert_eq!(err, WorkflowError::DuplicateNode("a".into()));

        // The first declaration is kept
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").unwrap().depends_on().is_empty());
    }

    #[test]
    fn keeps_declaration_order_and_unchecked_dependencies() {
        let mut registry = NodeRegistry::new();
        registry.declare::<Echo>(Some("z"), &["ghost"]).unwrap();
        registry.declare::<Echo>(Some("a"), &[]).unwrap();
        registry.declare::<Echo>(Some("m"), &["z", "a"]).unwrap();

        assert_eq!(registry.names(), vec!["z", "a", "m"]);
        assert_eq!(registry.get("z").unwrap().depends_on(), ["ghost".to_string()]);
        assert!(!registry.contains("ghost"));
    }

    #[tokio::test]
    async fn injectable_nodes_receive_the_context() {
        let mut registry = NodeRegistry::new();
        registry.declare_injectable::<Bound>(None, &[]).unwrap();

        let ctx = Arc::new(WorkflowContext::new(Default::default()));
        let descriptor = registry.get("Bound").unwrap();
        assert!(descriptor.is_injectable());

        let node = descriptor.instantiate(&ctx).unwrap();
        let result = node.execute(ctx.clone()).await.unwrap();
        assert_eq!(result, Value::from(ctx.run_id.to_string()));
    }

    #[test]
    fn short_names_strip_paths_and_generics() {
        assert_eq!(short_type_name("crate::nodes::Sentiment"), "Sentiment");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
