use log::{debug, trace};

use lockstep_core::{
    change::{Change, ChangeKind, GraphStats},
    tree::{Node, NodeId, NodeTree},
};

use crate::{
    error::SyncError,
    interpreter::Interpreter,
    notation::NotationManager,
    semantic::SemanticManager,
};

/// Writes every change to the semantic model and the notation model.
///
/// Additions go to the semantic model first, since the notation views are
/// named after the created elements. Removals go to the notation model
/// first, since locating the views needs the relations that the semantic
/// removal breaks. Both models are persisted after each applied addition or
/// removal.
pub struct ModelInterpreter {
    semantic: SemanticManager,
    notation: NotationManager,
}

impl ModelInterpreter {
    pub fn new(semantic: SemanticManager, notation: NotationManager) -> Self {
        Self { semantic, notation }
    }

    pub fn semantic(&self) -> &SemanticManager {
        &self.semantic
    }

    pub fn notation(&self) -> &NotationManager {
        &self.notation
    }

    pub fn into_parts(self) -> (SemanticManager, NotationManager) {
        (self.semantic, self.notation)
    }

    fn add_message(&mut self, graph: &NodeTree, id: NodeId) -> Result<(), SyncError> {
        let node = lookup(graph, id)?;
        if node.edge().is_return() {
            trace!(message = node.edge().name(); "Return edge, nothing to add");
            return Ok(());
        }
        let reply = require_reply(graph, id, node)?;

        let messages = self.semantic.add_message(graph, id, reply);
        self.notation.add_message_view(graph, id, &messages)?;
        self.store_model()?;
        self.store_notation()?;
        debug!(message = node.edge().name(); "Message add interpreted to model and notation");
        Ok(())
    }

    fn remove_message(&mut self, graph: &NodeTree, id: NodeId) -> Result<(), SyncError> {
        let node = lookup(graph, id)?;
        if node.edge().is_return() {
            trace!(message = node.edge().name(); "Return edge, nothing to remove");
            return Ok(());
        }
        let reply = require_reply(graph, id, node)?;

        let context = self
            .notation
            .remove_message_view(graph, id, reply, self.semantic.interaction())?;
        self.semantic.remove_message(graph, id, reply, &context);
        self.store_notation()?;
        self.store_model()?;
        debug!(message = node.edge().name(); "Message remove interpreted to model and notation");
        Ok(())
    }

    fn add_lifeline(&mut self, graph: &NodeTree, id: NodeId) -> Result<(), SyncError> {
        let node = lookup(graph, id)?;
        let lifeline = self.semantic.add_lifeline(node.name());
        self.notation.add_lifeline_view(graph, &lifeline);
        self.store_model()?;
        self.store_notation()?;
        debug!(lifeline = node.name(); "Lifeline add interpreted to model and notation");
        Ok(())
    }

    /// Only the view goes away; the semantic lifeline stays and nothing is
    /// persisted until the batch is finalized.
    fn remove_lifeline(&mut self, graph: &NodeTree, id: NodeId) -> Result<(), SyncError> {
        let node = lookup(graph, id)?;
        self.notation.remove_lifeline_view(node.name());
        Ok(())
    }

    fn store_model(&mut self) -> Result<(), SyncError> {
        self.semantic
            .persist()
            .map_err(|source| SyncError::persistence(self.semantic.resource_name(), source))
    }

    fn store_notation(&mut self) -> Result<(), SyncError> {
        self.notation
            .persist()
            .map_err(|source| SyncError::persistence(self.notation.resource_name(), source))
    }
}

impl Interpreter for ModelInterpreter {
    fn name(&self) -> &str {
        "model"
    }

    fn interpret(&mut self, change: &Change, graph: &NodeTree) -> Result<(), SyncError> {
        let id = change.new_value();
        match change.kind() {
            ChangeKind::MessageAdd => self.add_message(graph, id),
            ChangeKind::MessageRemove => self.remove_message(graph, id),
            ChangeKind::LifelineAdd => self.add_lifeline(graph, id),
            ChangeKind::LifelineRemove => self.remove_lifeline(graph, id),
            ChangeKind::MessageModify => {
                trace!(node:? = id; "Message modification is not interpreted");
                Ok(())
            }
        }
    }

    /// Visible lifelines come from the notation, since a removed lifeline
    /// stays in the semantic model.
    fn diagram_stats(&self) -> Option<GraphStats> {
        Some(GraphStats::new(
            self.notation.diagram().lifeline_views().count(),
            self.semantic.interaction().call_count(),
        ))
    }

    fn finalize(&mut self) -> Result<(), SyncError> {
        self.store_model()?;
        self.store_notation()
    }
}

fn lookup(graph: &NodeTree, id: NodeId) -> Result<&Node, SyncError> {
    graph.get(id).ok_or(SyncError::UnknownNode(id))
}

fn require_reply(graph: &NodeTree, id: NodeId, node: &Node) -> Result<NodeId, SyncError> {
    graph
        .reply_of(id)
        .ok_or_else(|| SyncError::MissingReturnMessage {
            message: node.edge().name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use lockstep_core::tree::EdgeKind;

    use super::*;
    use crate::{
        notation::NotationDiagram,
        resource::MemoryResource,
        semantic::Interaction,
    };

    struct Fixture {
        interpreter: ModelInterpreter,
        model: MemoryResource,
        notation: MemoryResource,
    }

    fn fixture() -> Fixture {
        let model = MemoryResource::new("model");
        let notation = MemoryResource::new("notation");
        let interpreter = ModelInterpreter::new(
            SemanticManager::new(Interaction::new("demo"), Box::new(model.clone())),
            NotationManager::new(NotationDiagram::new("demo"), Box::new(notation.clone())),
        );
        Fixture {
            interpreter,
            model,
            notation,
        }
    }

    fn graph() -> (NodeTree, NodeId, NodeId) {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let reply = tree.add_reply(load, "loadReturn");
        (tree, load, reply)
    }

    fn add_lifelines(fixture: &mut Fixture, tree: &NodeTree, ids: &[NodeId]) {
        for &id in ids {
            fixture
                .interpreter
                .interpret(&Change::new(ChangeKind::LifelineAdd, id), tree)
                .unwrap();
        }
    }

    #[test]
    fn test_message_add_writes_both_models() {
        let (tree, load, _) = graph();
        let mut fixture = fixture();
        add_lifelines(&mut fixture, &tree, &[tree.root(), load]);

        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageAdd, load), &tree)
            .unwrap();

        assert_eq!(fixture.interpreter.semantic().interaction().messages().len(), 2);
        assert!(fixture.interpreter.notation().lifeline_view("B").is_some());
        assert_eq!(fixture.model.saves(), 3);
        assert_eq!(fixture.notation.saves(), 3);
    }

    #[test]
    fn test_return_edge_is_noop() {
        let (tree, _, reply) = graph();
        let mut fixture = fixture();

        for kind in [ChangeKind::MessageAdd, ChangeKind::MessageRemove] {
            fixture
                .interpreter
                .interpret(&Change::new(kind, reply), &tree)
                .unwrap();
        }

        assert!(fixture.interpreter.semantic().interaction().messages().is_empty());
        assert_eq!(fixture.model.saves(), 0);
        assert_eq!(fixture.notation.saves(), 0);
    }

    #[test]
    fn test_missing_reply_is_rejected_before_mutation() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let mut fixture = fixture();

        let err = fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageAdd, load), &tree)
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingReturnMessage { ref message } if message == "load"));
        assert!(fixture.interpreter.semantic().interaction().messages().is_empty());
        assert_eq!(fixture.model.saves(), 0);
    }

    #[test]
    fn test_message_remove_clears_both_models() {
        let (tree, load, _) = graph();
        let mut fixture = fixture();
        add_lifelines(&mut fixture, &tree, &[tree.root(), load]);
        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageAdd, load), &tree)
            .unwrap();

        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageRemove, load), &tree)
            .unwrap();

        let interaction = fixture.interpreter.semantic().interaction();
        assert!(interaction.messages().is_empty());
        assert!(interaction.executions().is_empty());
        let diagram = fixture.interpreter.notation().diagram();
        let b = diagram.lifeline_view("B").unwrap();
        assert!(diagram.children(b).is_empty());
    }

    #[test]
    fn test_remove_without_reply_leaves_models_untouched() {
        let (tree, load, _) = graph();
        let mut fixture = fixture();
        add_lifelines(&mut fixture, &tree, &[tree.root(), load]);
        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageAdd, load), &tree)
            .unwrap();
        let saves = (fixture.model.saves(), fixture.notation.saves());
        let views = fixture.interpreter.notation().diagram().attached_views().len();

        let mut detected = NodeTree::new("main", "main");
        let root = detected.root();
        let unpaired = detected.add_call(root, "B", "load", EdgeKind::Normal);

        let err = fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageRemove, unpaired), &detected)
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingReturnMessage { ref message } if message == "load"));
        assert_eq!(fixture.interpreter.semantic().interaction().messages().len(), 2);
        assert_eq!(fixture.interpreter.notation().diagram().attached_views().len(), views);
        assert_eq!((fixture.model.saves(), fixture.notation.saves()), saves);
    }

    #[test]
    fn test_diagram_stats_follow_models() {
        let (tree, load, _) = graph();
        let mut fixture = fixture();
        assert_eq!(fixture.interpreter.diagram_stats(), Some(GraphStats::new(0, 0)));

        add_lifelines(&mut fixture, &tree, &[tree.root(), load]);
        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::MessageAdd, load), &tree)
            .unwrap();
        assert_eq!(fixture.interpreter.diagram_stats(), Some(GraphStats::new(2, 1)));

        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::LifelineRemove, load), &tree)
            .unwrap();
        assert_eq!(fixture.interpreter.diagram_stats(), Some(GraphStats::new(1, 1)));
    }

    #[test]
    fn test_lifeline_remove_keeps_semantic_lifeline() {
        let (tree, load, _) = graph();
        let mut fixture = fixture();
        add_lifelines(&mut fixture, &tree, &[tree.root(), load]);
        let saves = fixture.model.saves();

        fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::LifelineRemove, load), &tree)
            .unwrap();

        assert!(fixture.interpreter.notation().lifeline_view("B").is_none());
        assert!(fixture.interpreter.semantic().interaction().lifeline("B").is_some());
        assert_eq!(fixture.model.saves(), saves);
    }

    #[test]
    fn test_persistence_failure_surfaces_resource() {
        let (tree, load, _) = graph();
        let mut fixture = fixture();
        fixture.notation.set_failing(true);

        let err = fixture
            .interpreter
            .interpret(&Change::new(ChangeKind::LifelineAdd, load), &tree)
            .unwrap_err();
        assert!(matches!(err, SyncError::Persistence { ref resource, .. } if resource == "notation"));
    }

    #[test]
    fn test_finalize_persists_both() {
        let mut fixture = fixture();
        fixture.interpreter.finalize().unwrap();
        assert_eq!(fixture.model.saves(), 1);
        assert_eq!(fixture.notation.saves(), 1);
    }
}
