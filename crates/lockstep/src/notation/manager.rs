use log::{debug, trace, warn};

use lockstep_core::{
    geometry::{Bounds, LIFELINE_HEIGHT, LIFELINE_WIDTH},
    tree::{NodeId, NodeTree},
};

use crate::{
    layout::{self, Layout, LayoutError},
    notation::{NotationDiagram, View, ViewElement, ViewId},
    resource::{PersistError, Resource},
    semantic::{Interaction, Lifeline, MessageSet},
};

/// What the semantic removal of a message pair needs to know, captured
/// before the notation views are detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalContext {
    pub start_execution: String,
    pub end_execution: String,
    /// Diagram position of the call message.
    pub call_index: Option<usize>,
    /// Diagram position of the reply message.
    pub reply_index: Option<usize>,
}

/// Owns the [`NotationDiagram`] for the duration of a batch.
pub struct NotationManager {
    diagram: NotationDiagram,
    resource: Box<dyn Resource>,
}

impl NotationManager {
    pub fn new(diagram: NotationDiagram, resource: Box<dyn Resource>) -> Self {
        Self { diagram, resource }
    }

    pub fn diagram(&self) -> &NotationDiagram {
        &self.diagram
    }

    pub fn lifeline_view(&self, name: &str) -> Option<&View> {
        self.diagram
            .lifeline_view(name)
            .map(|id| self.diagram.view(id))
    }

    /// Adds the view of `lifeline` right of the rightmost lifeline view.
    /// An existing view of the same name is returned as is.
    pub fn add_lifeline_view(&mut self, tree: &NodeTree, lifeline: &Lifeline) -> ViewId {
        if let Some(existing) = self.diagram.lifeline_view(lifeline.name()) {
            debug!(lifeline = lifeline.name(); "Lifeline view already present");
            return existing;
        }

        let x = Layout::new(&self.diagram, tree).rightmost_lifeline_x();
        let compartment = self.diagram.compartment();
        let view = self.diagram.add_child(
            compartment,
            ViewElement::Lifeline {
                name: lifeline.name().to_string(),
            },
            Some(Bounds::new(x, 0, LIFELINE_WIDTH, LIFELINE_HEIGHT)),
        );
        debug!(lifeline = lifeline.name(), x; "Added lifeline view");
        view
    }

    /// Adds the start and end execution views of the call `node`, moving
    /// the views below out of the way and growing the enclosing executions
    /// and fragments.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when a lifeline view or an execution the new
    /// bounds depend on cannot be found. Both execution bounds are resolved
    /// before anything is inserted.
    pub fn add_message_view(
        &mut self,
        tree: &NodeTree,
        node: NodeId,
        messages: &MessageSet,
    ) -> Result<(), LayoutError> {
        let (caller, callee, start, end) = {
            let layout = Layout::new(&self.diagram, tree);
            (
                self.require_lifeline(messages.start.lifeline())?,
                self.require_lifeline(messages.end.lifeline())?,
                layout.execution_bounds(node, false)?,
                layout.execution_bounds(node, true)?,
            )
        };

        layout::shift_below(&mut self.diagram, start.y(), start.height());

        self.diagram.add_child(
            caller,
            ViewElement::Execution {
                name: messages.start.name().to_string(),
                start_message: messages.call.name().to_string(),
            },
            Some(start),
        );
        self.diagram.add_child(
            callee,
            ViewElement::Execution {
                name: messages.end.name().to_string(),
                start_message: messages.call.name().to_string(),
            },
            Some(end),
        );

        layout::propagate_ancestor_heights(&mut self.diagram, tree, node, start.height());
        self.add_fragment_views(tree, node, caller)?;

        debug!(message = messages.call.name(); "Message views added to notation");
        Ok(())
    }

    /// Removes the execution views of the call `node` and closes the gap
    /// they leave.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::ExecutionNotFound`] when either execution view
    /// cannot be found.
    pub fn remove_message_view(
        &mut self,
        tree: &NodeTree,
        node: NodeId,
        reply: NodeId,
        interaction: &Interaction,
    ) -> Result<RemovalContext, LayoutError> {
        let (start, end) = {
            let layout = Layout::new(&self.diagram, tree);
            (layout.require_start(node)?, layout.require_end(node)?)
        };
        let start_bounds = self.require_bounds(start)?;

        let context = RemovalContext {
            start_execution: self.element_name(start),
            end_execution: self.element_name(end),
            call_index: interaction.message_index(tree.node(node).edge().name()),
            reply_index: interaction.message_index(tree.node(reply).edge().name()),
        };

        layout::propagate_ancestor_heights(&mut self.diagram, tree, node, -start_bounds.height());
        self.diagram.detach(start);
        self.diagram.detach(end);
        layout::shift_below(&mut self.diagram, start_bounds.y(), -start_bounds.height());

        debug!(
            message = tree.node(node).edge().name(),
            start = context.start_execution.as_str(),
            end = context.end_execution.as_str();
            "Message views removed from notation"
        );
        Ok(context)
    }

    /// Detaches the view of the lifeline `name` with everything on it.
    pub fn remove_lifeline_view(&mut self, name: &str) {
        match self.diagram.lifeline_view(name) {
            Some(view) => {
                self.diagram.detach(view);
                debug!(lifeline = name; "Lifeline view removed");
            }
            None => warn!(lifeline = name; "No view to remove for lifeline"),
        }
    }

    /// Drops detached views, then serializes the diagram and saves it to
    /// the resource.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if serialization or the save fails.
    pub fn persist(&mut self) -> Result<(), PersistError> {
        self.diagram.compact();
        let contents = toml::to_string(&self.diagram)?;
        self.resource.save(&contents)?;
        trace!(resource = self.resource.name(); "Notation resource saved");
        Ok(())
    }

    pub fn resource_name(&self) -> &str {
        self.resource.name()
    }

    /// Creates or grows one view per fragment enclosing `node`, innermost
    /// first. A new enclosing fragment is sized around the one inside it.
    fn add_fragment_views(
        &mut self,
        tree: &NodeTree,
        node: NodeId,
        lifeline: ViewId,
    ) -> Result<(), LayoutError> {
        let fragments = tree.node(node).fragments();
        if fragments.is_empty() {
            return Ok(());
        }

        let execution = Layout::new(&self.diagram, tree)
            .start_bounds(node)
            .ok_or_else(|| LayoutError::ExecutionNotFound {
                message: tree.node(node).edge().name().to_string(),
                lifeline: self.element_name(lifeline),
            })?;

        let mut inner: Option<ViewId> = None;
        for fragment in fragments {
            let view = match self.diagram.fragment_view(fragment.name()) {
                Some(existing) => {
                    layout::update_fragment_size(&mut self.diagram, tree, existing, execution);
                    trace!(fragment = fragment.name(); "Fragment view grown");
                    existing
                }
                None => {
                    let bounds = {
                        let layout = Layout::new(&self.diagram, tree);
                        match inner {
                            Some(inner) => layout.combined_fragment_bounds(inner)?,
                            None => layout.fragment_bounds(node, lifeline)?,
                        }
                    };
                    let compartment = self.diagram.compartment();
                    let view = self.diagram.add_child(
                        compartment,
                        ViewElement::CombinedFragment {
                            name: fragment.name().to_string(),
                            operator: fragment.operator(),
                        },
                        Some(bounds),
                    );
                    debug!(fragment = fragment.name(), y = bounds.y(), height = bounds.height(); "Fragment view added");
                    view
                }
            };
            inner = Some(view);
        }
        Ok(())
    }

    fn require_lifeline(&self, name: &str) -> Result<ViewId, LayoutError> {
        self.diagram
            .lifeline_view(name)
            .ok_or_else(|| LayoutError::LifelineNotFound {
                name: name.to_string(),
            })
    }

    fn require_bounds(&self, view: ViewId) -> Result<Bounds, LayoutError> {
        self.diagram
            .bounds(view)
            .ok_or_else(|| LayoutError::MissingBounds {
                element: self.element_name(view),
            })
    }

    fn element_name(&self, view: ViewId) -> String {
        self.diagram
            .view(view)
            .element()
            .name()
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use lockstep_core::tree::{EdgeKind, FragmentDescriptor, FragmentOperator};

    use super::*;
    use crate::{resource::MemoryResource, semantic::SemanticManager};

    struct Fixture {
        semantic: SemanticManager,
        notation: NotationManager,
        resource: MemoryResource,
    }

    impl Fixture {
        fn new(tree: &NodeTree, lifelines: &[&str]) -> Self {
            let resource = MemoryResource::new("notation");
            let mut fixture = Self {
                semantic: SemanticManager::new(Interaction::new("demo"), Box::new(MemoryResource::new("model"))),
                notation: NotationManager::new(NotationDiagram::new("demo"), Box::new(resource.clone())),
                resource,
            };
            for name in lifelines {
                let lifeline = fixture.semantic.add_lifeline(name);
                fixture.notation.add_lifeline_view(tree, &lifeline);
            }
            fixture
        }

        fn add(&mut self, tree: &NodeTree, call: NodeId) {
            let reply = tree.reply_of(call).unwrap();
            let messages = self.semantic.add_message(tree, call, reply);
            self.notation.add_message_view(tree, call, &messages).unwrap();
        }

        fn start(&self, tree: &NodeTree, call: NodeId) -> Bounds {
            Layout::new(self.notation.diagram(), tree).start_bounds(call).unwrap()
        }

        fn end(&self, tree: &NodeTree, call: NodeId) -> Bounds {
            Layout::new(self.notation.diagram(), tree).end_bounds(call).unwrap()
        }
    }

    /// main -> B.load { B -> C.query }, main -> B.save
    fn nested_tree() -> (NodeTree, NodeId, NodeId, NodeId) {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let query = tree.add_call(load, "C", "query", EdgeKind::Normal);
        tree.add_reply(query, "queryReturn");
        tree.add_reply(load, "loadReturn");
        let save = tree.add_call(root, "B", "save", EdgeKind::Normal);
        tree.add_reply(save, "saveReturn");
        (tree, load, query, save)
    }

    #[test]
    fn test_lifeline_views_side_by_side() {
        let tree = NodeTree::new("L0", "main");
        let fixture = Fixture::new(&tree, &["L0", "L1", "L2"]);
        let xs: Vec<i32> = ["L0", "L1", "L2"]
            .iter()
            .filter_map(|name| fixture.notation.lifeline_view(name))
            .filter_map(View::bounds)
            .map(Bounds::x)
            .collect();
        assert_eq!(xs, vec![0, 150, 300]);
    }

    #[test]
    fn test_add_message_view_places_executions() {
        let (tree, load, _, _) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B", "C"]);
        fixture.add(&tree, load);

        assert_eq!(fixture.start(&tree, load), Bounds::new(42, 30, 16, 50));
        assert_eq!(fixture.end(&tree, load), Bounds::new(42, 35, 16, 40));

        let main = fixture.notation.diagram().lifeline_view("main").unwrap();
        let names: Vec<Option<&str>> = fixture
            .notation
            .diagram()
            .children(main)
            .iter()
            .map(|&view| fixture.notation.diagram().view(view).element().name())
            .collect();
        assert_eq!(names, vec![Some("load.start")]);
    }

    #[test]
    fn test_nested_call_grows_parent() {
        let (tree, load, query, _) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B", "C"]);
        fixture.add(&tree, load);
        fixture.add(&tree, query);

        assert_eq!(fixture.start(&tree, query), Bounds::new(42, 60, 16, 50));
        assert_eq!(fixture.start(&tree, load).height(), 100);
        assert_eq!(fixture.end(&tree, load).height(), 90);
        assert!(fixture.start(&tree, load).contains_vertically(fixture.start(&tree, query)));
    }

    #[test]
    fn test_second_child_grows_parent_to_150() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let first = tree.add_call(load, "C", "first", EdgeKind::Normal);
        tree.add_reply(first, "firstReturn");
        let second = tree.add_call(load, "C", "second", EdgeKind::Normal);
        tree.add_reply(second, "secondReturn");
        tree.add_reply(load, "loadReturn");

        let mut fixture = Fixture::new(&tree, &["main", "B", "C"]);
        fixture.add(&tree, load);
        fixture.add(&tree, first);
        assert_eq!(fixture.start(&tree, load).height(), 100);

        fixture.add(&tree, second);
        assert_eq!(fixture.start(&tree, second), Bounds::new(42, 140, 16, 50));
        assert_eq!(fixture.start(&tree, load).height(), 150);
    }

    #[test]
    fn test_insert_before_shifts_later_calls() {
        let (tree, load, query, save) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B", "C"]);
        fixture.add(&tree, load);
        fixture.add(&tree, save);
        assert_eq!(fixture.start(&tree, save).y(), 110);

        fixture.add(&tree, query);
        assert_eq!(fixture.start(&tree, save).y(), 160);
        assert_eq!(fixture.start(&tree, load).y(), 30);
    }

    #[test]
    fn test_remove_message_view_restores_layout() {
        let (tree, load, query, save) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B", "C"]);
        fixture.add(&tree, load);
        fixture.add(&tree, save);
        fixture.add(&tree, query);

        let reply = tree.reply_of(query).unwrap();
        let context = fixture
            .notation
            .remove_message_view(&tree, query, reply, fixture.semantic.interaction())
            .unwrap();

        assert_eq!(context.start_execution, "query.start");
        assert_eq!(context.end_execution, "query.end");
        assert_eq!(context.call_index, Some(1));
        assert_eq!(context.reply_index, Some(2));
        assert_eq!(fixture.start(&tree, load), Bounds::new(42, 30, 16, 50));
        assert_eq!(fixture.start(&tree, save).y(), 110);
    }

    #[test]
    fn test_remove_unknown_message_view() {
        let (tree, load, _, _) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B"]);
        let reply = tree.reply_of(load).unwrap();
        let result = fixture
            .notation
            .remove_message_view(&tree, load, reply, fixture.semantic.interaction());
        assert!(matches!(result, Err(LayoutError::ExecutionNotFound { .. })));
    }

    #[test]
    fn test_self_call_views() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let tick = tree.add_call(load, "B", "tick", EdgeKind::SelfCall);
        tree.add_reply(tick, "tickReturn");
        tree.add_reply(load, "loadReturn");

        let mut fixture = Fixture::new(&tree, &["main", "B"]);
        fixture.add(&tree, load);
        fixture.add(&tree, tick);

        assert_eq!(fixture.start(&tree, tick), Bounds::new(42, 60, 16, 50));
        assert_eq!(fixture.end(&tree, tick), Bounds::new(50, 65, 16, 40));
    }

    #[test]
    fn test_fragment_views() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        tree.add_fragment(load, FragmentDescriptor::new("retry", FragmentOperator::Loop));
        tree.add_fragment(load, FragmentDescriptor::new("guard", FragmentOperator::Opt));
        tree.add_reply(load, "loadReturn");

        let mut fixture = Fixture::new(&tree, &["main", "B"]);
        fixture.add(&tree, load);

        let diagram = fixture.notation.diagram();
        let retry = diagram.fragment_view("retry").and_then(|view| diagram.bounds(view));
        let guard = diagram.fragment_view("guard").and_then(|view| diagram.bounds(view));
        assert_eq!(retry, Some(Bounds::new(-50, 40, 300, 70)));
        assert_eq!(guard, Some(Bounds::new(-100, 30, 400, 100)));
    }

    #[test]
    fn test_existing_fragment_is_grown() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        tree.add_fragment(load, FragmentDescriptor::new("retry", FragmentOperator::Loop));
        tree.add_reply(load, "loadReturn");
        let save = tree.add_call(root, "B", "save", EdgeKind::Normal);
        tree.add_fragment(save, FragmentDescriptor::new("retry", FragmentOperator::Loop));
        tree.add_reply(save, "saveReturn");

        let mut fixture = Fixture::new(&tree, &["main", "B"]);
        fixture.add(&tree, load);
        fixture.add(&tree, save);

        let diagram = fixture.notation.diagram();
        let retry = diagram.fragment_view("retry").and_then(|view| diagram.bounds(view));
        assert_eq!(retry, Some(Bounds::new(-50, 40, 350, 140)));
    }

    #[test]
    fn test_remove_lifeline_view() {
        let tree = NodeTree::new("main", "main");
        let mut fixture = Fixture::new(&tree, &["main", "B"]);
        fixture.notation.remove_lifeline_view("B");
        fixture.notation.remove_lifeline_view("missing");

        assert!(fixture.notation.lifeline_view("B").is_none());
        assert!(fixture.notation.lifeline_view("main").is_some());
    }

    #[test]
    fn test_persist_round_trips() {
        let (tree, load, _, _) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B", "C"]);
        fixture.add(&tree, load);
        fixture.notation.persist().unwrap();

        let saved: NotationDiagram = toml::from_str(&fixture.resource.contents().unwrap()).unwrap();
        assert_eq!(&saved, fixture.notation.diagram());
    }

    #[test]
    fn test_persist_discards_removed_views() {
        let (tree, load, _, _) = nested_tree();
        let mut fixture = Fixture::new(&tree, &["main", "B"]);
        fixture.notation.persist().unwrap();
        let before = fixture.notation.diagram().view_count();
        let reply = tree.reply_of(load).unwrap();

        for _ in 0..3 {
            fixture.add(&tree, load);
            let context = fixture
                .notation
                .remove_message_view(&tree, load, reply, fixture.semantic.interaction())
                .unwrap();
            fixture.semantic.remove_message(&tree, load, reply, &context);
            fixture.notation.persist().unwrap();
        }

        let saved: NotationDiagram = toml::from_str(&fixture.resource.contents().unwrap()).unwrap();
        assert_eq!(saved.view_count(), before);
        assert_eq!(fixture.notation.diagram().view_count(), before);
    }
}
