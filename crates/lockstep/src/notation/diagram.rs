//! View tree of the notation model.
//!
//! Views are stored in an arena and linked by [`ViewId`]. The first view is
//! the lifeline compartment; its children are lifeline and combined-fragment
//! views, and a lifeline's children are its execution views.
//!
//! ```text
//! Compartment
//!  ├── Lifeline "main"
//!  │    └── Execution "load.start"
//!  ├── Lifeline "B"
//!  │    └── Execution "load.end"
//!  └── CombinedFragment "retry"
//! ```
//!
//! A loaded diagram is checked before use: the compartment comes first, and
//! every parent and child link points at an existing view that links back.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lockstep_core::{geometry::Bounds, tree::FragmentOperator};

/// Index of a [`View`] inside its [`NotationDiagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(usize);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// The model element a view is associated with, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewElement {
    Compartment,
    Lifeline {
        name: String,
    },
    Execution {
        name: String,
        start_message: String,
    },
    CombinedFragment {
        name: String,
        operator: FragmentOperator,
    },
}

impl ViewElement {
    /// Name of the associated element. The compartment has none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Compartment => None,
            Self::Lifeline { name }
            | Self::Execution { name, .. }
            | Self::CombinedFragment { name, .. } => Some(name),
        }
    }

    /// Name of the message that starts an execution.
    pub fn start_message(&self) -> Option<&str> {
        match self {
            Self::Execution { start_message, .. } => Some(start_message),
            _ => None,
        }
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    pub fn is_lifeline(&self) -> bool {
        matches!(self, Self::Lifeline { .. })
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, Self::CombinedFragment { .. })
    }
}

/// A node of the view tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<ViewId>,
    #[serde(default)]
    children: Vec<ViewId>,
    element: ViewElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<Bounds>,
}

impl View {
    pub fn element(&self) -> &ViewElement {
        &self.element
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }
}

/// A saved view tree that does not hold together.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("the first view must be the lifeline compartment")]
    MissingCompartment,

    #[error("{view} links to {target}, which is not part of the diagram")]
    DanglingLink { view: ViewId, target: ViewId },

    #[error("{view} and {other} disagree about their parent link")]
    InconsistentLink { view: ViewId, other: ViewId },

    #[error("{view} is its own ancestor")]
    Cycle { view: ViewId },
}

/// The notation model of one sequence diagram.
///
/// Detached views stay in the arena but are no longer reachable from the
/// compartment; [`NotationDiagram::compact`] drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDiagram")]
pub struct NotationDiagram {
    name: String,
    views: Vec<View>,
}

#[derive(Deserialize)]
struct RawDiagram {
    name: String,
    views: Vec<View>,
}

impl TryFrom<RawDiagram> for NotationDiagram {
    type Error = DiagramError;

    fn try_from(raw: RawDiagram) -> Result<Self, Self::Error> {
        let views = raw.views;
        match views.first() {
            Some(first) if first.parent.is_none() && first.element == ViewElement::Compartment => {}
            _ => return Err(DiagramError::MissingCompartment),
        }

        let contains = |id: ViewId| id.0 < views.len();
        for (index, view) in views.iter().enumerate() {
            let id = ViewId(index);
            if let Some(parent) = view.parent {
                if !contains(parent) {
                    return Err(DiagramError::DanglingLink { view: id, target: parent });
                }
                if !views[parent.0].children.contains(&id) {
                    return Err(DiagramError::InconsistentLink { view: id, other: parent });
                }
            }
            for &child in &view.children {
                if !contains(child) {
                    return Err(DiagramError::DanglingLink { view: id, target: child });
                }
                let listed = view.children.iter().filter(|&&other| other == child).count();
                if views[child.0].parent != Some(id) || listed > 1 {
                    return Err(DiagramError::InconsistentLink { view: id, other: child });
                }
            }
        }

        for (index, view) in views.iter().enumerate() {
            let mut current = view.parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if parent.0 == index || steps > views.len() {
                    return Err(DiagramError::Cycle { view: ViewId(index) });
                }
                current = views[parent.0].parent;
            }
        }

        Ok(Self {
            name: raw.name,
            views,
        })
    }
}

impl NotationDiagram {
    /// Creates a diagram holding only the lifeline compartment.
    pub fn new(name: impl Into<String>) -> Self {
        let compartment = View {
            parent: None,
            children: Vec::new(),
            element: ViewElement::Compartment,
            bounds: None,
        };
        Self {
            name: name.into(),
            views: vec![compartment],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compartment(&self) -> ViewId {
        ViewId(0)
    }

    /// Returns the view for `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this diagram.
    pub fn view(&self, id: ViewId) -> &View {
        &self.views[id.0]
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.view(id).children()
    }

    pub fn bounds(&self, id: ViewId) -> Option<Bounds> {
        self.view(id).bounds()
    }

    pub fn set_bounds(&mut self, id: ViewId, bounds: Bounds) {
        self.views[id.0].bounds = Some(bounds);
    }

    /// Applies `update` to the bounds of `id`, if it has any.
    pub fn update_bounds(&mut self, id: ViewId, update: impl FnOnce(Bounds) -> Bounds) {
        if let Some(bounds) = self.views[id.0].bounds {
            self.views[id.0].bounds = Some(update(bounds));
        }
    }

    /// Appends a new child view under `parent`.
    pub fn add_child(
        &mut self,
        parent: ViewId,
        element: ViewElement,
        bounds: Option<Bounds>,
    ) -> ViewId {
        let id = ViewId(self.views.len());
        self.views.push(View {
            parent: Some(parent),
            children: Vec::new(),
            element,
            bounds,
        });
        self.views[parent.0].children.push(id);
        id
    }

    /// Unlinks `id` (and with it its subtree) from its parent.
    pub fn detach(&mut self, id: ViewId) {
        if let Some(parent) = self.views[id.0].parent.take() {
            self.views[parent.0].children.retain(|&child| child != id);
        }
    }

    /// Whether `id` is still reachable from the compartment.
    pub fn is_attached(&self, id: ViewId) -> bool {
        let mut current = id;
        loop {
            if current == self.compartment() {
                return true;
            }
            match self.view(current).parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Lifeline views in compartment order.
    pub fn lifeline_views(&self) -> impl DoubleEndedIterator<Item = ViewId> + '_ {
        self.children(self.compartment())
            .iter()
            .copied()
            .filter(|&id| self.view(id).element().is_lifeline())
    }

    /// The view of the lifeline named `name`.
    pub fn lifeline_view(&self, name: &str) -> Option<ViewId> {
        self.lifeline_views()
            .find(|&id| self.view(id).element().name() == Some(name))
    }

    /// The view of the combined fragment named `name`.
    pub fn fragment_view(&self, name: &str) -> Option<ViewId> {
        self.children(self.compartment()).iter().copied().find(|&id| {
            let element = self.view(id).element();
            element.is_fragment() && element.name() == Some(name)
        })
    }

    /// Number of views in the arena, detached ones included.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Drops detached views and renumbers the rest in depth-first order.
    /// Every [`ViewId`] handed out before is invalidated.
    pub fn compact(&mut self) {
        let attached = self.attached_views();
        if attached.len() == self.views.len() {
            return;
        }

        let mut renumbered = vec![None; self.views.len()];
        for (index, old) in attached.iter().enumerate() {
            renumbered[old.0] = Some(ViewId(index));
        }
        let views = attached
            .iter()
            .map(|old| {
                let view = &self.views[old.0];
                View {
                    parent: view.parent.and_then(|parent| renumbered[parent.0]),
                    children: view
                        .children
                        .iter()
                        .filter_map(|child| renumbered[child.0])
                        .collect(),
                    element: view.element.clone(),
                    bounds: view.bounds,
                }
            })
            .collect();
        self.views = views;
    }

    /// Every view reachable from the compartment, depth first.
    pub fn attached_views(&self) -> Vec<ViewId> {
        let mut stack = vec![self.compartment()];
        let mut visited = Vec::new();
        while let Some(id) = stack.pop() {
            visited.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        visited
    }
}
