//! Incremental layout of the notation model.
//!
//! [`Layout`] answers geometry queries against the current view tree and the
//! reference node tree without holding any state of its own. The mutating
//! cascades that keep the diagram consistent after an insertion or removal
//! live in [`cascade`].
//!
//! Execution bounds are relative to their lifeline view horizontally and
//! absolute vertically. A call opens its *start* execution on the caller's
//! lifeline and its *end* execution on the callee's lifeline; both record the
//! call message as their start message.

pub mod cascade;

use log::{debug, trace};
use thiserror::Error;

use lockstep_core::{
    geometry::{
        Bounds, END_HEIGHT, END_Y_OFFSET, EXECUTION_HALF_WIDTH, EXECUTION_WIDTH,
        FRAGMENT_MARGIN_NESTED, FRAGMENT_MARGIN_PADDING, FRAGMENT_MARGIN_SIDE,
        FRAGMENT_MARGIN_SMALL, FRAGMENT_MARGIN_WIDE, LIFELINE_SPACING, ROOT_Y, ROW_GAP,
        SELF_OFFSET, START_HEIGHT,
    },
    tree::{NodeId, NodeTree},
};

use crate::notation::{NotationDiagram, ViewId};

pub use cascade::{propagate_ancestor_heights, shift_below, update_fragment_size};

/// Geometry lookups that could not be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no execution started by `{message}` found on lifeline `{lifeline}` or its fallbacks")]
    ExecutionNotFound { message: String, lifeline: String },

    #[error("no view for lifeline `{name}`")]
    LifelineNotFound { name: String },

    #[error("view `{element}` has no bounds")]
    MissingBounds { element: String },
}

/// Read-only layout queries over a notation diagram and the node tree it
/// mirrors.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    diagram: &'a NotationDiagram,
    tree: &'a NodeTree,
}

impl<'a> Layout<'a> {
    pub fn new(diagram: &'a NotationDiagram, tree: &'a NodeTree) -> Self {
        Self { diagram, tree }
    }

    /// The start execution of `node`, searched on the caller's lifeline.
    ///
    /// Falls back to the left sibling, then to the parent, when the lifeline
    /// carries no execution started by the node's message. The root has no
    /// caller and therefore no start execution.
    pub fn execution_start(&self, node: NodeId) -> Option<ViewId> {
        let mut current = node;
        loop {
            let parent = self.tree.parent(current)?;
            let lifeline = self.diagram.lifeline_view(self.tree.node(parent).name())?;
            let message = self.tree.node(current).edge().name();
            if let Some(found) = self.find_execution(lifeline, message, 0) {
                return Some(found);
            }
            trace!(message, node:? = current; "Start execution not on lifeline, falling back");
            current = self.tree.left_sibling(current).unwrap_or(parent);
        }
    }

    /// The end execution of `node`, searched on the node's own lifeline.
    ///
    /// A self call opens both executions on the same lifeline under the same
    /// message; the first match is its start, so the end is the second one.
    /// Falls back like [`Layout::execution_start`].
    pub fn execution_end(&self, node: NodeId) -> Option<ViewId> {
        let mut current = node;
        loop {
            let current_node = self.tree.node(current);
            let lifeline = self.diagram.lifeline_view(current_node.name())?;
            let skip = usize::from(current_node.edge().is_self());
            if let Some(found) = self.find_execution(lifeline, current_node.edge().name(), skip) {
                return Some(found);
            }
            trace!(message = current_node.edge().name(), node:? = current; "End execution not on lifeline, falling back");
            current = self
                .tree
                .left_sibling(current)
                .or_else(|| self.tree.parent(current))?;
        }
    }

    /// Like [`Layout::execution_start`], failing when the whole fallback chain
    /// is exhausted.
    pub fn require_start(&self, node: NodeId) -> Result<ViewId, LayoutError> {
        self.execution_start(node)
            .ok_or_else(|| self.not_found(node, self.caller_name(node)))
    }

    /// Like [`Layout::execution_end`], failing when the whole fallback chain
    /// is exhausted.
    pub fn require_end(&self, node: NodeId) -> Result<ViewId, LayoutError> {
        self.execution_end(node)
            .ok_or_else(|| self.not_found(node, self.tree.node(node).name()))
    }

    pub fn start_bounds(&self, node: NodeId) -> Option<Bounds> {
        self.execution_start(node)
            .and_then(|view| self.diagram.bounds(view))
    }

    pub fn end_bounds(&self, node: NodeId) -> Option<Bounds> {
        self.execution_end(node)
            .and_then(|view| self.diagram.bounds(view))
    }

    fn require_start_bounds(&self, node: NodeId) -> Result<Bounds, LayoutError> {
        let view = self.require_start(node)?;
        self.view_bounds(view)
    }

    /// Horizontal position of a new execution of `node`, relative to its
    /// lifeline.
    ///
    /// With a left sibling the execution aligns with the sibling's; a self
    /// call is offset to the right of the sibling's start. Without one it is
    /// centered on the lifeline.
    pub fn insertion_x(&self, node: NodeId, is_end: bool) -> Result<i32, LayoutError> {
        let current = self.tree.node(node);
        let is_self = current.edge().is_self();

        if let Some(sibling) = self.tree.left_sibling(node) {
            if is_self {
                return Ok(self.require_start_bounds(sibling)?.x() + SELF_OFFSET);
            }
            if !is_end {
                return Ok(self.require_start_bounds(sibling)?.x());
            }
            if let Some(bounds) = self.end_bounds(sibling) {
                return Ok(bounds.x());
            }
            debug!(message = current.edge().name(); "Sibling has no end execution, centering on lifeline");
        }

        let lifeline_name = if is_end {
            current.name()
        } else {
            self.caller_name(node)
        };
        let lifeline = self.lifeline(lifeline_name)?;
        let width = self.view_bounds(lifeline)?.width();

        if is_self && is_end {
            Ok(width / 2)
        } else {
            Ok(width / 2 - EXECUTION_HALF_WIDTH)
        }
    }

    /// Vertical position and height of a new execution of `node`.
    ///
    /// A sibling places it one row below the sibling's start execution, a
    /// parent one row gap below the parent's start. End executions are
    /// shorter and sit slightly lower than the matching start.
    pub fn insertion_y_and_height(&self, node: NodeId, is_end: bool) -> Result<(i32, i32), LayoutError> {
        let sibling = self.tree.left_sibling(node);
        let parent = self.tree.parent(node);

        let y = match (sibling, parent) {
            (None, None) => return Ok((ROOT_Y, START_HEIGHT)),
            (Some(sibling), _) => {
                let bounds = self.require_start_bounds(sibling)?;
                bounds.y() + bounds.height() + ROW_GAP
            }
            (None, Some(parent)) => self
                .start_bounds(parent)
                .map_or(ROOT_Y, |bounds| bounds.y() + ROW_GAP),
        };

        if is_end {
            Ok((y + END_Y_OFFSET, END_HEIGHT))
        } else {
            Ok((y, START_HEIGHT))
        }
    }

    /// Full bounds of a new start (or end) execution of `node`.
    pub fn execution_bounds(&self, node: NodeId, is_end: bool) -> Result<Bounds, LayoutError> {
        let x = self.insertion_x(node, is_end)?;
        let (y, height) = self.insertion_y_and_height(node, is_end)?;
        let bounds = Bounds::new(x, y, EXECUTION_WIDTH, height);
        debug!(
            message = self.tree.node(node).edge().name(),
            is_end,
            x,
            y,
            height;
            "Computed execution bounds"
        );
        Ok(bounds)
    }

    /// Bounds of a new innermost fragment around the start execution of
    /// `node`, spanning from just left of `lifeline` to the rightmost
    /// lifeline.
    pub fn fragment_bounds(&self, node: NodeId, lifeline: ViewId) -> Result<Bounds, LayoutError> {
        let execution = self.require_start_bounds(node)?;
        let lifeline_bounds = self.view_bounds(lifeline)?;

        Ok(Bounds::new(
            lifeline_bounds.x() - FRAGMENT_MARGIN_SIDE,
            execution.y() + lifeline_bounds.y() + FRAGMENT_MARGIN_SMALL,
            self.rightmost_lifeline_x() - lifeline_bounds.x(),
            execution.height() + FRAGMENT_MARGIN_PADDING,
        ))
    }

    /// Bounds of a new fragment enclosing the existing `fragment` view.
    pub fn combined_fragment_bounds(&self, fragment: ViewId) -> Result<Bounds, LayoutError> {
        let inner = self.view_bounds(fragment)?;
        Ok(Bounds::new(
            inner.x() - FRAGMENT_MARGIN_SIDE,
            inner.y() - FRAGMENT_MARGIN_SMALL,
            inner.width() + FRAGMENT_MARGIN_WIDE,
            inner.height() + FRAGMENT_MARGIN_NESTED,
        ))
    }

    /// Position for the next lifeline view: right of the rightmost lifeline
    /// that has bounds, or `0` when there is none.
    pub fn rightmost_lifeline_x(&self) -> i32 {
        self.diagram
            .lifeline_views()
            .rev()
            .find_map(|view| self.diagram.bounds(view))
            .map_or(0, |bounds| bounds.x() + LIFELINE_SPACING)
    }

    fn find_execution(&self, lifeline: ViewId, message: &str, skip: usize) -> Option<ViewId> {
        self.diagram
            .children(lifeline)
            .iter()
            .copied()
            .filter(|&child| self.diagram.view(child).element().start_message() == Some(message))
            .nth(skip)
    }

    fn lifeline(&self, name: &str) -> Result<ViewId, LayoutError> {
        self.diagram
            .lifeline_view(name)
            .ok_or_else(|| LayoutError::LifelineNotFound {
                name: name.to_string(),
            })
    }

    fn view_bounds(&self, view: ViewId) -> Result<Bounds, LayoutError> {
        self.diagram
            .bounds(view)
            .ok_or_else(|| LayoutError::MissingBounds {
                element: self
                    .diagram
                    .view(view)
                    .element()
                    .name()
                    .unwrap_or("compartment")
                    .to_string(),
            })
    }

    fn caller_name(&self, node: NodeId) -> &'a str {
        let tree = self.tree;
        tree.parent(node)
            .map_or_else(|| tree.node(node).name(), |parent| tree.node(parent).name())
    }

    fn not_found(&self, node: NodeId, lifeline: &str) -> LayoutError {
        LayoutError::ExecutionNotFound {
            message: self.tree.node(node).edge().name().to_string(),
            lifeline: lifeline.to_string(),
        }
    }
}
