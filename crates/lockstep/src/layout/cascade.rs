//! Cascading geometry updates after an execution is inserted or removed.

use log::{debug, trace};

use lockstep_core::{
    geometry::{Bounds, FRAGMENT_MARGIN_PADDING},
    tree::{NodeId, NodeTree},
};

use crate::{
    layout::Layout,
    notation::{NotationDiagram, ViewId},
};

/// Grows the start and end executions of every ancestor of `node` by
/// `delta_height`, keeping them vertically around their descendants.
///
/// The walk stops at the root, or at the first ancestor whose executions
/// cannot be found.
pub fn propagate_ancestor_heights(
    diagram: &mut NotationDiagram,
    tree: &NodeTree,
    node: NodeId,
    delta_height: i32,
) {
    let mut targets: Vec<ViewId> = Vec::new();
    {
        let layout = Layout::new(diagram, tree);
        for ancestor in tree.ancestors(node) {
            if tree.parent(ancestor).is_none() {
                break;
            }
            let (Some(start), Some(end)) =
                (layout.execution_start(ancestor), layout.execution_end(ancestor))
            else {
                debug!(node:? = ancestor; "Ancestor executions not found, stopping height propagation");
                break;
            };
            targets.push(start);
            targets.push(end);
        }
    }

    for view in targets {
        diagram.update_bounds(view, |bounds| bounds.grow_height(delta_height));
    }
    trace!(node:? = node, delta_height; "Ancestor heights propagated");
}

/// Moves every combined fragment and execution whose top lies strictly below
/// `reference_y` by `delta_height`.
///
/// Views starting at or above the reference are left alone even when they
/// extend past it.
pub fn shift_below(diagram: &mut NotationDiagram, reference_y: i32, delta_height: i32) {
    let compartment = diagram.compartment();
    let mut candidates: Vec<ViewId> = Vec::new();
    for &child in diagram.children(compartment) {
        let element = diagram.view(child).element();
        if element.is_fragment() {
            candidates.push(child);
        } else if element.is_lifeline() {
            candidates.extend(
                diagram
                    .children(child)
                    .iter()
                    .copied()
                    .filter(|&view| diagram.view(view).element().is_execution()),
            );
        }
    }

    let mut moved = 0usize;
    for view in candidates {
        if diagram.bounds(view).is_some_and(|bounds| bounds.y() > reference_y) {
            diagram.update_bounds(view, |bounds| bounds.translate_y(delta_height));
            moved += 1;
        }
    }
    debug!(reference_y, delta_height, moved; "Shifted views below reference");
}

/// Stretches an existing fragment to the rightmost lifeline and grows it to
/// take in one more execution of `execution`'s height.
pub fn update_fragment_size(diagram: &mut NotationDiagram, tree: &NodeTree, fragment: ViewId, execution: Bounds) {
    let rightmost = Layout::new(diagram, tree).rightmost_lifeline_x();
    diagram.update_bounds(fragment, |bounds| {
        bounds
            .with_width(rightmost - bounds.x())
            .grow_height(execution.height() + FRAGMENT_MARGIN_PADDING)
    });
}
