//! Geometric primitives for notation views.
//!
//! Notation views carry integer rectangles, the same way the persisted
//! diagram format stores them. Execution bounds are relative to the
//! lifeline view that owns them, lifeline and fragment bounds are relative
//! to the lifeline compartment.
//!
//! # Coordinate System
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! - **Origin**: Top-left corner at `(0, 0)`
//! - **Y-axis**: Increases downward, so "below" means a greater `y`

use serde::{Deserialize, Serialize};

/// Horizontal distance between two neighbouring lifelines.
pub const LIFELINE_SPACING: i32 = 150;

/// Width of a freshly created lifeline view.
pub const LIFELINE_WIDTH: i32 = 100;

/// Height of a freshly created lifeline view.
pub const LIFELINE_HEIGHT: i32 = 400;

/// Top offset of an execution placed with neither sibling nor parent.
pub const ROOT_Y: i32 = 30;

/// Vertical gap between an execution and the one placed after it.
pub const ROW_GAP: i32 = 30;

/// Height of a start execution (on the caller's lifeline).
pub const START_HEIGHT: i32 = 50;

/// Height of an end execution (on the callee's lifeline).
pub const END_HEIGHT: i32 = 40;

/// An end execution sits this far below its start execution.
pub const END_Y_OFFSET: i32 = 5;

/// Half of [`EXECUTION_WIDTH`], used to center executions on a lifeline.
pub const EXECUTION_HALF_WIDTH: i32 = 8;

/// Width of an execution view.
pub const EXECUTION_WIDTH: i32 = 16;

/// Horizontal nudge applied to self-call executions.
pub const SELF_OFFSET: i32 = 7;

/// Fragment margins, see `fragment_bounds` and `combined_fragment_bounds`.
pub const FRAGMENT_MARGIN_SMALL: i32 = 10;
pub const FRAGMENT_MARGIN_PADDING: i32 = 20;
pub const FRAGMENT_MARGIN_NESTED: i32 = 30;
pub const FRAGMENT_MARGIN_SIDE: i32 = 50;
pub const FRAGMENT_MARGIN_WIDE: i32 = 100;

/// A rectangle attached to a notation view.
///
/// # Examples
///
/// ```
/// # use lockstep_core::geometry::Bounds;
/// let bounds = Bounds::new(10, 30, 16, 50);
/// assert_eq!(bounds.max_y(), 80);
///
/// let moved = bounds.translate_y(50);
/// assert_eq!(moved.y(), 80);
/// assert_eq!(moved.height(), 50);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Bounds {
    /// Creates bounds from the top-left corner and a size.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn x(self) -> i32 {
        self.x
    }

    pub fn y(self) -> i32 {
        self.y
    }

    pub fn width(self) -> i32 {
        self.width
    }

    pub fn height(self) -> i32 {
        self.height
    }

    /// Top edge, same as [`Bounds::y`].
    pub fn min_y(self) -> i32 {
        self.y
    }

    /// Bottom edge.
    pub fn max_y(self) -> i32 {
        self.y + self.height
    }

    /// Returns a copy with the x-coordinate replaced.
    pub fn with_x(mut self, x: i32) -> Self {
        self.x = x;
        self
    }

    /// Returns a copy with the y-coordinate replaced.
    pub fn with_y(mut self, y: i32) -> Self {
        self.y = y;
        self
    }

    /// Returns a copy with the width replaced.
    pub fn with_width(mut self, width: i32) -> Self {
        self.width = width;
        self
    }

    /// Returns a copy with the height replaced.
    pub fn with_height(mut self, height: i32) -> Self {
        self.height = height;
        self
    }

    /// Moves the rectangle vertically by `delta`.
    pub fn translate_y(self, delta: i32) -> Self {
        self.with_y(self.y + delta)
    }

    /// Grows (or shrinks, for a negative `delta`) the height by `delta`.
    pub fn grow_height(self, delta: i32) -> Self {
        self.with_height(self.height + delta)
    }

    /// Checks whether `other` lies within this rectangle's vertical extent.
    ///
    /// Edges are inclusive.
    pub fn contains_vertically(self, other: Bounds) -> bool {
        self.min_y() <= other.min_y() && other.max_y() <= self.max_y()
    }
}
