//! Directional adjacency over the frame tree.
//!
//! Ascend from the origin leaf until an ancestor is split along the axis of
//! travel with the origin's subtree not already on the far edge, step into
//! the sibling subtree, then descend toward the boundary just crossed.

use super::{FrameId, FrameTree};
use crate::geometry::{Axis, Direction, Rect};

/// Leaf adjacent to `origin` in `direction`, or `None` at the screen edge
pub fn resolve(tree: &FrameTree, origin: FrameId, direction: Direction) -> Option<FrameId> {
    let origin_rect = tree.node(origin)?.rect();
    let mut current = origin;

    let target = loop {
        let parent_id = tree.node(current)?.parent()?;
        let parent = tree.node(parent_id)?;
        let [first, second] = parent.children()?;

        if parent.split_axis() == Some(direction.axis()) {
            let from_first = first == current;
            match (direction.toward_first(), from_first) {
                (true, false) => break first,
                (false, true) => break second,
                _ => {}
            }
        }
        current = parent_id;
    };

    Some(descend(tree, target, direction, &origin_rect))
}

/// Walk down to a leaf, at each split picking the child that borders the
/// edge we entered through, or for cross splits the child facing the
/// origin's center (ties go to the first child).
fn descend(tree: &FrameTree, mut id: FrameId, direction: Direction, origin: &Rect) -> FrameId {
    while let Some(node) = tree.node(id) {
        let (Some([first, second]), Some(axis)) = (node.children(), node.split_axis()) else {
            break;
        };
        id = if axis == direction.axis() {
            // Moving left/up we enter through the subtree's far side.
            if direction.toward_first() {
                second
            } else {
                first
            }
        } else {
            let probe = cross_center(origin, direction);
            match tree.node(first) {
                Some(f) if probe <= f.rect().cross_span(direction).1 => first,
                _ => second,
            }
        };
    }
    id
}

fn cross_center(rect: &Rect, direction: Direction) -> i64 {
    let (cx, cy) = rect.center();
    match direction.axis() {
        Axis::Vertical => cy,
        Axis::Horizontal => cx,
    }
}
