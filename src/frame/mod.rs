//! Binary frame tree
//!
//! The managed rectangle is recursively halved into frames. A frame is either
//! a leaf that owns an ordered window stack, or an internal node with exactly
//! two children and no windows. Nodes live in an arena keyed by [`FrameId`];
//! the `children` pair is the only ownership path, while `parent` is a plain
//! id used for upward queries and never keeps anything alive.
//!
//! Window placement goes through each window's controller. A controller that
//! reports [`WindowError::HandleInvalid`] is recorded as stale; the caller
//! collects those with [`FrameTree::take_stale`] and routes them through the
//! removal path before the enclosing command completes.

pub mod navigation;

use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::geometry::{tiles_exactly, Axis, DecorationEdge, Rect};
use crate::identity::IdentityId;
use crate::window::{WindowError, WindowRef};

/// Arena key of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("{0} is already split")]
    AlreadySplit(FrameId),
    #[error("the root frame cannot be closed")]
    CannotCloseRoot,
    #[error("{0} is not a leaf")]
    NotALeaf(FrameId),
    #[error("sibling of {0} is split; close requires a leaf sibling")]
    SiblingNotLeaf(FrameId),
    #[error("unknown {0}")]
    UnknownFrame(FrameId),
    #[error("{window} is already in {frame}")]
    DuplicateWindow { window: IdentityId, frame: FrameId },
    #[error("{window} is not in {frame}")]
    WindowNotInFrame { window: IdentityId, frame: FrameId },
    #[error("frame tree inconsistent: {0}")]
    Inconsistent(String),
}

/// Thickness and placement of each frame's decoration strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationStyle {
    pub thickness: u32,
    pub edge: DecorationEdge,
}

impl Default for DecorationStyle {
    fn default() -> Self {
        Self {
            thickness: 24,
            edge: DecorationEdge::Top,
        }
    }
}

/// One entry of a frame's tab strip, in stack order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub title: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct FrameNode {
    id: FrameId,
    rect: Rect,
    split_axis: Option<Axis>,
    parent: Option<FrameId>,
    children: Option<[FrameId; 2]>,
    windows: Vec<WindowRef>,
    active_index: usize,
}

impl FrameNode {
    fn leaf(id: FrameId, rect: Rect, parent: Option<FrameId>) -> Self {
        Self {
            id,
            rect,
            split_axis: None,
            parent,
            children: None,
            windows: Vec::new(),
            active_index: 0,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn split_axis(&self) -> Option<Axis> {
        self.split_axis
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn children(&self) -> Option<[FrameId; 2]> {
        self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn windows(&self) -> &[WindowRef] {
        &self.windows
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_window(&self) -> Option<&WindowRef> {
        self.windows.get(self.active_index)
    }

    pub fn contains(&self, window: IdentityId) -> bool {
        self.windows.iter().any(|w| w.id() == window)
    }

    fn position(&self, window: IdentityId) -> Option<usize> {
        self.windows.iter().position(|w| w.id() == window)
    }
}

#[derive(Debug, Clone)]
pub struct FrameTree {
    nodes: HashMap<FrameId, FrameNode>,
    root: FrameId,
    next_id: u64,
    decoration: DecorationStyle,
    stale: Vec<WindowRef>,
}

impl FrameTree {
    pub fn new(root_rect: Rect, decoration: DecorationStyle) -> Self {
        let root = FrameId(1);
        let mut nodes = HashMap::new();
        nodes.insert(root, FrameNode::leaf(root, root_rect, None));
        Self {
            nodes,
            root,
            next_id: 2,
            decoration,
            stale: Vec::new(),
        }
    }

    pub fn root(&self) -> FrameId {
        self.root
    }

    pub fn root_rect(&self) -> Rect {
        self.nodes[&self.root].rect
    }

    pub fn node(&self, id: FrameId) -> Option<&FrameNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn decoration(&self) -> DecorationStyle {
        self.decoration
    }

    /// Area windows of `id` are placed into
    pub fn content_rect(&self, id: FrameId) -> Option<Rect> {
        self.nodes
            .get(&id)
            .map(|n| n.rect.decompose(self.decoration.thickness, self.decoration.edge).0)
    }

    /// Strip reserved for the tab bar of `id`
    pub fn decoration_rect(&self, id: FrameId) -> Option<Rect> {
        self.nodes
            .get(&id)
            .map(|n| n.rect.decompose(self.decoration.thickness, self.decoration.edge).1)
    }

    /// Leaves in spatial order (first child before second)
    pub fn leaves(&self) -> Vec<FrameId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes.get(&id).and_then(|n| n.children) {
                Some([first, second]) => {
                    stack.push(second);
                    stack.push(first);
                }
                None => out.push(id),
            }
        }
        out
    }

    pub fn window_count(&self) -> usize {
        self.nodes.values().map(|n| n.windows.len()).sum()
    }

    /// Leaf holding `window`, if any
    pub fn frame_of(&self, window: IdentityId) -> Option<FrameId> {
        self.nodes
            .values()
            .find(|n| n.contains(window))
            .map(|n| n.id)
    }

    /// Every window entry in the tree, in leaf order
    pub fn windows(&self) -> Vec<WindowRef> {
        self.leaves()
            .into_iter()
            .flat_map(|id| self.nodes[&id].windows.clone())
            .collect()
    }

    pub fn tabs(&self, id: FrameId) -> Vec<Tab> {
        self.nodes
            .get(&id)
            .map(|n| {
                n.windows
                    .iter()
                    .enumerate()
                    .map(|(i, w)| Tab {
                        title: w.title(),
                        active: i == n.active_index,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn leaf_mut(&mut self, id: FrameId) -> Result<&mut FrameNode, FrameError> {
        let node = self.nodes.get_mut(&id).ok_or(FrameError::UnknownFrame(id))?;
        if node.is_leaf() {
            Ok(node)
        } else {
            Err(FrameError::NotALeaf(id))
        }
    }

    fn alloc(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Halve a leaf along `axis`. Its windows move, in order, into the first
    /// child, which is returned as the new active frame.
    pub fn split(&mut self, id: FrameId, axis: Axis) -> Result<FrameId, FrameError> {
        let node = self.nodes.get(&id).ok_or(FrameError::UnknownFrame(id))?;
        if node.children.is_some() {
            return Err(FrameError::AlreadySplit(id));
        }
        let (first_rect, second_rect) = node.rect.halve(axis);
        let first = self.alloc();
        let second = self.alloc();

        let mut first_node = FrameNode::leaf(first, first_rect, Some(id));
        let second_node = FrameNode::leaf(second, second_rect, Some(id));

        let parent = self.nodes.get_mut(&id).ok_or(FrameError::UnknownFrame(id))?;
        first_node.windows = std::mem::take(&mut parent.windows);
        first_node.active_index = parent.active_index;
        parent.active_index = 0;
        parent.split_axis = Some(axis);
        parent.children = Some([first, second]);

        self.nodes.insert(first, first_node);
        self.nodes.insert(second, second_node);
        debug!("Split {} {:?} into {} and {}", id, axis, first, second);

        self.relayout(first);
        Ok(first)
    }

    /// Close a leaf. Its windows and its sibling's windows merge back into
    /// the parent, which becomes a leaf again and is returned as the new
    /// active frame.
    ///
    /// The sibling must itself be a leaf.
    pub fn close(&mut self, id: FrameId) -> Result<FrameId, FrameError> {
        let node = self.nodes.get(&id).ok_or(FrameError::UnknownFrame(id))?;
        let parent_id = node.parent.ok_or(FrameError::CannotCloseRoot)?;
        if !node.is_leaf() {
            return Err(FrameError::NotALeaf(id));
        }
        let [first, second] = self
            .nodes
            .get(&parent_id)
            .and_then(|p| p.children)
            .ok_or_else(|| FrameError::Inconsistent(format!("{} has no children", parent_id)))?;
        let sibling = if first == id { second } else { first };
        if !self.nodes.get(&sibling).is_some_and(FrameNode::is_leaf) {
            return Err(FrameError::SiblingNotLeaf(id));
        }

        // Both children are leaves and about to go; detach them whole.
        let first_node = self
            .nodes
            .remove(&first)
            .ok_or(FrameError::UnknownFrame(first))?;
        let second_node = self
            .nodes
            .remove(&second)
            .ok_or(FrameError::UnknownFrame(second))?;

        let closing = if first == id { &first_node } else { &second_node };
        let keep_active = closing
            .active_window()
            .or_else(|| {
                let other = if first == id { &second_node } else { &first_node };
                other.active_window()
            })
            .map(WindowRef::id);

        let mut merged = first_node.windows;
        merged.extend(second_node.windows);
        let active_index = keep_active
            .and_then(|w| merged.iter().position(|m| m.id() == w))
            .unwrap_or(0);

        let parent = self
            .nodes
            .get_mut(&parent_id)
            .ok_or(FrameError::UnknownFrame(parent_id))?;
        parent.children = None;
        parent.split_axis = None;
        parent.windows = merged;
        parent.active_index = active_index;
        debug!(
            "Closed {}; {} absorbed {} windows",
            id,
            parent_id,
            parent.windows.len()
        );

        self.relayout(parent_id);
        Ok(parent_id)
    }

    /// Append `window` to leaf `id` and place it in the leaf's content area.
    ///
    /// Returns `Ok(false)` without changes if the window is already there.
    pub fn add_window(&mut self, id: FrameId, window: WindowRef, focus: bool) -> Result<bool, FrameError> {
        let content = self
            .content_rect(id)
            .ok_or(FrameError::UnknownFrame(id))?;
        let node = self.leaf_mut(id)?;
        if node.contains(window.id()) {
            debug!("{} already in {}, ignoring add", window.id(), id);
            return Ok(false);
        }
        node.windows.push(window.clone());
        if focus {
            node.active_index = node.windows.len() - 1;
        }
        debug!("Added {} to {} (focus: {})", window.id(), id, focus);
        self.place(&window, content);
        Ok(true)
    }

    /// Remove `window` from leaf `id`. Returns false if it was not there.
    pub fn remove_window(&mut self, id: FrameId, window: IdentityId) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        let Some(pos) = node.position(window) else {
            return false;
        };
        node.windows.remove(pos);
        if node.windows.is_empty() {
            node.active_index = 0;
        } else if pos < node.active_index {
            node.active_index -= 1;
        } else if pos == node.active_index {
            // The next entry slid into `pos`; wrap like next_window would.
            node.active_index = pos % node.windows.len();
        }
        debug!("Removed {} from {}", window, id);
        true
    }

    /// Advance the active window of `id`, wrapping. Returns the new active window.
    pub fn next_window(&mut self, id: FrameId) -> Option<WindowRef> {
        let node = self.nodes.get_mut(&id)?;
        if node.windows.is_empty() {
            return None;
        }
        node.active_index = (node.active_index + 1) % node.windows.len();
        node.active_window().cloned()
    }

    pub fn previous_window(&mut self, id: FrameId) -> Option<WindowRef> {
        let node = self.nodes.get_mut(&id)?;
        if node.windows.is_empty() {
            return None;
        }
        let len = node.windows.len();
        node.active_index = (node.active_index + len - 1) % len;
        node.active_window().cloned()
    }

    /// Make `window` the active entry of `id`
    pub fn focus_window(&mut self, id: FrameId, window: IdentityId) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => match node.position(window) {
                Some(pos) => {
                    node.active_index = pos;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Transfer `window` from leaf `from` to leaf `to`.
    ///
    /// The window is added to the target before it is removed from the
    /// source, so a failure leaves it where it was.
    pub fn move_window(&mut self, window: &WindowRef, from: FrameId, to: FrameId) -> Result<(), FrameError> {
        let source = self.leaf_mut(from)?;
        if !source.contains(window.id()) {
            return Err(FrameError::WindowNotInFrame {
                window: window.id(),
                frame: from,
            });
        }
        if !self.add_window(to, window.clone(), true)? {
            return Err(FrameError::DuplicateWindow {
                window: window.id(),
                frame: to,
            });
        }
        self.remove_window(from, window.id());
        debug!("Moved {} from {} to {}", window.id(), from, to);
        Ok(())
    }

    /// Swap the entry for `old` in place for `replacement`, keeping its
    /// stack position. Returns the frame it happened in.
    pub fn replace_window(&mut self, old: IdentityId, replacement: WindowRef) -> Option<FrameId> {
        let frame = self.frame_of(old)?;
        let content = self.content_rect(frame)?;
        let node = self.nodes.get_mut(&frame)?;
        let pos = node.position(old)?;
        node.windows[pos] = replacement.clone();
        self.place(&replacement, content);
        Some(frame)
    }

    /// Give the root a new rectangle and recompute every descendant
    pub fn resize_root(&mut self, rect: Rect) {
        debug!("Resizing root {:?} -> {:?}", self.root_rect(), rect);
        self.layout_subtree(self.root, rect);
        for leaf in self.leaves() {
            self.relayout(leaf);
        }
    }

    fn layout_subtree(&mut self, id: FrameId, rect: Rect) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.rect = rect;
        if let (Some([first, second]), Some(axis)) = (node.children, node.split_axis) {
            let (a, b) = rect.halve(axis);
            self.layout_subtree(first, a);
            self.layout_subtree(second, b);
        }
    }

    /// Re-place every window of leaf `id` into its content area
    pub fn relayout(&mut self, id: FrameId) {
        let Some(content) = self.content_rect(id) else {
            return;
        };
        let windows = self.nodes[&id].windows.clone();
        for window in &windows {
            self.place(window, content);
        }
    }

    fn place(&mut self, window: &WindowRef, content: Rect) {
        match window.place(content) {
            Ok(()) => {}
            Err(WindowError::HandleInvalid) => self.mark_stale(window),
            Err(e) => warn!("Failed to place {}: {}", window.id(), e),
        }
    }

    pub(crate) fn mark_stale(&mut self, window: &WindowRef) {
        if !self.stale.contains(window) {
            debug!("{} reported an invalid handle", window.id());
            self.stale.push(window.clone());
        }
    }

    /// Windows whose controllers reported an invalid handle since the last call
    pub fn take_stale(&mut self) -> Vec<WindowRef> {
        std::mem::take(&mut self.stale)
    }

    /// Check every structural invariant of the tree
    pub fn validate(&self) -> Result<(), FrameError> {
        let fail = |msg: String| Err(FrameError::Inconsistent(msg));

        let root = self
            .nodes
            .get(&self.root)
            .ok_or_else(|| FrameError::Inconsistent("root missing".into()))?;
        if root.parent.is_some() {
            return fail(format!("root {} has a parent", self.root));
        }

        let mut reached = 0usize;
        let mut seen_windows = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self
                .nodes
                .get(&id)
                .ok_or_else(|| FrameError::Inconsistent(format!("{} missing", id)))?;
            reached += 1;

            match (node.children, node.split_axis) {
                (Some([a, b]), Some(axis)) => {
                    if !node.windows.is_empty() {
                        return fail(format!("internal {} holds windows", id));
                    }
                    let (ra, rb) = node.rect.halve(axis);
                    for (child, expected) in [(a, ra), (b, rb)] {
                        let c = self
                            .nodes
                            .get(&child)
                            .ok_or_else(|| FrameError::Inconsistent(format!("{} missing", child)))?;
                        if c.parent != Some(id) {
                            return fail(format!("{} does not point back to {}", child, id));
                        }
                        if c.rect != expected {
                            return fail(format!("{} rect {:?} != {:?}", child, c.rect, expected));
                        }
                    }
                    stack.push(a);
                    stack.push(b);
                }
                (None, None) => {
                    if node.windows.is_empty() {
                        if node.active_index != 0 {
                            return fail(format!("empty {} has active index {}", id, node.active_index));
                        }
                    } else if node.active_index >= node.windows.len() {
                        return fail(format!("{} active index out of range", id));
                    }
                    for w in &node.windows {
                        if !seen_windows.insert(w.id()) {
                            return fail(format!("{} appears in more than one place", w.id()));
                        }
                    }
                }
                _ => return fail(format!("{} has children without an axis or vice versa", id)),
            }
        }
        if reached != self.nodes.len() {
            return fail(format!(
                "{} frames unreachable from root",
                self.nodes.len() - reached
            ));
        }

        let rects: Vec<Rect> = self.leaves().iter().map(|l| self.nodes[l].rect).collect();
        if !tiles_exactly(&root.rect, &rects) {
            return fail("leaf rectangles do not tile the root".into());
        }
        Ok(())
    }
}


#[cfg(test)]
mod property_tests;
