use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::frame::{DecorationStyle, FrameId, FrameTree, Tab};
use crate::geometry::Rect;
use crate::identity::IdentityId;
use crate::window::WindowRef;

/// Frame tree plus focus state owned by one processor
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(super) tree: FrameTree,
    pub(super) active: FrameId,
    pub(super) locations: HashMap<IdentityId, FrameId>,
}

impl Workspace {
    pub fn new(root: Rect, decoration: DecorationStyle) -> Self {
        let tree = FrameTree::new(root, decoration);
        let active = tree.root();
        Self {
            tree,
            active,
            locations: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn active_frame(&self) -> FrameId {
        self.active
    }

    pub fn root_frame(&self) -> FrameId {
        self.tree.root()
    }

    pub fn frame_containing(&self, identity: IdentityId) -> Option<FrameId> {
        self.locations.get(&identity).copied()
    }

    pub fn tabs_for(&self, frame: FrameId) -> Vec<Tab> {
        self.tree.tabs(frame)
    }

    pub fn active_window(&self) -> Option<&WindowRef> {
        self.tree.node(self.active).and_then(|n| n.active_window())
    }

    pub fn leaves(&self) -> Vec<FrameId> {
        self.tree.leaves()
    }

    pub fn window_count(&self) -> usize {
        self.tree.window_count()
    }

    /// Rebuild the identity -> frame index from the tree
    pub(super) fn reindex(&mut self) {
        self.locations.clear();
        for leaf in self.tree.leaves() {
            if let Some(node) = self.tree.node(leaf) {
                for window in node.windows() {
                    self.locations.insert(window.id(), leaf);
                }
            }
        }
    }

    /// Presentation-layer view of every leaf
    pub fn report(&self) -> LayoutReport {
        let frames = self
            .tree
            .leaves()
            .into_iter()
            .filter_map(|id| {
                let node = self.tree.node(id)?;
                Some(FrameReport {
                    id,
                    rect: node.rect(),
                    content: self.tree.content_rect(id)?,
                    active_index: node.active_index(),
                    tabs: self.tree.tabs(id),
                })
            })
            .collect();
        LayoutReport {
            root: self.tree.root_rect(),
            active: self.active,
            frames,
        }
    }
}

/// Serializable summary of a workspace, leaf by leaf
#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub root: Rect,
    pub active: FrameId,
    pub frames: Vec<FrameReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub id: FrameId,
    pub rect: Rect,
    pub content: Rect,
    pub active_index: usize,
    pub tabs: Vec<Tab>,
}

/// Read-only handle onto the latest completed workspace state
#[derive(Debug, Clone)]
pub struct WorkspaceView {
    receiver: watch::Receiver<Arc<Workspace>>,
}

impl WorkspaceView {
    pub(super) fn new(receiver: watch::Receiver<Arc<Workspace>>) -> Self {
        Self { receiver }
    }

    /// State after the most recently completed command
    pub fn snapshot(&self) -> Arc<Workspace> {
        self.receiver.borrow().clone()
    }

    /// Wait until another command completes. Errors once the processor is gone.
    pub async fn changed(&mut self) -> Result<Arc<Workspace>, watch::error::RecvError> {
        self.receiver.changed().await?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    pub fn active_frame(&self) -> FrameId {
        self.receiver.borrow().active_frame()
    }

    pub fn root_frame(&self) -> FrameId {
        self.receiver.borrow().root_frame()
    }

    pub fn frame_containing(&self, identity: IdentityId) -> Option<FrameId> {
        self.receiver.borrow().frame_containing(identity)
    }

    pub fn tabs_for(&self, frame: FrameId) -> Vec<Tab> {
        self.receiver.borrow().tabs_for(frame)
    }
}
