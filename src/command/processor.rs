//! The drain loop
//!
//! `CommandProcessor` owns the workspace outright. Nothing else can reach the
//! tree mutably, so commands cannot interleave: each one runs to completion,
//! is followed by the bookkeeping passes below, and only then is the new
//! state published.

use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};

use super::{Command, CommandError, CommandQueue, Cycle, Workspace, WorkspaceView};
use crate::config::FrameConfig;
use crate::frame::{navigation, FrameId, FrameNode, FrameTree};
use crate::geometry::Rect;
use crate::identity::{Completion, WindowRegistry};
use crate::window::{WindowError, WindowRef};

/// Running totals kept by a processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub executed: u64,
    pub failed: u64,
    pub stale_removed: u64,
    pub recoveries: u64,
}

pub struct CommandProcessor {
    workspace: Workspace,
    registry: Arc<WindowRegistry>,
    receiver: mpsc::UnboundedReceiver<Command>,
    draining: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    publisher: watch::Sender<Arc<Workspace>>,
    focus_new_windows: bool,
    follow_moved_window: bool,
    stats: ProcessorStats,
}

impl CommandProcessor {
    /// Create a processor over a fresh tree covering `root`, plus the queue
    /// handle producers use to reach it.
    pub fn new(root: Rect, registry: Arc<WindowRegistry>, config: &FrameConfig) -> (Self, CommandQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let draining = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let workspace = Workspace::new(root, config.decoration());
        let (publisher, _) = watch::channel(Arc::new(workspace.clone()));

        let processor = Self {
            workspace,
            registry,
            receiver,
            draining: draining.clone(),
            pending: pending.clone(),
            idle: idle.clone(),
            publisher,
            focus_new_windows: config.focus_new_windows,
            follow_moved_window: config.follow_moved_window,
            stats: ProcessorStats::default(),
        };
        let queue = CommandQueue {
            sender,
            draining,
            pending,
            idle,
        };
        (processor, queue)
    }

    /// Read-only handle that follows every completed command
    pub fn view(&self) -> WorkspaceView {
        WorkspaceView::new(self.publisher.subscribe())
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    #[cfg(test)]
    pub(super) fn force_active(&mut self, frame: FrameId) {
        self.workspace.active = frame;
    }

    /// Drain commands until every queue handle has been dropped.
    ///
    /// Yields to the runtime between commands, never inside one.
    pub async fn run(mut self) -> ProcessorStats {
        info!("🎬 Command processor started");
        while let Some(command) = self.receiver.recv().await {
            self.draining.store(true, Ordering::Release);
            self.execute_one(command);
            while let Ok(next) = self.receiver.try_recv() {
                tokio::task::yield_now().await;
                self.execute_one(next);
            }
            self.draining.store(false, Ordering::Release);
        }
        info!(
            "🛑 Command processor finished ({} executed, {} failed)",
            self.stats.executed, self.stats.failed
        );
        self.stats
    }

    /// Run everything currently queued without awaiting. Returns how many
    /// commands ran.
    pub fn drain_pending(&mut self) -> usize {
        let mut ran = 0;
        self.draining.store(true, Ordering::Release);
        while let Ok(command) = self.receiver.try_recv() {
            self.execute_one(command);
            ran += 1;
        }
        self.draining.store(false, Ordering::Release);
        ran
    }

    fn execute_one(&mut self, command: Command) {
        let name = command.name();
        debug!("Executing {}", name);
        match self.apply(command) {
            Ok(()) => self.stats.executed += 1,
            Err(e) => {
                self.stats.failed += 1;
                warn!("Dropped {}: {}", name, e);
            }
        }

        self.reconcile_identities();
        self.remove_stale();
        self.audit();
        self.workspace.reindex();

        self.publisher.send_replace(Arc::new(self.workspace.clone()));
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn apply(&mut self, command: Command) -> Result<(), CommandError> {
        let ws = &mut self.workspace;
        match command {
            Command::Split(axis) => {
                ws.active = ws.tree.split(ws.active, axis)?;
            }
            Command::CloseFrame => {
                ws.active = ws.tree.close(ws.active)?;
            }
            Command::Navigate(direction) => {
                let target = navigation::resolve(&ws.tree, ws.active, direction)
                    .ok_or(CommandError::NoAdjacentFrame(direction))?;
                ws.active = target;
                if let Some(window) = ws.active_window().cloned() {
                    raise(&mut ws.tree, &window);
                }
            }
            Command::MoveWindow(direction) => {
                let window = ws.active_window().cloned().ok_or(CommandError::NoActiveWindow)?;
                let target = navigation::resolve(&ws.tree, ws.active, direction)
                    .ok_or(CommandError::NoAdjacentFrame(direction))?;
                ws.tree.move_window(&window, ws.active, target)?;
                if self.follow_moved_window {
                    ws.active = target;
                }
            }
            Command::CycleWindow(cycle) => {
                let window = match cycle {
                    Cycle::Forward => ws.tree.next_window(ws.active),
                    Cycle::Backward => ws.tree.previous_window(ws.active),
                }
                .ok_or(CommandError::NoActiveWindow)?;
                raise(&mut ws.tree, &window);
            }
            Command::AddWindow(window) => {
                if !window.identity().is_valid() {
                    return Err(CommandError::InvalidIdentity(window.id()));
                }
                match ws.tree.frame_of(window.id()) {
                    Some(frame) if frame != ws.active => {
                        return Err(CommandError::AlreadyTracked {
                            window: window.id(),
                            frame,
                        });
                    }
                    _ => {
                        ws.tree.add_window(ws.active, window, true)?;
                    }
                }
            }
            Command::RemoveWindow(window) => {
                let frame = ws
                    .tree
                    .frame_of(window.id())
                    .ok_or(CommandError::UntrackedWindow(window.id()))?;
                ws.tree.remove_window(frame, window.id());
            }
            Command::FocusWindow(window) => {
                let frame = ws
                    .tree
                    .frame_of(window.id())
                    .ok_or(CommandError::UntrackedWindow(window.id()))?;
                ws.tree.focus_window(frame, window.id());
                ws.active = frame;
                raise(&mut ws.tree, &window);
            }
            Command::WindowAppeared(window) => {
                if !window.identity().is_valid() {
                    return Err(CommandError::InvalidIdentity(window.id()));
                }
                // Already placed: the platform handed us a fresh controller
                if let Some(frame) = ws.tree.replace_window(window.id(), window.clone()) {
                    debug!("Refreshed controller for {} in {}", window.id(), frame);
                } else {
                    ws.tree.add_window(ws.active, window, self.focus_new_windows)?;
                }
            }
            Command::WindowDisappeared(identity) => {
                match ws.tree.frame_of(identity.id()) {
                    Some(frame) => {
                        ws.tree.remove_window(frame, identity.id());
                    }
                    None => debug!("{} already gone from every frame", identity.id()),
                }
                self.registry.unregister(&identity);
            }
            Command::WindowIdentityCompleted {
                identity,
                surface_id,
            } => match self.registry.complete_identity(&identity, surface_id) {
                Completion::Invalid => return Err(CommandError::InvalidIdentity(identity.id())),
                Completion::Merged { retired, survivor } => {
                    info!("{} turned out to be {}", retired.id(), survivor.id());
                }
                Completion::Upgraded(_) | Completion::AlreadyComplete(_) => {}
            },
            Command::WindowHandleChanged { handle, identity } => {
                if !identity.is_valid() {
                    return Err(CommandError::InvalidIdentity(identity.id()));
                }
                self.registry.update_handle(handle, &identity);
            }
            Command::ScreenChanged(rect) => {
                if !rect.is_addressable() {
                    return Err(CommandError::UnaddressableScreen(rect));
                }
                info!("Screen geometry changed to {}x{} at ({}, {})", rect.width, rect.height, rect.x, rect.y);
                ws.tree.resize_root(rect);
            }
        }
        Ok(())
    }

    /// Swap entries whose identity was merged away for the surviving identity,
    /// or drop them when the survivor is already placed or there is none.
    fn reconcile_identities(&mut self) {
        let tree = &mut self.workspace.tree;
        let invalid: Vec<WindowRef> = tree
            .windows()
            .into_iter()
            .filter(|w| !w.identity().is_valid())
            .collect();

        for entry in invalid {
            let survivor = self
                .registry
                .successor_of(entry.identity())
                .filter(|s| tree.frame_of(s.id()).is_none());
            match survivor {
                Some(survivor) => {
                    debug!("Replacing {} with {}", entry.id(), survivor.id());
                    tree.replace_window(entry.id(), entry.with_identity(survivor));
                }
                None => {
                    if let Some(frame) = tree.frame_of(entry.id()) {
                        debug!("Dropping invalidated {} from {}", entry.id(), frame);
                        tree.remove_window(frame, entry.id());
                    }
                }
            }
        }
    }

    /// Route windows whose handle went away through the removal path
    fn remove_stale(&mut self) {
        for window in self.workspace.tree.take_stale() {
            if let Some(frame) = self.workspace.tree.frame_of(window.id()) {
                self.workspace.tree.remove_window(frame, window.id());
            }
            self.registry.unregister(window.identity());
            self.stats.stale_removed += 1;
            warn!("Removed {}: its handle is no longer valid", window.id());
        }
    }

    fn audit(&mut self) {
        let ws = &mut self.workspace;
        let problem = match ws.tree.validate() {
            Err(e) => Some(e.to_string()),
            Ok(()) if !ws.tree.node(ws.active).is_some_and(FrameNode::is_leaf) => {
                Some(format!("active frame {} is not a leaf of the tree", ws.active))
            }
            Ok(()) => None,
        };
        if let Some(problem) = problem {
            error!("Inconsistent workspace ({}); snapping focus back to the root", problem);
            ws.active = first_leaf(&ws.tree, ws.tree.root());
            self.stats.recoveries += 1;
        }
    }
}

/// The root itself, or its first leaf when it is split
fn first_leaf(tree: &FrameTree, mut id: FrameId) -> FrameId {
    while let Some([first, _]) = tree.node(id).and_then(FrameNode::children) {
        id = first;
    }
    id
}

fn raise(tree: &mut FrameTree, window: &WindowRef) {
    match window.controller().raise() {
        Ok(()) => {}
        Err(WindowError::HandleInvalid) => tree.mark_stale(window),
        Err(e) => warn!("Failed to raise {}: {}", window.id(), e),
    }
}
