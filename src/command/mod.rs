//! Serialized command pipeline
//!
//! Every mutation of the frame tree and of window assignment is expressed
//! as a [`Command`] and pushed through a [`CommandQueue`]. Producers
//! (key bindings, platform notifications, periodic reconciliation) may hold
//! clones of the queue on any thread; enqueueing never blocks. A single
//! [`CommandProcessor`] drains the queue in FIFO order and runs each command
//! to completion before looking at the next one, so no two commands ever
//! interleave. Read-only consumers follow the published [`Workspace`]
//! snapshots through a [`WorkspaceView`].

mod processor;
mod workspace;

pub use processor::{CommandProcessor, ProcessorStats};
pub use workspace::{FrameReport, LayoutReport, Workspace, WorkspaceView};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

use crate::frame::{FrameError, FrameId};
use crate::geometry::{Axis, Direction, Rect};
use crate::identity::{IdentityId, RawHandle, SurfaceId, WindowIdentity};
use crate::window::WindowRef;

/// Direction of a window-stack cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Forward,
    Backward,
}

/// One requested mutation
#[derive(Debug, Clone)]
pub enum Command {
    // Structural
    Split(Axis),
    CloseFrame,
    Navigate(Direction),

    // Window stack
    MoveWindow(Direction),
    CycleWindow(Cycle),
    AddWindow(WindowRef),
    RemoveWindow(WindowRef),
    FocusWindow(WindowRef),

    // Identity lifecycle
    WindowAppeared(WindowRef),
    WindowDisappeared(Arc<WindowIdentity>),
    WindowIdentityCompleted {
        identity: Arc<WindowIdentity>,
        surface_id: SurfaceId,
    },
    WindowHandleChanged {
        handle: RawHandle,
        identity: Arc<WindowIdentity>,
    },

    // Geometry provider
    ScreenChanged(Rect),
}

impl Command {
    pub fn split_vertically() -> Self {
        Command::Split(Axis::Vertical)
    }

    pub fn split_horizontally() -> Self {
        Command::Split(Axis::Horizontal)
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Split(Axis::Vertical) => "split-vertically",
            Command::Split(Axis::Horizontal) => "split-horizontally",
            Command::CloseFrame => "close-frame",
            Command::Navigate(_) => "navigate",
            Command::MoveWindow(_) => "move-window",
            Command::CycleWindow(_) => "cycle-window",
            Command::AddWindow(_) => "add-window",
            Command::RemoveWindow(_) => "remove-window",
            Command::FocusWindow(_) => "focus-window",
            Command::WindowAppeared(_) => "window-appeared",
            Command::WindowDisappeared(_) => "window-disappeared",
            Command::WindowIdentityCompleted { .. } => "window-identity-completed",
            Command::WindowHandleChanged { .. } => "window-handle-changed",
            Command::ScreenChanged(_) => "screen-changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("no frame {0:?} of the active frame")]
    NoAdjacentFrame(Direction),
    #[error("the active frame has no windows")]
    NoActiveWindow,
    #[error("{0} is not in any frame")]
    UntrackedWindow(IdentityId),
    #[error("{window} already lives in {frame}")]
    AlreadyTracked { window: IdentityId, frame: FrameId },
    #[error("{0} has been invalidated")]
    InvalidIdentity(IdentityId),
    #[error("screen {0:?} reaches past the coordinate range")]
    UnaddressableScreen(Rect),
    #[error("command queue is closed")]
    QueueClosed,
}

/// Producer handle onto a processor's queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    sender: mpsc::UnboundedSender<Command>,
    draining: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl CommandQueue {
    /// Append `command` to the tail of the queue. Never blocks.
    pub fn enqueue(&self, command: Command) -> Result<(), CommandError> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.sender.send(command).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            CommandError::QueueClosed
        })
    }

    /// Commands enqueued but not yet completed
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the processor is between the first and last command of a drain
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Wait until every command enqueued so far has completed.
    ///
    /// Returns early if the processor goes away. Otherwise the processor must
    /// be running on the runtime, or this never returns.
    pub async fn settled(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            // Register before checking so a wakeup in between is not lost
            idle.as_mut().enable();
            if self.pending() == 0 || self.is_closed() {
                return;
            }
            tokio::select! {
                _ = &mut idle => {}
                _ = self.sender.closed() => return,
            }
        }
    }
}
