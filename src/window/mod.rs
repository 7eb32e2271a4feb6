//! Window controllers
//!
//! The core never touches real on-screen windows. Everything it needs from a
//! window goes through the [`WindowController`] capability set, so the
//! platform backend and the in-memory [`HeadlessWindow`] are interchangeable.
//! A [`WindowRef`] pairs a controller with the stable identity the registry
//! assigned to it; that pair is what frames hold in their window stacks.

mod headless;

pub use headless::HeadlessWindow;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::geometry::{Point, Rect};
use crate::identity::{IdentityId, WindowIdentity};

/// Failure reported by a window backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The handle behind this controller is gone; treat the window as closed
    #[error("window handle is no longer valid")]
    HandleInvalid,
    #[error("window backend error: {0}")]
    Backend(String),
}

/// Capability set the core needs from a window
pub trait WindowController: Send + Sync {
    fn resize(&self, size: Rect) -> Result<(), WindowError>;
    fn reposition(&self, origin: Point) -> Result<(), WindowError>;
    fn raise(&self) -> Result<(), WindowError>;
    fn query_geometry(&self) -> Result<Rect, WindowError>;
    fn is_valid(&self) -> bool;
    fn title(&self) -> String;
}

/// A window entry in a frame's stack: identity plus controller.
///
/// Equality is by identity only; a fresh controller for the same identity
/// (handle churn) compares equal to the old one.
#[derive(Clone)]
pub struct WindowRef {
    identity: Arc<WindowIdentity>,
    controller: Arc<dyn WindowController>,
}

impl WindowRef {
    pub fn new(identity: Arc<WindowIdentity>, controller: Arc<dyn WindowController>) -> Self {
        Self {
            identity,
            controller,
        }
    }

    pub fn id(&self) -> IdentityId {
        self.identity.id()
    }

    pub fn identity(&self) -> &Arc<WindowIdentity> {
        &self.identity
    }

    pub fn controller(&self) -> &Arc<dyn WindowController> {
        &self.controller
    }

    pub fn title(&self) -> String {
        self.controller.title()
    }

    /// Move and size the window to fill `content`
    pub fn place(&self, content: Rect) -> Result<(), WindowError> {
        self.controller.resize(content)?;
        self.controller.reposition(content.origin())
    }

    pub(crate) fn with_identity(&self, identity: Arc<WindowIdentity>) -> Self {
        Self {
            identity,
            controller: self.controller.clone(),
        }
    }
}

impl PartialEq for WindowRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity.id() == other.identity.id()
    }
}

impl Eq for WindowRef {}

impl fmt::Debug for WindowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowRef")
            .field("id", &self.identity.id())
            .field("valid", &self.identity.is_valid())
            .finish()
    }
}
