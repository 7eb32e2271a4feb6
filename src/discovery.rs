//! Entry point for the platform's window discovery
//!
//! Platform callbacks receive a [`DiscoveryBridge`] when they are registered.
//! The bridge resolves handles through the shared registry and turns every
//! observation into a queued command; it never touches a frame tree.

use log::{debug, warn};
use std::sync::Arc;

use crate::command::{Command, CommandError, CommandQueue};
use crate::identity::{RawHandle, SurfaceId, WindowIdentity, WindowRegistry};
use crate::window::{WindowController, WindowRef};

#[derive(Debug, Clone)]
pub struct DiscoveryBridge {
    registry: Arc<WindowRegistry>,
    queue: CommandQueue,
}

impl DiscoveryBridge {
    pub fn new(registry: Arc<WindowRegistry>, queue: CommandQueue) -> Self {
        Self { registry, queue }
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// A window was seen through `handle`.
    ///
    /// Returns `Ok(None)` when the handle has no resolvable owner process and
    /// is dropped as untrackable.
    pub fn window_discovered(
        &self,
        handle: RawHandle,
        controller: Arc<dyn WindowController>,
    ) -> Result<Option<Arc<WindowIdentity>>, CommandError> {
        let Some(identity) = self.registry.get_or_register(handle) else {
            warn!("Ignoring window {}: owner process unknown", handle);
            return Ok(None);
        };
        debug!("Discovered {} via {}", identity.id(), handle);
        self.queue
            .enqueue(Command::WindowAppeared(WindowRef::new(identity.clone(), controller)))?;
        Ok(Some(identity))
    }

    /// The window behind `handle` went away. Returns false if the handle was
    /// never tracked.
    pub fn window_destroyed(&self, handle: RawHandle) -> Result<bool, CommandError> {
        match self.registry.get_identity(handle) {
            Some(identity) => {
                self.queue.enqueue(Command::WindowDisappeared(identity))?;
                Ok(true)
            }
            None => {
                debug!("Destroy for unknown handle {}", handle);
                Ok(false)
            }
        }
    }

    /// A poller learned the compositor surface id behind `handle`.
    /// Returns false when there is nothing to complete.
    pub fn surface_resolved(&self, handle: RawHandle, surface_id: SurfaceId) -> Result<bool, CommandError> {
        let Some(identity) = self.registry.get_identity(handle) else {
            return Ok(false);
        };
        if !identity.is_partial() {
            return Ok(false);
        }
        self.queue.enqueue(Command::WindowIdentityCompleted {
            identity,
            surface_id,
        })?;
        Ok(true)
    }

    /// `identity` is now reachable through a different handle
    pub fn handle_changed(&self, handle: RawHandle, identity: Arc<WindowIdentity>) -> Result<(), CommandError> {
        self.queue.enqueue(Command::WindowHandleChanged { handle, identity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandProcessor;
    use crate::config::FrameConfig;
    use crate::geometry::Rect;
    use crate::identity::TableResolver;
    use crate::window::HeadlessWindow;

    fn setup() -> (Arc<TableResolver>, CommandProcessor, DiscoveryBridge) {
        let resolver = Arc::new(TableResolver::new());
        let registry = Arc::new(WindowRegistry::new(resolver.clone()));
        let (processor, queue) =
            CommandProcessor::new(Rect::new(0, 0, 1920, 1080), registry.clone(), &FrameConfig::default());
        (resolver, processor, DiscoveryBridge::new(registry, queue))
    }

    #[test]
    fn test_same_window_through_two_handles_lands_once() {
        let (resolver, mut processor, bridge) = setup();
        resolver.insert(RawHandle(1), Some(100), Some(42));
        resolver.insert(RawHandle(2), Some(100), Some(42));

        let first = bridge
            .window_discovered(RawHandle(1), Arc::new(HeadlessWindow::new(1, "term")))
            .unwrap()
            .unwrap();
        let second = bridge
            .window_discovered(RawHandle(2), Arc::new(HeadlessWindow::new(2, "term")))
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        processor.drain_pending();
        assert_eq!(processor.workspace().window_count(), 1);
    }

    #[test]
    fn test_untrackable_handle_is_dropped() {
        let (resolver, mut processor, bridge) = setup();
        resolver.insert(RawHandle(9), None, Some(1));

        let result = bridge.window_discovered(RawHandle(9), Arc::new(HeadlessWindow::new(9, "ghost")));
        assert!(matches!(result, Ok(None)));
        assert_eq!(processor.drain_pending(), 0);
    }

    #[test]
    fn test_late_surface_completes_partial_identity() {
        let (resolver, mut processor, bridge) = setup();
        resolver.insert(RawHandle(1), Some(100), None);

        let identity = bridge
            .window_discovered(RawHandle(1), Arc::new(HeadlessWindow::new(1, "slow")))
            .unwrap()
            .unwrap();
        assert!(identity.is_partial());

        assert_eq!(bridge.surface_resolved(RawHandle(1), 42), Ok(true));
        processor.drain_pending();
        assert_eq!(identity.surface_id(), Some(42));

        // Nothing left to complete
        assert_eq!(bridge.surface_resolved(RawHandle(1), 42), Ok(false));
    }

    #[test]
    fn test_destroy_removes_window() {
        let (resolver, mut processor, bridge) = setup();
        resolver.insert(RawHandle(1), Some(100), Some(5));
        bridge
            .window_discovered(RawHandle(1), Arc::new(HeadlessWindow::new(1, "a")))
            .unwrap();

        assert_eq!(bridge.window_destroyed(RawHandle(1)), Ok(true));
        processor.drain_pending();
        assert_eq!(processor.workspace().window_count(), 0);

        assert_eq!(bridge.window_destroyed(RawHandle(1)), Ok(false));
    }
}
