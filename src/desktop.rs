//! One isolated workspace per virtual desktop
//!
//! Each desktop gets its own processor task, frame tree and queue. Window
//! identity is global, so every desktop shares the same registry.

use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::command::{Command, CommandError, CommandProcessor, CommandQueue, ProcessorStats, WorkspaceView};
use crate::config::FrameConfig;
use crate::discovery::DiscoveryBridge;
use crate::geometry::Rect;
use crate::identity::WindowRegistry;

pub type DesktopId = u32;

struct Desktop {
    queue: CommandQueue,
    view: WorkspaceView,
    task: JoinHandle<ProcessorStats>,
}

pub struct Desktops {
    registry: Arc<WindowRegistry>,
    screen: Rect,
    config: FrameConfig,
    desktops: HashMap<DesktopId, Desktop>,
}

impl Desktops {
    pub fn new(registry: Arc<WindowRegistry>, screen: Rect, config: FrameConfig) -> Self {
        Self {
            registry,
            screen,
            config,
            desktops: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    /// Queue for desktop `id`, spawning its processor on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure(&mut self, id: DesktopId) -> CommandQueue {
        if let Some(desktop) = self.desktops.get(&id) {
            return desktop.queue.clone();
        }
        let (processor, queue) = CommandProcessor::new(self.screen, self.registry.clone(), &self.config);
        let view = processor.view();
        let task = tokio::spawn(processor.run());
        info!("🖥️ Desktop {} ready", id);
        self.desktops.insert(
            id,
            Desktop {
                queue: queue.clone(),
                view,
                task,
            },
        );
        queue
    }

    pub fn queue(&self, id: DesktopId) -> Option<CommandQueue> {
        self.desktops.get(&id).map(|d| d.queue.clone())
    }

    pub fn view(&self, id: DesktopId) -> Option<WorkspaceView> {
        self.desktops.get(&id).map(|d| d.view.clone())
    }

    /// Discovery bridge feeding desktop `id`
    pub fn bridge(&mut self, id: DesktopId) -> DiscoveryBridge {
        let queue = self.ensure(id);
        DiscoveryBridge::new(self.registry.clone(), queue)
    }

    pub fn ids(&self) -> Vec<DesktopId> {
        let mut ids: Vec<_> = self.desktops.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Send `command` to every desktop, e.g. a screen geometry change
    pub fn broadcast(&self, command: Command) -> Result<(), CommandError> {
        for desktop in self.desktops.values() {
            desktop.queue.enqueue(command.clone())?;
        }
        Ok(())
    }

    /// Stop desktop `id` and wait for its processor to drain.
    ///
    /// Completes once every other clone of its queue has been dropped.
    pub async fn remove(&mut self, id: DesktopId) -> Option<ProcessorStats> {
        let desktop = self.desktops.remove(&id)?;
        drop(desktop.queue);
        match desktop.task.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("❌ Processor for desktop {} failed: {}", id, e);
                None
            }
        }
    }

    /// Stop every desktop, returning the final stats of each
    pub async fn shutdown(mut self) -> HashMap<DesktopId, ProcessorStats> {
        let mut out = HashMap::new();
        for id in self.ids() {
            if let Some(stats) = self.remove(id).await {
                out.insert(id, stats);
            }
        }
        info!("🔽 All desktops stopped");
        out
    }
}
