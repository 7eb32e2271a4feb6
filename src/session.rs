//! Headless session driven by a line-oriented script
//!
//! Used by the `tessera` binary and by integration tests. Windows are
//! in-memory [`HeadlessWindow`]s whose handle facts live in a
//! [`TableResolver`], so discovery races can be scripted:
//!
//! ```text
//! split-vertical
//! open 100 42 editor        # pid 100, surface 42
//! open 200 - slow-client    # surface not known yet
//! resolve 200 7             # ...and now it is
//! move right
//! cycle next
//! gone 100 42
//! screen 2560 1440
//! ```

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::command::{Command, CommandProcessor, Cycle, LayoutReport, ProcessorStats, WorkspaceView};
use crate::config::TesseraConfig;
use crate::discovery::DiscoveryBridge;
use crate::geometry::{Axis, Direction, Rect};
use crate::identity::{ProcessId, RawHandle, SurfaceId, TableResolver, WindowRegistry};
use crate::window::HeadlessWindow;

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Split(Axis),
    Close,
    Focus(Direction),
    Move(Direction),
    Cycle(Cycle),
    Open {
        pid: ProcessId,
        surface: Option<SurfaceId>,
        title: String,
    },
    Resolve {
        pid: ProcessId,
        surface: SurfaceId,
    },
    Gone {
        pid: ProcessId,
        surface: Option<SurfaceId>,
    },
    Screen {
        width: u32,
        height: u32,
    },
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Step>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };

    let step = match word {
        "split-vertical" => Step::Split(Axis::Vertical),
        "split-horizontal" => Step::Split(Axis::Horizontal),
        "close" => Step::Close,
        "focus" => Step::Focus(direction(words.next())?),
        "move" => Step::Move(direction(words.next())?),
        "cycle" => match words.next() {
            Some("next") => Step::Cycle(Cycle::Forward),
            Some("prev") => Step::Cycle(Cycle::Backward),
            other => bail!("cycle expects next|prev, got {:?}", other),
        },
        "open" => {
            let pid = number(words.next(), "pid")?;
            let surface = surface(words.next())?;
            let title = words.collect::<Vec<_>>().join(" ");
            if title.is_empty() {
                bail!("open needs a title");
            }
            Step::Open { pid, surface, title }
        }
        "resolve" => Step::Resolve {
            pid: number(words.next(), "pid")?,
            surface: number(words.next(), "surface")?,
        },
        "gone" => Step::Gone {
            pid: number(words.next(), "pid")?,
            surface: surface(words.next())?,
        },
        "screen" => Step::Screen {
            width: number(words.next(), "width")?,
            height: number(words.next(), "height")?,
        },
        other => bail!("unknown command {:?}", other),
    };
    Ok(Some(step))
}

fn direction(word: Option<&str>) -> Result<Direction> {
    let word = word.ok_or_else(|| anyhow!("missing direction"))?;
    Direction::parse(word).ok_or_else(|| anyhow!("bad direction {:?}", word))
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T> {
    let word = word.ok_or_else(|| anyhow!("missing {}", what))?;
    word.parse().map_err(|_| anyhow!("bad {} {:?}", what, word))
}

fn surface(word: Option<&str>) -> Result<Option<SurfaceId>> {
    match word {
        Some("-") => Ok(None),
        other => number(other, "surface").map(Some),
    }
}

/// A running processor fed through a discovery bridge
pub struct HeadlessSession {
    resolver: Arc<TableResolver>,
    bridge: DiscoveryBridge,
    view: WorkspaceView,
    task: JoinHandle<ProcessorStats>,
    handles: HashMap<(ProcessId, Option<SurfaceId>), RawHandle>,
    next_handle: u64,
}

impl HeadlessSession {
    /// Spawn a processor over the configured screen. Must be called from
    /// within a tokio runtime.
    pub fn start(config: &TesseraConfig) -> Self {
        let resolver = Arc::new(TableResolver::new());
        let registry = Arc::new(WindowRegistry::new(resolver.clone()));
        let (processor, queue) = CommandProcessor::new(config.screen.rect(), registry.clone(), &config.frames);
        let view = processor.view();
        let task = tokio::spawn(processor.run());
        Self {
            resolver,
            bridge: DiscoveryBridge::new(registry, queue),
            view,
            task,
            handles: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn view(&self) -> &WorkspaceView {
        &self.view
    }

    pub fn bridge(&self) -> &DiscoveryBridge {
        &self.bridge
    }

    /// Feed every line of `script`, stopping at the first unparsable line
    pub fn run_script(&mut self, script: &str) -> Result<()> {
        for (n, line) in script.lines().enumerate() {
            let step = parse_line(line).with_context(|| format!("line {}: {:?}", n + 1, line))?;
            if let Some(step) = step {
                self.apply(step)?;
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, step: Step) -> Result<()> {
        debug!("Script step {:?}", step);
        let queue = self.bridge.queue();
        match step {
            Step::Split(axis) => queue.enqueue(Command::Split(axis))?,
            Step::Close => queue.enqueue(Command::CloseFrame)?,
            Step::Focus(direction) => queue.enqueue(Command::Navigate(direction))?,
            Step::Move(direction) => queue.enqueue(Command::MoveWindow(direction))?,
            Step::Cycle(cycle) => queue.enqueue(Command::CycleWindow(cycle))?,
            Step::Screen { width, height } => {
                queue.enqueue(Command::ScreenChanged(Rect::new(0, 0, width, height)))?
            }
            Step::Open { pid, surface, title } => {
                self.next_handle += 1;
                let handle = RawHandle(self.next_handle);
                self.resolver.insert(handle, Some(pid), surface);
                let window = Arc::new(HeadlessWindow::new(handle.0, title));
                if self.bridge.window_discovered(handle, window)?.is_some() {
                    self.handles.insert((pid, surface), handle);
                }
            }
            Step::Resolve { pid, surface } => match self.handles.remove(&(pid, None)) {
                Some(handle) => {
                    self.resolver.set_surface(handle, Some(surface));
                    self.bridge.surface_resolved(handle, surface)?;
                    self.handles.insert((pid, Some(surface)), handle);
                }
                None => warn!("No partial window for pid {}", pid),
            },
            Step::Gone { pid, surface } => match self.handles.remove(&(pid, surface)) {
                Some(handle) => {
                    self.bridge.window_destroyed(handle)?;
                    self.resolver.remove(handle);
                }
                None => warn!("No window for pid {} surface {:?}", pid, surface),
            },
        }
        Ok(())
    }

    /// Close the queue, wait for the processor to drain and report the
    /// final layout
    pub async fn finish(self) -> Result<(LayoutReport, ProcessorStats)> {
        let Self {
            bridge, view, task, ..
        } = self;
        drop(bridge);
        let stats = task.await.context("command processor task failed")?;
        Ok((view.snapshot().report(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_words() -> Result<()> {
        assert_eq!(parse_line("split-vertical")?, Some(Step::Split(Axis::Vertical)));
        assert_eq!(parse_line("  focus up ")?, Some(Step::Focus(Direction::Up)));
        assert_eq!(parse_line("cycle prev")?, Some(Step::Cycle(Cycle::Backward)));
        assert_eq!(
            parse_line("open 100 - Web Browser")?,
            Some(Step::Open {
                pid: 100,
                surface: None,
                title: "Web Browser".into(),
            })
        );
        assert_eq!(
            parse_line("gone 100 42 # closed by user")?,
            Some(Step::Gone {
                pid: 100,
                surface: Some(42),
            })
        );
        assert_eq!(parse_line("# just a comment")?, None);
        assert_eq!(parse_line("")?, None);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_line("explode").is_err());
        assert!(parse_line("focus sideways").is_err());
        assert!(parse_line("open abc 1 x").is_err());
        assert!(parse_line("open 1 2").is_err());
        assert!(parse_line("screen 100").is_err());
    }

    #[tokio::test]
    async fn test_session_reports_final_layout() -> Result<()> {
        let mut session = HeadlessSession::start(&TesseraConfig::default());
        session.run_script("split-vertical\nopen 1 1 left\nfocus right\nopen 2 2 right\nopen 2 2 right again\n")?;

        let (report, stats) = session.finish().await?;
        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.frames[0].tabs.len(), 1);
        assert_eq!(report.frames[1].tabs.len(), 1);
        assert_eq!(report.frames[1].tabs[0].title, "right again");
        assert_eq!(report.active, report.frames[1].id);
        assert_eq!(stats.failed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_session_resolves_partial_window() -> Result<()> {
        let mut session = HeadlessSession::start(&TesseraConfig::default());
        session.run_script("open 7 - pending\nresolve 7 70\ngone 7 70\n")?;

        let (report, _) = session.finish().await?;
        assert!(report.frames[0].tabs.is_empty());
        Ok(())
    }
}
