//! # Tessera Frame Manager Library
//!
//! Core of a tiling window manager: the display is partitioned into a binary
//! tree of frames, each leaf frame holds a tabbed stack of windows, and every
//! change goes through one serialized command queue.
//!
//! ## Architecture
//!
//! - `geometry`: Rectangles, split axes, directions
//! - `identity`: Window identity registry that deduplicates volatile handles
//! - `window`: Window controller capability set and the headless backend
//! - `frame`: Frame tree engine and directional navigation
//! - `command`: Command queue, drain loop and read-only workspace snapshots
//! - `discovery`: Bridge from platform window discovery into the queue
//! - `desktop`: One isolated workspace per virtual desktop
//! - `session`: Script-driven headless sessions
//! - `config`: Configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tessera::{Command, CommandProcessor, TableResolver, TesseraConfig, WindowRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TesseraConfig::default();
//!     let registry = Arc::new(WindowRegistry::new(Arc::new(TableResolver::new())));
//!     let (processor, queue) = CommandProcessor::new(config.screen.rect(), registry, &config.frames);
//!     let view = processor.view();
//!     let task = tokio::spawn(processor.run());
//!
//!     queue.enqueue(Command::split_vertically())?;
//!     queue.settled().await;
//!     println!("{} frames", view.snapshot().leaves().len());
//!
//!     drop(queue);
//!     task.await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod desktop;
pub mod discovery;
pub mod frame;
pub mod geometry;
pub mod identity;
pub mod session;
pub mod window;

// Re-export main types for easy access
pub use command::{Command, CommandError, CommandProcessor, CommandQueue, Cycle, Workspace, WorkspaceView};
pub use config::TesseraConfig;
pub use desktop::Desktops;
pub use discovery::DiscoveryBridge;
pub use frame::{FrameError, FrameId, FrameTree};
pub use geometry::{Axis, Direction, Rect};
pub use identity::{RawHandle, TableResolver, WindowIdentity, WindowRegistry};
pub use session::HeadlessSession;
pub use window::{HeadlessWindow, WindowController, WindowRef};

/// Version information for Tessera
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
