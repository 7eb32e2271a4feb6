use parking_lot::Mutex;

use super::{WindowController, WindowError};
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone)]
struct HeadlessState {
    title: String,
    position: (i32, i32),
    size: (u32, u32),
    alive: bool,
    raised: u32,
}

/// In-memory window used when no platform backend is present
#[derive(Debug)]
pub struct HeadlessWindow {
    id: u64,
    state: Mutex<HeadlessState>,
}

impl HeadlessWindow {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            state: Mutex::new(HeadlessState {
                title: title.into(),
                position: (0, 0),
                size: (800, 600),
                alive: true,
                raised: 0,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Simulate the window going away under us
    pub fn destroy(&self) {
        self.state.lock().alive = false;
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().title = title.into();
    }

    /// How many times the core raised this window
    pub fn raise_count(&self) -> u32 {
        self.state.lock().raised
    }

    fn live(&self) -> Result<parking_lot::MutexGuard<'_, HeadlessState>, WindowError> {
        let state = self.state.lock();
        if state.alive {
            Ok(state)
        } else {
            Err(WindowError::HandleInvalid)
        }
    }
}

impl WindowController for HeadlessWindow {
    fn resize(&self, size: Rect) -> Result<(), WindowError> {
        self.live()?.size = (size.width, size.height);
        Ok(())
    }

    fn reposition(&self, origin: Point) -> Result<(), WindowError> {
        self.live()?.position = (origin.x, origin.y);
        Ok(())
    }

    fn raise(&self) -> Result<(), WindowError> {
        self.live()?.raised += 1;
        Ok(())
    }

    fn query_geometry(&self) -> Result<Rect, WindowError> {
        let state = self.live()?;
        Ok(Rect::new(state.position.0, state.position.1, state.size.0, state.size.1))
    }

    fn is_valid(&self) -> bool {
        self.state.lock().alive
    }

    fn title(&self) -> String {
        self.state.lock().title.clone()
    }
}
