use parking_lot::RwLock;
use std::collections::HashMap;

use super::{HandleResolver, ProcessId, RawHandle, SurfaceId};

#[derive(Debug, Clone, Copy, Default)]
struct HandleFacts {
    pid: Option<ProcessId>,
    surface: Option<SurfaceId>,
}

/// In-memory handle resolver used by headless sessions and tests.
///
/// Facts can be changed at any time to simulate a surface id that becomes
/// resolvable late or a handle that dies.
#[derive(Debug, Default)]
pub struct TableResolver {
    facts: RwLock<HashMap<RawHandle, HandleFacts>>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: RawHandle, pid: Option<ProcessId>, surface: Option<SurfaceId>) {
        self.facts.write().insert(handle, HandleFacts { pid, surface });
    }

    pub fn set_surface(&self, handle: RawHandle, surface: Option<SurfaceId>) {
        self.facts.write().entry(handle).or_default().surface = surface;
    }

    pub fn remove(&self, handle: RawHandle) {
        self.facts.write().remove(&handle);
    }
}

impl HandleResolver for TableResolver {
    fn owner_process_id(&self, handle: RawHandle) -> Option<ProcessId> {
        self.facts.read().get(&handle).and_then(|f| f.pid)
    }

    fn surface_id(&self, handle: RawHandle) -> Option<SurfaceId> {
        self.facts.read().get(&handle).and_then(|f| f.surface)
    }
}
