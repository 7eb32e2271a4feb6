//! Window identity registry
//!
//! Host environments report windows through volatile handles: the same
//! physical window may surface under several handles, a handle may churn,
//! and the compositor surface id that makes a window globally recognisable
//! often arrives after the first sighting. The registry turns that stream
//! into stable [`WindowIdentity`] values:
//!
//! - primary key `(owner pid, surface id)` once the surface id is known
//! - fallback key: the handle itself while the identity is still partial
//! - `partial -> complete -> invalid`, with invalid terminal
//!
//! Observers subscribe per identity and are held weakly, so a dropped
//! observer is skipped and pruned rather than kept alive.

mod table;

pub use table::TableResolver;

use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

pub type ProcessId = u32;
pub type SurfaceId = u64;

/// Opaque, volatile window handle as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Stable token assigned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(u64);

impl IdentityId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Resolves facts about a raw handle. Implemented by the platform layer in
/// production and by [`TableResolver`] in headless runs.
pub trait HandleResolver: Send + Sync {
    /// Owning process id. `None` means the handle is unusable.
    fn owner_process_id(&self, handle: RawHandle) -> Option<ProcessId>;

    /// Compositor surface id, best effort.
    fn surface_id(&self, handle: RawHandle) -> Option<SurfaceId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    Partial,
    Complete,
    Invalid,
}

/// Stable identity of one physical window.
///
/// Only the registry creates, upgrades, or invalidates identities.
#[derive(Debug)]
pub struct WindowIdentity {
    id: IdentityId,
    owner_pid: ProcessId,
    surface_id: OnceLock<SurfaceId>,
    valid: AtomicBool,
}

impl WindowIdentity {
    fn new(id: IdentityId, owner_pid: ProcessId, surface_id: Option<SurfaceId>) -> Self {
        let cell = OnceLock::new();
        if let Some(sid) = surface_id {
            let _ = cell.set(sid);
        }
        Self {
            id,
            owner_pid,
            surface_id: cell,
            valid: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> IdentityId {
        self.id
    }

    pub fn owner_process_id(&self) -> ProcessId {
        self.owner_pid
    }

    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.surface_id.get().copied()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn is_partial(&self) -> bool {
        self.surface_id.get().is_none()
    }

    pub fn state(&self) -> IdentityState {
        if !self.is_valid() {
            IdentityState::Invalid
        } else if self.is_partial() {
            IdentityState::Partial
        } else {
            IdentityState::Complete
        }
    }

    /// Absent -> present, once. Returns false if a surface id was already set.
    fn upgrade(&self, surface_id: SurfaceId) -> bool {
        self.surface_id.set(surface_id).is_ok()
    }

    /// Returns true only for the call that performed the transition.
    fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::AcqRel)
    }
}

/// Identity-state transitions delivered to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    HandleRefreshed(RawHandle),
    Completed(SurfaceId),
    Invalidated,
}

pub trait IdentityObserver: Send + Sync {
    fn identity_changed(&self, identity: &Arc<WindowIdentity>, event: &IdentityEvent);
}

/// Outcome of completing a partial identity with a late surface id
#[derive(Debug, Clone)]
pub enum Completion {
    /// The identity now carries the surface id
    Upgraded(Arc<WindowIdentity>),
    /// Nothing to do; the identity was already complete
    AlreadyComplete(Arc<WindowIdentity>),
    /// Another identity already owned `(pid, surface id)`. The partial one
    /// was retired and its handles now resolve to the survivor.
    Merged {
        retired: Arc<WindowIdentity>,
        survivor: Arc<WindowIdentity>,
    },
    /// The identity had already been invalidated
    Invalid,
}

struct Tracked {
    identity: Arc<WindowIdentity>,
    handle: RawHandle,
    observers: Vec<Weak<dyn IdentityObserver>>,
}

#[derive(Default)]
struct RegistryState {
    by_handle: HashMap<RawHandle, IdentityId>,
    by_surface: HashMap<(ProcessId, SurfaceId), IdentityId>,
    tracked: HashMap<IdentityId, Tracked>,
    /// Retired partial identity -> identity it was merged into
    successors: HashMap<IdentityId, IdentityId>,
    next_id: u64,
}

type Delivery = (Arc<dyn IdentityObserver>, Arc<WindowIdentity>, IdentityEvent);

impl RegistryState {
    fn live(&self, id: IdentityId) -> Option<&Arc<WindowIdentity>> {
        self.tracked
            .get(&id)
            .map(|t| &t.identity)
            .filter(|identity| identity.is_valid())
    }

    fn by_handle(&self, handle: RawHandle) -> Option<Arc<WindowIdentity>> {
        self.by_handle
            .get(&handle)
            .and_then(|id| self.live(*id))
            .cloned()
    }

    fn by_surface(&self, pid: ProcessId, sid: SurfaceId) -> Option<Arc<WindowIdentity>> {
        self.by_surface
            .get(&(pid, sid))
            .and_then(|id| self.live(*id))
            .cloned()
    }

    fn create(&mut self, handle: RawHandle, pid: ProcessId, sid: Option<SurfaceId>) -> Arc<WindowIdentity> {
        self.next_id += 1;
        let identity = Arc::new(WindowIdentity::new(IdentityId(self.next_id), pid, sid));
        self.by_handle.insert(handle, identity.id());
        if let Some(sid) = sid {
            self.by_surface.insert((pid, sid), identity.id());
        }
        self.tracked.insert(
            identity.id(),
            Tracked {
                identity: identity.clone(),
                handle,
                observers: Vec::new(),
            },
        );
        identity
    }

    /// Point `handle` at `id` and make it the latest handle, forgetting the
    /// handle it replaces. Returns true if the latest handle changed.
    fn refresh_handle(&mut self, handle: RawHandle, id: IdentityId) -> bool {
        self.by_handle.insert(handle, id);
        let Some(tracked) = self.tracked.get_mut(&id) else {
            return false;
        };
        if tracked.handle == handle {
            return false;
        }
        let replaced = std::mem::replace(&mut tracked.handle, handle);
        // Only drop the old handle if nobody else has claimed it since.
        if self.by_handle.get(&replaced) == Some(&id) {
            self.by_handle.remove(&replaced);
        }
        true
    }

    /// Latest handle of `id`, unless that handle now stands for another
    /// identity
    fn latest_handle(&self, id: IdentityId) -> Option<RawHandle> {
        let tracked = self.tracked.get(&id).filter(|t| t.identity.is_valid())?;
        (self.by_handle.get(&tracked.handle) == Some(&id)).then_some(tracked.handle)
    }

    fn deliveries(&mut self, id: IdentityId, event: IdentityEvent, out: &mut Vec<Delivery>) {
        if let Some(tracked) = self.tracked.get_mut(&id) {
            tracked.observers.retain(|weak| weak.strong_count() > 0);
            for weak in &tracked.observers {
                if let Some(observer) = weak.upgrade() {
                    out.push((observer, tracked.identity.clone(), event.clone()));
                }
            }
        }
    }

    /// Drop every index entry for `id` and return its tracking record
    fn forget(&mut self, id: IdentityId) -> Option<Tracked> {
        self.by_handle.retain(|_, v| *v != id);
        self.by_surface.retain(|_, v| *v != id);
        self.successors.retain(|k, v| *k != id && *v != id);
        self.tracked.remove(&id)
    }
}

/// Single source of truth mapping volatile handles to identities
pub struct WindowRegistry {
    resolver: Arc<dyn HandleResolver>,
    state: Mutex<RegistryState>,
}

impl fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WindowRegistry")
            .field("tracked", &state.tracked.len())
            .field("handles", &state.by_handle.len())
            .finish()
    }
}

impl WindowRegistry {
    pub fn new(resolver: Arc<dyn HandleResolver>) -> Self {
        Self {
            resolver,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Resolve `handle` to an identity, creating one if needed.
    ///
    /// Returns `None` when the owner process id cannot be resolved.
    pub fn get_or_register(&self, handle: RawHandle) -> Option<Arc<WindowIdentity>> {
        // Resolution may be slow; do it before taking the lock.
        let Some(pid) = self.resolver.owner_process_id(handle) else {
            warn!("No owner process for {}, dropping handle", handle);
            return None;
        };
        let surface = self.resolver.surface_id(handle);

        let mut pending = Vec::new();
        let identity = {
            let mut state = self.state.lock();
            self.resolve_locked(&mut state, handle, pid, surface, &mut pending)
        };
        deliver(pending);
        Some(identity)
    }

    fn resolve_locked(
        &self,
        state: &mut RegistryState,
        handle: RawHandle,
        pid: ProcessId,
        surface: Option<SurfaceId>,
        pending: &mut Vec<Delivery>,
    ) -> Arc<WindowIdentity> {
        let previous = state.by_handle(handle);

        if let Some(sid) = surface {
            if let Some(existing) = state.by_surface(pid, sid) {
                if state.refresh_handle(handle, existing.id()) {
                    state.deliveries(existing.id(), IdentityEvent::HandleRefreshed(handle), pending);
                }
                // The handle used to stand for a partial identity of the same
                // window; fold it into the one that owns the surface.
                if let Some(stale) = previous.filter(|p| p.id() != existing.id() && p.is_partial()) {
                    if stale.owner_process_id() == pid {
                        self.retire_locked(state, &stale, &existing, pending);
                    }
                }
                debug!("Deduplicated {} -> {} via ({}, {})", handle, existing.id(), pid, sid);
                return existing;
            }
        }

        if let Some(existing) = previous {
            if existing.owner_process_id() == pid {
                if let Some(sid) = surface {
                    if existing.upgrade(sid) {
                        state.by_surface.insert((pid, sid), existing.id());
                        state.deliveries(existing.id(), IdentityEvent::Completed(sid), pending);
                        debug!("Completed {} with surface {}", existing.id(), sid);
                    }
                }
                return existing;
            }
            // Handle value recycled by a different process.
            debug!("{} now belongs to pid {}, forgetting {}", handle, pid, existing.id());
            state.by_handle.remove(&handle);
        }

        let identity = state.create(handle, pid, surface);
        debug!(
            "Registered {} for {} (pid {}, {})",
            identity.id(),
            handle,
            pid,
            if surface.is_some() { "complete" } else { "partial" }
        );
        identity
    }

    /// Pure lookup; never creates
    pub fn get_identity(&self, handle: RawHandle) -> Option<Arc<WindowIdentity>> {
        self.state.lock().by_handle(handle)
    }

    /// Most recently observed handle for `identity`. May be stale.
    pub fn get_handle(&self, identity: &WindowIdentity) -> Option<RawHandle> {
        self.state.lock().latest_handle(identity.id())
    }

    /// Look up a tracked identity by id
    pub fn identity(&self, id: IdentityId) -> Option<Arc<WindowIdentity>> {
        self.state.lock().live(id).cloned()
    }

    /// Identity that a retired partial identity was merged into
    pub fn successor_of(&self, identity: &WindowIdentity) -> Option<Arc<WindowIdentity>> {
        let state = self.state.lock();
        state
            .successors
            .get(&identity.id())
            .and_then(|id| state.live(*id))
            .cloned()
    }

    /// Re-associate a newly observed handle with an existing identity.
    ///
    /// A partial identity is opportunistically completed when the new handle
    /// yields a surface id nobody else owns, and merged into the owner when
    /// somebody does.
    pub fn update_handle(&self, handle: RawHandle, identity: &Arc<WindowIdentity>) {
        if !identity.is_valid() {
            debug!("Ignoring handle update for invalid {}", identity.id());
            return;
        }
        let surface = if identity.is_partial() {
            self.resolver.surface_id(handle)
        } else {
            None
        };

        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            if !state.tracked.contains_key(&identity.id()) {
                warn!("Handle update for untracked {}", identity.id());
                return;
            }
            state.refresh_handle(handle, identity.id());
            state.deliveries(identity.id(), IdentityEvent::HandleRefreshed(handle), &mut pending);

            if let Some(sid) = surface {
                let key = (identity.owner_process_id(), sid);
                match state.by_surface(key.0, key.1) {
                    Some(owner) if owner.id() != identity.id() => {
                        // The churned handle revealed a window we already
                        // know; fold the partial identity into it.
                        debug!("Surface {} already owned by {}, folding {}", sid, owner.id(), identity.id());
                        self.retire_locked(&mut state, identity, &owner, &mut pending);
                        if state.refresh_handle(handle, owner.id()) {
                            state.deliveries(owner.id(), IdentityEvent::HandleRefreshed(handle), &mut pending);
                        }
                    }
                    _ => {
                        if identity.upgrade(sid) {
                            state.by_surface.insert(key, identity.id());
                            state.deliveries(identity.id(), IdentityEvent::Completed(sid), &mut pending);
                        }
                    }
                }
            }
        }
        deliver(pending);
    }

    /// Complete a partial identity with a surface id learned later
    pub fn complete_identity(&self, identity: &Arc<WindowIdentity>, surface_id: SurfaceId) -> Completion {
        let mut pending = Vec::new();
        let outcome = {
            let mut state = self.state.lock();
            if state.live(identity.id()).is_none() {
                return Completion::Invalid;
            }
            let pid = identity.owner_process_id();
            if let Some(existing) = identity.surface_id() {
                if existing != surface_id {
                    warn!(
                        "{} already has surface {}, ignoring {}",
                        identity.id(),
                        existing,
                        surface_id
                    );
                }
                Completion::AlreadyComplete(identity.clone())
            } else if let Some(survivor) = state.by_surface(pid, surface_id) {
                self.retire_locked(&mut state, identity, &survivor, &mut pending);
                Completion::Merged {
                    retired: identity.clone(),
                    survivor,
                }
            } else if identity.upgrade(surface_id) {
                state.by_surface.insert((pid, surface_id), identity.id());
                state.deliveries(identity.id(), IdentityEvent::Completed(surface_id), &mut pending);
                debug!("Completed {} with surface {}", identity.id(), surface_id);
                Completion::Upgraded(identity.clone())
            } else {
                Completion::AlreadyComplete(identity.clone())
            }
        };
        deliver(pending);
        outcome
    }

    /// Fold a partial identity into the identity that owns its window
    fn retire_locked(
        &self,
        state: &mut RegistryState,
        retired: &Arc<WindowIdentity>,
        survivor: &Arc<WindowIdentity>,
        pending: &mut Vec<Delivery>,
    ) {
        let handles: Vec<RawHandle> = state
            .by_handle
            .iter()
            .filter(|(_, id)| **id == retired.id())
            .map(|(h, _)| *h)
            .collect();

        state.deliveries(retired.id(), IdentityEvent::Invalidated, pending);
        retired.invalidate();
        state.forget(retired.id());

        for handle in handles {
            state.by_handle.insert(handle, survivor.id());
        }
        state.successors.insert(retired.id(), survivor.id());
        debug!("Merged {} into {}", retired.id(), survivor.id());
    }

    /// Invalidate `identity` and drop it. Idempotent.
    pub fn unregister(&self, identity: &Arc<WindowIdentity>) {
        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            if !state.tracked.contains_key(&identity.id()) {
                identity.invalidate();
                return;
            }
            state.deliveries(identity.id(), IdentityEvent::Invalidated, &mut pending);
            identity.invalidate();
            state.forget(identity.id());
        }
        debug!("Unregistered {}", identity.id());
        deliver(pending);
    }

    /// Subscribe `observer` to transitions of `identity`. Returns false if the
    /// identity is not tracked.
    pub fn register_observer(&self, observer: &Arc<dyn IdentityObserver>, identity: &WindowIdentity) -> bool {
        let mut state = self.state.lock();
        match state.tracked.get_mut(&identity.id()) {
            Some(tracked) if tracked.identity.is_valid() => {
                let already = tracked
                    .observers
                    .iter()
                    .any(|w| std::ptr::addr_eq(w.as_ptr(), Arc::as_ptr(observer)));
                if !already {
                    tracked.observers.push(Arc::downgrade(observer));
                }
                true
            }
            _ => false,
        }
    }

    pub fn unregister_observer(&self, observer: &Arc<dyn IdentityObserver>, identity: &WindowIdentity) {
        let mut state = self.state.lock();
        if let Some(tracked) = state.tracked.get_mut(&identity.id()) {
            tracked.observers.retain(|w| {
                w.strong_count() > 0 && !std::ptr::addr_eq(w.as_ptr(), Arc::as_ptr(observer))
            });
        }
    }

    /// Number of live identities
    pub fn len(&self) -> usize {
        self.state.lock().tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live observer subscriptions on `identity`
    pub fn observer_count(&self, identity: &WindowIdentity) -> usize {
        let state = self.state.lock();
        state
            .tracked
            .get(&identity.id())
            .map(|t| t.observers.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}

/// Notify observers with no registry lock held, so an observer may call back
/// into the registry.
fn deliver(pending: Vec<Delivery>) {
    for (observer, identity, event) in pending {
        observer.identity_changed(&identity, &event);
    }
}
