//! Scopes: coarse locking and unit-of-work boundaries.
//!
//! Every public service operation runs inside one scope. A scope acquires
//! read/write locks keyed by logical resource (one lock per tree, not per
//! node), holds them for its whole lifetime, and must be completed on the
//! happy path. Locks block until free; there are no timeouts or cancellation
//! tokens at this layer.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use tracing::debug;

use crate::events::EventBus;

/// Logical resources guarded by coarse locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    ContentTree,
    ContentTypes,
    Languages,
}

type LockCell = Arc<RwLock<()>>;

enum HeldGuard {
    Read(#[allow(dead_code)] ArcRwLockReadGuard<RawRwLock, ()>),
    Write(#[allow(dead_code)] ArcRwLockWriteGuard<RawRwLock, ()>),
}

/// Creates scopes and owns the shared lock registry and event bus.
#[derive(Clone, Default)]
pub struct ScopeProvider {
    locks: Arc<DashMap<LockKey, LockCell>>,
    events: EventBus,
}

impl ScopeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: EventBus) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            events,
        }
    }

    /// The event bus shared by all scopes of this provider.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Open a new scope. The scope holds no locks until asked.
    pub fn create_scope(&self) -> Scope {
        Scope {
            locks: self.locks.clone(),
            events: self.events.clone(),
            held: Vec::new(),
            guards: Vec::new(),
            completed: false,
        }
    }
}

impl std::fmt::Debug for ScopeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeProvider").finish()
    }
}

/// One unit of work. Dropping a scope without completing it is treated as a
/// rollback by collaborators listening for completion.
pub struct Scope {
    locks: Arc<DashMap<LockKey, LockCell>>,
    events: EventBus,
    held: Vec<LockKey>,
    guards: Vec<HeldGuard>,
    completed: bool,
}

impl Scope {
    fn cell(&self, key: LockKey) -> LockCell {
        self.locks.entry(key).or_default().clone()
    }

    /// Acquire a read lock for the scope lifetime. Blocks until free.
    /// Re-acquiring a key already held by this scope is a no-op.
    pub fn read_lock(&mut self, key: LockKey) {
        if self.held.contains(&key) {
            return;
        }
        let cell = self.cell(key);
        self.guards.push(HeldGuard::Read(cell.read_arc()));
        self.held.push(key);
    }

    /// Acquire an exclusive write lock for the scope lifetime. Blocks until
    /// free. Re-acquiring a key already held by this scope is a no-op.
    pub fn write_lock(&mut self, key: LockKey) {
        if self.held.contains(&key) {
            return;
        }
        let cell = self.cell(key);
        self.guards.push(HeldGuard::Write(cell.write_arc()));
        self.held.push(key);
    }

    /// The event bus, for dispatching within this unit of work.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Mark the scope as successfully completed.
    pub fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !self.completed {
            debug!("scope dropped without completing; changes roll back");
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("held", &self.held)
            .field("completed", &self.completed)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn write_lock_excludes_concurrent_readers() {
        let provider = ScopeProvider::new();
        let mut scope = provider.create_scope();
        scope.write_lock(LockKey::ContentTree);

        let cell = provider.locks.get(&LockKey::ContentTree).unwrap().clone();
        assert!(cell.try_read().is_none());

        scope.complete();
        drop(scope);
        assert!(cell.try_read().is_some());
    }

    #[test]
    fn reacquiring_a_held_key_does_not_deadlock() {
        let provider = ScopeProvider::new();
        let mut scope = provider.create_scope();
        scope.write_lock(LockKey::ContentTree);
        scope.write_lock(LockKey::ContentTree);
        scope.read_lock(LockKey::ContentTree);
        scope.complete();
    }

    #[test]
    fn independent_keys_do_not_contend() {
        let provider = ScopeProvider::new();
        let mut a = provider.create_scope();
        a.write_lock(LockKey::ContentTree);

        let mut b = provider.create_scope();
        b.write_lock(LockKey::ContentTypes);

        a.complete();
        b.complete();
    }
}
