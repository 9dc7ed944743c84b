//! Process-wide bytecode cache with single-flight compilation.
//!
//! For each [`EffectId`] at most one compilation runs at a time. The first
//! requester claims a [`Slot`] in the in-flight map and compiles; everyone
//! arriving meanwhile blocks on the slot's condition variable and receives
//! the owner's outcome. A successful artifact is cached before the slot is
//! released. Failures are handed to the waiters but not cached. After a
//! cancellation the waiters start over, one of them becoming the new owner;
//! an owner that panics counts as cancelled.
//!
//! Every invalidation bumps a generation counter. A flight that overlapped
//! one may have read sources from before the change, so its artifact goes
//! to its requesters but is never cached.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use sdsl_diagnostic::Diagnostic;
use sdsl_spirv::EffectBytecode;

use crate::request::EffectId;

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

/// How the artifact of a successful compile was obtained.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CompilationOrigin {
    FreshlyCompiled,
    LoadedFromCache,
    LoadedFromDisk,
}

/// Result of one flight.
#[derive(Clone, Debug)]
pub enum Outcome {
    Ready(Arc<EffectBytecode>, CompilationOrigin),
    Failed(Arc<[Diagnostic]>),
    Cancelled,
}

#[derive(Default)]
struct Slot {
    state: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl Slot {
    fn publish(&self, outcome: Outcome) {
        *self.state.lock() = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut state);
        }
    }
}

/// Ownership of one in-flight slot. Dropping it unpublished (the owner's
/// compile panicked) releases the waiters with [`Outcome::Cancelled`].
struct Flight<'c> {
    cache: &'c BytecodeCache,
    id: EffectId,
    slot: Arc<Slot>,
    done: bool,
}

impl Flight<'_> {
    fn finish(mut self, outcome: Outcome) {
        self.release(outcome);
    }

    fn release(&mut self, outcome: Outcome) {
        self.done = true;
        self.cache.inflight.remove(&self.id);
        self.slot.publish(outcome);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!(id = %self.id, "compilation abandoned");
            self.release(Outcome::Cancelled);
        }
    }
}

/// Completed artifacts plus the compilations in flight.
#[derive(Default)]
pub struct BytecodeCache {
    entries: DashMap<EffectId, Arc<EffectBytecode>>,
    inflight: DashMap<EffectId, Arc<Slot>>,
    /// Bumped by every invalidation; held while an owner publishes.
    generation: Mutex<u64>,
}

impl BytecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EffectId) -> Option<Arc<EffectBytecode>> {
        self.entries.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// The artifact for `id`: from the cache, from a compilation already in
    /// flight, or by running `compile` as the owner of a new flight.
    pub fn get_or_compile(&self, id: EffectId, compile: impl FnOnce() -> Outcome) -> Outcome {
        let mut compile = Some(compile);
        loop {
            if let Some(hit) = self.get(id) {
                return Outcome::Ready(hit, CompilationOrigin::LoadedFromCache);
            }

            let slot = match self.inflight.entry(id) {
                Entry::Occupied(entry) => {
                    let slot = Arc::clone(entry.get());
                    drop(entry);
                    tracing::trace!(%id, "waiting for compilation in flight");
                    match slot.wait() {
                        Outcome::Ready(bytecode, _) => {
                            return Outcome::Ready(bytecode, CompilationOrigin::LoadedFromCache);
                        }
                        Outcome::Failed(diagnostics) => return Outcome::Failed(diagnostics),
                        Outcome::Cancelled => continue,
                    }
                }
                Entry::Vacant(entry) => {
                    let slot = Arc::new(Slot::default());
                    entry.insert(Arc::clone(&slot));
                    slot
                }
            };
            let flight = Flight {
                cache: self,
                id,
                slot,
                done: false,
            };
            let started = *self.generation.lock();

            // A previous owner may have finished between the lookup and the claim.
            let outcome = match self.get(id) {
                Some(hit) => Outcome::Ready(hit, CompilationOrigin::LoadedFromCache),
                None => match compile.take() {
                    Some(compile) => compile(),
                    None => Outcome::Cancelled,
                },
            };
            if let Outcome::Ready(bytecode, _) = &outcome {
                let generation = self.generation.lock();
                if *generation == started {
                    self.entries.insert(id, Arc::clone(bytecode));
                } else {
                    tracing::debug!(%id, "sources changed during compilation; not caching");
                }
            }
            flight.finish(outcome.clone());
            return outcome;
        }
    }

    /// Drop every cached artifact `stale` selects. Returns how many went.
    /// Flights still running are kept out of the cache as well.
    pub fn invalidate(&self, mut stale: impl FnMut(&EffectBytecode) -> bool) -> usize {
        let mut generation = self.generation.lock();
        *generation += 1;
        let before = self.entries.len();
        self.entries.retain(|_, bytecode| !stale(bytecode));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
