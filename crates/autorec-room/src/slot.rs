//! A generation-tagged holder for at most one collaborator instance.

use std::sync::Arc;

/// Holds the current monitor or recorder of a room.
///
/// Every instance gets a fresh generation when it is created. Events are
/// only honored when they carry the generation of the instance that is
/// currently installed, which makes late events from replaced or
/// disposed instances harmless.
///
/// An instance taken out with [`drain`](Slot::drain) keeps its events
/// flowing until [`drained`](Slot::drained) is called after its dispose
/// returns, so whatever it flushes while shutting down still counts.
pub(crate) struct Slot<T> {
    occupant: Option<(u64, Arc<T>)>,
    draining: Vec<u64>,
    last_generation: u64,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            occupant: None,
            draining: Vec::new(),
            last_generation: 0,
        }
    }

    /// Hands out the generation for the next instance.
    pub(crate) fn reserve(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Installs an instance, returning whatever it displaced.
    pub(crate) fn install(&mut self, generation: u64, value: Arc<T>) -> Option<Arc<T>> {
        self.occupant
            .replace((generation, value))
            .map(|(_, displaced)| displaced)
    }

    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.occupant.as_ref().map(|(_, value)| Arc::clone(value))
    }

    pub(crate) fn take(&mut self) -> Option<Arc<T>> {
        self.occupant.take().map(|(_, value)| value)
    }

    /// Takes the occupant for disposal. Its events keep being accepted
    /// until [`drained`](Slot::drained).
    pub(crate) fn drain(&mut self) -> Option<(u64, Arc<T>)> {
        let (generation, value) = self.occupant.take()?;
        self.draining.push(generation);
        Some((generation, value))
    }

    /// Like [`drain`](Slot::drain), but only for the instance of `generation`.
    pub(crate) fn drain_if(&mut self, generation: u64) -> Option<Arc<T>> {
        if self.is_current(generation) {
            self.drain().map(|(_, value)| value)
        } else {
            None
        }
    }

    /// Marks a drained instance as fully disposed.
    pub(crate) fn drained(&mut self, generation: u64) {
        self.draining.retain(|g| *g != generation);
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        matches!(self.occupant, Some((current, _)) if current == generation)
    }

    /// Current, or drained but not yet disposed.
    pub(crate) fn accepts(&self, generation: u64) -> bool {
        self.is_current(generation) || self.draining.contains(&generation)
    }

    pub(crate) fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}
