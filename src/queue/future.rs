use super::EventQueue;
use crate::entity::EntityId;
use crate::event::{EventId, EventRecord};
use crate::predicate::Predicate;
use crate::time::SimTime;

use fxhash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

///
/// The future event list of the simulation.
///
/// Strictly ordered by due time, ties broken by scheduling order. The heap
/// holds only `(time, id)` keys; the records themselves live in an id
/// indexed slab, so identity removal is a slab deletion and the orphaned
/// heap key is skipped lazily once it surfaces.
///
#[derive(Debug, Default)]
pub struct FutureQueue {
    heap: BinaryHeap<Reverse<(SimTime, EventId)>>,
    slab: FxHashMap<EventId, EventRecord>,
}

impl FutureQueue {
    /// Creates an empty future event list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the minimum-time event.
    pub fn pop(&mut self) -> Option<EventRecord> {
        self.purge_dead_heads();
        let Reverse((_, id)) = self.heap.pop()?;
        self.slab.remove(&id)
    }

    ///
    /// Removes and returns the earliest-due event scheduled by `src` that
    /// matches the predicate. Ties between equal due times fall back to
    /// scheduling order, like `pop` itself.
    ///
    pub fn remove_first_match(
        &mut self,
        src: EntityId,
        predicate: &Predicate,
    ) -> Option<EventRecord> {
        let id = self
            .slab
            .values()
            .filter(|ev| ev.src == src && predicate.matches(ev))
            .min_by_key(|ev| (ev.time, ev.id))
            .map(|ev| ev.id)?;
        self.slab.remove(&id)
    }

    /// Drops heap keys whose record was removed through the slab.
    fn purge_dead_heads(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.slab.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl EventQueue for FutureQueue {
    fn add(&mut self, event: EventRecord) {
        self.heap.push(Reverse((event.time, event.id)));
        self.slab.insert(event.id, event);
    }

    fn next_time(&mut self) -> Option<SimTime> {
        self.purge_dead_heads();
        self.heap.peek().map(|Reverse((time, _))| *time)
    }

    fn remove(&mut self, id: EventId) -> Option<EventRecord> {
        self.slab.remove(&id)
    }

    fn len(&self) -> usize {
        self.slab.len()
    }
}
