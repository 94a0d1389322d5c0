use super::EventQueue;
use crate::entity::EntityId;
use crate::event::{EventId, EventRecord};
use crate::predicate::Predicate;
use crate::time::SimTime;

use std::collections::VecDeque;

///
/// The overflow inbox for entities.
///
/// Holds send events whose destination could not receive them
/// synchronously. Insertion ordered, never reordered by time: events here
/// are already due, and selective receive must stay deterministic, so the
/// first inserted match always wins a scan.
///
#[derive(Debug, Default)]
pub struct DeferredQueue {
    events: VecDeque<EventRecord>,
}

impl DeferredQueue {
    /// Creates an empty deferred queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Removes and returns the first entry destined for `dest` that
    /// matches the predicate.
    ///
    pub fn take_first_match(
        &mut self,
        dest: EntityId,
        predicate: &Predicate,
    ) -> Option<EventRecord> {
        let pos = self
            .events
            .iter()
            .position(|ev| ev.dest == Some(dest) && predicate.matches(ev))?;
        self.events.remove(pos)
    }

    /// Counts matching entries without removing any.
    #[must_use]
    pub fn waiting_count(&self, dest: EntityId, predicate: &Predicate) -> usize {
        self.events
            .iter()
            .filter(|ev| ev.dest == Some(dest) && predicate.matches(ev))
            .count()
    }

    /// An insertion-ordered view over the queued events.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.iter()
    }
}

impl EventQueue for DeferredQueue {
    fn add(&mut self, event: EventRecord) {
        self.events.push_back(event);
    }

    fn next_time(&mut self) -> Option<SimTime> {
        self.events.front().map(|ev| ev.time)
    }

    fn remove(&mut self, id: EventId) -> Option<EventRecord> {
        let pos = self.events.iter().position(|ev| ev.id == id)?;
        self.events.remove(pos)
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::testing::send;

    #[test]
    fn first_inserted_match_wins() {
        let mut queue = DeferredQueue::new();
        queue.add(send(0, 1.0, 9, 7));
        queue.add(send(1, 1.0, 1, 7));
        queue.add(send(2, 1.0, 1, 7));
        queue.add(send(3, 1.0, 1, 3));

        let hit = queue.take_first_match(1, &Predicate::tag(7));
        assert_eq!(hit.map(|ev| ev.id), Some(1));

        // A second scan yields the next insertion, not the removed one.
        let hit = queue.take_first_match(1, &Predicate::tag(7));
        assert_eq!(hit.map(|ev| ev.id), Some(2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn counting_does_not_remove() {
        let mut queue = DeferredQueue::new();
        queue.add(send(0, 1.0, 1, 7));
        queue.add(send(1, 1.0, 1, 7));
        queue.add(send(2, 1.0, 1, 3));

        assert_eq!(queue.waiting_count(1, &Predicate::tag(7)), 2);
        assert_eq!(queue.waiting_count(1, &Predicate::Any), 3);
        assert_eq!(queue.waiting_count(2, &Predicate::Any), 0);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn identity_removal() {
        let mut queue = DeferredQueue::new();
        queue.add(send(0, 1.0, 1, 7));
        queue.add(send(1, 1.0, 1, 7));

        assert!(queue.remove(1).is_some());
        assert!(queue.remove(1).is_none());
        assert_eq!(queue.iter().count(), 1);
    }
}
