use super::EventQueue;
use crate::event::{EventId, EventRecord};
use crate::time::SimTime;

use rand::Rng;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

///
/// Orders two firings by (time asc, delay asc, priority desc). Events that
/// compare equal here are tied for the same firing instant and are
/// resolved by the weighted random draw.
///
fn fire_cmp(a: &EventRecord, b: &EventRecord) -> Ordering {
    let (fa, fb) = (a.firing(), b.firing());
    a.time
        .cmp(&b.time)
        .then(fa.delay.total_cmp(&fb.delay))
        // Larger priority sorts earlier. This direction is deliberate.
        .then(fb.priority.cmp(&fa.priority))
}

#[derive(Debug)]
struct TimingNode(EventRecord);

impl PartialEq for TimingNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimingNode {}

impl PartialOrd for TimingNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimingNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // The id tail makes heap order total and runs reproducible.
        fire_cmp(&self.0, &other.0).then(self.0.id.cmp(&other.0.id))
    }
}

///
/// The stochastic timing queue.
///
/// Holds the pending firings of all enabled stochastic transitions,
/// partitioned into `current` (an unordered group of firings tied for the
/// next firing instant) and `future` (everything later, heap ordered by
/// [`fire_cmp`]). Popping draws one member of `current` at random,
/// proportional to its firing weight; given a fixed seed and insertion
/// sequence the draw is reproducible.
///
#[derive(Debug, Default)]
pub struct TimingQueue {
    current: Vec<EventRecord>,
    future: BinaryHeap<Reverse<TimingNode>>,
}

impl TimingQueue {
    /// Creates an empty timing queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Regroups `current` after it ran empty: pull the minimum of the
    /// future heap, then keep pulling while the head still compares equal
    /// to that new representative.
    ///
    fn handle_current(&mut self) {
        if !self.current.is_empty() {
            return;
        }
        let Some(Reverse(TimingNode(head))) = self.future.pop() else {
            return;
        };
        self.current.push(head);
        while let Some(Reverse(TimingNode(peeked))) = self.future.peek() {
            if fire_cmp(peeked, &self.current[0]) != Ordering::Equal {
                break;
            }
            let Some(Reverse(TimingNode(next))) = self.future.pop() else {
                break;
            };
            self.current.push(next);
        }
    }

    ///
    /// Removes and returns one member of the current firing group, chosen
    /// at random with probability proportional to its firing weight.
    ///
    pub fn pop<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<EventRecord> {
        self.handle_current();
        if self.current.is_empty() {
            return None;
        }

        let total: f64 = self.current.iter().map(|ev| ev.firing().weight).sum();
        let r = rng.gen::<f64>() * total;

        let mut acc = 0.0;
        let mut chosen = self.current.len() - 1;
        for (idx, ev) in self.current.iter().enumerate() {
            acc += ev.firing().weight;
            if acc > r {
                chosen = idx;
                break;
            }
        }
        Some(self.current.remove(chosen))
    }
}

impl EventQueue for TimingQueue {
    fn add(&mut self, event: EventRecord) {
        self.handle_current();
        if self.current.is_empty() {
            self.current.push(event);
            return;
        }

        match fire_cmp(&event, &self.current[0]) {
            Ordering::Equal => self.current.push(event),
            Ordering::Greater => self.future.push(Reverse(TimingNode(event))),
            Ordering::Less => {
                // The new firing preempts the whole current group.
                for member in self.current.drain(..) {
                    self.future.push(Reverse(TimingNode(member)));
                }
                self.current.push(event);
            }
        }
    }

    fn next_time(&mut self) -> Option<SimTime> {
        self.handle_current();
        self.current.first().map(|ev| ev.time)
    }

    fn remove(&mut self, id: EventId) -> Option<EventRecord> {
        self.handle_current();
        if let Some(pos) = self.current.iter().position(|ev| ev.id == id) {
            return Some(self.current.remove(pos));
        }

        if !self.future.iter().any(|Reverse(TimingNode(ev))| ev.id == id) {
            return None;
        }
        let mut removed = None;
        let drained = std::mem::take(&mut self.future);
        for Reverse(TimingNode(ev)) in drained {
            if ev.id == id {
                removed = Some(ev);
            } else {
                self.future.push(Reverse(TimingNode(ev)));
            }
        }
        removed
    }

    fn len(&self) -> usize {
        self.current.len() + self.future.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::testing::firing;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn comparator_orders_time_then_delay_then_priority() {
        let a = firing(0, 1.0, 0.0, 1.0, 0);
        let b = firing(1, 2.0, 0.0, 1.0, 0);
        assert_eq!(fire_cmp(&a, &b), Ordering::Less);

        let a = firing(0, 1.0, 0.5, 1.0, 0);
        let b = firing(1, 1.0, 0.7, 1.0, 0);
        assert_eq!(fire_cmp(&a, &b), Ordering::Less);

        // Larger priority wins the tie.
        let a = firing(0, 1.0, 0.5, 1.0, 9);
        let b = firing(1, 1.0, 0.5, 1.0, 1);
        assert_eq!(fire_cmp(&a, &b), Ordering::Less);

        let a = firing(0, 1.0, 0.5, 1.0, 3);
        let b = firing(1, 1.0, 0.5, 2.0, 3);
        assert_eq!(fire_cmp(&a, &b), Ordering::Equal);
    }

    #[test]
    fn earlier_firing_preempts_current_group() {
        let mut queue = TimingQueue::new();
        let mut rng = StdRng::seed_from_u64(1);

        queue.add(firing(0, 5.0, 0.0, 1.0, 0));
        queue.add(firing(1, 5.0, 0.0, 1.0, 0));
        queue.add(firing(2, 2.0, 0.0, 1.0, 0));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.next_time(), Some(SimTime::from(2.0)));
        assert_eq!(queue.pop(&mut rng).map(|ev| ev.id), Some(2));

        // The displaced group regroups as the new current.
        assert_eq!(queue.next_time(), Some(SimTime::from(5.0)));
        let mut rest: Vec<u64> = std::iter::from_fn(|| queue.pop(&mut rng))
            .map(|ev| ev.id)
            .collect();
        rest.sort_unstable();
        assert_eq!(rest, vec![0, 1]);
    }

    #[test]
    fn higher_priority_fires_first() {
        let mut queue = TimingQueue::new();
        let mut rng = StdRng::seed_from_u64(7);

        queue.add(firing(0, 1.0, 0.0, 1.0, 1));
        queue.add(firing(1, 1.0, 0.0, 1.0, 8));

        // The priority-8 firing preempts; the two are not tied, so the
        // draw has a single candidate.
        assert_eq!(queue.pop(&mut rng).map(|ev| ev.id), Some(1));
        assert_eq!(queue.pop(&mut rng).map(|ev| ev.id), Some(0));
        assert!(queue.pop(&mut rng).is_none());
    }

    #[test]
    fn identity_removal_from_both_partitions() {
        let mut queue = TimingQueue::new();

        queue.add(firing(0, 1.0, 0.0, 1.0, 0));
        queue.add(firing(1, 1.0, 0.0, 1.0, 0));
        queue.add(firing(2, 4.0, 0.0, 1.0, 0));

        assert!(queue.remove(1).is_some());
        assert!(queue.remove(2).is_some());
        assert!(queue.remove(2).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn weighted_draw_follows_firing_weights() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let draws = 100_000;
        let mut heavy_wins = 0usize;

        for _ in 0..draws {
            let mut queue = TimingQueue::new();
            queue.add(firing(0, 1.0, 0.0, 1.0, 0));
            queue.add(firing(1, 1.0, 0.0, 3.0, 0));

            let first = queue.pop(&mut rng).map(|ev| ev.id);
            if first == Some(1) {
                heavy_wins += 1;
            }
        }

        let ratio = heavy_wins as f64 / draws as f64;
        assert!(
            (ratio - 0.75).abs() < 0.01,
            "weight-3 firing won {ratio} of draws, expected ~0.75"
        );
    }

    #[test]
    fn draw_is_reproducible_for_a_fixed_seed() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(99);
            let mut queue = TimingQueue::new();
            for id in 0..6 {
                queue.add(firing(id, 1.0, 0.0, (id + 1) as f64, 0));
            }
            std::iter::from_fn(|| queue.pop(&mut rng))
                .map(|ev| ev.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
