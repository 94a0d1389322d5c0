//!
//! The event queue family of the kernel.
//!
//! Three queues with different access patterns over the same record type:
//! the [`FutureQueue`] (the future event list, min-by-time extraction with
//! identity removal), the [`DeferredQueue`] (insertion-ordered overflow
//! inbox with predicate scans) and the [`TimingQueue`] (grouping of
//! simultaneously due stochastic firings with a weighted random draw).
//!
//! No queue operation blocks; all are logically instantaneous relative to
//! simulated time.
//!

use crate::event::{EventId, EventRecord};
use crate::time::SimTime;

mod deferred;
mod future;
mod timing;

pub use deferred::DeferredQueue;
pub use future::FutureQueue;
pub use timing::TimingQueue;

///
/// Operations every kernel queue supports, regardless of its ordering
/// policy.
///
/// `pop` is intentionally not part of the shared contract: the timing
/// queue resolves its head with a random draw and therefore needs the
/// kernel RNG to pop.
///
pub trait EventQueue {
    /// Inserts an event according to the queue's ordering policy.
    fn add(&mut self, event: EventRecord);

    /// The due time of the next event, if any.
    fn next_time(&mut self) -> Option<SimTime>;

    /// Removes the event with the given identity, returning it on success.
    fn remove(&mut self, id: EventId) -> Option<EventRecord>;

    /// The number of queued events.
    fn len(&self) -> usize;

    /// Whether no events are queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
