//!
//! The event records exchanged through the kernel queues.
//!

use crate::entity::{Entity, EntityId};
use crate::time::SimTime;
use std::any::Any;
use std::fmt::Debug;
use std::rc::Rc;

///
/// A runtime unique identifier for a scheduled event.
///
/// Ids are assigned by the scheduler in scheduling order and never reused,
/// so they double as the arrival-order tie break of the future queue and as
/// the identity that [`RemoveToken`] based cancellation relies on.
///
pub type EventId = u64;

/// The message tag attached to an event, free for model use except for
/// the bits below.
pub type Tag = i32;

/// Tag bit marking an event as a stochastic firing, routed through the
/// timing queue instead of the future queue.
pub const TAG_TIMING: Tag = 1 << 30;

/// Returns whether a tag carries the timing bit.
#[must_use]
pub fn is_timing_tag(tag: Tag) -> bool {
    tag & TAG_TIMING != 0
}

///
/// The kind of occurrence an [`EventRecord`] describes.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A message from one entity to another.
    Send,
    /// The completion of a self-scheduled timeout (`hold`).
    HoldDone,
    /// Dynamic admission of a new entity mid-run.
    Create,
    /// An empty record. Reaching the event processor with this kind is a
    /// protocol violation.
    Null,
}

///
/// The firing descriptor carried by timing events.
///
/// `delay` orders simultaneous firings after their due time, `priority`
/// breaks remaining ties (a larger value fires earlier) and `weight`
/// drives the random draw among events that are still tied.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Firing {
    /// The sampled firing delay of the transition.
    pub delay: f64,
    /// The relative weight of this firing in the random tie break.
    pub weight: f64,
    /// The tie-break priority. Larger values sort earlier.
    pub priority: i32,
}

impl Firing {
    /// Creates a firing descriptor.
    #[must_use]
    pub fn new(delay: f64, weight: f64, priority: i32) -> Self {
        Self {
            delay,
            weight,
            priority,
        }
    }
}

impl Default for Firing {
    fn default() -> Self {
        Self {
            delay: 0.0,
            weight: 1.0,
            priority: 0,
        }
    }
}

///
/// The entity descriptor carried by a [`EventKind::Create`] event.
///
pub struct SpawnRecord {
    /// The unique name the new entity registers under.
    pub name: String,
    /// The entity logic to admit.
    pub logic: Box<dyn Entity>,
}

impl Debug for SpawnRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnRecord")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

///
/// The opaque payload of an event.
///
pub enum Payload {
    /// No payload.
    Empty,
    /// A firing descriptor, required on timing events.
    Firing(Firing),
    /// Arbitrary model data, shared so that records stay cheap to move.
    Data(Rc<dyn Any>),
    /// An entity descriptor, carried by `Create` events.
    Spawn(SpawnRecord),
}

impl Payload {
    /// Wraps arbitrary model data.
    #[must_use]
    pub fn data<T: Any>(value: T) -> Payload {
        Payload::Data(Rc::new(value))
    }

    /// Returns the firing descriptor, if the payload carries one.
    #[must_use]
    pub fn firing(&self) -> Option<Firing> {
        match self {
            Payload::Firing(firing) => Some(*firing),
            _ => None,
        }
    }

    /// Downcasts a data payload to a concrete type.
    #[must_use]
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Payload::Data(data) => data.downcast_ref(),
            _ => None,
        }
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Empty => write!(f, "Empty"),
            Payload::Firing(firing) => f.debug_tuple("Firing").field(firing).finish(),
            Payload::Data(_) => write!(f, "Data(..)"),
            Payload::Spawn(spawn) => f.debug_tuple("Spawn").field(spawn).finish(),
        }
    }
}

///
/// A value describing one scheduled occurrence.
///
/// Records are immutable once scheduled; delivery moves the record into
/// the destination entity's mailbox. Two records with identical fields are
/// still distinct occurrences, told apart by `id`.
///
#[derive(Debug)]
pub struct EventRecord {
    /// The scheduler-assigned identity of this occurrence.
    pub id: EventId,
    /// What kind of occurrence this is.
    pub kind: EventKind,
    /// The simulated instant at which the event is due.
    pub time: SimTime,
    /// The entity that scheduled the event.
    pub src: EntityId,
    /// The destination entity. Absent for self-events such as holds.
    pub dest: Option<EntityId>,
    /// The model-defined message tag.
    pub tag: Tag,
    /// The opaque payload.
    pub payload: Payload,
}

impl EventRecord {
    /// Returns the firing descriptor of a timing event, or the default
    /// descriptor (zero delay, weight one) for records without one.
    #[must_use]
    pub fn firing(&self) -> Firing {
        self.payload.firing().unwrap_or_default()
    }

    /// Returns whether this record is routed through the timing queue.
    #[must_use]
    pub fn is_timing(&self) -> bool {
        is_timing_tag(self.tag)
    }
}

///
/// Identifies which queue a scheduled event was placed into.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTag {
    /// The future event list.
    Future,
    /// The stochastic timing queue.
    Timing,
    /// The deferred delivery queue.
    Deferred,
}

///
/// An opaque handle to a previously scheduled event.
///
/// Returned by every scheduling operation; lets the issuer later remove
/// that exact event instance from whichever queue holds it. The handle
/// stays valid across internal queue reorganisation because it names the
/// event by id, not by position.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveToken {
    pub(crate) id: EventId,
    pub(crate) origin: QueueTag,
}

impl RemoveToken {
    /// The id of the event this token refers to.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// The queue the event was originally scheduled into.
    #[must_use]
    pub fn origin(&self) -> QueueTag {
        self.origin
    }
}
