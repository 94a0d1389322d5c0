//!
//! Schedulable units and their kernel-side bookkeeping.
//!

use crate::event::EventRecord;
use crate::predicate::Predicate;
use crate::system::Ctx;
use crate::SimError;

///
/// A stable identifier for a registered entity, assigned at registration.
///
pub type EntityId = usize;

///
/// The scheduling state of an entity.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// The entity can be stepped; deliveries to it are deferred until it
    /// explicitly selects them.
    Runnable,
    /// The entity suspended itself and is woken by the first delivery
    /// matching its waiting predicate, or by its own hold completing.
    Waiting,
    /// The entity finished; it stays registered but is never stepped
    /// again.
    Done,
}

///
/// The logic of a schedulable unit, written as a resumable step function.
///
/// The kernel invokes `step` synchronously whenever an event is delivered
/// to the entity's mailbox. There are no blocking calls: an entity that
/// has nothing to consume suspends by calling [`Ctx::wait`] and returns;
/// the scheduler resumes it once a matching event arrives.
///
pub trait Entity {
    /// Called once when the entity is admitted to a running simulation,
    /// before any event is delivered to it.
    #[allow(unused_variables)]
    fn start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        Ok(())
    }

    /// Called with the delivered event in the mailbox. Errors are fatal
    /// to the run and propagate out of the tick loop.
    fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError>;
}

///
/// The kernel-side record of a registered entity: identity, scheduling
/// state, the single-slot mailbox and the logic itself.
///
/// The logic box is taken out of the slot for the duration of a step so
/// that the step can borrow the scheduler mutably.
///
pub(crate) struct EntitySlot {
    pub(crate) name: String,
    pub(crate) state: EntityState,
    pub(crate) mailbox: Option<EventRecord>,
    pub(crate) waiting_predicate: Option<Predicate>,
    pub(crate) logic: Option<Box<dyn Entity>>,
}

impl EntitySlot {
    pub(crate) fn new(name: String, logic: Box<dyn Entity>) -> Self {
        Self {
            name,
            state: EntityState::Runnable,
            mailbox: None,
            waiting_predicate: None,
            logic: Some(logic),
        }
    }

    /// Whether a delivery may be handed to this entity right now.
    pub(crate) fn accepts(&self, event: &EventRecord) -> bool {
        self.state == EntityState::Waiting
            && self
                .waiting_predicate
                .as_ref()
                .map_or(true, |pred| pred.matches(event))
    }
}
