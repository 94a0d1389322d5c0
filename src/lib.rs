//!
//! A discrete event simulation kernel for performance evaluation models.
//!
//! qnsim drives queueing networks and stochastic-petri-net style models:
//! it provides the clock, the event queue family, the entity state machine
//! with predicate based selective receive, and the stochastic timing queue
//! that resolves simultaneous competing firings with a reproducible
//! weighted random draw.
//!
//! # Building a model
//!
//! A model is a set of entities registered on a [`Simulation`]. Each
//! entity implements [`Entity`]: a `start` hook that schedules its initial
//! events and a `step` function the scheduler invokes whenever an event is
//! delivered into the entity's mailbox. Entities never block; they suspend
//! by calling [`Ctx::wait`] and are resumed by the scheduler once a
//! matching event arrives.
//!
//! ```
//! use qnsim::prelude::*;
//!
//! struct Source { jobs: usize }
//!
//! impl Entity for Source {
//!     fn start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
//!         ctx.hold(1.0);
//!         Ok(())
//!     }
//!
//!     fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
//!         self.jobs += 1;
//!         if self.jobs < 10 {
//!             ctx.hold(1.0);
//!         } else {
//!             ctx.set_done();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut sim = Builder::seeded(42).build();
//! sim.add_entity("source", Box::new(Source { jobs: 0 }))?;
//! let result = sim.run()?;
//! assert_eq!(result.time, SimTime::from(10.0));
//! # Ok::<(), SimError>(())
//! ```
//!
//! # Determinism
//!
//! The kernel is logically single threaded: exactly one entity's logic
//! runs at any instant, invoked synchronously from event delivery. All
//! events sharing the same due instant are fully processed, including any
//! zero-delay chain they produce, before the clock moves on. Given a fixed
//! seed ([`Builder::seeded`]) and a fixed model, a run is reproducible.
//!

pub mod builder;
pub mod entity;
pub mod error;
pub mod event;
pub mod limit;
pub mod predicate;
pub mod queue;
pub mod system;
pub mod time;

pub use builder::Builder;
pub use entity::{Entity, EntityId, EntityState};
pub use error::SimError;
pub use event::{EventKind, EventRecord, Firing, Payload, RemoveToken, TAG_TIMING};
pub use predicate::Predicate;
pub use system::{Ctx, RunResult, Simulation};
pub use time::SimTime;

///
/// Common imports for model code.
///
pub mod prelude {
    pub use crate::builder::Builder;
    pub use crate::entity::{Entity, EntityId, EntityState};
    pub use crate::error::SimError;
    pub use crate::event::{
        EventKind, EventRecord, Firing, Payload, QueueTag, RemoveToken, Tag, TAG_TIMING,
    };
    pub use crate::limit::StopCondition;
    pub use crate::predicate::Predicate;
    pub use crate::system::{Ctx, RunResult, Simulation};
    pub use crate::time::SimTime;
}
