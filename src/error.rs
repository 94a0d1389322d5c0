//!
//! Fatal simulation errors.
//!

use crate::entity::EntityId;
use crate::time::SimTime;
use std::error::Error as StdError;
use std::fmt::Display;

///
/// An error that aborts the simulation run.
///
/// Protocol violations are never retried internally; they propagate out of
/// the tick loop and the caller must treat the run as aborted.
///
#[derive(Debug)]
pub enum SimError {
    /// An event became due at an instant before the current clock.
    PastEvent {
        /// The due time of the offending event.
        time: SimTime,
        /// The clock value at the time of the violation.
        clock: SimTime,
    },
    /// An event referenced an entity id that was never registered.
    UnknownEntity(EntityId),
    /// A send record reached the processor without a destination.
    MissingDestination,
    /// A record of kind `Null` reached the event processor.
    NullEvent,
    /// A timing-tagged send carried no firing descriptor.
    MissingFiring,
    /// A `Create` event carried no entity descriptor.
    MalformedCreate,
    /// An entity name was already taken at registration.
    NameTaken(String),
    /// An entity's execution step failed.
    Logic(Box<dyn StdError>),
}

impl SimError {
    /// Wraps an arbitrary error raised by entity logic.
    #[must_use]
    pub fn logic(err: impl Into<Box<dyn StdError>>) -> SimError {
        SimError::Logic(err.into())
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PastEvent { time, clock } => {
                write!(f, "event due at {time} popped while the clock is at {clock}")
            }
            Self::UnknownEntity(id) => write!(f, "no entity is registered under id {id}"),
            Self::MissingDestination => {
                write!(f, "a send event reached the processor without a destination")
            }
            Self::NullEvent => write!(f, "a null event reached the event processor"),
            Self::MissingFiring => {
                write!(f, "a timing-tagged send carried no firing descriptor")
            }
            Self::MalformedCreate => {
                write!(f, "a create event carried no entity descriptor")
            }
            Self::NameTaken(name) => {
                write!(f, "an entity named '{name}' is already registered")
            }
            Self::Logic(err) => write!(f, "entity step failed: {err}"),
        }
    }
}

impl StdError for SimError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Logic(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
