use crate::limit::StopCondition;
use crate::system::Simulation;
use crate::time::SimTime;

use rand::{rngs::StdRng, SeedableRng};
use std::fmt::Debug;

///
/// A builder for a [`Simulation`] instance.
///
/// The RNG is bound to the kernel here so that a run can be made
/// reproducible: a fixed seed plus a fixed model yields the same weighted
/// draws, and thus the same trajectory.
///
#[must_use]
pub struct Builder {
    rng: StdRng,
    start_time: SimTime,
    stop: StopCondition,
}

impl Builder {
    /// Creates a builder with entropy-seeded randomness.
    pub fn new() -> Builder {
        Builder {
            rng: StdRng::from_entropy(),
            start_time: SimTime::MIN,
            stop: StopCondition::unbounded(),
        }
    }

    /// Creates a builder with a statically seeded RNG.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            rng: StdRng::seed_from_u64(seed),
            start_time: SimTime::MIN,
            stop: StopCondition::unbounded(),
        }
    }

    ///
    /// Sets the clock value the run starts at.
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Caps the run at a maximum number of processed events. The cap is
    /// checked between instants; see [`StopCondition`].
    ///
    pub fn max_events(mut self, max: usize) -> Self {
        self.stop = self.stop.cap_events(max);
        self
    }

    ///
    /// Caps the run at a maximum simulated time.
    ///
    pub fn max_time(mut self, time: SimTime) -> Self {
        self.stop = self.stop.cap_time(time);
        self
    }

    ///
    /// Builds the [`Simulation`]. Entities are registered on the built
    /// instance before `run_start`.
    ///
    #[must_use]
    pub fn build(self) -> Simulation {
        Simulation::from_parts(self.rng, self.start_time, self.stop)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("start_time", &self.start_time)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}
