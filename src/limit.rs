use crate::time::SimTime;
use std::fmt::Display;

///
/// The driver-side stopping criterion of a run.
///
/// The kernel itself never stops mid-instant; [`Simulation::run`] checks
/// the condition between ticks, against the due time of the *next*
/// instant. Both caps honor tick atomicity: every event sharing the
/// current instant is still processed, so an event cap bounds the number
/// of processed *instants'* worth of events and a single tick may
/// overshoot it by the size of a simultaneous batch.
///
/// [`Simulation::run`]: crate::system::Simulation::run
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopCondition {
    max_events: Option<usize>,
    max_time: Option<SimTime>,
}

impl StopCondition {
    /// A condition that never stops the run; it ends only once no event
    /// remains.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Caps the number of processed events. Checked per instant, see the
    /// type docs.
    #[must_use]
    pub fn cap_events(mut self, max: usize) -> Self {
        self.max_events = Some(self.max_events.map_or(max, |cur| cur.min(max)));
        self
    }

    /// Caps the simulated time: no instant due after `max` is processed.
    #[must_use]
    pub fn cap_time(mut self, max: SimTime) -> Self {
        self.max_time = Some(self.max_time.map_or(max, |cur| cur.min(max)));
        self
    }

    ///
    /// Whether the run must stop before processing the instant due at
    /// `next_due`, given `processed` events handled so far. Either cap
    /// suffices.
    ///
    pub(crate) fn reached(&self, processed: usize, next_due: SimTime) -> bool {
        self.max_events.is_some_and(|max| processed >= max)
            || self.max_time.is_some_and(|max| next_due > max)
    }
}

impl Display for StopCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.max_events, self.max_time) {
            (None, None) => write!(f, "unbounded"),
            (Some(events), None) => write!(f, "max-events {events}"),
            (None, Some(time)) => write!(f, "max-time {time}"),
            (Some(events), Some(time)) => {
                write!(f, "max-events {events} or max-time {time}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_stops() {
        let stop = StopCondition::unbounded();
        assert!(!stop.reached(0, SimTime::ZERO));
        assert!(!stop.reached(usize::MAX, SimTime::MAX));
        assert_eq!(stop.to_string(), "unbounded");
    }

    #[test]
    fn event_cap_counts_processed_events() {
        let stop = StopCondition::unbounded().cap_events(4);
        assert!(!stop.reached(3, SimTime::MAX));
        assert!(stop.reached(4, SimTime::ZERO));
        assert!(stop.reached(17, SimTime::ZERO));
        assert_eq!(stop.to_string(), "max-events 4");
    }

    #[test]
    fn time_cap_compares_the_next_due_instant() {
        let stop = StopCondition::unbounded().cap_time(SimTime::from(2.5));
        // An instant due exactly at the cap is still processed.
        assert!(!stop.reached(0, SimTime::from(2.5)));
        assert!(stop.reached(0, SimTime::from(2.5000001)));
        assert_eq!(stop.to_string(), "max-time 2.5");
    }

    #[test]
    fn either_cap_stops_the_run() {
        let stop = StopCondition::unbounded()
            .cap_events(10)
            .cap_time(SimTime::from(8.0));
        assert!(!stop.reached(9, SimTime::from(8.0)));
        assert!(stop.reached(10, SimTime::from(1.0)));
        assert!(stop.reached(0, SimTime::from(9.0)));
        assert_eq!(stop.to_string(), "max-events 10 or max-time 8");
    }

    #[test]
    fn repeated_caps_keep_the_tighter_bound() {
        let stop = StopCondition::unbounded().cap_events(10).cap_events(3);
        assert!(stop.reached(3, SimTime::ZERO));
        assert!(!stop.reached(2, SimTime::ZERO));

        let stop = StopCondition::unbounded()
            .cap_time(SimTime::from(1.0))
            .cap_time(SimTime::from(5.0));
        assert_eq!(stop.to_string(), "max-time 1");
    }
}
