//!
//! Temporal quantification in a simulation context.
//!
//! A [`SimTime`] is a specific instant of simulated time, measured in
//! abstract model time units since the start of the run. Simulated time
//! only ever moves forward; the kernel advances it to the due time of the
//! next event and never in between.
//!

use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Sub};

///
/// A specific point of time in the simulation.
///
/// Internally a `f64` count of model time units. All comparisons use the
/// IEEE total order, so `SimTime` is usable as a key in ordered
/// collections.
///
#[derive(Copy, Clone, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(0.0);
    /// The smallest valid instance of a [`SimTime`].
    pub const MIN: SimTime = SimTime(0.0);
    /// The greatest instance of a [`SimTime`].
    pub const MAX: SimTime = SimTime(f64::INFINITY);

    ///
    /// Constructs a `SimTime` from a raw count of model time units.
    ///
    /// # Panics
    ///
    /// Panics if the value is negative or NaN, since neither describes
    /// a valid instant.
    ///
    #[must_use]
    pub fn new(units: f64) -> Self {
        assert!(
            units >= 0.0 && !units.is_nan(),
            "a simulation instant must be a non-negative number"
        );
        Self(units)
    }

    /// Returns the raw count of model time units.
    #[must_use]
    pub fn as_units(self) -> f64 {
        self.0
    }

    /// Returns the instant `delay` time units after `self`.
    #[must_use]
    pub fn after(self, delay: f64) -> SimTime {
        SimTime::new(self.0 + delay)
    }

    /// Returns the amount of time elapsed from `earlier` to `self`,
    /// or zero if `earlier` is the later of the two.
    #[must_use]
    pub fn saturating_since(self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for SimTime {
    fn from(units: f64) -> Self {
        SimTime::new(units)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: f64) -> SimTime {
        self.after(rhs)
    }
}

impl AddAssign<f64> for SimTime {
    fn add_assign(&mut self, rhs: f64) {
        *self = self.after(rhs);
    }
}

impl Sub for SimTime {
    type Output = f64;
    fn sub(self, rhs: SimTime) -> f64 {
        self.0 - rhs.0
    }
}

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total() {
        assert!(SimTime::from(1.0) < SimTime::from(3.0));
        assert!(SimTime::ZERO < SimTime::MAX);
        assert_eq!(SimTime::from(2.5), SimTime::new(2.5));
        assert_eq!(
            SimTime::from(2.0).min(SimTime::from(7.0)),
            SimTime::from(2.0)
        );
    }

    #[test]
    fn arithmetic() {
        let t = SimTime::from(4.0).after(1.5);
        assert_eq!(t, SimTime::from(5.5));
        assert_eq!(t - SimTime::from(4.0), 1.5);
        assert_eq!(SimTime::from(1.0).saturating_since(SimTime::from(3.0)), 0.0);
    }

    #[test]
    #[should_panic = "non-negative"]
    fn negative_instants_are_rejected() {
        let _ = SimTime::new(-1.0);
    }
}
