//! Time management for the simulation
//!
//! Simulated time is a real number of hours. The clock only moves forward:
//! it is advanced to the timestamp of each event the scheduler hands out.

use serde::{Deserialize, Serialize};

/// Simulated time in hours.
pub type SimTime = f64;

/// Tolerance used when comparing simulated timestamps.
pub const TIME_EPSILON: f64 = 1e-9;

/// Tracks the current simulated time and how many events moved it.
///
/// # Example
/// ```
/// use hospital_sim_core::SimClock;
///
/// let mut clock = SimClock::new(0.0);
/// clock.advance_to(8.0);
/// clock.advance_to(8.5);
/// assert_eq!(clock.now(), 8.5);
/// assert_eq!(clock.events_processed(), 2);
/// assert_eq!(clock.elapsed(), 8.5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Time at which the run started
    start: SimTime,
    /// Timestamp of the most recently processed event
    now: SimTime,
    /// Number of events that advanced the clock
    events_processed: usize,
}

impl SimClock {
    /// Create a clock positioned at `start`
    ///
    /// # Panics
    /// Panics if `start` is not finite.
    pub fn new(start: SimTime) -> Self {
        assert!(start.is_finite(), "clock start must be finite");
        Self {
            start,
            now: start,
            events_processed: 0,
        }
    }

    /// Move the clock to `time` and count one processed event.
    ///
    /// Time never goes backwards; the scheduler refuses to hand out events
    /// older than the current time.
    pub fn advance_to(&mut self, time: SimTime) {
        debug_assert!(
            time + TIME_EPSILON >= self.now,
            "clock moved backwards: {} -> {}",
            self.now,
            time
        );
        self.now = self.now.max(time);
        self.events_processed += 1;
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Time the run started at
    pub fn start(&self) -> SimTime {
        self.start
    }

    /// Time elapsed since the start of the run
    pub fn elapsed(&self) -> SimTime {
        self.now - self.start
    }

    /// Number of events processed so far
    pub fn events_processed(&self) -> usize {
        self.events_processed
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "clock start must be finite")]
    fn test_non_finite_start_panics() {
        SimClock::new(f64::NAN);
    }

    #[test]
    fn test_elapsed_is_measured_from_start() {
        let mut clock = SimClock::new(8.0);
        clock.advance_to(9.5);
        assert_eq!(clock.start(), 8.0);
        assert_eq!(clock.elapsed(), 1.5);
    }
}
