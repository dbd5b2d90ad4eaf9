use serde::{Deserialize, Serialize};

use crate::dynamics::state::State;
use crate::geo::{self, GeoPoint, LaunchSite};

// ---------------------------------------------------------------------------
// Full time history of one propagated body
// ---------------------------------------------------------------------------

/// Parallel sequences of sample times and states, in integration order.
#[derive(Debug, Clone)]
pub struct TrajectoryResult {
    times: Vec<f64>,
    states: Vec<State>,
}

impl TrajectoryResult {
    /// Both sequences must be the same non-zero length.
    pub(crate) fn new(times: Vec<f64>, states: Vec<State>) -> Self {
        debug_assert_eq!(times.len(), states.len());
        debug_assert!(!states.is_empty());
        Self { times, states }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// First sample at or below ground level, or the last sample if the
    /// body never came down within the time span.
    pub fn impact_index(&self) -> usize {
        self.states
            .iter()
            .position(|s| s.altitude() <= 0.0)
            .unwrap_or(self.states.len() - 1)
    }

    pub fn impact_state(&self) -> &State {
        &self.states[self.impact_index()]
    }

    pub fn impact_time(&self) -> f64 {
        self.times[self.impact_index()]
    }

    pub fn impact_downrange(&self) -> f64 {
        self.impact_state().downrange()
    }

    pub fn impact_crossrange(&self) -> f64 {
        self.impact_state().crossrange()
    }

    pub fn impact_velocity(&self) -> f64 {
        self.impact_state().velocity()
    }

    /// Did the body reach the ground before the span ran out?
    pub fn reached_ground(&self) -> bool {
        self.states.iter().any(|s| s.altitude() <= 0.0)
    }

    pub fn apogee(&self) -> f64 {
        self.states
            .iter()
            .map(|s| s.altitude())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// First sample whose altitude lies in `[low, high]`.
    pub fn first_in_altitude_window(&self, low: f64, high: f64) -> Option<usize> {
        self.states
            .iter()
            .position(|s| (low..=high).contains(&s.altitude()))
    }
}

// ---------------------------------------------------------------------------
// Flattened impact summary
// ---------------------------------------------------------------------------

/// Where and how one body hit the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    /// Monte Carlo trial this body belongs to.
    pub trial: usize,
    pub downrange_m: f64,
    pub crossrange_m: f64,
    pub velocity_m_s: f64,
    pub flight_path_angle_rad: f64,
    pub heading_rad: f64,
    pub impact_time_s: f64,
    /// `None` for the primary body, `Some(i)` for fragment `i`.
    pub fragment_index: Option<usize>,
}

impl ImpactRecord {
    pub fn from_trajectory(
        trial: usize,
        trajectory: &TrajectoryResult,
        fragment_index: Option<usize>,
    ) -> Self {
        let s = trajectory.impact_state();
        Self {
            trial,
            downrange_m: s.downrange(),
            crossrange_m: s.crossrange(),
            velocity_m_s: s.velocity(),
            flight_path_angle_rad: s.flight_path_angle(),
            heading_rad: s.heading(),
            impact_time_s: trajectory.impact_time(),
            fragment_index,
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_index.is_some()
    }

    /// Impact location on the globe for a given launch site.
    pub fn to_geo(&self, site: &LaunchSite) -> GeoPoint {
        geo::meters_to_latlon(
            site.latitude_deg,
            site.longitude_deg,
            site.azimuth_deg,
            self.downrange_m,
            self.crossrange_m,
        )
    }
}
