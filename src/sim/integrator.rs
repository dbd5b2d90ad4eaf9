use serde::{Deserialize, Serialize};

use crate::dynamics::{Dynamics, ModelParams, State};
use crate::error::{Result, SimError};
use crate::sim::trajectory::TrajectoryResult;

/// Upper bound on the samples reserved up front; longer runs grow the buffers.
const MAX_PREALLOCATED_STEPS: f64 = 200_000.0;

// ---------------------------------------------------------------------------
// Classical 4th-order Runge-Kutta integrator
// ---------------------------------------------------------------------------

/// Integration interval `[start, stop]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub stop: f64,
}

impl TimeSpan {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }
}

/// Single RK4 step: advance state by dt.
pub fn rk4_step<M: Dynamics + ?Sized>(
    model: &M,
    t: f64,
    state: &State,
    dt: f64,
    params: &ModelParams,
) -> State {
    let k1 = model.derivatives(t, state, params);
    let k2 = model.derivatives(t + dt * 0.5, &state.apply(&k1, dt * 0.5), params);
    let k3 = model.derivatives(t + dt * 0.5, &state.apply(&k2, dt * 0.5), params);
    let k4 = model.derivatives(t + dt, &state.apply(&k3, dt), params);

    State(state.0 + (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0) * (dt / 6.0))
}

// ---------------------------------------------------------------------------
// Fixed-step propagation to ground impact
// ---------------------------------------------------------------------------

/// Propagate `initial` with a fixed step until altitude <= 0 or `span.stop`.
///
/// Fails with `NonFiniteState` or `OutOfDomain` as soon as a step leaves
/// the model's admissible region.
///
/// The initial sample is included. Steps are exactly `max_step` long except
/// the last one, which is shortened so no sample lies past `span.stop`.
pub fn propagate<M: Dynamics + ?Sized>(
    model: &M,
    initial: &State,
    span: TimeSpan,
    max_step: f64,
    params: &ModelParams,
) -> Result<TrajectoryResult> {
    if !(span.stop > span.start) {
        return Err(SimError::InvalidTimeSpan {
            start: span.start,
            stop: span.stop,
        });
    }
    if !(max_step > 0.0) || !max_step.is_finite() {
        return Err(SimError::InvalidStep(max_step));
    }
    if !initial.is_finite() {
        return Err(SimError::NonFiniteState { time: span.start });
    }
    if !model.admissible(initial) {
        return Err(SimError::OutOfDomain { time: span.start });
    }

    let capacity = (span.duration() / max_step).ceil().min(MAX_PREALLOCATED_STEPS) as usize + 1;
    let mut times = Vec::with_capacity(capacity);
    let mut states = Vec::with_capacity(capacity);

    let mut t = span.start;
    let mut state = *initial;
    times.push(t);
    states.push(state);

    while t < span.stop && state.altitude() > 0.0 {
        let dt = max_step.min(span.stop - t);
        state = rk4_step(model, t, &state, dt, params);
        t += dt;

        if !state.is_finite() {
            return Err(SimError::NonFiniteState { time: t });
        }
        if !model.admissible(&state) {
            return Err(SimError::OutOfDomain { time: t });
        }

        times.push(t);
        states.push(state);
    }

    Ok(TrajectoryResult::new(times, states))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
