use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::dynamics::{Dynamics, ModelParams, State};
use crate::error::Result;
use crate::monte_carlo::config::{FragmentationParams, Perturbations, SimulationConfig};
use crate::sim::{propagate, ImpactRecord, TimeSpan, TrajectoryResult};

// ---------------------------------------------------------------------------
// One trial: sample -> propagate primary -> [breakup -> fragments] -> records
// ---------------------------------------------------------------------------

/// Flight state of the primary at the moment it broke up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakupEvent {
    /// Sample index in the primary trajectory.
    pub index: usize,
    pub time: f64,
    pub state: State,
}

/// Everything one trial produced.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub trial: usize,
    pub primary: TrajectoryResult,
    pub breakup: Option<BreakupEvent>,
    /// Primary record first, then surviving fragments in index order.
    pub records: Vec<ImpactRecord>,
    /// Fragments whose propagation failed and were left out.
    pub dropped_fragments: usize,
}

/// Separation state drawn from the configured perturbations.
fn sample_initial_state<R: Rng + ?Sized>(
    p: &Perturbations,
    nominal_azimuth_deg: f64,
    rng: &mut R,
) -> Result<State> {
    let altitude = p.altitude.sample(rng)?;
    let velocity = p.velocity.sample(rng)?;
    let gamma = p.flight_path_angle.sample(rng)?.to_radians();
    let azimuth = p.azimuth.sample(rng)?;
    let heading = (azimuth - nominal_azimuth_deg).to_radians();
    Ok(State::new(0.0, 0.0, altitude, velocity, gamma, heading))
}

/// Environment and mass for one body. `mass_fraction` scales the sampled mass.
fn sample_params<R: Rng + ?Sized>(
    p: &Perturbations,
    mass_fraction: f64,
    rng: &mut R,
) -> Result<ModelParams> {
    Ok(ModelParams {
        density_factor: p.density_factor.sample(rng)?,
        wind_along: p.wind_along.sample(rng)?,
        wind_cross: p.wind_cross.sample(rng)?,
        mass: Some(p.mass.sample(rng)? * mass_fraction),
        drag_scale: p.drag_scale.sample(rng)?,
    })
}

/// Decide whether the primary breaks up, and where.
///
/// The uniform draw is always taken so the random stream does not depend on
/// the trajectory shape.
fn check_breakup<R: Rng + ?Sized>(
    frag: &FragmentationParams,
    primary: &TrajectoryResult,
    rng: &mut R,
) -> Option<BreakupEvent> {
    let draw: f64 = rng.gen();
    if draw > frag.breakup_probability {
        return None;
    }
    let index = primary.first_in_altitude_window(frag.altitude_min, frag.altitude_max)?;
    Some(BreakupEvent {
        index,
        time: primary.times()[index],
        state: primary.states()[index],
    })
}

/// Initial state of one fragment shed at breakup state `at`.
///
/// Position is shared with the primary. A negative `delta_v` is floored at
/// zero; `spread` (radians) tilts the flight-path angle by half and the
/// heading by the full angle.
pub fn fragment_initial_state(at: &State, delta_v: f64, spread: f64) -> State {
    let delta_v = delta_v.max(0.0);
    State::new(
        at.downrange(),
        at.crossrange(),
        at.altitude(),
        at.velocity() + delta_v * spread.cos(),
        at.flight_path_angle() + spread / 2.0,
        at.heading() + spread,
    )
}

/// Sample and propagate every fragment of a breakup. Failed propagations are
/// counted and dropped; sampling errors are configuration errors and propagate.
fn propagate_fragments<M: Dynamics + ?Sized, R: Rng + ?Sized>(
    model: &M,
    config: &SimulationConfig,
    frag: &FragmentationParams,
    trial: usize,
    breakup: &BreakupEvent,
    rng: &mut R,
) -> Result<(Vec<ImpactRecord>, usize)> {
    let count = frag.fragment_count.sample(rng)?.round().max(2.0) as usize;
    let span = TimeSpan::new(breakup.time, breakup.time + config.fragment_max_time);
    let at = &breakup.state;

    let mut records = Vec::with_capacity(count);
    let mut dropped = 0;

    for i in 0..count {
        let delta_v = frag.delta_v.sample(rng)?;
        let spread = frag.spread_angle.sample(rng)?.to_radians();
        let params = sample_params(&config.perturbations, frag.mass_fraction(i), rng)?;
        let initial = fragment_initial_state(at, delta_v, spread);

        match propagate(model, &initial, span, config.time_step, &params) {
            Ok(traj) => records.push(ImpactRecord::from_trajectory(trial, &traj, Some(i))),
            Err(e) => {
                debug!(trial, fragment = i, error = %e, "fragment dropped");
                dropped += 1;
            }
        }
    }

    Ok((records, dropped))
}

/// Run a single Monte Carlo trial.
///
/// A failed primary propagation is returned as an error; fragment failures
/// are absorbed into [`TrialOutcome::dropped_fragments`].
pub fn run_trial<M: Dynamics + ?Sized, R: Rng + ?Sized>(
    model: &M,
    config: &SimulationConfig,
    trial: usize,
    rng: &mut R,
) -> Result<TrialOutcome> {
    let initial = sample_initial_state(&config.perturbations, config.nominal_azimuth_deg, rng)?;
    let params = sample_params(&config.perturbations, 1.0, rng)?;

    let primary = propagate(
        model,
        &initial,
        TimeSpan::new(0.0, config.max_time),
        config.time_step,
        &params,
    )?;

    let mut records = vec![ImpactRecord::from_trajectory(trial, &primary, None)];
    let mut breakup = None;
    let mut dropped_fragments = 0;

    if let Some(frag) = &config.fragmentation {
        breakup = check_breakup(frag, &primary, rng);
        if let Some(event) = &breakup {
            debug!(trial, altitude = event.state.altitude(), time = event.time, "breakup");
            let (fragments, dropped) = propagate_fragments(model, config, frag, trial, event, rng)?;
            records.extend(fragments);
            dropped_fragments = dropped;
        }
    }

    debug!(
        trial,
        downrange_km = records[0].downrange_m / 1000.0,
        fragments = records.len() - 1,
        "trial complete"
    );

    Ok(TrialOutcome {
        trial,
        primary,
        breakup,
        records,
        dropped_fragments,
    })
}

// ---------------------------------------------------------------------------
// Lazy Monte Carlo sequence
// ---------------------------------------------------------------------------

/// Whole trials of one Monte Carlo run, in order.
///
/// A failed trial yields one `Err` and the run moves on to the next trial,
/// so the caller decides whether to stop. The run owns its random generator,
/// seeded from the config.
pub struct Trials<'a, M: ?Sized> {
    model: &'a M,
    config: &'a SimulationConfig,
    rng: StdRng,
    next_trial: usize,
}

impl<'a, M: Dynamics + ?Sized> Trials<'a, M> {
    /// Validate the configuration and prepare a run.
    pub fn new(model: &'a M, config: &'a SimulationConfig) -> Result<Self> {
        config.validate()?;
        info!(
            iterations = config.iterations,
            seed = config.seed,
            fragmentation = config.fragmentation.is_some(),
            "starting Monte Carlo run"
        );
        Ok(Self {
            model,
            config,
            rng: StdRng::seed_from_u64(config.seed),
            next_trial: 0,
        })
    }

    /// Trials started so far.
    pub fn completed(&self) -> usize {
        self.next_trial
    }

    pub fn total(&self) -> usize {
        self.config.iterations
    }
}

impl<'a, M: Dynamics + ?Sized> Iterator for Trials<'a, M> {
    type Item = Result<TrialOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_trial >= self.config.iterations {
            return None;
        }
        let trial = self.next_trial;
        self.next_trial += 1;
        let outcome = run_trial(self.model, self.config, trial, &mut self.rng);
        if self.next_trial == self.config.iterations {
            info!(trials = self.next_trial, "Monte Carlo run finished");
        }
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.iterations - self.next_trial;
        (remaining, Some(remaining))
    }
}

/// Single-pass stream of impact records for one Monte Carlo run.
///
/// Each trial yields its primary record immediately followed by that trial's
/// fragment records. A failed trial yields one `Err` in place of its records.
pub struct MonteCarlo<'a, M: ?Sized> {
    trials: Trials<'a, M>,
    pending: VecDeque<ImpactRecord>,
}

impl<'a, M: Dynamics + ?Sized> MonteCarlo<'a, M> {
    /// Validate the configuration and prepare a run.
    pub fn new(model: &'a M, config: &'a SimulationConfig) -> Result<Self> {
        Ok(Self {
            trials: Trials::new(model, config)?,
            pending: VecDeque::new(),
        })
    }

    pub fn trials_completed(&self) -> usize {
        self.trials.completed()
    }

    pub fn total_trials(&self) -> usize {
        self.trials.total()
    }
}

impl<'a, M: Dynamics + ?Sized> Iterator for MonteCarlo<'a, M> {
    type Item = Result<ImpactRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.pop_front() {
            return Some(Ok(record));
        }
        match self.trials.next()? {
            Ok(outcome) => {
                let mut records = outcome.records.into_iter();
                let primary = records.next();
                self.pending.extend(records);
                primary.map(Ok)
            }
            Err(e) => Some(Err(e)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (remaining, _) = self.trials.size_hint();
        (self.pending.len() + remaining, None)
    }
}

/// Run every trial and collect all records, failing on the first trial error.
pub fn collect_impacts<M: Dynamics + ?Sized>(
    model: &M,
    config: &SimulationConfig,
) -> Result<Vec<ImpactRecord>> {
    MonteCarlo::new(model, config)?.collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{BallisticModel, Deriv};
    use crate::error::SimError;
    use crate::monte_carlo::config::FALLBACK_MASS_FRACTION;
    use crate::monte_carlo::perturbation::Perturbation;
    use crate::physics::aerodynamics::MachTable;
    use nalgebra::Vector6;

    fn stage() -> BallisticModel<MachTable> {
        BallisticModel::new(43.0, 30_600.0).with_drag(MachTable)
    }

    fn perturbations() -> Perturbations {
        Perturbations {
            altitude: Perturbation::normal(43_000.0, 500.0).unwrap(),
            velocity: Perturbation::normal(1738.0, 20.0).unwrap(),
            flight_path_angle: Perturbation::normal(25.0, 0.5).unwrap(),
            azimuth: Perturbation::normal(45.0, 0.5).unwrap(),
            density_factor: Perturbation::normal(1.0, 0.05).unwrap(),
            wind_along: Perturbation::normal(0.0, 10.0).unwrap(),
            wind_cross: Perturbation::normal(0.0, 10.0).unwrap(),
            mass: Perturbation::normal(30_600.0, 300.0).unwrap(),
            drag_scale: Perturbation::normal(1.0, 0.05).unwrap(),
        }
    }

    fn breakup(probability: f64, low: f64, high: f64) -> FragmentationParams {
        FragmentationParams {
            breakup_probability: probability,
            altitude_min: low,
            altitude_max: high,
            fragment_count: Perturbation::normal(3.0, 1.0).unwrap(),
            delta_v: Perturbation::normal(50.0, 20.0).unwrap(),
            spread_angle: Perturbation::normal(0.0, 10.0).unwrap(),
            mass_fractions: vec![0.4, 0.3, 0.2, 0.1],
            fallback_mass_fraction: FALLBACK_MASS_FRACTION,
        }
    }

    fn config(iterations: usize, seed: u64) -> SimulationConfig {
        SimulationConfig::new(iterations, seed, 45.0, perturbations())
    }

    #[test]
    fn same_seed_same_records() {
        let model = stage();
        let c = config(12, 99).with_fragmentation(breakup(0.5, 10_000.0, 30_000.0));
        let a = collect_impacts(&model, &c).unwrap();
        let b = collect_impacts(&model, &c).unwrap();
        assert_eq!(a, b);
        assert!(a.len() >= 12);
    }

    #[test]
    fn different_seed_different_records() {
        let model = stage();
        let a = collect_impacts(&model, &config(5, 1)).unwrap();
        let b = collect_impacts(&model, &config(5, 2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn one_primary_per_trial_without_fragmentation() {
        let model = stage();
        let records = collect_impacts(&model, &config(8, 3)).unwrap();
        assert_eq!(records.len(), 8);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.trial, i);
            assert!(!r.is_fragment());
        }
    }

    #[test]
    fn fragments_follow_their_primary() {
        let model = stage();
        let c = config(10, 5).with_fragmentation(breakup(1.0, 10_000.0, 30_000.0));
        let records = collect_impacts(&model, &c).unwrap();

        // dropped fragments leave gaps, but indices stay in order
        let mut current_trial = None;
        let mut next_fragment = 0;
        for r in &records {
            match r.fragment_index {
                None => {
                    current_trial = Some(r.trial);
                    next_fragment = 0;
                }
                Some(i) => {
                    assert_eq!(Some(r.trial), current_trial, "fragment detached from primary");
                    assert!(i >= next_fragment, "fragment {} out of order", i);
                    next_fragment = i + 1;
                }
            }
        }
        let fragments = records.iter().filter(|r| r.is_fragment()).count();
        assert!(fragments >= 10, "certain breakup gave only {} fragments", fragments);
    }

    #[test]
    fn breakup_state_lies_in_window() {
        let model = stage();
        let c = config(10, 11).with_fragmentation(breakup(1.0, 10_000.0, 30_000.0));
        let mut rng = StdRng::seed_from_u64(c.seed);
        for trial in 0..c.iterations {
            let outcome = run_trial(&model, &c, trial, &mut rng).unwrap();
            let event = outcome.breakup.expect("window is crossed by every descent");
            assert!((10_000.0..=30_000.0).contains(&event.state.altitude()));
            assert_eq!(event.state, outcome.primary.states()[event.index]);
            // first sample in the window
            assert!(outcome.primary.states()[..event.index]
                .iter()
                .all(|s| !(10_000.0..=30_000.0).contains(&s.altitude())));
            let fragments = outcome.records.iter().filter(|r| r.is_fragment()).count();
            assert!(fragments + outcome.dropped_fragments >= 2);
            assert_eq!(outcome.records.len(), fragments + 1);
        }
    }

    #[test]
    fn unreachable_window_means_no_fragments() {
        let model = stage();
        let c = config(6, 4).with_fragmentation(breakup(1.0, 150_000.0, 160_000.0));
        let records = collect_impacts(&model, &c).unwrap();
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| !r.is_fragment()));
    }

    #[test]
    fn zero_probability_means_no_fragments() {
        let model = stage();
        let c = config(6, 4).with_fragmentation(breakup(0.0, 10_000.0, 30_000.0));
        let records = collect_impacts(&model, &c).unwrap();
        assert!(records.iter().all(|r| !r.is_fragment()));
    }

    #[test]
    fn deterministic_preview_repeats_nominal_impact() {
        let model = stage();
        let c = config(4, 8).deterministic();
        let records = collect_impacts(&model, &c).unwrap();
        let first = records[0];
        for r in &records[1..] {
            assert_eq!(r.downrange_m, first.downrange_m);
            assert_eq!(r.crossrange_m, first.crossrange_m);
        }
        assert!(first.crossrange_m.abs() < 1e-6);
    }

    /// Ballistic stage whose equations blow up for light bodies.
    struct BrittleFragments(BallisticModel<MachTable>);

    impl Dynamics for BrittleFragments {
        fn derivatives(&self, t: f64, state: &State, params: &ModelParams) -> Deriv {
            if params.mass.unwrap_or(0.0) < 20_000.0 {
                Deriv(Vector6::repeat(f64::NAN))
            } else {
                self.0.derivatives(t, state, params)
            }
        }
    }

    #[test]
    fn failed_fragments_are_dropped_not_fatal() {
        let model = BrittleFragments(stage());
        let c = config(5, 21).with_fragmentation(breakup(1.0, 10_000.0, 30_000.0));
        let mut trials = 0;
        for outcome in Trials::new(&model, &c).unwrap() {
            let outcome = outcome.unwrap();
            assert_eq!(outcome.records.len(), 1);
            assert!(outcome.dropped_fragments >= 2);
            trials += 1;
        }
        assert_eq!(trials, 5);
    }

    /// Every body diverges.
    struct AlwaysNan;

    impl Dynamics for AlwaysNan {
        fn derivatives(&self, _t: f64, _state: &State, _params: &ModelParams) -> Deriv {
            Deriv(Vector6::repeat(f64::NAN))
        }
    }

    #[test]
    fn primary_failure_surfaces_and_stream_continues() {
        let c = config(3, 2);
        let items: Vec<_> = MonteCarlo::new(&AlwaysNan, &c).unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items
            .iter()
            .all(|r| matches!(r, Err(SimError::NonFiniteState { .. }))));
        assert!(collect_impacts(&AlwaysNan, &c).is_err());
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let model = stage();
        let mut c = config(3, 2);
        c.time_step = -1.0;
        assert!(MonteCarlo::new(&model, &c).is_err());
    }

    #[test]
    fn trial_stream_matches_record_stream() {
        let model = stage();
        let c = config(8, 13).with_fragmentation(breakup(0.5, 10_000.0, 30_000.0));
        let by_trial: Vec<ImpactRecord> = Trials::new(&model, &c)
            .unwrap()
            .flat_map(|o| o.unwrap().records)
            .collect();
        assert_eq!(by_trial, collect_impacts(&model, &c).unwrap());

        let mut run = MonteCarlo::new(&model, &c).unwrap();
        assert_eq!(run.total_trials(), 8);
        assert!(run.next().is_some());
        assert_eq!(run.trials_completed(), 1);
    }

    fn breakup_at() -> State {
        State::new(120_000.0, -300.0, 20_000.0, 1500.0, -0.4, 0.02)
    }

    #[test]
    fn fragment_state_keeps_position() {
        let at = breakup_at();
        let s = fragment_initial_state(&at, 50.0, 0.3);
        assert_eq!(s.downrange(), at.downrange());
        assert_eq!(s.crossrange(), at.crossrange());
        assert_eq!(s.altitude(), at.altitude());
    }

    #[test]
    fn fragment_state_applies_delta_v_and_spread() {
        let at = breakup_at();
        let spread = 10.0_f64.to_radians();
        let s = fragment_initial_state(&at, 50.0, spread);
        assert!((s.velocity() - (1500.0 + 50.0 * spread.cos())).abs() < 1e-9);
        assert!((s.flight_path_angle() - (-0.4 + spread / 2.0)).abs() < 1e-12);
        assert!((s.heading() - (0.02 + spread)).abs() < 1e-12);

        // negative spread mirrors the angles, velocity gain is unchanged
        let m = fragment_initial_state(&at, 50.0, -spread);
        assert!((m.velocity() - s.velocity()).abs() < 1e-9);
        assert!((m.flight_path_angle() - (-0.4 - spread / 2.0)).abs() < 1e-12);
        assert!((m.heading() - (0.02 - spread)).abs() < 1e-12);
    }

    #[test]
    fn negative_delta_v_is_floored() {
        let at = breakup_at();
        let s = fragment_initial_state(&at, -30.0, 0.0);
        assert_eq!(s.velocity(), at.velocity());
        assert_eq!(s.flight_path_angle(), at.flight_path_angle());
        assert_eq!(s.heading(), at.heading());
    }

    #[test]
    fn fragment_mass_uses_fraction_then_fallback() {
        let mut p = perturbations().deterministic();
        p.mass = Perturbation::constant(10_000.0);
        let frag = breakup(1.0, 10_000.0, 30_000.0);
        let mut rng = StdRng::seed_from_u64(0);
        let masses: Vec<f64> = (0..6)
            .map(|i| sample_params(&p, frag.mass_fraction(i), &mut rng).unwrap().mass.unwrap())
            .collect();
        let expected = [4000.0, 3000.0, 2000.0, 1000.0, 500.0, 500.0];
        for (m, e) in masses.iter().zip(expected) {
            assert!((m - e).abs() < 1e-9, "mass {} expected {}", m, e);
        }
    }

    #[test]
    fn heading_relative_to_nominal_azimuth() {
        let mut p = perturbations().deterministic();
        p.azimuth = Perturbation::constant(50.0);
        let mut rng = StdRng::seed_from_u64(0);
        let s = sample_initial_state(&p, 45.0, &mut rng).unwrap();
        assert!((s.heading() - 5.0_f64.to_radians()).abs() < 1e-12);
        assert_eq!(s.downrange(), 0.0);
        assert_eq!(s.crossrange(), 0.0);
    }
}
