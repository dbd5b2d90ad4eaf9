use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use debris_dispersion::dispersion::DEFAULT_CONFIDENCE;
use debris_dispersion::io::{csv, json, load_scenario, DispersionSummary, Scenario};
use debris_dispersion::monte_carlo::{run_batch, run_independent_trials, run_trial, FailurePolicy};
use debris_dispersion::physics::atmosphere;
use debris_dispersion::{Ellipse, ImpactRecord};

#[derive(Parser, Debug)]
#[command(name = "debris-dispersion")]
#[command(about = "Monte Carlo impact dispersion for falling rocket stages")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Monte Carlo analysis of a scenario.
    Run {
        /// Scenario YAML file (built-in reference scenario if omitted).
        scenario: Option<PathBuf>,

        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Replace every perturbation by its expected value.
        #[arg(long)]
        preview: bool,

        /// One random stream per trial (multi-threaded with the `parallel` feature).
        #[arg(long)]
        parallel: bool,

        /// Stop at the first failed trial instead of skipping it.
        #[arg(long)]
        abort_on_error: bool,

        #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
        confidence: f64,

        /// Write impact records as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the dispersion summary as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Propagate the nominal trajectory and print it.
    Trajectory {
        scenario: Option<PathBuf>,

        /// Write every sample as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print the built-in reference scenario as YAML.
    Reference,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Args::parse().command {
        Command::Run {
            scenario,
            iterations,
            seed,
            preview,
            parallel,
            abort_on_error,
            confidence,
            csv,
            json,
        } => {
            let mut scenario = scenario_or_reference(scenario)?;
            if let Some(n) = iterations {
                scenario.simulation.iterations = n;
            }
            if let Some(s) = seed {
                scenario.simulation.seed = s;
            }
            if preview {
                scenario.simulation = scenario.simulation.deterministic();
            }
            let policy = if abort_on_error {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Skip
            };
            run_monte_carlo(&scenario, parallel, policy, confidence, csv, json)
        }
        Command::Trajectory { scenario, csv } => {
            let scenario = scenario_or_reference(scenario)?;
            run_nominal(&scenario, csv)
        }
        Command::Reference => {
            print!("{}", Scenario::reference().to_yaml()?);
            Ok(())
        }
    }
}

fn scenario_or_reference(path: Option<PathBuf>) -> Result<Scenario> {
    match path {
        Some(p) => load_scenario(&p).with_context(|| format!("loading scenario {}", p.display())),
        None => Ok(Scenario::reference()),
    }
}

// ---------------------------------------------------------------------------
// Monte Carlo run
// ---------------------------------------------------------------------------

fn run_monte_carlo(
    scenario: &Scenario,
    parallel: bool,
    policy: FailurePolicy,
    confidence: f64,
    csv_path: Option<PathBuf>,
    json_path: Option<PathBuf>,
) -> Result<()> {
    let model = scenario.stage.model();
    let config = &scenario.simulation;

    let (records, failed, dropped) = if parallel {
        let mut records = Vec::new();
        let mut failed = 0;
        let mut dropped = 0;
        for outcome in run_independent_trials(&model, config)? {
            match outcome {
                Ok(o) => {
                    dropped += o.dropped_fragments;
                    records.extend(o.records);
                }
                Err(e) if policy == FailurePolicy::Abort => return Err(e.into()),
                Err(_) => failed += 1,
            }
        }
        (records, failed, dropped)
    } else {
        let step = (config.iterations / 10).max(1);
        let report = run_batch(&model, config, policy, |p| {
            if p.completed % step == 0 {
                info!(%p, "progress");
            }
            ControlFlow::Continue(())
        })?;
        (report.records, report.failures.len(), report.dropped_fragments)
    };

    let summary = DispersionSummary::from_records(&scenario.name, &records, &scenario.launch, confidence)?;
    print_summary(scenario, &summary, failed, dropped);

    if let Some(path) = csv_path {
        csv::write_impacts_file(&path, &records, &scenario.launch)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("  Impacts written to {}", path.display());
    }
    if let Some(path) = json_path {
        json::write_summary_file(&path, &summary)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("  Summary written to {}", path.display());
    }
    Ok(())
}

fn print_summary(scenario: &Scenario, summary: &DispersionSummary, failed: usize, dropped: usize) {
    let sim = &scenario.simulation;

    println!();
    println!("====================================================================");
    println!("  IMPACT DISPERSION — {}", scenario.name);
    println!("====================================================================");
    println!();
    println!("  Setup");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Launch:        {:>9.4}° N  {:>9.4}° E   azimuth {:>6.2}°",
        scenario.launch.latitude_deg, scenario.launch.longitude_deg, scenario.launch.azimuth_deg
    );
    println!(
        "  Stage:         {:<12}  dry mass {:>8.0} kg   area {:>6.1} m^2",
        scenario.stage.name, scenario.stage.dry_mass, scenario.stage.reference_area
    );
    println!(
        "  Trials:        {:>8}       seed {:>8}    dt {} s",
        sim.iterations, sim.seed, sim.time_step
    );
    if let Some(f) = &sim.fragmentation {
        println!(
            "  Breakup:       p={:.2}   window {:.0}-{:.0} m",
            f.breakup_probability, f.altitude_min, f.altitude_max
        );
    }
    println!();

    println!("  Impacts");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Primaries:     {:>8}       Fragments: {:>6}    Dropped: {:>4}    Failed trials: {:>4}",
        summary.primary_impacts, summary.fragment_impacts, dropped, failed
    );
    if let (Some(dr), Some(cr)) = (summary.downrange, summary.crossrange) {
        println!(
            "  {:<12}  {:>10}  {:>10}  {:>10}  {:>10}",
            "", "mean (km)", "std (km)", "min (km)", "max (km)"
        );
        for (label, s) in [("Downrange", dr), ("Crossrange", cr)] {
            println!(
                "  {:<12}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}",
                label,
                s.mean_m / 1000.0,
                s.std_m / 1000.0,
                s.min_m / 1000.0,
                s.max_m / 1000.0
            );
        }
    }
    println!();

    println!("  Dispersion ellipse ({:.1}% confidence)", summary.confidence * 100.0);
    println!("  ──────────────────────────────────────────────────────────────────");
    print_ellipse("All impacts", summary.ellipse_all.as_ref());
    print_ellipse("Primaries", summary.ellipse_primary.as_ref());
    println!("====================================================================");
    println!();
}

fn print_ellipse(label: &str, ellipse: Option<&Ellipse>) {
    match ellipse {
        Some(e) => println!(
            "  {:<12}  center {:>9.4}° N {:>9.4}° E   axes {:>7.2} x {:>7.2} km   bearing {:>7.2}°",
            label, e.center_lat, e.center_lon, e.semi_major_km, e.semi_minor_km, e.angle_deg
        ),
        None => println!("  {:<12}  (no impacts)", label),
    }
}

// ---------------------------------------------------------------------------
// Nominal trajectory
// ---------------------------------------------------------------------------

fn run_nominal(scenario: &Scenario, csv_path: Option<PathBuf>) -> Result<()> {
    let model = scenario.stage.model();
    let mut config = scenario.simulation.deterministic().with_iterations(1);
    config.fragmentation = None;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let outcome = run_trial(&model, &config, 0, &mut rng)?;
    let trajectory = &outcome.primary;
    let impact = ImpactRecord::from_trajectory(0, trajectory, None);
    let impact_geo = impact.to_geo(&scenario.launch);

    println!();
    println!("====================================================================");
    println!("  NOMINAL TRAJECTORY — {} / {}", scenario.name, scenario.stage.name);
    println!("====================================================================");
    println!();
    println!(
        "  {:>7}  {:>9}  {:>10}  {:>9}  {:>9}  {:>6}  {:>7}",
        "t (s)", "alt (m)", "down (km)", "cross (m)", "vel (m/s)", "Mach", "γ (deg)"
    );
    println!("  {}", "─".repeat(66));

    let states = trajectory.states();
    let sample_interval = (states.len() / 30).max(1);
    for (i, (t, s)) in trajectory.times().iter().zip(states).enumerate() {
        if i % sample_interval != 0 && i != states.len() - 1 {
            continue;
        }
        let mach = s.velocity() / atmosphere::at(s.altitude().max(0.0), 1.0).sound_speed;
        println!(
            "  {:>7.1}  {:>9.0}  {:>10.2}  {:>9.1}  {:>9.1}  {:>6.2}  {:>7.2}",
            t,
            s.altitude(),
            s.downrange() / 1000.0,
            s.crossrange(),
            s.velocity(),
            mach,
            s.flight_path_angle().to_degrees()
        );
    }

    println!();
    println!(
        "  Apogee:        {:>8.0} m   ({:.2} km)",
        trajectory.apogee(),
        trajectory.apogee() / 1000.0
    );
    println!(
        "  Impact:        t={:>6.1}s   range={:>7.2} km   vel={:>6.1} m/s",
        impact.impact_time_s,
        impact.downrange_m / 1000.0,
        impact.velocity_m_s
    );
    println!(
        "  Impact point:  {:>9.4}° N  {:>9.4}° E",
        impact_geo.lat, impact_geo.lon
    );
    if !trajectory.reached_ground() {
        println!("  (time span ended before ground impact)");
    }
    println!("  Simulation: {} samples, dt={} s", trajectory.len(), config.time_step);
    println!("====================================================================");
    println!();

    if let Some(path) = csv_path {
        csv::write_trajectory_file(&path, trajectory)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("  Trajectory written to {}", path.display());
    }
    Ok(())
}
