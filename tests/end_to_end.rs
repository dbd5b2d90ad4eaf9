use std::ops::ControlFlow;

use debris_dispersion::dispersion::compute_dispersion_ellipse;
use debris_dispersion::geo::distance_and_bearing;
use debris_dispersion::io::{csv, json, load_scenario, DispersionSummary, Scenario};
use debris_dispersion::monte_carlo::{collect_impacts, run_batch, FailurePolicy};
use debris_dispersion::{GeoPoint, ImpactRecord};

fn reference_records() -> (Scenario, Vec<ImpactRecord>) {
    let scenario = Scenario::reference();
    let records = collect_impacts(&scenario.stage.model(), &scenario.simulation).unwrap();
    (scenario, records)
}

#[test]
fn reference_scenario_lands_downrange() {
    let (scenario, records) = reference_records();
    let origin = scenario.launch.origin();

    let primaries: Vec<&ImpactRecord> = records.iter().filter(|r| !r.is_fragment()).collect();
    assert_eq!(primaries.len(), scenario.simulation.iterations);

    for r in &primaries {
        let (dist, bearing) = distance_and_bearing(origin, r.to_geo(&scenario.launch));
        assert!(
            (200_000.0..350_000.0).contains(&dist),
            "trial {} landed {:.1} km away",
            r.trial,
            dist / 1000.0
        );
        assert!((40.0..50.0).contains(&bearing), "trial {} bearing {:.2}", r.trial, bearing);
        assert!(r.velocity_m_s > 0.0);
        assert!(r.flight_path_angle_rad < 0.0, "should be descending at impact");
    }

    let fragments: Vec<&ImpactRecord> = records.iter().filter(|r| r.is_fragment()).collect();
    assert!(!fragments.is_empty(), "30% breakup chance over 50 trials produced no fragments");
    // about 15 breakups of mostly two fragments each; the bound is statistical
    // and would need roughly 26 breakups out of 50 to fail
    assert!(
        fragments.len() < scenario.simulation.iterations,
        "{} fragment records from {} trials",
        fragments.len(),
        scenario.simulation.iterations
    );
    for f in fragments {
        assert!(f.downrange_m.is_finite() && f.crossrange_m.is_finite());
        let (dist, _) = distance_and_bearing(origin, f.to_geo(&scenario.launch));
        assert!(dist < 400_000.0, "fragment landed {:.1} km away", dist / 1000.0);
    }
}

#[test]
fn runs_are_reproducible() {
    let (scenario, first) = reference_records();
    let second = collect_impacts(&scenario.stage.model(), &scenario.simulation).unwrap();
    assert_eq!(first, second);

    let reseeded = scenario.simulation.clone().with_seed(scenario.simulation.seed + 1);
    let third = collect_impacts(&scenario.stage.model(), &reseeded).unwrap();
    assert_ne!(first, third);
}

#[test]
fn shipped_scenario_file_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/reference.yaml");
    let scenario = load_scenario(path).unwrap();
    assert_eq!(scenario, Scenario::reference());
}

#[test]
fn preview_collapses_the_cloud() {
    let scenario = Scenario::reference();
    let mut preview = scenario.simulation.deterministic().with_iterations(5);
    preview.fragmentation = None;
    let records = collect_impacts(&scenario.stage.model(), &preview).unwrap();

    let points: Vec<GeoPoint> = records.iter().map(|r| r.to_geo(&scenario.launch)).collect();
    let ellipse = compute_dispersion_ellipse(&points, 0.997).unwrap();
    assert!(ellipse.semi_major_km < 1e-6, "preview spread {:.3} km", ellipse.semi_major_km);
}

#[test]
fn dispersion_ellipse_is_centered_on_the_cloud() {
    let (scenario, records) = reference_records();
    let summary = DispersionSummary::from_records("ref", &records, &scenario.launch, 0.997).unwrap();

    let e = summary.ellipse_primary.unwrap();
    assert!(e.semi_major_km > e.semi_minor_km && e.semi_minor_km > 0.0);
    let (dist, _) = distance_and_bearing(scenario.launch.origin(), e.center());
    assert!((200_000.0..350_000.0).contains(&dist));
    // downrange scatter dominates crossrange scatter
    let dr = summary.downrange.unwrap();
    let cr = summary.crossrange.unwrap();
    assert!(dr.std_m > cr.std_m);
}

#[test]
fn batch_report_exports() {
    let scenario = Scenario::reference();
    let config = scenario.simulation.clone().with_iterations(10);
    let report = run_batch(&scenario.stage.model(), &config, FailurePolicy::Skip, |_| {
        ControlFlow::Continue(())
    })
    .unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.primaries().count(), 10);

    let mut buf = Vec::new();
    csv::write_impacts(&mut buf, &report.records, &scenario.launch).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), report.records.len() + 1);

    let summary = DispersionSummary::from_records(&scenario.name, &report.records, &scenario.launch, 0.95).unwrap();
    let mut buf = Vec::new();
    json::write_summary(&mut buf, &summary).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(value["primary_impacts"], 10);
    assert_eq!(value["scenario"], "reference");
}
