use std::ops::ControlFlow;

use anyhow::anyhow;
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points};
use rand::rngs::StdRng;
use rand::SeedableRng;

use debris_dispersion::dispersion::DEFAULT_CONFIDENCE;
use debris_dispersion::io::{load_scenario, DispersionSummary, Scenario};
use debris_dispersion::monte_carlo::{run_batch, run_trial, FailurePolicy};
use debris_dispersion::{Ellipse, GeoPoint, TrajectoryResult};

const OUTLINE_POINTS: usize = 180;

fn main() -> anyhow::Result<()> {
    let scenario = match std::env::args().nth(1) {
        Some(path) => load_scenario(path)?,
        None => Scenario::reference(),
    };

    let model = scenario.stage.model();
    let report = run_batch(&model, &scenario.simulation, FailurePolicy::Skip, |_| {
        ControlFlow::Continue(())
    })?;

    let mut nominal_config = scenario.simulation.deterministic().with_iterations(1);
    nominal_config.fragmentation = None;
    let mut rng = StdRng::seed_from_u64(nominal_config.seed);
    let nominal = run_trial(&model, &nominal_config, 0, &mut rng)?.primary;

    let primaries = report.primaries().map(|r| r.to_geo(&scenario.launch)).collect();
    let fragments = report.fragments().map(|r| r.to_geo(&scenario.launch)).collect();
    let summary = DispersionSummary::from_records(
        &scenario.name,
        &report.records,
        &scenario.launch,
        DEFAULT_CONFIDENCE,
    )?;

    let app = DispersionViz {
        scenario,
        primaries,
        fragments,
        summary,
        nominal,
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Impact Dispersion", options, Box::new(|_| Ok(Box::new(app))))
        .map_err(|e| anyhow!("viewer failed: {e}"))
}

struct DispersionViz {
    scenario: Scenario,
    primaries: Vec<GeoPoint>,
    fragments: Vec<GeoPoint>,
    summary: DispersionSummary,
    nominal: TrajectoryResult,
}

fn lon_lat(points: &[GeoPoint]) -> PlotPoints<'static> {
    points.iter().map(|p| [p.lon, p.lat]).collect()
}

fn ring(ellipse: &Ellipse) -> PlotPoints<'static> {
    let mut outline = ellipse.outline(OUTLINE_POINTS);
    if let Some(first) = outline.first().copied() {
        outline.push(first);
    }
    lon_lat(&outline)
}

impl eframe::App for DispersionViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!(
                "Scenario: {}  |  Stage: {}",
                self.scenario.name, self.scenario.stage.name
            ));
            let axes = self
                .summary
                .ellipse_all
                .map(|e| format!("{:.1} x {:.1} km @ {:.1}°", e.semi_major_km, e.semi_minor_km, e.angle_deg))
                .unwrap_or_else(|| "n/a".into());
            ui.label(format!(
                "Primaries: {}  |  Fragments: {}  |  {:.1}% ellipse: {}",
                self.summary.primary_impacts,
                self.summary.fragment_impacts,
                self.summary.confidence * 100.0,
                axes,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Impact map
                ui.vertical(|ui| {
                    ui.label("Impact points (lon / lat, deg)");
                    Plot::new("impacts")
                        .width(half_w)
                        .height(available.y - 24.0)
                        .x_axis_label("Longitude (deg)")
                        .y_axis_label("Latitude (deg)")
                        .data_aspect(1.0)
                        .show(ui, |plot_ui| {
                            plot_ui.points(Points::new("Primary", lon_lat(&self.primaries)).radius(3.0));
                            plot_ui.points(Points::new("Fragment", lon_lat(&self.fragments)).radius(2.0));
                            if let Some(e) = &self.summary.ellipse_all {
                                plot_ui.line(Line::new("Ellipse (all)", ring(e)));
                            }
                            if let Some(e) = &self.summary.ellipse_primary {
                                plot_ui.line(Line::new("Ellipse (primary)", ring(e)));
                            }
                        });
                });

                // Nominal altitude vs downrange
                ui.vertical(|ui| {
                    ui.label("Nominal trajectory (km)");
                    let points: PlotPoints = self
                        .nominal
                        .states()
                        .iter()
                        .map(|s| [s.downrange() / 1000.0, s.altitude() / 1000.0])
                        .collect();
                    Plot::new("profile")
                        .width(half_w)
                        .height(available.y - 24.0)
                        .x_axis_label("Downrange (km)")
                        .y_axis_label("Altitude (km)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Trajectory", points));
                        });
                });
            });
        });
    }
}
