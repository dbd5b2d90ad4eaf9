use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dispersion::{compute_dispersion_ellipse, Ellipse};
use crate::error::Result;
use crate::geo::{GeoPoint, LaunchSite};
use crate::sim::ImpactRecord;

/// Mean, spread and extremes of one impact coordinate, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisStats {
    pub mean_m: f64,
    pub std_m: f64,
    pub min_m: f64,
    pub max_m: f64,
}

impl AxisStats {
    /// `None` for an empty sample. Spread uses the n-1 estimator.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Some(Self {
            mean_m: mean,
            std_m: std,
            min_m: values.iter().copied().fold(f64::INFINITY, f64::min),
            max_m: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Summary statistics of a Monte Carlo impact set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispersionSummary {
    pub scenario: String,
    pub launch: LaunchSite,
    pub trials_with_impacts: usize,
    pub primary_impacts: usize,
    pub fragment_impacts: usize,
    pub confidence: f64,
    pub downrange: Option<AxisStats>,
    pub crossrange: Option<AxisStats>,
    /// Ellipse over every impact, fragments included.
    pub ellipse_all: Option<Ellipse>,
    pub ellipse_primary: Option<Ellipse>,
}

impl DispersionSummary {
    pub fn from_records(
        scenario: impl Into<String>,
        records: &[ImpactRecord],
        site: &LaunchSite,
        confidence: f64,
    ) -> Result<Self> {
        let all: Vec<GeoPoint> = records.iter().map(|r| r.to_geo(site)).collect();
        let primary: Vec<GeoPoint> = records
            .iter()
            .filter(|r| !r.is_fragment())
            .map(|r| r.to_geo(site))
            .collect();

        let ellipse = |points: &[GeoPoint]| -> Result<Option<Ellipse>> {
            if points.is_empty() {
                Ok(None)
            } else {
                compute_dispersion_ellipse(points, confidence).map(Some)
            }
        };

        let downrange: Vec<f64> = records.iter().map(|r| r.downrange_m).collect();
        let crossrange: Vec<f64> = records.iter().map(|r| r.crossrange_m).collect();
        let trials: BTreeSet<usize> = records.iter().map(|r| r.trial).collect();

        Ok(Self {
            scenario: scenario.into(),
            launch: *site,
            trials_with_impacts: trials.len(),
            primary_impacts: primary.len(),
            fragment_impacts: records.len() - primary.len(),
            confidence,
            downrange: AxisStats::from_values(&downrange),
            crossrange: AxisStats::from_values(&crossrange),
            ellipse_all: ellipse(&all)?,
            ellipse_primary: ellipse(&primary)?,
        })
    }
}

/// Write the summary as pretty-printed JSON.
pub fn write_summary<W: Write>(writer: &mut W, summary: &DispersionSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)?;
    Ok(())
}

/// Write summary JSON to a file.
pub fn write_summary_file(path: impl AsRef<Path>, summary: &DispersionSummary) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, summary)
}
