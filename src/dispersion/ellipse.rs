use std::f64::consts::PI;

use nalgebra::{DMatrix, Matrix2, SymmetricEigen, Vector2};
use serde::{Deserialize, Serialize};

use crate::dispersion::chi2::QuantileSource;
use crate::error::{Result, SimError};
use crate::geo::GeoPoint;
use crate::physics::constants::KM_PER_DEG;

/// Size of the ellipse returned for a single point, km.
const MINIMAL_AXIS_KM: f64 = 1.0;

pub const DEFAULT_CONFIDENCE: f64 = 0.997;

// ---------------------------------------------------------------------------
// Confidence ellipse
// ---------------------------------------------------------------------------

/// Confidence region of an impact cloud.
///
/// `angle_deg` is the bearing of the major axis, clockwise from North,
/// in [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center_lat: f64,
    pub center_lon: f64,
    pub semi_major_km: f64,
    pub semi_minor_km: f64,
    pub angle_deg: f64,
}

impl Ellipse {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_lat, self.center_lon)
    }

    pub fn area_km2(&self) -> f64 {
        PI * self.semi_major_km * self.semi_minor_km
    }

    /// `n` points on the boundary, starting at the tip of the major axis.
    /// Uses the same flattened km-per-degree approximation as the fit.
    pub fn outline(&self, n: usize) -> Vec<GeoPoint> {
        let bearing = self.angle_deg.to_radians();
        let km_per_deg_lon = KM_PER_DEG * self.center_lat.to_radians().cos();

        (0..n)
            .map(|k| {
                let theta = 2.0 * PI * k as f64 / n as f64;
                let a = self.semi_major_km * theta.cos();
                let b = self.semi_minor_km * theta.sin();
                // minor axis lies 90° clockwise of the major axis
                let north = a * bearing.cos() - b * bearing.sin();
                let east = a * bearing.sin() + b * bearing.cos();
                let d_lon = if km_per_deg_lon.abs() > 1e-9 {
                    east / km_per_deg_lon
                } else {
                    0.0
                };
                GeoPoint::new(self.center_lat + north / KM_PER_DEG, self.center_lon + d_lon)
            })
            .collect()
    }
}

/// Fit a confidence ellipse to impact points.
pub fn compute_dispersion_ellipse(points: &[GeoPoint], confidence: f64) -> Result<Ellipse> {
    compute_with_source(points, confidence, QuantileSource::detect())
}

/// Fit from an N×2 matrix of `[lat, lon]` rows.
pub fn dispersion_ellipse_from_matrix(points: &DMatrix<f64>, confidence: f64) -> Result<Ellipse> {
    if points.ncols() != 2 {
        return Err(SimError::InvalidInput(format!(
            "expected an N×2 array of (lat, lon), got {}×{}",
            points.nrows(),
            points.ncols()
        )));
    }
    let pts: Vec<GeoPoint> = points
        .row_iter()
        .map(|row| GeoPoint::new(row[0], row[1]))
        .collect();
    compute_dispersion_ellipse(&pts, confidence)
}

/// Fit with an explicit chi-squared quantile source.
pub fn compute_with_source(
    points: &[GeoPoint],
    confidence: f64,
    source: QuantileSource,
) -> Result<Ellipse> {
    let chi2 = source.quantile(confidence)?;

    if points.iter().any(|p| !p.lat.is_finite() || !p.lon.is_finite()) {
        return Err(SimError::InvalidInput("points must be finite".into()));
    }

    match points {
        [] => return Err(SimError::InvalidInput("no points to fit".into())),
        [only] => {
            return Ok(Ellipse {
                center_lat: only.lat,
                center_lon: only.lon,
                semi_major_km: MINIMAL_AXIS_KM,
                semi_minor_km: MINIMAL_AXIS_KM,
                angle_deg: 0.0,
            })
        }
        _ => {}
    }

    // --- Center ---
    let n = points.len() as f64;
    let center = points
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, p| acc + Vector2::new(p.lat, p.lon))
        / n;

    // --- Sample covariance of (lat, lon) ---
    let cov = points.iter().fold(Matrix2::zeros(), |acc: Matrix2<f64>, p| {
        let d = Vector2::new(p.lat, p.lon) - center;
        acc + d * d.transpose()
    }) / (n - 1.0);

    // --- Principal axes, major first ---
    let eig = SymmetricEigen::new(cov);
    let (major, minor) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let major_var = eig.eigenvalues[major].max(0.0);
    let minor_var = eig.eigenvalues[minor].max(0.0);
    let major_vec = eig.eigenvectors.column(major);

    // --- Degrees to km (mean of lat and lon degree lengths) ---
    let km_per_deg = 0.5 * (KM_PER_DEG + KM_PER_DEG * center[0].to_radians().cos());
    let semi_major_km = (major_var * chi2).sqrt() * km_per_deg;
    let semi_minor_km = (minor_var * chi2).sqrt() * km_per_deg;

    // --- Orientation: math angle (from East, CCW) -> bearing (from North, CW) ---
    let math_angle = major_vec[0].atan2(major_vec[1]).to_degrees();
    let angle_deg = normalize_angle(90.0 - math_angle);

    Ok(Ellipse {
        center_lat: center[0],
        center_lon: center[1],
        semi_major_km,
        semi_minor_km,
        angle_deg,
    })
}

/// Wrap an angle in degrees into [-180, 180].
fn normalize_angle(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && deg > 0.0 {
        180.0
    } else {
        wrapped
    }
}
