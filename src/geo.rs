//! Downrange/crossrange offsets to latitude/longitude on a spherical Earth.
//!
//! Downrange runs along the launch azimuth, crossrange 90° clockwise from it.
//! The forward map uses the great-circle destination formula; the inverse
//! uses the haversine distance and the initial great-circle bearing, which
//! makes the pair round-trip to well under a meter at regional distances.

use serde::{Deserialize, Serialize};

use crate::physics::constants::EARTH_RADIUS;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Launch reference: site position and nominal azimuth (deg from North).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchSite {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub azimuth_deg: f64,
}

impl LaunchSite {
    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.latitude_deg, self.longitude_deg)
    }
}

/// Wrap a longitude into [-180, 180]. In-range values pass through untouched.
fn wrap_lon(lon_deg: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon_deg) {
        lon_deg
    } else {
        (lon_deg + 540.0).rem_euclid(360.0) - 180.0
    }
}

/// Project a downrange/crossrange offset from the launch point.
pub fn meters_to_latlon(
    launch_lat: f64,
    launch_lon: f64,
    azimuth_deg: f64,
    downrange_m: f64,
    crossrange_m: f64,
) -> GeoPoint {
    let distance = downrange_m.hypot(crossrange_m);
    if distance == 0.0 {
        return GeoPoint::new(launch_lat, wrap_lon(launch_lon));
    }

    // crossrange is 90° clockwise of downrange, so atan2(cross, down) is a
    // clockwise offset from the azimuth
    let bearing = (azimuth_deg + crossrange_m.atan2(downrange_m).to_degrees()).to_radians();
    let delta = distance / EARTH_RADIUS;

    let phi1 = launch_lat.to_radians();
    let lambda1 = launch_lon.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * bearing.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (bearing.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    GeoPoint::new(phi2.to_degrees(), wrap_lon(lambda2.to_degrees()))
}

/// Great-circle distance (m) and initial bearing (deg from North) between two points.
pub fn distance_and_bearing(from: GeoPoint, to: GeoPoint) -> (f64, f64) {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (to.lon - from.lon).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    let distance = EARTH_RADIUS * c;

    if distance == 0.0 {
        return (0.0, 0.0);
    }

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    (distance, y.atan2(x).to_degrees())
}

/// Inverse of [`meters_to_latlon`]: offset of `lat`/`lon` from the launch
/// point, split along and across the azimuth.
pub fn latlon_to_meters(
    launch_lat: f64,
    launch_lon: f64,
    lat: f64,
    lon: f64,
    azimuth_deg: f64,
) -> (f64, f64) {
    let (distance, bearing) =
        distance_and_bearing(GeoPoint::new(launch_lat, launch_lon), GeoPoint::new(lat, lon));
    let relative = (bearing - azimuth_deg).to_radians();
    (distance * relative.cos(), distance * relative.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn zero_offset_is_launch_point() {
        let p = meters_to_latlon(45.72341, 63.32275, 45.0, 0.0, 0.0);
        assert_eq!(p, GeoPoint::new(45.72341, 63.32275));
        let (dr, cr) = latlon_to_meters(45.72341, 63.32275, 45.72341, 63.32275, 45.0);
        assert_eq!((dr, cr), (0.0, 0.0));
    }

    #[test]
    fn due_north_moves_latitude_only() {
        let p = meters_to_latlon(0.0, 10.0, 0.0, 111_194.9, 0.0);
        assert!((p.lat - 1.0).abs() < 1e-4, "lat {}", p.lat);
        assert!((p.lon - 10.0).abs() < 1e-9);
    }

    #[test]
    fn crossrange_is_clockwise_of_downrange() {
        // azimuth North, positive crossrange points East
        let p = meters_to_latlon(0.0, 0.0, 0.0, 0.0, 50_000.0);
        assert!(p.lon > 0.0);
        assert!(p.lat.abs() < 1e-9);
    }

    #[test]
    fn longitude_wraps_across_antimeridian() {
        let p = meters_to_latlon(0.0, 179.9, 90.0, 50_000.0, 0.0);
        assert!(p.lon < -179.0, "lon {}", p.lon);
    }

    #[test]
    fn round_trip_within_one_meter() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..500 {
            let lat = rng.gen_range(-70.0..70.0);
            let lon = rng.gen_range(-180.0..180.0);
            let az = rng.gen_range(0.0..360.0);
            let dr = rng.gen_range(-400_000.0..400_000.0);
            let cr = rng.gen_range(-400_000.0..400_000.0);
            let p = meters_to_latlon(lat, lon, az, dr, cr);
            let (dr2, cr2) = latlon_to_meters(lat, lon, p.lat, p.lon, az);
            assert!(
                (dr - dr2).abs() < 1.0 && (cr - cr2).abs() < 1.0,
                "round trip ({}, {}) -> ({}, {}) from ({}, {}) az {}",
                dr, cr, dr2, cr2, lat, lon, az
            );
        }
    }
}
