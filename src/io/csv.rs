use std::io::{self, Write};
use std::path::Path;

use crate::geo::LaunchSite;
use crate::sim::{ImpactRecord, TrajectoryResult};

/// Write impact records to CSV format.
///
/// Columns: trial, fragment, downrange_m, crossrange_m, lat_deg, lon_deg,
///          velocity_ms, fpa_deg, heading_deg, impact_time_s
///
/// `fragment` is empty for the primary body.
pub fn write_impacts<W: Write>(
    writer: &mut W,
    records: &[ImpactRecord],
    site: &LaunchSite,
) -> io::Result<()> {
    writeln!(
        writer,
        "trial,fragment,downrange_m,crossrange_m,lat_deg,lon_deg,\
         velocity_ms,fpa_deg,heading_deg,impact_time_s"
    )?;

    for r in records {
        let p = r.to_geo(site);
        let fragment = r.fragment_index.map(|i| i.to_string()).unwrap_or_default();
        writeln!(
            writer,
            "{},{},{:.2},{:.2},{:.6},{:.6},{:.2},{:.3},{:.3},{:.2}",
            r.trial,
            fragment,
            r.downrange_m,
            r.crossrange_m,
            p.lat,
            p.lon,
            r.velocity_m_s,
            r.flight_path_angle_rad.to_degrees(),
            r.heading_rad.to_degrees(),
            r.impact_time_s,
        )?;
    }

    Ok(())
}

/// Write impact records to a CSV file at the given path.
pub fn write_impacts_file(
    path: impl AsRef<Path>,
    records: &[ImpactRecord],
    site: &LaunchSite,
) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_impacts(&mut file, records, site)
}

/// Write one trajectory to CSV format.
///
/// Columns: time, downrange_m, crossrange_m, altitude_m, velocity_ms,
///          fpa_deg, heading_deg
pub fn write_trajectory<W: Write>(writer: &mut W, trajectory: &TrajectoryResult) -> io::Result<()> {
    writeln!(
        writer,
        "time,downrange_m,crossrange_m,altitude_m,velocity_ms,fpa_deg,heading_deg"
    )?;

    for (t, s) in trajectory.times().iter().zip(trajectory.states()) {
        writeln!(
            writer,
            "{:.2},{:.2},{:.2},{:.2},{:.2},{:.3},{:.3}",
            t,
            s.downrange(),
            s.crossrange(),
            s.altitude(),
            s.velocity(),
            s.flight_path_angle().to_degrees(),
            s.heading().to_degrees(),
        )?;
    }

    Ok(())
}

pub fn write_trajectory_file(path: impl AsRef<Path>, trajectory: &TrajectoryResult) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_trajectory(&mut file, trajectory)
}
