use crate::config::CameraSettings;
use chrono::{DateTime, Datelike, Local, TimeZone};

const SNAPSHOT_ROOT: &str = "snapshots";

/// Relative key for a snapshot taken now, in local wall-clock time:
/// `snapshots/<camera>/<year>/<month>/<day>/<unix-seconds>`.
///
/// The camera name is lower-cased but otherwise used verbatim, so it must
/// not contain path separators.
pub fn path_for_snapshot(camera: &CameraSettings) -> String {
    path_for_snapshot_at(camera, &Local::now())
}

pub fn path_for_snapshot_at<Tz: TimeZone>(camera: &CameraSettings, at: &DateTime<Tz>) -> String {
    format!(
        "{SNAPSHOT_ROOT}/{camera}/{year}/{month}/{day}/{timestamp}",
        camera = path_for_camera(camera),
        year = at.year(),
        month = at.month(),
        day = at.day(),
        timestamp = at.timestamp(),
    )
}

fn path_for_camera(camera: &CameraSettings) -> String {
    camera.name.to_lowercase()
}
