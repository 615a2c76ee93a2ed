use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::job::CameraId;

/// Payload pushed onto `<prefix>yolo:results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleCountResult {
    pub camera_id: CameraId,
    pub people_count: u32,
    /// File name of the snapshot, without its directory
    pub snapshot_path: String,
    pub counted_at: DateTime<Utc>,
}

impl PeopleCountResult {
    pub fn new(camera_id: CameraId, people_count: u32, image_path: &str) -> Self {
        Self {
            camera_id,
            people_count,
            snapshot_path: snapshot_name(image_path),
            counted_at: Utc::now(),
        }
    }
}

fn snapshot_name(image_path: &str) -> String {
    Path::new(image_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_name_strips_directory() {
        assert_eq!(snapshot_name("/var/snapshots/cam_1/1700000000.jpg"), "1700000000.jpg");
        assert_eq!(snapshot_name("frame.png"), "frame.png");
        assert_eq!(snapshot_name("/"), "");
    }

    #[test]
    fn test_serializes_wire_shape() {
        let result = PeopleCountResult::new(CameraId::from(3), 5, "/tmp/snaps/a.jpg");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["camera_id"], 3);
        assert_eq!(value["people_count"], 5);
        assert_eq!(value["snapshot_path"], "a.jpg");

        let counted_at = value["counted_at"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(counted_at).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_text_camera_id_round_trips_as_string() {
        let result = PeopleCountResult::new(CameraId::Text("gate-2".to_string()), 0, "b.jpg");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["camera_id"], "gate-2");
    }
}
