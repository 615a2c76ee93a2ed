use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera identifier as sent by the web application.
///
/// Either a JSON number or a string key; echoed back untouched in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(untagged)]
pub enum CameraId {
    Number(#[garde(custom(nonzero_id))] serde_json::Number),
    Text(#[garde(length(min = 1))] String),
}

fn nonzero_id(value: &serde_json::Number, _ctx: &()) -> garde::Result {
    if value.as_f64() == Some(0.0) {
        return Err(garde::Error::new("camera id must not be zero"));
    }
    Ok(())
}

impl From<i64> for CameraId {
    fn from(id: i64) -> Self {
        CameraId::Number(id.into())
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraId::Number(id) => write!(f, "{}", id),
            CameraId::Text(id) => f.write_str(id),
        }
    }
}

/// People-counting job popped from `<prefix>yolo:jobs`.
///
/// Both fields are optional at the wire level so that a well-formed but
/// incomplete payload is rejected by validation rather than by the parser.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CountJob {
    #[serde(default)]
    #[garde(required, dive)]
    pub camera_id: Option<CameraId>,

    #[serde(default)]
    #[garde(required, length(min = 1))]
    pub image_path: Option<String>,
}

impl CountJob {
    pub fn new(camera_id: CameraId, image_path: impl Into<String>) -> Self {
        Self {
            camera_id: Some(camera_id),
            image_path: Some(image_path.into()),
        }
    }

    /// Parse a raw queue payload.
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
