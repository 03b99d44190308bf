//! Face detection capability seam.
//!
//! Detection is an external, best-effort capability: the pipeline asks
//! for the single most confident face and treats every failure mode —
//! missing backend, backend error, malformed output — as "no face",
//! falling back to a plain centered crop. Nothing here is fatal.

use facecrop_core::{FaceBox, RasterImage};
use thiserror::Error;

/// Errors a detector backend may report.
///
/// The pipeline never surfaces these; they downgrade to "no detection".
#[derive(Debug, Error)]
pub enum DetectError {
    /// The backend failed to run on this image.
    #[error("Face detection failed: {0}")]
    Backend(String),
}

/// One detected face, most confident first in a detector's output.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Where the face was found, in image pixel coordinates.
    pub bounding_box: FaceBox,
    /// Detection confidence score.
    pub confidence: f64,
}

/// Pluggable face detection backend.
///
/// Implementations return detections ordered by descending confidence;
/// only the first is used. Accuracy, latency, and determinism are not
/// part of the contract.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a decoded image.
    fn detect(&self, image: &RasterImage) -> Result<Vec<Detection>, DetectError>;
}

/// Reduce a detector result to the single usable face box, if any.
///
/// Takes the first (most confident) detection, rejects malformed boxes
/// (non-finite values or non-positive dimensions), and clamps
/// out-of-range boxes into the image. A box left without positive area
/// after clamping is discarded.
pub fn primary_face(
    detections: &[Detection],
    image_width: f64,
    image_height: f64,
) -> Option<FaceBox> {
    let raw = detections.first()?.bounding_box;

    let finite = [raw.origin_x, raw.origin_y, raw.width, raw.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite || raw.width <= 0.0 || raw.height <= 0.0 {
        return None;
    }

    let x0 = raw.origin_x.clamp(0.0, image_width);
    let y0 = raw.origin_y.clamp(0.0, image_height);
    let x1 = (raw.origin_x + raw.width).clamp(0.0, image_width);
    let y1 = (raw.origin_y + raw.height).clamp(0.0, image_height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(FaceBox::new(x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection {
            bounding_box: FaceBox::new(x, y, w, h),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_primary_face_takes_first() {
        let detections = vec![detection(10.0, 10.0, 50.0, 50.0), detection(0.0, 0.0, 5.0, 5.0)];
        let face = primary_face(&detections, 100.0, 100.0).unwrap();
        assert_eq!(face, FaceBox::new(10.0, 10.0, 50.0, 50.0));
    }

    #[test]
    fn test_primary_face_empty() {
        assert!(primary_face(&[], 100.0, 100.0).is_none());
    }

    #[test]
    fn test_primary_face_clamps_overhang() {
        // Detectors may report boxes past the image edge.
        let detections = vec![detection(80.0, -10.0, 40.0, 40.0)];
        let face = primary_face(&detections, 100.0, 100.0).unwrap();
        assert_eq!(face, FaceBox::new(80.0, 0.0, 20.0, 30.0));
    }

    #[test]
    fn test_primary_face_rejects_malformed() {
        assert!(primary_face(&[detection(10.0, 10.0, -5.0, 20.0)], 100.0, 100.0).is_none());
        assert!(primary_face(&[detection(f64::NAN, 10.0, 20.0, 20.0)], 100.0, 100.0).is_none());
        assert!(primary_face(&[detection(10.0, 10.0, 0.0, 0.0)], 100.0, 100.0).is_none());
    }

    #[test]
    fn test_primary_face_rejects_fully_outside() {
        let detections = vec![detection(200.0, 200.0, 50.0, 50.0)];
        assert!(primary_face(&detections, 100.0, 100.0).is_none());
    }
}
