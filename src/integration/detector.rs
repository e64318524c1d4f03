//! Traits for the sensor and the object detection backend.

use crate::tracker::Detection;

/// One image from the cart camera.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Raw image bytes (format depends on the source)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture time in seconds; drives stabilization and eviction timing
    pub timestamp: f64,
}

/// Produces frames from a camera, a video file or a recording.
pub trait FrameSource {
    /// Error type for capture failures.
    type Error;

    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the reconciler.
/// Implementations should be deterministic for a given frame and free of side
/// effects.
///
/// # Example
///
/// ```ignore
/// use carttrack_rs::{Detection, DetectionSource, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return labelled boxes
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on a frame and return labelled detections.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Class-indexed raw output as many YOLO-style models emit it:
/// (class index, [x1, y1, x2, y2], confidence), plus the class names.
impl IntoDetections for (Vec<(usize, [f32; 4], f32)>, &[&str]) {
    fn into_detections(self) -> Vec<Detection> {
        let (raw, names) = self;
        raw.into_iter()
            .filter_map(|(class, [x1, y1, x2, y2], confidence)| {
                let label = names.get(class)?;
                Some(Detection::new(
                    *label,
                    x1 as i32,
                    y1 as i32,
                    x2 as i32,
                    y2 as i32,
                    confidence,
                ))
            })
            .collect()
    }
}
