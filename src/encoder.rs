//! Biometric encoder seam.
//!
//! The orchestrator and enrollment service consume face encoding through
//! this trait so they can run against an instrumented stand-in in tests;
//! the production implementation is the vision pipeline.

use thiserror::Error;

use crate::deadline::Deadline;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// The payload could not be decoded as an image at all.
    #[error("could not decode image data")]
    InvalidImage,
    /// The image decoded fine but contains no detectable face.
    #[error("no face detected in image")]
    NoFace,
    #[error("encoding timed out")]
    Timeout,
    /// Inference-side failure; the cause is kept for logs.
    #[error("face encoding failed")]
    Backend(#[source] anyhow::Error),
}

pub trait FaceEncoder {
    /// Turn raw image bytes into a face descriptor, or report why not.
    ///
    /// With several faces in frame the most prominent one is encoded
    /// (highest detection score, larger box on ties).
    fn encode(&mut self, image: &[u8], deadline: Deadline) -> Result<Vec<f32>, EncodeError>;

    /// Version tag recorded next to stored references; references from
    /// another version are not comparable.
    fn model_version(&self) -> &str;
}

impl FaceEncoder for facegate_vision::Pipeline {
    fn encode(&mut self, image: &[u8], deadline: Deadline) -> Result<Vec<f32>, EncodeError> {
        if deadline.expired() {
            return Err(EncodeError::Timeout);
        }
        self.encode_image(image).map_err(|e| match e {
            facegate_vision::VisionError::InvalidImage(_) => EncodeError::InvalidImage,
            facegate_vision::VisionError::NoFace => EncodeError::NoFace,
            facegate_vision::VisionError::Inference(cause) => EncodeError::Backend(cause),
        })
    }

    fn model_version(&self) -> &str {
        facegate_vision::MODEL_VERSION
    }
}
