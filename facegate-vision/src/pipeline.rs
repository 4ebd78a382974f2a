use std::path::Path;

use anyhow::Result;
use image::DynamicImage;
use ort::session::Session;
use thiserror::Error;

use crate::{detect, encode};

/// Failures the pipeline distinguishes for its callers. Undecodable bytes and
/// a decodable image with no face in it are different outcomes.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("could not decode image data")]
    InvalidImage(#[from] image::ImageError),
    #[error("no face detected in image")]
    NoFace,
    #[error(transparent)]
    Inference(#[from] anyhow::Error),
}

/// Full pipeline: decode → detect → crop → encode
pub struct Pipeline {
    detector: Session,
    recognizer: Session,
    score_threshold: f32,
}

impl Pipeline {
    /// Load both model sessions from disk.
    pub fn open(
        detector_model: &Path,
        recognizer_model: &Path,
        score_threshold: f32,
    ) -> Result<Self> {
        Ok(Self {
            detector: crate::model::detector_session(detector_model)?,
            recognizer: crate::model::recognizer_session(recognizer_model)?,
            score_threshold,
        })
    }

    /// Encode raw image bytes to a face descriptor.
    pub fn encode_image(&mut self, image: &[u8]) -> Result<Vec<f32>, VisionError> {
        let img = image::load_from_memory(image)?;
        self.encode_decoded(&img)
    }

    /// Encode an already-decoded image to a face descriptor.
    ///
    /// When several faces are present, the most prominent one is encoded:
    /// highest detection score, ties broken by larger bounding box.
    pub fn encode_decoded(&mut self, img: &DynamicImage) -> Result<Vec<f32>, VisionError> {
        let detections = detect::detect_faces(&mut self.detector, img, self.score_threshold)?;
        let best = detect::most_prominent(&detections).ok_or(VisionError::NoFace)?;
        log::debug!(
            "{} face(s) detected, encoding best with score {:.3}",
            detections.len(),
            best.score
        );

        let face = crop_face(img, best);
        let vector = encode::encode_face(&mut self.recognizer, &face)?;
        Ok(vector)
    }
}

/// Margin added around the detection box before cropping, as a fraction of
/// the box size on each side.
const CROP_MARGIN: f32 = 0.125;

fn crop_face(img: &DynamicImage, det: &detect::Detection) -> DynamicImage {
    use image::GenericImageView;
    let (img_w, img_h) = img.dimensions();
    let (x, y, w, h) = crop_rect(img_w, img_h, det.bbox, CROP_MARGIN);
    img.crop_imm(x, y, w, h)
}

/// Expand a bbox by `margin` on each side and clamp it to the image bounds.
fn crop_rect(img_w: u32, img_h: u32, bbox: [f32; 4], margin: f32) -> (u32, u32, u32, u32) {
    let pad_x = bbox[2] * margin;
    let pad_y = bbox[3] * margin;
    let x0 = (bbox[0] - pad_x).max(0.0);
    let y0 = (bbox[1] - pad_y).max(0.0);
    let x1 = (bbox[0] + bbox[2] + pad_x).min(img_w as f32);
    let y1 = (bbox[1] + bbox[3] + pad_y).min(img_h as f32);

    let x = x0 as u32;
    let y = y0 as u32;
    let w = ((x1 - x0).max(1.0) as u32).min(img_w.saturating_sub(x).max(1));
    let h = ((y1 - y0).max(1.0) as u32).min(img_h.saturating_sub(y).max(1));
    (x, y, w, h)
}
