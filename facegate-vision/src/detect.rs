//! Face detection.
//!
//! The detector is a YuNet-family export with its post-processing head
//! bundled into the graph, so a single forward pass emits one detections
//! tensor of shape `[1, N, 15]` (or `[N, 15]`): per row four bbox values
//! (x, y, w, h in input pixels), ten landmark coordinates, and the
//! confidence score last.

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// Fixed input size of the detector graph.
const INPUT_SIZE: u32 = 640;

/// Values per detection row: bbox(4) + landmarks(10) + score(1).
const DET_ROW: usize = 15;

/// A detected face in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
}

impl Detection {
    pub fn area(&self) -> f32 {
        self.bbox[2].max(0.0) * self.bbox[3].max(0.0)
    }
}

/// Pick the most prominent face: highest confidence score, ties broken by
/// larger bounding box. Deterministic and not configurable.
pub fn most_prominent(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().max_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then(a.area().total_cmp(&b.area()))
    })
}

/// Detect faces in an image, returning boxes in source-image coordinates.
pub fn detect_faces(
    session: &mut Session,
    img: &DynamicImage,
    score_threshold: f32,
) -> Result<Vec<Detection>> {
    let (orig_width, orig_height) = img.dimensions();
    let (scale, offset_x, offset_y) = letterbox_dims(orig_width, orig_height, INPUT_SIZE);

    // Letterbox onto a square canvas so the fixed-size input is not distorted
    let new_width = (orig_width as f32 * scale) as u32;
    let new_height = (orig_height as f32 * scale) as u32;
    let resized = img.resize_exact(new_width, new_height, image::imageops::FilterType::Triangle);
    let mut canvas = DynamicImage::new_rgb8(INPUT_SIZE, INPUT_SIZE);
    image::imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    let planes = bgr_chw(&canvas.to_rgb8());
    let input = Array4::from_shape_vec(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        planes,
    )?;
    let input_tensor = Value::from_array(input)?;

    let outputs = session.run(ort::inputs![input_tensor])?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let shape: Vec<i64> = shape.iter().copied().collect();

    let mut detections = parse_detections(&shape, data, score_threshold)?;

    // Map boxes from the letterboxed canvas back to source coordinates
    for det in &mut detections {
        det.bbox[0] = (det.bbox[0] - offset_x as f32) / scale;
        det.bbox[1] = (det.bbox[1] - offset_y as f32) / scale;
        det.bbox[2] /= scale;
        det.bbox[3] /= scale;
    }

    Ok(detections)
}

/// Scale factor and top-left padding offsets for fitting `w`x`h` into a
/// `target`x`target` square while preserving aspect ratio.
pub(crate) fn letterbox_dims(w: u32, h: u32, target: u32) -> (f32, u32, u32) {
    let max_dim = w.max(h).max(1);
    let scale = target as f32 / max_dim as f32;
    let new_w = (w as f32 * scale) as u32;
    let new_h = (h as f32 * scale) as u32;
    (scale, (target - new_w) / 2, (target - new_h) / 2)
}

/// Parse the detector's output tensor, keeping rows at or above the score
/// threshold.
pub fn parse_detections(
    shape: &[i64],
    data: &[f32],
    score_threshold: f32,
) -> Result<Vec<Detection>> {
    let cols = shape.last().copied().unwrap_or(0) as usize;
    if cols != DET_ROW {
        anyhow::bail!("unexpected detector output shape {:?}, want trailing dim {}", shape, DET_ROW);
    }
    let rows: i64 = shape.iter().take(shape.len() - 1).product();
    if rows as usize * DET_ROW != data.len() {
        anyhow::bail!(
            "detector output shape {:?} does not cover {} values",
            shape,
            data.len()
        );
    }

    let mut detections = Vec::new();
    for row in data.chunks_exact(DET_ROW) {
        let score = row[DET_ROW - 1];
        if score < score_threshold {
            continue;
        }
        detections.push(Detection {
            bbox: [row[0], row[1], row[2], row[3]],
            score,
        });
    }
    Ok(detections)
}

/// Planar BGR f32 tensor data in [0, 255], the channel order both models
/// were trained with.
pub(crate) fn bgr_chw(img: &image::RgbImage) -> Vec<f32> {
    let pixel_count = (img.width() * img.height()) as usize;
    let mut planes = vec![0f32; 3 * pixel_count];
    let (b_plane, rest) = planes.split_at_mut(pixel_count);
    let (g_plane, r_plane) = rest.split_at_mut(pixel_count);

    let pixels = img.as_raw();
    for i in 0..pixel_count {
        let idx = i * 3;
        r_plane[i] = pixels[idx] as f32;
        g_plane[i] = pixels[idx + 1] as f32;
        b_plane[i] = pixels[idx + 2] as f32;
    }
    planes
}
