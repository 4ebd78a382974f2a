//! Face encoding.
//!
//! The recognizer is an SFace export: input `[1, 3, 112, 112]` in planar BGR
//! with values in [0, 255], output a 128-float descriptor which we
//! L2-normalize before returning.

use anyhow::Result;
use image::DynamicImage;
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::detect::bgr_chw;

/// Side length of the recognizer input crop.
pub const CROP_SIZE: u32 = 112;

/// Encode an aligned face crop to a normalized descriptor.
pub fn encode_face(session: &mut Session, face: &DynamicImage) -> Result<Vec<f32>> {
    let face = face
        .resize_exact(CROP_SIZE, CROP_SIZE, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let planes = bgr_chw(&face);
    let input = Array4::from_shape_vec((1, 3, CROP_SIZE as usize, CROP_SIZE as usize), planes)?;
    let input_tensor = Value::from_array(input)?;

    let outputs = session.run(ort::inputs![input_tensor])?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

    // Expecting shape [1, 128]
    let dim = if shape.len() == 2 {
        shape[1] as usize
    } else {
        data.len()
    };
    let mut vector: Vec<f32> = data[..dim].to_vec();
    l2_normalize(&mut vector);
    Ok(vector)
}

pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
