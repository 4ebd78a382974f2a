//! Descriptor comparison under a distance tolerance.

use log::{debug, warn};

/// Documented default: the distance under which two face descriptors count
/// as the same person. Lower is stricter.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Compares descriptors under a fixed tolerance. Construct one from config
/// rather than reading ambient settings at match time.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    tolerance: f32,
}

impl Matcher {
    pub fn new(tolerance: f32) -> Self {
        Matcher { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// True iff the Euclidean distance between the two descriptors is within
    /// tolerance. Descriptors of different lengths never match; the mismatch
    /// is logged rather than raised.
    pub fn matches(&self, reference: &[f32], probe: &[f32]) -> bool {
        match distance(reference, probe) {
            Some(d) => {
                debug!("descriptor distance {:.4} (tolerance {:.4})", d, self.tolerance);
                d <= self.tolerance
            }
            None => {
                warn!(
                    "descriptor length mismatch ({} vs {}), treating as no match",
                    reference.len(),
                    probe.len()
                );
                false
            }
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::new(DEFAULT_TOLERANCE)
    }
}

/// Euclidean distance, `None` when the vectors are not the same length.
pub fn distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    Some(sum.sqrt())
}
