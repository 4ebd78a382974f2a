pub mod detect;
pub mod encode;
pub mod model;
pub mod pipeline;

// Re-export commonly used types
pub use detect::Detection;
pub use pipeline::{Pipeline, VisionError};

/// Identity tag of the recognition model. Descriptors produced by different
/// model versions are not comparable and must never be matched against each
/// other.
pub const MODEL_VERSION: &str = "sface-2021dec";

/// Length of the descriptor produced by the recognition model.
pub const EMBEDDING_DIM: usize = 128;
