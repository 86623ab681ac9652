pub mod batch;
pub mod image;
pub mod predict;

pub use batch::*;
pub use image::*;
pub use predict::{ImagePayload, PredictRequest, PredictResponse};
