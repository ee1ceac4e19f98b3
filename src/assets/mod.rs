//! Asset Loading
//!
//! CPU-side decoding of models and images. Nothing here touches the GPU
//! until [`ImageData::upload`] or the renderer's `load_model` is called.

pub mod image;
pub mod model;
mod obj;

pub use image::{ColorSpace, ImageData};
pub use model::{ModelAsset, ModelMesh};
