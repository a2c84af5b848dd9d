//! Built-in material blocks.

pub mod clip_planes;
pub mod image_processing;
pub mod input;
pub mod math;
pub mod output;
pub mod transform;

pub use clip_planes::ClipPlanesBlock;
pub use image_processing::ImageProcessingBlock;
pub use input::{InputBlock, InputMode, InputValue};
pub use math::{ClampBlock, WaveBlock, WaveKind};
pub use output::{FragmentOutputBlock, VertexOutputBlock};
pub use transform::TransformBlock;
