//! Post-processes and procedural textures that ship alongside the material
//! blocks.

pub mod bloom_merge;
pub mod grass;
pub mod post_process;
pub mod templates;

pub use bloom_merge::BloomMergePostProcess;
pub use grass::GrassProceduralTexture;
pub use post_process::{OnApplyHook, PostProcess};
