//! Runtime side of a compiled material: defines, binding and the settings
//! blocks read at draw time.

pub mod defines;
pub mod effect;
pub mod image_processing;
pub mod material;
pub mod settings;

pub use defines::{DefineValue, MaterialDefines};
pub use effect::{BindPhase, Effect, ProgramUniforms, TextureBinding, UniformValue};
pub use image_processing::{
    ColorCurves, ColorGradingTexture, CurveAdjustment, ImageProcessingConfiguration,
    ToneMappingType, VignetteBlendMode,
};
pub use material::NodeMaterial;
pub use settings::{
    ClipPlaneSet, Color3, DrawContext, MaterialSettings, MeshContext, Plane, SceneSettings,
};
