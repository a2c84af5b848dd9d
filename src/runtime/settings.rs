//! Read-only runtime settings the blocks consult while binding.

use serde::{Deserialize, Serialize};

use super::image_processing::ImageProcessingConfiguration;

pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// RGB color, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn as_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Color3 {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color3> for [f32; 3] {
    fn from(c: Color3) -> Self {
        c.as_array()
    }
}

/// Plane `normal · p + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: [f32; 3],
    pub d: f32,
}

impl Plane {
    pub fn new(normal: [f32; 3], d: f32) -> Self {
        Self { normal, d }
    }

    pub fn as_vec4(self) -> [f32; 4] {
        [self.normal[0], self.normal[1], self.normal[2], self.d]
    }
}

pub const MAX_CLIP_PLANES: usize = 6;

/// Up to six optional clip planes, indexed from 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipPlaneSet(pub [Option<Plane>; MAX_CLIP_PLANES]);

impl ClipPlaneSet {
    pub fn get(&self, index: usize) -> Option<Plane> {
        self.0.get(index).copied().flatten()
    }

    pub fn set(&mut self, index: usize, plane: Option<Plane>) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = plane;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    pub clip_planes: ClipPlaneSet,
    pub view_projection: [f32; 16],
    pub camera_position: [f32; 3],
    pub time: f32,
    /// Render target size in pixels.
    pub render_size: [u32; 2],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            clip_planes: ClipPlaneSet::default(),
            view_projection: IDENTITY,
            camera_position: [0.0; 3],
            time: 0.0,
            render_size: [1, 1],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialSettings {
    /// Overrides of the scene planes.
    pub clip_planes: ClipPlaneSet,
    pub image_processing: Option<ImageProcessingConfiguration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshContext {
    pub world: [f32; 16],
}

impl Default for MeshContext {
    fn default() -> Self {
        Self { world: IDENTITY }
    }
}

/// Everything a block may read during one draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawContext {
    pub scene: SceneSettings,
    pub material: MaterialSettings,
    pub mesh: Option<MeshContext>,
}

impl DrawContext {
    /// Active clip plane `index`: the material's if set, else the scene's.
    pub fn clip_plane(&self, index: usize) -> Option<Plane> {
        self.material
            .clip_planes
            .get(index)
            .or_else(|| self.scene.clip_planes.get(index))
    }

    pub fn image_processing(&self) -> Option<&ImageProcessingConfiguration> {
        self.material.image_processing.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_planes_override_scene_planes() {
        let mut draw = DrawContext::default();
        let scene_plane = Plane::new([0.0, 1.0, 0.0], 0.0);
        let material_plane = Plane::new([1.0, 0.0, 0.0], 2.0);
        draw.scene.clip_planes.set(0, Some(scene_plane));
        draw.scene.clip_planes.set(1, Some(scene_plane));
        draw.material.clip_planes.set(1, Some(material_plane));

        assert_eq!(draw.clip_plane(0), Some(scene_plane));
        assert_eq!(draw.clip_plane(1), Some(material_plane));
        assert_eq!(draw.clip_plane(2), None);
        assert_eq!(draw.clip_plane(9), None);
    }

    #[test]
    fn color3_serializes_as_an_array() {
        let c = Color3::new(0.5, 0.25, 1.0);
        assert_eq!(serde_json::to_value(c).unwrap(), serde_json::json!([0.5, 0.25, 1.0]));
        let back: Color3 = serde_json::from_value(serde_json::json!([0.5, 0.25, 1.0])).unwrap();
        assert_eq!(back, c);
    }
}
