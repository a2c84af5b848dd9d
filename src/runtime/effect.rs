use std::collections::BTreeMap;

/// A uniform value pushed into a compiled program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

/// Texture source bound to a sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureBinding {
    Texture(String),
    /// Input texture of the named post-process.
    PostProcessInput(String),
    /// Output texture of the named post-process.
    PostProcessOutput(String),
}

/// Binding phases, run in declaration order for every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindPhase {
    Textures,
    Values,
}

impl BindPhase {
    pub const ALL: [BindPhase; 2] = [BindPhase::Textures, BindPhase::Values];
}

/// Uniform sink of a compiled program, implemented by the GPU layer.
pub trait Effect {
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_texture(&mut self, name: &str, texture: TextureBinding);

    fn set_float(&mut self, name: &str, v: f32) {
        self.set_uniform(name, UniformValue::Float(v));
    }

    fn set_int(&mut self, name: &str, v: i32) {
        self.set_uniform(name, UniformValue::Int(v));
    }

    fn set_float2(&mut self, name: &str, x: f32, y: f32) {
        self.set_uniform(name, UniformValue::Vec2([x, y]));
    }

    fn set_float3(&mut self, name: &str, x: f32, y: f32, z: f32) {
        self.set_uniform(name, UniformValue::Vec3([x, y, z]));
    }

    fn set_float4(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.set_uniform(name, UniformValue::Vec4([x, y, z, w]));
    }

    fn set_color3(&mut self, name: &str, color: [f32; 3]) {
        self.set_uniform(name, UniformValue::Vec3(color));
    }

    fn set_matrix(&mut self, name: &str, m: [f32; 16]) {
        self.set_uniform(name, UniformValue::Mat4(m));
    }
}

/// In-memory program state: the last value of every uniform and texture,
/// plus the order they were set in since the last [`begin_frame`].
///
/// [`begin_frame`]: ProgramUniforms::begin_frame
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProgramUniforms {
    values: BTreeMap<String, UniformValue>,
    textures: BTreeMap<String, TextureBinding>,
    calls: Vec<String>,
}

impl ProgramUniforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn texture(&self, name: &str) -> Option<&TextureBinding> {
        self.textures.get(name)
    }

    /// Names in the order they were set during the current frame.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Starts a new frame. Values stay bound, the call log is emptied.
    pub fn begin_frame(&mut self) {
        self.calls.clear();
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Effect for ProgramUniforms {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_string(), value);
        self.calls.push(name.to_string());
    }

    fn set_texture(&mut self, name: &str, texture: TextureBinding) {
        self.textures.insert(name.to_string(), texture);
        self.calls.push(name.to_string());
    }
}
