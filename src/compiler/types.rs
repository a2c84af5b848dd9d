//! Core type definitions for the shader-graph compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of a connection point.
///
/// `AutoDetect` and `BasedOnInput` are deferred: they only become concrete
/// during type resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionPointType {
    Float,
    Int,
    Vector2,
    Vector3,
    Vector4,
    Color3,
    Color4,
    Matrix,
    AutoDetect,
    BasedOnInput,
}

impl ConnectionPointType {
    pub const CONCRETE: [ConnectionPointType; 8] = [
        ConnectionPointType::Float,
        ConnectionPointType::Int,
        ConnectionPointType::Vector2,
        ConnectionPointType::Vector3,
        ConnectionPointType::Vector4,
        ConnectionPointType::Color3,
        ConnectionPointType::Color4,
        ConnectionPointType::Matrix,
    ];

    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            ConnectionPointType::AutoDetect | ConnectionPointType::BasedOnInput
        )
    }

    /// Returns the GLSL type name, or `None` for deferred types.
    pub fn glsl(self) -> Option<&'static str> {
        match self {
            ConnectionPointType::Float => Some("float"),
            ConnectionPointType::Int => Some("int"),
            ConnectionPointType::Vector2 => Some("vec2"),
            ConnectionPointType::Vector3 | ConnectionPointType::Color3 => Some("vec3"),
            ConnectionPointType::Vector4 | ConnectionPointType::Color4 => Some("vec4"),
            ConnectionPointType::Matrix => Some("mat4"),
            ConnectionPointType::AutoDetect | ConnectionPointType::BasedOnInput => None,
        }
    }

    /// Vector and color types of the same width are interchangeable.
    pub fn is_equivalent(self, other: ConnectionPointType) -> bool {
        use ConnectionPointType::*;
        self == other
            || matches!(
                (self, other),
                (Vector3, Color3) | (Color3, Vector3) | (Vector4, Color4) | (Color4, Vector4)
            )
    }

    pub fn has_four_components(self) -> bool {
        matches!(
            self,
            ConnectionPointType::Vector4 | ConnectionPointType::Color4
        )
    }
}

impl fmt::Display for ConnectionPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionPointType::Float => "float",
            ConnectionPointType::Int => "int",
            ConnectionPointType::Vector2 => "vector2",
            ConnectionPointType::Vector3 => "vector3",
            ConnectionPointType::Vector4 => "vector4",
            ConnectionPointType::Color3 => "color3",
            ConnectionPointType::Color4 => "color4",
            ConnectionPointType::Matrix => "matrix",
            ConnectionPointType::AutoDetect => "autoDetect",
            ConnectionPointType::BasedOnInput => "basedOnInput",
        };
        f.write_str(s)
    }
}

/// Shader stage a compiled program is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage(s) a block emits code into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockTarget {
    Vertex,
    Fragment,
    VertexAndFragment,
    /// Built in whichever stage consumes it.
    Neutral,
}

impl BlockTarget {
    pub fn includes(self, stage: ShaderStage) -> bool {
        match self {
            BlockTarget::Vertex => stage == ShaderStage::Vertex,
            BlockTarget::Fragment => stage == ShaderStage::Fragment,
            BlockTarget::VertexAndFragment | BlockTarget::Neutral => true,
        }
    }
}

/// GLSL flavour of the assembled programs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderDialect {
    /// `#version 300 es`, loose uniforms.
    #[default]
    Gles300,
    /// `#version 450`, std140 uniform block and explicit locations.
    Glsl450,
}
