//! Connection points and the registrar blocks use to declare them.

use std::collections::BTreeSet;
use std::fmt;

use super::types::{ConnectionPointType, ShaderStage};

/// Index of a block inside its [`NodeGraph`](super::NodeGraph).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An output port: `(block, output index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputRef {
    pub block: BlockId,
    pub port: usize,
}

/// An input port: `(block, input index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputRef {
    pub block: BlockId,
    pub port: usize,
}

/// A typed port declared by a block.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionPoint {
    pub(crate) name: String,
    pub(crate) declared: ConnectionPointType,
    pub(crate) optional: bool,
    pub(crate) stage: Option<ShaderStage>,
    pub(crate) excluded: BTreeSet<ConnectionPointType>,
    pub(crate) type_source: Option<usize>,
}

impl ConnectionPoint {
    fn new(name: &str, declared: ConnectionPointType) -> Self {
        Self {
            name: name.to_string(),
            declared,
            optional: false,
            stage: None,
            excluded: BTreeSet::new(),
            type_source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> ConnectionPointType {
        self.declared
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Stage restriction for inputs consumed by only one stage.
    pub fn stage(&self) -> Option<ShaderStage> {
        self.stage
    }

    pub fn excluded_types(&self) -> &BTreeSet<ConnectionPointType> {
        &self.excluded
    }

    /// Sibling input a `BasedOnInput` output copies its type from.
    pub fn type_source(&self) -> Option<usize> {
        self.type_source
    }

    pub fn participates_in(&self, stage: ShaderStage) -> bool {
        self.stage.is_none_or(|s| s == stage)
    }

    /// Whether a value of concrete type `ty` can flow into this point.
    pub fn accepts(&self, ty: ConnectionPointType) -> bool {
        if self.excluded.contains(&ty) {
            return false;
        }
        if self.declared.is_deferred() {
            return true;
        }
        self.declared.is_equivalent(ty)
    }
}

/// Collects the ports a block declares, in declaration order.
#[derive(Debug, Default)]
pub struct PortRegistrar {
    inputs: Vec<ConnectionPoint>,
    outputs: Vec<ConnectionPoint>,
}

impl PortRegistrar {
    pub fn register_input(&mut self, name: &str, ty: ConnectionPointType) -> PortBuilder<'_> {
        self.inputs.push(ConnectionPoint::new(name, ty));
        let len = self.inputs.len();
        PortBuilder {
            point: &mut self.inputs[len - 1],
        }
    }

    pub fn register_output(&mut self, name: &str, ty: ConnectionPointType) -> PortBuilder<'_> {
        self.outputs.push(ConnectionPoint::new(name, ty));
        let len = self.outputs.len();
        PortBuilder {
            point: &mut self.outputs[len - 1],
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<ConnectionPoint>, Vec<ConnectionPoint>) {
        (self.inputs, self.outputs)
    }
}

/// Refines the port that was just registered.
pub struct PortBuilder<'a> {
    point: &'a mut ConnectionPoint,
}

impl PortBuilder<'_> {
    pub fn optional(self) -> Self {
        self.point.optional = true;
        self
    }

    pub fn stage(self, stage: ShaderStage) -> Self {
        self.point.stage = Some(stage);
        self
    }

    pub fn exclude(self, types: &[ConnectionPointType]) -> Self {
        self.point.excluded.extend(types.iter().copied());
        self
    }

    /// Excludes every concrete type not listed.
    pub fn allow_only(self, types: &[ConnectionPointType]) -> Self {
        for ty in ConnectionPointType::CONCRETE {
            if !types.contains(&ty) {
                self.point.excluded.insert(ty);
            }
        }
        self
    }

    pub fn type_source(self, input_index: usize) -> Self {
        self.point.type_source = Some(input_index);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionPointType::*;

    #[test]
    fn auto_detect_accepts_everything_but_excluded() {
        let mut ports = PortRegistrar::default();
        ports.register_input("input", AutoDetect).exclude(&[Matrix]);
        let (inputs, _) = ports.into_parts();
        assert!(inputs[0].accepts(Float));
        assert!(inputs[0].accepts(Vector3));
        assert!(!inputs[0].accepts(Matrix));
    }

    #[test]
    fn allow_only_excludes_the_rest() {
        let mut ports = PortRegistrar::default();
        ports
            .register_input("color", AutoDetect)
            .allow_only(&[Color3, Color4, Vector3, Vector4]);
        let (inputs, _) = ports.into_parts();
        assert!(inputs[0].accepts(Color3));
        assert!(inputs[0].accepts(Vector4));
        assert!(!inputs[0].accepts(Float));
        assert!(!inputs[0].accepts(Vector2));
    }

    #[test]
    fn concrete_inputs_accept_equivalent_types() {
        let mut ports = PortRegistrar::default();
        ports.register_input("worldPosition", Vector4).stage(ShaderStage::Vertex);
        let (inputs, _) = ports.into_parts();
        assert!(inputs[0].accepts(Color4));
        assert!(!inputs[0].accepts(Vector3));
        assert!(inputs[0].participates_in(ShaderStage::Vertex));
        assert!(!inputs[0].participates_in(ShaderStage::Fragment));
    }
}
