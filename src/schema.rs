//! Block registry: class tag → factory, plus the authoring properties each
//! block type exposes to tooling.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Result, anyhow, bail};

use crate::compiler::Block;
use crate::compiler::blocks::{
    ClampBlock, ClipPlanesBlock, FragmentOutputBlock, ImageProcessingBlock, InputBlock,
    TransformBlock, VertexOutputBlock, WaveBlock,
};
use crate::dsl::{BlockRecord, DeserializeContext};

pub const TAG_PREFIX: &str = "BABYLON.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Float,
    Boolean,
    /// One of the listed options, stored as its index.
    List(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: PropertyKind,
    pub group: &'static str,
}

pub type BlockFactory = fn(&BlockRecord, &DeserializeContext) -> Result<Box<dyn Block>>;

#[derive(Debug, Clone)]
pub struct BlockRegistration {
    pub tag: String,
    pub factory: BlockFactory,
    pub properties: &'static [PropertyDescriptor],
}

#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    entries: BTreeMap<String, BlockRegistration>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class_name` under `BABYLON.<class_name>`.
    pub fn register(
        &mut self,
        class_name: &str,
        factory: BlockFactory,
        properties: &'static [PropertyDescriptor],
    ) -> Result<()> {
        let tag = format!("{TAG_PREFIX}{class_name}");
        if self.entries.contains_key(&tag) {
            bail!("block type {tag} is already registered");
        }
        self.entries.insert(
            tag.clone(),
            BlockRegistration {
                tag,
                factory,
                properties,
            },
        );
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&BlockRegistration> {
        self.entries.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn registrations(&self) -> impl Iterator<Item = &BlockRegistration> {
        self.entries.values()
    }

    pub fn create(&self, record: &BlockRecord, ctx: &DeserializeContext) -> Result<Box<dyn Block>> {
        let registration = self
            .get(&record.custom_type)
            .ok_or_else(|| anyhow!("unknown block type: {}", record.custom_type))?;
        (registration.factory)(record, ctx)
    }
}

fn builtin_registry() -> Result<BlockRegistry> {
    let mut registry = BlockRegistry::new();
    registry.register("InputBlock", InputBlock::from_record, &[])?;
    registry.register(
        "TransformBlock",
        TransformBlock::from_record,
        TransformBlock::default().properties(),
    )?;
    registry.register("VertexOutputBlock", VertexOutputBlock::from_record, &[])?;
    registry.register(
        "FragmentOutputBlock",
        FragmentOutputBlock::from_record,
        FragmentOutputBlock::default().properties(),
    )?;
    registry.register(
        "ClampBlock",
        ClampBlock::from_record,
        ClampBlock::default().properties(),
    )?;
    registry.register(
        "WaveBlock",
        WaveBlock::from_record,
        WaveBlock::default().properties(),
    )?;
    registry.register("ClipPlanesBlock", ClipPlanesBlock::from_record, &[])?;
    registry.register(
        "ImageProcessingBlock",
        ImageProcessingBlock::from_record,
        ImageProcessingBlock::default().properties(),
    )?;
    Ok(registry)
}

/// The built-in block types. Built once per process.
pub fn default_registry() -> &'static BlockRegistry {
    static REGISTRY: OnceLock<BlockRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| match builtin_registry() {
        Ok(registry) => registry,
        Err(e) => {
            log::error!("failed to build the block registry: {e:#}");
            BlockRegistry::new()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_every_builtin() {
        let tags: Vec<&str> = default_registry().tags().collect();
        assert_eq!(tags.len(), 8);
        assert!(tags.contains(&"BABYLON.ClampBlock"));
        assert!(tags.contains(&"BABYLON.ImageProcessingBlock"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = BlockRegistry::new();
        registry.register("ClampBlock", ClampBlock::from_record, &[]).unwrap();
        assert!(registry.register("ClampBlock", ClampBlock::from_record, &[]).is_err());
    }

    #[test]
    fn wave_kind_is_a_list_property() {
        let wave = default_registry().get("BABYLON.WaveBlock").unwrap();
        assert_eq!(
            wave.properties[0].kind,
            PropertyKind::List(crate::compiler::blocks::WaveKind::NAMES)
        );
    }

    #[test]
    fn unknown_tags_fail_to_create() {
        let record = BlockRecord {
            id: "b0".to_string(),
            custom_type: "BABYLON.NopeBlock".to_string(),
            name: "nope".to_string(),
            params: Default::default(),
        };
        let err = default_registry()
            .create(&record, &DeserializeContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("BABYLON.NopeBlock"));
    }
}
