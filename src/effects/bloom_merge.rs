use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use super::post_process::{INPUT_SAMPLER, PostProcess};
use crate::runtime::effect::{Effect, TextureBinding};

pub const CLASS_TAG: &str = "BABYLON.BloomMergePostProcess";

/// Adds a blurred highlights pass back onto the original image.
#[derive(Debug)]
pub struct BloomMergePostProcess {
    post_process: PostProcess,
    /// Name of the post-process whose input is the unblurred image.
    original: String,
    /// Name of the post-process whose output holds the blurred highlights.
    blurred: String,
    pub weight: f32,
}

impl BloomMergePostProcess {
    pub fn new(
        name: impl Into<String>,
        original: &PostProcess,
        blurred: &PostProcess,
        weight: f32,
        block_compilation: bool,
    ) -> Result<Self> {
        let post_process = PostProcess::new(name, "bloomMerge", &["bloomWeight"], &["bloomBlur"], true)?;
        let mut merge = Self {
            post_process,
            original: original.name().to_string(),
            blurred: blurred.name().to_string(),
            weight,
        };
        if !block_compilation {
            merge.update_effect()?;
        }
        Ok(merge)
    }

    pub fn name(&self) -> &str {
        self.post_process.name()
    }

    pub fn post_process(&self) -> &PostProcess {
        &self.post_process
    }

    /// For registering extra apply hooks.
    pub fn post_process_mut(&mut self) -> &mut PostProcess {
        &mut self.post_process
    }

    pub fn update_effect(&mut self) -> Result<()> {
        self.post_process.update_effect()
    }

    /// Binds the merge inputs, then runs the registered hooks.
    pub fn apply(&self, effect: &mut dyn Effect) -> Result<()> {
        if !self.post_process.is_compiled() {
            bail!("post-process `{}` applied before compilation", self.name());
        }
        effect.set_texture(
            INPUT_SAMPLER,
            TextureBinding::PostProcessInput(self.original.clone()),
        );
        effect.set_texture(
            "bloomBlur",
            TextureBinding::PostProcessOutput(self.blurred.clone()),
        );
        effect.set_float("bloomWeight", self.weight);
        self.post_process.apply(effect)
    }

    pub fn serialize(&self) -> Value {
        json!({
            "customType": CLASS_TAG,
            "name": self.name(),
            "weight": self.weight,
        })
    }

    /// The passes it merges are not part of the record and are supplied by
    /// the caller.
    pub fn parse(record: &Value, original: &PostProcess, blurred: &PostProcess) -> Result<Self> {
        let tag = record.get("customType").and_then(Value::as_str);
        if tag != Some(CLASS_TAG) {
            bail!("expected {CLASS_TAG}, got {tag:?}");
        }
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .context("bloom merge record has no name")?;
        let weight = record
            .get("weight")
            .and_then(Value::as_f64)
            .map_or(1.0, |w| w as f32);
        Self::new(name, original, blurred, weight, false)
    }
}
