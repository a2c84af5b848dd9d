use std::fmt;

use anyhow::{Result, anyhow, bail};

use super::templates;
use crate::runtime::effect::Effect;

/// Sampler every post-process reads its input from.
pub const INPUT_SAMPLER: &str = "textureSampler";

pub type OnApplyHook = Box<dyn Fn(&mut dyn Effect) + Send + Sync>;

/// A full-screen fragment pass. The GPU layer owns the render target; this
/// side resolves the program and pushes uniforms when the pass is applied.
pub struct PostProcess {
    name: String,
    fragment: String,
    uniforms: Vec<String>,
    samplers: Vec<String>,
    compiled_fragment: Option<String>,
    on_apply: Vec<OnApplyHook>,
}

impl fmt::Debug for PostProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostProcess")
            .field("name", &self.name)
            .field("fragment", &self.fragment)
            .field("uniforms", &self.uniforms)
            .field("samplers", &self.samplers)
            .field("compiled", &self.compiled_fragment.is_some())
            .field("on_apply", &self.on_apply.len())
            .finish()
    }
}

impl PostProcess {
    /// With `block_compilation` the program is only resolved by a later
    /// [`update_effect`](Self::update_effect).
    pub fn new(
        name: impl Into<String>,
        fragment: impl Into<String>,
        uniforms: &[&str],
        samplers: &[&str],
        block_compilation: bool,
    ) -> Result<Self> {
        let mut post_process = Self {
            name: name.into(),
            fragment: fragment.into(),
            uniforms: uniforms.iter().map(|s| s.to_string()).collect(),
            samplers: samplers.iter().map(|s| s.to_string()).collect(),
            compiled_fragment: None,
            on_apply: Vec::new(),
        };
        if !block_compilation {
            post_process.update_effect()?;
        }
        Ok(post_process)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn uniforms(&self) -> &[String] {
        &self.uniforms
    }

    /// Declared samplers, without the implicit input sampler.
    pub fn samplers(&self) -> &[String] {
        &self.samplers
    }

    pub fn all_samplers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(INPUT_SAMPLER).chain(self.samplers.iter().map(String::as_str))
    }

    pub fn update_effect(&mut self) -> Result<()> {
        let source = templates::fragment(&self.fragment).ok_or_else(|| {
            anyhow!(
                "post-process `{}` uses unknown fragment `{}`",
                self.name,
                self.fragment
            )
        })?;
        self.compiled_fragment = Some(source.to_string());
        log::debug!("post-process `{}` compiled", self.name);
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled_fragment.is_some()
    }

    pub fn compiled_fragment(&self) -> Option<&str> {
        self.compiled_fragment.as_deref()
    }

    /// Hooks run in insertion order on every [`apply`](Self::apply).
    pub fn add_on_apply(&mut self, hook: impl Fn(&mut dyn Effect) + Send + Sync + 'static) {
        self.on_apply.push(Box::new(hook));
    }

    pub fn apply(&self, effect: &mut dyn Effect) -> Result<()> {
        if !self.is_compiled() {
            bail!("post-process `{}` applied before compilation", self.name);
        }
        for hook in &self.on_apply {
            hook(effect);
        }
        Ok(())
    }
}
