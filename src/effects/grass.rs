use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::templates;
use crate::dsl::DeserializeContext;
use crate::runtime::effect::Effect;
use crate::runtime::settings::Color3;

pub const CLASS_TAG: &str = "BABYLON.GrassProceduralTexture";

pub const DEFAULT_GRASS_COLORS: [Color3; 3] = [
    Color3::new(0.29, 0.38, 0.02),
    Color3::new(0.36, 0.49, 0.09),
    Color3::new(0.51, 0.6, 0.28),
];

const HERB_UNIFORMS: [&str; 3] = ["herb1Color", "herb2Color", "herb3Color"];

#[derive(Debug, Serialize, Deserialize)]
struct GrassRecord {
    #[serde(rename = "customType")]
    custom_type: String,
    name: String,
    #[serde(rename = "_size")]
    size: u32,
    #[serde(rename = "_generateMipMaps", default)]
    generate_mip_maps: bool,
    #[serde(rename = "grassColors")]
    grass_colors: Vec<Color3>,
    #[serde(rename = "groundColor", default = "default_ground")]
    ground_color: Color3,
}

fn default_ground() -> Color3 {
    Color3::new(1.0, 1.0, 1.0)
}

/// Three herb colors mixed over a ground color with layered noise.
#[derive(Debug, Clone, PartialEq)]
pub struct GrassProceduralTexture {
    pub name: String,
    pub size: u32,
    pub generate_mip_maps: bool,
    grass_colors: [Color3; 3],
    ground_color: Color3,
    shader_uniforms: Vec<(&'static str, Color3)>,
}

impl GrassProceduralTexture {
    pub fn new(name: impl Into<String>, size: u32, generate_mip_maps: bool) -> Self {
        let mut texture = Self {
            name: name.into(),
            size,
            generate_mip_maps,
            grass_colors: DEFAULT_GRASS_COLORS,
            ground_color: default_ground(),
            shader_uniforms: Vec::new(),
        };
        texture.update_shader_uniforms();
        texture
    }

    pub fn fragment_source() -> &'static str {
        templates::fragment("grassProceduralTexture").unwrap_or_default()
    }

    fn update_shader_uniforms(&mut self) {
        self.shader_uniforms = HERB_UNIFORMS
            .iter()
            .copied()
            .zip(self.grass_colors)
            .chain(std::iter::once(("groundColor", self.ground_color)))
            .collect();
    }

    pub fn grass_colors(&self) -> &[Color3; 3] {
        &self.grass_colors
    }

    /// Takes the first three colors; fewer is an error.
    pub fn set_grass_colors(&mut self, colors: &[Color3]) -> Result<()> {
        let [a, b, c, ..] = colors else {
            bail!(
                "grass texture `{}` needs three colors, got {}",
                self.name,
                colors.len()
            );
        };
        self.grass_colors = [*a, *b, *c];
        self.update_shader_uniforms();
        Ok(())
    }

    pub fn ground_color(&self) -> Color3 {
        self.ground_color
    }

    pub fn set_ground_color(&mut self, color: Color3) {
        self.ground_color = color;
        self.update_shader_uniforms();
    }

    /// The uniform values as last derived from the colors.
    pub fn shader_uniforms(&self) -> &[(&'static str, Color3)] {
        &self.shader_uniforms
    }

    pub fn bind(&self, effect: &mut dyn Effect) {
        for (name, color) in &self.shader_uniforms {
            effect.set_color3(name, color.as_array());
        }
    }

    pub fn serialize(&self) -> Result<Value> {
        let record = GrassRecord {
            custom_type: CLASS_TAG.to_string(),
            name: self.name.clone(),
            size: self.size,
            generate_mip_maps: self.generate_mip_maps,
            grass_colors: self.grass_colors.to_vec(),
            ground_color: self.ground_color,
        };
        serde_json::to_value(record).context("failed to serialize grass texture")
    }

    pub fn parse(value: &Value, _ctx: &DeserializeContext) -> Result<Self> {
        let record = GrassRecord::deserialize(value).context("invalid grass texture record")?;
        if record.custom_type != CLASS_TAG {
            bail!("expected {CLASS_TAG}, got {}", record.custom_type);
        }
        let mut texture = Self::new(record.name, record.size, record.generate_mip_maps);
        texture.set_grass_colors(&record.grass_colors)?;
        texture.set_ground_color(record.ground_color);
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::effect::{ProgramUniforms, UniformValue};
    use serde_json::json;

    #[test]
    fn setters_rederive_uniforms() {
        let mut grass = GrassProceduralTexture::new("grass", 256, false);
        assert_eq!(grass.shader_uniforms()[0], ("herb1Color", DEFAULT_GRASS_COLORS[0]));
        grass.set_ground_color(Color3::new(0.5, 0.4, 0.3));
        assert_eq!(
            grass.shader_uniforms()[3],
            ("groundColor", Color3::new(0.5, 0.4, 0.3))
        );

        let mut effect = ProgramUniforms::new();
        grass.bind(&mut effect);
        assert_eq!(
            effect.get("herb3Color"),
            Some(UniformValue::Vec3([0.51, 0.6, 0.28]))
        );
        assert_eq!(effect.calls().len(), 4);
    }

    #[test]
    fn fewer_than_three_colors_are_rejected() {
        let mut grass = GrassProceduralTexture::new("grass", 256, false);
        let err = grass.set_grass_colors(&[Color3::new(1.0, 0.0, 0.0)]).unwrap_err();
        assert!(err.to_string().contains("three colors"));
        assert_eq!(grass.grass_colors(), &DEFAULT_GRASS_COLORS);
    }

    #[test]
    fn record_layout() {
        let mut grass = GrassProceduralTexture::new("grass", 512, true);
        grass.set_ground_color(Color3::new(0.0, 0.5, 1.0));
        let value = grass.serialize().unwrap();
        assert_eq!(value["customType"], CLASS_TAG);
        assert_eq!(value["_size"], 512);
        assert_eq!(value["_generateMipMaps"], true);
        assert_eq!(value["groundColor"], json!([0.0, 0.5, 1.0]));
        assert_eq!(value["grassColors"].as_array().map(Vec::len), Some(3));

        let parsed = GrassProceduralTexture::parse(&value, &DeserializeContext::default()).unwrap();
        assert_eq!(parsed, grass);
    }

    #[test]
    fn parse_rejects_other_types() {
        let value = json!({
            "customType": "BABYLON.WoodProceduralTexture",
            "name": "wood",
            "_size": 256,
            "grassColors": [[0, 0, 0], [0, 0, 0], [0, 0, 0]]
        });
        assert!(GrassProceduralTexture::parse(&value, &DeserializeContext::default()).is_err());
    }
}
