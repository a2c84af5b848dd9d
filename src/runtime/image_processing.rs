//! Image-processing configuration shared by a material and its blocks.

use super::defines::MaterialDefines;
use super::effect::{Effect, TextureBinding};
use super::settings::Color3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToneMappingType {
    #[default]
    Standard,
    Aces,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VignetteBlendMode {
    #[default]
    Multiply,
    Opaque,
}

/// Hue/density/saturation/exposure adjustment for one tonal range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveAdjustment {
    pub hue: f32,
    pub density: f32,
    pub saturation: f32,
    pub exposure: f32,
}

impl Default for CurveAdjustment {
    fn default() -> Self {
        Self {
            hue: 30.0,
            density: 0.0,
            saturation: 0.0,
            exposure: 0.0,
        }
    }
}

impl CurveAdjustment {
    fn slider_nonlinear(value: f32) -> f32 {
        let v = value / 100.0;
        let mut x = v.abs().powi(2);
        if v < 0.0 {
            x = -x;
        }
        x * 100.0
    }

    fn hsb_to_rgb(hue: f32, saturation: f32, brightness: f32) -> [f32; 3] {
        let h = hue.clamp(0.0, 360.0);
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let v = (brightness / 100.0).clamp(0.0, 1.0);
        if s == 0.0 {
            return [v, v, v];
        }
        let h = h / 60.0;
        let i = h.floor();
        let f = h - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match i as i32 {
            0 => [v, t, p],
            1 => [q, v, p],
            2 => [p, v, t],
            3 => [p, q, v],
            4 => [t, p, v],
            _ => [v, p, q],
        }
    }

    /// Filter color scaled by two in rgb, saturation factor in alpha.
    pub fn grading_data(&self) -> [f32; 4] {
        let mut hue = self.hue.clamp(0.0, 360.0);
        let mut density = Self::slider_nonlinear(self.density.clamp(-100.0, 100.0)) * 0.5;
        let saturation = self.saturation.clamp(-100.0, 100.0);
        let exposure = Self::slider_nonlinear(self.exposure.clamp(-100.0, 100.0));
        if density < 0.0 {
            density = -density;
            hue = (hue + 180.0) % 360.0;
        }
        let [r, g, b] = Self::hsb_to_rgb(hue, density, 50.0 + 0.25 * exposure);
        [r * 2.0, g * 2.0, b * 2.0, 1.0 + 0.01 * saturation]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorCurves {
    pub global: CurveAdjustment,
    pub highlights: CurveAdjustment,
    pub midtones: CurveAdjustment,
    pub shadows: CurveAdjustment,
}

fn mul4(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}

fn sub4(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]]
}

impl ColorCurves {
    /// `(positive, neutral, negative)` curve vectors.
    pub fn curve_vectors(&self) -> ([f32; 4], [f32; 4], [f32; 4]) {
        let global = self.global.grading_data();
        let highlights = mul4(self.highlights.grading_data(), global);
        let midtones = mul4(self.midtones.grading_data(), global);
        let shadows = mul4(self.shadows.grading_data(), global);
        (
            sub4(highlights, midtones),
            midtones,
            sub4(midtones, shadows),
        )
    }
}

/// 2D color-grading lookup texture.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradingTexture {
    pub name: String,
    /// Height in pixels, which is also the lookup resolution.
    pub size: u32,
    pub level: f32,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageProcessingConfiguration {
    pub is_enabled: bool,
    pub apply_by_post_process: bool,
    pub exposure: f32,
    pub contrast: f32,
    pub tone_mapping_enabled: bool,
    pub tone_mapping_type: ToneMappingType,
    pub vignette_enabled: bool,
    pub vignette_weight: f32,
    pub vignette_stretch: f32,
    pub vignette_center_x: f32,
    pub vignette_center_y: f32,
    pub vignette_camera_fov: f32,
    pub vignette_color: Color3,
    pub vignette_blend_mode: VignetteBlendMode,
    pub color_curves_enabled: bool,
    pub color_curves: Option<ColorCurves>,
    pub color_grading_enabled: bool,
    pub color_grading_texture: Option<ColorGradingTexture>,
    pub color_grading_with_green_depth: bool,
    pub dithering_enabled: bool,
    pub dithering_intensity: f32,
}

impl Default for ImageProcessingConfiguration {
    fn default() -> Self {
        Self {
            is_enabled: true,
            apply_by_post_process: false,
            exposure: 1.0,
            contrast: 1.0,
            tone_mapping_enabled: false,
            tone_mapping_type: ToneMappingType::Standard,
            vignette_enabled: false,
            vignette_weight: 1.5,
            vignette_stretch: 0.0,
            vignette_center_x: 0.0,
            vignette_center_y: 0.0,
            vignette_camera_fov: 0.5,
            vignette_color: Color3::new(0.0, 0.0, 0.0),
            vignette_blend_mode: VignetteBlendMode::Multiply,
            color_curves_enabled: false,
            color_curves: Some(ColorCurves::default()),
            color_grading_enabled: false,
            color_grading_texture: None,
            color_grading_with_green_depth: true,
            dithering_enabled: false,
            dithering_intensity: 1.0 / 255.0,
        }
    }
}

const IMAGE_PROCESSING_DEFINES: [&str; 13] = [
    "IMAGEPROCESSING",
    "IMAGEPROCESSINGPOSTPROCESS",
    "VIGNETTE",
    "VIGNETTEBLENDMODEMULTIPLY",
    "VIGNETTEBLENDMODEOPAQUE",
    "TONEMAPPING",
    "TONEMAPPING_ACES",
    "CONTRAST",
    "EXPOSURE",
    "COLORCURVES",
    "COLORGRADING",
    "SAMPLER3DGREENDEPTH",
    "DITHER",
];

impl ImageProcessingConfiguration {
    fn color_grading_active(&self) -> bool {
        self.color_grading_enabled && self.color_grading_texture.is_some()
    }

    /// False while an enabled color-grading texture is still loading.
    pub fn is_ready(&self) -> bool {
        !self.color_grading_enabled
            || self
                .color_grading_texture
                .as_ref()
                .is_none_or(|t| t.ready)
    }

    /// Writes the image-processing defines for a material-side pass.
    pub fn prepare_defines(&self, defines: &mut MaterialDefines) {
        if self.apply_by_post_process || !self.is_enabled {
            for name in IMAGE_PROCESSING_DEFINES {
                defines.set_value(name, false, true);
            }
            defines.set_value(
                "IMAGEPROCESSINGPOSTPROCESS",
                self.apply_by_post_process && self.is_enabled,
                true,
            );
            return;
        }

        let multiply = self.vignette_blend_mode == VignetteBlendMode::Multiply;
        let contrast = self.contrast != 1.0;
        let exposure = self.exposure != 1.0;
        let curves = self.color_curves_enabled && self.color_curves.is_some();
        let grading = self.color_grading_active();

        defines.set_value("VIGNETTE", self.vignette_enabled, true);
        defines.set_value("VIGNETTEBLENDMODEMULTIPLY", multiply, true);
        defines.set_value("VIGNETTEBLENDMODEOPAQUE", !multiply, true);
        defines.set_value("TONEMAPPING", self.tone_mapping_enabled, true);
        defines.set_value(
            "TONEMAPPING_ACES",
            self.tone_mapping_type == ToneMappingType::Aces,
            true,
        );
        defines.set_value("CONTRAST", contrast, true);
        defines.set_value("EXPOSURE", exposure, true);
        defines.set_value("COLORCURVES", curves, true);
        defines.set_value("COLORGRADING", grading, true);
        defines.set_value(
            "SAMPLER3DGREENDEPTH",
            self.color_grading_with_green_depth,
            true,
        );
        defines.set_value("IMAGEPROCESSINGPOSTPROCESS", false, true);
        defines.set_value(
            "IMAGEPROCESSING",
            self.vignette_enabled
                || self.tone_mapping_enabled
                || contrast
                || exposure
                || curves
                || grading,
            true,
        );
        defines.set_value("DITHER", self.dithering_enabled, true);
    }

    pub fn bind_textures(&self, effect: &mut dyn Effect) {
        if let Some(texture) = &self.color_grading_texture {
            effect.set_texture(
                "txColorTransform",
                TextureBinding::Texture(texture.name.clone()),
            );
        }
    }

    pub fn bind_values(&self, effect: &mut dyn Effect, render_size: [u32; 2]) {
        if self.color_curves_enabled {
            if let Some(curves) = &self.color_curves {
                let (positive, neutral, negative) = curves.curve_vectors();
                let [x, y, z, w] = positive;
                effect.set_float4("vCameraColorCurvePositive", x, y, z, w);
                let [x, y, z, w] = neutral;
                effect.set_float4("vCameraColorCurveNeutral", x, y, z, w);
                let [x, y, z, w] = negative;
                effect.set_float4("vCameraColorCurveNegative", x, y, z, w);
            }
        }

        if self.vignette_enabled || self.dithering_enabled {
            let inverse_width = 1.0 / render_size[0].max(1) as f32;
            let inverse_height = 1.0 / render_size[1].max(1) as f32;
            effect.set_float2("vInverseScreenSize", inverse_width, inverse_height);

            if self.dithering_enabled {
                effect.set_float("ditherIntensity", self.dithering_intensity);
            }

            if self.vignette_enabled {
                let aspect_ratio = inverse_height / inverse_width;
                let mut scale_y = (self.vignette_camera_fov * 0.5).tan();
                let mut scale_x = scale_y * aspect_ratio;
                let mean = (scale_x * scale_y).sqrt();
                scale_x += (mean - scale_x) * self.vignette_stretch;
                scale_y += (mean - scale_y) * self.vignette_stretch;
                effect.set_float4(
                    "vignetteSettings1",
                    scale_x,
                    scale_y,
                    -scale_x * self.vignette_center_x,
                    -scale_y * self.vignette_center_y,
                );
                let c = self.vignette_color;
                effect.set_float4(
                    "vignetteSettings2",
                    c.r,
                    c.g,
                    c.b,
                    -2.0 * self.vignette_weight,
                );
            }
        }

        effect.set_float("exposureLinear", self.exposure);
        effect.set_float("contrast", self.contrast);

        if let Some(texture) = &self.color_grading_texture {
            let size = texture.size.max(1) as f32;
            effect.set_float4(
                "colorTransformSettings",
                (size - 1.0) / size,
                0.5 / size,
                size,
                texture.level,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::effect::{ProgramUniforms, UniformValue};

    #[test]
    fn defaults_only_enable_the_blend_mode() {
        let config = ImageProcessingConfiguration::default();
        let mut defines = MaterialDefines::new();
        config.prepare_defines(&mut defines);
        assert!(!defines.is_enabled("IMAGEPROCESSING"));
        assert!(defines.is_enabled("VIGNETTEBLENDMODEMULTIPLY"));
        assert!(!defines.is_enabled("VIGNETTEBLENDMODEOPAQUE"));
        assert!(defines.is_enabled("SAMPLER3DGREENDEPTH"));
    }

    #[test]
    fn exposure_and_aces_enable_image_processing() {
        let config = ImageProcessingConfiguration {
            exposure: 1.5,
            tone_mapping_enabled: true,
            tone_mapping_type: ToneMappingType::Aces,
            ..Default::default()
        };
        let mut defines = MaterialDefines::new();
        config.prepare_defines(&mut defines);
        for name in ["IMAGEPROCESSING", "EXPOSURE", "TONEMAPPING", "TONEMAPPING_ACES"] {
            assert!(defines.is_enabled(name), "{name}");
        }
        assert!(!defines.is_enabled("CONTRAST"));
    }

    #[test]
    fn post_process_mode_disables_material_side_processing() {
        let config = ImageProcessingConfiguration {
            apply_by_post_process: true,
            exposure: 2.0,
            ..Default::default()
        };
        let mut defines = MaterialDefines::new();
        config.prepare_defines(&mut defines);
        assert!(!defines.is_enabled("IMAGEPROCESSING"));
        assert!(!defines.is_enabled("EXPOSURE"));
        assert!(defines.is_enabled("IMAGEPROCESSINGPOSTPROCESS"));
    }

    #[test]
    fn loading_color_grading_texture_is_not_ready() {
        let mut config = ImageProcessingConfiguration {
            color_grading_enabled: true,
            color_grading_texture: Some(ColorGradingTexture {
                name: "lut.png".to_string(),
                size: 16,
                level: 1.0,
                ready: false,
            }),
            ..Default::default()
        };
        assert!(!config.is_ready());
        if let Some(t) = config.color_grading_texture.as_mut() {
            t.ready = true;
        }
        assert!(config.is_ready());
    }

    #[test]
    fn bind_values_pushes_exposure_and_lut_settings() {
        let config = ImageProcessingConfiguration {
            exposure: 0.8,
            contrast: 1.2,
            color_grading_texture: Some(ColorGradingTexture {
                name: "lut.png".to_string(),
                size: 16,
                level: 0.5,
                ready: true,
            }),
            ..Default::default()
        };
        let mut effect = ProgramUniforms::new();
        config.bind_values(&mut effect, [800, 600]);
        assert_eq!(effect.get("exposureLinear"), Some(UniformValue::Float(0.8)));
        assert_eq!(effect.get("contrast"), Some(UniformValue::Float(1.2)));
        assert_eq!(
            effect.get("colorTransformSettings"),
            Some(UniformValue::Vec4([15.0 / 16.0, 0.5 / 16.0, 16.0, 0.5]))
        );
        assert_eq!(effect.get("vInverseScreenSize"), None);
    }

    #[test]
    fn vignette_scale_follows_aspect_ratio() {
        let config = ImageProcessingConfiguration {
            vignette_enabled: true,
            vignette_camera_fov: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        let mut effect = ProgramUniforms::new();
        config.bind_values(&mut effect, [200, 100]);
        let Some(UniformValue::Vec4(v)) = effect.get("vignetteSettings1") else {
            panic!("vignetteSettings1 not bound");
        };
        assert!((v[1] - 1.0).abs() < 1e-5);
        assert!((v[0] - 2.0).abs() < 1e-5);
        assert_eq!(
            effect.get("vignetteSettings2"),
            Some(UniformValue::Vec4([0.0, 0.0, 0.0, -3.0]))
        );
    }

    #[test]
    fn neutral_curves_are_grey() {
        let (positive, neutral, negative) = ColorCurves::default().curve_vectors();
        assert_eq!(positive, [0.0; 4]);
        assert_eq!(negative, [0.0; 4]);
        // Zero density gives a grey of brightness 0.5, doubled, squared by the global term.
        assert!((neutral[0] - 1.0).abs() < 1e-6);
        assert!((neutral[3] - 1.0).abs() < 1e-6);
    }
}
