pub(super) const DECLARATION: &str = r#"#ifdef COLORGRADING
vec3 sampleColorGrading(vec3 lookup) {
    float lutSize = colorTransformSettings.z;
    float sliceSize = 1.0 / lutSize;
#ifdef SAMPLER3DGREENDEPTH
    float depth = (lookup.g - colorTransformSettings.y) * lutSize;
    vec2 planar = lookup.rb;
#else
    float depth = (lookup.b - colorTransformSettings.y) * lutSize;
    vec2 planar = lookup.rg;
#endif
    float sliceIndex = floor(depth);
    float sliceFraction = depth - sliceIndex;
    vec2 uv0 = vec2((planar.x + sliceIndex) * sliceSize, planar.y);
    vec2 uv1 = vec2(uv0.x + sliceSize, planar.y);
    vec3 slice0 = texture(txColorTransform, clamp(uv0, vec2(0.0), vec2(1.0))).rgb;
    vec3 slice1 = texture(txColorTransform, clamp(uv1, vec2(0.0), vec2(1.0))).rgb;
    return mix(slice0, slice1, vec3(sliceFraction));
}
#endif
"#;

pub(super) const FUNCTIONS: &str = r#"#ifdef TONEMAPPING
#ifdef TONEMAPPING_ACES
vec3 RRTAndODTFit(vec3 v) {
    vec3 a = v * (v + vec3(0.0245786)) - vec3(0.000090537);
    vec3 b = v * (0.983729 * v + vec3(0.4329510)) + vec3(0.238081);
    return a / b;
}

vec3 ACESFitted(vec3 color) {
    mat3 inputMat = mat3(
        vec3(0.59719, 0.07600, 0.02840),
        vec3(0.35458, 0.90834, 0.13383),
        vec3(0.04823, 0.01566, 0.83777)
    );
    mat3 outputMat = mat3(
        vec3(1.60475, -0.10208, -0.00327),
        vec3(-0.53108, 1.10813, -0.07276),
        vec3(-0.07367, -0.00605, 1.07602)
    );
    vec3 mapped = inputMat * color;
    mapped = RRTAndODTFit(mapped);
    mapped = outputMat * mapped;
    return clamp(mapped, vec3(0.0), vec3(1.0));
}
#endif
#endif

vec4 applyImageProcessing(vec4 inputColor) {
    vec4 result = inputColor;
#ifdef EXPOSURE
    result = vec4(result.rgb * exposureLinear, result.a);
#endif
#ifdef VIGNETTE
    vec2 viewportXY = gl_FragCoord.xy * vInverseScreenSize;
    viewportXY = viewportXY * 2.0 - vec2(1.0);
    vec3 vignetteXY1 = vec3(viewportXY * vignetteSettings1.xy + vignetteSettings1.zw, 1.0);
    float vignetteTerm = dot(vignetteXY1, vignetteXY1);
    float vignette = pow(vignetteTerm, vignetteSettings2.w);
    vec3 vignetteColor = vignetteSettings2.rgb;
#ifdef VIGNETTEBLENDMODEMULTIPLY
    vec3 vignetteColorMultiplier = mix(vignetteColor, vec3(1.0), vec3(vignette));
    result = vec4(result.rgb * vignetteColorMultiplier, result.a);
#endif
#ifdef VIGNETTEBLENDMODEOPAQUE
    result = vec4(mix(vignetteColor, result.rgb, vec3(vignette)), result.a);
#endif
#endif
#ifdef TONEMAPPING
#ifdef TONEMAPPING_ACES
    result = vec4(ACESFitted(result.rgb), result.a);
#else
    result = vec4(vec3(1.0) - exp2(-1.590579 * result.rgb), result.a);
#endif
#endif
    result = vec4(clamp(toGammaSpace(result.rgb), vec3(0.0), vec3(1.0)), result.a);
#ifdef CONTRAST
    vec3 resultHighContrast = result.rgb * result.rgb * (vec3(3.0) - 2.0 * result.rgb);
    if (contrast < 1.0) {
        result = vec4(mix(vec3(0.5), result.rgb, vec3(contrast)), result.a);
    } else {
        result = vec4(mix(result.rgb, resultHighContrast, vec3(contrast - 1.0)), result.a);
    }
#endif
#ifdef COLORGRADING
    vec3 colorTransformInput = result.rgb * colorTransformSettings.xxx + colorTransformSettings.yyy;
    vec3 colorTransformOutput = sampleColorGrading(colorTransformInput);
    result = vec4(mix(result.rgb, colorTransformOutput, colorTransformSettings.www), result.a);
#endif
#ifdef COLORCURVES
    float luma = getLuminance(result.rgb);
    vec2 curveMix = clamp(vec2(luma * 3.0 - 1.5, luma * -3.0 + 1.5), vec2(0.0), vec2(1.0));
    vec4 colorCurve = vCameraColorCurveNeutral + curveMix.x * vCameraColorCurvePositive - curveMix.y * vCameraColorCurveNegative;
    result = vec4(result.rgb * colorCurve.rgb, result.a);
    result = vec4(mix(vec3(luma), result.rgb, vec3(colorCurve.a)), result.a);
#endif
#ifdef DITHER
    float rand = getRand(gl_FragCoord.xy * vInverseScreenSize);
    float dither = mix(-ditherIntensity, ditherIntensity, rand);
    result = vec4(clamp(result.rgb + vec3(dither), vec3(0.0), vec3(1.0)), result.a);
#endif
    return result;
}
"#;
