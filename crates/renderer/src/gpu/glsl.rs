//! Source rewriting for the naga GLSL frontend.
//!
//! Registry shaders are written against WebGL 1: `precision` statements,
//! loose `uniform` declarations, `attribute`/`varying` and `gl_FragColor`.
//! The wrappers here turn them into `#version 450` sources:
//!
//! 1. Strip `#version`, `precision` and the built-in uniform declarations.
//! 2. Rewrite `attribute`/`varying` into located `in`/`out` variables.
//! 3. Prepend a header that declares the [`BackdropUniforms`] block and maps
//!    the WebGL names onto it with macros.
//! 4. Rename the shader's `main` to `backdrop_scene` and append a footer that
//!    remaps `gl_FragCoord` to a bottom-left origin, calls the scene and
//!    composites the presentation layers (scale, opacity, tint, vignettes).
//!
//! [`BackdropUniforms`]: super::BackdropUniforms

/// Uniforms a registry shader may declare itself; the header supplies them.
pub(crate) const BUILTIN_UNIFORMS: [&str; 3] = ["iResolution", "iTime", "iMouse"];

/// Uniforms read by the footer, present in every wrapped fragment.
pub(crate) const PRESENTATION_UNIFORMS: [&str; 4] = ["uOpacity", "uScale", "uTint", "uVignette"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WrappedSource {
    pub code: String,
    /// Vertex attributes in location order.
    pub attributes: Vec<String>,
    /// Uniform names the program actually reads.
    pub uniforms: Vec<&'static str>,
}

pub(crate) fn wrap_vertex(source: &str) -> WrappedSource {
    let mut body = String::new();
    let mut attributes = Vec::new();
    let mut varyings = 0u32;
    for line in sanitized_lines(source) {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("attribute ") {
            if let Some(name) = declared_name(rest) {
                attributes.push(name.to_string());
            }
            let location = attributes.len().saturating_sub(1);
            body.push_str(&format!("layout(location = {location}) in {rest}\n"));
        } else if let Some(rest) = trimmed.strip_prefix("varying ") {
            body.push_str(&format!("layout(location = {varyings}) out {rest}\n"));
            varyings += 1;
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    WrappedSource {
        code: format!("#version 450\n#line 1\n{body}"),
        attributes,
        uniforms: Vec::new(),
    }
}

pub(crate) fn wrap_fragment(source: &str) -> WrappedSource {
    let mut body = String::new();
    let mut varyings = 0u32;
    for line in sanitized_lines(source) {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("varying ") {
            body.push_str(&format!("layout(location = {varyings}) in {rest}\n"));
            varyings += 1;
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    let mut uniforms: Vec<&'static str> = BUILTIN_UNIFORMS
        .into_iter()
        .filter(|name| references(&body, name))
        .collect();
    uniforms.extend(PRESENTATION_UNIFORMS);

    WrappedSource {
        code: format!("{HEADER}\n#line 1\n{body}{FOOTER}"),
        attributes: Vec::new(),
        uniforms,
    }
}

fn sanitized_lines(source: &str) -> impl Iterator<Item = &str> {
    source.lines().filter(|line| {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
            return false;
        }
        let declares_builtin = trimmed.starts_with("uniform ")
            && BUILTIN_UNIFORMS
                .iter()
                .any(|name| references(trimmed, name));
        !declares_builtin
    })
}

/// Name in a declaration tail such as `vec2 position;`.
fn declared_name(declaration: &str) -> Option<&str> {
    declaration
        .trim_end()
        .trim_end_matches(';')
        .split_whitespace()
        .last()
}

/// Whole-identifier search; `iTimeDelta` does not reference `iTime`.
pub(crate) fn references(code: &str, ident: &str) -> bool {
    code.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == ident)
}

/// Must match the field order of `BackdropUniforms`.
const HEADER: &str = r"#version 450
layout(location = 0) out vec4 backdrop_outColor;

layout(std140, set = 0, binding = 0) uniform BackdropParams {
    vec2 _iResolution;
    vec2 _iMouse;
    float _iTime;
    float _uOpacity;
    float _uScale;
    float _padding0;
    vec4 _uTint;
    vec2 _uVignette;
    vec2 _padding1;
} ubo;

#define iResolution ubo._iResolution
#define iMouse ubo._iMouse
#define iTime ubo._iTime

vec4 backdrop_fragColor;
vec4 backdrop_gl_FragCoord;
#define gl_FragColor backdrop_fragColor
#define gl_FragCoord backdrop_gl_FragCoord
#define main backdrop_scene
";

const FOOTER: &str = r"
#undef main
void main() {
    #undef gl_FragCoord
    vec2 backdrop_pixel = gl_FragCoord.xy;
    #define gl_FragCoord backdrop_gl_FragCoord

    vec2 backdrop_centre = ubo._iResolution * 0.5;
    vec2 backdrop_scaled = backdrop_centre + (backdrop_pixel - backdrop_centre) / max(ubo._uScale, 0.0001);
    backdrop_gl_FragCoord = vec4(backdrop_scaled.x, ubo._iResolution.y - backdrop_scaled.y, 0.0, 1.0);
    backdrop_fragColor = vec4(0.0, 0.0, 0.0, 1.0);
    backdrop_scene();

    vec3 backdrop_color = clamp(backdrop_fragColor.rgb, 0.0, 1.0) * ubo._uOpacity;

    // Radial tint fades out at 60% of the centre-to-corner distance.
    float backdrop_reach = 0.6 * 0.5 * length(ubo._iResolution);
    float backdrop_falloff = clamp(1.0 - length(backdrop_pixel - backdrop_centre) / max(backdrop_reach, 1.0), 0.0, 1.0);
    backdrop_color = mix(backdrop_color, ubo._uTint.rgb, ubo._uTint.a * backdrop_falloff);

    // 128px bands, black at 20% on the edge.
    float backdrop_top = clamp(1.0 - backdrop_pixel.y / 128.0, 0.0, 1.0) * ubo._uVignette.x;
    float backdrop_bottom = clamp(1.0 - (ubo._iResolution.y - backdrop_pixel.y) / 128.0, 0.0, 1.0) * ubo._uVignette.y;
    backdrop_color *= (1.0 - 0.2 * backdrop_top) * (1.0 - 0.2 * backdrop_bottom);

    backdrop_outColor = vec4(backdrop_color, 1.0);
}
";
