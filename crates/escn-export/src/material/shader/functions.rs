//! Shader function library
//!
//! Node visitors call these instead of inlining the maths. Each function is
//! emitted once per shader, in first-use order.

use std::collections::HashMap;

use escn_core::{Error, Result};
use once_cell::sync::Lazy;

/// A function in the shading language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderFunction {
    pub name: &'static str,
    pub code: &'static str,
}

const PRINCIPLED: &str = "\
void node_bsdf_principled(vec4 color, float metallic, float specular,
        float roughness, float clearcoat, float clearcoat_roughness,
        float anisotropy, float transmission, float IOR,
        out vec3 albedo, out float metallic_out, out float specular_out,
        out float roughness_out, out float clearcoat_out,
        out float clearcoat_gloss_out, out float anisotropy_out,
        out float transmission_out) {
    metallic = clamp(metallic, 0.0, 1.0);
    transmission = clamp(transmission, 0.0, 1.0);
    albedo = color.rgb;
    metallic_out = metallic;
    specular_out = clamp(specular, 0.0, 1.0);
    roughness_out = roughness;
    clearcoat_out = clearcoat * (1.0 - transmission);
    clearcoat_gloss_out = 1.0 - clearcoat_roughness;
    anisotropy_out = clamp(anisotropy, 0.0, 1.0);
    transmission_out = (1.0 - transmission) * (1.0 - metallic);
}
";

const DIFFUSE: &str = "\
void node_bsdf_diffuse(vec4 color, float roughness, out vec3 albedo,
        out float specular_out, out float roughness_out) {
    albedo = color.rgb;
    specular_out = 0.5;
    roughness_out = 1.0;
}
";

const GLOSSY: &str = "\
void node_bsdf_glossy(vec4 color, float roughness, out vec3 albedo,
        out float metallic_out, out float roughness_out) {
    albedo = color.rgb;
    metallic_out = 1.0;
    roughness_out = roughness;
}
";

const GLASS: &str = "\
void node_bsdf_glass(vec4 color, float roughness, float IOR, out vec3 albedo,
        out float alpha, out float specular_out, out float roughness_out,
        out float transmission_out) {
    albedo = color.rgb;
    alpha = 0.0;
    specular_out = clamp((IOR - 1.0) / (IOR + 1.0), 0.0, 1.0);
    roughness_out = roughness;
    transmission_out = 1.0;
}
";

const TRANSPARENT: &str = "\
void node_bsdf_transparent(vec4 color, out vec3 albedo, out float alpha) {
    albedo = color.rgb;
    alpha = 0.0;
}
";

const TRANSLUCENT: &str = "\
void node_bsdf_translucent(vec4 color, out vec3 albedo,
        out float transmission_out) {
    albedo = color.rgb;
    transmission_out = 1.0;
}
";

const EMISSION: &str = "\
void node_emission(vec4 emission_color, float strength,
        out vec3 emission_out) {
    emission_out = emission_color.rgb * strength;
}
";

const TEX_IMAGE: &str = "\
void node_tex_image(vec3 co, sampler2D ima, out vec4 color, out float alpha) {
    color = texture(ima, co.xy);
    alpha = color.a;
}
";

const NORMAL_MAP: &str = "\
void node_normal_map(float strength, vec4 color, vec3 normal,
        vec3 tangent, vec3 binormal, out vec3 result) {
    vec3 signed_color = vec3(2.0, -2.0, 2.0) * (color.xzy - vec3(0.5));
    vec3 mapped = normalize(signed_color.x * tangent
        + signed_color.y * binormal + signed_color.z * normal);
    result = normalize(mix(normal, mapped, max(strength, 0.0)));
}
";

const BUMP: &str = "\
void node_bump(float strength, float dist, float height, vec3 normal,
        vec3 surf_pos, float invert, out vec3 result) {
    if (invert != 0.0) {
        dist *= -1.0;
    }
    vec3 dPdx = dFdx(surf_pos);
    vec3 dPdy = dFdy(surf_pos);
    vec3 Rx = cross(dPdy, normal);
    vec3 Ry = cross(normal, dPdx);
    float det = dot(dPdx, Rx);
    float dHdx = dFdx(height);
    float dHdy = dFdy(height);
    vec3 surfgrad = dHdx * Rx + dHdy * Ry;
    strength = max(strength, 0.0);
    result = normalize(abs(det) * normal - dist * sign(det) * surfgrad);
    result = normalize(strength * result + (1.0 - strength) * normal);
}
";

const RGB_TO_BW: &str = "\
void node_rgb_to_bw(vec4 color, out float result) {
    result = color.r * 0.2126 + color.g * 0.7152 + color.b * 0.0722;
}
";

const MIX_RGB_MIX: &str = "\
void node_mix_rgb_mix(float fac, vec4 col1, vec4 col2, out vec4 outcol) {
    fac = clamp(fac, 0.0, 1.0);
    outcol = mix(col1, col2, fac);
    outcol.a = col1.a;
}
";

const MIX_RGB_ADD: &str = "\
void node_mix_rgb_add(float fac, vec4 col1, vec4 col2, out vec4 outcol) {
    fac = clamp(fac, 0.0, 1.0);
    outcol = mix(col1, col1 + col2, fac);
    outcol.a = col1.a;
}
";

const MIX_RGB_MULTIPLY: &str = "\
void node_mix_rgb_multiply(float fac, vec4 col1, vec4 col2, out vec4 outcol) {
    fac = clamp(fac, 0.0, 1.0);
    outcol = mix(col1, col1 * col2, fac);
    outcol.a = col1.a;
}
";

const MIX_RGB_SUBTRACT: &str = "\
void node_mix_rgb_subtract(float fac, vec4 col1, vec4 col2, out vec4 outcol) {
    fac = clamp(fac, 0.0, 1.0);
    outcol = mix(col1, col1 - col2, fac);
    outcol.a = col1.a;
}
";

/// Euler XYZ rotation matrix `rot` from a `rotation` argument, shared by the
/// mapping functions
macro_rules! euler_to_mat3 {
    () => {
        concat!(
            "    vec3 c = cos(rotation);\n",
            "    vec3 s = sin(rotation);\n",
            "    mat3 rot = mat3(\n",
            "        vec3(c.y * c.z, c.y * s.z, -s.y),\n",
            "        vec3(s.x * s.y * c.z - c.x * s.z, s.x * s.y * s.z + c.x * c.z, s.x * c.y),\n",
            "        vec3(c.x * s.y * c.z + s.x * s.z, c.x * s.y * s.z - s.x * c.z, c.x * c.y));\n",
        )
    };
}

const MAPPING_POINT: &str = concat!(
    "void node_mapping_point(vec3 vector, vec3 location, vec3 rotation,\n",
    "        vec3 scale, out vec3 result) {\n",
    euler_to_mat3!(),
    "    result = rot * (vector * scale) + location;\n",
    "}\n",
);

const MAPPING_TEXTURE: &str = concat!(
    "void node_mapping_texture(vec3 vector, vec3 location, vec3 rotation,\n",
    "        vec3 scale, out vec3 result) {\n",
    euler_to_mat3!(),
    "    vec3 inv_scale = vec3(scale.x != 0.0 ? 1.0 / scale.x : 0.0,\n",
    "        scale.y != 0.0 ? 1.0 / scale.y : 0.0,\n",
    "        scale.z != 0.0 ? 1.0 / scale.z : 0.0);\n",
    "    result = (transpose(rot) * (vector - location)) * inv_scale;\n",
    "}\n",
);

const MAPPING_VECTOR: &str = concat!(
    "void node_mapping_vector(vec3 vector, vec3 location, vec3 rotation,\n",
    "        vec3 scale, out vec3 result) {\n",
    euler_to_mat3!(),
    "    result = rot * (vector * scale);\n",
    "}\n",
);

const MAPPING_NORMAL: &str = concat!(
    "void node_mapping_normal(vec3 vector, vec3 location, vec3 rotation,\n",
    "        vec3 scale, out vec3 result) {\n",
    euler_to_mat3!(),
    "    vec3 inv_scale = vec3(scale.x != 0.0 ? 1.0 / scale.x : 0.0,\n",
    "        scale.y != 0.0 ? 1.0 / scale.y : 0.0,\n",
    "        scale.z != 0.0 ? 1.0 / scale.z : 0.0);\n",
    "    result = normalize(rot * (vector * inv_scale));\n",
    "}\n",
);

const MATH_ADD: &str = "\
void node_math_add(float a, float b, out float result) {
    result = a + b;
}
";

const MATH_SUBTRACT: &str = "\
void node_math_subtract(float a, float b, out float result) {
    result = a - b;
}
";

const MATH_MULTIPLY: &str = "\
void node_math_multiply(float a, float b, out float result) {
    result = a * b;
}
";

const MATH_DIVIDE: &str = "\
void node_math_divide(float a, float b, out float result) {
    result = b != 0.0 ? a / b : 0.0;
}
";

const MATH_POWER: &str = "\
void node_math_power(float a, float b, out float result) {
    if (a >= 0.0) {
        result = pow(a, b);
    } else if (floor(b) == b) {
        result = pow(-a, b) * (mod(b, 2.0) == 0.0 ? 1.0 : -1.0);
    } else {
        result = 0.0;
    }
}
";

const MATH_MINIMUM: &str = "\
void node_math_minimum(float a, float b, out float result) {
    result = min(a, b);
}
";

const MATH_MAXIMUM: &str = "\
void node_math_maximum(float a, float b, out float result) {
    result = max(a, b);
}
";

const MATH_ABSOLUTE: &str = "\
void node_math_absolute(float a, float b, out float result) {
    result = abs(a);
}
";

const SEPARATE_RGB: &str = "\
void node_separate_rgb(vec4 color, out float r, out float g, out float b) {
    r = color.r;
    g = color.g;
    b = color.b;
}
";

const COMBINE_RGB: &str = "\
void node_combine_rgb(float r, float g, float b, out vec4 color) {
    color = vec4(r, g, b, 1.0);
}
";

const SEPARATE_XYZ: &str = "\
void node_separate_xyz(vec3 vector, out float x, out float y, out float z) {
    x = vector.x;
    y = vector.y;
    z = vector.z;
}
";

const COMBINE_XYZ: &str = "\
void node_combine_xyz(float x, float y, float z, out vec3 vector) {
    vector = vec3(x, y, z);
}
";

const INVERT: &str = "\
void node_invert(float fac, vec4 color, out vec4 result) {
    result = mix(color, vec4(1.0) - color, fac);
    result.a = color.a;
}
";

/// Every known function, by name
pub static FUNCTIONS: Lazy<HashMap<&'static str, ShaderFunction>> = Lazy::new(|| {
    [
        ("node_bsdf_principled", PRINCIPLED),
        ("node_bsdf_diffuse", DIFFUSE),
        ("node_bsdf_glossy", GLOSSY),
        ("node_bsdf_glass", GLASS),
        ("node_bsdf_transparent", TRANSPARENT),
        ("node_bsdf_translucent", TRANSLUCENT),
        ("node_emission", EMISSION),
        ("node_tex_image", TEX_IMAGE),
        ("node_normal_map", NORMAL_MAP),
        ("node_bump", BUMP),
        ("node_rgb_to_bw", RGB_TO_BW),
        ("node_mix_rgb_mix", MIX_RGB_MIX),
        ("node_mix_rgb_add", MIX_RGB_ADD),
        ("node_mix_rgb_multiply", MIX_RGB_MULTIPLY),
        ("node_mix_rgb_subtract", MIX_RGB_SUBTRACT),
        ("node_mapping_point", MAPPING_POINT),
        ("node_mapping_texture", MAPPING_TEXTURE),
        ("node_mapping_vector", MAPPING_VECTOR),
        ("node_mapping_normal", MAPPING_NORMAL),
        ("node_math_add", MATH_ADD),
        ("node_math_subtract", MATH_SUBTRACT),
        ("node_math_multiply", MATH_MULTIPLY),
        ("node_math_divide", MATH_DIVIDE),
        ("node_math_power", MATH_POWER),
        ("node_math_minimum", MATH_MINIMUM),
        ("node_math_maximum", MATH_MAXIMUM),
        ("node_math_absolute", MATH_ABSOLUTE),
        ("node_separate_rgb", SEPARATE_RGB),
        ("node_combine_rgb", COMBINE_RGB),
        ("node_separate_xyz", SEPARATE_XYZ),
        ("node_combine_xyz", COMBINE_XYZ),
        ("node_invert", INVERT),
    ]
    .into_iter()
    .map(|(name, code)| (name, ShaderFunction { name, code }))
    .collect()
});

/// Look up a library function
pub fn find_function(name: &str) -> Result<&'static ShaderFunction> {
    FUNCTIONS
        .get(name)
        .ok_or_else(|| Error::internal(format!("no shader function '{name}'")))
}
