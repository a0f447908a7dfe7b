//! Per-node translation
//!
//! Each visitor reads its inputs through the writer (which visits upstream
//! nodes on demand), emits code and publishes its outputs.

use std::collections::{HashSet, VecDeque};

use escn_core::Result;
use escn_scene::{
    MappingType, MathOperation, MixBlend, ShaderNode, ShaderNodeTree, ShaderNodeType, SocketValue,
};
use tracing::{debug, warn};

use super::{Attribute, Bsdf, Expr, GlslType, ShaderWriter, SocketData};

const WHITE: SocketValue = SocketValue::Color([1.0, 1.0, 1.0, 1.0]);
const GRAY: SocketValue = SocketValue::Color([0.8, 0.8, 0.8, 1.0]);
const MID_GRAY: SocketValue = SocketValue::Color([0.5, 0.5, 0.5, 1.0]);
const BLACK: SocketValue = SocketValue::Color([0.0, 0.0, 0.0, 1.0]);
const FLAT_NORMAL: SocketValue = SocketValue::Color([0.5, 0.5, 1.0, 1.0]);
const ZERO_VECTOR: SocketValue = SocketValue::Vector([0.0, 0.0, 0.0]);
const UNIT_SCALE: SocketValue = SocketValue::Vector([1.0, 1.0, 1.0]);

/// Input socket with its type and unconnected default
type InputSocket = (&'static str, GlslType, SocketValue);

/// Closure node backed by one library function
struct BsdfNode {
    function: &'static str,
    inputs: &'static [InputSocket],
    /// Closure attributes, in the function's output order
    attributes: &'static [Attribute],
}

const DIFFUSE: BsdfNode = BsdfNode {
    function: "node_bsdf_diffuse",
    inputs: &[("Color", GlslType::Vec4, GRAY), ("Roughness", GlslType::Float, SocketValue::Float(0.0))],
    attributes: &[Attribute::Albedo, Attribute::Specular, Attribute::Roughness],
};

const GLOSSY: BsdfNode = BsdfNode {
    function: "node_bsdf_glossy",
    inputs: &[("Color", GlslType::Vec4, GRAY), ("Roughness", GlslType::Float, SocketValue::Float(0.5))],
    attributes: &[Attribute::Albedo, Attribute::Metallic, Attribute::Roughness],
};

const GLASS: BsdfNode = BsdfNode {
    function: "node_bsdf_glass",
    inputs: &[
        ("Color", GlslType::Vec4, WHITE),
        ("Roughness", GlslType::Float, SocketValue::Float(0.0)),
        ("IOR", GlslType::Float, SocketValue::Float(1.45)),
    ],
    attributes: &[
        Attribute::Albedo,
        Attribute::Alpha,
        Attribute::Specular,
        Attribute::Roughness,
        Attribute::Transmission,
    ],
};

const TRANSPARENT: BsdfNode = BsdfNode {
    function: "node_bsdf_transparent",
    inputs: &[("Color", GlslType::Vec4, WHITE)],
    attributes: &[Attribute::Albedo, Attribute::Alpha],
};

const TRANSLUCENT: BsdfNode = BsdfNode {
    function: "node_bsdf_translucent",
    inputs: &[("Color", GlslType::Vec4, GRAY)],
    attributes: &[Attribute::Albedo, Attribute::Transmission],
};

/// Data node backed by one library function
struct Converter {
    function: &'static str,
    inputs: &'static [InputSocket],
    outputs: &'static [(&'static str, GlslType)],
}

const MAPPING_INPUTS: &[InputSocket] = &[
    ("Vector", GlslType::Vec3, ZERO_VECTOR),
    ("Location", GlslType::Vec3, ZERO_VECTOR),
    ("Rotation", GlslType::Vec3, ZERO_VECTOR),
    ("Scale", GlslType::Vec3, UNIT_SCALE),
];

const MATH_INPUTS: &[InputSocket] = &[
    ("Value", GlslType::Float, SocketValue::Float(0.5)),
    ("Value_001", GlslType::Float, SocketValue::Float(0.5)),
];

const SEPARATE_RGB: Converter = Converter {
    function: "node_separate_rgb",
    inputs: &[("Image", GlslType::Vec4, GRAY)],
    outputs: &[("R", GlslType::Float), ("G", GlslType::Float), ("B", GlslType::Float)],
};

const COMBINE_RGB: Converter = Converter {
    function: "node_combine_rgb",
    inputs: &[
        ("R", GlslType::Float, SocketValue::Float(0.0)),
        ("G", GlslType::Float, SocketValue::Float(0.0)),
        ("B", GlslType::Float, SocketValue::Float(0.0)),
    ],
    outputs: &[("Image", GlslType::Vec4)],
};

const SEPARATE_XYZ: Converter = Converter {
    function: "node_separate_xyz",
    inputs: &[("Vector", GlslType::Vec3, ZERO_VECTOR)],
    outputs: &[("X", GlslType::Float), ("Y", GlslType::Float), ("Z", GlslType::Float)],
};

const COMBINE_XYZ: Converter = Converter {
    function: "node_combine_xyz",
    inputs: &[
        ("X", GlslType::Float, SocketValue::Float(0.0)),
        ("Y", GlslType::Float, SocketValue::Float(0.0)),
        ("Z", GlslType::Float, SocketValue::Float(0.0)),
    ],
    outputs: &[("Vector", GlslType::Vec3)],
};

const RGB_TO_BW: Converter = Converter {
    function: "node_rgb_to_bw",
    inputs: &[("Color", GlslType::Vec4, MID_GRAY)],
    outputs: &[("Val", GlslType::Float)],
};

const INVERT: Converter = Converter {
    function: "node_invert",
    inputs: &[("Fac", GlslType::Float, SocketValue::Float(1.0)), ("Color", GlslType::Vec4, BLACK)],
    outputs: &[("Color", GlslType::Vec4)],
};

/// Translate one node
pub(super) fn visit(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    match node.node_type {
        ShaderNodeType::OutputMaterial => {
            Err(w.invalid(format!("material output '{}' used as an input", node.name)))
        }
        ShaderNodeType::BsdfPrincipled => visit_principled(w, node),
        ShaderNodeType::BsdfDiffuse => visit_bsdf(w, node, &DIFFUSE),
        ShaderNodeType::BsdfGlossy => visit_bsdf(w, node, &GLOSSY),
        ShaderNodeType::BsdfGlass => visit_bsdf(w, node, &GLASS),
        ShaderNodeType::BsdfTransparent => visit_bsdf(w, node, &TRANSPARENT),
        ShaderNodeType::BsdfTranslucent => visit_bsdf(w, node, &TRANSLUCENT),
        ShaderNodeType::Emission => visit_emission(w, node),
        ShaderNodeType::MixShader => visit_mix_shader(w, node),
        ShaderNodeType::AddShader => visit_add_shader(w, node),
        ShaderNodeType::Rgb => visit_constant(w, node, "Color", GlslType::Vec4, MID_GRAY),
        ShaderNodeType::Value => visit_constant(w, node, "Value", GlslType::Float, float(0.5)),
        ShaderNodeType::TexImage => visit_image_texture(w, node),
        ShaderNodeType::TexCoord => {
            visit_texture_coordinate(w, node);
            Ok(())
        }
        ShaderNodeType::UvMap => {
            debug!("UV map node '{}' uses the active UV layer", node.name);
            w.set_output(node, "UV", SocketData::Data(uv_expr()));
            Ok(())
        }
        ShaderNodeType::NormalMap => visit_normal_map(w, node),
        ShaderNodeType::Reroute => visit_reroute(w, node),
        ShaderNodeType::MixRgb => visit_mix_rgb(w, node),
        ShaderNodeType::Mapping => visit_mapping(w, node),
        ShaderNodeType::Bump => visit_bump(w, node),
        ShaderNodeType::Tangent => {
            w.set_output(node, "Tangent", SocketData::Data(Expr::new("TANGENT", GlslType::Vec3)));
            Ok(())
        }
        ShaderNodeType::Math => visit_math(w, node),
        ShaderNodeType::SeparateRgb => visit_converter(w, node, &SEPARATE_RGB).map(drop),
        ShaderNodeType::CombineRgb => visit_converter(w, node, &COMBINE_RGB).map(drop),
        ShaderNodeType::SeparateXyz => visit_converter(w, node, &SEPARATE_XYZ).map(drop),
        ShaderNodeType::CombineXyz => visit_converter(w, node, &COMBINE_XYZ).map(drop),
        ShaderNodeType::RgbToBw => visit_converter(w, node, &RGB_TO_BW).map(drop),
        ShaderNodeType::Invert => visit_converter(w, node, &INVERT).map(drop),
    }
}

fn uv_expr() -> Expr {
    Expr::new("vec3(UV, 0.0)", GlslType::Vec3)
}

fn float(v: f32) -> SocketValue {
    SocketValue::Float(v)
}

/// Wire linked `Normal` and `Tangent` inputs into the closure
fn apply_normal(w: &mut ShaderWriter<'_>, node: &ShaderNode, bsdf: &mut Bsdf) -> Result<()> {
    match w.input_raw(node, "Normal")? {
        None => {}
        Some(SocketData::NormalMap { color, strength }) => {
            let map = w.define_with(GlslType::Vec3, "normalmap", &format!("{}.xyz", color.code));
            bsdf.set(Attribute::NormalMap, map);
            bsdf.set(Attribute::NormalMapDepth, strength.code);
        }
        Some(SocketData::Data(expr)) => {
            let normal = w.convert(expr, GlslType::Vec3)?;
            bsdf.set(Attribute::Normal, format!("normalize({})", normal.code));
        }
        Some(SocketData::Shader(_)) => {
            return Err(w.invalid(format!("shader output linked into normal of '{}'", node.name)));
        }
    }
    if w.link(node, "Tangent").is_some() {
        let tangent = w.input_data(node, "Tangent", GlslType::Vec3, ZERO_VECTOR)?;
        bsdf.set(Attribute::Tangent, format!("normalize({})", tangent.code));
    }
    Ok(())
}

fn visit_principled(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let inputs = [
        ("Base Color", GlslType::Vec4, GRAY),
        ("Metallic", GlslType::Float, float(0.0)),
        ("Specular", GlslType::Float, float(0.5)),
        ("Roughness", GlslType::Float, float(0.5)),
        ("Clearcoat", GlslType::Float, float(0.0)),
        ("Clearcoat Roughness", GlslType::Float, float(0.03)),
        ("Anisotropic", GlslType::Float, float(0.0)),
        ("Transmission", GlslType::Float, float(0.0)),
        ("IOR", GlslType::Float, float(1.45)),
    ];
    let mut args = Vec::with_capacity(inputs.len());
    for (socket, ty, default) in inputs {
        args.push(w.input_data(node, socket, ty, default)?.code);
    }

    let attributes = [
        Attribute::Albedo,
        Attribute::Metallic,
        Attribute::Specular,
        Attribute::Roughness,
        Attribute::Clearcoat,
        Attribute::ClearcoatGloss,
        Attribute::Anisotropy,
        Attribute::Transmission,
    ];
    let outs: Vec<String> = attributes
        .iter()
        .map(|a| w.define(a.ty(), &format!("out_{}", a.label())))
        .collect();
    w.call("node_bsdf_principled", &args, &outs)?;

    let mut bsdf = Bsdf::default();
    // Transmission only when set; the engine's model differs a lot
    let transmission_set = w.link(node, "Transmission").is_some()
        || node
            .inputs
            .get("Transmission")
            .is_some_and(|v| *v != SocketValue::Float(0.0));
    for (attribute, out) in attributes.iter().zip(outs) {
        if *attribute == Attribute::Transmission && !transmission_set {
            continue;
        }
        bsdf.set(*attribute, out);
    }

    let alpha = w.input_data(node, "Alpha", GlslType::Float, float(1.0))?;
    bsdf.set(Attribute::Alpha, alpha.code);

    let emission_set = w.link(node, "Emission").is_some()
        || node
            .inputs
            .get("Emission")
            .is_some_and(|v| !matches!(v, SocketValue::Color([r, g, b, _]) if *r == 0.0 && *g == 0.0 && *b == 0.0));
    if emission_set {
        let emission = w.input_data(node, "Emission", GlslType::Vec3, BLACK)?;
        bsdf.set(Attribute::Emission, emission.code);
    }

    apply_normal(w, node, &mut bsdf)?;
    w.set_output(node, "BSDF", SocketData::Shader(bsdf));
    Ok(())
}

/// Closure from a library function: every input read, every output an
/// attribute
fn visit_bsdf(w: &mut ShaderWriter<'_>, node: &ShaderNode, spec: &BsdfNode) -> Result<()> {
    let mut args = Vec::with_capacity(spec.inputs.len());
    for &(socket, ty, default) in spec.inputs {
        args.push(w.input_data(node, socket, ty, default)?.code);
    }
    let outs: Vec<String> = spec
        .attributes
        .iter()
        .map(|a| w.define(a.ty(), &format!("out_{}", a.label())))
        .collect();
    w.call(spec.function, &args, &outs)?;

    let mut bsdf = Bsdf::default();
    for (attribute, out) in spec.attributes.iter().zip(outs) {
        bsdf.set(*attribute, out);
    }
    apply_normal(w, node, &mut bsdf)?;
    w.set_output(node, "BSDF", SocketData::Shader(bsdf));
    Ok(())
}

fn visit_emission(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let color = w.input_data(node, "Color", GlslType::Vec4, WHITE)?;
    let strength = w.input_data(node, "Strength", GlslType::Float, float(1.0))?;
    let out = w.define(GlslType::Vec3, "out_emission");
    w.call("node_emission", &[color.code, strength.code], &[out.clone()])?;

    let mut bsdf = Bsdf::unconnected();
    bsdf.set(Attribute::Emission, out);
    w.set_output(node, "Emission", SocketData::Shader(bsdf));
    Ok(())
}

/// Blend two closures attribute by attribute
fn mix_closures(w: &mut ShaderWriter<'_>, a: &Bsdf, b: &Bsdf, fac: &str) -> Bsdf {
    let mut out = Bsdf::default();
    let attributes: Vec<Attribute> = {
        let mut all: Vec<Attribute> = a.iter().chain(b.iter()).map(|(attr, _)| attr).collect();
        all.sort();
        all.dedup();
        all
    };

    for attribute in attributes {
        let (mut left, mut right) = (a.get(attribute), b.get(attribute));
        if attribute == Attribute::Alpha {
            // A side without alpha is opaque
            left = left.or(Some("1.0"));
            right = right.or(Some("1.0"));
        }
        match (left, right) {
            (Some(l), Some(_))
                if matches!(
                    attribute,
                    Attribute::NormalMap | Attribute::NormalMapDepth | Attribute::Normal | Attribute::Tangent
                ) =>
            {
                // Normals are not blended
                out.set(attribute, l);
            }
            (Some(l), Some(r)) => {
                let mixed = w.define_with(
                    attribute.ty(),
                    attribute.label(),
                    &format!("mix({l}, {r}, {fac})"),
                );
                out.set(attribute, mixed);
            }
            (Some(only), None) | (None, Some(only)) => out.set(attribute, only),
            (None, None) => {}
        }
    }
    out
}

fn visit_mix_shader(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let fac = w.input_data(node, "Fac", GlslType::Float, float(0.5))?;
    let a = w.input_shader(node, "Shader")?;
    let b = w.input_shader(node, "Shader_001")?;
    let mixed = mix_closures(w, &a, &b, &fac.code);
    w.set_output(node, "Shader", SocketData::Shader(mixed));
    Ok(())
}

fn visit_add_shader(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let a = w.input_shader(node, "Shader")?;
    let b = w.input_shader(node, "Shader_001")?;
    let mixed = mix_closures(w, &a, &b, "0.5");
    w.set_output(node, "Shader", SocketData::Shader(mixed));
    Ok(())
}

fn visit_constant(
    w: &mut ShaderWriter<'_>,
    node: &ShaderNode,
    socket: &str,
    ty: GlslType,
    default: SocketValue,
) -> Result<()> {
    let value = node.outputs.get(socket).copied().unwrap_or(default);
    let literal = w.convert(Expr::from_socket_value(value), ty)?;
    let var = w.define_with(ty, socket, &literal.code);
    w.set_output(node, socket, SocketData::Data(Expr::new(var, ty)));
    Ok(())
}

/// Whether a texture's colour ends up in a normal map's colour input
fn is_normal_texture(tree: &ShaderNodeTree, texture: &ShaderNode) -> bool {
    let mut queue: VecDeque<(&str, &str)> = tree
        .links
        .iter()
        .filter(|l| l.from_node == texture.name && l.from_socket == "Color")
        .map(|l| (l.to_node.as_str(), l.to_socket.as_str()))
        .collect();
    let mut seen: HashSet<&str> = HashSet::new();

    while let Some((node_name, socket)) = queue.pop_front() {
        let Some(node) = tree.node(node_name) else {
            continue;
        };
        if node.node_type == ShaderNodeType::NormalMap && socket == "Color" {
            return true;
        }
        if !seen.insert(node_name) {
            continue;
        }
        queue.extend(
            tree.links
                .iter()
                .filter(|l| l.from_node == node_name)
                .map(|l| (l.to_node.as_str(), l.to_socket.as_str())),
        );
    }
    false
}

fn visit_image_texture(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let coordinates = match w.link(node, "Vector") {
        Some(_) => w.input_data(node, "Vector", GlslType::Vec3, SocketValue::Vector([0.0; 3]))?,
        None => uv_expr(),
    };

    let Some(image) = node.image.as_deref() else {
        warn!("Image texture node '{}' has no image", node.name);
        let color = w.define_with(GlslType::Vec4, "Color", "vec4(0.0, 0.0, 0.0, 1.0)");
        let alpha = w.define_with(GlslType::Float, "Alpha", "1.0");
        w.set_output(node, "Color", SocketData::Data(Expr::new(color, GlslType::Vec4)));
        w.set_output(node, "Alpha", SocketData::Data(Expr::new(alpha, GlslType::Float)));
        return Ok(());
    };

    let normal = is_normal_texture(w.tree(), node);
    let uniform = w.texture_uniform(image, normal);
    w.comment(&format!("texture image from node {}", node.name));
    let color = w.define(GlslType::Vec4, "Color");
    let alpha = w.define(GlslType::Float, "Alpha");
    w.call(
        "node_tex_image",
        &[coordinates.code, uniform],
        &[color.clone(), alpha.clone()],
    )?;
    w.set_output(node, "Color", SocketData::Data(Expr::new(color, GlslType::Vec4)));
    w.set_output(node, "Alpha", SocketData::Data(Expr::new(alpha, GlslType::Float)));
    Ok(())
}

fn visit_texture_coordinate(w: &mut ShaderWriter<'_>, node: &ShaderNode) {
    w.set_output(node, "UV", SocketData::Data(uv_expr()));

    let tree = w.tree();
    let mut others: Vec<&str> = tree
        .links
        .iter()
        .filter(|l| l.from_node == node.name && l.from_socket != "UV")
        .map(|l| l.from_socket.as_str())
        .collect();
    others.sort_unstable();
    others.dedup();
    for socket in others {
        warn!("Texture coordinate output '{socket}' of '{}' is not supported", node.name);
        w.set_output(
            node,
            socket,
            SocketData::Data(Expr::new("vec3(1.0, 1.0, 1.0)", GlslType::Vec3)),
        );
    }
}

fn visit_normal_map(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let strength = w.input_data(node, "Strength", GlslType::Float, float(1.0))?;
    let color = w.input_data(node, "Color", GlslType::Vec4, FLAT_NORMAL)?;
    w.set_output(node, "Normal", SocketData::NormalMap { color, strength });
    Ok(())
}

fn visit_reroute(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let data = match w.input_raw(node, "Input")? {
        Some(data) => data,
        None => {
            warn!("Reroute node '{}' has no input", node.name);
            SocketData::Data(Expr::new("vec3(1.0, 1.0, 1.0)", GlslType::Vec3))
        }
    };
    w.set_output(node, "Output", data);
    Ok(())
}

fn visit_mix_rgb(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let fac = w.input_data(node, "Fac", GlslType::Float, float(0.5))?;
    let color1 = w.input_data(node, "Color1", GlslType::Vec4, MID_GRAY)?;
    let color2 = w.input_data(node, "Color2", GlslType::Vec4, MID_GRAY)?;

    let function = match node.blend_type {
        MixBlend::Mix => "node_mix_rgb_mix",
        MixBlend::Add => "node_mix_rgb_add",
        MixBlend::Multiply => "node_mix_rgb_multiply",
        MixBlend::Subtract => "node_mix_rgb_subtract",
    };
    let out = w.define(GlslType::Vec4, "Color");
    w.call(function, &[fac.code, color1.code, color2.code], &[out.clone()])?;
    w.set_output(node, "Color", SocketData::Data(Expr::new(out, GlslType::Vec4)));
    Ok(())
}

/// Run a converter; returns the output variables in socket order
fn visit_converter(
    w: &mut ShaderWriter<'_>,
    node: &ShaderNode,
    spec: &Converter,
) -> Result<Vec<String>> {
    let mut args = Vec::with_capacity(spec.inputs.len());
    for &(socket, ty, default) in spec.inputs {
        args.push(w.input_data(node, socket, ty, default)?.code);
    }
    let outs: Vec<String> = spec.outputs.iter().map(|&(socket, ty)| w.define(ty, socket)).collect();
    w.call(spec.function, &args, &outs)?;
    for (&(socket, ty), out) in spec.outputs.iter().zip(&outs) {
        w.set_output(node, socket, SocketData::Data(Expr::new(out.clone(), ty)));
    }
    Ok(outs)
}

fn visit_mapping(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let function = match node.vector_type {
        MappingType::Point => "node_mapping_point",
        MappingType::Texture => "node_mapping_texture",
        MappingType::Vector => "node_mapping_vector",
        MappingType::Normal => "node_mapping_normal",
    };
    let spec = Converter {
        function,
        inputs: MAPPING_INPUTS,
        outputs: &[("Vector", GlslType::Vec3)],
    };
    visit_converter(w, node, &spec)?;
    Ok(())
}

fn visit_math(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let function = match node.operation {
        MathOperation::Add => "node_math_add",
        MathOperation::Subtract => "node_math_subtract",
        MathOperation::Multiply => "node_math_multiply",
        MathOperation::Divide => "node_math_divide",
        MathOperation::Power => "node_math_power",
        MathOperation::Minimum => "node_math_minimum",
        MathOperation::Maximum => "node_math_maximum",
        MathOperation::Absolute => "node_math_absolute",
    };
    let spec = Converter {
        function,
        inputs: MATH_INPUTS,
        outputs: &[("Value", GlslType::Float)],
    };
    let outs = visit_converter(w, node, &spec)?;
    if node.use_clamp {
        for out in outs {
            w.line(format!("{out} = clamp({out}, 0.0, 1.0);"));
        }
    }
    Ok(())
}

fn visit_bump(w: &mut ShaderWriter<'_>, node: &ShaderNode) -> Result<()> {
    let strength = w.input_data(node, "Strength", GlslType::Float, float(1.0))?;
    let distance = w.input_data(node, "Distance", GlslType::Float, float(1.0))?;
    let height = w.input_data(node, "Height", GlslType::Float, float(1.0))?;
    let normal = match w.link(node, "Normal") {
        Some(_) => w.input_data(node, "Normal", GlslType::Vec3, ZERO_VECTOR)?.code,
        None => "NORMAL".to_string(),
    };
    let invert = if node.invert { "1.0" } else { "0.0" };

    let out = w.define(GlslType::Vec3, "out_normal");
    w.call(
        "node_bump",
        &[strength.code, distance.code, height.code, normal, "VERTEX".into(), invert.into()],
        &[out.clone()],
    )?;
    w.set_output(node, "Normal", SocketData::Data(Expr::new(out, GlslType::Vec3)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use escn_scene::ShaderLink;

    #[test]
    fn test_normal_texture_detection_through_reroute() {
        let tree = ShaderNodeTree {
            nodes: vec![
                ShaderNode::new("Tex", ShaderNodeType::TexImage),
                ShaderNode::new("Hop", ShaderNodeType::Reroute),
                ShaderNode::new("Map", ShaderNodeType::NormalMap),
                ShaderNode::new("Other", ShaderNodeType::TexImage),
            ],
            links: vec![
                ShaderLink::new("Tex", "Color", "Hop", "Input"),
                ShaderLink::new("Hop", "Output", "Map", "Color"),
            ],
        };
        assert!(is_normal_texture(&tree, &tree.nodes[0]));
        assert!(!is_normal_texture(&tree, &tree.nodes[3]));
    }
}
