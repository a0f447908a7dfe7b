//! Shader code generation from material node trees
//!
//! The tree is walked depth first from the material output's `Surface` and
//! `Displacement` sockets. Each visited node appends code to the fragment
//! function and publishes its output sockets as [`SocketData`]; later nodes
//! read those through links. The closure reaching `Surface` is finally
//! written to the fragment built-ins (`ALBEDO`, `ROUGHNESS`, ...).
//!
//! # Example
//!
//! ```rust,ignore
//! let shader = generate(&material)?.expect("material has a node tree");
//! println!("{}", shader.code);
//! ```

pub mod functions;
mod nodes;

use std::collections::{BTreeMap, HashMap, HashSet};

use escn_core::{Error, Result, ValidationError};
use escn_scene::{MaterialData, ShaderLink, ShaderNode, ShaderNodeTree, SocketValue};
use tracing::trace;

use crate::escn::format_float;
use functions::{find_function, ShaderFunction};

/// Value types flowing through sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    Float,
    Vec3,
    Vec4,
}

impl GlslType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
        }
    }
}

/// Typed shader expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub code: String,
    pub ty: GlslType,
}

impl Expr {
    pub fn new(code: impl Into<String>, ty: GlslType) -> Self {
        Self {
            code: code.into(),
            ty,
        }
    }

    pub fn float(v: f32) -> Self {
        Self::new(format_float(v), GlslType::Float)
    }

    pub fn vec3(v: [f32; 3]) -> Self {
        let parts: Vec<String> = v.iter().map(|&c| format_float(c)).collect();
        Self::new(format!("vec3({})", parts.join(", ")), GlslType::Vec3)
    }

    pub fn vec4(v: [f32; 4]) -> Self {
        let parts: Vec<String> = v.iter().map(|&c| format_float(c)).collect();
        Self::new(format!("vec4({})", parts.join(", ")), GlslType::Vec4)
    }

    /// Literal for an unconnected socket value
    pub fn from_socket_value(value: SocketValue) -> Self {
        match value {
            SocketValue::Float(v) => Self::float(v),
            SocketValue::Vector(v) => Self::vec3(v),
            SocketValue::Color(v) => Self::vec4(v),
        }
    }
}

/// Surface properties a shader closure can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Albedo,
    Alpha,
    Metallic,
    Specular,
    Roughness,
    Clearcoat,
    ClearcoatGloss,
    Anisotropy,
    Transmission,
    Emission,
    NormalMap,
    NormalMapDepth,
    /// View-space normal replacing the interpolated one
    Normal,
    Tangent,
}

impl Attribute {
    pub fn ty(self) -> GlslType {
        match self {
            Self::Albedo | Self::Emission | Self::NormalMap | Self::Normal | Self::Tangent => {
                GlslType::Vec3
            }
            _ => GlslType::Float,
        }
    }

    /// Fragment built-in receiving the attribute
    pub fn builtin(self) -> &'static str {
        match self {
            Self::Albedo => "ALBEDO",
            Self::Alpha => "ALPHA",
            Self::Metallic => "METALLIC",
            Self::Specular => "SPECULAR",
            Self::Roughness => "ROUGHNESS",
            Self::Clearcoat => "CLEARCOAT",
            Self::ClearcoatGloss => "CLEARCOAT_GLOSS",
            Self::Anisotropy => "ANISOTROPY",
            Self::Transmission => "TRANSMISSION",
            Self::Emission => "EMISSION",
            Self::NormalMap => "NORMALMAP",
            Self::NormalMapDepth => "NORMALMAP_DEPTH",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
        }
    }

    /// Base for variable names
    pub fn label(self) -> &'static str {
        match self {
            Self::Albedo => "albedo",
            Self::Alpha => "alpha",
            Self::Metallic => "metallic",
            Self::Specular => "specular",
            Self::Roughness => "roughness",
            Self::Clearcoat => "clearcoat",
            Self::ClearcoatGloss => "clearcoat_gloss",
            Self::Anisotropy => "anisotropy",
            Self::Transmission => "transmission",
            Self::Emission => "emission",
            Self::NormalMap => "normalmap",
            Self::NormalMapDepth => "normalmap_depth",
            Self::Normal => "normal",
            Self::Tangent => "tangent",
        }
    }
}

/// Shader closure: expressions per surface attribute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bsdf {
    values: BTreeMap<Attribute, String>,
}

impl Bsdf {
    /// Closure of an unconnected shader socket
    pub fn unconnected() -> Self {
        let mut bsdf = Self::default();
        bsdf.set(Attribute::Albedo, "vec3(0.0, 0.0, 0.0)");
        bsdf
    }

    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.values.get(&attribute).map(String::as_str)
    }

    pub fn set(&mut self, attribute: Attribute, code: impl Into<String>) {
        self.values.insert(attribute, code.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.values.iter().map(|(&a, c)| (a, c.as_str()))
    }
}

/// What an output socket provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketData {
    Data(Expr),
    Shader(Bsdf),
    /// Tangent-space normal map sample, resolved by the consumer
    NormalMap { color: Expr, strength: Expr },
}

/// Sampler uniform waiting for a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureUniform {
    pub uniform: String,
    pub image: String,
}

/// Result of translating one material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
    pub code: String,
    pub textures: Vec<TextureUniform>,
}

/// Generate a shader for a material.
///
/// Returns `None` when the material has no node tree or no output node.
pub fn generate(material: &MaterialData) -> Result<Option<GeneratedShader>> {
    let Some(tree) = material.node_tree.as_ref() else {
        return Ok(None);
    };
    let Some(output) = tree.output_node() else {
        return Ok(None);
    };

    let mut writer = ShaderWriter::new(material, tree);
    if tree.link_to(&output.name, "Surface").is_some() {
        let bsdf = writer.input_shader(output, "Surface")?;
        writer.write_surface(&bsdf);
    }
    if tree.link_to(&output.name, "Displacement").is_some() {
        let height = writer.input_data(output, "Displacement", GlslType::Float, SocketValue::Float(0.0))?;
        writer.call(
            "node_bump",
            &["1.0".into(), "0.1".into(), height.code, "NORMAL".into(), "VERTEX".into(), "0.0".into()],
            &["NORMAL".into()],
        )?;
    }
    Ok(Some(writer.finish()))
}

fn clean_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Code being generated for one material
pub(crate) struct ShaderWriter<'a> {
    material: &'a MaterialData,
    tree: &'a ShaderNodeTree,
    lines: Vec<String>,
    uniforms: Vec<String>,
    functions: Vec<&'static ShaderFunction>,
    textures: Vec<TextureUniform>,
    variable_count: usize,
    outputs: HashMap<(String, String), SocketData>,
    visiting: HashSet<String>,
}

impl<'a> ShaderWriter<'a> {
    fn new(material: &'a MaterialData, tree: &'a ShaderNodeTree) -> Self {
        Self {
            material,
            tree,
            lines: Vec::new(),
            uniforms: Vec::new(),
            functions: Vec::new(),
            textures: Vec::new(),
            variable_count: 0,
            outputs: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    pub(crate) fn tree(&self) -> &'a ShaderNodeTree {
        self.tree
    }

    pub(crate) fn invalid(&self, message: impl Into<String>) -> Error {
        ValidationError::InvalidMaterial {
            material: self.material.name.clone(),
            message: message.into(),
        }
        .into()
    }

    // ==================== Code emission ====================

    pub(crate) fn line(&mut self, code: impl Into<String>) {
        self.lines.push(code.into());
    }

    pub(crate) fn comment(&mut self, text: &str) {
        self.lines.push(format!("// {text}"));
    }

    /// Declare a fresh variable
    pub(crate) fn define(&mut self, ty: GlslType, base: &str) -> String {
        self.variable_count += 1;
        let name = clean_identifier(&format!("var{}_{base}", self.variable_count));
        self.lines.push(format!("{} {name};", ty.name()));
        name
    }

    /// Declare a variable holding an expression
    pub(crate) fn define_with(&mut self, ty: GlslType, base: &str, value: &str) -> String {
        let name = self.define(ty, base);
        self.lines.push(format!("{name} = {value};"));
        name
    }

    /// Call a library function, emitting its body on first use
    pub(crate) fn call(&mut self, name: &str, inputs: &[String], outputs: &[String]) -> Result<()> {
        let function = find_function(name)?;
        if !self.functions.iter().any(|f| f.name == function.name) {
            self.functions.push(function);
        }
        let args: Vec<&str> = inputs.iter().chain(outputs).map(String::as_str).collect();
        self.lines.push(format!("{name}({});", args.join(", ")));
        Ok(())
    }

    /// Sampler uniform for an image, shared by every node using it
    pub(crate) fn texture_uniform(&mut self, image: &str, normal: bool) -> String {
        if let Some(existing) = self.textures.iter().find(|t| t.image == image) {
            return existing.uniform.clone();
        }
        let uniform = clean_identifier(&format!("uni{}_{image}", self.textures.len() + 1));
        let hint = if normal { "hint_normal" } else { "hint_albedo" };
        self.uniforms.push(format!("uniform sampler2D {uniform} : {hint};"));
        self.textures.push(TextureUniform {
            uniform: uniform.clone(),
            image: image.to_string(),
        });
        uniform
    }

    // ==================== Graph access ====================

    /// Publish the value of an output socket
    pub(crate) fn set_output(&mut self, node: &ShaderNode, socket: &str, data: SocketData) {
        self.outputs
            .insert((node.name.clone(), socket.to_string()), data);
    }

    /// Link feeding an input socket
    pub(crate) fn link(&self, node: &ShaderNode, socket: &str) -> Option<&'a ShaderLink> {
        let tree: &'a ShaderNodeTree = self.tree;
        tree.link_to(&node.name, socket)
    }

    /// Value of an output socket, visiting its node if needed
    fn output(&mut self, node_name: &str, socket: &str) -> Result<SocketData> {
        let key = (node_name.to_string(), socket.to_string());
        if let Some(data) = self.outputs.get(&key) {
            return Ok(data.clone());
        }

        let tree: &'a ShaderNodeTree = self.tree;
        let node = tree
            .node(node_name)
            .ok_or_else(|| self.invalid(format!("link from missing node '{node_name}'")))?;
        if !self.visiting.insert(node.name.clone()) {
            return Err(self.invalid(format!("node tree has a cycle through '{node_name}'")));
        }
        trace!("Visiting shader node '{}'", node.name);
        self.comment(&format!("node: {}", node.name));
        nodes::visit(self, node)?;
        self.visiting.remove(&node.name);

        self.outputs.get(&key).cloned().ok_or_else(|| {
            self.invalid(format!("node '{node_name}' has no output '{socket}'"))
        })
    }

    /// Data input converted to `ty`; unconnected inputs use the node's value
    /// or `default`
    pub(crate) fn input_data(
        &mut self,
        node: &ShaderNode,
        socket: &str,
        ty: GlslType,
        default: SocketValue,
    ) -> Result<Expr> {
        match self.link(node, socket) {
            Some(link) => {
                let data = self.output(&link.from_node, &link.from_socket)?;
                self.to_data(data, ty, node, socket)
            }
            None => {
                let value = node.inputs.get(socket).copied().unwrap_or(default);
                self.convert(Expr::from_socket_value(value), ty)
            }
        }
    }

    /// Raw data behind a linked input, without conversion
    pub(crate) fn input_raw(&mut self, node: &ShaderNode, socket: &str) -> Result<Option<SocketData>> {
        match self.link(node, socket) {
            Some(link) => self.output(&link.from_node, &link.from_socket).map(Some),
            None => Ok(None),
        }
    }

    /// Shader input as a closure
    pub(crate) fn input_shader(&mut self, node: &ShaderNode, socket: &str) -> Result<Bsdf> {
        let Some(link) = self.link(node, socket) else {
            return Ok(Bsdf::unconnected());
        };
        match self.output(&link.from_node, &link.from_socket)? {
            SocketData::Shader(bsdf) => Ok(bsdf),
            data => {
                // Plain colours plugged into a shader socket glow
                let emission = self.to_data(data, GlslType::Vec3, node, socket)?;
                let mut bsdf = Bsdf::unconnected();
                bsdf.set(Attribute::Emission, emission.code);
                Ok(bsdf)
            }
        }
    }

    fn to_data(&mut self, data: SocketData, ty: GlslType, node: &ShaderNode, socket: &str) -> Result<Expr> {
        match data {
            SocketData::Data(expr) => self.convert(expr, ty),
            SocketData::NormalMap { color, strength } => {
                let normal = self.define(GlslType::Vec3, "out_normal");
                self.call(
                    "node_normal_map",
                    &[strength.code, color.code, "NORMAL".into(), "TANGENT".into(), "BINORMAL".into()],
                    &[normal.clone()],
                )?;
                self.convert(Expr::new(normal, GlslType::Vec3), ty)
            }
            SocketData::Shader(_) => Err(self.invalid(format!(
                "shader output linked into data input '{socket}' of '{}'",
                node.name
            ))),
        }
    }

    /// Implicit conversion between socket types
    pub(crate) fn convert(&mut self, expr: Expr, to: GlslType) -> Result<Expr> {
        use GlslType::{Float, Vec3, Vec4};
        let converted = match (expr.ty, to) {
            (from, to) if from == to => return Ok(expr),
            (Float, Vec3) => Expr::new(format!("vec3({})", expr.code), Vec3),
            (Float, Vec4) => Expr::new(format!("vec4({})", expr.code), Vec4),
            (Vec3 | Vec4, Float) => {
                let source = if expr.ty == Vec3 {
                    format!("vec4({}, 1.0)", expr.code)
                } else {
                    expr.code
                };
                let out = self.define(Float, "converted");
                self.call("node_rgb_to_bw", &[source], &[out.clone()])?;
                Expr::new(out, Float)
            }
            (Vec3, Vec4) => {
                let value = format!(
                    "vec4(clamp({}, vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 1.0)).xyz, 1.0)",
                    expr.code
                );
                Expr::new(self.define_with(Vec4, "converted", &value), Vec4)
            }
            (Vec4, Vec3) => {
                let value = format!("{}.xyz", expr.code);
                Expr::new(self.define_with(Vec3, "converted", &value), Vec3)
            }
            _ => return Err(self.invalid("unsupported socket conversion")),
        };
        Ok(converted)
    }

    // ==================== Output ====================

    fn write_surface(&mut self, bsdf: &Bsdf) {
        let transparent = self.material.blend_method.is_transparent();
        for (attribute, code) in bsdf.iter() {
            match attribute {
                Attribute::Alpha if !transparent => {}
                Attribute::Transmission => {
                    self.line(format!("TRANSMISSION = vec3(1.0, 1.0, 1.0) * {code};"));
                }
                _ => self.line(format!("{} = {code};", attribute.builtin())),
            }
        }
    }

    fn render_mode(&self) -> String {
        let depth = if self.material.blend_method.is_transparent() {
            "depth_draw_always"
        } else {
            "depth_draw_opaque"
        };
        let cull = if self.material.use_backface_culling {
            "cull_back"
        } else {
            "cull_disabled"
        };
        format!("render_mode blend_mix,{depth},{cull},diffuse_burley,specular_schlick_ggx;")
    }

    fn finish(self) -> GeneratedShader {
        let mut code = String::from("shader_type spatial;\n");
        code.push_str(&self.render_mode());
        code.push('\n');
        for uniform in &self.uniforms {
            code.push_str(uniform);
            code.push('\n');
        }
        code.push('\n');
        for function in &self.functions {
            code.push_str(function.code);
            code.push('\n');
        }
        code.push_str("void vertex() {\n}\n\nvoid fragment() {\n");
        for line in &self.lines {
            code.push('\t');
            code.push_str(line);
            code.push('\n');
        }
        code.push_str("}\n");

        GeneratedShader {
            code,
            textures: self.textures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escn_scene::{BlendMethod, MappingType, MathOperation, ShaderNodeType};

    fn make_material(nodes: Vec<ShaderNode>, links: Vec<ShaderLink>) -> MaterialData {
        MaterialData {
            node_tree: Some(ShaderNodeTree { nodes, links }),
            ..MaterialData::new("Mat")
        }
    }

    fn principled_material() -> MaterialData {
        make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled)
                    .with_input("Roughness", SocketValue::Float(0.25)),
                ShaderNode::new("Image", ShaderNodeType::TexImage),
            ],
            vec![
                ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                ShaderLink::new("Image", "Color", "Principled BSDF", "Base Color"),
            ],
        )
    }

    #[test]
    fn test_no_tree_generates_nothing() {
        assert_eq!(generate(&MaterialData::new("Plain")).unwrap(), None);
    }

    #[test]
    fn test_principled_layout() {
        let mut material = principled_material();
        if let Some(tree) = material.node_tree.as_mut() {
            tree.nodes[2].image = Some("wood.png".into());
        }
        let shader = generate(&material).unwrap().unwrap();
        let code = &shader.code;

        assert!(code.starts_with(
            "shader_type spatial;\nrender_mode blend_mix,depth_draw_opaque,cull_disabled,diffuse_burley,specular_schlick_ggx;\n"
        ));
        assert!(code.contains("uniform sampler2D uni1_woodpng : hint_albedo;\n"));
        assert!(code.contains("void node_bsdf_principled("));
        assert!(code.contains("void node_tex_image("));
        assert!(code.contains("\tALBEDO = "));
        assert!(code.contains("\tROUGHNESS = "));
        assert!(!code.contains("ALPHA ="));
        assert!(code.contains("0.25"));
        assert!(code.ends_with("}\n"));
        assert_eq!(
            shader.textures,
            vec![TextureUniform {
                uniform: "uni1_woodpng".into(),
                image: "wood.png".into()
            }]
        );
    }

    #[test]
    fn test_transparent_material_writes_alpha() {
        let mut material = principled_material();
        material.blend_method = BlendMethod::Blend;
        let code = generate(&material).unwrap().unwrap().code;

        assert!(code.contains("depth_draw_always"));
        assert!(code.contains("\tALPHA = "));
    }

    #[test]
    fn test_normal_map_texture_hint() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
                ShaderNode {
                    image: Some("bumps".into()),
                    ..ShaderNode::new("Normal Image", ShaderNodeType::TexImage)
                },
                ShaderNode::new("Normal Map", ShaderNodeType::NormalMap),
            ],
            vec![
                ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                ShaderLink::new("Normal Image", "Color", "Normal Map", "Color"),
                ShaderLink::new("Normal Map", "Normal", "Principled BSDF", "Normal"),
            ],
        );
        let code = generate(&material).unwrap().unwrap().code;

        assert!(code.contains("uniform sampler2D uni1_bumps : hint_normal;"));
        assert!(code.contains("\tNORMALMAP = "));
        assert!(code.contains("\tNORMALMAP_DEPTH = "));
    }

    #[test]
    fn test_mix_shader_mixes_attributes() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Mix", ShaderNodeType::MixShader),
                ShaderNode::new("Diffuse", ShaderNodeType::BsdfDiffuse),
                ShaderNode::new("Glow", ShaderNodeType::Emission),
            ],
            vec![
                ShaderLink::new("Mix", "Shader", "Material Output", "Surface"),
                ShaderLink::new("Diffuse", "BSDF", "Mix", "Shader"),
                ShaderLink::new("Glow", "Emission", "Mix", "Shader_001"),
            ],
        );
        let code = generate(&material).unwrap().unwrap().code;

        assert!(code.contains("mix("));
        assert!(code.contains("\tEMISSION = "));
        assert!(code.contains("void node_emission("));
        assert!(code.contains("void node_bsdf_diffuse("));
    }

    #[test]
    fn test_cycle_is_validation_error() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("A", ShaderNodeType::Reroute),
                ShaderNode::new("B", ShaderNodeType::Reroute),
            ],
            vec![
                ShaderLink::new("A", "Output", "Material Output", "Surface"),
                ShaderLink::new("B", "Output", "A", "Input"),
                ShaderLink::new("A", "Output", "B", "Input"),
            ],
        );
        let err = generate(&material).unwrap_err();
        assert!(matches!(err.as_validation(), Some(ValidationError::InvalidMaterial { .. })));
    }

    #[test]
    fn test_shader_into_data_socket_is_validation_error() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
                ShaderNode::new("Diffuse", ShaderNodeType::BsdfDiffuse),
            ],
            vec![
                ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                ShaderLink::new("Diffuse", "BSDF", "Principled BSDF", "Base Color"),
            ],
        );
        assert!(generate(&material).unwrap_err().is_validation());
    }

    #[test]
    fn test_value_into_shader_socket_becomes_emission() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode {
                    outputs: [("Color".to_string(), SocketValue::Color([1.0, 0.0, 0.0, 1.0]))]
                        .into_iter()
                        .collect(),
                    ..ShaderNode::new("Red", ShaderNodeType::Rgb)
                },
            ],
            vec![ShaderLink::new("Red", "Color", "Material Output", "Surface")],
        );
        let code = generate(&material).unwrap().unwrap().code;
        assert!(code.contains("vec4(1.0, 0.0, 0.0, 1.0)"));
        assert!(code.contains("\tEMISSION = "));
    }

    #[test]
    fn test_glass_bsdf_is_transmissive() {
        let mut material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Glass BSDF", ShaderNodeType::BsdfGlass)
                    .with_input("IOR", SocketValue::Float(1.5)),
            ],
            vec![ShaderLink::new("Glass BSDF", "BSDF", "Material Output", "Surface")],
        );
        material.blend_method = BlendMethod::Blend;
        let code = generate(&material).unwrap().unwrap().code;

        assert!(code.contains("void node_bsdf_glass("));
        assert!(code.contains("\tnode_bsdf_glass("));
        assert!(code.contains("1.5"));
        assert!(code.contains("\tTRANSMISSION = vec3(1.0, 1.0, 1.0) * "));
        assert!(code.contains("\tALPHA = "));
    }

    #[test]
    fn test_mapping_moves_texture_coordinates() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
                ShaderNode {
                    image: Some("tiles".into()),
                    ..ShaderNode::new("Image", ShaderNodeType::TexImage)
                },
                ShaderNode {
                    vector_type: MappingType::Texture,
                    ..ShaderNode::new("Mapping", ShaderNodeType::Mapping)
                        .with_input("Scale", SocketValue::Vector([2.0, 2.0, 1.0]))
                },
                ShaderNode::new("Texture Coordinate", ShaderNodeType::TexCoord),
            ],
            vec![
                ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                ShaderLink::new("Image", "Color", "Principled BSDF", "Base Color"),
                ShaderLink::new("Mapping", "Vector", "Image", "Vector"),
                ShaderLink::new("Texture Coordinate", "UV", "Mapping", "Vector"),
            ],
        );
        let code = generate(&material).unwrap().unwrap().code;

        assert!(code.contains("void node_mapping_texture("));
        assert!(code.contains("\tnode_mapping_texture(vec3(UV, 0.0), vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 0.0), vec3(2.0, 2.0, 1.0), "));
        assert!(!code.contains("node_mapping_point"));
        // Texture lookup reads the mapped coordinates
        assert!(code.contains("_Vector, uni1_tiles, "));
    }

    #[test]
    fn test_bump_and_tangent_reach_the_closure() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
                ShaderNode {
                    invert: true,
                    ..ShaderNode::new("Bump", ShaderNodeType::Bump)
                },
                ShaderNode::new("Height", ShaderNodeType::Value),
                ShaderNode::new("Tangent", ShaderNodeType::Tangent),
            ],
            vec![
                ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                ShaderLink::new("Height", "Value", "Bump", "Height"),
                ShaderLink::new("Bump", "Normal", "Principled BSDF", "Normal"),
                ShaderLink::new("Tangent", "Tangent", "Principled BSDF", "Tangent"),
            ],
        );
        let code = generate(&material).unwrap().unwrap().code;

        assert!(code.contains("void node_bump("));
        assert!(code.contains("NORMAL, VERTEX, 1.0, "));
        assert!(code.contains("\tNORMAL = normalize(var"));
        assert!(code.contains("\tTANGENT = normalize(TANGENT);"));
        assert!(!code.contains("NORMALMAP ="));
    }

    #[test]
    fn test_converter_nodes_chain() {
        let material = make_material(
            vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
                ShaderNode {
                    image: Some("mask".into()),
                    ..ShaderNode::new("Mask", ShaderNodeType::TexImage)
                },
                ShaderNode::new("Split", ShaderNodeType::SeparateRgb),
                ShaderNode {
                    operation: MathOperation::Multiply,
                    use_clamp: true,
                    ..ShaderNode::new("Scale", ShaderNodeType::Math)
                        .with_input("Value_001", SocketValue::Float(3.0))
                },
                ShaderNode::new("Gray", ShaderNodeType::RgbToBw),
                ShaderNode::new("Join", ShaderNodeType::CombineXyz),
                ShaderNode::new("Flip", ShaderNodeType::Invert),
            ],
            vec![
                ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                ShaderLink::new("Mask", "Color", "Split", "Image"),
                ShaderLink::new("Split", "G", "Scale", "Value"),
                ShaderLink::new("Scale", "Value", "Principled BSDF", "Roughness"),
                ShaderLink::new("Mask", "Color", "Gray", "Color"),
                ShaderLink::new("Gray", "Val", "Principled BSDF", "Metallic"),
                ShaderLink::new("Split", "R", "Join", "X"),
                ShaderLink::new("Join", "Vector", "Flip", "Color"),
                ShaderLink::new("Flip", "Color", "Principled BSDF", "Base Color"),
            ],
        );
        let shader = generate(&material).unwrap().unwrap();
        let code = &shader.code;

        for function in [
            "node_separate_rgb",
            "node_math_multiply",
            "node_rgb_to_bw",
            "node_combine_xyz",
            "node_invert",
        ] {
            assert!(code.contains(&format!("void {function}(")), "{function}");
        }
        assert!(code.contains(", 3.0, var"));
        assert!(code.contains("_Value = clamp(var"));
        // One sampler and one lookup for the shared image
        assert_eq!(shader.textures.len(), 1);
        assert_eq!(code.matches("\tnode_tex_image(").count(), 1);
        assert_eq!(code.matches("\tnode_separate_rgb(").count(), 1);
    }

    #[test]
    fn test_implicit_conversions() {
        let material = MaterialData::new("M");
        let tree = ShaderNodeTree::default();
        let mut writer = ShaderWriter::new(&material, &tree);

        let widened = writer.convert(Expr::float(0.5), GlslType::Vec3).unwrap();
        assert_eq!(widened.code, "vec3(0.5)");

        let narrowed = writer.convert(Expr::vec4([1.0, 1.0, 1.0, 1.0]), GlslType::Float).unwrap();
        assert_eq!(narrowed.ty, GlslType::Float);
        assert!(writer.lines.iter().any(|l| l.starts_with("node_rgb_to_bw(")));
    }
}
