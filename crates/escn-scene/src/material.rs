//! Materials, shader node trees and images

use std::collections::BTreeMap;
use std::path::PathBuf;

use escn_core::Color;
use serde::{Deserialize, Serialize};

/// Material data block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialData {
    pub name: String,
    pub diffuse_color: Color,
    pub metallic: f32,
    pub roughness: f32,
    pub specular: f32,
    pub emission: Color,
    pub emission_strength: f32,
    pub blend_method: BlendMethod,
    pub use_backface_culling: bool,
    /// Node-based surface description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_tree: Option<ShaderNodeTree>,
}

impl MaterialData {
    /// Material with default surface values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Color::rgb(0.8, 0.8, 0.8),
            metallic: 0.0,
            roughness: 0.5,
            specular: 0.5,
            emission: Color::BLACK,
            emission_strength: 1.0,
            blend_method: BlendMethod::Opaque,
            use_backface_culling: false,
            node_tree: None,
        }
    }
}

/// Transparency handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Hashed,
    Blend,
}

impl BlendMethod {
    /// Whether the material needs alpha blending or scissoring
    pub fn is_transparent(self) -> bool {
        !matches!(self, Self::Opaque)
    }
}

/// Shader node graph of a material
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShaderNodeTree {
    #[serde(default)]
    pub nodes: Vec<ShaderNode>,
    #[serde(default)]
    pub links: Vec<ShaderLink>,
}

impl ShaderNodeTree {
    /// Find a node by name
    pub fn node(&self, name: &str) -> Option<&ShaderNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// The link feeding an input socket, if connected
    pub fn link_to(&self, node: &str, socket: &str) -> Option<&ShaderLink> {
        self.links
            .iter()
            .find(|l| l.to_node == node && l.to_socket == socket)
    }

    /// The active material output node
    pub fn output_node(&self) -> Option<&ShaderNode> {
        self.nodes
            .iter()
            .find(|n| n.node_type == ShaderNodeType::OutputMaterial)
    }
}

/// Node in a shader graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderNode {
    pub name: String,

    #[serde(rename = "type")]
    pub node_type: ShaderNodeType,

    /// Values of unconnected input sockets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, SocketValue>,

    /// Values of output sockets on constant nodes (RGB, Value)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, SocketValue>,

    /// Image used by texture nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Blend operation of color mix nodes
    #[serde(default)]
    pub blend_type: MixBlend,

    /// Operation of math nodes
    #[serde(default)]
    pub operation: MathOperation,

    /// Clamp the result of math nodes to `[0, 1]`
    #[serde(default)]
    pub use_clamp: bool,

    /// What a mapping node transforms
    #[serde(default)]
    pub vector_type: MappingType,

    /// Flip the direction of bump nodes
    #[serde(default)]
    pub invert: bool,
}

impl ShaderNode {
    /// Node with every input at its default
    pub fn new(name: impl Into<String>, node_type: ShaderNodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            image: None,
            blend_type: MixBlend::Mix,
            operation: MathOperation::Add,
            use_clamp: false,
            vector_type: MappingType::Point,
            invert: false,
        }
    }

    /// Set an input socket value
    #[must_use]
    pub fn with_input(mut self, socket: impl Into<String>, value: SocketValue) -> Self {
        self.inputs.insert(socket.into(), value);
        self
    }
}

/// Supported shader node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderNodeType {
    OutputMaterial,
    BsdfPrincipled,
    BsdfDiffuse,
    Emission,
    MixShader,
    AddShader,
    Rgb,
    Value,
    TexImage,
    TexCoord,
    UvMap,
    NormalMap,
    Reroute,
    MixRgb,
    BsdfGlossy,
    BsdfGlass,
    BsdfTransparent,
    BsdfTranslucent,
    Mapping,
    Bump,
    Tangent,
    Math,
    SeparateRgb,
    CombineRgb,
    SeparateXyz,
    CombineXyz,
    RgbToBw,
    Invert,
}

/// Color mix operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixBlend {
    #[default]
    Mix,
    Add,
    Multiply,
    Subtract,
}

/// Operation of a math node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Minimum,
    Maximum,
    Absolute,
}

/// Interpretation of a mapping node's vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    /// Scale, rotate, then translate
    #[default]
    Point,
    /// Inverse of `Point`, moving the texture rather than the coordinates
    Texture,
    /// Like `Point` without translation
    Vector,
    /// Inverse-transpose transform, normalized
    Normal,
}

/// Default value of an unconnected socket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocketValue {
    Float(f32),
    Color([f32; 4]),
    Vector([f32; 3]),
}

/// Connection between an output socket and an input socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderLink {
    pub from_node: String,
    pub from_socket: String,
    pub to_node: String,
    pub to_socket: String,
}

impl ShaderLink {
    /// Link `from.socket -> to.socket`
    pub fn new(
        from_node: impl Into<String>,
        from_socket: impl Into<String>,
        to_node: impl Into<String>,
        to_socket: impl Into<String>,
    ) -> Self {
        Self {
            from_node: from_node.into(),
            from_socket: from_socket.into(),
            to_node: to_node.into(),
            to_socket: to_socket.into(),
        }
    }
}

/// Image data block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub name: String,
    /// Source file; relative paths resolve against the scene file
    pub filepath: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_value_shapes() {
        let values: Vec<SocketValue> = serde_json::from_str("[0.5, [1, 0, 0, 1], [0, 0, 1]]").unwrap();
        assert_eq!(values[0], SocketValue::Float(0.5));
        assert_eq!(values[1], SocketValue::Color([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(values[2], SocketValue::Vector([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_node_settings_default_when_absent() {
        let node: ShaderNode = serde_json::from_str(
            r#"{"name": "Scale UV", "type": "mapping", "vector_type": "texture"}"#,
        )
        .unwrap();
        assert_eq!(node.node_type, ShaderNodeType::Mapping);
        assert_eq!(node.vector_type, MappingType::Texture);
        assert_eq!(node.operation, MathOperation::Add);
        assert!(!node.invert);

        let math: ShaderNode =
            serde_json::from_str(r#"{"name": "M", "type": "math", "operation": "power", "use_clamp": true}"#)
                .unwrap();
        assert_eq!(math.operation, MathOperation::Power);
        assert!(math.use_clamp);
    }

    #[test]
    fn test_link_lookup() {
        let tree = ShaderNodeTree {
            nodes: vec![
                ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
            ],
            links: vec![ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface")],
        };

        assert_eq!(tree.output_node().map(|n| n.name.as_str()), Some("Material Output"));
        let link = tree.link_to("Material Output", "Surface").unwrap();
        assert_eq!(link.from_node, "Principled BSDF");
        assert!(tree.link_to("Material Output", "Volume").is_none());
    }
}
