//! Exported node tree
//!
//! [`SceneNode`] is what the walker builds and the serializer renders. Each
//! node owns its children; node paths are the escn `parent` attribute form
//! (`"."` for the root, `"A/B"` below it).

use escn_core::{convert_frame, convert_matrix};
use escn_scene::{CameraData, LightData, LightType, Projection};
use glam::Mat4;

use crate::escn::{Section, Value};
use crate::paths::child_path;
use crate::pool::ResourceHandle;
use crate::skeleton::Bone;

/// Host-to-engine mapping of one object's local transform.
///
/// The host parent world is the object's real parent in the host scene. The
/// engine parent world belongs to the node the object ends up under, which
/// differs when intermediate objects were filtered out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformBasis {
    pub host_parent_world: Mat4,
    pub engine_parent_world: Mat4,
    /// Cameras and lights keep their own axes
    pub keep_frame: bool,
}

impl TransformBasis {
    /// Basis of a root-level object
    pub const ROOT: Self = Self {
        host_parent_world: Mat4::IDENTITY,
        engine_parent_world: Mat4::IDENTITY,
        keep_frame: false,
    };

    /// Engine world transform for a host local transform
    pub fn engine_world(&self, host_local: Mat4) -> Mat4 {
        let host_world = self.host_parent_world * host_local;
        if self.keep_frame {
            convert_frame(host_world)
        } else {
            convert_matrix(host_world)
        }
    }

    /// Engine local transform for a host local transform
    pub fn engine_local(&self, host_local: Mat4) -> Mat4 {
        self.engine_parent_world.inverse() * self.engine_world(host_local)
    }
}

/// What a node is, with its type-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Spatial,
    MeshInstance {
        mesh: ResourceHandle,
        /// Path from this node to its skeleton
        skeleton: Option<String>,
        skin: Option<ResourceHandle>,
    },
    Camera(CameraData),
    Light(LightData),
    Skeleton(Vec<Bone>),
    BoneAttachment(String),
    Path(ResourceHandle),
    AnimationPlayer(Vec<(String, ResourceHandle)>),
}

impl NodeKind {
    /// Engine node type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Spatial => "Spatial",
            Self::MeshInstance { .. } => "MeshInstance",
            Self::Camera(_) => "Camera",
            Self::Light(light) => match light.light_type {
                LightType::Sun => "DirectionalLight",
                LightType::Spot => "SpotLight",
                LightType::Point | LightType::Area => "OmniLight",
            },
            Self::Skeleton(_) => "Skeleton",
            Self::BoneAttachment(_) => "BoneAttachment",
            Self::Path(_) => "Path",
            Self::AnimationPlayer(_) => "AnimationPlayer",
        }
    }

    /// Whether the node has a transform of its own
    fn has_transform(&self) -> bool {
        !matches!(self, Self::BoneAttachment(_) | Self::AnimationPlayer(_))
    }

    fn properties(&self, section: &mut Section) {
        match self {
            Self::Spatial => {}
            Self::MeshInstance { mesh, skeleton, skin } => {
                section.push("mesh", Value::SubResource(mesh.id()));
                if let Some(skeleton) = skeleton {
                    section.push("skeleton", Value::node_path(skeleton.as_str()));
                }
                if let Some(skin) = skin {
                    section.push("skin", Value::SubResource(skin.id()));
                }
            }
            Self::Camera(camera) => camera_properties(camera, section),
            Self::Light(light) => light_properties(light, section),
            Self::Skeleton(bones) => {
                for (i, bone) in bones.iter().enumerate() {
                    section.push(format!("bones/{i}/name"), Value::str(bone.name.as_str()));
                    section.push(format!("bones/{i}/parent"), Value::Int(i64::from(bone.parent)));
                    section.push(format!("bones/{i}/rest"), Value::Transform(bone.rest));
                    section.push(format!("bones/{i}/pose"), Value::Transform(Mat4::IDENTITY));
                    section.push(format!("bones/{i}/enabled"), Value::Bool(true));
                    section.push(format!("bones/{i}/bound_children"), Value::Array(Vec::new()));
                }
            }
            Self::BoneAttachment(bone) => section.push("bone_name", Value::str(bone.as_str())),
            Self::Path(curve) => section.push("curve", Value::SubResource(curve.id())),
            Self::AnimationPlayer(clips) => {
                section.push("root_node", Value::node_path(".."));
                for (name, handle) in clips {
                    section.push(format!("anims/{name}"), Value::SubResource(handle.id()));
                }
            }
        }
    }
}

fn camera_properties(camera: &CameraData, section: &mut Section) {
    match camera.projection {
        Projection::Perspective => {
            section.push("projection", Value::Int(0));
            section.push("fov", Value::Float(camera.fov.to_degrees()));
        }
        Projection::Orthographic => {
            section.push("projection", Value::Int(1));
            section.push("size", Value::Float(camera.ortho_scale));
        }
    }
    section.push("near", Value::Float(camera.clip_start));
    section.push("far", Value::Float(camera.clip_end));
}

fn light_properties(light: &LightData, section: &mut Section) {
    section.push("light_color", Value::Color(light.color));
    section.push("light_energy", Value::Float(light.energy));
    section.push("light_negative", Value::Bool(light.negative));
    section.push("shadow_enabled", Value::Bool(light.use_shadow));
    match light.light_type {
        LightType::Point | LightType::Area => {
            section.push("omni_range", Value::Float(light.distance));
        }
        LightType::Spot => {
            section.push("spot_range", Value::Float(light.distance));
            section.push("spot_angle", Value::Float((light.spot_size / 2.0).to_degrees()));
        }
        LightType::Sun => {}
    }
}

/// One node of the exported tree
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Root-relative path
    pub path: String,
    pub kind: NodeKind,
    /// Local transform, engine space
    pub transform: Mat4,
    pub visible: bool,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Synthetic root named after the scene
    pub fn root(name: &str) -> Self {
        Self {
            name: crate::paths::sanitize_node_name(name),
            path: ".".to_string(),
            kind: NodeKind::Spatial,
            transform: Mat4::IDENTITY,
            visible: true,
            children: Vec::new(),
        }
    }

    /// Sibling-unique child name: `Name`, then `Name_1`, `Name_2`, ...
    pub fn unique_child_name(&self, base: &str) -> String {
        let taken = |name: &str| self.children.iter().any(|c| c.name == name);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|name| !taken(name))
            .unwrap_or_else(|| base.to_string())
    }

    /// Append a child and return it
    pub fn add_child(&mut self, name: &str, kind: NodeKind, transform: Mat4) -> &mut SceneNode {
        let name = self.unique_child_name(&crate::paths::sanitize_node_name(name));
        let path = child_path(&self.path, &name);
        self.children.push(SceneNode {
            name,
            path,
            kind,
            transform,
            visible: true,
            children: Vec::new(),
        });
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Node at a root-relative path below (or at) this node
    pub fn find_mut(&mut self, path: &str) -> Option<&mut SceneNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find(|c| c.path == path || crate::paths::descendant_path(&c.path, path).is_some())
            .and_then(|c| c.find_mut(path))
    }

    /// Node at a root-relative path below (or at) this node
    pub fn find(&self, path: &str) -> Option<&SceneNode> {
        self.iter().find(|n| n.path == path)
    }

    /// Number of nodes in this subtree, this one included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::count).sum::<usize>()
    }

    /// Nodes in pre-order
    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Section of this node alone
    pub fn to_section(&self, parent: Option<&str>) -> Section {
        let mut section = Section::node(&self.name, self.kind.type_name(), parent);
        if parent.is_some() && self.kind.has_transform() {
            section.push("transform", Value::Transform(self.transform));
        }
        self.kind.properties(&mut section);
        if !self.visible {
            section.push("visible", Value::Bool(false));
        }
        section
    }

    /// Sections of the subtree in traversal order
    pub fn sections(&self) -> Vec<Section> {
        let mut out = Vec::with_capacity(self.count());
        self.collect_sections(None, &mut out);
        out
    }

    fn collect_sections(&self, parent: Option<&str>, out: &mut Vec<Section>) {
        out.push(self.to_section(parent));
        for child in &self.children {
            child.collect_sections(Some(&self.path), out);
        }
    }
}
