//! Scene objects and their per-kind data

use escn_core::Color;
use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::action::AnimationData;
use crate::modifiers::Modifier;
use crate::serde_helpers::{default_one, default_true, identity, mat4_rows};

/// One object in the host scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Unique object name
    pub name: String,

    /// What the object is
    #[serde(flatten)]
    pub kind: ObjectKind,

    /// Parent object name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Bone of the parent armature this object follows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_bone: Option<String>,

    /// World transform in host space
    #[serde(default = "identity", with = "mat4_rows")]
    pub matrix_world: Mat4,

    /// Transform relative to the parent (the animated basis)
    #[serde(default = "identity", with = "mat4_rows")]
    pub matrix_local: Mat4,

    /// Visible in the active view layer
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Part of the current selection
    #[serde(default)]
    pub selected: bool,

    /// Modifier stack, evaluated top to bottom
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,

    /// Actions and NLA state driving this object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationData>,
}

impl Object {
    /// Create an empty object at the origin
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            parent_bone: None,
            matrix_world: Mat4::IDENTITY,
            matrix_local: Mat4::IDENTITY,
            visible: true,
            selected: false,
            modifiers: Vec::new(),
            animation: None,
        }
    }

    /// Coarse type used by the export type filter
    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    /// World transform of the parent, recovered from world and local
    pub fn parent_world(&self) -> Mat4 {
        self.matrix_world * self.matrix_local.inverse()
    }

    /// Name of the armature object this mesh is bound to, if any
    pub fn armature_binding(&self) -> Option<&str> {
        self.modifiers.iter().find_map(|m| match &m.kind {
            crate::modifiers::ModifierKind::Armature { object } if m.show_viewport => {
                Some(object.as_str())
            }
            _ => None,
        })
    }
}

/// Coarse object categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Empty,
    Camera,
    Light,
    Armature,
    /// Meshes and curves
    Geometry,
}

impl ObjectType {
    /// Every category
    pub const ALL: [Self; 5] = [
        Self::Empty,
        Self::Camera,
        Self::Light,
        Self::Armature,
        Self::Geometry,
    ];
}

impl std::str::FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EMPTY" => Ok(Self::Empty),
            "CAMERA" => Ok(Self::Camera),
            "LIGHT" => Ok(Self::Light),
            "ARMATURE" => Ok(Self::Armature),
            "GEOMETRY" | "MESH" => Ok(Self::Geometry),
            _ => Err(format!("Unknown object type: {s}")),
        }
    }
}

/// Closed set of object kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Empty,
    Camera(CameraData),
    Light(LightData),
    Armature {
        /// Armature data block name
        armature: String,
    },
    Mesh {
        /// Mesh data block name
        mesh: String,
        /// Object-linked material slots, overriding the mesh's own slots
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        material_overrides: Vec<Option<String>>,
    },
    Curve {
        /// Curve data block name
        curve: String,
    },
}

impl ObjectKind {
    /// Coarse type used by the export type filter
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Empty => ObjectType::Empty,
            Self::Camera(_) => ObjectType::Camera,
            Self::Light(_) => ObjectType::Light,
            Self::Armature { .. } => ObjectType::Armature,
            Self::Mesh { .. } | Self::Curve { .. } => ObjectType::Geometry,
        }
    }

    /// Short lowercase label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Camera(_) => "camera",
            Self::Light(_) => "light",
            Self::Armature { .. } => "armature",
            Self::Mesh { .. } => "mesh",
            Self::Curve { .. } => "curve",
        }
    }
}

/// Camera projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraData {
    pub projection: Projection,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Orthographic view height
    pub ortho_scale: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            fov: 0.691_150_4,
            ortho_scale: 7.314,
            clip_start: 0.1,
            clip_end: 100.0,
        }
    }
}

/// Light type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightType {
    #[default]
    Point,
    Sun,
    Spot,
    Area,
}

/// Light parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    #[serde(default)]
    pub light_type: LightType,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "default_one")]
    pub energy: f32,
    /// Influence distance
    #[serde(default = "default_distance")]
    pub distance: f32,
    /// Full cone angle in radians
    #[serde(default = "default_spot_size")]
    pub spot_size: f32,
    /// Cone edge softness in 0..1
    #[serde(default = "default_spot_blend")]
    pub spot_blend: f32,
    #[serde(default)]
    pub use_shadow: bool,
    /// Light subtracts instead of adds
    #[serde(default)]
    pub negative: bool,
}

fn default_distance() -> f32 {
    25.0
}

fn default_spot_size() -> f32 {
    std::f32::consts::FRAC_PI_4
}

fn default_spot_blend() -> f32 {
    0.15
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            color: Color::WHITE,
            energy: 1.0,
            distance: default_distance(),
            spot_size: default_spot_size(),
            spot_blend: default_spot_blend(),
            use_shadow: false,
            negative: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_tagging() {
        let json = r#"{"name": "Cube", "type": "mesh", "mesh": "CubeMesh"}"#;
        let object: Object = serde_json::from_str(json).unwrap();

        assert_eq!(object.object_type(), ObjectType::Geometry);
        assert!(object.visible);
        assert_eq!(object.matrix_world, Mat4::IDENTITY);
        match object.kind {
            ObjectKind::Mesh { ref mesh, .. } => assert_eq!(mesh, "CubeMesh"),
            _ => panic!("expected mesh"),
        }
    }

    #[test]
    fn test_object_type_from_str() {
        assert_eq!("geometry".parse::<ObjectType>(), Ok(ObjectType::Geometry));
        assert_eq!("LIGHT".parse::<ObjectType>(), Ok(ObjectType::Light));
        assert!("SPEAKER".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_parent_world() {
        let mut object = Object::new("Child", ObjectKind::Empty);
        object.matrix_local = Mat4::from_translation(glam::Vec3::X);
        object.matrix_world = Mat4::from_translation(glam::Vec3::new(3.0, 0.0, 0.0));

        let parent = object.parent_world();
        assert!(parent.w_axis.truncate().abs_diff_eq(glam::Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }
}
