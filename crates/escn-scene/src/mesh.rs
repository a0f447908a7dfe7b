//! Mesh data blocks

use escn_core::Color;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::action::AnimationData;
use crate::serde_helpers::default_true;

/// Mesh data block shared by one or more objects
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    /// Data block name
    pub name: String,

    /// Vertex positions, normals and group weights
    #[serde(default)]
    pub vertices: Vec<Vertex>,

    /// Polygons (any vertex count >= 3)
    #[serde(default)]
    pub polygons: Vec<Polygon>,

    /// Vertex group names, indexed by [`GroupWeight::group`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertex_groups: Vec<String>,

    /// Material slots, indexed by [`Polygon::material_index`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Option<String>>,

    /// Shape keys; the first one is the basis
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shape_keys: Vec<ShapeKey>,

    /// Animation of the shape key values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_key_animation: Option<AnimationData>,
}

impl MeshData {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.vertices.len().saturating_sub(2))
            .sum()
    }

    /// Shape keys other than the basis
    pub fn blend_shapes(&self) -> &[ShapeKey] {
        self.shape_keys.get(1..).unwrap_or(&[])
    }

    /// Look up a vertex group index by name
    pub fn vertex_group_index(&self, name: &str) -> Option<u32> {
        self.vertex_groups
            .iter()
            .position(|g| g == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Flat normal of a polygon (Newell's method)
    pub fn polygon_normal(&self, polygon: &Polygon) -> Vec3 {
        let mut normal = Vec3::ZERO;
        let count = polygon.vertices.len();
        for i in 0..count {
            let current = self.position(polygon.vertices[i]);
            let next = self.position(polygon.vertices[(i + 1) % count]);
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal.normalize_or_zero()
    }

    fn position(&self, index: u32) -> Vec3 {
        self.vertices
            .get(index as usize)
            .map_or(Vec3::ZERO, |v| v.co)
    }
}

/// Mesh vertex
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    /// Position
    pub co: Vec3,

    /// Smooth shading normal
    #[serde(default)]
    pub normal: Vec3,

    /// Vertex group membership
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub groups: SmallVec<[GroupWeight; 4]>,
}

impl Vertex {
    /// Vertex at a position with no normal or groups
    pub fn at(co: Vec3) -> Self {
        Self {
            co,
            ..Self::default()
        }
    }

    /// Weight in a group, zero when not a member
    pub fn weight(&self, group: u32) -> f32 {
        self.groups
            .iter()
            .filter(|g| g.group == group)
            .map(|g| g.weight)
            .sum()
    }
}

/// Membership of a vertex in a vertex group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupWeight {
    pub group: u32,
    pub weight: f32,
}

/// Polygon referencing vertices by index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertex loop, counter-clockwise seen from the front
    pub vertices: Vec<u32>,

    /// Material slot
    #[serde(default)]
    pub material_index: u32,

    /// Use vertex normals instead of the flat polygon normal
    #[serde(default = "default_true")]
    pub smooth: bool,

    /// Per-corner texture coordinates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uvs: Vec<Vec2>,

    /// Per-corner vertex colors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<Color>,
}

impl Polygon {
    /// Smooth polygon with no corner attributes
    pub fn new(vertices: Vec<u32>) -> Self {
        Self {
            vertices,
            smooth: true,
            ..Self::default()
        }
    }
}

/// Shape key (blend shape)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeKey {
    pub name: String,

    /// Vertex positions, one per mesh vertex
    pub positions: Vec<Vec3>,

    /// Current influence
    #[serde(default)]
    pub value: f32,

    /// Muted keys do not contribute
    #[serde(default)]
    pub mute: bool,
}
