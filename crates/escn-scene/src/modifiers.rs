//! Modifier stacks
//!
//! [`apply_modifiers`] evaluates a stack into a new [`MeshData`]. The source
//! mesh is never touched, so one data block can be evaluated differently for
//! every object that uses it. Shape keys follow the same vertex mapping as the
//! base positions.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mesh::{MeshData, Polygon, Vertex};
use crate::serde_helpers::default_true;

/// Entry in an object's modifier stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    /// Disabled modifiers are skipped
    #[serde(default = "default_true")]
    pub show_viewport: bool,
    #[serde(flatten)]
    pub kind: ModifierKind,
}

impl Modifier {
    /// Enabled modifier
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            show_viewport: true,
            kind,
        }
    }
}

/// Supported modifier types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierKind {
    /// Duplicate the mesh reflected across the plane normal to `axis`
    Mirror { axis: Axis },
    /// Repeat the mesh `count` times, each copy shifted by `offset`
    Array { count: u32, offset: Vec3 },
    /// Split every polygon into triangles
    Triangulate,
    /// Keep only vertices in a vertex group
    Mask {
        vertex_group: String,
        #[serde(default)]
        invert: bool,
    },
    /// Skin to an armature object; never baked into the geometry
    Armature { object: String },
}

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Evaluate a modifier stack top to bottom.
///
/// Disabled entries and armature bindings are skipped.
pub fn apply_modifiers(mesh: &MeshData, modifiers: &[Modifier]) -> MeshData {
    let mut result = mesh.clone();
    for modifier in modifiers.iter().filter(|m| m.show_viewport) {
        debug!("Applying modifier '{}' to mesh '{}'", modifier.name, mesh.name);
        result = match &modifier.kind {
            ModifierKind::Mirror { axis } => mirror(&result, *axis),
            ModifierKind::Array { count, offset } => array(&result, *count, *offset),
            ModifierKind::Triangulate => triangulate(&result),
            ModifierKind::Mask {
                vertex_group,
                invert,
            } => mask(&result, vertex_group, *invert),
            ModifierKind::Armature { .. } => continue,
        };
    }
    result
}

fn mirror(mesh: &MeshData, axis: Axis) -> MeshData {
    let a = axis.index();
    let reflect = |mut v: Vec3| {
        v[a] = -v[a];
        v
    };

    let mut out = mesh.clone();
    let offset = vertex_offset(mesh);
    out.vertices.extend(mesh.vertices.iter().map(|v| Vertex {
        co: reflect(v.co),
        normal: reflect(v.normal),
        groups: v.groups.clone(),
    }));

    // Reflection flips orientation, so the loops run backwards
    out.polygons.extend(mesh.polygons.iter().map(|p| Polygon {
        vertices: p.vertices.iter().rev().map(|i| i + offset).collect(),
        material_index: p.material_index,
        smooth: p.smooth,
        uvs: p.uvs.iter().rev().copied().collect(),
        colors: p.colors.iter().rev().copied().collect(),
    }));

    for key in &mut out.shape_keys {
        let mirrored: Vec<Vec3> = key.positions.iter().map(|p| reflect(*p)).collect();
        key.positions.extend(mirrored);
    }
    out
}

fn array(mesh: &MeshData, count: u32, offset: Vec3) -> MeshData {
    let count = count.max(1);
    let stride = vertex_offset(mesh);
    let mut out = MeshData {
        vertices: Vec::with_capacity(mesh.vertices.len() * count as usize),
        polygons: Vec::with_capacity(mesh.polygons.len() * count as usize),
        ..mesh.clone()
    };
    for key in &mut out.shape_keys {
        key.positions.clear();
    }

    for copy in 0..count {
        let shift = offset * copy as f32;
        let base = stride * copy;
        out.vertices.extend(mesh.vertices.iter().map(|v| Vertex {
            co: v.co + shift,
            ..v.clone()
        }));
        out.polygons.extend(mesh.polygons.iter().map(|p| Polygon {
            vertices: p.vertices.iter().map(|i| i + base).collect(),
            ..p.clone()
        }));
        for (dst, src) in out.shape_keys.iter_mut().zip(&mesh.shape_keys) {
            dst.positions.extend(src.positions.iter().map(|p| *p + shift));
        }
    }
    out
}

fn triangulate(mesh: &MeshData) -> MeshData {
    let mut out = mesh.clone();
    out.polygons = mesh
        .polygons
        .iter()
        .flat_map(|p| {
            let corners = p.vertices.len();
            (1..corners.saturating_sub(1)).map(move |i| {
                let pick = [0, i, i + 1];
                Polygon {
                    vertices: pick.iter().map(|&c| p.vertices[c]).collect(),
                    material_index: p.material_index,
                    smooth: p.smooth,
                    uvs: pick.iter().filter_map(|&c| p.uvs.get(c).copied()).collect(),
                    colors: pick.iter().filter_map(|&c| p.colors.get(c).copied()).collect(),
                }
            })
        })
        .collect();
    out
}

fn mask(mesh: &MeshData, vertex_group: &str, invert: bool) -> MeshData {
    let Some(group) = mesh.vertex_group_index(vertex_group) else {
        warn!(
            "Mask modifier on mesh '{}' names unknown vertex group '{}', ignoring",
            mesh.name, vertex_group
        );
        return mesh.clone();
    };

    let keep: Vec<bool> = mesh
        .vertices
        .iter()
        .map(|v| (v.weight(group) > 0.0) != invert)
        .collect();

    let mut remap = vec![None; mesh.vertices.len()];
    let mut next = 0u32;
    for (slot, kept) in remap.iter_mut().zip(&keep) {
        if *kept {
            *slot = Some(next);
            next += 1;
        }
    }

    let mut out = mesh.clone();
    out.vertices = mesh
        .vertices
        .iter()
        .zip(&keep)
        .filter(|(_, kept)| **kept)
        .map(|(v, _)| v.clone())
        .collect();
    out.polygons = mesh
        .polygons
        .iter()
        .filter_map(|p| {
            let vertices: Option<Vec<u32>> = p
                .vertices
                .iter()
                .map(|&i| remap.get(i as usize).copied().flatten())
                .collect();
            vertices.map(|vertices| Polygon {
                vertices,
                ..p.clone()
            })
        })
        .collect();
    for key in &mut out.shape_keys {
        key.positions = key
            .positions
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(p, _)| *p)
            .collect();
    }
    out
}

fn vertex_offset(mesh: &MeshData) -> u32 {
    u32::try_from(mesh.vertices.len()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{GroupWeight, ShapeKey};
    use smallvec::smallvec;

    fn make_triangle() -> MeshData {
        MeshData {
            name: "Tri".into(),
            vertices: vec![
                Vertex::at(Vec3::new(1.0, 0.0, 0.0)),
                Vertex::at(Vec3::new(2.0, 0.0, 0.0)),
                Vertex::at(Vec3::new(1.0, 1.0, 0.0)),
            ],
            polygons: vec![Polygon::new(vec![0, 1, 2])],
            ..MeshData::default()
        }
    }

    #[test]
    fn test_mirror_doubles_and_flips_winding() {
        let mesh = apply_modifiers(
            &make_triangle(),
            &[Modifier::new("Mirror", ModifierKind::Mirror { axis: Axis::X })],
        );

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.vertices[3].co, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(mesh.polygons[1].vertices, vec![5, 4, 3]);
    }

    #[test]
    fn test_array_offsets_copies_and_shape_keys() {
        let mut source = make_triangle();
        source.shape_keys = vec![ShapeKey {
            name: "Basis".into(),
            positions: source.vertices.iter().map(|v| v.co).collect(),
            ..ShapeKey::default()
        }];

        let mesh = apply_modifiers(
            &source,
            &[Modifier::new(
                "Array",
                ModifierKind::Array { count: 3, offset: Vec3::new(0.0, 0.0, 2.0) },
            )],
        );

        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.polygons.len(), 3);
        assert_eq!(mesh.polygons[2].vertices, vec![6, 7, 8]);
        assert_eq!(mesh.vertices[8].co.z, 4.0);
        assert_eq!(mesh.shape_keys[0].positions.len(), 9);
        assert_eq!(mesh.shape_keys[0].positions[8].z, 4.0);
    }

    #[test]
    fn test_triangulate_quad() {
        let mut quad = make_triangle();
        quad.vertices.push(Vertex::at(Vec3::new(2.0, 1.0, 0.0)));
        quad.polygons = vec![Polygon::new(vec![0, 1, 3, 2])];

        let mesh = apply_modifiers(&quad, &[Modifier::new("Tri", ModifierKind::Triangulate)]);
        assert_eq!(mesh.polygons.len(), 2);
        assert_eq!(mesh.polygons[0].vertices, vec![0, 1, 3]);
        assert_eq!(mesh.polygons[1].vertices, vec![0, 3, 2]);
    }

    #[test]
    fn test_mask_can_empty_mesh() {
        let mut mesh = make_triangle();
        mesh.vertex_groups = vec!["Keep".into()];

        let masked = apply_modifiers(
            &mesh,
            &[Modifier::new(
                "Mask",
                ModifierKind::Mask { vertex_group: "Keep".into(), invert: false },
            )],
        );
        assert_eq!(masked.vertex_count(), 0);
        assert!(masked.polygons.is_empty());
    }

    #[test]
    fn test_mask_keeps_members() {
        let mut mesh = make_triangle();
        mesh.vertex_groups = vec!["Keep".into()];
        mesh.vertices[1].groups = smallvec![GroupWeight { group: 0, weight: 1.0 }];

        let masked = apply_modifiers(
            &mesh,
            &[Modifier::new(
                "Mask",
                ModifierKind::Mask { vertex_group: "Keep".into(), invert: true },
            )],
        );
        assert_eq!(masked.vertex_count(), 2);
        assert!(masked.polygons.is_empty());
    }

    #[test]
    fn test_disabled_and_armature_modifiers_are_skipped() {
        let mut mirror = Modifier::new("Mirror", ModifierKind::Mirror { axis: Axis::Y });
        mirror.show_viewport = false;
        let skin = Modifier::new("Armature", ModifierKind::Armature { object: "Rig".into() });

        let mesh = apply_modifiers(&make_triangle(), &[mirror, skin]);
        assert_eq!(mesh, make_triangle());
    }
}
