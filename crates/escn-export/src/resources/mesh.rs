//! Host meshes to `ArrayMesh` surfaces
//!
//! Polygons are split into one surface per material slot and fan
//! triangulated. Engine vertices are unique per (host vertex, normal, UV,
//! colour), so a host vertex on a UV seam or a flat-shaded edge is split.

use std::collections::{BTreeMap, HashMap};

use escn_core::{convert_vector, Color, Error, Result, ValidationError};
use escn_scene::{MeshData, Polygon};
use glam::{Vec2, Vec3};

use super::{MeshResource, Surface};
use crate::external::MaterialRef;
use crate::skeleton::SkeletonBuild;

/// Bone influences kept per vertex
pub const MAX_INFLUENCES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    source: u32,
    normal: [u32; 3],
    uv: Option<[u32; 2]>,
    color: Option<[u32; 4]>,
}

#[derive(Debug, Default)]
struct SurfaceBuilder {
    lookup: HashMap<VertexKey, u32>,
    sources: Vec<u32>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<Color>,
    indices: Vec<u32>,
}

impl SurfaceBuilder {
    fn vertex(&mut self, key: VertexKey, position: Vec3, normal: Vec3, uv: Vec2, color: Color) -> u32 {
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.positions.len() as u32;
        self.lookup.insert(key, index);
        self.sources.push(key.source);
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        self.colors.push(color);
        index
    }
}

/// Builds an `ArrayMesh` from an evaluated host mesh
pub struct MeshBuilder<'a> {
    mesh: &'a MeshData,
    materials: &'a [Option<MaterialRef>],
    skeleton: Option<&'a SkeletonBuild>,
    shape_keys: bool,
}

impl<'a> MeshBuilder<'a> {
    pub fn new(mesh: &'a MeshData) -> Self {
        Self {
            mesh,
            materials: &[],
            skeleton: None,
            shape_keys: false,
        }
    }

    /// Resolved material per slot
    #[must_use]
    pub fn with_materials(mut self, materials: &'a [Option<MaterialRef>]) -> Self {
        self.materials = materials;
        self
    }

    /// Skeleton the mesh is skinned to
    #[must_use]
    pub fn with_skeleton(mut self, skeleton: Option<&'a SkeletonBuild>) -> Self {
        self.skeleton = skeleton;
        self
    }

    /// Emit shape keys as blend shapes
    #[must_use]
    pub fn with_shape_keys(mut self, enabled: bool) -> Self {
        self.shape_keys = enabled;
        self
    }

    /// Build the resource; `object` names the owner in errors
    pub fn build(&self, object: &str) -> Result<MeshResource> {
        let mesh = self.mesh;
        if mesh.vertices.is_empty() {
            return Err(ValidationError::EmptyGeometry {
                object: object.to_string(),
                mesh: mesh.name.clone(),
            }
            .into());
        }

        let has_uvs = mesh.polygons.iter().any(|p| !p.uvs.is_empty());
        let has_colors = mesh.polygons.iter().any(|p| !p.colors.is_empty());

        let mut builders: BTreeMap<u32, SurfaceBuilder> = BTreeMap::new();
        for polygon in &mesh.polygons {
            if polygon.vertices.len() < 3 {
                continue;
            }
            if let Some(&bad) = polygon.vertices.iter().find(|&&v| v as usize >= mesh.vertices.len()) {
                return Err(Error::invalid_scene(format!(
                    "mesh '{}' has a polygon using vertex {bad} of {}",
                    mesh.name,
                    mesh.vertices.len()
                )));
            }

            let builder = builders.entry(polygon.material_index).or_default();
            let corners = self.corners(polygon, builder, has_uvs, has_colors);
            for i in 1..corners.len() - 1 {
                builder
                    .indices
                    .extend([corners[0], corners[i + 1], corners[i]]);
            }
        }

        let blend_shapes = if self.shape_keys { mesh.blend_shapes() } else { &[] };

        let surfaces = builders
            .into_iter()
            .map(|(material_index, builder)| {
                let (bones, weights) = self.skin_arrays(&builder.sources).unzip();
                let morphs = blend_shapes
                    .iter()
                    .map(|key| {
                        builder
                            .sources
                            .iter()
                            .map(|&s| {
                                let host = key
                                    .positions
                                    .get(s as usize)
                                    .copied()
                                    .unwrap_or(mesh.vertices[s as usize].co);
                                convert_vector(host)
                            })
                            .collect()
                    })
                    .collect();

                Surface {
                    material: self
                        .materials
                        .get(material_index as usize)
                        .copied()
                        .flatten(),
                    positions: builder.positions,
                    normals: builder.normals,
                    uvs: has_uvs.then_some(builder.uvs),
                    colors: has_colors.then_some(builder.colors),
                    bones,
                    weights,
                    indices: builder.indices,
                    morphs,
                }
            })
            .collect();

        Ok(MeshResource {
            name: mesh.name.clone(),
            surfaces,
            blend_shape_names: blend_shapes.iter().map(|k| k.name.clone()).collect(),
        })
    }

    fn corners(
        &self,
        polygon: &Polygon,
        builder: &mut SurfaceBuilder,
        has_uvs: bool,
        has_colors: bool,
    ) -> Vec<u32> {
        let flat_normal = self.mesh.polygon_normal(polygon);
        polygon
            .vertices
            .iter()
            .enumerate()
            .map(|(corner, &source)| {
                let vertex = &self.mesh.vertices[source as usize];
                let host_normal = if polygon.smooth && vertex.normal != Vec3::ZERO {
                    vertex.normal.normalize_or_zero()
                } else {
                    flat_normal
                };
                let normal = convert_vector(host_normal);

                // Engine texture space has v pointing down
                let uv = polygon
                    .uvs
                    .get(corner)
                    .map_or(Vec2::ZERO, |uv| Vec2::new(uv.x, 1.0 - uv.y));
                let color = polygon.colors.get(corner).copied().unwrap_or(Color::WHITE);

                let key = VertexKey {
                    source,
                    normal: normal.to_array().map(f32::to_bits),
                    uv: has_uvs.then(|| uv.to_array().map(f32::to_bits)),
                    color: has_colors.then(|| color.to_array().map(f32::to_bits)),
                };
                builder.vertex(key, convert_vector(vertex.co), normal, uv, color)
            })
            .collect()
    }

    fn skin_arrays(&self, sources: &[u32]) -> Option<(Vec<[u32; 4]>, Vec<[f32; 4]>)> {
        let skeleton = self.skeleton.filter(|s| !s.is_empty())?;
        let mut bones = Vec::with_capacity(sources.len());
        let mut weights = Vec::with_capacity(sources.len());
        for &source in sources {
            let vertex = &self.mesh.vertices[source as usize];
            let influences = top_influences(skeleton.skin_weights(&self.mesh.vertex_groups, &vertex.groups));
            let mut b = [0u32; MAX_INFLUENCES];
            let mut w = [0f32; MAX_INFLUENCES];
            for (slot, (bone, weight)) in influences.into_iter().enumerate() {
                b[slot] = bone;
                w[slot] = weight;
            }
            bones.push(b);
            weights.push(w);
        }
        Some((bones, weights))
    }
}

/// Strongest influences, normalized to sum to one.
///
/// Ties keep the lower bone index first. A vertex without influences is
/// bound fully to bone 0.
pub fn top_influences(mut influences: Vec<(u32, f32)>) -> Vec<(u32, f32)> {
    influences.retain(|&(_, w)| w > 0.0);
    influences.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    influences.truncate(MAX_INFLUENCES);

    let total: f32 = influences.iter().map(|&(_, w)| w).sum();
    if total <= 0.0 {
        return vec![(0, 1.0)];
    }
    influences
        .into_iter()
        .map(|(bone, w)| (bone, w / total))
        .collect()
}
