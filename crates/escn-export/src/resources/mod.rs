//! Resource payloads and their escn rendering
//!
//! Each payload knows its engine type and the properties it serializes to.
//! The pool stores them; the serializer turns them into `[sub_resource]`
//! sections.

pub mod curve;
pub mod mesh;

use escn_core::Color;
use glam::{Mat4, Vec2, Vec3};

use crate::escn::{Section, Value};
use crate::external::{ExternalId, MaterialRef};
use crate::pool::{Fingerprinter, ResourceHandle};

pub use curve::build_curve;
pub use mesh::MeshBuilder;

/// Primitive type of every surface (triangles)
pub const PRIMITIVE_TRIANGLES: i64 = 4;

/// A payload that renders as a `[sub_resource]`
pub trait EscnResource {
    /// Engine type name
    fn type_name(&self) -> &'static str;

    /// Resource name
    fn name(&self) -> &str;

    /// Properties after `resource_name`, in output order
    fn properties(&self) -> Vec<(String, Value)>;

    /// Feed the canonical content into a fingerprint
    fn fingerprint(&self, fp: &mut Fingerprinter);

    /// Full section with the given id
    fn to_section(&self, id: u32) -> Section {
        let mut section = Section::sub_resource(self.type_name(), id)
            .prop("resource_name", Value::str(self.name()));
        section.extend(self.properties());
        section
    }
}

// ==================== Mesh ====================

/// One material's share of a mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    pub material: Option<MaterialRef>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Option<Vec<Vec2>>,
    pub colors: Option<Vec<Color>>,
    /// Four bone indices per vertex
    pub bones: Option<Vec<[u32; 4]>>,
    /// Four weights per vertex, summing to one
    pub weights: Option<Vec<[f32; 4]>>,
    /// Triangle list, clockwise front faces
    pub indices: Vec<u32>,
    /// Positions per blend shape, aligned with `positions`
    pub morphs: Vec<Vec<Vec3>>,
}

impl Surface {
    fn arrays(&self) -> Value {
        let uvs = self
            .uvs
            .as_ref()
            .map_or(Value::Null, |uvs| Value::Vector2Array(uvs.clone()));
        let colors = self
            .colors
            .as_ref()
            .map_or(Value::Null, |cs| Value::ColorArray(cs.clone()));
        let bones = self.bones.as_ref().map_or(Value::Null, |bones| {
            Value::IntArray(bones.iter().flatten().map(|&b| b as i32).collect())
        });
        let weights = self.weights.as_ref().map_or(Value::Null, |ws| {
            Value::RealArray(ws.iter().flatten().copied().collect())
        });

        Value::Array(vec![
            Value::Vector3Array(self.positions.clone()),
            Value::Vector3Array(self.normals.clone()),
            Value::Null,
            colors,
            uvs,
            Value::Null,
            bones,
            weights,
            Value::IntArray(self.indices.iter().map(|&i| i as i32).collect()),
        ])
    }

    fn morph_arrays(&self) -> Value {
        Value::Array(
            self.morphs
                .iter()
                .map(|positions| {
                    Value::Array(vec![
                        Value::Vector3Array(positions.clone()),
                        Value::Vector3Array(self.normals.clone()),
                        Value::Null,
                        Value::Null,
                        Value::Null,
                        Value::Null,
                        Value::Null,
                        Value::Null,
                        Value::Null,
                    ])
                })
                .collect(),
        )
    }

    fn to_value(&self) -> Value {
        let mut entries = vec![
            ("primitive".to_string(), Value::Int(PRIMITIVE_TRIANGLES)),
            ("arrays".to_string(), self.arrays()),
            ("morph_arrays".to_string(), self.morph_arrays()),
        ];
        if let Some(material) = self.material {
            entries.push(("material".to_string(), material.to_value()));
        }
        Value::Dict(entries)
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_option(self.material.as_ref(), |fp, m| match m {
            MaterialRef::Internal(h) => {
                fp.write_u32(0);
                fp.write_u32(h.id());
            }
            MaterialRef::External(id) => {
                fp.write_u32(1);
                fp.write_u32(id.id());
            }
        });
        fp.write_vec3s(&self.positions);
        fp.write_vec3s(&self.normals);
        fp.write_option(self.uvs.as_ref(), |fp, uvs| fp.write_vec2s(uvs));
        fp.write_option(self.colors.as_ref(), |fp, cs| {
            fp.write_usize(cs.len());
            for &c in cs {
                fp.write_color(c);
            }
        });
        fp.write_option(self.bones.as_ref(), |fp, bones| {
            let flat: Vec<u32> = bones.iter().flatten().copied().collect();
            fp.write_u32s(&flat);
        });
        fp.write_option(self.weights.as_ref(), |fp, ws| {
            let flat: Vec<f32> = ws.iter().flatten().copied().collect();
            fp.write_f32s(&flat);
        });
        fp.write_u32s(&self.indices);
        fp.write_usize(self.morphs.len());
        for morph in &self.morphs {
            fp.write_vec3s(morph);
        }
    }
}

/// `ArrayMesh` with its blend shapes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshResource {
    pub name: String,
    pub surfaces: Vec<Surface>,
    /// Blend shape names, aligned with every surface's `morphs`
    pub blend_shape_names: Vec<String>,
}

impl MeshResource {
    pub fn vertex_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.positions.len()).sum()
    }
}

impl EscnResource for MeshResource {
    fn type_name(&self) -> &'static str {
        "ArrayMesh"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Vec<(String, Value)> {
        let mut props = Vec::new();
        if !self.blend_shape_names.is_empty() {
            props.push((
                "blend_shape/names".to_string(),
                Value::StringArray(self.blend_shape_names.clone()),
            ));
            // Relative blend shapes are not supported, positions are absolute
            props.push(("blend_shape/mode".to_string(), Value::Int(0)));
        }
        for (i, surface) in self.surfaces.iter().enumerate() {
            props.push((format!("surfaces/{i}"), surface.to_value()));
        }
        props
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_str(&self.name);
        fp.write_usize(self.blend_shape_names.len());
        for name in &self.blend_shape_names {
            fp.write_str(name);
        }
        fp.write_usize(self.surfaces.len());
        for surface in &self.surfaces {
            surface.fingerprint(fp);
        }
    }
}

// ==================== Materials ====================

/// Fixed-function material
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialMaterial {
    pub name: String,
    pub albedo: Color,
    pub metallic: f32,
    pub specular: f32,
    pub roughness: f32,
    /// Emission colour and energy, when the material glows
    pub emission: Option<(Color, f32)>,
    pub transparent: bool,
    pub cull_disabled: bool,
}

/// Texture bound to a shader uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTexture {
    pub uniform: String,
    pub texture: ExternalId,
}

/// Material driven by a generated shader
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMaterial {
    pub name: String,
    pub shader: ResourceHandle,
    pub textures: Vec<ShaderTexture>,
}

/// Material payload
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialResource {
    Spatial(SpatialMaterial),
    Shader(ShaderMaterial),
}

impl EscnResource for MaterialResource {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Spatial(_) => "SpatialMaterial",
            Self::Shader(_) => "ShaderMaterial",
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Spatial(m) => &m.name,
            Self::Shader(m) => &m.name,
        }
    }

    fn properties(&self) -> Vec<(String, Value)> {
        let mut props: Vec<(String, Value)> = Vec::new();
        match self {
            Self::Spatial(m) => {
                if m.transparent {
                    props.push(("flags_transparent".into(), Value::Bool(true)));
                }
                if m.cull_disabled {
                    // CULL_DISABLED
                    props.push(("params_cull_mode".into(), Value::Int(2)));
                }
                props.push(("albedo_color".into(), Value::Color(m.albedo)));
                props.push(("metallic".into(), Value::Float(m.metallic)));
                props.push(("metallic_specular".into(), Value::Float(m.specular)));
                props.push(("roughness".into(), Value::Float(m.roughness)));
                if let Some((color, energy)) = m.emission {
                    props.push(("emission_enabled".into(), Value::Bool(true)));
                    props.push(("emission".into(), Value::Color(color)));
                    props.push(("emission_energy".into(), Value::Float(energy)));
                }
            }
            Self::Shader(m) => {
                props.push(("shader".into(), Value::SubResource(m.shader.id())));
                for texture in &m.textures {
                    props.push((
                        format!("shader_param/{}", texture.uniform),
                        Value::ExtResource(texture.texture.id()),
                    ));
                }
            }
        }
        props
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        match self {
            Self::Spatial(m) => {
                fp.write_u32(0);
                fp.write_str(&m.name);
                fp.write_color(m.albedo);
                fp.write_f32(m.metallic);
                fp.write_f32(m.specular);
                fp.write_f32(m.roughness);
                fp.write_option(m.emission.as_ref(), |fp, (color, energy)| {
                    fp.write_color(*color);
                    fp.write_f32(*energy);
                });
                fp.write_bool(m.transparent);
                fp.write_bool(m.cull_disabled);
            }
            Self::Shader(m) => {
                fp.write_u32(1);
                fp.write_str(&m.name);
                fp.write_u32(m.shader.id());
                fp.write_usize(m.textures.len());
                for texture in &m.textures {
                    fp.write_str(&texture.uniform);
                    fp.write_u32(texture.texture.id());
                }
            }
        }
    }
}

/// Generated shader source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub name: String,
    pub code: String,
}

impl EscnResource for ShaderResource {
    fn type_name(&self) -> &'static str {
        "Shader"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Vec<(String, Value)> {
        vec![("code".to_string(), Value::str(self.code.as_str()))]
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_str(&self.name);
        fp.write_str(&self.code);
    }
}

// ==================== Skeleton ====================

/// Binding of one skin slot to a skeleton bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinBind {
    /// Index into the skeleton's bone list
    pub bone: u32,
    /// Inverse rest pose in skeleton space
    pub pose: Mat4,
}

/// Skin binding a mesh to a skeleton
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinResource {
    pub name: String,
    pub binds: Vec<SkinBind>,
}

impl EscnResource for SkinResource {
    fn type_name(&self) -> &'static str {
        "Skin"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Vec<(String, Value)> {
        let mut props = vec![("bind_count".to_string(), Value::from(self.binds.len() as u32))];
        for (i, bind) in self.binds.iter().enumerate() {
            props.push((format!("bind/{i}/bone"), Value::from(bind.bone)));
            props.push((format!("bind/{i}/pose"), Value::Transform(bind.pose)));
        }
        props
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_str(&self.name);
        fp.write_usize(self.binds.len());
        for bind in &self.binds {
            fp.write_u32(bind.bone);
            fp.write_mat4(&bind.pose);
        }
    }
}

// ==================== Curve ====================

/// Control point of a 3D path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub position: Vec3,
    /// Incoming handle relative to `position`
    pub in_offset: Vec3,
    /// Outgoing handle relative to `position`
    pub out_offset: Vec3,
    pub tilt: f32,
}

/// `Curve3D` payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveResource {
    pub name: String,
    pub points: Vec<CurvePoint>,
}

impl EscnResource for CurveResource {
    fn type_name(&self) -> &'static str {
        "Curve3D"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Vec<(String, Value)> {
        let points: Vec<Vec3> = self
            .points
            .iter()
            .flat_map(|p| [p.in_offset, p.out_offset, p.position])
            .collect();
        let tilts: Vec<f32> = self.points.iter().map(|p| p.tilt).collect();
        vec![(
            "_data".to_string(),
            Value::Dict(vec![
                ("points".to_string(), Value::Vector3Array(points)),
                ("tilts".to_string(), Value::RealArray(tilts)),
            ]),
        )]
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_str(&self.name);
        fp.write_usize(self.points.len());
        for point in &self.points {
            fp.write_vec3s(&[point.position, point.in_offset, point.out_offset]);
            fp.write_f32(point.tilt);
        }
    }
}
