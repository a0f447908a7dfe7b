//! Resource interning
//!
//! Every mesh, material, shader, skin, curve and animation clip the export
//! produces is interned here. Two resources with the same kind and the same
//! content share one handle, so shared data is written once no matter how
//! many nodes use it.
//!
//! Identity is a CRC32 over a canonical encoding of the payload (name
//! included). Payloads that collide on the checksum are told apart by full
//! comparison, so a collision can never merge different resources.

use std::collections::HashMap;
use std::fmt;

use escn_core::{Color, Error, Result};
use glam::{Mat4, Vec2, Vec3};
use tracing::{debug, trace};

use crate::animation::AnimationClip;
use crate::resources::{
    CurveResource, EscnResource, MaterialResource, MeshResource, ShaderResource, SkinResource,
};

/// Stable reference to an interned resource; doubles as its `sub_resource` id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u32);

impl ResourceHandle {
    /// Id written in the scene file
    pub fn id(self) -> u32 {
        self.0
    }

    /// Handle with a given id, for documents with their own id space
    pub(crate) fn from_id(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resource category; part of the identity key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Mesh,
    Material,
    Shader,
    Skin,
    Curve,
    Animation,
}

/// Exportable resource payload
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Mesh(MeshResource),
    Material(MaterialResource),
    Shader(ShaderResource),
    Skin(SkinResource),
    Curve(CurveResource),
    Animation(AnimationClip),
}

impl Resource {
    /// Category of the payload
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Mesh(_) => ResourceKind::Mesh,
            Self::Material(_) => ResourceKind::Material,
            Self::Shader(_) => ResourceKind::Shader,
            Self::Skin(_) => ResourceKind::Skin,
            Self::Curve(_) => ResourceKind::Curve,
            Self::Animation(_) => ResourceKind::Animation,
        }
    }

    /// Payload as a renderable resource
    pub fn as_escn(&self) -> &dyn EscnResource {
        match self {
            Self::Mesh(r) => r,
            Self::Material(r) => r,
            Self::Shader(r) => r,
            Self::Skin(r) => r,
            Self::Curve(r) => r,
            Self::Animation(r) => r,
        }
    }

    /// Content checksum
    pub fn fingerprint(&self) -> u32 {
        let mut fp = Fingerprinter::new();
        self.as_escn().fingerprint(&mut fp);
        fp.finish()
    }
}

/// Bit pattern of `-0.0_f32`
const NEGATIVE_ZERO_BITS: u32 = 0x8000_0000;

/// Canonical byte encoder feeding a CRC32
pub struct Fingerprinter {
    hasher: crc32fast::Hasher,
}

impl Fingerprinter {
    /// Start a new fingerprint
    pub fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Length-prefixed string
    pub fn write_str(&mut self, s: &str) {
        self.write_usize(s.len());
        self.hasher.update(s.as_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.hasher.update(&v.to_le_bytes());
    }

    pub fn write_usize(&mut self, v: usize) {
        self.hasher.update(&(v as u64).to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.hasher.update(&[u8::from(v)]);
    }

    /// Float with `-0` folded into `0`
    pub fn write_f32(&mut self, v: f32) {
        let v = if v == 0.0 { 0.0 } else { v };
        self.hasher.update(&v.to_le_bytes());
    }

    /// Raw floats, folding `-0` the same way as [`Self::write_f32`]
    fn write_floats(&mut self, vs: &[f32]) {
        if vs.iter().any(|v| v.to_bits() == NEGATIVE_ZERO_BITS) {
            for &v in vs {
                self.write_f32(v);
            }
        } else {
            self.hasher.update(bytemuck::cast_slice(vs));
        }
    }

    pub fn write_f32s(&mut self, vs: &[f32]) {
        self.write_usize(vs.len());
        self.write_floats(vs);
    }

    pub fn write_vec3s(&mut self, vs: &[Vec3]) {
        self.write_usize(vs.len());
        self.write_floats(bytemuck::cast_slice(vs));
    }

    pub fn write_vec2s(&mut self, vs: &[Vec2]) {
        self.write_usize(vs.len());
        self.write_floats(bytemuck::cast_slice(vs));
    }

    pub fn write_u32s(&mut self, vs: &[u32]) {
        self.write_usize(vs.len());
        self.hasher.update(bytemuck::cast_slice(vs));
    }

    pub fn write_color(&mut self, c: Color) {
        for v in c.to_array() {
            self.write_f32(v);
        }
    }

    pub fn write_mat4(&mut self, m: &Mat4) {
        for v in m.to_cols_array() {
            self.write_f32(v);
        }
    }

    /// Tag for an optional value
    pub fn write_option<T>(&mut self, value: Option<&T>, write: impl FnOnce(&mut Self, &T)) {
        self.write_bool(value.is_some());
        if let Some(value) = value {
            write(self, value);
        }
    }

    /// Final checksum
    pub fn finish(self) -> u32 {
        self.hasher.finalize()
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Interned resources of one export run
#[derive(Debug, Default)]
pub struct ResourcePool {
    entries: Vec<Resource>,
    buckets: HashMap<(ResourceKind, u32), Vec<ResourceHandle>>,
}

impl ResourcePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a resource, returning the handle of an equal one if present
    pub fn intern(&mut self, resource: Resource) -> ResourceHandle {
        let key = (resource.kind(), resource.fingerprint());
        if let Some(bucket) = self.buckets.get(&key) {
            for &handle in bucket {
                if self.get(handle) == Some(&resource) {
                    trace!("Reusing {:?} {} for '{}'", key.0, handle, resource.as_escn().name());
                    return handle;
                }
            }
        }

        let id = u32::try_from(self.entries.len() + 1).unwrap_or(u32::MAX);
        let handle = ResourceHandle(id);
        debug!("Interned {:?} '{}' as {}", key.0, resource.as_escn().name(), handle);
        self.entries.push(resource);
        self.buckets.entry(key).or_default().push(handle);
        handle
    }

    /// Resource behind a handle
    pub fn get(&self, handle: ResourceHandle) -> Option<&Resource> {
        let index = (handle.0 as usize).checked_sub(1)?;
        self.entries.get(index)
    }

    /// Resource behind a handle; a missing one is an internal error
    pub fn resolve(&self, handle: ResourceHandle) -> Result<&Resource> {
        self.get(handle)
            .ok_or_else(|| Error::internal(format!("dangling resource handle {handle}")))
    }

    /// Resources in handle order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceHandle, &Resource)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, r)| (ResourceHandle(u32::try_from(i + 1).unwrap_or(u32::MAX)), r))
    }

    /// Number of distinct resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was interned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of resources of one kind
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.entries.iter().filter(|r| r.kind() == kind).count()
    }
}
