//! By-path references to files outside the scene
//!
//! Existing material files and copied textures are linked with
//! `[ext_resource]` sections. They are tracked apart from the resource pool:
//! nothing about them is serialized inline, only their path and type.

use std::fmt;

use tracing::debug;

use crate::escn::{Section, Value};
use crate::pool::ResourceHandle;

/// Id of an `[ext_resource]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalId(u32);

impl ExternalId {
    /// Id written in the scene file
    pub fn id(self) -> u32 {
        self.0
    }

    pub(crate) fn from_id(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ext#{}", self.0)
    }
}

/// Type of a linked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    Material,
    Texture,
}

impl ExternalKind {
    /// Engine type name
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Material => "Material",
            Self::Texture => "Texture",
        }
    }
}

/// One linked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalResource {
    /// Path as written in the scene (`res://...` or relative)
    pub path: String,
    pub kind: ExternalKind,
}

/// Linked files of one document, deduplicated by path
#[derive(Debug, Clone, Default)]
pub struct ExternalResources {
    entries: Vec<ExternalResource>,
}

impl ExternalResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path, returning the existing id if it is already linked
    pub fn add(&mut self, path: impl Into<String>, kind: ExternalKind) -> ExternalId {
        let path = path.into();
        if let Some(index) = self.entries.iter().position(|e| e.path == path) {
            return ExternalId(index as u32 + 1);
        }
        self.entries.push(ExternalResource { path, kind });
        let id = ExternalId(self.entries.len() as u32);
        debug!("Linked {} '{}' as {}", kind.type_name(), self.entries[self.entries.len() - 1].path, id);
        id
    }

    pub fn get(&self, id: ExternalId) -> Option<&ExternalResource> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `[ext_resource]` sections in id order
    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| Section::ext_resource(&e.path, e.kind.type_name(), i as u32 + 1))
    }
}

/// Where a material lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialRef {
    /// Inline `sub_resource`
    Internal(ResourceHandle),
    /// Linked `.tres` file
    External(ExternalId),
}

impl MaterialRef {
    /// Property value referring to the material
    pub fn to_value(self) -> Value {
        match self {
            Self::Internal(handle) => Value::SubResource(handle.id()),
            Self::External(id) => Value::ExtResource(id.id()),
        }
    }
}
