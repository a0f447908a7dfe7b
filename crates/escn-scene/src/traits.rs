//! Scene access interface
//!
//! The exporter only ever reads the host scene through [`SceneSource`]. Any
//! host binding (a live authoring session, a snapshot file, a test fixture)
//! implements it once and gets the whole export pipeline for free.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::armature::ArmatureData;
use crate::curve::CurveData;
use crate::material::{ImageData, MaterialData};
use crate::mesh::MeshData;
use crate::object::Object;

/// Scene-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Scene name, used for the root node
    pub name: String,
    /// Frames per second
    pub fps: f32,
    pub frame_start: f32,
    pub frame_end: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            name: "Scene".to_string(),
            fps: 24.0,
            frame_start: 1.0,
            frame_end: 250.0,
        }
    }
}

/// Read-only view of a host scene
pub trait SceneSource {
    /// Scene-wide settings
    fn settings(&self) -> &SceneSettings;

    /// Objects without a parent, in host order
    fn root_objects(&self) -> Vec<&Object>;

    /// Direct children of an object, in host order
    fn children(&self, name: &str) -> Vec<&Object>;

    /// Look up an object by name
    fn object(&self, name: &str) -> Option<&Object>;

    /// Look up a mesh data block
    fn mesh(&self, name: &str) -> Option<&MeshData>;

    /// Look up an armature data block
    fn armature(&self, name: &str) -> Option<&ArmatureData>;

    /// Look up a material
    fn material(&self, name: &str) -> Option<&MaterialData>;

    /// Look up an action
    fn action(&self, name: &str) -> Option<&Action>;

    /// Look up a curve data block
    fn curve(&self, name: &str) -> Option<&CurveData>;

    /// Look up an image
    fn image(&self, name: &str) -> Option<&ImageData>;

    /// Directory that relative image paths resolve against
    fn base_dir(&self) -> Option<&Path> {
        None
    }

    /// Every object, depth first in host order
    fn all_objects(&self) -> Vec<&Object> {
        let mut out = Vec::new();
        let mut stack: Vec<&Object> = self.root_objects();
        stack.reverse();
        while let Some(object) = stack.pop() {
            out.push(object);
            let mut children = self.children(&object.name);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}
