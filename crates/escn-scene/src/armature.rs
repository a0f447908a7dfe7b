//! Armature data blocks

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::serde_helpers::{default_true, identity, mat4_rows};

/// Bone hierarchy of an armature object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArmatureData {
    /// Data block name
    pub name: String,

    /// Bones in host order; parents need not precede children
    #[serde(default)]
    pub bones: Vec<HostBone>,
}

impl ArmatureData {
    /// Find a bone index by name
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Find a bone by name
    pub fn bone(&self, name: &str) -> Option<&HostBone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Indices of the direct children of a bone
    pub fn children(&self, name: &str) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.as_deref() == Some(name))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Bone as authored in the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostBone {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Rest transform in armature space
    #[serde(default = "identity", with = "mat4_rows")]
    pub matrix_local: Mat4,

    /// Deforming bones carry vertex weights; control bones do not
    #[serde(default = "default_true")]
    pub deform: bool,
}

impl HostBone {
    /// Deforming bone at the armature origin
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            matrix_local: Mat4::IDENTITY,
            deform: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_lookup() {
        let armature = ArmatureData {
            name: "Rig".into(),
            bones: vec![
                HostBone::new("Root", None),
                HostBone::new("Spine", Some("Root")),
                HostBone::new("Tail", Some("Root")),
            ],
        };

        assert_eq!(armature.children("Root"), vec![1, 2]);
        assert_eq!(armature.bone_index("Tail"), Some(2));
        assert!(armature.bone("Head").is_none());
    }

    #[test]
    fn test_deform_defaults_true() {
        let bone: HostBone = serde_json::from_str(r#"{"name": "Hip"}"#).unwrap();
        assert!(bone.deform);
        assert_eq!(bone.matrix_local, Mat4::IDENTITY);
    }
}
