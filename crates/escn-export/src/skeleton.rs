//! Armatures to flat bone lists
//!
//! Bones come out in a stable topological order: by depth in the hierarchy,
//! then by their index in the armature. A bone's parent index is always
//! smaller than its own.
//!
//! When control bones are excluded, the remaining bones re-attach to their
//! nearest kept ancestor with rest transforms recomputed against it. Vertex
//! weights painted on an excluded bone move to that same ancestor, or to the
//! first kept descendant when the bone has no kept ancestor.

use std::collections::HashMap;

use escn_core::{convert_matrix, Result, ValidationError};
use escn_scene::{ArmatureData, GroupWeight};
use glam::Mat4;
use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::resources::{SkinBind, SkinResource};

/// Exported bone
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone, `-1` for roots
    pub parent: i32,
    /// Rest transform relative to the parent, engine space
    pub rest: Mat4,
    pub deform: bool,
}

/// Result of building one armature
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonBuild {
    pub armature: String,
    pub bones: Vec<Bone>,
    /// Rest transforms relative to the skeleton, engine space
    pub global_rests: Vec<Mat4>,
    /// Host bone name to kept bone carrying its vertex weights
    weight_targets: HashMap<String, usize>,
    /// Host bone name to nearest kept bone at or above it
    attachments: HashMap<String, usize>,
}

impl SkeletonBuild {
    /// Index of a kept bone
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Kept bone that objects parented to `name` should follow
    pub fn attachment_bone(&self, name: &str) -> Option<&str> {
        self.attachments
            .get(name)
            .map(|&index| self.bones[index].name.as_str())
    }

    /// Kept bone receiving the weights of host bone `name`
    pub fn weight_target(&self, name: &str) -> Option<usize> {
        self.weight_targets.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bone weights of one vertex.
    ///
    /// Groups that do not name a bone are ignored. Weights of groups mapping
    /// to the same kept bone are added, so the total is unchanged.
    pub fn skin_weights(&self, vertex_groups: &[String], groups: &[GroupWeight]) -> Vec<(u32, f32)> {
        let mut merged: Vec<(u32, f32)> = Vec::new();
        for group in groups {
            if group.weight <= 0.0 {
                continue;
            }
            let Some(name) = vertex_groups.get(group.group as usize) else {
                continue;
            };
            let Some(target) = self.weight_target(name) else {
                continue;
            };
            let target = target as u32;
            match merged.iter_mut().find(|(bone, _)| *bone == target) {
                Some((_, weight)) => *weight += group.weight,
                None => merged.push((target, group.weight)),
            }
        }
        merged
    }

    /// Skin binding every bone at its rest pose
    pub fn skin(&self) -> SkinResource {
        SkinResource {
            name: self.armature.clone(),
            binds: self
                .global_rests
                .iter()
                .enumerate()
                .map(|(i, rest)| SkinBind {
                    bone: i as u32,
                    pose: rest.inverse(),
                })
                .collect(),
        }
    }
}

/// Builds skeletons according to the export options
pub struct SkeletonBuilder<'a> {
    config: &'a ExportConfig,
}

impl<'a> SkeletonBuilder<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Build the bone list of an armature.
    ///
    /// Unknown parent names and parent cycles are validation errors.
    pub fn build(&self, armature: &ArmatureData) -> Result<SkeletonBuild> {
        let parents = resolve_parents(armature)?;
        let depths = depths(armature, &parents)?;

        let mut order: Vec<usize> = (0..armature.bones.len()).collect();
        order.sort_by_key(|&i| (depths[i], i));

        let included: Vec<bool> = armature
            .bones
            .iter()
            .map(|b| !self.config.use_exclude_ctrl_bone || b.deform)
            .collect();

        // Host index -> exported index
        let mut exported: Vec<Option<usize>> = vec![None; armature.bones.len()];
        let mut bones = Vec::new();
        let mut global_rests = Vec::new();

        for &host in &order {
            if !included[host] {
                debug!("Excluding control bone '{}'", armature.bones[host].name);
                continue;
            }
            let bone = &armature.bones[host];
            let kept_parent = nearest_kept_ancestor(host, &parents, &included);

            let (parent, rest) = match kept_parent {
                Some(p) => {
                    let local = armature.bones[p].matrix_local.inverse() * bone.matrix_local;
                    (exported[p].map_or(-1, |i| i as i32), convert_matrix(local))
                }
                None => (-1, convert_matrix(bone.matrix_local)),
            };

            exported[host] = Some(bones.len());
            bones.push(Bone {
                name: bone.name.clone(),
                parent,
                rest,
                deform: bone.deform,
            });
            global_rests.push(convert_matrix(bone.matrix_local));
        }

        let mut attachments = HashMap::new();
        let mut weight_targets = HashMap::new();
        for (host, bone) in armature.bones.iter().enumerate() {
            let at_or_above = if included[host] {
                Some(host)
            } else {
                nearest_kept_ancestor(host, &parents, &included)
            };
            if let Some(index) = at_or_above.and_then(|h| exported[h]) {
                attachments.insert(bone.name.clone(), index);
            }

            let target = at_or_above
                .or_else(|| first_kept_descendant(host, &order, &parents, &included))
                .and_then(|h| exported[h]);
            match target {
                Some(index) => {
                    weight_targets.insert(bone.name.clone(), index);
                }
                None => warn!(
                    "Weights of bone '{}' in '{}' have no bone to move to",
                    bone.name, armature.name
                ),
            }
        }

        debug!(
            "Built skeleton '{}' with {} of {} bones",
            armature.name,
            bones.len(),
            armature.bones.len()
        );

        Ok(SkeletonBuild {
            armature: armature.name.clone(),
            bones,
            global_rests,
            weight_targets,
            attachments,
        })
    }
}

fn resolve_parents(armature: &ArmatureData) -> Result<Vec<Option<usize>>> {
    armature
        .bones
        .iter()
        .map(|bone| match &bone.parent {
            None => Ok(None),
            Some(parent) => armature.bone_index(parent).map(Some).ok_or_else(|| {
                ValidationError::MissingReference {
                    owner: format!("{}/{}", armature.name, bone.name),
                    kind: "bone",
                    name: parent.clone(),
                }
                .into()
            }),
        })
        .collect()
}

fn depths(armature: &ArmatureData, parents: &[Option<usize>]) -> Result<Vec<usize>> {
    let count = parents.len();
    let mut depths = Vec::with_capacity(count);
    for start in 0..count {
        let mut depth = 0;
        let mut current = parents[start];
        while let Some(parent) = current {
            depth += 1;
            if depth > count {
                return Err(ValidationError::BoneCycle {
                    armature: armature.name.clone(),
                    bone: armature.bones[start].name.clone(),
                }
                .into());
            }
            current = parents[parent];
        }
        depths.push(depth);
    }
    Ok(depths)
}

fn nearest_kept_ancestor(bone: usize, parents: &[Option<usize>], included: &[bool]) -> Option<usize> {
    let mut current = parents[bone];
    while let Some(parent) = current {
        if included[parent] {
            return Some(parent);
        }
        current = parents[parent];
    }
    None
}

fn is_descendant(bone: usize, ancestor: usize, parents: &[Option<usize>]) -> bool {
    let mut current = parents[bone];
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = parents[parent];
    }
    false
}

fn first_kept_descendant(
    bone: usize,
    order: &[usize],
    parents: &[Option<usize>],
    included: &[bool],
) -> Option<usize> {
    order
        .iter()
        .copied()
        .find(|&candidate| included[candidate] && is_descendant(candidate, bone, parents))
}
