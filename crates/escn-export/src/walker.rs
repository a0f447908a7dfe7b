//! Scene traversal
//!
//! Depth-first over the host hierarchy in host order. Objects failing the
//! export filters produce no node, but their children are still visited and
//! land under the nearest node-producing ancestor, with local transforms
//! recomputed so world placement is unchanged.

use std::borrow::Cow;
use std::collections::HashMap;

use escn_core::{Result, ValidationError};
use escn_scene::{apply_modifiers, LightType, MeshData, Object, ObjectKind, SceneSource};
use glam::Mat4;
use tracing::{debug, warn};

use crate::animation::{AnimatedNode, AnimationExporter, AnimationTarget};
use crate::config::ExportConfig;
use crate::material::MaterialResolver;
use crate::node::{NodeKind, SceneNode, TransformBasis};
use crate::paths::relative_node_path;
use crate::pool::{Resource, ResourceHandle};
use crate::resources::{build_curve, MeshBuilder};
use crate::skeleton::{SkeletonBuild, SkeletonBuilder};
use crate::state::ExportState;

/// Node tree and sampled animation of one walk
#[derive(Debug)]
pub struct WalkOutput {
    pub root: SceneNode,
    /// Animated nodes in traversal order
    pub animated: Vec<AnimatedNode>,
}

/// Skeleton of an exported armature object
struct ExportedSkeleton {
    build: SkeletonBuild,
    skin: Option<ResourceHandle>,
}

/// Builds the node tree of one export
pub struct SceneWalker<'a> {
    config: &'a ExportConfig,
    scene: &'a dyn SceneSource,
    materials: MaterialResolver<'a>,
    animation: AnimationExporter<'a>,
    /// Keyed by armature object name
    skeletons: HashMap<String, ExportedSkeleton>,
    /// Object name to node path
    node_paths: HashMap<String, String>,
    /// Mesh node path and the armature object it is skinned to
    skin_links: Vec<(String, String)>,
    animated: Vec<AnimatedNode>,
}

impl<'a> SceneWalker<'a> {
    pub fn new(config: &'a ExportConfig, scene: &'a dyn SceneSource) -> Self {
        Self {
            config,
            scene,
            materials: MaterialResolver::new(config, scene),
            animation: AnimationExporter::new(config, scene),
            skeletons: HashMap::new(),
            node_paths: HashMap::new(),
            skin_links: Vec::new(),
            animated: Vec::new(),
        }
    }

    /// Whether an object passes the type, visibility and selection filters
    pub fn includes(&self, object: &Object) -> bool {
        self.config.exports_type(object.object_type())
            && (!self.config.use_visible_objects || object.visible)
            && (!self.config.use_export_selected || object.selected)
    }

    /// Walk the whole scene
    pub fn walk(mut self, state: &mut ExportState) -> Result<WalkOutput> {
        let scene = self.scene;
        self.build_skeletons(scene)?;

        let mut root = SceneNode::root(&scene.settings().name);
        for object in scene.root_objects() {
            self.visit(object, &mut root, Mat4::IDENTITY, state)?;
        }
        self.link_skeletons(&mut root);

        debug!("Walk produced {} nodes", root.count());
        Ok(WalkOutput {
            root,
            animated: self.animated,
        })
    }

    /// Skeletons of every exported armature, so meshes can bind to them
    /// wherever they sit in the hierarchy
    fn build_skeletons(&mut self, scene: &'a dyn SceneSource) -> Result<()> {
        let builder = SkeletonBuilder::new(self.config);
        for object in scene.all_objects() {
            let ObjectKind::Armature { armature } = &object.kind else {
                continue;
            };
            if !self.includes(object) {
                continue;
            }
            let data = scene
                .armature(armature)
                .ok_or_else(|| missing(&object.name, "armature", armature))?;
            let build = builder.build(data)?;
            self.skeletons
                .insert(object.name.clone(), ExportedSkeleton { build, skin: None });
        }
        Ok(())
    }

    fn visit(
        &mut self,
        object: &'a Object,
        parent: &mut SceneNode,
        parent_world: Mat4,
        state: &mut ExportState,
    ) -> Result<()> {
        let scene = self.scene;
        if !self.includes(object) {
            debug!("Skipping {} '{}'", object.kind.label(), object.name);
            for child in scene.children(&object.name) {
                self.visit(child, parent, parent_world, state)?;
            }
            return Ok(());
        }

        // Objects following a bone hang below a BoneAttachment of the skeleton
        let (parent, parent_world) = match self.bone_attachment(object, parent, parent_world) {
            Some((index, world)) => (&mut parent.children[index], world),
            None => (parent, parent_world),
        };

        let basis = TransformBasis {
            host_parent_world: object.parent_world(),
            engine_parent_world: parent_world,
            keep_frame: matches!(object.kind, ObjectKind::Camera(_) | ObjectKind::Light(_)),
        };
        let local = basis.engine_local(object.matrix_local);
        let world = parent_world * local;

        let (kind, mesh) = self.node_kind(object, state)?;
        let node = parent.add_child(&object.name, kind, local);
        node.visible = object.visible;
        debug!("Node '{}' ({})", node.path, node.kind.type_name());
        self.node_paths.insert(object.name.clone(), node.path.clone());
        if let Some(armature) = object.armature_binding() {
            if matches!(node.kind, NodeKind::MeshInstance { .. }) && self.skeletons.contains_key(armature) {
                self.skin_links.push((node.path.clone(), armature.to_string()));
            }
        }

        if self.config.use_export_animation {
            self.collect_animation(object, node, basis, mesh);
        }

        for child in scene.children(&object.name) {
            self.visit(child, node, world, state)?;
        }
        Ok(())
    }

    /// Index of the attachment child to use and its engine world transform
    fn bone_attachment(
        &self,
        object: &Object,
        parent: &mut SceneNode,
        parent_world: Mat4,
    ) -> Option<(usize, Mat4)> {
        let bone = object.parent_bone.as_deref()?;
        let armature = object.parent.as_deref()?;
        if self.node_paths.get(armature) != Some(&parent.path) {
            return None;
        }
        let skeleton = &self.skeletons.get(armature)?.build;
        let Some(kept) = skeleton.attachment_bone(bone) else {
            warn!("'{}' follows bone '{}' which has no exported bone above it", object.name, bone);
            return None;
        };
        let index = skeleton.bone_index(kept)?;
        let world = parent_world * skeleton.global_rests[index];

        let existing = parent
            .children
            .iter()
            .position(|c| matches!(&c.kind, NodeKind::BoneAttachment(b) if b == kept));
        let position = existing.unwrap_or_else(|| {
            parent.add_child(kept, NodeKind::BoneAttachment(kept.to_string()), Mat4::IDENTITY);
            parent.children.len() - 1
        });
        Some((position, world))
    }

    /// Node payload of an object; meshes also return their evaluated data
    fn node_kind(
        &mut self,
        object: &'a Object,
        state: &mut ExportState,
    ) -> Result<(NodeKind, Option<&'a MeshData>)> {
        let scene = self.scene;
        let kind = match &object.kind {
            ObjectKind::Empty => NodeKind::Spatial,
            ObjectKind::Camera(camera) => NodeKind::Camera(camera.clone()),
            ObjectKind::Light(light) => {
                if light.light_type == LightType::Area {
                    warn!("Area light '{}' exported as an omni light", object.name);
                }
                NodeKind::Light(light.clone())
            }
            ObjectKind::Armature { .. } => match self.skeletons.get(&object.name) {
                Some(skeleton) => NodeKind::Skeleton(skeleton.build.bones.clone()),
                None => NodeKind::Spatial,
            },
            ObjectKind::Curve { curve } => {
                let data = scene
                    .curve(curve)
                    .ok_or_else(|| missing(&object.name, "curve", curve))?;
                match build_curve(data) {
                    Some(resource) => NodeKind::Path(state.pool.intern(Resource::Curve(resource))),
                    None => {
                        warn!("Curve '{}' has no control points", curve);
                        NodeKind::Spatial
                    }
                }
            }
            ObjectKind::Mesh { mesh, material_overrides } => {
                let data = scene
                    .mesh(mesh)
                    .ok_or_else(|| missing(&object.name, "mesh", mesh))?;
                let kind = self.mesh_instance(object, data, material_overrides, state)?;
                return Ok((kind, Some(data)));
            }
        };
        Ok((kind, None))
    }

    fn mesh_instance(
        &mut self,
        object: &Object,
        data: &MeshData,
        material_overrides: &[Option<String>],
        state: &mut ExportState,
    ) -> Result<NodeKind> {
        let evaluated = if self.config.use_mesh_modifiers && !object.modifiers.is_empty() {
            Cow::Owned(apply_modifiers(data, &object.modifiers))
        } else {
            Cow::Borrowed(data)
        };

        // Object-linked slots win over the mesh's own
        let slots: Vec<Option<String>> = evaluated
            .materials
            .iter()
            .enumerate()
            .map(|(i, slot)| material_overrides.get(i).cloned().flatten().or_else(|| slot.clone()))
            .collect();
        let materials = self.materials.resolve_slots(&slots, &object.name, state)?;

        let beta = self.config.use_beta_features;
        let skeleton = match object.armature_binding() {
            Some(armature) => match self.skeletons.get_mut(armature) {
                Some(exported) => {
                    if beta && exported.skin.is_none() {
                        exported.skin = Some(state.pool.intern(Resource::Skin(exported.build.skin())));
                    }
                    Some(&*exported)
                }
                None => {
                    debug!("'{}' is bound to '{}', which is not exported", object.name, armature);
                    None
                }
            },
            None => None,
        };

        let resource = MeshBuilder::new(&evaluated)
            .with_materials(&materials)
            .with_skeleton(skeleton.map(|s| &s.build))
            .with_shape_keys(self.config.use_export_shape_key)
            .build(&object.name)?;
        let mesh = state.pool.intern(Resource::Mesh(resource));

        Ok(NodeKind::MeshInstance {
            mesh,
            skeleton: None,
            skin: skeleton.and_then(|s| s.skin),
        })
    }

    fn collect_animation(
        &mut self,
        object: &Object,
        node: &SceneNode,
        basis: TransformBasis,
        mesh: Option<&MeshData>,
    ) {
        let shape_key_animation = mesh.and_then(|m| m.shape_key_animation.as_ref());
        if object.animation.is_none() && shape_key_animation.is_none() {
            return;
        }
        let target = AnimationTarget {
            object,
            node: &node.path,
            basis,
            rest_local: node.transform,
            visible: object.visible,
            skeleton: self.skeletons.get(&object.name).map(|s| &s.build),
            blend_shapes: mesh.map(MeshData::blend_shapes).unwrap_or_default(),
            shape_key_animation,
        };
        let clips = self.animation.export(&target);
        if !clips.is_empty() {
            self.animated.push(AnimatedNode {
                path: node.path.clone(),
                clips,
            });
        }
    }

    /// Point skinned meshes at their skeleton nodes
    fn link_skeletons(&self, root: &mut SceneNode) {
        for (mesh_path, armature) in &self.skin_links {
            let Some(skeleton_path) = self.node_paths.get(armature) else {
                continue;
            };
            let relative = relative_node_path(mesh_path, skeleton_path);
            if let Some(SceneNode {
                kind: NodeKind::MeshInstance { skeleton, .. },
                ..
            }) = root.find_mut(mesh_path)
            {
                *skeleton = Some(relative);
            }
        }
    }
}

fn missing(owner: &str, kind: &'static str, name: &str) -> escn_core::Error {
    ValidationError::MissingReference {
        owner: owner.to_string(),
        kind,
        name: name.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use escn_scene::{ObjectType, SceneSnapshot};
    use glam::Vec3;

    fn config() -> ExportConfig {
        ExportConfig {
            material_mode: crate::config::MaterialMode::None,
            ..ExportConfig::new("/tmp/out/scene.escn")
        }
    }

    fn object(name: &str, kind: ObjectKind, parent: Option<&str>, at: Vec3) -> Object {
        let mut object = Object::new(name, kind);
        object.parent = parent.map(str::to_string);
        object.matrix_local = Mat4::from_translation(at);
        object
    }

    fn snapshot(objects: Vec<Object>) -> SceneSnapshot {
        // World transforms from the local chain
        let mut objects = objects;
        for i in 0..objects.len() {
            let parent_world = objects[i]
                .parent
                .as_ref()
                .and_then(|p| objects.iter().find(|o| &o.name == p))
                .map_or(Mat4::IDENTITY, |p| p.matrix_world);
            objects[i].matrix_world = parent_world * objects[i].matrix_local;
        }
        SceneSnapshot::new(Default::default(), objects).unwrap()
    }

    #[test]
    fn test_filtered_parent_reparents_children() {
        let scene = snapshot(vec![
            object("Lamp", ObjectKind::Light(Default::default()), None, Vec3::new(0.0, 0.0, 2.0)),
            object("Child", ObjectKind::Empty, Some("Lamp"), Vec3::new(1.0, 0.0, 0.0)),
        ]);
        let mut config = config();
        config.object_types.remove(&ObjectType::Light);

        let mut state = ExportState::new();
        let out = SceneWalker::new(&config, &scene).walk(&mut state).unwrap();
        assert_eq!(out.root.children.len(), 1);
        let child = &out.root.children[0];
        assert_eq!(child.path, "Child");
        // World (1, 0, 2) in host space is (1, 2, 0) in engine space
        assert!(child
            .transform
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_hidden_objects_follow_visibility_filter() {
        let mut hidden = object("Hidden", ObjectKind::Empty, None, Vec3::ZERO);
        hidden.visible = false;
        let scene = snapshot(vec![hidden]);

        let mut state = ExportState::new();
        let out = SceneWalker::new(&config(), &scene).walk(&mut state).unwrap();
        assert!(out.root.children.is_empty());

        let mut config = config();
        config.use_visible_objects = false;
        let out = SceneWalker::new(&config, &scene).walk(&mut state).unwrap();
        assert!(!out.root.children[0].visible);
    }

    #[test]
    fn test_missing_mesh_is_a_validation_error() {
        let scene = snapshot(vec![object(
            "Cube",
            ObjectKind::Mesh {
                mesh: "Nope".into(),
                material_overrides: Vec::new(),
            },
            None,
            Vec3::ZERO,
        )]);
        let mut state = ExportState::new();
        let err = SceneWalker::new(&config(), &scene).walk(&mut state).unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::MissingReference { kind: "mesh", .. })
        ));
    }

    #[test]
    fn test_sibling_names_are_unique() {
        let scene = snapshot(vec![
            object("A.1", ObjectKind::Empty, None, Vec3::ZERO),
            object("A_1", ObjectKind::Empty, None, Vec3::ZERO),
        ]);
        let mut state = ExportState::new();
        let out = SceneWalker::new(&config(), &scene).walk(&mut state).unwrap();
        let names: Vec<&str> = out.root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A_1", "A_1_1"]);
    }
}
