//! Material resolution
//!
//! A host material becomes one of:
//!
//! - nothing, when materials are disabled
//! - a link to an existing `<name>.tres` found in the search directories
//! - a synthesized `SpatialMaterial`, or a `ShaderMaterial` with a generated
//!   shader, stored inline or in its own `.tres` next to the scene
//!
//! Results are cached per material name for the run, so every slot using a
//! material shares the same reference.

pub mod shader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use escn_core::{Color, Result, ValidationError};
use escn_scene::{MaterialData, SceneSource, ShaderNodeType, SocketValue};
use tracing::{debug, info, warn};

use crate::config::{ExportConfig, MaterialMode, MaterialSearchPaths};
use crate::escn::{Document, Section, Value};
use crate::external::{ExternalId, ExternalKind, ExternalResources, MaterialRef};
use crate::paths::{find_file, find_project_root, resource_path, sanitize_file_name};
use crate::pool::{Resource, ResourcePool};
use crate::resources::{
    EscnResource, MaterialResource, ShaderMaterial, ShaderResource, ShaderTexture, SpatialMaterial,
};
use crate::state::ExportState;
use crate::writer::{PendingFile, PendingFiles};

/// Extension of engine resource files
pub const MATERIAL_EXTENSION: &str = "tres";

/// Maps host materials to scene references
pub struct MaterialResolver<'a> {
    config: &'a ExportConfig,
    scene: &'a dyn SceneSource,
    export_dir: PathBuf,
    project_root: Option<PathBuf>,
    cache: HashMap<String, Option<MaterialRef>>,
    warned_no_project: bool,
}

impl<'a> MaterialResolver<'a> {
    pub fn new(config: &'a ExportConfig, scene: &'a dyn SceneSource) -> Self {
        let export_dir = config.export_dir();
        let project_root = find_project_root(&export_dir);
        match &project_root {
            Some(root) => debug!("Project root: {:?}", root),
            None => debug!("No project root above {:?}", export_dir),
        }
        Self {
            config,
            scene,
            export_dir,
            project_root,
            cache: HashMap::new(),
            warned_no_project: false,
        }
    }

    /// Reference for a material slot; `owner` names the user in errors
    pub fn resolve(
        &mut self,
        name: &str,
        owner: &str,
        state: &mut ExportState,
    ) -> Result<Option<MaterialRef>> {
        if self.config.material_mode == MaterialMode::None {
            return Ok(None);
        }
        if let Some(cached) = self.cache.get(name) {
            return Ok(*cached);
        }

        let scene = self.scene;
        let material = scene.material(name).ok_or_else(|| ValidationError::MissingReference {
            owner: owner.to_string(),
            kind: "material",
            name: name.to_string(),
        })?;

        let reference = match self.find_existing(name) {
            Some(path) => {
                let link = resource_path(&path, &self.export_dir, self.project_root.as_deref());
                info!("Using existing material '{}' at {}", name, link);
                MaterialRef::External(state.externals.add(link, ExternalKind::Material))
            }
            None if self.config.generate_external_material => self.write_external(material, state)?,
            None => {
                let resource = self.synthesize(
                    material,
                    &mut state.pool,
                    &mut state.externals,
                    &mut state.files,
                )?;
                MaterialRef::Internal(state.pool.intern(Resource::Material(resource)))
            }
        };

        self.cache.insert(name.to_string(), Some(reference));
        Ok(Some(reference))
    }

    /// Resolve every slot of a mesh; empty slots stay empty
    pub fn resolve_slots(
        &mut self,
        slots: &[Option<String>],
        owner: &str,
        state: &mut ExportState,
    ) -> Result<Vec<Option<MaterialRef>>> {
        slots
            .iter()
            .map(|slot| match slot {
                Some(name) => self.resolve(name, owner, state),
                None => Ok(None),
            })
            .collect()
    }

    // ==================== Search ====================

    fn material_file_name(name: &str) -> String {
        format!("{}.{MATERIAL_EXTENSION}", sanitize_file_name(name))
    }

    fn probe_export_dir(&self, file_name: &str) -> Option<PathBuf> {
        let candidate = self.export_dir.join(file_name);
        candidate.is_file().then_some(candidate)
    }

    fn find_existing(&mut self, name: &str) -> Option<PathBuf> {
        let file_name = Self::material_file_name(name);
        match self.config.material_search_paths {
            MaterialSearchPaths::None => None,
            MaterialSearchPaths::ExportDir => self.probe_export_dir(&file_name),
            MaterialSearchPaths::ProjectDir => match &self.project_root {
                Some(root) => find_file(root, &file_name),
                None => {
                    if !self.warned_no_project {
                        warn!(
                            "No project root above {:?}; searching materials in the export directory",
                            self.export_dir
                        );
                        self.warned_no_project = true;
                    }
                    self.probe_export_dir(&file_name)
                }
            },
        }
    }

    // ==================== Synthesis ====================

    /// Build the material payload. Shaders are interned into `pool` and
    /// textures linked through `externals`.
    fn synthesize(
        &self,
        material: &MaterialData,
        pool: &mut ResourcePool,
        externals: &mut ExternalResources,
        files: &mut PendingFiles,
    ) -> Result<MaterialResource> {
        if self.config.material_mode == MaterialMode::ScriptShader {
            if let Some(generated) = shader::generate(material)? {
                let shader = pool.intern(Resource::Shader(ShaderResource {
                    name: material.name.clone(),
                    code: generated.code,
                }));
                let textures = generated
                    .textures
                    .iter()
                    .filter_map(|t| {
                        self.link_texture(&t.image, &material.name, externals, files)
                            .map(|texture| ShaderTexture {
                                uniform: t.uniform.clone(),
                                texture,
                            })
                    })
                    .collect();
                debug!("Generated shader for material '{}'", material.name);
                return Ok(MaterialResource::Shader(ShaderMaterial {
                    name: material.name.clone(),
                    shader,
                    textures,
                }));
            }
            debug!("Material '{}' has no node tree, using a spatial material", material.name);
        }
        Ok(MaterialResource::Spatial(spatial_material(material)))
    }

    /// Queue an image copy next to the scene and link it
    fn link_texture(
        &self,
        image: &str,
        material: &str,
        externals: &mut ExternalResources,
        files: &mut PendingFiles,
    ) -> Option<ExternalId> {
        let Some(data) = self.scene.image(image) else {
            warn!("Material '{}' uses unknown image '{}'; texture left unbound", material, image);
            return None;
        };
        let source = image_source(self.scene, &data.filepath);
        if !source.is_file() {
            warn!(
                "Image '{}' of material '{}' not found at {:?}; texture left unbound",
                image, material, source
            );
            return None;
        }

        let destination = self.export_dir.join(texture_file_name(&data.name, &source));
        let link = resource_path(&destination, &self.export_dir, self.project_root.as_deref());
        files.push(PendingFile::Copy {
            from: source,
            to: destination,
        });
        Some(externals.add(link, ExternalKind::Texture))
    }

    /// Write the material to its own resource file and link it
    fn write_external(&self, material: &MaterialData, state: &mut ExportState) -> Result<MaterialRef> {
        let mut pool = ResourcePool::new();
        let mut externals = ExternalResources::new();
        let resource = self.synthesize(material, &mut pool, &mut externals, &mut state.files)?;

        let document = material_document(&resource, &pool, &externals);
        let path = self.export_dir.join(Self::material_file_name(&material.name));
        let link = resource_path(&path, &self.export_dir, self.project_root.as_deref());
        info!("Writing material '{}' to {:?}", material.name, path);
        state.files.push(PendingFile::Write {
            path,
            contents: document.to_string().into_bytes(),
        });
        Ok(MaterialRef::External(state.externals.add(link, ExternalKind::Material)))
    }
}

/// Standalone resource file holding one material
fn material_document(
    resource: &MaterialResource,
    pool: &ResourcePool,
    externals: &ExternalResources,
) -> Document {
    let mut document = Document::resource(resource.type_name());
    for section in externals.sections() {
        document.push_ext_resource(section);
    }
    for (handle, sub) in pool.iter() {
        document.push_sub_resource(sub.as_escn().to_section(handle.id()));
    }
    let mut body = Section::new("resource").prop("resource_name", Value::str(resource.name()));
    body.extend(resource.properties());
    document.push_body(body);
    document
}

fn socket_color(value: Option<&SocketValue>) -> Option<Color> {
    match value {
        Some(SocketValue::Color(c)) => Some(Color::from(*c)),
        _ => None,
    }
}

fn socket_float(value: Option<&SocketValue>) -> Option<f32> {
    match value {
        Some(SocketValue::Float(v)) => Some(*v),
        _ => None,
    }
}

/// Fixed-function approximation of a material.
///
/// Values come from a principled node feeding the output when there is one,
/// otherwise from the material's own settings.
pub fn spatial_material(material: &MaterialData) -> SpatialMaterial {
    let mut albedo = material.diffuse_color;
    let mut metallic = material.metallic;
    let mut specular = material.specular;
    let mut roughness = material.roughness;
    let mut emission = material.emission;
    let mut emission_strength = material.emission_strength;

    let principled = material.node_tree.as_ref().and_then(|tree| {
        let output = tree.output_node()?;
        let link = tree.link_to(&output.name, "Surface")?;
        tree.node(&link.from_node)
            .filter(|n| n.node_type == ShaderNodeType::BsdfPrincipled)
    });
    if let Some(node) = principled {
        albedo = socket_color(node.inputs.get("Base Color")).unwrap_or(albedo);
        metallic = socket_float(node.inputs.get("Metallic")).unwrap_or(metallic);
        specular = socket_float(node.inputs.get("Specular")).unwrap_or(specular);
        roughness = socket_float(node.inputs.get("Roughness")).unwrap_or(roughness);
        emission = socket_color(node.inputs.get("Emission")).unwrap_or(emission);
        emission_strength =
            socket_float(node.inputs.get("Emission Strength")).unwrap_or(emission_strength);
    }

    let glows = emission.r > 0.0 || emission.g > 0.0 || emission.b > 0.0;
    SpatialMaterial {
        name: material.name.clone(),
        albedo,
        metallic,
        specular,
        roughness,
        emission: glows.then_some((emission, emission_strength)),
        transparent: material.blend_method.is_transparent(),
        cull_disabled: !material.use_backface_culling,
    }
}

/// Copy name for an image: the image's own name, which is unique per
/// scene, keeping the source file's extension
fn texture_file_name(image: &str, source: &Path) -> String {
    let name = sanitize_file_name(image);
    match source.extension().and_then(|e| e.to_str()) {
        Some(ext) if !Path::new(&name).extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)) => {
            format!("{name}.{ext}")
        }
        _ => name,
    }
}

/// Location of an image file; relative paths resolve against the scene
pub fn image_source(scene: &dyn SceneSource, filepath: &Path) -> PathBuf {
    match scene.base_dir() {
        Some(base) if filepath.is_relative() => base.join(filepath),
        _ => filepath.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use escn_scene::{
        BlendMethod, ImageData, SceneSnapshot, ShaderLink, ShaderNode, ShaderNodeTree,
    };

    use crate::paths::PROJECT_FILE;

    fn make_scene(materials: Vec<MaterialData>, images: Vec<ImageData>, base: &Path) -> SceneSnapshot {
        let mut scene = SceneSnapshot::default();
        scene.materials = materials;
        scene.images = images;
        scene.indexed().unwrap().with_base_dir(base)
    }

    fn textured(name: &str, image: &str) -> MaterialData {
        MaterialData {
            node_tree: Some(ShaderNodeTree {
                nodes: vec![
                    ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                    ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled),
                    ShaderNode {
                        image: Some(image.into()),
                        ..ShaderNode::new("Image Texture", ShaderNodeType::TexImage)
                    },
                ],
                links: vec![
                    ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface"),
                    ShaderLink::new("Image Texture", "Color", "Principled BSDF", "Base Color"),
                ],
            }),
            ..MaterialData::new(name)
        }
    }

    #[test]
    fn test_none_mode_gives_no_material() {
        let dir = tempfile::tempdir().unwrap();
        let scene = make_scene(vec![MaterialData::new("Red")], vec![], dir.path());
        let config = ExportConfig {
            material_mode: MaterialMode::None,
            ..ExportConfig::new(dir.path().join("out.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        assert_eq!(resolver.resolve("Red", "Cube", &mut state).unwrap(), None);
        assert!(state.pool.is_empty());
    }

    #[test]
    fn test_missing_material_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let scene = make_scene(vec![], vec![], dir.path());
        let config = ExportConfig::new(dir.path().join("out.escn"));
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        let err = resolver.resolve("Ghost", "Cube", &mut state).unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::MissingReference { kind: "material", .. })
        ));
    }

    #[test]
    fn test_spatial_synthesis_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let scene = make_scene(
            vec![MaterialData {
                blend_method: BlendMethod::Blend,
                ..MaterialData::new("Glass")
            }],
            vec![],
            dir.path(),
        );
        let config = ExportConfig {
            material_search_paths: MaterialSearchPaths::None,
            ..ExportConfig::new(dir.path().join("out.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        let a = resolver.resolve("Glass", "A", &mut state).unwrap();
        let b = resolver.resolve("Glass", "B", &mut state).unwrap();
        assert_eq!(a, b);
        assert_eq!(state.pool.len(), 1);

        let Some(MaterialRef::Internal(handle)) = a else {
            panic!("expected inline material");
        };
        match state.pool.resolve(handle).unwrap() {
            Resource::Material(MaterialResource::Spatial(m)) => {
                assert!(m.transparent);
                assert!(m.cull_disabled);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_export_dir_probe_links_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Steel.tres"), "").unwrap();
        let scene = make_scene(vec![MaterialData::new("Steel")], vec![], dir.path());
        let config = ExportConfig {
            material_search_paths: MaterialSearchPaths::ExportDir,
            ..ExportConfig::new(dir.path().join("out.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        let reference = resolver.resolve("Steel", "Cube", &mut state).unwrap();
        assert!(matches!(reference, Some(MaterialRef::External(_))));
        assert!(state.pool.is_empty());
        assert_eq!(state.externals.sections().next().unwrap().to_string(),
            "[ext_resource path=\"Steel.tres\" type=\"Material\" id=1]\n");
    }

    #[test]
    fn test_project_dir_search_uses_res_path() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        fs::write(project.join(PROJECT_FILE), "").unwrap();
        fs::create_dir_all(project.join("materials")).unwrap();
        fs::create_dir_all(project.join("scenes")).unwrap();
        fs::write(project.join("materials").join("Steel.tres"), "").unwrap();

        let scene = make_scene(vec![MaterialData::new("Steel")], vec![], project);
        let config = ExportConfig::new(project.join("scenes").join("level.escn"));
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        resolver.resolve("Steel", "Cube", &mut state).unwrap();
        let section = state.externals.sections().next().unwrap().to_string();
        assert!(section.contains("path=\"res://materials/Steel.tres\""));
    }

    #[test]
    fn test_shader_material_copies_texture() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        let out = dir.path().join("out");
        fs::create_dir_all(&assets).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(assets.join("wood.png"), b"png").unwrap();

        let scene = make_scene(
            vec![textured("Wood", "wood")],
            vec![ImageData { name: "wood".into(), filepath: PathBuf::from("assets/wood.png") }],
            dir.path(),
        );
        let config = ExportConfig {
            material_search_paths: MaterialSearchPaths::None,
            ..ExportConfig::new(out.join("level.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        resolver.resolve("Wood", "Plank", &mut state).unwrap();
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.externals.len(), 1);
        // Shader interned before the material using it
        assert!(matches!(state.pool.iter().next(), Some((_, Resource::Shader(_)))));
        match state.pool.iter().nth(1) {
            Some((_, Resource::Material(MaterialResource::Shader(m)))) => {
                assert_eq!(m.textures.len(), 1);
                assert_eq!(m.textures[0].uniform, "uni1_wood");
            }
            other => panic!("unexpected {other:?}"),
        };
    }

    #[test]
    fn test_same_file_name_in_two_folders_gives_two_textures() {
        let dir = tempfile::tempdir().unwrap();
        for folder in ["oak", "pine"] {
            fs::create_dir_all(dir.path().join(folder)).unwrap();
            fs::write(dir.path().join(folder).join("wood.png"), folder).unwrap();
        }
        let scene = make_scene(
            vec![textured("Oak", "oak_wood"), textured("Pine", "pine_wood")],
            vec![
                ImageData { name: "oak_wood".into(), filepath: PathBuf::from("oak/wood.png") },
                ImageData { name: "pine_wood".into(), filepath: PathBuf::from("pine/wood.png") },
            ],
            dir.path(),
        );
        let out = dir.path().join("out");
        let config = ExportConfig {
            material_search_paths: MaterialSearchPaths::None,
            ..ExportConfig::new(out.join("level.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        resolver.resolve("Oak", "Table", &mut state).unwrap();
        resolver.resolve("Pine", "Chair", &mut state).unwrap();
        assert_eq!(state.externals.len(), 2);
        assert_eq!(state.files.len(), 2);

        let copies: Vec<(PathBuf, PathBuf)> = state
            .files
            .iter()
            .filter_map(|file| match file {
                PendingFile::Copy { from, to } => Some((from.clone(), to.clone())),
                PendingFile::Write { .. } => None,
            })
            .collect();
        assert_eq!(copies[0].0, dir.path().join("oak/wood.png"));
        assert_eq!(copies[0].1, out.join("oak_wood.png"));
        assert_eq!(copies[1].1, out.join("pine_wood.png"));
    }

    #[test]
    fn test_texture_file_name_keeps_one_extension() {
        let source = Path::new("assets/wood.png");
        assert_eq!(texture_file_name("wood", source), "wood.png");
        assert_eq!(texture_file_name("wood.png", source), "wood.png");
        assert_eq!(texture_file_name("wood.PNG", source), "wood.PNG");
        assert_eq!(texture_file_name("dir/wood", Path::new("noext")), "dir_wood");
    }

    #[test]
    fn test_project_dir_without_project_probes_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("Steel.tres"), "").unwrap();

        let scene = make_scene(vec![MaterialData::new("Steel")], vec![], dir.path());
        let config = ExportConfig {
            material_search_paths: MaterialSearchPaths::ProjectDir,
            ..ExportConfig::new(out.join("level.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);
        if resolver.project_root.is_some() {
            // A project file above the temp directory makes this case unreachable
            return;
        }

        let reference = resolver.resolve("Steel", "Cube", &mut state).unwrap();
        assert!(matches!(reference, Some(MaterialRef::External(_))));
        assert!(state.pool.is_empty());
        let section = state.externals.sections().next().unwrap().to_string();
        assert_eq!(section, "[ext_resource path=\"Steel.tres\" type=\"Material\" id=1]\n");
    }

    #[test]
    fn test_missing_image_leaves_uniform_unbound() {
        let dir = tempfile::tempdir().unwrap();
        let scene = make_scene(
            vec![textured("Wood", "wood")],
            vec![ImageData { name: "wood".into(), filepath: PathBuf::from("gone.png") }],
            dir.path(),
        );
        let config = ExportConfig {
            material_search_paths: MaterialSearchPaths::None,
            ..ExportConfig::new(dir.path().join("level.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        assert!(resolver.resolve("Wood", "Plank", &mut state).unwrap().is_some());
        assert!(state.files.is_empty());
        assert!(state.externals.is_empty());
    }

    #[test]
    fn test_generate_external_material_queues_tres() {
        let dir = tempfile::tempdir().unwrap();
        let scene = make_scene(vec![MaterialData::new("Paint")], vec![], dir.path());
        let config = ExportConfig {
            generate_external_material: true,
            material_search_paths: MaterialSearchPaths::ExportDir,
            ..ExportConfig::new(dir.path().join("level.escn"))
        };
        let mut state = ExportState::new();
        let mut resolver = MaterialResolver::new(&config, &scene);

        let reference = resolver.resolve("Paint", "Cube", &mut state).unwrap();
        assert!(matches!(reference, Some(MaterialRef::External(_))));
        assert!(state.pool.is_empty());

        let file = state.files.iter().next().unwrap();
        let PendingFile::Write { path, contents } = file else {
            panic!("expected a generated file");
        };
        assert!(path.ends_with("Paint.tres"));
        let text = String::from_utf8(contents.clone()).unwrap();
        assert!(text.starts_with("[gd_resource type=\"SpatialMaterial\" load_steps=1 format=2]\n"));
        assert!(text.contains("[resource]\nresource_name = \"Paint\"\n"));
    }

    #[test]
    fn test_spatial_reads_principled_defaults() {
        let material = MaterialData {
            node_tree: Some(ShaderNodeTree {
                nodes: vec![
                    ShaderNode::new("Material Output", ShaderNodeType::OutputMaterial),
                    ShaderNode::new("Principled BSDF", ShaderNodeType::BsdfPrincipled)
                        .with_input("Base Color", SocketValue::Color([0.1, 0.2, 0.3, 1.0]))
                        .with_input("Roughness", SocketValue::Float(0.9)),
                ],
                links: vec![ShaderLink::new("Principled BSDF", "BSDF", "Material Output", "Surface")],
            }),
            use_backface_culling: true,
            ..MaterialData::new("Matte")
        };
        let spatial = spatial_material(&material);
        assert_eq!(spatial.albedo, Color::new(0.1, 0.2, 0.3, 1.0));
        assert_eq!(spatial.roughness, 0.9);
        assert!(!spatial.cull_disabled);
        assert_eq!(spatial.emission, None);
    }
}
