//! Export options
//!
//! [`ExportConfig`] is a plain value built once per export. It loads from a
//! `config.json` (every field optional, missing fields take the defaults) and
//! the option enums parse from strings for command-line use.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use escn_core::{Error, Result, ResultExt};
use escn_scene::ObjectType;
use serde::{Deserialize, Serialize};

/// Where animation players are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimationMode {
    /// One player per animated node
    #[default]
    Actions,
    /// One player at the scene root
    SceneAnimation,
    /// Players fold into the nearest animated ancestor
    SquashedActions,
}

/// How materials are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialMode {
    /// Export no materials
    None,
    /// Fixed-function spatial materials
    Spatial,
    /// Shader materials generated from node trees
    #[default]
    ScriptShader,
}

/// Where existing material files are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialSearchPaths {
    /// Never reuse material files
    None,
    /// Look next to the exported file
    ExportDir,
    /// Look anywhere in the enclosing engine project
    #[default]
    ProjectDir,
}

fn normalize_option(s: &str) -> String {
    s.trim().to_uppercase().replace('-', "_")
}

impl std::str::FromStr for AnimationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "ACTIONS" => Ok(Self::Actions),
            "SCENE_ANIMATION" | "SCENE" => Ok(Self::SceneAnimation),
            "SQUASHED_ACTIONS" | "SQUASHED" => Ok(Self::SquashedActions),
            _ => Err(format!("Unknown animation mode: {s}")),
        }
    }
}

impl std::str::FromStr for MaterialMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "NONE" => Ok(Self::None),
            "SPATIAL" => Ok(Self::Spatial),
            "SCRIPT_SHADER" | "SHADER" => Ok(Self::ScriptShader),
            _ => Err(format!("Unknown material mode: {s}")),
        }
    }
}

impl std::str::FromStr for MaterialSearchPaths {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "NONE" => Ok(Self::None),
            "EXPORT_DIR" => Ok(Self::ExportDir),
            "PROJECT_DIR" => Ok(Self::ProjectDir),
            _ => Err(format!("Unknown material search path: {s}")),
        }
    }
}

/// Immutable option snapshot for one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Destination `.escn` file
    pub filepath: PathBuf,
    /// Object categories to export
    pub object_types: BTreeSet<ObjectType>,
    /// Only export objects visible in the active view
    pub use_visible_objects: bool,
    /// Only export selected objects
    pub use_export_selected: bool,
    /// Evaluate modifier stacks before exporting meshes
    pub use_mesh_modifiers: bool,
    /// Leave non-deforming bones out of skeletons
    pub use_exclude_ctrl_bone: bool,
    /// Export animation players and clips
    pub use_export_animation: bool,
    /// Export shape keys as blend shapes
    pub use_export_shape_key: bool,
    /// Also export stashed and muted NLA actions
    pub use_stashed_action: bool,
    /// Emit features that need a recent engine (skin resources)
    pub use_beta_features: bool,
    /// Write synthesized materials to their own `.tres` files
    pub generate_external_material: bool,
    pub animation_modes: AnimationMode,
    pub material_mode: MaterialMode,
    pub material_search_paths: MaterialSearchPaths,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filepath: PathBuf::new(),
            object_types: ObjectType::ALL.into_iter().collect(),
            use_visible_objects: true,
            use_export_selected: false,
            use_mesh_modifiers: true,
            use_exclude_ctrl_bone: true,
            use_export_animation: true,
            use_export_shape_key: true,
            use_stashed_action: true,
            use_beta_features: true,
            generate_external_material: false,
            animation_modes: AnimationMode::Actions,
            material_mode: MaterialMode::ScriptShader,
            material_search_paths: MaterialSearchPaths::ProjectDir,
        }
    }
}

impl ExportConfig {
    /// Defaults with an output path
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            ..Self::default()
        }
    }

    /// Load options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Parse options from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Same options with a different output path
    #[must_use]
    pub fn with_filepath(mut self, filepath: impl Into<PathBuf>) -> Self {
        self.filepath = filepath.into();
        self
    }

    /// Directory the scene file is written to
    pub fn export_dir(&self) -> PathBuf {
        match self.filepath.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Whether an object category is exported
    pub fn exports_type(&self, object_type: ObjectType) -> bool {
        self.object_types.contains(&object_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_exporter_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.object_types.len(), 5);
        assert!(config.use_visible_objects);
        assert!(!config.use_export_selected);
        assert!(config.use_exclude_ctrl_bone);
        assert!(!config.generate_external_material);
        assert_eq!(config.animation_modes, AnimationMode::Actions);
        assert_eq!(config.material_mode, MaterialMode::ScriptShader);
        assert_eq!(config.material_search_paths, MaterialSearchPaths::ProjectDir);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ExportConfig::from_json_str(
            r#"{ "animation_modes": "SCENE_ANIMATION", "object_types": ["GEOMETRY", "ARMATURE"] }"#,
        )
        .unwrap();

        assert_eq!(config.animation_modes, AnimationMode::SceneAnimation);
        assert!(config.exports_type(ObjectType::Geometry));
        assert!(!config.exports_type(ObjectType::Light));
        assert!(config.use_mesh_modifiers);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = ExportConfig::from_json_str(r#"{ "material_mode": "PBR" }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_option_from_str() {
        assert_eq!("squashed-actions".parse::<AnimationMode>(), Ok(AnimationMode::SquashedActions));
        assert_eq!("spatial".parse::<MaterialMode>(), Ok(MaterialMode::Spatial));
        assert_eq!("export_dir".parse::<MaterialSearchPaths>(), Ok(MaterialSearchPaths::ExportDir));
        assert!("later".parse::<AnimationMode>().is_err());
    }

    #[test]
    fn test_export_dir() {
        assert_eq!(ExportConfig::new("out/level.escn").export_dir(), PathBuf::from("out"));
        assert_eq!(ExportConfig::new("level.escn").export_dir(), PathBuf::from("."));
    }
}
