//! Scene snapshots
//!
//! A [`SceneSnapshot`] is a complete, serde-loadable copy of a host scene.
//! Snapshot files are JSON or YAML; the format is picked from the extension.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use escn_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::Action;
use crate::armature::ArmatureData;
use crate::curve::CurveData;
use crate::material::{ImageData, MaterialData};
use crate::mesh::MeshData;
use crate::object::Object;
use crate::traits::{SceneSettings, SceneSource};

/// Snapshot file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Whole host scene held in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default)]
    pub scene: SceneSettings,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub meshes: Vec<MeshData>,
    #[serde(default)]
    pub armatures: Vec<ArmatureData>,
    #[serde(default)]
    pub materials: Vec<MaterialData>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub curves: Vec<CurveData>,
    #[serde(default)]
    pub images: Vec<ImageData>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
    #[serde(skip)]
    index: SnapshotIndex,
}

/// Name lookups built once after loading
#[derive(Debug, Clone, Default)]
struct SnapshotIndex {
    objects: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    roots: Vec<usize>,
    meshes: HashMap<String, usize>,
    armatures: HashMap<String, usize>,
    materials: HashMap<String, usize>,
    actions: HashMap<String, usize>,
    curves: HashMap<String, usize>,
    images: HashMap<String, usize>,
}

fn index_by_name<T>(items: &[T], name: impl Fn(&T) -> &str) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (name(item).to_string(), i))
        .collect()
}

impl SceneSnapshot {
    /// Load a snapshot file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading scene snapshot: {:?}", path);

        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scene snapshot {}", path.display()))?;
        let mut snapshot = Self::from_str_with_format(&text, SnapshotFormat::from_path(path))?;
        snapshot.base_dir = path.parent().map(Path::to_path_buf);
        Ok(snapshot)
    }

    /// Parse snapshot text
    pub fn from_str_with_format(text: &str, format: SnapshotFormat) -> Result<Self> {
        let snapshot: Self = match format {
            SnapshotFormat::Json => serde_json::from_str(text)
                .map_err(|e| Error::invalid_scene(format!("JSON: {e}")))?,
            SnapshotFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|e| Error::invalid_scene(format!("YAML: {e}")))?,
        };
        snapshot.indexed()
    }

    /// Build a snapshot from parts, validating object references
    pub fn new(scene: SceneSettings, objects: Vec<Object>) -> Result<Self> {
        Self {
            scene,
            objects,
            ..Self::default()
        }
        .indexed()
    }

    /// Rebuild lookups after the data vectors were edited
    pub fn indexed(mut self) -> Result<Self> {
        let mut seen = HashSet::new();
        for object in &self.objects {
            if !seen.insert(object.name.as_str()) {
                return Err(Error::invalid_scene(format!(
                    "duplicate object name '{}'",
                    object.name
                )));
            }
        }

        let objects = index_by_name(&self.objects, |o| &o.name);
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (i, object) in self.objects.iter().enumerate() {
            match &object.parent {
                Some(parent) if objects.contains_key(parent) => {
                    children.entry(parent.clone()).or_default().push(i);
                }
                Some(parent) => {
                    return Err(Error::invalid_scene(format!(
                        "object '{}' has unknown parent '{}'",
                        object.name, parent
                    )));
                }
                None => roots.push(i),
            }
        }

        self.check_parent_cycles(&objects)?;

        self.index = SnapshotIndex {
            objects,
            children,
            roots,
            meshes: index_by_name(&self.meshes, |m| &m.name),
            armatures: index_by_name(&self.armatures, |a| &a.name),
            materials: index_by_name(&self.materials, |m| &m.name),
            actions: index_by_name(&self.actions, |a| &a.name),
            curves: index_by_name(&self.curves, |c| &c.name),
            images: index_by_name(&self.images, |i| &i.name),
        };
        debug!(
            "Indexed snapshot '{}': {} objects, {} meshes, {} actions",
            self.scene.name,
            self.objects.len(),
            self.meshes.len(),
            self.actions.len()
        );
        Ok(self)
    }

    /// Set the directory relative image paths resolve against
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn check_parent_cycles(&self, objects: &HashMap<String, usize>) -> Result<()> {
        for object in &self.objects {
            let mut steps = 0;
            let mut current = object.parent.as_deref();
            while let Some(parent) = current {
                steps += 1;
                if steps > self.objects.len() {
                    return Err(Error::invalid_scene(format!(
                        "parent cycle through object '{}'",
                        object.name
                    )));
                }
                current = objects
                    .get(parent)
                    .and_then(|&i| self.objects[i].parent.as_deref());
            }
        }
        Ok(())
    }

    fn lookup<'a, T>(items: &'a [T], index: &HashMap<String, usize>, name: &str) -> Option<&'a T> {
        index.get(name).and_then(|&i| items.get(i))
    }
}

impl SceneSource for SceneSnapshot {
    fn settings(&self) -> &SceneSettings {
        &self.scene
    }

    fn root_objects(&self) -> Vec<&Object> {
        self.index.roots.iter().map(|&i| &self.objects[i]).collect()
    }

    fn children(&self, name: &str) -> Vec<&Object> {
        self.index
            .children
            .get(name)
            .map(|list| list.iter().map(|&i| &self.objects[i]).collect())
            .unwrap_or_default()
    }

    fn object(&self, name: &str) -> Option<&Object> {
        Self::lookup(&self.objects, &self.index.objects, name)
    }

    fn mesh(&self, name: &str) -> Option<&MeshData> {
        Self::lookup(&self.meshes, &self.index.meshes, name)
    }

    fn armature(&self, name: &str) -> Option<&ArmatureData> {
        Self::lookup(&self.armatures, &self.index.armatures, name)
    }

    fn material(&self, name: &str) -> Option<&MaterialData> {
        Self::lookup(&self.materials, &self.index.materials, name)
    }

    fn action(&self, name: &str) -> Option<&Action> {
        Self::lookup(&self.actions, &self.index.actions, name)
    }

    fn curve(&self, name: &str) -> Option<&CurveData> {
        Self::lookup(&self.curves, &self.index.curves, name)
    }

    fn image(&self, name: &str) -> Option<&ImageData> {
        Self::lookup(&self.images, &self.index.images, name)
    }

    fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    fn make_object(name: &str, parent: Option<&str>) -> Object {
        let mut object = Object::new(name, ObjectKind::Empty);
        object.parent = parent.map(str::to_string);
        object
    }

    #[test]
    fn test_children_keep_host_order() {
        let snapshot = SceneSnapshot::new(
            SceneSettings::default(),
            vec![
                make_object("Root", None),
                make_object("B", Some("Root")),
                make_object("A", Some("Root")),
                make_object("Other", None),
            ],
        )
        .unwrap();

        let roots: Vec<_> = snapshot.root_objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(roots, vec!["Root", "Other"]);
        let children: Vec<_> = snapshot.children("Root").iter().map(|o| o.name.as_str()).collect();
        assert_eq!(children, vec!["B", "A"]);
        let all: Vec<_> = snapshot.all_objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(all, vec!["Root", "B", "A", "Other"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = SceneSnapshot::new(
            SceneSettings::default(),
            vec![make_object("A", None), make_object("A", None)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let result = SceneSnapshot::new(SceneSettings::default(), vec![make_object("A", Some("Ghost"))]);
        assert!(matches!(result, Err(Error::InvalidScene { .. })));
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let result = SceneSnapshot::new(
            SceneSettings::default(),
            vec![make_object("A", Some("B")), make_object("B", Some("A"))],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a/scene.yml")), SnapshotFormat::Yaml);
        assert_eq!(SnapshotFormat::from_path(Path::new("scene.JSON")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::from_path(Path::new("scene")), SnapshotFormat::Json);
    }
}
