//! Node path and file path utilities

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Marker file at the root of an engine project
pub const PROJECT_FILE: &str = "project.godot";

/// Prefix of project-relative resource paths
pub const RESOURCE_PREFIX: &str = "res://";

/// Make an object name usable as a node name.
///
/// Characters with meaning in node paths become `_`.
pub fn sanitize_node_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '.' | ':' | '@' | '/' | '"' | '%' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "Node".to_string()
    } else {
        cleaned
    }
}

/// Make a data block name usable as a file name
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Path of a child node given its parent's path (`"."` is the root)
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "." {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn segments(path: &str) -> Vec<&str> {
    if path == "." {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// Node path leading from node `from` to node `to`; both root-relative
pub fn relative_node_path(from: &str, to: &str) -> String {
    let from = segments(from);
    let to = segments(to);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Path of `descendant` below `ancestor`, or `None` if it is not below it
pub fn descendant_path(ancestor: &str, descendant: &str) -> Option<String> {
    if ancestor == descendant {
        return Some(".".to_string());
    }
    if ancestor == "." {
        return Some(descendant.to_string());
    }
    descendant
        .strip_prefix(ancestor)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}

/// Absolute form of a path that may not exist yet
pub fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Nearest ancestor directory of `start` containing [`PROJECT_FILE`]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    absolute(start)
        .ancestors()
        .find(|dir| dir.join(PROJECT_FILE).is_file())
        .map(Path::to_path_buf)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// First file named `file_name` under `root`.
///
/// Directories are visited in sorted order and hidden ones are skipped, so
/// the result only depends on the tree's contents.
pub fn find_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name().to_str() == Some(file_name))
        .map(walkdir::DirEntry::into_path)
}

/// Relative path from directory `base` to `target`, with `/` separators
pub fn relative_file_path(target: &Path, base: &Path) -> Option<String> {
    let target = absolute(target);
    let base = absolute(base);
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    if target.first() != base.first() {
        return None;
    }

    let common = target.iter().zip(&base).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = vec!["..".to_string(); base.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    Some(parts.join("/"))
}

/// How the scene file should refer to `target`.
///
/// Inside the project this is a `res://` path, otherwise a path relative to
/// the scene's directory.
pub fn resource_path(target: &Path, scene_dir: &Path, project_root: Option<&Path>) -> String {
    if let Some(root) = project_root {
        let absolute_target = absolute(target);
        if let Ok(inside) = absolute_target.strip_prefix(absolute(root)) {
            let parts: Vec<String> = inside
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            return format!("{RESOURCE_PREFIX}{}", parts.join("/"));
        }
    }
    relative_file_path(target, scene_dir)
        .unwrap_or_else(|| target.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sanitize_node_name() {
        assert_eq!(sanitize_node_name("Cube.001"), "Cube_001");
        assert_eq!(sanitize_node_name("a:b@c/d\"e%f"), "a_b_c_d_e_f");
        assert_eq!(sanitize_node_name("  "), "Node");
    }

    #[test]
    fn test_relative_node_path() {
        assert_eq!(relative_node_path("Armature/Body", "Armature"), "..");
        assert_eq!(relative_node_path("A/B", "C/D"), "../../C/D");
        assert_eq!(relative_node_path("A", "A"), ".");
        assert_eq!(relative_node_path(".", "A/B"), "A/B");
        assert_eq!(relative_node_path("A/B", "."), "../..");
    }

    #[test]
    fn test_descendant_path() {
        assert_eq!(descendant_path(".", "A/B").as_deref(), Some("A/B"));
        assert_eq!(descendant_path("A", "A/B").as_deref(), Some("B"));
        assert_eq!(descendant_path("A", "A").as_deref(), Some("."));
        assert_eq!(descendant_path("A", "AB/C"), None);
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path(".", "Cube"), "Cube");
        assert_eq!(child_path("Cube", "Child"), "Cube/Child");
    }

    #[test]
    fn test_project_root_and_resource_path() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("game");
        let scenes = project.join("scenes");
        let materials = project.join("materials").join("metal");
        fs::create_dir_all(&scenes).unwrap();
        fs::create_dir_all(&materials).unwrap();
        fs::write(project.join(PROJECT_FILE), "").unwrap();
        fs::write(materials.join("Steel.tres"), "").unwrap();

        let root = find_project_root(&scenes).unwrap();
        assert_eq!(root, absolute(&project));

        let found = find_file(&root, "Steel.tres").unwrap();
        assert_eq!(
            resource_path(&found, &scenes, Some(&root)),
            "res://materials/metal/Steel.tres"
        );
        assert_eq!(resource_path(&found, &scenes, None), "../materials/metal/Steel.tres");
    }

    #[test]
    fn test_find_file_skips_hidden_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for sub in [".import", "b", "a"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("Mat.tres"), "").unwrap();
        }

        let found = find_file(dir.path(), "Mat.tres").unwrap();
        assert!(found.ends_with("a/Mat.tres"));
    }
}
