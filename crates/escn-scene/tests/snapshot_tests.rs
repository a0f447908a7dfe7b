//! Tests for snapshot loading and modifier evaluation
//!
//! These tests cover:
//! - Loading JSON and YAML snapshot files from disk
//! - Data block lookups through the scene interface
//! - Modifier stacks preserving mesh invariants

use std::fs;

use escn_scene::{
    apply_modifiers, Axis, ChannelTarget, MeshData, Modifier, ModifierKind, ObjectKind,
    Polygon, SceneSnapshot, SceneSource, ShapeKey, Vertex,
};
use glam::Vec3;
use proptest::prelude::*;

const JSON_SCENE: &str = r#"{
    "scene": { "name": "Level", "fps": 30 },
    "objects": [
        { "name": "Rig", "type": "armature", "armature": "RigData" },
        { "name": "Body", "type": "mesh", "mesh": "BodyMesh", "parent": "Rig",
          "modifiers": [ { "name": "Armature", "type": "armature", "object": "Rig" } ],
          "animation": { "action": "Wave" } },
        { "name": "Sun", "type": "light", "light_type": "sun", "energy": 3.0 }
    ],
    "meshes": [
        { "name": "BodyMesh",
          "vertices": [ { "co": [0, 0, 0] }, { "co": [1, 0, 0] }, { "co": [0, 1, 0] } ],
          "polygons": [ { "vertices": [0, 1, 2] } ] }
    ],
    "armatures": [
        { "name": "RigData", "bones": [ { "name": "Root" }, { "name": "Arm", "parent": "Root" } ] }
    ],
    "actions": [
        { "name": "Wave", "channels": [
            { "target": { "kind": "bone", "name": "Arm" }, "property": "location", "index": 2,
              "keyframes": [ { "frame": 1, "value": 0 }, { "frame": 10, "value": 1 } ] } ] }
    ]
}"#;

const YAML_SCENE: &str = r"
scene:
  name: Yaml
objects:
  - name: Camera
    type: camera
    projection: orthographic
    ortho_scale: 5.0
  - name: Marker
    type: empty
    parent: Camera
";

/// Helper to create a flat grid mesh with a shape key
fn make_grid(columns: u32) -> MeshData {
    let mut vertices = Vec::new();
    for x in 0..=columns {
        for y in 0..=1 {
            vertices.push(Vertex::at(Vec3::new(x as f32, y as f32, 0.0)));
        }
    }
    let polygons = (0..columns)
        .map(|x| Polygon::new(vec![x * 2, x * 2 + 2, x * 2 + 3, x * 2 + 1]))
        .collect();
    let basis = vertices.iter().map(|v: &Vertex| v.co).collect();

    MeshData {
        name: "Grid".into(),
        vertices,
        polygons,
        shape_keys: vec![ShapeKey { name: "Basis".into(), positions: basis, ..ShapeKey::default() }],
        ..MeshData::default()
    }
}

mod loading_tests {
    use super::*;

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        fs::write(&path, JSON_SCENE).unwrap();

        let scene = SceneSnapshot::from_path(&path).unwrap();
        assert_eq!(scene.settings().name, "Level");
        assert_eq!(scene.settings().fps, 30.0);
        assert_eq!(scene.base_dir(), Some(dir.path()));

        let body = scene.object("Body").unwrap();
        assert_eq!(body.armature_binding(), Some("Rig"));
        assert_eq!(scene.children("Rig").len(), 1);
        assert_eq!(scene.mesh("BodyMesh").unwrap().vertex_count(), 3);
        assert_eq!(scene.armature("RigData").unwrap().bones.len(), 2);

        let wave = scene.action("Wave").unwrap();
        assert_eq!(wave.channels[0].target, ChannelTarget::Bone("Arm".into()));
        assert_eq!(wave.frame_range(), (1.0, 10.0));
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.yaml");
        fs::write(&path, YAML_SCENE).unwrap();

        let scene = SceneSnapshot::from_path(&path).unwrap();
        assert_eq!(scene.settings().name, "Yaml");
        match &scene.object("Camera").unwrap().kind {
            ObjectKind::Camera(camera) => assert_eq!(camera.ortho_scale, 5.0),
            other => panic!("expected camera, got {other:?}"),
        }
        assert_eq!(scene.children("Camera")[0].name, "Marker");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SceneSnapshot::from_path("/nonexistent/scene.json").unwrap_err();
        assert!(err.to_string().contains("reading scene snapshot"));
    }

    #[test]
    fn test_malformed_json_is_invalid_scene() {
        let err = SceneSnapshot::from_str_with_format("{ not json", escn_scene::SnapshotFormat::Json)
            .unwrap_err();
        assert!(matches!(err, escn_core::Error::InvalidScene { .. }));
    }
}

mod modifier_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_array_scales_counts(columns in 1u32..6, count in 1u32..5) {
            let grid = make_grid(columns);
            let result = apply_modifiers(
                &grid,
                &[Modifier::new("Array", ModifierKind::Array { count, offset: Vec3::X })],
            );
            prop_assert_eq!(result.vertex_count(), grid.vertex_count() * count as usize);
            prop_assert_eq!(result.polygons.len(), grid.polygons.len() * count as usize);
            prop_assert_eq!(result.shape_keys[0].positions.len(), result.vertex_count());
        }

        #[test]
        fn prop_indices_stay_in_bounds(columns in 1u32..6, mirror_first in any::<bool>()) {
            let mirror = Modifier::new("Mirror", ModifierKind::Mirror { axis: Axis::Y });
            let triangulate = Modifier::new("Triangulate", ModifierKind::Triangulate);
            let stack = if mirror_first {
                vec![mirror, triangulate]
            } else {
                vec![triangulate, mirror]
            };

            let result = apply_modifiers(&make_grid(columns), &stack);
            let count = result.vertex_count() as u32;
            prop_assert!(result.polygons.iter().all(|p| p.vertices.len() == 3));
            prop_assert!(result.polygons.iter().flat_map(|p| &p.vertices).all(|&i| i < count));
            prop_assert_eq!(result.triangle_count(), (columns as usize) * 4);
        }
    }
}
