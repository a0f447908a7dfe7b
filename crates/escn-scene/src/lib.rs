//! escn-scene
//!
//! The host scene model consumed by the exporter.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`object`] | Objects, cameras, lights |
//! | [`mesh`] | Meshes, polygons, vertex groups, shape keys |
//! | [`armature`] | Bone hierarchies |
//! | [`material`] | Materials, shader node trees, images |
//! | [`action`] | Actions, channels, NLA tracks |
//! | [`curve`] | Bezier curves |
//! | [`modifiers`] | Modifier stacks and their evaluation |
//! | [`snapshot`] | JSON/YAML scene snapshots |
//!
//! # Example
//!
//! ```rust,ignore
//! use escn_scene::{SceneSnapshot, SceneSource};
//!
//! let scene = SceneSnapshot::from_path("level.json")?;
//! for object in scene.root_objects() {
//!     println!("{} ({})", object.name, object.kind.label());
//! }
//! ```

pub mod action;
pub mod armature;
pub mod curve;
pub mod material;
pub mod mesh;
pub mod modifiers;
pub mod object;
pub mod serde_helpers;
pub mod snapshot;
pub mod traits;

// Re-export main types
pub use action::{
    Action, AnimationData, Channel, ChannelProperty, ChannelTarget, HostInterpolation,
    HostKeyframe, NlaStrip, NlaTrack,
};
pub use armature::{ArmatureData, HostBone};
pub use curve::{BezierPoint, CurveData, Spline};
pub use material::{
    BlendMethod, ImageData, MappingType, MaterialData, MathOperation, MixBlend, ShaderLink,
    ShaderNode, ShaderNodeTree, ShaderNodeType, SocketValue,
};
pub use mesh::{GroupWeight, MeshData, Polygon, ShapeKey, Vertex};
pub use modifiers::{apply_modifiers, Axis, Modifier, ModifierKind};
pub use object::{CameraData, LightData, LightType, Object, ObjectKind, ObjectType, Projection};
pub use snapshot::{SceneSnapshot, SnapshotFormat};
pub use traits::{SceneSettings, SceneSource};
