//! Animation clips and players
//!
//! Actions become [`AnimationClip`]s in two steps. [`sampling`] turns the
//! channels of one action into keyframe tracks on one node, and
//! [`placement`] decides which `AnimationPlayer` owns each clip and rewrites
//! the track paths relative to that player.

pub mod placement;
pub mod sampling;

use std::collections::BTreeMap;

use escn_core::TransformParts;
use escn_scene::{AnimationData, Object, SceneSource, ShapeKey};
use glam::Mat4;
use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::escn::Value;
use crate::node::TransformBasis;
use crate::pool::Fingerprinter;
use crate::resources::EscnResource;
use crate::skeleton::SkeletonBuild;

pub use placement::{place_players, AnimatedNode, PlayerNode};
pub use sampling::sample_action;

/// Track interpolation as the engine numbers it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Nearest = 0,
    Linear = 1,
    Cubic = 2,
}

impl Interpolation {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Keyframe at a time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key<T> {
    pub time: f32,
    pub value: T,
}

/// Keys of one track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackKeys {
    Transform(Vec<Key<TransformParts>>),
    Float(Vec<Key<f32>>),
    Bool(Vec<Key<bool>>),
}

impl TrackKeys {
    pub fn len(&self) -> usize {
        match self {
            Self::Transform(keys) => keys.len(),
            Self::Float(keys) => keys.len(),
            Self::Bool(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn times(&self) -> Vec<f32> {
        match self {
            Self::Transform(keys) => keys.iter().map(|k| k.time).collect(),
            Self::Float(keys) => keys.iter().map(|k| k.time).collect(),
            Self::Bool(keys) => keys.iter().map(|k| k.time).collect(),
        }
    }
}

/// What a track animates on its node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackProperty {
    /// Node transform, or a bone pose when `bone` is set
    Transform { bone: Option<String> },
    /// Weight of a blend shape
    BlendShape(String),
    Visible,
}

impl TrackProperty {
    /// Part after the `:` in the track path
    pub fn subname(&self) -> Option<String> {
        match self {
            Self::Transform { bone } => bone.clone(),
            Self::BlendShape(name) => Some(format!("blend_shapes/{name}")),
            Self::Visible => Some("visible".to_string()),
        }
    }

    fn track_type(&self) -> &'static str {
        match self {
            Self::Transform { .. } => "transform",
            Self::BlendShape(_) | Self::Visible => "value",
        }
    }
}

/// Keyframes for one property of one node
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    /// Node path; root-relative until placed, then relative to the player
    pub node: String,
    pub property: TrackProperty,
    pub interpolation: Interpolation,
    pub keys: TrackKeys,
}

impl AnimationTrack {
    /// `NodePath` text of the track
    pub fn path(&self) -> String {
        match self.property.subname() {
            Some(sub) => format!("{}:{sub}", self.node),
            None => self.node.clone(),
        }
    }

    fn keys_value(&self) -> Value {
        match &self.keys {
            TrackKeys::Transform(keys) => {
                let mut flat = Vec::with_capacity(keys.len() * 12);
                for key in keys {
                    let parts = &key.value;
                    flat.push(key.time);
                    // Transition
                    flat.push(1.0);
                    flat.extend(parts.location.to_array());
                    flat.extend(parts.rotation.to_array());
                    flat.extend(parts.scale.to_array());
                }
                Value::RealArray(flat)
            }
            TrackKeys::Float(keys) => value_keys(
                self.keys.times(),
                0,
                keys.iter().map(|k| Value::Float(k.value)).collect(),
            ),
            TrackKeys::Bool(keys) => value_keys(
                self.keys.times(),
                1,
                keys.iter().map(|k| Value::Bool(k.value)).collect(),
            ),
        }
    }

    fn properties(&self, index: usize) -> Vec<(String, Value)> {
        let prefix = format!("tracks/{index}");
        vec![
            (format!("{prefix}/type"), Value::str(self.property.track_type())),
            (format!("{prefix}/path"), Value::node_path(self.path())),
            (format!("{prefix}/interp"), Value::Int(self.interpolation.code())),
            (format!("{prefix}/loop_wrap"), Value::Bool(true)),
            (format!("{prefix}/imported"), Value::Bool(false)),
            (format!("{prefix}/enabled"), Value::Bool(true)),
            (format!("{prefix}/keys"), self.keys_value()),
        ]
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_str(&self.path());
        fp.write_str(self.property.track_type());
        fp.write_u32(self.interpolation as u32);
        match &self.keys {
            TrackKeys::Transform(keys) => {
                fp.write_usize(keys.len());
                for key in keys {
                    fp.write_f32(key.time);
                    fp.write_mat4(&key.value.to_matrix());
                }
            }
            TrackKeys::Float(keys) => {
                fp.write_usize(keys.len());
                for key in keys {
                    fp.write_f32(key.time);
                    fp.write_f32(key.value);
                }
            }
            TrackKeys::Bool(keys) => {
                fp.write_usize(keys.len());
                for key in keys {
                    fp.write_f32(key.time);
                    fp.write_bool(key.value);
                }
            }
        }
    }
}

/// Dictionary form of value track keys; `update` 1 is discrete
fn value_keys(times: Vec<f32>, update: i64, values: Vec<Value>) -> Value {
    let transitions = vec![1.0; times.len()];
    Value::Dict(vec![
        ("times".to_string(), Value::RealArray(times)),
        ("transitions".to_string(), Value::RealArray(transitions)),
        ("update".to_string(), Value::Int(update)),
        ("values".to_string(), Value::Array(values)),
    ])
}

/// One exported action
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub tracks: Vec<AnimationTrack>,
    /// Seconds
    pub length: f32,
    pub loop_enabled: bool,
    /// Editor snapping step, one frame
    pub step: f32,
}

impl AnimationClip {
    /// Fold another clip of the same name into this one
    pub fn merge(&mut self, other: Self) {
        self.length = self.length.max(other.length);
        self.loop_enabled |= other.loop_enabled;
        for track in other.tracks {
            let duplicate = self
                .tracks
                .iter()
                .any(|t| t.node == track.node && t.property == track.property);
            if duplicate {
                warn!("Clip '{}' animates {} twice; keeping the first track", self.name, track.path());
                continue;
            }
            self.tracks.push(track);
        }
    }
}

impl EscnResource for AnimationClip {
    fn type_name(&self) -> &'static str {
        "Animation"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> Vec<(String, Value)> {
        let mut props = vec![
            ("length".to_string(), Value::Float(self.length)),
            ("loop".to_string(), Value::Bool(self.loop_enabled)),
            ("step".to_string(), Value::Float(self.step)),
        ];
        for (i, track) in self.tracks.iter().enumerate() {
            props.extend(track.properties(i));
        }
        props
    }

    fn fingerprint(&self, fp: &mut Fingerprinter) {
        fp.write_str(&self.name);
        fp.write_f32(self.length);
        fp.write_bool(self.loop_enabled);
        fp.write_f32(self.step);
        fp.write_usize(self.tracks.len());
        for track in &self.tracks {
            track.fingerprint(fp);
        }
    }
}

/// Merge clips sharing a name, keeping first-seen order
pub fn merge_by_name(clips: impl IntoIterator<Item = AnimationClip>) -> Vec<AnimationClip> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: BTreeMap<String, AnimationClip> = BTreeMap::new();
    for clip in clips {
        match merged.get_mut(&clip.name) {
            Some(existing) => existing.merge(clip),
            None => {
                order.push(clip.name.clone());
                merged.insert(clip.name.clone(), clip);
            }
        }
    }
    order
        .into_iter()
        .filter_map(|name| merged.remove(&name))
        .collect()
}

/// Everything sampling needs to know about the animated node
#[derive(Debug, Clone)]
pub struct AnimationTarget<'a> {
    pub object: &'a Object,
    /// Root-relative node path
    pub node: &'a str,
    pub basis: TransformBasis,
    /// Engine-space local transform when not animated
    pub rest_local: Mat4,
    pub visible: bool,
    /// Skeleton of armature nodes
    pub skeleton: Option<&'a SkeletonBuild>,
    /// Blend shapes of mesh nodes
    pub blend_shapes: &'a [ShapeKey],
    /// Actions driving the mesh's shape key values
    pub shape_key_animation: Option<&'a AnimationData>,
}

/// Collects the clips of animated nodes
pub struct AnimationExporter<'a> {
    config: &'a ExportConfig,
    scene: &'a dyn SceneSource,
}

impl<'a> AnimationExporter<'a> {
    pub fn new(config: &'a ExportConfig, scene: &'a dyn SceneSource) -> Self {
        Self { config, scene }
    }

    /// Clips of one node, merged by action name
    pub fn export(&self, target: &AnimationTarget<'_>) -> Vec<AnimationClip> {
        let include_stashed = self.config.use_stashed_action;
        let mut names: Vec<&str> = target
            .object
            .animation
            .as_ref()
            .map(|a| a.action_names(include_stashed))
            .unwrap_or_default();
        if self.config.use_export_shape_key {
            if let Some(data) = target.shape_key_animation {
                for name in data.action_names(include_stashed) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }

        let settings = self.scene.settings();
        let mut clips = Vec::new();
        for name in names {
            let Some(action) = self.scene.action(name) else {
                warn!("Object '{}' uses missing action '{}'", target.object.name, name);
                continue;
            };
            match sample_action(action, target, settings.fps, self.config.use_export_shape_key) {
                Some(clip) => clips.push(clip),
                None => debug!("Action '{}' has nothing to animate on '{}'", name, target.node),
            }
        }
        merge_by_name(clips)
    }
}
