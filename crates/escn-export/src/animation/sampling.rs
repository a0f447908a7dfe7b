//! Channel sampling
//!
//! Channels are sampled at their own key frames only. The channels of one
//! transform (location, rotation and scale components of the object or of
//! one bone) share a track whose key times are the union of theirs; every
//! component is evaluated at every time.

use escn_core::{convert_matrix, TransformParts};
use escn_scene::{Action, Channel, ChannelProperty, ChannelTarget, HostInterpolation};
use glam::{EulerRot, Mat4, Quat, Vec3};
use tracing::{debug, warn};

use super::{AnimationClip, AnimationTarget, AnimationTrack, Interpolation, Key, TrackKeys, TrackProperty};

/// Frames closer than this are one key
const FRAME_EPSILON: f32 = 1.0e-4;

/// Host interpolation to track interpolation
pub fn map_interpolation(host: HostInterpolation) -> Interpolation {
    match host {
        HostInterpolation::Constant => Interpolation::Nearest,
        HostInterpolation::Bezier => Interpolation::Cubic,
        _ => Interpolation::Linear,
    }
}

/// Common interpolation of a channel group; mixed groups are linear
fn group_interpolation<'c>(channels: impl IntoIterator<Item = &'c Channel>) -> Interpolation {
    let mut found: Option<Interpolation> = None;
    for key in channels.into_iter().flat_map(|c| c.keyframes.iter()) {
        let mapped = map_interpolation(key.interpolation);
        match found {
            None => found = Some(mapped),
            Some(existing) if existing != mapped => return Interpolation::Linear,
            Some(_) => {}
        }
    }
    found.unwrap_or(Interpolation::Linear)
}

/// Sorted, deduplicated key frames of a group inside the playback range
fn key_frames<'c>(channels: impl IntoIterator<Item = &'c Channel>, start: f32, end: f32) -> Vec<f32> {
    let mut frames: Vec<f32> = channels
        .into_iter()
        .flat_map(|c| c.key_frames())
        .filter(|&f| f >= start - FRAME_EPSILON && f <= end + FRAME_EPSILON)
        .collect();
    frames.sort_by(f32::total_cmp);
    frames.dedup_by(|a, b| (*a - *b).abs() <= FRAME_EPSILON);
    frames
}

/// Animated transform components on top of a base pose
struct TransformChannels<'c> {
    channels: Vec<&'c Channel>,
    location: Vec3,
    euler: Vec3,
    quaternion: Quat,
    scale: Vec3,
    use_quaternion: bool,
}

impl<'c> TransformChannels<'c> {
    fn new(channels: Vec<&'c Channel>, base: Mat4) -> Self {
        let (scale, rotation, location) = base.to_scale_rotation_translation();
        let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
        let use_quaternion = channels
            .iter()
            .any(|c| c.property == ChannelProperty::RotationQuaternion);
        Self {
            channels,
            location,
            euler: Vec3::new(x, y, z),
            quaternion: rotation,
            scale,
            use_quaternion,
        }
    }

    fn component(&self, property: ChannelProperty, index: usize, frame: f32, base: f32) -> f32 {
        self.channels
            .iter()
            .find(|c| c.property == property && c.index == index)
            .and_then(|c| c.evaluate(frame))
            .unwrap_or(base)
    }

    fn vector(&self, property: ChannelProperty, frame: f32, base: Vec3) -> Vec3 {
        Vec3::new(
            self.component(property, 0, frame, base.x),
            self.component(property, 1, frame, base.y),
            self.component(property, 2, frame, base.z),
        )
    }

    /// Host-space transform at a frame
    fn matrix_at(&self, frame: f32) -> Mat4 {
        let location = self.vector(ChannelProperty::Location, frame, self.location);
        let scale = self.vector(ChannelProperty::Scale, frame, self.scale);
        let rotation = if self.use_quaternion {
            let base = self.quaternion;
            let w = self.component(ChannelProperty::RotationQuaternion, 0, frame, base.w);
            let x = self.component(ChannelProperty::RotationQuaternion, 1, frame, base.x);
            let y = self.component(ChannelProperty::RotationQuaternion, 2, frame, base.y);
            let z = self.component(ChannelProperty::RotationQuaternion, 3, frame, base.z);
            let q = Quat::from_xyzw(x, y, z, w);
            if q.length_squared() > f32::EPSILON {
                q.normalize()
            } else {
                Quat::IDENTITY
            }
        } else {
            let e = self.vector(ChannelProperty::RotationEuler, frame, self.euler);
            Quat::from_euler(EulerRot::ZYX, e.z, e.y, e.x)
        };
        Mat4::from_scale_rotation_translation(scale, rotation, location)
    }
}

/// Timing of one action
#[derive(Debug, Clone, Copy)]
struct Timeline {
    start: f32,
    end: f32,
    fps: f32,
}

impl Timeline {
    fn time(&self, frame: f32) -> f32 {
        ((frame - self.start) / self.fps).max(0.0)
    }
}

fn transform_track(
    node: &str,
    bone: Option<String>,
    channels: Vec<&Channel>,
    timeline: Timeline,
    base: Mat4,
    to_engine: impl Fn(Mat4) -> Mat4,
    rest: &TransformParts,
) -> Option<AnimationTrack> {
    let frames = key_frames(channels.iter().copied(), timeline.start, timeline.end);
    if frames.is_empty() {
        return None;
    }
    let interpolation = group_interpolation(channels.iter().copied());
    let sampler = TransformChannels::new(channels, base);

    let keys: Vec<Key<TransformParts>> = frames
        .iter()
        .map(|&frame| Key {
            time: timeline.time(frame),
            value: TransformParts::from_matrix(&to_engine(sampler.matrix_at(frame))),
        })
        .collect();
    if keys.iter().all(|k| k.value.approx_eq(rest)) {
        debug!("Dropping static transform track on {node}");
        return None;
    }

    Some(AnimationTrack {
        node: node.to_string(),
        property: TrackProperty::Transform { bone },
        interpolation,
        keys: TrackKeys::Transform(keys),
    })
}

fn visible_track(node: &str, channel: &Channel, timeline: Timeline, rest: bool) -> Option<AnimationTrack> {
    let frames = key_frames([channel], timeline.start, timeline.end);
    let keys: Vec<Key<bool>> = frames
        .iter()
        .filter_map(|&frame| {
            channel.evaluate(frame).map(|hidden| Key {
                time: timeline.time(frame),
                value: hidden < 0.5,
            })
        })
        .collect();
    if keys.is_empty() || keys.iter().all(|k| k.value == rest) {
        return None;
    }
    Some(AnimationTrack {
        node: node.to_string(),
        property: TrackProperty::Visible,
        interpolation: Interpolation::Nearest,
        keys: TrackKeys::Bool(keys),
    })
}

fn blend_shape_track(
    node: &str,
    key_name: &str,
    channel: &Channel,
    timeline: Timeline,
    rest: f32,
) -> Option<AnimationTrack> {
    let frames = key_frames([channel], timeline.start, timeline.end);
    let keys: Vec<Key<f32>> = frames
        .iter()
        .filter_map(|&frame| {
            channel.evaluate(frame).map(|value| Key {
                time: timeline.time(frame),
                value,
            })
        })
        .collect();
    if keys.is_empty() || keys.iter().all(|k| escn_core::approx_eq(k.value, rest)) {
        return None;
    }
    Some(AnimationTrack {
        node: node.to_string(),
        property: TrackProperty::BlendShape(key_name.to_string()),
        interpolation: group_interpolation([channel]),
        keys: TrackKeys::Float(keys),
    })
}

/// Channels of an action sorted by what they drive, in first-seen order
#[derive(Default)]
struct ChannelGroups<'c> {
    object_transform: Vec<&'c Channel>,
    visibility: Option<&'c Channel>,
    bones: Vec<(&'c str, Vec<&'c Channel>)>,
    shape_keys: Vec<(&'c str, &'c Channel)>,
}

impl<'c> ChannelGroups<'c> {
    fn new(action: &'c Action) -> Self {
        let mut groups = Self::default();
        for channel in &action.channels {
            match (&channel.target, channel.property) {
                (ChannelTarget::Object, ChannelProperty::HideViewport) => {
                    groups.visibility.get_or_insert(channel);
                }
                (ChannelTarget::Object, property) if property.is_transform() => {
                    groups.object_transform.push(channel);
                }
                (ChannelTarget::Bone(bone), property) if property.is_transform() => {
                    match groups.bones.iter_mut().find(|(name, _)| name == bone) {
                        Some((_, channels)) => channels.push(channel),
                        None => groups.bones.push((bone.as_str(), vec![channel])),
                    }
                }
                (ChannelTarget::ShapeKey(key), ChannelProperty::Value) => {
                    if !groups.shape_keys.iter().any(|(name, _)| name == key) {
                        groups.shape_keys.push((key.as_str(), channel));
                    }
                }
                (target, property) => {
                    debug!("Action '{}': ignoring {:?} channel on {:?}", action.name, property, target);
                }
            }
        }
        groups
    }
}

/// Sample one action for one node.
///
/// Returns `None` when nothing in the action animates the node.
pub fn sample_action(
    action: &Action,
    target: &AnimationTarget<'_>,
    fps: f32,
    shape_keys: bool,
) -> Option<AnimationClip> {
    let fps = if fps > 0.0 { fps } else { 24.0 };
    let (start, end) = action.frame_range();
    let timeline = Timeline { start, end, fps };
    let groups = ChannelGroups::new(action);
    let node = target.node;
    let mut tracks = Vec::new();

    if !groups.object_transform.is_empty() {
        let rest = TransformParts::from_matrix(&target.rest_local);
        let basis = target.basis;
        tracks.extend(transform_track(
            node,
            None,
            groups.object_transform,
            timeline,
            target.object.matrix_local,
            |m| basis.engine_local(m),
            &rest,
        ));
    }

    if let Some(channel) = groups.visibility {
        tracks.extend(visible_track(node, channel, timeline, target.visible));
    }

    for (bone, channels) in groups.bones {
        let Some(skeleton) = target.skeleton else {
            warn!("Action '{}' animates bone '{}' of non-armature '{}'", action.name, bone, node);
            continue;
        };
        if skeleton.bone_index(bone).is_none() {
            warn!("Action '{}' animates bone '{}' missing from '{}'", action.name, bone, node);
            continue;
        }
        tracks.extend(transform_track(
            node,
            Some(bone.to_string()),
            channels,
            timeline,
            Mat4::IDENTITY,
            convert_matrix,
            &TransformParts::IDENTITY,
        ));
    }

    for (key, channel) in groups.shape_keys {
        if !shape_keys {
            debug!("Skipping shape key channel '{}' of action '{}'", key, action.name);
            continue;
        }
        let Some(shape) = target.blend_shapes.iter().find(|s| s.name == key) else {
            warn!("Action '{}' animates missing shape key '{}' on '{}'", action.name, key, node);
            continue;
        };
        tracks.extend(blend_shape_track(node, key, channel, timeline, shape.value));
    }

    if tracks.is_empty() {
        return None;
    }
    Some(AnimationClip {
        name: action.name.clone(),
        tracks,
        length: ((end - start) / fps).max(0.0),
        loop_enabled: action.cyclic,
        step: 1.0 / fps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use escn_scene::{HostKeyframe, Object, ObjectKind, ShapeKey};

    use crate::node::TransformBasis;

    fn make_channel(target: ChannelTarget, property: ChannelProperty, index: usize, keys: &[(f32, f32)]) -> Channel {
        Channel {
            target,
            property,
            index,
            keyframes: keys
                .iter()
                .map(|&(frame, value)| HostKeyframe::new(frame, value, HostInterpolation::Linear))
                .collect(),
        }
    }

    fn make_target<'a>(object: &'a Object, shapes: &'a [ShapeKey]) -> AnimationTarget<'a> {
        AnimationTarget {
            object,
            node: "Cube",
            basis: TransformBasis::ROOT,
            rest_local: Mat4::IDENTITY,
            visible: true,
            skeleton: None,
            blend_shapes: shapes,
            shape_key_animation: None,
        }
    }

    #[test]
    fn test_key_times_are_union_of_components() {
        let object = Object::new("Cube", ObjectKind::Empty);
        let action = Action {
            name: "Move".into(),
            channels: vec![
                make_channel(ChannelTarget::Object, ChannelProperty::Location, 0, &[(1.0, 0.0), (25.0, 2.0)]),
                make_channel(ChannelTarget::Object, ChannelProperty::Location, 1, &[(13.0, 1.0)]),
            ],
            frame_range: None,
            cyclic: true,
        };
        let clip = sample_action(&action, &make_target(&object, &[]), 24.0, true).unwrap();

        assert_eq!(clip.length, 1.0);
        assert!(clip.loop_enabled);
        assert_eq!(clip.tracks.len(), 1);
        let TrackKeys::Transform(keys) = &clip.tracks[0].keys else {
            panic!("expected transform keys");
        };
        let times: Vec<f32> = keys.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        // Host x stays x, host y becomes engine -z
        assert!(keys[1].value.location.abs_diff_eq(Vec3::new(1.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_static_track_is_dropped() {
        let object = Object::new("Cube", ObjectKind::Empty);
        let action = Action {
            name: "Still".into(),
            channels: vec![make_channel(
                ChannelTarget::Object,
                ChannelProperty::Scale,
                0,
                &[(1.0, 1.0), (10.0, 1.0)],
            )],
            ..Action::default()
        };
        assert!(sample_action(&action, &make_target(&object, &[]), 24.0, true).is_none());
    }

    #[test]
    fn test_visibility_and_shape_keys() {
        let object = Object::new("Face", ObjectKind::Empty);
        let shapes = vec![ShapeKey { name: "Smile".into(), ..ShapeKey::default() }];
        let action = Action {
            name: "Blink".into(),
            channels: vec![
                make_channel(ChannelTarget::Object, ChannelProperty::HideViewport, 0, &[(1.0, 0.0), (5.0, 1.0)]),
                make_channel(ChannelTarget::ShapeKey("Smile".into()), ChannelProperty::Value, 0, &[(1.0, 0.0), (5.0, 1.0)]),
                make_channel(ChannelTarget::ShapeKey("Frown".into()), ChannelProperty::Value, 0, &[(1.0, 0.0), (5.0, 1.0)]),
            ],
            ..Action::default()
        };
        let clip = sample_action(&action, &make_target(&object, &shapes), 24.0, true).unwrap();

        assert_eq!(clip.tracks.len(), 2);
        assert_eq!(clip.tracks[0].property, TrackProperty::Visible);
        assert_eq!(clip.tracks[0].interpolation, Interpolation::Nearest);
        assert_eq!(clip.tracks[1].path(), "Cube:blend_shapes/Smile");

        let without_keys = sample_action(&action, &make_target(&object, &shapes), 24.0, false).unwrap();
        assert_eq!(without_keys.tracks.len(), 1);
    }

    #[test]
    fn test_bone_channels_need_a_skeleton() {
        let object = Object::new("Cube", ObjectKind::Empty);
        let action = Action {
            name: "Wave".into(),
            channels: vec![make_channel(
                ChannelTarget::Bone("Arm".into()),
                ChannelProperty::Location,
                2,
                &[(1.0, 0.0), (10.0, 1.0)],
            )],
            ..Action::default()
        };
        assert!(sample_action(&action, &make_target(&object, &[]), 24.0, true).is_none());
    }

    #[test]
    fn test_interpolation_mapping() {
        assert_eq!(map_interpolation(HostInterpolation::Constant), Interpolation::Nearest);
        assert_eq!(map_interpolation(HostInterpolation::Bezier), Interpolation::Cubic);
        assert_eq!(map_interpolation(HostInterpolation::Elastic), Interpolation::Linear);
    }
}
