//! Actions, animation channels and NLA state

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Bisection steps when solving a bezier segment for time
const BEZIER_SOLVE_STEPS: usize = 24;

/// Named collection of animation channels
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    pub name: String,

    #[serde(default)]
    pub channels: Vec<Channel>,

    /// Explicit playback range; defaults to the key range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_range: Option<(f32, f32)>,

    /// Loop when played back
    #[serde(default)]
    pub cyclic: bool,
}

impl Action {
    /// Playback range in frames
    pub fn frame_range(&self) -> (f32, f32) {
        if let Some(range) = self.frame_range {
            return range;
        }
        let mut start = f32::MAX;
        let mut end = f32::MIN;
        for key in self.channels.iter().flat_map(|c| c.keyframes.iter()) {
            start = start.min(key.frame);
            end = end.max(key.frame);
        }
        if start > end {
            (0.0, 0.0)
        } else {
            (start, end)
        }
    }
}

/// One animated scalar: a property component of an object, bone or shape key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub target: ChannelTarget,
    pub property: ChannelProperty,
    /// Component index (x/y/z, or w/x/y/z for quaternions)
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub keyframes: Vec<HostKeyframe>,
}

impl Channel {
    /// Frames of all keys, in order
    pub fn key_frames(&self) -> impl Iterator<Item = f32> + '_ {
        self.keyframes.iter().map(|k| k.frame)
    }

    /// Evaluate the curve at a frame.
    ///
    /// Values before the first and after the last key hold constant.
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }

        let next = self.keyframes.partition_point(|k| k.frame <= frame);
        let k0 = &self.keyframes[next - 1];
        let k1 = &self.keyframes[next];
        let span = k1.frame - k0.frame;
        if span <= f32::EPSILON {
            return Some(k1.value);
        }
        let t = ((frame - k0.frame) / span).clamp(0.0, 1.0);

        Some(match k0.interpolation {
            HostInterpolation::Constant => k0.value,
            HostInterpolation::Bezier => bezier_segment(k0, k1, frame, t),
            // Easing curves are evaluated as straight segments
            _ => k0.value + (k1.value - k0.value) * t,
        })
    }
}

/// Cubic segment between two keys. Uses the authored handles when present,
/// otherwise flat tangents.
fn bezier_segment(k0: &HostKeyframe, k1: &HostKeyframe, frame: f32, t: f32) -> f32 {
    let (Some(out_handle), Some(in_handle)) = (k0.handle_right, k1.handle_left) else {
        let s = t * t * (3.0 - 2.0 * t);
        return k0.value + (k1.value - k0.value) * s;
    };

    let p0 = Vec2::new(k0.frame, k0.value);
    let p3 = Vec2::new(k1.frame, k1.value);
    // Handles may not overshoot the neighbouring key in time
    let p1 = Vec2::new(out_handle.x.clamp(p0.x, p3.x), out_handle.y);
    let p2 = Vec2::new(in_handle.x.clamp(p0.x, p3.x), in_handle.y);

    let point = |u: f32| {
        let v = 1.0 - u;
        p0 * (v * v * v) + p1 * (3.0 * v * v * u) + p2 * (3.0 * v * u * u) + p3 * (u * u * u)
    };

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    for _ in 0..BEZIER_SOLVE_STEPS {
        let mid = 0.5 * (lo + hi);
        if point(mid).x < frame {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    point(0.5 * (lo + hi)).y
}

/// What a channel animates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ChannelTarget {
    /// The object itself
    #[default]
    Object,
    /// A pose bone of an armature object
    Bone(String),
    /// A shape key of the object's mesh
    ShapeKey(String),
}

/// Animated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProperty {
    Location,
    RotationEuler,
    /// Components ordered w, x, y, z
    RotationQuaternion,
    Scale,
    /// Shape key influence
    Value,
    HideViewport,
}

impl ChannelProperty {
    /// Whether this property is part of the transform
    pub fn is_transform(self) -> bool {
        matches!(
            self,
            Self::Location | Self::RotationEuler | Self::RotationQuaternion | Self::Scale
        )
    }
}

/// Key on a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostKeyframe {
    pub frame: f32,
    pub value: f32,
    #[serde(default)]
    pub interpolation: HostInterpolation,
    /// Incoming bezier handle as (frame, value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_left: Option<Vec2>,
    /// Outgoing bezier handle as (frame, value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_right: Option<Vec2>,
}

impl HostKeyframe {
    /// Key with the given interpolation and no handles
    pub fn new(frame: f32, value: f32, interpolation: HostInterpolation) -> Self {
        Self {
            frame,
            value,
            interpolation,
            handle_left: None,
            handle_right: None,
        }
    }
}

/// Interpolation modes the host offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostInterpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
    Sine,
    Quad,
    Cubic,
    Quart,
    Quint,
    Expo,
    Circ,
    Back,
    Bounce,
    Elastic,
}

/// Animation state attached to an object or a shape key set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationData {
    /// Action currently assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nla_tracks: Vec<NlaTrack>,
}

/// NLA track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NlaTrack {
    pub name: String,
    #[serde(default)]
    pub mute: bool,
    /// Holds stashed actions rather than a real layer
    #[serde(default)]
    pub is_stash: bool,
    #[serde(default)]
    pub strips: Vec<NlaStrip>,
}

/// NLA strip playing one action
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NlaStrip {
    pub action: String,
    #[serde(default)]
    pub mute: bool,
}

impl AnimationData {
    /// Names of the actions to export, deduplicated, in a stable order:
    /// the active action, then live NLA strips, then (when requested) stashed
    /// tracks and muted strips.
    pub fn action_names(&self, include_stashed: bool) -> Vec<&str> {
        let strips = self.nla_tracks.iter().flat_map(|track| {
            track
                .strips
                .iter()
                .filter(move |strip| {
                    include_stashed || (!track.is_stash && !track.mute && !strip.mute)
                })
                .map(|strip| strip.action.as_str())
        });

        let mut names: Vec<&str> = Vec::new();
        for name in self.action.as_deref().into_iter().chain(strips) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_channel(keys: &[(f32, f32)], interpolation: HostInterpolation) -> Channel {
        Channel {
            target: ChannelTarget::Object,
            property: ChannelProperty::Location,
            index: 0,
            keyframes: keys
                .iter()
                .map(|&(frame, value)| HostKeyframe::new(frame, value, interpolation))
                .collect(),
        }
    }

    #[test]
    fn test_evaluate_linear() {
        let channel = make_channel(&[(0.0, 0.0), (10.0, 5.0)], HostInterpolation::Linear);
        assert_eq!(channel.evaluate(5.0), Some(2.5));
        assert_eq!(channel.evaluate(-3.0), Some(0.0));
        assert_eq!(channel.evaluate(20.0), Some(5.0));
    }

    #[test]
    fn test_evaluate_constant() {
        let channel = make_channel(&[(0.0, 1.0), (10.0, 5.0)], HostInterpolation::Constant);
        assert_eq!(channel.evaluate(9.9), Some(1.0));
        assert_eq!(channel.evaluate(10.0), Some(5.0));
    }

    #[test]
    fn test_evaluate_bezier_hits_keys() {
        let mut channel = make_channel(&[(0.0, 0.0), (10.0, 1.0)], HostInterpolation::Bezier);
        channel.keyframes[0].handle_right = Some(Vec2::new(3.0, 0.0));
        channel.keyframes[1].handle_left = Some(Vec2::new(7.0, 1.0));

        assert_eq!(channel.evaluate(0.0), Some(0.0));
        assert_eq!(channel.evaluate(10.0), Some(1.0));
        let mid = channel.evaluate(5.0).unwrap();
        assert!((mid - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_empty_channel() {
        let channel = make_channel(&[], HostInterpolation::Linear);
        assert_eq!(channel.evaluate(1.0), None);
    }

    #[test]
    fn test_action_frame_range() {
        let action = Action {
            name: "Walk".into(),
            channels: vec![
                make_channel(&[(5.0, 0.0), (20.0, 1.0)], HostInterpolation::Linear),
                make_channel(&[(1.0, 0.0)], HostInterpolation::Linear),
            ],
            frame_range: None,
            cyclic: false,
        };
        assert_eq!(action.frame_range(), (1.0, 20.0));
    }

    #[test]
    fn test_action_names_respect_stash() {
        let data = AnimationData {
            action: Some("Idle".into()),
            nla_tracks: vec![
                NlaTrack {
                    name: "Layer".into(),
                    strips: vec![
                        NlaStrip { action: "Walk".into(), mute: false },
                        NlaStrip { action: "Idle".into(), mute: false },
                        NlaStrip { action: "Jump".into(), mute: true },
                    ],
                    ..NlaTrack::default()
                },
                NlaTrack {
                    name: "[Action Stash]".into(),
                    is_stash: true,
                    strips: vec![NlaStrip { action: "Run".into(), mute: false }],
                    ..NlaTrack::default()
                },
            ],
        };

        assert_eq!(data.action_names(false), vec!["Idle", "Walk"]);
        assert_eq!(data.action_names(true), vec!["Idle", "Walk", "Jump", "Run"]);
    }

    #[test]
    fn test_channel_target_serde() {
        let json = r#"{"target": {"kind": "bone", "name": "Spine"}, "property": "rotation_quaternion", "index": 1}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.target, ChannelTarget::Bone("Spine".into()));
        assert!(channel.property.is_transform());
    }
}
