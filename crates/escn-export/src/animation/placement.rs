//! Animation player placement
//!
//! Clips are sampled with root-relative track paths. Placement decides which
//! node owns the player for each clip and rewrites track paths relative to
//! that owner (players use `root_node = ".."`).

use tracing::{debug, warn};

use super::{merge_by_name, AnimationClip};
use crate::config::AnimationMode;
use crate::paths::descendant_path;

/// Clips sampled for one node
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedNode {
    /// Root-relative node path
    pub path: String,
    pub clips: Vec<AnimationClip>,
}

/// An animation player to add below `owner`
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerNode {
    /// Root-relative path of the node the player is attached to
    pub owner: String,
    pub clips: Vec<AnimationClip>,
}

/// Nearest strict ancestor of `path` among `owners`
fn animated_ancestor<'o>(path: &str, owners: &'o [(String, String)]) -> Option<&'o str> {
    owners
        .iter()
        .filter(|(node, _)| node != path && descendant_path(node, path).is_some())
        .max_by_key(|(node, _)| node.len())
        .map(|(_, owner)| owner.as_str())
}

fn relocate(mut clip: AnimationClip, owner: &str) -> AnimationClip {
    clip.tracks.retain_mut(|track| match descendant_path(owner, &track.node) {
        Some(relative) => {
            track.node = relative;
            true
        }
        None => {
            warn!("Track {} is outside player owner '{}'", track.path(), owner);
            false
        }
    });
    clip
}

/// Decide player owners for the animated nodes of a walk.
///
/// `animated` must be in traversal order, so ancestors come before their
/// descendants. Players come out in the order their owners were first seen.
pub fn place_players(mode: AnimationMode, animated: Vec<AnimatedNode>) -> Vec<PlayerNode> {
    let mut players: Vec<PlayerNode> = Vec::new();
    let mut owners: Vec<(String, String)> = Vec::new();

    for node in animated {
        if node.clips.is_empty() {
            continue;
        }
        let owner = match mode {
            AnimationMode::Actions => node.path.clone(),
            AnimationMode::SceneAnimation => ".".to_string(),
            AnimationMode::SquashedActions => animated_ancestor(&node.path, &owners)
                .map_or_else(|| node.path.clone(), str::to_string),
        };
        debug!("Clips of '{}' go to the player on '{}'", node.path, owner);
        owners.push((node.path, owner.clone()));

        let clips: Vec<AnimationClip> = node
            .clips
            .into_iter()
            .map(|clip| relocate(clip, &owner))
            .collect();
        match players.iter_mut().find(|p| p.owner == owner) {
            Some(player) => player.clips.extend(clips),
            None => players.push(PlayerNode { owner, clips }),
        }
    }

    for player in &mut players {
        let clips = std::mem::take(&mut player.clips);
        player.clips = merge_by_name(clips);
    }
    players
}
