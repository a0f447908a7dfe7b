//! Export entry point
//!
//! [`EscnExporter`] runs one export: validate the destination, walk the
//! scene, place animation players, serialize, and only then write side files
//! and the scene itself. Nothing touches the disk before the walk succeeded.

use std::path::PathBuf;
use std::time::Instant;

use escn_core::{Error, Result, ValidationError};
use escn_scene::SceneSource;
use glam::Mat4;
use tracing::{debug, info};

use crate::animation::{place_players, PlayerNode};
use crate::config::ExportConfig;
use crate::node::{NodeKind, SceneNode};
use crate::paths::child_path;
use crate::pool::{Resource, ResourceKind};
use crate::serializer::{serialize, PlacedPlayer};
use crate::state::ExportState;
use crate::walker::SceneWalker;
use crate::writer::{atomic_write, probe_writable};

/// Base name of animation player nodes
pub const PLAYER_NAME: &str = "AnimationPlayer";

/// What an export produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    /// Nodes written, players included
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub animations: usize,
    pub players: usize,
    pub external_resources: usize,
    /// Material and texture files written next to the scene
    pub side_files: usize,
    pub bytes: usize,
}

/// Scene text plus everything needed to commit it
#[derive(Debug)]
pub struct RenderedScene {
    pub text: String,
    pub state: ExportState,
    pub nodes: usize,
    pub players: usize,
}

/// Exports scenes with one set of options
pub struct EscnExporter<'a> {
    config: &'a ExportConfig,
}

impl<'a> EscnExporter<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Fail early on a missing or unwritable destination
    pub fn validate(&self) -> Result<()> {
        if self.config.filepath.as_os_str().is_empty() {
            return Err(ValidationError::MissingFilepath.into());
        }
        let dir = self.config.export_dir();
        if !probe_writable(&dir) {
            return Err(ValidationError::UnwritableDestination(dir).into());
        }
        Ok(())
    }

    /// Build the scene text without writing anything
    pub fn render(&self, scene: &dyn SceneSource) -> Result<RenderedScene> {
        let mut state = ExportState::new();
        let walk = SceneWalker::new(self.config, scene).walk(&mut state)?;
        let mut root = walk.root;

        let players = if self.config.use_export_animation {
            let placed = place_players(self.config.animation_modes, walk.animated);
            attach_players(&mut root, placed, &mut state)?
        } else {
            Vec::new()
        };

        let document = serialize(&root, &players, &state)?;
        Ok(RenderedScene {
            text: document.to_string(),
            state,
            nodes: root.count() + players.len(),
            players: players.len(),
        })
    }

    /// Export a scene to the configured file
    pub fn export(&self, scene: &dyn SceneSource) -> Result<ExportSummary> {
        let started = Instant::now();
        self.validate()?;
        info!("Exporting '{}' to {:?}", scene.settings().name, self.config.filepath);

        let rendered = self.render(scene)?;
        let side_files = rendered.state.files.commit()?;
        atomic_write(&self.config.filepath, rendered.text.as_bytes())?;

        let pool = &rendered.state.pool;
        let summary = ExportSummary {
            path: self.config.filepath.clone(),
            nodes: rendered.nodes,
            meshes: pool.count(ResourceKind::Mesh),
            materials: pool.count(ResourceKind::Material),
            animations: pool.count(ResourceKind::Animation),
            players: rendered.players,
            external_resources: rendered.state.externals.len(),
            side_files,
            bytes: rendered.text.len(),
        };
        info!(
            "Exported {} nodes, {} resources and {} side files in {:?}",
            summary.nodes,
            pool.len(),
            side_files,
            started.elapsed()
        );
        Ok(summary)
    }
}

/// Intern clips and build player nodes below their owners.
///
/// Clips are interned here, after the walk, so they follow every other
/// resource in handle order.
fn attach_players(
    root: &mut SceneNode,
    players: Vec<PlayerNode>,
    state: &mut ExportState,
) -> Result<Vec<PlacedPlayer>> {
    let mut placed = Vec::with_capacity(players.len());
    for player in players {
        let owner = root
            .find_mut(&player.owner)
            .ok_or_else(|| Error::internal(format!("player owner '{}' is not a node", player.owner)))?;

        let clips: Vec<(String, _)> = player
            .clips
            .into_iter()
            .map(|clip| (clip.name.clone(), state.pool.intern(Resource::Animation(clip))))
            .collect();

        let name = owner.unique_child_name(PLAYER_NAME);
        let path = child_path(&owner.path, &name);
        debug!("Player '{}' with {} clips", path, clips.len());
        placed.push(PlacedPlayer {
            owner: player.owner,
            node: SceneNode {
                name,
                path,
                kind: NodeKind::AnimationPlayer(clips),
                transform: Mat4::IDENTITY,
                visible: true,
                children: Vec::new(),
            },
        });
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use escn_scene::SceneSnapshot;

    #[test]
    fn test_missing_filepath() {
        let config = ExportConfig::default();
        let err = EscnExporter::new(&config).validate().unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::MissingFilepath));
    }

    #[test]
    fn test_unwritable_destination() {
        let config = ExportConfig::new("/definitely/not/here/scene.escn");
        let err = EscnExporter::new(&config).validate().unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::UnwritableDestination(_))
        ));
    }

    #[test]
    fn test_empty_scene_exports_root_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::new(dir.path().join("empty.escn"));
        let scene = SceneSnapshot::default().indexed().unwrap();

        let summary = EscnExporter::new(&config).export(&scene).unwrap();
        assert_eq!(summary.nodes, 1);
        let text = std::fs::read_to_string(&summary.path).unwrap();
        assert_eq!(text, "[gd_scene load_steps=1 format=2]\n\n[node name=\"Scene\" type=\"Spatial\"]\n");
    }
}
