//! Scene document assembly
//!
//! Emission order: header, external resources, internal resources in handle
//! order, the node tree in traversal order, then animation players.

use escn_core::Result;
use tracing::debug;

use crate::escn::Document;
use crate::node::{NodeKind, SceneNode};
use crate::pool::{ResourceHandle, ResourcePool};
use crate::state::ExportState;

/// Animation player node with the path of the node it hangs below
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPlayer {
    pub owner: String,
    pub node: SceneNode,
}

fn node_handles(kind: &NodeKind) -> Vec<ResourceHandle> {
    match kind {
        NodeKind::MeshInstance { mesh, skin, .. } => std::iter::once(*mesh).chain(*skin).collect(),
        NodeKind::Path(curve) => vec![*curve],
        NodeKind::AnimationPlayer(clips) => clips.iter().map(|(_, h)| *h).collect(),
        _ => Vec::new(),
    }
}

/// Every handle a node refers to must be interned
fn check_handles(node: &SceneNode, pool: &ResourcePool) -> Result<()> {
    for handle in node_handles(&node.kind) {
        pool.resolve(handle)?;
    }
    Ok(())
}

/// Build the scene document
pub fn serialize(root: &SceneNode, players: &[PlacedPlayer], state: &ExportState) -> Result<Document> {
    let mut doc = Document::scene();
    for section in state.externals.sections() {
        doc.push_ext_resource(section);
    }
    for (handle, resource) in state.pool.iter() {
        doc.push_sub_resource(resource.as_escn().to_section(handle.id()));
    }

    for node in root.iter() {
        check_handles(node, &state.pool)?;
    }
    for section in root.sections() {
        doc.push_body(section);
    }

    for player in players {
        check_handles(&player.node, &state.pool)?;
        doc.push_body(player.node.to_section(Some(&player.owner)));
    }

    debug!(
        "Serialized {} external, {} internal resources and {} nodes",
        state.externals.len(),
        state.pool.len(),
        root.count() + players.len()
    );
    Ok(doc)
}
