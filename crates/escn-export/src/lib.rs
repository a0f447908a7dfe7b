//! escn-export
//!
//! Turns a host scene into an `.escn` text scene.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`exporter`] | [`EscnExporter`] facade: validate, walk, serialize, write |
//! | [`walker`] | Depth-first traversal and node construction |
//! | [`node`] | Exported node tree and transform conversion |
//! | [`pool`] | Content-addressed resource interning |
//! | [`material`] | Material resolution and script shader generation |
//! | [`skeleton`] | Armatures to flat bone lists and skin mappings |
//! | [`animation`] | Channel sampling and player placement |
//! | [`resources`] | Resource payloads (meshes, materials, skins, curves) |
//! | [`serializer`] | Document assembly |
//! | [`escn`] | Text format values, sections and documents |
//! | [`writer`] | Atomic file output |
//!
//! # Example
//!
//! ```rust,ignore
//! use escn_export::{EscnExporter, ExportConfig};
//! use escn_scene::SceneSnapshot;
//!
//! let scene = SceneSnapshot::from_path("level.json")?;
//! let config = ExportConfig::new("game/levels/level.escn");
//! let summary = EscnExporter::new(&config).export(&scene)?;
//! println!("{} nodes", summary.nodes);
//! ```

pub mod animation;
pub mod config;
pub mod escn;
pub mod exporter;
pub mod external;
pub mod material;
pub mod node;
pub mod paths;
pub mod pool;
pub mod resources;
pub mod serializer;
pub mod skeleton;
pub mod state;
pub mod walker;
pub mod writer;

pub use config::{AnimationMode, ExportConfig, MaterialMode, MaterialSearchPaths};
pub use exporter::{EscnExporter, ExportSummary};
pub use pool::{Resource, ResourceHandle, ResourcePool};
pub use state::ExportState;
