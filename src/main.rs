//! escn-export CLI
//!
//! Command-line interface for exporting scene snapshots to `.escn` files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use escn_core::{convert_vector, BoundingBox};
use escn_export::{
    AnimationMode, EscnExporter, ExportConfig, ExportSummary, MaterialMode, MaterialSearchPaths,
};
use escn_scene::{ObjectType, SceneSnapshot, SceneSource};

/// Name of per-directory option files in batch mode
const CONFIG_FILE: &str = "config.json";

/// Export authored scenes to the Godot `.escn` format
#[derive(Parser)]
#[command(name = "escn-export")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for summaries
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export one scene snapshot
    Export(ExportArgs),

    /// Export every snapshot under a directory, mirroring the tree
    Batch(BatchArgs),

    /// Show a summary of a scene snapshot
    Info(InfoArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene snapshot (.json, .yaml)
    scene: PathBuf,

    /// Destination .escn file
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Args)]
struct BatchArgs {
    /// Directory of scene snapshots
    input: PathBuf,

    /// Directory receiving the exported tree
    #[arg(short, long)]
    output: PathBuf,

    /// Keep going after a scene fails
    #[arg(long)]
    keep_going: bool,

    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Args)]
struct InfoArgs {
    /// Scene snapshot (.json, .yaml)
    scene: PathBuf,
}

/// Export options; flags override the config file
#[derive(Args, Clone, Default)]
struct OptionArgs {
    /// JSON file with export options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Object types to export (comma separated)
    #[arg(long, value_delimiter = ',')]
    types: Vec<ObjectType>,

    /// Export hidden objects too
    #[arg(long)]
    include_hidden: bool,

    /// Only export selected objects
    #[arg(long)]
    selected_only: bool,

    /// Export meshes without evaluating modifiers
    #[arg(long)]
    no_modifiers: bool,

    /// Keep non-deforming bones
    #[arg(long)]
    keep_control_bones: bool,

    /// Skip animation
    #[arg(long)]
    no_animation: bool,

    /// Skip shape keys
    #[arg(long)]
    no_shape_keys: bool,

    /// Skip stashed and muted actions
    #[arg(long)]
    no_stashed_actions: bool,

    /// Do not emit skin resources
    #[arg(long)]
    no_beta: bool,

    /// Write materials to their own .tres files
    #[arg(long)]
    external_materials: bool,

    /// actions, scene-animation or squashed-actions
    #[arg(long)]
    animation_mode: Option<AnimationMode>,

    /// none, spatial or script-shader
    #[arg(long)]
    material_mode: Option<MaterialMode>,

    /// none, export-dir or project-dir
    #[arg(long)]
    material_search: Option<MaterialSearchPaths>,
}

impl OptionArgs {
    /// Apply command-line overrides on top of `config`
    fn apply(&self, mut config: ExportConfig) -> ExportConfig {
        if !self.types.is_empty() {
            config.object_types = self.types.iter().copied().collect();
        }
        if self.include_hidden {
            config.use_visible_objects = false;
        }
        if self.selected_only {
            config.use_export_selected = true;
        }
        if self.no_modifiers {
            config.use_mesh_modifiers = false;
        }
        if self.keep_control_bones {
            config.use_exclude_ctrl_bone = false;
        }
        if self.no_animation {
            config.use_export_animation = false;
        }
        if self.no_shape_keys {
            config.use_export_shape_key = false;
        }
        if self.no_stashed_actions {
            config.use_stashed_action = false;
        }
        if self.no_beta {
            config.use_beta_features = false;
        }
        if self.external_materials {
            config.generate_external_material = true;
        }
        if let Some(mode) = self.animation_mode {
            config.animation_modes = mode;
        }
        if let Some(mode) = self.material_mode {
            config.material_mode = mode;
        }
        if let Some(search) = self.material_search {
            config.material_search_paths = search;
        }
        config
    }

    /// Options from `--config` (or defaults) plus flags
    fn load(&self) -> Result<ExportConfig> {
        let base = match &self.config {
            Some(path) => ExportConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ExportConfig::default(),
        };
        Ok(self.apply(base))
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_thread_ids(verbosity >= 3)
        .with_file(verbosity >= 3)
        .with_line_number(verbosity >= 3)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Batch(args) => cmd_batch(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

fn load_scene(path: &Path) -> Result<SceneSnapshot> {
    if !path.exists() {
        bail!("File not found: {:?}", path);
    }
    SceneSnapshot::from_path(path).with_context(|| format!("Failed to load scene {}", path.display()))
}

fn export_scene(scene_path: &Path, config: &ExportConfig) -> Result<ExportSummary> {
    let scene = load_scene(scene_path)?;
    EscnExporter::new(config)
        .export(&scene)
        .with_context(|| format!("Failed to export {}", scene_path.display()))
}

fn summary_json(summary: &ExportSummary) -> serde_json::Value {
    serde_json::json!({
        "path": summary.path,
        "nodes": summary.nodes,
        "meshes": summary.meshes,
        "materials": summary.materials,
        "animations": summary.animations,
        "players": summary.players,
        "external_resources": summary.external_resources,
        "side_files": summary.side_files,
        "bytes": summary.bytes,
    })
}

fn print_summary(summary: &ExportSummary) {
    println!("Exported: {}", summary.path.display());
    println!("  Nodes:      {} ({} animation players)", summary.nodes, summary.players);
    println!("  Meshes:     {}", summary.meshes);
    println!("  Materials:  {} inline, {} external", summary.materials, summary.external_resources);
    println!("  Animations: {}", summary.animations);
    if summary.side_files > 0 {
        println!("  Side files: {}", summary.side_files);
    }
    println!("  Size:       {} bytes", summary.bytes);
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let config = args.options.load()?.with_filepath(&args.output);
    let summary = export_scene(&args.scene, &config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn is_snapshot(path: &Path) -> bool {
    let is_config = path.file_name().and_then(|n| n.to_str()) == Some(CONFIG_FILE);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    !is_config && matches!(ext.as_deref(), Some("json" | "yaml" | "yml"))
}

/// Options for scenes in `dir`: its `config.json` if present, then flags
fn directory_config(dir: &Path, options: &OptionArgs, cache: &mut HashMap<PathBuf, ExportConfig>) -> Result<ExportConfig> {
    if let Some(config) = cache.get(dir) {
        return Ok(config.clone());
    }
    let file = dir.join(CONFIG_FILE);
    let config = if file.is_file() {
        debug!("Using options from {:?}", file);
        let base = ExportConfig::from_json_file(&file)
            .with_context(|| format!("Failed to load config {}", file.display()))?;
        options.apply(base)
    } else {
        options.load()?
    };
    cache.insert(dir.to_path_buf(), config.clone());
    Ok(config)
}

fn cmd_batch(args: BatchArgs, format: OutputFormat) -> Result<()> {
    if !args.input.is_dir() {
        bail!("Not a directory: {:?}", args.input);
    }

    let scenes: Vec<PathBuf> = WalkDir::new(&args.input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && is_snapshot(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    info!("Found {} scenes under {:?}", scenes.len(), args.input);

    let mut configs = HashMap::new();
    let mut summaries = Vec::new();
    let mut failures = 0usize;

    for scene in &scenes {
        let relative = scene
            .strip_prefix(&args.input)
            .context("Scene outside the input directory")?;
        let output = args.output.join(relative).with_extension("escn");
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let dir = scene.parent().unwrap_or(&args.input);
        let config = directory_config(dir, &args.options, &mut configs)?.with_filepath(&output);

        match export_scene(scene, &config) {
            Ok(summary) => {
                if format == OutputFormat::Text {
                    println!("{} -> {}", relative.display(), summary.path.display());
                }
                summaries.push(summary);
            }
            Err(e) if args.keep_going => {
                error!("{:#}", e);
                failures += 1;
            }
            Err(e) => return Err(e),
        }
    }

    match format {
        OutputFormat::Json => {
            let list: Vec<_> = summaries.iter().map(summary_json).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            println!("Exported {} of {} scenes", summaries.len(), scenes.len());
        }
    }

    if failures > 0 {
        bail!("{} scenes failed to export", failures);
    }
    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.scene)?;
    let settings = scene.settings();

    let mut by_type: Vec<(ObjectType, usize)> = ObjectType::ALL.iter().map(|&t| (t, 0)).collect();
    for object in scene.all_objects() {
        if let Some(entry) = by_type.iter_mut().find(|(t, _)| *t == object.object_type()) {
            entry.1 += 1;
        }
    }
    let animated = scene.all_objects().iter().filter(|o| o.animation.is_some()).count();

    // Engine-space extents of each mesh data block
    let meshes: Vec<(&str, usize, usize, BoundingBox)> = scene
        .meshes
        .iter()
        .map(|mesh| {
            let points: Vec<_> = mesh.vertices.iter().map(|v| convert_vector(v.co)).collect();
            (mesh.name.as_str(), mesh.vertex_count(), mesh.polygons.len(), BoundingBox::from_points(&points))
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let types: serde_json::Map<String, serde_json::Value> = by_type
                .iter()
                .map(|(t, n)| (format!("{t:?}").to_lowercase(), serde_json::json!(n)))
                .collect();
            let json = serde_json::json!({
                "name": settings.name,
                "fps": settings.fps,
                "objects": types,
                "roots": scene.root_objects().len(),
                "animated_objects": animated,
                "meshes": meshes
                    .iter()
                    .map(|(name, vertices, polygons, bounds)| serde_json::json!({
                        "name": name,
                        "vertices": vertices,
                        "polygons": polygons,
                        "min": bounds.min.to_array(),
                        "max": bounds.max.to_array(),
                    }))
                    .collect::<Vec<_>>(),
                "armatures": scene.armatures.len(),
                "materials": scene.materials.len(),
                "actions": scene.actions.len(),
                "curves": scene.curves.len(),
                "images": scene.images.len(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Scene: {} ({} fps)", settings.name, settings.fps);
            println!("Objects:");
            for (object_type, count) in &by_type {
                println!("  {:<10} {}", format!("{object_type:?}"), count);
            }
            println!("  Roots:     {}", scene.root_objects().len());
            println!("  Animated:  {}", animated);
            println!("Data blocks:");
            println!("  Meshes:    {}", scene.meshes.len());
            for (name, vertices, polygons, bounds) in &meshes {
                let size = bounds.size();
                println!(
                    "    {:<20} {:>6} verts {:>6} faces  {:.3} x {:.3} x {:.3}",
                    name, vertices, polygons, size.x, size.y, size.z
                );
            }
            println!("  Armatures: {}", scene.armatures.len());
            println!("  Materials: {}", scene.materials.len());
            println!("  Actions:   {}", scene.actions.len());
            println!("  Curves:    {}", scene.curves.len());
            println!("  Images:    {}", scene.images.len());
        }
    }
    Ok(())
}
