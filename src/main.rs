//! cubekit CLI
//!
//! Command-line interface for exporting scene descriptions as block models,
//! animations and UV templates.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use cubekit_anim::{sample_animation, SampleMode};
use cubekit_core::logging::{init_with_config, TracingConfig};
use cubekit_core::Error;
use cubekit_export::animation::{self, LoopMode};
use cubekit_export::model::{self, validate_document, ModelLoader, ModelMetadata};
use cubekit_export::{
    render_template, save_png, AnimationSettings, DocumentWriter, ExportRun, ExportSettings,
};
use cubekit_geometry::{build, BoneTree, SceneDescription, UvAssignment, UvMapper};

/// cubekit - block model and animation exporter
#[derive(Parser)]
#[command(name = "cubekit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Export settings file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format for reports
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
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export model, animations and (optionally) the UV template
    Export(ExportArgs),

    /// Write only the model document
    Model(ModelArgs),

    /// Sample one animation and write its document
    Animation(AnimationArgs),

    /// Print the UV assignment
    Uv(SceneArgs),

    /// Render the UV template image
    Template(TemplateArgs),

    /// Load and validate a model document
    Inspect(InspectArgs),
}

/// Scene input and the settings every command can override
#[derive(Args)]
struct SceneArgs {
    /// Scene description (YAML or JSON)
    scene: PathBuf,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Texture width in pixels
    #[arg(long)]
    texture_width: Option<u32>,

    /// Texture height in pixels (0 = automatic)
    #[arg(long)]
    texture_height: Option<u32>,

    /// Keep UV anchors already present in the scene
    #[arg(long)]
    keep_uv: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Also write the UV template
    #[arg(long)]
    template: bool,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args)]
struct ModelArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output file (defaults to <model>.geo.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AnimationArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Animation name
    #[arg(short, long, default_value = "animation")]
    name: String,

    /// First frame
    #[arg(long, default_value = "0")]
    start: i32,

    /// Last frame (inclusive)
    #[arg(long)]
    end: i32,

    /// Frame step
    #[arg(long, default_value = "1")]
    step: u32,

    /// Loop mode: none, loop, hold
    #[arg(long = "loop", default_value = "none")]
    loop_mode: String,

    /// Only sample frames with authored keys
    #[arg(long)]
    keyed_only: bool,

    /// Frames per second
    #[arg(long)]
    fps: Option<f64>,

    /// Output file (defaults to <model>.animation.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct TemplateArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output PNG (defaults to <model>.png)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    /// Model document
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_config(TracingConfig::for_verbosity(cli.verbose));

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Export(args) => cmd_export(args, config, cli.format),
        Commands::Model(args) => cmd_model(args, config),
        Commands::Animation(args) => cmd_animation(args, config),
        Commands::Uv(args) => cmd_uv(args, config, cli.format),
        Commands::Template(args) => cmd_template(args, config),
        Commands::Inspect(args) => cmd_inspect(args, cli.format),
    }
}

/// Settings file (or defaults) with command-line overrides applied
fn load_settings(config: Option<&Path>, args: &SceneArgs) -> Result<ExportSettings> {
    let mut settings = match config {
        Some(path) => ExportSettings::from_path(path)
            .with_context(|| format!("Failed to load settings {:?}", path))?,
        None => ExportSettings::default(),
    };

    if let Some(model) = &args.model {
        settings.model = model.clone();
    } else if config.is_none() {
        if let Some(stem) = args.scene.file_stem().and_then(|s| s.to_str()) {
            settings.model = stem.to_string();
        }
    }
    if let Some(width) = args.texture_width {
        settings.texture_width = width;
    }
    if let Some(height) = args.texture_height {
        settings.texture_height = Some(height);
    }
    if args.keep_uv {
        settings.uv.keep_existing = true;
    }

    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

/// Frame rate from the flag, then the settings file, then the rate the
/// scene was authored at
fn apply_frame_rate(
    settings: &mut ExportSettings,
    scene: &SceneDescription,
    fps: Option<f64>,
    config: Option<&Path>,
) -> Result<()> {
    match (fps, scene.animation.frame_rate) {
        (Some(fps), _) => settings.frame_rate = fps,
        (None, Some(rate)) if config.is_none() => settings.frame_rate = rate,
        _ => {}
    }
    settings.validate().context("Invalid frame rate")
}

fn load_scene(path: &Path) -> Result<SceneDescription> {
    info!("Loading scene: {:?}", path);
    SceneDescription::from_path(path).with_context(|| format!("Failed to load scene {:?}", path))
}

fn build_layout(scene: &SceneDescription, settings: &ExportSettings) -> Result<(BoneTree, UvAssignment)> {
    let tree = build(scene).context("Failed to build bone tree")?;
    let layout = UvMapper::new(settings.texture_width, settings.texture_height())
        .with_options(settings.uv.clone())
        .assign(&tree);
    report_warnings(&layout.warnings);
    Ok((tree, layout.value))
}

fn report_warnings(warnings: &[Error]) {
    for warning in warnings {
        warn!("{}", warning);
        eprintln!("warning: {}", warning);
    }
}

fn parse_loop_mode(text: &str) -> Result<LoopMode> {
    match text.to_lowercase().as_str() {
        "none" | "once" => Ok(LoopMode::None),
        "loop" | "true" => Ok(LoopMode::Loop),
        "hold" | "hold_on_last_frame" => Ok(LoopMode::HoldOnLastFrame),
        other => bail!("Unknown loop mode: {}", other),
    }
}

fn cmd_export(args: ExportArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut settings = load_settings(config, &args.scene)?;
    if args.template {
        settings.template = true;
    }
    if args.compact {
        settings.pretty = false;
    }
    let scene = load_scene(&args.scene.scene)?;
    apply_frame_rate(&mut settings, &scene, None, config)?;

    let report = ExportRun::new(&scene, &settings)
        .run(&args.output)
        .context("Export failed")?;
    report_warnings(&report.warnings);
    for (name, reason) in &report.skipped {
        eprintln!("skipped {}: {}", name, reason);
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "model": settings.model,
                "bones": report.bones,
                "cubes": report.cubes,
                "animations": report.animations,
                "skipped": report.skipped.iter().map(|(name, _)| name).collect::<Vec<_>>(),
                "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "written": report.written,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Export complete:");
            println!("  Bones:      {}", report.bones);
            println!("  Cubes:      {}", report.cubes);
            println!("  Animations: {}", report.animations);
            println!("  Warnings:   {}", report.warnings.len());
            for path in &report.written {
                println!("  Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

fn cmd_model(args: ModelArgs, config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config, &args.scene)?;
    let scene = load_scene(&args.scene.scene)?;
    let (tree, layout) = build_layout(&scene, &settings)?;

    let document = model::serialize(&tree, &layout, &ModelMetadata::new(&settings.model))
        .context("Failed to serialize model")?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.geo.json", settings.model)));
    DocumentWriter::new()
        .with_pretty(settings.pretty)
        .write(&document, &output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!("Wrote {} ({} bones)", output.display(), tree.len());
    Ok(())
}

fn cmd_animation(args: AnimationArgs, config: Option<&Path>) -> Result<()> {
    let mut settings = load_settings(config, &args.scene)?;
    let scene = load_scene(&args.scene.scene)?;
    apply_frame_rate(&mut settings, &scene, args.fps, config)?;
    let tree = build(&scene).context("Failed to build bone tree")?;

    let mut entry = AnimationSettings::new(&args.name, args.start, args.end);
    entry.step = args.step;
    entry.loop_mode = parse_loop_mode(&args.loop_mode)?;
    if args.keyed_only {
        entry.mode = SampleMode::SceneKeyframes;
    }

    let channels = sample_animation(&tree, &scene, &scene, &entry.request(&settings))
        .context("Failed to sample animation")?;
    let document = animation::serialize(&channels, &entry.options(&settings))
        .context("Failed to serialize animation")?;
    report_warnings(&document.warnings);

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.animation.json", settings.model)));
    DocumentWriter::new()
        .with_pretty(settings.pretty)
        .write(&document.value, &output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "Wrote {} ({} animated bones)",
        output.display(),
        channels.animated_bones().count()
    );
    Ok(())
}

fn cmd_uv(args: SceneArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let settings = load_settings(config, &args)?;
    let scene = load_scene(&args.scene)?;
    let (tree, layout) = build_layout(&scene, &settings)?;

    match format {
        OutputFormat::Json => {
            let cubes: Vec<_> = layout
                .cube_uvs()
                .map(|(id, uv)| {
                    serde_json::json!({
                        "bone": tree.bones()[id.bone].name,
                        "cube": id.cube,
                        "anchor": uv.anchor,
                        "mirror": uv.mirror,
                        "faces": uv.faces,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "texture_width": layout.texture_width,
                "texture_height": layout.texture_height,
                "required_width": layout.required_width,
                "required_height": layout.required_height,
                "cubes": cubes,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!(
                "Texture {}x{} (layout needs {}x{})",
                layout.texture_width,
                layout.texture_height,
                layout.required_width,
                layout.required_height
            );
            println!("{:<20} {:<6} {:<12} {}", "Bone", "Cube", "Anchor", "Footprint");
            println!("{:-<20} {:-<6} {:-<12} {:-<12}", "", "", "", "");
            for (id, uv) in layout.cube_uvs() {
                let footprint = uv.footprint();
                println!(
                    "{:<20} {:<6} {:<12} {}x{}",
                    tree.bones()[id.bone].name,
                    id.cube,
                    format!("{},{}", uv.anchor[0], uv.anchor[1]),
                    footprint.width(),
                    footprint.height()
                );
            }
        }
    }
    Ok(())
}

fn cmd_template(args: TemplateArgs, config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config, &args.scene)?;
    let scene = load_scene(&args.scene.scene)?;
    let (_, layout) = build_layout(&scene, &settings)?;

    let image = render_template(&layout).context("Failed to render template")?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.png", settings.model)));
    save_png(&image, &output).with_context(|| format!("Failed to write {:?}", output))?;

    println!("Wrote {} ({}x{})", output.display(), image.width(), image.height());
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let document = ModelLoader::from_path(&args.path)
        .with_context(|| format!("Failed to load {:?}", args.path))?;
    let validation = validate_document(&document);

    match format {
        OutputFormat::Json => {
            let geometry: Vec<_> = document
                .geometry
                .iter()
                .map(|geo| {
                    serde_json::json!({
                        "identifier": geo.description.identifier,
                        "texture_width": geo.description.texture_width,
                        "texture_height": geo.description.texture_height,
                        "bones": geo.bones.len(),
                        "cubes": geo.bones.iter().map(|b| b.cubes.len()).sum::<usize>(),
                    })
                })
                .collect();
            let json = serde_json::json!({
                "format_version": document.format_version,
                "geometry": geometry,
                "valid": validation.is_ok(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Model document: {:?}", args.path);
            println!("  Format version: {}", document.format_version);
            for geo in &document.geometry {
                let cubes: usize = geo.bones.iter().map(|b| b.cubes.len()).sum();
                println!("  {}", geo.description.identifier);
                println!(
                    "    Texture:  {}x{}",
                    geo.description.texture_width, geo.description.texture_height
                );
                println!("    Bones:    {}", geo.bones.len());
                println!("    Cubes:    {}", cubes);
            }
        }
    }

    validation.context("Model document is invalid")?;
    Ok(())
}
