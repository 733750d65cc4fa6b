//! Command line front end for inspecting and editing saved VisBio state.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use visbio::command::CommandError;
use visbio::config::AppConfig;
use visbio::geometry;
use visbio::import::{self, DatasetRequest, ImportError};
use visbio::state::{self, AppState, DisplayState, StateError};
use visbio::task::{TaskError, TaskQueue};
use visbio::transform::TransformError;
use visbio::view::{MemoryDisplay, ViewHandler};
use visbio::ViewCommand;

#[derive(Parser)]
#[command(name = "visbio-view", about = "Inspect and edit saved VisBio view state")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the transforms and displays of a state file
    Show(ShowArgs),
    /// Apply view commands to one display of a state file
    Apply(ApplyArgs),
    /// Find the polyline segment nearest to a point
    Nearest(NearestArgs),
    /// Infer a file pattern from a file and its siblings
    FindPattern(FindPatternArgs),
    /// Import a dataset into a state file
    Import(ImportArgs),
    /// Compare two state files
    Diff(DiffArgs),
}

#[derive(Args)]
struct ShowArgs {
    /// State file
    state: PathBuf,
}

#[derive(Args)]
struct ApplyArgs {
    /// State file
    state: PathBuf,
    /// Display to operate on
    #[arg(short, long)]
    display: String,
    /// Commands such as zoom-in, rotate-left, aspect=1,1,0.5 or scale=on
    #[arg(required = true)]
    commands: Vec<String>,
    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct NearestArgs {
    /// Query point, e.g. 1.5,2
    #[arg(short, long)]
    point: String,
    /// Polyline nodes, e.g. "0,0 4,0 4,3"
    #[arg(required = true)]
    nodes: Vec<String>,
}

#[derive(Args)]
struct FindPatternArgs {
    /// One file of the series
    file: PathBuf,
}

#[derive(Args)]
struct ImportArgs {
    /// State file to add the dataset to (created if missing)
    state: PathBuf,
    /// Folder holding the files, relative to the configured import folder
    dir: PathBuf,
    /// File pattern, e.g. plane<01-40>.tif
    pattern: String,
    /// Dataset name (defaults to the pattern)
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    micron_width: Option<f64>,
    #[arg(long)]
    micron_height: Option<f64>,
    #[arg(long)]
    micron_step: Option<f64>,
}

#[derive(Args)]
struct DiffArgs {
    old: PathBuf,
    new: PathBuf,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("No display named '{0}'")]
    UnknownDisplay(String),

    #[error("Invalid coordinates '{0}'")]
    Coordinates(String),

    #[error("Nodes and point must have the same dimension")]
    DimensionMismatch,

    #[error("Import finished without a result")]
    NoResult,
}

type Result<T> = std::result::Result<T, CliError>;

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load_from_default_path(),
    }
    .unwrap_or_default();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        config.preferences.log_level.to_level_filter()
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match &cli.command {
        Commands::Show(args) => show(args),
        Commands::Apply(args) => apply(args, &config),
        Commands::Nearest(args) => nearest(args),
        Commands::FindPattern(args) => find_pattern(args),
        Commands::Import(args) => import_dataset(args, &config),
        Commands::Diff(args) => diff(args),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn show(args: &ShowArgs) -> Result<()> {
    let state = AppState::load_from_file(&args.state)?;

    println!("Transforms:");
    for transform in state.transforms.iter() {
        let selected = if state.transforms.selected_id() == Some(transform.id) {
            "*"
        } else {
            " "
        };
        let parent = transform
            .parent
            .map_or_else(String::new, |p| format!(" <- {}", p));
        print!(
            "{} {:>3} {:<24} {}{}",
            selected,
            transform.id,
            transform.name,
            transform.kind.display_name(),
            parent
        );
        match state.transforms.image_info(transform.id) {
            Some(info) => println!("  [{}x{}x{}]", info.width, info.height, info.slices),
            None => println!(),
        }
    }

    println!("Displays:");
    for display in &state.displays {
        let links: Vec<String> = display.links.iter().map(|l| l.to_string()).collect();
        println!(
            "  {} ({}D) links [{}]",
            display.name,
            display.mode.dims(),
            links.join(", ")
        );
        let view = &display.view;
        match &view.matrix {
            Some(m) => println!("    matrix  {}", m),
            None => println!("    matrix  (default)"),
        }
        println!(
            "    aspect  {} {} {}  scale={} box={} parallel={}",
            view.aspect.x,
            view.aspect.y,
            view.aspect.z,
            view.show_scale,
            view.bounding_box,
            view.parallel
        );
    }
    Ok(())
}

/// Build a handler for a saved display, linked to the images of its transforms.
fn handler_for(
    state: &AppState,
    display: &DisplayState,
    config: &AppConfig,
) -> ViewHandler<MemoryDisplay> {
    let mut surface = MemoryDisplay::new(display.mode);
    for link in &display.links {
        match state.transforms.image_info(*link) {
            Some(info) => surface = surface.link(info),
            None => log::warn!("Display '{}' links unknown transform {}", display.name, link),
        }
    }
    let mut handler = ViewHandler::new(surface, config.view);
    handler.restore_state(&display.view);
    handler.init_state(None);
    handler
}

fn apply(args: &ApplyArgs, config: &AppConfig) -> Result<()> {
    let commands = args
        .commands
        .iter()
        .map(|c| c.parse::<ViewCommand>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut state = AppState::load_from_file(&args.state)?;
    let display = state
        .display(&args.display)
        .ok_or_else(|| CliError::UnknownDisplay(args.display.clone()))?;

    let mut handler = handler_for(&state, display, config);
    for command in &commands {
        command.apply(&mut handler);
    }
    let saved = handler.saved();

    if let Some(display) = state.display_mut(&args.display) {
        display.view = saved;
    }
    state.save_to_file(args.output.as_deref().unwrap_or(&args.state))?;
    println!("{}", handler.matrix());
    Ok(())
}

fn parse_point(text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| CliError::Coordinates(text.to_string()))
}

fn nearest(args: &NearestArgs) -> Result<()> {
    let point = parse_point(&args.point)?;
    let nodes = args
        .nodes
        .iter()
        .flat_map(|n| n.split_whitespace())
        .map(parse_point)
        .collect::<Result<Vec<_>>>()?;
    if nodes.iter().any(|n| n.len() != point.len()) {
        return Err(CliError::DimensionMismatch);
    }

    match geometry::dist_seg_wt(&nodes, &point) {
        Some(hit) => println!(
            "distance {}  segment {}  weight {}",
            hit.distance, hit.segment, hit.weight
        ),
        None => println!("no nodes"),
    }
    Ok(())
}

fn find_pattern(args: &FindPatternArgs) -> Result<()> {
    println!("{}", import::pattern_for_file(&args.file)?);
    Ok(())
}

fn import_dataset(args: &ImportArgs, config: &AppConfig) -> Result<()> {
    let mut state = if args.state.exists() {
        AppState::load_from_file(&args.state)?
    } else {
        AppState::new()
    };

    let folder = &config.preferences.import_folder;
    let dir = if args.dir.is_relative() && !folder.is_empty() {
        PathBuf::from(folder).join(&args.dir)
    } else {
        args.dir.clone()
    };

    let request = DatasetRequest {
        name: args.name.clone().unwrap_or_else(|| args.pattern.clone()),
        micron_width: args.micron_width,
        micron_height: args.micron_height,
        micron_step: args.micron_step,
        ..DatasetRequest::new(dir, &args.pattern)
    };

    let outcome = std::rc::Rc::new(std::cell::RefCell::new(None));
    let sink = std::rc::Rc::clone(&outcome);
    let mut queue = TaskQueue::new();
    queue.spawn(
        "import",
        move |cancel, progress| import::scan_dataset(&request, cancel, progress),
        move |result| *sink.borrow_mut() = Some(result),
    )?;
    queue.wait_all();

    let finished = outcome.borrow_mut().take().ok_or(CliError::NoResult)?;
    let imported = finished??;
    let id = imported.add_to(&mut state.transforms)?;
    state.transforms.select(id);
    state.save_to_file(&args.state)?;
    println!("Added dataset {} to {}", id, args.state.display());
    Ok(())
}

fn diff(args: &DiffArgs) -> Result<()> {
    let old = AppState::load_from_file(&args.old)?;
    let new = AppState::load_from_file(&args.new)?;
    let report = state::diff(&old, &new);

    if report.is_unchanged() {
        println!("No changes");
        return Ok(());
    }
    let names = |v: &[String]| v.join(", ");
    let ids = |v: &[visbio::transform::TransformId]| {
        v.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
    };
    println!("Displays changed: {}", names(&report.displays_changed));
    println!("Displays added:   {}", names(&report.displays_added));
    println!("Displays removed: {}", names(&report.displays_removed));
    println!("Transforms changed: {}", ids(&report.transforms_changed));
    println!("Transforms added:   {}", ids(&report.transforms_added));
    println!("Transforms removed: {}", ids(&report.transforms_removed));
    Ok(())
}
