use crate::config::{Config, load_config};
use crate::export::Exporter;
use crate::layout::{RenderTarget, try_compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::occupancy::{OccupancyGrid, find_obstacle_at, is_label_anchor};
use crate::plan::FloorPlan;
use crate::render::{ModalFrame, render_modal_svg, render_svg, write_output_svg};
use crate::script::{apply_script, parse_script};
use crate::theme::Theme;
use crate::viewport::{ViewTransform, ViewportController};
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "floorgrid", version, about = "Floor-plan occupancy grid renderer")]
pub struct Args {
    /// Config JSON / JSON5 file (grid, obstacles, theme, export)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG, to the configured file name for PDF.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Which rendering of the grid to produce
    #[arg(long = "view", value_enum, default_value = "inline")]
    pub view: View,

    /// Theme name (classic, blueprint)
    #[arg(short = 't', long = "theme")]
    pub theme: Option<String>,

    /// Viewport events replayed before a modal render, e.g. "+ + drag:10,10>60,40".
    /// Prefix with '@' to read them from a file.
    #[arg(long = "events")]
    pub events: Option<String>,

    /// Modal viewport width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Modal viewport height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Report the obstacle covering grid point X,Y, or describe obstacle ID, and exit
    #[arg(long = "locate", value_name = "X,Y|ID")]
    pub locate: Option<String>,

    /// Print the plan summary with occupied and free cell counts, then exit
    #[arg(long = "summary")]
    pub summary: bool,

    /// Write the computed layout as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Pdf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Inline,
    Modal,
    Export,
}

impl From<View> for RenderTarget {
    fn from(view: View) -> Self {
        match view {
            View::Inline => RenderTarget::Inline,
            View::Modal => RenderTarget::Modal,
            View::Export => RenderTarget::Export,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    if args.summary {
        print!("{}", summary_report(&config.plan));
        return Ok(());
    }

    if let Some(spec) = args.locate.as_deref() {
        println!("{}", locate(&config, spec)?);
        return Ok(());
    }

    if args.output_format == OutputFormat::Pdf {
        if args.view != View::Export {
            warn!(view = ?args.view, "PDF output always uses the export view");
        }
        if let Some(path) = args.dump_layout.as_deref() {
            let layout = try_compute_layout(&config.plan, &config.theme, RenderTarget::Export)?;
            write_layout_dump(path, &layout)?;
        }
        let mut exporter = Exporter::new(config.export.clone());
        let path = exporter.export_pdf(&config.plan, &config.theme, args.output.as_deref())?;
        info!(path = %path.display(), "PDF written");
        return Ok(());
    }

    let layout = try_compute_layout(&config.plan, &config.theme, args.view.into())?;
    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &layout)?;
    }

    let svg = match args.view {
        View::Modal => {
            let transform = replay_events(args.events.as_deref())?;
            let frame = ModalFrame::new(config.render.viewport_width, config.render.viewport_height);
            render_modal_svg(&layout, &config.theme, &transform, frame)
        }
        View::Inline | View::Export => {
            if args.events.is_some() {
                warn!("--events only applies to the modal view");
            }
            render_svg(&layout, &config.theme)
        }
    };

    if args.output_format == OutputFormat::Png {
        let output = ensure_output(args.output.as_deref(), "png")?;
        write_png_output(&svg, &output, &config)?;
    } else {
        write_output_svg(&svg, args.output.as_deref())?;
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(name) = args.theme.as_deref() {
        config.theme =
            Theme::from_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme '{name}'"))?;
    }
    if let Some(width) = args.width {
        config.render.viewport_width = width;
    }
    if let Some(height) = args.height {
        config.render.viewport_height = height;
    }
    config.render.validate()?;
    Ok(())
}

/// Replay `events` on a freshly opened controller. A script that closes
/// the viewport leaves the identity transform.
fn replay_events(events: Option<&str>) -> Result<ViewTransform> {
    let mut controller: ViewportController = ViewportController::default();
    controller.open();
    if let Some(events) = events {
        let script = match events.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)?,
            None => events.to_string(),
        };
        let steps = parse_script(&script)?;
        let stats = apply_script(&mut controller, &steps);
        info!(handled = stats.handled, ignored = stats.ignored, zoom = controller.zoom(), "events replayed");
    }
    Ok(controller.transform().unwrap_or_else(|| {
        warn!("viewport closed by event script");
        ViewTransform::identity()
    }))
}

fn summary_report(plan: &FloorPlan) -> String {
    let occupancy = OccupancyGrid::build(&plan.grid, &plan.obstacles);
    format!(
        "{}  occupied cells: {}\n  free cells: {}\n",
        plan.summary(),
        occupancy.occupied_count(),
        occupancy.free_count()
    )
}

/// `X,Y` reports what covers that grid point; anything else is looked up
/// as an obstacle id.
fn locate(config: &Config, spec: &str) -> Result<String> {
    if !spec.contains(',') {
        let obstacle = config
            .plan
            .obstacle_by_id(spec.trim())
            .ok_or_else(|| anyhow::anyhow!("no obstacle with id '{}'", spec.trim()))?;
        return Ok(format!(
            "{} {} at ({}, {}), {}m x {}m: {}",
            obstacle.id,
            obstacle.kind,
            obstacle.x,
            obstacle.y,
            obstacle.width,
            obstacle.height,
            obstacle.flat_label()
        ));
    }
    let (x, y) = parse_point(spec)?;
    let answer = match find_obstacle_at(&config.plan.obstacles, x, y) {
        Some(obstacle) => {
            let anchor = if is_label_anchor(obstacle, x, y) { " (label anchor)" } else { "" };
            format!("({x}, {y}): {} {}{anchor}", obstacle.id, obstacle.kind)
        }
        None => format!("({x}, {y}): free"),
    };
    Ok(answer)
}

fn parse_point(spec: &str) -> Result<(f32, f32)> {
    let (x, y) = spec
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("expected X,Y, got '{spec}'"))?;
    Ok((x.trim().parse()?, y.trim().parse()?))
}

fn ensure_output(output: Option<&Path>, ext: &str) -> Result<PathBuf> {
    output
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("Output path required for {ext} output"))
}

#[cfg(feature = "png")]
fn write_png_output(svg: &str, output: &Path, config: &Config) -> Result<()> {
    let pixmap = crate::export::rasterize(svg, config.render.png_scale, &config.theme.font_family)?;
    crate::export::write_png(&pixmap, output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
fn write_png_output(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(crate::export::ExportError::Unsupported("PNG", "png").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modal_invocation() {
        let args = Args::try_parse_from([
            "floorgrid",
            "--view",
            "modal",
            "--events",
            "+ + right",
            "-w",
            "800",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.view, View::Modal);
        assert_eq!(args.width, Some(800.0));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.output_format, OutputFormat::Svg);
    }

    #[test]
    fn locate_reports_occupant_and_free_cells() {
        let config = Config::default();
        assert_eq!(locate(&config, "3,3").unwrap(), "(3, 3): L1 lab");
        assert_eq!(locate(&config, "0, 0").unwrap(), "(0, 0): free");
        assert!(locate(&config, "3,x").is_err());
    }

    #[test]
    fn locate_by_id_describes_obstacle() {
        let config = Config::default();
        assert_eq!(
            locate(&config, "E3").unwrap(),
            "E3 elevator at (12, 15), 2m x 2m: ELEVATOR 2X2"
        );
        assert!(locate(&config, "Z9").is_err());
    }

    #[test]
    fn summary_reports_cell_occupancy() {
        let plan = FloorPlan::builtin();
        let report = summary_report(&plan);
        let occupancy = OccupancyGrid::build(&plan.grid, &plan.obstacles);
        assert!(report.starts_with("Grid Map - Graph Theory\n"));
        assert!(report.contains("  obstacles: 23\n"));
        assert!(report.contains(&format!("  occupied cells: {}\n", occupancy.occupied_count())));
        assert!(report.ends_with(&format!("  free cells: {}\n", 875 - occupancy.occupied_count())));
    }

    #[test]
    fn viewport_override_must_be_positive() {
        let args = Args::try_parse_from(["floorgrid", "-w", "0"]).unwrap();
        let mut config = Config::default();
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[test]
    fn replayed_events_shape_transform() {
        let transform = replay_events(Some("+ up")).unwrap();
        assert!((transform.scale - 1.2).abs() < 1e-6);
        assert_eq!(transform.translate.y, 20.0);
        let closed = replay_events(Some("esc")).unwrap();
        assert_eq!(closed, ViewTransform::identity());
    }

    #[test]
    fn unknown_theme_is_an_error() {
        let args = Args::try_parse_from(["floorgrid", "--theme", "neon"]).unwrap();
        let mut config = Config::default();
        assert!(apply_overrides(&mut config, &args).is_err());
    }
}
