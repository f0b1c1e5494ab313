use clap::{Parser, ValueEnum};
use cropper::{CropMode, CropShape, CropperConfig, DocumentCropper};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanit-cropper")]
#[command(about = "Find the document outline in a photo", long_about = None)]
struct Cli {
    /// Input image path
    image: PathBuf,

    /// Boundary shape to compute
    #[arg(short, long, value_enum, default_value_t = Mode::Rect)]
    mode: Mode,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// JSON file overriding the detection parameters
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Axis-aligned bounding box
    Rect,
    /// Rotated minimum-area rectangle
    Box,
    /// Free-form polygon
    Polygon,
}

impl From<Mode> for CropMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Rect => CropMode::Rect,
            Mode::Box => CropMode::Box,
            Mode::Polygon => CropMode::Polygon,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// JSON output with the mode tag
    Json,
    /// One line of space-separated coordinates
    Text,
}

fn text_line(shape: &CropShape) -> String {
    match shape {
        CropShape::Rect(b) => format!("{:.1} {:.1} {:.1} {:.1}", b.left, b.top, b.right, b.bottom),
        CropShape::Box(r) => format!(
            "{:.1} {:.1} {:.1} {:.1} {:.2}",
            r.center.x, r.center.y, r.size.width, r.size.height, r.angle
        ),
        CropShape::Polygon(p) => p
            .vertices
            .iter()
            .map(|v| format!("{:.1},{:.1}", v.x, v.y))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CropperConfig::from_json_file(path)?,
        None => CropperConfig::default(),
    };
    let cropper = DocumentCropper::new(config)?;

    let image = image::open(&cli.image)?;
    let shape = cropper.detect(&image, cli.mode.into())?;

    if shape.is_empty() {
        warn!(image = %cli.image.display(), "No document found");
    } else {
        let bbox = shape.bounding_box();
        info!(
            left = bbox.left,
            top = bbox.top,
            right = bbox.right,
            bottom = bbox.bottom,
            "Document found"
        );
    }

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shape)?),
        OutputFormat::Text => println!("{}", text_line(&shape)),
    }

    Ok(())
}
