//! shapecut: generate shape placement challenges and check attempts.
//!
//! Three subcommands share one record store file:
//!
//! - `generate` runs the pipeline on a photograph, writes the four PNG
//!   artifacts to `<out>/<image-id>/`, and stores the validation record
//! - `validate` checks a submitted placement against a stored record
//! - `random` picks a stored challenge and prints the links a client needs
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin shapecut -- generate photos/beach.jpg --out assets
//! cargo run --release --bin shapecut -- validate --image-id beach --x 130 --y 72
//! cargo run --release --bin shapecut -- random --asset-root /assets/prod
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use shapecut_pipeline::diagnostics::Clock;
use shapecut_pipeline::record::DEFAULT_ASSET_ROOT;
use shapecut_pipeline::{
    Attempt, AttemptOutcome, ChallengeConfig, ChallengeLinks, HorizontalEdges, PlacementMode,
};
use shapecut_store::{JsonFileStore, RecordStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shape placement challenge generator.
#[derive(Parser)]
#[command(name = "shapecut", version)]
struct Cli {
    /// JSON file holding the validation records.
    #[arg(long, global = true, default_value = "records.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a challenge from an image and store its record.
    Generate(GenerateArgs),
    /// Check a placement against a stored record.
    Validate(ValidateArgs),
    /// Print the image links of a randomly chosen stored challenge.
    Random(RandomArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Directory that receives `<image-id>/*.png`.
    #[arg(long, default_value = "assets")]
    out: PathBuf,

    /// Identifier for the challenge. Defaults to the input file stem.
    #[arg(long)]
    image_id: Option<String>,

    /// Seed for the shape parameters. Uses OS entropy when absent.
    #[arg(long)]
    seed: Option<u64>,

    /// Where the shape is centered and how it is scaled.
    #[arg(long, value_enum, default_value_t = Placement::Region)]
    placement: Placement,

    /// Heatmap grid rows.
    #[arg(long, default_value_t = ChallengeConfig::DEFAULT_GRID_ROWS)]
    grid_rows: u32,

    /// Heatmap grid columns.
    #[arg(long, default_value_t = ChallengeConfig::DEFAULT_GRID_COLS)]
    grid_cols: u32,

    /// Skip the Gaussian blur before edge detection.
    #[arg(long)]
    no_blur: bool,

    /// Canny low threshold.
    #[arg(long, default_value_t = ChallengeConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = ChallengeConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Allowed per-axis placement error in pixels.
    #[arg(long, default_value_t = ChallengeConfig::DEFAULT_TOLERANCE)]
    tolerance: u32,

    /// Ignore horizontal outline edges while filling.
    #[arg(long)]
    strict_fill: bool,

    /// Full challenge config as a JSON string.
    ///
    /// When provided, all other config flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Challenge identifier.
    #[arg(long, required_unless_present = "attempt")]
    image_id: Option<String>,

    /// Submitted x offset.
    #[arg(long, allow_negative_numbers = true, required_unless_present = "attempt")]
    x: Option<i64>,

    /// Submitted y offset.
    #[arg(long, allow_negative_numbers = true, required_unless_present = "attempt")]
    y: Option<i64>,

    /// Attempt as JSON, e.g. `{"imageId":"beach","x":130,"y":72}`.
    #[arg(long, conflicts_with_all = ["image_id", "x", "y"])]
    attempt: Option<String>,
}

#[derive(Args)]
struct RandomArgs {
    /// URL prefix the challenge images are served from.
    #[arg(long, default_value = DEFAULT_ASSET_ROOT)]
    asset_root: String,

    /// Seed for the pick. Uses OS entropy when absent.
    #[arg(long)]
    seed: Option<u64>,
}

/// Placement mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Placement {
    /// Centered on the densest heatmap cell.
    Region,
    /// Centered on the whole image.
    Full,
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Generate(args) => generate(&cli.store, args),
        Command::Validate(args) => validate(&cli.store, args),
        Command::Random(args) => random(&cli.store, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Error serializing output: {e}"))?;
    println!("{json}");
    Ok(())
}

/// Build a [`ChallengeConfig`] from `generate` arguments.
///
/// `--config-json` wins over the individual flags.
fn config_from_args(args: &GenerateArgs) -> Result<ChallengeConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ChallengeConfig {
        grid_rows: args.grid_rows,
        grid_cols: args.grid_cols,
        apply_blur: !args.no_blur,
        canny_low: args.canny_low,
        canny_high: args.canny_high,
        placement: match args.placement {
            Placement::Region => PlacementMode::RegionConstrained,
            Placement::Full => PlacementMode::FullImage,
        },
        horizontal_edges: if args.strict_fill {
            HorizontalEdges::Skip
        } else {
            HorizontalEdges::EndpointPair
        },
        tolerance: args.tolerance,
        ..ChallengeConfig::default()
    })
}

fn image_id_for(args: &GenerateArgs) -> Result<String, String> {
    if let Some(ref id) = args.image_id {
        return Ok(id.clone());
    }
    args.input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            format!(
                "Cannot derive an image id from {}; pass --image-id",
                args.input.display()
            )
        })
}

/// Image ids become a directory name under `--out`: exactly one plain
/// path component, never `.` or `..`.
fn check_image_id(image_id: &str) -> Result<(), String> {
    let mut components = Path::new(image_id).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single_normal && !image_id.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(format!("Invalid image id {image_id:?}"))
    }
}

fn generate(store_path: &Path, args: &GenerateArgs) -> Result<(), String> {
    let config = config_from_args(args)?;
    let image_id = image_id_for(args)?;
    check_image_id(&image_id)?;

    let mut store = JsonFileStore::open(store_path)
        .map_err(|e| format!("Error opening {}: {e}", store_path.display()))?;
    if store.get_by_id(&image_id).is_ok() {
        return Err(format!("A challenge with image id {image_id:?} already exists"));
    }

    let image_bytes = std::fs::read(&args.input)
        .map_err(|e| format!("Error reading {}: {e}", args.input.display()))?;
    tracing::info!(
        input = %args.input.display(),
        bytes = image_bytes.len(),
        image_id = %image_id,
        "generating challenge",
    );

    let mut rng = rng_from_seed(args.seed);
    let (challenge, diagnostics) = shapecut_pipeline::generate_challenge_with_diagnostics(
        &image_bytes,
        &image_id,
        &config,
        &mut rng,
        &StdClock,
    )
    .map_err(|e| format!("Pipeline error: {e}"))?;

    let artifacts = shapecut_export::encode_artifacts(&challenge)
        .map_err(|e| format!("Export error: {e}"))?;
    let dir = args.out.join(&image_id);
    std::fs::create_dir_all(&dir).map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    for artifact in &artifacts {
        let path = dir.join(artifact.name);
        std::fs::write(&path, &artifact.bytes)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = artifact.bytes.len(), "wrote artifact");
    }

    store
        .insert(challenge.record.clone())
        .map_err(|e| format!("Error storing record: {e}"))?;

    if args.json {
        print_json(&diagnostics)?;
    } else {
        println!("{}", diagnostics.report());
    }
    eprintln!(
        "Challenge {image_id:?} written to {} ({} artifacts)",
        dir.display(),
        artifacts.len(),
    );
    Ok(())
}

fn attempt_from_args(args: &ValidateArgs) -> Result<Attempt, String> {
    if let Some(ref json) = args.attempt {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --attempt: {e}"));
    }
    match (&args.image_id, args.x, args.y) {
        (Some(image_id), Some(x), Some(y)) => Ok(Attempt {
            image_id: image_id.clone(),
            x,
            y,
        }),
        _ => Err("validate needs --image-id, --x and --y, or --attempt".to_string()),
    }
}

fn validate(store_path: &Path, args: &ValidateArgs) -> Result<(), String> {
    let attempt = attempt_from_args(args)?;
    let store = JsonFileStore::open(store_path)
        .map_err(|e| format!("Error opening {}: {e}", store_path.display()))?;
    let record = store.get_by_id(&attempt.image_id).map_err(|e| e.to_string())?;

    let outcome = AttemptOutcome::judge(record, &attempt);
    tracing::info!(
        image_id = %attempt.image_id,
        x = attempt.x,
        y = attempt.y,
        success = outcome.success,
        "checked attempt",
    );
    print_json(&outcome)
}

fn random(store_path: &Path, args: &RandomArgs) -> Result<(), String> {
    let store = JsonFileStore::open(store_path)
        .map_err(|e| format!("Error opening {}: {e}", store_path.display()))?;
    let mut rng = rng_from_seed(args.seed);
    let record = store.get_random(&mut rng).map_err(|e| e.to_string())?;
    print_json(&ChallengeLinks::new(&args.asset_root, &record.image_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_image_ids_are_accepted() {
        for id in ["beach", "beach.v2", "IMG_0042", "..hidden"] {
            assert_eq!(check_image_id(id), Ok(()), "{id}");
        }
    }

    #[test]
    fn image_ids_that_leave_the_output_directory_are_rejected() {
        for id in ["", ".", "..", "a/b", "../x", "/abs", "a\\b", "x/"] {
            assert!(check_image_id(id).is_err(), "{id:?}");
        }
    }
}
