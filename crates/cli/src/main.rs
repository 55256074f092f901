use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use facemask_core::compositing::domain::mask_style::MaskStyle;
use facemask_core::compositing::infrastructure::alpha_blend_compositor::AlphaBlendCompositor;
use facemask_core::compositing::infrastructure::file_mask_catalog::FileMaskCatalog;
use facemask_core::detection::domain::face_locator::FaceLocator;
use facemask_core::detection::infrastructure::cascade_model::CascadeModel;
use facemask_core::detection::infrastructure::haar_cascade_locator::HaarCascadeLocator;
use facemask_core::imaging::domain::image_decoder::ImageDecoder;
use facemask_core::imaging::infrastructure::image_crate_decoder::ImageCrateDecoder;
use facemask_core::imaging::infrastructure::image_crate_encoder::ImageCrateEncoder;
use facemask_core::pipeline::infrastructure::threaded_photo_executor::ThreadedPhotoExecutor;
use facemask_core::pipeline::mask_photo_use_case::{MaskPhotoUseCase, PhotoRequest};
use facemask_core::pipeline::photo_executor::PhotoExecutor;
use facemask_core::pipeline::pipeline_logger::{PipelineLogger, StatsPipelineLogger};
use facemask_core::preferences::domain::preference_store::PreferenceStore;
use facemask_core::preferences::domain::user_id::UserId;
use facemask_core::preferences::infrastructure::in_memory_preference_store::InMemoryPreferenceStore;
use facemask_core::preferences::infrastructure::json_file_preference_store::JsonFilePreferenceStore;
use facemask_core::shared::config::{MaskerConfig, OutputKind};
use facemask_core::shared::constants::{
    APP_DIR_NAME, CASCADE_MODEL_NAME, CASCADE_MODEL_URL, IMAGE_EXTENSIONS,
};
use facemask_core::shared::model_resolver;

/// Overlay decorative masks on faces in photos.
#[derive(Parser)]
#[command(name = "facemask", version)]
struct Cli {
    /// JSON config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mask the first face in each photo using the user's chosen style.
    Apply(ApplyArgs),
    /// Record a user's mask style for later photos.
    Choose(ChooseArgs),
    /// Print the faces found in a photo, in scan order.
    Detect(DetectArgs),
}

#[derive(Args)]
struct ApplyArgs {
    /// Input photos.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for `<stem>_masked.<ext>` outputs.
    #[arg(long)]
    output_dir: PathBuf,

    /// User the photos belong to.
    #[arg(long, default_value = "0")]
    user: i64,

    /// Record this style (mask_eye or mask_face) before processing.
    #[arg(long)]
    style: Option<String>,

    /// Preferences file (defaults to the platform config directory).
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Worker threads (default: available cores).
    #[arg(long)]
    workers: Option<usize>,

    /// Directory holding mask_eye.png and mask_face.png.
    #[arg(long)]
    assets: Option<PathBuf>,

    #[command(flatten)]
    detection: DetectionArgs,

    /// Output format: jpeg or png.
    #[arg(long)]
    format: Option<String>,

    /// JPEG quality (1-100).
    #[arg(long)]
    quality: Option<u8>,
}

#[derive(Args)]
struct ChooseArgs {
    #[arg(long)]
    user: i64,

    /// mask_eye or mask_face.
    #[arg(long)]
    style: String,

    /// Preferences file (defaults to the platform config directory).
    #[arg(long)]
    prefs: Option<PathBuf>,
}

#[derive(Args)]
struct DetectArgs {
    /// Photo to scan.
    input: PathBuf,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args)]
struct DetectionArgs {
    /// Haar cascade XML (downloaded to the cache when omitted).
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Window growth between pyramid levels (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Overlapping detections required per face.
    #[arg(long)]
    min_neighbors: Option<u32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = MaskerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Apply(args) => {
            validate_apply(&args)?;
            apply_overrides(&mut config, &args);
            config.validate()?;
            run_apply(&config, &args)
        }
        Command::Choose(args) => run_choose(&args),
        Command::Detect(args) => {
            if !args.input.exists() {
                return Err(format!("Input file not found: {}", args.input.display()).into());
            }
            apply_detection_overrides(&mut config, &args.detection);
            config.validate()?;
            run_detect(&config, &args.input)
        }
    }
}

fn run_apply(config: &MaskerConfig, args: &ApplyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let locator = build_locator(config)?;
    let catalog = FileMaskCatalog::load(
        &config.assets.eye_mask_path(),
        &config.assets.face_mask_path(),
    );
    log::info!("Mask styles available: {:?}", catalog.available_styles());
    let logger = Arc::new(StatsPipelineLogger::new());

    let use_case = MaskPhotoUseCase::new(
        Box::new(ImageCrateDecoder::new()),
        locator,
        Box::new(AlphaBlendCompositor::new(config.resize_filter)),
        Box::new(ImageCrateEncoder::new()),
        Arc::new(catalog),
        open_preferences(args.prefs.as_deref())?,
        config.output.output_format(),
    )
    .with_logger(logger.clone());

    let user = UserId(args.user);
    if let Some(token) = &args.style {
        use_case.choose_style(user, token)?;
    }

    let requests = args
        .inputs
        .iter()
        .map(|path| {
            fs::read(path)
                .map(|photo| PhotoRequest::new(user, photo))
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    fs::create_dir_all(&args.output_dir)?;
    let executor = ThreadedPhotoExecutor::new(config.worker_count());
    let results = executor.execute_all(&use_case, requests);

    let extension = use_case.output_format().extension();
    let (mut masked, mut failures) = (0, 0);
    for (input, result) in args.inputs.iter().zip(results) {
        match result {
            Ok(outcome) => {
                if outcome.status.is_success() {
                    masked += 1;
                }
                println!("{}: {}", input.display(), outcome.status.user_message());
                if let Some(bytes) = outcome.image {
                    let output = output_path(&args.output_dir, input, extension);
                    fs::write(&output, bytes)?;
                    log::info!("Output written to {}", output.display());
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e}", input.display());
            }
        }
    }
    logger.summary();
    log::info!("Masked {masked} of {} photo(s)", args.inputs.len());

    if failures > 0 {
        return Err(format!("{failures} photo(s) failed with internal errors").into());
    }
    Ok(())
}

fn run_choose(args: &ChooseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let style: MaskStyle = args.style.parse()?;
    let path = prefs_path(args.prefs.as_deref())
        .ok_or("Could not determine a preferences location; pass --prefs")?;
    let store = JsonFilePreferenceStore::open(&path)?;
    store.set_style(UserId(args.user), style);
    store.save()?;
    println!(
        "User {} now uses {style} (saved to {})",
        args.user,
        store.path().display()
    );
    Ok(())
}

fn run_detect(config: &MaskerConfig, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = ImageCrateDecoder::new().decode(&fs::read(input)?)?;
    let faces = build_locator(config)?.locate(&image)?;
    log::info!("Found {} face(s) in {}", faces.len(), input.display());
    for (i, face) in faces.iter().enumerate() {
        println!("{i}: {face}");
    }
    Ok(())
}

fn build_locator(
    config: &MaskerConfig,
) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    let cascade_path = model_resolver::resolve(
        config.cascade_path.as_deref(),
        CASCADE_MODEL_NAME,
        CASCADE_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;
    let model = CascadeModel::from_file(&cascade_path)?;
    Ok(Box::new(HaarCascadeLocator::new(
        Arc::new(model),
        config.detection.clone(),
    )?))
}

fn open_preferences(
    explicit: Option<&Path>,
) -> Result<Arc<dyn PreferenceStore>, Box<dyn std::error::Error>> {
    match prefs_path(explicit) {
        Some(path) => Ok(Arc::new(JsonFilePreferenceStore::open(&path)?)),
        None => {
            log::warn!("No preferences location available; choices will not persist");
            Ok(Arc::new(InMemoryPreferenceStore::new()))
        }
    }
}

fn prefs_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("preferences.json")))
}

fn apply_overrides(config: &mut MaskerConfig, args: &ApplyArgs) {
    apply_detection_overrides(config, &args.detection);
    if let Some(dir) = &args.assets {
        config.assets.dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    match args.format.as_deref() {
        Some("png") => config.output.format = OutputKind::Png,
        Some("jpeg") | Some("jpg") => config.output.format = OutputKind::Jpeg,
        _ => {}
    }
    if let Some(quality) = args.quality {
        config.output.jpeg_quality = quality;
    }
}

fn apply_detection_overrides(config: &mut MaskerConfig, args: &DetectionArgs) {
    if let Some(path) = &args.cascade {
        config.cascade_path = Some(path.clone());
    }
    if let Some(scale_factor) = args.scale_factor {
        config.detection.scale_factor = scale_factor;
    }
    if let Some(min_neighbors) = args.min_neighbors {
        config.detection.min_neighbors = min_neighbors;
    }
}

fn validate_apply(args: &ApplyArgs) -> Result<(), Box<dyn std::error::Error>> {
    for input in &args.inputs {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_image(input) {
            return Err(format!("Not a supported image file: {}", input.display()).into());
        }
    }
    if args.output_dir.is_file() {
        return Err(format!(
            "Output directory is an existing file: {}",
            args.output_dir.display()
        )
        .into());
    }
    if let Some(token) = &args.style {
        token.parse::<MaskStyle>()?;
    }
    if let Some(format) = &args.format {
        if !["jpeg", "jpg", "png"].contains(&format.as_str()) {
            return Err(format!("Format must be 'jpeg' or 'png', got '{format}'").into());
        }
    }
    if let Some(q) = args.quality {
        if !(1..=100).contains(&q) {
            return Err(format!("Quality must be between 1 and 100, got {q}").into());
        }
    }
    if args.workers == Some(0) {
        return Err("Workers must be at least 1".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn output_path(output_dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    output_dir.join(format!("{stem}_masked.{extension}"))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face cascade... {pct}%");
    } else {
        eprint!("\rDownloading face cascade... {downloaded} bytes");
    }
}
