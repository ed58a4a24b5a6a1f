use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde::Serialize;

use emotion_lens_core::emotion::infrastructure::model_registry::{available_models, select_model};
use emotion_lens_core::imaging::domain::image_writer::ImageWriter;
use emotion_lens_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use emotion_lens_core::pipeline::infrastructure::emotion_recognizer::EmotionRecognizer;
use emotion_lens_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use emotion_lens_core::pipeline::recognize_emotions_use_case::EmotionResult;
use emotion_lens_core::shared::bounding_box::CropRect;
use emotion_lens_core::shared::config::RecognizerConfig;
use emotion_lens_core::shared::constants::IMAGE_EXTENSIONS;
use emotion_lens_core::shared::device::Device;

/// Detect faces in an image and classify each face's emotion.
#[derive(Parser, Debug)]
#[command(name = "emotion-lens")]
struct Cli {
    /// Input image file.
    input: Option<PathBuf>,

    /// Compute device: cpu, cuda, cuda:N, coreml, directml.
    #[arg(long)]
    device: Option<String>,

    /// Emotion model name (default: first listed model).
    #[arg(long)]
    model: Option<String>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local face detector ONNX file.
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Local emotion classifier ONNX file.
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// Report every detected face, not only the best one.
    #[arg(long)]
    keep_all: bool,

    /// Minimum face size in pixels.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Save each face crop into this directory.
    #[arg(long)]
    save_crops: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// List available emotion models and exit.
    #[arg(long)]
    list_models: bool,
}

/// One line of output per face.
#[derive(Serialize, Debug)]
struct FaceReport {
    index: usize,
    label: String,
    detection_confidence: f32,
    rect: CropRect,
    scores: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_path: Option<PathBuf>,
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

    if cli.list_models {
        print_models();
        return Ok(());
    }

    validate(&cli)?;
    let config = build_config(&cli)?;
    let input = cli.input.as_deref().ok_or("Input image is required")?;

    let recognizer = EmotionRecognizer::onnx(config, Some(Box::new(download_progress)))?
        .with_logger_factory(Box::new(|| {
            Box::new(LogPipelineLogger::new()) as Box<dyn PipelineLogger>
        }));

    let results = recognizer.process_image(input)?;
    log::info!("Recognized {} faces in {}", results.len(), input.display());

    let reports = build_reports(&results, cli.save_crops.as_deref(), &ImageFileWriter::new())?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if reports.is_empty() {
        println!("No faces found");
    } else {
        for r in &reports {
            println!("{}", format_report(r));
        }
    }
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Some(input) = &cli.input else {
        return Err("Input image is required unless --list-models is used".into());
    };
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    if !is_image(input) {
        log::warn!(
            "{} does not have a known image extension; trying to decode anyway",
            input.display()
        );
    }
    if cli.min_face_size == Some(0) {
        return Err("Minimum face size must be greater than 0".into());
    }
    if let Some(name) = &cli.model {
        select_model(Some(name.as_str()))?;
    }
    for path in [&cli.detector_model, &cli.classifier_model].into_iter().flatten() {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

/// File config (explicit or default location) with CLI flags layered on top.
fn build_config(cli: &Cli) -> Result<RecognizerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RecognizerConfig::load(path)?,
        None => RecognizerConfig::load_or_default()?,
    };

    if let Some(device) = &cli.device {
        config.device = device.parse::<Device>()?;
    }
    if let Some(model) = &cli.model {
        config.emotion_model = Some(model.clone());
    }
    if let Some(path) = &cli.detector_model {
        config.detector_model_path = Some(path.clone());
    }
    if let Some(path) = &cli.classifier_model {
        config.classifier_model_path = Some(path.clone());
    }
    if cli.keep_all {
        config.keep_all = true;
    }
    if let Some(size) = cli.min_face_size {
        config.min_face_size = size;
    }
    Ok(config)
}

fn build_reports(
    results: &[EmotionResult],
    crop_dir: Option<&Path>,
    writer: &dyn ImageWriter,
) -> Result<Vec<FaceReport>, Box<dyn std::error::Error>> {
    let mut reports = Vec::with_capacity(results.len());
    for (index, result) in results.iter().enumerate() {
        let crop_path = match crop_dir {
            Some(dir) if result.face.width() > 0 && result.face.height() > 0 => {
                let path = dir.join(crop_file_name(index, &result.label));
                writer.write(&path, &result.face)?;
                Some(path)
            }
            _ => None,
        };
        reports.push(FaceReport {
            index,
            label: result.label.clone(),
            detection_confidence: result.detection_confidence,
            rect: result.rect,
            scores: result.scores.clone(),
            crop_path,
        });
    }
    Ok(reports)
}

fn crop_file_name(index: usize, label: &str) -> String {
    let slug: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("face_{index}_{slug}.png")
}

fn format_report(r: &FaceReport) -> String {
    let mut line = format!(
        "face {}: {} (box {},{} {}x{}, detection {:.3})",
        r.index,
        r.label,
        r.rect.x1,
        r.rect.y1,
        r.rect.width(),
        r.rect.height(),
        r.detection_confidence
    );
    if let Some(path) = &r.crop_path {
        line.push_str(&format!(" -> {}", path.display()));
    }
    line
}

fn print_models() {
    for (i, model) in available_models().iter().enumerate() {
        let default = if i == 0 { " (default)" } else { "" };
        println!(
            "{}{default}: {}px input, {} classes",
            model.name,
            model.input_size,
            model.labels.len()
        );
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
