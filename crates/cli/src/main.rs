mod interactive;
mod serve;
mod settings;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use facecam_core::detection::domain::face_detector::{shared, FaceDetector};
use facecam_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facecam_core::pipeline::extract_faces_use_case::{ExtractFacesUseCase, ExtractionOutcome};
use facecam_core::session::camera_session::Session;
use facecam_core::shared::constants::{DEFAULT_CAMERA_RESOLUTION, IMAGE_EXTENSIONS};
use facecam_core::shared::model_location::ModelLocation;
use facecam_core::video::domain::media_source::{CameraOpener, MediaSource};
use facecam_core::video::infrastructure::camera_source::DeviceCameraOpener;
use facecam_core::video::infrastructure::image_file_writer::ImageFileWriter;
use facecam_core::video::infrastructure::still_image_source::{StillImageOpener, StillImageSource};

use settings::Settings;

/// Live webcam face detection and face extraction.
#[derive(Parser)]
#[command(name = "facecam")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Model directory or base URL (overrides settings).
    #[arg(long, global = true)]
    models: Option<String>,

    /// Directory extracted faces are written to.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f64>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session: live detection plus on-demand extraction.
    Session {
        /// Camera device index.
        #[arg(long)]
        camera: Option<u32>,

        /// Use an image file instead of a camera.
        #[arg(long)]
        image: Option<PathBuf>,

        /// Milliseconds between detection cycles.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Extract every face from an image file.
    Extract {
        /// Input image.
        image: PathBuf,
    },
    /// Run the upload endpoint.
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:3000.
        #[arg(long)]
        listen: Option<String>,
    },
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
    let settings = resolve_settings(&cli)?;

    match cli.command {
        Command::Session {
            camera,
            image,
            interval_ms,
        } => {
            let mut settings = settings;
            if let Some(index) = camera {
                settings.camera_index = index;
            }
            if let Some(ms) = interval_ms {
                settings.detection_interval_ms = ms;
            }
            run_session(&settings, image)
        }
        Command::Extract { image } => run_extract(&settings, &image),
        Command::Serve { listen } => serve::serve(listen.as_deref().unwrap_or(&settings.listen)),
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if let Some(models) = &cli.models {
        settings.model_location = models.clone();
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!("--confidence must be between 0 and 1, got {confidence}").into());
        }
        settings.confidence = (confidence * 100.0).round() as u32;
    }
    Ok(settings)
}

fn run_session(
    settings: &Settings,
    image: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = settings.session_config();
    let mut session = Session::new(
        config,
        Box::new(OnnxYoloDetector::new()),
        Box::new(ImageFileWriter::new()),
    );

    log::info!("Loading face models...");
    session.load_models()?;

    let opener: Box<dyn CameraOpener> = match image {
        Some(path) => {
            check_image(&path)?;
            Box::new(StillImageOpener { path })
        }
        None => Box::new(DeviceCameraOpener {
            device_index: settings.camera_index,
            requested: DEFAULT_CAMERA_RESOLUTION,
        }),
    };

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    interactive::run(&mut session, opener.as_ref(), stdin.lock(), &mut stdout)?;
    Ok(())
}

fn run_extract(settings: &Settings, image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    check_image(image)?;

    let mut detector = OnnxYoloDetector::new();
    detector.initialize(&ModelLocation::parse(&settings.model_location))?;

    let use_case = ExtractFacesUseCase::new(
        shared(Box::new(detector)),
        Box::new(ImageFileWriter::new()),
        settings.output_dir.clone(),
    )
    .with_extension(&settings.extension)
    .with_options(settings.detector_options());

    let frame = StillImageSource::open(image)?.current_frame()?;
    match use_case.execute(&frame)? {
        ExtractionOutcome::NoFaces => println!("No faces detected!"),
        ExtractionOutcome::Extracted(report) => {
            for image in &report.images {
                if let Some(path) = &image.persisted_path {
                    println!("{}", path.display());
                }
            }
            for failure in &report.failures {
                log::warn!("{failure}");
            }
            log::info!(
                "Saved {} of {} face(s) to {}",
                report.images.iter().filter(|i| i.persisted_path.is_some()).count(),
                report.images.len(),
                use_case.output_dir().display()
            );
        }
    }
    Ok(())
}

fn check_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Input file not found: {}", path.display()).into());
    }
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    if !supported {
        return Err(format!("Unsupported image type: {}", path.display()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("facecam").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"confidence": 30, "model_location": "/a"}"#).unwrap();
        let path_str = path.to_str().unwrap();

        let settings = resolve_settings(&cli(&[
            "extract",
            "x.png",
            "--settings",
            path_str,
            "--confidence",
            "0.8",
            "--models",
            "/b",
        ]))
        .unwrap();

        assert_eq!(settings.confidence, 80);
        assert_eq!(settings.model_location, "/b");
    }

    #[test]
    fn test_settings_file_used_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"confidence": 30}"#).unwrap();

        let settings =
            resolve_settings(&cli(&["serve", "--settings", path.to_str().unwrap()])).unwrap();
        assert_eq!(settings.confidence, 30);
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let result = resolve_settings(&cli(&[
            "serve",
            "--settings",
            path.to_str().unwrap(),
            "--confidence",
            "1.5",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_image_rejects_missing_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_image(&dir.path().join("nope.png")).is_err());

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hi").unwrap();
        assert!(check_image(&txt).is_err());

        let png = dir.path().join("face.PNG");
        std::fs::write(&png, "x").unwrap();
        assert!(check_image(&png).is_ok());
    }
}
