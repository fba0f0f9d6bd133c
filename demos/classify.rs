use argh::FromArgs;
use kornia_classifier::{
    ClassifierPipeline, ImageFetcher, ModelKind, RgbImage, TractBackend, image_url,
};
use std::path::{Path, PathBuf};

const DEFAULT_MODEL_DIR: &str = "assets";

#[derive(FromArgs)]
/// Classifies one image and prints the index of the most probable class.
struct ClassifyArgs {
    /// the model to load
    #[argh(option, short = 'm', default = "ModelKind::default()")]
    model: ModelKind,

    /// the directory holding the model artifacts
    #[argh(option, default = "PathBuf::from(DEFAULT_MODEL_DIR)")]
    model_dir: PathBuf,

    /// a local jpeg or png image; a random image is fetched when omitted
    #[argh(option, short = 'i')]
    image_path: Option<PathBuf>,

    /// print the top scores as well
    #[argh(switch)]
    verbose: bool,
}

fn read_image_from_path(path: &Path) -> Result<RgbImage, String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| "Invalid file extension".to_string())?;

    match extension {
        "jpg" | "jpeg" => kornia_io::jpeg::read_image_jpeg_rgb8(path).map_err(|e| e.to_string()),
        "png" => kornia_io::png::read_image_png_rgb8(path).map_err(|e| e.to_string()),
        _ => Err(format!("Unsupported image format: {}", extension)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ClassifyArgs = argh::from_env();

    let spec = args.model.spec();
    let backend = TractBackend::load(&args.model_dir, spec)?;
    let mut pipeline = ClassifierPipeline::new(*spec, backend);

    let image = match &args.image_path {
        Some(path) => read_image_from_path(path)?,
        None => ImageFetcher::new(image_url(spec.input_size), spec.input_size).fetch()?,
    };

    let classification = pipeline.classify(&image)?;
    println!("Max Probability Index: {}", classification.index);

    if args.verbose {
        let mut ranked = classification
            .probabilities
            .iter()
            .copied()
            .enumerate()
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (index, score) in ranked.iter().take(5) {
            println!("  {index:>4}: {score:.4}");
        }
    }

    Ok(())
}
