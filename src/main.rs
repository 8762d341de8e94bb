use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn, Level};

use stylelens::classifier::GeminiVisionClient;
use stylelens::config::Settings;
use stylelens::error::AppError;
use stylelens::pipeline::BatchOrchestrator;
use stylelens::store::FsImageSource;
use stylelens::{export, store};

/// Classify apparel product images and select the best shot per slot.
#[derive(Parser, Debug)]
#[command(name = "stylelens")]
struct Cli {
    /// A product image directory, or the images root together with --all.
    path: PathBuf,

    /// Process every numeric product directory under PATH.
    #[arg(long)]
    all: bool,

    /// Where classification reports are written.
    #[arg(long, default_value = "output/classifications")]
    output_dir: PathBuf,

    /// Where selected images are exported.
    #[arg(long, default_value = "output/selected")]
    selected_dir: PathBuf,

    /// Optional settings file; STYLELENS_* environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    let mut configuration = settings.into_configuration();
    if configuration.api_key.is_empty() {
        configuration.api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
    }
    if configuration.api_key.is_empty() {
        return Err(AppError::Config(config::ConfigError::Message(
            "no API key: set STYLELENS_API_KEY, GEMINI_API_KEY or GOOGLE_API_KEY".to_string(),
        )));
    }

    let classifier = Arc::new(GeminiVisionClient::new(&configuration)?);
    let orchestrator = BatchOrchestrator::new(classifier, Arc::new(FsImageSource), configuration);

    if cli.all {
        let product_dirs = store::product_dirs(&cli.path)?;
        info!(products = product_dirs.len(), "processing all products");
        for product_dir in product_dirs {
            // A product-level failure (e.g. an empty directory) only skips
            // that product.
            if let Err(error) = process_product(&orchestrator, &product_dir, &cli).await {
                warn!(product_dir = %product_dir.display(), %error, "product skipped");
            }
        }
    } else {
        process_product(&orchestrator, &cli.path, &cli).await?;
    }

    Ok(())
}

async fn process_product(
    orchestrator: &BatchOrchestrator,
    product_dir: &Path,
    cli: &Cli,
) -> Result<(), AppError> {
    let product_id = product_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());

    let metadata = store::load_metadata(product_dir);
    let images = store::list_images(product_dir)?;
    let report = orchestrator
        .classify_product(&product_id, images, metadata.as_ref())
        .await?;

    let report_path = store::write_report(&cli.output_dir, &report)?;
    info!(
        product = %report.product_id,
        images = report.total_images,
        representative_color = report.selected.representative_color.as_deref().unwrap_or("-"),
        report = %report_path.display(),
        "classification complete"
    );

    let plan = export::plan_exports(&report.selected);
    let copied = store::run_export_plan(&cli.selected_dir.join(&product_id), &plan)?;
    info!(product = %report.product_id, copied = copied.len(), "selected images exported");

    if let Some(update) = export::composition_update(&report.selected) {
        store::merge_composition(product_dir, &update)?;
        info!(
            product = %report.product_id,
            source = %update.source.file_name,
            "extracted composition merged into metadata"
        );
    }

    Ok(())
}
