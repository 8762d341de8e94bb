use std::path::PathBuf;
use thiserror::Error;

// Main application error type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifyError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Per-image classification failures. These are absorbed at the normalizer
/// boundary as `error`-category records and never abort a product batch.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
    #[error("failed to read image {}: {}", .path.display(), .source)]
    ImageRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Whole-product failures. Fatal for the product, not for the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no images supplied for product {0}")]
    EmptyProduct(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}
