//! Filesystem collaborators wired in by the CLI: image loading, product
//! directory scanning, report persistence, export execution and the
//! `meta.json` composition merge. The pipeline core never touches the disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::classifier::{ImageRef, ImageSource};
use crate::error::{ClassifyError, StoreError};
use crate::export::{CompositionUpdate, ExportPlan};
use crate::metadata::ProductMetadata;
use crate::pipeline::ProductClassification;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Reads image bytes straight off the local crawl output.
pub struct FsImageSource;

#[async_trait]
impl ImageSource for FsImageSource {
    async fn load(&self, image: &ImageRef) -> Result<Vec<u8>, ClassifyError> {
        tokio::fs::read(&image.file_path)
            .await
            .map_err(|source| ClassifyError::ImageRead {
                path: image.file_path.clone(),
                source,
            })
    }
}

/// Lists a product directory's images, sorted by file name.
pub fn list_images(product_dir: &Path) -> Result<Vec<ImageRef>, StoreError> {
    let entries = std::fs::read_dir(product_dir).map_err(|source| StoreError::Read {
        path: product_dir.to_path_buf(),
        source,
    })?;

    let mut images: Vec<ImageRef> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Read {
            path: product_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        if extension
            .as_deref()
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
        {
            images.push(ImageRef::new(path));
        }
    }
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}

/// Product directories under an images root: directories with numeric names
/// (product serial numbers), sorted.
pub fn product_dirs(images_root: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !images_root.is_dir() {
        return Err(StoreError::NotADirectory(images_root.to_path_buf()));
    }
    let entries = std::fs::read_dir(images_root).map_err(|source| StoreError::Read {
        path: images_root.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Read {
            path: images_root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let numeric_name = path
            .file_name()
            .map(|name| name.to_string_lossy().chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        if path.is_dir() && numeric_name {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Loads `meta.json` from a product directory. Missing or unreadable metadata
/// is not an error; classification just runs without product context.
pub fn load_metadata(product_dir: &Path) -> Option<ProductMetadata> {
    let meta_path = product_dir.join("meta.json");
    let text = std::fs::read_to_string(&meta_path).ok()?;
    match serde_json::from_str(&text) {
        Ok(meta) => Some(meta),
        Err(error) => {
            debug!(path = %meta_path.display(), %error, "ignoring unreadable meta.json");
            None
        }
    }
}

/// Writes the per-product classification report as pretty-printed JSON.
pub fn write_report(
    output_dir: &Path,
    report: &ProductClassification,
) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(output_dir).map_err(|source| StoreError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let path = output_dir.join(format!("{}_classification.json", report.product_id));
    let text = serde_json::to_string_pretty(report).map_err(|source| StoreError::Json {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, text).map_err(|source| StoreError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Copies the planned selections into the target directory. Existing targets
/// are left alone. Returns the names actually copied.
pub fn run_export_plan(target_dir: &Path, plan: &ExportPlan) -> Result<Vec<String>, StoreError> {
    std::fs::create_dir_all(target_dir).map_err(|source| StoreError::Write {
        path: target_dir.to_path_buf(),
        source,
    })?;

    let mut copied = Vec::new();
    for item in &plan.items {
        let target = target_dir.join(&item.target_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&item.source, &target).map_err(|source| StoreError::Write {
            path: target.clone(),
            source,
        })?;
        copied.push(item.target_name.clone());
    }
    Ok(copied)
}

/// Merges an extracted composition into the product's `meta.json`, preserving
/// every field the crawl stage wrote. Image-derived values live under their
/// own keys so they never clobber the listed fabric data. A missing
/// `meta.json` makes this a no-op.
pub fn merge_composition(
    product_dir: &Path,
    update: &CompositionUpdate,
) -> Result<(), StoreError> {
    let meta_path = product_dir.join("meta.json");
    let Ok(text) = std::fs::read_to_string(&meta_path) else {
        return Ok(());
    };
    let mut meta: Value = serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: meta_path.clone(),
        source,
    })?;
    let Some(fields) = meta.as_object_mut() else {
        return Ok(());
    };

    fields.insert(
        "extracted_composition".to_string(),
        json!(&update.composition),
    );
    fields.insert("extracted_material".to_string(), json!(&update.material));
    fields.insert(
        "extracted_composition_source".to_string(),
        json!({
            "file_name": &update.source.file_name,
            "file_path": &update.source.file_path,
            "confidence": update.source.confidence,
        }),
    );

    let text = serde_json::to_string_pretty(&meta).map_err(|source| StoreError::Json {
        path: meta_path.clone(),
        source,
    })?;
    std::fs::write(&meta_path, text).map_err(|source| StoreError::Write {
        path: meta_path,
        source,
    })
}
