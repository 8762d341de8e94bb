//! Seams between the pipeline and its external collaborators: the vision
//! model and whatever holds the image bytes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ClassifyError;

/// Identity of one source image, unique per product by `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub file_name: String,
    pub file_path: PathBuf,
}

impl ImageRef {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            file_path,
        }
    }

    /// MIME type inferred from the file extension. Unknown extensions are
    /// treated as JPEG, matching what the crawl stage downloads.
    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.file_path)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// The vision model's verbatim judgment for one image. Untrusted free-form
/// JSON; nothing downstream reads it without going through the normalizer.
#[derive(Debug, Clone)]
pub struct RawClassification(pub serde_json::Value);

/// One opaque call to the external vision capability.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    async fn classify(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<RawClassification, ClassifyError>;
}

/// Collaborator that resolves an [`ImageRef`] to its bytes. The pipeline
/// itself performs no file I/O.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, image: &ImageRef) -> Result<Vec<u8>, ClassifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_derived_from_path() {
        let image = ImageRef::new("output/images/54822073/003.webp");
        assert_eq!(image.file_name, "003.webp");
        assert_eq!(image.mime_type(), "image/webp");
    }

    #[test]
    fn unknown_extension_defaults_to_jpeg() {
        assert_eq!(ImageRef::new("a/b/photo.bmp").mime_type(), "image/jpeg");
        assert_eq!(ImageRef::new("a/b/photo").mime_type(), "image/jpeg");
        assert_eq!(ImageRef::new("a/b/PHOTO.PNG").mime_type(), "image/png");
    }
}
