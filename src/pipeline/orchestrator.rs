//! Fans one product's images out to the vision model under a bounded
//! concurrency gate, absorbs per-image failures, and runs selection over the
//! complete normalized set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classification::ImageClassification;
use super::normalizer;
use super::selection::{self, SelectionResult};
use crate::classifier::{build_prompt, ImageRef, ImageSource, VisionClassifier};
use crate::config::Configuration;
use crate::error::{ClassifyError, PipelineError};
use crate::metadata::ProductMetadata;

/// Per-product report: the full audit trail of normalized records plus the
/// selection derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductClassification {
    pub product_id: String,
    pub run_id: Uuid,
    pub classified_at: DateTime<Utc>,
    pub total_images: usize,
    pub classifications: Vec<ImageClassification>,
    pub selected: SelectionResult,
}

pub struct BatchOrchestrator {
    classifier: Arc<dyn VisionClassifier>,
    source: Arc<dyn ImageSource>,
    configuration: Configuration,
}

impl BatchOrchestrator {
    pub fn new(
        classifier: Arc<dyn VisionClassifier>,
        source: Arc<dyn ImageSource>,
        configuration: Configuration,
    ) -> Self {
        Self {
            classifier,
            source,
            configuration,
        }
    }

    /// Classifies every image of one product and selects the best per slot.
    ///
    /// All images run to completion (success or failure record) before the
    /// selection engine sees the set; a single image's failure never cancels
    /// its siblings. Images are processed and re-collected in file-name order
    /// so completion order cannot leak into the result.
    pub async fn classify_product(
        &self,
        product_id: &str,
        mut images: Vec<ImageRef>,
        metadata: Option<&ProductMetadata>,
    ) -> Result<ProductClassification, PipelineError> {
        if images.is_empty() {
            return Err(PipelineError::EmptyProduct(product_id.to_string()));
        }
        images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        let expected_colors = metadata
            .map(ProductMetadata::expected_colors)
            .unwrap_or_default();
        let prompt = build_prompt(metadata);
        let semaphore = Arc::new(Semaphore::new(self.configuration.max_concurrent_requests));

        info!(
            product = product_id,
            images = images.len(),
            concurrency = self.configuration.max_concurrent_requests,
            "classifying product images"
        );

        let tasks = images.iter().map(|image| {
            let semaphore = Arc::clone(&semaphore);
            let prompt = prompt.as_str();
            let expected_colors = expected_colors.as_slice();
            async move {
                match self
                    .classify_one(image, prompt, expected_colors, &semaphore)
                    .await
                {
                    Ok(record) => {
                        debug!(
                            file = %image.file_name,
                            category = record.category.as_str(),
                            color = record.color.as_deref().unwrap_or("-"),
                            "classified"
                        );
                        record
                    }
                    Err(error) => {
                        warn!(file = %image.file_name, %error, "classification failed");
                        ImageClassification::failure(image, error.to_string())
                    }
                }
            }
        });
        let mut classifications = join_all(tasks).await;
        classifications.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        let selected = selection::select(&classifications);

        Ok(ProductClassification {
            product_id: product_id.to_string(),
            run_id: Uuid::new_v4(),
            classified_at: Utc::now(),
            total_images: classifications.len(),
            classifications,
            selected,
        })
    }

    async fn classify_one(
        &self,
        image: &ImageRef,
        prompt: &str,
        expected_colors: &[String],
        semaphore: &Semaphore,
    ) -> Result<ImageClassification, ClassifyError> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| ClassifyError::Transport("concurrency gate closed".to_string()))?;
        let bytes = self.source.load(image).await?;
        let raw = self
            .classifier
            .classify(&bytes, image.mime_type(), prompt)
            .await?;
        normalizer::normalize(image, &raw, expected_colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::category::ImageCategory;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::classifier::RawClassification;

    /// Hands each image its own file name as bytes, so the stub classifier
    /// can answer per image without touching the filesystem.
    struct NameAsBytesSource;

    #[async_trait]
    impl ImageSource for NameAsBytesSource {
        async fn load(&self, image: &ImageRef) -> Result<Vec<u8>, ClassifyError> {
            Ok(image.file_name.clone().into_bytes())
        }
    }

    struct StubClassifier {
        responses: HashMap<String, serde_json::Value>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubClassifier {
        fn new(responses: HashMap<String, serde_json::Value>) -> Self {
            Self {
                responses,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VisionClassifier for StubClassifier {
        async fn classify(
            &self,
            image_bytes: &[u8],
            _mime_type: &str,
            _prompt: &str,
        ) -> Result<RawClassification, ClassifyError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let file_name = String::from_utf8(image_bytes.to_vec()).unwrap();
            match self.responses.get(&file_name) {
                Some(value) => Ok(RawClassification(value.clone())),
                None => Err(ClassifyError::Transport("connection reset".to_string())),
            }
        }
    }

    fn images(names: &[&str]) -> Vec<ImageRef> {
        names
            .iter()
            .map(|name| ImageRef::new(format!("output/images/1/{name}")))
            .collect()
    }

    fn orchestrator_with(
        responses: HashMap<String, serde_json::Value>,
        concurrency: usize,
    ) -> (BatchOrchestrator, Arc<StubClassifier>) {
        let classifier = Arc::new(StubClassifier::new(responses));
        let orchestrator = BatchOrchestrator::new(
            Arc::clone(&classifier) as Arc<dyn VisionClassifier>,
            Arc::new(NameAsBytesSource),
            Configuration::default().with_max_concurrent_requests(concurrency),
        );
        (orchestrator, classifier)
    }

    #[tokio::test]
    async fn empty_product_is_rejected_up_front() {
        let (orchestrator, _) = orchestrator_with(HashMap::new(), 2);
        let result = orchestrator.classify_product("31106295", Vec::new(), None).await;
        assert!(matches!(result, Err(PipelineError::EmptyProduct(_))));
    }

    #[tokio::test]
    async fn every_image_yields_exactly_one_record() {
        let mut responses = HashMap::new();
        responses.insert(
            "001.jpg".to_string(),
            json!({ "category": "worn_front", "color": "베이지", "confidence": 0.9 }),
        );
        responses.insert(
            "003.jpg".to_string(),
            json!({ "category": "product_front", "color": "베이지", "confidence": 0.8 }),
        );
        // 002.jpg and 004.jpg have no stub response and fail at transport.
        let (orchestrator, _) = orchestrator_with(responses, 4);

        let report = orchestrator
            .classify_product(
                "31106295",
                images(&["004.jpg", "002.jpg", "001.jpg", "003.jpg"]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.total_images, 4);
        assert_eq!(report.classifications.len(), 4);
        let names: Vec<&str> = report
            .classifications
            .iter()
            .map(|record| record.file_name.as_str())
            .collect();
        assert_eq!(names, vec!["001.jpg", "002.jpg", "003.jpg", "004.jpg"]);

        let failed: Vec<&str> = report
            .classifications
            .iter()
            .filter(|record| record.category == ImageCategory::Error)
            .map(|record| record.file_name.as_str())
            .collect();
        assert_eq!(failed, vec!["002.jpg", "004.jpg"]);

        // Failures stayed local: the healthy records still drive selection.
        assert_eq!(
            report.selected.worn_shots_by_color["베이지"].file_name,
            "001.jpg"
        );
    }

    #[tokio::test]
    async fn malformed_responses_become_error_records() {
        let mut responses = HashMap::new();
        responses.insert("001.jpg".to_string(), json!("not an object"));
        responses.insert(
            "002.jpg".to_string(),
            json!({ "category": "worn_front", "confidence": 0.9 }),
        );
        let (orchestrator, _) = orchestrator_with(responses, 2);

        let report = orchestrator
            .classify_product("31106295", images(&["001.jpg", "002.jpg"]), None)
            .await
            .unwrap();

        let bad = &report.classifications[0];
        assert_eq!(bad.category, ImageCategory::Error);
        assert!(bad.error.as_deref().unwrap().contains("single object"));
        assert_eq!(report.classifications[1].category, ImageCategory::WornFront);
    }

    #[tokio::test]
    async fn concurrency_stays_under_the_configured_ceiling() {
        let mut responses = HashMap::new();
        for i in 0..12 {
            responses.insert(
                format!("{i:03}.jpg"),
                json!({ "category": "other", "confidence": 0.5 }),
            );
        }
        let names: Vec<String> = (0..12).map(|i| format!("{i:03}.jpg")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (orchestrator, classifier) = orchestrator_with(responses, 3);

        orchestrator
            .classify_product("31106295", images(&name_refs), None)
            .await
            .unwrap();

        assert!(classifier.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(classifier.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn expected_colors_from_metadata_gate_reported_colors() {
        let mut responses = HashMap::new();
        responses.insert(
            "001.jpg".to_string(),
            json!({ "category": "worn_front", "color": "아이보리 혼방", "confidence": 0.9 }),
        );
        responses.insert(
            "002.jpg".to_string(),
            json!({ "category": "worn_front", "color": "네이비", "confidence": 0.9 }),
        );
        let (orchestrator, _) = orchestrator_with(responses, 2);

        let metadata = ProductMetadata {
            option_colors: Some(vec!["아이보리".to_string(), "베이지".to_string()]),
            ..ProductMetadata::default()
        };
        let report = orchestrator
            .classify_product("31106295", images(&["001.jpg", "002.jpg"]), Some(&metadata))
            .await
            .unwrap();

        assert_eq!(
            report.classifications[0].color.as_deref(),
            Some("아이보리")
        );
        assert!(report.classifications[1].color.is_none());
    }
}
