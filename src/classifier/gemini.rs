//! Gemini `generateContent` adapter for the [`VisionClassifier`] seam.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use super::adapter::{RawClassification, VisionClassifier};
use crate::config::Configuration;
use crate::error::ClassifyError;

/// HTTP client for the Gemini REST API, JSON response mode. The request
/// timeout configured on the underlying client is the only deadline in the
/// pipeline; a timeout surfaces as a per-image transport failure.
pub struct GeminiVisionClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
}

impl GeminiVisionClient {
    pub fn new(configuration: &Configuration) -> Result<Self, ClassifyError> {
        let http = reqwest::Client::builder()
            .timeout(configuration.request_timeout)
            .build()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            model: configuration.model.clone(),
            base_url: configuration.base_url.clone(),
            api_key: configuration.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl VisionClassifier for GeminiVisionClient {
    async fn classify(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<RawClassification, ClassifyError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": mime_type,
                            "data": BASE64.encode(image_bytes),
                        }
                    },
                    { "text": prompt },
                ]
            }],
            "generationConfig": {
                "temperature": 0.1,
                "responseMimeType": "application/json",
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Transport(format!(
                "classifier returned HTTP {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let text = payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClassifyError::MalformedResponse("no candidate text in response".to_string())
            })?;

        let value: Value = serde_json::from_str(text).map_err(|e| {
            ClassifyError::MalformedResponse(format!("candidate text is not JSON: {e}"))
        })?;
        Ok(RawClassification(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let configuration = Configuration::default()
            .with_base_url("https://generativelanguage.googleapis.com/")
            .with_model("gemini-2.5-flash");
        let client = GeminiVisionClient::new(&configuration).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
