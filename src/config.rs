use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Runtime configuration passed into the orchestrator at construction.
/// There are no process-wide singletons; everything the pipeline needs to
/// reach the vision model travels through this object.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            max_concurrent_requests: 10,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Configuration {
    // Sets the vision model id, this will override the default configuration.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    // Sets the API base URL, this will override the default configuration.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    // Adjusts the per-product concurrency ceiling for classification requests.
    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Settings as loaded from an optional `stylelens` config file layered with
/// `STYLELENS_*` environment variables. Unset fields fall back to
/// [`Configuration::default`].
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_concurrent_requests: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("stylelens").required(false));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        builder
            .add_source(config::Environment::with_prefix("STYLELENS"))
            .build()?
            .try_deserialize()
    }

    pub fn into_configuration(self) -> Configuration {
        let mut configuration = Configuration::default();
        if let Some(model) = self.model {
            configuration = configuration.with_model(model);
        }
        if let Some(base_url) = self.base_url {
            configuration = configuration.with_base_url(base_url);
        }
        if let Some(api_key) = self.api_key {
            configuration = configuration.with_api_key(api_key);
        }
        if let Some(limit) = self.max_concurrent_requests {
            configuration = configuration.with_max_concurrent_requests(limit);
        }
        if let Some(secs) = self.request_timeout_secs {
            configuration = configuration.with_request_timeout(Duration::from_secs(secs));
        }
        configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let configuration = Configuration::default();
        assert_eq!(configuration.max_concurrent_requests, 10);
        assert_eq!(configuration.request_timeout, Duration::from_secs(60));
        assert!(configuration.api_key.is_empty());
    }

    #[test]
    fn concurrency_ceiling_is_at_least_one() {
        let configuration = Configuration::default().with_max_concurrent_requests(0);
        assert_eq!(configuration.max_concurrent_requests, 1);
    }

    #[test]
    fn settings_override_defaults() {
        let settings = Settings {
            model: Some("gemini-2.0-pro".to_string()),
            max_concurrent_requests: Some(4),
            request_timeout_secs: Some(15),
            ..Settings::default()
        };
        let configuration = settings.into_configuration();
        assert_eq!(configuration.model, "gemini-2.0-pro");
        assert_eq!(configuration.max_concurrent_requests, 4);
        assert_eq!(configuration.request_timeout, Duration::from_secs(15));
        assert_eq!(
            configuration.base_url,
            "https://generativelanguage.googleapis.com"
        );
    }
}
