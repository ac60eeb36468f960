//! Provider-specific URL layout and authentication.
//!
//! The thread/run API is served by `OpenAI`, by Azure `OpenAI` under a
//! different path scheme, and by compatible self-hosted services. This module
//! hides those differences from the HTTP backend.

/// Azure API version used when talking to Azure `OpenAI` assistants.
pub const AZURE_ASSISTANTS_API_VERSION: &str = "2024-05-01-preview";

/// Header value selecting the v2 assistants API.
pub const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

/// Supported assistant API providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// API version (e.g., "2024-05-01-preview")
        api_version: String,
    },
    /// Generic OpenAI-compatible service
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use assistant_relay::llm::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://api.openai.com");
    /// assert_eq!(provider, Provider::OpenAI);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("azure.com") {
            Self::AzureOpenAI {
                api_version: AZURE_ASSISTANTS_API_VERSION.to_string(),
            }
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Build the URL for an assistants API path such as `threads/abc/runs`.
    ///
    /// A base URL that already ends in `/v1` is not given a second one.
    #[must_use]
    pub fn build_url(&self, base_url: &str, path: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');

        match self {
            Self::AzureOpenAI { api_version } => {
                format!("{base}/openai/{path}?api-version={api_version}")
            }
            Self::OpenAI | Self::Generic => {
                if base.ends_with("/v1") {
                    format!("{base}/{path}")
                } else {
                    format!("{base}/v1/{path}")
                }
            }
        }
    }

    /// Attach credentials and provider headers to a request.
    pub fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        match self {
            Self::AzureOpenAI { .. } => request.header("api-key", api_key),
            Self::OpenAI | Self::Generic => request
                .bearer_auth(api_key)
                .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_openai() {
        let provider = Provider::detect_from_url("https://api.openai.com");
        assert_eq!(provider, Provider::OpenAI);
    }

    #[test]
    fn test_detect_azure() {
        let provider = Provider::detect_from_url("https://my-resource.openai.azure.com");
        assert!(matches!(provider, Provider::AzureOpenAI { .. }));
    }

    #[test]
    fn test_detect_generic() {
        let provider = Provider::detect_from_url("http://localhost:8080");
        assert_eq!(provider, Provider::Generic);
    }

    #[test]
    fn test_build_url_openai() {
        let url = Provider::OpenAI.build_url("https://api.openai.com/", "threads");
        assert_eq!(url, "https://api.openai.com/v1/threads");
    }

    #[test]
    fn test_build_url_does_not_double_version() {
        let url = Provider::Generic.build_url("http://localhost:8080/v1", "/threads/t1/runs");
        assert_eq!(url, "http://localhost:8080/v1/threads/t1/runs");
    }

    #[test]
    fn test_build_url_azure() {
        let provider = Provider::AzureOpenAI {
            api_version: "2024-05-01-preview".to_string(),
        };
        let url = provider.build_url("https://my-resource.openai.azure.com", "threads/t1");
        assert_eq!(
            url,
            "https://my-resource.openai.azure.com/openai/threads/t1?api-version=2024-05-01-preview"
        );
    }
}
