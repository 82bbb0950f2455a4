//! Marketplace Authentication - API Key Header
//!
//! The marketplace authenticates requests with a static API key sent in
//! the `x-api-key` header. The key comes from the `OPENSEA_API_KEY`
//! environment variable and is never written to config or logs.

use anyhow::{Context, Result, ensure};
use reqwest::RequestBuilder;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENSEA_API_KEY";

/// Marketplace API credentials.
pub struct MarketplaceAuth {
    api_key: String,
}

impl MarketplaceAuth {
    /// Load the API key from `OPENSEA_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).context("OPENSEA_API_KEY not set")?;
        Self::new(api_key)
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        ensure!(!api_key.is_empty(), "marketplace API key is empty");
        Ok(Self { api_key })
    }

    /// Attach the credentials to a request.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }
}

impl std::fmt::Debug for MarketplaceAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceAuth")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
