//! Statement analyzer client abstraction
//!
//! PDF extraction, entity recognition and categorization all happen in an
//! external HTTP service. This module is the seam to it.
//!
//! # Architecture
//!
//! - `Analyzer` trait: the operations the pipeline needs from the service
//! - `AnalyzerClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `HttpAnalyzer`, `MockAnalyzer`
//!
//! # Configuration
//!
//! Environment variables:
//! - `CASEFILE_ANALYZER`: implementation to use (http, mock). Default: http
//! - `CASEFILE_ANALYZER_URL` / `CASEFILE_ANALYZER_TIMEOUT_SECS`: see `config`

mod http;
mod mock;
pub mod types;

pub use http::HttpAnalyzer;
pub use mock::MockAnalyzer;
pub use types::*;

use async_trait::async_trait;

use crate::config::AnalyzerSettings;
use crate::error::Result;

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run extraction and analysis over a batch of statement files
    async fn analyze_statements(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse>;

    /// Recompute summary and opportunity data after category edits
    async fn recompute_categories(
        &self,
        request: &CategoryEditRequest,
    ) -> Result<CategoryEditResponse>;

    /// Check if the service is reachable
    async fn health_check(&self) -> bool;

    /// Base URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete analyzer client enum
#[derive(Clone)]
pub enum AnalyzerClient {
    Http(HttpAnalyzer),
    Mock(MockAnalyzer),
}

impl AnalyzerClient {
    /// Pick the implementation from `CASEFILE_ANALYZER` (default `http`)
    pub fn from_settings(settings: &AnalyzerSettings) -> Result<Self> {
        let kind = std::env::var("CASEFILE_ANALYZER").unwrap_or_else(|_| "http".to_string());

        match kind.to_lowercase().as_str() {
            "http" => Ok(AnalyzerClient::Http(HttpAnalyzer::new(settings)?)),
            "mock" => Ok(AnalyzerClient::Mock(MockAnalyzer::new())),
            _ => {
                tracing::warn!(analyzer = %kind, "Unknown CASEFILE_ANALYZER, falling back to http");
                Ok(AnalyzerClient::Http(HttpAnalyzer::new(settings)?))
            }
        }
    }

    pub fn http(settings: &AnalyzerSettings) -> Result<Self> {
        Ok(AnalyzerClient::Http(HttpAnalyzer::new(settings)?))
    }

    pub fn mock(mock: MockAnalyzer) -> Self {
        AnalyzerClient::Mock(mock)
    }
}

#[async_trait]
impl Analyzer for AnalyzerClient {
    async fn analyze_statements(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        match self {
            AnalyzerClient::Http(a) => a.analyze_statements(request).await,
            AnalyzerClient::Mock(a) => a.analyze_statements(request).await,
        }
    }

    async fn recompute_categories(
        &self,
        request: &CategoryEditRequest,
    ) -> Result<CategoryEditResponse> {
        match self {
            AnalyzerClient::Http(a) => a.recompute_categories(request).await,
            AnalyzerClient::Mock(a) => a.recompute_categories(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AnalyzerClient::Http(a) => a.health_check().await,
            AnalyzerClient::Mock(a) => a.health_check().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            AnalyzerClient::Http(a) => a.host(),
            AnalyzerClient::Mock(a) => a.host(),
        }
    }
}
