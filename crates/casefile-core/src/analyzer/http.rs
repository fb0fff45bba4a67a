//! HTTP analyzer implementation

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AnalyzerSettings;
use crate::error::{Error, Result};
use crate::sanitize::parse_sanitized;

use super::types::{AnalyzeRequest, AnalyzeResponse, CategoryEditRequest, CategoryEditResponse};
use super::Analyzer;

/// Analyzer reached over HTTP/JSON
///
/// A single request can take minutes for large statements, so the client is
/// built with the configured (long) timeout.
#[derive(Clone)]
pub struct HttpAnalyzer {
    http_client: Client,
    base_url: String,
    analyze_url: String,
    category_edit_url: String,
    health_url: String,
}

impl HttpAnalyzer {
    pub fn new(settings: &AnalyzerSettings) -> Result<Self> {
        let http_client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            analyze_url: settings.analyze_url(),
            category_edit_url: settings.category_edit_url(),
            health_url: settings.health_url(),
        })
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::AnalysisFailed {
                status: e.status().map(|s| s.as_u16()),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(failure_from(response).await);
        }

        let text = response.text().await?;
        let envelope = parse_sanitized(&text)?;
        Ok(serde_json::from_value(envelope)?)
    }
}

/// Turn a non-2xx response into `AnalysisFailed`, preferring the service's `detail` field
async fn failure_from(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let detail = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(obj)) => match obj.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => truncate(&body),
        },
        _ => truncate(&body),
    };

    Error::AnalysisFailed {
        status: Some(status),
        detail,
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze_statements(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        info!(
            files = request.len(),
            ca_id = %request.ca_id,
            "Sending statements to analyzer"
        );
        let response: AnalyzeResponse = self.post_json(&self.analyze_url, request).await?;
        debug!(status = ?response.status, message = ?response.message, "Analyzer responded");
        Ok(response)
    }

    async fn recompute_categories(
        &self,
        request: &CategoryEditRequest,
    ) -> Result<CategoryEditResponse> {
        info!(
            rows = request.transaction_sheet.len(),
            ca_id = %request.ca_id,
            "Sending edited categories to analyzer"
        );
        self.post_json(&self.category_edit_url, request).await
    }

    async fn health_check(&self) -> bool {
        match self.http_client.get(&self.health_url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
