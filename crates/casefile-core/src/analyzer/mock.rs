//! Mock analyzer for testing
//!
//! Returns canned responses and records every request it receives.
//! Useful for unit tests and offline development without the analysis service.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{Error, Result};

use super::types::{AnalyzeRequest, AnalyzeResponse, CategoryEditRequest, CategoryEditResponse};
use super::Analyzer;

type Reply<T> = std::result::Result<T, (Option<u16>, String)>;

#[derive(Default)]
struct MockState {
    analysis: Option<Reply<AnalyzeResponse>>,
    recompute: Option<Reply<CategoryEditResponse>>,
    analyze_requests: Vec<AnalyzeRequest>,
    recompute_requests: Vec<CategoryEditRequest>,
}

#[derive(Clone)]
pub struct MockAnalyzer {
    /// Whether health_check should return true
    pub healthy: bool,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalyzer {
    /// Create a healthy mock that answers with an empty analysis
    pub fn new() -> Self {
        Self {
            healthy: true,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Answer every analysis call with this response
    pub fn with_analysis(self, response: AnalyzeResponse) -> Self {
        self.lock().analysis = Some(Ok(response));
        self
    }

    /// Fail every analysis call as if the service answered with `status`
    pub fn with_analysis_failure(self, status: u16, detail: &str) -> Self {
        self.lock().analysis = Some(Err((Some(status), detail.to_string())));
        self
    }

    pub fn with_recompute(self, response: CategoryEditResponse) -> Self {
        self.lock().recompute = Some(Ok(response));
        self
    }

    pub fn with_recompute_failure(self, status: u16, detail: &str) -> Self {
        self.lock().recompute = Some(Err((Some(status), detail.to_string())));
        self
    }

    /// Analysis requests received so far
    pub fn analyze_requests(&self) -> Vec<AnalyzeRequest> {
        self.lock().analyze_requests.clone()
    }

    /// Category recomputation requests received so far
    pub fn recompute_requests(&self) -> Vec<CategoryEditRequest> {
        self.lock().recompute_requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn empty_analysis() -> String {
    json!({
        "Transactions": [],
        "EOD": [],
        "Particulars": [],
        "Income Receipts": [],
        "Important Expenses": [],
        "Other Expenses": [],
        "Opportunity to Earn": []
    })
    .to_string()
}

fn into_result<T>(reply: Reply<T>) -> Result<T> {
    reply.map_err(|(status, detail)| Error::AnalysisFailed { status, detail })
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze_statements(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let mut state = self.lock();
        state.analyze_requests.push(request.clone());
        into_result(
            state
                .analysis
                .clone()
                .unwrap_or_else(|| Ok(AnalyzeResponse::with_data(empty_analysis()))),
        )
    }

    async fn recompute_categories(
        &self,
        request: &CategoryEditRequest,
    ) -> Result<CategoryEditResponse> {
        let mut state = self.lock();
        state.recompute_requests.push(request.clone());
        into_result(
            state
                .recompute
                .clone()
                .unwrap_or_else(|| Ok(CategoryEditResponse::with_data(empty_analysis()))),
        )
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn host(&self) -> &str {
        "mock"
    }
}
