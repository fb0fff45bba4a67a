//! Test utilities for casefile-core
//!
//! This module provides a mock statement-analyzer HTTP server that can be used
//! for development and integration tests of the real HTTP client.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::config::AnalyzerSettings;

/// A canned reply: status code plus raw body text
#[derive(Clone)]
struct Canned {
    status: u16,
    body: String,
}

struct ServerState {
    analyze: Canned,
    edit: Canned,
    analyze_requests: Vec<Value>,
    edit_requests: Vec<Value>,
}

type Shared = Arc<Mutex<ServerState>>;

/// Mock analyzer server for testing and development
///
/// Bodies are served verbatim, so tests can hand back non-JSON tokens like `NaN`.
pub struct MockAnalyzerServer {
    addr: SocketAddr,
    state: Shared,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAnalyzerServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(ServerState {
            analyze: Canned {
                status: 200,
                body: envelope(&empty_analysis()),
            },
            edit: Canned {
                status: 200,
                body: envelope(&empty_analysis()),
            },
            analyze_requests: Vec::new(),
            edit_requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/analyze-statements/", post(handle_analyze))
            .route("/edit-category/", post(handle_edit))
            .route("/health", get(handle_health))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Analyzer settings pointing at this server
    pub fn settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            base_url: self.url(),
            timeout: Duration::from_secs(5),
            ..AnalyzerSettings::default()
        }
    }

    /// Serve this raw body from the analyze endpoint
    pub fn respond_analyze(&self, status: u16, body: impl Into<String>) {
        self.lock().analyze = Canned {
            status,
            body: body.into(),
        };
    }

    /// Serve this raw body from the category-edit endpoint
    pub fn respond_edit(&self, status: u16, body: impl Into<String>) {
        self.lock().edit = Canned {
            status,
            body: body.into(),
        };
    }

    /// JSON bodies posted to the analyze endpoint so far
    pub fn analyze_requests(&self) -> Vec<Value> {
        self.lock().analyze_requests.clone()
    }

    /// JSON bodies posted to the category-edit endpoint so far
    pub fn edit_requests(&self) -> Vec<Value> {
        self.lock().edit_requests.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MockAnalyzerServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wrap a payload the way the analyzer does: a JSON string inside `data`
pub fn envelope(payload: &str) -> String {
    json!({
        "status": "success",
        "message": "Statements analyzed",
        "data": payload
    })
    .to_string()
}

/// Analysis payload with every top-level key present and empty
pub fn empty_analysis() -> String {
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

fn reply(canned: Canned) -> impl IntoResponse {
    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
}

async fn handle_analyze(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let canned = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.analyze_requests.push(body);
        state.analyze.clone()
    };
    reply(canned)
}

async fn handle_edit(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let canned = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.edit_requests.push(body);
        state.edit.clone()
    };
    reply(canned)
}

async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{
        Analyzer, AnalyzeRequest, CategoryEditRequest, HttpAnalyzer,
    };
    use crate::error::Error;

    fn request() -> AnalyzeRequest {
        AnalyzeRequest {
            bank_names: vec!["HDFC".into()],
            pdf_paths: vec!["/tmp/uploads/1-hdfc.pdf".into()],
            passwords: vec![String::new()],
            start_date: vec!["01-04-2023".into()],
            end_date: vec!["30-04-2023".into()],
            ca_id: "Acme Traders".into(),
        }
    }

    #[tokio::test]
    async fn test_http_analyze_round_trip() {
        let server = MockAnalyzerServer::start().await;
        server.respond_analyze(
            200,
            r#"{"status":"success","data":"{\"Transactions\":[{\"Credit\":NaN,\"Debit\":12.5}]}","ner_results":{"Name":["ASHA RAO"],"Acc Number":[null]}}"#,
        );
        let analyzer = HttpAnalyzer::new(&server.settings()).unwrap();

        let response = analyzer.analyze_statements(&request()).await.unwrap();
        let payload = response.payload().unwrap();

        assert_eq!(payload["Transactions"][0]["Credit"], Value::Null);
        assert_eq!(payload["Transactions"][0]["Debit"], 12.5);
        let ner = response.ner_results.unwrap();
        assert_eq!(ner.name_at(0), Some("ASHA RAO"));
        assert_eq!(ner.account_number_at(0), None);

        let received = server.analyze_requests();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["ca_id"], "Acme Traders");
        assert_eq!(received[0]["bank_names"][0], "HDFC");
    }

    #[tokio::test]
    async fn test_http_envelope_with_bare_nan() {
        let server = MockAnalyzerServer::start().await;
        server.respond_analyze(
            200,
            r#"{"status":"success","data":{"EOD":[{"Day":1,"Apr-2023":NaN}]}}"#,
        );
        let analyzer = HttpAnalyzer::new(&server.settings()).unwrap();

        let payload = analyzer
            .analyze_statements(&request())
            .await
            .unwrap()
            .payload()
            .unwrap();
        assert_eq!(payload["EOD"][0]["Apr-2023"], Value::Null);
    }

    #[tokio::test]
    async fn test_http_error_uses_detail() {
        let server = MockAnalyzerServer::start().await;
        server.respond_analyze(422, r#"{"detail":"Password required for HDFC"}"#);
        let analyzer = HttpAnalyzer::new(&server.settings()).unwrap();

        let err = analyzer.analyze_statements(&request()).await.unwrap_err();
        match err {
            Error::AnalysisFailed { status, detail } => {
                assert_eq!(status, Some(422));
                assert_eq!(detail, "Password required for HDFC");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_without_json_body() {
        let server = MockAnalyzerServer::start().await;
        server.respond_edit(503, "upstream unavailable");
        let analyzer = HttpAnalyzer::new(&server.settings()).unwrap();

        let err = analyzer
            .recompute_categories(&CategoryEditRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert!(err.to_string().contains("upstream unavailable"));
        assert_eq!(server.edit_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_http_malformed_envelope() {
        let server = MockAnalyzerServer::start().await;
        server.respond_analyze(200, "<html>gateway</html>");
        let analyzer = HttpAnalyzer::new(&server.settings()).unwrap();

        assert!(matches!(
            analyzer.analyze_statements(&request()).await,
            Err(Error::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_http_health_check() {
        let mut server = MockAnalyzerServer::start().await;
        let analyzer = HttpAnalyzer::new(&server.settings()).unwrap();
        assert!(analyzer.health_check().await);
        assert_eq!(analyzer.host(), server.url());

        server.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let unreachable = HttpAnalyzer::new(&AnalyzerSettings {
            base_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_secs(1),
            ..AnalyzerSettings::default()
        })
        .unwrap();
        assert!(!unreachable.health_check().await);
    }
}
