//! Analyzer wire types
//!
//! The analyzer takes parallel arrays (one slot per uploaded file) and answers
//! with an envelope whose `data` field is itself JSON text that may need repair.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::EodEntry;
use crate::sanitize::parse_sanitized;

/// Batched analysis request; every vector is indexed by file position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub bank_names: Vec<String>,
    pub pdf_paths: Vec<String>,
    pub passwords: Vec<String>,
    pub start_date: Vec<String>,
    pub end_date: Vec<String>,
    pub ca_id: String,
}

impl AnalyzeRequest {
    pub fn len(&self) -> usize {
        self.pdf_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pdf_paths.is_empty()
    }
}

/// Files the analyzer could not extract, plus whatever context it echoed back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotExtracted {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Named-entity results, indexed by file position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NerResults {
    #[serde(rename = "Name", default)]
    pub names: Vec<Option<String>>,
    #[serde(rename = "Acc Number", default)]
    pub account_numbers: Vec<Option<String>>,
}

impl NerResults {
    pub fn name_at(&self, index: usize) -> Option<&str> {
        non_blank(self.names.get(index))
    }

    pub fn account_number_at(&self, index: usize) -> Option<&str> {
        non_blank(self.account_numbers.get(index))
    }
}

fn non_blank(slot: Option<&Option<String>>) -> Option<&str> {
    slot.and_then(|s| s.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Response envelope of the analyze endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// JSON text needing repair, or an already structured payload
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub pdf_paths_not_extracted: Option<NotExtracted>,
    #[serde(default)]
    pub ner_results: Option<NerResults>,
}

impl AnalyzeResponse {
    /// Build a response whose payload is the given JSON text
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            status: Some("success".to_string()),
            data: Some(Value::String(data.into())),
            ..Default::default()
        }
    }

    /// Repair and parse the `data` payload
    pub fn payload(&self) -> Result<Value> {
        decode_payload(self.data.as_ref())
    }
}

/// Per-category totals sent alongside the edited transaction sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Credit")]
    pub credit: f64,
    #[serde(rename = "Debit")]
    pub debit: f64,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Category recomputation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEditRequest {
    pub transaction_sheet: Vec<Value>,
    pub category_table: Vec<CategoryTotal>,
    pub eod: Vec<EodEntry>,
    pub ca_id: String,
}

/// Response envelope of the category-edit endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryEditResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl CategoryEditResponse {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            status: Some("success".to_string()),
            data: Some(Value::String(data.into())),
            ..Default::default()
        }
    }

    pub fn payload(&self) -> Result<Value> {
        decode_payload(self.data.as_ref())
    }
}

fn decode_payload(data: Option<&Value>) -> Result<Value> {
    match data {
        None | Some(Value::Null) => Err(Error::analysis(
            "Empty or invalid response received from analysis server",
        )),
        Some(Value::String(text)) if text.trim().is_empty() => Err(Error::analysis(
            "Empty or invalid response received from analysis server",
        )),
        Some(Value::String(text)) => parse_sanitized(text),
        Some(structured) => Ok(structured.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_envelope_deserializes() {
        let body = json!({
            "status": "success",
            "message": "done",
            "data": "{\"Transactions\": [{\"Credit\": NaN}]}",
            "pdf_paths_not_extracted": {"paths": ["/tmp/a.pdf"], "bank_names": ["HDFC"]},
            "ner_results": {"Name": ["ASHA RAO", null], "Acc Number": ["001122"]}
        });
        let response: AnalyzeResponse = serde_json::from_value(body).unwrap();

        let payload = response.payload().unwrap();
        assert_eq!(payload["Transactions"][0]["Credit"], Value::Null);

        let failed = response.pdf_paths_not_extracted.unwrap();
        assert_eq!(failed.paths, vec!["/tmp/a.pdf".to_string()]);
        assert_eq!(failed.extra["bank_names"], json!(["HDFC"]));

        let ner = response.ner_results.unwrap();
        assert_eq!(ner.name_at(0), Some("ASHA RAO"));
        assert_eq!(ner.name_at(1), None);
        assert_eq!(ner.account_number_at(0), Some("001122"));
        assert_eq!(ner.account_number_at(5), None);
    }

    #[test]
    fn test_structured_payload_passes_through() {
        let response = AnalyzeResponse {
            data: Some(json!({"Transactions": []})),
            ..Default::default()
        };
        assert_eq!(response.payload().unwrap(), json!({"Transactions": []}));
    }

    #[test]
    fn test_empty_payload_is_analysis_failure() {
        let response = AnalyzeResponse::default();
        assert!(matches!(
            response.payload(),
            Err(Error::AnalysisFailed { .. })
        ));

        let response = AnalyzeResponse::with_data("  ");
        assert!(matches!(
            response.payload(),
            Err(Error::AnalysisFailed { .. })
        ));

        let response = AnalyzeResponse::with_data("{broken");
        assert!(matches!(
            response.payload(),
            Err(Error::MalformedResponse(_))
        ));
    }
}
