//! Reader for PIT `mutations.xml` reports.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::mutants::{MutantStatus, MutationRecord};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed mutation report {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

#[derive(Debug, Deserialize)]
struct MutationsReport {
    #[serde(rename = "mutation", default)]
    mutations: Vec<MutationElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationElement {
    #[serde(rename = "@status", default)]
    status: String,
    #[serde(default)]
    source_file: Option<String>,
    #[serde(default)]
    mutated_class: String,
    #[serde(default)]
    mutated_method: String,
    #[serde(default)]
    method_description: String,
    #[serde(default)]
    line_number: usize,
    #[serde(default)]
    mutator: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    killing_test: Option<String>,
}

impl From<MutationElement> for MutationRecord {
    fn from(el: MutationElement) -> Self {
        MutationRecord {
            class: el.mutated_class,
            method: el.mutated_method,
            method_signature: el.method_description,
            line: el.line_number,
            mutator_id: el.mutator,
            description: non_empty(el.description),
            status: MutantStatus::parse(&el.status),
            source_file_hint: non_empty(el.source_file),
            killing_test_id: non_empty(el.killing_test),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse report XML text into records, preserving report order.
pub fn parse_str(xml: &str, origin: &Path) -> Result<Vec<MutationRecord>, ReportError> {
    if !xml.trim_start().starts_with('<') {
        return Err(ReportError::Malformed {
            path: origin.to_path_buf(),
            message: "document does not start with an XML element".to_string(),
        });
    }
    let report: MutationsReport =
        quick_xml::de::from_str(xml).map_err(|e| ReportError::Malformed {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(report.mutations.into_iter().map(MutationRecord::from).collect())
}

pub fn parse_file(path: &Path) -> Result<Vec<MutationRecord>, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let xml = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&xml, path)
}

/// Totals over a parsed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportTotals {
    pub total: usize,
    pub survived: usize,
    pub killed: usize,
}

pub fn totals(records: &[MutationRecord]) -> ReportTotals {
    ReportTotals {
        total: records.len(),
        survived: records.iter().filter(|r| r.survived()).count(),
        killed: records.iter().filter(|r| r.killed()).count(),
    }
}
