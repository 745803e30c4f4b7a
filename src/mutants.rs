use serde::{Deserialize, Serialize};

use crate::operators;

/// Outcome PIT reported for a single mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutantStatus {
    Killed,
    Survived,
    NoCoverage,
    TimedOut,
    NonViable,
    MemoryError,
    RunError,
    /// Anything else, including an absent or empty status attribute.
    Other(String),
}

impl MutantStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "KILLED" => MutantStatus::Killed,
            "SURVIVED" => MutantStatus::Survived,
            "NO_COVERAGE" => MutantStatus::NoCoverage,
            "TIMED_OUT" => MutantStatus::TimedOut,
            "NON_VIABLE" => MutantStatus::NonViable,
            "MEMORY_ERROR" => MutantStatus::MemoryError,
            "RUN_ERROR" => MutantStatus::RunError,
            other => MutantStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MutantStatus::Killed => "KILLED",
            MutantStatus::Survived => "SURVIVED",
            MutantStatus::NoCoverage => "NO_COVERAGE",
            MutantStatus::TimedOut => "TIMED_OUT",
            MutantStatus::NonViable => "NON_VIABLE",
            MutantStatus::MemoryError => "MEMORY_ERROR",
            MutantStatus::RunError => "RUN_ERROR",
            MutantStatus::Other(raw) => raw,
        }
    }
}

/// One mutation as read from the report. Never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub class: String,
    pub method: String,
    pub method_signature: String,
    pub line: usize,
    pub mutator_id: String,
    pub description: Option<String>,
    pub status: MutantStatus,
    pub source_file_hint: Option<String>,
    pub killing_test_id: Option<String>,
}

impl MutationRecord {
    /// Not detected by any test: `SURVIVED` or `NO_COVERAGE`.
    pub fn survived(&self) -> bool {
        matches!(self.status, MutantStatus::Survived | MutantStatus::NoCoverage)
    }

    pub fn killed(&self) -> bool {
        self.status == MutantStatus::Killed
    }

    pub fn mutator_description(&self) -> String {
        operators::describe_mutator(&self.mutator_id, self.description.as_deref())
    }

    pub fn simple_class_name(&self) -> &str {
        simple_class_name(&self.class)
    }

    /// `Class.method (line N): description`
    pub fn human_readable(&self) -> String {
        format!(
            "{}.{} (line {}): {}",
            self.class,
            self.method,
            self.line,
            self.mutator_description()
        )
    }
}

/// Last segment of a dotted class name (`com.example.Foo` -> `Foo`).
pub fn simple_class_name(class: &str) -> &str {
    match class.rfind('.') {
        Some(idx) => &class[idx + 1..],
        None => class,
    }
}

/// Package part of a dotted class name, if any.
pub fn package_name(class: &str) -> Option<&str> {
    class.rfind('.').map(|idx| &class[..idx])
}
