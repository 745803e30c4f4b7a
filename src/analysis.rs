//! Context extraction for a single surviving mutation.
//!
//! Given a [`MutationRecord`] and the project's source/test roots, an
//! [`Analyzer`] locates the mutated source file, renders a numbered window of
//! lines around the mutation, isolates the enclosing method, and finds the
//! conventional test class if one already exists.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mutants::{self, MutationRecord};
use crate::parser;

pub const SOURCE_EXTENSION: &str = "java";

/// Lines shown on each side of the mutated line.
pub const CONTEXT_MARGIN: usize = 5;

pub const MUTATION_MARKER: &str = ">>> ";
const PLAIN_MARKER: &str = "    ";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not find source file for {class} (looked for {})", expected.display())]
    SourceNotFound { class: String, expected: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the generation step needs to know about one mutation.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub mutation: MutationRecord,
    pub source_file: PathBuf,
    pub source_code: String,
    pub mutated_method: Option<String>,
    pub context_window: String,
    /// Where the conventional test class lives, whether or not it exists yet.
    pub test_file_target: PathBuf,
    pub existing_test_file: Option<PathBuf>,
    pub existing_test_code: Option<String>,
}

impl Analysis {
    pub fn has_existing_test(&self) -> bool {
        self.existing_test_file.is_some() && self.existing_test_code.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    source_root: PathBuf,
    test_root: PathBuf,
}

impl Analyzer {
    pub fn new(source_root: impl Into<PathBuf>, test_root: impl Into<PathBuf>) -> Self {
        Analyzer {
            source_root: source_root.into(),
            test_root: test_root.into(),
        }
    }

    pub fn analyze(&self, mutation: &MutationRecord) -> Result<Analysis, AnalysisError> {
        let source_file = self.find_source_file(mutation)?;
        let source_code = read(&source_file)?;

        let mutated_method = parser::find_method(&source_code, &mutation.method);
        if mutated_method.is_none() {
            tracing::debug!(
                class = %mutation.class,
                method = %mutation.method,
                declared = ?parser::list_methods(&source_code),
                "method declaration not found"
            );
        }
        let context_window = context_window(&source_code, mutation.line);

        let test_file_target = self.test_file_path(&mutation.class);
        let (existing_test_file, existing_test_code) = if test_file_target.is_file() {
            let code = read(&test_file_target)?;
            (Some(test_file_target.clone()), Some(code))
        } else {
            (None, None)
        };

        Ok(Analysis {
            mutation: mutation.clone(),
            source_file,
            source_code,
            mutated_method,
            context_window,
            test_file_target,
            existing_test_file,
            existing_test_code,
        })
    }

    /// Resolve `com.example.Foo` to `<source_root>/com/example/Foo.java`.
    ///
    /// Nested classes (`Outer$Inner`) resolve to the outer file. When that file
    /// is missing, the report's source-file hint is tried in the same package.
    pub fn find_source_file(&self, mutation: &MutationRecord) -> Result<PathBuf, AnalysisError> {
        let top_level = outer_class(&mutation.class);
        let expected = self
            .source_root
            .join(class_relative_path(top_level, SOURCE_EXTENSION));
        if expected.is_file() {
            return Ok(expected);
        }

        if let Some(hint) = mutation.source_file_hint.as_deref() {
            let by_hint = package_dir(&self.source_root, top_level).join(hint);
            if by_hint.is_file() {
                return Ok(by_hint);
            }
        }

        Err(AnalysisError::SourceNotFound {
            class: mutation.class.clone(),
            expected,
        })
    }

    /// Conventional test path: `<test_root>/<package>/<Simple>Test.java`.
    pub fn test_file_path(&self, class: &str) -> PathBuf {
        let top_level = outer_class(class);
        package_dir(&self.test_root, top_level).join(format!(
            "{}.{}",
            test_class_name(top_level),
            SOURCE_EXTENSION
        ))
    }
}

fn read(path: &Path) -> Result<String, AnalysisError> {
    std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn outer_class(class: &str) -> &str {
    match class.find('$') {
        Some(idx) => &class[..idx],
        None => class,
    }
}

fn package_dir(root: &Path, class: &str) -> PathBuf {
    match mutants::package_name(class) {
        Some(pkg) => pkg.split('.').fold(root.to_path_buf(), |p, seg| p.join(seg)),
        None => root.to_path_buf(),
    }
}

pub fn class_relative_path(class: &str, extension: &str) -> PathBuf {
    let mut path: PathBuf = class.split('.').collect();
    path.set_extension(extension);
    path
}

/// `com.example.Foo` -> `FooTest`
pub fn test_class_name(class: &str) -> String {
    format!("{}Test", mutants::simple_class_name(outer_class(class)))
}

/// Numbered lines `max(1, line-5)..=min(n, line+5)`; the mutated line carries `>>> `.
pub fn context_window(source: &str, line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let first = line.saturating_sub(CONTEXT_MARGIN).max(1);
    let last = line.saturating_add(CONTEXT_MARGIN).min(lines.len());

    let mut out = String::new();
    for number in first..=last {
        let marker = if number == line { MUTATION_MARKER } else { PLAIN_MARKER };
        out.push_str(&format!("{}{:>4}: {}\n", marker, number, lines[number - 1]));
    }
    out
}
