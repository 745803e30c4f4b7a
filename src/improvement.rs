//! Insertion of generated test code into the working copy.
//!
//! A fragment either becomes a new test file at the conventional path, or is
//! spliced into the existing test class just before its closing brace. The
//! merge is textual: nothing outside the insertion point is rewritten.

use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};
use thiserror::Error;

use crate::analysis::{self, Analysis};
use crate::parser;

const MEMBER_INDENT: &str = "    ";

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no class body found in {}", path.display())]
    NoClassBody { path: PathBuf },
    #[error("refusing to overwrite {}, which appeared after analysis", path.display())]
    TargetExists { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Dry run: nothing touched.
    Skipped,
    Created(PathBuf),
    Merged(PathBuf),
    /// The fragment is already in the test file; nothing written.
    AlreadyPresent(PathBuf),
}

impl ApplyOutcome {
    pub fn changed_files(&self) -> bool {
        matches!(self, ApplyOutcome::Created(_) | ApplyOutcome::Merged(_))
    }
}

#[derive(Debug, Clone)]
pub struct Improvement {
    analysis: Analysis,
    generated_code: String,
    dry_run: bool,
}

impl Improvement {
    pub fn new(analysis: Analysis, generated_code: String, dry_run: bool) -> Self {
        Improvement {
            analysis,
            generated_code,
            dry_run,
        }
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn generated_code(&self) -> &str {
        &self.generated_code
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn is_new_file(&self) -> bool {
        !self.analysis.has_existing_test()
    }

    pub fn target_path(&self) -> &Path {
        self.analysis
            .existing_test_file
            .as_deref()
            .unwrap_or(&self.analysis.test_file_target)
    }

    /// Human-readable rendering of what [`apply`](Self::apply) would do.
    pub fn preview(&self) -> String {
        let m = &self.analysis.mutation;
        let mut out = String::new();
        out.push_str("=== Proposed Test Improvement ===\n");
        out.push_str(&format!("Mutation: {}.{} (line {})\n", m.class, m.method, m.line));
        out.push_str(&format!("Mutator: {}\n", m.mutator_description()));

        match (&self.analysis.existing_test_file, &self.analysis.existing_test_code) {
            (Some(path), Some(existing)) => {
                out.push_str(&format!("Target: {}\n\n", path.display()));
                out.push_str("Code to add:\n");
                out.push_str(&self.generated_code);
                out.push('\n');
                let class = analysis::test_class_name(&m.class);
                if let Some(merged) = insert_into_class(existing, &self.generated_code, Some(&class)) {
                    out.push_str("\nDiff:\n");
                    out.push_str(&render_diff(existing, &merged));
                }
            }
            _ => {
                out.push_str(&format!(
                    "Target: NEW TEST FILE {}\n\n",
                    self.analysis.test_file_target.display()
                ));
                out.push_str(&self.generated_code);
                out.push('\n');
            }
        }
        out
    }

    /// Write the fragment into the working copy. A no-op under dry run.
    pub fn apply(&self) -> Result<ApplyOutcome, InsertError> {
        if self.dry_run {
            return Ok(ApplyOutcome::Skipped);
        }
        if self.is_new_file() {
            self.apply_new_file()
        } else {
            self.apply_merge()
        }
    }

    fn apply_new_file(&self) -> Result<ApplyOutcome, InsertError> {
        let path = &self.analysis.test_file_target;
        if path.exists() {
            return Err(InsertError::TargetExists { path: path.clone() });
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| InsertError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut content = self.generated_code.clone();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        write_replacing(path, &content)?;
        tracing::info!(path = %path.display(), "created test file");
        Ok(ApplyOutcome::Created(path.clone()))
    }

    fn apply_merge(&self) -> Result<ApplyOutcome, InsertError> {
        let path = self.target_path().to_path_buf();
        // Re-read: an earlier mutant in this run may have grown the file.
        let existing = std::fs::read_to_string(&path).map_err(|source| InsertError::Read {
            path: path.clone(),
            source,
        })?;

        if contains_fragment(&existing, &self.generated_code) {
            tracing::info!(path = %path.display(), "fragment already present, not inserting again");
            return Ok(ApplyOutcome::AlreadyPresent(path));
        }

        let class = analysis::test_class_name(&self.analysis.mutation.class);
        let merged = insert_into_class(&existing, &self.generated_code, Some(&class))
            .ok_or_else(|| InsertError::NoClassBody { path: path.clone() })?;
        write_replacing(&path, &merged)?;
        tracing::info!(path = %path.display(), "merged test into existing class");
        Ok(ApplyOutcome::Merged(path))
    }
}

/// Temp file beside `target`, renamed over it, so a failed write never
/// leaves a half-written test file behind.
fn write_replacing(target: &Path, content: &str) -> Result<(), InsertError> {
    let tmp = temp_path(target);
    let result = std::fs::write(&tmp, content).and_then(|()| std::fs::rename(&tmp, target));
    if let Err(source) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(InsertError::Write {
            path: target.to_path_buf(),
            source,
        });
    }
    Ok(())
}

pub fn temp_path(target: &Path) -> PathBuf {
    let mut tmp = target.to_path_buf();
    let name = format!(
        ".{}.mutant-killer.tmp",
        target.file_name().unwrap_or_default().to_string_lossy()
    );
    tmp.set_file_name(name);
    tmp
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `fragment` already occurs in `existing`, ignoring whitespace layout.
pub fn contains_fragment(existing: &str, fragment: &str) -> bool {
    let needle = normalize_whitespace(fragment);
    !needle.is_empty() && normalize_whitespace(existing).contains(&needle)
}

/// `existing` with `fragment` added as the last member of the test class.
///
/// Returns `None` when no class body can be found.
pub fn insert_into_class(existing: &str, fragment: &str, class_name: Option<&str>) -> Option<String> {
    let close = parser::class_body_close(existing, class_name).or_else(|| {
        // Unparseable file: fall back to the last closing brace.
        existing.rfind('}').filter(|_| existing.contains('{'))
    })?;

    let line_start = existing[..close].rfind('\n').map_or(0, |i| i + 1);
    let brace_indent = &existing[line_start..close];
    let brace_indent = if brace_indent.trim().is_empty() { brace_indent } else { "" };
    let member_indent = format!("{brace_indent}{MEMBER_INDENT}");

    let eol = if existing.contains("\r\n") { "\r\n" } else { "\n" };
    let block = indent_block(&dedent_fragment(fragment), &member_indent).replace('\n', eol);

    let head = existing[..close].trim_end();
    let mut merged = String::with_capacity(existing.len() + fragment.len() + 64);
    merged.push_str(head);
    merged.push_str(eol);
    merged.push_str(eol);
    merged.push_str(&block);
    merged.push_str(eol);
    merged.push_str(brace_indent);
    merged.push_str(&existing[close..]);
    Some(merged)
}

/// Undo the indentation left on every line but the first after trimming.
fn dedent_fragment(fragment: &str) -> String {
    let lines: Vec<&str> = fragment.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let indent_of = |l: &str| l.len() - l.trim_start().len();

    let rest_min = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let closes_at_min = lines
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim_start().starts_with('}') && indent_of(l) == rest_min);

    if rest_min == 0 || !closes_at_min || indent_of(lines[0]) != 0 {
        return fragment.to_string();
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 || l.trim().is_empty() {
                l.trim_end().to_string()
            } else {
                l.get(rest_min..).unwrap_or_else(|| l.trim_start()).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_block(block: &str, indent: &str) -> String {
    block
        .lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `- `/`+ ` lines for everything that changed between two texts.
pub fn render_diff(original: &str, updated: &str) -> String {
    let diff = TextDiff::from_lines(original, updated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "- ",
            ChangeTag::Insert => "+ ",
            ChangeTag::Equal => continue,
        };
        output.push_str(sign);
        output.push_str(change.value());
        if change.missing_newline() {
            output.push('\n');
        }
    }
    output
}
