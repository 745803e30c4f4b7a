//! Batch driver: select surviving mutations, then extract, generate, insert
//! and (optionally) publish each one in turn.
//!
//! One item's failure never stops the batch. Everything that can go wrong for
//! a single mutation is a [`PipelineError`], caught in [`Orchestrator::run`]
//! and counted.

use serde::Serialize;
use thiserror::Error;

use crate::analysis::{AnalysisError, Analyzer};
use crate::codegen::TestImprover;
use crate::git::{BestEffort, GitError, VersionControl};
use crate::improvement::{ApplyOutcome, Improvement, InsertError};
use crate::mutants::MutationRecord;
use crate::output;
use crate::provider::{HostingProvider, ProviderError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("could not generate a fix")]
    NoImprovement,
    #[error(transparent)]
    Insert(#[from] InsertError),
    #[error("test already present in {}, nothing to publish", .0.display())]
    NothingToPublish(std::path::PathBuf),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub survived: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// What happened to one mutation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Dry run: the fix was generated and shown, nothing written.
    Previewed,
    Applied(ApplyOutcome),
    Published { branch: String, url: String },
}

/// The publish half of the pipeline: one working copy plus one hosting backend.
pub struct Publisher {
    vcs: Box<dyn VersionControl>,
    provider: Box<dyn HostingProvider>,
    base_branch: String,
}

impl Publisher {
    pub fn new(
        vcs: Box<dyn VersionControl>,
        provider: Box<dyn HostingProvider>,
        base_branch: impl Into<String>,
    ) -> Self {
        Publisher {
            vcs,
            provider,
            base_branch: base_branch.into(),
        }
    }

    /// Branch, apply, commit, push, open the change request. The working copy
    /// is returned to the base branch afterwards whatever the result.
    fn publish(
        &mut self,
        index: usize,
        improvement: &Improvement,
    ) -> Result<ItemOutcome, PipelineError> {
        let mutation = &improvement.analysis().mutation;
        let branch = branch_name(mutation, index);
        let result = self.publish_on_branch(&branch, improvement);
        if let BestEffort::Swallowed(reason) = self.vcs.return_to_base(&self.base_branch) {
            tracing::debug!(branch = %branch, reason = %reason, "recovery checkout swallowed");
        }
        let url = result?;
        Ok(ItemOutcome::Published { branch, url })
    }

    fn publish_on_branch(
        &mut self,
        branch: &str,
        improvement: &Improvement,
    ) -> Result<String, PipelineError> {
        let mutation = &improvement.analysis().mutation;
        self.vcs.create_branch(branch, &self.base_branch)?;

        match improvement.apply()? {
            ApplyOutcome::AlreadyPresent(path) => return Err(PipelineError::NothingToPublish(path)),
            outcome => tracing::debug!(branch, ?outcome, "fix applied"),
        }

        self.vcs.commit_and_push(branch, &commit_message(mutation))?;
        let url = self.provider.create_pull_request(
            branch,
            &self.base_branch,
            &pull_request_title(mutation),
            &pull_request_body(mutation, improvement.generated_code()),
        )?;
        tracing::info!(branch, provider = self.provider.name(), url = %url, "change request ready");
        Ok(url)
    }
}

pub struct Orchestrator {
    analyzer: Analyzer,
    improver: TestImprover,
    publisher: Option<Publisher>,
    max_mutants: usize,
    dry_run: bool,
    verbose: bool,
}

impl Orchestrator {
    pub fn new(analyzer: Analyzer, improver: TestImprover, max_mutants: usize) -> Self {
        Orchestrator {
            analyzer,
            improver,
            publisher: None,
            max_mutants,
            dry_run: false,
            verbose: false,
        }
    }

    pub fn with_publisher(mut self, publisher: Publisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_publishing(&self) -> bool {
        self.publisher.is_some() && !self.dry_run
    }

    /// Process up to `max_mutants` surviving records, in report order.
    pub fn run(&mut self, records: &[MutationRecord]) -> RunStats {
        let selected = select_survivors(records, self.max_mutants);
        let mut stats = RunStats {
            total: records.len(),
            survived: records.iter().filter(|r| r.survived()).count(),
            ..RunStats::default()
        };

        for (index, record) in selected.iter().enumerate() {
            output::print_mutant_header(index + 1, selected.len(), record);
            stats.processed += 1;

            match self.process(index, record) {
                Ok(outcome) => {
                    stats.succeeded += 1;
                    output::print_outcome(&outcome);
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        class = %record.class,
                        method = %record.method,
                        line = record.line,
                        error = %e,
                        "mutant processing failed"
                    );
                    output::print_failure(&e, self.verbose);
                }
            }
            println!();
        }
        stats
    }

    fn process(
        &mut self,
        index: usize,
        record: &MutationRecord,
    ) -> Result<ItemOutcome, PipelineError> {
        let analysis = self.analyzer.analyze(record)?;
        tracing::debug!(
            class = %record.class,
            method = %record.method,
            line = record.line,
            existing_test = analysis.has_existing_test(),
            "analysis complete"
        );

        let improvement = self
            .improver
            .improve(&analysis)
            .ok_or(PipelineError::NoImprovement)?;

        if self.dry_run {
            output::print_preview(&improvement.preview());
            return Ok(ItemOutcome::Previewed);
        }
        if self.verbose {
            output::print_preview(&improvement.preview());
        }

        match self.publisher.as_mut() {
            Some(publisher) => publisher.publish(index, &improvement),
            None => Ok(ItemOutcome::Applied(improvement.apply()?)),
        }
    }
}

/// The first `cap` surviving records, in report order.
pub fn select_survivors(records: &[MutationRecord], cap: usize) -> Vec<&MutationRecord> {
    records.iter().filter(|r| r.survived()).take(cap).collect()
}

/// `mutant-killer/fix-<class>-<method>-<line>-<index>`, lowercased.
pub fn branch_name(mutation: &MutationRecord, index: usize) -> String {
    format!(
        "mutant-killer/fix-{}-{}-{}-{}",
        mutation.simple_class_name().to_lowercase(),
        mutation.method.to_lowercase(),
        mutation.line,
        index
    )
}

pub fn commit_message(mutation: &MutationRecord) -> String {
    format!(
        "Kill mutant: {}.{} (line {})\n\nMutator: {}\n\nGenerated by mutant-killer",
        mutation.class,
        mutation.method,
        mutation.line,
        mutation.mutator_description()
    )
}

pub fn pull_request_title(mutation: &MutationRecord) -> String {
    format!(
        "Kill mutant in {}.{}",
        mutation.simple_class_name(),
        mutation.method
    )
}

pub fn pull_request_body(mutation: &MutationRecord, generated_code: &str) -> String {
    let mut body = String::new();
    body.push_str("## Mutation Details\n\n");
    body.push_str("| Property | Value |\n");
    body.push_str("|----------|-------|\n");
    body.push_str(&format!("| Class | `{}` |\n", mutation.class));
    body.push_str(&format!("| Method | `{}` |\n", mutation.method));
    body.push_str(&format!("| Line | {} |\n", mutation.line));
    body.push_str(&format!("| Mutator | {} |\n\n", mutation.mutator_description()));

    body.push_str("## Why This Mutation Survived\n\n");
    body.push_str(
        "The existing tests did not verify the behavior this mutation changes. \
         This change adds a test that fails when the mutation is applied.\n\n",
    );

    body.push_str("## Changes\n\n");
    body.push_str("```java\n");
    body.push_str(generated_code.trim_end());
    body.push_str("\n```\n\n");
    body.push_str("---\n*Generated by mutant-killer*");
    body
}
