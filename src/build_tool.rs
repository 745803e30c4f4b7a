//! Build-tool detection and PIT invocation for Maven and Gradle projects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::runner::{self, ProcessError};

pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("could not detect build system in {} (Maven or Gradle required)", dir.display())]
    Undetected { dir: PathBuf },
    #[error("{tool} PIT execution failed: {source}")]
    Execution {
        tool: &'static str,
        #[source]
        source: ProcessError,
    },
    #[error("mutation testing finished but no mutations.xml was found under {}", dir.display())]
    ReportMissing { dir: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSystem {
    Maven,
    Gradle,
}

#[derive(Debug, Clone)]
pub struct BuildTool {
    pub system: BuildSystem,
    pub project_dir: PathBuf,
}

impl BuildTool {
    /// Maven wins when both build files are present.
    pub fn detect(project_dir: &Path) -> Option<BuildTool> {
        let system = if project_dir.join("pom.xml").exists() {
            BuildSystem::Maven
        } else if project_dir.join("build.gradle").exists()
            || project_dir.join("build.gradle.kts").exists()
        {
            BuildSystem::Gradle
        } else {
            return None;
        };
        Some(BuildTool {
            system,
            project_dir: project_dir.to_path_buf(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self.system {
            BuildSystem::Maven => "Maven",
            BuildSystem::Gradle => "Gradle",
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.project_dir.join("src").join("main").join("java")
    }

    pub fn test_dir(&self) -> PathBuf {
        self.project_dir.join("src").join("test").join("java")
    }

    fn reports_dir(&self) -> PathBuf {
        match self.system {
            BuildSystem::Maven => self.project_dir.join("target").join("pit-reports"),
            BuildSystem::Gradle => self.project_dir.join("build").join("reports").join("pitest"),
        }
    }

    /// Program and arguments that run PIT, preferring the project's wrapper script.
    pub fn command(&self) -> (String, Vec<&'static str>) {
        let (wrapper, fallback, args) = match self.system {
            BuildSystem::Maven => (
                "mvnw",
                "mvn",
                vec![
                    "test-compile",
                    "org.pitest:pitest-maven:mutationCoverage",
                    "-DoutputFormats=XML,HTML",
                    "-DtimestampedReports=false",
                ],
            ),
            BuildSystem::Gradle => ("gradlew", "gradle", vec!["pitest", "--no-daemon"]),
        };
        let wrapper_path = self.project_dir.join(wrapper);
        let program = if wrapper_path.exists() {
            wrapper_path.to_string_lossy().into_owned()
        } else {
            fallback.to_string()
        };
        (program, args)
    }

    /// Run mutation testing and return the path of the XML report.
    pub fn run_mutation_testing(&self, timeout: Duration) -> Result<PathBuf, BuildError> {
        let (program, args) = self.command();
        tracing::info!(tool = self.name(), command = %runner::describe_command(&program, &args), "running mutation testing");
        runner::run_command(&program, &args, &self.project_dir, &[], timeout).map_err(
            |source| BuildError::Execution {
                tool: self.name(),
                source,
            },
        )?;
        self.locate_report()
    }

    pub fn locate_report(&self) -> Result<PathBuf, BuildError> {
        let dir = self.reports_dir();
        let direct = dir.join("mutations.xml");
        if direct.is_file() {
            return Ok(direct);
        }
        find_mutations_xml(&dir).ok_or(BuildError::ReportMissing { dir })
    }
}

/// Depth-first search for `mutations.xml`, for timestamped report directories.
pub fn find_mutations_xml(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.flatten().collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if entry.file_name() == "mutations.xml" && path.is_file() {
            return Some(path);
        }
        if path.is_dir() {
            if let Some(found) = find_mutations_xml(&path) {
                return Some(found);
            }
        }
    }
    None
}
