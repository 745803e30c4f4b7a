use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::prompt;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_MUTANTS: usize = 10;

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const TOKEN_ENV: &str = "GIT_TOKEN";
pub const TOKEN_FALLBACK_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Anthropic API key not set. Pass --api-key or set {API_KEY_ENV}.")]
    MissingApiKey,
    #[error("Git provider token required. Set --token, {TOKEN_ENV}, or {TOKEN_FALLBACK_ENV}.")]
    MissingToken,
    #[error("{what} directory not found: {}", path.display())]
    MissingDirectory { what: &'static str, path: PathBuf },
}

/// Raw, unvalidated inputs for [`Config::new`].
#[derive(Debug, Clone, Default)]
pub struct ConfigInput {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub source_dir: PathBuf,
    pub test_dir: PathBuf,
    pub prompt_dir: Option<PathBuf>,
    pub generation_timeout: Option<Duration>,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Run configuration. Built once, validated at construction, never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    model: String,
    api_key: String,
    source_dir: PathBuf,
    test_dir: PathBuf,
    prompt_dir: Option<PathBuf>,
    generation_timeout: Duration,
    dry_run: bool,
    verbose: bool,
}

impl Config {
    pub fn new(input: ConfigInput) -> Result<Config, ConfigError> {
        let api_key = input
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(Config {
            model: input
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            source_dir: input.source_dir,
            test_dir: input.test_dir,
            prompt_dir: input.prompt_dir,
            generation_timeout: input
                .generation_timeout
                .unwrap_or(DEFAULT_GENERATION_TIMEOUT),
            dry_run: input.dry_run,
            verbose: input.verbose,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    pub fn prompt_dir(&self) -> Option<&Path> {
        self.prompt_dir.as_deref()
    }

    pub fn generation_timeout(&self) -> Duration {
        self.generation_timeout
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// `<prompt_dir>/<name>.md` if present and readable.
    pub fn load_prompt(&self, name: &str) -> Option<String> {
        let path = self.prompt_dir.as_ref()?.join(format!("{name}.md"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if path.exists() => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable prompt override, using default");
                None
            }
            Err(_) => None,
        }
    }

    pub fn system_prompt(&self) -> String {
        self.load_prompt("system")
            .unwrap_or_else(|| prompt::DEFAULT_SYSTEM_PROMPT.to_string())
    }
}

/// First non-blank value of: explicit flag, primary variable, fallback variable.
pub fn resolve_credential(
    explicit: Option<&str>,
    primary: Option<&str>,
    fallback: Option<&str>,
) -> Option<String> {
    [explicit, primary, fallback]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
