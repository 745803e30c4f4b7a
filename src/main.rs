use mutant_killer::analysis::Analyzer;
use mutant_killer::build_tool::{self, BuildError, BuildTool};
use mutant_killer::codegen::TestImprover;
use mutant_killer::config::{self, Config, ConfigError, ConfigInput};
use mutant_killer::git::{self, RepositoryManager};
use mutant_killer::orchestrator::{self, Orchestrator, Publisher};
use mutant_killer::output;
use mutant_killer::provider::{GitProvider, HostingProvider};
use mutant_killer::report;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mutant-killer",
    version,
    about = "Generate tests that kill surviving PIT mutants"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GenerationArgs {
    /// Maximum number of surviving mutants to process
    #[arg(long, default_value_t = config::DEFAULT_MAX_MUTANTS)]
    max_mutants: usize,
    /// Show proposed changes without writing or publishing anything
    #[arg(long)]
    dry_run: bool,
    /// Verbose output, including full error chains
    #[arg(short, long)]
    verbose: bool,
    /// Model id for the generation service
    #[arg(long, default_value = config::DEFAULT_MODEL)]
    model: String,
    /// Generation service API key
    #[arg(long, env = config::API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
    /// Directory with prompt overrides (system.md)
    #[arg(long)]
    prompt_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a PIT mutations.xml report and list surviving mutants
    Analyze {
        /// Path to the PIT mutations.xml report
        report: PathBuf,
        /// List every mutation, not only survivors
        #[arg(long)]
        all: bool,
        /// Show mutator ids, descriptions, source files and killing tests
        #[arg(short, long)]
        verbose: bool,
        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Generate tests for surviving mutants in a local checkout
    Kill {
        /// Path to the PIT mutations.xml report
        report: PathBuf,
        /// Source root
        #[arg(long, default_value = "src/main/java")]
        source: PathBuf,
        /// Test root
        #[arg(long, default_value = "src/test/java")]
        test: PathBuf,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Clone a repository, run PIT, and open a change request per killed mutant
    Run {
        /// Repository URL (GitHub, GitLab or Azure DevOps)
        repo_url: String,
        /// Hosting provider token (falls back to GIT_TOKEN, then GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Branch to fork fix branches from and target change requests at
        #[arg(long, default_value = "main")]
        base_branch: String,
        /// Where to clone (default: <tmp>/mutant-killer/<repo>)
        #[arg(long)]
        work_dir: Option<PathBuf>,
        #[command(flatten)]
        generation: GenerationArgs,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Analyze { .. } => false,
            Commands::Kill { generation, .. } | Commands::Run { generation, .. } => {
                generation.verbose
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.command.verbose());

    let exit_code = match cli.command {
        Commands::Analyze {
            report,
            all,
            verbose,
            json,
        } => cmd_analyze(&report, all, verbose, json),
        Commands::Kill {
            report,
            source,
            test,
            generation,
        } => cmd_kill(&report, source, test, generation),
        Commands::Run {
            repo_url,
            token,
            base_branch,
            work_dir,
            generation,
        } => cmd_run(&repo_url, token, &base_branch, work_dir, generation),
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fail(msg: impl std::fmt::Display) -> i32 {
    output::print_error(&msg.to_string());
    1
}

fn cmd_analyze(report_path: &Path, all: bool, verbose: bool, json_mode: bool) -> i32 {
    let records = match report::parse_file(report_path) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let shown: Vec<_> = records.iter().filter(|r| all || r.survived()).collect();

    if json_mode {
        return match serde_json::to_string_pretty(&shown) {
            Ok(text) => {
                println!("{text}");
                0
            }
            Err(e) => fail(format!("Failed to serialize report: {e}")),
        };
    }

    println!("=== Mutation Analysis ===");
    output::print_totals(&report::totals(&records));
    println!();
    output::print_mutation_listing(&shown, all, verbose);
    0
}

fn build_config(
    generation: &GenerationArgs,
    source_dir: PathBuf,
    test_dir: PathBuf,
) -> Result<Config, ConfigError> {
    Config::new(ConfigInput {
        model: Some(generation.model.clone()),
        api_key: generation.api_key.clone(),
        source_dir,
        test_dir,
        prompt_dir: generation.prompt_dir.clone(),
        generation_timeout: None,
        dry_run: generation.dry_run,
        verbose: generation.verbose,
    })
}

fn cmd_kill(report_path: &Path, source: PathBuf, test: PathBuf, generation: GenerationArgs) -> i32 {
    if !source.is_dir() {
        return fail(ConfigError::MissingDirectory {
            what: "Source",
            path: source,
        });
    }
    if !test.is_dir() {
        return fail(ConfigError::MissingDirectory {
            what: "Test",
            path: test,
        });
    }
    let config = match build_config(&generation, source, test) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    println!("Parsing PIT report...");
    let records = match report::parse_file(report_path) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let survivors = orchestrator::select_survivors(&records, generation.max_mutants).len();
    if survivors == 0 {
        output::print_success("No surviving mutants found. Your tests are strong!");
        return 0;
    }
    println!("Found {survivors} surviving mutants to kill.\n");

    let improver = match TestImprover::from_config(&config) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    let analyzer = Analyzer::new(config.source_dir(), config.test_dir());
    let mut orchestrator = Orchestrator::new(analyzer, improver, generation.max_mutants)
        .dry_run(config.dry_run())
        .verbose(config.verbose());

    let stats = orchestrator.run(&records);
    output::print_summary(&stats, false, config.dry_run());
    0
}

fn cmd_run(
    repo_url: &str,
    token: Option<String>,
    base_branch: &str,
    work_dir: Option<PathBuf>,
    generation: GenerationArgs,
) -> i32 {
    let token = match config::resolve_credential(
        token.as_deref(),
        std::env::var(config::TOKEN_ENV).ok().as_deref(),
        std::env::var(config::TOKEN_FALLBACK_ENV).ok().as_deref(),
    ) {
        Some(t) => t,
        None => return fail(ConfigError::MissingToken),
    };
    if config::resolve_credential(generation.api_key.as_deref(), None, None).is_none() {
        return fail(ConfigError::MissingApiKey);
    }
    let provider = match GitProvider::detect(repo_url, &token) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    output::print_banner(repo_url, provider.name(), base_branch);

    let work_dir = work_dir.unwrap_or_else(|| {
        std::env::temp_dir()
            .join("mutant-killer")
            .join(git::extract_repo_name(repo_url))
    });
    // clone_or_update places the checkout under work_dir/<repo>
    let mut repo = RepositoryManager::new(work_dir, token);

    output::print_step(1, "Cloning repository...");
    let repo_path = match repo.clone_or_update(repo_url, base_branch) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    output::print_info(&format!("Cloned to: {}", repo_path.display()));

    println!();
    output::print_step(2, "Running mutation tests...");
    let build = match BuildTool::detect(&repo_path) {
        Some(b) => b,
        None => return fail(BuildError::Undetected { dir: repo_path }),
    };
    output::print_info(&format!("Build system: {}", build.name()));
    let report_path = match build.run_mutation_testing(build_tool::DEFAULT_BUILD_TIMEOUT) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    output::print_info(&format!("Report: {}", report_path.display()));

    println!();
    output::print_step(3, "Analyzing results...");
    let records = match report::parse_file(&report_path) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let totals = report::totals(&records);
    let selected = orchestrator::select_survivors(&records, generation.max_mutants).len();
    output::print_info(&format!("Total mutants: {}", totals.total));
    output::print_info(&format!("Killed: {}", totals.killed));
    output::print_info(&format!("Survived: {}", totals.survived));
    output::print_info(&format!("Processing: {selected} mutants"));
    if selected == 0 {
        println!();
        output::print_success("No surviving mutants! Your tests are strong.");
        return 0;
    }

    let config = match build_config(&generation, build.source_dir(), build.test_dir()) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let improver = match TestImprover::from_config(&config) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };

    println!();
    output::print_step(4, "Killing mutants...");
    println!();
    let analyzer = Analyzer::new(config.source_dir(), config.test_dir());
    let publisher = Publisher::new(Box::new(repo), Box::new(provider), base_branch);
    let mut orchestrator = Orchestrator::new(analyzer, improver, generation.max_mutants)
        .with_publisher(publisher)
        .dry_run(config.dry_run())
        .verbose(config.verbose());

    let stats = orchestrator.run(&records);
    output::print_summary(&stats, true, config.dry_run());
    0
}
