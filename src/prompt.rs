use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::Analysis;

pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/system.md");

/// Fence tag the generation service is asked to answer with.
pub const FENCE_LANGUAGE: &str = "java";

static TAGGED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```java\s*\n(.*?)\n```").expect("static regex"));
static UNTAGGED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*\n(.*?)\n```").expect("static regex"));

/// User-role prompt for one mutation. Same analysis, same prompt.
pub fn build_prompt(analysis: &Analysis) -> String {
    let m = &analysis.mutation;
    let mut p = String::new();

    p.push_str("A mutation testing tool (PIT) found a surviving mutation in this Java code.\n\n");
    p.push_str("## Mutation Details\n");
    let _ = writeln!(p, "- Class: {}", m.class);
    let _ = writeln!(p, "- Method: {}", m.method);
    let _ = writeln!(p, "- Line: {}", m.line);
    let _ = writeln!(p, "- Mutation type: {}", m.mutator_description());

    let _ = write!(
        p,
        "\n## Code Context (>>> marks the mutated line)\n```{FENCE_LANGUAGE}\n{}```\n\n",
        analysis.context_window
    );

    if let Some(method) = &analysis.mutated_method {
        let _ = write!(p, "## Full Method\n```{FENCE_LANGUAGE}\n{method}\n```\n\n");
    }

    if analysis.has_existing_test() {
        if let Some(test_code) = &analysis.existing_test_code {
            let _ = write!(p, "## Existing Test Class\n```{FENCE_LANGUAGE}\n{test_code}\n```\n\n");
        }
    }

    p.push_str("## Task\n");
    p.push_str("Write a test method that will FAIL when this mutation is applied, ");
    p.push_str("but PASS on the original code. This will ensure the mutation is killed.\n\n");
    let _ = writeln!(
        p,
        "The test should specifically target the behavior at line {} that the mutation changes.",
        m.line
    );
    p
}

/// First fenced code block in `response`, preferring ```` ```java ```` blocks.
///
/// Returns `None` when there is no fenced block, or the first one is blank.
pub fn extract_code_block(response: &str) -> Option<String> {
    let captured = TAGGED_BLOCK
        .captures(response)
        .or_else(|| UNTAGGED_BLOCK.captures(response))?;
    let code = captured.get(1)?.as_str().trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}
