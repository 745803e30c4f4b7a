use mutant_killer::analysis::{self, AnalysisError, Analyzer, MUTATION_MARKER};
use mutant_killer::mutants::{MutantStatus, MutationRecord};
use std::path::Path;

const CALCULATOR: &str = r#"package com.example;

public class Calculator {
    public int add(int a, int b) {
        return a + b;
    }

    public boolean isPositive(int n) {
        return n > 0;
    }
}
"#;

const CALCULATOR_TEST: &str = r#"package com.example;

import org.junit.jupiter.api.Test;

class CalculatorTest {
    @Test
    void adds() {
    }
}
"#;

fn record(class: &str, method: &str, line: usize) -> MutationRecord {
    MutationRecord {
        class: class.to_string(),
        method: method.to_string(),
        method_signature: "(II)I".to_string(),
        line,
        mutator_id: "org.pitest.mutationtest.engine.gregor.mutators.MathMutator".to_string(),
        description: None,
        status: MutantStatus::Survived,
        source_file_hint: Some("Calculator.java".to_string()),
        killing_test_id: None,
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    write(
        &dir.path().join("src/main/java/com/example/Calculator.java"),
        CALCULATOR,
    );
    dir
}

fn numbered(n: usize) -> String {
    (1..=n).map(|i| format!("line{i}\n")).collect()
}

// --- context window ---

#[test]
fn window_is_centered_with_margin_of_five() {
    let window = analysis::context_window(&numbered(20), 10);
    let lines: Vec<_> = window.lines().collect();
    assert_eq!(lines.len(), 11);
    assert!(lines[0].ends_with("   5: line5"));
    assert!(lines[10].ends_with("  15: line15"));
}

#[test]
fn window_clamps_to_file_start_and_end() {
    let start = analysis::context_window(&numbered(20), 2);
    assert_eq!(start.lines().count(), 7);
    assert!(start.lines().next().unwrap().ends_with("   1: line1"));

    let end = analysis::context_window(&numbered(20), 19);
    assert_eq!(end.lines().count(), 7);
    assert!(end.lines().last().unwrap().ends_with("  20: line20"));
}

#[test]
fn exactly_one_line_is_marked() {
    for line in [1, 3, 10, 20] {
        let window = analysis::context_window(&numbered(20), line);
        let marked: Vec<_> = window
            .lines()
            .filter(|l| l.starts_with(MUTATION_MARKER))
            .collect();
        assert_eq!(marked.len(), 1, "line {line}");
        assert!(marked[0].ends_with(&format!(": line{line}")));
    }
}

#[test]
fn marked_line_format() {
    let window = analysis::context_window(&numbered(12), 10);
    assert!(window.contains(">>>   10: line10\n"));
    assert!(window.contains("       9: line9\n"));
}

#[test]
fn window_of_empty_source_is_empty() {
    assert_eq!(analysis::context_window("", 3), "");
}

// --- naming ---

#[test]
fn test_class_name_convention() {
    assert_eq!(analysis::test_class_name("com.example.Calculator"), "CalculatorTest");
    assert_eq!(analysis::test_class_name("com.example.Outer$Inner"), "OuterTest");
    assert_eq!(analysis::test_class_name("Calculator"), "CalculatorTest");
}

#[test]
fn class_relative_path_follows_package() {
    assert_eq!(
        analysis::class_relative_path("com.example.Calculator", "java"),
        Path::new("com/example/Calculator.java")
    );
}

#[test]
fn test_path_for_unqualified_class_is_under_root() {
    let analyzer = Analyzer::new("/src", "/tests");
    assert_eq!(analyzer.test_file_path("Calculator"), Path::new("/tests/CalculatorTest.java"));
    assert_eq!(
        analyzer.test_file_path("com.example.Calculator"),
        Path::new("/tests/com/example/CalculatorTest.java")
    );
}

// --- analyzer ---

#[test]
fn analyze_without_existing_test() {
    let dir = project();
    let analyzer = Analyzer::new(dir.path().join("src/main/java"), dir.path().join("src/test/java"));
    let analysis = analyzer.analyze(&record("com.example.Calculator", "isPositive", 9)).unwrap();

    assert_eq!(analysis.source_code, CALCULATOR);
    assert!(analysis.mutated_method.as_deref().unwrap().contains("return n > 0;"));
    assert!(analysis.context_window.contains(">>>    9:         return n > 0;"));
    assert!(!analysis.has_existing_test());
    assert_eq!(
        analysis.test_file_target,
        dir.path().join("src/test/java/com/example/CalculatorTest.java")
    );
}

#[test]
fn analyze_picks_up_existing_test() {
    let dir = project();
    let test_path = dir.path().join("src/test/java/com/example/CalculatorTest.java");
    write(&test_path, CALCULATOR_TEST);

    let analyzer = Analyzer::new(dir.path().join("src/main/java"), dir.path().join("src/test/java"));
    let analysis = analyzer.analyze(&record("com.example.Calculator", "add", 5)).unwrap();

    assert!(analysis.has_existing_test());
    assert_eq!(analysis.existing_test_file.as_deref(), Some(test_path.as_path()));
    assert_eq!(analysis.existing_test_code.as_deref(), Some(CALCULATOR_TEST));
}

#[test]
fn missing_method_leaves_method_empty() {
    let dir = project();
    let analyzer = Analyzer::new(dir.path().join("src/main/java"), dir.path().join("src/test/java"));
    let analysis = analyzer.analyze(&record("com.example.Calculator", "<init>", 3)).unwrap();
    assert!(analysis.mutated_method.is_none());
}

#[test]
fn nested_class_resolves_to_outer_file() {
    let dir = project();
    let analyzer = Analyzer::new(dir.path().join("src/main/java"), dir.path().join("src/test/java"));
    let found = analyzer
        .find_source_file(&record("com.example.Calculator$Helper", "help", 3))
        .unwrap();
    assert_eq!(found, dir.path().join("src/main/java/com/example/Calculator.java"));
}

#[test]
fn source_file_hint_is_used_as_fallback() {
    let dir = project();
    let analyzer = Analyzer::new(dir.path().join("src/main/java"), dir.path().join("src/test/java"));
    // PIT names the file, not the class, for non-public top-level classes
    let found = analyzer
        .find_source_file(&record("com.example.CalculatorSupport", "help", 3))
        .unwrap();
    assert_eq!(found, dir.path().join("src/main/java/com/example/Calculator.java"));
}

#[test]
fn missing_source_is_an_error() {
    let dir = project();
    let analyzer = Analyzer::new(dir.path().join("src/main/java"), dir.path().join("src/test/java"));
    let mut mutation = record("com.example.Missing", "run", 1);
    mutation.source_file_hint = None;
    let err = analyzer.analyze(&mutation).unwrap_err();
    assert!(matches!(err, AnalysisError::SourceNotFound { ref class, .. } if class == "com.example.Missing"));
}
