use mutant_killer::analysis::Analysis;
use mutant_killer::improvement::{self, ApplyOutcome, Improvement, InsertError};
use mutant_killer::mutants::{MutantStatus, MutationRecord};
use std::path::{Path, PathBuf};

const EXISTING_TEST: &str = "package com.example;

import org.junit.jupiter.api.Test;

class CalculatorTest {
    @Test
    void adds() {
        // keep me
        assertEquals(3, new Calculator().add(1, 2));
    }
}
";

const FRAGMENT: &str = "@Test
void addsNegative() {
    assertEquals(-1, new Calculator().add(1, -2));
}";

fn mutation() -> MutationRecord {
    MutationRecord {
        class: "com.example.Calculator".to_string(),
        method: "add".to_string(),
        method_signature: "(II)I".to_string(),
        line: 5,
        mutator_id: "org.pitest.mutationtest.engine.gregor.mutators.MathMutator".to_string(),
        description: None,
        status: MutantStatus::Survived,
        source_file_hint: None,
        killing_test_id: None,
    }
}

fn test_path(root: &Path) -> PathBuf {
    root.join("src/test/java/com/example/CalculatorTest.java")
}

fn analysis(root: &Path, existing: Option<&str>) -> Analysis {
    let target = test_path(root);
    if let Some(code) = existing {
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, code).unwrap();
    }
    Analysis {
        mutation: mutation(),
        source_file: root.join("src/main/java/com/example/Calculator.java"),
        source_code: String::new(),
        mutated_method: None,
        context_window: String::new(),
        test_file_target: target.clone(),
        existing_test_file: existing.map(|_| target.clone()),
        existing_test_code: existing.map(str::to_string),
    }
}

fn count_files(dir: &Path) -> usize {
    let mut count = 0;
    for entry in std::fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            count += count_files(&path);
        } else {
            count += 1;
        }
    }
    count
}

// --- dry run ---

#[test]
fn dry_run_merge_leaves_file_byte_identical() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), Some(EXISTING_TEST)), FRAGMENT.to_string(), true);

    let before = std::fs::read(test_path(dir.path())).unwrap();
    assert_eq!(improvement.apply().unwrap(), ApplyOutcome::Skipped);
    let after = std::fs::read(test_path(dir.path())).unwrap();
    assert_eq!(before, after);
}

#[test]
fn dry_run_new_file_creates_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), None), FRAGMENT.to_string(), true);
    assert_eq!(improvement.apply().unwrap(), ApplyOutcome::Skipped);
    assert_eq!(count_files(dir.path()), 0);
}

// --- new file ---

#[test]
fn new_file_mode_creates_exactly_one_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), None), FRAGMENT.to_string(), false);
    assert!(improvement.is_new_file());

    let outcome = improvement.apply().unwrap();
    assert_eq!(outcome, ApplyOutcome::Created(test_path(dir.path())));
    assert!(outcome.changed_files());
    assert_eq!(count_files(dir.path()), 1);
    assert_eq!(
        std::fs::read_to_string(test_path(dir.path())).unwrap(),
        format!("{FRAGMENT}\n")
    );
}

#[test]
fn new_file_mode_refuses_to_overwrite() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), None), FRAGMENT.to_string(), false);
    std::fs::create_dir_all(test_path(dir.path()).parent().unwrap()).unwrap();
    std::fs::write(test_path(dir.path()), "class CalculatorTest {}\n").unwrap();

    let err = improvement.apply().unwrap_err();
    assert!(matches!(err, InsertError::TargetExists { .. }));
    assert_eq!(
        std::fs::read_to_string(test_path(dir.path())).unwrap(),
        "class CalculatorTest {}\n"
    );
}

// --- merge ---

#[test]
fn merge_inserts_before_class_close() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), Some(EXISTING_TEST)), FRAGMENT.to_string(), false);

    assert_eq!(improvement.apply().unwrap(), ApplyOutcome::Merged(test_path(dir.path())));
    let merged = std::fs::read_to_string(test_path(dir.path())).unwrap();
    let expected = "package com.example;

import org.junit.jupiter.api.Test;

class CalculatorTest {
    @Test
    void adds() {
        // keep me
        assertEquals(3, new Calculator().add(1, 2));
    }

    @Test
    void addsNegative() {
        assertEquals(-1, new Calculator().add(1, -2));
    }
}
";
    assert_eq!(merged, expected);
}

#[test]
fn merge_twice_detects_duplicate() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), Some(EXISTING_TEST)), FRAGMENT.to_string(), false);

    improvement.apply().unwrap();
    let once = std::fs::read_to_string(test_path(dir.path())).unwrap();

    let outcome = improvement.apply().unwrap();
    assert_eq!(outcome, ApplyOutcome::AlreadyPresent(test_path(dir.path())));
    assert!(!outcome.changed_files());
    assert_eq!(std::fs::read_to_string(test_path(dir.path())).unwrap(), once);
    assert_eq!(once.matches("void addsNegative()").count(), 1);
}

#[test]
fn merge_rereads_file_grown_earlier_in_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = Improvement::new(analysis(dir.path(), Some(EXISTING_TEST)), FRAGMENT.to_string(), false);
    // Second analysis taken from the same stale snapshot
    let mut stale = first.analysis().clone();
    stale.existing_test_code = Some(EXISTING_TEST.to_string());
    let second = Improvement::new(stale, "@Test\nvoid addsZero() {\n}".to_string(), false);

    first.apply().unwrap();
    second.apply().unwrap();
    let merged = std::fs::read_to_string(test_path(dir.path())).unwrap();
    assert!(merged.contains("void addsNegative()"));
    assert!(merged.contains("void addsZero()"));
    assert!(merged.contains("// keep me"));
}

#[test]
fn merge_without_class_body_fails_cleanly() {
    let dir = tempfile::TempDir::new().unwrap();
    let content = "// nothing here\n";
    let improvement = Improvement::new(analysis(dir.path(), Some(content)), FRAGMENT.to_string(), false);

    let err = improvement.apply().unwrap_err();
    assert!(matches!(err, InsertError::NoClassBody { .. }));
    assert_eq!(std::fs::read_to_string(test_path(dir.path())).unwrap(), content);
    assert!(!improvement::temp_path(&test_path(dir.path())).exists());
}

// --- insert_into_class ---

#[test]
fn insert_dedents_trimmed_fragment() {
    let existing = "class FooTest {\n}\n";
    let fragment = "@Test\n    void t() {\n        check();\n    }";
    let merged = improvement::insert_into_class(existing, fragment, Some("FooTest")).unwrap();
    assert_eq!(
        merged,
        "class FooTest {\n\n    @Test\n    void t() {\n        check();\n    }\n}\n"
    );
}

#[test]
fn insert_targets_named_class() {
    let existing = "class Helper {\n}\n\nclass FooTest {\n    void a() {}\n}\n";
    let merged = improvement::insert_into_class(existing, "void b() {}", Some("FooTest")).unwrap();
    assert!(merged.starts_with("class Helper {\n}\n"));
    assert!(merged.ends_with("    void a() {}\n\n    void b() {}\n}\n"));
}

#[test]
fn insert_keeps_crlf_line_endings() {
    let existing = "class FooTest {\r\n    void a() {}\r\n}\r\n";
    let fragment = "@Test\n    void b() {\n        check();\n    }";
    let merged = improvement::insert_into_class(existing, fragment, Some("FooTest")).unwrap();
    assert_eq!(
        merged,
        "class FooTest {\r\n    void a() {}\r\n\r\n    @Test\r\n    void b() {\r\n        check();\r\n    }\r\n}\r\n"
    );
    assert!(!merged.replace("\r\n", "").contains('\n'));
}

#[test]
fn contains_fragment_ignores_layout() {
    let existing = "class T {\n    @Test\n    void x() {\n        a();\n    }\n}";
    assert!(improvement::contains_fragment(existing, "@Test void x() { a(); }"));
    assert!(!improvement::contains_fragment(existing, "@Test void y() { a(); }"));
    assert!(!improvement::contains_fragment(existing, "   "));
}

// --- preview ---

#[test]
fn preview_labels_new_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), None), FRAGMENT.to_string(), true);
    let preview = improvement.preview();
    assert!(preview.contains("Mutation: com.example.Calculator.add (line 5)"));
    assert!(preview.contains("Target: NEW TEST FILE"));
    assert!(preview.contains(FRAGMENT));
}

#[test]
fn preview_shows_merge_target_and_diff() {
    let dir = tempfile::TempDir::new().unwrap();
    let improvement = Improvement::new(analysis(dir.path(), Some(EXISTING_TEST)), FRAGMENT.to_string(), true);
    let preview = improvement.preview();
    assert!(preview.contains(&format!("Target: {}", test_path(dir.path()).display())));
    assert!(preview.contains("Code to add:"));
    assert!(preview.contains("+     void addsNegative() {"));
    assert!(!preview.contains("NEW TEST FILE"));
}

#[test]
fn render_diff_marks_changes_only() {
    let diff = improvement::render_diff("a\nb\n", "a\nc\n");
    assert_eq!(diff, "- b\n+ c\n");
}
