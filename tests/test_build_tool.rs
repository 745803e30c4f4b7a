use mutant_killer::build_tool::{self, BuildError, BuildSystem, BuildTool};
use std::path::Path;

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
}

// --- detection ---

#[test]
fn detects_maven() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    let tool = BuildTool::detect(dir.path()).unwrap();
    assert_eq!(tool.system, BuildSystem::Maven);
    assert_eq!(tool.name(), "Maven");
}

#[test]
fn detects_gradle_groovy_and_kotlin() {
    for file in ["build.gradle", "build.gradle.kts"] {
        let dir = tempfile::TempDir::new().unwrap();
        touch(&dir.path().join(file));
        let tool = BuildTool::detect(dir.path()).unwrap();
        assert_eq!(tool.system, BuildSystem::Gradle, "{file}");
    }
}

#[test]
fn maven_wins_when_both_present() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    touch(&dir.path().join("build.gradle"));
    assert_eq!(BuildTool::detect(dir.path()).unwrap().system, BuildSystem::Maven);
}

#[test]
fn no_build_file_is_undetected() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(BuildTool::detect(dir.path()).is_none());
}

#[test]
fn conventional_source_and_test_roots() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    let tool = BuildTool::detect(dir.path()).unwrap();
    assert_eq!(tool.source_dir(), dir.path().join("src/main/java"));
    assert_eq!(tool.test_dir(), dir.path().join("src/test/java"));
}

// --- command ---

#[test]
fn maven_command_without_wrapper() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    let (program, args) = BuildTool::detect(dir.path()).unwrap().command();
    assert_eq!(program, "mvn");
    assert!(args.contains(&"org.pitest:pitest-maven:mutationCoverage"));
    assert!(args.contains(&"-DoutputFormats=XML,HTML"));
    assert!(args.contains(&"-DtimestampedReports=false"));
}

#[test]
fn gradle_prefers_wrapper() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("build.gradle"));
    touch(&dir.path().join("gradlew"));
    let (program, args) = BuildTool::detect(dir.path()).unwrap().command();
    assert_eq!(Path::new(&program), dir.path().join("gradlew"));
    assert_eq!(args, ["pitest", "--no-daemon"]);
}

// --- report location ---

#[test]
fn locates_direct_maven_report() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    let report = dir.path().join("target/pit-reports/mutations.xml");
    touch(&report);
    assert_eq!(BuildTool::detect(dir.path()).unwrap().locate_report().unwrap(), report);
}

#[test]
fn locates_timestamped_gradle_report() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("build.gradle"));
    let report = dir.path().join("build/reports/pitest/202401011200/mutations.xml");
    touch(&report);
    assert_eq!(BuildTool::detect(dir.path()).unwrap().locate_report().unwrap(), report);
}

#[test]
fn missing_report_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    let err = BuildTool::detect(dir.path()).unwrap().locate_report().unwrap_err();
    assert!(matches!(err, BuildError::ReportMissing { .. }));
}

#[test]
fn find_mutations_xml_in_nested_dirs() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("a/index.html"));
    touch(&dir.path().join("b/c/mutations.xml"));
    assert_eq!(
        build_tool::find_mutations_xml(dir.path()),
        Some(dir.path().join("b/c/mutations.xml"))
    );
    assert_eq!(build_tool::find_mutations_xml(&dir.path().join("nope")), None);
}

#[test]
fn unrunnable_build_is_execution_error() {
    let dir = tempfile::TempDir::new().unwrap();
    touch(&dir.path().join("pom.xml"));
    // present but not executable
    touch(&dir.path().join("mvnw"));
    let err = BuildTool::detect(dir.path())
        .unwrap()
        .run_mutation_testing(std::time::Duration::from_secs(10))
        .unwrap_err();
    assert!(matches!(err, BuildError::Execution { tool: "Maven", .. }));
}
