//! Test runner that compares compiler output against .expected.php and .expected.err files
//!
//! Run with: cargo test --test expected_tests
//! Regenerate with: cargo run --bin accept_expected

use haml_transpiler::{Compiler, Options};
use libtest_mimic::{Arguments, Failed, Trial};
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures(dir: &str) -> Vec<PathBuf> {
    let pattern = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(dir)
        .join("*.haml");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .expect("valid glob pattern")
        .filter_map(Result::ok)
        .collect();
    files.sort();
    files
}

/// Options for a fixture: `name.options.json` next to it, or the defaults
fn fixture_options(path: &Path) -> Result<Options, Failed> {
    let options_path = path.with_extension("options.json");
    if !options_path.exists() {
        return Ok(Options::default());
    }
    let json = fs::read_to_string(&options_path).map_err(|e| Failed::from(e.to_string()))?;
    Options::from_json(&json).map_err(|e| Failed::from(e.to_string()))
}

fn filename(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown")
}

fn check_output(path: &Path) -> Result<(), Failed> {
    let expected_php = path.with_extension("expected.php");
    let expected = fs::read_to_string(&expected_php)
        .map_err(|_| format!("Missing expected file: {}", expected_php.display()))?;
    let source = fs::read_to_string(path).map_err(|e| e.to_string())?;

    let mut compiler = Compiler::new(fixture_options(path)?).map_err(|e| e.to_string())?;
    let actual = compiler
        .compile(&source, filename(path))
        .map_err(|e| format!("Compile error: {}", e.render(&source, filename(path))))?;

    if actual.trim() != expected.trim() {
        return Err(format!(
            "Output mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
            expected.trim(),
            actual.trim()
        )
        .into());
    }
    Ok(())
}

fn check_error(path: &Path) -> Result<(), Failed> {
    let expected_err = path.with_extension("expected.err");
    let expected = fs::read_to_string(&expected_err)
        .map_err(|_| format!("Missing expected file: {}", expected_err.display()))?;
    let source = fs::read_to_string(path).map_err(|e| e.to_string())?;

    let result = Compiler::new(fixture_options(path)?)
        .and_then(|mut compiler| compiler.compile(&source, filename(path)));

    match result {
        Ok(output) => Err(format!("Expected an error, got output:\n{}", output).into()),
        Err(e) => {
            let actual = e.render(&source, filename(path));
            if actual.trim() != expected.trim() {
                return Err(format!(
                    "Error mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
                    expected.trim(),
                    actual.trim()
                )
                .into());
            }
            Ok(())
        }
    }
}

fn main() {
    let args = Arguments::from_args();
    let mut trials = Vec::new();

    for path in fixtures("cases") {
        let name = format!("cases::{}", path.file_stem().and_then(|s| s.to_str()).unwrap_or("?"));
        trials.push(Trial::test(name, move || check_output(&path)));
    }
    for path in fixtures("errors") {
        let name = format!("errors::{}", path.file_stem().and_then(|s| s.to_str()).unwrap_or("?"));
        trials.push(Trial::test(name, move || check_error(&path)));
    }

    libtest_mimic::run(&args, trials).exit();
}
