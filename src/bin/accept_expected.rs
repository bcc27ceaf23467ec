//! Binary to generate/update .expected.php and .expected.err files
//!
//! Usage:
//!   cargo run --bin accept_expected            # Update all
//!   cargo run --bin accept_expected -- basic   # Update only tests matching "basic"

use haml_transpiler::{Compiler, Options};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn main() {
    let filter: Option<String> = std::env::args().nth(1);
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests");

    let mut updated = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(&test_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|s| s == "haml"))
    {
        let path = entry.path();
        let path_str = path.to_string_lossy();

        if let Some(ref f) = filter
            && !path_str.contains(f.as_str())
        {
            skipped += 1;
            continue;
        }

        process_file(path);
        updated += 1;
    }

    println!("Updated {} files, skipped {}", updated, skipped);
}

/// Options for a fixture: `name.options.json` next to it, or the defaults
fn fixture_options(path: &Path) -> Options {
    let options_path = path.with_extension("options.json");
    fs::read_to_string(&options_path)
        .ok()
        .and_then(|json| Options::from_json(&json).ok())
        .unwrap_or_default()
}

fn process_file(path: &Path) {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", path, e);
            return;
        }
    };

    let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown");
    let is_error_test = path.to_string_lossy().contains("/errors/");

    let result = Compiler::new(fixture_options(path)).and_then(|mut c| c.compile(&source, filename));

    match result {
        Ok(output) => {
            let expected_php = path.with_extension("expected.php");
            if let Err(e) = fs::write(&expected_php, &output) {
                eprintln!("Failed to write {:?}: {}", expected_php, e);
            } else {
                println!("  wrote {}", expected_php.display());
            }

            // Remove any stale .expected.err if this now compiles
            let expected_err = path.with_extension("expected.err");
            if expected_err.exists() {
                let _ = fs::remove_file(&expected_err);
            }
        }
        Err(e) => {
            if is_error_test {
                let expected_err = path.with_extension("expected.err");
                if let Err(err) = fs::write(&expected_err, e.render(&source, filename)) {
                    eprintln!("Failed to write {:?}: {}", expected_err, err);
                } else {
                    println!("  wrote {}", expected_err.display());
                }
            } else {
                eprintln!(
                    "ERROR: {:?} failed to compile but is not in errors/: {}",
                    path, e
                );
            }
        }
    }
}
