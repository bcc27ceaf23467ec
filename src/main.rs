use clap::{Parser, Subcommand};
use haml_transpiler::{Compiler, Format, HamlError, Options, Style};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "haml")]
#[command(about = "Haml - compile .haml templates to PHP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile .haml files to .php
    Compile {
        /// Path to .haml file or directory
        #[arg(required_unless_present = "stdin")]
        file: Option<PathBuf>,

        /// Read from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// JSON options file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output style: nested, expanded, compact or compressed
        #[arg(long)]
        style: Option<String>,

        /// Markup format: xhtml, html4 or html5
        #[arg(long)]
        format: Option<String>,

        /// Compressed output without comments
        #[arg(long)]
        ugly: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            stdin,
            json,
            config,
            style,
            format,
            ugly,
        } => {
            let options = match load_options(config.as_deref(), style, format, ugly) {
                Ok(options) => options,
                Err(e) => fail(&e.to_string()),
            };
            let mut compiler = match Compiler::new(options) {
                Ok(compiler) => compiler,
                Err(e) => fail(&e.to_string()),
            };

            if stdin {
                compile_stdin(&mut compiler, json);
            } else if let Some(path) = file {
                compile_path(&mut compiler, &path);
            } else {
                fail("provide a file/directory or use --stdin");
            }
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_options(
    config: Option<&Path>,
    style: Option<String>,
    format: Option<String>,
    ugly: bool,
) -> Result<Options, HamlError> {
    let mut options = match config {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| {
                HamlError::config(format!("Unable to read {}: {}", path.display(), e))
            })?;
            Options::from_json(&json)?
        }
        None => Options::default(),
    };

    if let Some(name) = style {
        options.style = Style::from_name(&name).ok_or_else(|| {
            HamlError::config(format!(
                "Invalid style ({}). Style must be one of nested, expanded, compact, compressed.",
                name
            ))
        })?;
    }
    if let Some(name) = format {
        Format::parse(&name)?;
        options.format = name;
    }
    options.ugly |= ugly;
    Ok(options)
}

fn compile_stdin(compiler: &mut Compiler, json_output: bool) {
    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        fail(&format!("failed to read stdin: {}", e));
    }

    let result = compiler.compile(&source, "stdin");

    if json_output {
        let value = match &result {
            Ok(output) => serde_json::json!({ "output": output }),
            Err(e) => serde_json::json!({
                "error": {
                    "kind": e.kind.as_str(),
                    "message": e.message,
                    "line": e.line(),
                    "help": e.help,
                }
            }),
        };
        println!("{}", value);
        if result.is_err() {
            std::process::exit(1);
        }
        return;
    }

    match result {
        Ok(output) => print!("{}", output),
        Err(e) => {
            report(&e, &source, "stdin");
            std::process::exit(1);
        }
    }
}

fn compile_path(compiler: &mut Compiler, path: &Path) {
    let start = Instant::now();

    if path.is_file() {
        if path.extension().is_none_or(|ext| ext != "haml") {
            fail(&format!("{} is not a .haml file", path.display()));
        }
        if !compile_file(compiler, path) {
            std::process::exit(1);
        }
        print_summary(1, start.elapsed());
    } else if path.is_dir() {
        let mut compiled = 0;
        let mut failed = 0;

        for entry in WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "haml"))
        {
            if compile_file(compiler, entry.path()) {
                compiled += 1;
            } else {
                failed += 1;
            }
        }

        if compiled + failed == 0 {
            fail(&format!("no .haml files found in {}", path.display()));
        }
        print_summary(compiled, start.elapsed());
        if failed > 0 {
            std::process::exit(1);
        }
    } else {
        fail(&format!("{} does not exist", path.display()));
    }
}

/// Compile one file to a sibling `.php`. Returns false on failure.
fn compile_file(compiler: &mut Compiler, path: &Path) -> bool {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", path.display(), e);
            return false;
        }
    };
    let name = path.display().to_string();

    match compiler.compile(&source, &name) {
        Ok(output) => {
            let target = path.with_extension("php");
            if let Err(e) = fs::write(&target, output) {
                eprintln!("Error: failed to write {}: {}", target.display(), e);
                return false;
            }
            print_generated(&target.display().to_string());
            true
        }
        Err(e) => {
            report(&e, &source, &name);
            false
        }
    }
}

fn report(error: &HamlError, source: &str, filename: &str) {
    if io::stderr().is_terminal() {
        eprint!("{}", error.render_color(source, filename));
    } else {
        eprint!("{}", error.render(source, filename));
    }
}

fn print_generated(path: &str) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(count: usize, elapsed: std::time::Duration) {
    let is_tty = io::stderr().is_terminal();
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "file" } else { "files" };

    if is_tty {
        eprintln!("\n\x1b[1m✨ Compiled {} {} in {}\x1b[0m", count, files_word, time_str);
    } else {
        eprintln!("\n✨ Compiled {} {} in {}", count, files_word, time_str);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
