//! Fancyfly CLI - compile one source file and print the CPS program
//!
//! The output syntax is chosen with `FANCYFLY_TARGET` and the top-level
//! continuation with `FANCYFLY_CONTINUATION`.

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use fancyfly::errors::{format_source_error, Colors};
use fancyfly::{compile_source, CompileOptions, SourceMap};

fn print_usage() {
    println!("Usage: fancyfly [options] <input file>");
    println!("Options:");
    println!("  -h, --help: Print this help message");
    println!("Environment:");
    println!("  FANCYFLY_TARGET: Output syntax, scheme or javascript (default: scheme)");
    println!("  FANCYFLY_CONTINUATION: Continuation the program result is passed to");
}

fn main() {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print_usage();
        return;
    }

    let path: PathBuf = match args.free_from_str() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("error: {}", e);
            print_usage();
            process::exit(2);
        }
    };

    let options = match CompileOptions::from_env() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };
    log::debug!("compiling {} with {:?}", path.display(), options);

    let source = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    };

    match compile_source(&source, &options) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            let colors = Colors::new(std::io::stderr().is_terminal());
            let filename = path.display().to_string();
            eprint!(
                "{}",
                format_source_error(&e, &SourceMap::new(&source), Some(&filename), &colors)
            );
            process::exit(1);
        }
    }
}
