//! Generate EQUATIONS.md from the equation registry.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin gen-equations [OUTPUT]
//! ```
//!
//! Without OUTPUT the file is written to `dka_core/src/equations/EQUATIONS.md`
//! (relative to the workspace root).

use std::env;
use std::fs;
use std::path::PathBuf;

use dka_core::equations::{generate_equations_markdown, ALL_EQUATIONS};

const DEFAULT_OUTPUT: &str = "dka_core/src/equations/EQUATIONS.md";

fn main() {
    let output_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    println!("Generating EQUATIONS.md for {} equations...", ALL_EQUATIONS.len());

    let markdown = generate_equations_markdown();

    match fs::write(&output_path, &markdown) {
        Ok(()) => {
            println!("Successfully wrote {} bytes to {}", markdown.len(), output_path.display());
        }
        Err(e) => {
            eprintln!("Error writing {}: {}", output_path.display(), e);
            std::process::exit(1);
        }
    }
}
