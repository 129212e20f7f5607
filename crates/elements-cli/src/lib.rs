//! The `elements` command line: normalize, render and build template files.

mod cmd;
pub mod config;
pub mod project;
pub mod template;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "elements", version, about = "Elements - tagged-template HTML toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized markup of a template file
    Normalize {
        /// Template file, interpolation points written as `${...}`
        file: PathBuf,
    },
    /// Render a template file with positional values
    Render {
        /// Template file, interpolation points written as `${...}`
        file: PathBuf,
        /// JSON file holding an array of values, one per interpolation point
        #[arg(long)]
        values: Option<PathBuf>,
    },
    /// Render every template of the project into the output directory
    Build,
}

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize { file } => cmd::normalize::run(&file),
        Commands::Render { file, values } => cmd::render::run(&file, values.as_deref()),
        Commands::Build => cmd::build::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
