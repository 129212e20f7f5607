use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::template;

pub fn run(file: &Path) -> Result<()> {
    let source =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    println!("{}", template::normalize_source(&source));
    Ok(())
}
