use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::template;

pub fn run(file: &Path, values: Option<&Path>) -> Result<()> {
    let source =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let values = match values {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            template::parse_values(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => Vec::new(),
    };

    let html = template::render_source(&source, values)
        .with_context(|| format!("Failed to render {}", file.display()))?;
    println!("{html}");
    Ok(())
}
