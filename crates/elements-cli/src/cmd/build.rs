use anyhow::{bail, Context, Result};
use console::style;
use std::fs;

use crate::project::ElementsProject;
use crate::template;

pub fn run() -> Result<()> {
    let project = ElementsProject::load_cwd()?;
    let templates = project.collect_templates()?;

    if templates.is_empty() {
        bail!(
            "No templates found in {}/",
            project.config.templates.display()
        );
    }

    println!(
        "{} '{}'...",
        style("Building").bold().cyan(),
        project.config.name
    );

    let out_dir = project.out_dir();
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)?;
    }
    fs::create_dir_all(&out_dir)?;

    for (rel, source) in &templates {
        let values = project.load_fixture(rel)?;
        let html = template::render_source(source, values)
            .with_context(|| format!("Failed to render {rel}"))?;

        let out_path = out_dir.join(rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, html)?;
        println!(
            "  {}  {} -> {}",
            style("+").green().bold(),
            rel,
            style(
                out_path
                    .strip_prefix(&project.root)
                    .unwrap_or(&out_path)
                    .display()
            )
            .dim()
        );
    }

    println!(
        "\n{} {} template(s) in {}/",
        style("Built").green().bold(),
        templates.len(),
        project.config.out.display()
    );
    Ok(())
}
