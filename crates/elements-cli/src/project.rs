use crate::config::ElementsConfig;
use crate::template;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A loaded project: its root directory and `elements.json`.
#[derive(Debug, Clone)]
pub struct ElementsProject {
    pub root: PathBuf,
    pub config: ElementsConfig,
}

impl ElementsProject {
    /// Load a project from the given directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("elements.json");
        if !config_path.exists() {
            bail!("No elements.json found. Are you in an elements project directory?");
        }
        let raw = fs::read_to_string(&config_path).context("Failed to read elements.json")?;
        let config: ElementsConfig =
            serde_json::from_str(&raw).context("Failed to parse elements.json")?;
        Ok(Self {
            root: dir.to_path_buf(),
            config,
        })
    }

    /// Load a project from the current working directory.
    pub fn load_cwd() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd)
    }

    /// Collect every `*.html` file under the templates directory, keyed by
    /// path relative to it (e.g. `"blog/post.html"`).
    pub fn collect_templates(&self) -> Result<BTreeMap<String, String>> {
        let dir = self.templates_dir();
        if !dir.exists() {
            bail!("No {}/ directory found.", self.config.templates.display());
        }
        let mut files = BTreeMap::new();
        collect_templates_recursive(&dir, &dir, &mut files)?;
        Ok(files)
    }

    /// Values for the template at `rel`, read from the fixture with the same
    /// relative path and a `.json` extension. No fixture means no values.
    pub fn load_fixture(&self, rel: &str) -> Result<Vec<serde_json::Value>> {
        let path = self.fixtures_dir().join(fixture_name(rel));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        template::parse_values(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.config.templates)
    }

    pub fn fixtures_dir(&self) -> PathBuf {
        self.root.join(&self.config.fixtures)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.config.out)
    }
}

fn collect_templates_recursive(
    dir: &Path,
    base: &Path,
    files: &mut BTreeMap<String, String>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_templates_recursive(&path, base, files)?;
        } else if is_template_file(&path) {
            let rel = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            files.insert(rel, content);
        }
    }
    Ok(())
}

fn is_template_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("html"))
}

fn fixture_name(rel: &str) -> String {
    let stem = rel.strip_suffix(".html").unwrap_or(rel);
    format!("{stem}.json")
}
