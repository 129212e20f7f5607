use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Represents the `elements.json` project configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementsConfig {
    pub name: String,
    /// Directory holding the `*.html` templates.
    #[serde(default = "default_templates")]
    pub templates: PathBuf,
    /// Directory holding one JSON array of values per template.
    #[serde(default = "default_fixtures")]
    pub fixtures: PathBuf,
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_templates() -> PathBuf {
    "templates".into()
}

fn default_fixtures() -> PathBuf {
    "fixtures".into()
}

fn default_out() -> PathBuf {
    "dist".into()
}

impl ElementsConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            templates: default_templates(),
            fixtures: default_fixtures(),
            out: default_out(),
        }
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config: ElementsConfig = serde_json::from_value(json!({ "name": "site" })).unwrap();
        assert_eq!(config, ElementsConfig::new("site"));
        assert_eq!(config.out, PathBuf::from("dist"));
    }

    #[test]
    fn test_overrides() {
        let config: ElementsConfig = serde_json::from_value(json!({
            "name": "site",
            "templates": "src/views",
            "out": "public"
        }))
        .unwrap();
        assert_eq!(config.templates, PathBuf::from("src/views"));
        assert_eq!(config.fixtures, PathBuf::from("fixtures"));
        assert_eq!(config.out, PathBuf::from("public"));
    }

    #[test]
    fn test_name_is_required() {
        assert!(serde_json::from_value::<ElementsConfig>(json!({})).is_err());
    }

    #[test]
    fn test_pretty_json_round_trip() {
        let config = ElementsConfig::new("site");
        let raw = config.to_json_pretty().unwrap();
        assert!(raw.contains("\"templates\": \"templates\""));
        assert_eq!(serde_json::from_str::<ElementsConfig>(&raw).unwrap(), config);
    }
}
