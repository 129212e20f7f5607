//! Template files: markup whose interpolation points are written `${...}`.
//!
//! Files are rendered through the same normalize, materialize and bind steps
//! as `html!`, but uncached since their segments are not `'static`.

use anyhow::{bail, Result};
use elements_template::{bind, materialize, normalize, Value};
use regex::Regex;

/// The literal segments of `source`, split at every `${...}`.
pub fn split_segments(source: &str) -> Vec<&str> {
    let re = Regex::new(r"\$\{[^}]*\}").unwrap();
    re.split(source).collect()
}

pub fn normalize_source(source: &str) -> String {
    normalize(&split_segments(source))
}

/// Render `source` with `values` bound in order and serialize the result.
pub fn render_source(source: &str, values: Vec<serde_json::Value>) -> Result<String> {
    let root = materialize(&normalize_source(source));
    bind(&root, values.into_iter().map(Value::from).collect())?;
    Ok(root.inner_html())
}

/// Parse a JSON array of positional values.
pub fn parse_values(raw: &str) -> Result<Vec<serde_json::Value>> {
    match serde_json::from_str(raw)? {
        serde_json::Value::Array(values) => Ok(values),
        other => bail!("expected a JSON array of values, found {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_segments() {
        assert_eq!(
            split_segments("<p class=${cls}>${ count }</p>"),
            ["<p class=", ">", "</p>"]
        );
        assert_eq!(split_segments("<br>"), ["<br>"]);
    }

    #[test]
    fn test_normalize_source() {
        assert_eq!(
            normalize_source("<button ?disabled=${off}>${label}</button>\n"),
            "<button δ0=?disabled><!--δ1--></button>"
        );
    }

    #[test]
    fn test_render_source() {
        let html = render_source(
            "<p class=${cls} ?hidden=${hidden}>${n}</p>",
            vec![json!("big"), json!(false), json!(5)],
        )
        .unwrap();
        assert_eq!(html, r#"<p class="big">5<!--δ2--></p>"#);
    }

    #[test]
    fn test_render_source_arity_error() {
        let err = render_source("<p>${a}</p>", vec![json!(1), json!(2)]).unwrap_err();
        assert!(err.to_string().starts_with("bad template"));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values("[1, \"a\", null]").unwrap(), vec![json!(1), json!("a"), json!(null)]);
        assert!(parse_values("{\"a\": 1}").is_err());
        assert!(parse_values("not json").is_err());
    }
}
