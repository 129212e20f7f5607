use regex::{Captures, Regex};

/// Prefix of every marker the normalizer emits.
pub const MARKER_PREFIX: &str = "δ";

/// Stands in for an interpolated value while the markup is rewritten.
const NODE_SENTINEL: char = '\x01';
/// Takes the place of an attribute name whose whole value was interpolated.
const ATTR_SENTINEL: char = '\x02';

/// Void elements, matched case-insensitively when self-closing tags are expanded.
const EMPTY_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "menuitem",
    "meta", "param", "source", "track", "wbr",
];

/// Name of the synthetic attribute / comment data for marker `index`.
pub fn marker(index: usize) -> String {
    format!("{MARKER_PREFIX}{index}")
}

/// The comment placeholder for marker `index`, as it appears in markup.
pub fn node_marker(index: usize) -> String {
    format!("<!--{MARKER_PREFIX}{index}-->")
}

/// Turn the literal segments of one template into marker-annotated markup.
///
/// Every interpolation point between two segments becomes either a comment
/// `<!--δN-->` (child content) or, when it is the whole value of an
/// attribute, a synthetic attribute `δN="original-name"`. Indices follow the
/// left-to-right order of the interpolations. Self-closing tags are expanded:
/// void elements keep ` /`, everything else gets an explicit close tag.
pub fn normalize(segments: &[&str]) -> String {
    let tag_re = Regex::new(r"<([a-z]+[a-z0-9:._-]*)([^>]*?)(/?)>").unwrap();
    let attr_re = Regex::new(r#"([^\s\\>"'=]+)\s*=\s*(['"]?)\x01((?s:.)?)"#).unwrap();
    let parts_re = Regex::new(r"[\x01\x02]").unwrap();

    let joined = segments.join(&NODE_SENTINEL.to_string());
    let rewritten = tag_re.replace_all(joined.trim(), |cap: &Captures| {
        let name = &cap[1];
        let attrs = attr_re.replace_all(&cap[2], |attr: &Captures| {
            let (attr_name, quote, next) = (&attr[1], &attr[2], &attr[3]);
            // only a value that is exactly one interpolation becomes a marker;
            // a self-closing slash is already split off into cap[3]
            let whole = if quote.is_empty() {
                next.is_empty() || next.starts_with(char::is_whitespace)
            } else {
                next == quote
            };
            if whole {
                format!("{ATTR_SENTINEL}={quote}{attr_name}{next}")
            } else {
                attr[0].to_string()
            }
        });
        let mut markup = format!("{name}{}", attrs.trim_end());
        if !cap[3].is_empty() {
            if EMPTY_ELEMENTS.iter().any(|e| e.eq_ignore_ascii_case(name)) {
                markup.push_str(" /");
            } else {
                markup.push_str("></");
                markup.push_str(name);
            }
        }
        format!("<{markup}>")
    });

    let mut index = 0;
    let normalized = parts_re.replace_all(&rewritten, |cap: &Captures| {
        let replacement = if cap[0].starts_with(ATTR_SENTINEL) {
            marker(index)
        } else {
            node_marker(index)
        };
        index += 1;
        replacement
    });

    tracing::trace!(segments = segments.len(), markers = index, "normalized template");
    normalized.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_markers_in_order() {
        let out = normalize(&["<p>", " and ", "</p>"]);
        assert_eq!(out, "<p><!--δ0--> and <!--δ1--></p>");
    }

    #[test]
    fn test_attribute_markers() {
        let out = normalize(&["<button ?disabled=", " @click='", "' class=\"", "\">", "</button>"]);
        assert_eq!(
            out,
            r#"<button δ0=?disabled δ1='@click' δ2="class"><!--δ3--></button>"#
        );
    }

    #[test]
    fn test_partial_attribute_value_is_not_an_attribute_marker() {
        let out = normalize(&["<a class=\"x ", "\">", "</a>"]);
        assert_eq!(out, "<a class=\"x <!--δ0-->\"><!--δ1--></a>");
    }

    #[test]
    fn test_leading_interpolation_in_attribute_value_is_not_an_attribute_marker() {
        let out = normalize(&["<p class=\"", " big\" title=", "></p>"]);
        assert_eq!(out, "<p class=\"<!--δ0--> big\" δ1=title></p>");

        let out = normalize(&["<a href=", "/x>", "</a>"]);
        assert_eq!(out, "<a href=<!--δ0-->/x><!--δ1--></a>");
    }

    #[test]
    fn test_self_closing_tags() {
        let out = normalize(&["<x-icon name=", "/><br/><img src=\"a.png\" />"]);
        assert_eq!(out, "<x-icon δ0=name></x-icon><br /><img src=\"a.png\" />");
    }

    #[test]
    fn test_trims_outer_whitespace() {
        assert_eq!(normalize(&["\n  <div>", "</div>\n"]), "<div><!--δ0--></div>");
    }

    #[test]
    fn test_pure() {
        let segments = ["<ul>", "</ul>"];
        assert_eq!(normalize(&segments), normalize(&segments));
    }

    #[test]
    fn test_raw_text_content_gets_node_marker() {
        let out = normalize(&["<textarea>", "</textarea>"]);
        assert_eq!(out, "<textarea><!--δ0--></textarea>");
    }
}
