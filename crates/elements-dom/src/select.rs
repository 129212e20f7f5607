//! A small selector engine: compound selectors made of a tag (or `*`), `#id`,
//! `.class`, `[attr]` and `[attr=value]`, joined by descendant and child
//! combinators, in comma-separated lists.

use crate::node::Node;

impl Node {
    /// First descendant matching `selector`, in tree order.
    pub fn query_selector(&self, selector: &str) -> Option<Node> {
        let list = parse_or_warn(selector)?;
        self.descendants().into_iter().find(|node| list.matches(node))
    }

    /// All descendants matching `selector`, in tree order. An invalid selector
    /// matches nothing.
    pub fn query_selector_all(&self, selector: &str) -> Vec<Node> {
        let Some(list) = parse_or_warn(selector) else {
            return Vec::new();
        };
        self.descendants()
            .into_iter()
            .filter(|node| list.matches(node))
            .collect()
    }

    pub fn matches(&self, selector: &str) -> bool {
        parse_or_warn(selector).is_some_and(|list| list.matches(self))
    }
}

fn parse_or_warn(selector: &str) -> Option<SelectorList> {
    let list = SelectorList::parse(selector);
    if list.is_none() {
        tracing::warn!(selector, "unsupported selector");
    }
    list
}

#[derive(Debug, Clone, PartialEq)]
struct SelectorList(Vec<Complex>);

/// Compounds from left to right; `combinators[i]` joins `compounds[i]` and
/// `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl SelectorList {
    fn parse(input: &str) -> Option<Self> {
        let list = input
            .split(',')
            .map(Complex::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(SelectorList(list))
    }

    fn matches(&self, node: &Node) -> bool {
        self.0.iter().any(|complex| complex.matches(node))
    }
}

impl Complex {
    fn parse(input: &str) -> Option<Self> {
        let spaced = input.replace('>', " > ");
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut pending = None;
        for token in spaced.split_whitespace() {
            if token == ">" {
                if compounds.is_empty() || pending.is_some() {
                    return None;
                }
                pending = Some(Combinator::Child);
                continue;
            }
            if !compounds.is_empty() {
                combinators.push(pending.take().unwrap_or(Combinator::Descendant));
            }
            compounds.push(Compound::parse(token)?);
        }
        if compounds.is_empty() || pending.is_some() {
            return None;
        }
        Some(Complex {
            compounds,
            combinators,
        })
    }

    fn matches(&self, node: &Node) -> bool {
        self.matches_at(node, self.compounds.len() - 1)
    }

    fn matches_at(&self, node: &Node, index: usize) -> bool {
        if !self.compounds[index].matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => node
                .parent()
                .is_some_and(|parent| self.matches_at(&parent, index - 1)),
            Combinator::Descendant => {
                let mut current = node.parent();
                while let Some(ancestor) = current {
                    if self.matches_at(&ancestor, index - 1) {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
        }
    }
}

impl Compound {
    fn parse(token: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut rest = token;

        let tag_len = rest
            .find(['#', '.', '['])
            .unwrap_or(rest.len());
        match &rest[..tag_len] {
            "" | "*" => {}
            tag if tag.chars().all(is_name_char) => compound.tag = Some(tag.to_ascii_lowercase()),
            _ => return None,
        }
        rest = &rest[tag_len..];

        while let Some(first) = rest.chars().next() {
            match first {
                '#' | '.' => {
                    let end = rest[1..].find(['#', '.', '[']).map_or(rest.len(), |i| i + 1);
                    let name = &rest[1..end];
                    if name.is_empty() || !name.chars().all(is_name_char) {
                        return None;
                    }
                    if first == '#' {
                        compound.id = Some(name.to_string());
                    } else {
                        compound.classes.push(name.to_string());
                    }
                    rest = &rest[end..];
                }
                '[' => {
                    let end = rest.find(']')?;
                    let inner = &rest[1..end];
                    let attr = match inner.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim_matches(|c| c == '"' || c == '\'');
                            (name.trim().to_ascii_lowercase(), Some(value.to_string()))
                        }
                        None => (inner.trim().to_ascii_lowercase(), None),
                    };
                    if attr.0.is_empty() {
                        return None;
                    }
                    compound.attrs.push(attr);
                    rest = &rest[end + 1..];
                }
                _ => return None,
            }
        }
        Some(compound)
    }

    fn matches(&self, node: &Node) -> bool {
        let Some(local_name) = node.local_name() else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|tag| tag != local_name) {
            return false;
        }
        if let Some(id) = &self.id {
            if node.get_attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class = node.get_attribute("class").unwrap_or_default();
            let have: Vec<&str> = class.split_whitespace().collect();
            if !self.classes.iter().all(|c| have.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|(name, value)| match (node.get_attribute(name), value) {
            (Some(actual), Some(expected)) => actual == *expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_fragment;

    fn tree() -> Node {
        let root = Node::element("div");
        root.set_inner_html(
            r#"<ul id="menu"><li class="item active"><a href="/a">a</a></li><li class="item"><span><a>b</a></span></li></ul><p data-x="1"></p>"#,
        );
        root
    }

    #[test]
    fn test_simple_selectors() {
        let root = tree();
        let menu = root.query_selector("#menu").unwrap();
        assert_eq!(menu.local_name(), Some("ul"));
        assert_eq!(root.query_selector_all("li.item").len(), 2);
        assert_eq!(root.query_selector_all(".item.active").len(), 1);
        assert_eq!(root.query_selector_all("[data-x]").len(), 1);
        assert_eq!(root.query_selector_all("a[href='/a']").len(), 1);
        assert_eq!(root.query_selector_all("*").len(), 7);
    }

    #[test]
    fn test_combinators() {
        let root = tree();
        assert_eq!(root.query_selector_all("ul a").len(), 2);
        assert_eq!(root.query_selector_all("li > a").len(), 1);
        assert_eq!(root.query_selector_all("li>span>a").len(), 1);
        assert_eq!(root.query_selector_all("p, #menu").len(), 2);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let root = tree();
        assert!(root.query_selector_all("li >").is_empty());
        assert!(root.query_selector("a:hover").is_none());
        assert!(!root.matches("div["));
    }

    #[test]
    fn test_does_not_match_scope_itself() {
        let frag = parse_fragment("<p><b></b></p>");
        let p = frag.first_child().unwrap();
        assert!(p.query_selector("p").is_none());
        assert!(p.matches("p"));
    }
}
