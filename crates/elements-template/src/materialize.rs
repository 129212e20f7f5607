use elements_dom::{parse_fragment, Node};

/// Build the inert fragment for normalized markup. Markers are left in place
/// as comments and synthetic attributes for the binder to find.
pub fn materialize(markup: &str) -> Node {
    let fragment = parse_fragment(markup);
    tracing::trace!(nodes = fragment.child_nodes().len(), "materialized template");
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use elements_dom::{window, NodeType};

    #[test]
    fn test_markers_survive_parsing() {
        let frag = materialize(r#"<p δ0="title"><!--δ1--></p>"#);
        let p = frag.first_child().unwrap();
        assert_eq!(p.get_attribute("δ0").as_deref(), Some("title"));
        assert_eq!(p.first_child().unwrap().node_type(), NodeType::Comment);
    }

    #[test]
    fn test_custom_elements_stay_inert() {
        let frag = materialize("<x-never-defined></x-never-defined>");
        let el = frag.first_child().unwrap();
        assert!(el.custom_element().is_none());
        assert!(!el.is_connected());
        assert!(window().take_errors().is_empty());
    }
}
