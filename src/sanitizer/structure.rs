//! Structural Constraint Checker: placement of an element relative to its
//! parent, ancestors and siblings, and constraints on its children.

use ego_tree::NodeId;
use scraper::Html;
use scraper::node::Node;

use super::dom;
use crate::spec::{ChildTagSpec, ReferencePoint, TagSpec};

/// Why an element's placement violates its spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlacementViolation {
    Parent { expected: String },
    Ancestor { expected: Vec<String> },
    DisallowedAncestor { found: String },
}

/// Check parent and ancestor constraints, in that order.
///
/// Uniqueness and the last-child rule depend on siblings that may still be
/// removed, so the pass checks those itself.
pub(crate) fn check_placement(
    html: &Html,
    id: NodeId,
    spec: &TagSpec,
) -> Result<(), PlacementViolation> {
    if let Some(expected) = &spec.mandatory_parent {
        if dom::parent_name(html, id) != *expected {
            return Err(PlacementViolation::Parent {
                expected: expected.clone(),
            });
        }
    }

    if !spec.mandatory_ancestor.is_empty() || !spec.disallowed_ancestor.is_empty() {
        let ancestors = dom::ancestor_names(html, id);
        if !spec.mandatory_ancestor.is_empty()
            && !spec
                .mandatory_ancestor
                .iter()
                .any(|name| ancestors.contains(&name.as_str()))
        {
            return Err(PlacementViolation::Ancestor {
                expected: spec.mandatory_ancestor.clone(),
            });
        }
        if let Some(found) = spec
            .disallowed_ancestor
            .iter()
            .find(|name| ancestors.contains(&name.as_str()))
        {
            return Err(PlacementViolation::DisallowedAncestor {
                found: found.clone(),
            });
        }
    }

    Ok(())
}

/// Whether an element sibling follows the node.
pub(crate) fn has_following_element(html: &Html, id: NodeId) -> bool {
    let Some(node) = html.tree.get(id) else {
        return false;
    };
    node.next_siblings()
        .any(|sibling| matches!(sibling.value(), Node::Element(_)))
}

/// Check the element's current element children against `child_tags`.
pub(crate) fn children_satisfy(html: &Html, id: NodeId, rules: &ChildTagSpec) -> bool {
    let children = dom::element_children(html, id);
    let names: Vec<&str> = children
        .iter()
        .filter_map(|&child| dom::element_name(html, child))
        .collect();

    if !rules.child_tag_name_oneof.is_empty()
        && !names
            .iter()
            .all(|name| rules.child_tag_name_oneof.iter().any(|t| t == name))
    {
        return false;
    }
    if let Some(first) = names.first() {
        if !rules.first_child_tag_name_oneof.is_empty()
            && !rules.first_child_tag_name_oneof.iter().any(|t| t == first)
        {
            return false;
        }
    }
    if rules
        .mandatory_num_child_tags
        .is_some_and(|n| names.len() != n)
    {
        return false;
    }
    if rules
        .mandatory_min_num_child_tags
        .is_some_and(|n| names.len() < n)
    {
        return false;
    }
    true
}

/// Mandatory reference points with no child currently carrying the role.
pub(crate) fn missing_reference_points<'s>(
    html: &Html,
    id: NodeId,
    spec: &'s TagSpec,
) -> Vec<&'s ReferencePoint> {
    let children = dom::element_children(html, id);
    spec.reference_points
        .iter()
        .filter(|rp| rp.mandatory)
        .filter(|rp| {
            !children.iter().any(|&child| {
                dom::element(html, child).is_some_and(|el| {
                    rp.admits(el.name()) && dom::attr_value(el, &rp.role).is_some()
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Catalogue;

    fn catalogue() -> Catalogue {
        Catalogue::from_json(
            r#"{ "tags": [
                { "tag_name": "form" },
                { "tag_name": "div", "attrs": { "submit-success": {} },
                  "dispatch_key": { "attr_name": "submit-success" },
                  "mandatory_parent": "form" },
                { "tag_name": "img", "mandatory_ancestor": ["noscript", "picture"] },
                { "tag_name": "amp-app-banner", "disallowed_ancestor": "amp-sidebar" },
                { "tag_name": "amp-sticky-ad",
                  "child_tags": { "child_tag_name_oneof": ["amp-ad"], "mandatory_num_child_tags": 1 } },
                { "tag_name": "amp-live-list",
                  "reference_points": [ { "role": "items", "mandatory": true } ] }
            ] }"#,
        )
        .unwrap()
    }

    fn find(html: &Html, name: &str) -> NodeId {
        html.tree
            .root()
            .descendants()
            .find(|n| matches!(n.value(), Node::Element(el) if el.name() == name))
            .map(|n| n.id())
            .unwrap()
    }

    #[test]
    fn mandatory_parent() {
        let catalogue = catalogue();
        let spec = &catalogue.specs_for("div")[0];
        let ok = dom::parse_fragment("<form><div submit-success></div></form>");
        assert_eq!(check_placement(&ok, find(&ok, "div"), spec), Ok(()));
        let bad = dom::parse_fragment("<section><div submit-success></div></section>");
        assert_eq!(
            check_placement(&bad, find(&bad, "div"), spec),
            Err(PlacementViolation::Parent {
                expected: "form".into()
            })
        );
    }

    #[test]
    fn any_mandatory_ancestor_suffices() {
        let catalogue = catalogue();
        let spec = &catalogue.specs_for("img")[0];
        let html = dom::parse_fragment("<picture><span><img src=a.png></span></picture>");
        assert!(check_placement(&html, find(&html, "img"), spec).is_ok());
        let bad = dom::parse_fragment("<span><img src=a.png></span>");
        assert!(matches!(
            check_placement(&bad, find(&bad, "img"), spec),
            Err(PlacementViolation::Ancestor { .. })
        ));
    }

    #[test]
    fn disallowed_ancestor() {
        let catalogue = catalogue();
        let spec = &catalogue.specs_for("amp-app-banner")[0];
        let html = dom::parse_fragment(
            "<amp-sidebar><nav><amp-app-banner></amp-app-banner></nav></amp-sidebar>",
        );
        assert_eq!(
            check_placement(&html, find(&html, "amp-app-banner"), spec),
            Err(PlacementViolation::DisallowedAncestor {
                found: "amp-sidebar".into()
            })
        );
    }

    #[test]
    fn following_elements_ignore_trailing_text() {
        let ok = dom::parse_fragment("<div><p>a</p><hr> trailing</div>");
        assert!(!has_following_element(&ok, find(&ok, "hr")));
        let bad = dom::parse_fragment("<div><hr><p>a</p></div>");
        assert!(has_following_element(&bad, find(&bad, "hr")));
    }

    #[test]
    fn child_tag_constraints() {
        let catalogue = catalogue();
        let rules = catalogue.specs_for("amp-sticky-ad")[0]
            .child_tags
            .clone()
            .unwrap();
        let ok = dom::parse_fragment("<amp-sticky-ad><amp-ad></amp-ad></amp-sticky-ad>");
        assert!(children_satisfy(&ok, find(&ok, "amp-sticky-ad"), &rules));
        let wrong = dom::parse_fragment("<amp-sticky-ad><div></div></amp-sticky-ad>");
        assert!(!children_satisfy(&wrong, find(&wrong, "amp-sticky-ad"), &rules));
        let empty = dom::parse_fragment("<amp-sticky-ad></amp-sticky-ad>");
        assert!(!children_satisfy(&empty, find(&empty, "amp-sticky-ad"), &rules));
    }

    #[test]
    fn mandatory_reference_points() {
        let catalogue = catalogue();
        let spec = &catalogue.specs_for("amp-live-list")[0];
        let ok = dom::parse_fragment("<amp-live-list><div items></div></amp-live-list>");
        assert!(missing_reference_points(&ok, find(&ok, "amp-live-list"), spec).is_empty());
        let bad = dom::parse_fragment("<amp-live-list><div></div></amp-live-list>");
        let missing = missing_reference_points(&bad, find(&bad, "amp-live-list"), spec);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].role, "items");
    }
}
