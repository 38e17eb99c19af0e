//! Spec Matcher: pick the winning [`TagSpec`] for an element.

use std::cmp::Reverse;

use ego_tree::NodeId;
use scraper::Html;

use super::{dom, structure};
use crate::spec::{Catalogue, DispatchKey, ReferencePoint, TagSpec};

/// Outcome of matching one element.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpecMatch<'c> {
    pub tag_spec: Option<&'c TagSpec>,
    /// Role the element fills within its parent component.
    pub reference_point: Option<&'c ReferencePoint>,
}

impl SpecMatch<'_> {
    /// No rule admits the element at all.
    pub fn is_none(&self) -> bool {
        self.tag_spec.is_none() && self.reference_point.is_none()
    }
}

/// Match the element at `id`.
///
/// Reference points declared by the parent's spec are evaluated first.
/// Candidates are then narrowed by dispatch key: a spec with a key is only
/// considered when the element carries the key, and more specific keys are
/// preferred. Among equals catalogue order decides. The first candidate whose
/// placement constraints hold wins; if none holds, the best candidate is
/// returned so the violation can be reported against it.
pub(crate) fn match_element<'c>(
    catalogue: &'c Catalogue,
    html: &Html,
    id: NodeId,
    parent_spec: Option<&'c TagSpec>,
) -> SpecMatch<'c> {
    let Some(el) = dom::element(html, id) else {
        return SpecMatch::default();
    };
    let tag = el.name();

    let reference_point = parent_spec.and_then(|parent| {
        parent
            .reference_points
            .iter()
            .find(|rp| rp.admits(tag) && dom::attr_value(el, &rp.role).is_some())
    });

    let parent_name = dom::parent_name(html, id);
    let mut candidates: Vec<&TagSpec> = catalogue
        .specs_for(tag)
        .iter()
        .filter(|spec| match &spec.dispatch_key {
            Some(key) => key.matches(
                dom::attr_value(el, &key.attr_name),
                Some(parent_name.as_str()),
            ),
            None => true,
        })
        .collect();
    candidates.sort_by_key(|spec| Reverse(spec.dispatch_key.as_ref().map(DispatchKey::kind)));

    let tag_spec = candidates
        .iter()
        .copied()
        .find(|spec| structure::check_placement(html, id, spec).is_ok())
        .or_else(|| candidates.first().copied());

    if let Some(spec) = tag_spec {
        tracing::trace!(
            "<{tag}> matched `{}` among {} candidates",
            spec.spec_name,
            candidates.len()
        );
    }

    SpecMatch {
        tag_spec,
        reference_point,
    }
}
