//! Attribute Rule Evaluator: whether an attribute may appear on an element,
//! whether its value satisfies the declared rule, and whether the element's
//! attribute set as a whole satisfies presence constraints.

use std::collections::{BTreeMap, BTreeSet};

use url::{ParseError, Url};

use crate::spec::{AttrSpec, Catalogue, DEV_MODE_ATTRIBUTE, ReferencePoint, TagSpec, UrlSpec};

/// Attributes meaningless without their trigger attribute, on any element.
const DEPENDENT_ATTRIBUTES: &[(&str, &[&str])] = &[(
    "href",
    &["target", "download", "rel", "rev", "hreflang", "type"],
)];

/// Attributes to drop alongside `removed`.
pub(crate) fn dependents_of(removed: &str) -> &'static [&'static str] {
    DEPENDENT_ATTRIBUTES
        .iter()
        .find(|(trigger, _)| *trigger == removed)
        .map(|(_, dependents)| *dependents)
        .unwrap_or(&[])
}

/// How an attribute name resolves against the rules in force for an element.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Lookup<'c> {
    Declared(&'c AttrSpec),
    /// Allowed with any value (a reference-point role, or the dev-mode marker).
    Unconstrained,
    Undeclared,
}

/// Every attribute rule applying to one element: its tag spec, the reference
/// point it fills in its parent, and the catalogue's global attributes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttrTable<'c> {
    pub catalogue: &'c Catalogue,
    pub tag_spec: Option<&'c TagSpec>,
    pub reference_point: Option<&'c ReferencePoint>,
    pub dev_mode: bool,
}

impl<'c> AttrTable<'c> {
    pub fn lookup(&self, name: &str) -> Lookup<'c> {
        if let Some(spec) = self.tag_spec.and_then(|t| t.attr(name)) {
            return Lookup::Declared(spec);
        }
        if let Some(rp) = self.reference_point {
            if let Some(spec) = rp.attrs.get(name) {
                return Lookup::Declared(spec);
            }
            if rp.role == name {
                return Lookup::Unconstrained;
            }
        }
        if let Some(spec) = self.catalogue.global_attr(name) {
            return Lookup::Declared(spec);
        }
        if self.catalogue.has_global_prefix(name) {
            return Lookup::Unconstrained;
        }
        if self.dev_mode && name == DEV_MODE_ATTRIBUTE {
            return Lookup::Unconstrained;
        }
        Lookup::Undeclared
    }

    /// Whether an attribute with this name and value may stay.
    pub fn permits(&self, name: &str, value: &str) -> bool {
        match self.lookup(name) {
            Lookup::Declared(spec) => value_passes(spec, value),
            Lookup::Unconstrained => true,
            Lookup::Undeclared => false,
        }
    }

    /// Element-specific declarations (tag spec, then reference point).
    fn declared(&self) -> impl Iterator<Item = (&'c str, &'c AttrSpec)> + use<'c> {
        let tag = self.tag_spec.into_iter().flat_map(|t| t.attrs.iter());
        let rp = self.reference_point.into_iter().flat_map(|rp| rp.attrs.iter());
        tag.chain(rp).map(|(name, spec)| (name.as_str(), spec))
    }

    /// Present attributes whose `requires_presence_of` partners are absent,
    /// in name order.
    pub fn unmet_requirements(&self, present: &BTreeSet<String>) -> Vec<String> {
        present
            .iter()
            .filter(|name| match self.lookup(name) {
                Lookup::Declared(spec) => spec
                    .requires_presence_of
                    .iter()
                    .any(|required| !present.contains(required)),
                _ => false,
            })
            .cloned()
            .collect()
    }

    /// First presence constraint the attribute set violates.
    pub fn presence_violation(&self, present: &BTreeSet<String>) -> Option<PresenceViolation> {
        let mut anyof: BTreeMap<&str, bool> = BTreeMap::new();
        let mut oneof: BTreeMap<&str, usize> = BTreeMap::new();

        for (name, spec) in self.declared() {
            let here = present.contains(name);
            if spec.mandatory && !here {
                return Some(PresenceViolation::Mandatory(name.to_string()));
            }
            if let Some(group) = &spec.mandatory_anyof {
                *anyof.entry(group).or_default() |= here;
            }
            if let Some(group) = &spec.mandatory_oneof {
                *oneof.entry(group).or_default() += usize::from(here);
            }
        }

        if let Some((group, _)) = anyof.into_iter().find(|(_, seen)| !seen) {
            return Some(PresenceViolation::AnyOf(group.to_string()));
        }
        oneof
            .into_iter()
            .find(|(_, count)| *count != 1)
            .map(|(group, _)| PresenceViolation::OneOf(group.to_string()))
    }
}

/// A presence constraint that the element's attribute set fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PresenceViolation {
    Mandatory(String),
    AnyOf(String),
    OneOf(String),
}

/// Apply one rule's value constraints: blacklist, enumeration, patterns,
/// then URL rules. Every configured constraint must pass.
pub(crate) fn value_passes(spec: &AttrSpec, value: &str) -> bool {
    if spec
        .disallowed_value_regex
        .as_ref()
        .is_some_and(|re| re.is_match(value))
    {
        return false;
    }

    if !spec.value_enum.is_empty() {
        let member = spec.value_enum.iter().any(|allowed| {
            if spec.value_casei {
                allowed.eq_ignore_ascii_case(value)
            } else {
                allowed == value
            }
        });
        if !member {
            return false;
        }
    }

    if spec.value_regex.as_ref().is_some_and(|re| !re.is_match(value)) {
        return false;
    }
    if spec
        .value_regex_casei
        .as_ref()
        .is_some_and(|re| !re.is_match(value))
    {
        return false;
    }

    match &spec.value_url {
        Some(rules) => url_passes(rules, value),
        None => true,
    }
}

/// Whether `value` is an acceptable URL.
pub(crate) fn url_passes(rules: &UrlSpec, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return rules.allow_empty;
    }
    match Url::parse(value) {
        Ok(url) => rules
            .allowed_protocols
            .iter()
            .any(|protocol| protocol.eq_ignore_ascii_case(url.scheme())),
        Err(ParseError::RelativeUrlWithoutBase) => rules.allow_relative,
        Err(_) => false,
    }
}
