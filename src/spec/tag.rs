//! Tag specifications: one candidate rule for a tag name.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::attr::AttrSpec;

/// One declarative rule describing a permissible form of a tag name.
#[derive(Debug, Clone)]
pub struct TagSpec {
    pub tag_name: String,
    /// Human-readable identity, e.g. `amp-ad [type=adsense]`.
    pub spec_name: String,
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Tag name the immediate parent must have.
    pub mandatory_parent: Option<String>,
    /// At least one of these tag names must be an ancestor.
    pub mandatory_ancestor: Vec<String>,
    /// None of these tag names may be an ancestor.
    pub disallowed_ancestor: Vec<String>,
    /// The element must be the last element child of its parent.
    pub mandatory_last_child: bool,
    /// At most one element per document may match this spec.
    pub unique: bool,
    pub dispatch_key: Option<DispatchKey>,
    /// Child roles this element admits, identified by boolean attributes.
    pub reference_points: Vec<ReferencePoint>,
    pub child_tags: Option<ChildTagSpec>,
    /// Promote children in place when the element itself is removed.
    pub salvage_children: bool,
    /// Components whose runtime script a kept element depends on.
    pub requires_extension: Vec<String>,
    /// Position in the catalogue, unique across all specs.
    pub(crate) index: usize,
}

impl TagSpec {
    pub fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.get(name)
    }

    /// Catalogue-wide identity of this spec.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Attribute/value pair used to pick among several specs sharing a tag name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchKey {
    pub attr_name: String,
    /// Required value; `None` dispatches on presence alone.
    #[serde(default)]
    pub value: Option<String>,
    /// Compare `value` case-insensitively.
    #[serde(default)]
    pub value_casei: bool,
    /// Tag name the parent must have; only meaningful with `value`.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Specificity of a dispatch key; greater is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DispatchKind {
    Name,
    NameValue,
    NameValueParent,
}

impl DispatchKey {
    pub fn kind(&self) -> DispatchKind {
        match (&self.value, &self.parent) {
            (None, _) => DispatchKind::Name,
            (Some(_), None) => DispatchKind::NameValue,
            (Some(_), Some(_)) => DispatchKind::NameValueParent,
        }
    }

    /// Whether an element with `value` for the key attribute (if present) and
    /// the given parent tag name matches this key.
    pub fn matches(&self, value: Option<&str>, parent: Option<&str>) -> bool {
        let Some(actual) = value else {
            return false;
        };
        if let Some(expected) = &self.value {
            let same = if self.value_casei {
                expected.eq_ignore_ascii_case(actual)
            } else {
                expected == actual
            };
            if !same {
                return false;
            }
        }
        match &self.parent {
            Some(expected) => parent == Some(expected.as_str()),
            None => true,
        }
    }
}

/// A child role permitted within a composite parent component.
#[derive(Debug, Clone)]
pub struct ReferencePoint {
    /// Boolean attribute marking the role on the child.
    pub role: String,
    /// Tags that may take the role; empty admits any tag.
    pub tag_names: Vec<String>,
    /// Extra attributes a child in this role may carry.
    pub attrs: BTreeMap<String, AttrSpec>,
    /// The parent must contain a child in this role.
    pub mandatory: bool,
    /// The parent may contain at most one child in this role.
    pub unique: bool,
}

impl ReferencePoint {
    pub fn admits(&self, tag_name: &str) -> bool {
        self.tag_names.is_empty() || self.tag_names.iter().any(|t| t == tag_name)
    }
}

/// Constraints on an element's element children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChildTagSpec {
    pub child_tag_name_oneof: Vec<String>,
    pub first_child_tag_name_oneof: Vec<String>,
    pub mandatory_num_child_tags: Option<usize>,
    pub mandatory_min_num_child_tags: Option<usize>,
}
