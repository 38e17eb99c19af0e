//! JSON representation of the rule catalogue and its compilation into the
//! typed [`Catalogue`].

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::Deserialize;

use super::Catalogue;
use super::attr::{AttrSpec, UrlSpec, anchored, search_casei};
use super::tag::{ChildTagSpec, DispatchKey, ReferencePoint, TagSpec};
use crate::error::{AmpSanitizerError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCatalogue {
    global_attrs: BTreeMap<String, RawAttrSpec>,
    global_attr_prefixes: Vec<String>,
    unsalvageable_tags: Vec<String>,
    unsalvageable_prefixes: Vec<String>,
    extension_scripts: BTreeMap<String, String>,
    tags: Vec<RawTagSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawAttrSpec {
    mandatory: bool,
    value: Option<String>,
    value_enum: Vec<String>,
    value_casei: bool,
    value_regex: Option<String>,
    value_regex_casei: Option<String>,
    disallowed_value_regex: Option<String>,
    value_url: Option<UrlSpec>,
    mandatory_anyof: Option<String>,
    mandatory_oneof: Option<String>,
    requires_presence_of: OneOrMany,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTagSpec {
    tag_name: String,
    #[serde(default)]
    spec_name: Option<String>,
    #[serde(default)]
    attrs: BTreeMap<String, RawAttrSpec>,
    #[serde(default)]
    mandatory_parent: Option<String>,
    #[serde(default)]
    mandatory_ancestor: OneOrMany,
    #[serde(default)]
    disallowed_ancestor: OneOrMany,
    #[serde(default)]
    mandatory_last_child: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    dispatch_key: Option<DispatchKey>,
    #[serde(default)]
    reference_points: Vec<RawReferencePoint>,
    #[serde(default)]
    child_tags: Option<ChildTagSpec>,
    #[serde(default)]
    salvage_children: Option<bool>,
    #[serde(default)]
    requires_extension: OneOrMany,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReferencePoint {
    role: String,
    #[serde(default)]
    tag_names: OneOrMany,
    #[serde(default)]
    attrs: BTreeMap<String, RawAttrSpec>,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    unique: bool,
}

/// A tag-name list that may be written as a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

pub(super) fn from_json(json: &str) -> Result<Catalogue> {
    let raw: RawCatalogue = serde_json::from_str(json)?;
    compile(raw)
}

fn compile(raw: RawCatalogue) -> Result<Catalogue> {
    let mut catalogue = Catalogue {
        tags: HashMap::new(),
        global_attrs: BTreeMap::new(),
        global_attr_prefixes: raw.global_attr_prefixes,
        unsalvageable_tags: raw.unsalvageable_tags.into_iter().collect::<HashSet<_>>(),
        unsalvageable_prefixes: raw.unsalvageable_prefixes,
        extension_scripts: raw.extension_scripts,
        spec_count: 0,
    };

    for (name, attr) in raw.global_attrs {
        check_lowercase("global attribute", &name)?;
        let spec = compile_attr("*", &name, attr)?;
        catalogue.global_attrs.insert(name, spec);
    }

    for (index, tag) in raw.tags.into_iter().enumerate() {
        let spec = compile_tag(&catalogue, index, tag)?;
        catalogue
            .tags
            .entry(spec.tag_name.clone())
            .or_default()
            .push(spec);
        catalogue.spec_count += 1;
    }

    tracing::debug!(
        "Compiled catalogue with {} specs for {} tag names",
        catalogue.spec_count,
        catalogue.tags.len()
    );
    Ok(catalogue)
}

fn compile_tag(catalogue: &Catalogue, index: usize, raw: RawTagSpec) -> Result<TagSpec> {
    let tag = raw.tag_name;
    if tag.is_empty() {
        return Err(AmpSanitizerError::Catalogue(format!(
            "tag spec #{index} has an empty tag_name"
        )));
    }
    check_lowercase("tag name", &tag)?;

    let mut attrs = BTreeMap::new();
    for (name, attr) in raw.attrs {
        check_lowercase("attribute", &name)?;
        let spec = compile_attr(&tag, &name, attr)?;
        attrs.insert(name, spec);
    }

    if let Some(key) = &raw.dispatch_key {
        if !attrs.contains_key(&key.attr_name) {
            return Err(AmpSanitizerError::Catalogue(format!(
                "<{tag}> dispatches on `{}` which it does not declare",
                key.attr_name
            )));
        }
    }

    let mut reference_points = Vec::with_capacity(raw.reference_points.len());
    for rp in raw.reference_points {
        check_lowercase("reference point", &rp.role)?;
        let mut rp_attrs = BTreeMap::new();
        for (name, attr) in rp.attrs {
            check_lowercase("attribute", &name)?;
            if attrs.contains_key(&name) {
                tracing::warn!(
                    "<{tag}> reference point `{}` redeclares attribute `{name}`",
                    rp.role
                );
            }
            rp_attrs.insert(name.clone(), compile_attr(&tag, &name, attr)?);
        }
        reference_points.push(ReferencePoint {
            role: rp.role,
            tag_names: rp.tag_names.into(),
            attrs: rp_attrs,
            mandatory: rp.mandatory,
            unique: rp.unique,
        });
    }

    let spec_name = raw.spec_name.unwrap_or_else(|| match &raw.dispatch_key {
        Some(DispatchKey {
            attr_name,
            value: Some(value),
            ..
        }) => format!("{tag} [{attr_name}={value}]"),
        Some(DispatchKey { attr_name, .. }) => format!("{tag} [{attr_name}]"),
        None => tag.clone(),
    });
    let salvage_children = raw
        .salvage_children
        .unwrap_or_else(|| catalogue.salvages_unknown(&tag));

    Ok(TagSpec {
        tag_name: tag,
        spec_name,
        attrs,
        mandatory_parent: raw.mandatory_parent,
        mandatory_ancestor: raw.mandatory_ancestor.into(),
        disallowed_ancestor: raw.disallowed_ancestor.into(),
        mandatory_last_child: raw.mandatory_last_child,
        unique: raw.unique,
        dispatch_key: raw.dispatch_key,
        reference_points,
        child_tags: raw.child_tags,
        salvage_children,
        requires_extension: raw.requires_extension.into(),
        index,
    })
}

fn compile_attr(tag: &str, name: &str, raw: RawAttrSpec) -> Result<AttrSpec> {
    let pattern = |source: Option<String>,
                   build: fn(&str) -> std::result::Result<Regex, regex::Error>|
     -> Result<Option<Regex>> {
        source
            .as_deref()
            .map(build)
            .transpose()
            .map_err(|source| AmpSanitizerError::InvalidRegex {
                tag: tag.to_string(),
                attr: name.to_string(),
                source,
            })
    };

    let mut value_enum = raw.value_enum;
    if let Some(value) = raw.value {
        value_enum.insert(0, value);
    }

    Ok(AttrSpec {
        mandatory: raw.mandatory,
        value_enum,
        value_casei: raw.value_casei,
        value_regex: pattern(raw.value_regex, |p| anchored(p, false))?,
        value_regex_casei: pattern(raw.value_regex_casei, |p| anchored(p, true))?,
        disallowed_value_regex: pattern(raw.disallowed_value_regex, search_casei)?,
        value_url: raw.value_url,
        mandatory_anyof: raw.mandatory_anyof,
        mandatory_oneof: raw.mandatory_oneof,
        requires_presence_of: raw.requires_presence_of.into(),
    })
}

fn check_lowercase(what: &str, name: &str) -> Result<()> {
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AmpSanitizerError::Catalogue(format!(
            "{what} `{name}` must be lowercase"
        )));
    }
    Ok(())
}
