//! The rule catalogue: which tags and attributes are permitted, and under
//! what conditions.
//!
//! A [`Catalogue`] maps each tag name to an ordered list of [`TagSpec`]
//! candidates. It is built once (from JSON, see [`Catalogue::from_json`]) and
//! only read afterwards, so one catalogue can back any number of sanitizer
//! passes, on any number of threads.
//!
//! The JSON shape mirrors the typed model:
//!
//! ```json
//! {
//!   "global_attrs": { "id": {}, "class": {} },
//!   "global_attr_prefixes": ["aria-"],
//!   "unsalvageable_tags": ["script", "style"],
//!   "unsalvageable_prefixes": ["amp-"],
//!   "extension_scripts": { "amp-ad": "https://cdn.ampproject.org/v0/amp-ad-0.1.js" },
//!   "tags": [
//!     { "tag_name": "a", "attrs": { "href": { "value_url": {} } } }
//!   ]
//! }
//! ```

mod attr;
mod load;
mod tag;

pub use attr::{AttrSpec, UrlSpec};
pub use tag::{ChildTagSpec, DispatchKey, DispatchKind, ReferencePoint, TagSpec};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::Result;

/// Marker attribute exempting an element from validation in dev mode.
pub const DEV_MODE_ATTRIBUTE: &str = "data-ampdevmode";

static BUILTIN: OnceLock<Catalogue> = OnceLock::new();

/// Immutable, pre-compiled set of tag specifications.
#[derive(Debug, Clone)]
pub struct Catalogue {
    tags: HashMap<String, Vec<TagSpec>>,
    global_attrs: BTreeMap<String, AttrSpec>,
    global_attr_prefixes: Vec<String>,
    unsalvageable_tags: HashSet<String>,
    unsalvageable_prefixes: Vec<String>,
    extension_scripts: BTreeMap<String, String>,
    spec_count: usize,
}

impl Catalogue {
    /// Decode and compile a catalogue from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        load::from_json(json)
    }

    /// Read and compile a catalogue from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("Loading catalogue from {}", path.display());
        Self::from_json(&json)
    }

    /// The catalogue shipped with the crate: core HTML plus a selection of
    /// AMP components.
    ///
    /// # Panics
    ///
    /// Panics if the embedded catalogue fails to compile, which the crate's
    /// own tests rule out.
    pub fn builtin() -> &'static Catalogue {
        BUILTIN.get_or_init(|| {
            Self::from_json(include_str!("builtin.json"))
                .unwrap_or_else(|e| panic!("Builtin catalogue is invalid: {e}"))
        })
    }

    /// Candidate specs for `tag_name`, in declaration order.
    pub fn specs_for(&self, tag_name: &str) -> &[TagSpec] {
        self.tags.get(tag_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rule for an attribute allowed on every element, if any.
    pub fn global_attr(&self, name: &str) -> Option<&AttrSpec> {
        self.global_attrs.get(name)
    }

    /// Whether `name` falls under a globally allowed attribute prefix.
    pub fn has_global_prefix(&self, name: &str) -> bool {
        self.global_attr_prefixes
            .iter()
            .any(|prefix| name.len() > prefix.len() && name.starts_with(prefix.as_str()))
    }

    /// Whether the children of a `tag_name` element with no usable spec
    /// should be promoted in its place.
    pub fn salvages_unknown(&self, tag_name: &str) -> bool {
        !self.unsalvageable_tags.contains(tag_name)
            && !self
                .unsalvageable_prefixes
                .iter()
                .any(|prefix| tag_name.starts_with(prefix.as_str()))
    }

    /// Script URL registered for a component, if the catalogue knows one.
    pub fn extension_script(&self, component: &str) -> Option<&str> {
        self.extension_scripts.get(component).map(String::as_str)
    }

    /// Total number of tag specs.
    pub fn len(&self) -> usize {
        self.spec_count
    }

    pub fn is_empty(&self) -> bool {
        self.spec_count == 0
    }
}
