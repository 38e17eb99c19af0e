//! The Tree Sanitizer: walks a DOM, matches every element against the
//! catalogue and removes whatever does not conform.
//!
//! The walk is an explicit worklist of enter/exit frames rather than native
//! recursion, so nesting depth is bounded only by memory. Children are pushed
//! onto the worklist only after their parent has been decided, which means
//! removing or salvaging a node never invalidates a pending frame: promoted
//! children are pushed in the removed node's place, and detached nodes are
//! skipped when their exit frame comes up.
//!
//! Submodules:
//!
//! - `matcher` -- the Spec Matcher.
//! - `structure` -- the Structural Constraint Checker.
//! - `attribute` -- the Attribute Rule Evaluator.
//! - [`dom`] -- parsing and serialization helpers.

mod attribute;
pub mod dom;
mod matcher;
mod structure;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use ego_tree::NodeId;
use scraper::Html;
use scraper::node::Node;
use serde::{Serialize, Serializer};

use self::attribute::{AttrTable, PresenceViolation};
use self::matcher::SpecMatch;
use self::structure::PlacementViolation;
use crate::config::SanitizerBuilder;
use crate::spec::{Catalogue, DEV_MODE_ATTRIBUTE, TagSpec};
use crate::validation::{
    ErrorCode, ReportedError, ValidationError, ValidationErrorCallback, ValidationSummary,
};

/// Elements never pruned for being left empty.
const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body"];

/// Runtime dependency of a kept component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRef {
    /// The component is needed but its script URL is resolved elsewhere.
    /// Serializes as `true`.
    Bundled,
    Url(String),
}

impl Serialize for ScriptRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bundled => serializer.serialize_bool(true),
            Self::Url(url) => serializer.serialize_str(url),
        }
    }
}

/// Everything a pass produces besides the mutated tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeOutput {
    /// Component name to script reference, for every kept component.
    pub scripts: BTreeMap<String, ScriptRef>,
    /// Every reported violation, in detection order.
    pub validation_errors: Vec<ReportedError>,
}

impl SanitizeOutput {
    /// Counts of what was actually removed.
    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary::from_errors(
            self.validation_errors
                .iter()
                .filter(|reported| reported.sanitized)
                .map(|reported| &reported.error),
        )
    }

    /// Codes of all reported errors, in detection order.
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.validation_errors
            .iter()
            .map(|reported| reported.error.code)
            .collect()
    }

    /// Whether the input already conformed.
    pub fn is_clean(&self) -> bool {
        self.validation_errors.is_empty()
    }
}

/// Removes elements and attributes not permitted by a [`Catalogue`].
///
/// Build one with [`TagAndAttributeSanitizer::builder`]. A sanitizer holds no
/// per-document state, so it can be reused for any number of documents.
///
/// ```
/// use amp_sanitizer::{Catalogue, TagAndAttributeSanitizer, dom};
///
/// let mut html = dom::parse_fragment(r#"<p style="color:red">Hi<blink>!</blink></p>"#);
/// let output = TagAndAttributeSanitizer::builder(Catalogue::builtin())
///     .build()
///     .sanitize(&mut html);
/// assert_eq!(dom::fragment_html(&html), "<p>Hi!</p>");
/// assert_eq!(output.validation_errors.len(), 2);
/// ```
pub struct TagAndAttributeSanitizer<'a> {
    pub(crate) catalogue: &'a Catalogue,
    pub(crate) use_document_element: bool,
    pub(crate) dev_mode: bool,
    pub(crate) remove_empty_parents: bool,
    pub(crate) callback: Box<dyn ValidationErrorCallback + 'a>,
}

impl<'a> TagAndAttributeSanitizer<'a> {
    /// Start configuring a sanitizer for `catalogue`.
    pub fn builder(catalogue: &'a Catalogue) -> SanitizerBuilder<'a> {
        SanitizerBuilder::new(catalogue)
    }

    /// Sanitize `html` in place.
    pub fn sanitize(&mut self, html: &mut Html) -> SanitizeOutput {
        let root = if self.use_document_element {
            dom::document_element_id(html)
        } else {
            dom::body_id(html)
        };
        let Some(root) = root else {
            tracing::debug!("Nothing to sanitize: document has no root element");
            return SanitizeOutput::default();
        };

        let dev_mode = self.dev_mode
            || dom::document_element_id(html)
                .and_then(|id| dom::element(html, id))
                .is_some_and(|el| dom::attr_value(el, DEV_MODE_ATTRIBUTE).is_some());

        let mut pass = Pass {
            catalogue: self.catalogue,
            html,
            callback: self.callback.as_mut(),
            root,
            include_root: self.use_document_element,
            dev_mode,
            remove_empty_parents: self.remove_empty_parents,
            specs: HashMap::new(),
            removed: HashSet::new(),
            kept_attrs: HashSet::new(),
            kept_nodes: HashSet::new(),
            unique_holders: HashMap::new(),
            role_holders: HashMap::new(),
            errors: Vec::new(),
        };
        pass.run();

        let scripts = pass.scripts();
        tracing::debug!(
            "Sanitization pass finished: {} errors, {} scripts",
            pass.errors.len(),
            scripts.len()
        );
        SanitizeOutput {
            scripts,
            validation_errors: pass.errors,
        }
    }
}

enum Frame {
    Enter(NodeId),
    Exit(NodeId),
}

/// State for one sanitization pass.
struct Pass<'p, 'a> {
    catalogue: &'a Catalogue,
    html: &'p mut Html,
    callback: &'p mut (dyn ValidationErrorCallback + 'a),
    root: NodeId,
    include_root: bool,
    dev_mode: bool,
    remove_empty_parents: bool,
    /// Winning spec of every element that survived its enter step.
    specs: HashMap<NodeId, &'a TagSpec>,
    removed: HashSet<NodeId>,
    /// Attributes the callback declined to remove.
    kept_attrs: HashSet<(NodeId, String)>,
    /// Elements the callback declined to remove. They are not reported again.
    kept_nodes: HashSet<NodeId>,
    /// Element holding each unique spec. A holder that is later detached
    /// frees its slot.
    unique_holders: HashMap<usize, NodeId>,
    /// Element filling each unique reference-point role, per parent.
    role_holders: HashMap<(NodeId, String), NodeId>,
    errors: Vec<ReportedError>,
}

impl<'a> Pass<'_, 'a> {
    fn run(&mut self) {
        let mut stack = Vec::new();
        if self.include_root {
            stack.push(Frame::Enter(self.root));
        } else {
            self.push_children(self.root, &mut stack);
        }

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => self.enter(id, &mut stack),
                Frame::Exit(id) => self.exit(id),
            }
        }

        if !self.include_root {
            self.check_last_children(self.root);
        }
    }

    fn push_children(&self, id: NodeId, stack: &mut Vec<Frame>) {
        if let Some(node) = self.html.tree.get(id) {
            let children: Vec<NodeId> = node.children().map(|child| child.id()).collect();
            stack.extend(children.into_iter().rev().map(Frame::Enter));
        }
    }

    fn push_all(stack: &mut Vec<Frame>, ids: Vec<NodeId>) {
        stack.extend(ids.into_iter().rev().map(Frame::Enter));
    }

    fn report(&mut self, error: ValidationError) -> bool {
        let sanitized = self.callback.decide(&error);
        tracing::debug!(
            "{} ({}) -> {}",
            error,
            error.error_type,
            if sanitized { "sanitized" } else { "kept" }
        );
        self.errors.push(ReportedError { error, sanitized });
        sanitized
    }

    fn enter(&mut self, id: NodeId, stack: &mut Vec<Frame>) {
        let Some(node) = self.html.tree.get(id) else {
            return;
        };
        // html5ever parses `<?php ... ?>` into a comment starting with `?`.
        let instruction = match node.value() {
            Node::Element(_) => None,
            Node::Comment(comment) => match comment.strip_prefix('?') {
                Some(instruction) => Some(instruction.to_string()),
                None => return,
            },
            Node::ProcessingInstruction(pi) => Some(format!("{} {}", &*pi.target, &*pi.data)),
            _ => return,
        };
        match instruction {
            Some(instruction) => self.processing_instruction(id, &instruction),
            None => self.enter_element(id, stack),
        }
    }

    /// `instruction` is the PI content after `<?`, e.g. `php echo 1; ?`.
    fn processing_instruction(&mut self, id: NodeId, instruction: &str) {
        let instruction = instruction.strip_suffix('?').unwrap_or(instruction).trim();
        let (target, body) = instruction
            .split_once(char::is_whitespace)
            .unwrap_or((instruction, ""));
        let error = ValidationError::processing_instruction(
            target,
            Some(dom::parent_name(self.html, id)),
            body.trim(),
        );
        if self.report(error) {
            self.remove(id, false);
        }
    }

    fn enter_element(&mut self, id: NodeId, stack: &mut Vec<Frame>) {
        let Some(el) = dom::element(self.html, id) else {
            return;
        };
        let tag = el.name().to_string();

        if self.dev_mode
            && id != self.root_element()
            && dom::attr_value(el, DEV_MODE_ATTRIBUTE).is_some()
        {
            tracing::trace!("<{tag}> exempt from validation in dev mode");
            return;
        }

        let parent_id = self
            .html
            .tree
            .get(id)
            .and_then(|node| node.parent())
            .map(|parent| parent.id());
        let parent_spec = parent_id.and_then(|pid| self.specs.get(&pid).copied());
        let matched = matcher::match_element(self.catalogue, self.html, id, parent_spec);

        if matched.is_none() {
            let error = self.element_error(id, ErrorCode::InvalidElement);
            if self.report(error) {
                let salvage = self.catalogue.salvages_unknown(&tag);
                let promoted = self.remove(id, salvage);
                Self::push_all(stack, promoted);
            } else {
                self.kept_nodes.insert(id);
                stack.push(Frame::Exit(id));
                self.push_children(id, stack);
            }
            return;
        }

        if let Some(code) = self.structural_violation(id, &matched, parent_id) {
            let error = self.element_error(id, code);
            if self.report(error) {
                let promoted = self.remove(id, salvages(&matched));
                Self::push_all(stack, promoted);
                return;
            }
            self.kept_nodes.insert(id);
        }

        let table = AttrTable {
            catalogue: self.catalogue,
            tag_spec: matched.tag_spec,
            reference_point: matched.reference_point,
            dev_mode: self.dev_mode,
        };
        if !self.validate_attributes(id, &tag, &table) {
            let promoted = self.remove(id, salvages(&matched));
            Self::push_all(stack, promoted);
            return;
        }

        if let Some(spec) = matched.tag_spec {
            if spec.unique && !self.unique_taken(spec) {
                self.unique_holders.insert(spec.index(), id);
            }
            self.specs.insert(id, spec);
        }
        if let (Some(rp), Some(parent)) = (matched.reference_point, parent_id) {
            if rp.unique && !self.role_taken(parent, &rp.role) {
                self.role_holders.insert((parent, rp.role.clone()), id);
            }
        }

        stack.push(Frame::Exit(id));
        self.push_children(id, stack);
    }

    fn root_element(&self) -> NodeId {
        dom::document_element_id(self.html).unwrap_or(self.root)
    }

    /// Whether an element still in the tree holds the unique spec.
    fn unique_taken(&self, spec: &TagSpec) -> bool {
        self.unique_holders
            .get(&spec.index())
            .is_some_and(|&holder| dom::is_within(self.html, holder, self.root))
    }

    /// Whether a child still in the tree fills the unique role under `parent`.
    fn role_taken(&self, parent: NodeId, role: &str) -> bool {
        self.role_holders
            .get(&(parent, role.to_string()))
            .is_some_and(|&holder| dom::is_within(self.html, holder, self.root))
    }

    fn structural_violation(
        &self,
        id: NodeId,
        matched: &SpecMatch<'a>,
        parent_id: Option<NodeId>,
    ) -> Option<ErrorCode> {
        if let Some(spec) = matched.tag_spec {
            if let Err(violation) = structure::check_placement(self.html, id, spec) {
                let reason = match &violation {
                    PlacementViolation::Parent { expected } => {
                        format!("parent must be <{expected}>")
                    }
                    PlacementViolation::Ancestor { expected } => {
                        format!("needs an ancestor among {expected:?}")
                    }
                    PlacementViolation::DisallowedAncestor { found } => {
                        format!("may not appear inside <{found}>")
                    }
                };
                tracing::debug!("<{}> {reason}", spec.tag_name);
                return Some(ErrorCode::InvalidElement);
            }
            if spec.unique && self.unique_taken(spec) {
                return Some(ErrorCode::DuplicateElement);
            }
        }
        if let (Some(rp), Some(parent)) = (matched.reference_point, parent_id) {
            if rp.unique && self.role_taken(parent, &rp.role) {
                return Some(ErrorCode::DuplicateElement);
            }
        }
        None
    }

    /// Validate and prune the element's attributes. Returns `false` when the
    /// element itself must go because its attribute set violates a presence
    /// constraint and the callback agreed.
    fn validate_attributes(&mut self, id: NodeId, tag: &str, table: &AttrTable<'a>) -> bool {
        let names = dom::element(self.html, id)
            .map(dom::attr_names)
            .unwrap_or_default();
        for name in names {
            let Some(el) = dom::element(self.html, id) else {
                return true;
            };
            let Some(value) = dom::attr_value(el, &name) else {
                continue;
            };
            if table.permits(&name, value) {
                continue;
            }
            self.reject_attribute(id, tag, &name);
        }

        loop {
            let present = self.present_attrs(id);
            let unmet = table
                .unmet_requirements(&present)
                .into_iter()
                .find(|name| !self.kept_attrs.contains(&(id, name.clone())));
            let Some(name) = unmet else {
                break;
            };
            self.reject_attribute(id, tag, &name);
        }

        if self.kept_nodes.contains(&id) {
            return true;
        }
        let present = self.present_attrs(id);
        let Some(violation) = table.presence_violation(&present) else {
            return true;
        };
        match &violation {
            PresenceViolation::Mandatory(name) => {
                tracing::debug!("<{tag}> is missing mandatory attribute `{name}`");
            }
            PresenceViolation::AnyOf(group) => {
                tracing::debug!("<{tag}> needs at least one attribute of group `{group}`");
            }
            PresenceViolation::OneOf(group) => {
                tracing::debug!("<{tag}> needs exactly one attribute of group `{group}`");
            }
        }
        let error = self.element_error(id, ErrorCode::InvalidAttribute);
        if self.report(error) {
            return false;
        }
        self.kept_nodes.insert(id);
        true
    }

    fn present_attrs(&self, id: NodeId) -> BTreeSet<String> {
        dom::element(self.html, id)
            .map(dom::attr_names)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    /// Report one attribute and remove it (plus its dependents) on approval.
    fn reject_attribute(&mut self, id: NodeId, tag: &str, name: &str) {
        let snapshot = dom::element(self.html, id)
            .map(dom::attributes)
            .unwrap_or_default();
        let error = ValidationError::attribute(ErrorCode::InvalidAttribute, name, tag, snapshot);
        if !self.report(error) {
            self.kept_attrs.insert((id, name.to_string()));
            return;
        }
        dom::remove_attr(self.html, id, name);
        for dependent in attribute::dependents_of(name) {
            if dom::remove_attr(self.html, id, dependent) {
                tracing::debug!("Removed `{dependent}` from <{tag}> along with `{name}`");
            }
        }
    }

    fn element_error(&self, id: NodeId, code: ErrorCode) -> ValidationError {
        let Some(el) = dom::element(self.html, id) else {
            return ValidationError::element(code, "", None, BTreeMap::new());
        };
        let name = el.name().to_string();
        let inline_script = name == "script" && dom::attr_value(el, "src").is_none();
        let error = ValidationError::element(
            code,
            name,
            Some(dom::parent_name(self.html, id)),
            dom::attributes(el),
        );
        if inline_script {
            error.with_text(dom::text_content(self.html, id))
        } else {
            error
        }
    }

    /// Child constraints, checked once the subtree has been sanitized.
    fn exit(&mut self, id: NodeId) {
        if self.removed.contains(&id) || !dom::is_within(self.html, id, self.root) {
            return;
        }
        self.check_last_children(id);
        if self.kept_nodes.contains(&id) || !dom::is_within(self.html, id, self.root) {
            return;
        }
        let Some(spec) = self.specs.get(&id).copied() else {
            return;
        };

        let bad_children = spec
            .child_tags
            .as_ref()
            .is_some_and(|rules| !structure::children_satisfy(self.html, id, rules));
        let missing = structure::missing_reference_points(self.html, id, spec);
        if !bad_children && missing.is_empty() {
            return;
        }
        if bad_children {
            tracing::debug!("<{}> has children its spec does not allow", spec.tag_name);
        }
        for rp in &missing {
            tracing::debug!("<{}> lacks a child with role `{}`", spec.tag_name, rp.role);
        }

        let error = self.element_error(id, ErrorCode::InvalidElement);
        if self.report(error) {
            self.remove(id, false);
        } else {
            self.kept_nodes.insert(id);
        }
    }

    /// Last-child rules for the children of `parent`, once all of them have
    /// been sanitized.
    fn check_last_children(&mut self, parent: NodeId) {
        for child in dom::element_children(self.html, parent) {
            let Some(spec) = self.specs.get(&child).copied() else {
                continue;
            };
            if !spec.mandatory_last_child
                || self.kept_nodes.contains(&child)
                || !structure::has_following_element(self.html, child)
            {
                continue;
            }
            tracing::debug!("<{}> must be the last child", spec.tag_name);
            let error = self.element_error(child, ErrorCode::InvalidElement);
            if self.report(error) {
                self.remove(child, false);
            } else {
                self.kept_nodes.insert(child);
            }
            if !dom::is_within(self.html, parent, self.root) {
                return;
            }
        }
    }

    /// Remove a node, promoting its children when `salvage` is set. Returns
    /// the promoted children.
    fn remove(&mut self, id: NodeId, salvage: bool) -> Vec<NodeId> {
        let parent = self
            .html
            .tree
            .get(id)
            .and_then(|node| node.parent())
            .map(|parent| parent.id());

        let promoted = if salvage {
            dom::replace_with_children(self.html, id)
        } else {
            dom::detach(self.html, id);
            Vec::new()
        };
        self.removed.insert(id);

        if self.remove_empty_parents {
            if let Some(parent) = parent {
                self.prune_empty(parent);
            }
        }
        promoted
    }

    /// Detach ancestors left with neither children nor attributes.
    fn prune_empty(&mut self, mut id: NodeId) {
        while id != self.root && dom::is_within(self.html, id, self.root) {
            let Some(node) = self.html.tree.get(id) else {
                return;
            };
            let Node::Element(el) = node.value() else {
                return;
            };
            if STRUCTURAL_TAGS.contains(&el.name()) || node.has_children() || !el.attrs.is_empty()
            {
                return;
            }
            let Some(parent) = node.parent().map(|parent| parent.id()) else {
                return;
            };
            tracing::debug!("Pruned empty <{}>", el.name());
            dom::detach(self.html, id);
            self.removed.insert(id);
            id = parent;
        }
    }

    /// Script dependencies of the final tree.
    fn scripts(&self) -> BTreeMap<String, ScriptRef> {
        let mut scripts = BTreeMap::new();
        let Some(root) = self.html.tree.get(self.root) else {
            return scripts;
        };
        for node in root.descendants() {
            let Node::Element(el) = node.value() else {
                continue;
            };
            if let Some(spec) = self.specs.get(&node.id()) {
                for component in &spec.requires_extension {
                    scripts.entry(component.clone()).or_insert_with(|| {
                        self.catalogue
                            .extension_script(component)
                            .map_or(ScriptRef::Bundled, |url| ScriptRef::Url(url.to_string()))
                    });
                }
            }
            if el.name() == "script" {
                let component = dom::attr_value(el, "custom-element")
                    .or_else(|| dom::attr_value(el, "custom-template"));
                if let (Some(component), Some(src)) = (component, dom::attr_value(el, "src")) {
                    scripts.insert(component.to_string(), ScriptRef::Url(src.to_string()));
                }
            }
        }
        scripts
    }
}

/// Whether children survive the removal of a matched element.
fn salvages(matched: &SpecMatch<'_>) -> bool {
    matched.tag_spec.is_none_or(|spec| spec.salvage_children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorType;

    fn catalogue() -> Catalogue {
        Catalogue::from_json(
            r#"{
              "global_attrs": { "id": {}, "class": {} },
              "unsalvageable_tags": ["script"],
              "unsalvageable_prefixes": ["amp-"],
              "extension_scripts": { "amp-gist": "https://cdn.ampproject.org/v0/amp-gist-0.1.js" },
              "tags": [
                { "tag_name": "p" }, { "tag_name": "em" }, { "tag_name": "div" }, { "tag_name": "span" },
                { "tag_name": "a", "attrs": {
                    "href": { "value_url": {} },
                    "target": { "value_enum": ["_blank"] }, "rel": {} } },
                { "tag_name": "area", "attrs": {
                    "href": { "value_url": {} }, "target": {}, "rel": {} } },
                { "tag_name": "form" },
                { "tag_name": "amp-slides", "mandatory_parent": "form",
                  "attrs": { "data-id": { "mandatory": true } },
                  "child_tags": { "mandatory_min_num_child_tags": 1 } },
                { "tag_name": "amp-bookend", "mandatory_last_child": true },
                { "tag_name": "amp-gist", "requires_extension": "amp-gist",
                  "attrs": { "data-gistid": { "mandatory": true } } },
                { "tag_name": "amp-fit-text", "requires_extension": "amp-fit-text" },
                { "tag_name": "amp-live-list", "requires_extension": "amp-live-list",
                  "reference_points": [ { "role": "items", "mandatory": true, "unique": true } ] }
              ]
            }"#,
        )
        .unwrap()
    }

    fn run(catalogue: &Catalogue, markup: &str) -> (String, SanitizeOutput) {
        let mut html = dom::parse_fragment(markup);
        let output = TagAndAttributeSanitizer::builder(catalogue)
            .build()
            .sanitize(&mut html);
        (dom::fragment_html(&html), output)
    }

    #[test]
    fn unknown_element_is_salvaged() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<p>a<blink>b<em>c</em></blink>d</p>");
        assert_eq!(out, "<p>ab<em>c</em>d</p>");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidElement]);
    }

    #[test]
    fn unsalvageable_element_is_dropped() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<p>a<script>alert(1)</script></p>");
        assert_eq!(out, "<p>a</p>");
        let error = &output.validation_errors[0].error;
        assert_eq!(error.error_type, ErrorType::JsError);
        assert_eq!(error.text.as_deref(), Some("alert(1)"));
    }

    #[test]
    fn callback_can_keep_violations() {
        let catalogue = catalogue();
        let mut html = dom::parse_fragment(r#"<p style="x"><blink>b</blink></p>"#);
        let output = TagAndAttributeSanitizer::builder(&catalogue)
            .validation_error_callback(|_: &ValidationError| false)
            .build()
            .sanitize(&mut html);
        assert_eq!(
            dom::fragment_html(&html),
            r#"<p style="x"><blink>b</blink></p>"#
        );
        assert_eq!(output.validation_errors.len(), 2);
        assert!(output.validation_errors.iter().all(|e| !e.sanitized));
        assert!(output.summary().is_empty());
    }

    #[test]
    fn missing_mandatory_attribute_removes_element() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<p>x</p><amp-gist></amp-gist>");
        assert_eq!(out, "<p>x</p>");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidAttribute]);
        assert!(!output.validation_errors[0].error.is_attribute_error());
    }

    #[test]
    fn empty_parents_are_pruned() {
        let catalogue = catalogue();
        let (out, _) = run(&catalogue, "<div><span><span><blink></blink></span></span></div>");
        assert_eq!(out, "");
        let (out, _) = run(
            &catalogue,
            r#"<div><span class="keep"><blink></blink></span></div>"#,
        );
        assert_eq!(out, r#"<div><span class="keep"></span></div>"#);
    }

    #[test]
    fn pruning_can_be_disabled() {
        let catalogue = catalogue();
        let mut html = dom::parse_fragment("<div><blink></blink></div>");
        TagAndAttributeSanitizer::builder(&catalogue)
            .remove_empty_parents(false)
            .build()
            .sanitize(&mut html);
        assert_eq!(dom::fragment_html(&html), "<div></div>");
    }

    #[test]
    fn scripts_come_from_kept_components() {
        let catalogue = catalogue();
        let (_, output) = run(
            &catalogue,
            r#"<amp-gist data-gistid="1" layout="x"></amp-gist><amp-fit-text>t</amp-fit-text><amp-gist></amp-gist>"#,
        );
        assert_eq!(
            output.scripts.get("amp-gist"),
            Some(&ScriptRef::Url(
                "https://cdn.ampproject.org/v0/amp-gist-0.1.js".into()
            ))
        );
        assert_eq!(output.scripts.get("amp-fit-text"), Some(&ScriptRef::Bundled));
        let json = serde_json::to_value(&output.scripts).unwrap();
        assert_eq!(json["amp-fit-text"], true);
    }

    #[test]
    fn removed_components_contribute_no_scripts() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<amp-gist></amp-gist>");
        assert_eq!(out, "");
        assert!(output.scripts.is_empty());
    }

    #[test]
    fn reference_points() {
        let catalogue = catalogue();
        let (out, output) = run(
            &catalogue,
            "<amp-live-list><div items><p>x</p></div></amp-live-list>",
        );
        assert_eq!(
            out,
            r#"<amp-live-list><div items=""><p>x</p></div></amp-live-list>"#
        );
        assert!(output.is_clean());

        let (out, output) = run(&catalogue, "<amp-live-list><div>x</div></amp-live-list>");
        assert_eq!(out, "");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidElement]);

        let (_, output) = run(
            &catalogue,
            "<amp-live-list><div items>a</div><div items>b</div></amp-live-list>",
        );
        assert_eq!(output.error_codes(), vec![ErrorCode::DuplicateElement]);
    }

    #[test]
    fn role_attribute_outside_its_parent_is_invalid() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<div items>x</div>");
        assert_eq!(out, "<div>x</div>");
        assert_eq!(output.validation_errors[0].error.node_name, "items");
    }

    #[test]
    fn processing_instructions_are_removed() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<p>a<?php echo 1; ?>b</p>");
        assert_eq!(out, "<p>ab</p>");
        let error = &output.validation_errors[0].error;
        assert_eq!(error.code, ErrorCode::InvalidProcessingInstruction);
        assert_eq!(error.node_name, "php");
        assert_eq!(error.text.as_deref(), Some("echo 1;"));
    }

    #[test]
    fn declined_element_is_reported_once() {
        let catalogue = catalogue();
        let mut html = dom::parse_fragment("<amp-slides></amp-slides>");
        let output = TagAndAttributeSanitizer::builder(&catalogue)
            .validation_error_callback(|_: &ValidationError| false)
            .build()
            .sanitize(&mut html);
        assert_eq!(dom::fragment_html(&html), "<amp-slides></amp-slides>");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidElement]);
        assert_eq!(output.validation_errors[0].error.node_name, "amp-slides");
    }

    #[test]
    fn href_dependents_are_dropped_on_any_element() {
        let catalogue = catalogue();
        let (out, output) = run(
            &catalogue,
            r#"<p>x<area href="javascript:alert(1)" target="_blank"></p>"#,
        );
        assert_eq!(out, "<p>x<area></p>");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidAttribute]);
        assert_eq!(output.validation_errors[0].error.node_name, "href");
    }

    #[test]
    fn last_child_rule_sees_sanitized_siblings() {
        let catalogue = catalogue();
        let (out, output) = run(
            &catalogue,
            "<div><amp-bookend></amp-bookend><blink></blink></div>",
        );
        assert_eq!(out, "<div><amp-bookend></amp-bookend></div>");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidElement]);
        assert_eq!(output.validation_errors[0].error.node_name, "blink");

        let (out, output) = run(&catalogue, "<div><amp-bookend></amp-bookend><p>x</p></div>");
        assert_eq!(out, "<div><p>x</p></div>");
        assert_eq!(output.validation_errors[0].error.node_name, "amp-bookend");
        assert_eq!(output.validation_errors[0].error.parent_name.as_deref(), Some("div"));
    }

    #[test]
    fn last_child_rule_applies_at_the_top_level() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<amp-bookend></amp-bookend><p>x</p>");
        assert_eq!(out, "<p>x</p>");
        assert_eq!(output.error_codes(), vec![ErrorCode::InvalidElement]);
    }

    #[test]
    fn comments_are_kept() {
        let catalogue = catalogue();
        let (out, output) = run(&catalogue, "<p>a<!-- note -->b</p>");
        assert_eq!(out, "<p>a<!-- note -->b</p>");
        assert!(output.is_clean());
    }
}
