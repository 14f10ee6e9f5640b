//! In-memory visual tree of the target page.
//!
//! HTML is parsed with `scraper` and copied into a plain `ego_tree::Tree`
//! that the host side can mutate while trackers observe it. Handles stay
//! valid until their node is detached or the whole document is replaced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::node::Node;
use scraper::{Html, Selector};
use tokio::sync::mpsc;

/// Elements whose text never shows up in the rendered page.
const NON_RENDERED: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Marker written onto every element of the serialized copy used for selector matching.
const NODE_MARKER: &str = "data-relay-node";

/// Parses a CSS selector with `scraper`'s selector engine.
pub fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|err| PageError::InvalidSelector {
        selector: selector.to_string(),
        reason: err.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualNode {
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

impl VisualNode {
    fn element_name(&self) -> Option<&str> {
        match self {
            VisualNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        match self {
            VisualNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// Stable reference to a node of one document generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    generation: u64,
    id: NodeId,
}

/// Notification delivered to a subscriber of a node's subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChange {
    /// Structure or text somewhere inside the subtree changed.
    Changed,
    /// The node left the document; no further notifications follow.
    Detached,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    #[error("node belongs to a replaced document")]
    StaleHandle,
    #[error("node is no longer attached to the document")]
    Detached,
    #[error("node is not an element")]
    NotAnElement,
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

struct Watcher {
    node: NodeId,
    tx: mpsc::UnboundedSender<NodeChange>,
}

/// The document plus its subscribers. Reached through [`VisualPage::with_document`].
pub struct PageDocument {
    generation: u64,
    tree: Tree<VisualNode>,
    watchers: Vec<Watcher>,
}

impl PageDocument {
    fn new(html: &str) -> Self {
        Self {
            generation: 0,
            tree: parse_document(html),
            watchers: Vec::new(),
        }
    }

    /// First element in document order matching `selector`.
    ///
    /// The tree is serialized with a node marker on every element and
    /// matched by `scraper`, whose `Html` is not kept around because its
    /// string storage cannot cross threads.
    pub fn query(&self, selector: &Selector) -> Option<NodeHandle> {
        let mut nodes = Vec::new();
        let mut markup = String::from("<!DOCTYPE html>");
        for child in self.tree.root().children() {
            write_markup(child, &mut markup, &mut nodes);
        }
        let parsed = Html::parse_document(&markup);
        let index = parsed
            .select(selector)
            .find_map(|element| element.value().attr(NODE_MARKER)?.parse::<usize>().ok())?;
        nodes.get(index).map(|id| self.handle(*id))
    }

    pub fn is_attached(&self, handle: NodeHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Concatenated rendered text of the node's subtree, `None` once detached.
    pub fn text_of(&self, handle: NodeHandle) -> Option<String> {
        let id = self.resolve(handle).ok()?;
        let node = self.tree.get(id)?;
        let mut out = String::new();
        collect_text(node, &mut out);
        Some(out)
    }

    pub fn attr(&self, handle: NodeHandle, name: &str) -> Option<String> {
        let id = self.resolve(handle).ok()?;
        self.tree.get(id)?.value().attr(name).map(ToOwned::to_owned)
    }

    /// Attribute writes are not content changes and notify nobody.
    pub fn set_attr(&mut self, handle: NodeHandle, name: &str, value: &str) -> Result<(), PageError> {
        let id = self.resolve(handle)?;
        let mut node = self.tree.get_mut(id).ok_or(PageError::Detached)?;
        match node.value() {
            VisualNode::Element { attrs, .. } => {
                match attrs.iter_mut().find(|(key, _)| key == name) {
                    Some((_, existing)) => *existing = value.to_string(),
                    None => attrs.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(PageError::NotAnElement),
        }
    }

    /// First descendant element of `container` carrying `name=value`.
    pub fn find_by_attr(&self, container: NodeHandle, name: &str, value: &str) -> Option<NodeHandle> {
        let id = self.resolve(container).ok()?;
        self.tree
            .get(id)?
            .descendants()
            .skip(1)
            .find(|node| node.value().attr(name) == Some(value))
            .map(|node| self.handle(node.id()))
    }

    /// Innermost descendant element of `container` whose rendered text
    /// contains `needle` ignoring case.
    ///
    /// Innermost means no element child also contains the text. Elements
    /// whose `claim` attribute names an owner other than `owner` are skipped,
    /// so a node pinned to one request is never handed to another.
    pub fn find_containing(
        &self,
        container: NodeHandle,
        needle: &str,
        claim: &str,
        owner: &str,
    ) -> Option<NodeHandle> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let id = self.resolve(container).ok()?;
        let root = self.tree.get(id)?;
        if !contains_text(root, &needle) {
            return None;
        }

        root.descendants()
            .skip(1)
            .filter(|node| is_rendered_element(node.value()))
            .filter(|node| node.value().attr(claim).is_none_or(|tag| tag == owner))
            .filter(|node| contains_text(*node, &needle))
            .find(|node| {
                !node
                    .children()
                    .filter(|child| is_rendered_element(child.value()))
                    .any(|child| contains_text(child, &needle))
            })
            .map(|node| self.handle(node.id()))
    }

    pub fn watch(&mut self, handle: NodeHandle) -> Result<mpsc::UnboundedReceiver<NodeChange>, PageError> {
        let id = self.resolve(handle)?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.push(Watcher { node: id, tx });
        Ok(rx)
    }

    fn replace(&mut self, html: &str) {
        self.generation += 1;
        self.tree = parse_document(html);
        for watcher in self.watchers.drain(..) {
            let _ = watcher.tx.send(NodeChange::Detached);
        }
    }

    /// Reconciles the tree with a fresh parse of `html` in place.
    ///
    /// Nodes that line up with a node of the new document keep their
    /// identity, so handles and watchers survive. Attributes named in `keep`
    /// stay on a node when the new document does not set them. Returns
    /// whether any text or structure changed.
    fn patch(&mut self, html: &str, keep: &[&str]) -> bool {
        let fresh = parse_document(html);
        let mut changed = Vec::new();
        let root = self.tree.root().id();
        self.patch_children(root, fresh.root(), keep, &mut changed);
        self.notify(&changed);
        !changed.is_empty()
    }

    fn patch_children(
        &mut self,
        parent: NodeId,
        source: NodeRef<'_, VisualNode>,
        keep: &[&str],
        changed: &mut Vec<NodeId>,
    ) {
        let (old, old_shapes): (Vec<NodeId>, Vec<Shape>) = match self.tree.get(parent) {
            Some(node) => node.children().map(|child| (child.id(), Shape::of(child))).unzip(),
            None => return,
        };
        let fresh: Vec<NodeRef<'_, VisualNode>> = source.children().collect();
        let fresh_shapes: Vec<Shape> = fresh.iter().map(|node| Shape::of(*node)).collect();

        let mut cursor: Option<NodeId> = None;
        for step in align(&old_shapes, &fresh_shapes) {
            match step {
                Step::Keep(from, to) => {
                    self.patch_node(old[from], fresh[to], keep, changed);
                    cursor = Some(old[from]);
                }
                Step::Drop(from) => {
                    if let Some(mut node) = self.tree.get_mut(old[from]) {
                        node.detach();
                    }
                    changed.push(parent);
                }
                Step::Insert(to) => {
                    let value = fresh[to].value().clone();
                    let inserted = match cursor {
                        Some(after) => self
                            .tree
                            .get_mut(after)
                            .map(|mut node| node.insert_after(value).id()),
                        None => self
                            .tree
                            .get_mut(parent)
                            .map(|mut node| node.prepend(value).id()),
                    };
                    let Some(inserted) = inserted else { return };
                    copy_subtree(&mut self.tree, inserted, fresh[to]);
                    cursor = Some(inserted);
                    changed.push(parent);
                }
            }
        }
    }

    fn patch_node(
        &mut self,
        id: NodeId,
        source: NodeRef<'_, VisualNode>,
        keep: &[&str],
        changed: &mut Vec<NodeId>,
    ) {
        let Some(mut node) = self.tree.get_mut(id) else {
            return;
        };
        match (node.value(), source.value()) {
            (VisualNode::Text(current), VisualNode::Text(fresh)) => {
                if *current != *fresh {
                    *current = fresh.clone();
                    changed.push(id);
                }
                return;
            }
            (VisualNode::Element { attrs, .. }, VisualNode::Element { attrs: fresh, .. }) => {
                let kept: Vec<(String, String)> = attrs
                    .iter()
                    .filter(|(name, _)| keep.contains(&name.as_str()))
                    .filter(|(name, _)| !fresh.iter().any(|(fresh_name, _)| fresh_name == name))
                    .cloned()
                    .collect();
                *attrs = fresh.iter().cloned().chain(kept).collect();
            }
            _ => {}
        }
        self.patch_children(id, source, keep, changed);
    }

    fn set_inner_html(&mut self, handle: NodeHandle, html: &str) -> Result<Vec<NodeHandle>, PageError> {
        let id = self.resolve(handle)?;
        self.detach_children(id);
        let appended = append_fragment(&mut self.tree, id, html);
        self.notify(&[id]);
        Ok(appended.into_iter().map(|id| self.handle(id)).collect())
    }

    fn set_text(&mut self, handle: NodeHandle, text: &str) -> Result<(), PageError> {
        let id = self.resolve(handle)?;
        self.detach_children(id);
        if let Some(mut node) = self.tree.get_mut(id) {
            node.append(VisualNode::Text(text.to_string()));
        }
        self.notify(&[id]);
        Ok(())
    }

    fn append_html(&mut self, parent: NodeHandle, html: &str) -> Result<Vec<NodeHandle>, PageError> {
        let id = self.resolve(parent)?;
        let appended = append_fragment(&mut self.tree, id, html);
        self.notify(&[id]);
        Ok(appended.into_iter().map(|id| self.handle(id)).collect())
    }

    fn remove(&mut self, handle: NodeHandle) -> Result<(), PageError> {
        let id = self.resolve(handle)?;
        if id == self.tree.root().id() {
            return Err(PageError::NotAnElement);
        }
        let parent = self.tree.get(id).and_then(|node| node.parent()).map(|p| p.id());
        if let Some(mut node) = self.tree.get_mut(id) {
            node.detach();
        }
        self.notify(parent.as_slice());
        Ok(())
    }

    fn detach_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.tree.get(id) {
            Some(node) => node.children().map(|child| child.id()).collect(),
            None => return,
        };
        for child in children {
            if let Some(mut node) = self.tree.get_mut(child) {
                node.detach();
            }
        }
    }

    /// Tells watchers about changes at `changed_at` and drops the ones
    /// whose node is gone. Each watcher hears at most one `Changed`.
    fn notify(&mut self, changed_at: &[NodeId]) {
        let tree = &self.tree;
        self.watchers.retain(|watcher| {
            if !is_attached(tree, watcher.node) {
                let _ = watcher.tx.send(NodeChange::Detached);
                return false;
            }
            if changed_at
                .iter()
                .any(|at| is_self_or_ancestor(tree, watcher.node, *at))
            {
                watcher.tx.send(NodeChange::Changed).is_ok()
            } else {
                !watcher.tx.is_closed()
            }
        });
    }

    fn handle(&self, id: NodeId) -> NodeHandle {
        NodeHandle {
            generation: self.generation,
            id,
        }
    }

    fn resolve(&self, handle: NodeHandle) -> Result<NodeId, PageError> {
        if handle.generation != self.generation {
            return Err(PageError::StaleHandle);
        }
        if is_attached(&self.tree, handle.id) {
            Ok(handle.id)
        } else {
            Err(PageError::Detached)
        }
    }
}

/// Shared handle to the page. Cloning is cheap; all clones see the same document.
#[derive(Clone)]
pub struct VisualPage {
    inner: Arc<Mutex<PageDocument>>,
}

impl VisualPage {
    pub fn from_html(html: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PageDocument::new(html))),
        }
    }

    pub fn empty() -> Self {
        Self::from_html("<html><body></body></html>")
    }

    /// Runs `f` with the document locked, so multi-step reads and writes are atomic.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut PageDocument) -> R) -> R {
        f(&mut self.lock())
    }

    /// Swaps in a new document. Every existing handle goes stale and every
    /// watcher receives [`NodeChange::Detached`].
    pub fn replace_document(&self, html: &str) {
        self.lock().replace(html);
    }

    /// Patches the current document towards `html` without replacing it.
    ///
    /// Unlike [`VisualPage::replace_document`], nodes that still line up keep
    /// their handles, watchers and the attributes named in `keep`; watchers
    /// under changed text or structure receive [`NodeChange::Changed`].
    pub fn patch_document(&self, html: &str, keep: &[&str]) -> bool {
        self.lock().patch(html, keep)
    }

    pub fn query(&self, selector: &Selector) -> Option<NodeHandle> {
        self.lock().query(selector)
    }

    pub fn select(&self, selector: &str) -> Result<Option<NodeHandle>, PageError> {
        let selector = parse_selector(selector)?;
        Ok(self.query(&selector))
    }

    pub fn is_attached(&self, handle: NodeHandle) -> bool {
        self.lock().is_attached(handle)
    }

    pub fn text_of(&self, handle: NodeHandle) -> Option<String> {
        self.lock().text_of(handle)
    }

    pub fn attr(&self, handle: NodeHandle, name: &str) -> Option<String> {
        self.lock().attr(handle, name)
    }

    pub fn set_attr(&self, handle: NodeHandle, name: &str, value: &str) -> Result<(), PageError> {
        self.lock().set_attr(handle, name, value)
    }

    pub fn set_inner_html(&self, handle: NodeHandle, html: &str) -> Result<Vec<NodeHandle>, PageError> {
        self.lock().set_inner_html(handle, html)
    }

    pub fn set_text(&self, handle: NodeHandle, text: &str) -> Result<(), PageError> {
        self.lock().set_text(handle, text)
    }

    pub fn append_html(&self, parent: NodeHandle, html: &str) -> Result<Vec<NodeHandle>, PageError> {
        self.lock().append_html(parent, html)
    }

    pub fn remove(&self, handle: NodeHandle) -> Result<(), PageError> {
        self.lock().remove(handle)
    }

    pub fn watch(&self, handle: NodeHandle) -> Result<mpsc::UnboundedReceiver<NodeChange>, PageError> {
        self.lock().watch(handle)
    }

    fn lock(&self) -> MutexGuard<'_, PageDocument> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_document(html: &str) -> Tree<VisualNode> {
    let parsed = Html::parse_document(html);
    let mut tree = Tree::new(VisualNode::Document);
    let root = tree.root().id();
    copy_children(&mut tree, root, parsed.tree.root());
    tree
}

/// Parses `html` as a fragment and appends its top-level nodes under `parent`.
fn append_fragment(tree: &mut Tree<VisualNode>, parent: NodeId, html: &str) -> Vec<NodeId> {
    let parsed = Html::parse_fragment(html);
    // The fragment parser wraps everything in a synthetic <html> element.
    copy_children(tree, parent, *parsed.root_element())
}

fn copy_children(tree: &mut Tree<VisualNode>, parent: NodeId, source: NodeRef<'_, Node>) -> Vec<NodeId> {
    let mut appended = Vec::new();
    for child in source.children() {
        let value = match child.value() {
            Node::Element(element) => VisualNode::Element {
                name: element.name().to_ascii_lowercase(),
                attrs: element
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            },
            Node::Text(text) => {
                let content: &str = text;
                VisualNode::Text(content.to_string())
            }
            _ => continue,
        };
        let Some(mut target) = tree.get_mut(parent) else {
            break;
        };
        let id = target.append(value).id();
        copy_children(tree, id, child);
        appended.push(id);
    }
    appended
}

fn copy_subtree(tree: &mut Tree<VisualNode>, parent: NodeId, source: NodeRef<'_, VisualNode>) {
    for child in source.children() {
        let Some(mut target) = tree.get_mut(parent) else {
            return;
        };
        let id = target.append(child.value().clone()).id();
        copy_subtree(tree, id, child);
    }
}

/// Serializes `node` as HTML, marking each element with its index in `nodes`.
fn write_markup(node: NodeRef<'_, VisualNode>, out: &mut String, nodes: &mut Vec<NodeId>) {
    match node.value() {
        VisualNode::Document => {}
        VisualNode::Text(text) => escape_into(out, text, false),
        VisualNode::Element { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs.iter().filter(|(key, _)| key != NODE_MARKER) {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(out, value, true);
                out.push('"');
            }
            out.push_str(&format!(" {}=\"{}\">", NODE_MARKER, nodes.len()));
            nodes.push(node.id());
            if VOID_ELEMENTS.contains(&name.as_str()) {
                return;
            }
            for child in node.children() {
                write_markup(child, out, nodes);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn escape_into(out: &mut String, raw: &str, in_attribute: bool) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '<' if !in_attribute => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Case-insensitive containment; `needle` is already lowercase.
fn contains_text(node: NodeRef<'_, VisualNode>, needle: &str) -> bool {
    let mut text = String::new();
    collect_text(node, &mut text);
    text.to_lowercase().contains(needle)
}

/// What a node looks like for lining up old and new children.
struct Shape {
    /// Element name and `id` attribute; `None` for text.
    element: Option<(String, Option<String>)>,
    text: Vec<char>,
}

impl Shape {
    fn of(node: NodeRef<'_, VisualNode>) -> Self {
        let element = match node.value() {
            VisualNode::Element { name, .. } => {
                Some((name.clone(), node.value().attr("id").map(ToOwned::to_owned)))
            }
            _ => None,
        };
        let mut text = String::new();
        collect_text(node, &mut text);
        Self {
            element,
            text: text.chars().collect(),
        }
    }

    /// `None` when the two cannot stand for each other. Otherwise higher
    /// means more of the rendered text is shared at either end.
    fn score(&self, other: &Shape) -> Option<u64> {
        if self.element != other.element {
            return None;
        }
        let prefix = self
            .text
            .iter()
            .zip(&other.text)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = self
            .text
            .iter()
            .rev()
            .zip(other.text.iter().rev())
            .take_while(|(a, b)| a == b)
            .count();
        let shared = (prefix + suffix).min(self.text.len().min(other.text.len()));
        Some(1 + shared as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep(usize, usize),
    Drop(usize),
    Insert(usize),
}

/// Order-preserving alignment of two child lists with the highest total score.
fn align(old: &[Shape], fresh: &[Shape]) -> Vec<Step> {
    let (rows, cols) = (old.len(), fresh.len());
    // best[i][j]: best score for aligning old[i..] with fresh[j..].
    let mut best = vec![vec![0u64; cols + 1]; rows + 1];
    for i in (0..rows).rev() {
        for j in (0..cols).rev() {
            let paired = old[i]
                .score(&fresh[j])
                .map_or(0, |score| score + best[i + 1][j + 1]);
            best[i][j] = paired.max(best[i + 1][j]).max(best[i][j + 1]);
        }
    }

    let mut steps = Vec::with_capacity(rows.max(cols));
    let (mut i, mut j) = (0, 0);
    while i < rows && j < cols {
        match old[i].score(&fresh[j]) {
            Some(score) if best[i][j] == score + best[i + 1][j + 1] => {
                steps.push(Step::Keep(i, j));
                i += 1;
                j += 1;
            }
            _ if best[i][j] == best[i + 1][j] => {
                steps.push(Step::Drop(i));
                i += 1;
            }
            _ => {
                steps.push(Step::Insert(j));
                j += 1;
            }
        }
    }
    steps.extend((i..rows).map(Step::Drop));
    steps.extend((j..cols).map(Step::Insert));
    steps
}

fn collect_text(node: NodeRef<'_, VisualNode>, out: &mut String) {
    match node.value() {
        VisualNode::Text(text) => out.push_str(text),
        VisualNode::Element { name, .. } if NON_RENDERED.contains(&name.as_str()) => {}
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

fn is_rendered_element(node: &VisualNode) -> bool {
    node.element_name()
        .is_some_and(|name| !NON_RENDERED.contains(&name))
}

fn is_attached(tree: &Tree<VisualNode>, id: NodeId) -> bool {
    let root = tree.root().id();
    match tree.get(id) {
        Some(node) => id == root || node.ancestors().any(|ancestor| ancestor.id() == root),
        None => false,
    }
}

fn is_self_or_ancestor(tree: &Tree<VisualNode>, candidate: NodeId, of: NodeId) -> bool {
    candidate == of
        || tree
            .get(of)
            .is_some_and(|node| node.ancestors().any(|ancestor| ancestor.id() == candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(element: Option<&str>, text: &str) -> Shape {
        Shape {
            element: element.map(|name| (name.to_string(), None)),
            text: text.chars().collect(),
        }
    }

    #[test]
    fn rejects_malformed_selectors() {
        for selector in ["div[", "#", "", "main >"] {
            assert!(
                matches!(parse_selector(selector), Err(PageError::InvalidSelector { .. })),
                "{selector:?} should be rejected"
            );
        }
        assert!(parse_selector("main > div.jobs:first-child").is_ok());
    }

    #[test]
    fn markup_escapes_text_and_attributes() {
        let mut tree = Tree::new(VisualNode::Document);
        let mut root = tree.root_mut();
        let mut div = root.append(VisualNode::Element {
            name: "div".to_string(),
            attrs: vec![
                ("title".to_string(), "say \"hi\" & bye".to_string()),
                (NODE_MARKER.to_string(), "99".to_string()),
            ],
        });
        div.append(VisualNode::Text("1 < 2 & 3".to_string()));
        div.append(VisualNode::Element {
            name: "br".to_string(),
            attrs: Vec::new(),
        });

        let mut out = String::new();
        let mut nodes = Vec::new();
        for child in tree.root().children() {
            write_markup(child, &mut out, &mut nodes);
        }

        assert_eq!(
            out,
            r#"<div title="say &quot;hi&quot; &amp; bye" data-relay-node="0">1 &lt; 2 &amp; 3<br data-relay-node="1"></div>"#
        );
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn alignment_follows_shared_text_when_a_sibling_is_prepended() {
        let old = [
            shape(Some("div"), "a red fox 45% Complete"),
            shape(Some("div"), "a blue whale 10% Complete"),
        ];
        let fresh = [
            shape(Some("div"), "a grey owl 0% Complete"),
            shape(Some("div"), "a red fox 50% Complete"),
            shape(Some("div"), "a blue whale 10% Complete"),
        ];

        assert_eq!(
            align(&old, &fresh),
            vec![Step::Insert(0), Step::Keep(0, 1), Step::Keep(1, 2)]
        );
    }

    #[test]
    fn alignment_never_pairs_different_elements() {
        let old = [shape(Some("p"), "a red fox"), shape(None, "tail")];
        let fresh = [shape(Some("span"), "a red fox"), shape(None, "tail")];

        assert_eq!(
            align(&old, &fresh),
            vec![Step::Drop(0), Step::Insert(0), Step::Keep(1, 1)]
        );
    }
}
