use engine_logging::engine_debug;
use relay_core::RequestId;
use tokio::sync::mpsc;

use scraper::Selector;

use crate::page::{NodeChange, NodeHandle, PageError, VisualPage};

/// Attribute pinning a node to the request it was first matched for.
pub const TAG_ATTRIBUTE: &str = "data-prompt-id";

/// A node located by a discovery scan, already subscribed for changes.
#[derive(Debug)]
pub struct Discovered {
    pub node: NodeHandle,
    pub text: String,
    /// `true` when found through the tag rather than a fresh text match.
    pub via_tag: bool,
    pub changes: mpsc::UnboundedReceiver<NodeChange>,
}

/// Finds and watches the node that renders a request inside the container.
///
/// The container is re-resolved on every scan so a replaced document is
/// picked up without restarting trackers.
#[derive(Clone)]
pub struct VisualTreeObserver {
    page: VisualPage,
    container: Selector,
}

impl VisualTreeObserver {
    pub fn new(page: VisualPage, container: Selector) -> Self {
        Self { page, container }
    }

    pub fn page(&self) -> &VisualPage {
        &self.page
    }

    /// Tagged lookup first, then a case-insensitive text match that gets tagged.
    /// The text match takes the innermost element and never one tagged for
    /// another request. Lookup, tagging, reading and subscribing happen
    /// under one lock.
    pub fn discover(&self, id: &RequestId, text: &str) -> Option<Discovered> {
        self.page.with_document(|doc| {
            let container = doc.query(&self.container)?;
            let (node, via_tag) = match doc.find_by_attr(container, TAG_ATTRIBUTE, id.as_str()) {
                Some(node) => (node, true),
                None => {
                    let node = doc.find_containing(container, text, TAG_ATTRIBUTE, id.as_str())?;
                    if let Err(err) = doc.set_attr(node, TAG_ATTRIBUTE, id.as_str()) {
                        engine_debug!("[{}] could not tag matched node: {}", id, err);
                    }
                    (node, false)
                }
            };
            let rendered = doc.text_of(node)?;
            let changes = doc.watch(node).ok()?;
            Some(Discovered {
                node,
                text: rendered,
                via_tag,
                changes,
            })
        })
    }

    pub fn watch(&self, node: NodeHandle) -> Result<mpsc::UnboundedReceiver<NodeChange>, PageError> {
        self.page.watch(node)
    }

    /// Current rendered text of a bound node; `None` once it is gone.
    pub fn read(&self, node: NodeHandle) -> Option<String> {
        self.page.text_of(node)
    }
}
