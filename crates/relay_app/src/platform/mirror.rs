use std::io;
use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use relay_engine::{VisualPage, TAG_ATTRIBUTE};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Keeps the in-memory page in sync with an HTML snapshot on disk.
///
/// A changed snapshot is patched into the existing document. Nodes that
/// survive keep their request tags and watchers, so bound trackers see
/// `Changed` instead of losing their node on every reload.
pub struct PageMirror {
    path: PathBuf,
    page: VisualPage,
    poll: Duration,
    last: Option<String>,
}

impl PageMirror {
    pub fn new(path: PathBuf, page: VisualPage, poll: Duration) -> Self {
        Self {
            path,
            page,
            poll,
            last: None,
        }
    }

    /// Reads the snapshot once; returns `true` when the page text or structure changed.
    ///
    /// A missing snapshot leaves the page untouched.
    pub async fn refresh(&mut self) -> io::Result<bool> {
        let html = match tokio::fs::read_to_string(&self.path).await {
            Ok(html) => html,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if self.last.as_deref() == Some(html.as_str()) {
            return Ok(false);
        }
        let changed = self.page.patch_document(&html, &[TAG_ATTRIBUTE]);
        engine_debug!("Page snapshot {:?} reloaded ({} bytes)", self.path, html.len());
        self.last = Some(html);
        Ok(changed)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        engine_info!("Mirroring page snapshot {:?} every {:?}", self.path, self.poll);
        let mut ticker = time::interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        engine_warn!("Failed to read page snapshot {:?}: {}", self.path, err);
                    }
                }
                _ = cancel.cancelled() => return,
            }
        }
    }
}
