//! Waits for page elements that the bridge needs before it connects.

use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tokio::time::{self, MissedTickBehavior};

use scraper::Selector;

use crate::page::{NodeHandle, VisualPage};

/// Polls `page` until `selector` matches an attached node.
///
/// The first check happens immediately. There is no timeout; callers that
/// need one wrap this in `tokio::time::timeout` or race it against shutdown.
pub async fn wait_for_element(page: &VisualPage, selector: &Selector, poll: Duration) -> NodeHandle {
    let mut ticker = time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls: u64 = 0;
    loop {
        ticker.tick().await;
        if let Some(node) = page.query(selector) {
            engine_info!("Element available after {} poll(s)", polls + 1);
            return node;
        }
        polls += 1;
        if polls % 10 == 0 {
            engine_debug!("Still waiting for element after {} poll(s)", polls);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::parse_selector;

    #[tokio::test(start_paused = true)]
    async fn resolves_immediately_when_present() {
        let page = VisualPage::from_html(r#"<div id="desktop_input_bar"></div>"#);
        let selector = parse_selector("body > #desktop_input_bar").unwrap();
        let started = time::Instant::now();
        let node = wait_for_element(&page, &selector, Duration::from_millis(100)).await;
        assert!(page.is_attached(node));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_the_poll_after_insertion() {
        let page = VisualPage::from_html("<main></main>");
        let selector = parse_selector("main textarea#desktop_input_bar").unwrap();
        let writer = page.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(250)).await;
            let main = writer.select("main").unwrap().unwrap();
            writer
                .append_html(main, r#"<textarea id="desktop_input_bar"></textarea>"#)
                .unwrap();
        });
        let started = time::Instant::now();
        wait_for_element(&page, &selector, Duration::from_millis(100)).await;
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }
}
