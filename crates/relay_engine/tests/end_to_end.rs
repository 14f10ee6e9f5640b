//! Controller and bridge talking over a real localhost WebSocket.
mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::init_logging;
use pretty_assertions::assert_eq;
use relay_core::{DispatchLimits, RequestId, TrackerSettings, Wildcards};
use relay_engine::{
    parse_selector, ConnectionManager, ConnectionSettings, Controller, ControllerSettings,
    JobDispatcher, StatusEmitter, SubmissionDriver, SubmitError, TrackerContext, VisualPage,
    VisualTreeObserver, WebSocketConnector,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Renders each submitted job into the feed, already finished.
struct RenderingDriver {
    page: VisualPage,
    submitted: Mutex<Vec<(RequestId, String)>>,
}

#[async_trait::async_trait]
impl SubmissionDriver for RenderingDriver {
    async fn submit(&self, id: &RequestId, text: &str) -> Result<(), SubmitError> {
        let feed = self
            .page
            .select("#feed")
            .map_err(|err| SubmitError::InputUnavailable(err.to_string()))?
            .ok_or_else(|| SubmitError::InputUnavailable("#feed".to_string()))?;
        self.page
            .set_inner_html(
                feed,
                &format!(r#"<div class="job">{text} <span>100% Complete</span></div>"#),
            )
            .map_err(|err| SubmitError::InputUnavailable(err.to_string()))?;
        self.submitted
            .lock()
            .unwrap()
            .push((id.clone(), text.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn controller_sends_until_cap_and_sees_every_prompt_complete() {
    init_logging();
    let cancel = CancellationToken::new();

    let mut wildcards = Wildcards::new();
    wildcards.insert("COLOR", "red\n");
    let settings = ControllerSettings {
        template: "a [COLOR] fox".to_string(),
        recursion_depth: 5,
        send_delay: Duration::from_millis(50),
        gate_poll: Duration::from_millis(20),
        limits: DispatchLimits {
            max_concurrent: 1,
            stop_after: Some(2),
        },
    };
    let controller = Controller::bind("127.0.0.1:0", settings, wildcards)
        .await
        .unwrap();
    let addr = controller.local_addr().unwrap();
    let ledger = controller.ledger();
    let controller_task = tokio::spawn(controller.run(cancel.clone()));

    let page = VisualPage::from_html(r#"<html><body><div id="feed"></div></body></html>"#);
    let observer = VisualTreeObserver::new(page.clone(), parse_selector("#feed").unwrap());
    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
    let (connection, manager_task) = ConnectionManager::spawn(
        Arc::new(WebSocketConnector::new(format!("ws://{addr}"))),
        ConnectionSettings {
            reconnect_delay: Duration::from_millis(100),
        },
        jobs_tx,
        cancel.clone(),
    );
    let emitter = Arc::new(StatusEmitter::new(connection));
    let trackers = TrackerContext::new(
        observer,
        emitter.clone(),
        TrackerSettings {
            scan_interval: Duration::from_millis(20),
            silence_timeout: Duration::from_secs(60),
        },
    );
    let driver = Arc::new(RenderingDriver {
        page: page.clone(),
        submitted: Mutex::new(Vec::new()),
    });
    tokio::spawn(JobDispatcher::new(driver.clone(), emitter, trackers).run(jobs_rx));

    let sent = tokio::time::timeout(Duration::from_secs(10), controller_task)
        .await
        .expect("controller finished in time")
        .unwrap();

    assert_eq!(sent, 2);
    let submitted = driver.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 2);
    for (id, text) in &submitted {
        assert_eq!(text, "a red fox");
        assert_eq!(ledger.lock().status_of(id), Some("progress_complete"));
    }
    assert_ne!(submitted[0].0, submitted[1].0);
    assert_eq!(ledger.lock().in_flight(), 0);

    cancel.cancel();
    manager_task.await.unwrap();
}
