use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::{engine_error, engine_info};
use relay_engine::{
    load_wildcard_dir, wait_for_element, ConnectionManager, Controller, JobDispatcher, Selector,
    StatusEmitter, TrackerContext, VisualPage, VisualTreeObserver, WebSocketConnector,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::{BridgeConfig, ControllerConfig};
use super::mirror::PageMirror;
use super::outbox::OutboxSubmitter;

/// Cancels `cancel` on Ctrl-C.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => engine_info!("Shutdown requested"),
            Err(err) => engine_error!("Failed to listen for Ctrl-C: {}", err),
        }
        cancel.cancel();
    });
}

/// Waits for `selector`; returns `false` if shutdown came first.
async fn wait_or_cancel(
    page: &VisualPage,
    selector: &Selector,
    poll: Duration,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = wait_for_element(page, selector, poll) => true,
        _ = cancel.cancelled() => false,
    }
}

pub async fn run_bridge(config: BridgeConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let input = config.input_query()?;
    let container = config.container_query()?;
    let page = VisualPage::empty();

    let mut mirror = PageMirror::new(config.page_mirror.clone(), page.clone(), config.mirror_poll());
    mirror
        .refresh()
        .await
        .with_context(|| format!("reading page snapshot {:?}", config.page_mirror))?;
    tokio::spawn(mirror.run(cancel.clone()));

    let poll = config.mirror_poll();
    engine_info!("Waiting for input element {:?}", config.input_selector);
    if !wait_or_cancel(&page, &input, poll, &cancel).await {
        return Ok(());
    }
    engine_info!("Waiting for job container {:?}", config.container_selector);
    if !wait_or_cancel(&page, &container, poll, &cancel).await {
        return Ok(());
    }

    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
    let (connection, manager_task) = ConnectionManager::spawn(
        Arc::new(WebSocketConnector::new(config.endpoint.clone())),
        config.connection_settings(),
        jobs_tx,
        cancel.clone(),
    );

    let emitter = Arc::new(StatusEmitter::new(connection));
    let observer = VisualTreeObserver::new(page.clone(), container);
    let trackers = TrackerContext::new(observer, emitter.clone(), config.tracker_settings());
    let driver = Arc::new(OutboxSubmitter::new(
        config.submission_outbox.clone(),
        page,
        input,
        config.input_selector.clone(),
    ));
    let dispatcher = tokio::spawn(JobDispatcher::new(driver, emitter, trackers).run(jobs_rx));

    manager_task.await.context("connection manager task failed")?;
    dispatcher.await.context("job dispatcher task failed")?;
    engine_info!("Bridge stopped");
    Ok(())
}

pub async fn run_controller(config: ControllerConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let wildcards = load_wildcard_dir(&config.wildcard_dir)
        .with_context(|| format!("loading wildcards from {:?}", config.wildcard_dir))?;
    let controller = Controller::bind(&config.bind_addr, config.controller_settings()?, wildcards)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    let sent = controller.run(cancel).await;
    engine_info!("Controller stopped after sending {} prompt(s)", sent);
    Ok(())
}
