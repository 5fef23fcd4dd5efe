// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment exposure controller: event handlers, work queue, and worker loops.

pub mod expose;
pub mod handlers;
pub mod worker;

pub use expose::Exposer;
pub use handlers::EventHandlers;
pub use worker::{Outcome, Worker};

use crate::config::Config;
use crate::constants::{worker::RESTART_DELAY, OPERATOR_NAME};
use crate::kubernetes::{ChangeFeed, ClusterApi, KubeClusterApi};
use crate::queue::WorkQueue;
use anyhow::bail;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use kube_runtime::reflector::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Controller {
    client: Client,
    api: Arc<dyn ClusterApi>,
    config: Config,
}

impl Controller {
    pub fn new(client: Client, config: Config) -> Self {
        let api = Arc::new(KubeClusterApi::new(client.clone()));
        Self {
            client,
            api,
            config,
        }
    }

    /// Watch Deployments and expose them until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!("Starting controller: {}", OPERATOR_NAME);

        let queue = WorkQueue::new();
        let handlers = EventHandlers::new(queue.clone());
        let feed = ChangeFeed::new(self.client.clone(), self.config.watch_namespace.as_deref());
        let (cache, feed_task) = feed.start(move |event| handlers.handle(event), shutdown.clone());

        match wait_for_cache_sync(&cache, &shutdown).await {
            CacheSync::Synced => info!("Deployment cache synced with {} objects", cache.state().len()),
            CacheSync::Failed(e) => error!("Failed to sync Deployment cache, continuing: {}", e),
            CacheSync::Cancelled => info!("Shutdown requested before cache sync"),
        }

        let worker = Worker::new(
            self.api.clone(),
            queue,
            Exposer::new(self.api.clone(), self.config.create_policy),
            self.config.retry_policy,
        );
        let ((), feed) = tokio::join!(
            run_workers(worker, self.config.workers, shutdown.clone()),
            supervise_feed(feed_task, shutdown),
        );
        feed?;

        info!("Controller stopped");
        Ok(())
    }
}

/// How the wait for the initial Deployment list ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSync {
    Synced,
    /// The feed went away before the cache was filled
    Failed(String),
    Cancelled,
}

/// Block until the Deployment cache has its initial list or `shutdown` fires
pub async fn wait_for_cache_sync(cache: &Store<Deployment>, shutdown: &CancellationToken) -> CacheSync {
    info!("Waiting for Deployment cache to sync...");
    tokio::select! {
        res = cache.wait_until_ready() => match res {
            Ok(()) => CacheSync::Synced,
            Err(e) => CacheSync::Failed(e.to_string()),
        },
        _ = shutdown.cancelled() => CacheSync::Cancelled,
    }
}

/// Wait for the change feed task. If it ends before `shutdown`, the
/// controller is stopped, since no new notifications would ever arrive.
async fn supervise_feed(task: JoinHandle<()>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let res = task.await;
    if shutdown.is_cancelled() {
        if let Err(e) = res {
            error!("Change feed task failed: {}", e);
        }
        return Ok(());
    }

    error!("Change feed stopped unexpectedly, shutting down");
    shutdown.cancel();
    match res {
        Ok(()) => bail!("Deployment change feed ended before shutdown"),
        Err(e) => bail!("Deployment change feed task failed: {}", e),
    }
}

/// Run `count` copies of `worker` until `shutdown` is cancelled, then drain them.
///
/// The queue never hands the same key to two workers, so items are serialized per key.
/// A worker that dies early is started again after a short pause.
pub async fn run_workers(worker: Worker, count: usize, shutdown: CancellationToken) {
    run_workers_with_restart_delay(worker, count, shutdown, RESTART_DELAY).await
}

async fn run_workers_with_restart_delay(
    worker: Worker,
    count: usize,
    shutdown: CancellationToken,
    restart_delay: Duration,
) {
    let queue = worker.queue();
    let mut workers = JoinSet::new();

    if !shutdown.is_cancelled() {
        info!("Starting {} worker(s)", count);
        for _ in 0..count {
            workers.spawn(worker.clone().run());
        }
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(res) = workers.join_next() => {
                match res {
                    Ok(()) if queue.is_shutting_down() => {
                        info!("Worker stopped with its queue");
                        continue;
                    }
                    Ok(()) => warn!("Worker exited early, restarting in {:?}", restart_delay),
                    Err(e) => error!("Worker task failed, restarting in {:?}: {}", restart_delay, e),
                }
                workers.spawn(restart_after(worker.clone(), restart_delay, shutdown.clone()));
            }
        }
    }

    info!("Shutting down work queue");
    queue.shutdown();

    // In-flight items are allowed to finish
    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            error!("Worker task failed: {}", e);
        }
    }
}

async fn restart_after(worker: Worker, delay: Duration, shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(delay) => worker.run().await,
    }
}
