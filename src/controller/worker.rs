// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Worker loop - pulls keys off the work queue and exposes their Deployments.

use crate::config::RetryPolicy;
use crate::controller::expose::Exposer;
use crate::kubernetes::ClusterApi;
use crate::queue::WorkQueue;
use crate::types::ObjectKey;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Result of processing a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Service and Ingress were created
    Synced,
    /// The Deployment no longer exists
    Gone,
    Failed,
}

#[derive(Clone)]
pub struct Worker {
    api: Arc<dyn ClusterApi>,
    queue: WorkQueue<ObjectKey>,
    exposer: Exposer,
    retry_policy: RetryPolicy,
}

impl Worker {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        queue: WorkQueue<ObjectKey>,
        exposer: Exposer,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            queue,
            exposer,
            retry_policy,
        }
    }

    pub fn queue(&self) -> WorkQueue<ObjectKey> {
        self.queue.clone()
    }

    /// Process items until the queue shuts down
    pub async fn run(self) {
        while self.process_next_item().await {}
        debug!("Worker stopped");
    }

    /// Process one item; `false` once the queue is shutting down
    pub async fn process_next_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        let outcome = self.process(&key).await;
        self.finish(&key, outcome);
        self.queue.done(&key);
        true
    }

    /// Fetch the current Deployment from the API server and expose it
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn process(&self, key: &ObjectKey) -> Outcome {
        let deployment = match self
            .api
            .get_deployment(key.namespace_or_default(), &key.name)
            .await
        {
            Ok(Some(dep)) => dep,
            Ok(None) => {
                info!("Deployment deleted: {}", key);
                return Outcome::Gone;
            }
            Err(e) => {
                error!("Failed to get Deployment {}: {}", key, e);
                return Outcome::Failed;
            }
        };

        info!("Syncing Deployment: {}", key);
        match self.exposer.expose(&deployment).await {
            Ok(()) => Outcome::Synced,
            Err(e) => {
                error!("Failed to sync Deployment {}: {}", key, e);
                Outcome::Failed
            }
        }
    }

    fn finish(&self, key: &ObjectKey, outcome: Outcome) {
        match (self.retry_policy, outcome) {
            (RetryPolicy::Requeue { max_retries }, Outcome::Failed) => {
                let retries = self.queue.num_requeues(key);
                if retries < max_retries {
                    warn!("Requeueing {} (retry {} of {})", key, retries + 1, max_retries);
                    self.queue.add_rate_limited(key.clone());
                } else {
                    warn!("Dropping {} after {} retries", key, retries);
                    self.queue.forget(key);
                }
            }
            _ => self.queue.forget(key),
        }
    }
}
