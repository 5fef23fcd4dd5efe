// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Event handlers - turn change feed notifications into work queue keys.

use crate::kubernetes::FeedEvent;
use crate::queue::WorkQueue;
use crate::types::ObjectKey;
use kube::Resource;
use tracing::{error, info, trace};

#[derive(Clone)]
pub struct EventHandlers {
    queue: WorkQueue<ObjectKey>,
}

impl EventHandlers {
    pub fn new(queue: WorkQueue<ObjectKey>) -> Self {
        Self { queue }
    }

    pub fn handle<K: Resource>(&self, event: &FeedEvent<K>) {
        match event {
            FeedEvent::Added(obj) => self.on_add(obj),
            FeedEvent::Deleted(obj) => self.on_delete(obj),
            // In-place changes do not retrigger exposure
            FeedEvent::Updated(obj) => {
                trace!("Ignoring update of {:?}/{:?}", obj.meta().namespace, obj.meta().name);
            }
        }
    }

    pub fn on_add<K: Resource>(&self, obj: &K) {
        if let Some(key) = enqueue_key(obj) {
            info!("{} created", key);
            self.queue.add(key);
        }
    }

    pub fn on_delete<K: Resource>(&self, obj: &K) {
        if let Some(key) = enqueue_key(obj) {
            info!("{} deleted", key);
            self.queue.add(key);
        }
    }
}

fn enqueue_key<K: Resource>(obj: &K) -> Option<ObjectKey> {
    match ObjectKey::for_resource(obj) {
        Ok(key) => Some(key),
        Err(e) => {
            error!("Dropping notification: {}", e);
            None
        }
    }
}
