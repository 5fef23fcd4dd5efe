// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Change feed: watch + local cache of Deployments, turned into add/update/delete notifications

use crate::types::ObjectKey;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::ObjectMeta;
use kube::{Api, Client, Resource};
use kube_runtime::reflector::{self, Store};
use kube_runtime::watcher::{self, Config as WatcherConfig, Event};
use kube_runtime::WatchStreamExt;
use std::collections::{HashMap, HashSet};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Notification delivered to event handlers
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent<K> {
    Added(K),
    Updated(K),
    Deleted(K),
}

/// Classifies raw watcher events into add/update/delete notifications.
///
/// The watcher reports both creations and modifications as `Apply`; objects
/// seen before are reported as updates. Objects that disappear across a
/// re-list produce a delete, since their delete event may have been missed.
/// Only identifying metadata is tracked; the objects themselves live in the
/// reflector store, and a synthesized delete carries the last known metadata.
#[derive(Debug, Default)]
pub struct FeedState {
    known: HashMap<ObjectKey, ObjectMeta>,
    relisted: Option<HashSet<ObjectKey>>,
}

impl FeedState {
    pub fn apply<K: Resource + Default>(&mut self, event: Event<K>) -> Vec<FeedEvent<K>> {
        match event {
            Event::Init => {
                debug!("Watch (re)list started");
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(obj) => {
                if let (Some(seen), Ok(key)) = (self.relisted.as_mut(), ObjectKey::for_resource(&obj)) {
                    seen.insert(key);
                }
                vec![self.upsert(obj)]
            }
            Event::InitDone => {
                let Some(seen) = self.relisted.take() else {
                    return Vec::new();
                };
                let mut gone: Vec<ObjectKey> = self
                    .known
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();
                gone.sort();
                debug!("Watch (re)list done, {} objects vanished", gone.len());

                gone.into_iter()
                    .filter_map(|key| self.known.remove(&key))
                    .map(|meta| FeedEvent::Deleted(tombstone(meta)))
                    .collect()
            }
            Event::Apply(obj) => vec![self.upsert(obj)],
            Event::Delete(obj) => {
                if let Ok(key) = ObjectKey::for_resource(&obj) {
                    self.known.remove(&key);
                }
                vec![FeedEvent::Deleted(obj)]
            }
        }
    }

    fn upsert<K: Resource>(&mut self, obj: K) -> FeedEvent<K> {
        // Unkeyable objects are passed on so the handlers can report them
        let Ok(key) = ObjectKey::for_resource(&obj) else {
            return FeedEvent::Added(obj);
        };
        match self.known.insert(key, identity(obj.meta())) {
            Some(_) => FeedEvent::Updated(obj),
            None => FeedEvent::Added(obj),
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

fn identity(meta: &ObjectMeta) -> ObjectMeta {
    ObjectMeta {
        name: meta.name.clone(),
        namespace: meta.namespace.clone(),
        uid: meta.uid.clone(),
        resource_version: meta.resource_version.clone(),
        ..Default::default()
    }
}

/// An otherwise empty object standing in for one whose delete event was missed
fn tombstone<K: Resource + Default>(meta: ObjectMeta) -> K {
    let mut obj = K::default();
    *obj.meta_mut() = meta;
    obj
}

/// Watches Deployments and keeps a local cache of them
pub struct ChangeFeed {
    api: Api<Deployment>,
    watcher_config: WatcherConfig,
}

impl ChangeFeed {
    /// Watch a single namespace, or all namespaces when `namespace` is `None`
    pub fn new(client: Client, namespace: Option<&str>) -> Self {
        let api = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };
        Self {
            api,
            watcher_config: WatcherConfig::default(),
        }
    }

    /// Start watching, calling `on_event` for every notification until `shutdown` fires.
    ///
    /// Returns the cache populated by the watch and the handle of the watch task.
    /// `on_event` runs inline on the watch task and must not block.
    pub fn start<F>(self, mut on_event: F, shutdown: CancellationToken) -> (Store<Deployment>, JoinHandle<()>)
    where
        F: FnMut(&FeedEvent<Deployment>) + Send + 'static,
    {
        let (reader, writer) = reflector::store();
        let stream = watcher::watcher(self.api, self.watcher_config)
            .default_backoff()
            .reflect(writer);

        let task = tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            let mut state = FeedState::default();

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Change feed stopped");
                        break;
                    }
                    next = stream.next() => match next {
                        Some(Ok(event)) => {
                            for notification in state.apply(event) {
                                on_event(&notification);
                            }
                        }
                        Some(Err(e)) => warn!("Deployment watch error, retrying: {}", e),
                        None => {
                            warn!("Deployment watch stream ended");
                            break;
                        }
                    }
                }
            }
        });

        (reader, task)
    }
}
