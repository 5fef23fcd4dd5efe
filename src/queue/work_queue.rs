// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating, rate-limited work queue.
//!
//! An item is in at most one of two places at a time: pending (`dirty`,
//! waiting in `queue`) or being processed. Adding an item that is being
//! processed only marks it dirty; `done` puts it back in line, so no two
//! workers ever hold the same item.

use crate::queue::rate_limiter::ItemExponentialBackoff;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

struct State<T> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T>,
    shutting_down: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    limiter: Mutex<ItemExponentialBackoff<T>>,
    notify: Notify,
}

/// Handle to a shared work queue; clones refer to the same queue
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_rate_limiter(ItemExponentialBackoff::default())
    }

    pub fn with_rate_limiter(limiter: ItemExponentialBackoff<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    shutting_down: false,
                }),
                limiter: Mutex::new(limiter),
                notify: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn limiter(&self) -> MutexGuard<'_, ItemExponentialBackoff<T>> {
        self.inner
            .limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue `item` unless it is already pending
    pub fn add(&self, item: T) {
        let mut state = self.state();
        if state.shutting_down {
            trace!("Queue is shutting down, dropping item");
            return;
        }
        if !state.dirty.insert(item.clone()) {
            return;
        }
        // Picked up again by `done`
        if state.processing.contains(&item) {
            return;
        }
        state.queue.push_back(item);
        drop(state);

        self.inner.notify.notify_one();
    }

    /// Enqueue `item` once `delay` has elapsed
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        if self.is_shutting_down() {
            return;
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Enqueue `item` after the backoff delay for its number of failures
    pub fn add_rate_limited(&self, item: T) {
        let delay = self.limiter().when(&item);
        self.add_after(item, delay);
    }

    /// Clear the retry bookkeeping of `item`
    pub fn forget(&self, item: &T) {
        self.limiter().forget(item);
    }

    pub fn num_requeues(&self, item: &T) -> u32 {
        self.limiter().num_requeues(item)
    }

    /// Wait for the next item; `None` once the queue is shutting down
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent add or shutdown is never missed
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.shutting_down {
                    return None;
                }
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Mark `item` as processed, re-queueing it if it was added meanwhile
    pub fn done(&self, item: &T) {
        let mut state = self.state();
        state.processing.remove(item);
        if state.shutting_down || !state.dirty.contains(item) {
            return;
        }
        state.queue.push_back(item.clone());
        drop(state);

        self.inner.notify.notify_one();
    }

    /// Stop handing out items and wake every blocked `get`
    pub fn shutdown(&self) {
        self.state().shutting_down = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Number of pending items, not counting those being processed
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
