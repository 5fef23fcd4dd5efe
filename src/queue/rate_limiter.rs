// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-item exponential backoff for work queue retries.

use crate::constants::backoff::{BASE_DELAY, MAX_DELAY};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

/// Tracks failures per item; each failure doubles the next delay up to a cap
#[derive(Debug)]
pub struct ItemExponentialBackoff<T> {
    base: Duration,
    max: Duration,
    failures: HashMap<T, u32>,
}

impl<T: Clone + Eq + Hash> ItemExponentialBackoff<T> {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: HashMap::new(),
        }
    }

    /// Record a failure for `item` and return how long to wait before retrying it
    pub fn when(&mut self, item: &T) -> Duration {
        let failures = self.failures.entry(item.clone()).or_insert(0);
        let exponent = *failures;
        *failures = failures.saturating_add(1);

        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Stop tracking `item`; its next failure starts again at the base delay
    pub fn forget(&mut self, item: &T) {
        self.failures.remove(item);
    }

    pub fn num_requeues(&self, item: &T) -> u32 {
        self.failures.get(item).copied().unwrap_or(0)
    }
}

impl<T: Clone + Eq + Hash> Default for ItemExponentialBackoff<T> {
    fn default() -> Self {
        Self::new(BASE_DELAY, MAX_DELAY)
    }
}
