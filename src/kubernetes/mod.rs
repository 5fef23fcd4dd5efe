// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for API access, client creation, and the Deployment change feed.

pub mod client;
pub mod feed;

pub use client::{create_client, ClusterApi, KubeClusterApi};
pub use feed::{ChangeFeed, FeedEvent, FeedState};
