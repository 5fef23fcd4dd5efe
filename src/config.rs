// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// What the worker does with an item once it has been processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Clear retry bookkeeping after every item, whatever the outcome.
    /// A failed item is only processed again when a new notification arrives.
    Forget,
    /// Re-add failed items with per-item backoff, dropping them after `max_retries`
    Requeue { max_retries: u32 },
}

/// How the Service and Ingress of a Deployment are created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatePolicy {
    /// Always create; a second sync of the same Deployment fails with AlreadyExists
    #[default]
    CreateOnly,
    /// Reuse an existing resource with the derived name instead of failing
    GetOrCreate,
}

impl FromStr for CreatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(CreatePolicy::CreateOnly),
            "get-or-create" => Ok(CreatePolicy::GetOrCreate),
            other => bail!("unknown expose mode '{}', expected 'create' or 'get-or-create'", other),
        }
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to a kubeconfig file; in-cluster or default config is inferred when unset
    pub kubeconfig: Option<PathBuf>,
    /// Only watch Deployments in this namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    pub workers: usize,
    pub retry_policy: RetryPolicy,
    pub create_policy: CreatePolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kubeconfig = lookup("KUBE_CONFIG")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let workers = match lookup("WORKERS") {
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("WORKERS must be a positive integer, got '{}'", v))?,
            None => defaults::WORKERS,
        };
        if workers == 0 {
            bail!("WORKERS must be at least 1");
        }

        let max_retries = match lookup("MAX_RETRIES") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("MAX_RETRIES must be an integer, got '{}'", v))?,
            None => defaults::MAX_RETRIES,
        };
        let retry_policy = match lookup("RETRY_POLICY").as_deref() {
            None | Some("forget") => RetryPolicy::Forget,
            Some("requeue") => RetryPolicy::Requeue { max_retries },
            Some(other) => bail!(
                "unknown retry policy '{}', expected 'forget' or 'requeue'",
                other
            ),
        };

        let create_policy = match lookup("EXPOSE_MODE") {
            Some(v) => v.parse::<CreatePolicy>().context("invalid EXPOSE_MODE")?,
            None => CreatePolicy::default(),
        };

        Ok(Config {
            kubeconfig,
            watch_namespace,
            workers,
            retry_policy,
            create_policy,
        })
    }
}
