// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{DexposeError, Result};
use kube::Resource;
use std::fmt;
use std::str::FromStr;

/// Stable `namespace/name` identifier of a watched object, used as work queue item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Derive the key of an object from its metadata
    pub fn for_resource<K: Resource>(obj: &K) -> Result<Self> {
        let meta = obj.meta();
        let Some(name) = meta.name.as_deref().filter(|n| !n.is_empty()) else {
            return Err(DexposeError::InvalidKey(format!(
                "object has no name (namespace: {})",
                meta.namespace.as_deref().unwrap_or("<none>")
            )));
        };

        Ok(Self::new(meta.namespace.as_deref(), name))
    }

    /// Namespace for API calls, empty for cluster-scoped objects
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for ObjectKey {
    type Err = DexposeError;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, name) = split_key(s)?;
        Ok(Self { namespace, name })
    }
}

/// Split a `namespace/name` or bare `name` key into its parts
pub fn split_key(key: &str) -> Result<(Option<String>, String)> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [name] if !name.is_empty() => Ok((None, name.to_string())),
        [ns, name] if !ns.is_empty() && !name.is_empty() => {
            Ok((Some(ns.to_string()), name.to_string()))
        }
        _ => Err(DexposeError::InvalidKey(format!(
            "unexpected key format: {:?}",
            key
        ))),
    }
}
