// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DexposeError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: String, key: String },

    #[error("Object is missing metadata: {0}")]
    MissingMetadata(String),
}

impl DexposeError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DexposeError::AlreadyExists { .. })
    }
}

pub type Result<T> = std::result::Result<T, DexposeError>;
