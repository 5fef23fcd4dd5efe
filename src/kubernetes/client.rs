// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster API access: the `ClusterApi` seam and its kube-backed implementation

use crate::config::Config;
use crate::error::{DexposeError, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::PostParams,
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Operations the controller needs from the cluster
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>>;

    async fn create_service(&self, service: &Service) -> Result<Service>;

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>>;

    async fn create_ingress(&self, ingress: &Ingress) -> Result<Ingress>;
}

/// `ClusterApi` backed by a live API server
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} {}/{} not found", K::kind(&()), namespace, name);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create<K>(&self, obj: &K) -> Result<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let name = obj.name_any();
        let Some(namespace) = obj.namespace() else {
            return Err(DexposeError::MissingMetadata(format!(
                "{} {} has no namespace",
                K::kind(&()),
                name
            )));
        };

        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&PostParams::default(), obj).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(err)) if err.code == 409 => Err(DexposeError::AlreadyExists {
                kind: K::kind(&()).to_string(),
                key: format!("{}/{}", namespace, name),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    #[instrument(skip(self))]
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        self.get(namespace, name).await
    }

    #[instrument(skip(self))]
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>> {
        self.get(namespace, name).await
    }

    #[instrument(skip(self, service), fields(service = %service.name_any()))]
    async fn create_service(&self, service: &Service) -> Result<Service> {
        self.create(service).await
    }

    #[instrument(skip(self))]
    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>> {
        self.get(namespace, name).await
    }

    #[instrument(skip(self, ingress), fields(ingress = %ingress.name_any()))]
    async fn create_ingress(&self, ingress: &Ingress) -> Result<Ingress> {
        self.create(ingress).await
    }
}

/// Create the Kubernetes client, from the configured kubeconfig file if there is one
pub async fn create_client(config: &Config) -> Result<Client> {
    let Some(path) = config.kubeconfig.as_ref() else {
        debug!("No kubeconfig path configured, inferring client configuration");
        return Ok(Client::try_default().await?);
    };

    info!("Loading kubeconfig from {}", path.display());

    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        DexposeError::KubeconfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let client_config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| DexposeError::KubeconfigError(format!("Failed to create config: {}", e)))?;

    Client::try_from(client_config)
        .map_err(|e| DexposeError::KubeconfigError(format!("Failed to create client: {}", e)))
}
