// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Exposes a Deployment through a Service and an Ingress routing to it.

use crate::config::CreatePolicy;
use crate::constants::{ingress, service};
use crate::error::{DexposeError, Result};
use crate::kubernetes::ClusterApi;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use kube::{api::ObjectMeta, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Service named after the Deployment, selecting its pods on a single HTTP port
pub fn build_service(name: &str, namespace: &str, labels: &BTreeMap<String, String>) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: (!labels.is_empty()).then(|| labels.clone()),
            ports: Some(vec![ServicePort {
                name: Some(service::PORT_NAME.to_string()),
                port: service::PORT,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Ingress routing `/<service-name>` to the Service port
pub fn build_ingress(svc: &Service) -> Ingress {
    let name = svc.name_any();

    Ingress {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: svc.namespace(),
            annotations: Some(BTreeMap::from([(
                ingress::REWRITE_TARGET_ANNOTATION.to_string(),
                ingress::REWRITE_TARGET.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(format!("/{}", name)),
                        path_type: ingress::PATH_TYPE.to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name,
                                port: Some(ServiceBackendPort {
                                    number: Some(service::PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Creates the Service and Ingress for a Deployment
#[derive(Clone)]
pub struct Exposer {
    api: Arc<dyn ClusterApi>,
    policy: CreatePolicy,
}

impl Exposer {
    pub fn new(api: Arc<dyn ClusterApi>, policy: CreatePolicy) -> Self {
        Self { api, policy }
    }

    /// Create the Service, then the Ingress pointing at it.
    ///
    /// Stops at the first error; a Service created before a failing Ingress is left in place.
    #[instrument(skip(self, deployment), fields(deployment = %format!("{}/{}", deployment.namespace().unwrap_or_default(), deployment.name_any())))]
    pub async fn expose(&self, deployment: &Deployment) -> Result<()> {
        let name = deployment.name_any();
        let Some(namespace) = deployment.namespace() else {
            return Err(DexposeError::MissingMetadata(format!(
                "Deployment {} has no namespace",
                name
            )));
        };

        let svc = self
            .ensure_service(build_service(&name, &namespace, deployment.labels()))
            .await?;
        self.ensure_ingress(build_ingress(&svc)).await?;

        Ok(())
    }

    async fn ensure_service(&self, desired: Service) -> Result<Service> {
        let name = desired.name_any();
        let namespace = desired.namespace().unwrap_or_default();

        if self.policy == CreatePolicy::GetOrCreate {
            if let Some(existing) = self.api.get_service(&namespace, &name).await? {
                debug!("Service {}/{} already exists, reusing it", namespace, name);
                return Ok(existing);
            }
        }

        match self.api.create_service(&desired).await {
            Ok(created) => {
                info!("Service created: {}/{}", namespace, name);
                Ok(created)
            }
            Err(e) if e.is_already_exists() && self.policy == CreatePolicy::GetOrCreate => {
                debug!("Service {}/{} was created concurrently", namespace, name);
                self.api.get_service(&namespace, &name).await?.ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_ingress(&self, desired: Ingress) -> Result<Ingress> {
        let name = desired.name_any();
        let namespace = desired.namespace().unwrap_or_default();

        if self.policy == CreatePolicy::GetOrCreate {
            if let Some(existing) = self.api.get_ingress(&namespace, &name).await? {
                debug!("Ingress {}/{} already exists, reusing it", namespace, name);
                return Ok(existing);
            }
        }

        match self.api.create_ingress(&desired).await {
            Ok(created) => {
                info!("Ingress created: {}/{}", namespace, name);
                Ok(created)
            }
            Err(e) if e.is_already_exists() && self.policy == CreatePolicy::GetOrCreate => {
                debug!("Ingress {}/{} was created concurrently", namespace, name);
                self.api.get_ingress(&namespace, &name).await?.ok_or(e)
            }
            Err(e) => Err(e),
        }
    }
}
