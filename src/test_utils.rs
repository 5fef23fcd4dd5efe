// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock HTTP backend for `kube::Client` and an in-memory `ClusterApi`.

use crate::error::{DexposeError, Result};
use crate::kubernetes::ClusterApi;
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service as TowerService;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("POST".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Method and path of every request received, in order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl TowerService<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A `Status` response body as returned by the API server on errors
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create a mock Deployment JSON response
pub fn deployment_json(name: &str, namespace: &str) -> String {
    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid",
            "labels": { "app": name }
        },
        "spec": {
            "selector": { "matchLabels": { "app": name } },
            "template": { "metadata": { "labels": { "app": name } } }
        }
    })
    .to_string()
}

/// Create a mock DeploymentList JSON response from `(name, namespace)` pairs
pub fn deployment_list_json(items: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(name, namespace)| serde_json::from_str(&deployment_json(name, namespace)).unwrap())
        .collect();
    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "DeploymentList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

pub fn make_deployment(name: &str, namespace: &str, labels: &[(&str, &str)]) -> Deployment {
    let labels: BTreeMap<String, String> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: (!labels.is_empty()).then_some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn deployment_from_yaml(manifest: &str) -> Deployment {
    serde_yaml::from_str(manifest).unwrap()
}

/// Calls recorded by `FakeClusterApi`, keyed by `namespace/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    GetDeployment(String),
    GetService(String),
    CreateService(String),
    GetIngress(String),
    CreateIngress(String),
}

#[derive(Default)]
struct FakeState {
    deployments: HashMap<String, Deployment>,
    services: HashMap<String, Service>,
    ingresses: HashMap<String, Ingress>,
    failing_gets: HashSet<String>,
    panicking_gets: HashSet<String>,
    fail_ingress_creates: bool,
    calls: Vec<ApiCall>,
}

/// In-memory cluster honouring create conflicts like the API server
#[derive(Default)]
pub struct FakeClusterApi {
    state: Mutex<FakeState>,
}

fn object_key(meta: &ObjectMeta) -> String {
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    )
}

fn injected_error() -> DexposeError {
    DexposeError::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: "injected failure".to_string(),
        reason: "InternalError".to_string(),
        code: 500,
    }))
}

impl FakeClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_deployment(&self, deployment: Deployment) {
        let key = object_key(&deployment.metadata);
        self.state.lock().unwrap().deployments.insert(key, deployment);
    }

    pub fn insert_service(&self, service: Service) {
        let key = object_key(&service.metadata);
        self.state.lock().unwrap().services.insert(key, service);
    }

    /// Make Deployment gets for `key` fail with a server error
    pub fn fail_deployment_gets(&self, key: &str) {
        self.state.lock().unwrap().failing_gets.insert(key.to_string());
    }

    /// Make Deployment gets for `key` panic, taking the calling task down
    pub fn panic_on_deployment_get(&self, key: &str) {
        self.state.lock().unwrap().panicking_gets.insert(key.to_string());
    }

    pub fn fail_ingress_creates(&self) {
        self.state.lock().unwrap().fail_ingress_creates = true;
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        let key = format!("{}/{}", namespace, name);
        self.state.lock().unwrap().services.get(&key).cloned()
    }

    pub fn ingress(&self, namespace: &str, name: &str) -> Option<Ingress> {
        let key = format!("{}/{}", namespace, name);
        self.state.lock().unwrap().ingresses.get(&key).cloned()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl ClusterApi for FakeClusterApi {
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let key = format!("{}/{}", namespace, name);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::GetDeployment(key.clone()));
        if state.panicking_gets.contains(&key) {
            drop(state);
            panic!("injected panic fetching {}", key);
        }
        if state.failing_gets.contains(&key) {
            return Err(injected_error());
        }
        Ok(state.deployments.get(&key).cloned())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>> {
        let key = format!("{}/{}", namespace, name);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::GetService(key.clone()));
        Ok(state.services.get(&key).cloned())
    }

    async fn create_service(&self, service: &Service) -> Result<Service> {
        let key = object_key(&service.metadata);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::CreateService(key.clone()));
        if state.services.contains_key(&key) {
            return Err(DexposeError::AlreadyExists {
                kind: "Service".to_string(),
                key,
            });
        }
        let mut created = service.clone();
        created.metadata.uid = Some(format!("uid-{}", service.name_any()));
        state.services.insert(key, created.clone());
        Ok(created)
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>> {
        let key = format!("{}/{}", namespace, name);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::GetIngress(key.clone()));
        Ok(state.ingresses.get(&key).cloned())
    }

    async fn create_ingress(&self, ingress: &Ingress) -> Result<Ingress> {
        let key = object_key(&ingress.metadata);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::CreateIngress(key.clone()));
        if state.fail_ingress_creates {
            return Err(injected_error());
        }
        if state.ingresses.contains_key(&key) {
            return Err(DexposeError::AlreadyExists {
                kind: "Ingress".to_string(),
                key,
            });
        }
        state.ingresses.insert(key, ingress.clone());
        Ok(ingress.clone())
    }
}
