#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kube::core::ErrorResponse;

use naisd::apply::ClusterClient;
use naisd::errors::Error;
use naisd::http::{FetchRequest, FetchResponse, HttpFetcher};
use naisd::manifest::{AutoscalerDefaults, ClusterObject, SynthesisSettings};
use naisd::{Config, DeploymentRequest, Deployer};

pub const FASIT_URL: &str = "https://fasit.local";
pub const SCOPED_RESOURCE_URL: &str = "https://fasit.local/api/v2/scopedresource";

// Read a file from `tests/testdata`
pub fn testdata(name: &str) -> String {
    std::fs::read_to_string(format!("{}/tests/testdata/{}", env!("CARGO_MANIFEST_DIR"), name))
        .expect("Failed to read testdata file")
}

struct Route {
    url: String,
    params: Vec<(String, String)>,
    authorized: bool,
    response: FetchResponse,
    called: bool,
}

/// Canned HTTP responses matched on URL, query parameters and the presence of credentials.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        FakeHttp::default()
    }

    pub fn reply(self, url: &str, params: &[(&str, &str)], status: u16, body: &str) -> Self {
        self.add_route(url, params, false, status, body)
    }

    /// Only matches requests carrying basic auth credentials.
    pub fn reply_authorized(self, url: &str, status: u16, body: &str) -> Self {
        self.add_route(url, &[], true, status, body)
    }

    fn add_route(self, url: &str, params: &[(&str, &str)], authorized: bool, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().push(Route {
            url: url.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            authorized,
            response: FetchResponse {
                status,
                body: body.as_bytes().to_vec(),
            },
            called: false,
        });
        self
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| call.url == url).count()
    }

    pub fn all_routes_called(&self) -> bool {
        self.routes.lock().unwrap().iter().all(|route| route.called)
    }
}

#[async_trait]
impl HttpFetcher for FakeHttp {
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let route = routes.iter_mut().find(|route| {
            route.url == request.url
                && route.params.iter().all(|param| request.query.contains(param))
                && (!route.authorized || request.basic_auth.is_some())
        });
        match route {
            Some(route) => {
                route.called = true;
                Ok(route.response.clone())
            }
            None => Err(Error::Transport {
                url: request.url.clone(),
                message: "no matching route".to_string(),
            }),
        }
    }
}

/// Records applied objects, rejecting every object of `failing_kind`.
#[derive(Default)]
pub struct FakeCluster {
    applied: Mutex<Vec<(String, ClusterObject)>>,
    failing_kind: Option<&'static str>,
}

impl FakeCluster {
    pub fn new() -> Self {
        FakeCluster::default()
    }

    pub fn failing(kind: &'static str) -> Self {
        FakeCluster {
            failing_kind: Some(kind),
            ..FakeCluster::default()
        }
    }

    pub fn applied_kinds(&self) -> Vec<&'static str> {
        self.applied.lock().unwrap().iter().map(|(_, object)| object.kind()).collect()
    }

    pub fn applied(&self) -> Vec<(String, ClusterObject)> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn create_or_update(&self, namespace: &str, object: &ClusterObject) -> Result<(), Error> {
        if self.failing_kind == Some(object.kind()) {
            return Err(Error::KubeError(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: format!("{} rejected", object.kind()),
                reason: "Invalid".to_string(),
                code: 422,
            })));
        }
        self.applied.lock().unwrap().push((namespace.to_string(), object.clone()));
        Ok(())
    }
}

pub fn config() -> Config {
    Config {
        fasit_url: FASIT_URL.to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 8081,
        http_timeout: std::time::Duration::from_secs(1),
        synthesis: SynthesisSettings {
            cluster_subdomain: "nais.example.tk".to_string(),
            autoscaler: AutoscalerDefaults::default(),
        },
    }
}

pub fn deployer(http: Arc<FakeHttp>, cluster: Arc<FakeCluster>) -> Deployer {
    Deployer::new(http, cluster, config())
}

pub fn deployment_request() -> DeploymentRequest {
    DeploymentRequest {
        application: "appname".to_string(),
        version: "123".to_string(),
        environment: "namespace".to_string(),
        app_config_url: "http://repo.com/app".to_string(),
        zone: "fss".to_string(),
        namespace: "namespace".to_string(),
        username: "user".to_string(),
        password: "password".to_string(),
    }
}
