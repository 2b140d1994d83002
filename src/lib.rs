use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::Deserialize;

pub mod app_config;
pub mod apply;
pub mod errors;
pub mod fasit;
pub mod http;
pub mod manifest;
pub mod metrics;
pub mod request;
pub mod utils;
pub mod views;

use crate::apply::ClusterClient;
use crate::errors::Error;
use crate::fasit::FasitClient;
use crate::http::HttpFetcher;
use crate::manifest::{AutoscalerDefaults, SynthesisSettings};
pub use crate::request::{DeploymentRequest, Zone};

/// Settings read from the process environment, see `envy`.
#[derive(Deserialize, Debug, Clone)]
pub struct NaisdEnvironmentConfig {
    pub fasit_url: String,
    pub cluster_subdomain: String,
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_min_replicas")]
    pub autoscaler_min_replicas: i32,
    #[serde(default = "default_max_replicas")]
    pub autoscaler_max_replicas: i32,
    #[serde(default = "default_cpu_threshold")]
    pub autoscaler_cpu_threshold: i32,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_server_host() -> String {
    "0.0.0.0".to_owned()
}
fn default_server_port() -> u16 {
    8081
}
fn default_min_replicas() -> i32 {
    AutoscalerDefaults::default().min_replicas
}
fn default_max_replicas() -> i32 {
    AutoscalerDefaults::default().max_replicas
}
fn default_cpu_threshold() -> i32 {
    AutoscalerDefaults::default().cpu_threshold_percentage
}
fn default_http_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fasit_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub http_timeout: Duration,
    pub synthesis: SynthesisSettings,
}

impl Config {
    pub fn from_env_config(env_config: NaisdEnvironmentConfig) -> Result<Self, Error> {
        if env_config.fasit_url.is_empty() {
            return Err(Error::InvalidConfig("FASIT_URL is empty".into()));
        }
        if env_config.cluster_subdomain.is_empty() {
            return Err(Error::InvalidConfig("CLUSTER_SUBDOMAIN is empty".into()));
        }
        if env_config.autoscaler_min_replicas < 1
            || env_config.autoscaler_min_replicas > env_config.autoscaler_max_replicas
        {
            return Err(Error::InvalidConfig(format!(
                "autoscaler replicas must satisfy 1 <= min <= max, got min {} and max {}",
                env_config.autoscaler_min_replicas, env_config.autoscaler_max_replicas
            )));
        }
        if !(1..=100).contains(&env_config.autoscaler_cpu_threshold) {
            return Err(Error::InvalidConfig(format!(
                "AUTOSCALER_CPU_THRESHOLD must be between 1 and 100, got {}",
                env_config.autoscaler_cpu_threshold
            )));
        }
        if env_config.http_timeout_seconds == 0 {
            return Err(Error::InvalidConfig("HTTP_TIMEOUT_SECONDS must be positive".into()));
        }

        Ok(Config {
            fasit_url: env_config.fasit_url,
            server_host: env_config.server_host,
            server_port: env_config.server_port,
            http_timeout: Duration::from_secs(env_config.http_timeout_seconds),
            synthesis: SynthesisSettings {
                cluster_subdomain: env_config.cluster_subdomain,
                autoscaler: AutoscalerDefaults {
                    min_replicas: env_config.autoscaler_min_replicas,
                    max_replicas: env_config.autoscaler_max_replicas,
                    cpu_threshold_percentage: env_config.autoscaler_cpu_threshold,
                },
            },
        })
    }
}

/// Runs the deploy pipeline: validate, fetch config, resolve resources, synthesize, apply.
#[derive(Clone)]
pub struct Deployer {
    fetcher: Arc<dyn HttpFetcher>,
    cluster: Arc<dyn ClusterClient>,
    config: Config,
}

impl Deployer {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, cluster: Arc<dyn ClusterClient>, config: Config) -> Self {
        Deployer {
            fetcher,
            cluster,
            config,
        }
    }

    /// Deploy the application described by `request`, returning one line per applied object.
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<Vec<String>, Error> {
        let result = self.run_pipeline(request).await;
        match &result {
            Ok(actions) => info!(
                "Deployed {} to {}: {}",
                request.application,
                request.namespace,
                actions.join(", ")
            ),
            Err(err) if err.is_client_error() => warn!("Rejected deployment of {}: {}", request.application, err),
            Err(err) => error!("Failed to deploy {}: {}", request.application, err),
        }
        if let Err(err) = &result {
            metrics::error_happened(err.stage());
        }
        metrics::deployment_finished(result.is_ok());
        result
    }

    async fn run_pipeline(&self, request: &DeploymentRequest) -> Result<Vec<String>, Error> {
        let violations = request.validate();
        if !violations.is_empty() {
            return Err(Error::Validation(violations));
        }
        let zone = request.zone()?;

        let app_config = app_config::fetch_app_config(self.fetcher.as_ref(), &request.app_config_url).await?;

        let fasit = FasitClient::new(
            self.fetcher.clone(),
            &self.config.fasit_url,
            &request.username,
            &request.password,
        );
        let resolved = fasit
            .resolve(&app_config.resource_requests(), &request.environment, &request.application, zone)
            .await?;

        let objects = manifest::synthesize(&app_config, &resolved, request, &self.config.synthesis)?;
        apply::apply(objects, self.cluster.as_ref()).await
    }
}
