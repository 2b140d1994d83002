use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::fasit::ResourceRequest;
use crate::http::{FetchRequest, HttpFetcher};

/// An application's declarative descriptor, as stored next to its source.
///
/// ```yaml
/// image: docker.adeo.no/appname
/// port: 8080
/// fasitResources:
///   used:
///     - alias: appdb
///       resourceType: datasource
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub image: String,
    pub port: u16,
    #[serde(default, alias = "fasitresources")]
    pub fasit_resources: FasitResources,
    #[serde(default)]
    pub replicas: Option<Replicas>,
    #[serde(default)]
    pub healthcheck: Option<Healthcheck>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FasitResources {
    #[serde(default)]
    pub used: Vec<UsedResource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsedResource {
    pub alias: String,
    #[serde(alias = "type", alias = "resourcetype")]
    pub resource_type: String,
}

/// Overrides for the autoscaler defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Replicas {
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub cpu_threshold_percentage: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Healthcheck {
    pub liveness: Option<Probe>,
    pub readiness: Option<Probe>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Probe {
    pub path: String,
}

impl AppConfig {
    pub fn parse(yaml_string: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml_string)
            .map_err(Error::ConfigDecode)
            .and_then(AppConfig::checked)
    }

    /// Decode a raw document. Bodies which are not valid UTF-8 are rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        serde_yaml::from_slice(body)
            .map_err(Error::ConfigDecode)
            .and_then(AppConfig::checked)
    }

    fn checked(config: AppConfig) -> Result<Self, Error> {
        if config.image.is_empty() {
            return Err(Error::ConfigDecode(serde::de::Error::custom("image is empty")));
        }
        if config.port == 0 {
            return Err(Error::ConfigDecode(serde::de::Error::custom("port must be positive")));
        }
        Ok(config)
    }

    /// Resources to resolve, in the order they are declared.
    pub fn resource_requests(&self) -> Vec<ResourceRequest> {
        self.fasit_resources
            .used
            .iter()
            .map(|used| ResourceRequest::new(&used.alias, &used.resource_type))
            .collect()
    }
}

/// Download and decode the app config found at `url`.
pub async fn fetch_app_config(fetcher: &dyn HttpFetcher, url: &str) -> Result<AppConfig, Error> {
    info!("Fetching app config from {}", url);
    let response = fetcher
        .get(&FetchRequest::new(url))
        .await?
        .success_or_err(url)?;

    debug!("App config for {}: {}", url, String::from_utf8_lossy(&response.body));
    AppConfig::from_slice(&response.body)
}
