use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use log::{debug, info};
use serde::Deserialize;

use crate::errors::Error;
use crate::http::{FetchRequest, HttpFetcher};
use crate::request::Zone;

pub const SCOPED_RESOURCE_PATH: &str = "/api/v2/scopedresource";

/// A resource an application declares it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub alias: String,
    pub resource_type: String,
}

impl ResourceRequest {
    pub fn new(alias: &str, resource_type: &str) -> Self {
        ResourceRequest {
            alias: alias.to_string(),
            resource_type: resource_type.to_string(),
        }
    }
}

/// A resource as resolved from Fasit, with its secrets fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedResource {
    pub name: String,
    pub resource_type: String,
    pub properties: BTreeMap<String, String>,
    pub secret: BTreeMap<String, String>,
}

/// Body of a `scopedresource` lookup. Property keys vary between resource types.
#[derive(Deserialize, Debug)]
struct FasitResource {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    secrets: BTreeMap<String, SecretRef>,
}

#[derive(Deserialize, Debug)]
struct SecretRef {
    #[serde(rename = "ref")]
    reference: String,
}

/// Client for the Fasit resource registry.
#[derive(Clone)]
pub struct FasitClient {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
    username: String,
    password: String,
}

impl FasitClient {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, base_url: &str, username: &str, password: &str) -> Self {
        FasitClient {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Resolve all `resources`. The result holds one entry per request, in request order.
    /// Lookups run concurrently; the first failure cancels the rest and is returned.
    pub async fn resolve(
        &self,
        resources: &[ResourceRequest],
        environment: &str,
        application: &str,
        zone: Zone,
    ) -> Result<Vec<ResolvedResource>, Error> {
        info!(
            "Resolving {} resources for {} in {}/{}",
            resources.len(),
            application,
            environment,
            zone
        );
        try_join_all(
            resources
                .iter()
                .map(|resource| self.resolve_one(resource, environment, application, zone)),
        )
        .await
    }

    pub async fn resolve_one(
        &self,
        resource: &ResourceRequest,
        environment: &str,
        application: &str,
        zone: Zone,
    ) -> Result<ResolvedResource, Error> {
        let url = format!("{}{}", self.base_url, SCOPED_RESOURCE_PATH);
        let request = FetchRequest::new(&url)
            .query("alias", &resource.alias)
            .query("type", &resource.resource_type)
            .query("environment", environment)
            .query("application", application)
            .query("zone", zone.as_str());

        let response = self.fetcher.get(&request).await?.success_or_err(&url)?;
        let fasit_resource: FasitResource =
            serde_json::from_slice(&response.body).map_err(|source| Error::RegistryDecode {
                alias: resource.alias.clone(),
                source,
            })?;
        debug!(
            "Resolved '{}' with properties {:?}",
            resource.alias,
            fasit_resource.properties.keys().collect::<Vec<_>>()
        );

        let mut secret = BTreeMap::new();
        for (key, secret_ref) in &fasit_resource.secrets {
            let value = self.resolve_secret(&resource.alias, key, &secret_ref.reference).await?;
            secret.insert(key.clone(), value);
        }

        Ok(ResolvedResource {
            name: resource.alias.clone(),
            resource_type: fasit_resource.resource_type,
            properties: fasit_resource.properties,
            secret,
        })
    }

    async fn resolve_secret(&self, alias: &str, key: &str, reference: &str) -> Result<String, Error> {
        debug!("Fetching secret '{}' of '{}'", key, alias);
        let secret_error = |reason: String| Error::Secret {
            alias: alias.to_string(),
            key: key.to_string(),
            reason,
        };

        let request = FetchRequest::new(reference).basic_auth(&self.username, &self.password);
        let response = self
            .fetcher
            .get(&request)
            .await
            .map_err(|err| secret_error(err.to_string()))?;
        if !response.is_success() {
            return Err(secret_error(format!("{} responded with status {}", reference, response.status)));
        }

        let value = String::from_utf8(response.body).map_err(|err| secret_error(err.to_string()))?;
        if value.is_empty() {
            return Err(secret_error(format!("{} returned an empty secret", reference)));
        }
        Ok(value)
    }
}
