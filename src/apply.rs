use std::fmt::Debug;

use async_trait::async_trait;
use kube::{
    api::{Api, Patch, PatchParams},
    Client, Resource,
};
use log::{error, info};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::Error;
use crate::manifest::{ClusterObject, ClusterObjectSet};
use crate::metrics::kube_error_happened;

pub const FIELD_MANAGER: &str = "naisd";

/// Create-or-update access to the cluster, one object at a time.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create_or_update(&self, namespace: &str, object: &ClusterObject) -> Result<(), Error>;
}

/// `ClusterClient` which server-side applies objects through the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        KubeClusterClient { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_or_update(&self, namespace: &str, object: &ClusterObject) -> Result<(), Error> {
        match object {
            ClusterObject::Deployment(deployment) => {
                server_side_apply(Api::namespaced(self.client.clone(), namespace), deployment).await
            }
            ClusterObject::Service(service) => {
                server_side_apply(Api::namespaced(self.client.clone(), namespace), service).await
            }
            ClusterObject::Ingress(ingress) => {
                server_side_apply(Api::namespaced(self.client.clone(), namespace), ingress).await
            }
            ClusterObject::Autoscaler(autoscaler) => {
                server_side_apply(Api::namespaced(self.client.clone(), namespace), autoscaler).await
            }
        }
    }
}

/// Creates `object` if absent, otherwise replaces the fields we manage.
async fn server_side_apply<K>(api: Api<K>, object: &K) -> Result<(), Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug,
{
    let name = object.meta().name.clone().ok_or(Error::MissingKey(".metadata.name"))?;
    let params = PatchParams::apply(FIELD_MANAGER).force();

    match api.patch(&name, &params, &Patch::Apply(object)).await {
        Ok(_) => Ok(()),
        Err(err) => {
            error!("Failed to apply {} '{}': {:?}", K::kind(&()), name, err);
            kube_error_happened("apply", &err);
            Err(Error::KubeError(err))
        }
    }
}

/// Apply `objects` in order. Stops at the first failure, reporting what was applied before it.
pub async fn apply(objects: ClusterObjectSet, client: &dyn ClusterClient) -> Result<Vec<String>, Error> {
    let namespace = objects.namespace.clone();
    let mut applied = Vec::new();

    for object in objects.into_ordered() {
        let kind = object.kind();
        if let Err(err) = client.create_or_update(&namespace, &object).await {
            return Err(Error::Apply {
                kind,
                applied,
                source: Box::new(err),
            });
        }
        info!("Applied {} in namespace {}", kind, namespace);
        applied.push(format!("created {}", kind));
    }

    Ok(applied)
}
