use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        autoscaling::v1::{CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec},
        core::v1::{
            Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe, Service,
            ServicePort, ServiceSpec,
        },
        networking::v1::{
            HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend,
            IngressSpec, ServiceBackendPort,
        },
    },
    apimachinery::pkg::{apis::meta::v1::LabelSelector, util::intstr::IntOrString},
};

use crate::app_config::{self, AppConfig};
use crate::errors::Error;
use crate::fasit::ResolvedResource;
use crate::request::DeploymentRequest;
use crate::utils::{env_var, env_var_name, labels, object_meta};

pub const SERVICE_PORT: i32 = 80;
const PORT_NAME: &str = "http";

/// Autoscaler bounds used when the app config does not override them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoscalerDefaults {
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub cpu_threshold_percentage: i32,
}

impl Default for AutoscalerDefaults {
    fn default() -> Self {
        AutoscalerDefaults {
            min_replicas: 2,
            max_replicas: 4,
            cpu_threshold_percentage: 50,
        }
    }
}

/// Settings for the synthesizer which are not part of a deployment request.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSettings {
    pub cluster_subdomain: String,
    pub autoscaler: AutoscalerDefaults,
}

/// Every object needed to run one application, in apply order.
#[derive(Debug, Clone)]
pub struct ClusterObjectSet {
    pub namespace: String,
    pub deployment: Deployment,
    pub service: Service,
    pub ingress: Ingress,
    pub autoscaler: HorizontalPodAutoscaler,
}

/// One object of a `ClusterObjectSet`.
#[derive(Debug, Clone)]
pub enum ClusterObject {
    Deployment(Deployment),
    Service(Service),
    Ingress(Ingress),
    Autoscaler(HorizontalPodAutoscaler),
}

impl ClusterObject {
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterObject::Deployment(_) => "deployment",
            ClusterObject::Service(_) => "service",
            ClusterObject::Ingress(_) => "ingress",
            ClusterObject::Autoscaler(_) => "autoscaler",
        }
    }
}

impl ClusterObjectSet {
    /// The objects in the order they must be applied: later objects refer to earlier ones.
    pub fn into_ordered(self) -> Vec<ClusterObject> {
        vec![
            ClusterObject::Deployment(self.deployment),
            ClusterObject::Service(self.service),
            ClusterObject::Ingress(self.ingress),
            ClusterObject::Autoscaler(self.autoscaler),
        ]
    }
}

/// Build the cluster objects for `request` from its app config and resolved resources.
/// Pure: the same inputs always give the same objects.
pub fn synthesize(
    config: &AppConfig,
    resolved: &[ResolvedResource],
    request: &DeploymentRequest,
    settings: &SynthesisSettings,
) -> Result<ClusterObjectSet, Error> {
    let env = resource_env(resolved)?;
    let (min_replicas, max_replicas, cpu_threshold) = replica_bounds(config, &settings.autoscaler)?;

    Ok(ClusterObjectSet {
        namespace: request.namespace.clone(),
        deployment: deployment(config, request, env),
        service: service(config, request),
        ingress: ingress(request, &settings.cluster_subdomain),
        autoscaler: autoscaler(request, min_replicas, max_replicas, cpu_threshold),
    })
}

/// Project every property and secret of the resolved resources into environment variables.
fn resource_env(resolved: &[ResolvedResource]) -> Result<Vec<EnvVar>, Error> {
    let mut sources: BTreeMap<String, String> = BTreeMap::new();
    let mut env = Vec::new();

    for resource in resolved {
        let entries = resource
            .properties
            .iter()
            .map(|entry| ("property", entry))
            .chain(resource.secret.iter().map(|entry| ("secret", entry)));

        for (origin, (key, value)) in entries {
            let name = env_var_name(&resource.name, key);
            let source = format!("{} '{}' of '{}'", origin, key, resource.name);
            if let Some(first) = sources.insert(name.clone(), source.clone()) {
                return Err(Error::DuplicateEnvVar {
                    name,
                    first,
                    second: source,
                });
            }
            env.push(env_var(&name, value));
        }
    }

    Ok(env)
}

fn replica_bounds(config: &AppConfig, defaults: &AutoscalerDefaults) -> Result<(i32, i32, i32), Error> {
    let overrides = config.replicas.clone().unwrap_or_default();
    let min = overrides.min.unwrap_or(defaults.min_replicas);
    let max = overrides.max.unwrap_or(defaults.max_replicas);
    let cpu = overrides
        .cpu_threshold_percentage
        .unwrap_or(defaults.cpu_threshold_percentage);

    if min < 1 || min > max {
        return Err(Error::ReplicaBounds { min, max });
    }
    if !(1..=100).contains(&cpu) {
        return Err(Error::CpuThreshold(cpu));
    }
    Ok((min, max, cpu))
}

fn image(config: &AppConfig, request: &DeploymentRequest) -> String {
    if request.version.is_empty() {
        config.image.clone()
    } else {
        format!("{}:{}", config.image, request.version)
    }
}

fn http_probe(probe: &Option<app_config::Probe>, port: i32) -> Option<Probe> {
    probe.as_ref().map(|probe| Probe {
        http_get: Some(HTTPGetAction {
            path: Some(probe.path.clone()),
            port: IntOrString::Int(port),
            ..HTTPGetAction::default()
        }),
        initial_delay_seconds: Some(20),
        timeout_seconds: Some(1),
        ..Probe::default()
    })
}

fn deployment(config: &AppConfig, request: &DeploymentRequest, env: Vec<EnvVar>) -> Deployment {
    let app_labels = labels(&[("app", request.application.as_str())]);
    let port = i32::from(config.port);
    let healthcheck = config.healthcheck.clone().unwrap_or_default();

    let container = Container {
        name: request.application.clone(),
        image: Some(image(config, request)),
        ports: Some(vec![ContainerPort {
            name: Some(PORT_NAME.to_string()),
            container_port: port,
            protocol: Some("TCP".to_string()),
            ..ContainerPort::default()
        }]),
        env: Some(env),
        liveness_probe: http_probe(&healthcheck.liveness, port),
        readiness_probe: http_probe(&healthcheck.readiness, port),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ..Container::default()
    };

    Deployment {
        metadata: object_meta(&request.application, &request.namespace, app_labels.clone()),
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(app_labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(object_meta(&request.application, &request.namespace, app_labels)),
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some("Always".to_string()),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

fn service(config: &AppConfig, request: &DeploymentRequest) -> Service {
    let app_labels = labels(&[("app", request.application.as_str())]);

    Service {
        metadata: object_meta(&request.application, &request.namespace, app_labels.clone()),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(app_labels),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(i32::from(config.port))),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

fn ingress(request: &DeploymentRequest, cluster_subdomain: &str) -> Ingress {
    let ingress_labels = labels(&[
        ("app", request.application.as_str()),
        ("environment", request.environment.as_str()),
        ("zone", request.zone.as_str()),
    ]);

    Ingress {
        metadata: object_meta(&request.application, &request.namespace, ingress_labels),
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(format!("{}.{}", request.application, cluster_subdomain)),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: request.application.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(SERVICE_PORT),
                                    ..ServiceBackendPort::default()
                                }),
                            }),
                            ..IngressBackend::default()
                        },
                    }],
                }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

fn autoscaler(request: &DeploymentRequest, min_replicas: i32, max_replicas: i32, cpu_threshold: i32) -> HorizontalPodAutoscaler {
    HorizontalPodAutoscaler {
        metadata: object_meta(
            &request.application,
            &request.namespace,
            labels(&[("app", request.application.as_str())]),
        ),
        spec: Some(HorizontalPodAutoscalerSpec {
            min_replicas: Some(min_replicas),
            max_replicas,
            target_cpu_utilization_percentage: Some(cpu_threshold),
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: request.application.clone(),
            },
        }),
        ..HorizontalPodAutoscaler::default()
    }
}
