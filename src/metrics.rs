use prometheus::{Opts, IntCounterVec, Registry};

use lazy_static::lazy_static;
use kube::Error;

pub const METRICS_NAMESPACE: &str = "naisd";

lazy_static! {
    pub static ref DEPLOYMENTS: IntCounterVec = IntCounterVec::new(
      Opts::new("deployments", "naisd deployment requests by result")
      .namespace(METRICS_NAMESPACE),
      &["result"]
    ).unwrap();
    pub static ref KUBE_ERRORS: IntCounterVec = IntCounterVec::new(
      Opts::new("kube_errors", "naisd k8s related errors")
      .namespace(METRICS_NAMESPACE),
      &["action", "kube_name"]
    ).unwrap();
    pub static ref ERRORS: IntCounterVec = IntCounterVec::new(
      Opts::new("errors", "naisd errors by pipeline stage")
      .namespace(METRICS_NAMESPACE),
      &["stage"]
    ).unwrap();
}

pub fn custom_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
  registry.register(Box::new(DEPLOYMENTS.clone()))?;
  registry.register(Box::new(KUBE_ERRORS.clone()))?;
  registry.register(Box::new(ERRORS.clone()))?;
  Ok(())
}

pub fn kube_error_name(err: &Error) -> &'static str {
  match err {
    Error::Api(_) => "api",
    Error::SerdeError(_) => "serde_error",
    _ => "client_error",
  }
}

pub fn kube_error_happened(action: &str, err: &Error) {
  KUBE_ERRORS.with_label_values(&[action, kube_error_name(err)]).inc_by(1);
}

pub fn error_happened(stage: &str) {
  ERRORS.with_label_values(&[stage]).inc_by(1);
}

pub fn deployment_finished(success: bool) {
  let result = if success { "success" } else { "failure" };
  DEPLOYMENTS.with_label_values(&[result]).inc_by(1);
}
