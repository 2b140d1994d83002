use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::EnvVar,
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};

pub fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

/// Name of the environment variable carrying `key` of the resource `alias`,
/// e.g. `appdb` + `url` becomes `APPDB_URL`.
pub fn env_var_name(alias: &str, key: &str) -> String {
    format!("{}_{}", alias, key)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn object_meta(name: &str, namespace: &str, labels: BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels),
        ..ObjectMeta::default()
    }
}

/// Render the action trail returned by `POST /deploy`.
pub fn result_text(actions: &[String]) -> String {
    actions.iter().fold(String::from("result: \n"), |mut text, action| {
        text.push_str("- ");
        text.push_str(action);
        text.push('\n');
        text
    })
}
