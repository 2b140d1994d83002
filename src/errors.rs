use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed deployment request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error("Invalid deployment request: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with status {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Unable to decode app config: {0}")]
    ConfigDecode(#[source] serde_yaml::Error),

    #[error("Unable to decode registry response for '{alias}': {source}")]
    RegistryDecode {
        alias: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to resolve secret '{key}' of '{alias}': {reason}")]
    Secret { alias: String, key: String, reason: String },

    #[error("Environment variable {name} is provided by both {first} and {second}")]
    DuplicateEnvVar { name: String, first: String, second: String },

    #[error("Invalid replica bounds: min {min}, max {max}")]
    ReplicaBounds { min: i32, max: i32 },

    #[error("Invalid CPU threshold: {0}%, expected 1 to 100")]
    CpuThreshold(i32),

    #[error("Failed to apply {kind} after [{}]: {source}", .applied.join(", "))]
    Apply {
        kind: &'static str,
        applied: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("Kube API Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Key '{0}' is empty")]
    MissingKey(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors caused by the caller's payload, reported with a 400.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MalformedRequest(_) | Error::Validation(_))
    }

    /// Pipeline stage the error originated from, used as a metrics label.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::MalformedRequest(_) => "decode",
            Error::Validation(_) => "validation",
            Error::ConfigDecode(_) => "config",
            Error::Transport { .. } | Error::UpstreamStatus { .. } => "fetch",
            Error::RegistryDecode { .. } => "registry",
            Error::Secret { .. } => "secret",
            Error::DuplicateEnvVar { .. } | Error::ReplicaBounds { .. } | Error::CpuThreshold(_) => "synthesis",
            Error::Apply { .. } | Error::KubeError(_) | Error::MissingKey(_) => "apply",
            Error::InvalidConfig(_) | Error::Io(_) => "startup",
        }
    }
}
