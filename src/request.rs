use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Network segment an application is deployed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fss,
    Sbs,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Fss => "fss",
            Zone::Sbs => "sbs",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fss" => Ok(Zone::Fss),
            "sbs" => Ok(Zone::Sbs),
            _ => Err(Error::Validation(vec![ZONE_ENUM_VIOLATION.to_string()])),
        }
    }
}

const ZONE_ENUM_VIOLATION: &str = "Zone can only be fss or sbs";

/// Payload of `POST /deploy`.
///
/// Missing fields decode as empty strings so that they are reported by [`DeploymentRequest::validate`]
/// together with every other violation instead of failing the decode.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentRequest {
    pub application: String,
    pub version: String,
    pub environment: String,
    pub app_config_url: String,
    pub zone: String,
    pub namespace: String,
    pub username: String,
    pub password: String,
}

impl DeploymentRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(body).map_err(Error::MalformedRequest)
    }

    /// Collect every violation in the request. An empty list means the request is valid.
    pub fn validate(&self) -> Vec<String> {
        let required = [
            ("Application", &self.application),
            ("Environment", &self.environment),
            ("Zone", &self.zone),
            ("Namespace", &self.namespace),
            ("Username", &self.username),
            ("Password", &self.password),
            ("AppConfigUrl", &self.app_config_url),
        ];

        let mut violations: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| format!("{} is required and is empty", field))
            .collect();

        if self.zone.parse::<Zone>().is_err() {
            violations.push(ZONE_ENUM_VIOLATION.to_string());
        }

        violations
    }

    /// Zone of a request which has passed [`DeploymentRequest::validate`].
    pub fn zone(&self) -> Result<Zone, Error> {
        self.zone.parse()
    }
}
