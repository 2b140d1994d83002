use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::errors::Error;

/// A GET request issued by the config fetcher or the registry client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        FetchRequest {
            url: url.into(),
            ..FetchRequest::default()
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some((username.to_string(), password.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an `UpstreamStatus` error.
    pub fn success_or_err(self, url: &str) -> Result<Self, Error> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::UpstreamStatus {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// `HttpFetcher` backed by a shared `reqwest::Client`.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::InvalidConfig(format!("http client: {}", err)))?;
        Ok(ReqwestFetcher { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        debug!("GET {} {:?}", request.url, request.query);
        let transport = |err: reqwest::Error| Error::Transport {
            url: request.url.clone(),
            message: err.to_string(),
        };

        let mut builder = self.client.get(&request.url).query(&request.query);
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport)?;

        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}
