use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::DomainId,
    protocol::{CommandRequest, CommandResponse, SelectDomainRequest, SelectDomainResponse},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

const SELECT_DOMAIN_PATH: &str = "prolog/select-domain";
const COMMAND_PATH: &str = "prolog/command";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine url is invalid: {0}")]
    InvalidBaseUrl(String),
    #[error("{0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("malformed engine response: {0}")]
    Malformed(String),
    #[error("engine did not answer within {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// The two remote calls the session makes against the evaluation engine.
#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn select_domain(&self, domain: &DomainId) -> Result<SelectDomainResponse, EngineError>;
    async fn evaluate(&self, command: &str) -> Result<CommandResponse, EngineError>;
}

pub struct HttpEngineClient {
    http: Client,
    base_url: Url,
}

impl HttpEngineClient {
    pub fn new(base_url: &str) -> Result<Self, EngineError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, EngineError> {
        let mut url = Url::parse(base_url.trim())
            .map_err(|err| EngineError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(EngineError::InvalidBaseUrl(format!(
                "{base_url}: engine url must start with http:// or https://"
            )));
        }
        // `Url::join` drops the last segment unless the path ends in '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self { http, base_url: url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, EngineError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| EngineError::InvalidBaseUrl(err.to_string()))?;
        debug!(%url, "engine request");
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| EngineError::Transport(err.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(EngineError::Status(status.as_u16()));
        }
        res.json::<R>()
            .await
            .map_err(|err| EngineError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn select_domain(&self, domain: &DomainId) -> Result<SelectDomainResponse, EngineError> {
        self.post_json(
            SELECT_DOMAIN_PATH,
            &SelectDomainRequest {
                domain: domain.clone(),
            },
        )
        .await
    }

    async fn evaluate(&self, command: &str) -> Result<CommandResponse, EngineError> {
        self.post_json(
            COMMAND_PATH,
            &CommandRequest {
                command: command.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
