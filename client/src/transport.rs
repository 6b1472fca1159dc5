//! HTTP transport to the sync server.
//!
//! [`SyncTransport`] is the seam the sync engine pushes and pulls
//! through; [`HttpTransport`] is the production implementation speaking
//! the server's JSON wire format over reqwest.

use async_trait::async_trait;
use baler_engine::{
    AuditLog, LoginRequest, LoginResponse, PullResponse, PushAck, Transaction, ValidateResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TransportError;

/// Wire operations a sync cycle needs from the server.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn pull_transactions(&self) -> Result<PullResponse<Transaction>, TransportError>;

    async fn push_transactions(&self, documents: &[Transaction])
        -> Result<PushAck, TransportError>;

    async fn pull_audits(&self) -> Result<PullResponse<AuditLog>, TransportError>;

    async fn push_audits(&self, documents: &[AuditLog]) -> Result<PushAck, TransportError>;
}

/// JSON-over-HTTP transport against a Baler sync server.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for `base_url`, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let base_url = normalize_endpoint(base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Exchange credentials for a session token.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, TransportError> {
        let endpoint = "/api/auth/login";
        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized);
        }
        Self::ensure_success(&response, endpoint)?;
        Ok(response.json().await?)
    }

    /// Check a previously issued token and recover its role.
    pub async fn validate(&self, token: &str) -> Result<ValidateResponse, TransportError> {
        let endpoint = "/api/auth/validate";
        let response = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        // An invalid token answers 401 with `{"valid": false}`; surface
        // that body rather than an error.
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(response.json().await?);
        }
        Self::ensure_success(&response, endpoint)?;
        Ok(response.json().await?)
    }

    async fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, TransportError> {
        let response = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .send()
            .await?;
        Self::ensure_success(&response, endpoint)?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, TransportError> {
        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::ensure_success(&response, endpoint)?;
        Ok(response.json().await?)
    }

    fn ensure_success(response: &reqwest::Response, endpoint: &str) -> Result<(), TransportError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn pull_transactions(&self) -> Result<PullResponse<Transaction>, TransportError> {
        self.get_json("/api/sync/pull").await
    }

    async fn push_transactions(
        &self,
        documents: &[Transaction],
    ) -> Result<PushAck, TransportError> {
        self.post_json("/api/sync/push", documents).await
    }

    async fn pull_audits(&self) -> Result<PullResponse<AuditLog>, TransportError> {
        self.get_json("/api/sync/audits").await
    }

    async fn push_audits(&self, documents: &[AuditLog]) -> Result<PushAck, TransportError> {
        self.post_json("/api/sync/audits", documents).await
    }
}

fn normalize_endpoint(raw: String) -> Result<String, TransportError> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(TransportError::InvalidEndpoint(
            "endpoint must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(TransportError::InvalidEndpoint(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
