use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::errors::ApiError;
use crate::models::{AdminCredentials, RemoteQuiz};

const DEFAULT_REJECTION: &str = "Login Failed";

#[derive(Debug, Deserialize)]
struct AdminFetchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<RemoteQuiz>>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the remote admin endpoint that hands out quiz definitions
#[derive(Clone)]
pub struct AdminSyncClient {
    client: Client,
    endpoint: String,
}

impl AdminSyncClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Log in with admin credentials and download every quiz the account can see.
    ///
    /// A refusal from the remote side becomes [`ApiError::SyncRejected`]; a
    /// transport or decoding problem becomes [`ApiError::SyncError`].
    pub async fn fetch_quizzes(&self, credentials: &AdminCredentials) -> Result<Vec<RemoteQuiz>> {
        info!(endpoint = %self.endpoint, "Requesting quizzes from admin endpoint");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %self.endpoint, error = %e, "Admin sync request failed");
                ApiError::SyncError(e.to_string())
            })?;

        let status = response.status();
        let body: AdminFetchResponse = response.json().await.map_err(|e| {
            error!(status = %status, error = %e, "Admin sync response could not be decoded");
            ApiError::SyncError(e.to_string())
        })?;

        if !status.is_success() || !body.success {
            let message = body
                .error
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
            warn!(status = %status, error = %message, "Admin endpoint rejected sync");
            return Err(ApiError::SyncRejected(message).into());
        }

        let quizzes = body.data.unwrap_or_default();
        info!(quiz_count = quizzes.len(), "Admin sync download completed");
        Ok(quizzes)
    }
}
