use url::Url;

use crate::upload::map_reqwest_error;
use crate::{FailureKind, JobState, TransferError, TransferSettings};

#[async_trait::async_trait]
pub trait StatusClient: Send + Sync {
    async fn job_status(&self, endpoint: &Url) -> Result<JobState, TransferError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestStatusClient {
    settings: TransferSettings,
}

impl ReqwestStatusClient {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl StatusClient for ReqwestStatusClient {
    async fn job_status(&self, endpoint: &Url) -> Result<JobState, TransferError> {
        let client = self.settings.build_client()?;
        let response = client
            .get(endpoint.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        parse_job_state(&body)
    }
}

/// Reads the `status` field of a job record, plus `error` for failed jobs.
pub fn parse_job_state(body: &[u8]) -> Result<JobState, TransferError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| TransferError::new(FailureKind::InvalidResponse, err.to_string()))?;
    let Some(status) = value.get("status").and_then(serde_json::Value::as_str) else {
        return Err(TransferError::new(
            FailureKind::InvalidResponse,
            "missing `status` field",
        ));
    };

    let state = match status.trim().to_ascii_lowercase().as_str() {
        "queued" | "pending" => JobState::Queued,
        "processing" | "running" => JobState::Processing,
        "done" | "completed" | "finished" => JobState::Done,
        "failed" | "error" => JobState::Failed {
            error: value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(ToOwned::to_owned),
        },
        _ => JobState::Unknown(status.to_string()),
    };
    Ok(state)
}
