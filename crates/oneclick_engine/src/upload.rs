use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::{EngineEvent, FailureKind, Stage, TransferError, TransferProgress, UploadReceipt};

const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub connect_timeout: Duration,
    /// Whole-request deadline. `None` waits for the backend indefinitely.
    pub request_timeout: Option<Duration>,
    pub max_upload_bytes: u64,
    pub max_report_bytes: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            max_upload_bytes: 50 * 1024 * 1024,
            max_report_bytes: 20 * 1024 * 1024,
        }
    }
}

impl TransferSettings {
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, TransferError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.connect_timeout);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| TransferError::new(FailureKind::Network, err.to_string()))
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: TransferProgress);
}

/// Sink for callers that do not display progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _progress: TransferProgress) {}
}

pub(crate) struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub(crate) fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, progress: TransferProgress) {
        let _ = self.tx.send(EngineEvent::Progress(progress));
    }
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Sends `file` as the single multipart field `file`. One request per call.
    async fn upload(
        &self,
        endpoint: &Url,
        file: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<UploadReceipt, TransferError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestUploader {
    settings: TransferSettings,
}

impl ReqwestUploader {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(
        &self,
        endpoint: &Url,
        file: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<UploadReceipt, TransferError> {
        let metadata = tokio::fs::metadata(file)
            .await
            .map_err(|err| io_error(file, err))?;
        if !metadata.is_file() {
            return Err(TransferError::new(
                FailureKind::Io,
                format!("{} is not a regular file", file.display()),
            ));
        }
        let total = metadata.len();
        if total > self.settings.max_upload_bytes {
            return Err(TransferError::new(
                FailureKind::TooLarge {
                    max_bytes: self.settings.max_upload_bytes,
                    actual: Some(total),
                },
                "file too large to upload",
            ));
        }

        let handle = tokio::fs::File::open(file)
            .await
            .map_err(|err| io_error(file, err))?;
        let sent = Arc::new(AtomicU64::new(0));
        let counter = sent.clone();
        let stream = ReaderStream::new(handle).map(move |chunk: std::io::Result<Bytes>| {
            if let Ok(bytes) = &chunk {
                counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
            }
            chunk
        });

        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_for_path(file);
        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|err| TransferError::new(FailureKind::Network, err.to_string()))?;
        let form = Form::new().part(FILE_FIELD, part);

        sink.emit(TransferProgress {
            stage: Stage::Uploading,
            bytes: 0,
            total: Some(total),
        });

        let client = self.settings.build_client()?;
        let response = client
            .post(endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let sent = sent.load(Ordering::Relaxed);
        if sent != total {
            engine_warn!(
                "Upload of {} sent {} bytes, expected {}",
                file.display(),
                sent,
                total
            );
        }
        sink.emit(TransferProgress {
            stage: Stage::AwaitingResponse,
            bytes: sent,
            total: Some(total),
        });

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let receipt = parse_upload_response(&body)?;
        engine_debug!(
            "Upload accepted: job_id={:?} message={:?}",
            receipt.job_id,
            receipt.message
        );
        sink.emit(TransferProgress {
            stage: Stage::Done,
            bytes: sent,
            total: Some(total),
        });
        Ok(receipt)
    }
}

/// Reads `{ "job_id": ..., "message": ... }`; both fields are optional.
///
/// Numeric job ids are accepted and turned into strings. Anything that is not
/// a JSON object is an invalid response.
pub fn parse_upload_response(body: &[u8]) -> Result<UploadReceipt, TransferError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| TransferError::new(FailureKind::InvalidResponse, err.to_string()))?;
    let object = value.as_object().ok_or_else(|| {
        TransferError::new(FailureKind::InvalidResponse, "expected a JSON object")
    })?;

    let job_id = match object.get("job_id") {
        Some(serde_json::Value::String(id)) => Some(id.clone()),
        Some(serde_json::Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
    .filter(|id| !id.trim().is_empty());
    let message = object
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned);

    Ok(UploadReceipt { job_id, message })
}

/// MIME type sent with the multipart part, chosen from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn io_error(path: &Path, err: std::io::Error) -> TransferError {
    TransferError::new(FailureKind::Io, format!("{}: {err}", path.display()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return TransferError::new(FailureKind::InvalidResponse, err.to_string());
    }
    TransferError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_job_id_is_none() {
        assert_eq!(parse_upload_response(b"{}").unwrap().job_id, None);
        assert_eq!(
            parse_upload_response(br#"{"job_id": "  "}"#).unwrap().job_id,
            None
        );
        assert_eq!(
            parse_upload_response(br#"{"job_id": null}"#).unwrap().job_id,
            None
        );
    }

    #[test]
    fn job_id_is_kept_verbatim() {
        let receipt = parse_upload_response(br#"{"job_id": " abc "}"#).unwrap();
        assert_eq!(receipt.job_id.as_deref(), Some(" abc "));
    }

    #[test]
    fn numeric_job_id_is_stringified() {
        let receipt = parse_upload_response(br#"{"job_id": 42}"#).unwrap();
        assert_eq!(receipt.job_id.as_deref(), Some("42"));
    }

    #[test]
    fn non_object_body_is_invalid() {
        let err = parse_upload_response(b"[1,2]").unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidResponse);
        let err = parse_upload_response(b"<html>").unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidResponse);
    }

    #[test]
    fn mime_follows_extension_case_insensitively() {
        assert_eq!(mime_for_path(Path::new("sales.CSV")), "text/csv");
        assert_eq!(mime_for_path(Path::new("a.json")), "application/json");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }
}
