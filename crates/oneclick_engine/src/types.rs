use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uploading,
    AwaitingResponse,
    Downloading,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub stage: Stage,
    pub bytes: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(TransferProgress),
    UploadCompleted {
        result: Result<UploadReceipt, TransferError>,
    },
    StatusReported {
        job_id: String,
        result: Result<JobState, TransferError>,
    },
    ReportDownloaded {
        job_id: String,
        result: Result<PathBuf, TransferError>,
    },
}

/// Parsed body of a successful `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadReceipt {
    /// `None` when the field is missing or empty.
    pub job_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Processing,
    Done,
    Failed { error: Option<String> },
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Io,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    HttpStatus(u16),
    Timeout,
    InvalidResponse,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Io => write!(f, "io error"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
