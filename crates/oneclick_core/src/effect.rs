use std::time::Duration;

use url::Url;

use crate::{FileHandle, Settings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the file as multipart field `file` to `endpoint`.
    Upload { file: FileHandle, endpoint: Url },
    /// Ask the backend for the job state after waiting `delay`.
    PollStatus {
        job_id: String,
        endpoint: Url,
        delay: Duration,
    },
    /// Persist the settings; emitted only when a value actually changed.
    SaveSettings(Settings),
}
