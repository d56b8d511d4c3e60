use crate::{BackendEndpoints, FileHandle, RemoteJobState, Settings, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a dataset file.
    FileSelected(FileHandle),
    /// User asked to upload the selected file.
    SubmitClicked,
    /// Backend answered the upload with a parsed JSON body.
    UploadSucceeded { job_id: Option<String> },
    /// Upload could not be sent or its response could not be read.
    UploadFailed { reason: String },
    /// Backend reported the state of a job we are waiting on.
    JobStatusReported {
        job_id: String,
        state: RemoteJobState,
    },
    /// Status request for a job failed at the transport level.
    JobStatusFailed { job_id: String, reason: String },
    /// Restore settings loaded at start.
    RestoreSettings(Settings),
    UsernameChanged(String),
    UsernameCleared,
    ThemeChanged(Theme),
    BackendChanged(BackendEndpoints),
    /// Fallback for placeholder wiring.
    NoOp,
}
