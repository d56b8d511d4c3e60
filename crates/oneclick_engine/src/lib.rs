//! One-click engine: HTTP transfers against the job-processing backend and
//! effect execution off the controller thread.
mod engine;
mod filename;
mod persist;
mod report;
mod status;
mod types;
mod upload;

pub use engine::EngineHandle;
pub use filename::report_filename;
pub use persist::{AtomicFileWriter, PersistError};
pub use report::ReportDownloader;
pub use status::{parse_job_state, ReqwestStatusClient, StatusClient};
pub use types::{
    EngineEvent, FailureKind, JobState, Stage, TransferError, TransferProgress, UploadReceipt,
};
pub use upload::{
    mime_for_path, parse_upload_response, NoProgress, ProgressSink, ReqwestUploader,
    TransferSettings, Uploader,
};
