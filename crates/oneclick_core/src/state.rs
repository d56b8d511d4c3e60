use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::view_model::AppViewModel;
use crate::{BackendEndpoints, Settings};

pub(crate) const MSG_UPLOADING: &str = "Uploading...";
pub(crate) const MSG_PROCESSING: &str = "Processing started - generating report...";
pub(crate) const MSG_ASSUMED_READY: &str = "Done - open the report when ready";
pub(crate) const MSG_CONFIRMED_READY: &str = "Report ready";
pub(crate) const MSG_NO_JOB_ID: &str = "Upload finished - check backend logs";
pub(crate) const MSG_UNUSABLE_JOB_ID: &str = "Backend returned an unusable job id - check backend logs";
pub(crate) const MSG_UPLOAD_FAILED: &str = "Upload failed - see log";
pub(crate) const MSG_STATUS_FAILED: &str = "Status check failed - see log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl UploadStatus {
    /// A request is in flight; selection and submission are blocked.
    pub fn is_busy(self) -> bool {
        matches!(self, UploadStatus::Uploading | UploadStatus::Processing)
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadStatus::Idle => "Idle",
            UploadStatus::Uploading => "Uploading",
            UploadStatus::Processing => "Processing",
            UploadStatus::Ready => "Ready",
            UploadStatus::Failed => "Failed",
        }
    }
}

/// A locally chosen dataset file. The core never reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
    name: String,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// How the client decides that a job's report can be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessPolicy {
    /// Expose the report link as soon as a job id comes back.
    #[default]
    AssumeReady,
    /// Ask `GET /status/{job_id}` until the job is done or failed.
    Poll { interval: Duration, max_attempts: u32 },
}

/// Job state as reported by the backend's status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobState {
    Queued,
    Processing,
    Done,
    Failed { error: Option<String> },
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    settings: Settings,
    policy: ReadinessPolicy,
    selected_file: Option<FileHandle>,
    status: UploadStatus,
    /// Backend captured at submit time; later settings changes do not apply
    /// to the job already in flight.
    active_backend: Option<BackendEndpoints>,
    job_id: Option<String>,
    report_url: Option<Url>,
    message: String,
    polls_made: u32,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            status: self.status,
            file_name: self.selected_file.as_ref().map(|f| f.name().to_string()),
            message: self.message.clone(),
            job_id: self.job_id.clone(),
            report_url: self.report_url.as_ref().map(Url::to_string),
            can_select: !self.status.is_busy(),
            can_submit: self.selected_file.is_some() && !self.status.is_busy(),
            username: self.settings.username.clone(),
            theme: self.settings.theme,
            backend_url: self.settings.backend.base().to_string(),
            dirty: self.dirty,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn policy(&self) -> ReadinessPolicy {
        self.policy
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn report_url(&self) -> Option<&Url> {
        self.report_url.as_ref()
    }

    pub fn selected_file(&self) -> Option<&FileHandle> {
        self.selected_file.as_ref()
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn settings_mut(&mut self) -> &mut Settings {
        self.dirty = true;
        &mut self.settings
    }

    pub(crate) fn replace_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.mark_dirty();
    }

    /// Stores the file and starts a fresh cycle. Caller checks `is_busy`.
    pub(crate) fn select_file(&mut self, file: FileHandle) {
        self.message = format!("Selected {}", file.name());
        self.selected_file = Some(file);
        self.status = UploadStatus::Idle;
        self.active_backend = None;
        self.job_id = None;
        self.report_url = None;
        self.polls_made = 0;
        self.mark_dirty();
    }

    /// Moves to `Uploading` and returns the file to send, or `None` when the
    /// preconditions for submitting do not hold.
    pub(crate) fn begin_upload(&mut self) -> Option<(FileHandle, Url)> {
        if self.status.is_busy() {
            return None;
        }
        let file = self.selected_file.clone()?;
        let backend = self.settings.backend.clone();
        let endpoint = backend.upload_url();
        self.active_backend = Some(backend);
        self.status = UploadStatus::Uploading;
        self.job_id = None;
        self.report_url = None;
        self.polls_made = 0;
        self.message = MSG_UPLOADING.to_string();
        self.mark_dirty();
        Some((file, endpoint))
    }

    pub(crate) fn start_processing(&mut self, job_id: String) {
        self.status = UploadStatus::Processing;
        self.job_id = Some(job_id);
        self.message = MSG_PROCESSING.to_string();
        self.mark_dirty();
    }

    /// Derives the report URL from the active job. No-op without a job id.
    pub(crate) fn mark_ready(&mut self, message: &str) {
        let Some(job_id) = self.job_id.as_deref() else {
            return;
        };
        let backend = self
            .active_backend
            .as_ref()
            .unwrap_or(&self.settings.backend);
        let report_url = match backend.report_url(job_id) {
            Ok(url) => url,
            Err(_) => {
                self.fail(MSG_UNUSABLE_JOB_ID);
                return;
            }
        };
        self.report_url = Some(report_url);
        self.status = UploadStatus::Ready;
        self.message = message.to_string();
        self.mark_dirty();
    }

    /// Terminal failure; the selection is dropped so retrying needs a new one.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = UploadStatus::Failed;
        self.report_url = None;
        self.selected_file = None;
        self.message = message.into();
        self.mark_dirty();
    }

    /// Builds the next status request, or `None` once the budget is spent.
    pub(crate) fn next_poll(&mut self) -> Option<(String, Url, Duration)> {
        let ReadinessPolicy::Poll {
            interval,
            max_attempts,
        } = self.policy
        else {
            return None;
        };
        if self.polls_made >= max_attempts.max(1) {
            return None;
        }
        let job_id = self.job_id.clone()?;
        let backend = self
            .active_backend
            .as_ref()
            .unwrap_or(&self.settings.backend);
        let endpoint = backend.status_url(&job_id).ok()?;
        self.polls_made += 1;
        Some((job_id, endpoint, interval))
    }

    pub(crate) fn polls_made(&self) -> u32 {
        self.polls_made
    }

    /// True when `job_id` is the job this session is currently waiting on.
    pub(crate) fn is_waiting_on(&self, job_id: &str) -> bool {
        self.status == UploadStatus::Processing && self.job_id.as_deref() == Some(job_id)
    }
}
