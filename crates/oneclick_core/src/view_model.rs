use crate::{Theme, UploadStatus};

/// Everything a front end needs to draw the upload page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub status: UploadStatus,
    pub file_name: Option<String>,
    pub message: String,
    pub job_id: Option<String>,
    pub report_url: Option<String>,
    pub can_select: bool,
    pub can_submit: bool,
    pub username: Option<String>,
    pub theme: Theme,
    pub backend_url: String,
    pub dirty: bool,
}
