use oneclick_core::{AppViewModel, Settings, UploadStatus};

/// Status lines for the current upload session; empty while there is
/// nothing to say yet.
pub fn render(view: &AppViewModel) -> Vec<String> {
    if view.message.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("[{}] {}", view.status.label(), view.message)];
    if let Some(job_id) = &view.job_id {
        if view.status == UploadStatus::Processing {
            lines.push(format!("  job: {job_id}"));
        }
    }
    if let Some(url) = &view.report_url {
        lines.push(format!("  report: {url}"));
    }
    lines
}

pub fn banner(view: &AppViewModel) -> String {
    match &view.username {
        Some(user) => format!("One Click Analysis | {} | signed in as {user}", view.backend_url),
        None => format!("One Click Analysis | {}", view.backend_url),
    }
}

pub fn settings_lines(settings: &Settings) -> Vec<String> {
    vec![
        format!(
            "username: {}",
            settings.username.as_deref().unwrap_or("(not set)")
        ),
        format!("theme:    {}", settings.theme),
        format!("backend:  {}", settings.backend.base()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneclick_core::Theme;

    fn view(status: UploadStatus, message: &str) -> AppViewModel {
        AppViewModel {
            status,
            message: message.to_string(),
            backend_url: "http://localhost:8000/".to_string(),
            ..AppViewModel::default()
        }
    }

    #[test]
    fn nothing_to_show_before_any_message() {
        assert!(render(&view(UploadStatus::Idle, "")).is_empty());
    }

    #[test]
    fn ready_view_shows_report_link() {
        let mut ready = view(UploadStatus::Ready, "Done - open the report when ready");
        ready.job_id = Some("job-42".to_string());
        ready.report_url = Some("http://localhost:8000/processed/job-42/report.html".to_string());

        assert_eq!(
            render(&ready),
            vec![
                "[Ready] Done - open the report when ready".to_string(),
                "  report: http://localhost:8000/processed/job-42/report.html".to_string(),
            ]
        );
    }

    #[test]
    fn processing_view_names_the_job() {
        let mut processing = view(UploadStatus::Processing, "Processing started");
        processing.job_id = Some("job-7".to_string());
        assert_eq!(render(&processing)[1], "  job: job-7");
    }

    #[test]
    fn banner_mentions_user_when_signed_in() {
        let mut signed_in = view(UploadStatus::Idle, "");
        assert_eq!(banner(&signed_in), "One Click Analysis | http://localhost:8000/");
        signed_in.username = Some("ana".to_string());
        assert!(banner(&signed_in).ends_with("signed in as ana"));
    }

    #[test]
    fn settings_show_defaults() {
        let lines = settings_lines(&Settings {
            theme: Theme::Dark,
            ..Settings::default()
        });
        assert_eq!(lines[0], "username: (not set)");
        assert_eq!(lines[1], "theme:    dark");
        assert_eq!(lines[2], "backend:  http://localhost:8000/");
    }
}
