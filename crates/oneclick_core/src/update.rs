use crate::state::{
    MSG_ASSUMED_READY, MSG_CONFIRMED_READY, MSG_NO_JOB_ID, MSG_STATUS_FAILED,
    MSG_UNUSABLE_JOB_ID, MSG_UPLOAD_FAILED,
};
use crate::{
    AppState, BackendEndpoints, Effect, Msg, ReadinessPolicy, RemoteJobState, UploadStatus,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => {
            if state.status().is_busy() {
                return (state, Vec::new());
            }
            state.select_file(file);
            Vec::new()
        }
        Msg::SubmitClicked => match state.begin_upload() {
            Some((file, endpoint)) => vec![Effect::Upload { file, endpoint }],
            None => Vec::new(),
        },
        Msg::UploadSucceeded { job_id } => {
            if state.status() != UploadStatus::Uploading {
                return (state, Vec::new());
            }
            match job_id.filter(|id| !id.trim().is_empty()) {
                Some(job_id) if !BackendEndpoints::is_addressable(&job_id) => {
                    state.fail(MSG_UNUSABLE_JOB_ID);
                    Vec::new()
                }
                Some(job_id) => {
                    state.start_processing(job_id);
                    match state.policy() {
                        ReadinessPolicy::AssumeReady => {
                            state.mark_ready(MSG_ASSUMED_READY);
                            Vec::new()
                        }
                        ReadinessPolicy::Poll { .. } => poll_or_give_up(&mut state),
                    }
                }
                None => {
                    state.fail(MSG_NO_JOB_ID);
                    Vec::new()
                }
            }
        }
        Msg::UploadFailed { reason: _ } => {
            // The runner already logged the reason; the view only gets the notice.
            if state.status() == UploadStatus::Uploading {
                state.fail(MSG_UPLOAD_FAILED);
            }
            Vec::new()
        }
        Msg::JobStatusReported { job_id, state: job } => {
            if !state.is_waiting_on(&job_id) {
                return (state, Vec::new());
            }
            match job {
                RemoteJobState::Done => {
                    state.mark_ready(MSG_CONFIRMED_READY);
                    Vec::new()
                }
                RemoteJobState::Failed { error } => {
                    let message = match error.as_deref().map(last_line) {
                        Some(line) if !line.is_empty() => format!("Processing failed: {line}"),
                        _ => "Processing failed - check backend logs".to_string(),
                    };
                    state.fail(message);
                    Vec::new()
                }
                RemoteJobState::Queued
                | RemoteJobState::Processing
                | RemoteJobState::Unknown(_) => poll_or_give_up(&mut state),
            }
        }
        Msg::JobStatusFailed { job_id, reason: _ } => {
            if state.is_waiting_on(&job_id) {
                state.fail(MSG_STATUS_FAILED);
            }
            Vec::new()
        }
        Msg::RestoreSettings(settings) => {
            state.replace_settings(settings);
            Vec::new()
        }
        Msg::UsernameChanged(name) => {
            let name = name.trim();
            let next = (!name.is_empty()).then(|| name.to_string());
            if state.settings().username == next {
                return (state, Vec::new());
            }
            state.settings_mut().username = next;
            vec![Effect::SaveSettings(state.settings().clone())]
        }
        Msg::UsernameCleared => {
            if state.settings().username.is_none() {
                return (state, Vec::new());
            }
            state.settings_mut().username = None;
            vec![Effect::SaveSettings(state.settings().clone())]
        }
        Msg::ThemeChanged(theme) => {
            if state.settings().theme == theme {
                return (state, Vec::new());
            }
            state.settings_mut().theme = theme;
            vec![Effect::SaveSettings(state.settings().clone())]
        }
        Msg::BackendChanged(backend) => {
            if state.settings().backend == backend {
                return (state, Vec::new());
            }
            state.settings_mut().backend = backend;
            vec![Effect::SaveSettings(state.settings().clone())]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn poll_or_give_up(state: &mut AppState) -> Vec<Effect> {
    match state.next_poll() {
        Some((job_id, endpoint, delay)) => vec![Effect::PollStatus {
            job_id,
            endpoint,
            delay,
        }],
        None => {
            let checks = state.polls_made();
            state.fail(format!("Report not ready after {checks} checks"));
            Vec::new()
        }
    }
}

/// Backends tend to send tracebacks; the last line carries the actual error.
fn last_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("")
}
