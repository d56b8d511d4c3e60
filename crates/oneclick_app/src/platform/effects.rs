use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use oneclick_core::{Effect, Msg, RemoteJobState};
use oneclick_engine::{EngineEvent, EngineHandle, JobState, TransferError};
use url::Url;

use super::persistence::SettingsStore;

/// Executes controller effects and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    store: Box<dyn SettingsStore>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, store: Box<dyn SettingsStore>) -> Self {
        Self { engine, store }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload { file, endpoint } => {
                    engine_info!("Upload file={} endpoint={}", file.path().display(), endpoint);
                    self.engine.upload(endpoint, file.path());
                }
                Effect::PollStatus {
                    job_id,
                    endpoint,
                    delay,
                } => {
                    engine_debug!("PollStatus job_id={} delay={:?}", job_id, delay);
                    self.engine.poll_status(job_id, endpoint, delay);
                }
                Effect::SaveSettings(settings) => {
                    if let Err(err) = self.store.save(&settings) {
                        engine_error!("Failed to save settings: {:#}", err);
                    }
                }
            }
        }
    }

    /// Blocks until the engine produces something the controller cares about.
    /// `None` once the engine is gone.
    pub fn next_msg(&self) -> Option<Msg> {
        loop {
            match self.engine.recv()? {
                EngineEvent::Progress(progress) => {
                    engine_debug!(
                        "{:?}: {} of {:?} bytes",
                        progress.stage,
                        progress.bytes,
                        progress.total
                    );
                }
                EngineEvent::UploadCompleted { result } => return Some(upload_msg(result)),
                EngineEvent::StatusReported { job_id, result } => {
                    return Some(match result {
                        Ok(state) => Msg::JobStatusReported {
                            job_id,
                            state: map_job_state(state),
                        },
                        Err(err) => {
                            engine_error!("Status check for job {} failed: {}", job_id, err);
                            Msg::JobStatusFailed {
                                job_id,
                                reason: err.to_string(),
                            }
                        }
                    });
                }
                EngineEvent::ReportDownloaded { job_id, .. } => {
                    engine_warn!("Ignoring report download for job {} outside a download", job_id);
                }
            }
        }
    }

    /// One-shot status request, outside the upload flow.
    pub fn query_status(&self, job_id: &str, endpoint: Url) -> Option<Result<JobState, TransferError>> {
        self.engine.poll_status(job_id, endpoint, Duration::ZERO);
        loop {
            if let EngineEvent::StatusReported { job_id: id, result } = self.engine.recv()? {
                if id == job_id {
                    return Some(result);
                }
            }
        }
    }

    pub fn download_report(
        &self,
        job_id: &str,
        url: Url,
        out_dir: &Path,
    ) -> Option<Result<PathBuf, TransferError>> {
        self.engine.download_report(job_id, url, out_dir);
        loop {
            if let EngineEvent::ReportDownloaded { job_id: id, result } = self.engine.recv()? {
                if id == job_id {
                    return Some(result);
                }
            }
        }
    }
}

fn upload_msg(result: Result<oneclick_engine::UploadReceipt, TransferError>) -> Msg {
    match result {
        Ok(receipt) => {
            if receipt.job_id.is_none() {
                engine_warn!(
                    "Upload response carried no job_id (message: {:?})",
                    receipt.message
                );
            }
            Msg::UploadSucceeded {
                job_id: receipt.job_id,
            }
        }
        Err(err) => {
            engine_error!("Upload failed: {}", err);
            Msg::UploadFailed {
                reason: err.to_string(),
            }
        }
    }
}

fn map_job_state(state: JobState) -> RemoteJobState {
    match state {
        JobState::Queued => RemoteJobState::Queued,
        JobState::Processing => RemoteJobState::Processing,
        JobState::Done => RemoteJobState::Done,
        JobState::Failed { error } => RemoteJobState::Failed { error },
        JobState::Unknown(text) => RemoteJobState::Unknown(text),
    }
}
