use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::engine_debug;
use url::Url;

use crate::upload::ChannelProgressSink;
use crate::{
    EngineEvent, ReportDownloader, ReqwestStatusClient, ReqwestUploader, StatusClient,
    TransferSettings, Uploader,
};

enum EngineCommand {
    Upload {
        endpoint: Url,
        path: PathBuf,
    },
    PollStatus {
        job_id: String,
        endpoint: Url,
        delay: Duration,
    },
    DownloadReport {
        job_id: String,
        url: Url,
        out_dir: PathBuf,
    },
}

struct Services {
    uploader: Arc<dyn Uploader>,
    status: Arc<dyn StatusClient>,
    reports: ReportDownloader,
}

/// Runs backend requests on a background tokio runtime.
///
/// Commands are fire-and-forget; each one yields exactly one completion
/// event (plus any progress events). In-flight requests cannot be cancelled.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: TransferSettings) -> io::Result<Self> {
        Self::with_clients(
            Arc::new(ReqwestUploader::new(settings.clone())),
            Arc::new(ReqwestStatusClient::new(settings.clone())),
            ReportDownloader::new(settings),
        )
    }

    pub fn with_clients(
        uploader: Arc<dyn Uploader>,
        status: Arc<dyn StatusClient>,
        reports: ReportDownloader,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("oneclick-engine")
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let services = Arc::new(Services {
            uploader,
            status,
            reports,
        });

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let services = services.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(&services, command, event_tx).await;
                });
            }
            // The handle is gone; abandon anything still in flight.
            runtime.shutdown_background();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn upload(&self, endpoint: Url, path: impl Into<PathBuf>) {
        let _ = self.cmd_tx.send(EngineCommand::Upload {
            endpoint,
            path: path.into(),
        });
    }

    pub fn poll_status(&self, job_id: impl Into<String>, endpoint: Url, delay: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::PollStatus {
            job_id: job_id.into(),
            endpoint,
            delay,
        });
    }

    pub fn download_report(
        &self,
        job_id: impl Into<String>,
        url: Url,
        out_dir: impl Into<PathBuf>,
    ) {
        let _ = self.cmd_tx.send(EngineCommand::DownloadReport {
            job_id: job_id.into(),
            url,
            out_dir: out_dir.into(),
        });
    }

    /// Blocks until the next event. `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    services: &Services,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let event = match command {
        EngineCommand::Upload { endpoint, path } => {
            engine_debug!("POST {} file={}", endpoint, path.display());
            let result = services.uploader.upload(&endpoint, &path, &sink).await;
            EngineEvent::UploadCompleted { result }
        }
        EngineCommand::PollStatus {
            job_id,
            endpoint,
            delay,
        } => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            engine_debug!("GET {} job_id={}", endpoint, job_id);
            let result = services.status.job_status(&endpoint).await;
            EngineEvent::StatusReported { job_id, result }
        }
        EngineCommand::DownloadReport {
            job_id,
            url,
            out_dir,
        } => {
            engine_debug!("GET {} -> {}", url, out_dir.display());
            let result = services
                .reports
                .download(&url, &job_id, &out_dir, &sink)
                .await;
            EngineEvent::ReportDownloaded { job_id, result }
        }
    };
    let _ = event_tx.send(event);
}
