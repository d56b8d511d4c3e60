use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use url::Url;

use crate::upload::map_reqwest_error;
use crate::{
    report_filename, AtomicFileWriter, FailureKind, ProgressSink, Stage, TransferError,
    TransferProgress, TransferSettings,
};

/// Fetches a finished report and stores it under an output directory.
#[derive(Debug, Clone, Default)]
pub struct ReportDownloader {
    settings: TransferSettings,
}

impl ReportDownloader {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings }
    }

    /// Downloads `url` into `out_dir/{report_filename(job_id)}` and returns the path.
    ///
    /// The file only appears once the whole body has been received.
    pub async fn download(
        &self,
        url: &Url,
        job_id: &str,
        out_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf, TransferError> {
        let max_bytes = self.settings.max_report_bytes;
        let client = self.settings.build_client()?;
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let total = response.content_length();
        if let Some(len) = total {
            if len > max_bytes {
                return Err(too_large(max_bytes, len));
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            body.extend_from_slice(&chunk);
            sink.emit(TransferProgress {
                stage: Stage::Downloading,
                bytes: body.len() as u64,
                total,
            });
        }

        sink.emit(TransferProgress {
            stage: Stage::Writing,
            bytes: body.len() as u64,
            total,
        });
        let writer = AtomicFileWriter::new(out_dir.to_path_buf());
        let path = writer
            .write(&report_filename(job_id), &body)
            .map_err(|err| TransferError::new(FailureKind::Io, err.to_string()))?;
        sink.emit(TransferProgress {
            stage: Stage::Done,
            bytes: body.len() as u64,
            total,
        });
        Ok(path)
    }
}

fn too_large(max_bytes: u64, actual: u64) -> TransferError {
    TransferError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "report too large",
    )
}
