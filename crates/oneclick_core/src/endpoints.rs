use thiserror::Error;
use url::Url;

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid backend url: {0}")]
    Parse(#[from] url::ParseError),
    #[error("backend url must use http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("job id `{0}` cannot be used as a url path segment")]
    UnaddressableJobId(String),
}

/// URLs of the job-processing backend, all derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    base: Url,
}

impl BackendEndpoints {
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        Self::from_url(Url::parse(raw.trim())?)
    }

    pub fn from_url(base: Url) -> Result<Self, EndpointError> {
        match base.scheme() {
            "http" | "https" => Ok(Self { base }),
            other => Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn upload_url(&self) -> Url {
        self.join(&["upload"])
    }

    pub fn status_url(&self, job_id: &str) -> Result<Url, EndpointError> {
        Ok(self.join(&["status", addressable(job_id)?]))
    }

    /// `{base}/processed/{job_id}/report.html`.
    ///
    /// The job id is opaque; it is percent-encoded as a single path segment
    /// so it can never leave the `processed/` prefix. `.` and `..` are
    /// rejected since URL parsing removes them even when percent-encoded.
    pub fn report_url(&self, job_id: &str) -> Result<Url, EndpointError> {
        Ok(self.join(&["processed", addressable(job_id)?, "report.html"]))
    }

    /// Whether `job_id` survives as its own path segment.
    pub fn is_addressable(job_id: &str) -> bool {
        addressable(job_id).is_ok()
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // http(s) URLs always have a path, so this cannot fail.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn addressable(job_id: &str) -> Result<&str, EndpointError> {
    match job_id {
        "" | "." | ".." => Err(EndpointError::UnaddressableJobId(job_id.to_string())),
        _ => Ok(job_id),
    }
}

impl Default for BackendEndpoints {
    fn default() -> Self {
        let base = Url::parse(DEFAULT_BACKEND_URL).expect("default backend url is valid");
        Self { base }
    }
}
