use oneclick_core::{BackendEndpoints, DEFAULT_BACKEND_URL};

#[test]
fn default_backend_is_localhost() {
    let endpoints = BackendEndpoints::default();
    assert_eq!(endpoints.base().as_str(), DEFAULT_BACKEND_URL);
    assert_eq!(
        endpoints.upload_url().as_str(),
        "http://localhost:8000/upload"
    );
}

#[test]
fn report_url_joins_host_and_job() {
    let endpoints = BackendEndpoints::parse("http://localhost:8000").unwrap();
    assert_eq!(
        endpoints.report_url("abc123").unwrap().as_str(),
        "http://localhost:8000/processed/abc123/report.html"
    );
    assert_eq!(
        endpoints.status_url("abc123").unwrap().as_str(),
        "http://localhost:8000/status/abc123"
    );
}

#[test]
fn base_path_prefix_is_kept() {
    let with_slash = BackendEndpoints::parse("https://example.com/analysis/").unwrap();
    let without_slash = BackendEndpoints::parse("https://example.com/analysis").unwrap();
    for endpoints in [with_slash, without_slash] {
        assert_eq!(
            endpoints.report_url("job-42").unwrap().as_str(),
            "https://example.com/analysis/processed/job-42/report.html"
        );
    }
}

#[test]
fn slashes_in_job_id_are_encoded() {
    let endpoints = BackendEndpoints::default();
    assert_eq!(
        endpoints.report_url("a/b").unwrap().as_str(),
        "http://localhost:8000/processed/a%2Fb/report.html"
    );
}

#[test]
fn garbage_is_rejected() {
    assert!(BackendEndpoints::parse("not a url").is_err());
}

#[test]
fn percent_encoded_dots_stay_in_the_path() {
    let endpoints = BackendEndpoints::default();
    assert_eq!(
        endpoints.report_url("%2e%2e").unwrap().as_str(),
        "http://localhost:8000/processed/%252e%252e/report.html"
    );
}
