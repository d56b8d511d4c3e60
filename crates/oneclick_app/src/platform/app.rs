use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use engine_logging::{engine_error, engine_info};
use oneclick_core::{
    update, AppState, BackendEndpoints, FileHandle, Msg, ReadinessPolicy, Settings, UploadStatus,
};
use oneclick_engine::{EngineHandle, TransferSettings};

use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::persistence::{RonSettingsStore, SettingsStore};
use super::render;
use crate::cli::{Cli, Command, SettingsCommand, UploadArgs};

pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    logging::initialize(destination, cli.verbose);

    let store = RonSettingsStore::new(cli.settings.clone());
    let settings = session_settings(store.load(), cli.backend.as_deref(), &cli.command)?;

    let transfer = match &cli.command {
        Command::Upload(args) => TransferSettings {
            request_timeout: args.timeout.map(Duration::from_secs),
            ..TransferSettings::default()
        },
        _ => TransferSettings::default(),
    };
    let engine = EngineHandle::new(transfer).context("start transfer engine")?;
    let runner = EffectRunner::new(engine, Box::new(store));
    let stdout = io::stdout();

    match cli.command {
        Command::Upload(args) => {
            let policy = readiness_policy(&args);
            let mut controller = Controller::new(runner, settings, policy, stdout.lock());
            controller.print_banner()?;
            let status = controller.upload(FileHandle::new(&args.file))?;
            if status != UploadStatus::Ready {
                return Ok(ExitCode::FAILURE);
            }
            if let Some(dir) = &args.download {
                return controller.download_current_report(dir);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ReportUrl { job_id } => {
            writeln!(stdout.lock(), "{}", settings.backend.report_url(&job_id)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { job_id } => {
            let endpoint = settings.backend.status_url(&job_id)?;
            match runner.query_status(&job_id, endpoint) {
                Some(Ok(state)) => {
                    writeln!(stdout.lock(), "job {job_id}: {state:?}")?;
                    Ok(ExitCode::SUCCESS)
                }
                Some(Err(err)) => {
                    engine_error!("Status check for job {} failed: {}", job_id, err);
                    Ok(ExitCode::FAILURE)
                }
                None => bail!("transfer engine stopped"),
            }
        }
        Command::Download { job_id, out } => {
            let url = settings.backend.report_url(&job_id)?;
            match runner.download_report(&job_id, url, &out) {
                Some(Ok(path)) => {
                    writeln!(stdout.lock(), "saved {}", path.display())?;
                    Ok(ExitCode::SUCCESS)
                }
                Some(Err(err)) => {
                    engine_error!("Download of job {} failed: {}", job_id, err);
                    Ok(ExitCode::FAILURE)
                }
                None => bail!("transfer engine stopped"),
            }
        }
        Command::Settings(command) => {
            let mut controller = Controller::new(
                runner,
                settings,
                ReadinessPolicy::AssumeReady,
                stdout.lock(),
            );
            controller.apply_settings_command(command)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Settings the session runs with. A `--backend` override applies to this run
/// only, so commands that save settings keep working on the stored ones.
fn session_settings(
    mut stored: Settings,
    backend: Option<&str>,
    command: &Command,
) -> Result<Settings> {
    match (backend, command) {
        (Some(_), Command::Settings(_)) => {
            engine_info!("Ignoring --backend for a settings command");
        }
        (Some(raw), _) => stored.backend = BackendEndpoints::parse(raw)?,
        (None, _) => {}
    }
    Ok(stored)
}

fn readiness_policy(args: &UploadArgs) -> ReadinessPolicy {
    if args.wait {
        ReadinessPolicy::Poll {
            interval: Duration::from_millis(args.poll_interval_ms),
            max_attempts: args.max_polls,
        }
    } else {
        ReadinessPolicy::AssumeReady
    }
}

/// Owns the upload session and drives it with messages from the user and
/// the engine.
pub(crate) struct Controller<W: Write> {
    state: AppState,
    runner: EffectRunner,
    out: W,
}

impl<W: Write> Controller<W> {
    pub(crate) fn new(
        runner: EffectRunner,
        settings: Settings,
        policy: ReadinessPolicy,
        out: W,
    ) -> Self {
        let state = AppState::new().with_policy(policy);
        let (mut state, _effects) = update(state, Msg::RestoreSettings(settings));
        state.consume_dirty();
        Self { state, runner, out }
    }

    pub(crate) fn state(&self) -> &AppState {
        &self.state
    }

    pub(crate) fn print_banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", render::banner(&self.state.view()))
    }

    pub(crate) fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;
        self.runner.run(effects);

        if was_dirty {
            for line in render::render(&view) {
                writeln!(self.out, "{line}")?;
            }
        }
        Ok(())
    }

    /// Selects and submits `file`, then waits for the session to settle.
    pub(crate) fn upload(&mut self, file: FileHandle) -> Result<UploadStatus> {
        self.dispatch(Msg::FileSelected(file))?;
        self.dispatch(Msg::SubmitClicked)?;
        while self.state.status().is_busy() {
            let Some(msg) = self.runner.next_msg() else {
                bail!("transfer engine stopped before the upload settled");
            };
            self.dispatch(msg)?;
        }
        engine_info!(
            "Upload settled: status={} job_id={:?}",
            self.state.status().label(),
            self.state.job_id()
        );
        Ok(self.state.status())
    }

    pub(crate) fn download_current_report(&mut self, dir: &std::path::Path) -> Result<ExitCode> {
        let (Some(job_id), Some(url)) = (self.state.job_id(), self.state.report_url()) else {
            bail!("no report to download");
        };
        match self.runner.download_report(job_id, url.clone(), dir) {
            Some(Ok(path)) => {
                writeln!(self.out, "  saved: {}", path.display())?;
                Ok(ExitCode::SUCCESS)
            }
            Some(Err(err)) => {
                engine_error!("Download of job {} failed: {}", job_id, err);
                Ok(ExitCode::FAILURE)
            }
            None => bail!("transfer engine stopped"),
        }
    }

    pub(crate) fn apply_settings_command(&mut self, command: SettingsCommand) -> Result<()> {
        let msg = match command {
            SettingsCommand::Show => None,
            SettingsCommand::SetUser { name } => Some(Msg::UsernameChanged(name)),
            SettingsCommand::ClearUser => Some(Msg::UsernameCleared),
            SettingsCommand::Theme { theme } => Some(Msg::ThemeChanged(theme.into())),
            SettingsCommand::Backend { url } => {
                Some(Msg::BackendChanged(BackendEndpoints::parse(&url)?))
            }
        };
        if let Some(msg) = msg {
            self.dispatch(msg)?;
        }
        for line in render::settings_lines(self.state.settings()) {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use oneclick_core::Theme;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::cli::ThemeArg;
    use crate::platform::persistence::tests::MemorySettingsStore;

    fn controller(
        backend: &str,
        policy: ReadinessPolicy,
        store: MemorySettingsStore,
    ) -> Controller<Vec<u8>> {
        engine_logging::initialize_for_tests();
        let engine = EngineHandle::new(TransferSettings::default()).unwrap();
        let runner = EffectRunner::new(engine, Box::new(store));
        let settings = Settings {
            backend: BackendEndpoints::parse(backend).unwrap(),
            ..Settings::default()
        };
        Controller::new(runner, settings, policy, Vec::new())
    }

    fn dataset(dir: &TempDir, name: &str) -> FileHandle {
        let path = dir.path().join(name);
        fs::write(&path, "region,amount\nnorth,10\n").unwrap();
        FileHandle::new(path)
    }

    fn output(controller: &Controller<Vec<u8>>) -> String {
        String::from_utf8(controller.out.clone()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sales_upload_ends_ready_with_report_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-42"})))
            .expect(1)
            .mount(&server)
            .await;
        let uri = server.uri();

        let (status, state, out) = tokio::task::spawn_blocking(move || {
            let dir = TempDir::new().unwrap();
            let mut controller = controller(
                &uri,
                ReadinessPolicy::AssumeReady,
                MemorySettingsStore::default(),
            );
            let status = controller.upload(dataset(&dir, "sales.csv")).unwrap();
            let out = output(&controller);
            (status, controller.state().clone(), out)
        })
        .await
        .unwrap();

        assert_eq!(status, UploadStatus::Ready);
        let expected = format!("{}/processed/job-42/report.html", server.uri());
        assert_eq!(state.report_url().map(|u| u.as_str()), Some(expected.as_str()));
        assert!(out.contains("[Uploading] Uploading..."));
        assert!(out.contains(&format!("  report: {expected}")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bad_upload_without_job_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        let uri = server.uri();

        let state = tokio::task::spawn_blocking(move || {
            let dir = TempDir::new().unwrap();
            let mut controller = controller(
                &uri,
                ReadinessPolicy::AssumeReady,
                MemorySettingsStore::default(),
            );
            controller.upload(dataset(&dir, "bad.csv")).unwrap();
            controller.state().clone()
        })
        .await
        .unwrap();

        assert_eq!(state.status(), UploadStatus::Failed);
        assert_eq!(state.report_url(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiting_polls_until_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-5"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status/job-5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "done"})))
            .expect(1)
            .mount(&server)
            .await;
        let uri = server.uri();

        let state = tokio::task::spawn_blocking(move || {
            let dir = TempDir::new().unwrap();
            let policy = ReadinessPolicy::Poll {
                interval: Duration::from_millis(10),
                max_attempts: 3,
            };
            let mut controller = controller(&uri, policy, MemorySettingsStore::default());
            controller.upload(dataset(&dir, "sales.csv")).unwrap();
            controller.state().clone()
        })
        .await
        .unwrap();

        assert_eq!(state.status(), UploadStatus::Ready);
        assert_eq!(state.job_id(), Some("job-5"));
    }

    #[test]
    fn unreachable_backend_fails_and_keeps_report_unset() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(
            "http://127.0.0.1:1",
            ReadinessPolicy::AssumeReady,
            MemorySettingsStore::default(),
        );

        let file = dataset(&dir, "sales.csv");

        let (status, records) =
            engine_logging::capture_records(|| controller.upload(file).unwrap());

        assert_eq!(status, UploadStatus::Failed);
        assert_eq!(controller.state().report_url(), None);
        assert!(output(&controller).contains("[Failed] Upload failed - see log"));
        let errors: Vec<_> = records
            .iter()
            .filter(|(level, _)| *level == log::Level::Error)
            .collect();
        assert_eq!(errors.len(), 1, "{records:?}");
        assert!(errors[0].1.starts_with("Upload failed"));
    }

    #[test]
    fn settings_commands_save_only_on_change() {
        let store = MemorySettingsStore::default();
        let saved = store.saved.clone();
        let mut controller = controller(
            "http://localhost:8000",
            ReadinessPolicy::AssumeReady,
            store,
        );

        for command in [
            SettingsCommand::Theme {
                theme: ThemeArg::Dark,
            },
            SettingsCommand::Theme {
                theme: ThemeArg::Dark,
            },
            SettingsCommand::SetUser {
                name: "ana".to_string(),
            },
            SettingsCommand::Show,
        ] {
            controller.apply_settings_command(command).unwrap();
        }

        let saved = saved.borrow();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].theme, Theme::Dark);
        assert_eq!(saved[0].username, None);
        assert_eq!(saved[1].username.as_deref(), Some("ana"));
        assert!(output(&controller).contains("username: ana"));
        assert!(output(&controller).contains("theme:    dark"));
    }

    #[test]
    fn backend_override_is_not_saved_by_settings_commands() {
        engine_logging::initialize_for_tests();
        let stored = Settings {
            backend: BackendEndpoints::parse("http://saved:8000").unwrap(),
            ..Settings::default()
        };
        let store = MemorySettingsStore {
            initial: stored.clone(),
            ..MemorySettingsStore::default()
        };
        let saved = store.saved.clone();
        let command = Command::Settings(SettingsCommand::Show);

        let settings =
            session_settings(store.load(), Some("http://override:9999"), &command).unwrap();
        let engine = EngineHandle::new(TransferSettings::default()).unwrap();
        let runner = EffectRunner::new(engine, Box::new(store));
        let mut controller =
            Controller::new(runner, settings, ReadinessPolicy::AssumeReady, Vec::new());
        controller
            .apply_settings_command(SettingsCommand::SetUser {
                name: "ana".to_string(),
            })
            .unwrap();

        let saved = saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].username.as_deref(), Some("ana"));
        assert_eq!(saved[0].backend, stored.backend);
    }

    #[test]
    fn backend_override_applies_to_other_commands() {
        let command = Command::ReportUrl {
            job_id: "job-42".to_string(),
        };
        let settings =
            session_settings(Settings::default(), Some("http://override:9999"), &command).unwrap();
        assert_eq!(settings.backend.base().as_str(), "http://override:9999/");

        let bad = session_settings(Settings::default(), Some("ftp://x"), &command);
        assert!(bad.is_err());
    }

    #[test]
    fn invalid_backend_setting_is_rejected_without_saving() {
        let store = MemorySettingsStore::default();
        let saved = store.saved.clone();
        let mut controller = controller(
            "http://localhost:8000",
            ReadinessPolicy::AssumeReady,
            store,
        );

        let result = controller.apply_settings_command(SettingsCommand::Backend {
            url: "ftp://files".to_string(),
        });

        assert!(result.is_err());
        assert!(saved.borrow().is_empty());
    }
}
