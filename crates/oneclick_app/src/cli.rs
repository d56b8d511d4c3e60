use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use oneclick_core::Theme;

#[derive(Parser, Debug)]
#[command(
    name = "oneclick",
    version,
    about = "Upload a dataset for one-click analysis and get its report"
)]
pub struct Cli {
    /// Settings file holding username, theme and backend URL.
    #[arg(long, global = true, default_value = ".oneclick_settings.ron")]
    pub settings: PathBuf,
    /// Backend base URL for this run only; the saved setting is left alone.
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,
    /// Also write logs to ./oneclick.log.
    #[arg(long, global = true)]
    pub log_file: bool,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a CSV/XLSX/JSON file and print the report link.
    Upload(UploadArgs),
    /// Print the report URL for a job id.
    ReportUrl { job_id: String },
    /// Ask the backend for the state of a job.
    Status { job_id: String },
    /// Save the report of a job to disk.
    Download {
        job_id: String,
        #[arg(long, default_value = "reports", value_name = "DIR")]
        out: PathBuf,
    },
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    pub file: PathBuf,
    /// Poll the backend until the report is actually done.
    #[arg(long)]
    pub wait: bool,
    #[arg(long, default_value_t = 2000, value_name = "MS")]
    pub poll_interval_ms: u64,
    #[arg(long, default_value_t = 30)]
    pub max_polls: u32,
    /// Download the finished report into DIR.
    #[arg(long, value_name = "DIR", requires = "wait")]
    pub download: Option<PathBuf>,
    /// Give up on a request after SECS seconds (default: wait forever).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the current settings.
    Show,
    SetUser { name: String },
    ClearUser,
    Theme {
        #[arg(value_enum)]
        theme: ThemeArg,
    },
    /// Save the backend base URL.
    Backend { url: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}
