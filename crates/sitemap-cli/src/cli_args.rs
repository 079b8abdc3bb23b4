use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};
use sitemap_core::RunRequest;

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "catalog-sitemap", version, about = "Google sitemap generator", long_about = None)]
pub struct Cli {
    /// Locale, for example it-IT (defaults to the configured locale).
    #[arg(value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Directory to save sitemap to, for example /home/user/sitemap
    #[arg(short = 'd', long = "dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub dir: Option<String>,

    /// List of recipients to send sitemap to, for example "a@example.com, b@example.com"
    #[arg(short = 'r', long = "recipients", value_name = "EMAILS")]
    pub recipients: Option<String>,

    /// Configuration file to use instead of the per-user config.toml.
    #[arg(short = 'c', long = "config", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Log to stderr only; skip the persistent log file.
    #[arg(long = "no-log-file", action = ArgAction::SetTrue)]
    pub no_log_file: bool,
}

impl Cli {
    pub fn to_request(&self) -> RunRequest {
        RunRequest {
            locale: self.locale.clone(),
            dir: self.dir.clone(),
            recipients: self.recipients.clone(),
        }
    }
}
