//! Global command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{load_settings, validated, ClientSettings, SettingsError};

#[derive(Debug, Parser)]
#[command(name = "cbfsclient")]
#[command(about = "Command-line client for a cbfs cluster", long_about = None)]
pub struct Cli {
    /// Number of upload workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Couchbase URL for direct configuration access (empty: use HTTP)
    #[arg(long)]
    pub couchbase: Option<String>,

    /// Couchbase bucket
    #[arg(long)]
    pub bucket: Option<String>,

    /// Number of old revisions to keep (-1 == all)
    #[arg(long, allow_negative_numbers = true)]
    pub revs: Option<i32>,

    /// Cluster base URL for getconf/setconf over HTTP
    #[arg(long)]
    pub url: Option<String>,

    /// Connect timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// TOML file with default settings
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Command followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "CMD")]
    pub args: Vec<String>,
}

impl Cli {
    /// Merge defaults, the optional settings file and explicit flags.
    pub fn resolve_settings(&self) -> Result<ClientSettings, SettingsError> {
        let mut settings = match &self.settings {
            Some(path) => load_settings(path)?,
            None => ClientSettings::default(),
        };

        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(couchbase) = &self.couchbase {
            settings.couchbase = couchbase.clone();
        }
        if let Some(bucket) = &self.bucket {
            settings.bucket = bucket.clone();
        }
        if let Some(revs) = self.revs {
            settings.revs = revs;
        }
        if let Some(url) = &self.url {
            settings.url = url.clone();
        }
        if let Some(secs) = self.connect_timeout {
            settings.timeouts.connect_secs = secs;
        }
        if let Some(secs) = self.timeout {
            settings.timeouts.request_secs = secs;
        }

        validated(settings)
    }
}
