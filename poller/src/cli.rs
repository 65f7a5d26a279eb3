use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;

use crate::config::AppConfig;
use crate::error::USAGE_EXIT_CODE;
use crate::poll::ErrorPolicy;

/// Printed to stdout, in this order, whenever the arguments don't parse.
pub const USAGE_LINES: [&str; 2] = ["Invalid program arguments!", "Usage: <queue_name>"];

/// Receive up to one batch from an SQS queue, print it and delete what was printed.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqs-poll", version)]
pub struct Args {
    /// Name of the queue to poll
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub queue_name: String,

    /// Path to a TOML config (defaults to ./sqs-poller.toml when present)
    #[arg(long)]
    pub config: Option<String>,

    /// AWS region (default us-east-1)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom SQS endpoint, e.g. http://localhost:4566 for LocalStack
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Messages to request, 1..=10
    #[arg(long)]
    pub max_messages: Option<i32>,

    /// Seconds received messages stay hidden from other consumers
    #[arg(long = "visibility-timeout")]
    pub visibility_timeout_secs: Option<i32>,

    /// Long-poll wait for this receive call, 0..=20 seconds
    #[arg(long = "wait-time")]
    pub wait_time_secs: Option<i32>,

    /// Do not delete messages after printing them (observe redelivery)
    #[arg(long)]
    pub no_delete: bool,

    /// What to do when the queue can't be resolved or read
    #[arg(long, value_enum)]
    pub on_error: Option<ErrorPolicy>,
}

impl Args {
    /// Flags win over every configuration layer.
    pub fn apply_overrides(&self, cfg: &mut AppConfig) {
        if let Some(region) = &self.region {
            cfg.runtime.region = region.clone();
        }
        if let Some(ep) = &self.endpoint_url {
            cfg.sqs.endpoint_url = Some(ep.clone());
        }
        if let Some(n) = self.max_messages {
            cfg.recv.max_messages = n;
        }
        if let Some(secs) = self.visibility_timeout_secs {
            cfg.recv.visibility_timeout_secs = secs;
        }
        if let Some(secs) = self.wait_time_secs {
            cfg.recv.wait_time_secs = secs;
        }
        if self.no_delete {
            cfg.recv.delete_after_read = false;
        }
        if let Some(policy) = self.on_error {
            cfg.recv.on_error = policy;
        }
    }
}

/// Merge file + env + flags into a validated AppConfig.
pub fn merged_config(args: &Args) -> Result<AppConfig> {
    let mut cfg = AppConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

pub fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    for line in USAGE_LINES {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// Reports a parse failure and returns the exit status for it.
///
/// `--help` and `--version` are not failures and exit 0. Anything else prints
/// clap's diagnostic to stderr and the fixed usage lines to stdout.
pub fn report_parse_error(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            0
        }
        _ => {
            eprintln!("{}", err.render());
            let _ = write_usage(&mut io::stdout());
            USAGE_EXIT_CODE
        }
    }
}
