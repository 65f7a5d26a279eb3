use std::io;
use std::process::ExitCode;

use clap::Parser;
use sqs_poller::cli::{self, Args};
use sqs_poller::config::build_sqs_client;
use sqs_poller::error::PollError;
use sqs_poller::logging;
use sqs_poller::poll::{self, PollReport};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Arity is checked before anything touches the network.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => return ExitCode::from(cli::report_parse_error(&err)),
    };

    logging::init();

    match run(&args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            error!("{:#}", anyhow::Error::new(err));
            ExitCode::from(code)
        }
    }
}

async fn run(args: &Args) -> Result<PollReport, PollError> {
    let cfg = cli::merged_config(args).map_err(PollError::Config)?;
    let client = build_sqs_client(&cfg).await.map_err(PollError::Config)?;

    info!(
        region = %cfg.runtime.region,
        queue = %args.queue_name,
        mode = ?cfg.runtime.mode,
        endpoint = %cfg.sqs.endpoint_url.as_deref().unwrap_or("default"),
        credentials = ?cfg.credential_source(),
        wait = cfg.recv.wait_time_secs,
        delete = cfg.recv.delete_after_read,
        on_error = ?cfg.recv.on_error,
        "polling"
    );

    let mut stdout = io::stdout();
    poll::run_once(&client, &args.queue_name, &cfg.recv, &mut stdout).await
}
