use std::io::Write;

use anyhow::{Result, ensure};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::PollError;
use crate::output;
use crate::sqs::{QueueService, ReceiveRequest, ReceivedMessage};

/// SQS caps a single receive at 10 messages.
pub const MAX_BATCH: i32 = 10;
/// Longest long-poll window SQS accepts.
pub const MAX_WAIT_SECS: i32 = 20;
/// 12 hours, the SQS upper bound.
pub const MAX_VISIBILITY_TIMEOUT_SECS: i32 = 43_200;

/// What to do when the queue cannot be resolved or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Surface the failure and exit non-zero.
    #[default]
    FailFast,
    /// Print the error text as if it were a received message and exit 0.
    DegradeToMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub max_messages: i32,
    pub visibility_timeout_secs: i32,
    pub wait_time_secs: i32,
    pub delete_after_read: bool,
    pub on_error: ErrorPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH,
            visibility_timeout_secs: 15,
            wait_time_secs: MAX_WAIT_SECS,
            delete_after_read: true,
            on_error: ErrorPolicy::FailFast,
        }
    }
}

impl PollSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_BATCH).contains(&self.max_messages),
            "max_messages must be between 1 and {MAX_BATCH} (got {})",
            self.max_messages
        );
        ensure!(
            (0..=MAX_WAIT_SECS).contains(&self.wait_time_secs),
            "wait_time_secs must be between 0 and {MAX_WAIT_SECS} (got {})",
            self.wait_time_secs
        );
        ensure!(
            (0..=MAX_VISIBILITY_TIMEOUT_SECS).contains(&self.visibility_timeout_secs),
            "visibility_timeout_secs must be between 0 and {MAX_VISIBILITY_TIMEOUT_SECS} (got {})",
            self.visibility_timeout_secs
        );
        Ok(())
    }

    pub fn receive_request(&self) -> ReceiveRequest {
        ReceiveRequest {
            max_messages: self.max_messages,
            visibility_timeout_secs: self.visibility_timeout_secs,
            wait_time_secs: self.wait_time_secs,
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// `None` when resolution failed and the failure was degraded.
    pub queue_url: Option<String>,
    pub messages: Vec<ReceivedMessage>,
    pub deleted: usize,
    pub delete_failures: usize,
    /// The printed message is a stand-in for an error, not queue content.
    pub degraded: bool,
}

/// Resolves `queue_name`, receives one batch, prints it to `out` and, if
/// enabled, deletes every printed message by its receipt handle.
///
/// Delete failures are logged and counted; they never abort the run.
pub async fn run_once<S, W>(
    service: &S,
    queue_name: &str,
    settings: &PollSettings,
    out: &mut W,
) -> Result<PollReport, PollError>
where
    S: QueueService + ?Sized,
    W: Write,
{
    let resolved = match service.get_queue_url(queue_name).await {
        Ok(url) => Ok(url),
        // Fail-fast errors are logged once, by the caller that turns them into an exit code.
        Err(source) => match settings.on_error {
            ErrorPolicy::FailFast => {
                return Err(PollError::Resolve {
                    queue: queue_name.to_string(),
                    source,
                });
            }
            ErrorPolicy::DegradeToMessage => {
                warn!(queue = queue_name, "Failed to resolve the queue: {source:#}");
                Err(source)
            }
        },
    };

    let (queue_url, messages, degraded) = match resolved {
        Ok(url) => {
            let request = settings.receive_request();
            debug!(queue_url = %url, ?request, "receiving");
            match service.receive_messages(&url, request).await {
                Ok(messages) => (Some(url), messages, false),
                Err(source) => match settings.on_error {
                    ErrorPolicy::FailFast => {
                        return Err(PollError::Receive {
                            queue_url: url,
                            source,
                        });
                    }
                    ErrorPolicy::DegradeToMessage => {
                        warn!(queue_url = %url, "Failed to receive the message: {source:#}");
                        let body = format!("{source:#}");
                        (Some(url), vec![ReceivedMessage::synthetic(body)], true)
                    }
                },
            }
        }
        Err(source) => (
            None,
            vec![ReceivedMessage::synthetic(format!("{source:#}"))],
            true,
        ),
    };

    output::print_messages(out, &messages)?;

    let mut report = PollReport {
        queue_url,
        messages,
        deleted: 0,
        delete_failures: 0,
        degraded,
    };

    if !settings.delete_after_read || report.degraded {
        return Ok(report);
    }
    let Some(url) = report.queue_url.as_deref() else {
        return Ok(report);
    };

    for m in &report.messages {
        let mid = m.message_id.as_deref().unwrap_or("unknown");
        let Some(rh) = m.receipt_handle.as_deref() else {
            warn!(message_id = mid, "missing receipt_handle; cannot delete");
            continue;
        };
        match service.delete_message(url, rh).await {
            Ok(()) => {
                debug!(message_id = mid, "deleted");
                report.deleted += 1;
            }
            Err(err) => {
                warn!(message_id = mid, "failed to delete message: {err:#}");
                report.delete_failures += 1;
            }
        }
    }

    info!(
        received = report.messages.len(),
        deleted = report.deleted,
        delete_failures = report.delete_failures,
        "poll complete"
    );
    Ok(report)
}
