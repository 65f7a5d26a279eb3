use thiserror::Error;

/// Exit status for argument errors; also used by [`crate::cli`].
pub const USAGE_EXIT_CODE: u8 = 1;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("configuration error")]
    Config(#[source] anyhow::Error),

    #[error("failed to resolve queue url for '{queue}'")]
    Resolve {
        queue: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to receive messages from {queue_url}")]
    Receive {
        queue_url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}

impl PollError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PollError::Config(_) => 2,
            PollError::Resolve { .. } => 3,
            PollError::Receive { .. } => 4,
            PollError::Output(_) => 5,
        }
    }
}
