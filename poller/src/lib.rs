//! Poll a single SQS queue once: resolve it, receive a bounded batch, print
//! every body and acknowledge what was printed.
//!
//! The `sqs-poll` binary wires these modules together; the library split
//! exists so the orchestration can be driven against an in-memory
//! [`sqs::QueueService`] in tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod poll;
pub mod sqs;
