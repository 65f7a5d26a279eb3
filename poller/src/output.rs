use std::io::{self, Write};

use crate::sqs::ReceivedMessage;

/// Printed instead of message lines when the receive call came back empty.
pub const NO_MESSAGES: &str = "No messages received!";

pub fn message_line(body: &str) -> String {
    format!("Message '{body}' received!")
}

/// Writes one line per message, in the order given, or the no-messages notice.
pub fn print_messages<W: Write>(out: &mut W, messages: &[ReceivedMessage]) -> io::Result<()> {
    if messages.is_empty() {
        writeln!(out, "{NO_MESSAGES}")?;
    } else {
        for m in messages {
            writeln!(out, "{}", message_line(&m.body))?;
        }
    }
    out.flush()
}
