use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::Message;

/// A single delivery taken off the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: Option<String>,
    pub body: String,
    /// Needed to acknowledge this particular delivery; `None` for synthetic messages.
    pub receipt_handle: Option<String>,
}

impl ReceivedMessage {
    pub fn new(message_id: Option<&str>, body: &str, receipt_handle: Option<&str>) -> Self {
        Self {
            message_id: message_id.map(str::to_string),
            body: body.to_string(),
            receipt_handle: receipt_handle.map(str::to_string),
        }
    }

    /// A message that never came from the queue, used to report a failure inline.
    pub fn synthetic(body: impl Into<String>) -> Self {
        Self {
            message_id: None,
            body: body.into(),
            receipt_handle: None,
        }
    }
}

impl From<&Message> for ReceivedMessage {
    fn from(m: &Message) -> Self {
        Self::new(m.message_id(), m.body().unwrap_or(""), m.receipt_handle())
    }
}

/// Parameters of one `ReceiveMessage` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_messages: i32,
    pub visibility_timeout_secs: i32,
    /// Long-poll window for this request only; the queue attribute is left alone.
    pub wait_time_secs: i32,
}

/// The three queue operations the poller needs.
#[async_trait]
pub trait QueueService: Send + Sync {
    async fn get_queue_url(&self, queue_name: &str) -> Result<String>;

    async fn receive_messages(
        &self,
        queue_url: &str,
        request: ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()>;
}

pub async fn get_queue_url(client: &Client, queue_name: &str) -> Result<String> {
    let out = client
        .get_queue_url()
        .queue_name(queue_name)
        .send()
        .await
        .with_context(|| format!("getting queue url for {queue_name}"))?;

    out.queue_url()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("queue url missing in response"))
}

#[async_trait]
impl QueueService for Client {
    async fn get_queue_url(&self, queue_name: &str) -> Result<String> {
        get_queue_url(self, queue_name).await
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        request: ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>> {
        let out = self
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(request.max_messages)
            .visibility_timeout(request.visibility_timeout_secs)
            .wait_time_seconds(request.wait_time_secs)
            .send()
            .await
            .with_context(|| format!("receiving messages from {queue_url}"))?;

        Ok(out.messages().iter().map(ReceivedMessage::from).collect())
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        self.delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .with_context(|| format!("deleting message from {queue_url}"))?;
        Ok(())
    }
}
