// Message-bus subscriber - Feeds vehicle telemetry messages into ingestion
use crate::application::ingest_service::IngestService;
use crate::domain::error::IngestError;
use crate::domain::telemetry::WriteOutcome;
use crate::domain::validation::TelemetryPayload;
use bytes::Bytes;
use tokio_stream::{Stream, StreamExt};

/// Topic filter the subscriber listens on, `+` being the vehicle id segment
pub const TELEMETRY_TOPIC_FILTER: &str = "vehicles/+/telemetry";

#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Stored(WriteOutcome),
    IgnoredTopic,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberReport {
    pub inserted: u64,
    pub skipped: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Check a topic against [`TELEMETRY_TOPIC_FILTER`]
pub fn topic_matches(topic: &str) -> bool {
    let mut levels = topic.split('/');
    matches!(
        (levels.next(), levels.next(), levels.next(), levels.next()),
        (Some("vehicles"), Some(vehicle), Some("telemetry"), None) if !vehicle.is_empty()
    )
}

#[derive(Clone)]
pub struct BusSubscriber {
    ingest_service: IngestService,
}

impl BusSubscriber {
    pub fn new(ingest_service: IngestService) -> Self {
        Self { ingest_service }
    }

    /// Decode, validate and store one message. Bad messages are logged and dropped.
    pub async fn handle_message(&self, message: &BusMessage) -> MessageOutcome {
        if !topic_matches(&message.topic) {
            tracing::debug!("Ignoring message on unrelated topic {}", message.topic);
            return MessageOutcome::IgnoredTopic;
        }

        let payload: TelemetryPayload = match serde_json::from_slice(&message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Malformed telemetry on {}: {}", message.topic, e);
                return MessageOutcome::Rejected;
            }
        };

        match self.ingest_service.ingest(payload).await {
            Ok(outcome) => MessageOutcome::Stored(outcome),
            Err(IngestError::Validation(e)) => {
                tracing::warn!("Invalid telemetry on {}: {}", message.topic, e);
                MessageOutcome::Rejected
            }
            Err(IngestError::Store(e)) => {
                tracing::error!("Failed to store telemetry from {}: {}", message.topic, e);
                MessageOutcome::Failed
            }
        }
    }

    /// Drain the stream until it ends
    pub async fn run<S>(&self, messages: S) -> SubscriberReport
    where
        S: Stream<Item = BusMessage>,
    {
        tracing::info!("Subscribed to {}", TELEMETRY_TOPIC_FILTER);
        let mut report = SubscriberReport::default();
        tokio::pin!(messages);

        while let Some(message) = messages.next().await {
            match self.handle_message(&message).await {
                MessageOutcome::Stored(WriteOutcome::Inserted) => report.inserted += 1,
                MessageOutcome::Stored(WriteOutcome::Skipped) => report.skipped += 1,
                MessageOutcome::IgnoredTopic => report.ignored += 1,
                MessageOutcome::Rejected => report.rejected += 1,
                MessageOutcome::Failed => report.failed += 1,
            }
        }

        tracing::info!("Telemetry subscription ended: {:?}", report);
        report
    }
}
