// MQTT bus adapter - Broker connection feeding the subscriber and publishing commands
use crate::application::command_service::CommandPublisher;
use crate::domain::command::{Command, CommandMessage, command_topic};
use crate::domain::error::CommandError;
use crate::infrastructure::bus_subscriber::{BusMessage, TELEMETRY_TOPIC_FILTER};
use crate::infrastructure::config::BusSettings;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Clone)]
pub struct MqttCommandPublisher {
    client: AsyncClient,
}

#[async_trait]
impl CommandPublisher for MqttCommandPublisher {
    async fn publish(&self, vehicle_id: &str, command: Command) -> Result<(), CommandError> {
        let payload = serde_json::to_vec(&CommandMessage { command })
            .map_err(|e| CommandError::Publish(e.to_string()))?;

        // Queue without waiting so a dead broker cannot stall the HTTP handler
        self.client
            .try_publish(command_topic(vehicle_id), QoS::AtLeastOnce, false, payload)
            .map_err(|e| CommandError::Publish(e.to_string()))
    }
}

/// Connect to the broker described by `settings`.
///
/// Returns the command publisher and the stream of incoming telemetry messages.
/// The event loop runs on its own task, reconnects after failures and
/// re-subscribes on every new session. It stops once the stream is dropped.
pub fn connect(settings: &BusSettings) -> (MqttCommandPublisher, ReceiverStream<BusMessage>) {
    let mut options = MqttOptions::new(settings.client_id.clone(), settings.host.clone(), settings.port);
    options.set_keep_alive(settings.keep_alive());

    let (client, event_loop) = AsyncClient::new(options, settings.channel_capacity);
    let (tx, rx) = mpsc::channel(settings.channel_capacity);

    tracing::info!(
        "Connecting to MQTT broker at {}:{} for {}",
        settings.host,
        settings.port,
        TELEMETRY_TOPIC_FILTER
    );
    tokio::spawn(drive_event_loop(
        client.clone(),
        event_loop,
        tx,
        settings.reconnect_delay(),
    ));

    (MqttCommandPublisher { client }, ReceiverStream::new(rx))
}

async fn drive_event_loop(
    client: AsyncClient,
    mut event_loop: EventLoop,
    tx: mpsc::Sender<BusMessage>,
    reconnect_delay: Duration,
) {
    loop {
        let event = tokio::select! {
            _ = tx.closed() => {
                tracing::info!("Telemetry subscriber gone, closing MQTT event loop");
                return;
            }
            event = event_loop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("Connected to MQTT broker");
                if let Err(e) = client.try_subscribe(TELEMETRY_TOPIC_FILTER, QoS::AtLeastOnce) {
                    tracing::error!("Failed to subscribe to {}: {}", TELEMETRY_TOPIC_FILTER, e);
                }
            }
            Ok(event) => {
                if let Some(message) = incoming_message(event) {
                    if tx.send(message).await.is_err() {
                        tracing::info!("Telemetry subscriber gone, closing MQTT event loop");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "MQTT connection error: {}; retrying in {:?}",
                    e,
                    reconnect_delay
                );
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

/// Incoming publishes become bus messages; everything else is protocol chatter
fn incoming_message(event: Event) -> Option<BusMessage> {
    match event {
        Event::Incoming(Packet::Publish(publish)) => {
            Some(BusMessage::new(publish.topic, publish.payload))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::Publish;

    fn unreachable_broker() -> BusSettings {
        BusSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            reconnect_delay_ms: 50,
            ..BusSettings::default()
        }
    }

    #[test]
    fn test_incoming_publish_becomes_bus_message() {
        let publish = Publish::new("vehicles/veh-001/telemetry", QoS::AtLeastOnce, b"{}".to_vec());
        let message = incoming_message(Event::Incoming(Packet::Publish(publish))).unwrap();
        assert_eq!(message.topic, "vehicles/veh-001/telemetry");
        assert_eq!(&message.payload[..], b"{}");
    }

    #[test]
    fn test_protocol_events_are_skipped() {
        assert!(incoming_message(Event::Incoming(Packet::PingResp)).is_none());
        assert!(incoming_message(Event::Incoming(Packet::PingReq)).is_none());
    }

    #[tokio::test]
    async fn test_commands_queue_while_broker_is_down() {
        let (publisher, _messages) = connect(&unreachable_broker());
        publisher.publish("veh-001", Command::Start).await.unwrap();
    }

    #[tokio::test]
    async fn test_command_queue_overflow_is_an_error() {
        let settings = BusSettings {
            channel_capacity: 1,
            ..unreachable_broker()
        };
        let (publisher, _messages) = connect(&settings);

        let mut results = Vec::new();
        for _ in 0..8 {
            results.push(publisher.publish("veh-001", Command::Stop).await);
        }
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(CommandError::Publish(_)))));
    }
}
