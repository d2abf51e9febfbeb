// Command service - Publishes remote commands to vehicles over the message bus
use crate::domain::command::Command;
use crate::domain::error::CommandError;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, vehicle_id: &str, command: Command) -> Result<(), CommandError>;
}

#[derive(Clone)]
pub struct CommandService {
    publisher: Option<Arc<dyn CommandPublisher>>,
}

impl CommandService {
    pub fn new(publisher: Arc<dyn CommandPublisher>) -> Self {
        Self {
            publisher: Some(publisher),
        }
    }

    /// Service for deployments without a bus; every send fails with `BusDisabled`
    pub fn disabled() -> Self {
        Self { publisher: None }
    }

    pub async fn send(&self, vehicle_id: &str, command: Command) -> Result<(), CommandError> {
        let publisher = self.publisher.as_ref().ok_or(CommandError::BusDisabled)?;
        publisher.publish(vehicle_id, command).await?;
        tracing::info!("Published {} command to {}", command, vehicle_id);
        Ok(())
    }
}
