//! Transport behind the event logger.

use std::collections::HashMap;

use error_stack::Report;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::BidonError;
use crate::settings::EventSettings;

use super::{LogMessage, Topic};

pub trait LoggerEngine: Send + Sync {
    /// Hands `message` off without waiting for delivery. Delivery failures
    /// are reported through `on_error`.
    fn produce(&self, message: LogMessage, on_error: &dyn Fn(Report<BidonError>));
}

/// Message addressed to a concrete transport topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    pub topic: String,
    pub value: Vec<u8>,
}

/// Engine that pushes records onto an unbounded channel.
///
/// Whoever owns the receiver forwards records to the event bus.
#[derive(Debug, Clone)]
pub struct ChannelEngine {
    topics: HashMap<Topic, String>,
    sender: UnboundedSender<TopicRecord>,
}

impl ChannelEngine {
    pub fn new(topics: HashMap<Topic, String>) -> (Self, UnboundedReceiver<TopicRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { topics, sender }, receiver)
    }

    pub fn from_settings(settings: &EventSettings) -> (Self, UnboundedReceiver<TopicRecord>) {
        Self::new(settings.topics.clone())
    }
}

impl LoggerEngine for ChannelEngine {
    fn produce(&self, message: LogMessage, on_error: &dyn Fn(Report<BidonError>)) {
        let Some(topic) = self.topics.get(&message.topic).filter(|t| !t.is_empty()) else {
            on_error(Report::new(BidonError::Event {
                message: format!("topic for {} not set", message.topic),
            }));
            return;
        };

        let record = TopicRecord {
            topic: topic.clone(),
            value: message.value,
        };
        if self.sender.send(record).is_err() {
            on_error(Report::new(BidonError::Event {
                message: "event channel closed".to_string(),
            }));
        }
    }
}
