//! All-or-nothing event hand-off.

use error_stack::{Report, ResultExt};

use crate::error::BidonError;

use super::{Event, LoggerEngine, Topic};

/// Serialized event ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub topic: Topic,
    pub value: Vec<u8>,
}

pub struct EventLogger<E> {
    engine: E,
}

impl<E: LoggerEngine> EventLogger<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Marshals `event` and its children and hands them to the engine.
    ///
    /// When any of them fails to marshal, `on_error` is called once per
    /// failure and nothing is produced.
    pub fn log(&self, event: &dyn Event, on_error: &dyn Fn(Report<BidonError>)) {
        let mut events = vec![event];
        events.extend(event.children());

        let mut messages = Vec::with_capacity(events.len());
        let mut failed = false;
        for event in events {
            match marshal(event) {
                Ok(message) => messages.push(message),
                Err(report) => {
                    failed = true;
                    on_error(report);
                }
            }
        }
        if failed {
            return;
        }

        for message in messages {
            self.engine.produce(message, on_error);
        }
    }
}

fn marshal(event: &dyn Event) -> Result<LogMessage, Report<BidonError>> {
    let payload = event.payload()?;
    let value = serde_json::to_vec(&payload).change_context(BidonError::Event {
        message: format!("marshal {} payload", event.topic()),
    })?;
    Ok(LogMessage {
        topic: event.topic(),
        value,
    })
}
