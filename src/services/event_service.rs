use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::data::sqlite::pool::{with_connection, DbPool};
use crate::data::sqlite::repo_impl;
use crate::error::Result;
use crate::types::{EventLogEntry, UserData};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventMessage {
    descriptions: Vec<String>,
    details: Vec<(String, String)>,
}

impl EventMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_description(mut self, description: impl Into<String>) -> Self {
        self.descriptions.push(description.into());
        self
    }

    pub fn add_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((label.into(), value.into()));
        self
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    pub fn details(&self) -> &[(String, String)] {
        &self.details
    }

    /// Descriptions first, then one `label: value` line per detail.
    pub fn compose_text(&self, delimiter: &str) -> String {
        self.descriptions
            .iter()
            .cloned()
            .chain(
                self.details
                    .iter()
                    .map(|(label, value)| format!("{label}: {value}")),
            )
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventActor {
    pub user_id: i64,
    pub login: String,
}

impl From<&UserData> for EventActor {
    fn from(user: &UserData) -> Self {
        Self {
            user_id: user.id,
            login: user.login.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub message: EventMessage,
    pub actor: Option<EventActor>,
}

impl Event {
    pub fn new(message: EventMessage) -> Self {
        Self {
            message,
            actor: None,
        }
    }

    pub fn with_actor(mut self, actor: EventActor) -> Self {
        self.actor = Some(actor);
        self
    }
}

pub trait EventPublisher: Send + Sync {
    fn notify_event(&self, name: &str, event: Event);
}

pub trait EventReceiver: Send + Sync {
    fn accepts(&self, _name: &str) -> bool {
        true
    }

    fn receive(&self, name: &str, event: &Event) -> Result<()>;
}

#[derive(Default)]
pub struct EventDispatcher {
    receivers: Vec<Arc<dyn EventReceiver>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(mut self, receiver: Arc<dyn EventReceiver>) -> Self {
        self.receivers.push(receiver);
        self
    }
}

impl EventPublisher for EventDispatcher {
    fn notify_event(&self, name: &str, event: Event) {
        for receiver in self.receivers.iter().filter(|r| r.accepts(name)) {
            if let Err(err) = receiver.receive(name, &event) {
                log::error!("[EVENT][{name}] receiver failed: {}", err.code);
            }
        }
    }
}

pub struct LogEventReceiver;

impl EventReceiver for LogEventReceiver {
    fn receive(&self, name: &str, event: &Event) -> Result<()> {
        let who = event
            .actor
            .as_ref()
            .map(|a| a.login.as_str())
            .unwrap_or("-");
        log::info!("[EVENT][{name}] ({who}) {}", event.message.compose_text("; "));
        Ok(())
    }
}

/// Persists state-changing events into the `event_log` table.
pub struct EventLogReceiver {
    pool: DbPool,
}

impl EventLogReceiver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl EventReceiver for EventLogReceiver {
    fn accepts(&self, name: &str) -> bool {
        ["delete.", "restore.", "create.", "edit."]
            .iter()
            .any(|prefix| name.starts_with(prefix))
    }

    fn receive(&self, name: &str, event: &Event) -> Result<()> {
        let entry = EventLogEntry {
            date: Utc::now().to_rfc3339(),
            login: event.actor.as_ref().map(|a| a.login.clone()),
            user_id: event.actor.as_ref().map(|a| a.user_id),
            action: name.to_string(),
            description: event.message.compose_text("\n"),
            level: "INFO".to_string(),
        };
        with_connection(&self.pool, |conn| repo_impl::insert_event_log(conn, &entry))?;
        Ok(())
    }
}
