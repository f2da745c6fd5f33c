//! Change-event payloads and status transition detection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Entity, RealtimeError};

/// Row operation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Wire name of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// A row-level change event as delivered by the backend.
///
/// Only the fields needed for status tracking are typed; `old` and `new` stay
/// as raw records.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub old: Map<String, Value>,
    #[serde(default)]
    pub new: Map<String, Value>,
}

impl ChangeEvent {
    /// Parse a raw payload.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Malformed` if the payload does not match the
    /// change-event shape.
    pub fn from_value(payload: &Value) -> Result<Self, RealtimeError> {
        Ok(Self::deserialize(payload)?)
    }
}

/// A status transition on a watched entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub entity: Entity,
    /// Product name or order id.
    pub label: String,
    pub old_status: Option<String>,
    pub new_status: String,
}

impl StatusChange {
    /// Human-readable notification text.
    #[must_use]
    pub fn message(&self) -> String {
        match self.entity {
            Entity::Orders => format!(
                "Order #{} status changed to {}",
                self.label, self.new_status
            ),
            Entity::Products => format!(
                "Product {} status changed to {}",
                self.label, self.new_status
            ),
        }
    }
}

/// Compare `old.status` with `new.status` on an update event.
///
/// Returns `Ok(None)` for non-update events, unchanged statuses, and updates
/// whose old record carries no status (the backend only includes full old
/// rows for tables with full replica identity).
///
/// # Errors
///
/// Returns an error if the event is for another table, or the new record
/// lacks `status` or the entity's label field.
pub fn detect_status_change(
    entity: Entity,
    event: &ChangeEvent,
) -> Result<Option<StatusChange>, RealtimeError> {
    if event.table != entity.table() {
        return Err(RealtimeError::UnexpectedTable {
            expected: entity.table(),
            actual: event.table.clone(),
        });
    }
    if event.kind != ChangeKind::Update {
        return Ok(None);
    }

    let new_status = event
        .new
        .get("status")
        .filter(|v| !v.is_null())
        .ok_or_else(|| missing(event, "status"))?;

    let Some(old_status) = event.old.get("status") else {
        debug!(table = %event.table, "Old record has no status, skipping comparison");
        return Ok(None);
    };

    if old_status == new_status {
        return Ok(None);
    }

    let label = event
        .new
        .get(entity.label_field())
        .filter(|v| !v.is_null())
        .map(render)
        .ok_or_else(|| missing(event, entity.label_field()))?;

    Ok(Some(StatusChange {
        entity,
        label,
        old_status: (!old_status.is_null()).then(|| render(old_status)),
        new_status: render(new_status),
    }))
}

fn missing(event: &ChangeEvent, field: &'static str) -> RealtimeError {
    RealtimeError::MissingField {
        table: event.table.clone(),
        field,
    }
}

/// Strings without quotes, anything else as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
