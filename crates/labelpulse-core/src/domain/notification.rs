//! Notification records
//!
//! Mirrors the documents the platform backend writes whenever a user is
//! invited to a project or a task moves through annotation and QA.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Kind of event a notification reports
///
/// Values match the backend's `type` tag. Tags this client does not know
/// about decode as [`NotificationType::Unknown`] instead of failing the
/// whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Invited to join a project
    Invite,
    /// Assigned a task to annotate
    TaskAssigned,
    /// An annotator finished a task (sent to project managers)
    TaskCompleted,
    /// Assigned a task to review
    QaAssigned,
    /// A reviewer sent the task back to the annotator
    TaskReturned,
    /// An annotation was submitted for review
    AnnotationSubmitted,
    /// A reviewer finished reviewing
    QaCompleted,
    /// A reviewer approved the annotation
    QaApproved,
    #[serde(other)]
    Unknown,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::TaskAssigned => "task_assigned",
            Self::TaskCompleted => "task_completed",
            Self::QaAssigned => "qa_assigned",
            Self::TaskReturned => "task_returned",
            Self::AnnotationSubmitted => "annotation_submitted",
            Self::QaCompleted => "qa_completed",
            Self::QaApproved => "qa_approved",
            Self::Unknown => "unknown",
        }
    }
}

/// A single notification addressed to the current user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }
}

/// Body of `GET /notifications/unread-count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread_count: u64,
}

/// Parse a backend timestamp
///
/// The backend stores `utcnow()` values, which serialize without an offset.
/// Offset-less values are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}
