use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The note as it exists in the editor at a given instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Note {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A write that could not reach the backend because the page was offline.
///
/// Lives only inside the offline queue (and its journal) until a flush
/// confirms it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct QueuedWrite {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, rename = "isClear")]
    pub is_clear: bool,
}

impl QueuedWrite {
    pub fn edit(note: Note) -> Self {
        Self {
            content: note.content,
            timestamp: note.timestamp,
            is_clear: false,
        }
    }

    pub fn clear(timestamp: DateTime<Utc>) -> Self {
        Self {
            content: String::new(),
            timestamp,
            is_clear: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub(crate) enum SaveState {
    /// Clean, nothing written yet this session.
    #[default]
    Idle,
    Dirty,
    Saving,
    /// Clean after a confirmed write.
    Saved,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct NoteStats {
    pub words: usize,
    pub chars: usize,
}

impl NoteStats {
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            chars: text.chars().count(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SaveNotesRequest {
    pub notes: String,
    pub timestamp: DateTime<Utc>,

    /// Only sent by the teardown write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_autosave: Option<bool>,
}

/// Accepts RFC 3339 as well as the naive ISO form some backends emit.
/// Naive values are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|n| n.and_utc())
}

fn lenient_timestamp<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SaveNotesResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct GetNotesResponse {
    pub success: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What the backend holds for a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StoredNote {
    pub content: String,
    pub last_updated: Option<DateTime<Utc>>,
}
