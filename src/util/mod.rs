use chrono::{DateTime, Local, Utc};

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn now_ms() -> i64 {
    now().timestamp_millis()
}

/// "Last saved: ..." label in the viewer's local timezone.
pub(crate) fn last_saved_label(at: DateTime<Utc>) -> String {
    format!(
        "Last saved: {}",
        at.with_timezone(&Local).format("%b %-d, %Y %H:%M:%S")
    )
}
