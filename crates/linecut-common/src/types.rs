use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Icon used when a caller does not pick one.
pub const DEFAULT_ICON: &str = "bi-info-circle";

/// Store status values.
pub const STATUS_OPEN: &str = "aberto";
pub const STATUS_CLOSED: &str = "fechado";
pub const ORDER_CANCELLED: &str = "cancelado";

/// What a rule hands to the notifier: the visible text plus an icon id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, body: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: icon.into(),
        }
    }

    /// An alert carrying [`DEFAULT_ICON`].
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, DEFAULT_ICON)
    }
}

/// In-app notification record stored under `/notifications/{recipient}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub is_read: bool,
    /// RFC 3339 UTC instant.
    pub timestamp_iso: String,
    /// `DD/MM/YYYY às HH:MM` in the service timezone.
    pub timestamp_display: String,
}

/// Opening hours of one weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(default)]
    pub aberto: bool,
    /// `HH:MM`
    #[serde(default)]
    pub abertura: String,
    /// `HH:MM`
    #[serde(default)]
    pub fechamento: String,
}

impl DaySchedule {
    /// Decodes one schedule entry, treating anything malformed as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn day_schedule_decodes_partial_entries() {
        let day = DaySchedule::from_value(&json!({"aberto": true, "abertura": "08:00"})).unwrap();
        assert!(day.aberto);
        assert_eq!(day.abertura, "08:00");
        assert_eq!(day.fechamento, "");
    }

    #[test]
    fn day_schedule_rejects_malformed_entries() {
        assert!(DaySchedule::from_value(&json!("closed")).is_none());
        assert!(DaySchedule::from_value(&json!({"aberto": "yes"})).is_none());
    }

    #[test]
    fn notification_serializes_with_store_field_names() {
        let n = Notification {
            title: "t".into(),
            body: "b".into(),
            icon: DEFAULT_ICON.into(),
            is_read: false,
            timestamp_iso: "2024-01-01T00:00:00.000Z".into(),
            timestamp_display: "31/12/2023 às 21:00".into(),
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["is_read"], json!(false));
        assert_eq!(value["icon"], json!("bi-info-circle"));
    }
}
