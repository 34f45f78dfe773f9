use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Triage status of a detection event, stored as 0/1/2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum EventStatus {
    #[default]
    Unhandled,
    InProgress,
    Resolved,
}

impl EventStatus {
    pub fn code(self) -> i32 {
        match self {
            EventStatus::Unhandled => 0,
            EventStatus::InProgress => 1,
            EventStatus::Resolved => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Unhandled => "unhandled",
            EventStatus::InProgress => "in_progress",
            EventStatus::Resolved => "resolved",
        }
    }
}

impl TryFrom<i32> for EventStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EventStatus::Unhandled),
            1 => Ok(EventStatus::InProgress),
            2 => Ok(EventStatus::Resolved),
            other => Err(format!("unknown event status code {}", other)),
        }
    }
}

impl From<EventStatus> for i32 {
    fn from(status: EventStatus) -> Self {
        status.code()
    }
}

/// A persisted detection from one camera frame.
///
/// This is also the JSON pushed to dashboards when the event is ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub event_id: i64,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub cctv_id: i64,
    pub img_path: String,
    /// Object class -> number of instances seen
    pub objects: BTreeMap<String, u32>,
    pub manage: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl DetectionEvent {
    pub fn occurred_at(&self) -> NaiveDateTime {
        self.event_date.and_time(self.event_time)
    }

    pub fn total_objects(&self) -> u32 {
        self.objects.values().sum()
    }
}

/// Largest per-class count a store can hold (`item_count` is a 32-bit INT)
pub const MAX_OBJECT_COUNT: u32 = i32::MAX as u32;

/// Detection reported by the inference server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDetection {
    pub cctv_id: i64,
    pub img_path: String,
    pub objects: BTreeMap<String, u32>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub event_time: Option<NaiveTime>,
}

impl NewDetection {
    pub fn validate(&self) -> Result<(), String> {
        if self.img_path.trim().is_empty() {
            return Err("imgPath must not be empty".to_string());
        }
        if self.objects.is_empty() {
            return Err("objects must contain at least one detected class".to_string());
        }
        if let Some((class, _)) = self.objects.iter().find(|(_, count)| **count == 0) {
            return Err(format!("count for '{}' must be positive", class));
        }
        if let Some((class, count)) = self.objects.iter().find(|(_, count)| **count > MAX_OBJECT_COUNT) {
            return Err(format!(
                "count for '{}' is {}, the maximum is {}",
                class, count, MAX_OBJECT_COUNT
            ));
        }
        if self.objects.keys().any(|k| k.trim().is_empty()) {
            return Err("object class names must not be empty".to_string());
        }
        Ok(())
    }

    /// Fill in a missing date or time from `now`, dropping sub-second precision
    pub fn into_record(self, now: NaiveDateTime) -> DetectionRecord {
        let time = self.event_time.unwrap_or_else(|| now.time());
        DetectionRecord {
            event_date: self.event_date.unwrap_or_else(|| now.date()),
            event_time: time.with_nanosecond(0).unwrap_or(time),
            cctv_id: self.cctv_id,
            img_path: self.img_path,
            objects: self.objects,
        }
    }
}

/// Detection ready to be persisted; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub cctv_id: i64,
    pub img_path: String,
    pub objects: BTreeMap<String, u32>,
}

impl DetectionRecord {
    /// `location` comes from the camera registry, never from the detection itself
    pub fn into_event(self, event_id: i64, location: Option<String>) -> DetectionEvent {
        DetectionEvent {
            event_id,
            event_date: self.event_date,
            event_time: self.event_time,
            cctv_id: self.cctv_id,
            img_path: self.img_path,
            objects: self.objects,
            manage: EventStatus::Unhandled,
            location,
        }
    }
}

/// Query filter for the event history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    /// Only events where this object class was detected
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    /// Inclusive lower date bound
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub manage: Option<EventStatus>,
}

impl EventFilter {
    pub fn matches(&self, event: &DetectionEvent) -> bool {
        if let Some(item_type) = self.item_type.as_deref().filter(|t| !t.is_empty()) {
            if !event.objects.contains_key(item_type) {
                return false;
            }
        }
        if self.from.is_some_and(|from| event.event_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| event.event_date > to) {
            return false;
        }
        if self.manage.is_some_and(|m| event.manage != m) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> DetectionEvent {
        DetectionEvent {
            event_id: 12,
            event_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            event_time: NaiveTime::from_hms_opt(13, 45, 10).unwrap(),
            cctv_id: 3,
            img_path: "/images/12.jpg".to_string(),
            objects: BTreeMap::from([("bird".to_string(), 2), ("person".to_string(), 1)]),
            manage: EventStatus::Unhandled,
            location: None,
        }
    }

    #[test]
    fn test_event_wire_format() {
        let value = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(
            value,
            json!({
                "eventId": 12,
                "eventDate": "2025-05-01",
                "eventTime": "13:45:10",
                "cctvId": 3,
                "imgPath": "/images/12.jpg",
                "objects": {"bird": 2, "person": 1},
                "manage": 0
            })
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(EventStatus::try_from(1), Ok(EventStatus::InProgress));
        assert!(EventStatus::try_from(3).is_err());
        assert_eq!(i32::from(EventStatus::Resolved), 2);

        let parsed: EventStatus = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(parsed, EventStatus::Resolved);
        assert!(serde_json::from_value::<EventStatus>(json!(-1)).is_err());
    }

    #[test]
    fn test_new_detection_validation() {
        let mut detection = NewDetection {
            cctv_id: 1,
            img_path: "a.jpg".to_string(),
            objects: BTreeMap::from([("bird".to_string(), 1)]),
            event_date: None,
            event_time: None,
        };
        assert!(detection.validate().is_ok());

        detection.objects.insert("vehicle".to_string(), 0);
        assert!(detection.validate().unwrap_err().contains("vehicle"));
        detection.objects.remove("vehicle");

        detection.objects.insert("bird".to_string(), MAX_OBJECT_COUNT);
        assert!(detection.validate().is_ok());
        detection.objects.insert("bird".to_string(), 3_000_000_000);
        assert!(detection.validate().unwrap_err().contains("maximum"));

        detection.objects.clear();
        assert!(detection.validate().is_err());
    }

    #[test]
    fn test_into_record_defaults_timestamp() {
        let detection: NewDetection = serde_json::from_value(json!({
            "cctvId": 4,
            "imgPath": "b.jpg",
            "objects": {"mammal": 1}
        }))
        .unwrap();

        let now = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_milli_opt(9, 30, 15, 250)
            .unwrap();
        let record = detection.into_record(now);

        assert_eq!(record.event_date, now.date());
        assert_eq!(record.event_time, NaiveTime::from_hms_opt(9, 30, 15).unwrap());
    }

    #[test]
    fn test_filter_matching() {
        let event = sample_event();

        assert!(EventFilter::default().matches(&event));

        let by_type = EventFilter {
            item_type: Some("bird".to_string()),
            ..Default::default()
        };
        assert!(by_type.matches(&event));

        let wrong_type = EventFilter {
            item_type: Some("vehicle".to_string()),
            ..Default::default()
        };
        assert!(!wrong_type.matches(&event));

        let in_range = EventFilter {
            from: NaiveDate::from_ymd_opt(2025, 5, 1),
            to: NaiveDate::from_ymd_opt(2025, 5, 1),
            ..Default::default()
        };
        assert!(in_range.matches(&event));

        let after = EventFilter {
            from: NaiveDate::from_ymd_opt(2025, 5, 2),
            ..Default::default()
        };
        assert!(!after.matches(&event));

        let resolved_only = EventFilter {
            manage: Some(EventStatus::Resolved),
            ..Default::default()
        };
        assert!(!resolved_only.matches(&event));
    }
}
