use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::RecordId;

/// Kind of user action recorded by the tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    EventView,
    NearMeSearch,
    PlanNightRequest,
    /// Every other tracked action (`filterUse`, future additions).
    #[serde(other)]
    Other,
}

impl InteractionKind {
    /// Kinds that make up the conversion funnel, in funnel order.
    pub const FUNNEL: [InteractionKind; 3] = [
        InteractionKind::NearMeSearch,
        InteractionKind::EventView,
        InteractionKind::PlanNightRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventView => "eventView",
            Self::NearMeSearch => "nearMeSearch",
            Self::PlanNightRequest => "planNightRequest",
            Self::Other => "other",
        }
    }

    /// Maps the stored type string. Unrecognized strings are `Other`, never an error.
    pub fn from_stored(raw: &str) -> Self {
        match raw {
            "eventView" => Self::EventView,
            "nearMeSearch" => Self::NearMeSearch,
            "planNightRequest" => Self::PlanNightRequest,
            _ => Self::Other,
        }
    }
}

/// Result of resolving `details.eventId` on an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRef {
    Absent,
    Malformed,
    Valid(RecordId),
}

impl EventRef {
    pub fn valid(self) -> Option<RecordId> {
        match self {
            Self::Valid(id) => Some(id),
            Self::Absent | Self::Malformed => None,
        }
    }
}

/// One immutable row of the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub session_id: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl Interaction {
    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.timestamp()
    }

    /// Resolves `details.eventId`.
    ///
    /// Only a string holding a well-formed record id is a usable reference; numbers, objects and
    /// garbage strings are `Malformed`, and `null` counts as absent.
    pub fn event_ref(&self) -> EventRef {
        match self.details.get("eventId") {
            None | Some(Value::Null) => EventRef::Absent,
            Some(Value::String(raw)) => raw
                .parse::<RecordId>()
                .map_or(EventRef::Malformed, EventRef::Valid),
            Some(_) => EventRef::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventRef, Interaction, InteractionKind};
    use crate::RecordId;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn interaction_with_details(details: serde_json::Value) -> Interaction {
        Interaction {
            id: RecordId::from_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), 1),
            kind: InteractionKind::EventView,
            session_id: "session-1".to_string(),
            details: details.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn unknown_stored_kinds_map_to_other() {
        assert_eq!(InteractionKind::from_stored("eventView"), InteractionKind::EventView);
        assert_eq!(InteractionKind::from_stored("filterUse"), InteractionKind::Other);
        assert_eq!(InteractionKind::from_stored(""), InteractionKind::Other);
    }

    #[test]
    fn event_ref_classifies_details_shapes() {
        let valid = interaction_with_details(json!({ "eventId": "65a4d2c0000000000000abcd" }));
        assert_eq!(
            valid.event_ref(),
            EventRef::Valid("65a4d2c0000000000000abcd".parse().unwrap())
        );

        assert_eq!(interaction_with_details(json!({})).event_ref(), EventRef::Absent);
        assert_eq!(
            interaction_with_details(json!({ "eventId": null })).event_ref(),
            EventRef::Absent
        );
        assert_eq!(
            interaction_with_details(json!({ "eventId": "E1" })).event_ref(),
            EventRef::Malformed
        );
        assert_eq!(
            interaction_with_details(json!({ "eventId": 17 })).event_ref(),
            EventRef::Malformed
        );
    }

    #[test]
    fn created_at_comes_from_the_id() {
        let interaction = interaction_with_details(json!({}));
        assert_eq!(
            interaction.created_at(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn deserializes_tracking_payload_shape() {
        let raw = r#"{
            "id": "65a4d2c0000000000000abcd",
            "type": "filterUse",
            "sessionId": "abc",
            "details": { "filter": "city" }
        }"#;
        let interaction: Interaction = serde_json::from_str(raw).expect("valid interaction");
        assert_eq!(interaction.kind, InteractionKind::Other);
        assert_eq!(interaction.event_ref(), EventRef::Absent);
    }
}
