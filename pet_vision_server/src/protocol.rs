//! JSON messages exchanged over the `/ws` socket.
//!
//! Every frame is a text frame shaped `{"event": <name>, "data": <payload>}`.

use pet_vision::{ActivityReport, ActivitySnapshot};
use serde::{Deserialize, Serialize};

/// Client → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "pet-activity")]
    PetActivity(ActivityReport),
    #[serde(rename = "request-pet-activities")]
    RequestPetActivities,
}

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "pet-activities-update")]
    PetActivitiesUpdate(ActivitySnapshot),
}

impl ClientMessage {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_vision::{Activity, ActivityEvent, Centroid};

    #[test]
    fn decodes_pet_activity() {
        let text = r#"{
            "event": "pet-activity",
            "data": {
                "petName": "Rex",
                "activity": "Sleeping/Lying",
                "confidence": 0.72,
                "movement": 1.2,
                "timestamp": 1700000000000,
                "position": {"centerX": 120.5, "centerY": 80.0}
            }
        }"#;
        let ClientMessage::PetActivity(report) = ClientMessage::decode(text).unwrap() else {
            panic!("expected pet-activity");
        };
        assert_eq!(report.pet_name, "Rex");
        assert_eq!(report.activity, Activity::SleepingLying);
        assert_eq!(report.position, Some(Centroid::new(120.5, 80.0)));
    }

    #[test]
    fn decodes_snapshot_request_without_data() {
        let message = ClientMessage::decode(r#"{"event":"request-pet-activities"}"#).unwrap();
        assert_eq!(message, ClientMessage::RequestPetActivities);
    }

    #[test]
    fn null_position_is_accepted() {
        let text = r#"{"event":"pet-activity","data":{"petName":"Rex","activity":"Walking","confidence":0.5,"movement":14.0,"timestamp":1,"position":null}}"#;
        let ClientMessage::PetActivity(report) = ClientMessage::decode(text).unwrap() else {
            panic!("expected pet-activity");
        };
        assert!(report.position.is_none());
    }

    #[test]
    fn rejects_unknown_event() {
        assert!(ClientMessage::decode(r#"{"event":"pet-dance","data":{}}"#).is_err());
    }

    #[test]
    fn encodes_update_envelope() {
        let snapshot = ActivitySnapshot {
            current: vec![ActivityEvent::new(
                3,
                ActivityReport {
                    pet_name: "Rex".into(),
                    activity: Activity::Eating,
                    confidence: 0.85,
                    movement: 0.0,
                    timestamp: 5,
                    position: None,
                },
            )],
            history: Vec::new(),
        };
        let text = ServerMessage::PetActivitiesUpdate(snapshot.clone()).encode().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["event"], "pet-activities-update");
        assert_eq!(json["data"]["current"][0]["sourceId"], 3);
        assert_eq!(json["data"]["current"][0]["activity"], "Eating");

        let ServerMessage::PetActivitiesUpdate(back) = ServerMessage::decode(&text).unwrap();
        assert_eq!(back, snapshot);
    }
}
