//! Recording sessions, their channels, and annotations.

use crate::PhysicalChannel;

/// A recognized sensor channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ChannelConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(alias = "physical_channel"))]
    pub physical_channel: PhysicalChannel,
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: u32,
}

impl ChannelConfig {
    pub fn new(id: u32, physical_channel: PhysicalChannel, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            physical_channel,
            id,
        }
    }

    /// The catalog used when nothing else is configured: channels 0, 1 and 2.
    pub fn default_catalog() -> Vec<ChannelConfig> {
        (0..3)
            .map(|n| ChannelConfig::new(n, n, format!("Channel {}", n)))
            .collect()
    }
}

/// A data recording session.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Session {
    #[cfg_attr(feature = "serde", serde(alias = "_id"))]
    pub id: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,

    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")
    )]
    pub created_at: Option<String>,

    /// Channels recorded in this session.
    #[cfg_attr(feature = "serde", serde(default))]
    pub channels: Vec<ChannelConfig>,

    /// Annotations owned by this session, in server order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub annotations: Vec<Annotation>,
}

impl Session {
    /// Whether this session owns the annotation with the given id.
    pub fn has_annotation(&self, annotation_id: &str) -> bool {
        self.annotations.iter().any(|a| a.id == annotation_id)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Payload for creating a session. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NewSession {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub channels: Vec<ChannelConfig>,
}

/// An entry in the session list.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SessionSummary {
    #[cfg_attr(feature = "serde", serde(alias = "_id"))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")
    )]
    pub created_at: Option<String>,
}

/// A note pinned to a moment of a session's recording.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Annotation {
    #[cfg_attr(feature = "serde", serde(alias = "_id"))]
    pub id: String,
    /// Id of the owning session.
    pub owner_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: String,
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            rename = "physicalChannel",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub physical_channel: Option<PhysicalChannel>,
}

/// Payload for creating an annotation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewAnnotation {
    pub owner_id: String,
    pub time: f64,
    pub text: String,
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            rename = "physicalChannel",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub physical_channel: Option<PhysicalChannel>,
}

/// Operational command for a session's data collection.
///
/// The wire names are the command types the device loop understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionCommand {
    #[cfg_attr(feature = "serde", serde(rename = "COLLECT"))]
    StartCollection,
    #[cfg_attr(feature = "serde", serde(rename = "IDLE"))]
    StopCollection,
}

impl SessionCommand {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SessionCommand::StartCollection => "COLLECT",
            SessionCommand::StopCollection => "IDLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_three_channels() {
        let catalog = ChannelConfig::default_catalog();
        let channels: Vec<_> = catalog.iter().map(|c| c.physical_channel).collect();
        assert_eq!(channels, vec![0, 1, 2]);
    }

    #[test]
    fn has_annotation_matches_by_id() {
        let session = Session {
            id: "s1".to_string(),
            annotations: vec![Annotation {
                id: "a1".to_string(),
                owner_id: "s1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(session.has_annotation("a1"));
        assert!(!session.has_annotation("a2"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn session_accepts_mongo_id() {
        let json = r#"{
            "_id": "5a1f",
            "name": "Resting",
            "created_at": "2017-11-29T10:00:00",
            "channels": [{"description": "ECG", "physical_channel": 0, "id": 0}]
        }"#;

        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "5a1f");
        assert_eq!(session.created_at.as_deref(), Some("2017-11-29T10:00:00"));
        assert_eq!(session.channels[0].description, "ECG");
        assert!(session.annotations.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn command_uses_device_loop_names() {
        let json = serde_json::to_string(&SessionCommand::StartCollection).unwrap();
        assert_eq!(json, "\"COLLECT\"");
        assert_eq!(SessionCommand::StopCollection.wire_name(), "IDLE");
    }
}
