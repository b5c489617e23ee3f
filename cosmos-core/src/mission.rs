//! Mission records
//!
//! A mission owns its squad, its living document and its huddle history. The
//! JSON layout (camelCase keys) matches what earlier versions persisted, so
//! stored missions keep loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::Agent;
use crate::visual::VisualKind;
use crate::{Error, Result};

/// Generate a prefixed unique id such as `mission-<uuid>`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// What a user asks for when starting a mission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionBrief {
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub job_role: String,
}

impl MissionBrief {
    /// Create a brief
    pub fn new(
        title: impl Into<String>,
        details: impl Into<String>,
        job_role: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            details: details.into(),
            job_role: job_role.into(),
        }
    }

    /// Check the required fields and trim surrounding whitespace
    pub fn validated(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        let job_role = self.job_role.trim().to_string();

        if title.is_empty() {
            return Err(Error::Validation("Mission title is required".to_string()));
        }
        if job_role.is_empty() {
            return Err(Error::Validation("Job role is required".to_string()));
        }

        Ok(Self {
            title,
            details: self.details.trim().to_string(),
            job_role,
        })
    }
}

/// One addressable slice of a mission document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub content: String,
}

impl Section {
    /// Create a section with a fresh id
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_id("section"),
            content: content.into(),
        }
    }
}

/// Who wrote a huddle message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// One entry in a mission's huddle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuddleMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_type: Option<VisualKind>,
}

impl HuddleMessage {
    /// A message typed by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: new_id("msg"),
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
            is_loading: false,
            visual_code: None,
            visual_type: None,
        }
    }

    /// An empty agent reply that is still streaming
    pub fn agent_placeholder() -> Self {
        Self {
            id: new_id("agent-msg"),
            speaker: Speaker::Agent,
            text: String::new(),
            timestamp: Utc::now(),
            is_loading: true,
            visual_code: None,
            visual_type: None,
        }
    }
}

/// A mission and everything it has produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub job_role: String,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub document: Vec<Section>,
    #[serde(default)]
    pub huddle_messages: Vec<HuddleMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
    /// Save counter; a copy loaded before another save is stale
    #[serde(default)]
    pub revision: u64,
}

impl Mission {
    /// Start a mission with the assembled squad and a starter document
    pub fn new(brief: MissionBrief, agents: Vec<Agent>) -> Self {
        let intro = format!("# {}\n\nThis is your new mission document.", brief.title);
        Self::with_intro(brief, agents, intro, None)
    }

    /// Start a mission launched from a community hub
    pub fn from_hub(
        brief: MissionBrief,
        agents: Vec<Agent>,
        hub_id: impl Into<String>,
        hub_name: &str,
    ) -> Self {
        let intro = format!(
            "# {}\n\nThis mission was initiated from the {} hub.",
            brief.title, hub_name
        );
        Self::with_intro(brief, agents, intro, Some(hub_id.into()))
    }

    fn with_intro(
        brief: MissionBrief,
        agents: Vec<Agent>,
        intro: String,
        hub_id: Option<String>,
    ) -> Self {
        Self {
            id: new_id("mission"),
            title: brief.title,
            details: brief.details,
            job_role: brief.job_role,
            agents,
            document: vec![Section::new(intro)],
            huddle_messages: Vec::new(),
            hub_id,
            revision: 0,
        }
    }

    /// The brief this mission was created from
    pub fn brief(&self) -> MissionBrief {
        MissionBrief::new(&self.title, &self.details, &self.job_role)
    }

    /// Huddle messages whose text contains `query`, case-insensitively
    pub fn search_huddle(&self, query: &str) -> Vec<&HuddleMessage> {
        let needle = query.to_lowercase();
        self.huddle_messages
            .iter()
            .filter(|m| m.text.to_lowercase().contains(&needle))
            .collect()
    }

    /// Squad members whose names appear in `names` (exact match)
    pub fn squad_members(&self, names: &[String]) -> Vec<Agent> {
        self.agents
            .iter()
            .filter(|a| names.iter().any(|n| *n == a.name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::find_agent;

    #[test]
    fn test_brief_validation() {
        let brief = MissionBrief::new("  Launch a sneaker brand ", "", " Entrepreneur ")
            .validated()
            .unwrap();
        assert_eq!(brief.title, "Launch a sneaker brand");
        assert_eq!(brief.job_role, "Entrepreneur");

        let err = MissionBrief::new("   ", "x", "Founder").validated().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = MissionBrief::new("Title", "x", "").validated().unwrap_err();
        assert!(err.to_string().contains("Job role"));
    }

    #[test]
    fn test_new_mission_document() {
        let mission = Mission::new(MissionBrief::new("Grow", "", "Marketer"), vec![]);
        assert!(mission.id.starts_with("mission-"));
        assert_eq!(mission.document.len(), 1);
        assert_eq!(
            mission.document[0].content,
            "# Grow\n\nThis is your new mission document."
        );
        assert!(mission.huddle_messages.is_empty());
        assert!(mission.hub_id.is_none());
    }

    #[test]
    fn test_hub_mission() {
        let mission = Mission::from_hub(
            MissionBrief::new("Q3 plan", "", "Founder"),
            vec![],
            "hub-2",
            "Startup Founders",
        );
        assert_eq!(mission.hub_id.as_deref(), Some("hub-2"));
        assert!(mission.document[0]
            .content
            .ends_with("This mission was initiated from the Startup Founders hub."));
    }

    #[test]
    fn test_huddle_message_json_layout() {
        let mut msg = HuddleMessage::agent_placeholder();
        msg.visual_type = Some(VisualKind::Mermaid);
        msg.visual_code = Some("graph TD".to_string());

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "agent");
        assert_eq!(value["isLoading"], true);
        assert_eq!(value["visualType"], "mermaid");

        let user = serde_json::to_value(HuddleMessage::user("hi")).unwrap();
        assert!(user.get("isLoading").is_none());
        assert!(user.get("visualCode").is_none());
    }

    #[test]
    fn test_mission_loads_stored_layout() {
        let json = r##"{
            "id": "mission-1700000000000",
            "title": "Eco packaging",
            "details": "",
            "jobRole": "Founder",
            "agents": [],
            "document": [{"id": "section-1", "content": "# Eco packaging"}],
            "huddleMessages": [
                {"id": "msg-1", "type": "user", "text": "Ideas?", "timestamp": "2024-05-01T10:00:00.000Z"},
                {"id": "agent-msg-1", "type": "agent", "text": "Plenty.", "timestamp": "2024-05-01T10:00:01.000Z", "isLoading": false}
            ]
        }"##;
        let mission: Mission = serde_json::from_str(json).unwrap();
        assert_eq!(mission.job_role, "Founder");
        assert_eq!(mission.huddle_messages.len(), 2);
        assert_eq!(mission.huddle_messages[1].speaker, Speaker::Agent);
        assert_eq!(mission.revision, 0);
    }

    #[test]
    fn test_search_huddle() {
        let mut mission = Mission::new(MissionBrief::new("T", "", "R"), vec![]);
        mission.huddle_messages.push(HuddleMessage::user("What about TikTok?"));
        mission.huddle_messages.push(HuddleMessage::user("budget"));
        assert_eq!(mission.search_huddle("tiktok").len(), 1);
        assert_eq!(mission.search_huddle("").len(), 2);
    }

    #[test]
    fn test_squad_members() {
        let agents = vec![find_agent("Zephyr").unwrap(), find_agent("Kairo").unwrap()];
        let mission = Mission::new(MissionBrief::new("T", "", "R"), agents);
        let picked = mission.squad_members(&["Kairo".to_string(), "Pixel".to_string()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "Kairo");
    }
}
