//! Agent type definitions for Cosmos
//!
//! An agent is a named persona with a role and personality. Agents are either
//! drawn from the static pool or synthesized by the orchestrator for a mission
//! that needs a specialization nobody in the pool has.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text color shared by every agent persona
pub const AGENT_COLOR: &str = "text-purple-400";

/// Icon shown next to an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IconName {
    #[default]
    Bot,
    Users,
    BarChart2,
    DollarSign,
    Sparkles,
    Video,
    Target,
    TrendingUp,
    Image,
    MessageSquare,
    LineChart,
    Compass,
    PenTool,
    FlaskRound,
    Leaf,
    FlaskConical,
    Building,
    BookOpen,
    Code,
    Microscope,
    Globe,
}

impl IconName {
    /// Icons a synthesized agent may be given
    pub const SYNTHESIS_WHITELIST: &'static [IconName] = &[
        IconName::Bot,
        IconName::Users,
        IconName::BarChart2,
        IconName::DollarSign,
        IconName::Sparkles,
        IconName::Video,
        IconName::Target,
        IconName::TrendingUp,
        IconName::Image,
        IconName::MessageSquare,
        IconName::LineChart,
        IconName::Compass,
        IconName::PenTool,
        IconName::FlaskRound,
        IconName::Leaf,
        IconName::FlaskConical,
        IconName::Building,
        IconName::BookOpen,
        IconName::Code,
        IconName::Microscope,
        IconName::Globe,
    ];

    /// Get all available icons
    pub fn all() -> &'static [IconName] {
        Self::SYNTHESIS_WHITELIST
    }

    /// Get the icon's wire name
    pub fn name(&self) -> &'static str {
        match self {
            IconName::Bot => "bot",
            IconName::Users => "users",
            IconName::BarChart2 => "bar-chart-2",
            IconName::DollarSign => "dollar-sign",
            IconName::Sparkles => "sparkles",
            IconName::Video => "video",
            IconName::Target => "target",
            IconName::TrendingUp => "trending-up",
            IconName::Image => "image",
            IconName::MessageSquare => "message-square",
            IconName::LineChart => "line-chart",
            IconName::Compass => "compass",
            IconName::PenTool => "pen-tool",
            IconName::FlaskRound => "flask-round",
            IconName::Leaf => "leaf",
            IconName::FlaskConical => "flask-conical",
            IconName::Building => "building",
            IconName::BookOpen => "book-open",
            IconName::Code => "code",
            IconName::Microscope => "microscope",
            IconName::Globe => "globe",
        }
    }

    /// Parse an icon name, falling back to [`IconName::Bot`] for anything
    /// outside the whitelist
    pub fn coerce(raw: &str) -> IconName {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for IconName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for IconName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        IconName::all()
            .iter()
            .copied()
            .find(|icon| icon.name() == wanted)
            .ok_or_else(|| format!("Unknown icon: {}", s))
    }
}

impl From<String> for IconName {
    fn from(raw: String) -> Self {
        IconName::coerce(&raw)
    }
}

impl From<IconName> for String {
    fn from(icon: IconName) -> Self {
        icon.name().to_string()
    }
}

/// A named AI persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique name within a squad
    pub name: String,
    pub role: String,
    pub icon: IconName,
    pub color: String,
    pub personality: String,
}

impl Agent {
    /// Create an agent with the shared persona color
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        icon: IconName,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            icon,
            color: AGENT_COLOR.to_string(),
            personality: personality.into(),
        }
    }

    /// One-line profile used when briefing a model: `- Name (Role): personality`
    pub fn profile_line(&self) -> String {
        format!("- {} ({}): {}", self.name, self.role, self.personality)
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.role)
    }
}

/// A named, reusable squad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadPreset {
    pub name: String,
    pub description: String,
    pub agents: Vec<Agent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_names() {
        assert_eq!(IconName::Bot.name(), "bot");
        assert_eq!(IconName::BarChart2.name(), "bar-chart-2");
        assert_eq!(IconName::FlaskConical.name(), "flask-conical");
    }

    #[test]
    fn test_whitelist_has_all_icons() {
        assert_eq!(IconName::SYNTHESIS_WHITELIST.len(), 21);
        for icon in IconName::all() {
            assert_eq!(icon.name().parse::<IconName>().unwrap(), *icon);
        }
    }

    #[test]
    fn test_icon_from_str_invalid() {
        assert!("rocket".parse::<IconName>().is_err());
        assert!("BOT".parse::<IconName>().is_err());
    }

    #[test]
    fn test_icon_coerce() {
        assert_eq!(IconName::coerce("leaf"), IconName::Leaf);
        assert_eq!(IconName::coerce(" globe "), IconName::Globe);
        assert_eq!(IconName::coerce("rocket"), IconName::Bot);
        assert_eq!(IconName::coerce(""), IconName::Bot);
    }

    #[test]
    fn test_icon_serde() {
        let json = serde_json::to_string(&IconName::DollarSign).unwrap();
        assert_eq!(json, "\"dollar-sign\"");

        let icon: IconName = serde_json::from_str("\"trending-up\"").unwrap();
        assert_eq!(icon, IconName::TrendingUp);

        // Unknown icons in stored data degrade instead of failing the whole record
        let icon: IconName = serde_json::from_str("\"hammer\"").unwrap();
        assert_eq!(icon, IconName::Bot);
    }

    #[test]
    fn test_agent_profile_line() {
        let agent = Agent::new("Terra", "Soil Scientist", IconName::Leaf, "Patient.");
        assert_eq!(agent.profile_line(), "- Terra (Soil Scientist): Patient.");
        assert_eq!(agent.color, AGENT_COLOR);
        assert_eq!(agent.to_string(), "Terra (Soil Scientist)");
    }

    #[test]
    fn test_agent_json_layout() {
        let agent = Agent::new("Pixel", "Graphic Design Specialist", IconName::Image, "Precise.");
        let value = serde_json::to_value(&agent).unwrap();
        assert_eq!(value["icon"], "image");
        assert_eq!(value["color"], "text-purple-400");
    }
}
