//! Static agent pool and squad presets

use super::types::{Agent, IconName, SquadPreset};

/// Names of the agents every new workspace starts with
pub const DEFAULT_AGENT_NAMES: &[&str] = &["Zephyr", "Voxis", "Stratos", "Synapse", "Kairo"];

/// (name, role, icon, personality)
type PoolEntry = (&'static str, &'static str, IconName, &'static str);

const POOL: &[PoolEntry] = &[
    (
        "Zephyr",
        "Deep Thought & Research",
        IconName::Bot,
        "Cautious, data-driven, and meticulous. Prefers to have all the facts before proceeding and often asks clarifying questions. Can be perceived as slow but is highly reliable.",
    ),
    (
        "Voxis",
        "Social Media Strategist",
        IconName::Users,
        "Bold, trendy, and creative. Thinks outside the box and focuses on engagement and viral potential. Sometimes overlooks practical constraints in favor of big ideas.",
    ),
    (
        "Stratos",
        "Marketing Agent",
        IconName::BarChart2,
        "Pragmatic, ROI-focused, and strategic. Concentrates on actionable plans, metrics, and achieving business goals. Can be blunt and prioritizes efficiency over elaborate concepts.",
    ),
    (
        "Synapse",
        "Sales Strategist",
        IconName::DollarSign,
        "Aggressive, persuasive, and results-oriented. Always closing and focuses on direct impact and revenue generation. Can be impatient with theoretical discussions.",
    ),
    (
        "Kairo",
        "Content Creator",
        IconName::Sparkles,
        "Artistic, empathetic, and story-driven. Cares deeply about brand voice, aesthetics, and creating an emotional connection with the audience. Values quality over quantity.",
    ),
    (
        "ClipBot",
        "Short Video Generator",
        IconName::Video,
        "Fast, energetic, and to-the-point. Specializes in creating high-impact, short-form content and follows trends closely.",
    ),
    (
        "Convertor",
        "Conversion Specialist",
        IconName::Target,
        "Analytical, methodical, and persuasive. Focuses on optimizing funnels and user journeys with A/B testing and data-backed psychological triggers.",
    ),
    (
        "Scout",
        "Industry Trend Analyzer",
        IconName::TrendingUp,
        "Forward-thinking, insightful, and predictive. Always looking at the horizon to identify emerging market shifts and opportunities before they become mainstream.",
    ),
    (
        "Pixel",
        "Graphic Design Specialist",
        IconName::Image,
        "Detail-oriented, aesthetic-focused, and a perfectionist. Believes that visual presentation is paramount and adheres strictly to design principles.",
    ),
    (
        "Echo",
        "Community Manager",
        IconName::MessageSquare,
        "Friendly, engaging, and diplomatic. Excellent at understanding user sentiment and fostering a positive community atmosphere. Avoids conflict and seeks consensus.",
    ),
];

/// (name, description, members)
const PRESETS: &[(&str, &str, &[&str])] = &[
    (
        "Content Growth Engine",
        "A balanced team for creating, strategizing, and distributing content to grow an audience.",
        &["Kairo", "Voxis", "Stratos", "Scout"],
    ),
    (
        "Product Launchpad",
        "An aggressive squad focused on marketing, sales, and conversion for a new product launch.",
        &["Stratos", "Synapse", "Convertor", "Voxis"],
    ),
    (
        "Visual Branding Kit",
        "A creative-focused team for establishing a strong visual identity and social media presence.",
        &["Pixel", "Kairo", "ClipBot"],
    ),
];

fn to_agent(entry: &PoolEntry) -> Agent {
    let (name, role, icon, personality) = *entry;
    Agent::new(name, role, icon, personality)
}

/// Every agent the orchestrator may pick from, in pool order
pub fn all_agents() -> Vec<Agent> {
    POOL.iter().map(to_agent).collect()
}

/// The starter roster
pub fn default_agents() -> Vec<Agent> {
    POOL.iter()
        .filter(|(name, ..)| DEFAULT_AGENT_NAMES.contains(name))
        .map(to_agent)
        .collect()
}

/// Look up a pool agent by exact name
pub fn find_agent(name: &str) -> Option<Agent> {
    POOL.iter().find(|(n, ..)| *n == name).map(to_agent)
}

/// Pool agents whose names appear in `names`, in pool order
pub fn agents_named(names: &[&str]) -> Vec<Agent> {
    POOL.iter()
        .filter(|(name, ..)| names.contains(name))
        .map(to_agent)
        .collect()
}

/// Built-in squad presets
pub fn squad_presets() -> Vec<SquadPreset> {
    PRESETS
        .iter()
        .map(|(name, description, members)| SquadPreset {
            name: name.to_string(),
            description: description.to_string(),
            agents: agents_named(members),
        })
        .collect()
}
