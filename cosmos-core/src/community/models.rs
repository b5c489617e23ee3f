//! Community records
//!
//! The whole community is one JSON aggregate. Feed items are tagged by a
//! `type` field so mixed feeds load back into the right variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::storage::UserProfile;

/// Public face of a community member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityAuthor {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_role: Option<String>,
}

impl From<&UserProfile> for CommunityAuthor {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            avatar_url: profile
                .avatar_url
                .clone()
                .unwrap_or_else(|| format!("https://i.pravatar.cc/150?u={}", profile.email)),
            job_role: profile.job_role.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: CommunityAuthor,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPost {
    pub id: String,
    pub author: CommunityAuthor,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionPost {
    pub id: String,
    pub author: CommunityAuthor,
    pub title: String,
    pub content: String,
    /// Display icon; discussions use a wider icon set than agents
    pub icon: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub timestamp: DateTime<Utc>,
}

/// The mission part of a showcase post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseMission {
    pub mission_title: String,
    pub summary: String,
    pub squad: Vec<Agent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowcasePost {
    pub id: String,
    pub author: CommunityAuthor,
    pub mission: ShowcaseMission,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub timestamp: DateTime<Utc>,
}

/// A shareable squad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub name: String,
    pub description: String,
    pub agents: Vec<Agent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintPost {
    pub id: String,
    pub author: CommunityAuthor,
    pub squad: Blueprint,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub clones: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OraclePulsePost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub icon: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry in the community feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    UserPost(UserPost),
    DiscussionPost(DiscussionPost),
    MissionShowcase(ShowcasePost),
    SquadBlueprint(BlueprintPost),
    OraclePulse(OraclePulsePost),
}

impl FeedItem {
    pub fn id(&self) -> &str {
        match self {
            FeedItem::UserPost(p) => &p.id,
            FeedItem::DiscussionPost(p) => &p.id,
            FeedItem::MissionShowcase(p) => &p.id,
            FeedItem::SquadBlueprint(p) => &p.id,
            FeedItem::OraclePulse(p) => &p.id,
        }
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            FeedItem::UserPost(_) => "user_post",
            FeedItem::DiscussionPost(_) => "discussion_post",
            FeedItem::MissionShowcase(_) => "mission_showcase",
            FeedItem::SquadBlueprint(_) => "squad_blueprint",
            FeedItem::OraclePulse(_) => "oracle_pulse",
        }
    }

    pub fn author(&self) -> Option<&CommunityAuthor> {
        match self {
            FeedItem::UserPost(p) => Some(&p.author),
            FeedItem::DiscussionPost(p) => Some(&p.author),
            FeedItem::MissionShowcase(p) => Some(&p.author),
            FeedItem::SquadBlueprint(p) => Some(&p.author),
            FeedItem::OraclePulse(_) => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            FeedItem::UserPost(p) => p.timestamp,
            FeedItem::DiscussionPost(p) => p.timestamp,
            FeedItem::MissionShowcase(p) => p.timestamp,
            FeedItem::SquadBlueprint(p) => p.timestamp,
            FeedItem::OraclePulse(p) => p.timestamp,
        }
    }

    /// User ids that liked the post; oracle pulses cannot be liked
    pub fn likes(&self) -> Option<&Vec<String>> {
        match self {
            FeedItem::UserPost(p) => Some(&p.likes),
            FeedItem::DiscussionPost(p) => Some(&p.likes),
            FeedItem::MissionShowcase(p) => Some(&p.likes),
            FeedItem::SquadBlueprint(p) => Some(&p.likes),
            FeedItem::OraclePulse(_) => None,
        }
    }

    pub fn likes_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            FeedItem::UserPost(p) => Some(&mut p.likes),
            FeedItem::DiscussionPost(p) => Some(&mut p.likes),
            FeedItem::MissionShowcase(p) => Some(&mut p.likes),
            FeedItem::SquadBlueprint(p) => Some(&mut p.likes),
            FeedItem::OraclePulse(_) => None,
        }
    }

    pub fn comments(&self) -> &[Comment] {
        match self {
            FeedItem::UserPost(p) => &p.comments,
            FeedItem::DiscussionPost(p) => &p.comments,
            FeedItem::MissionShowcase(p) => &p.comments,
            FeedItem::SquadBlueprint(p) => &p.comments,
            FeedItem::OraclePulse(_) => &[],
        }
    }

    pub fn comments_mut(&mut self) -> Option<&mut Vec<Comment>> {
        match self {
            FeedItem::UserPost(p) => Some(&mut p.comments),
            FeedItem::DiscussionPost(p) => Some(&mut p.comments),
            FeedItem::MissionShowcase(p) => Some(&mut p.comments),
            FeedItem::SquadBlueprint(p) => Some(&mut p.comments),
            FeedItem::OraclePulse(_) => None,
        }
    }

    /// One-line headline for listings
    pub fn headline(&self) -> String {
        match self {
            FeedItem::UserPost(p) => p.content.clone(),
            FeedItem::DiscussionPost(p) => p.title.clone(),
            FeedItem::MissionShowcase(p) => p.mission.mission_title.clone(),
            FeedItem::SquadBlueprint(p) => p.squad.name.clone(),
            FeedItem::OraclePulse(p) => p.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hub {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub members: Vec<CommunityAuthor>,
}

impl Hub {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A direct message thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: Vec<CommunityAuthor>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn includes(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }
}

/// Usage counters for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLeaderboardStats {
    pub agent_name: String,
    pub deployments: u32,
    pub success_contributions: u32,
}

impl AgentLeaderboardStats {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            deployments: 0,
            success_contributions: 0,
        }
    }
}

/// A community-proposed agent awaiting votes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NominatedAgent {
    pub id: String,
    pub agent: Agent,
    pub reason: String,
    pub nominated_by: CommunityAuthor,
    #[serde(default)]
    pub votes: Vec<String>,
}

/// The community aggregate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityDb {
    #[serde(default)]
    pub feed: Vec<FeedItem>,
    #[serde(default)]
    pub hubs: Vec<Hub>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub agent_stats: Vec<AgentLeaderboardStats>,
    #[serde(default)]
    pub nominated_agents: Vec<NominatedAgent>,
}

impl CommunityDb {
    pub fn post_mut(&mut self, id: &str) -> Option<&mut FeedItem> {
        self.feed.iter_mut().find(|p| p.id() == id)
    }

    pub fn hub(&self, id: &str) -> Option<&Hub> {
        self.hubs.iter().find(|h| h.id == id)
    }
}

/// Ranked agent stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub top_deployed: Vec<AgentLeaderboardStats>,
    pub top_success: Vec<AgentLeaderboardStats>,
}
