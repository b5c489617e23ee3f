//! Mock social layer
//!
//! A local stand-in for a community backend. Every operation is a versioned
//! read-modify-write of the single community aggregate, seeded with demo
//! content the first time it is read.

mod models;
mod seed;

pub use models::{
    AgentLeaderboardStats, Blueprint, BlueprintPost, Comment, CommunityAuthor, CommunityDb,
    Conversation, DiscussionPost, FeedItem, Hub, Leaderboard, Message, NominatedAgent,
    OraclePulsePost, ShowcaseMission, ShowcasePost, UserPost,
};
pub use seed::{initial_db, mock_authors};

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::agent::Agent;
use crate::mission::new_id;
use crate::storage::{load_json_or_init, update_json_or, KeyValueStore, StorageKey, Workspace};
use crate::{Error, Result};

/// Entries returned per ranking by default
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

fn require_text(text: &str, what: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation(format!("{} is empty", what)));
    }
    Ok(text.to_string())
}

fn post_not_found(id: &str) -> Error {
    Error::NotFound(format!("post {}", id))
}

/// Community operations over a key-value store
#[derive(Clone)]
pub struct CommunityStore {
    store: Arc<dyn KeyValueStore>,
}

impl CommunityStore {
    /// Create a community store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn mutate<R, F>(&self, apply: F) -> Result<R>
    where
        F: FnMut(&mut CommunityDb) -> Result<R>,
    {
        let (_, result) =
            update_json_or(self.store.as_ref(), &StorageKey::Community, initial_db, apply).await?;
        Ok(result)
    }

    /// The whole aggregate
    pub async fn fetch(&self) -> Result<CommunityDb> {
        load_json_or_init(self.store.as_ref(), &StorageKey::Community, initial_db).await
    }

    /// Post free text to the top of the feed
    pub async fn create_post(&self, author: &CommunityAuthor, content: &str) -> Result<UserPost> {
        let content = require_text(content, "Post")?;
        let post = UserPost {
            id: new_id("post"),
            author: author.clone(),
            content,
            likes: Vec::new(),
            comments: Vec::new(),
            timestamp: Utc::now(),
        };

        self.mutate(|db| {
            db.feed.insert(0, FeedItem::UserPost(post.clone()));
            Ok(())
        })
        .await?;
        info!(post_id = %post.id, author = %author.id, "Created post");
        Ok(post)
    }

    /// Share a mission summary to the top of the feed
    pub async fn create_showcase_post(
        &self,
        author: &CommunityAuthor,
        mission: ShowcaseMission,
    ) -> Result<ShowcasePost> {
        let post = ShowcasePost {
            id: new_id("showcase"),
            author: author.clone(),
            mission,
            likes: Vec::new(),
            comments: Vec::new(),
            timestamp: Utc::now(),
        };

        self.mutate(|db| {
            db.feed.insert(0, FeedItem::MissionShowcase(post.clone()));
            Ok(())
        })
        .await?;
        info!(post_id = %post.id, "Created showcase post");
        Ok(post)
    }

    /// Add a discussion to the top of the feed
    pub async fn create_discussion_post(&self, post: DiscussionPost) -> Result<DiscussionPost> {
        self.mutate(|db| {
            db.feed.insert(0, FeedItem::DiscussionPost(post.clone()));
            Ok(())
        })
        .await?;
        info!(post_id = %post.id, "Created discussion post");
        Ok(post)
    }

    /// Comment on a post
    pub async fn add_comment(
        &self,
        post_id: &str,
        author: &CommunityAuthor,
        content: &str,
    ) -> Result<Comment> {
        let comment = Comment {
            id: new_id("comment"),
            author: author.clone(),
            content: require_text(content, "Comment")?,
            timestamp: Utc::now(),
        };

        self.mutate(|db| {
            let post = db.post_mut(post_id).ok_or_else(|| post_not_found(post_id))?;
            let comments = post.comments_mut().ok_or_else(|| {
                Error::Validation(format!("Post {} does not take comments", post_id))
            })?;
            comments.push(comment.clone());
            Ok(())
        })
        .await?;
        Ok(comment)
    }

    /// Like or unlike a post; returns whether the user now likes it
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.mutate(|db| {
            let post = db.post_mut(post_id).ok_or_else(|| post_not_found(post_id))?;
            let likes = post.likes_mut().ok_or_else(|| {
                Error::Validation(format!("Post {} cannot be liked", post_id))
            })?;

            match likes.iter().position(|id| id == user_id) {
                Some(index) => {
                    likes.remove(index);
                    Ok(false)
                }
                None => {
                    likes.push(user_id.to_string());
                    Ok(true)
                }
            }
        })
        .await
    }

    /// Join or leave a hub; returns whether the user is now a member
    pub async fn toggle_hub_membership(&self, hub_id: &str, member: &CommunityAuthor) -> Result<bool> {
        let joined = self
            .mutate(|db| {
                let hub = db
                    .hubs
                    .iter_mut()
                    .find(|h| h.id == hub_id)
                    .ok_or_else(|| Error::NotFound(format!("hub {}", hub_id)))?;

                match hub.members.iter().position(|m| m.id == member.id) {
                    Some(index) => {
                        hub.members.remove(index);
                        Ok(false)
                    }
                    None => {
                        hub.members.push(member.clone());
                        Ok(true)
                    }
                }
            })
            .await?;
        info!(hub_id = %hub_id, user_id = %member.id, joined, "Toggled hub membership");
        Ok(joined)
    }

    /// Look up a hub
    pub async fn hub(&self, hub_id: &str) -> Result<Hub> {
        self.fetch()
            .await?
            .hub(hub_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("hub {}", hub_id)))
    }

    /// Blueprint posts in feed order
    pub async fn fetch_blueprints(&self) -> Result<Vec<BlueprintPost>> {
        Ok(self
            .fetch()
            .await?
            .feed
            .into_iter()
            .filter_map(|item| match item {
                FeedItem::SquadBlueprint(post) => Some(post),
                _ => None,
            })
            .collect())
    }

    /// Adopt a blueprint's squad as the workspace roster
    pub async fn clone_blueprint(&self, blueprint_id: &str, workspace: &Workspace) -> Result<BlueprintPost> {
        let post = self
            .mutate(|db| {
                match db.post_mut(blueprint_id) {
                    Some(FeedItem::SquadBlueprint(post)) => {
                        post.clones += 1;
                        Ok(post.clone())
                    }
                    _ => Err(Error::NotFound(format!("blueprint {}", blueprint_id))),
                }
            })
            .await?;

        workspace.set_roster(&post.squad.agents).await?;
        info!(
            blueprint_id = %blueprint_id,
            user_id = %workspace.user_id(),
            clones = post.clones,
            "Cloned blueprint"
        );
        Ok(post)
    }

    /// Conversations the user takes part in
    pub async fn fetch_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        Ok(self
            .fetch()
            .await?
            .conversations
            .into_iter()
            .filter(|c| c.includes(user_id))
            .collect())
    }

    /// Open a thread between two members, reusing an existing one
    pub async fn start_conversation(
        &self,
        me: &CommunityAuthor,
        other: &CommunityAuthor,
    ) -> Result<Conversation> {
        if me.id == other.id {
            return Err(Error::Validation("Cannot start a conversation with yourself".to_string()));
        }

        self.mutate(|db| {
            if let Some(existing) = db
                .conversations
                .iter()
                .find(|c| c.participants.len() == 2 && c.includes(&me.id) && c.includes(&other.id))
            {
                return Ok(existing.clone());
            }

            let conversation = Conversation {
                id: new_id("convo"),
                participants: vec![me.clone(), other.clone()],
                messages: Vec::new(),
            };
            db.conversations.push(conversation.clone());
            Ok(conversation)
        })
        .await
    }

    /// Append a message to a thread
    pub async fn send_message(&self, conversation_id: &str, sender_id: &str, text: &str) -> Result<Message> {
        let message = Message {
            id: new_id("msg"),
            sender_id: sender_id.to_string(),
            text: require_text(text, "Message")?,
            timestamp: Utc::now(),
        };

        self.mutate(|db| {
            let conversation = db
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)
                .ok_or_else(|| Error::NotFound(format!("conversation {}", conversation_id)))?;
            conversation.messages.push(message.clone());
            Ok(())
        })
        .await?;
        Ok(message)
    }

    /// Propose an agent for the community foundry
    pub async fn nominate_agent(
        &self,
        agent: Agent,
        reason: &str,
        nominated_by: &CommunityAuthor,
    ) -> Result<NominatedAgent> {
        let nomination = NominatedAgent {
            id: new_id("nomination"),
            agent,
            reason: require_text(reason, "Reason")?,
            nominated_by: nominated_by.clone(),
            votes: Vec::new(),
        };

        self.mutate(|db| {
            if db
                .nominated_agents
                .iter()
                .any(|n| n.agent.name == nomination.agent.name)
            {
                return Err(Error::Validation(format!(
                    "{} has already been nominated",
                    nomination.agent.name
                )));
            }
            db.nominated_agents.push(nomination.clone());
            Ok(())
        })
        .await?;
        Ok(nomination)
    }

    /// Vote or unvote for a nomination; returns whether the user now votes for it
    pub async fn toggle_vote(&self, nomination_id: &str, user_id: &str) -> Result<bool> {
        self.mutate(|db| {
            let nomination = db
                .nominated_agents
                .iter_mut()
                .find(|n| n.id == nomination_id)
                .ok_or_else(|| Error::NotFound(format!("nomination {}", nomination_id)))?;

            match nomination.votes.iter().position(|id| id == user_id) {
                Some(index) => {
                    nomination.votes.remove(index);
                    Ok(false)
                }
                None => {
                    nomination.votes.push(user_id.to_string());
                    Ok(true)
                }
            }
        })
        .await
    }

    /// Agents ranked by deployments and by success contributions
    pub async fn leaderboard(&self, limit: usize) -> Result<Leaderboard> {
        let stats = self.fetch().await?.agent_stats;
        Ok(rank(stats, limit))
    }

    /// Count a squad deployment for each agent
    pub async fn record_deployment(&self, agent_names: &[String]) -> Result<()> {
        self.bump(agent_names, |stat| stat.deployments += 1).await
    }

    /// Count a showcased success for each agent
    pub async fn record_success(&self, agent_names: &[String]) -> Result<()> {
        self.bump(agent_names, |stat| stat.success_contributions += 1).await
    }

    async fn bump<F>(&self, agent_names: &[String], bump: F) -> Result<()>
    where
        F: Fn(&mut AgentLeaderboardStats),
    {
        self.mutate(|db| {
            for name in agent_names {
                match db.agent_stats.iter_mut().find(|s| s.agent_name == *name) {
                    Some(stat) => bump(stat),
                    None => {
                        let mut stat = AgentLeaderboardStats::new(name.clone());
                        bump(&mut stat);
                        db.agent_stats.push(stat);
                    }
                }
            }
            Ok(())
        })
        .await
    }
}

/// Rank stats descending; ties keep their stored order
pub fn rank(stats: Vec<AgentLeaderboardStats>, limit: usize) -> Leaderboard {
    let mut top_deployed = stats.clone();
    top_deployed.sort_by(|a, b| b.deployments.cmp(&a.deployments));
    top_deployed.truncate(limit);

    let mut top_success = stats;
    top_success.sort_by(|a, b| b.success_contributions.cmp(&a.success_contributions));
    top_success.truncate(limit);

    Leaderboard {
        top_deployed,
        top_success,
    }
}
