//! Community command - Feed, hubs, messages, nominations and the leaderboard

use clap::{Args, Subcommand};
use cosmos_core::agent::find_agent;
use cosmos_core::community::{
    mock_authors, AgentLeaderboardStats, CommunityAuthor, CommunityDb, DEFAULT_LEADERBOARD_SIZE,
};
use cosmos_core::{Agent, IconName};

use crate::session::Session;

/// Arguments for the community command
#[derive(Args, Debug)]
pub struct CommunityArgs {
    #[command(subcommand)]
    pub command: CommunityCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommunityCommand {
    /// Show the feed, newest first
    Feed {
        /// Maximum number of posts
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Post to the feed
    Post {
        /// Post text
        #[arg(required = true)]
        text: String,
    },

    /// Comment on a post
    Comment {
        /// Post id
        post_id: String,

        /// Comment text
        text: String,
    },

    /// Like or unlike a post
    Like {
        /// Post id
        post_id: String,
    },

    /// List hubs
    Hubs,

    /// Join or leave a hub
    Join {
        /// Hub id
        hub_id: String,
    },

    /// List shared squad blueprints
    Blueprints,

    /// Adopt a blueprint squad as your roster
    Clone {
        /// Blueprint post id
        blueprint_id: String,
    },

    /// List your conversations
    Conversations,

    /// Send a direct message
    Message {
        /// Member id or name to message
        #[arg(long, conflicts_with = "conversation", required_unless_present = "conversation")]
        to: Option<String>,

        /// Existing conversation id
        #[arg(long)]
        conversation: Option<String>,

        /// Message text
        text: String,
    },

    /// Nominate an agent for the shared pool
    Nominate {
        /// Agent name
        name: String,

        /// Why the agent deserves a place
        #[arg(long)]
        reason: String,

        /// Role for a new agent that is not in the pool
        #[arg(long)]
        role: Option<String>,

        /// Personality for a new agent
        #[arg(long, default_value = "")]
        personality: String,

        /// Icon for a new agent
        #[arg(long, default_value = "bot")]
        icon: String,
    },

    /// List nominated agents
    Nominations,

    /// Vote or unvote for a nomination
    Vote {
        /// Nomination id
        nomination_id: String,
    },

    /// Show the agent leaderboard
    Leaderboard {
        /// Entries per board
        #[arg(long, default_value_t = DEFAULT_LEADERBOARD_SIZE)]
        limit: usize,
    },

    /// Let the oracle start a discussion thread
    Discuss,
}

impl CommunityArgs {
    /// Execute the community command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let community = session.community();

        match &self.command {
            CommunityCommand::Feed { limit } => {
                let db = community.fetch().await?;
                println!("Community Feed");
                println!("==============");
                for item in db.feed.iter().take(*limit) {
                    println!();
                    let author = item.author().map(|a| a.name.as_str()).unwrap_or("Oracle");
                    println!(
                        "{}  [{}] {} - {}",
                        item.id(),
                        item.kind(),
                        author,
                        item.timestamp().format("%Y-%m-%d %H:%M")
                    );
                    println!("  {}", item.headline());
                    let likes = item.likes().map(|l| l.len()).unwrap_or(0);
                    println!("  {} likes, {} comments", likes, item.comments().len());
                }
            }
            CommunityCommand::Post { text } => {
                let me = author(session).await?;
                let post = community.create_post(&me, text).await?;
                println!("Posted {}", post.id);
            }
            CommunityCommand::Comment { post_id, text } => {
                let me = author(session).await?;
                let comment = community.add_comment(post_id, &me, text).await?;
                println!("Commented {}", comment.id);
            }
            CommunityCommand::Like { post_id } => {
                let me = author(session).await?;
                if community.toggle_like(post_id, &me.id).await? {
                    println!("Liked {}", post_id);
                } else {
                    println!("Unliked {}", post_id);
                }
            }
            CommunityCommand::Hubs => {
                let db = community.fetch().await?;
                let me = session.profile().await.ok();
                println!("Hubs");
                println!("====");
                for hub in &db.hubs {
                    let joined = me.as_ref().is_some_and(|p| hub.is_member(&p.id));
                    println!();
                    println!(
                        "{}  {}{}",
                        hub.id,
                        hub.name,
                        if joined { " (member)" } else { "" }
                    );
                    println!("  {}", hub.description);
                    println!("  {} members", hub.members.len());
                }
            }
            CommunityCommand::Join { hub_id } => {
                let me = author(session).await?;
                if community.toggle_hub_membership(hub_id, &me).await? {
                    println!("Joined {}", hub_id);
                } else {
                    println!("Left {}", hub_id);
                }
            }
            CommunityCommand::Blueprints => {
                for post in community.fetch_blueprints().await? {
                    let names: Vec<&str> = post.squad.agents.iter().map(|a| a.name.as_str()).collect();
                    println!();
                    println!("{}  {} by {}", post.id, post.squad.name, post.author.name);
                    println!("  {}", post.squad.description);
                    println!("  Squad: {}", names.join(", "));
                    println!("  Cloned {} times", post.clones);
                }
            }
            CommunityCommand::Clone { blueprint_id } => {
                let (_, workspace) = session.workspace().await?;
                let post = community.clone_blueprint(blueprint_id, &workspace).await?;
                println!("Cloned \"{}\" to your roster", post.squad.name);
            }
            CommunityCommand::Conversations => {
                let me = author(session).await?;
                for conversation in community.fetch_conversations(&me.id).await? {
                    let others: Vec<&str> = conversation
                        .participants
                        .iter()
                        .filter(|p| p.id != me.id)
                        .map(|p| p.name.as_str())
                        .collect();
                    println!();
                    println!("{}  with {}", conversation.id, others.join(", "));
                    if let Some(last) = conversation.messages.last() {
                        println!("  {}", last.text);
                    }
                }
            }
            CommunityCommand::Message {
                to,
                conversation,
                text,
            } => {
                let me = author(session).await?;
                let conversation_id = match (conversation, to) {
                    (Some(id), _) => id.clone(),
                    (None, Some(other)) => {
                        let db = community.fetch().await?;
                        let other = find_member(&db, other)
                            .ok_or_else(|| anyhow::anyhow!("No community member {}", other))?;
                        community.start_conversation(&me, &other).await?.id
                    }
                    (None, None) => anyhow::bail!("Pass --to or --conversation"),
                };
                let message = community.send_message(&conversation_id, &me.id, text).await?;
                println!("Sent {} in {}", message.id, conversation_id);
            }
            CommunityCommand::Nominate {
                name,
                reason,
                role,
                personality,
                icon,
            } => {
                let me = author(session).await?;
                let agent = match role {
                    Some(role) => Agent::new(name.trim(), role.trim(), IconName::coerce(icon), personality.trim()),
                    None => find_agent(name).ok_or_else(|| {
                        anyhow::anyhow!("{} is not in the pool; pass --role to nominate a new agent", name)
                    })?,
                };
                let nomination = community.nominate_agent(agent, reason, &me).await?;
                println!("Nominated {} ({})", nomination.agent.name, nomination.id);
            }
            CommunityCommand::Nominations => {
                let db = community.fetch().await?;
                if db.nominated_agents.is_empty() {
                    println!("No nominations yet");
                }
                for nomination in &db.nominated_agents {
                    println!();
                    println!(
                        "{}  {} - {} vote(s)",
                        nomination.id,
                        nomination.agent,
                        nomination.votes.len()
                    );
                    println!("  \"{}\" - {}", nomination.reason, nomination.nominated_by.name);
                }
            }
            CommunityCommand::Vote { nomination_id } => {
                let me = author(session).await?;
                if community.toggle_vote(nomination_id, &me.id).await? {
                    println!("Voted for {}", nomination_id);
                } else {
                    println!("Removed vote from {}", nomination_id);
                }
            }
            CommunityCommand::Leaderboard { limit } => {
                let board = community.leaderboard(*limit).await?;
                println!("Most Deployed");
                println!("=============");
                print_stats(&board.top_deployed, |s| s.deployments);
                println!();
                println!("Top Contributors");
                println!("================");
                print_stats(&board.top_success, |s| s.success_contributions);
            }
            CommunityCommand::Discuss => {
                let db = community.fetch().await?;
                let host = db
                    .hubs
                    .iter()
                    .flat_map(|h| h.members.first())
                    .next()
                    .cloned()
                    .unwrap_or_else(|| mock_authors()[0].clone());
                let post = session.insights()?.generate_discussion(&host).await?;
                let post = community.create_discussion_post(post).await?;
                println!("{}  {}", post.id, post.title);
                println!();
                println!("{}", post.content);
            }
        }

        Ok(())
    }
}

async fn author(session: &Session) -> anyhow::Result<CommunityAuthor> {
    Ok(CommunityAuthor::from(&session.profile().await?))
}

/// A member known to the community, matched by id or case-insensitive name
fn find_member(db: &CommunityDb, key: &str) -> Option<CommunityAuthor> {
    let matches = |a: &CommunityAuthor| a.id == key || a.name.eq_ignore_ascii_case(key);

    db.feed
        .iter()
        .filter_map(|item| item.author())
        .chain(db.hubs.iter().flat_map(|h| h.members.iter()))
        .find(|a| matches(a))
        .cloned()
        .or_else(|| mock_authors().into_iter().find(|a| matches(a)))
}

fn print_stats(stats: &[AgentLeaderboardStats], value: impl Fn(&AgentLeaderboardStats) -> u32) {
    for (rank, stat) in stats.iter().enumerate() {
        println!("  {}. {:<12} {}", rank + 1, stat.agent_name, value(stat));
    }
}
