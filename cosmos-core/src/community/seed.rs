//! Demo community content written on first use

use chrono::{Duration, Utc};
use rand::Rng;

use super::models::{
    AgentLeaderboardStats, Blueprint, BlueprintPost, Comment, CommunityAuthor, CommunityDb,
    DiscussionPost, FeedItem, Hub, ShowcaseMission, ShowcasePost,
};
use crate::agent::{agents_named, default_agents};

fn author(id: &str, name: &str, avatar: &str, job_role: &str) -> CommunityAuthor {
    CommunityAuthor {
        id: id.to_string(),
        name: name.to_string(),
        avatar_url: format!("https://i.pravatar.cc/150?u={}", avatar),
        job_role: Some(job_role.to_string()),
    }
}

/// The three demo authors
pub fn mock_authors() -> [CommunityAuthor; 3] {
    [
        author("author-1", "Alex Johnson", "alex", "Growth Marketer"),
        author("author-2", "Brenda Smith", "brenda", "SEO Specialist"),
        author("author-3", "Charles White", "charles", "Startup Founder"),
    ]
}

/// Fresh community aggregate with demo posts, hubs and randomized stats
pub fn initial_db() -> CommunityDb {
    let now = Utc::now();
    let [alex, brenda, charles] = mock_authors();

    let showcase = FeedItem::MissionShowcase(ShowcasePost {
        id: "showcase-1".to_string(),
        author: alex.clone(),
        mission: ShowcaseMission {
            mission_title: "Eco-Friendly Packaging Launch Strategy".to_string(),
            summary: "Leveraged a content-focused squad to develop and execute a multi-platform marketing strategy, resulting in a 40% increase in pre-orders for our new product line.".to_string(),
            squad: agents_named(&["Kairo", "Voxis", "Stratos"]),
        },
        likes: vec![brenda.id.clone(), charles.id.clone()],
        comments: vec![
            Comment {
                id: "c1-1".to_string(),
                author: charles.clone(),
                content: "Impressive results! How did you measure pre-order lift?".to_string(),
                timestamp: now - Duration::minutes(60),
            },
            Comment {
                id: "c1-2".to_string(),
                author: alex.clone(),
                content: "Thanks! We used unique UTMs for each platform and compared against baseline projections.".to_string(),
                timestamp: now - Duration::minutes(50),
            },
        ],
        timestamp: now - Duration::days(1),
    });

    let discussion = FeedItem::DiscussionPost(DiscussionPost {
        id: "discussion-1".to_string(),
        author: brenda.clone(),
        title: "Which agent is most underrated for technical SEO analysis?".to_string(),
        content: "I've had surprising success with Zephyr for keyword clustering, but I'm curious if anyone has found a better combination of agents for deep-dive SEO tasks.".to_string(),
        icon: "brain-circuit".to_string(),
        likes: vec![alex.id.clone()],
        comments: Vec::new(),
        timestamp: now - Duration::days(2),
    });

    let blueprint = FeedItem::SquadBlueprint(BlueprintPost {
        id: "blueprint-1".to_string(),
        author: charles.clone(),
        squad: Blueprint {
            name: "Rapid Growth Hacking Unit".to_string(),
            description: "A lean, aggressive squad designed for quick A/B testing, viral content creation, and conversion optimization. Perfect for early-stage startups.".to_string(),
            agents: agents_named(&["Voxis", "Convertor", "ClipBot"]),
        },
        likes: vec![alex.id.clone(), brenda.id.clone()],
        comments: Vec::new(),
        clones: 25,
        timestamp: now - Duration::days(3),
    });

    let hubs = vec![
        Hub {
            id: "hub-1".to_string(),
            name: "Marketing Mavericks".to_string(),
            description: "A community for marketers to share strategies, tools, and success stories.".to_string(),
            members: vec![alex, brenda],
        },
        Hub {
            id: "hub-2".to_string(),
            name: "Startup Founders".to_string(),
            description: "Connect with fellow entrepreneurs to navigate the challenges of building a business.".to_string(),
            members: vec![charles],
        },
    ];

    let mut rng = rand::thread_rng();
    let agent_stats = default_agents()
        .into_iter()
        .map(|agent| AgentLeaderboardStats {
            agent_name: agent.name,
            deployments: rng.gen_range(0..50),
            success_contributions: rng.gen_range(50..90),
        })
        .collect();

    CommunityDb {
        feed: vec![showcase, discussion, blueprint],
        hubs,
        conversations: Vec::new(),
        agent_stats,
        nominated_agents: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_db() {
        let db = initial_db();
        let kinds: Vec<_> = db.feed.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec!["mission_showcase", "discussion_post", "squad_blueprint"]);
        assert_eq!(db.hubs.len(), 2);
        assert!(db.hubs[0].is_member("author-1"));
        assert_eq!(db.agent_stats.len(), 5);
        for stat in &db.agent_stats {
            assert!(stat.deployments < 50);
            assert!((50..90).contains(&stat.success_contributions));
        }
    }

    #[test]
    fn test_seed_squads_resolve() {
        let db = initial_db();
        match &db.feed[2] {
            FeedItem::SquadBlueprint(post) => {
                let names: Vec<_> = post.squad.agents.iter().map(|a| a.name.as_str()).collect();
                // pool order
                assert_eq!(names, vec!["Voxis", "ClipBot", "Convertor"]);
                assert_eq!(post.clones, 25);
            }
            other => panic!("unexpected feed item {}", other.kind()),
        }
    }
}
