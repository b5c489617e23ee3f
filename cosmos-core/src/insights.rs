//! One-off model calls: showcase summaries, Oracle analysis, scenario
//! simulation, community discussion starters and agent trials

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::agent::{Agent, PromptBuilder, Template};
use crate::community::{AgentLeaderboardStats, CommunityAuthor, DiscussionPost};
use crate::mission::{new_id, Mission};
use crate::model::{CompletionRequest, GenerativeModel, ModelSettings, TextStream};
use crate::{Error, Result};

/// Icons a generated discussion may use
pub const DISCUSSION_ICONS: &[&str] = &[
    "lightbulb",
    "brain-circuit",
    "shield",
    "git-branch",
    "trending-up",
    "compass",
];

const NO_COMMUNITY_DATA: &str = "No community data available.";

/// Title and blurb for sharing a mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowcaseSummary {
    pub title: String,
    pub summary: String,
}

/// A mission the Oracle proposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionSuggestion {
    pub title: String,
    pub details: String,
    pub job_role: String,
    pub justification: String,
}

/// The Oracle's reading of a mission history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleInsight {
    pub summary: String,
    pub suggestion: MissionSuggestion,
}

#[derive(Debug, Deserialize)]
struct DiscussionDraft {
    title: String,
    content: String,
    icon: String,
}

fn mission_history(missions: &[Mission], squad_label: &str) -> Vec<String> {
    missions
        .iter()
        .map(|m| {
            let names = m
                .agents
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "- Title: {}\n  - Role: {}\n  - {}: {}",
                m.title, m.job_role, squad_label, names
            )
        })
        .collect()
}

/// Sentence naming the three agents with the most success contributions
pub fn community_context(stats: &[AgentLeaderboardStats]) -> String {
    if stats.is_empty() {
        return NO_COMMUNITY_DATA.to_string();
    }

    let mut ranked = stats.to_vec();
    ranked.sort_by(|a, b| b.success_contributions.cmp(&a.success_contributions));
    let top = ranked
        .iter()
        .take(3)
        .map(|s| format!("{} ({}% success)", s.agent_name, s.success_contributions))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Community-wide, the agents with the highest success contributions are: {}.",
        top
    )
}

fn parse<T: for<'de> Deserialize<'de>>(text: &str, what: &str) -> Result<T> {
    serde_json::from_str(text.trim())
        .map_err(|e| Error::model(format!("Malformed {} response: {}", what, e), false))
}

/// Runs the auxiliary prompts against a generative model
pub struct Insights {
    model: Arc<dyn GenerativeModel>,
    settings: ModelSettings,
}

impl Insights {
    /// Create an insights client
    pub fn new(model: Arc<dyn GenerativeModel>, settings: ModelSettings) -> Self {
        Self { model, settings }
    }

    fn request(&self, system: Template, prompt: String) -> CompletionRequest {
        CompletionRequest::new(&self.settings.text_model, prompt)
            .with_system_instruction(PromptBuilder::new(system).build())
    }

    /// Summarize a mission for a showcase post
    pub async fn summarize_for_showcase(&self, mission: &Mission) -> Result<ShowcaseSummary> {
        let document = mission
            .document
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let names = mission
            .agents
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = PromptBuilder::new(Template::ShowcaseRequest)
            .var("TITLE", &mission.title)
            .var("DETAILS", &mission.details)
            .var("DOCUMENT", document)
            .var("AGENT_NAMES", names)
            .build();

        let request = self.request(Template::Showcase, prompt).with_schema(json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": "The new, catchy title for the showcase post." },
                "summary": { "type": "STRING", "description": "A concise 2-3 sentence summary of the mission's success." }
            },
            "required": ["title", "summary"]
        }));

        let summary: ShowcaseSummary = parse(&self.model.generate(&request).await?, "showcase")?;
        info!(mission_id = %mission.id, title = %summary.title, "Summarized mission");
        Ok(summary)
    }

    /// Analyze a mission history and propose the next mission
    pub async fn analyze(
        &self,
        missions: &[Mission],
        job_role: &str,
        stats: &[AgentLeaderboardStats],
    ) -> Result<OracleInsight> {
        let prompt = PromptBuilder::new(Template::OracleRequest)
            .var("JOB_ROLE", job_role)
            .list("MISSION_HISTORY", mission_history(missions, "Agents"), "(no missions yet)")
            .var("COMMUNITY_CONTEXT", community_context(stats))
            .build();

        let request = self.request(Template::Oracle, prompt).with_schema(json!({
            "type": "OBJECT",
            "properties": {
                "summary": { "type": "STRING", "description": "A one-sentence summary of the strategic analysis." },
                "suggestion": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING", "description": "The title for the suggested new mission." },
                        "details": { "type": "STRING", "description": "A brief description of the new mission's goals." },
                        "jobRole": { "type": "STRING", "description": "The user's job role for this new mission." },
                        "justification": { "type": "STRING", "description": "A brief justification for the suggestion, referencing community data if relevant." }
                    },
                    "required": ["title", "details", "jobRole", "justification"]
                }
            },
            "required": ["summary", "suggestion"]
        }));

        debug!(missions = missions.len(), "Requesting oracle insight");
        parse(&self.model.generate(&request).await?, "oracle")
    }

    /// Stream a what-if analysis in markdown
    pub async fn simulate_scenario(&self, query: &str, missions: &[Mission]) -> Result<TextStream> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("Scenario query is empty".to_string()));
        }

        let prompt = PromptBuilder::new(Template::ScenarioRequest)
            .list("MISSION_HISTORY", mission_history(missions, "Squad"), "(no missions yet)")
            .var("QUERY", query)
            .build();

        self.model
            .generate_stream(&self.request(Template::Scenario, prompt))
            .await
    }

    /// Draft a discussion post to seed community activity
    pub async fn generate_discussion(&self, author: &CommunityAuthor) -> Result<DiscussionPost> {
        let icons = DISCUSSION_ICONS
            .iter()
            .map(|i| format!("'{}'", i))
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = PromptBuilder::new(Template::DiscussionRequest)
            .var("ICON_LIST", icons)
            .build();

        let request = self.request(Template::Discussion, prompt).with_schema(json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": "An engaging title for the discussion post." },
                "content": { "type": "STRING", "description": "The body of the post, posing a question or idea." },
                "icon": { "type": "STRING", "description": "One of the specified icon names." }
            },
            "required": ["title", "content", "icon"]
        }));

        let draft: DiscussionDraft = parse(&self.model.generate(&request).await?, "discussion")?;
        let icon = if DISCUSSION_ICONS.contains(&draft.icon.as_str()) {
            draft.icon
        } else {
            DISCUSSION_ICONS[0].to_string()
        };

        Ok(DiscussionPost {
            id: new_id("post"),
            author: author.clone(),
            title: draft.title,
            content: draft.content,
            icon,
            likes: Vec::new(),
            comments: Vec::new(),
            timestamp: Utc::now(),
        })
    }

    /// Stream an agent's in-character answer to an interview question
    pub async fn trial(&self, agent: &Agent, question: &str) -> Result<TextStream> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::Validation("Interview question is empty".to_string()));
        }

        let system = PromptBuilder::new(Template::AgentTrial)
            .var("AGENT_NAME", &agent.name)
            .var("AGENT_ROLE", &agent.role)
            .var("AGENT_PERSONALITY", &agent.personality)
            .build();
        let request =
            CompletionRequest::new(&self.settings.text_model, question).with_system_instruction(system);

        debug!(agent = %agent.name, "Starting agent trial");
        self.model.generate_stream(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::find_agent;
    use crate::mission::MissionBrief;
    use crate::stream::collect;
    use crate::testing::{ScriptedModel, StreamScript};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn insights(model: Arc<ScriptedModel>) -> Insights {
        Insights::new(model, ModelSettings::default())
    }

    fn missions() -> Vec<Mission> {
        vec![Mission::new(
            MissionBrief::new("Eco packaging", "", "Founder"),
            vec![find_agent("Kairo").unwrap(), find_agent("Scout").unwrap()],
        )]
    }

    fn stat(name: &str, success: u32) -> AgentLeaderboardStats {
        AgentLeaderboardStats {
            agent_name: name.to_string(),
            deployments: 1,
            success_contributions: success,
        }
    }

    #[test]
    fn test_community_context() {
        assert_eq!(community_context(&[]), "No community data available.");
        let text = community_context(&[stat("A", 60), stat("B", 88), stat("C", 70), stat("D", 51)]);
        assert_eq!(
            text,
            "Community-wide, the agents with the highest success contributions are: B (88% success), C (70% success), A (60% success)."
        );
    }

    #[tokio::test]
    async fn test_showcase_summary() {
        let model = Arc::new(ScriptedModel::new().with_json(json!({
            "title": "Packaging that sells itself",
            "summary": "The squad lifted pre-orders."
        })));
        let mission = &missions()[0];

        let summary = insights(model.clone()).summarize_for_showcase(mission).await.unwrap();
        assert_eq!(summary.title, "Packaging that sells itself");

        let request = model.last_request();
        assert!(request.prompt.contains("Agents Used: Kairo, Scout"));
        assert!(request.prompt.contains("# Eco packaging"));
        assert!(request.response_schema.is_some());
    }

    #[tokio::test]
    async fn test_oracle_insight() {
        let model = Arc::new(ScriptedModel::new().with_json(json!({
            "summary": "You lean on content agents.",
            "suggestion": {
                "title": "Paid acquisition test",
                "details": "Run a two-week paid pilot.",
                "jobRole": "Founder",
                "justification": "Stratos has strong community results."
            }
        })));

        let insight = insights(model.clone())
            .analyze(&missions(), "Founder", &[stat("Stratos", 80)])
            .await
            .unwrap();
        assert_eq!(insight.suggestion.job_role, "Founder");

        let prompt = model.last_request().prompt;
        assert!(prompt.contains("- Title: Eco packaging\n  - Role: Founder\n  - Agents: Kairo, Scout"));
        assert!(prompt.contains("Stratos (80% success)"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_model_error() {
        let model = Arc::new(ScriptedModel::new().with_completion(Ok("{\"summary\":".to_string())));
        let err = insights(model).analyze(&[], "Founder", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Model { retryable: false, .. }));
    }

    #[tokio::test]
    async fn test_scenario_stream() {
        let model = Arc::new(ScriptedModel::new().with_stream(StreamScript::ok(["## Outcome", "\nLikely growth."])));
        let stream = insights(model.clone())
            .simulate_scenario("What if we doubled the budget?", &missions())
            .await
            .unwrap();
        let text = collect(stream, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "## Outcome\nLikely growth.");
        assert!(model
            .last_request()
            .prompt
            .contains("Scenario Query: \"What if we doubled the budget?\""));
    }

    #[tokio::test]
    async fn test_discussion_icon_is_restricted() {
        let model = Arc::new(
            ScriptedModel::new()
                .with_json(json!({"title": "Tip", "content": "Pair Scout with Stratos.", "icon": "shield"}))
                .with_json(json!({"title": "Q", "content": "Thoughts?", "icon": "rocket"})),
        );
        let insights = insights(model);
        let [alex, ..] = crate::community::mock_authors();

        let post = insights.generate_discussion(&alex).await.unwrap();
        assert!(post.id.starts_with("post-"));
        assert_eq!(post.icon, "shield");
        assert_eq!(post.author, alex);

        let post = insights.generate_discussion(&alex).await.unwrap();
        assert_eq!(post.icon, "lightbulb");
    }

    #[tokio::test]
    async fn test_trial_persona() {
        let model = Arc::new(ScriptedModel::new().with_stream(StreamScript::ok(["I ship fast."])));
        let agent = find_agent("ClipBot").unwrap();
        insights(model.clone())
            .trial(&agent, "Why should we hire you?")
            .await
            .unwrap();

        let request = model.last_request();
        assert_eq!(request.prompt, "Why should we hire you?");
        let system = request.system_instruction.unwrap();
        assert!(system.contains("- Name: ClipBot\n- Role: Short Video Generator"));
    }

    #[tokio::test]
    async fn test_blank_inputs_rejected() {
        let insights = insights(Arc::new(ScriptedModel::new()));
        let agent = find_agent("Echo").unwrap();
        assert!(matches!(insights.trial(&agent, " ").await, Err(Error::Validation(_))));
        assert!(matches!(
            insights.simulate_scenario("", &[]).await,
            Err(Error::Validation(_))
        ));
    }
}
