//! Squad assembly
//!
//! The orchestrator asks the model to pick 2 to 4 agents for a mission,
//! optionally inventing one new specialist, and resolves the answer against
//! the agent pool and the user's preferred roster.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::agent::{all_agents, Agent, IconName, PromptBuilder, Template};
use crate::mission::MissionBrief;
use crate::model::{CompletionRequest, GenerativeModel, ModelSettings};

/// Largest squad a mission may have
pub const MAX_SQUAD_SIZE: usize = 4;

const DEFAULT_NEW_ROLE: &str = "Specialist";
const DEFAULT_NEW_PERSONALITY: &str = "A newly created specialist.";

const ROSTER_CLAUSE: &str = " The user has a roster of preferred agents. You MUST heavily prioritize selecting from this roster. Only if a critical skill is missing should you recruit from the main pool or create a new agent.";

/// Why a squad could not be assembled
#[derive(Error, Debug)]
pub enum SquadError {
    #[error("Model call failed: {0}")]
    ModelUnavailable(#[from] crate::Error),

    #[error("Malformed orchestrator response: {0}")]
    MalformedResponse(String),

    #[error("No known agents in orchestrator response")]
    NoValidSquad,
}

impl SquadError {
    /// Stable code used in logs
    pub fn code(&self) -> &'static str {
        match self {
            SquadError::ModelUnavailable(_) => "E_SQUAD_MODEL",
            SquadError::MalformedResponse(_) => "E_SQUAD_PARSE",
            SquadError::NoValidSquad => "E_SQUAD_EMPTY",
        }
    }
}

/// Agent definition invented by the model
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAgentSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub icon: String,
}

/// Parsed orchestrator answer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadResponse {
    pub squad_member_names: Vec<String>,
    #[serde(default)]
    pub new_agent: Option<NewAgentSpec>,
}

impl SquadResponse {
    /// Parse the model's JSON text
    pub fn parse(text: &str) -> Result<Self, SquadError> {
        serde_json::from_str(text.trim()).map_err(|e| SquadError::MalformedResponse(e.to_string()))
    }
}

/// JSON schema the orchestrator response must follow
pub fn squad_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "squadMemberNames": {
                "type": "ARRAY",
                "description": "An array of agent names for the squad. This MUST include the new agent's name if one is created.",
                "items": { "type": "STRING" }
            },
            "newAgent": {
                "type": "OBJECT",
                "description": "Define a new agent ONLY if no existing agent has the required core skills. If no new agent is created, OMIT this field from the JSON output entirely.",
                "properties": {
                    "name": { "type": "STRING", "description": "A creative, single-word name for the new agent." },
                    "role": { "type": "STRING", "description": "A concise, specialized role for the new agent." },
                    "personality": { "type": "STRING", "description": "A brief description of the new agent's personality." },
                    "icon": { "type": "STRING", "description": "Choose the most fitting icon name from the provided list for the new agent's role." }
                }
            }
        },
        "required": ["squadMemberNames"]
    })
}

/// Turn an orchestrator answer into a squad
///
/// The invented agent (if it has a name) comes first, then the named agents
/// in the order given, looked up in the pool and then in `preferred`.
/// Unknown names and repeats are skipped and the result is capped at
/// [`MAX_SQUAD_SIZE`].
pub fn resolve_squad(response: &SquadResponse, preferred: &[Agent]) -> Vec<Agent> {
    let mut squad: Vec<Agent> = Vec::new();

    if let Some(spec) = &response.new_agent {
        let name = spec.name.trim();
        if !name.is_empty() {
            let role = match spec.role.trim() {
                "" => DEFAULT_NEW_ROLE,
                role => role,
            };
            let personality = match spec.personality.trim() {
                "" => DEFAULT_NEW_PERSONALITY,
                personality => personality,
            };
            squad.push(Agent::new(
                name,
                role,
                IconName::coerce(&spec.icon),
                personality,
            ));
        }
    }

    let pool = all_agents();
    for name in &response.squad_member_names {
        if squad.len() >= MAX_SQUAD_SIZE {
            break;
        }
        if squad.iter().any(|a| a.name == *name) {
            continue;
        }

        let found = pool
            .iter()
            .chain(preferred.iter())
            .find(|a| a.name == *name);
        match found {
            Some(agent) => squad.push(agent.clone()),
            None => debug!(name = %name, "Skipping unknown agent"),
        }
    }

    squad.truncate(MAX_SQUAD_SIZE);
    squad
}

/// Assembles squads through a generative model
pub struct Orchestrator {
    model: Arc<dyn GenerativeModel>,
    settings: ModelSettings,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(model: Arc<dyn GenerativeModel>, settings: ModelSettings) -> Self {
        Self { model, settings }
    }

    /// Build the squad selection request
    pub fn build_request(&self, brief: &MissionBrief, preferred: Option<&[Agent]>) -> CompletionRequest {
        let preferred = preferred.unwrap_or_default();

        let system = PromptBuilder::new(Template::Orchestrator)
            .var(
                "ROSTER_CLAUSE",
                if preferred.is_empty() { "" } else { ROSTER_CLAUSE },
            )
            .build();

        let roster = if preferred.is_empty() {
            String::new()
        } else {
            let lines = preferred
                .iter()
                .map(|a| format!("- {}: {}", a.name, a.role))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\nUser's Preferred Roster:\n{}\n", lines)
        };

        let details = match brief.details.trim() {
            "" => "None provided.",
            details => details,
        };

        let prompt = PromptBuilder::new(Template::OrchestratorRequest)
            .list(
                "AGENT_LIST",
                all_agents()
                    .iter()
                    .map(|a| format!("- {}: {} ({})", a.name, a.role, a.personality)),
                "",
            )
            .var(
                "ICON_LIST",
                IconName::SYNTHESIS_WHITELIST
                    .iter()
                    .map(|i| i.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
            .var("PREFERRED_ROSTER", roster)
            .var("JOB_ROLE", &brief.job_role)
            .var("TITLE", &brief.title)
            .var("DETAILS", details)
            .build();

        CompletionRequest::new(&self.settings.text_model, prompt)
            .with_system_instruction(system)
            .with_schema(squad_schema())
    }

    /// Assemble a squad, reporting why it failed
    pub async fn try_assemble(
        &self,
        brief: &MissionBrief,
        preferred: Option<&[Agent]>,
    ) -> Result<Vec<Agent>, SquadError> {
        let request = self.build_request(brief, preferred);
        let text = self.model.generate(&request).await?;
        let response = SquadResponse::parse(&text)?;

        let squad = resolve_squad(&response, preferred.unwrap_or_default());
        if squad.is_empty() {
            return Err(SquadError::NoValidSquad);
        }

        info!(
            title = %brief.title,
            size = squad.len(),
            synthesized = response.new_agent.as_ref().is_some_and(|a| !a.name.trim().is_empty()),
            "Assembled squad"
        );
        Ok(squad)
    }

    /// Assemble a squad, returning an empty list on any failure
    pub async fn assemble(&self, brief: &MissionBrief, preferred: Option<&[Agent]>) -> Vec<Agent> {
        match self.try_assemble(brief, preferred).await {
            Ok(squad) => squad,
            Err(e @ SquadError::NoValidSquad) => {
                warn!(code = e.code(), title = %brief.title, "Failed to orchestrate squad");
                Vec::new()
            }
            Err(e) => {
                error!(code = e.code(), error = %e, title = %brief.title, "Failed to orchestrate squad");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::find_agent;
    use crate::testing::ScriptedModel;
    use crate::Error;
    use std::collections::HashSet;

    fn brief() -> MissionBrief {
        MissionBrief::new(
            "Launch a sustainable sneaker brand",
            "Recycled materials, Gen Z audience",
            "Entrepreneur",
        )
    }

    fn orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
        Orchestrator::new(model, ModelSettings::default())
    }

    #[tokio::test]
    async fn test_sneaker_brand_squad() {
        let model = Arc::new(ScriptedModel::new().with_json(json!({
            "squadMemberNames": ["Terra", "Kairo", "Voxis", "Stratos"],
            "newAgent": {
                "name": "Terra",
                "role": "Sustainable Materials Expert",
                "personality": "Grounded and precise.",
                "icon": "leaf"
            }
        })));

        let squad = orchestrator(model).assemble(&brief(), None).await;

        assert!((2..=4).contains(&squad.len()));
        assert_eq!(squad[0].name, "Terra");
        assert_eq!(squad[0].icon, IconName::Leaf);
        assert_eq!(squad[0].color, "text-purple-400");
        let names: Vec<_> = squad.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Terra", "Kairo", "Voxis", "Stratos"]);
    }

    #[test]
    fn test_new_agent_defaults_and_icon_coercion() {
        let response = SquadResponse {
            squad_member_names: vec!["Zephyr".to_string()],
            new_agent: Some(NewAgentSpec {
                name: "Agro".to_string(),
                icon: "tractor".to_string(),
                ..Default::default()
            }),
        };
        let squad = resolve_squad(&response, &[]);
        assert_eq!(squad[0].role, "Specialist");
        assert_eq!(squad[0].personality, "A newly created specialist.");
        assert_eq!(squad[0].icon, IconName::Bot);
        assert_eq!(squad[1].name, "Zephyr");
    }

    #[test]
    fn test_unnamed_new_agent_is_ignored() {
        let response = SquadResponse {
            squad_member_names: vec!["Pixel".to_string(), "Echo".to_string()],
            new_agent: Some(NewAgentSpec::default()),
        };
        let names: Vec<_> = resolve_squad(&response, &[])
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Pixel", "Echo"]);
    }

    #[test]
    fn test_duplicates_unknowns_and_cap() {
        let response = SquadResponse {
            squad_member_names: ["Voxis", "Ghost", "Voxis", "Kairo", "Scout", "Pixel", "Echo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            new_agent: None,
        };
        let squad = resolve_squad(&response, &[]);
        let names: Vec<_> = squad.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Voxis", "Kairo", "Scout", "Pixel"]);

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_preferred_roster_resolves_custom_agents() {
        let custom = Agent::new("Nova", "Growth Hacker", IconName::Target, "Restless.");
        let response = SquadResponse {
            squad_member_names: vec!["Nova".to_string(), "Synapse".to_string()],
            new_agent: None,
        };
        let squad = resolve_squad(&response, std::slice::from_ref(&custom));
        assert_eq!(squad[0], custom);
        assert_eq!(squad[1].name, "Synapse");
    }

    #[test]
    fn test_request_without_roster() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new()));
        let request = orchestrator.build_request(&MissionBrief::new("Grow", "", "Marketer"), None);

        let system = request.system_instruction.unwrap();
        assert!(system.ends_with("if one was created."));
        assert!(!request.prompt.contains("(not specified)"));
        assert!(!request.prompt.contains("Preferred Roster"));
        assert!(request.prompt.contains("- Mission Specifications: None provided."));
        assert!(request.prompt.contains("- Zephyr: Deep Thought & Research (Cautious"));
        assert!(request.prompt.contains("bot, users, bar-chart-2"));
        assert_eq!(request.response_schema.unwrap()["required"][0], "squadMemberNames");
    }

    #[test]
    fn test_request_with_roster() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new()));
        let roster = vec![find_agent("Pixel").unwrap()];
        let request = orchestrator.build_request(&brief(), Some(&roster));

        assert!(request
            .system_instruction
            .unwrap()
            .contains("You MUST heavily prioritize selecting from this roster."));
        assert!(request
            .prompt
            .contains("User's Preferred Roster:\n- Pixel: Graphic Design Specialist"));
    }

    #[tokio::test]
    async fn test_model_failure_is_swallowed() {
        let model = Arc::new(
            ScriptedModel::new().with_completion(Err(Error::model("quota exceeded", true))),
        );
        let orchestrator = orchestrator(model);
        assert!(orchestrator.assemble(&brief(), None).await.is_empty());
    }

    #[tokio::test]
    async fn test_typed_failures() {
        let model = Arc::new(
            ScriptedModel::new()
                .with_completion(Ok("not json".to_string()))
                .with_json(json!({"newAgent": {"name": "X"}}))
                .with_json(json!({"squadMemberNames": ["Ghost"]}))
                .with_completion(Err(Error::Timeout(std::time::Duration::from_secs(1)))),
        );
        let orchestrator = orchestrator(model);

        for expected in ["E_SQUAD_PARSE", "E_SQUAD_PARSE", "E_SQUAD_EMPTY", "E_SQUAD_MODEL"] {
            let err = orchestrator.try_assemble(&brief(), None).await.unwrap_err();
            assert_eq!(err.code(), expected);
        }
    }
}
