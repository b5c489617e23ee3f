//! Prompt templates
//!
//! Every model call is briefed with an embedded template. Templates use
//! `{{VARIABLE}}` placeholders that are rendered with a [`PromptContext`].

use std::collections::HashMap;
use std::fmt;

const ORCHESTRATOR: &str = include_str!("prompts/orchestrator.md");
const ORCHESTRATOR_REQUEST: &str = include_str!("prompts/orchestrator_request.md");
const HUDDLE: &str = include_str!("prompts/huddle.md");
const HUDDLE_REQUEST: &str = include_str!("prompts/huddle_request.md");
const DOCUMENT_EDITOR: &str = include_str!("prompts/document_editor.md");
const DOCUMENT_REQUEST: &str = include_str!("prompts/document_request.md");
const AGENT_TRIAL: &str = include_str!("prompts/agent_trial.md");
const SHOWCASE: &str = include_str!("prompts/showcase.md");
const SHOWCASE_REQUEST: &str = include_str!("prompts/showcase_request.md");
const ORACLE: &str = include_str!("prompts/oracle.md");
const ORACLE_REQUEST: &str = include_str!("prompts/oracle_request.md");
const SCENARIO: &str = include_str!("prompts/scenario.md");
const SCENARIO_REQUEST: &str = include_str!("prompts/scenario_request.md");
const DISCUSSION: &str = include_str!("prompts/discussion.md");
const DISCUSSION_REQUEST: &str = include_str!("prompts/discussion_request.md");

/// Text rendered for a placeholder with no value
const UNSET: &str = "(not specified)";

/// Embedded templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Squad selection instructions
    Orchestrator,
    /// Mission and pool description sent to the orchestrator
    OrchestratorRequest,
    /// Collective squad voice for the huddle
    Huddle,
    /// Document context and conversation history
    HuddleRequest,
    /// Whole-document rewriting instructions
    DocumentEditor,
    /// Current document and the user's command
    DocumentRequest,
    /// Single persona interview
    AgentTrial,
    Showcase,
    ShowcaseRequest,
    Oracle,
    OracleRequest,
    Scenario,
    ScenarioRequest,
    Discussion,
    DiscussionRequest,
}

impl Template {
    /// Get all templates
    pub fn all() -> &'static [Template] {
        &[
            Template::Orchestrator,
            Template::OrchestratorRequest,
            Template::Huddle,
            Template::HuddleRequest,
            Template::DocumentEditor,
            Template::DocumentRequest,
            Template::AgentTrial,
            Template::Showcase,
            Template::ShowcaseRequest,
            Template::Oracle,
            Template::OracleRequest,
            Template::Scenario,
            Template::ScenarioRequest,
            Template::Discussion,
            Template::DiscussionRequest,
        ]
    }

    /// Get the template's short name
    pub fn name(&self) -> &'static str {
        match self {
            Template::Orchestrator => "orchestrator",
            Template::OrchestratorRequest => "orchestrator_request",
            Template::Huddle => "huddle",
            Template::HuddleRequest => "huddle_request",
            Template::DocumentEditor => "document_editor",
            Template::DocumentRequest => "document_request",
            Template::AgentTrial => "agent_trial",
            Template::Showcase => "showcase",
            Template::ShowcaseRequest => "showcase_request",
            Template::Oracle => "oracle",
            Template::OracleRequest => "oracle_request",
            Template::Scenario => "scenario",
            Template::ScenarioRequest => "scenario_request",
            Template::Discussion => "discussion",
            Template::DiscussionRequest => "discussion_request",
        }
    }

    /// Get the raw template text
    pub fn raw(&self) -> &'static str {
        match self {
            Template::Orchestrator => ORCHESTRATOR,
            Template::OrchestratorRequest => ORCHESTRATOR_REQUEST,
            Template::Huddle => HUDDLE,
            Template::HuddleRequest => HUDDLE_REQUEST,
            Template::DocumentEditor => DOCUMENT_EDITOR,
            Template::DocumentRequest => DOCUMENT_REQUEST,
            Template::AgentTrial => AGENT_TRIAL,
            Template::Showcase => SHOWCASE,
            Template::ShowcaseRequest => SHOWCASE_REQUEST,
            Template::Oracle => ORACLE,
            Template::OracleRequest => ORACLE_REQUEST,
            Template::Scenario => SCENARIO,
            Template::ScenarioRequest => SCENARIO_REQUEST,
            Template::Discussion => DISCUSSION,
            Template::DiscussionRequest => DISCUSSION_REQUEST,
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Context for rendering a prompt template
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Variable substitutions
    variables: HashMap<String, String>,
}

impl PromptContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set a variable value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a bulleted list, or `empty` when there are no items
    pub fn with_list<I, S>(self, key: impl Into<String>, items: I, empty: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rendered = items
            .into_iter()
            .map(|item| item.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        if rendered.is_empty() {
            self.with(key, empty)
        } else {
            self.with(key, rendered)
        }
    }
}

/// Render a template with the given context
pub fn render(template: Template, context: &PromptContext) -> String {
    render_template(template.raw(), context)
}

/// Render a template string with variable substitution
///
/// Placeholders are resolved in a single pass over the template, so values
/// that themselves contain `{{...}}` are inserted verbatim. Unset uppercase
/// placeholders render as "(not specified)".
fn render_template(template: &str, context: &PromptContext) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };

        let key = &after[..end];
        result.push_str(&rest[..start]);

        if !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            match context.variables.get(key) {
                Some(value) => result.push_str(value),
                None => result.push_str(UNSET),
            }
        } else {
            result.push_str(&rest[start..start + 2 + end + 2]);
        }

        rest = &after[end + 2..];
    }

    result.push_str(rest);
    result
}

/// Build a prompt from a template
pub struct PromptBuilder {
    template: Template,
    context: PromptContext,
}

impl PromptBuilder {
    /// Create a new prompt builder for the given template
    pub fn new(template: Template) -> Self {
        Self {
            template,
            context: PromptContext::new(),
        }
    }

    /// Set a variable
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context = self.context.with(key, value);
        self
    }

    /// Set a variable to a newline-joined list
    pub fn list<I, S>(mut self, key: impl Into<String>, items: I, empty: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.context = self.context.with_list(key, items, empty);
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        render(self.template, &self.context).trim_end().to_string()
    }
}
