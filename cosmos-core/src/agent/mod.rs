//! Agent personas, the static pool and prompt templates

mod pool;
mod prompts;
mod types;

pub use pool::{
    agents_named, all_agents, default_agents, find_agent, squad_presets, DEFAULT_AGENT_NAMES,
};
pub use prompts::{render, PromptBuilder, PromptContext, Template};
pub use types::{Agent, IconName, SquadPreset, AGENT_COLOR};
