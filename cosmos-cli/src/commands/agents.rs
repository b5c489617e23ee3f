//! Agents command - Browse the pool, manage the roster and trial an agent

use clap::{Args, Subcommand};
use cosmos_core::agent::{all_agents, find_agent, squad_presets};
use cosmos_core::stream::StreamAggregator;
use cosmos_core::{Agent, PrintHandler, SquadPreset, Workspace};

use crate::session::Session;

/// Arguments for the agents command
#[derive(Args, Debug)]
pub struct AgentsArgs {
    #[command(subcommand)]
    pub command: AgentsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AgentsCommand {
    /// List every agent in the pool
    Pool,

    /// List built-in and saved squad presets
    Presets,

    /// Show the agents you prefer for new missions
    Roster,

    /// Replace the roster with the named agents
    SetRoster {
        /// Agent names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Add a pool agent to the roster
    Recruit {
        /// Agent name
        name: String,
    },

    /// Remove an agent from the roster
    Dismiss {
        /// Agent name
        name: String,
    },

    /// Save a named squad preset
    SavePreset {
        /// Preset name
        name: String,

        /// What the squad is for
        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated agent names
        #[arg(long, value_delimiter = ',', required = true)]
        agents: Vec<String>,
    },

    /// Delete a saved squad preset
    DeletePreset {
        /// Preset name
        name: String,
    },

    /// Ask a single agent a question before recruiting it
    Trial {
        /// Agent name
        name: String,

        /// Question to ask
        question: String,
    },
}

impl AgentsArgs {
    /// Execute the agents command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        match &self.command {
            AgentsCommand::Pool => {
                println!("Agent Pool");
                println!("==========");
                println!();
                print_agents(&all_agents());
            }
            AgentsCommand::Presets => {
                println!("Squad Presets");
                println!("=============");
                for preset in squad_presets() {
                    print_preset(&preset, "built-in");
                }
                if let Ok((_, workspace)) = session.workspace().await {
                    for preset in workspace.presets().await? {
                        print_preset(&preset, "saved");
                    }
                }
            }
            AgentsCommand::Roster => {
                let (_, workspace) = session.workspace().await?;
                println!("Roster");
                println!("======");
                println!();
                print_agents(&workspace.roster().await?);
            }
            AgentsCommand::SetRoster { names } => {
                let (_, workspace) = session.workspace().await?;
                let agents = resolve_names(&workspace, names).await?;
                workspace.set_roster(&agents).await?;
                println!("Roster set to {} agent(s)", agents.len());
            }
            AgentsCommand::Recruit { name } => {
                let (_, workspace) = session.workspace().await?;
                let agent = find_agent(name)
                    .ok_or_else(|| anyhow::anyhow!("No agent named {} in the pool", name))?;
                if workspace.recruit(agent).await? {
                    println!("Recruited {}", name);
                } else {
                    println!("{} is already on the roster", name);
                }
            }
            AgentsCommand::Dismiss { name } => {
                let (_, workspace) = session.workspace().await?;
                if workspace.dismiss(name).await? {
                    println!("Dismissed {}", name);
                } else {
                    println!("{} is not on the roster", name);
                }
            }
            AgentsCommand::SavePreset {
                name,
                description,
                agents,
            } => {
                let (_, workspace) = session.workspace().await?;
                let agents = resolve_names(&workspace, agents).await?;
                workspace
                    .save_preset(SquadPreset {
                        name: name.trim().to_string(),
                        description: description.trim().to_string(),
                        agents,
                    })
                    .await?;
                println!("Saved preset {}", name.trim());
            }
            AgentsCommand::DeletePreset { name } => {
                let (_, workspace) = session.workspace().await?;
                workspace.delete_preset(name).await?;
                println!("Deleted preset {}", name);
            }
            AgentsCommand::Trial { name, question } => {
                let agent = match session.workspace().await {
                    Ok((_, workspace)) => lookup(&workspace, name).await?,
                    Err(_) => find_agent(name),
                }
                .ok_or_else(|| anyhow::anyhow!("No agent named {}", name))?;

                println!("{} - {}", agent, agent.personality);
                println!();

                let stream = session.insights()?.trial(&agent, question).await?;
                let mut aggregator = StreamAggregator::new(session.config.model.stream_idle_timeout);
                let mut handler = PrintHandler::new(session.verbose);
                aggregator.consume(stream, &session.cancel, &mut handler).await?;
            }
        }

        Ok(())
    }
}

/// Find an agent on the roster first, then in the pool
async fn lookup(workspace: &Workspace, name: &str) -> anyhow::Result<Option<Agent>> {
    let roster = workspace.roster().await?;
    Ok(roster
        .into_iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .or_else(|| find_agent(name)))
}

async fn resolve_names(workspace: &Workspace, names: &[String]) -> anyhow::Result<Vec<Agent>> {
    let mut agents = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let agent = lookup(workspace, name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No agent named {}", name))?;
        if !agents.iter().any(|a: &Agent| a.name == agent.name) {
            agents.push(agent);
        }
    }
    Ok(agents)
}

pub fn print_agents(agents: &[Agent]) {
    if agents.is_empty() {
        println!("  (none)");
        return;
    }
    for agent in agents {
        println!("  {:<12} [{}] {}", agent.name, agent.icon.name(), agent.role);
    }
}

fn print_preset(preset: &SquadPreset, origin: &str) {
    println!();
    println!("{} ({})", preset.name, origin);
    if !preset.description.is_empty() {
        println!("  {}", preset.description);
    }
    let names: Vec<&str> = preset.agents.iter().map(|a| a.name.as_str()).collect();
    println!("  Squad: {}", names.join(", "));
}
